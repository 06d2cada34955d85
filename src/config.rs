//! Env-driven configuration for the service, the CLI and the library.
//!
//! Values are read from the process environment; `dotenv` is loaded on demand
//! by the binaries. Defaults are provided for convenience during development,
//! except for the Gemini API key which has none.
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::error::{AppError, AppResult};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GENERATION_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_VERIFICATION_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_PIX_KEY: &str = "686e0c79-6454-4a4b-a5d9-2604ef786369";
pub const DEFAULT_PAYMENT_AMOUNT: &str = "1,00";

#[derive(Clone, Debug)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: String,
    pub generation_model: String,
    pub verification_model: String,
    pub api_host: String,
    pub api_port: String,
    pub pix_key: String,
    pub payment_amount: String,
    pub session_idle_minutes: String,
}

impl Config {
    pub fn dotenv_load() {
        dotenv::dotenv().ok();
    }

    pub fn new() -> Self {
        Config {
            gemini_api_key: env::var("GEMINI_API_KEY")
                .or_else(|_| env::var("API_KEY"))
                .ok()
                .filter(|k| !k.trim().is_empty()),
            gemini_base_url: var_or("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL),
            generation_model: var_or("GENERATION_MODEL", DEFAULT_GENERATION_MODEL),
            verification_model: var_or("VERIFICATION_MODEL", DEFAULT_VERIFICATION_MODEL),
            api_host: var_or("API_HOST", "127.0.0.1"),
            api_port: var_or("API_PORT", "8189"),
            pix_key: var_or("PIX_KEY", DEFAULT_PIX_KEY),
            payment_amount: var_or("PAYMENT_AMOUNT", DEFAULT_PAYMENT_AMOUNT),
            session_idle_minutes: var_or("SESSION_IDLE_MINUTES", "60"),
        }
    }

    pub fn require_api_key(&self) -> AppResult<&str> {
        self.gemini_api_key
            .as_deref()
            .ok_or_else(|| AppError::Config("GEMINI_API_KEY (or API_KEY) is not set".to_string()))
    }

    /// Parse host and port, falling back to `127.0.0.1:8189` piecewise.
    pub fn socket_address(&self) -> SocketAddr {
        let ip: IpAddr = self.api_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid API_HOST '{}', falling back to 127.0.0.1", self.api_host);
            IpAddr::from([127, 0, 0, 1])
        });
        let port: u16 = self.api_port.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid API_PORT '{}', falling back to 8189", self.api_port);
            8189
        });
        SocketAddr::new(ip, port)
    }

    /// How long an untouched session is kept before it may be dropped.
    pub fn session_max_idle(&self) -> Duration {
        let minutes: u64 = self.session_idle_minutes.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid SESSION_IDLE_MINUTES '{}', falling back to 60", self.session_idle_minutes);
            60
        });
        Duration::from_secs(minutes.saturating_mul(60))
    }

    /// Price label shown next to the Pix key, e.g. `R$ 1,00`.
    pub fn price_label(&self) -> String {
        format!("R$ {}", self.payment_amount)
    }

    pub fn log_summary(&self) {
        tracing::info!(
            gemini_base_url = %self.gemini_base_url,
            generation_model = %self.generation_model,
            verification_model = %self.verification_model,
            api_key = if self.gemini_api_key.is_some() { "<set>" } else { "<unset>" },
            pix_key = %self.pix_key,
            payment_amount = %self.payment_amount,
            "configuration loaded"
        );
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            gemini_api_key: None,
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            generation_model: DEFAULT_GENERATION_MODEL.to_string(),
            verification_model: DEFAULT_VERIFICATION_MODEL.to_string(),
            api_host: "127.0.0.1".to_string(),
            api_port: "8189".to_string(),
            pix_key: DEFAULT_PIX_KEY.to_string(),
            payment_amount: DEFAULT_PAYMENT_AMOUNT.to_string(),
            session_idle_minutes: "60".to_string(),
        }
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_host_and_port_fall_back() {
        let cfg = Config { api_host: "not-an-ip".into(), api_port: "http".into(), ..Config::default() };
        assert_eq!(cfg.socket_address(), "127.0.0.1:8189".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn missing_key_is_a_config_error() {
        let cfg = Config::default();
        assert!(matches!(cfg.require_api_key(), Err(AppError::Config(_))));
        let cfg = Config { gemini_api_key: Some("k".into()), ..Config::default() };
        assert_eq!(cfg.require_api_key().unwrap(), "k");
    }

    #[test]
    fn idle_timeout_parses_minutes() {
        let cfg = Config { session_idle_minutes: "5".into(), ..Config::default() };
        assert_eq!(cfg.session_max_idle(), Duration::from_secs(300));

        let huge = Config { session_idle_minutes: u64::MAX.to_string(), ..Config::default() };
        assert_eq!(huge.session_max_idle(), Duration::from_secs(u64::MAX));

        let cfg = Config { session_idle_minutes: "soon".into(), ..Config::default() };
        assert_eq!(cfg.session_max_idle(), Duration::from_secs(3600));
    }

    #[test]
    fn price_label_uses_amount() {
        assert_eq!(Config::default().price_label(), "R$ 1,00");
    }
}
