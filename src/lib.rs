//! Photo Run service library
//!
//! Modules:
//! - `api`: Axum HTTP handlers and router setup used by the binary.
//! - `gemini`: Thin client for the Gemini `generateContent` endpoint.
//! - `services`: Payment verification and image generation over the
//!   `Classifier` / `ImageEditor` capabilities.
//! - `prompt`: Option catalog and prompt composition.
//! - `workflow`: Session state machine, per-session controller and store.
//! - `media`: Image payloads and `data:` URLs.
//! - `config`: Env-driven configuration loader.
//! - `error`: Common error type and alias.
//!
//! Re-exports are provided for common types: `Config`, `GeminiClient`,
//! `PromptComposer`, `WorkflowController` and `SessionStore`.
pub mod api;
pub mod config;
pub mod error;
pub mod gemini;
pub mod media;
pub mod prompt;
pub mod services;
pub mod workflow;

pub use config::Config;
pub use gemini::client::GeminiClient;
pub use prompt::composer::PromptComposer;
pub use workflow::{SessionStore, WorkflowController};
