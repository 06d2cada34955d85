//! Receipt verification for the manual Pix payment.
//!
//! The verdict comes from the `Classifier`; `verify` never fails. Transport or
//! parse problems turn into an invalid verdict with a technical-error reason.
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::media::ImageData;
use crate::services::Classifier;

pub const TECHNICAL_ERROR_REASON: &str =
    "Erro técnico ao analisar o comprovante. Tente enviar uma foto mais nítida.";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub is_valid: bool,
    #[serde(default)]
    pub reason: String,
}

/// Shown when a receipt is rejected without a usable reason.
pub fn rejection_reason(amount: &str) -> String {
    format!("Não foi possível identificar o pagamento de R$ {}. Tente novamente.", amount)
}

impl Verdict {
    pub fn technical_error() -> Self {
        Verdict { is_valid: false, reason: TECHNICAL_ERROR_REASON.to_string() }
    }
}

#[derive(Clone)]
pub struct PaymentVerifier {
    classifier: Arc<dyn Classifier>,
    amount: String,
    instruction: String,
}

impl PaymentVerifier {
    /// `amount` is the expected transfer value as printed by Brazilian banks, e.g. `1,00`.
    pub fn new(classifier: Arc<dyn Classifier>, amount: &str) -> Self {
        PaymentVerifier { classifier, amount: amount.to_string(), instruction: receipt_instruction(amount) }
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub async fn verify(&self, receipt: &ImageData) -> Verdict {
        let raw = match self.classifier.classify(receipt, &self.instruction, &verdict_schema()).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!("Payment validation error: {}", e);
                return Verdict::technical_error();
            }
        };
        match serde_json::from_str::<Verdict>(raw.trim()) {
            Ok(mut verdict) => {
                if !verdict.is_valid && verdict.reason.trim().is_empty() {
                    verdict.reason = rejection_reason(&self.amount);
                }
                tracing::info!(is_valid = verdict.is_valid, reason = %verdict.reason, "receipt classified");
                verdict
            }
            Err(e) => {
                tracing::error!("Payment validation returned malformed JSON ({}): {:?}", e, raw);
                Verdict::technical_error()
            }
        }
    }
}

fn receipt_instruction(amount: &str) -> String {
    let dotted = amount.replace(',', ".");
    format!(
        "Analyze this image. It is supposed to be a payment receipt (Pix confirmation) from a banking app.\n\
         \n\
         Task:\n\
         1. Identify if it looks like a payment receipt.\n\
         2. Search specifically for a transaction value of exactly \"{amount}\" or \"{dotted}\" or \"R$ {amount}\".\n\
         \n\
         Return a JSON object with:\n\
         - isValid: boolean (true only if it is a receipt AND contains the value {amount})\n\
         - reason: string (short explanation in Portuguese)"
    )
}

fn verdict_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "isValid": { "type": "BOOLEAN" },
            "reason": { "type": "STRING" }
        },
        "required": ["isValid", "reason"]
    })
}
