//! Capabilities of the hosted model and the services built on them.
//!
//! `Classifier` and `ImageEditor` are the only seams to the outside world.
//! [`GeminiClient`](crate::gemini::client::GeminiClient) implements both; tests
//! substitute deterministic fakes.
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::AppResult;
use crate::media::ImageData;

pub mod generation;
pub mod payment;

pub use generation::ImageGenerationClient;
pub use payment::{rejection_reason, PaymentVerifier, Verdict};

/// Answers a question about an image with JSON text matching `schema`.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, image: &ImageData, instruction: &str, schema: &Value) -> AppResult<String>;
}

/// Produces a new image from a source image and an editing instruction.
#[async_trait]
pub trait ImageEditor: Send + Sync {
    async fn edit(&self, image: &ImageData, instruction: &str) -> AppResult<ImageData>;
}

/// Service handles shared by every session.
#[derive(Clone)]
pub struct Services {
    pub verifier: PaymentVerifier,
    pub images: ImageGenerationClient,
}

impl Services {
    pub fn new(classifier: Arc<dyn Classifier>, editor: Arc<dyn ImageEditor>, payment_amount: &str) -> Self {
        Services {
            verifier: PaymentVerifier::new(classifier, payment_amount),
            images: ImageGenerationClient::new(editor),
        }
    }
}
