//! Thin HTTP client for the Gemini REST API.
//!
//! - `generate_content` posts a request to `/v1beta/models/{model}:generateContent`.
//! - As a `Classifier` it asks the verification model for schema-bound JSON.
//! - As an `ImageEditor` it sends image + instruction to the image model and
//!   returns the first inline image of the reply.
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::gemini::types::{GenerateContentRequest, GenerateContentResponse};
use crate::media::ImageData;
use crate::services::{Classifier, ImageEditor};

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    generation_model: String,
    verification_model: String,
}

impl GeminiClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        let base = base_url.trim_end_matches('/').to_string();
        GeminiClient {
            client: Client::new(),
            base_url: base,
            api_key,
            generation_model: crate::config::DEFAULT_GENERATION_MODEL.to_string(),
            verification_model: crate::config::DEFAULT_VERIFICATION_MODEL.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        let key = config.require_api_key()?.to_string();
        Ok(GeminiClient::new(config.gemini_base_url.clone(), key)
            .with_models(config.generation_model.clone(), config.verification_model.clone()))
    }

    pub fn with_models(mut self, generation_model: String, verification_model: String) -> Self {
        self.generation_model = generation_model;
        self.verification_model = verification_model;
        self
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }

    /// Call `generateContent` on `model`.
    ///
    /// Non-2xx responses become `AppError::Gemini` carrying status and body.
    pub async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> AppResult<GenerateContentResponse> {
        let url = self.endpoint(model);
        tracing::info!("Sending request to Gemini model {}", model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(AppError::HttpClient)?;

        if response.status().is_success() {
            let body: GenerateContentResponse = response.json().await.map_err(AppError::HttpClient)?;
            tracing::debug!("Gemini returned {} candidate(s)", body.candidates.len());
            Ok(body)
        } else {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_else(|_| "Unable to read error body".to_string());
            let error_message = format!("Request to {} failed. Status: {}, Body: {}", model, status, error_body);
            tracing::error!("{}", error_message);
            Err(AppError::Gemini(error_message))
        }
    }
}

#[async_trait]
impl Classifier for GeminiClient {
    async fn classify(&self, image: &ImageData, instruction: &str, schema: &Value) -> AppResult<String> {
        let request = GenerateContentRequest::image_with_text(image, instruction).with_json_schema(schema.clone());
        let response = self.generate_content(&self.verification_model, &request).await?;
        let text = response.text();
        if text.trim().is_empty() {
            return Err(AppError::Gemini("classification response carried no text".to_string()));
        }
        Ok(text)
    }
}

#[async_trait]
impl ImageEditor for GeminiClient {
    async fn edit(&self, image: &ImageData, instruction: &str) -> AppResult<ImageData> {
        let request = GenerateContentRequest::image_with_text(image, instruction);
        let response = self.generate_content(&self.generation_model, &request).await?;
        match response.first_inline_image() {
            Some((mime, data)) => ImageData::from_base64(&mime, data),
            None => {
                let text = response.text();
                tracing::warn!("Gemini returned no image part; text reply: {:?}", text);
                Err(AppError::NoImage("no image produced".to_string()))
            }
        }
    }
}
