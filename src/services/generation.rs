//! Generation and refinement of enhanced photos through an `ImageEditor`.
//!
//! Results are returned as `data:` URLs so they can be shown directly and fed
//! back into `refine`.
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::media::ImageData;
use crate::services::ImageEditor;

#[derive(Clone)]
pub struct ImageGenerationClient {
    editor: Arc<dyn ImageEditor>,
}

impl ImageGenerationClient {
    pub fn new(editor: Arc<dyn ImageEditor>) -> Self {
        ImageGenerationClient { editor }
    }

    /// Enhance `source` following `prompt`.
    pub async fn generate(&self, source: &ImageData, prompt: &str) -> AppResult<String> {
        tracing::info!(mime = %source.mime_type, bytes = source.bytes.len(), "requesting enhanced image");
        let image = self.editor.edit(source, prompt).await.map_err(|e| match e {
            AppError::NoImage(_) => AppError::NoImage(
                "A IA não retornou uma imagem válida. Tente ajustar o tipo de alimento.".to_string(),
            ),
            other => other,
        })?;
        Ok(image.to_data_url())
    }

    /// Apply a follow-up edit to a previous result.
    pub async fn refine(&self, previous: &str, instruction: &str) -> AppResult<String> {
        let source = ImageData::from_data_url(previous)?;
        tracing::info!(mime = %source.mime_type, "requesting refinement");
        let image = self
            .editor
            .edit(&source, &refine_instruction(instruction))
            .await
            .map_err(|e| match e {
                AppError::NoImage(_) => AppError::NoImage("Falha ao refinar a imagem.".to_string()),
                other => other,
            })?;
        Ok(image.to_data_url())
    }
}

pub fn refine_instruction(instruction: &str) -> String {
    format!(
        "Edit this image based on the following instruction: \"{}\". Maintain the high-quality, photorealistic editorial food photography style. Do not change the aspect ratio.",
        instruction
    )
}
