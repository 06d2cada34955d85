//! Wire types for `models/{model}:generateContent`.
//!
//! Only the fields this service reads or writes are modelled; everything else
//! in the response is ignored.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::media::{ImageData, DEFAULT_IMAGE_MIME};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    /// One user turn carrying an image followed by an instruction.
    pub fn image_with_text(image: &ImageData, text: &str) -> Self {
        GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part {
                        text: None,
                        inline_data: Some(InlineData {
                            mime_type: Some(image.mime_type.clone()),
                            data: image.to_base64(),
                        }),
                    },
                    Part { text: Some(text.to_string()), inline_data: None },
                ],
            }],
            generation_config: None,
        }
    }

    pub fn with_json_schema(mut self, schema: Value) -> Self {
        self.generation_config = Some(GenerationConfig {
            response_mime_type: Some("application/json".to_string()),
            response_schema: Some(schema),
        });
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

impl GenerateContentResponse {
    fn first_parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or_default()
    }

    /// First non-empty inline payload of the first candidate, as image bytes.
    pub fn first_inline_image(&self) -> Option<(String, &str)> {
        self.first_parts().iter().find_map(|p| {
            let inline = p.inline_data.as_ref()?;
            if inline.data.is_empty() {
                return None;
            }
            let mime = inline.mime_type.clone().unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string());
            Some((mime, inline.data.as_str()))
        })
    }

    /// Concatenated text parts of the first candidate.
    pub fn text(&self) -> String {
        self.first_parts().iter().filter_map(|p| p.text.as_deref()).collect()
    }
}
