#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use photo_run::error::{AppError, AppResult};
use photo_run::media::{ImageData, UploadedImage};
use photo_run::services::{Classifier, ImageEditor, Services};
use serde_json::Value;
use tokio::sync::Notify;

/// Replies to every classification with the same text, or a transport error.
/// Optionally waits on a gate before answering.
pub struct FakeClassifier {
    reply: Option<String>,
    pub calls: Mutex<usize>,
    gate: Option<Arc<Notify>>,
}

impl FakeClassifier {
    pub fn replying(json: &str) -> Arc<Self> {
        Arc::new(FakeClassifier { reply: Some(json.to_string()), calls: Mutex::new(0), gate: None })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(FakeClassifier { reply: None, calls: Mutex::new(0), gate: None })
    }

    pub fn gated(gate: Arc<Notify>, json: &str) -> Arc<Self> {
        Arc::new(FakeClassifier { reply: Some(json.to_string()), calls: Mutex::new(0), gate: Some(gate) })
    }
}

#[async_trait]
impl Classifier for FakeClassifier {
    async fn classify(&self, _image: &ImageData, _instruction: &str, _schema: &Value) -> AppResult<String> {
        *self.calls.lock().unwrap() += 1;
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.reply.clone().ok_or_else(|| AppError::Gemini("connection reset".into()))
    }
}

/// Answers edits from a queue; `None` entries behave like a reply without an
/// image part. Optionally waits on a gate before answering.
pub struct FakeEditor {
    replies: Mutex<VecDeque<Option<ImageData>>>,
    pub prompts: Mutex<Vec<String>>,
    pub sources: Mutex<Vec<ImageData>>,
    gate: Option<Arc<Notify>>,
}

impl FakeEditor {
    pub fn with_replies(replies: Vec<Option<ImageData>>) -> Arc<Self> {
        Arc::new(FakeEditor {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
            sources: Mutex::new(Vec::new()),
            gate: None,
        })
    }

    pub fn gated(gate: Arc<Notify>, reply: ImageData) -> Arc<Self> {
        Arc::new(FakeEditor {
            replies: Mutex::new(VecDeque::from([Some(reply)])),
            prompts: Mutex::new(Vec::new()),
            sources: Mutex::new(Vec::new()),
            gate: Some(gate),
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageEditor for FakeEditor {
    async fn edit(&self, image: &ImageData, instruction: &str) -> AppResult<ImageData> {
        self.prompts.lock().unwrap().push(instruction.to_string());
        self.sources.lock().unwrap().push(image.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let next = self.replies.lock().unwrap().pop_front().flatten();
        next.ok_or_else(|| AppError::NoImage("no image produced".into()))
    }
}

pub fn services(classifier: Arc<FakeClassifier>, editor: Arc<FakeEditor>) -> Services {
    Services::new(classifier, editor, "1,00")
}

pub fn photo(name: &str) -> UploadedImage {
    UploadedImage { file_name: Some(name.to_string()), image: ImageData::new("image/jpeg", vec![0xff, 0xd8, 0xff, 0xe0]) }
}

pub fn enhanced(byte: u8) -> ImageData {
    ImageData::new("image/png", vec![0x89, 0x50, 0x4e, 0x47, byte])
}

pub const ACCEPTED: &str = r#"{"isValid": true, "reason": "ok"}"#;
pub const REJECTED: &str = r#"{"isValid": false, "reason": "valor não identificado"}"#;
