//! The per-visit session record and its reducer.
//!
//! A `Session` is only ever changed by [`Session::apply`], which validates an
//! [`Event`] against the current stage and returns a complete replacement.
//! Nothing observes a half-applied update: either the whole new session is
//! swapped in or the old one stays.
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::media::UploadedImage;
use crate::prompt::catalog::{default_enhancements, AspectRatio, EnhancementOption, FoodCategory};
use crate::prompt::composer::{PromptComposer, Selections};
use crate::config::DEFAULT_PAYMENT_AMOUNT;
use crate::services::{rejection_reason, Verdict};


#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Empty,
    ImageSelected,
    Configuring,
    PaymentPending,
    PaymentValidating,
    Paid,
    Generating,
    Complete,
    Refining,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Empty => "empty",
            Stage::ImageSelected => "image_selected",
            Stage::Configuring => "configuring",
            Stage::PaymentPending => "payment_pending",
            Stage::PaymentValidating => "payment_validating",
            Stage::Paid => "paid",
            Stage::Generating => "generating",
            Stage::Complete => "complete",
            Stage::Refining => "refining",
        }
    }

    /// Waiting on an external service.
    pub fn is_processing(self) -> bool {
        matches!(self, Stage::PaymentValidating | Stage::Generating | Stage::Refining)
    }

    pub fn payment_status(self) -> PaymentStatus {
        match self {
            Stage::Empty | Stage::ImageSelected | Stage::Configuring => PaymentStatus::Idle,
            Stage::PaymentPending => PaymentStatus::Pending,
            Stage::PaymentValidating => PaymentStatus::Validating,
            Stage::Paid | Stage::Generating | Stage::Complete | Stage::Refining => PaymentStatus::Paid,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Idle,
    Pending,
    Validating,
    Paid,
}

/// Latest image produced for the session and the prompt that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationResult {
    pub image_url: String,
    pub prompt: String,
}

/// Partial update of the user's presentation choices.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConfigurationPatch {
    pub category: Option<FoodCategory>,
    pub aspect_ratio: Option<AspectRatio>,
    /// Enhancement id to selected flag.
    pub enhancements: Option<BTreeMap<String, bool>>,
    pub instructions: Option<String>,
}

#[derive(Clone, Debug)]
pub enum Event {
    SelectImage(UploadedImage),
    Configure(ConfigurationPatch),
    SubmitConfiguration,
    CancelPayment,
    UploadReceipt(UploadedImage),
    ConfirmPayment,
    VerificationFinished(Verdict),
    StartGeneration,
    GenerationSucceeded(GenerationResult),
    GenerationFailed,
    StartRefine(String),
    RefineSucceeded(GenerationResult),
    RefineFailed,
    Reset,
}

impl Event {
    pub fn action(&self) -> &'static str {
        match self {
            Event::SelectImage(_) => "select an image",
            Event::Configure(_) => "change the configuration",
            Event::SubmitConfiguration => "submit the configuration",
            Event::CancelPayment => "cancel the payment",
            Event::UploadReceipt(_) => "upload a receipt",
            Event::ConfirmPayment => "confirm the payment",
            Event::VerificationFinished(_) => "finish verification",
            Event::StartGeneration => "generate",
            Event::GenerationSucceeded(_) | Event::GenerationFailed => "finish generation",
            Event::StartRefine(_) => "refine",
            Event::RefineSucceeded(_) | Event::RefineFailed => "finish refinement",
            Event::Reset => "reset",
        }
    }

    /// Events after which in-flight service calls no longer apply.
    pub fn starts_over(&self) -> bool {
        matches!(self, Event::SelectImage(_) | Event::Reset)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    stage: Stage,
    source: Option<Arc<UploadedImage>>,
    category: Option<FoodCategory>,
    aspect_ratio: AspectRatio,
    enhancements: Vec<EnhancementOption>,
    instructions: String,
    receipt: Option<Arc<UploadedImage>>,
    payment_error: Option<String>,
    generated_prompt: String,
    result: Option<GenerationResult>,
}

impl Default for Session {
    fn default() -> Self {
        Session::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Session {
            stage: Stage::Empty,
            source: None,
            category: None,
            aspect_ratio: AspectRatio::default(),
            enhancements: default_enhancements(),
            instructions: String::new(),
            receipt: None,
            payment_error: None,
            generated_prompt: String::new(),
            result: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.stage.payment_status()
    }

    pub fn is_processing(&self) -> bool {
        self.stage.is_processing()
    }

    pub fn is_complete(&self) -> bool {
        self.stage == Stage::Complete
    }

    pub fn source(&self) -> Option<&UploadedImage> {
        self.source.as_deref()
    }

    pub fn category(&self) -> Option<FoodCategory> {
        self.category
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }

    pub fn enhancements(&self) -> &[EnhancementOption] {
        &self.enhancements
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn receipt(&self) -> Option<&UploadedImage> {
        self.receipt.as_deref()
    }

    pub fn payment_error(&self) -> Option<&str> {
        self.payment_error.as_deref()
    }

    pub fn generated_prompt(&self) -> &str {
        &self.generated_prompt
    }

    pub fn result(&self) -> Option<&GenerationResult> {
        self.result.as_ref()
    }

    pub fn selections(&self) -> Selections<'_> {
        Selections {
            category: self.category,
            aspect_ratio: self.aspect_ratio,
            enhancements: &self.enhancements,
            instructions: &self.instructions,
        }
    }

    fn expect(&self, action: &'static str, allowed: &[Stage]) -> AppResult<()> {
        if allowed.contains(&self.stage) {
            Ok(())
        } else {
            Err(AppError::InvalidTransition { action, stage: self.stage })
        }
    }

    /// Validate `event` against the current stage and return the next session.
    pub fn apply(&self, event: Event) -> AppResult<Session> {
        use Stage::*;

        let action = event.action();
        let mut next = self.clone();
        match event {
            Event::Reset => next = Session::new(),
            Event::SelectImage(image) => {
                next.source = Some(Arc::new(image));
                next.result = None;
                next.receipt = None;
                next.payment_error = None;
                next.stage = ImageSelected;
            }
            Event::Configure(patch) => {
                self.expect(action, &[ImageSelected, Configuring])?;
                next.apply_patch(patch)?;
                next.stage = Configuring;
            }
            Event::SubmitConfiguration => {
                self.expect(action, &[ImageSelected, Configuring])?;
                if self.source.is_none() {
                    return Err(AppError::validation("Envie uma foto do prato antes de continuar."));
                }
                if self.category.is_none() {
                    return Err(AppError::validation("Selecione o tipo de alimento."));
                }
                next.stage = PaymentPending;
            }
            Event::CancelPayment => {
                self.expect(action, &[PaymentPending])?;
                next.payment_error = None;
                next.stage = Configuring;
            }
            Event::UploadReceipt(receipt) => {
                self.expect(action, &[PaymentPending])?;
                next.receipt = Some(Arc::new(receipt));
                next.payment_error = None;
            }
            Event::ConfirmPayment => {
                self.expect(action, &[PaymentPending])?;
                if self.receipt.is_none() {
                    return Err(AppError::validation("Envie o comprovante de pagamento."));
                }
                next.payment_error = None;
                next.stage = PaymentValidating;
            }
            Event::VerificationFinished(verdict) => {
                self.expect(action, &[PaymentValidating])?;
                if verdict.is_valid {
                    next.stage = Paid;
                } else {
                    let reason = verdict.reason.trim();
                    next.payment_error = Some(if reason.is_empty() {
                        rejection_reason(DEFAULT_PAYMENT_AMOUNT)
                    } else {
                        reason.to_string()
                    });
                    next.stage = PaymentPending;
                }
            }
            Event::StartGeneration => {
                self.expect(action, &[Paid, Complete])?;
                if self.source.is_none() {
                    return Err(AppError::validation("Envie uma foto do prato antes de continuar."));
                }
                if self.category.is_none() {
                    return Err(AppError::validation("Selecione o tipo de alimento."));
                }
                next.generated_prompt = PromptComposer::new().compose(&self.selections());
                next.stage = Generating;
            }
            Event::GenerationSucceeded(result) => {
                self.expect(action, &[Generating])?;
                next.result = Some(result);
                next.stage = Complete;
            }
            Event::GenerationFailed => {
                self.expect(action, &[Generating])?;
                next.stage = Paid;
            }
            Event::StartRefine(instruction) => {
                self.expect(action, &[Complete])?;
                if self.result.is_none() {
                    return Err(AppError::InvalidTransition { action, stage: self.stage });
                }
                if instruction.trim().is_empty() {
                    return Err(AppError::validation("Descreva o ajuste desejado."));
                }
                next.stage = Refining;
            }
            Event::RefineSucceeded(result) => {
                self.expect(action, &[Refining])?;
                next.result = Some(result);
                next.stage = Complete;
            }
            Event::RefineFailed => {
                self.expect(action, &[Refining])?;
                next.stage = Complete;
            }
        }
        tracing::debug!(from = %self.stage, to = %next.stage, action, "session transition");
        Ok(next)
    }

    fn apply_patch(&mut self, patch: ConfigurationPatch) -> AppResult<()> {
        if let Some(toggles) = patch.enhancements {
            for (id, selected) in toggles {
                let option = self
                    .enhancements
                    .iter_mut()
                    .find(|o| o.id == id)
                    .ok_or_else(|| AppError::validation(format!("Unknown enhancement '{}'", id)))?;
                option.selected = selected;
            }
        }
        if let Some(category) = patch.category {
            self.category = Some(category);
        }
        if let Some(ratio) = patch.aspect_ratio {
            self.aspect_ratio = ratio;
        }
        if let Some(instructions) = patch.instructions {
            self.instructions = instructions;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ImageInfo {
    pub file_name: Option<String>,
    pub mime_type: String,
    pub size: usize,
}

impl From<&UploadedImage> for ImageInfo {
    fn from(upload: &UploadedImage) -> Self {
        ImageInfo {
            file_name: upload.file_name.clone(),
            mime_type: upload.image.mime_type.clone(),
            size: upload.image.bytes.len(),
        }
    }
}

/// What clients see of a session. Image bytes are fetched separately.
#[derive(Clone, Debug, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub stage: Stage,
    pub payment_status: PaymentStatus,
    pub is_processing: bool,
    pub is_complete: bool,
    pub image: Option<ImageInfo>,
    pub category: Option<FoodCategory>,
    pub aspect_ratio: AspectRatio,
    pub enhancements: Vec<EnhancementOption>,
    pub instructions: String,
    pub receipt: Option<ImageInfo>,
    pub payment_error: Option<String>,
    pub generated_prompt: String,
    pub result_image: Option<String>,
}

impl SessionView {
    pub fn new(id: Uuid, session: &Session) -> Self {
        SessionView {
            id,
            stage: session.stage,
            payment_status: session.payment_status(),
            is_processing: session.is_processing(),
            is_complete: session.is_complete(),
            image: session.source().map(ImageInfo::from),
            category: session.category,
            aspect_ratio: session.aspect_ratio,
            enhancements: session.enhancements.clone(),
            instructions: session.instructions.clone(),
            receipt: session.receipt().map(ImageInfo::from),
            payment_error: session.payment_error.clone(),
            generated_prompt: session.generated_prompt.clone(),
            result_image: session.result.as_ref().map(|r| r.image_url.clone()),
        }
    }
}
