//! Drives one session through upload, configuration, payment, generation and
//! refinement.
//!
//! The session lives behind an async mutex that is only held while an event is
//! applied, never across a service call. Each start-over (`select_image`,
//! `reset`) bumps an epoch; completions that arrive for an older epoch are
//! dropped instead of being applied to the new session.
//!
//! Reads count as activity: a client that only polls keeps its session alive.
use std::time::Instant;

use tokio::sync::Mutex;

use crate::error::{AppError, AppResult};
use crate::media::UploadedImage;
use crate::services::generation::refine_instruction;
use crate::services::Services;
use crate::workflow::session::{ConfigurationPatch, Event, GenerationResult, Session, Stage};

pub const GENERATION_FAILED_MESSAGE: &str =
    "Ocorreu um erro ao processar a imagem com a IA. Verifique sua conexão ou tente outra foto.";
pub const REFINE_FAILED_MESSAGE: &str = "Erro ao refinar a imagem. Tente novamente.";

struct Inner {
    session: Session,
    epoch: u64,
    touched: Instant,
}

impl Inner {
    fn commit(&mut self, event: Event) -> AppResult<Session> {
        self.commit_all(vec![event])
    }

    /// The only place a session is replaced. Events are applied in order and
    /// stored together; if any is rejected the session is left untouched.
    fn commit_all(&mut self, events: Vec<Event>) -> AppResult<Session> {
        let mut next = self.session.clone();
        let mut starts_over = false;
        for event in events {
            starts_over |= event.starts_over();
            next = next.apply(event)?;
        }
        if starts_over {
            self.epoch += 1;
        }
        self.session = next.clone();
        self.touched = Instant::now();
        Ok(next)
    }
}

pub struct WorkflowController {
    inner: Mutex<Inner>,
    services: Services,
}

impl WorkflowController {
    pub fn new(services: Services) -> Self {
        WorkflowController {
            inner: Mutex::new(Inner { session: Session::new(), epoch: 0, touched: Instant::now() }),
            services,
        }
    }

    pub async fn snapshot(&self) -> Session {
        let mut inner = self.inner.lock().await;
        inner.touched = Instant::now();
        inner.session.clone()
    }

    pub async fn last_touched(&self) -> Instant {
        self.inner.lock().await.touched
    }

    /// Whether a service call is in flight. Unlike `snapshot`, not activity.
    pub async fn is_processing(&self) -> bool {
        self.inner.lock().await.session.is_processing()
    }

    async fn dispatch(&self, event: Event) -> AppResult<(Session, u64)> {
        let mut inner = self.inner.lock().await;
        let next = inner.commit(event)?;
        Ok((next, inner.epoch))
    }

    /// Apply the outcome of a service call started during `epoch`.
    async fn finish(&self, epoch: u64, event: Event) -> AppResult<Session> {
        self.finish_all(epoch, vec![event]).await
    }

    async fn finish_all(&self, epoch: u64, events: Vec<Event>) -> AppResult<Session> {
        let mut inner = self.inner.lock().await;
        if inner.epoch != epoch {
            let action = events.first().map(Event::action).unwrap_or("finish");
            tracing::info!(action, "session started over; dropping stale completion");
            return Err(AppError::Superseded);
        }
        inner.commit_all(events)
    }

    pub async fn select_image(&self, image: UploadedImage) -> AppResult<Session> {
        tracing::info!(file = ?image.file_name, bytes = image.image.bytes.len(), "source image selected");
        Ok(self.dispatch(Event::SelectImage(image)).await?.0)
    }

    pub async fn update_configuration(&self, patch: ConfigurationPatch) -> AppResult<Session> {
        Ok(self.dispatch(Event::Configure(patch)).await?.0)
    }

    pub async fn submit_configuration(&self) -> AppResult<Session> {
        Ok(self.dispatch(Event::SubmitConfiguration).await?.0)
    }

    pub async fn cancel_payment(&self) -> AppResult<Session> {
        Ok(self.dispatch(Event::CancelPayment).await?.0)
    }

    pub async fn upload_receipt(&self, receipt: UploadedImage) -> AppResult<Session> {
        Ok(self.dispatch(Event::UploadReceipt(receipt)).await?.0)
    }

    /// Verify the uploaded receipt; on success generation starts right away.
    ///
    /// A rejected receipt is not an error: the returned session is back in
    /// `PaymentPending` with the reason set.
    pub async fn confirm_payment(&self) -> AppResult<Session> {
        let (validating, epoch) = self.dispatch(Event::ConfirmPayment).await?;
        let receipt = validating
            .receipt()
            .ok_or_else(|| AppError::validation("Envie o comprovante de pagamento."))?;

        let verdict = self.services.verifier.verify(&receipt.image).await;
        let accepted = verdict.is_valid;
        let mut events = vec![Event::VerificationFinished(verdict)];
        if accepted {
            // Paid and Generating land together so no other request sees a
            // paid session that is not yet generating.
            events.push(Event::StartGeneration);
        }
        let session = self.finish_all(epoch, events).await?;
        if session.stage() != Stage::Generating {
            tracing::info!(reason = ?session.payment_error(), "payment rejected");
            return Ok(session);
        }
        tracing::info!("payment accepted; starting generation");
        self.run_generation(session, epoch).await
    }

    pub async fn generate(&self) -> AppResult<Session> {
        let (generating, epoch) = self.dispatch(Event::StartGeneration).await?;
        self.run_generation(generating, epoch).await
    }

    async fn run_generation(&self, generating: Session, epoch: u64) -> AppResult<Session> {
        let source = generating
            .source()
            .ok_or_else(|| AppError::validation("Envie uma foto do prato antes de continuar."))?;
        let prompt = generating.generated_prompt();

        match self.services.images.generate(&source.image, prompt).await {
            Ok(image_url) => {
                let result = GenerationResult { image_url, prompt: prompt.to_string() };
                self.finish(epoch, Event::GenerationSucceeded(result)).await
            }
            Err(e) => {
                tracing::error!("Error processing image: {}", e);
                self.finish(epoch, Event::GenerationFailed).await?;
                Err(AppError::Generation(GENERATION_FAILED_MESSAGE.to_string()))
            }
        }
    }

    pub async fn refine(&self, instruction: &str) -> AppResult<Session> {
        let (refining, epoch) = self.dispatch(Event::StartRefine(instruction.to_string())).await?;
        let previous = refining
            .result()
            .ok_or(AppError::InvalidTransition { action: "refine", stage: refining.stage() })?;

        match self.services.images.refine(&previous.image_url, instruction).await {
            Ok(image_url) => {
                let result = GenerationResult { image_url, prompt: refine_instruction(instruction) };
                self.finish(epoch, Event::RefineSucceeded(result)).await
            }
            Err(e) => {
                tracing::error!("Refine error: {}", e);
                self.finish(epoch, Event::RefineFailed).await?;
                Err(AppError::Generation(REFINE_FAILED_MESSAGE.to_string()))
            }
        }
    }

    pub async fn reset(&self) -> AppResult<Session> {
        Ok(self.dispatch(Event::Reset).await?.0)
    }
}
