mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use photo_run::error::AppError;
use photo_run::media::ImageData;
use photo_run::prompt::catalog::{default_enhancements, AspectRatio, FoodCategory};
use photo_run::services::payment::TECHNICAL_ERROR_REASON;
use photo_run::workflow::controller::{GENERATION_FAILED_MESSAGE, REFINE_FAILED_MESSAGE};
use photo_run::workflow::session::PaymentStatus;
use photo_run::workflow::{ConfigurationPatch, Session, Stage, WorkflowController};
use tokio::sync::Notify;

fn pizza_square() -> ConfigurationPatch {
    ConfigurationPatch {
        category: Some(FoodCategory::Pizza),
        aspect_ratio: Some(AspectRatio::Square),
        ..Default::default()
    }
}

/// Drive a controller up to `PaymentPending` with a receipt uploaded.
async fn ready_to_pay(controller: &WorkflowController) {
    controller.select_image(photo("pizza.jpg")).await.unwrap();
    controller.update_configuration(pizza_square()).await.unwrap();
    controller.submit_configuration().await.unwrap();
    controller.upload_receipt(photo("pix.png")).await.unwrap();
}

async fn wait_for_stage(controller: &WorkflowController, stage: Stage) {
    for _ in 0..100 {
        if controller.snapshot().await.stage() == stage {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(controller.snapshot().await.stage(), stage);
}

#[tokio::test]
async fn accepted_payment_triggers_generation_with_composed_prompt() {
    let classifier = FakeClassifier::replying(ACCEPTED);
    let editor = FakeEditor::with_replies(vec![Some(enhanced(1))]);
    let controller = WorkflowController::new(services(classifier.clone(), editor.clone()));

    ready_to_pay(&controller).await;
    let session = controller.confirm_payment().await.unwrap();

    assert_eq!(*classifier.calls.lock().unwrap(), 1);
    let prompts = editor.prompts();
    assert_eq!(prompts.len(), 1, "generation should start without another action");
    let prompt = &prompts[0];
    assert!(prompt.contains("Pizza"));
    assert!(prompt.contains("1:1"));
    for option in default_enhancements() {
        assert!(prompt.contains(&option.label), "missing {}", option.label);
    }
    assert_eq!(editor.sources.lock().unwrap()[0], photo("pizza.jpg").image);

    assert_eq!(session.stage(), Stage::Complete);
    assert_eq!(session.payment_status(), PaymentStatus::Paid);
    assert_eq!(session.generated_prompt(), prompt.as_str());
    let result = session.result().unwrap();
    assert_eq!(result.image_url, enhanced(1).to_data_url());
    assert_eq!(&result.prompt, prompt);
}

#[tokio::test]
async fn rejected_payment_returns_to_pending_with_reason() {
    let editor = FakeEditor::with_replies(vec![]);
    let controller = WorkflowController::new(services(FakeClassifier::replying(REJECTED), editor.clone()));

    ready_to_pay(&controller).await;
    let session = controller.confirm_payment().await.unwrap();

    assert_eq!(session.stage(), Stage::PaymentPending);
    assert_eq!(session.payment_status(), PaymentStatus::Pending);
    assert_eq!(session.payment_error(), Some("valor não identificado"));
    assert_eq!(session.receipt().unwrap().file_name.as_deref(), Some("pix.png"));
    assert!(editor.prompts().is_empty());

    // the retained receipt can be submitted again
    let again = controller.confirm_payment().await.unwrap();
    assert_eq!(again.stage(), Stage::PaymentPending);
}

#[tokio::test]
async fn verifier_outage_is_reported_as_rejection() {
    let controller =
        WorkflowController::new(services(FakeClassifier::failing(), FakeEditor::with_replies(vec![])));
    ready_to_pay(&controller).await;
    let session = controller.confirm_payment().await.unwrap();
    assert_eq!(session.stage(), Stage::PaymentPending);
    assert_eq!(session.payment_error(), Some(TECHNICAL_ERROR_REASON));
}

#[tokio::test]
async fn generation_without_image_keeps_session_for_retry() {
    let editor = FakeEditor::with_replies(vec![None, Some(enhanced(2))]);
    let controller = WorkflowController::new(services(FakeClassifier::replying(ACCEPTED), editor.clone()));
    ready_to_pay(&controller).await;

    let err = controller.confirm_payment().await.unwrap_err();
    assert!(matches!(&err, AppError::Generation(msg) if msg == GENERATION_FAILED_MESSAGE));

    let session = controller.snapshot().await;
    assert_eq!(session.stage(), Stage::Paid);
    assert!(!session.is_processing());
    assert!(!session.is_complete());
    assert!(session.result().is_none());
    assert_eq!(session.source().unwrap().file_name.as_deref(), Some("pizza.jpg"));
    assert_eq!(session.payment_status(), PaymentStatus::Paid);
    assert_eq!(session.generated_prompt(), editor.prompts()[0]);

    // same inputs, second attempt succeeds
    let retried = controller.generate().await.unwrap();
    assert_eq!(retried.stage(), Stage::Complete);
    assert_eq!(editor.prompts()[0], editor.prompts()[1]);
}

#[tokio::test]
async fn failed_refine_keeps_previous_result() {
    let editor = FakeEditor::with_replies(vec![Some(enhanced(1)), None, Some(enhanced(3))]);
    let controller = WorkflowController::new(services(FakeClassifier::replying(ACCEPTED), editor.clone()));
    ready_to_pay(&controller).await;
    let complete = controller.confirm_payment().await.unwrap();
    let first = complete.result().unwrap().clone();

    let err = controller.refine("adicione vapor").await.unwrap_err();
    assert!(matches!(&err, AppError::Generation(msg) if msg == REFINE_FAILED_MESSAGE));
    let after_failure = controller.snapshot().await;
    assert_eq!(after_failure.stage(), Stage::Complete);
    assert_eq!(after_failure.result(), Some(&first));

    let refined = controller.refine("adicione vapor").await.unwrap();
    assert_eq!(refined.result().unwrap().image_url, enhanced(3).to_data_url());
    assert!(refined.result().unwrap().prompt.contains("\"adicione vapor\""));
    // refine sends the previous result, not the original photo
    assert_eq!(editor.sources.lock().unwrap()[2], enhanced(1));
    assert_eq!(refined.generated_prompt(), first.prompt);
}

#[tokio::test]
async fn guards_reject_out_of_order_actions() {
    let controller =
        WorkflowController::new(services(FakeClassifier::replying(ACCEPTED), FakeEditor::with_replies(vec![])));

    assert!(matches!(controller.submit_configuration().await, Err(AppError::InvalidTransition { .. })));
    assert!(matches!(controller.generate().await, Err(AppError::InvalidTransition { .. })));
    assert!(matches!(controller.refine("x").await, Err(AppError::InvalidTransition { .. })));

    controller.select_image(photo("a.jpg")).await.unwrap();
    assert!(matches!(controller.submit_configuration().await, Err(AppError::Validation(_))));
    assert!(matches!(controller.upload_receipt(photo("r.png")).await, Err(AppError::InvalidTransition { .. })));

    controller.update_configuration(pizza_square()).await.unwrap();
    controller.submit_configuration().await.unwrap();
    assert!(matches!(controller.confirm_payment().await, Err(AppError::Validation(_))));
    assert_eq!(controller.snapshot().await.stage(), Stage::PaymentPending);
}

#[tokio::test]
async fn reset_from_any_reachable_state_yields_initial_session() {
    let editor = FakeEditor::with_replies(vec![Some(enhanced(1)), Some(enhanced(2))]);
    let controller = WorkflowController::new(services(FakeClassifier::replying(ACCEPTED), editor));

    assert_eq!(controller.reset().await.unwrap(), Session::new());

    controller.select_image(photo("a.jpg")).await.unwrap();
    assert_eq!(controller.reset().await.unwrap(), Session::new());

    ready_to_pay(&controller).await;
    assert_eq!(controller.reset().await.unwrap(), Session::new());

    ready_to_pay(&controller).await;
    controller.confirm_payment().await.unwrap();
    assert_eq!(controller.reset().await.unwrap(), Session::new());
    assert_eq!(controller.snapshot().await, Session::new());
}

#[tokio::test]
async fn new_photo_during_generation_discards_stale_result() {
    let gate = Arc::new(Notify::new());
    let editor = FakeEditor::gated(gate.clone(), enhanced(9));
    let controller = Arc::new(WorkflowController::new(services(FakeClassifier::replying(ACCEPTED), editor)));
    ready_to_pay(&controller).await;

    let task = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.confirm_payment().await })
    };
    wait_for_stage(&controller, Stage::Generating).await;

    let fresh = controller.select_image(photo("burger.jpg")).await.unwrap();
    assert_eq!(fresh.stage(), Stage::ImageSelected);
    gate.notify_one();

    let outcome = task.await.unwrap();
    assert!(matches!(outcome, Err(AppError::Superseded)));
    let session = controller.snapshot().await;
    assert_eq!(session.stage(), Stage::ImageSelected);
    assert!(session.result().is_none());
    assert_eq!(session.source().unwrap().file_name.as_deref(), Some("burger.jpg"));
}

#[tokio::test]
async fn selecting_new_photo_after_completion_clears_payment() {
    let editor = FakeEditor::with_replies(vec![Some(enhanced(1))]);
    let controller = WorkflowController::new(services(FakeClassifier::replying(ACCEPTED), editor));
    ready_to_pay(&controller).await;
    controller.confirm_payment().await.unwrap();

    let session = controller.select_image(photo("other.jpg")).await.unwrap();
    assert_eq!(session.stage(), Stage::ImageSelected);
    assert_eq!(session.payment_status(), PaymentStatus::Idle);
    assert!(session.result().is_none());
    assert!(session.receipt().is_none());
    assert_eq!(session.source().unwrap().image, ImageData::new("image/jpeg", vec![0xff, 0xd8, 0xff, 0xe0]));
}

#[tokio::test]
async fn accepted_payment_goes_straight_from_validating_to_generating() {
    let verify_gate = Arc::new(Notify::new());
    let edit_gate = Arc::new(Notify::new());
    let editor = FakeEditor::gated(edit_gate.clone(), enhanced(4));
    let classifier = FakeClassifier::gated(verify_gate.clone(), ACCEPTED);
    let controller = Arc::new(WorkflowController::new(services(classifier, editor.clone())));
    ready_to_pay(&controller).await;

    let task = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.confirm_payment().await })
    };
    wait_for_stage(&controller, Stage::PaymentValidating).await;
    verify_gate.notify_one();

    let mut seen = Vec::new();
    for _ in 0..1000 {
        let stage = controller.snapshot().await.stage();
        seen.push(stage);
        if stage != Stage::PaymentValidating {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert!(!seen.contains(&Stage::Paid), "observed {:?}", seen);
    assert_eq!(seen.last(), Some(&Stage::Generating));

    // a second generate request cannot take over the paid session
    assert!(matches!(
        controller.generate().await,
        Err(AppError::InvalidTransition { stage: Stage::Generating, .. })
    ));

    edit_gate.notify_one();
    let session = task.await.unwrap().unwrap();
    assert_eq!(session.stage(), Stage::Complete);
    assert_eq!(session.result().unwrap().image_url, enhanced(4).to_data_url());
    assert_eq!(editor.prompts().len(), 1);
}
