//! End-to-end consultation flow against a scripted AI service.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use assert_matches::assert_matches;
use tokio::time::timeout;

use common::{Gate, ScriptedAi, png, scenario_metrics};
use implant_consult::model::{CameraAngle, OptionId, RenderStyle, SlotKey};
use implant_consult::{ConsultationSession, SessionState, SlotState};

fn session_with(ai: Arc<ScriptedAi>) -> ConsultationSession {
    ConsultationSession::builder()
        .with_ai(ai)
        .build()
        .expect("session")
}

#[tokio::test]
async fn scenario_submission_produces_two_ordered_options() {
    let ai = Arc::new(ScriptedAi::answering());
    let session = session_with(ai.clone());
    assert_eq!(session.state(), SessionState::Idle);

    let result = session
        .submit(scenario_metrics(), &png(1600, 1200))
        .await
        .expect("analysis");

    assert_eq!(session.state(), SessionState::Complete);
    assert!(result.option1.volume > 0);
    assert!(result.option1.volume < result.option2.volume);
    assert!(!result.body_analysis.is_empty());
    assert!(!result.reasoning.is_empty());
    assert!(!result.implants_type_suggestion.is_empty());
    assert!(!result.is_placeholder());
    assert_eq!(session.result(), Some(result));

    let image = session.prepared_image().expect("prepared image");
    assert_eq!(image.size.w, 1024);
    assert_eq!(image.size.h, 768);
    assert_eq!(ai.recommend_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn quota_exhaustion_falls_back_to_flagged_placeholder() {
    let session = session_with(Arc::new(ScriptedAi::out_of_quota()));

    let result = session
        .submit(scenario_metrics(), &png(64, 64))
        .await
        .expect("placeholder");

    assert!(result.is_placeholder());
    assert_eq!(result.option1.volume, 300);
    assert_eq!(result.option2.volume, 350);
    assert_eq!(session.state(), SessionState::Complete);
}

#[tokio::test]
async fn quota_exhaustion_fails_when_placeholder_disabled() {
    let session = ConsultationSession::builder()
        .with_ai(Arc::new(ScriptedAi::out_of_quota()))
        .allow_placeholder(false)
        .build()
        .unwrap();

    let err = session
        .submit(scenario_metrics(), &png(64, 64))
        .await
        .unwrap_err();

    assert!(err.is_quota());
    assert_matches!(session.state(), SessionState::Failed(message) if !message.is_empty());
    assert!(session.result().is_none());
}

#[tokio::test]
async fn undecodable_photo_fails_before_any_request() {
    let ai = Arc::new(ScriptedAi::answering());
    let session = session_with(ai.clone());

    let err = session
        .submit(scenario_metrics(), b"definitely not an image")
        .await
        .unwrap_err();

    assert_eq!(err.category(), "image_decode");
    assert_matches!(session.state(), SessionState::Failed(_));
    assert_eq!(ai.recommend_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn invalid_metrics_are_rejected() {
    let ai = Arc::new(ScriptedAi::answering());
    let session = session_with(ai.clone());
    let mut metrics = scenario_metrics();
    metrics.height = 16.0;

    let err = session.submit(metrics, &png(64, 64)).await.unwrap_err();

    assert_eq!(err.category(), "validation");
    assert_eq!(ai.recommend_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn simulation_before_analysis_is_a_state_error() {
    let session = session_with(Arc::new(ScriptedAi::answering()));

    let err = session
        .generate_simulation(OptionId::First, RenderStyle::Photorealistic, CameraAngle::Front)
        .await
        .unwrap_err();

    assert_eq!(err.category(), "state");
    assert!(!session.is_generating());
}

#[tokio::test]
async fn second_generation_is_rejected_while_one_is_pending() {
    let gate = Arc::new(Gate::default());
    let ai = Arc::new(ScriptedAi::answering().gated(gate.clone()));
    let session = session_with(ai.clone());
    session.submit(scenario_metrics(), &png(64, 64)).await.unwrap();

    let first_key = SlotKey::new(OptionId::First, RenderStyle::Photorealistic, CameraAngle::Front);
    let second_key = SlotKey::new(OptionId::Second, RenderStyle::Wireframe, CameraAngle::LeftProfile);

    let first = session.generate_simulation(first_key.option, first_key.style, first_key.angle);
    let contender = async {
        gate.started.notified().await;
        assert!(session.is_generating());
        assert_eq!(session.slot(first_key), SlotState::Pending);

        let rejected = session
            .generate_simulation(second_key.option, second_key.style, second_key.angle)
            .await;
        gate.release.notify_one();
        rejected
    };
    let (first, rejected) = tokio::join!(first, contender);

    assert_eq!(rejected.unwrap_err().category(), "busy");
    assert_eq!(session.slot(second_key), SlotState::Absent);

    let bytes = first.expect("first simulation");
    assert_eq!(bytes, b"275cc/realistic/front".to_vec());
    assert_eq!(session.slot(first_key), SlotState::Ready(bytes));
    assert!(!session.is_generating());
    assert_eq!(ai.simulate_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_simulation_leaves_slot_absent() {
    let ai = Arc::new(ScriptedAi::answering());
    let session = session_with(ai.clone());
    session.submit(scenario_metrics(), &png(64, 64)).await.unwrap();
    let key = SlotKey::new(OptionId::Second, RenderStyle::Photorealistic, CameraAngle::RightProfile);

    session
        .generate_simulation(key.option, key.style, key.angle)
        .await
        .unwrap();
    assert!(session.slot(key).is_ready());

    ai.set_fail_simulations(true);
    let err = session
        .generate_simulation(key.option, key.style, key.angle)
        .await
        .unwrap_err();

    assert_eq!(err.category(), "safety_block");
    assert_eq!(session.slot(key), SlotState::Absent);
    assert!(!session.is_generating());

    ai.set_fail_simulations(false);
    assert!(
        session
            .generate_simulation(key.option, key.style, key.angle)
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn slots_are_independent() {
    let session = session_with(Arc::new(ScriptedAi::answering()));
    session.submit(scenario_metrics(), &png(64, 64)).await.unwrap();

    let front = SlotKey::new(OptionId::First, RenderStyle::Photorealistic, CameraAngle::Front);
    let mesh = SlotKey::new(OptionId::First, RenderStyle::Wireframe, CameraAngle::Front);
    let other = SlotKey::new(OptionId::Second, RenderStyle::Photorealistic, CameraAngle::Front);

    session
        .generate_simulation(front.option, front.style, front.angle)
        .await
        .unwrap();
    session
        .generate_simulation(other.option, other.style, other.angle)
        .await
        .unwrap();

    assert_eq!(session.slot(front).image(), Some(&b"275cc/realistic/front"[..]));
    assert_eq!(session.slot(other).image(), Some(&b"325cc/realistic/front"[..]));
    assert_eq!(session.slot(mesh), SlotState::Absent);

    let ready = session.slots().into_iter().filter(|(_, s)| s.is_ready()).count();
    assert_eq!(ready, 2);
}

#[tokio::test]
async fn resubmission_clears_every_slot() {
    let session = session_with(Arc::new(ScriptedAi::answering()));
    session.submit(scenario_metrics(), &png(64, 64)).await.unwrap();
    for key in [
        SlotKey::new(OptionId::First, RenderStyle::Photorealistic, CameraAngle::Front),
        SlotKey::new(OptionId::Second, RenderStyle::Wireframe, CameraAngle::RightProfile),
    ] {
        session
            .generate_simulation(key.option, key.style, key.angle)
            .await
            .unwrap();
    }

    session.submit(scenario_metrics(), &png(64, 64)).await.unwrap();

    assert!(session.slots().iter().all(|(_, slot)| *slot == SlotState::Absent));
    assert_eq!(session.state(), SessionState::Complete);
}

#[tokio::test]
async fn result_landing_after_reset_is_discarded() {
    let gate = Arc::new(Gate::default());
    let session = session_with(Arc::new(ScriptedAi::answering().gated(gate.clone())));
    session.submit(scenario_metrics(), &png(64, 64)).await.unwrap();
    let key = SlotKey::new(OptionId::First, RenderStyle::Photorealistic, CameraAngle::Front);

    let generation = session.generate_simulation(key.option, key.style, key.angle);
    let resetter = async {
        gate.started.notified().await;
        session.reset();
        gate.release.notify_one();
    };
    let (bytes, ()) = tokio::join!(generation, resetter);

    assert!(bytes.is_ok());
    assert_eq!(session.slot(key), SlotState::Absent);
    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.result().is_none());
}

#[tokio::test(start_paused = true)]
async fn abandoned_analysis_returns_session_to_idle() {
    let ai = Arc::new(ScriptedAi::answering());
    let session = session_with(ai.clone());
    ai.set_stall_recommendations(true);

    let abandoned = timeout(
        Duration::from_millis(200),
        session.submit(scenario_metrics(), &png(64, 64)),
    )
    .await;

    assert!(abandoned.is_err());
    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.result().is_none());

    ai.set_stall_recommendations(false);
    let result = session.submit(scenario_metrics(), &png(64, 64)).await.unwrap();
    assert_eq!(result.option1.volume, 275);
    assert_eq!(session.state(), SessionState::Complete);
}

#[tokio::test(start_paused = true)]
async fn abandoned_simulation_reverts_slot_and_frees_gate() {
    let gate = Arc::new(Gate::default());
    let session = session_with(Arc::new(ScriptedAi::answering().gated(gate.clone())));
    session.submit(scenario_metrics(), &png(64, 64)).await.unwrap();
    let key = SlotKey::new(OptionId::First, RenderStyle::Wireframe, CameraAngle::RightProfile);

    let abandoned = timeout(
        Duration::from_millis(200),
        session.generate_simulation(key.option, key.style, key.angle),
    )
    .await;

    assert!(abandoned.is_err());
    assert_eq!(session.slot(key), SlotState::Absent);
    assert!(!session.is_generating());
    assert_eq!(session.state(), SessionState::Complete);

    gate.release.notify_one();
    let bytes = session
        .generate_simulation(key.option, key.style, key.angle)
        .await
        .unwrap();
    assert_eq!(session.slot(key), SlotState::Ready(bytes));
}
