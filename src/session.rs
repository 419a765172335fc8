//! # Consultation Session
//!
//! One patient consultation: submit metrics and a photo, receive two volume
//! options, then request simulations into the 12-slot cache.
//!
//! ## State machine
//!
//! ```text
//! Idle ──submit──▶ Analyzing ──ok──▶ Complete
//!                      │
//!                      └──err──▶ Failed(message)
//! ```
//!
//! A new submission (or [`ConsultationSession::reset`]) discards the previous
//! analysis and every cached simulation.
//!
//! ## Single generation in flight
//!
//! Simulations are serialized by one in-flight flag owned by the session. A
//! second request while one is pending fails fast with
//! [`ConsultError::Busy`](crate::error::ConsultError::Busy) and never reaches
//! the network. The first request still lands in its own slot.
//!
//! All methods take `&self`; the session can be shared behind an `Arc`.
//! Interior locks are never held across an await.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::ai::recommendation::recommend_with_fallback;
use crate::ai::{AiService, GeminiClient, SimulationRequest};
use crate::cache::{SimulationCache, SlotState};
use crate::config::ConsultConfig;
use crate::error::{ConsultError, ConsultResult};
use crate::model::{AnalysisResult, CameraAngle, OptionId, PatientMetrics, RenderStyle, SlotKey};
use crate::processing::{ImagePreprocessor, PreparedImage};

/// Lifecycle of the recommendation request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Analyzing,
    Complete,
    /// Localized message of the failure
    Failed(String),
}

impl SessionState {
    fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Analyzing => "analyzing",
            SessionState::Complete => "complete",
            SessionState::Failed(_) => "failed",
        }
    }
}

#[derive(Default)]
struct Inner {
    state: SessionState,
    metrics: Option<PatientMetrics>,
    image: Option<Arc<PreparedImage>>,
    result: Option<AnalysisResult>,
    cache: SimulationCache,
}

/// Releases the in-flight flag on every exit path.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Rolls back the bookkeeping of a request whose future is dropped before it
/// completes: an analysis returns the session to idle, a simulation reverts
/// its slot to absent. Both only apply while `epoch` is still current.
struct CancelGuard<'a> {
    session: &'a ConsultationSession,
    epoch: u64,
    slot: Option<SlotKey>,
    armed: bool,
}

impl<'a> CancelGuard<'a> {
    fn analysis(session: &'a ConsultationSession, epoch: u64) -> Self {
        Self {
            session,
            epoch,
            slot: None,
            armed: true,
        }
    }

    fn simulation(session: &'a ConsultationSession, epoch: u64, key: SlotKey) -> Self {
        Self {
            session,
            epoch,
            slot: Some(key),
            armed: true,
        }
    }

    /// The request reached its own completion handling.
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for CancelGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut inner = self.session.lock();
        match self.slot {
            Some(key) => {
                if inner.cache.clear(key, self.epoch) {
                    info!(slot = %key, "simulation cancelled; slot cleared");
                }
            }
            None => {
                if inner.state == SessionState::Analyzing && inner.cache.epoch() == self.epoch {
                    inner.state = SessionState::Idle;
                    info!("analysis cancelled");
                }
            }
        }
    }
}

/// Orchestrates preprocessing, recommendation and simulation for one patient.
pub struct ConsultationSession {
    ai: Arc<dyn AiService>,
    preprocessor: Mutex<ImagePreprocessor>,
    allow_placeholder: bool,
    generating: AtomicBool,
    inner: Mutex<Inner>,
}

impl ConsultationSession {
    /// Create a new session using the builder pattern.
    pub fn builder() -> ConsultationSessionBuilder {
        ConsultationSessionBuilder::new()
    }

    /// Session wired to the REST AI client described by `config`.
    pub fn from_config(config: &ConsultConfig) -> ConsultResult<Self> {
        let ai = GeminiClient::from_config(config)?;
        if !ai.has_api_key() {
            warn!("no AI API key configured; recommendations will use demo data");
        }
        Self::builder()
            .with_ai(Arc::new(ai))
            .with_preprocessor(ImagePreprocessor::new(config.max_image_dim, config.jpeg_quality))
            .allow_placeholder(config.placeholder_on_quota)
            .build()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> SessionState {
        self.lock().state.clone()
    }

    pub fn result(&self) -> Option<AnalysisResult> {
        self.lock().result.clone()
    }

    pub fn metrics(&self) -> Option<PatientMetrics> {
        self.lock().metrics.clone()
    }

    /// The preprocessed photo of the current submission.
    pub fn prepared_image(&self) -> Option<Arc<PreparedImage>> {
        self.lock().image.clone()
    }

    pub fn slot(&self, key: SlotKey) -> SlotState {
        self.lock().cache.get(key).clone()
    }

    /// Every slot with its state, option-major.
    pub fn slots(&self) -> Vec<(SlotKey, SlotState)> {
        self.lock()
            .cache
            .iter()
            .map(|(key, state)| (key, state.clone()))
            .collect()
    }

    /// Whether a simulation is currently in flight.
    pub fn is_generating(&self) -> bool {
        self.generating.load(Ordering::Acquire)
    }

    /// Discard the analysis and every cached simulation.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.state = SessionState::Idle;
        inner.metrics = None;
        inner.image = None;
        inner.result = None;
        inner.cache.reset();
        debug!("session reset");
    }

    /// Validate, preprocess and request a recommendation.
    ///
    /// Replaces any previous result and clears the simulation cache before the
    /// request is sent. Every failure also lands in [`SessionState::Failed`].
    pub async fn submit(
        &self,
        metrics: PatientMetrics,
        photo: &[u8],
    ) -> ConsultResult<AnalysisResult> {
        let epoch = {
            let mut inner = self.lock();
            if inner.state == SessionState::Analyzing {
                return Err(ConsultError::state(
                    inner.state.name(),
                    "submit",
                    "a recommendation is already being prepared",
                ));
            }
            inner.state = SessionState::Analyzing;
            inner.metrics = None;
            inner.image = None;
            inner.result = None;
            inner.cache.reset();
            inner.cache.epoch()
        };

        let cancel = CancelGuard::analysis(self, epoch);
        let outcome = self.analyze(&metrics, photo).await;
        cancel.disarm();

        let mut inner = self.lock();
        match outcome {
            Ok((image, result)) => {
                info!(
                    option1 = result.option1.volume,
                    option2 = result.option2.volume,
                    placeholder = result.is_placeholder(),
                    "analysis complete"
                );
                inner.state = SessionState::Complete;
                inner.metrics = Some(metrics);
                inner.image = Some(Arc::new(image));
                inner.result = Some(result.clone());
                Ok(result)
            }
            Err(error) => {
                warn!(category = error.category(), %error, "analysis failed");
                inner.state = SessionState::Failed(error.user_message());
                Err(error)
            }
        }
    }

    async fn analyze(
        &self,
        metrics: &PatientMetrics,
        photo: &[u8],
    ) -> ConsultResult<(PreparedImage, AnalysisResult)> {
        metrics.validate()?;
        let image = self
            .preprocessor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .preprocess(photo)?;
        debug!(
            width = image.size.w,
            height = image.size.h,
            bytes = image.bytes.len(),
            "photo preprocessed"
        );
        let result =
            recommend_with_fallback(self.ai.as_ref(), metrics, &image, self.allow_placeholder)
                .await?;
        Ok((image, result))
    }

    /// Generate one simulation into its slot and return the image bytes.
    ///
    /// Always issues a fresh request; an existing image in the slot is
    /// overwritten on success and dropped on failure.
    pub async fn generate_simulation(
        &self,
        option: OptionId,
        style: RenderStyle,
        angle: CameraAngle,
    ) -> ConsultResult<Vec<u8>> {
        let key = SlotKey::new(option, style, angle);
        let Some(_guard) = InFlightGuard::acquire(&self.generating) else {
            info!(slot = %key, "simulation rejected: another is in flight");
            return Err(ConsultError::busy(format!("simulate {}", key)));
        };

        let (metrics, volume_option, image, epoch) = {
            let mut inner = self.lock();
            let (Some(metrics), Some(image), Some(result)) =
                (&inner.metrics, &inner.image, &inner.result)
            else {
                return Err(ConsultError::state(
                    inner.state.name(),
                    "simulate",
                    "no analysis result yet",
                ));
            };
            let prepared = (
                metrics.clone(),
                result.option(option).clone(),
                Arc::clone(image),
                inner.cache.epoch(),
            );
            inner.cache.mark_pending(key);
            prepared
        };

        info!(
            slot = %key,
            volume = volume_option.volume,
            style = style.tag(),
            angle = angle.tag(),
            "requesting simulation"
        );
        let request = SimulationRequest {
            metrics: &metrics,
            option: &volume_option,
            image: &image,
            style,
            angle,
        };
        let cancel = CancelGuard::simulation(self, epoch, key);
        let outcome = self.ai.simulate(&request).await;
        cancel.disarm();

        let mut inner = self.lock();
        match outcome {
            Ok(bytes) => {
                if !inner.cache.fill(key, epoch, bytes.clone()) {
                    debug!(slot = %key, "session reset during generation; result dropped");
                }
                Ok(bytes)
            }
            Err(error) => {
                inner.cache.clear(key, epoch);
                warn!(slot = %key, category = error.category(), %error, "simulation failed");
                Err(error)
            }
        }
    }
}

/// Builder for [`ConsultationSession`].
pub struct ConsultationSessionBuilder {
    ai: Option<Arc<dyn AiService>>,
    preprocessor: Option<ImagePreprocessor>,
    allow_placeholder: bool,
}

impl Default for ConsultationSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsultationSessionBuilder {
    pub fn new() -> Self {
        Self {
            ai: None,
            preprocessor: None,
            allow_placeholder: true,
        }
    }

    pub fn with_ai(mut self, ai: Arc<dyn AiService>) -> Self {
        self.ai = Some(ai);
        self
    }

    /// Defaults to a 1024 px cap at quality 85.
    pub fn with_preprocessor(mut self, preprocessor: ImagePreprocessor) -> Self {
        self.preprocessor = Some(preprocessor);
        self
    }

    /// Whether quota exhaustion or a missing key yields demo data.
    pub fn allow_placeholder(mut self, allow: bool) -> Self {
        self.allow_placeholder = allow;
        self
    }

    pub fn build(self) -> ConsultResult<ConsultationSession> {
        let ai = self
            .ai
            .ok_or_else(|| ConsultError::config("ai", "", "an AI service is required"))?;
        Ok(ConsultationSession {
            ai,
            preprocessor: Mutex::new(self.preprocessor.unwrap_or_default()),
            allow_placeholder: self.allow_placeholder,
            generating: AtomicBool::new(false),
            inner: Mutex::new(Inner::default()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_requires_ai() {
        let err = ConsultationSession::builder().build().err().unwrap();
        assert_eq!(err.category(), "config");
    }

    #[test]
    fn guard_is_exclusive_and_released_on_drop() {
        let flag = AtomicBool::new(false);
        let first = InFlightGuard::acquire(&flag);
        assert!(first.is_some());
        assert!(InFlightGuard::acquire(&flag).is_none());
        drop(first);
        assert!(InFlightGuard::acquire(&flag).is_some());
    }

    #[test]
    fn state_names_are_stable() {
        assert_eq!(SessionState::default().name(), "idle");
        assert_eq!(SessionState::Failed("x".into()).name(), "failed");
    }
}
