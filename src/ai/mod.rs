//! # AI Service
//!
//! The two calls the consultation makes to the multimodal model:
//!
//! - **recommendation**: metrics + photo in, two volume options and three
//!   narratives out ([`recommendation`])
//! - **simulation**: one option, style and camera angle in, one generated
//!   image out ([`simulation`])
//!
//! [`AiService`] is the seam the session talks to. [`GeminiClient`] is the
//! REST implementation; tests substitute their own.

use async_trait::async_trait;

use crate::error::ConsultResult;
use crate::model::{AnalysisResult, CameraAngle, PatientMetrics, RenderStyle, VolumeOption};
use crate::processing::PreparedImage;

pub mod client;
pub mod recommendation;
pub mod simulation;
pub mod wire;

pub use client::GeminiClient;

/// Everything one simulation call needs.
#[derive(Debug, Clone, Copy)]
pub struct SimulationRequest<'a> {
    pub metrics: &'a PatientMetrics,
    pub option: &'a VolumeOption,
    pub image: &'a PreparedImage,
    pub style: RenderStyle,
    pub angle: CameraAngle,
}

/// Remote model used by a consultation session.
///
/// Implementations make exactly one attempt per call.
#[async_trait]
pub trait AiService: Send + Sync {
    async fn recommend(
        &self,
        metrics: &PatientMetrics,
        image: &PreparedImage,
    ) -> ConsultResult<AnalysisResult>;

    /// Returns encoded image bytes.
    async fn simulate(&self, request: &SimulationRequest<'_>) -> ConsultResult<Vec<u8>>;
}
