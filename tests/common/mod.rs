//! Shared helpers for the integration tests: a scripted AI service, synthetic
//! photos and the reference patient.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use tokio::sync::Notify;

use implant_consult::model::{
    AnalysisResult, DesiredLook, PatientMetrics, Provenance, VolumeOption,
};
use implant_consult::processing::PreparedImage;
use implant_consult::{AiService, AiStage, ConsultError, ConsultResult, SimulationRequest};

/// 160 cm, 50 kg, 25 years, 11.5 cm base width, cup A, natural look.
pub fn scenario_metrics() -> PatientMetrics {
    PatientMetrics {
        height: 160.0,
        weight: 50.0,
        age: 25,
        breast_width: 11.5,
        current_size: "Cup A".to_string(),
        desired_look: DesiredLook::Natural,
    }
}

pub fn scenario_result() -> AnalysisResult {
    AnalysisResult {
        option1: VolumeOption {
            volume: 275,
            cup_size: "Cup B+".to_string(),
            style: "Tự nhiên".to_string(),
        },
        option2: VolumeOption {
            volume: 325,
            cup_size: "Cup C".to_string(),
            style: "Đầy đặn".to_string(),
        },
        body_analysis: "Khung ngực hẹp, mô mềm mỏng.".to_string(),
        reasoning: "Độ rộng chân ngực 11.5cm phù hợp 250-330cc.".to_string(),
        implants_type_suggestion: "Túi giọt nước, đặt dưới cơ.".to_string(),
        provenance: Provenance::Model,
    }
}

/// PNG of a solid color.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([200, 160, 140]));
    encode(DynamicImage::ImageRgb8(img), ImageFormat::Png)
}

/// Fully transparent PNG.
pub fn transparent_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
    encode(DynamicImage::ImageRgba8(img), ImageFormat::Png)
}

fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), format)
        .expect("encode test image");
    out
}

/// Payload the scripted service returns for a simulation request.
pub fn simulated_bytes(request: &SimulationRequest<'_>) -> Vec<u8> {
    format!(
        "{}cc/{}/{}",
        request.option.volume,
        request.style.tag(),
        request.angle.tag()
    )
    .into_bytes()
}

/// Pause point inside a simulation call.
#[derive(Default)]
pub struct Gate {
    pub started: Notify,
    pub release: Notify,
}

/// AI service with canned answers.
pub struct ScriptedAi {
    recommendation: Option<AnalysisResult>,
    stall_recommendations: AtomicBool,
    fail_simulations: AtomicBool,
    gate: Option<Arc<Gate>>,
    pub recommend_calls: AtomicUsize,
    pub simulate_calls: AtomicUsize,
}

impl ScriptedAi {
    /// Answers every recommendation with [`scenario_result`].
    pub fn answering() -> Self {
        Self::with_recommendation(Some(scenario_result()))
    }

    /// Every recommendation fails with quota exhaustion.
    pub fn out_of_quota() -> Self {
        Self::with_recommendation(None)
    }

    fn with_recommendation(recommendation: Option<AnalysisResult>) -> Self {
        Self {
            recommendation,
            stall_recommendations: AtomicBool::new(false),
            fail_simulations: AtomicBool::new(false),
            gate: None,
            recommend_calls: AtomicUsize::new(0),
            simulate_calls: AtomicUsize::new(0),
        }
    }

    /// Simulations signal `gate.started`, then wait for `gate.release`.
    pub fn gated(mut self, gate: Arc<Gate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// While set, recommendations never resolve.
    pub fn set_stall_recommendations(&self, stall: bool) {
        self.stall_recommendations.store(stall, Ordering::SeqCst);
    }

    pub fn set_fail_simulations(&self, fail: bool) {
        self.fail_simulations.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl AiService for ScriptedAi {
    async fn recommend(
        &self,
        _metrics: &PatientMetrics,
        _image: &PreparedImage,
    ) -> ConsultResult<AnalysisResult> {
        self.recommend_calls.fetch_add(1, Ordering::SeqCst);
        if self.stall_recommendations.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.recommendation.clone().ok_or_else(|| {
            ConsultError::quota_exhausted(AiStage::Recommendation, "RESOURCE_EXHAUSTED")
        })
    }

    async fn simulate(&self, request: &SimulationRequest<'_>) -> ConsultResult<Vec<u8>> {
        self.simulate_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.started.notify_one();
            gate.release.notified().await;
        }
        if self.fail_simulations.load(Ordering::SeqCst) {
            return Err(ConsultError::safety_block(AiStage::Simulation));
        }
        Ok(simulated_bytes(request))
    }
}
