//! Simulation generation: prompt construction and image extraction.

use base64::{Engine as _, engine::general_purpose};

use crate::ai::SimulationRequest;
use crate::ai::wire::{ErrorEnvelope, GenerateContentResponse};
use crate::error::{AiStage, ConsultError, ConsultResult};
use crate::model::{CameraAngle, PatientMetrics, RenderStyle};

/// Volume the rendering should visibly convey. Generated images tend to
/// understate size, so the prompt asks for a slightly larger visual impact.
pub fn visual_volume(metrics: &PatientMetrics, volume: u32) -> u32 {
    let current = metrics.current_size.to_lowercase();
    let multiplier = if current.contains("phẳng") || current.contains("lép") || current.contains("flat") {
        1.15
    } else {
        1.2
    };
    (volume as f64 * multiplier).round() as u32
}

fn angle_instruction(angle: CameraAngle) -> &'static str {
    match angle {
        CameraAngle::Front => "View: Frontal view (0 degrees).",
        CameraAngle::LeftProfile => "View: Left Profile (90 degrees).",
        CameraAngle::RightProfile => "View: Right Profile (90 degrees).",
    }
}

fn style_instruction(style: RenderStyle) -> &'static str {
    match style {
        RenderStyle::Photorealistic => {
            "Style: Photorealistic Medical Simulation. High Definition. Create visible size difference."
        }
        RenderStyle::Wireframe => {
            "Style: Blue holographic wireframe on dark background. Medical anatomical diagram showing implant placement."
        }
    }
}

pub fn build_prompt(request: &SimulationRequest<'_>) -> String {
    let volume = request.option.volume;
    format!(
        "TASK: Generate a Post-Operative Clinical Simulation.\n\
         TRANSFORMATION: Breast Augmentation with {volume}cc implants, target {cup} \
         (Visual impact: {visual}cc).\n\
         {angle}\n\
         {style}\n\
         Ensure the breast shape is round and full.",
        volume = volume,
        cup = request.option.cup_size,
        visual = visual_volume(request.metrics, volume),
        angle = angle_instruction(request.angle),
        style = style_instruction(request.style),
    )
}

/// Decode the first inline image of a response.
pub fn extract_image(response: &GenerateContentResponse) -> ConsultResult<Vec<u8>> {
    if let Some(inline) = response.first_inline_data().filter(|d| !d.data.is_empty()) {
        return general_purpose::STANDARD.decode(inline.data.trim()).map_err(|e| {
            ConsultError::malformed_response(AiStage::Simulation, format!("image is not base64: {}", e))
        });
    }
    if response.is_safety_blocked() {
        return Err(ConsultError::safety_block(AiStage::Simulation));
    }
    Err(ConsultError::empty_response(AiStage::Simulation))
}

/// Shorten upstream messages that arrive as a serialized error envelope.
pub fn clean_upstream_message(message: &str) -> String {
    let trimmed = message.trim();
    if trimmed.starts_with('{') {
        if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(trimmed) {
            if !envelope.error.message.is_empty() {
                return envelope.error.message;
            }
        }
    }
    trimmed.to_string()
}

/// Apply [`clean_upstream_message`] to API errors on the simulation path.
pub fn clean_error(error: ConsultError) -> ConsultError {
    match error {
        ConsultError::Api {
            service,
            status,
            message,
            context,
        } => ConsultError::Api {
            service,
            status,
            message: clean_upstream_message(&message),
            context,
        },
        other => other,
    }
}
