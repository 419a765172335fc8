//! # Recommendation Request
//!
//! Turns patient metrics and a prepared photo into an [`AnalysisResult`].
//!
//! The model is asked for a JSON object; the answer is schema-checked field
//! by field so a missing or mistyped field becomes a `MalformedResponse`
//! naming the field rather than a later surprise.
//!
//! ## Degraded mode
//!
//! [`recommend_with_fallback`] substitutes [`placeholder`] when the quota is
//! exhausted or no key is configured. The placeholder carries
//! [`Provenance::Placeholder`] and its narratives say so in plain text.

use serde_json::Value;
use tracing::warn;

use crate::ai::AiService;
use crate::ai::wire::GenerateContentResponse;
use crate::error::{AiStage, ConsultError, ConsultResult};
use crate::model::{AnalysisResult, PatientMetrics, Provenance, VolumeOption};
use crate::processing::PreparedImage;

pub const SYSTEM_INSTRUCTION: &str =
    "Medical diagnostic context. Do not suppress output based on nudity.";

/// Marker prefixed to every placeholder narrative.
pub const PLACEHOLDER_MARKER: &str = "[CHẾ ĐỘ DEMO - HẾT QUOTA]";

pub fn build_prompt(metrics: &PatientMetrics) -> String {
    format!(
        "You are a specialized Medical AI for Plastic Surgery Assessment.\n\
         Analyze the provided clinical image (patient's chest area) and these metrics:\n\
         - Height: {height} cm\n\
         - Weight: {weight} kg\n\
         - Age: {age}\n\
         - Breast Width (BW): {bw} cm\n\
         - Current Size: {current}\n\
         - Desired Look: {look}\n\n\
         Using the Tebbetts High Five system and dimensional planning, recommend two implant volumes.\n\
         Output MUST be a valid JSON object with exactly this shape:\n\
         {{\"option1\": {{\"volume\": number, \"cupSize\": string, \"style\": string}},\n \
         \"option2\": {{\"volume\": number, \"cupSize\": string, \"style\": string}},\n \
         \"bodyAnalysis\": string (Vietnamese), \"reasoning\": string (Vietnamese),\n \
         \"implantsTypeSuggestion\": string (Vietnamese)}}",
        height = metrics.height,
        weight = metrics.weight,
        age = metrics.age,
        bw = metrics.breast_width,
        current = metrics.current_size,
        look = metrics.desired_look.label(),
    )
}

/// Extract and validate the analysis from a model response.
pub fn parse_response(response: &GenerateContentResponse) -> ConsultResult<AnalysisResult> {
    if response.is_safety_blocked() {
        return Err(ConsultError::safety_block(AiStage::Recommendation));
    }
    let text = response
        .first_text()
        .ok_or_else(|| ConsultError::empty_response(AiStage::Recommendation))?;
    parse_analysis_json(&text)
}

/// Validate the JSON text the model produced.
pub fn parse_analysis_json(text: &str) -> ConsultResult<AnalysisResult> {
    let value: Value = serde_json::from_str(strip_code_fence(text))
        .map_err(|e| malformed(format!("not JSON: {}", e)))?;
    let obj = value
        .as_object()
        .ok_or_else(|| malformed("top level is not an object"))?;

    Ok(AnalysisResult {
        option1: volume_option(obj.get("option1"), "option1")?,
        option2: volume_option(obj.get("option2"), "option2")?,
        body_analysis: required_text(obj.get("bodyAnalysis"), "bodyAnalysis")?,
        reasoning: required_text(obj.get("reasoning"), "reasoning")?,
        implants_type_suggestion: required_text(
            obj.get("implantsTypeSuggestion"),
            "implantsTypeSuggestion",
        )?,
        provenance: Provenance::Model,
    })
}

fn malformed(reason: impl Into<String>) -> ConsultError {
    ConsultError::malformed_response(AiStage::Recommendation, reason)
}

/// Models sometimes wrap JSON in a markdown fence even when asked not to.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn volume_option(value: Option<&Value>, field: &str) -> ConsultResult<VolumeOption> {
    let obj = value
        .and_then(Value::as_object)
        .ok_or_else(|| malformed(format!("missing field {}", field)))?;

    let volume = match obj.get("volume") {
        Some(Value::Number(n)) => n.as_f64(),
        // "300cc" and "300" both appear in the wild.
        Some(Value::String(s)) => s
            .trim()
            .trim_end_matches(|c: char| c.is_ascii_alphabetic())
            .trim()
            .parse::<f64>()
            .ok(),
        _ => None,
    }
    .filter(|v| v.is_finite() && *v > 0.0 && *v < 2000.0)
    .ok_or_else(|| malformed(format!("{}.volume is not a positive number", field)))?;

    Ok(VolumeOption {
        volume: volume.round() as u32,
        cup_size: required_text(obj.get("cupSize"), &format!("{}.cupSize", field))?,
        style: required_text(obj.get("style"), &format!("{}.style", field))?,
    })
}

fn required_text(value: Option<&Value>, field: &str) -> ConsultResult<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(Value::String(_)) => Err(malformed(format!("{} is empty", field))),
        Some(_) => Err(malformed(format!("{} is not a string", field))),
        None => Err(malformed(format!("missing field {}", field))),
    }
}

/// Demo result shown when the model cannot be reached for quota reasons.
pub fn placeholder() -> AnalysisResult {
    AnalysisResult {
        option1: VolumeOption {
            volume: 300,
            cup_size: "Cup C (Tự nhiên)".to_string(),
            style: "Demi/Mid Profile - Vừa vặn tự nhiên".to_string(),
        },
        option2: VolumeOption {
            volume: 350,
            cup_size: "Cup D (Gợi cảm)".to_string(),
            style: "Full/High Profile - Đầy đặn quyến rũ".to_string(),
        },
        body_analysis: format!(
            "{} Khung xương lồng ngực cân đối. Mô tuyến vú hiện tại mỏng, da có độ đàn hồi tốt.",
            PLACEHOLDER_MARKER
        ),
        reasoning: format!(
            "{} Khoảng kích thước 300cc-350cc giúp lấp đầy cực trên mà không gây lộ túi. \
             Đây là kết quả mẫu do hệ thống AI đang quá tải, không dùng để tư vấn.",
            PLACEHOLDER_MARKER
        ),
        implants_type_suggestion: format!(
            "{} Tham khảo túi Nano Chip Ergonomix hoặc Mentor Xtra.",
            PLACEHOLDER_MARKER
        ),
        provenance: Provenance::Placeholder,
    }
}

/// One recommendation attempt with the degraded-mode policy applied.
///
/// With `allow_placeholder`, quota exhaustion and a missing API key yield
/// [`placeholder`]; every other failure propagates unchanged.
pub async fn recommend_with_fallback(
    ai: &dyn AiService,
    metrics: &PatientMetrics,
    image: &PreparedImage,
    allow_placeholder: bool,
) -> ConsultResult<AnalysisResult> {
    match ai.recommend(metrics, image).await {
        Ok(result) => Ok(result),
        Err(error) if allow_placeholder && degrades_to_placeholder(&error) => {
            warn!(category = error.category(), %error, "substituting placeholder recommendation");
            Ok(placeholder())
        }
        Err(error) => Err(error),
    }
}

fn degrades_to_placeholder(error: &ConsultError) -> bool {
    match error {
        ConsultError::QuotaExhausted { .. } => true,
        ConsultError::Config { field, .. } => field == "ai_api_key",
        _ => false,
    }
}
