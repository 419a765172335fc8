//! # Consultation Data Model
//!
//! Patient metrics captured at submission, the AI's analysis, and the tags
//! that address one simulation slot. Field names follow the JSON the AI
//! service is asked to produce (`camelCase`).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ConsultError, ConsultResult};

/// Aesthetic goal selected by the patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum DesiredLook {
    Natural,
    Full,
    Dramatic,
}

impl DesiredLook {
    /// Label shown to users and sent to the model.
    pub fn label(self) -> &'static str {
        match self {
            DesiredLook::Natural => "Tự nhiên (Natural)",
            DesiredLook::Full => "Đầy đặn (Full)",
            DesiredLook::Dramatic => "Quyến rũ / Lớn (Dramatic)",
        }
    }
}

impl fmt::Display for DesiredLook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Immutable snapshot of the form at submission time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientMetrics {
    /// cm
    pub height: f64,
    /// kg
    pub weight: f64,
    /// years
    pub age: u32,
    /// Breast base width, cm
    pub breast_width: f64,
    pub current_size: String,
    pub desired_look: DesiredLook,
}

impl PatientMetrics {
    /// Reject values no form would accept. Bounds are generous; they only
    /// catch unit mistakes and empty fields.
    pub fn validate(&self) -> ConsultResult<()> {
        check_range("height", self.height, 100.0, 230.0)?;
        check_range("weight", self.weight, 25.0, 250.0)?;
        check_range("breastWidth", self.breast_width, 5.0, 25.0)?;
        if !(16..=90).contains(&self.age) {
            return Err(ConsultError::validation("age", "must be between 16 and 90", self.age.to_string()));
        }
        if self.current_size.trim().is_empty() {
            return Err(ConsultError::validation("currentSize", "must not be empty", ""));
        }
        Ok(())
    }
}

fn check_range(field: &str, value: f64, min: f64, max: f64) -> ConsultResult<()> {
    if !value.is_finite() || value < min || value > max {
        return Err(ConsultError::validation(
            field,
            format!("must be between {} and {}", min, max),
            value.to_string(),
        ));
    }
    Ok(())
}

/// One implant size suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeOption {
    /// cc
    pub volume: u32,
    pub cup_size: String,
    pub style: String,
}

/// Where an [`AnalysisResult`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Produced by the model for this submission.
    #[default]
    Model,
    /// Canned demo data substituted because the model was unavailable.
    /// Never authoritative.
    Placeholder,
}

/// The model's answer: exactly two options plus three narratives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub option1: VolumeOption,
    pub option2: VolumeOption,
    pub body_analysis: String,
    pub reasoning: String,
    pub implants_type_suggestion: String,
    #[serde(default)]
    pub provenance: Provenance,
}

impl AnalysisResult {
    pub fn is_placeholder(&self) -> bool {
        self.provenance == Provenance::Placeholder
    }

    pub fn option(&self, id: OptionId) -> &VolumeOption {
        match id {
            OptionId::First => &self.option1,
            OptionId::Second => &self.option2,
        }
    }
}

/// Which of the two suggested options a simulation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum OptionId {
    First,
    Second,
}

impl OptionId {
    pub const ALL: [OptionId; 2] = [OptionId::First, OptionId::Second];

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// Output mode for a generated image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum RenderStyle {
    Photorealistic,
    Wireframe,
}

impl RenderStyle {
    pub const ALL: [RenderStyle; 2] = [RenderStyle::Photorealistic, RenderStyle::Wireframe];

    /// Tag understood by the simulation call.
    pub fn tag(self) -> &'static str {
        match self {
            RenderStyle::Photorealistic => "realistic",
            RenderStyle::Wireframe => "3d-mesh",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// Fixed camera viewpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum CameraAngle {
    Front,
    LeftProfile,
    RightProfile,
}

impl CameraAngle {
    pub const ALL: [CameraAngle; 3] = [
        CameraAngle::Front,
        CameraAngle::LeftProfile,
        CameraAngle::RightProfile,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            CameraAngle::Front => "front",
            CameraAngle::LeftProfile => "side-left",
            CameraAngle::RightProfile => "side-right",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// Address of one simulation slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotKey {
    pub option: OptionId,
    pub style: RenderStyle,
    pub angle: CameraAngle,
}

impl SlotKey {
    pub fn new(option: OptionId, style: RenderStyle, angle: CameraAngle) -> Self {
        Self { option, style, angle }
    }

    /// Every key, option-major.
    pub fn all() -> impl Iterator<Item = SlotKey> {
        OptionId::ALL.into_iter().flat_map(|option| {
            RenderStyle::ALL.into_iter().flat_map(move |style| {
                CameraAngle::ALL
                    .into_iter()
                    .map(move |angle| SlotKey::new(option, style, angle))
            })
        })
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let option = match self.option {
            OptionId::First => "option1",
            OptionId::Second => "option2",
        };
        write!(f, "{}/{}/{}", option, self.style.tag(), self.angle.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_metrics() -> PatientMetrics {
        PatientMetrics {
            height: 160.0,
            weight: 50.0,
            age: 25,
            breast_width: 11.5,
            current_size: "Cup A".to_string(),
            desired_look: DesiredLook::Natural,
        }
    }

    #[test]
    fn scenario_metrics_are_valid() {
        assert!(scenario_metrics().validate().is_ok());
    }

    #[test]
    fn out_of_range_metrics_are_rejected() {
        let mut m = scenario_metrics();
        m.height = 16.0;
        assert_eq!(m.validate().unwrap_err().category(), "validation");

        let mut m = scenario_metrics();
        m.breast_width = f64::NAN;
        assert!(m.validate().is_err());

        let mut m = scenario_metrics();
        m.current_size = "  ".into();
        assert!(m.validate().is_err());
    }

    #[test]
    fn result_parses_from_camel_case_without_provenance() {
        let json = r#"{
            "option1": {"volume": 275, "cupSize": "B", "style": "Natural"},
            "option2": {"volume": 325, "cupSize": "C", "style": "Full"},
            "bodyAnalysis": "a", "reasoning": "b", "implantsTypeSuggestion": "c"
        }"#;
        let result: AnalysisResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.option(OptionId::Second).volume, 325);
        assert!(!result.is_placeholder());
    }

    #[test]
    fn twelve_distinct_slots() {
        let keys: std::collections::HashSet<_> = SlotKey::all().collect();
        assert_eq!(keys.len(), 12);
    }

    #[test]
    fn slot_key_display_uses_wire_tags() {
        let key = SlotKey::new(OptionId::Second, RenderStyle::Wireframe, CameraAngle::LeftProfile);
        assert_eq!(key.to_string(), "option2/3d-mesh/side-left");
    }
}
