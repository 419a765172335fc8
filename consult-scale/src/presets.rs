// SPDX-License-Identifier: MIT
//! # Scale Plans and Upload Presets
//!
//! Computes the output canvas for a photo given a cap on its longest side.
//! The factor is `min(cap / w, cap / h)` when either side exceeds the cap and
//! `1.0` otherwise; resulting dimensions are rounded to the nearest integer
//! and clamped to at least 1px.

/// A 2D size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

impl Size {
    pub fn long_side(self) -> u32 {
        self.w.max(self.h)
    }
}

/// Complete scaling plan computed from input parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScalePlan {
    /// Original input dimensions
    pub input: Size,
    /// Cap applied to the longest side
    pub max_long_side: u32,
    /// Scale factor applied to both axes (1.0 when no downscale is needed)
    pub factor: f64,
    /// Final computed output dimensions
    pub out: Size,
}

impl ScalePlan {
    /// Whether the plan leaves the pixel grid untouched.
    pub fn is_identity(&self) -> bool {
        self.out == self.input
    }

    /// Byte length of a tightly packed RGB8 output buffer.
    pub fn out_len(&self) -> usize {
        (self.out.w as usize) * (self.out.h as usize) * 3
    }
}

/// Compute a scaling plan that fits `input` under `max_long_side`.
///
/// Never upscales. A zero cap is treated as 1px.
pub fn build_plan(input: Size, max_long_side: u32) -> ScalePlan {
    let cap = max_long_side.max(1);
    let (w, h) = (input.w.max(1) as f64, input.h.max(1) as f64);

    let factor = if input.w > cap || input.h > cap {
        (cap as f64 / w).min(cap as f64 / h)
    } else {
        1.0
    };

    let out = if factor < 1.0 {
        Size {
            w: ((w * factor).round() as u32).clamp(1, cap),
            h: ((h * factor).round() as u32).clamp(1, cap),
        }
    } else {
        input
    };

    ScalePlan {
        input,
        max_long_side: cap,
        factor,
        out,
    }
}

/// Longest-side caps for photos sent to the image model.
///
/// `Standard` matches the limit the flash-image models handle reliably;
/// the others trade payload size against detail.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum UploadPreset {
    /// 768px longest side, smallest payload
    #[clap(name = "compact")]
    Compact768,
    /// 1024px longest side
    #[default]
    #[clap(name = "standard")]
    Standard1024,
    /// 1536px longest side, for models that accept larger inputs
    #[clap(name = "detailed")]
    Detailed1536,
}

impl UploadPreset {
    pub fn max_long_side(self) -> u32 {
        match self {
            UploadPreset::Compact768 => 768,
            UploadPreset::Standard1024 => 1024,
            UploadPreset::Detailed1536 => 1536,
        }
    }
}
