// SPDX-License-Identifier: MIT
//! # consult-scale: Bounded Photo Scaling for Multimodal Model Input
//!
//! This crate turns an already-decoded consultation photo into the payload a
//! size- and format-sensitive image model accepts: longest side clamped to a
//! fixed cap, transparency flattened onto an opaque background, re-encoded as
//! baseline JPEG at a fixed quality.
//!
//! ## Key Components
//!
//! - [`presets`]: Scale plan computation and the upload dimension presets
//! - [`cpu`]: CPU scaling built on fast_image_resize (SIMD accelerated)
//! - [`encode`]: Alpha flattening and JPEG encoding
//!
//! ## Invariants
//!
//! - Never upscales: inputs already within the cap keep their dimensions
//! - Aspect ratio is preserved within integer rounding
//! - Running the pipeline on its own output yields the same dimensions
//!
//! ## Usage Example
//!
//! ```rust
//! use consult_scale::{cpu::scale_rgb_cpu, encode, presets::{build_plan, Size}};
//!
//! let input = Size { w: 2048, h: 1536 };
//! let rgba = vec![255u8; (input.w * input.h * 4) as usize];
//! let rgb = encode::flatten_rgba(&rgba, encode::WHITE);
//!
//! let plan = build_plan(input, 1024);
//! assert_eq!((plan.out.w, plan.out.h), (1024, 768));
//!
//! let mut resizer = fast_image_resize::Resizer::new();
//! let mut out = vec![0u8; plan.out_len()];
//! scale_rgb_cpu(&mut resizer, &rgb, &plan, &mut out).unwrap();
//! let jpeg = encode::encode_jpeg(&out, plan.out, 85).unwrap();
//! assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
//! ```

pub mod cpu;
pub mod encode;
pub mod presets;
