// SPDX-License-Identifier: MIT
//! Alpha flattening and JPEG encoding.
//!
//! Compositing onto an opaque background before resampling gives the same
//! result as resampling with alpha and then filling, since source-over with a
//! constant background is linear per channel.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageError};

use crate::presets::Size;

/// Opaque white, the canvas fill used for uploads.
pub const WHITE: [u8; 3] = [0xFF, 0xFF, 0xFF];

/// Composite tightly packed RGBA8 pixels onto an opaque background.
/// Returns tightly packed RGB8 pixels.
pub fn flatten_rgba(rgba: &[u8], bg: [u8; 3]) -> Vec<u8> {
    let mut out = Vec::with_capacity(rgba.len() / 4 * 3);
    for px in rgba.chunks_exact(4) {
        let a = px[3] as u32;
        for c in 0..3 {
            let v = (px[c] as u32 * a + bg[c] as u32 * (255 - a) + 127) / 255;
            out.push(v as u8);
        }
    }
    out
}

/// Encode tightly packed RGB8 pixels as baseline JPEG.
/// `quality` is clamped to 1..=100.
pub fn encode_jpeg(rgb: &[u8], size: Size, quality: u8) -> Result<Vec<u8>, ImageError> {
    let mut buf = Cursor::new(Vec::with_capacity(rgb.len() / 8));
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
    encoder.write_image(rgb, size.w, size.h, ExtendedColorType::Rgb8)?;
    Ok(buf.into_inner())
}
