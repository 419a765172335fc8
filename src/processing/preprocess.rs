//! # Upload Preprocessing
//!
//! Bounds payload size and normalizes format before the photo reaches the
//! multimodal model, which is both size- and format-sensitive.
//!
//! ## Pipeline
//!
//! 1. **Validate**: reject oversized uploads and unknown formats up front
//! 2. **Decode**: any raster format the `image` crate reads, to RGBA8
//! 3. **Flatten**: composite onto an opaque background (white by default)
//! 4. **Scale**: clamp the longest side to the cap, never upscale
//! 5. **Encode**: baseline JPEG at a fixed quality
//!
//! The decoded bitmap lives only inside [`ImagePreprocessor::preprocess`] and
//! is dropped on every exit path, success or failure.

use base64::{Engine as _, engine::general_purpose};
use consult_scale::cpu::scale_rgb_cpu;
use consult_scale::encode::{WHITE, encode_jpeg, flatten_rgba};
use consult_scale::presets::{Size, build_plan};
use fast_image_resize::Resizer;
use tracing::debug;

use crate::error::{ConsultError, ConsultResult};

/// Largest upload accepted before decoding (5 MiB).
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// MIME type of every preprocessed image.
pub const OUTPUT_MIME: &str = "image/jpeg";

/// Re-encoded photo ready to be sent to the AI service.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedImage {
    /// Encoded bytes
    pub bytes: Vec<u8>,
    /// Always [`OUTPUT_MIME`]
    pub mime: &'static str,
    /// Dimensions after scaling
    pub size: Size,
    /// Dimensions of the decoded source
    pub source_size: Size,
}

impl PreparedImage {
    /// Standard base64 payload, no data-URL prefix.
    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.bytes)
    }
}

/// Check an upload before spending time decoding it.
///
/// Returns the detected format on success.
pub fn validate_upload(bytes: &[u8]) -> ConsultResult<image::ImageFormat> {
    if bytes.is_empty() {
        return Err(ConsultError::image_decode("empty upload"));
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ConsultError::validation(
            "image",
            "Kích thước ảnh tối đa là 5MB",
            format!("{} bytes", bytes.len()),
        ));
    }
    image::guess_format(bytes).map_err(|e| ConsultError::image_decode(e.to_string()))
}

/// Downscales and re-encodes uploads.
///
/// Holds a reusable resizer; one instance per session is enough.
pub struct ImagePreprocessor {
    max_long_side: u32,
    quality: u8,
    background: [u8; 3],
    resizer: Resizer,
}

impl ImagePreprocessor {
    pub fn new(max_long_side: u32, quality: u8) -> Self {
        Self {
            max_long_side,
            quality,
            background: WHITE,
            resizer: Resizer::new(),
        }
    }

    /// Override the flattening background.
    pub fn with_background(mut self, rgb: [u8; 3]) -> Self {
        self.background = rgb;
        self
    }

    pub fn max_long_side(&self) -> u32 {
        self.max_long_side
    }

    /// Validate, decode, flatten, scale and re-encode one upload.
    pub fn preprocess(&mut self, input: &[u8]) -> ConsultResult<PreparedImage> {
        let format = validate_upload(input)?;

        let (source_size, rgb) = {
            let decoded = image::load_from_memory_with_format(input, format)?;
            let rgba = decoded.into_rgba8();
            let size = Size {
                w: rgba.width(),
                h: rgba.height(),
            };
            if size.w == 0 || size.h == 0 {
                return Err(ConsultError::image_decode("image has zero area"));
            }
            (size, flatten_rgba(rgba.as_raw(), self.background))
        };

        let plan = build_plan(source_size, self.max_long_side);
        let pixels = if plan.is_identity() {
            rgb
        } else {
            let mut out = vec![0u8; plan.out_len()];
            scale_rgb_cpu(&mut self.resizer, &rgb, &plan, &mut out)?;
            out
        };

        let bytes = encode_jpeg(&pixels, plan.out, self.quality)?;
        debug!(
            src_w = source_size.w,
            src_h = source_size.h,
            out_w = plan.out.w,
            out_h = plan.out.h,
            bytes = bytes.len(),
            "preprocessed upload"
        );

        Ok(PreparedImage {
            bytes,
            mime: OUTPUT_MIME,
            size: plan.out,
            source_size,
        })
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new(1024, 85)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png(w: u32, h: u32, px: Rgba<u8>) -> Vec<u8> {
        let img = RgbaImage::from_pixel(w, h, px);
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn garbage_is_unreadable() {
        let err = ImagePreprocessor::default()
            .preprocess(b"definitely not an image")
            .unwrap_err();
        assert_eq!(err.category(), "image_decode");
    }

    #[test]
    fn empty_upload_is_unreadable() {
        assert_eq!(validate_upload(&[]).unwrap_err().category(), "image_decode");
    }

    #[test]
    fn oversized_upload_is_rejected_before_decoding() {
        let big = vec![0u8; MAX_UPLOAD_BYTES + 1];
        assert_eq!(validate_upload(&big).unwrap_err().category(), "validation");
    }

    #[test]
    fn large_image_is_bounded_and_jpeg() {
        let input = png(2048, 1024, Rgba([200, 100, 50, 255]));
        let out = ImagePreprocessor::default().preprocess(&input).unwrap();

        assert_eq!(out.size, Size { w: 1024, h: 512 });
        assert_eq!(out.source_size, Size { w: 2048, h: 1024 });
        assert_eq!(out.mime, "image/jpeg");
        assert_eq!(image::guess_format(&out.bytes).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn transparent_regions_become_white() {
        let input = png(8, 8, Rgba([0, 0, 0, 0]));
        let out = ImagePreprocessor::default().preprocess(&input).unwrap();
        let decoded = image::load_from_memory(&out.bytes).unwrap().to_rgb8();
        for px in decoded.pixels() {
            assert!(px.0.iter().all(|&c| c >= 250), "pixel {:?} not white", px);
        }
    }

    #[test]
    fn base64_has_no_data_url_prefix() {
        let input = png(4, 4, Rgba([1, 2, 3, 255]));
        let out = ImagePreprocessor::default().preprocess(&input).unwrap();
        let b64 = out.to_base64();
        assert!(!b64.starts_with("data:"));
        assert_eq!(general_purpose::STANDARD.decode(b64).unwrap(), out.bytes);
    }
}
