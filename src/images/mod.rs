//! Image preparation for the generation pipeline: encoding detection,
//! normalization of formats the generation service rejects, bounded
//! resizing, and transmission encoding.

pub mod placeholder;

use crate::config::ImageConfig;
use crate::error::app_error::AppError;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

/// Detects the encoding of raw upload bytes. `InvalidImage` when the bytes
/// are not recognizable as any image at all.
pub fn detect_format(bytes: &[u8]) -> Result<ImageFormat, AppError> {
    image::guess_format(bytes).map_err(|_| AppError::InvalidImage("unrecognized image format".to_string()))
}

/// Cheap decode check used to reject undecodable uploads before anything
/// is persisted.
pub fn validate_image(bytes: &[u8]) -> Result<(), AppError> {
    detect_format(bytes)?;
    image::load_from_memory(bytes)
        .map(|_| ())
        .map_err(|e| AppError::InvalidImage(e.to_string()))
}

fn is_disallowed(format: ImageFormat, disallowed: &[String]) -> bool {
    disallowed
        .iter()
        .any(|name| format.extensions_str().contains(&name.to_ascii_lowercase().as_str()))
}

/// Converts bytes in a disallowed encoding to PNG, flattening any alpha
/// channel onto a white background. Bytes already in an accepted encoding
/// pass through untouched, which makes a second pass a no-op.
pub fn normalize_encoding(bytes: &[u8], disallowed: &[String]) -> Result<Vec<u8>, AppError> {
    let format = detect_format(bytes)?;
    if !is_disallowed(format, disallowed) {
        return Ok(bytes.to_vec());
    }

    let img = image::load_from_memory(bytes).map_err(|e| AppError::InvalidImage(e.to_string()))?;
    let flattened = flatten_onto_white(&img);
    encode_png(&DynamicImage::ImageRgb8(flattened))
}

/// Uniform scale factor that fits `(width, height)` inside a square
/// bounding box of `max_dimension`.
pub fn fit_scale(width: u32, height: u32, max_dimension: u32) -> f64 {
    let scale_w = max_dimension as f64 / width as f64;
    let scale_h = max_dimension as f64 / height as f64;
    scale_w.min(scale_h)
}

/// Images already reasonably close to the target box are left untouched;
/// only clearly oversized or much-too-small inputs are resampled.
pub fn should_resize(scale: f64) -> bool {
    scale < 1.0 || scale > 2.0
}

/// Full preparation pass for submission to the generation service:
/// normalize a disallowed encoding, fit within the configured bounding box
/// (Lanczos resampling), flatten alpha onto white, re-encode as JPEG at
/// the configured quality.
pub fn prepare_for_generation(
    bytes: &[u8],
    config: &ImageConfig,
    disallowed: &[String],
) -> Result<Vec<u8>, AppError> {
    let normalized = normalize_encoding(bytes, disallowed)?;
    let mut img = image::load_from_memory(&normalized).map_err(|e| AppError::InvalidImage(e.to_string()))?;

    let (width, height) = img.dimensions();
    let scale = fit_scale(width, height, config.max_dimension);
    if should_resize(scale) {
        img = img.resize(config.max_dimension, config.max_dimension, FilterType::Lanczos3);
        tracing::debug!(
            from = %format!("{width}x{height}"),
            to = %format!("{}x{}", img.width(), img.height()),
            "resized image for generation"
        );
    }

    let flattened = flatten_onto_white(&img);
    encode_jpeg(&flattened, config.jpeg_quality)
}

/// Composites the image over an opaque white background, dropping alpha.
pub fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut out = RgbImage::new(width, height);

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = pixel[3] as u32;
        let blend = |c: u8| -> u8 { ((c as u32 * alpha + 255 * (255 - alpha)) / 255) as u8 };
        out.put_pixel(x, y, Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]));
    }

    out
}

pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, AppError> {
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| AppError::InvalidImage(e.to_string()))?;
    Ok(buffer.into_inner())
}

pub fn encode_jpeg(img: &RgbImage, quality: u8) -> Result<Vec<u8>, AppError> {
    let mut buffer = Cursor::new(Vec::new());
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    encoder
        .encode_image(img)
        .map_err(|e| AppError::InvalidImage(e.to_string()))?;
    Ok(buffer.into_inner())
}
