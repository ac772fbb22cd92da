use image::{ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;

/// Maximum accepted upload size (10MB).
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Maximum accepted width or height in pixels.
pub const MAX_DIMENSION: u32 = 4096;

const ALLOWED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "gif"];

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("empty file")]
    EmptyFile,
    #[error("file too large: {size} bytes (max: {max} bytes)")]
    TooLarge { size: usize, max: usize },
    #[error("invalid file extension: '{extension}' (allowed: jpg, jpeg, png, bmp, gif)")]
    DisallowedExtension { extension: String },
    #[error("file content does not match its declared image format")]
    ContentMismatch,
    #[error("image dimensions {width}x{height} exceed the {max}x{max} limit")]
    DimensionsExceeded { width: u32, height: u32, max: u32 },
    #[error("unsafe upload filename")]
    UnsafePath,
}

/// An upload that passed every validation step. The raw bytes are kept by
/// the caller; this records what was verified about them.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedImage {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

fn expected_format(extension: &str) -> Option<ImageFormat> {
    match extension {
        "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
        "png" => Some(ImageFormat::Png),
        "bmp" => Some(ImageFormat::Bmp),
        "gif" => Some(ImageFormat::Gif),
        _ => None,
    }
}

/// Validate an uploaded file: size, extension whitelist, magic-byte signature
/// against the extension, then dimensions. Checks run in that order and stop
/// at the first failure so rejected uploads never reach the decoder.
pub fn validate(data: &[u8], filename: &str) -> Result<ValidatedImage, ValidationError> {
    if data.is_empty() {
        return Err(ValidationError::EmptyFile);
    }
    if data.len() > MAX_FILE_SIZE {
        return Err(ValidationError::TooLarge {
            size: data.len(),
            max: MAX_FILE_SIZE,
        });
    }

    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ValidationError::DisallowedExtension { extension });
    }

    let detected = image::guess_format(data).map_err(|_| ValidationError::ContentMismatch)?;
    match expected_format(&extension) {
        Some(expected) if expected == detected => {}
        _ => return Err(ValidationError::ContentMismatch),
    }

    // Header-only probe keeps oversized images out of the decoder.
    let (width, height) = ImageReader::with_format(Cursor::new(data), detected)
        .into_dimensions()
        .map_err(|_| ValidationError::ContentMismatch)?;
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(ValidationError::DimensionsExceeded {
            width,
            height,
            max: MAX_DIMENSION,
        });
    }

    // Full decode catches truncated or corrupted payloads that carry a
    // legitimate signature.
    ImageReader::with_format(Cursor::new(data), detected)
        .decode()
        .map_err(|_| ValidationError::ContentMismatch)?;

    Ok(ValidatedImage {
        format: detected,
        width,
        height,
    })
}
