use base64::Engine as _;
use image::{DynamicImage, GenericImageView, ImageError, ImageFormat};
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;

use crate::config::ContrastConfig;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Failed to read image source: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not decode image: {0}")]
    Decode(#[source] ImageError),
    #[error("Failed to encode processed image: {0}")]
    Encode(String),
}

impl From<ImageError> for PreprocessError {
    fn from(e: ImageError) -> Self {
        match e {
            // Truncated or unreadable streams surface as plain IO failures.
            ImageError::IoError(io) => PreprocessError::Io(io),
            other => PreprocessError::Decode(other),
        }
    }
}

/// An encoded image together with its container format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    bytes: Vec<u8>,
    format: ImageFormat,
    width: u32,
    height: u32,
}

impl EncodedImage {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    /// `data:<mime>;base64,<payload>`
    pub fn to_data_url(&self) -> String {
        let payload = base64::engine::general_purpose::STANDARD.encode(&self.bytes);
        format!("data:{};base64,{payload}", self.mime_type())
    }
}

/// Load an image file, apply normalization, and re-encode it in its original format.
pub fn prepare_for_ocr(path: &Path) -> Result<EncodedImage, PreprocessError> {
    let data = std::fs::read(path)?;
    prepare_for_ocr_from_bytes(&data)
}

/// Process raw image bytes (JPEG / PNG / WEBP / …) with the default contrast settings.
pub fn prepare_for_ocr_from_bytes(data: &[u8]) -> Result<EncodedImage, PreprocessError> {
    prepare_with_contrast(data, &ContrastConfig::default())
}

pub fn prepare_with_contrast(
    data: &[u8],
    contrast: &ContrastConfig,
) -> Result<EncodedImage, PreprocessError> {
    let format = image::guess_format(data).map_err(PreprocessError::Decode)?;
    let img = image::load_from_memory_with_format(data, format)?;
    encode(normalize(img, contrast), format)
}

/// Grayscale (unweighted channel mean) + linear contrast stretch around the midpoint.
/// Alpha is carried over untouched.
pub fn normalize(img: DynamicImage, contrast: &ContrastConfig) -> DynamicImage {
    if img.color().has_alpha() {
        let mut rgba = img.into_rgba8();
        for p in rgba.pixels_mut() {
            let v = stretch(p[0], p[1], p[2], contrast);
            p[0] = v;
            p[1] = v;
            p[2] = v;
        }
        DynamicImage::ImageRgba8(rgba)
    } else {
        let mut rgb = img.into_rgb8();
        for p in rgb.pixels_mut() {
            let v = stretch(p[0], p[1], p[2], contrast);
            p[0] = v;
            p[1] = v;
            p[2] = v;
        }
        DynamicImage::ImageRgb8(rgb)
    }
}

fn stretch(r: u8, g: u8, b: u8, contrast: &ContrastConfig) -> u8 {
    let avg = (f32::from(r) + f32::from(g) + f32::from(b)) / 3.0;
    let adjusted = (avg - contrast.midpoint) * contrast.gain + contrast.midpoint;
    adjusted.clamp(0.0, 255.0).round() as u8
}

fn encode(img: DynamicImage, format: ImageFormat) -> Result<EncodedImage, PreprocessError> {
    let (width, height) = img.dimensions();
    match write_image(&img, format) {
        Ok(bytes) => Ok(EncodedImage { bytes, format, width, height }),
        Err(ImageError::Unsupported(e)) => {
            tracing::warn!("Cannot re-encode {format:?} ({e}); falling back to PNG");
            let bytes = write_image(&img, ImageFormat::Png)
                .map_err(|e| PreprocessError::Encode(e.to_string()))?;
            Ok(EncodedImage { bytes, format: ImageFormat::Png, width, height })
        }
        Err(e) => Err(PreprocessError::Encode(e.to_string())),
    }
}

fn write_image(img: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format)?;
    Ok(buf)
}
