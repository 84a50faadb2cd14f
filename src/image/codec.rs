//! Image codec: compressed bytes to BGR matrices and back.

use std::io::Cursor;

use image::{codecs::jpeg::JpegEncoder, DynamicImage, ImageFormat, RgbImage};

use crate::error::{Error, Result};

use super::{BgrImage, COLOR_CHANNELS};

/// A requested output format, normalized to a bare lowercase extension (`png`, `jpg`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFormat(String);

impl OutputFormat {
    /// Normalize a caller-supplied format identifier.
    ///
    /// Accepts identifiers with or without a leading separator (`"png"`, `".PNG"`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFormat`] if no format or an empty format is supplied.
    pub fn parse(format: Option<&str>) -> Result<Self> {
        let ext = format
            .map(|f| f.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|f| !f.is_empty())
            .ok_or(Error::InvalidFormat)?;

        Ok(Self(ext))
    }

    /// The bare extension, without separator.
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.0
    }

    /// The codec format for this extension, if the codec supports it.
    #[must_use]
    pub fn image_format(&self) -> Option<ImageFormat> {
        ImageFormat::from_extension(&self.0)
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, ".{}", self.0)
    }
}

/// Decode compressed bytes into a 3-channel BGR matrix at native resolution.
///
/// Grayscale and alpha inputs are expanded or flattened to three color channels.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the bytes are not a supported image.
pub fn decode(bytes: &[u8]) -> Result<BgrImage> {
    let img = image::load_from_memory(bytes).map_err(|source| Error::Decode { source })?;
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut raw = rgb.into_raw();
    raw.chunks_exact_mut(COLOR_CHANNELS).for_each(|px| px.swap(0, 2));

    BgrImage::from_shape_vec((height as usize, width as usize, COLOR_CHANNELS), raw).map_err(
        |err| Error::ShapeMismatch {
            expected: format!("{width}x{height}x{COLOR_CHANNELS} samples"),
            actual: err.to_string(),
        },
    )
}

/// Encode a BGR matrix with the given format.
///
/// # Arguments
///
/// * `image` - 8-bit BGR matrix in (height, width, channel) layout
/// * `format` - Output format
/// * `jpeg_quality` - JPEG quality (1-100), ignored for other formats
///
/// # Errors
///
/// Returns [`Error::Encode`] if the format is unsupported, encoding fails, or no bytes
/// are produced.
#[allow(clippy::cast_possible_truncation)]
pub fn encode(image: &BgrImage, format: &OutputFormat, jpeg_quality: u8) -> Result<Vec<u8>> {
    let encode_err = |reason: String| Error::Encode {
        format: format.extension().to_string(),
        reason,
    };

    let image_format = format
        .image_format()
        .ok_or_else(|| encode_err("unsupported format".to_string()))?;

    let (height, width, channels) = image.dim();
    if channels != COLOR_CHANNELS {
        return Err(encode_err(format!("expected {COLOR_CHANNELS} channels, got {channels}")));
    }

    let mut raw: Vec<u8> = image.iter().copied().collect();
    raw.chunks_exact_mut(COLOR_CHANNELS).for_each(|px| px.swap(0, 2));

    // Safe: dimensions come from decoded images, which fit in u32
    let rgb = RgbImage::from_raw(width as u32, height as u32, raw)
        .ok_or_else(|| encode_err("pixel buffer does not match dimensions".to_string()))?;
    let img = DynamicImage::ImageRgb8(rgb);

    let mut bytes = Vec::new();
    let written = match image_format {
        ImageFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut bytes, jpeg_quality);
            img.write_with_encoder(encoder)
        }
        other => img.write_to(&mut Cursor::new(&mut bytes), other),
    };
    written.map_err(|err| encode_err(err.to_string()))?;

    if bytes.is_empty() {
        return Err(encode_err("encoder produced no bytes".to_string()));
    }

    Ok(bytes)
}
