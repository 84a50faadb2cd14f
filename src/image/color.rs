//! Conversions between 8-bit BGR, normalized BGR and CIE L*a*b*.

use ndarray::{Array3, ArrayView2, Axis, Zip};
use palette::{FromColor, Lab, Srgb};

use crate::error::{Error, Result};

use super::{BgrImage, BgrImageF32, LabImage, Plane, COLOR_CHANNELS};

/// Scale 8-bit samples from [0, 255] to [0, 1].
#[must_use]
pub fn to_normalized_float(image: &BgrImage) -> BgrImageF32 {
    image.mapv(|v| f32::from(v) / 255.0)
}

/// Scale normalized samples back to [0, 255], rounding and saturating.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn to_u8(image: &BgrImageF32) -> BgrImage {
    // Safe: clamped to [0, 255] before casting
    image.mapv(|v| (v * 255.0).round().clamp(0.0, 255.0) as u8)
}

/// Convert a normalized sRGB image (BGR channel order) to L*a*b* under D65.
///
/// # Errors
///
/// Returns an error if the image does not have three channels.
pub fn bgr_to_lab(image: &BgrImageF32) -> Result<LabImage> {
    ensure_color(image)?;

    let mut lab = LabImage::zeros(image.raw_dim());
    Zip::from(lab.lanes_mut(Axis(2)))
        .and(image.lanes(Axis(2)))
        .for_each(|mut out, px| {
            let color: Lab = Lab::from_color(Srgb::new(px[2], px[1], px[0]));
            out[0] = color.l;
            out[1] = color.a;
            out[2] = color.b;
        });

    Ok(lab)
}

/// Convert an L*a*b* image back to normalized sRGB in BGR channel order.
///
/// Colors outside the sRGB gamut are clamped into [0, 1].
///
/// # Errors
///
/// Returns an error if the image does not have three channels.
pub fn lab_to_bgr(image: &LabImage) -> Result<BgrImageF32> {
    ensure_color(image)?;

    let mut bgr = BgrImageF32::zeros(image.raw_dim());
    Zip::from(bgr.lanes_mut(Axis(2)))
        .and(image.lanes(Axis(2)))
        .for_each(|mut out, px| {
            let lab: Lab = Lab::new(px[0], px[1], px[2]);
            let color: Srgb = Srgb::from_color(lab);
            out[0] = color.blue;
            out[1] = color.green;
            out[2] = color.red;
        });

    Ok(bgr)
}

/// Copy one channel out of a multi-channel matrix.
///
/// # Errors
///
/// Returns an error if `index` is not a channel of `image`.
pub fn extract_channel(image: &Array3<f32>, index: usize) -> Result<Plane> {
    let channels = image.len_of(Axis(2));
    if index >= channels {
        return Err(Error::ShapeMismatch {
            expected: format!("channel index below {channels}"),
            actual: format!("channel index {index}"),
        });
    }

    Ok(image.index_axis(Axis(2), index).to_owned())
}

/// Merge single-channel planes into one matrix, keeping the order of `planes`.
///
/// # Errors
///
/// Returns an error if `planes` is empty or the planes differ in size.
pub fn merge_channels(planes: &[Plane]) -> Result<Array3<f32>> {
    let first = planes.first().ok_or_else(|| Error::ShapeMismatch {
        expected: "at least one channel".to_string(),
        actual: "no channels".to_string(),
    })?;

    if let Some(odd) = planes.iter().find(|p| p.dim() != first.dim()) {
        return Err(Error::ShapeMismatch {
            expected: format!("{:?}", first.dim()),
            actual: format!("{:?}", odd.dim()),
        });
    }

    let views: Vec<ArrayView2<'_, f32>> = planes.iter().map(Plane::view).collect();
    ndarray::stack(Axis(2), &views).map_err(|err| Error::ShapeMismatch {
        expected: "stackable channels".to_string(),
        actual: err.to_string(),
    })
}

fn ensure_color(image: &Array3<f32>) -> Result<()> {
    let channels = image.len_of(Axis(2));
    if channels == COLOR_CHANNELS {
        Ok(())
    } else {
        Err(Error::ShapeMismatch {
            expected: format!("{COLOR_CHANNELS} channels"),
            actual: format!("{channels} channels"),
        })
    }
}
