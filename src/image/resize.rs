//! Plane resampling between native and network geometry.
//!
//! The same plane is shrunk to the network input size and the network output is
//! grown back to the native size, so the default filter widens its support when
//! down-sampling (averaging an area) and interpolates linearly when up-sampling.

use crate::error::{Error, Result};

use super::Plane;

/// Resampling filter for [`resize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Nearest-neighbor (no smoothing).
    Nearest,
    /// Triangle filter: bilinear when up-sampling, area-weighted when down-sampling.
    #[default]
    Bilinear,
}

impl Interpolation {
    /// Support radius of the filter kernel at unit scale.
    #[inline]
    const fn support(self) -> f32 {
        match self {
            Self::Nearest => 0.5,
            Self::Bilinear => 1.0,
        }
    }

    /// Evaluate the filter kernel at distance `x`.
    #[inline]
    fn weight(self, x: f32) -> f32 {
        let ax = x.abs();
        match self {
            Self::Nearest => {
                if ax < 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Bilinear => (1.0 - ax).max(0.0),
        }
    }
}

/// Resize a plane to `width` x `height`.
///
/// # Errors
///
/// Returns an error if the source plane or the requested size is empty.
pub fn resize(
    plane: &Plane,
    width: usize,
    height: usize,
    interpolation: Interpolation,
) -> Result<Plane> {
    let (src_h, src_w) = plane.dim();
    if src_h == 0 || src_w == 0 {
        return Err(Error::ShapeMismatch {
            expected: "non-empty source plane".to_string(),
            actual: format!("{src_w}x{src_h}"),
        });
    }
    if width == 0 || height == 0 {
        return Err(Error::ShapeMismatch {
            expected: "non-empty destination size".to_string(),
            actual: format!("{width}x{height}"),
        });
    }

    if (src_w, src_h) == (width, height) {
        return Ok(plane.clone());
    }

    // Two-pass separable resize: horizontal then vertical
    let horizontal = weights(src_w, width, interpolation);
    let vertical = weights(src_h, height, interpolation);

    let mut temp = Plane::zeros((src_h, width));
    for (src_row, mut dst_row) in plane.rows().into_iter().zip(temp.rows_mut()) {
        for (dst, taps) in dst_row.iter_mut().zip(&horizontal) {
            *dst = taps.apply(|sx| src_row[sx]);
        }
    }

    let mut out = Plane::zeros((height, width));
    for (y, taps) in vertical.iter().enumerate() {
        for x in 0..width {
            out[[y, x]] = taps.apply(|sy| temp[[sy, x]]);
        }
    }

    Ok(out)
}

/// Normalized filter taps for one destination sample.
struct Taps {
    start: usize,
    weights: Vec<f32>,
}

impl Taps {
    #[inline]
    fn apply(&self, sample: impl Fn(usize) -> f32) -> f32 {
        self.weights
            .iter()
            .enumerate()
            .map(|(i, w)| sample(self.start + i) * w)
            .sum()
    }
}

/// Precompute taps for every destination index along one axis.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap
)]
fn weights(src_len: usize, dst_len: usize, interpolation: Interpolation) -> Vec<Taps> {
    let scale = src_len as f32 / dst_len as f32;
    let filter_scale = scale.max(1.0);
    let support = interpolation.support() * filter_scale;
    let last = src_len - 1;

    (0..dst_len)
        .map(|d| {
            // Map destination center to source coordinates
            let center = (d as f32 + 0.5) * scale - 0.5;
            let left = ((center - support).floor().max(0.0) as usize).min(last);
            let right = ((center + support).ceil().max(0.0) as usize).min(last);

            let mut weights: Vec<f32> = (left..=right)
                .map(|s| interpolation.weight((s as f32 - center) / filter_scale))
                .collect();
            let sum: f32 = weights.iter().sum();

            if sum > f32::EPSILON {
                weights.iter_mut().for_each(|w| *w /= sum);
                Taps { start: left, weights }
            } else {
                // Center fell outside the source: take the closest edge sample
                let nearest = center.round().clamp(0.0, last as f32) as usize;
                Taps {
                    start: nearest,
                    weights: vec![1.0],
                }
            }
        })
        .collect()
}
