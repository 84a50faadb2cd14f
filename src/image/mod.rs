//! Pixel matrices, color space conversion, resampling and the image codec.

pub mod codec;
pub mod color;
pub mod resize;

pub use codec::{decode, encode, OutputFormat};
pub use color::{
    bgr_to_lab, extract_channel, lab_to_bgr, merge_channels, to_normalized_float, to_u8,
};
pub use resize::{resize, Interpolation};

use ndarray::{Array2, Array3, Array4};

/// Decoded 8-bit image in (height, width, channel) layout, channels ordered B, G, R.
pub type BgrImage = Array3<u8>;

/// BGR image with samples normalized to [0, 1].
pub type BgrImageF32 = Array3<f32>;

/// CIE L*a*b* image: L in [0, 100], a and b roughly in [-128, 127].
pub type LabImage = Array3<f32>;

/// A single channel of an image.
pub type Plane = Array2<f32>;

/// Network tensor in NCHW format (batch, channels, height, width).
pub type Tensor = Array4<f32>;

/// Side length of the square luminance input the colorization network accepts.
pub const NET_INPUT_SIZE: usize = 256;

/// Number of channels in color images.
pub const COLOR_CHANNELS: usize = 3;

/// Number of chrominance channels predicted by the network.
pub const AB_CHANNELS: usize = 2;
