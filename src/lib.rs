//! # colornet
//!
//! Automatic colorization of grayscale images.
//!
//! The input is decoded and converted to CIE L*a*b*. The luminance channel is resized
//! to the network's fixed 256x256 input, and the network predicts the two chrominance
//! channels. Those are resized back to the native resolution and merged with the
//! original full-resolution luminance before the image is encoded again.
//!
//! ## Example
//!
//! ```no_run
//! use colornet::model::{ModelHandle, OnnxBackend, OperatorRegistry};
//! use colornet::Colorizer;
//!
//! # fn main() -> colornet::Result<()> {
//! let model = ModelHandle::load(
//!     &OnnxBackend::default(),
//!     &OperatorRegistry::with_defaults(),
//!     "models/colornet.onnx",
//!     "models/colornet.onnx.data",
//! )?;
//!
//! let input = std::fs::read("gray.jpg")?;
//! let output = Colorizer::default().infer(&input, Some(&model), Some("png"))?;
//! std::fs::write("color.png", &output)?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod buffer;
pub mod error;
pub mod ffi;
pub mod image;
pub mod model;
pub mod pipeline;

pub use buffer::OutputBuffer;
pub use error::{BoxError, Error, ErrorKind, Result};
pub use model::ModelHandle;
pub use pipeline::{Colorizer, Config};
