//! Luminance-to-color inference pipeline.

mod colorize;

pub use colorize::{Colorizer, Config};
