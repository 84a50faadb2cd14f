//! Loading colorization networks and running forward passes.

pub mod backend;
mod handle;
pub mod onnx;
pub mod operator;

#[cfg(test)]
pub(crate) mod stub;

pub use backend::{Extractor, Graph, InferenceBackend};
pub use handle::ModelHandle;
pub use onnx::{Device, OnnxBackend, OnnxConfig, OptimizationLevel};
pub use operator::{CustomOperator, OperatorRegistry, Sig17Slice};

/// Name of the network's luminance input.
pub const DEFAULT_INPUT_NAME: &str = "input";

/// Name of the network's chrominance output.
pub const DEFAULT_OUTPUT_NAME: &str = "out_ab";
