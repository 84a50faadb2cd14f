//! Custom error types for colornet.

use std::path::PathBuf;
use thiserror::Error;

/// Boxed cause carried by errors whose source depends on the inference backend.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for the colornet library.
#[derive(Error, Debug)]
pub enum Error {
    /// Inference was attempted without a loaded model.
    #[error("model is not loaded; load a model before running inference")]
    ModelNotLoaded,

    /// No usable output format was supplied.
    #[error("output format is required (e.g. png, jpg)")]
    InvalidFormat,

    /// The graph definition could not be parsed.
    #[error("failed to load graph definition {path}: {source}")]
    GraphDefinitionLoad {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    /// The weights could not be bound to the parsed graph.
    #[error("failed to load weights {path}: {source}")]
    WeightsLoad {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    /// The input bytes are not a decodable image.
    #[error("failed to decode input image: {source}")]
    Decode {
        #[source]
        source: image::ImageError,
    },

    /// The forward pass failed.
    #[error("inference failed: {source}")]
    InferenceExecution {
        #[source]
        source: BoxError,
    },

    /// The forward pass produced a tensor without elements.
    #[error("inference output is empty")]
    EmptyInferenceOutput,

    /// The reconstructed color image has no pixels.
    #[error("reconstructed image is empty")]
    ReconstructionEmpty,

    /// Encoding the reconstructed image failed or produced no bytes.
    #[error("failed to encode image as {format}: {reason}")]
    Encode { format: String, reason: String },

    /// The output buffer could not be allocated.
    #[error("failed to allocate {size} bytes for the output buffer")]
    Allocation { size: usize },

    /// Shape mismatch in matrix or tensor operations.
    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Discriminant of [`Error`], for callers that only care about the failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ModelNotLoaded,
    InvalidFormat,
    GraphDefinitionLoad,
    WeightsLoad,
    Decode,
    InferenceExecution,
    EmptyInferenceOutput,
    ReconstructionEmpty,
    Encode,
    Allocation,
    ShapeMismatch,
    InvalidParameter,
    Io,
}

impl Error {
    /// The failure class of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ModelNotLoaded => ErrorKind::ModelNotLoaded,
            Self::InvalidFormat => ErrorKind::InvalidFormat,
            Self::GraphDefinitionLoad { .. } => ErrorKind::GraphDefinitionLoad,
            Self::WeightsLoad { .. } => ErrorKind::WeightsLoad,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::InferenceExecution { .. } => ErrorKind::InferenceExecution,
            Self::EmptyInferenceOutput => ErrorKind::EmptyInferenceOutput,
            Self::ReconstructionEmpty => ErrorKind::ReconstructionEmpty,
            Self::Encode { .. } => ErrorKind::Encode,
            Self::Allocation { .. } => ErrorKind::Allocation,
            Self::ShapeMismatch { .. } => ErrorKind::ShapeMismatch,
            Self::InvalidParameter { .. } => ErrorKind::InvalidParameter,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn inference(source: impl Into<BoxError>) -> Self {
        Self::InferenceExecution {
            source: source.into(),
        }
    }

    pub(crate) fn graph_definition(path: impl Into<PathBuf>, source: impl Into<BoxError>) -> Self {
        Self::GraphDefinitionLoad {
            path: path.into(),
            source: source.into(),
        }
    }

    pub(crate) fn weights(path: impl Into<PathBuf>, source: impl Into<BoxError>) -> Self {
        Self::WeightsLoad {
            path: path.into(),
            source: source.into(),
        }
    }
}

/// Result type alias for colornet operations.
pub type Result<T> = std::result::Result<T, Error>;
