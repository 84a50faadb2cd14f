//! Null-or-value boundary over the typed pipeline.
//!
//! Every failure is logged and flattened to `None`; callers that need the failure
//! class use [`ModelHandle`] and [`Colorizer`] directly.

use std::path::Path;

use crate::buffer::OutputBuffer;
use crate::model::{ModelHandle, OnnxBackend, OperatorRegistry};
use crate::pipeline::Colorizer;

/// Load a colorization network with the ONNX backend and the default operators.
///
/// Returns `None` on failure, after logging the reason.
#[must_use]
pub fn load_model(model_definition_path: impl AsRef<Path>, weights_path: impl AsRef<Path>) -> Option<ModelHandle> {
    ModelHandle::load(
        &OnnxBackend::default(),
        &OperatorRegistry::with_defaults(),
        model_definition_path,
        weights_path,
    )
    .map_err(|err| tracing::error!("{err}"))
    .ok()
}

/// Release the resources held by `model`. Unloading twice is harmless.
pub fn unload_model(model: &mut ModelHandle) {
    model.unload();
}

/// Colorize `input` and encode the result as `format` (`"png"`, `"jpg"`, ...).
///
/// Returns `None` on failure, after logging the reason.
#[must_use]
pub fn infer(input: &[u8], model: Option<&ModelHandle>, format: Option<&str>) -> Option<OutputBuffer> {
    Colorizer::default()
        .infer(input, model, format)
        .map_err(|err| tracing::error!("{err}"))
        .ok()
}

/// Release a buffer returned by [`infer`].
pub fn free_buffer(buffer: OutputBuffer) {
    drop(buffer);
}
