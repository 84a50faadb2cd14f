//! The inference runtime seam.
//!
//! A backend turns a graph definition plus weights into a [`Graph`]. Every forward
//! pass goes through a fresh [`Extractor`] created from the graph, so one loaded
//! graph can serve many calls.

use std::path::Path;

use ndarray::ArrayD;

use crate::error::Result;

use super::operator::OperatorRegistry;

/// Loads graphs for a particular inference runtime.
pub trait InferenceBackend {
    /// A parsed graph definition that has no weights bound yet.
    type Definition;

    /// Parse a graph definition.
    ///
    /// `operators` must hold every custom operator the definition references.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphDefinitionLoad`](crate::Error::GraphDefinitionLoad) if the
    /// definition cannot be read or parsed.
    fn parse_definition(&self, operators: &OperatorRegistry, path: &Path) -> Result<Self::Definition>;

    /// Bind weights to a parsed definition, producing a runnable graph.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WeightsLoad`](crate::Error::WeightsLoad) if the weights cannot be
    /// read or do not fit the definition.
    fn bind_weights(&self, definition: Self::Definition, path: &Path) -> Result<Box<dyn Graph>>;
}

/// A loaded, runnable graph.
pub trait Graph: Send + Sync {
    /// Names of the graph's inputs.
    fn input_names(&self) -> Vec<String>;

    /// Names of the graph's outputs.
    fn output_names(&self) -> Vec<String>;

    /// Create a per-call execution context.
    fn extractor(&self) -> Box<dyn Extractor + '_>;
}

/// Execution context for a single forward pass.
pub trait Extractor {
    /// Bind a tensor to a named input.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime rejects the tensor.
    fn input(&mut self, name: &str, tensor: ArrayD<f32>) -> Result<()>;

    /// Run the graph and fetch a named output.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InferenceExecution`](crate::Error::InferenceExecution) if execution
    /// fails or the output cannot be read.
    fn extract(&mut self, name: &str) -> Result<ArrayD<f32>>;
}
