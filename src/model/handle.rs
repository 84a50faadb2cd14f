//! Owned handle to a loaded colorization network.

use std::fmt;
use std::path::{Path, PathBuf};

use ndarray::ArrayD;

use crate::error::{Error, Result};

use super::backend::{Graph, InferenceBackend};
use super::operator::OperatorRegistry;

enum State {
    Loaded(Box<dyn Graph>),
    Unloaded,
}

/// A loaded inference graph, reusable across any number of forward passes.
///
/// The handle is `Send + Sync`: each forward pass runs in its own extractor, and the
/// backend decides whether concurrent passes run in parallel or serialize.
pub struct ModelHandle {
    state: State,
    definition_path: PathBuf,
}

impl ModelHandle {
    /// Load a network from a graph definition and its weights.
    ///
    /// Custom operators in `operators` are made available to the backend before the
    /// definition is parsed; a definition that references an operator missing from
    /// the registry fails to load.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphDefinitionLoad`] if the definition cannot be parsed, or
    /// [`Error::WeightsLoad`] if the weights cannot be bound to it.
    pub fn load<B: InferenceBackend>(
        backend: &B,
        operators: &OperatorRegistry,
        graph_definition_path: impl AsRef<Path>,
        weights_path: impl AsRef<Path>,
    ) -> Result<Self> {
        let definition_path = graph_definition_path.as_ref();
        let weights_path = weights_path.as_ref();

        tracing::info!(
            "Loading graph definition {} with operators {operators:?}",
            definition_path.display()
        );
        let definition = backend.parse_definition(operators, definition_path)?;

        tracing::info!("Binding weights {}", weights_path.display());
        let graph = backend.bind_weights(definition, weights_path)?;

        tracing::info!(
            "Model loaded: inputs {:?}, outputs {:?}",
            graph.input_names(),
            graph.output_names()
        );

        Ok(Self {
            state: State::Loaded(graph),
            definition_path: definition_path.to_path_buf(),
        })
    }

    /// Release the graph. Unloading an already unloaded handle does nothing.
    pub fn unload(&mut self) {
        match std::mem::replace(&mut self.state, State::Unloaded) {
            State::Loaded(graph) => {
                drop(graph);
                tracing::info!("Unloaded model {}", self.definition_path.display());
            }
            State::Unloaded => {
                tracing::debug!(
                    "Model {} is already unloaded",
                    self.definition_path.display()
                );
            }
        }
    }

    /// Whether the handle still owns a graph.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        matches!(self.state, State::Loaded(_))
    }

    /// Path of the graph definition this handle was loaded from.
    #[must_use]
    pub fn definition_path(&self) -> &Path {
        &self.definition_path
    }

    /// Names of the graph inputs, empty once unloaded.
    #[must_use]
    pub fn input_names(&self) -> Vec<String> {
        self.graph().map(|g| g.input_names()).unwrap_or_default()
    }

    /// Names of the graph outputs, empty once unloaded.
    #[must_use]
    pub fn output_names(&self) -> Vec<String> {
        self.graph().map(|g| g.output_names()).unwrap_or_default()
    }

    /// Run a forward pass: bind `input` to `input_name` and fetch `output_name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelNotLoaded`] if the handle was unloaded, or
    /// [`Error::InferenceExecution`] if either name is not part of the graph or the
    /// backend fails.
    pub fn run_forward(
        &self,
        input: ArrayD<f32>,
        input_name: &str,
        output_name: &str,
    ) -> Result<ArrayD<f32>> {
        let graph = self.graph()?;

        if !graph.input_names().iter().any(|n| n == input_name) {
            return Err(Error::inference(format!(
                "graph has no input named {input_name:?}"
            )));
        }
        if !graph.output_names().iter().any(|n| n == output_name) {
            return Err(Error::inference(format!(
                "graph has no output named {output_name:?}"
            )));
        }

        let mut extractor = graph.extractor();
        extractor.input(input_name, input)?;
        extractor.extract(output_name)
    }

    fn graph(&self) -> Result<&dyn Graph> {
        match &self.state {
            State::Loaded(graph) => Ok(graph.as_ref()),
            State::Unloaded => Err(Error::ModelNotLoaded),
        }
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("definition_path", &self.definition_path)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
