//! ONNX Runtime backend.
//!
//! The graph definition is an ONNX model whose large initializers live in an
//! external weights file. Both are read into memory and the weights are registered
//! under their file name, which must match the external data location recorded in
//! the model. Passing the definition itself as the weights loads a single-file model.

use std::borrow::Cow;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ndarray::ArrayD;
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::operator::io::{OperatorInput, OperatorOutput};
use ort::operator::kernel::{Kernel, KernelAttributes, KernelContext};
use ort::operator::{Operator, OperatorDomain};
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use ort::tensor::TensorElementType;
use ort::value::Tensor;
use parking_lot::Mutex;

use crate::error::{Error, Result};

use super::backend::{Extractor, Graph, InferenceBackend};
use super::operator::{CustomOperator, OperatorRegistry};

/// Custom operator domain the colorization graph's non-standard nodes live in.
pub const OPERATOR_DOMAIN: &str = "colornet";

/// Graph optimization level, mirroring ONNX Runtime's levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptimizationLevel {
    /// Disable all optimizations.
    Disable,
    /// Constant folding and redundant node elimination.
    Basic,
    /// Basic plus node fusions.
    Extended,
    /// Everything, including layout optimizations.
    #[default]
    All,
}

impl From<OptimizationLevel> for GraphOptimizationLevel {
    fn from(level: OptimizationLevel) -> Self {
        match level {
            OptimizationLevel::Disable => Self::Disable,
            OptimizationLevel::Basic => Self::Level1,
            OptimizationLevel::Extended => Self::Level2,
            OptimizationLevel::All => Self::Level3,
        }
    }
}

/// Device the forward pass runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    #[default]
    Cpu,
    /// CUDA device by ordinal, falling back to the CPU if unavailable.
    Cuda(i32),
}

/// Session options for the ONNX backend.
#[derive(Debug, Clone, Default)]
pub struct OnnxConfig {
    /// Graph optimizations applied when the session is built.
    pub optimization_level: OptimizationLevel,

    /// Intra-op threads. 0 lets ONNX Runtime decide.
    pub intra_threads: usize,

    /// Execution provider for the forward pass.
    pub device: Device,
}

/// [`InferenceBackend`] backed by ONNX Runtime.
#[derive(Debug, Clone, Default)]
pub struct OnnxBackend {
    config: OnnxConfig,
}

impl OnnxBackend {
    #[must_use]
    pub const fn new(config: OnnxConfig) -> Self {
        Self { config }
    }

    fn session_builder(&self, operators: &OperatorRegistry) -> ort::Result<SessionBuilder> {
        let mut builder = Session::builder()?
            .with_optimization_level(self.config.optimization_level.into())?;

        if self.config.intra_threads > 0 {
            builder = builder.with_intra_threads(self.config.intra_threads)?;
        }

        builder = match self.config.device {
            Device::Cpu => builder.with_execution_providers([CPUExecutionProvider::default().build()])?,
            Device::Cuda(device_id) => builder.with_execution_providers([
                CUDAExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
                CPUExecutionProvider::default().build(),
            ])?,
        };

        // Custom operators must be known before the graph is parsed
        if !operators.is_empty() {
            let mut domain = OperatorDomain::new(OPERATOR_DOMAIN)?;
            for operator in operators.iter() {
                domain = domain.add(OrtOperator(Arc::clone(operator)))?;
            }
            builder = builder.with_operators(domain)?;
        }

        Ok(builder)
    }
}

/// An ONNX definition read into memory, with the session builder it will be committed
/// through.
pub struct OnnxDefinition {
    builder: SessionBuilder,
    path: PathBuf,
    model: Vec<u8>,
}

impl InferenceBackend for OnnxBackend {
    type Definition = OnnxDefinition;

    fn parse_definition(&self, operators: &OperatorRegistry, path: &Path) -> Result<OnnxDefinition> {
        let model = fs::read(path).map_err(|err| Error::graph_definition(path, err))?;
        if model.is_empty() {
            return Err(Error::graph_definition(path, "file is empty"));
        }

        let builder = self
            .session_builder(operators)
            .map_err(|err| Error::graph_definition(path, err))?;

        Ok(OnnxDefinition {
            builder,
            path: path.to_path_buf(),
            model,
        })
    }

    fn bind_weights(&self, definition: OnnxDefinition, path: &Path) -> Result<Box<dyn Graph>> {
        let OnnxDefinition {
            builder,
            path: definition_path,
            model,
        } = definition;

        // A single-file model carries its initializers inline
        let builder = if same_file(path, &definition_path) {
            builder
        } else {
            let weights = fs::read(path).map_err(|err| Error::weights(path, err))?;
            if weights.is_empty() {
                return Err(Error::weights(path, "file is empty"));
            }
            let location = external_data_location(&model, &definition_path, path)?;

            tracing::debug!("Binding {} bytes of external data as {location:?}", weights.len());
            builder
                .with_external_initializer_file_in_memory(location, Cow::Owned(weights))
                .map_err(|err| Error::weights(path, err))?
        };

        let session = builder
            .commit_from_memory(&model)
            .map_err(|err| Error::weights(path, err))?;

        Ok(Box::new(OnnxGraph::new(session)))
    }
}

/// Whether two paths name the same file, however they are spelled.
fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// The external data location under which `weights` is registered with the session.
///
/// Initializers name their external file by location, so the definition must mention
/// the weights file name for the weights to be bound to anything.
fn external_data_location<'a>(model: &[u8], definition: &Path, weights: &'a Path) -> Result<&'a str> {
    let name = weights
        .file_name()
        .and_then(OsStr::to_str)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| Error::weights(weights, "path has no UTF-8 file name"))?;

    if model.windows(name.len()).any(|window| window == name.as_bytes()) {
        Ok(name)
    } else {
        Err(Error::weights(
            weights,
            format!(
                "{} does not reference external data {name:?}",
                definition.display()
            ),
        ))
    }
}

struct OnnxGraph {
    session: Mutex<Session>,
    inputs: Vec<String>,
    outputs: Vec<String>,
}

impl OnnxGraph {
    fn new(session: Session) -> Self {
        let inputs = session.inputs.iter().map(|i| i.name.clone()).collect();
        let outputs = session.outputs.iter().map(|o| o.name.clone()).collect();

        Self {
            session: Mutex::new(session),
            inputs,
            outputs,
        }
    }
}

impl Graph for OnnxGraph {
    fn input_names(&self) -> Vec<String> {
        self.inputs.clone()
    }

    fn output_names(&self) -> Vec<String> {
        self.outputs.clone()
    }

    fn extractor(&self) -> Box<dyn Extractor + '_> {
        Box::new(OnnxExtractor {
            graph: self,
            input: None,
        })
    }
}

struct OnnxExtractor<'a> {
    graph: &'a OnnxGraph,
    input: Option<(String, Tensor<f32>)>,
}

impl Extractor for OnnxExtractor<'_> {
    fn input(&mut self, name: &str, tensor: ArrayD<f32>) -> Result<()> {
        let value = Tensor::from_array(tensor).map_err(Error::inference)?;
        self.input = Some((name.to_string(), value));
        Ok(())
    }

    fn extract(&mut self, name: &str) -> Result<ArrayD<f32>> {
        let (input_name, value) = self
            .input
            .take()
            .ok_or_else(|| Error::inference("no input bound"))?;

        // Forward passes on one session run one at a time
        let mut session = self.graph.session.lock();
        let outputs = session
            .run(ort::inputs![input_name.as_str() => value])
            .map_err(Error::inference)?;

        let output = outputs
            .get(name)
            .ok_or_else(|| Error::inference(format!("output {name:?} was not produced")))?;

        let array = output
            .try_extract_array::<f32>()
            .map_err(Error::inference)?;

        Ok(array.to_owned())
    }
}

/// Exposes a [`CustomOperator`] to ONNX Runtime.
struct OrtOperator(Arc<dyn CustomOperator>);

impl Operator for OrtOperator {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn inputs(&self) -> Vec<OperatorInput> {
        vec![OperatorInput::required(TensorElementType::Float32)]
    }

    fn outputs(&self) -> Vec<OperatorOutput> {
        vec![OperatorOutput::required(TensorElementType::Float32)]
    }

    fn create_kernel(&self, _: &KernelAttributes) -> ort::Result<Box<dyn Kernel>> {
        let operator = Arc::clone(&self.0);

        Ok(Box::new(move |ctx: &KernelContext| {
            let input = ctx
                .input(0)?
                .ok_or_else(|| ort::Error::new("missing input"))?;
            let array = input.try_extract_array::<f32>()?;

            let result = operator
                .compute(array)
                .map_err(|err| ort::Error::new(err.to_string()))?;

            // Safe: tensor dimensions are far below i64::MAX
            #[allow(clippy::cast_possible_wrap)]
            let shape: Vec<i64> = result.shape().iter().map(|&d| d as i64).collect();
            let mut output = ctx
                .output(0, shape)?
                .ok_or_else(|| ort::Error::new("missing output"))?;
            output.try_extract_array_mut::<f32>()?.assign(&result);

            Ok(())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimization_level_mapping() {
        assert!(matches!(
            GraphOptimizationLevel::from(OptimizationLevel::default()),
            GraphOptimizationLevel::Level3
        ));
        assert!(matches!(
            GraphOptimizationLevel::from(OptimizationLevel::Disable),
            GraphOptimizationLevel::Disable
        ));
    }

    #[test]
    fn test_same_file_ignores_spelling() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("net.onnx");
        fs::write(&model, b"graph").unwrap();

        assert!(same_file(&model, &dir.path().join(".").join("net.onnx")));
        assert!(!same_file(&model, &dir.path().join("net.onnx.data")));

        // Tests run from the package root
        assert!(same_file(Path::new("Cargo.toml"), Path::new("./Cargo.toml")));
    }

    #[test]
    fn test_external_data_location_matches_file_name() {
        let model = b"\x0a\x08location\x12\x0dnet.onnx.data";
        let definition = Path::new("models/net.onnx");

        for weights in ["net.onnx.data", "./net.onnx.data", "/srv/weights/net.onnx.data"] {
            let location = external_data_location(model, definition, Path::new(weights)).unwrap();
            assert_eq!(location, "net.onnx.data");
        }
    }

    #[test]
    fn test_unreferenced_weights_are_rejected() {
        // A model with inline initializers names no external file
        let model = b"\x0a\x06weight\x10\x01";
        let result = external_data_location(model, Path::new("net.onnx"), Path::new("anything.txt"));

        match result {
            Err(Error::WeightsLoad { path, source }) => {
                assert_eq!(path, Path::new("anything.txt"));
                assert!(source.to_string().contains("anything.txt"));
            }
            other => panic!("expected weights failure, got {other:?}"),
        }
        assert!(external_data_location(model, Path::new("net.onnx"), Path::new("/")).is_err());
    }

    #[test]
    fn test_missing_definition_fails_before_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let result = OnnxBackend::default().parse_definition(
            &OperatorRegistry::with_defaults(),
            &dir.path().join("missing.onnx"),
        );

        assert!(matches!(result, Err(Error::GraphDefinitionLoad { .. })));
    }
}
