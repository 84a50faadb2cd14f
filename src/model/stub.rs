//! Text-defined backend used by tests in place of ONNX Runtime.
//!
//! Definition file, one directive per line:
//!
//! ```text
//! input input
//! output out_ab
//! channels 2
//! size 256
//! op Sig17Slice
//! ```
//!
//! `channels` is the raw channel count before the operators run, `size` the output
//! side length (the input's by default), and `op` lines run in order and must name
//! registered operators.
//!
//! Weights file: `bias <f32>`, the constant raw activation.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ndarray::{Array4, ArrayD, Axis};
use tempfile::TempDir;

use crate::error::{BoxError, Error, Result};

use super::backend::{Extractor, Graph, InferenceBackend};
use super::handle::ModelHandle;
use super::operator::{CustomOperator, OperatorRegistry, Sig17Slice};

#[derive(Debug, Default, Clone)]
pub(crate) struct StubBackend {
    calls: Arc<AtomicUsize>,
}

impl StubBackend {
    pub(crate) fn forward_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub(crate) struct StubDefinition {
    input: String,
    output: String,
    channels: usize,
    size: Option<usize>,
    operators: Vec<Arc<dyn CustomOperator>>,
}

impl InferenceBackend for StubBackend {
    type Definition = StubDefinition;

    fn parse_definition(&self, operators: &OperatorRegistry, path: &Path) -> Result<StubDefinition> {
        let fail = |source: BoxError| Error::graph_definition(path, source);
        let text = fs::read_to_string(path).map_err(|err| fail(err.into()))?;

        let mut definition = StubDefinition {
            input: String::new(),
            output: String::new(),
            channels: 2,
            size: None,
            operators: Vec::new(),
        };

        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let (key, value) = line
                .split_once(' ')
                .ok_or_else(|| fail(format!("malformed line {line:?}").into()))?;
            match key {
                "input" => definition.input = value.to_string(),
                "output" => definition.output = value.to_string(),
                "channels" => {
                    definition.channels = value.parse().map_err(|_| fail(line.into()))?;
                }
                "size" => definition.size = Some(value.parse().map_err(|_| fail(line.into()))?),
                "op" => definition.operators.push(
                    operators
                        .get(value)
                        .ok_or_else(|| fail(format!("unregistered operator {value}").into()))?,
                ),
                _ => return Err(fail(format!("unknown directive {key:?}").into())),
            }
        }

        if definition.input.is_empty() || definition.output.is_empty() {
            return Err(fail("graph needs an input and an output".into()));
        }

        Ok(definition)
    }

    fn bind_weights(&self, definition: StubDefinition, path: &Path) -> Result<Box<dyn Graph>> {
        let fail = |source: BoxError| Error::weights(path, source);
        let text = fs::read_to_string(path).map_err(|err| fail(err.into()))?;
        let bias = text
            .trim()
            .strip_prefix("bias ")
            .and_then(|v| v.trim().parse::<f32>().ok())
            .ok_or_else(|| fail(format!("expected `bias <f32>`, got {text:?}").into()))?;

        Ok(Box::new(StubGraph {
            definition,
            bias,
            calls: Arc::clone(&self.calls),
        }))
    }
}

struct StubGraph {
    definition: StubDefinition,
    bias: f32,
    calls: Arc<AtomicUsize>,
}

impl StubGraph {
    fn forward(&self, input: &ArrayD<f32>) -> Result<ArrayD<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if input.ndim() != 4 || input.len_of(Axis(1)) != 1 {
            return Err(Error::inference(format!(
                "expected (1, 1, H, W) input, got {:?}",
                input.shape()
            )));
        }

        let height = self.definition.size.unwrap_or(input.shape()[2]);
        let width = self.definition.size.unwrap_or(input.shape()[3]);
        let mut out =
            Array4::from_elem((1, self.definition.channels, height, width), self.bias).into_dyn();

        for op in &self.definition.operators {
            out = op.compute(out.view())?;
        }

        Ok(out)
    }
}

impl Graph for StubGraph {
    fn input_names(&self) -> Vec<String> {
        vec![self.definition.input.clone()]
    }

    fn output_names(&self) -> Vec<String> {
        vec![self.definition.output.clone()]
    }

    fn extractor(&self) -> Box<dyn Extractor + '_> {
        Box::new(StubExtractor {
            graph: self,
            input: None,
        })
    }
}

struct StubExtractor<'a> {
    graph: &'a StubGraph,
    input: Option<ArrayD<f32>>,
}

impl Extractor for StubExtractor<'_> {
    fn input(&mut self, name: &str, tensor: ArrayD<f32>) -> Result<()> {
        if name != self.graph.definition.input {
            return Err(Error::inference(format!("no input named {name:?}")));
        }
        self.input = Some(tensor);
        Ok(())
    }

    fn extract(&mut self, name: &str) -> Result<ArrayD<f32>> {
        if name != self.graph.definition.output {
            return Err(Error::inference(format!("no output named {name:?}")));
        }
        let input = self
            .input
            .as_ref()
            .ok_or_else(|| Error::inference("input not bound"))?;
        self.graph.forward(input)
    }
}

/// Definition and weights files of a stub model in a temporary directory.
pub(crate) struct ModelFiles {
    pub(crate) dir: TempDir,
    pub(crate) definition: PathBuf,
    pub(crate) weights: PathBuf,
}

impl ModelFiles {
    /// A colorization-shaped model: 256x256 output through `Sig17Slice`.
    pub(crate) fn colorization(bias: f32) -> Self {
        Self::with_definition(
            &format!(
                "input input\noutput out_ab\nchannels 2\nsize 256\nop {}\n",
                Sig17Slice::NAME
            ),
            bias,
        )
    }

    pub(crate) fn with_definition(definition: &str, bias: f32) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let definition_path = dir.path().join("colornet.param");
        let weights = dir.path().join("colornet.bin");
        fs::write(&definition_path, definition).unwrap();
        fs::write(&weights, format!("bias {bias}\n")).unwrap();

        Self {
            dir,
            definition: definition_path,
            weights,
        }
    }

    pub(crate) fn load(&self, backend: &StubBackend) -> Result<ModelHandle> {
        ModelHandle::load(
            backend,
            &OperatorRegistry::with_defaults(),
            &self.definition,
            &self.weights,
        )
    }
}
