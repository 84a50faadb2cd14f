//! Custom operators that graph definitions may reference.
//!
//! A graph definition that uses a non-standard node can only be parsed once the
//! node's implementation is known to the runtime. Operators are therefore collected
//! in an [`OperatorRegistry`] which is handed to the backend before parsing.

use std::fmt;
use std::sync::Arc;

use ndarray::{ArrayD, ArrayViewD, Axis, Slice};

use crate::error::{Error, Result};
use crate::image::AB_CHANNELS;

/// Scale of the chrominance range produced by [`Sig17Slice`].
pub const AB_SCALE: f32 = 110.0;

/// A single-input, single-output `f32` tensor operator.
pub trait CustomOperator: Send + Sync {
    /// Node type name as it appears in graph definitions.
    fn name(&self) -> &str;

    /// Compute the output tensor for `input`.
    ///
    /// # Errors
    ///
    /// Returns an error if the input shape is not supported.
    fn compute(&self, input: ArrayViewD<'_, f32>) -> Result<ArrayD<f32>>;
}

/// Fused sigmoid-and-channel-slice head of the colorization network.
///
/// Keeps the first two channels of an NCHW tensor and maps them through a
/// logistic sigmoid into `[-AB_SCALE, AB_SCALE]`, yielding the a and b planes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sig17Slice;

impl Sig17Slice {
    /// Node type name in the colorization graph.
    pub const NAME: &'static str = "Sig17Slice";
}

impl CustomOperator for Sig17Slice {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn compute(&self, input: ArrayViewD<'_, f32>) -> Result<ArrayD<f32>> {
        if input.ndim() != 4 || input.len_of(Axis(1)) < AB_CHANNELS {
            return Err(Error::ShapeMismatch {
                expected: format!("NCHW tensor with at least {AB_CHANNELS} channels"),
                actual: format!("{:?}", input.shape()),
            });
        }

        Ok(input
            .slice_axis(Axis(1), Slice::from(0..AB_CHANNELS))
            .mapv(|x| (sigmoid(x) - 0.5) * 2.0 * AB_SCALE))
    }
}

#[inline]
fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Set of custom operators available to graph definitions.
#[derive(Clone, Default)]
pub struct OperatorRegistry {
    operators: Vec<Arc<dyn CustomOperator>>,
}

impl OperatorRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the operators the colorization network requires.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Sig17Slice);
        registry
    }

    /// Register an operator, replacing any operator with the same name.
    pub fn register(&mut self, operator: impl CustomOperator + 'static) -> &mut Self {
        self.operators.retain(|op| op.name() != operator.name());
        self.operators.push(Arc::new(operator));
        self
    }

    /// Look up an operator by node type name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn CustomOperator>> {
        self.operators.iter().find(|op| op.name() == name).cloned()
    }

    /// Whether an operator with this name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.operators.iter().any(|op| op.name() == name)
    }

    /// Iterate over the registered operators.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn CustomOperator>> {
        self.operators.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.operators.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }
}

impl fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.operators.iter().map(|op| op.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array4;

    #[test]
    fn test_sig17_slice_shape() {
        let raw = Array4::<f32>::zeros((1, 5, 8, 6)).into_dyn();
        let out = Sig17Slice.compute(raw.view()).unwrap();

        assert_eq!(out.shape(), &[1, 2, 8, 6]);
    }

    #[test]
    fn test_sig17_slice_neutral_and_range() {
        let mut raw = Array4::<f32>::zeros((1, 2, 1, 3));
        raw[[0, 0, 0, 1]] = 50.0;
        raw[[0, 1, 0, 2]] = -50.0;

        let out = Sig17Slice.compute(raw.into_dyn().view()).unwrap();

        assert!(out[[0, 0, 0, 0]].abs() < 1e-6);
        assert!((out[[0, 0, 0, 1]] - AB_SCALE).abs() < 1e-3);
        assert!((out[[0, 1, 0, 2]] + AB_SCALE).abs() < 1e-3);
    }

    #[test]
    fn test_sig17_slice_keeps_leading_channels() {
        let raw = Array4::from_shape_fn((1, 3, 1, 1), |(_, c, _, _)| c as f32);
        let out = Sig17Slice.compute(raw.into_dyn().view()).unwrap();

        assert!(out[[0, 0, 0, 0]].abs() < 1e-6);
        assert!(out[[0, 1, 0, 0]] > 0.0);
    }

    #[test]
    fn test_sig17_slice_rejects_single_channel() {
        let raw = Array4::<f32>::zeros((1, 1, 4, 4)).into_dyn();
        assert!(Sig17Slice.compute(raw.view()).is_err());
    }

    #[test]
    fn test_registry_lookup_and_replace() {
        let mut registry = OperatorRegistry::new();
        assert!(registry.is_empty());
        assert!(!registry.contains(Sig17Slice::NAME));

        registry.register(Sig17Slice).register(Sig17Slice);

        assert_eq!(registry.len(), 1);
        assert!(registry.get(Sig17Slice::NAME).is_some());
        assert!(registry.get("Missing").is_none());
        assert_eq!(format!("{registry:?}"), "[\"Sig17Slice\"]");
    }

    #[test]
    fn test_defaults_include_sig17_slice() {
        assert!(OperatorRegistry::with_defaults().contains(Sig17Slice::NAME));
    }
}
