//! Per-type linear transform
//!
//! Applies an independent learnable `x * W + b` to each type's features.
//! Used as the affine step after heterogeneous normalization.

use std::collections::HashMap;

use ndarray::{Array1, Array2};
use rand_distr::{Distribution, Normal};

use crate::error::{HeteroError, Result};

/// Per-type linear layer with square weight matrices
///
/// Each type owns its own `[channels, channels]` weight and `[channels]`
/// bias, stored densely in type-list order. Supports the same deferred
/// channel resolution as [`HeteroNorm`](super::HeteroNorm).
#[derive(Debug, Clone)]
pub struct HeteroLinear {
    /// Type identifiers, fixed at construction
    types: Vec<String>,

    /// Type name -> position in the storage arenas
    type_ids: HashMap<String, usize>,

    state: LinearState,
}

#[derive(Debug, Clone)]
enum LinearState {
    /// Channel count unknown; no storage allocated yet
    Deferred,
    /// Storage allocated for a known channel count
    Ready {
        channels: usize,
        weights: Vec<Array2<f64>>,
        biases: Vec<Array1<f64>>,
    },
}

impl HeteroLinear {
    /// Create a layer with a known channel count
    pub fn new(types: &[String], channels: usize) -> Self {
        let mut layer = Self::deferred(types);
        layer.resolve(channels);
        layer
    }

    /// Create a layer that allocates its weights at resolution time
    pub fn deferred(types: &[String]) -> Self {
        let type_ids = types
            .iter()
            .enumerate()
            .map(|(i, ty)| (ty.clone(), i))
            .collect();
        Self {
            types: types.to_vec(),
            type_ids,
            state: LinearState::Deferred,
        }
    }

    /// Allocate weights for the given channel count
    ///
    /// A no-op once resolved; the channel count is fixed by the first call.
    pub fn resolve(&mut self, channels: usize) {
        if matches!(self.state, LinearState::Ready { .. }) {
            return;
        }
        let weights = self
            .types
            .iter()
            .map(|_| Self::init_weight(channels))
            .collect();
        let biases = self.types.iter().map(|_| Array1::zeros(channels)).collect();
        self.state = LinearState::Ready {
            channels,
            weights,
            biases,
        };
    }

    /// Whether weights have been allocated
    pub fn is_resolved(&self) -> bool {
        matches!(self.state, LinearState::Ready { .. })
    }

    /// Apply the per-type transform to every entry of `x_dict`
    pub fn apply(
        &self,
        x_dict: &HashMap<String, Array2<f64>>,
    ) -> Result<HashMap<String, Array2<f64>>> {
        let LinearState::Ready {
            channels,
            weights,
            biases,
        } = &self.state
        else {
            return Err(HeteroError::Configuration(
                "per-type linear layer applied before channel resolution".into(),
            ));
        };

        let mut out = HashMap::with_capacity(x_dict.len());
        for (ty, x) in x_dict {
            let idx = *self.type_ids.get(ty).ok_or_else(|| {
                HeteroError::InvalidInput(format!("unknown type '{ty}' in linear input"))
            })?;
            if x.ncols() != *channels {
                return Err(HeteroError::ShapeMismatch {
                    ty: ty.clone(),
                    expected: *channels,
                    found: x.ncols(),
                });
            }
            out.insert(ty.clone(), x.dot(&weights[idx]) + &biases[idx]);
        }
        Ok(out)
    }

    /// Re-sample all weights and zero all biases
    ///
    /// A no-op while deferred.
    pub fn reset_parameters(&mut self) {
        if let LinearState::Ready {
            channels,
            weights,
            biases,
        } = &mut self.state
        {
            for w in weights.iter_mut() {
                *w = Self::init_weight(*channels);
            }
            for b in biases.iter_mut() {
                b.fill(0.0);
            }
        }
    }

    /// Xavier-style initialization
    fn init_weight(channels: usize) -> Array2<f64> {
        let mut rng = rand::thread_rng();
        let normal = Normal::new(0.0, 1.0).unwrap();
        let scale = (1.0 / channels.max(1) as f64).sqrt();
        Array2::from_shape_fn((channels, channels), |_| normal.sample(&mut rng) * scale)
    }
}
