//! Heterogeneous feature normalization
//!
//! This module normalizes node or edge features independently per type,
//! with batch-, instance-, and layer-style variants sharing one engine.

mod hetero;
mod linear;

pub use hetero::{HeteroNorm, NormInput, NormOutput};
pub use linear::HeteroLinear;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HeteroError;

/// Normalization variant
///
/// The variant fixes which capabilities are meaningful: only the batch-like
/// variant tracks running statistics or falls back to them for singleton
/// batches; the layer-like variant additionally ignores momentum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormKind {
    /// Batch statistics during training, running statistics available for inference
    Batch,
    /// Always batch statistics; running statistics disabled
    Instance,
    /// Always batch statistics; running statistics and momentum disabled
    Layer,
}

impl NormKind {
    /// Whether this variant may track running mean/variance across calls
    pub fn supports_running_stats(&self) -> bool {
        matches!(self, NormKind::Batch)
    }

    /// Whether this variant may fall back to stored statistics for
    /// single-element batches
    pub fn allows_single_element(&self) -> bool {
        matches!(self, NormKind::Batch)
    }
}

impl FromStr for NormKind {
    type Err = HeteroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "batchnorm" => Ok(NormKind::Batch),
            "instancenorm" => Ok(NormKind::Instance),
            "layernorm" => Ok(NormKind::Layer),
            other => Err(HeteroError::Configuration(format!(
                "unknown norm kind '{other}', expected one of \
                 \"BatchNorm\", \"InstanceNorm\", \"LayerNorm\""
            ))),
        }
    }
}

impl std::fmt::Display for NormKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NormKind::Batch => write!(f, "batchnorm"),
            NormKind::Instance => write!(f, "instancenorm"),
            NormKind::Layer => write!(f, "layernorm"),
        }
    }
}

/// Channel count supplied at construction
///
/// `Deferred` postpones allocation of per-type storage until the first
/// forward call, which infers the width from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Channels {
    /// Infer the channel count from the first forward call
    Deferred,
    /// Known channel count
    Fixed(usize),
}

/// Normalization settings shared by all variants
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NormConfig {
    /// Value added to the variance for numerical stability
    pub eps: f64,

    /// Smoothing factor for running statistics, in `[0, 1]`.
    /// Weights the previous running value in the blend.
    pub momentum: f64,

    /// Whether a learnable per-type affine transform follows normalization
    pub affine: bool,

    /// Whether running mean/variance are tracked across training calls
    pub track_running_stats: bool,

    /// Whether single-element batches use the stored running statistics
    /// instead of degenerate batch statistics. Requires
    /// `track_running_stats`.
    pub allow_single_element: bool,
}

impl Default for NormConfig {
    fn default() -> Self {
        Self {
            eps: 1e-5,
            momentum: 0.1,
            affine: true,
            track_running_stats: true,
            allow_single_element: false,
        }
    }
}

impl NormConfig {
    /// Create a configuration with the defaults
    /// (`eps = 1e-5`, `momentum = 0.1`, `affine = true`,
    /// `track_running_stats = true`, `allow_single_element = false`)
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the epsilon value
    pub fn with_eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }

    /// Override the momentum value
    pub fn with_momentum(mut self, momentum: f64) -> Self {
        self.momentum = momentum;
        self
    }

    /// Enable or disable the per-type affine transform
    pub fn with_affine(mut self, affine: bool) -> Self {
        self.affine = affine;
        self
    }

    /// Enable or disable running-statistics tracking
    pub fn with_track_running_stats(mut self, track: bool) -> Self {
        self.track_running_stats = track;
        self
    }

    /// Enable or disable the single-element fallback
    pub fn with_allow_single_element(mut self, allow: bool) -> Self {
        self.allow_single_element = allow;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_norm_kind_parsing() {
        assert_eq!("BatchNorm".parse::<NormKind>().unwrap(), NormKind::Batch);
        assert_eq!(
            "instancenorm".parse::<NormKind>().unwrap(),
            NormKind::Instance
        );
        assert_eq!("LayerNorm".parse::<NormKind>().unwrap(), NormKind::Layer);
        assert!("groupnorm".parse::<NormKind>().is_err());
    }

    #[test]
    fn test_capability_flags() {
        assert!(NormKind::Batch.supports_running_stats());
        assert!(NormKind::Batch.allows_single_element());
        assert!(!NormKind::Instance.supports_running_stats());
        assert!(!NormKind::Layer.supports_running_stats());
        assert!(!NormKind::Layer.allows_single_element());
    }

    #[test]
    fn test_config_builder() {
        let config = NormConfig::new()
            .with_eps(1e-3)
            .with_momentum(0.2)
            .with_affine(false);
        assert_eq!(config.eps, 1e-3);
        assert_eq!(config.momentum, 0.2);
        assert!(!config.affine);
        assert!(config.track_running_stats);
    }
}
