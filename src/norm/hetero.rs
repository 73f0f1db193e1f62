//! Heterogeneous normalization engine
//!
//! Normalizes each type's feature rows independently to zero mean and unit
//! variance, with optional running statistics and a per-type affine step.
//! One engine serves the batch-, instance-, and layer-style variants; the
//! variant only fixes which capabilities are active.

use std::collections::HashMap;

use ndarray::{Array1, Array2, Axis};
use tracing::debug;

use super::linear::HeteroLinear;
use super::{Channels, NormConfig, NormKind};
use crate::error::{HeteroError, Result};

/// Input accepted by [`HeteroNorm::forward`]
///
/// Either one tensor per type, or a single concatenated tensor with a
/// parallel vector of type indices (positions in the configured type list).
pub enum NormInput<'a> {
    /// One `[rows, channels]` tensor per type
    Partitioned(&'a HashMap<String, Array2<f64>>),
    /// Concatenated rows plus a per-row type index
    Fused {
        x: &'a Array2<f64>,
        type_vec: Option<&'a [usize]>,
    },
}

/// Output of [`HeteroNorm::forward`], mirroring the input shape
#[derive(Debug, Clone)]
pub enum NormOutput {
    Partitioned(HashMap<String, Array2<f64>>),
    Fused(Array2<f64>),
}

/// Per-type storage, allocated once the channel count is known
#[derive(Debug, Clone)]
struct NormStorage {
    in_channels: usize,

    /// Running mean per type, indexed by type position.
    /// Empty when running statistics are not tracked.
    running_means: Vec<Array1<f64>>,

    /// Running variance per type, on a standard-deviation-like scale
    /// (updated as the square root of blended squares)
    running_vars: Vec<Array1<f64>>,
}

/// Two-state lifecycle: channel count deferred until the first forward
/// call, or resolved with storage allocated. Resolution happens at most
/// once; the enum makes re-triggering impossible.
#[derive(Debug, Clone)]
enum NormState {
    Deferred,
    Ready(NormStorage),
}

/// Heterogeneous normalization over typed feature tensors
///
/// # Example
/// ```
/// use std::collections::HashMap;
/// use ndarray::Array2;
/// use hetero_graph_ops::norm::{Channels, HeteroNorm, NormConfig};
///
/// let types = vec!["user".to_string(), "item".to_string()];
/// let config = NormConfig::new().with_affine(false);
/// let mut norm = HeteroNorm::batch_norm(Channels::Fixed(4), types, config).unwrap();
///
/// let mut x_dict = HashMap::new();
/// x_dict.insert("user".to_string(), Array2::from_shape_fn((8, 4), |(i, j)| (i + j) as f64));
/// let out = norm.forward_dict(&x_dict).unwrap();
/// assert_eq!(out["user"].dim(), (8, 4));
/// ```
#[derive(Debug, Clone)]
pub struct HeteroNorm {
    kind: NormKind,

    /// Type identifiers in storage order
    types: Vec<String>,

    /// Type name -> position in the storage arenas, built once
    type_ids: HashMap<String, usize>,

    eps: f64,
    momentum: f64,
    track_running_stats: bool,
    allow_single_element: bool,

    /// Per-type affine transform, present when `affine = true`
    linear: Option<HeteroLinear>,

    state: NormState,
}

impl HeteroNorm {
    /// Create a normalization module for the given variant
    ///
    /// # Arguments
    /// * `kind` - Normalization variant
    /// * `channels` - Feature width, or `Channels::Deferred` to infer it
    ///   from the first forward call
    /// * `types` - Ordered list of distinct type identifiers
    /// * `config` - Shared settings; capabilities the variant does not
    ///   support are disabled regardless of the requested flags
    pub fn new(
        kind: NormKind,
        channels: Channels,
        types: Vec<String>,
        config: NormConfig,
    ) -> Result<Self> {
        if types.is_empty() {
            return Err(HeteroError::Configuration(
                "at least one type is required".into(),
            ));
        }
        let mut type_ids = HashMap::with_capacity(types.len());
        for (i, ty) in types.iter().enumerate() {
            if type_ids.insert(ty.clone(), i).is_some() {
                return Err(HeteroError::Configuration(format!(
                    "duplicate type '{ty}' in type list"
                )));
            }
        }
        if !(0.0..=1.0).contains(&config.momentum) || !config.momentum.is_finite() {
            return Err(HeteroError::Configuration(format!(
                "momentum must be in [0, 1], got {}",
                config.momentum
            )));
        }
        if config.allow_single_element && !config.track_running_stats {
            return Err(HeteroError::Configuration(
                "'allow_single_element' requires 'track_running_stats'".into(),
            ));
        }
        if let Channels::Fixed(0) = channels {
            return Err(HeteroError::Configuration(
                "channel count must be non-zero".into(),
            ));
        }

        // The variant gates which capabilities stay active
        let track_running_stats = config.track_running_stats && kind.supports_running_stats();
        let allow_single_element = config.allow_single_element && kind.allows_single_element();
        let momentum = match kind {
            NormKind::Layer => 0.0,
            _ => config.momentum,
        };

        let linear = config.affine.then(|| match channels {
            Channels::Fixed(c) => HeteroLinear::new(&types, c),
            Channels::Deferred => HeteroLinear::deferred(&types),
        });

        let state = match channels {
            Channels::Fixed(c) => {
                NormState::Ready(Self::allocate(c, types.len(), track_running_stats))
            }
            Channels::Deferred => NormState::Deferred,
        };

        Ok(Self {
            kind,
            types,
            type_ids,
            eps: config.eps,
            momentum,
            track_running_stats,
            allow_single_element,
            linear,
            state,
        })
    }

    /// Batch-style preset: running statistics and the single-element
    /// fallback are available as configured
    pub fn batch_norm(channels: Channels, types: Vec<String>, config: NormConfig) -> Result<Self> {
        Self::new(NormKind::Batch, channels, types, config)
    }

    /// Instance-style preset: always normalizes from batch statistics;
    /// running statistics and the single-element fallback are disabled
    /// unconditionally
    pub fn instance_norm(
        channels: Channels,
        types: Vec<String>,
        config: NormConfig,
    ) -> Result<Self> {
        let config = config
            .with_track_running_stats(false)
            .with_allow_single_element(false);
        Self::new(NormKind::Instance, channels, types, config)
    }

    /// Layer-style preset: batch statistics only, momentum unused
    pub fn layer_norm(channels: Channels, types: Vec<String>, config: NormConfig) -> Result<Self> {
        let config = config
            .with_momentum(0.0)
            .with_track_running_stats(false)
            .with_allow_single_element(false);
        Self::new(NormKind::Layer, channels, types, config)
    }

    /// Normalization variant
    pub fn kind(&self) -> NormKind {
        self.kind
    }

    /// Configured type identifiers, in storage order
    pub fn types(&self) -> &[String] {
        &self.types
    }

    /// Resolved channel count, or `None` while deferred
    pub fn in_channels(&self) -> Option<usize> {
        match &self.state {
            NormState::Ready(storage) => Some(storage.in_channels),
            NormState::Deferred => None,
        }
    }

    /// Whether the channel count has been resolved
    pub fn is_resolved(&self) -> bool {
        matches!(self.state, NormState::Ready(_))
    }

    /// Whether running statistics are tracked (after variant gating)
    pub fn track_running_stats(&self) -> bool {
        self.track_running_stats
    }

    /// Whether singleton batches fall back to stored statistics
    pub fn allow_single_element(&self) -> bool {
        self.allow_single_element
    }

    /// Current running mean for a type, if tracked and resolved
    pub fn running_mean(&self, ty: &str) -> Option<&Array1<f64>> {
        let idx = *self.type_ids.get(ty)?;
        match &self.state {
            NormState::Ready(storage) => storage.running_means.get(idx),
            NormState::Deferred => None,
        }
    }

    /// Current running variance for a type, if tracked and resolved
    pub fn running_var(&self, ty: &str) -> Option<&Array1<f64>> {
        let idx = *self.type_ids.get(ty)?;
        match &self.state {
            NormState::Ready(storage) => storage.running_vars.get(idx),
            NormState::Deferred => None,
        }
    }

    /// Reinitialize the affine weights and reset running statistics to
    /// zero mean / unit variance
    ///
    /// Idempotent; a no-op while the channel count is deferred.
    pub fn reset_parameters(&mut self) {
        if let Some(linear) = &mut self.linear {
            linear.reset_parameters();
        }
        if let NormState::Ready(storage) = &mut self.state {
            for mean in &mut storage.running_means {
                mean.fill(0.0);
            }
            for var in &mut storage.running_vars {
                var.fill(1.0);
            }
        }
        debug!(kind = %self.kind, "reset normalization parameters");
    }

    /// Normalize, accepting either input shape
    pub fn forward(&mut self, input: NormInput<'_>) -> Result<NormOutput> {
        match input {
            NormInput::Partitioned(x_dict) => {
                Ok(NormOutput::Partitioned(self.forward_dict(x_dict)?))
            }
            NormInput::Fused {
                x,
                type_vec: Some(type_vec),
            } => Ok(NormOutput::Fused(self.forward_fused(x, type_vec)?)),
            NormInput::Fused { type_vec: None, .. } => Err(HeteroError::InvalidInput(
                "a fused tensor requires a parallel type vector".into(),
            )),
        }
    }

    /// Normalize one tensor per type
    pub fn forward_dict(
        &mut self,
        x_dict: &HashMap<String, Array2<f64>>,
    ) -> Result<HashMap<String, Array2<f64>>> {
        for ty in x_dict.keys() {
            if !self.type_ids.contains_key(ty) {
                return Err(HeteroError::InvalidInput(format!(
                    "unknown type '{ty}' in input"
                )));
            }
        }
        self.ensure_resolved(x_dict)?;

        let eps = self.eps;
        let momentum = self.momentum;
        let track = self.track_running_stats;
        let allow = self.allow_single_element;

        let NormState::Ready(storage) = &mut self.state else {
            return Err(HeteroError::InvalidInput(
                "cannot normalize an empty input with a deferred channel count".into(),
            ));
        };

        let mut out = HashMap::with_capacity(x_dict.len());
        for (idx, ty) in self.types.iter().enumerate() {
            let Some(x) = x_dict.get(ty) else {
                continue;
            };
            if x.ncols() != storage.in_channels {
                return Err(HeteroError::ShapeMismatch {
                    ty: ty.clone(),
                    expected: storage.in_channels,
                    found: x.ncols(),
                });
            }

            let (mean, var) = if allow && x.nrows() <= 1 {
                // Inference path: singleton batch statistics would be
                // degenerate, use the stored running values as-is
                (
                    storage.running_means[idx].clone(),
                    storage.running_vars[idx].clone(),
                )
            } else {
                if x.nrows() == 0 {
                    return Err(HeteroError::InvalidInput(format!(
                        "empty batch for type '{ty}'"
                    )));
                }
                let n = x.nrows() as f64;
                let batch_mean = x.sum_axis(Axis(0)) / n;
                let centered = x - &batch_mean;
                // Biased (population) variance
                let batch_var = centered.mapv(|v| v * v).sum_axis(Axis(0)) / n;

                if track {
                    // Momentum weights the previous running value. The
                    // variance blends squares and stores the square root,
                    // keeping the running value on a std-like scale.
                    let new_mean =
                        &storage.running_means[idx] * momentum + &batch_mean * (1.0 - momentum);
                    let blended = storage.running_vars[idx].mapv(|v| v * v) * momentum
                        + batch_var.mapv(|v| v * v) * (1.0 - momentum);
                    let new_var = blended.mapv(f64::sqrt);
                    storage.running_means[idx] = new_mean;
                    storage.running_vars[idx] = new_var;
                    // The updated running values are the normalization reference
                    (
                        storage.running_means[idx].clone(),
                        storage.running_vars[idx].clone(),
                    )
                } else {
                    (batch_mean, batch_var)
                }
            };

            let denom = var.mapv(|v| (v + eps).sqrt());
            out.insert(ty.clone(), (x - &mean) / &denom);
        }

        match &self.linear {
            Some(linear) => linear.apply(&out),
            None => Ok(out),
        }
    }

    /// Normalize a concatenated tensor with a per-row type index
    ///
    /// Rows are split per type, normalized through the partitioned path,
    /// and reassembled into the original row order.
    pub fn forward_fused(&mut self, x: &Array2<f64>, type_vec: &[usize]) -> Result<Array2<f64>> {
        if type_vec.len() != x.nrows() {
            return Err(HeteroError::InvalidInput(format!(
                "type vector length {} does not match {} rows",
                type_vec.len(),
                x.nrows()
            )));
        }

        let mut rows_per_type: Vec<Vec<usize>> = vec![Vec::new(); self.types.len()];
        for (row, &t) in type_vec.iter().enumerate() {
            let bucket = rows_per_type.get_mut(t).ok_or_else(|| {
                HeteroError::InvalidInput(format!(
                    "type index {t} out of range for {} types",
                    self.types.len()
                ))
            })?;
            bucket.push(row);
        }

        let mut x_dict = HashMap::new();
        for (t, rows) in rows_per_type.iter().enumerate() {
            if rows.is_empty() {
                continue;
            }
            x_dict.insert(self.types[t].clone(), x.select(Axis(0), rows));
        }

        let out_dict = self.forward_dict(&x_dict)?;

        let mut out = Array2::zeros((x.nrows(), x.ncols()));
        for (t, rows) in rows_per_type.iter().enumerate() {
            if rows.is_empty() {
                continue;
            }
            let y = &out_dict[&self.types[t]];
            for (k, &row) in rows.iter().enumerate() {
                out.row_mut(row).assign(&y.row(k));
            }
        }
        Ok(out)
    }

    /// Resolve the deferred channel count from the input widths
    ///
    /// All types must agree on the width. The affine layer resolves first,
    /// then the running-statistics storage is allocated. Idempotent: once
    /// `Ready`, this returns immediately.
    fn ensure_resolved(&mut self, x_dict: &HashMap<String, Array2<f64>>) -> Result<()> {
        if matches!(self.state, NormState::Ready(_)) {
            return Ok(());
        }
        let mut iter = x_dict.iter();
        let Some((_, first)) = iter.next() else {
            return Err(HeteroError::InvalidInput(
                "cannot infer channel count from an empty input".into(),
            ));
        };
        let channels = first.ncols();
        for (ty, x) in iter {
            if x.ncols() != channels {
                return Err(HeteroError::ShapeMismatch {
                    ty: ty.clone(),
                    expected: channels,
                    found: x.ncols(),
                });
            }
        }
        if channels == 0 {
            return Err(HeteroError::Configuration(
                "channel count must be non-zero".into(),
            ));
        }

        if let Some(linear) = &mut self.linear {
            linear.resolve(channels);
        }
        self.state = NormState::Ready(Self::allocate(
            channels,
            self.types.len(),
            self.track_running_stats,
        ));
        debug!(channels, kind = %self.kind, "resolved deferred channel count");
        Ok(())
    }

    fn allocate(channels: usize, n_types: usize, track: bool) -> NormStorage {
        let (running_means, running_vars) = if track {
            (
                vec![Array1::zeros(channels); n_types],
                vec![Array1::ones(channels); n_types],
            )
        } else {
            (Vec::new(), Vec::new())
        };
        NormStorage {
            in_channels: channels,
            running_means,
            running_vars,
        }
    }
}

impl std::fmt::Display for HeteroNorm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.in_channels() {
            Some(c) => write!(
                f,
                "HeteroNorm({}, {} types, {} channels)",
                self.kind,
                self.types.len(),
                c
            ),
            None => write!(
                f,
                "HeteroNorm({}, {} types, deferred channels)",
                self.kind,
                self.types.len()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HeteroError;

    fn types(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn plain_config() -> NormConfig {
        NormConfig::new()
            .with_affine(false)
            .with_track_running_stats(false)
    }

    #[test]
    fn test_batch_stats_give_zero_mean_unit_variance() {
        let mut norm = HeteroNorm::batch_norm(
            Channels::Fixed(3),
            types(&["user", "item"]),
            plain_config(),
        )
        .unwrap();

        let mut x_dict = HashMap::new();
        x_dict.insert(
            "user".to_string(),
            Array2::from_shape_fn((10, 3), |(i, j)| (i * 3 + j) as f64 * 0.7 - 2.0),
        );
        x_dict.insert(
            "item".to_string(),
            Array2::from_shape_fn((6, 3), |(i, j)| ((i + 1) * (j + 2)) as f64),
        );

        let out = norm.forward_dict(&x_dict).unwrap();
        for ty in ["user", "item"] {
            let y = &out[ty];
            let n = y.nrows() as f64;
            for j in 0..3 {
                let col = y.column(j);
                let mean = col.sum() / n;
                let var = col.mapv(|v| (v - mean) * (v - mean)).sum() / n;
                assert!(mean.abs() < 1e-9, "{ty} col {j} mean {mean}");
                assert!((var - 1.0).abs() < 1e-3, "{ty} col {j} var {var}");
            }
        }
    }

    #[test]
    fn running_stats_follow_sqrt_blend_rule() {
        let config = NormConfig::new().with_affine(false);
        let mut norm =
            HeteroNorm::batch_norm(Channels::Fixed(1), types(&["asset"]), config).unwrap();

        let mut x_dict = HashMap::new();
        x_dict.insert(
            "asset".to_string(),
            Array2::from_shape_vec((2, 1), vec![1.0, 5.0]).unwrap(),
        );
        let out = norm.forward_dict(&x_dict).unwrap();

        // batch_mean = 3, biased batch_var = 4; initial running stats (0, 1)
        let expected_mean = 0.1 * 0.0 + 0.9 * 3.0;
        let expected_var = (0.1 * 1.0_f64.powi(2) + 0.9 * 4.0_f64.powi(2)).sqrt();
        let rm = norm.running_mean("asset").unwrap()[0];
        let rv = norm.running_var("asset").unwrap()[0];
        assert!((rm - expected_mean).abs() < 1e-12);
        assert!((rv - expected_var).abs() < 1e-12);

        // The updated running stats, not the raw batch stats, normalize the output
        let expected_first = (1.0 - expected_mean) / (expected_var + 1e-5).sqrt();
        assert!((out["asset"][[0, 0]] - expected_first).abs() < 1e-12);
    }

    #[test]
    fn test_single_element_uses_stored_stats() {
        let config = NormConfig::new()
            .with_affine(false)
            .with_allow_single_element(true);
        let mut norm =
            HeteroNorm::batch_norm(Channels::Fixed(1), types(&["asset"]), config).unwrap();

        // One training step to populate the running statistics
        let mut x_dict = HashMap::new();
        x_dict.insert(
            "asset".to_string(),
            Array2::from_shape_vec((2, 1), vec![1.0, 5.0]).unwrap(),
        );
        norm.forward_dict(&x_dict).unwrap();
        let rm = norm.running_mean("asset").unwrap()[0];
        let rv = norm.running_var("asset").unwrap()[0];

        // A singleton batch must normalize with the stored statistics and
        // leave them untouched
        let mut single = HashMap::new();
        single.insert(
            "asset".to_string(),
            Array2::from_shape_vec((1, 1), vec![10.0]).unwrap(),
        );
        let out = norm.forward_dict(&single).unwrap();
        let expected = (10.0 - rm) / (rv + 1e-5).sqrt();
        assert!((out["asset"][[0, 0]] - expected).abs() < 1e-12);
        assert_eq!(norm.running_mean("asset").unwrap()[0], rm);
        assert_eq!(norm.running_var("asset").unwrap()[0], rv);
    }

    #[test]
    fn test_single_element_requires_tracking() {
        let config = NormConfig::new()
            .with_track_running_stats(false)
            .with_allow_single_element(true);
        let result = HeteroNorm::batch_norm(Channels::Fixed(4), types(&["a"]), config);
        assert!(matches!(result, Err(HeteroError::Configuration(_))));
    }

    #[test]
    fn test_reset_parameters_is_idempotent() {
        let config = NormConfig::new().with_affine(false);
        let mut norm =
            HeteroNorm::batch_norm(Channels::Fixed(2), types(&["a"]), config).unwrap();

        let mut x_dict = HashMap::new();
        x_dict.insert(
            "a".to_string(),
            Array2::from_shape_vec((3, 2), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap(),
        );
        norm.forward_dict(&x_dict).unwrap();
        assert!(norm.running_mean("a").unwrap()[0] != 0.0);

        norm.reset_parameters();
        let mean_once = norm.running_mean("a").unwrap().clone();
        let var_once = norm.running_var("a").unwrap().clone();
        assert!(mean_once.iter().all(|&v| v == 0.0));
        assert!(var_once.iter().all(|&v| v == 1.0));

        norm.reset_parameters();
        assert_eq!(norm.running_mean("a").unwrap(), &mean_once);
        assert_eq!(norm.running_var("a").unwrap(), &var_once);
    }

    #[test]
    fn test_lazy_resolution_infers_width() {
        let mut norm = HeteroNorm::batch_norm(
            Channels::Deferred,
            types(&["user", "item"]),
            NormConfig::new(),
        )
        .unwrap();
        assert!(!norm.is_resolved());

        let mut x_dict = HashMap::new();
        x_dict.insert("user".to_string(), Array2::from_elem((4, 5), 1.0));
        x_dict.insert("item".to_string(), Array2::from_elem((3, 5), 2.0));
        norm.forward_dict(&x_dict).unwrap();

        assert!(norm.is_resolved());
        assert_eq!(norm.in_channels(), Some(5));
        assert_eq!(norm.running_mean("user").unwrap().len(), 5);
    }

    #[test]
    fn test_lazy_resolution_rejects_mixed_widths() {
        let mut norm = HeteroNorm::batch_norm(
            Channels::Deferred,
            types(&["user", "item"]),
            NormConfig::new(),
        )
        .unwrap();

        let mut x_dict = HashMap::new();
        x_dict.insert("user".to_string(), Array2::from_elem((4, 5), 1.0));
        x_dict.insert("item".to_string(), Array2::from_elem((3, 4), 2.0));
        let result = norm.forward_dict(&x_dict);
        assert!(matches!(result, Err(HeteroError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_resolution_happens_once() {
        let config = NormConfig::new().with_affine(false);
        let mut norm =
            HeteroNorm::batch_norm(Channels::Deferred, types(&["a"]), config).unwrap();

        let mut x_dict = HashMap::new();
        x_dict.insert("a".to_string(), Array2::from_elem((4, 3), 1.0));
        norm.forward_dict(&x_dict).unwrap();
        assert_eq!(norm.in_channels(), Some(3));

        // A later input with a different width is an error, not a re-resolution
        let mut wider = HashMap::new();
        wider.insert("a".to_string(), Array2::from_elem((4, 6), 1.0));
        let result = norm.forward_dict(&wider);
        assert!(matches!(result, Err(HeteroError::ShapeMismatch { .. })));
        assert_eq!(norm.in_channels(), Some(3));
    }

    #[test]
    fn fused_forward_matches_dict_forward_row_order() {
        // The fused path re-scatters per-type outputs into the original
        // row order, producing a well-formed fused tensor.
        let mut norm =
            HeteroNorm::batch_norm(Channels::Fixed(2), types(&["a", "b"]), plain_config())
                .unwrap();

        let x = Array2::from_shape_vec(
            (4, 2),
            vec![1.0, 2.0, 10.0, 20.0, 3.0, 4.0, 30.0, 40.0],
        )
        .unwrap();
        let type_vec = [0, 1, 0, 1];
        let fused = norm.forward_fused(&x, &type_vec).unwrap();

        let mut x_dict = HashMap::new();
        x_dict.insert(
            "a".to_string(),
            Array2::from_shape_vec((2, 2), vec![1.0, 2.0, 3.0, 4.0]).unwrap(),
        );
        x_dict.insert(
            "b".to_string(),
            Array2::from_shape_vec((2, 2), vec![10.0, 20.0, 30.0, 40.0]).unwrap(),
        );
        let dict_out = norm.forward_dict(&x_dict).unwrap();

        for j in 0..2 {
            assert_eq!(fused[[0, j]], dict_out["a"][[0, j]]);
            assert_eq!(fused[[2, j]], dict_out["a"][[1, j]]);
            assert_eq!(fused[[1, j]], dict_out["b"][[0, j]]);
            assert_eq!(fused[[3, j]], dict_out["b"][[1, j]]);
        }
    }

    #[test]
    fn test_fused_without_type_vec_is_invalid() {
        let mut norm =
            HeteroNorm::batch_norm(Channels::Fixed(2), types(&["a"]), plain_config()).unwrap();
        let x = Array2::from_elem((3, 2), 1.0);
        let result = norm.forward(NormInput::Fused {
            x: &x,
            type_vec: None,
        });
        assert!(matches!(result, Err(HeteroError::InvalidInput(_))));
    }

    #[test]
    fn test_fused_length_mismatch_is_invalid() {
        let mut norm =
            HeteroNorm::batch_norm(Channels::Fixed(2), types(&["a"]), plain_config()).unwrap();
        let x = Array2::from_elem((3, 2), 1.0);
        let result = norm.forward_fused(&x, &[0, 0]);
        assert!(matches!(result, Err(HeteroError::InvalidInput(_))));
    }

    #[test]
    fn test_unknown_type_key_is_invalid() {
        let mut norm =
            HeteroNorm::batch_norm(Channels::Fixed(2), types(&["a"]), plain_config()).unwrap();
        let mut x_dict = HashMap::new();
        x_dict.insert("z".to_string(), Array2::from_elem((3, 2), 1.0));
        let result = norm.forward_dict(&x_dict);
        assert!(matches!(result, Err(HeteroError::InvalidInput(_))));
    }

    #[test]
    fn test_instance_preset_forces_flags_off() {
        let config = NormConfig::new()
            .with_track_running_stats(true)
            .with_allow_single_element(true);
        let norm = HeteroNorm::instance_norm(Channels::Fixed(4), types(&["a"]), config).unwrap();
        assert!(!norm.track_running_stats());
        assert!(!norm.allow_single_element());
        assert!(norm.running_mean("a").is_none());
    }

    #[test]
    fn test_layer_preset_pins_momentum() {
        let config = NormConfig::new().with_momentum(0.5);
        let norm = HeteroNorm::layer_norm(Channels::Fixed(4), types(&["a"]), config).unwrap();
        assert_eq!(norm.kind(), NormKind::Layer);
        assert!(!norm.track_running_stats());
    }

    #[test]
    fn test_affine_preserves_shape_and_keys() {
        let config = NormConfig::new().with_track_running_stats(false);
        let mut norm =
            HeteroNorm::batch_norm(Channels::Fixed(3), types(&["user", "item"]), config).unwrap();

        let mut x_dict = HashMap::new();
        x_dict.insert(
            "user".to_string(),
            Array2::from_shape_fn((5, 3), |(i, j)| (i + j) as f64),
        );
        x_dict.insert(
            "item".to_string(),
            Array2::from_shape_fn((2, 3), |(i, j)| (i * j) as f64),
        );
        let out = norm.forward_dict(&x_dict).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out["user"].dim(), (5, 3));
        assert_eq!(out["item"].dim(), (2, 3));
    }

    #[test]
    fn test_empty_type_list_rejected() {
        let result = HeteroNorm::batch_norm(Channels::Fixed(4), vec![], NormConfig::new());
        assert!(matches!(result, Err(HeteroError::Configuration(_))));
    }

    #[test]
    fn test_momentum_out_of_range_rejected() {
        let config = NormConfig::new().with_momentum(1.5);
        let result = HeteroNorm::batch_norm(Channels::Fixed(4), types(&["a"]), config);
        assert!(matches!(result, Err(HeteroError::Configuration(_))));
    }
}
