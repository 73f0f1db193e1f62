//! # Heterogeneous Graph Ops
//!
//! Numerical primitives for graphs whose nodes or edges are partitioned
//! into distinct types, or whose nodes are being coarsened into clusters.
//!
//! ## Features
//!
//! - **Heterogeneous Normalization**: per-type zero-mean/unit-variance
//!   normalization with batch-, instance-, and layer-style variants,
//!   running statistics, and an optional learned per-type affine step
//! - **Edge Filtering**: rebuild the adjacency list (and edge attributes)
//!   after a clustering step that retains a subset of nodes
//!
//! ## Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use ndarray::Array2;
//! use hetero_graph_ops::prelude::*;
//! use hetero_graph_ops::norm::{Channels, NormConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     // Normalize two node types independently
//!     let types = vec!["user".to_string(), "item".to_string()];
//!     let config = NormConfig::new().with_affine(false);
//!     let mut norm = HeteroNorm::batch_norm(Channels::Fixed(4), types, config)?;
//!
//!     let mut x_dict = HashMap::new();
//!     x_dict.insert("user".to_string(), Array2::from_elem((8, 4), 1.5));
//!     x_dict.insert("item".to_string(), Array2::from_elem((3, 4), -0.5));
//!     let normalized = norm.forward_dict(&x_dict)?;
//!     assert_eq!(normalized.len(), 2);
//!
//!     // Coarsen a 5-node graph down to nodes {0, 2, 4}
//!     let select = SelectOutput::new(vec![0, 2, 4], vec![0, 1, 2], 5, 3)?;
//!     let edges = EdgeIndex::from_pairs(&[(0, 1), (0, 2), (2, 4), (3, 4)]);
//!     let out = FilterEdges::new().connect(&select, &edges, None, None)?;
//!     assert_eq!(out.edge_index.len(), 2);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod norm;
pub mod pool;

// Re-exports for convenience
pub use error::{HeteroError, Result};
pub use norm::{Channels, HeteroLinear, HeteroNorm, NormConfig, NormInput, NormKind, NormOutput};
pub use pool::{ConnectOutput, EdgeIndex, FilterEdges, SelectOutput};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::HeteroError;
    pub use crate::norm::{HeteroNorm, NormInput, NormOutput};
    pub use crate::pool::{ConnectOutput, EdgeIndex, FilterEdges, SelectOutput};
}
