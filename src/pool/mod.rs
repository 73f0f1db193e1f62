//! Graph coarsening descriptors and edge filtering
//!
//! Types describing a node selection/cluster assignment and the connect
//! step that rebuilds the adjacency list of the coarsened graph.

mod filter_edges;

pub use filter_edges::{filter_adj, FilterEdges};

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{HeteroError, Result};

/// Output of a node selection step
///
/// `node_index` lists the retained original node ids; `cluster_index` is
/// parallel to it and gives each retained node's cluster id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOutput {
    /// Retained original node ids
    pub node_index: Vec<usize>,

    /// Cluster id for each retained node
    pub cluster_index: Vec<usize>,

    /// Size of the original node set
    pub num_nodes: usize,

    /// Number of distinct clusters
    pub num_clusters: usize,
}

impl SelectOutput {
    /// Create a selection descriptor, validating index ranges
    pub fn new(
        node_index: Vec<usize>,
        cluster_index: Vec<usize>,
        num_nodes: usize,
        num_clusters: usize,
    ) -> Result<Self> {
        if node_index.len() != cluster_index.len() {
            return Err(HeteroError::InvalidInput(format!(
                "node_index has {} entries but cluster_index has {}",
                node_index.len(),
                cluster_index.len()
            )));
        }
        if let Some(&bad) = node_index.iter().find(|&&n| n >= num_nodes) {
            return Err(HeteroError::InvalidInput(format!(
                "node id {bad} out of range for {num_nodes} nodes"
            )));
        }
        if let Some(&bad) = cluster_index.iter().find(|&&c| c >= num_clusters) {
            return Err(HeteroError::InvalidInput(format!(
                "cluster id {bad} out of range for {num_clusters} clusters"
            )));
        }
        Ok(Self {
            node_index,
            cluster_index,
            num_nodes,
            num_clusters,
        })
    }
}

/// Adjacency list over original node ids
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeIndex {
    /// Source node ids
    pub src: Vec<usize>,

    /// Destination node ids
    pub dst: Vec<usize>,
}

impl EdgeIndex {
    /// Create an adjacency list from parallel source/destination sequences
    pub fn new(src: Vec<usize>, dst: Vec<usize>) -> Result<Self> {
        if src.len() != dst.len() {
            return Err(HeteroError::InvalidInput(format!(
                "src has {} entries but dst has {}",
                src.len(),
                dst.len()
            )));
        }
        Ok(Self { src, dst })
    }

    /// Create an adjacency list from `(src, dst)` pairs
    pub fn from_pairs(pairs: &[(usize, usize)]) -> Self {
        Self {
            src: pairs.iter().map(|&(u, _)| u).collect(),
            dst: pairs.iter().map(|&(_, v)| v).collect(),
        }
    }

    /// Number of edges
    pub fn len(&self) -> usize {
        self.src.len()
    }

    /// Whether the list contains no edges
    pub fn is_empty(&self) -> bool {
        self.src.is_empty()
    }
}

/// Result of the connect step
#[derive(Debug, Clone)]
pub struct ConnectOutput {
    /// Filtered adjacency list, re-indexed to cluster ids
    pub edge_index: EdgeIndex,

    /// Attributes of the kept edges, parallel to `edge_index`
    pub edge_attr: Option<Array2<f64>>,

    /// Batch assignment per retained node, in cluster-index order
    pub batch: Option<Vec<usize>>,
}

/// Restrict a per-node batch-assignment vector to the retained nodes
///
/// `out[k] = batch[node_index[k]]`, so the result is in cluster-index order.
pub fn pooled_batch(batch: &[usize], select: &SelectOutput) -> Result<Vec<usize>> {
    if batch.len() != select.num_nodes {
        return Err(HeteroError::InvalidInput(format!(
            "batch vector has {} entries but the graph has {} nodes",
            batch.len(),
            select.num_nodes
        )));
    }
    Ok(select.node_index.iter().map(|&n| batch[n]).collect())
}
