//! Edge filtering after node selection
//!
//! Keeps only the edges whose endpoints both survive a clustering step and
//! re-expresses them in cluster ids. Assumes each cluster contains exactly
//! one node, i.e. the clustering is a node subset selection with relabeling.

use ndarray::{Array2, Axis};

use super::{pooled_batch, ConnectOutput, EdgeIndex, SelectOutput};
use crate::error::{HeteroError, Result};

/// Build the induced adjacency list over the retained nodes
///
/// Constructs an O(`num_nodes`) remap table from original node id to new
/// cluster id (`None` for dropped nodes), keeps an edge only when both
/// endpoints are retained, and filters `edge_attr` in parallel. Kept edges
/// stay in their original relative order.
pub fn filter_adj(
    edge_index: &EdgeIndex,
    edge_attr: Option<&Array2<f64>>,
    node_index: &[usize],
    cluster_index: &[usize],
    num_nodes: usize,
) -> Result<(EdgeIndex, Option<Array2<f64>>)> {
    if let Some(attr) = edge_attr {
        if attr.nrows() != edge_index.len() {
            return Err(HeteroError::InvalidInput(format!(
                "edge_attr has {} rows but there are {} edges",
                attr.nrows(),
                edge_index.len()
            )));
        }
    }

    let mut remap: Vec<Option<usize>> = vec![None; num_nodes];
    for (&node, &cluster) in node_index.iter().zip(cluster_index) {
        let slot = remap.get_mut(node).ok_or_else(|| {
            HeteroError::InvalidInput(format!(
                "retained node id {node} out of range for {num_nodes} nodes"
            ))
        })?;
        *slot = Some(cluster);
    }

    let mut src = Vec::new();
    let mut dst = Vec::new();
    let mut kept = Vec::new();
    for (pos, (&u, &v)) in edge_index.src.iter().zip(&edge_index.dst).enumerate() {
        let (Some(&Some(new_u)), Some(&Some(new_v))) = (remap.get(u), remap.get(v)) else {
            if u >= num_nodes || v >= num_nodes {
                return Err(HeteroError::InvalidInput(format!(
                    "edge ({u}, {v}) references a node outside 0..{num_nodes}"
                )));
            }
            continue;
        };
        src.push(new_u);
        dst.push(new_v);
        kept.push(pos);
    }

    let edge_attr = edge_attr.map(|attr| attr.select(Axis(0), &kept));
    Ok((EdgeIndex { src, dst }, edge_attr))
}

/// Stateless connect step: filter edges down to the retained node set
///
/// Pure function of its inputs; safe to share across callers.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterEdges;

impl FilterEdges {
    pub fn new() -> Self {
        Self
    }

    /// Produce the coarsened adjacency list for a selection
    ///
    /// # Arguments
    /// * `select` - Node selection with one node per cluster
    /// * `edge_index` - Adjacency list over original node ids
    /// * `edge_attr` - Optional per-edge attributes, parallel to `edge_index`
    /// * `batch` - Optional per-node batch assignment over the original nodes
    pub fn connect(
        &self,
        select: &SelectOutput,
        edge_index: &EdgeIndex,
        edge_attr: Option<&Array2<f64>>,
        batch: Option<&[usize]>,
    ) -> Result<ConnectOutput> {
        if select.num_clusters != select.cluster_index.len() {
            return Err(HeteroError::Configuration(
                "each cluster must contain exactly one node".into(),
            ));
        }

        let (edge_index, edge_attr) = filter_adj(
            edge_index,
            edge_attr,
            &select.node_index,
            &select.cluster_index,
            select.num_nodes,
        )?;

        let batch = match batch {
            Some(batch) => Some(pooled_batch(batch, select)?),
            None => None,
        };

        Ok(ConnectOutput {
            edge_index,
            edge_attr,
            batch,
        })
    }
}
