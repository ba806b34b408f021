/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Pipeline configuration and the per-event result.
//!
//! A [`GraphConfig`] bundles the metric and the adjacency mode so a host can
//! load one value from its configuration file and run
//! `FourMomentumSet → affinity → adjacency` in a single call.
//!
//! ```rust
//! use momentum_graph::{GraphConfig, MomentumSet};
//!
//! let event = MomentumSet::from_rows(&[
//!     [10.0, 3.0, 0.0, 0.0],
//!     [10.0, -3.0, 0.0, 0.0],
//!     [10.0, 0.0, 4.0, 0.0],
//! ]);
//! let graph = GraphConfig::default().build(&event)?;
//! assert_eq!(graph.adjacency.dim(), 3);
//! # Ok::<(), momentum_graph::GraphError>(())
//! ```

use crate::adjacency::{build_adjacency, AdjacencyMatrix, AdjacencyMode};
use crate::affinity::{compute_affinity, AffinityMatrix, Metric};
use crate::error::Result;
use crate::momentum::MomentumSet;

/// Metric and adjacency mode for one pipeline run.
///
/// Defaults: ΔR with the exponential transform, unweighted k-NN with
/// `k = 8` and union symmetrization.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GraphConfig {
    /// Pairwise metric and its parameters.
    pub metric: Metric,
    /// Graph construction mode.
    pub mode: AdjacencyMode,
}

impl GraphConfig {
    /// Construct from parts.
    pub fn new(metric: Metric, mode: AdjacencyMode) -> Self {
        Self { metric, mode }
    }

    /// Run both stages on one event.
    pub fn build(&self, momenta: &MomentumSet) -> Result<EventGraph> {
        let affinity = compute_affinity(momenta, &self.metric)?;
        let adjacency = build_adjacency(&affinity, &self.mode)?;
        Ok(EventGraph { affinity, adjacency })
    }
}

/// Both matrices produced for one event.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct EventGraph {
    /// Pairwise affinities.
    pub affinity: AffinityMatrix,
    /// Edges derived from `affinity`.
    pub adjacency: AdjacencyMatrix,
}

impl EventGraph {
    /// Number of particles (nodes).
    pub fn len(&self) -> usize {
        self.affinity.dim()
    }

    /// `true` for an empty event.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
