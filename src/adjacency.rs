/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Adjacency matrices from affinity matrices: k-NN or fully connected.
//!
//! # k-NN construction
//!
//! For each row `i`, the candidates `j ≠ i` are ordered closest-first under
//! the affinity's [`Polarity`], ties broken by ascending `j`. When the affinity
//! carries its raw distances ([`AffinityMatrix::distances`]) those are ranked
//! instead, so a transform that underflows cannot reorder candidates. The first
//! `min(k, N − 1)` are selected. Selection is row-local, so the directed
//! selection matrix `S` is generally asymmetric and is reconciled by a
//! [`SymmetrizePolicy`]:
//!
//! ```text
//! Union         edge(i, j) = S[i][j] ∨ S[j][i]
//! Intersection  edge(i, j) = S[i][j] ∧ S[j][i]      (mutual k-NN)
//! Directed      edge(i, j) = S[i][j]
//! ```
//!
//! `k > N − 1` is clamped to `N − 1`, which makes the graph fully connected.
//! The clamp is logged at `warn` level because it changes the observed degree.
//!
//! # Invariants
//! - **No self-loops** — the diagonal is zero whatever the affinity diagonal holds.
//! - **Directed degree** — exactly `min(k, N − 1)` edges per row.
//! - **Union degree** — at least `min(k, N − 1)` edges per row.
//! - **Reproducible** — selection uses a total order (value, then index).

use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use core::str::FromStr;

use log::{debug, trace, warn};

use crate::affinity::{AffinityMatrix, Polarity};
use crate::error::{GraphError, Result};
use crate::matrix::SquareMatrix;

/// Relative tolerance used when an adjacency mode requires a symmetric affinity.
pub const SYMMETRY_TOLERANCE: f64 = 1e-9;

// ─── Modes ───────────────────────────────────────────────────────────────────

/// How directed k-NN selections are reconciled into edges.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SymmetrizePolicy {
    /// Edge if either endpoint selected the other.
    #[default]
    Union,
    /// Edge only if both endpoints selected each other.
    Intersection,
    /// No reconciliation; the adjacency is a directed graph.
    Directed,
}

impl SymmetrizePolicy {
    /// Canonical configuration name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Union => "union",
            Self::Intersection => "intersection",
            Self::Directed => "directed",
        }
    }
}

impl fmt::Display for SymmetrizePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SymmetrizePolicy {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "union" | "or" => Ok(Self::Union),
            "intersection" | "mutual" | "and" => Ok(Self::Intersection),
            "directed" | "none" => Ok(Self::Directed),
            other => Err(GraphError::InvalidParameter {
                name: "symmetrize",
                reason: format!("unknown policy `{other}`"),
            }),
        }
    }
}

/// Graph construction mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "mode", rename_all = "snake_case"))]
pub enum AdjacencyMode {
    /// Every off-diagonal pair is an edge.
    FullyConnected {
        /// Carry the affinity on each edge instead of 1.
        weighted: bool,
    },
    /// Each particle selects its `k` closest neighbours.
    KNearestNeighbours {
        /// Neighbours per row before symmetrization; clamped to `N − 1`.
        k: usize,
        /// Carry the affinity on each edge instead of 1.
        weighted: bool,
        /// Reconciliation of asymmetric selections.
        #[cfg_attr(feature = "serde", serde(default))]
        symmetrize: SymmetrizePolicy,
    },
}

impl Default for AdjacencyMode {
    fn default() -> Self {
        Self::KNearestNeighbours { k: 8, weighted: false, symmetrize: SymmetrizePolicy::Union }
    }
}

impl AdjacencyMode {
    /// Fully-connected mode.
    pub const fn fully_connected(weighted: bool) -> Self {
        Self::FullyConnected { weighted }
    }

    /// k-NN mode from a signed neighbour count, as it arrives from hosts.
    ///
    /// Fails with [`GraphError::InvalidParameter`] if `k < 0`.
    pub fn knn(k: i64, weighted: bool, symmetrize: SymmetrizePolicy) -> Result<Self> {
        Ok(Self::KNearestNeighbours { k: neighbour_count(k)?, weighted, symmetrize })
    }

    /// Whether edges carry affinity values.
    pub const fn is_weighted(&self) -> bool {
        match self {
            Self::FullyConnected { weighted } | Self::KNearestNeighbours { weighted, .. } => *weighted,
        }
    }

    /// Whether the produced adjacency may be asymmetric.
    pub const fn is_directed(&self) -> bool {
        matches!(self, Self::KNearestNeighbours { symmetrize: SymmetrizePolicy::Directed, .. })
    }
}

/// Convert a host-supplied neighbour count, rejecting negatives.
pub fn neighbour_count(k: i64) -> Result<usize> {
    usize::try_from(k).map_err(|_| GraphError::InvalidParameter {
        name: "k",
        reason: format!("must be >= 0, got {k}"),
    })
}

// ─── AdjacencyMatrix ─────────────────────────────────────────────────────────

/// N×N adjacency matrix with an explicit edge mask.
///
/// The mask is authoritative: a weighted edge whose affinity is exactly zero
/// is still an edge, and [`AdjacencyMatrix::has_edge`] says so.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AdjacencyMatrix {
    values: SquareMatrix,
    #[cfg_attr(feature = "serde", serde(skip))]
    mask: Vec<bool>,
    weighted: bool,
    directed: bool,
}

impl AdjacencyMatrix {
    fn from_mask(affinity: &AffinityMatrix, mask: Vec<bool>, weighted: bool, directed: bool) -> Self {
        let n = affinity.dim();
        let values = SquareMatrix::from_fn(n, |i, j| match (mask[i * n + j], weighted) {
            (false, _) => 0.0,
            (true, true) => affinity.get(i, j),
            (true, false) => 1.0,
        });
        Self { values, mask, weighted, directed }
    }

    /// Number of nodes.
    pub fn dim(&self) -> usize {
        self.values.dim()
    }

    /// Edge value `[i][j]`: 0 without an edge, 1 or the affinity with one.
    ///
    /// Panics if out of bounds; [`AdjacencyMatrix::has_edge`] is the
    /// non-panicking query.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values.get(i, j)
    }

    /// `true` if there is an edge `i → j`.
    pub fn has_edge(&self, i: usize, j: usize) -> bool {
        let n = self.dim();
        i < n && j < n && self.mask[i * n + j]
    }

    /// Out-degree of node `i`. Panics if `i` is out of bounds, like [`AdjacencyMatrix::get`].
    pub fn degree(&self, i: usize) -> usize {
        let n = self.dim();
        assert!(i < n, "node {i} out of bounds for {n} nodes");
        self.mask[i * n..(i + 1) * n].iter().filter(|&&e| e).count()
    }

    /// Out-degree of every node.
    pub fn degrees(&self) -> Vec<usize> {
        (0..self.dim()).map(|i| self.degree(i)).collect()
    }

    /// Directed edges `(i, j, value)` in row-major order.
    ///
    /// Undirected graphs list each edge twice, once per direction.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        let n = self.dim();
        self.mask
            .iter()
            .enumerate()
            .filter(|&(_, &e)| e)
            .map(move |(idx, _)| (idx / n, idx % n, self.values.as_slice()[idx]))
    }

    /// Number of directed edges (twice the undirected count for symmetric graphs).
    pub fn edge_count(&self) -> usize {
        self.mask.iter().filter(|&&e| e).count()
    }

    /// Whether edge values carry the affinity.
    pub fn is_weighted(&self) -> bool {
        self.weighted
    }

    /// Whether the matrix may be asymmetric.
    pub fn is_directed(&self) -> bool {
        self.directed
    }

    /// Edge values as a matrix.
    pub fn values(&self) -> &SquareMatrix {
        &self.values
    }

    /// Nested-vector copy of the edge values.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.values.to_rows()
    }

    /// Relabelled copy: `out[i][j] = self[perm[i]][perm[j]]`.
    pub fn permuted(&self, perm: &[usize]) -> Result<Self> {
        let values = self.values.permuted(perm)?;
        let n = self.dim();
        let mask = (0..n * n).map(|idx| self.mask[perm[idx / n] * n + perm[idx % n]]).collect();
        Ok(Self { values, mask, weighted: self.weighted, directed: self.directed })
    }
}

// ─── build_adjacency ─────────────────────────────────────────────────────────

/// Build the adjacency matrix of `affinity` under `mode`.
///
/// Every mode except directed k-NN needs a symmetric affinity and fails with
/// [`GraphError::ShapeMismatch`] otherwise (relative tolerance
/// [`SYMMETRY_TOLERANCE`]). N ≤ 1 always yields a graph with no edges.
pub fn build_adjacency(affinity: &AffinityMatrix, mode: &AdjacencyMode) -> Result<AdjacencyMatrix> {
    let n = affinity.dim();
    if !mode.is_directed() {
        if let Some((i, j)) = affinity.values().first_asymmetry(SYMMETRY_TOLERANCE) {
            return Err(GraphError::ShapeMismatch(format!(
                "affinity is not symmetric at [{i}][{j}]: {} vs {}",
                affinity.get(i, j),
                affinity.get(j, i)
            )));
        }
    }
    debug!("build_adjacency: n={n}, mode={mode:?}");

    let mask = match *mode {
        AdjacencyMode::FullyConnected { .. } => fully_connected_mask(n),
        AdjacencyMode::KNearestNeighbours { k, symmetrize, .. } => {
            let selected = select_neighbours(affinity, k);
            reconcile(&selected, n, symmetrize)
        }
    };
    let adjacency = AdjacencyMatrix::from_mask(affinity, mask, mode.is_weighted(), mode.is_directed());
    debug!("build_adjacency: {} directed edges", adjacency.edge_count());
    Ok(adjacency)
}

fn fully_connected_mask(n: usize) -> Vec<bool> {
    (0..n * n).map(|idx| idx / n != idx % n).collect()
}

/// Directed selection matrix `S`: row `i` marks the `min(k, N − 1)` closest `j ≠ i`.
fn select_neighbours(affinity: &AffinityMatrix, k: usize) -> Vec<bool> {
    let n = affinity.dim();
    let mut selected = vec![false; n * n];
    if n <= 1 {
        return selected;
    }
    let k_eff = k.min(n - 1);
    if k > k_eff {
        warn!("build_adjacency: k = {k} exceeds N - 1 = {}, clamping", n - 1);
    }
    if k_eff == 0 {
        return selected;
    }

    let (ranking, polarity): (&SquareMatrix, Polarity) = affinity.ranking();
    let mut candidates: Vec<usize> = Vec::with_capacity(n - 1);
    for i in 0..n {
        let row = ranking.row(i);
        candidates.clear();
        candidates.extend((0..n).filter(|&j| j != i));
        if k_eff < candidates.len() {
            candidates.select_nth_unstable_by(k_eff - 1, |&a, &b| {
                polarity.closest_first(row[a], row[b]).then(a.cmp(&b))
            });
            candidates.truncate(k_eff);
        }
        for &j in &candidates {
            selected[i * n + j] = true;
        }
        if log::log_enabled!(log::Level::Trace) {
            let mut sorted = candidates.clone();
            sorted.sort_unstable();
            trace!("row {i}: neighbours {}", join(&sorted));
        }
    }
    selected
}

fn reconcile(selected: &[bool], n: usize, policy: SymmetrizePolicy) -> Vec<bool> {
    (0..n * n)
        .map(|idx| {
            let (i, j) = (idx / n, idx % n);
            let forward = selected[i * n + j];
            let backward = selected[j * n + i];
            match policy {
                SymmetrizePolicy::Union => forward || backward,
                SymmetrizePolicy::Intersection => forward && backward,
                SymmetrizePolicy::Directed => forward,
            }
        })
        .collect()
}

fn join(indices: &[usize]) -> String {
    let mut out = String::new();
    for (pos, j) in indices.iter().enumerate() {
        if pos > 0 {
            out.push_str(", ");
        }
        out.push_str(&format!("{j}"));
    }
    out
}

// ─── Tests ───────────────────────────────────────────────────────────────────
