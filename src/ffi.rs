//! Python FFI bindings via PyO3.
//!
//! Exposes the affinity → adjacency pipeline to Python on plain nested lists,
//! so NumPy arrays can be passed with `.tolist()` and read back with
//! `np.asarray`.
//!
//! # Building the Python extension
//!
//! ```bash
//! pip install maturin
//! maturin develop --features python-ffi
//! ```
//!
//! # Usage
//!
//! ```python
//! import numpy as np
//! import momentum_graph as mg
//!
//! pmu = [[10.0, 3.0, 0.0, 0.0], [10.0, -3.0, 0.0, 0.0], [10.0, 0.0, 4.0, 0.0]]
//! aff = mg.affinity_matrix(pmu, metric="angular_separation")
//! adj = mg.adjacency_matrix(aff, k=1, symmetrize="union")
//! print(np.asarray(adj))
//! print(mg.jet_mass(pmu))
//! ```

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::adjacency::{build_adjacency, AdjacencyMode, SymmetrizePolicy};
use crate::affinity::{compute_affinity, AffinityMatrix, Metric, MetricParams, Polarity};
use crate::config::GraphConfig;
use crate::error::GraphError;
use crate::momentum::MomentumSet;

fn to_py_err(e: GraphError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn parse_metric(
    metric: &str,
    exponent: f64,
    epsilon: f64,
    transform: &str,
    rapidity: &str,
) -> PyResult<Metric> {
    Ok(Metric {
        kind: metric.parse().map_err(to_py_err)?,
        params: MetricParams {
            exponent,
            epsilon,
            transform: transform.parse().map_err(to_py_err)?,
            rapidity: rapidity.parse().map_err(to_py_err)?,
        },
    })
}

fn parse_mode(k: Option<i64>, weighted: bool, symmetrize: &str) -> PyResult<AdjacencyMode> {
    match k {
        None => Ok(AdjacencyMode::fully_connected(weighted)),
        Some(k) => {
            let policy: SymmetrizePolicy = symmetrize.parse().map_err(to_py_err)?;
            AdjacencyMode::knn(k, weighted, policy).map_err(to_py_err)
        }
    }
}

/// Compute the N×N affinity matrix of an N×4 list of `[E, px, py, pz]` rows.
///
/// Args:
///     pmu:       N×4 four-momenta
///     metric:    "angular_separation" or "kinematic_distance"
///     exponent:  generalised-kt exponent p (kinematic_distance only)
///     epsilon:   regulator for the "inverse" transform
///     transform: "exponential", "inverse" or "distance"
///     rapidity:  "pseudorapidity" or "rapidity"
#[pyfunction]
#[pyo3(signature = (
    pmu,
    metric = "angular_separation",
    exponent = 1.0,
    epsilon = 1e-6,
    transform = "exponential",
    rapidity = "pseudorapidity"
))]
pub fn affinity_matrix(
    pmu: Vec<[f64; 4]>,
    metric: &str,
    exponent: f64,
    epsilon: f64,
    transform: &str,
    rapidity: &str,
) -> PyResult<Vec<Vec<f64>>> {
    let metric = parse_metric(metric, exponent, epsilon, transform, rapidity)?;
    let momenta = MomentumSet::from_rows(&pmu);
    compute_affinity(&momenta, &metric)
        .map(|a| a.to_rows())
        .map_err(to_py_err)
}

/// Build an adjacency matrix from an N×N affinity matrix.
///
/// Args:
///     affinity:   N×N affinity (from `affinity_matrix` or user-supplied)
///     k:          neighbours per node; None for the fully-connected graph
///     weighted:   carry affinity values on edges instead of 1
///     symmetrize: "union", "intersection" or "directed"
///     polarity:   "similarity" (larger = closer) or "distance"
#[pyfunction]
#[pyo3(signature = (affinity, k = None, weighted = false, symmetrize = "union", polarity = "similarity"))]
pub fn adjacency_matrix(
    affinity: Vec<Vec<f64>>,
    k: Option<i64>,
    weighted: bool,
    symmetrize: &str,
    polarity: &str,
) -> PyResult<Vec<Vec<f64>>> {
    let polarity: Polarity = polarity.parse().map_err(to_py_err)?;
    let mode = parse_mode(k, weighted, symmetrize)?;
    let affinity = AffinityMatrix::from_rows(&affinity, polarity).map_err(to_py_err)?;
    build_adjacency(&affinity, &mode)
        .map(|a| a.to_rows())
        .map_err(to_py_err)
}

/// Run both stages and return `(affinity, adjacency)`.
#[pyfunction]
#[pyo3(signature = (
    pmu,
    metric = "angular_separation",
    k = None,
    weighted = false,
    symmetrize = "union",
    exponent = 1.0,
    epsilon = 1e-6,
    transform = "exponential",
    rapidity = "pseudorapidity"
))]
#[allow(clippy::too_many_arguments)]
pub fn event_graph(
    pmu: Vec<[f64; 4]>,
    metric: &str,
    k: Option<i64>,
    weighted: bool,
    symmetrize: &str,
    exponent: f64,
    epsilon: f64,
    transform: &str,
    rapidity: &str,
) -> PyResult<(Vec<Vec<f64>>, Vec<Vec<f64>>)> {
    let config = GraphConfig::new(
        parse_metric(metric, exponent, epsilon, transform, rapidity)?,
        parse_mode(k, weighted, symmetrize)?,
    );
    let graph = config.build(&MomentumSet::from_rows(&pmu)).map_err(to_py_err)?;
    Ok((graph.affinity.to_rows(), graph.adjacency.to_rows()))
}

/// Combined invariant mass of the given particles, optionally weighted.
#[pyfunction]
#[pyo3(signature = (pmu, weight = None))]
pub fn jet_mass(pmu: Vec<[f64; 4]>, weight: Option<Vec<f64>>) -> PyResult<f64> {
    MomentumSet::from_rows(&pmu)
        .jet_mass(weight.as_deref())
        .map_err(to_py_err)
}

// ── Module entry point ────────────────────────────────────────────────────────

/// Particle four-momenta → affinity and adjacency matrices.
#[pymodule]
pub fn momentum_graph(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(affinity_matrix, m)?)?;
    m.add_function(wrap_pyfunction!(adjacency_matrix, m)?)?;
    m.add_function(wrap_pyfunction!(event_graph, m)?)?;
    m.add_function(wrap_pyfunction!(jet_mass, m)?)?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}
