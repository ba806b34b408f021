//! # momentum-graph
//!
//! Particle four-momenta → affinity matrices → adjacency matrices.
//!
//! ---
//!
//! ## Two stages, one pure pipeline
//!
//! **Affinity** — every pair of particles in an event is scored once with a
//! physics-motivated metric: rapidity–azimuth separation ΔR, or the
//! generalised-kt distance `min(pT_i^2p, pT_j^2p) · ΔR²`. The score is mapped
//! through a monotone transform into a dense, exactly symmetric, non-negative
//! N×N matrix.
//!
//! **Adjacency** — the affinity matrix becomes a graph. Either every pair is
//! connected, or each particle keeps its k closest neighbours, with ties
//! broken by ascending index and the directed selections reconciled by union,
//! intersection, or not at all.
//!
//! Neither stage holds state. Identical input gives a bit-identical output on
//! every target; all transcendental functions go through `libm`.
//!
//! ---
//!
//! ## The pipeline
//!
//! ```text
//! MomentumSet ──compute_affinity──▶ AffinityMatrix ──build_adjacency──▶ AdjacencyMatrix
//!      ↑                  ↑                                   ↑
//!  [E, px, py, pz]     Metric                           AdjacencyMode
//!                 (MetricKind + MetricParams)   (FullyConnected | KNearestNeighbours)
//! ```
//!
//! ## Module overview
//!
//! | Module | Key types | What it does |
//! |--------|-----------|--------------|
//! | [`momentum`] | [`FourMomentum`], [`MomentumSet`] | Four-vectors, derived kinematics, ΔR, jet mass |
//! | [`matrix`] | [`SquareMatrix`] | Dense row-major value type shared by both stages |
//! | [`affinity`] | [`Metric`], [`AffinityMatrix`], [`MetricRegistry`] | Pairwise metric → symmetric affinity |
//! | [`adjacency`] | [`AdjacencyMode`], [`AdjacencyMatrix`] | k-NN or fully-connected graph construction |
//! | [`config`] | [`GraphConfig`], [`EventGraph`] | One-call pipeline driven by a config value |
//! | [`error`] | [`GraphError`] | Input, metric, parameter and shape errors |
//! | `ffi` | — | Python bindings (requires `python-ffi` feature) |
//!
//! ## Example
//!
//! ```rust
//! use momentum_graph::{
//!     build_adjacency, compute_affinity, AdjacencyMode, Metric, MomentumSet, SymmetrizePolicy,
//! };
//!
//! let event = MomentumSet::from_rows(&[
//!     [10.0, 3.0, 0.0, 0.0],
//!     [10.0, -3.0, 0.0, 0.0],
//!     [10.0, 0.0, 4.0, 0.0],
//! ]);
//! let affinity = compute_affinity(&event, &Metric::angular())?;
//! let mode = AdjacencyMode::knn(1, false, SymmetrizePolicy::Union)?;
//! let adjacency = build_adjacency(&affinity, &mode)?;
//!
//! // back-to-back particles are π apart; both pick particle 2 at π/2
//! assert!(!adjacency.has_edge(0, 1));
//! assert!(adjacency.has_edge(0, 2) && adjacency.has_edge(1, 2));
//! # Ok::<(), momentum_graph::GraphError>(())
//! ```
//!
//! ## `no_std`
//!
//! This crate is `#![no_std]` + `alloc` by default. Enable `std` for
//! `std::error::Error` on [`GraphError`], `serde` for serialisation of the
//! configuration and matrix types, and `python-ffi` for the PyO3 module.
//!
//! ## Logging
//!
//! Stages emit through the `log` facade: `debug` on entry and exit, `trace`
//! per k-NN row, `warn` when k is clamped or a distance saturates. Install any
//! `log` backend to see them.
//!
//! ## License
//!
//! Business Source License 1.1.

#![cfg_attr(not(any(feature = "std", feature = "python-ffi", test)), no_std)]
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

pub mod adjacency;
pub mod affinity;
pub mod config;
pub mod error;
pub mod matrix;
pub mod momentum;

#[cfg(feature = "python-ffi")]
pub mod ffi;

pub use adjacency::{build_adjacency, neighbour_count, AdjacencyMatrix, AdjacencyMode, SymmetrizePolicy};
pub use affinity::{
    compute_affinity, AffinityMatrix, AffinityTransform, Metric, MetricKind, MetricParams,
    MetricRegistry, PairDistance, Polarity, RapidityKind,
};
pub use config::{EventGraph, GraphConfig};
pub use error::{GraphError, MomentumField, Result};
pub use matrix::SquareMatrix;
pub use momentum::{delta_r, wrap_phi, FourMomentum, MomentumSet};
