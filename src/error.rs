/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Error taxonomy for the affinity → adjacency pipeline.
//!
//! Every failure is detected at the start of the stage that owns it and is
//! returned before any matrix is allocated. There is no partial output and no
//! retry: the pipeline is pure, so the same input fails the same way.

use alloc::string::String;

/// Which component of a four-momentum failed validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MomentumField {
    /// Energy component `E`.
    Energy,
    /// Momentum x-component.
    Px,
    /// Momentum y-component.
    Py,
    /// Momentum z-component.
    Pz,
}

impl core::fmt::Display for MomentumField {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Energy => "E",
            Self::Px => "px",
            Self::Py => "py",
            Self::Pz => "pz",
        })
    }
}

/// Errors surfaced by the graph construction pipeline.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    /// A four-momentum carries a NaN or infinite component.
    #[error("particle {index}: {field} is not finite ({value})")]
    InvalidInput {
        /// Position of the offending particle in the momentum set.
        index: usize,
        /// The component that failed.
        field: MomentumField,
        /// The rejected value.
        value: f64,
    },

    /// An affinity entry is NaN or negative.
    #[error("affinity entry [{row}][{col}] is invalid ({value})")]
    InvalidAffinity {
        /// Row of the offending entry.
        row: usize,
        /// Column of the offending entry.
        col: usize,
        /// The rejected value.
        value: f64,
    },

    /// The requested metric name is not registered.
    #[error("unsupported metric `{0}`")]
    UnsupportedMetric(String),

    /// A construction parameter is out of range.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Parameter name as it appears in configuration.
        name: &'static str,
        /// Human-readable constraint that was violated.
        reason: String,
    },

    /// Matrix is not square, or not symmetric where symmetry is required.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
}

/// Crate-wide result alias.
pub type Result<T> = core::result::Result<T, GraphError>;
