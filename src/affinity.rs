/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Pairwise affinity matrices from four-momenta.
//!
//! # Metrics
//!
//! | [`MetricKind`] | Pair distance `d_ij` |
//! |----------------|----------------------|
//! | `AngularSeparation` | `ΔR_ij = √(Δy² + Δφ²)` |
//! | `KinematicDistance` | `min(pT_i^2p, pT_j^2p) · ΔR_ij²` |
//!
//! `y` is pseudorapidity or true rapidity per [`RapidityKind`]; `p` is
//! [`MetricParams::exponent`] (1 = kt, 0 = Cambridge/Aachen, −1 = anti-kt).
//!
//! The distance is turned into the stored value by an [`AffinityTransform`]:
//!
//! ```text
//! Exponential   a = exp(−d)        Similarity   diag = 1
//! Inverse       a = 1 / (d + ε)    Similarity   diag = 1/ε
//! Distance      a = d              Distance     diag = 0
//! ```
//!
//! The diagonal is the transform evaluated at `d = 0`: the largest value a
//! similarity can take, or zero for a distance. It is written directly and
//! never goes through the metric formula. The adjacency stage never selects
//! it.
//!
//! `exp(−d)` underflows to zero once `d` exceeds ≈ 745, which generalised-kt
//! distances reach for ordinary jet momenta. A matrix produced by
//! [`compute_affinity`] with a similarity transform therefore also keeps the
//! raw distances ([`AffinityMatrix::distances`]); neighbour ranking reads
//! those, so collapsed affinities never reorder candidates.
//!
//! # Invariants
//! - **Exact symmetry** — each unordered pair is evaluated once and written to
//!   both `[i][j]` and `[j][i]`.
//! - **Finite, non-negative** — every entry of an [`AffinityMatrix`] is finite
//!   and ≥ 0. Overflowing distances saturate at `f64::MAX`; an inverse
//!   regulator whose reciprocal overflows is rejected up front.
//! - **Deterministic** — all transcendental calls go through `libm`; identical
//!   input yields a bit-identical matrix on every target.

use alloc::borrow::ToOwned;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::str::FromStr;

use hashbrown::HashMap;
use log::{debug, warn};

use crate::error::{GraphError, Result};
use crate::matrix::SquareMatrix;
use crate::momentum::{delta_r2, FourMomentum, MomentumSet, PT_FLOOR};

// ─── Metric selection ────────────────────────────────────────────────────────

/// Built-in pairwise metrics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MetricKind {
    /// Rapidity–azimuth separation ΔR.
    #[default]
    AngularSeparation,
    /// Generalised-kt distance `min(pT_i^2p, pT_j^2p) · ΔR²`.
    KinematicDistance,
}

impl MetricKind {
    /// Canonical configuration name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AngularSeparation => "angular_separation",
            Self::KinematicDistance => "kinematic_distance",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MetricKind {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "angular_separation" | "angular" | "delta_r" | "deltar" => Ok(Self::AngularSeparation),
            "kinematic_distance" | "kinematic" | "kt" | "generalized_kt" => Ok(Self::KinematicDistance),
            _ => Err(GraphError::UnsupportedMetric(s.to_owned())),
        }
    }
}

/// Which longitudinal coordinate enters ΔR.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RapidityKind {
    /// Pseudorapidity η (mass-independent).
    #[default]
    Pseudorapidity,
    /// True rapidity y.
    Rapidity,
}

impl RapidityKind {
    fn of(&self, p: &FourMomentum) -> f64 {
        match self {
            Self::Pseudorapidity => p.eta(),
            Self::Rapidity => p.rapidity(),
        }
    }
}

impl FromStr for RapidityKind {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pseudorapidity" | "eta" => Ok(Self::Pseudorapidity),
            "rapidity" | "y" => Ok(Self::Rapidity),
            other => Err(GraphError::InvalidParameter {
                name: "rapidity",
                reason: format!("unknown rapidity kind `{other}`"),
            }),
        }
    }
}

/// Whether a larger stored value means "closer".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Polarity {
    /// Larger value = closer.
    #[default]
    Similarity,
    /// Smaller value = closer.
    Distance,
}

impl Polarity {
    /// Ordering that sorts the closest value first.
    pub fn closest_first(&self, a: f64, b: f64) -> core::cmp::Ordering {
        match self {
            Self::Similarity => b.total_cmp(&a),
            Self::Distance => a.total_cmp(&b),
        }
    }
}

impl FromStr for Polarity {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "similarity" | "affinity" => Ok(Self::Similarity),
            "distance" => Ok(Self::Distance),
            other => Err(GraphError::InvalidParameter {
                name: "polarity",
                reason: format!("unknown polarity `{other}`"),
            }),
        }
    }
}

/// Monotone map from a pair distance to the stored affinity value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AffinityTransform {
    /// `exp(−d)`, in (0, 1].
    #[default]
    Exponential,
    /// `1 / (d + ε)` with ε = [`MetricParams::epsilon`].
    Inverse,
    /// The raw distance; the matrix has [`Polarity::Distance`].
    Distance,
}

impl AffinityTransform {
    /// Polarity of matrices produced by this transform.
    pub const fn polarity(&self) -> Polarity {
        match self {
            Self::Exponential | Self::Inverse => Polarity::Similarity,
            Self::Distance => Polarity::Distance,
        }
    }

    fn apply(&self, d: f64, epsilon: f64) -> f64 {
        match self {
            Self::Exponential => libm::exp(-d),
            Self::Inverse => 1.0 / (d + epsilon),
            Self::Distance => d,
        }
    }
}

impl FromStr for AffinityTransform {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exponential" | "exp" => Ok(Self::Exponential),
            "inverse" | "reciprocal" => Ok(Self::Inverse),
            "distance" | "none" => Ok(Self::Distance),
            other => Err(GraphError::InvalidParameter {
                name: "transform",
                reason: format!("unknown transform `{other}`"),
            }),
        }
    }
}

/// Tunable parameters shared by every metric.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MetricParams {
    /// Generalised-kt exponent `p`. Default 1.0.
    pub exponent: f64,
    /// Regulator ε for [`AffinityTransform::Inverse`]. Default 1e-6.
    pub epsilon: f64,
    /// Distance → affinity map. Default exponential.
    pub transform: AffinityTransform,
    /// Longitudinal coordinate. Default pseudorapidity.
    pub rapidity: RapidityKind,
}

impl Default for MetricParams {
    fn default() -> Self {
        Self {
            exponent: 1.0,
            epsilon: 1e-6,
            transform: AffinityTransform::Exponential,
            rapidity: RapidityKind::Pseudorapidity,
        }
    }
}

impl MetricParams {
    /// Reject non-finite exponents and regulators that are non-positive or so
    /// small that `1/ε` overflows.
    pub fn validate(&self) -> Result<()> {
        if !self.exponent.is_finite() {
            return Err(GraphError::InvalidParameter {
                name: "exponent",
                reason: format!("must be finite, got {}", self.exponent),
            });
        }
        if self.transform == AffinityTransform::Inverse
            && !(self.epsilon.is_finite() && self.epsilon > 0.0 && (1.0 / self.epsilon).is_finite())
        {
            return Err(GraphError::InvalidParameter {
                name: "epsilon",
                reason: format!("must be finite, > 0 and have a finite reciprocal, got {}", self.epsilon),
            });
        }
        Ok(())
    }

    /// Affinity written on the diagonal.
    pub fn self_affinity(&self) -> f64 {
        self.transform.apply(0.0, self.epsilon)
    }
}

/// A metric together with its parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Metric {
    /// Which pair distance to evaluate.
    pub kind: MetricKind,
    /// Exponent, regulator, transform and rapidity choice.
    pub params: MetricParams,
}

impl Metric {
    /// ΔR with default parameters.
    pub fn angular() -> Self {
        Self { kind: MetricKind::AngularSeparation, params: MetricParams::default() }
    }

    /// Generalised-kt distance with exponent `p`.
    pub fn kinematic(exponent: f64) -> Self {
        Self {
            kind: MetricKind::KinematicDistance,
            params: MetricParams { exponent, ..MetricParams::default() },
        }
    }

    /// Replace the distance → affinity transform.
    pub fn with_transform(mut self, transform: AffinityTransform) -> Self {
        self.params.transform = transform;
        self
    }

    /// Replace the inverse-transform regulator.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.params.epsilon = epsilon;
        self
    }

    /// Replace the longitudinal coordinate.
    pub fn with_rapidity(mut self, rapidity: RapidityKind) -> Self {
        self.params.rapidity = rapidity;
        self
    }
}

// ─── Pair distances ──────────────────────────────────────────────────────────

/// Signature of a registrable pair distance.
///
/// Must return a finite, non-negative value and be symmetric in its two
/// momentum arguments.
pub type PairDistance = fn(&FourMomentum, &FourMomentum, &MetricParams) -> f64;

/// Per-particle quantities hoisted out of the O(N²) loop.
#[derive(Clone, Copy, Debug)]
struct Kinematics {
    rap: f64,
    phi: f64,
    /// `max(pT, PT_FLOOR)^(2p)`, saturated to `f64::MAX`.
    pt_weight: f64,
}

impl Kinematics {
    fn of(p: &FourMomentum, params: &MetricParams) -> Self {
        Self {
            rap: params.rapidity.of(p),
            phi: p.phi(),
            pt_weight: pt_weight(p.pt(), params.exponent),
        }
    }
}

fn pt_weight(pt: f64, exponent: f64) -> f64 {
    libm::pow(pt.max(PT_FLOOR), 2.0 * exponent).min(f64::MAX)
}

fn angular_from(a: &Kinematics, b: &Kinematics) -> f64 {
    libm::sqrt(delta_r2(a.rap, a.phi, b.rap, b.phi))
}

fn kinematic_from(a: &Kinematics, b: &Kinematics) -> f64 {
    let dr2 = delta_r2(a.rap, a.phi, b.rap, b.phi);
    if dr2 == 0.0 {
        return 0.0;
    }
    (a.pt_weight.min(b.pt_weight) * dr2).min(f64::MAX)
}

/// ΔR between two particles, using `params.rapidity`.
pub fn angular_distance(a: &FourMomentum, b: &FourMomentum, params: &MetricParams) -> f64 {
    angular_from(&Kinematics::of(a, params), &Kinematics::of(b, params))
}

/// Generalised-kt distance between two particles, using `params.exponent`.
pub fn kinematic_distance(a: &FourMomentum, b: &FourMomentum, params: &MetricParams) -> f64 {
    kinematic_from(&Kinematics::of(a, params), &Kinematics::of(b, params))
}

// ─── AffinityMatrix ──────────────────────────────────────────────────────────

/// Symmetric, non-negative N×N affinity matrix tagged with its polarity.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AffinityMatrix {
    values: SquareMatrix,
    polarity: Polarity,
    /// Untransformed pair distances, kept for similarity matrices built here.
    #[cfg_attr(feature = "serde", serde(skip))]
    distances: Option<SquareMatrix>,
}

impl AffinityMatrix {
    /// Wrap a precomputed matrix.
    ///
    /// Fails with [`GraphError::InvalidAffinity`] if any entry is NaN,
    /// infinite or negative. Negative zero is normalised to `+0.0` so that
    /// ordering treats it as a tie with zero. Symmetry is not checked here;
    /// the adjacency stage checks it when the mode needs it.
    pub fn new(values: SquareMatrix, polarity: Polarity) -> Result<Self> {
        let n = values.dim();
        for i in 0..n {
            for j in 0..n {
                let v = values.get(i, j);
                if !(v.is_finite() && v >= 0.0) {
                    return Err(GraphError::InvalidAffinity { row: i, col: j, value: v });
                }
            }
        }
        let values = SquareMatrix::from_fn(n, |i, j| values.get(i, j) + 0.0);
        Ok(Self { values, polarity, distances: None })
    }

    /// Build from nested rows; see [`AffinityMatrix::new`].
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R], polarity: Polarity) -> Result<Self> {
        Self::new(SquareMatrix::from_rows(rows)?, polarity)
    }

    /// Number of particles.
    pub fn dim(&self) -> usize {
        self.values.dim()
    }

    /// Entry `[i][j]`.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values.get(i, j)
    }

    /// Underlying matrix.
    pub fn values(&self) -> &SquareMatrix {
        &self.values
    }

    /// Whether larger entries mean closer.
    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// Raw pair distances behind a similarity matrix from [`compute_affinity`].
    ///
    /// `None` for distance matrices, whose values already are the distances,
    /// and for matrices supplied through [`AffinityMatrix::new`].
    pub fn distances(&self) -> Option<&SquareMatrix> {
        self.distances.as_ref()
    }

    /// Matrix and polarity that order neighbours closest-first.
    pub(crate) fn ranking(&self) -> (&SquareMatrix, Polarity) {
        match &self.distances {
            Some(d) => (d, Polarity::Distance),
            None => (&self.values, self.polarity),
        }
    }

    /// Nested-vector copy.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.values.to_rows()
    }

    /// Relabelled copy: `out[i][j] = self[perm[i]][perm[j]]`.
    pub fn permuted(&self, perm: &[usize]) -> Result<Self> {
        let distances = match &self.distances {
            Some(d) => Some(d.permuted(perm)?),
            None => None,
        };
        Ok(Self { values: self.values.permuted(perm)?, polarity: self.polarity, distances })
    }
}

// ─── compute_affinity ────────────────────────────────────────────────────────

/// Compute the N×N affinity matrix of `momenta` under `metric`.
///
/// Empty input yields the 0×0 matrix. Fails with
/// [`GraphError::InvalidInput`] on any non-finite component and with
/// [`GraphError::InvalidParameter`] on unusable metric parameters.
pub fn compute_affinity(momenta: &MomentumSet, metric: &Metric) -> Result<AffinityMatrix> {
    momenta.validate()?;
    metric.params.validate()?;
    debug!(
        "compute_affinity: n={}, metric={}, transform={:?}",
        momenta.len(),
        metric.kind,
        metric.params.transform
    );

    let kin: Vec<Kinematics> = momenta.iter().map(|p| Kinematics::of(p, &metric.params)).collect();
    let pair: fn(&Kinematics, &Kinematics) -> f64 = match metric.kind {
        MetricKind::AngularSeparation => angular_from,
        MetricKind::KinematicDistance => kinematic_from,
    };
    fill(momenta.len(), &metric.params, |i, j| Ok(pair(&kin[i], &kin[j])))
}

/// Evaluate `distance(i, j)` over the upper triangle, transform, and mirror.
fn fill(
    n: usize,
    params: &MetricParams,
    mut distance: impl FnMut(usize, usize) -> Result<f64>,
) -> Result<AffinityMatrix> {
    let polarity = params.transform.polarity();
    let mut values = SquareMatrix::zeros(n);
    let mut raw = SquareMatrix::zeros(n);
    let diag = params.self_affinity();
    if !diag.is_finite() {
        return Err(GraphError::InvalidAffinity { row: 0, col: 0, value: diag });
    }
    let (mut saturated, mut underflowed) = (0usize, 0usize);
    for i in 0..n {
        values.set(i, i, diag);
        for j in (i + 1)..n {
            let d = distance(i, j)? + 0.0;
            if !(d.is_finite() && d >= 0.0) {
                return Err(GraphError::InvalidAffinity { row: i, col: j, value: d });
            }
            if d == f64::MAX {
                saturated += 1;
            }
            let a = params.transform.apply(d, params.epsilon) + 0.0;
            if !(a.is_finite() && a >= 0.0) {
                return Err(GraphError::InvalidAffinity { row: i, col: j, value: a });
            }
            if a == 0.0 && d > 0.0 {
                underflowed += 1;
            }
            values.set(i, j, a);
            values.set(j, i, a);
            raw.set(i, j, d);
            raw.set(j, i, d);
        }
    }
    if saturated > 0 {
        warn!("compute_affinity: {saturated} pair distance(s) saturated at f64::MAX");
    }
    if underflowed > 0 {
        warn!("compute_affinity: {underflowed} affinity value(s) underflowed to 0; neighbour ranking uses raw distances");
    }
    let distances = match polarity {
        Polarity::Similarity => Some(raw),
        Polarity::Distance => None,
    };
    Ok(AffinityMatrix { values, polarity, distances })
}

// ─── MetricRegistry ──────────────────────────────────────────────────────────

/// Name → pair-distance table for metrics selected at runtime.
///
/// [`MetricRegistry::with_builtins`] registers both [`MetricKind`] variants
/// under their canonical names. Hosts may add their own; a lookup miss is
/// [`GraphError::UnsupportedMetric`].
#[derive(Clone, Debug)]
pub struct MetricRegistry {
    metrics: HashMap<String, PairDistance>,
}

impl MetricRegistry {
    /// Registry with no metrics.
    pub fn empty() -> Self {
        Self { metrics: HashMap::new() }
    }

    /// Registry holding the built-in metrics.
    pub fn with_builtins() -> Self {
        let mut r = Self::empty();
        r.register(MetricKind::AngularSeparation.name(), angular_distance);
        r.register(MetricKind::KinematicDistance.name(), kinematic_distance);
        r
    }

    /// Add or replace a metric. Returns the previous entry, if any.
    pub fn register(&mut self, name: &str, distance: PairDistance) -> Option<PairDistance> {
        self.metrics.insert(name.to_owned(), distance)
    }

    /// `true` if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.metrics.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.metrics.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Compute the affinity matrix using the metric registered as `name`.
    ///
    /// A registered function returning NaN, ∞ or a negative value fails the
    /// whole computation with [`GraphError::InvalidAffinity`].
    pub fn compute(
        &self,
        name: &str,
        momenta: &MomentumSet,
        params: &MetricParams,
    ) -> Result<AffinityMatrix> {
        let distance = *self
            .metrics
            .get(name)
            .ok_or_else(|| GraphError::UnsupportedMetric(name.to_owned()))?;
        momenta.validate()?;
        params.validate()?;
        debug!("MetricRegistry::compute: n={}, metric={name}", momenta.len());
        let m = momenta.as_slice();
        fill(m.len(), params, |i, j| Ok(distance(&m[i], &m[j], params)))
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use core::f64::consts::PI;

    fn three_particles() -> MomentumSet {
        MomentumSet::from_rows(&[
            [10.0, 3.0, 0.0, 0.0],
            [10.0, -3.0, 0.0, 0.0],
            [10.0, 0.0, 4.0, 0.0],
        ])
    }

    #[test]
    fn test_empty_and_single_particle() {
        let empty = compute_affinity(&MomentumSet::default(), &Metric::angular()).unwrap();
        assert_eq!(empty.dim(), 0);
        let one = MomentumSet::from_rows(&[[5.0, 1.0, 2.0, 3.0]]);
        let a = compute_affinity(&one, &Metric::angular()).unwrap();
        assert_eq!(a.dim(), 1);
        assert_eq!(a.get(0, 0), 1.0);
    }

    #[test]
    fn test_angular_distance_by_hand() {
        let a = compute_affinity(&three_particles(), &Metric::angular().with_transform(AffinityTransform::Distance))
            .unwrap();
        assert_eq!(a.polarity(), Polarity::Distance);
        // φ = 0, π, π/2 and η = 0 for all three
        assert!((a.get(0, 1) - PI).abs() < 1e-12);
        assert!((a.get(0, 2) - PI / 2.0).abs() < 1e-12);
        assert!((a.get(1, 2) - PI / 2.0).abs() < 1e-12);
        for i in 0..3 {
            assert_eq!(a.get(i, i), 0.0);
        }
    }

    #[test]
    fn test_exponential_transform_and_diagonal() {
        let a = compute_affinity(&three_particles(), &Metric::angular()).unwrap();
        assert_eq!(a.polarity(), Polarity::Similarity);
        assert!((a.get(0, 1) - libm::exp(-PI)).abs() < 1e-12);
        assert_eq!(a.get(2, 2), 1.0);
    }

    #[test]
    fn test_inverse_transform_diagonal_is_one_over_epsilon() {
        let metric = Metric::angular().with_transform(AffinityTransform::Inverse).with_epsilon(0.5);
        let a = compute_affinity(&three_particles(), &metric).unwrap();
        assert_eq!(a.get(0, 0), 2.0);
        assert!((a.get(0, 2) - 1.0 / (PI / 2.0 + 0.5)).abs() < 1e-12);
    }

    #[test]
    fn test_inverse_transform_rejects_bad_epsilon() {
        let metric = Metric::angular().with_transform(AffinityTransform::Inverse).with_epsilon(0.0);
        assert!(matches!(
            compute_affinity(&three_particles(), &metric),
            Err(GraphError::InvalidParameter { name: "epsilon", .. })
        ));
    }

    #[test]
    fn test_kinematic_distance_by_hand() {
        // pT = 3, 3, 4; p = 1 → min(pT²) · ΔR²
        let metric = Metric::kinematic(1.0).with_transform(AffinityTransform::Distance);
        let a = compute_affinity(&three_particles(), &metric).unwrap();
        assert!((a.get(0, 1) - 9.0 * PI * PI).abs() < 1e-9);
        assert!((a.get(0, 2) - 9.0 * PI * PI / 4.0).abs() < 1e-9);
        assert!((a.get(1, 2) - 9.0 * PI * PI / 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_anti_kt_prefers_hard_particle() {
        // p = −1: min(1/pT²) picks the harder particle's weight
        let metric = Metric::kinematic(-1.0).with_transform(AffinityTransform::Distance);
        let a = compute_affinity(&three_particles(), &metric).unwrap();
        assert!((a.get(0, 2) - (PI * PI / 4.0) / 16.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_pt_particle_stays_finite() {
        let set = MomentumSet::from_rows(&[
            [0.0, 0.0, 0.0, 0.0],
            [10.0, 0.0, 0.0, 10.0],
            [10.0, 1.0, 0.0, 0.0],
        ]);
        for metric in [Metric::angular(), Metric::kinematic(-1.0), Metric::kinematic(1.0)] {
            for t in [AffinityTransform::Exponential, AffinityTransform::Inverse, AffinityTransform::Distance] {
                let a = compute_affinity(&set, &metric.with_transform(t)).unwrap();
                for v in a.values().as_slice() {
                    assert!(v.is_finite() && *v >= 0.0, "metric={metric:?} t={t:?} v={v}");
                }
            }
        }
    }

    #[test]
    fn test_huge_finite_input_saturates() {
        let set = MomentumSet::from_rows(&[[1e308, 1e308, 1e308, 0.0], [1e308, -1e308, 1e308, 0.0]]);
        let metric = Metric::kinematic(1.0).with_transform(AffinityTransform::Distance);
        let a = compute_affinity(&set, &metric).unwrap();
        assert_eq!(a.get(0, 1), f64::MAX);
    }

    #[test]
    fn test_non_finite_input_rejected() {
        let set = MomentumSet::from_rows(&[[1.0, 0.0, 0.0, 0.0], [1.0, f64::NAN, 0.0, 0.0]]);
        assert!(matches!(
            compute_affinity(&set, &Metric::angular()),
            Err(GraphError::InvalidInput { index: 1, .. })
        ));
    }

    #[test]
    fn test_metric_kind_from_str() {
        assert_eq!("delta_r".parse::<MetricKind>().unwrap(), MetricKind::AngularSeparation);
        assert_eq!("KT".parse::<MetricKind>().unwrap(), MetricKind::KinematicDistance);
        assert!(matches!(
            "cosine".parse::<MetricKind>(),
            Err(GraphError::UnsupportedMetric(name)) if name == "cosine"
        ));
    }

    #[test]
    fn test_registry_matches_enum_dispatch() {
        let set = three_particles();
        let registry = MetricRegistry::with_builtins();
        for metric in [Metric::angular(), Metric::kinematic(0.5)] {
            let via_enum = compute_affinity(&set, &metric).unwrap();
            let via_registry = registry.compute(metric.kind.name(), &set, &metric.params).unwrap();
            assert_eq!(via_enum, via_registry);
        }
    }

    #[test]
    fn test_registry_unknown_metric() {
        let registry = MetricRegistry::with_builtins();
        assert_eq!(registry.names(), ["angular_separation", "kinematic_distance"]);
        assert!(matches!(
            registry.compute("energy_flow", &three_particles(), &MetricParams::default()),
            Err(GraphError::UnsupportedMetric(_))
        ));
    }

    #[test]
    fn test_registry_custom_metric_is_validated() {
        fn energy_gap(a: &FourMomentum, b: &FourMomentum, _: &MetricParams) -> f64 {
            (a.e - b.e).abs()
        }
        fn broken(_: &FourMomentum, _: &FourMomentum, _: &MetricParams) -> f64 {
            -1.0
        }
        let mut registry = MetricRegistry::empty();
        assert!(registry.register("energy_gap", energy_gap).is_none());
        registry.register("broken", broken);
        let set = MomentumSet::from_rows(&[[1.0, 0.0, 0.0, 0.0], [4.0, 0.0, 0.0, 0.0]]);
        let params = MetricParams { transform: AffinityTransform::Distance, ..MetricParams::default() };
        let a = registry.compute("energy_gap", &set, &params).unwrap();
        assert_eq!(a.get(0, 1), 3.0);
        assert!(matches!(
            registry.compute("broken", &set, &params),
            Err(GraphError::InvalidAffinity { row: 0, col: 1, .. })
        ));
    }

    #[test]
    fn test_inverse_transform_rejects_epsilon_with_infinite_reciprocal() {
        let metric = Metric::angular().with_transform(AffinityTransform::Inverse).with_epsilon(1e-310);
        assert!(matches!(
            compute_affinity(&three_particles(), &metric),
            Err(GraphError::InvalidParameter { name: "epsilon", .. })
        ));
        let tiny = Metric::angular().with_transform(AffinityTransform::Inverse).with_epsilon(1e-300);
        let a = compute_affinity(&three_particles(), &tiny).unwrap();
        assert!(a.values().as_slice().iter().all(|v| v.is_finite()));
        assert_eq!(a.get(0, 0), 1.0 / 1e-300);
    }

    #[test]
    fn test_registry_rejects_custom_params_with_infinite_diagonal() {
        let params = MetricParams {
            transform: AffinityTransform::Inverse,
            epsilon: 1e-309,
            ..MetricParams::default()
        };
        assert!(matches!(
            MetricRegistry::with_builtins().compute("angular_separation", &three_particles(), &params),
            Err(GraphError::InvalidParameter { name: "epsilon", .. })
        ));
    }

    #[test]
    fn test_underflowing_exponential_keeps_raw_distances() {
        // pT = 50, p = 1: every off-diagonal distance is ≥ 1600, far past exp underflow
        let set: MomentumSet = [0.0_f64, 2.0, 1.5, 0.8]
            .iter()
            .map(|&phi| FourMomentum::new(50.0, 50.0 * libm::cos(phi), 50.0 * libm::sin(phi), 0.0))
            .collect();
        let a = compute_affinity(&set, &Metric::kinematic(1.0)).unwrap();
        assert_eq!(a.get(0, 1), 0.0);
        assert_eq!(a.get(0, 3), 0.0);
        let d = a.distances().unwrap();
        assert!((d.get(0, 3) - 2500.0 * 0.64).abs() < 1e-6, "d03={}", d.get(0, 3));
        assert!(d.get(0, 3) < d.get(0, 2) && d.get(0, 2) < d.get(0, 1));
        assert_eq!(d.get(0, 0), 0.0);

        let distance_only = Metric::kinematic(1.0).with_transform(AffinityTransform::Distance);
        assert!(compute_affinity(&set, &distance_only).unwrap().distances().is_none());
    }

    #[test]
    fn test_affinity_matrix_rejects_negative_entries() {
        assert!(matches!(
            AffinityMatrix::from_rows(&[[0.0, -1.0], [-1.0, 0.0]], Polarity::Distance),
            Err(GraphError::InvalidAffinity { row: 0, col: 1, .. })
        ));
        let z = AffinityMatrix::from_rows(&[[0.0, -0.0], [-0.0, 0.0]], Polarity::Distance).unwrap();
        assert!(z.get(0, 1).is_sign_positive());
    }
}
