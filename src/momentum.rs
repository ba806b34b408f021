/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Four-momenta and the ordered sets they arrive in.
//!
//! A [`FourMomentum`] is `(E, px, py, pz)` in natural units. Nothing here
//! assumes on-shell input: every derived quantity is clamped or floored so
//! that a finite four-vector always yields finite kinematics.
//!
//! A [`MomentumSet`] is the unit of input to the pipeline. Index position is
//! particle identity, and every matrix built downstream is indexed against it.
//!
//! # Invariants
//! - **Finite kinematics** — `pt`, `eta`, `rapidity`, `phi` and `mass` are
//!   finite for any finite four-vector.
//! - **Wrapped azimuth** — [`wrap_phi`] maps into (−π, π] and satisfies
//!   `|wrap_phi(x)| == |wrap_phi(-x)|` bit for bit.

use alloc::vec::Vec;
use core::f64::consts::{PI, TAU};

use crate::error::{GraphError, MomentumField, Result};
use crate::matrix::check_permutation;

/// Transverse momenta below this value are floored before being divided by
/// or raised to a negative power.
pub const PT_FLOOR: f64 = 1e-12;

/// Magnitude cap applied to pseudorapidity and rapidity.
///
/// `asinh(f64::MAX)` is ≈ 710, so this only bites for beam-collinear
/// particles whose `pz / pt` ratio overflows.
pub const RAPIDITY_LIMIT: f64 = 1.0e3;

/// Regulator added to the squared mass in [`MomentumSet::jet_mass`].
pub const JET_MASS_EPSILON: f64 = 1e-10;

// ─── FourMomentum ────────────────────────────────────────────────────────────

/// Energy-momentum four-vector `p^μ = (E, px, py, pz)`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FourMomentum {
    /// Energy component.
    pub e: f64,
    /// Momentum x-component.
    pub px: f64,
    /// Momentum y-component.
    pub py: f64,
    /// Momentum z-component (beam axis).
    pub pz: f64,
}

impl FourMomentum {
    /// Construct a four-momentum from its components.
    pub const fn new(e: f64, px: f64, py: f64, pz: f64) -> Self {
        Self { e, px, py, pz }
    }

    /// Build from an `[E, px, py, pz]` row.
    pub const fn from_array(row: [f64; 4]) -> Self {
        Self::new(row[0], row[1], row[2], row[3])
    }

    /// The `[E, px, py, pz]` row for this four-momentum.
    pub const fn to_array(&self) -> [f64; 4] {
        [self.e, self.px, self.py, self.pz]
    }

    /// Transverse momentum `pT = √(px² + py²)`.
    pub fn pt(&self) -> f64 {
        libm::hypot(self.px, self.py)
    }

    /// Magnitude of the three-momentum `|p|`.
    pub fn p(&self) -> f64 {
        libm::hypot(self.pt(), self.pz)
    }

    /// Azimuthal angle `φ = atan2(py, px)` in [−π, π].
    ///
    /// A particle with zero transverse momentum has `φ = 0`.
    pub fn phi(&self) -> f64 {
        libm::atan2(self.py, self.px)
    }

    /// Pseudorapidity `η = asinh(pz / pT)`.
    ///
    /// `pT` is floored at [`PT_FLOOR`] and the result clamped to
    /// ±[`RAPIDITY_LIMIT`], so beam-collinear particles stay finite.
    pub fn eta(&self) -> f64 {
        let ratio = self.pz / self.pt().max(PT_FLOOR);
        libm::asinh(ratio).clamp(-RAPIDITY_LIMIT, RAPIDITY_LIMIT)
    }

    /// Rapidity `y = ½ ln((E + pz) / (E − pz))`.
    ///
    /// Both light-cone components are floored at [`PT_FLOOR`] before the
    /// logarithm; off-shell input with `E ≤ |pz|` saturates instead of
    /// producing NaN.
    pub fn rapidity(&self) -> f64 {
        let plus = (self.e + self.pz).max(PT_FLOOR);
        let minus = (self.e - self.pz).max(PT_FLOOR);
        let y = 0.5 * (libm::log(plus) - libm::log(minus));
        if y.is_nan() {
            return 0.0;
        }
        y.clamp(-RAPIDITY_LIMIT, RAPIDITY_LIMIT)
    }

    /// Invariant mass squared `m² = E² − |p|²`. Negative for spacelike input.
    pub fn mass_squared(&self) -> f64 {
        let p = self.p();
        (self.e - p) * (self.e + p)
    }

    /// Invariant mass, clamped to zero for spacelike input.
    pub fn mass(&self) -> f64 {
        let m2 = self.mass_squared();
        if m2 > 0.0 {
            libm::sqrt(m2)
        } else {
            0.0
        }
    }

    /// `true` when every component is finite.
    pub fn is_finite(&self) -> bool {
        self.e.is_finite() && self.px.is_finite() && self.py.is_finite() && self.pz.is_finite()
    }

    /// First non-finite component, if any.
    fn first_non_finite(&self) -> Option<(MomentumField, f64)> {
        [
            (MomentumField::Energy, self.e),
            (MomentumField::Px, self.px),
            (MomentumField::Py, self.py),
            (MomentumField::Pz, self.pz),
        ]
        .into_iter()
        .find(|(_, v)| !v.is_finite())
    }

    /// Component-wise scaling by a scalar weight.
    pub fn scaled(&self, w: f64) -> Self {
        Self::new(self.e * w, self.px * w, self.py * w, self.pz * w)
    }
}

impl core::ops::Add for FourMomentum {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.e + rhs.e, self.px + rhs.px, self.py + rhs.py, self.pz + rhs.pz)
    }
}

impl From<[f64; 4]> for FourMomentum {
    fn from(row: [f64; 4]) -> Self {
        Self::from_array(row)
    }
}

// ─── Angular helpers ─────────────────────────────────────────────────────────

/// Wrap an azimuthal difference into (−π, π].
///
/// Raw subtraction of two angles near the ±π seam gives a separation close
/// to 2π; wrapping recovers the short way round.
pub fn wrap_phi(dphi: f64) -> f64 {
    let w = libm::fmod(dphi, TAU);
    if w > PI {
        w - TAU
    } else if w <= -PI {
        w + TAU
    } else {
        w
    }
}

/// Squared rapidity–azimuth separation `Δy² + Δφ²`.
///
/// `rap_*` may be pseudorapidity or true rapidity; the caller decides.
pub fn delta_r2(rap_a: f64, phi_a: f64, rap_b: f64, phi_b: f64) -> f64 {
    let d_rap = rap_a - rap_b;
    let d_phi = wrap_phi(phi_a - phi_b);
    d_rap * d_rap + d_phi * d_phi
}

/// Pseudorapidity–azimuth separation `ΔR = √(Δη² + Δφ²)` between two particles.
pub fn delta_r(a: &FourMomentum, b: &FourMomentum) -> f64 {
    libm::sqrt(delta_r2(a.eta(), a.phi(), b.eta(), b.phi()))
}

// ─── MomentumSet ─────────────────────────────────────────────────────────────

/// Ordered, immutable collection of four-momenta for one event.
///
/// Construction never fails; [`MomentumSet::validate`] is run by every stage
/// that consumes the set, so a set holding NaN can exist but cannot produce
/// a matrix.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct MomentumSet {
    momenta: Vec<FourMomentum>,
}

impl MomentumSet {
    /// Wrap an owned vector of four-momenta.
    pub fn new(momenta: Vec<FourMomentum>) -> Self {
        Self { momenta }
    }

    /// Build from an N×4 array of `[E, px, py, pz]` rows.
    pub fn from_rows(rows: &[[f64; 4]]) -> Self {
        rows.iter().copied().map(FourMomentum::from_array).collect()
    }

    /// Number of particles.
    pub fn len(&self) -> usize {
        self.momenta.len()
    }

    /// `true` if the set holds no particles.
    pub fn is_empty(&self) -> bool {
        self.momenta.is_empty()
    }

    /// Particle at `index`, if present.
    pub fn get(&self, index: usize) -> Option<&FourMomentum> {
        self.momenta.get(index)
    }

    /// Iterate in index order.
    pub fn iter(&self) -> core::slice::Iter<'_, FourMomentum> {
        self.momenta.iter()
    }

    /// Borrow the underlying slice.
    pub fn as_slice(&self) -> &[FourMomentum] {
        &self.momenta
    }

    /// The N×4 `[E, px, py, pz]` representation.
    pub fn to_rows(&self) -> Vec<[f64; 4]> {
        self.momenta.iter().map(FourMomentum::to_array).collect()
    }

    /// Reject the set if any component of any particle is NaN or infinite.
    ///
    /// Reports the first offender in index order.
    pub fn validate(&self) -> Result<()> {
        for (index, pmu) in self.momenta.iter().enumerate() {
            if let Some((field, value)) = pmu.first_non_finite() {
                return Err(GraphError::InvalidInput { index, field, value });
            }
        }
        Ok(())
    }

    /// Relabel particles: entry `i` of the result is entry `perm[i]` of `self`.
    ///
    /// Fails with [`GraphError::InvalidParameter`] if `perm` is not a
    /// permutation of `0..len`.
    pub fn permuted(&self, perm: &[usize]) -> Result<Self> {
        check_permutation(perm, self.len())?;
        Ok(perm.iter().map(|&src| self.momenta[src]).collect())
    }

    /// Component-wise sum of all four-momenta.
    pub fn total(&self) -> FourMomentum {
        self.momenta
            .iter()
            .fold(FourMomentum::default(), |acc, &p| acc + p)
    }

    /// Combined invariant mass of the set, optionally weighting each particle.
    ///
    /// Returns `√(max(0, E² − |p|²) + ε)` of the (weighted) summed
    /// four-momentum, with ε = [`JET_MASS_EPSILON`]. Masking and cuts are the
    /// caller's job; every particle in the set contributes.
    ///
    /// Fails if a particle is non-finite, if `weights` has the wrong length,
    /// or if a weight is non-finite.
    pub fn jet_mass(&self, weights: Option<&[f64]>) -> Result<f64> {
        self.validate()?;
        let total = match weights {
            None => self.total(),
            Some(w) => {
                if w.len() != self.len() {
                    return Err(GraphError::ShapeMismatch(alloc::format!(
                        "{} weights for {} particles",
                        w.len(),
                        self.len()
                    )));
                }
                if let Some(bad) = w.iter().position(|x| !x.is_finite()) {
                    return Err(GraphError::InvalidParameter {
                        name: "weight",
                        reason: alloc::format!("weight {bad} is not finite"),
                    });
                }
                self.momenta
                    .iter()
                    .zip(w)
                    .fold(FourMomentum::default(), |acc, (p, &wi)| acc + p.scaled(wi))
            }
        };
        let p2 = total.px * total.px + total.py * total.py + total.pz * total.pz;
        let m2 = (total.e * total.e - p2).max(0.0);
        Ok(libm::sqrt(m2 + JET_MASS_EPSILON))
    }
}

impl FromIterator<FourMomentum> for MomentumSet {
    fn from_iter<I: IntoIterator<Item = FourMomentum>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl From<Vec<FourMomentum>> for MomentumSet {
    fn from(momenta: Vec<FourMomentum>) -> Self {
        Self::new(momenta)
    }
}

impl<'a> IntoIterator for &'a MomentumSet {
    type Item = &'a FourMomentum;
    type IntoIter = core::slice::Iter<'a, FourMomentum>;

    fn into_iter(self) -> Self::IntoIter {
        self.momenta.iter()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_transverse_kinematics() {
        let p = FourMomentum::new(10.0, 3.0, 4.0, 0.0);
        assert!(close(p.pt(), 5.0));
        assert!(close(p.p(), 5.0));
        assert!(close(p.eta(), 0.0));
        assert!(close(p.phi(), libm::atan2(4.0, 3.0)));
        assert!(close(p.mass(), libm::sqrt(75.0)));
    }

    #[test]
    fn test_eta_matches_polar_angle_definition() {
        // θ = 45° → η = −ln(tan(22.5°)) ≈ 0.881374
        let p = FourMomentum::new(2.0, 1.0, 0.0, 1.0);
        assert!((p.eta() - 0.881_373_587_019_543).abs() < 1e-12, "eta={}", p.eta());
    }

    #[test]
    fn test_beam_collinear_particle_has_finite_eta() {
        let p = FourMomentum::new(50.0, 0.0, 0.0, 50.0);
        assert!(p.eta().is_finite());
        assert!(p.eta() > 20.0);
        let back = FourMomentum::new(50.0, 0.0, 0.0, -50.0);
        assert!(close(back.eta(), -p.eta()));
    }

    #[test]
    fn test_rapidity_saturates_for_spacelike_input() {
        // E < |pz|: the light-cone component E − pz is negative
        let p = FourMomentum::new(1.0, 0.0, 0.0, 5.0);
        assert!(p.rapidity().is_finite());
        let at_rest = FourMomentum::new(1.0, 0.0, 0.0, 0.0);
        assert!(close(at_rest.rapidity(), 0.0));
    }

    #[test]
    fn test_spacelike_mass_clamps_to_zero() {
        let p = FourMomentum::new(1.0, 3.0, 0.0, 0.0);
        assert!(p.mass_squared() < 0.0);
        assert_eq!(p.mass(), 0.0);
    }

    #[test]
    fn test_wrap_phi_range() {
        assert!(close(wrap_phi(0.0), 0.0));
        assert_eq!(wrap_phi(PI), PI);
        assert_eq!(wrap_phi(-PI), PI);
        assert!(close(wrap_phi(1.5 * PI), -0.5 * PI));
        assert!(close(wrap_phi(-1.5 * PI), 0.5 * PI));
        assert!(close(wrap_phi(2.0 * PI), 0.0));
    }

    #[test]
    fn test_wrap_phi_is_odd_in_magnitude() {
        for &x in &[0.1, 1.0, 3.0, PI, 3.2, 4.0, 6.0, 6.28, 9.5] {
            assert_eq!(wrap_phi(x).abs(), wrap_phi(-x).abs(), "x={x}");
        }
    }

    #[test]
    fn test_delta_r_across_phi_seam() {
        // φ = ±(π − 0.1): raw difference ≈ 2π − 0.2, true separation 0.2
        let a = FourMomentum::new(1.0, libm::cos(PI - 0.1), libm::sin(PI - 0.1), 0.0);
        let b = FourMomentum::new(1.0, libm::cos(PI - 0.1), -libm::sin(PI - 0.1), 0.0);
        assert!((delta_r(&a, &b) - 0.2).abs() < 1e-9, "dr={}", delta_r(&a, &b));
    }

    #[test]
    fn test_validate_reports_first_non_finite() {
        let set = MomentumSet::from_rows(&[
            [1.0, 0.0, 0.0, 0.0],
            [1.0, 0.0, f64::INFINITY, 0.0],
            [f64::NAN, 0.0, 0.0, 0.0],
        ]);
        match set.validate() {
            Err(GraphError::InvalidInput { index, field, .. }) => {
                assert_eq!(index, 1);
                assert_eq!(field, MomentumField::Py);
            }
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_set_is_valid() {
        let set = MomentumSet::default();
        assert!(set.is_empty());
        assert!(set.validate().is_ok());
    }

    #[test]
    fn test_permuted_relabels() {
        let set = MomentumSet::from_rows(&[
            [1.0, 0.0, 0.0, 0.0],
            [2.0, 0.0, 0.0, 0.0],
            [3.0, 0.0, 0.0, 0.0],
        ]);
        let p = set.permuted(&[2, 0, 1]).unwrap();
        let energies: Vec<f64> = p.iter().map(|m| m.e).collect();
        assert_eq!(energies, vec![3.0, 1.0, 2.0]);
        assert!(set.permuted(&[0, 0, 1]).is_err());
        assert!(set.permuted(&[0, 1]).is_err());
    }

    #[test]
    fn test_jet_mass_of_back_to_back_pair() {
        // Two massless back-to-back 50 GeV particles → m = 100
        let set = MomentumSet::from_rows(&[[50.0, 50.0, 0.0, 0.0], [50.0, -50.0, 0.0, 0.0]]);
        let m = set.jet_mass(None).unwrap();
        assert!((m - 100.0).abs() < 1e-9, "m={m}");
    }

    #[test]
    fn test_jet_mass_weighted() {
        let set = MomentumSet::from_rows(&[[50.0, 50.0, 0.0, 0.0], [50.0, -50.0, 0.0, 0.0]]);
        // Dropping the second particle leaves a single massless one
        let m = set.jet_mass(Some(&[1.0, 0.0][..])).unwrap();
        assert!((m - libm::sqrt(JET_MASS_EPSILON)).abs() < 1e-12, "m={m}");
        assert!(matches!(
            set.jet_mass(Some(&[1.0][..])),
            Err(GraphError::ShapeMismatch(_))
        ));
        assert!(matches!(
            set.jet_mass(Some(&[1.0, f64::NAN][..])),
            Err(GraphError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_jet_mass_of_empty_set_is_regulator() {
        let m = MomentumSet::default().jet_mass(None).unwrap();
        assert!((m - libm::sqrt(JET_MASS_EPSILON)).abs() < 1e-15);
    }
}
