// src/physics/contribution.rs

//! Per-atom partial results and their deterministic reduction.
//!
//! Every kernel is written in gather form: the task for home atom i only
//! accumulates quantities that belong to atom i. Tasks run in parallel and
//! their results are collected in atom order, then folded sequentially, so
//! the totals do not depend on the number of worker threads.

use nalgebra::{Matrix3, Vector3};

/// What one home atom contributes to a dispersion term.
#[derive(Clone, Debug, PartialEq)]
pub struct AtomContribution {
    pub energy: f64,
    /// ∂E/∂CN of the home atom
    pub dedcn: f64,
    /// ∂E/∂r of the home atom, direct part only
    pub gradient: Vector3<f64>,
    /// Share of the strain derivative
    pub sigma: Matrix3<f64>,
}

impl Default for AtomContribution {
    fn default() -> Self {
        Self {
            energy: 0.0,
            dedcn: 0.0,
            gradient: Vector3::zeros(),
            sigma: Matrix3::zeros(),
        }
    }
}

/// Reduced result of one term (or a sum of terms).
#[derive(Clone, Debug, PartialEq)]
pub struct TermResult {
    pub energy: f64,
    pub energies: Vec<f64>,
    pub dedcn: Vec<f64>,
    pub gradient: Vec<Vector3<f64>>,
    pub sigma: Matrix3<f64>,
}

impl TermResult {
    pub fn zeros(natoms: usize) -> Self {
        Self {
            energy: 0.0,
            energies: vec![0.0; natoms],
            dedcn: vec![0.0; natoms],
            gradient: vec![Vector3::zeros(); natoms],
            sigma: Matrix3::zeros(),
        }
    }

    /// Folds per-atom contributions in ascending atom order.
    pub fn from_contributions(contributions: Vec<AtomContribution>) -> Self {
        let mut result = Self::zeros(contributions.len());
        for (i, c) in contributions.into_iter().enumerate() {
            result.energy += c.energy;
            result.energies[i] = c.energy;
            result.dedcn[i] = c.dedcn;
            result.gradient[i] = c.gradient;
            result.sigma += c.sigma;
        }
        result
    }

    /// Adds another term atom by atom.
    pub fn accumulate(&mut self, other: &TermResult) {
        self.energy += other.energy;
        for (a, b) in self.energies.iter_mut().zip(&other.energies) {
            *a += b;
        }
        for (a, b) in self.dedcn.iter_mut().zip(&other.dedcn) {
            *a += b;
        }
        for (a, b) in self.gradient.iter_mut().zip(&other.gradient) {
            *a += b;
        }
        self.sigma += other.sigma;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduction_in_atom_order() {
        let contributions = vec![
            AtomContribution {
                energy: -1.0,
                dedcn: 0.5,
                gradient: Vector3::new(1.0, 0.0, 0.0),
                sigma: Matrix3::identity(),
            },
            AtomContribution::default(),
            AtomContribution {
                energy: -2.0,
                dedcn: 0.25,
                gradient: Vector3::new(0.0, 0.0, -1.0),
                sigma: Matrix3::identity() * 2.0,
            },
        ];
        let r = TermResult::from_contributions(contributions);
        assert_eq!(r.energy, -3.0);
        assert_eq!(r.energies, vec![-1.0, 0.0, -2.0]);
        assert_eq!(r.dedcn, vec![0.5, 0.0, 0.25]);
        assert_eq!(r.gradient[2], Vector3::new(0.0, 0.0, -1.0));
        assert_eq!(r.sigma, Matrix3::identity() * 3.0);

        let mut total = TermResult::zeros(3);
        total.accumulate(&r);
        total.accumulate(&r);
        assert_eq!(total.energy, -6.0);
        assert_eq!(total.energies[2], -4.0);
    }
}
