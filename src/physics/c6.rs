// src/physics/c6.rs

//! Coordination-number dependent C6/C8 coefficients.
//!
//! Each atom's reference systems are weighted with a Gaussian in
//! (CN − CN_ref); the pair coefficient is the doubly weighted average of the
//! tabulated reference C6 grid:
//!
//! ```text
//! w_a(CN)  = exp(−4 (CN − CN_a)²) / Σ_b exp(−4 (CN − CN_b)²)
//! C6_ij    = Σ_a Σ_b w_a(CN_i) w_b(CN_j) C6ref_ab
//! C8_ij    = 3 Q_i Q_j C6_ij
//! ```

use crate::error::{DispersionError, Result};
use crate::reference::{ElementReference, ReferenceTable};
use nalgebra::DMatrix;
use rayon::prelude::*;

/// Exponent of the Gaussian reference weighting
pub const WEIGHT_FACTOR: f64 = 4.0;

/// Normalized reference weights of one atom and their CN derivatives.
#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceWeights {
    pub weights: Vec<f64>,
    pub derivatives: Vec<f64>,
}

/// Effective coefficients of a single atom pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PairCoefficients {
    pub c6: f64,
    pub c8: f64,
    /// ∂C6/∂CN_i
    pub dc6_dcn_i: f64,
    /// ∂C6/∂CN_j
    pub dc6_dcn_j: f64,
}

/// Coefficient matrices of a whole structure.
#[derive(Clone, Debug)]
pub struct C6Matrix {
    pub c6: DMatrix<f64>,
    /// Entry (i, j) holds ∂C6_ij/∂CN_i
    pub dc6dcn: DMatrix<f64>,
    /// C8/C6 ratio 3 Q_i Q_j
    pub qq: DMatrix<f64>,
}

/// Gaussian weights of an element's reference systems at coordination `cn`.
///
/// When the Gaussians underflow (CN far outside the reference range) or the
/// result is not finite, the reference with the highest CN takes the full
/// weight with zero derivative.
pub fn reference_weights(element: &ElementReference, cn: f64) -> ReferenceWeights {
    let gaussians: Vec<f64> = element
        .cn
        .iter()
        .map(|r| (-WEIGHT_FACTOR * (cn - r).powi(2)).exp())
        .collect();
    let dgaussians: Vec<f64> = element
        .cn
        .iter()
        .zip(&gaussians)
        .map(|(r, g)| -2.0 * WEIGHT_FACTOR * (cn - r) * g)
        .collect();

    let norm: f64 = gaussians.iter().sum();
    let dnorm: f64 = dgaussians.iter().sum();

    if norm > f64::MIN_POSITIVE && norm.is_finite() {
        // Quotients only: norm² underflows long before norm does.
        let dlog = dnorm / norm;
        let weights: Vec<f64> = gaussians.iter().map(|g| g / norm).collect();
        let derivatives: Vec<f64> = weights
            .iter()
            .zip(&dgaussians)
            .map(|(w, dg)| dg / norm - w * dlog)
            .collect();
        if weights.iter().chain(&derivatives).all(|x| x.is_finite()) {
            return ReferenceWeights {
                weights,
                derivatives,
            };
        }
    }

    log::warn!(
        "reference weights degenerate at CN = {:.3}, using the highest reference",
        cn
    );
    let mut top = 0;
    for (a, r) in element.cn.iter().enumerate() {
        if *r > element.cn[top] {
            top = a;
        }
    }
    let mut weights = vec![0.0; element.cn.len()];
    weights[top] = 1.0;
    ReferenceWeights {
        derivatives: vec![0.0; weights.len()],
        weights,
    }
}

/// Interpolates C6 coefficients from a [`ReferenceTable`].
#[derive(Clone, Copy, Debug)]
pub struct C6Interpolator<'a> {
    table: &'a ReferenceTable,
}

impl<'a> C6Interpolator<'a> {
    pub fn new(table: &'a ReferenceTable) -> Self {
        Self { table }
    }

    fn element(&self, z: u8) -> Result<&'a ElementReference> {
        self.table
            .element(z)
            .ok_or_else(|| DispersionError::MissingParameterization {
                index: 0,
                number: z,
                reason: "no reference systems".into(),
            })
    }

    /// Weights of element `z` at coordination `cn`.
    pub fn weights(&self, z: u8, cn: f64) -> Result<ReferenceWeights> {
        Ok(reference_weights(self.element(z)?, cn))
    }

    /// Effective C6/C8 of a single pair (Z_i, CN_i), (Z_j, CN_j).
    pub fn pair(&self, zi: u8, cni: f64, zj: u8, cnj: f64) -> Result<PairCoefficients> {
        let (ei, ej) = (self.element(zi)?, self.element(zj)?);
        let grid = self
            .table
            .pair(zi, zj)
            .ok_or_else(|| DispersionError::MissingParameterization {
                index: 0,
                number: zi,
                reason: format!("no reference C6 grid for the pair with Z = {}", zj),
            })?;
        let wi = reference_weights(ei, cni);
        let wj = reference_weights(ej, cnj);
        let (c6, dc6_dcn_i, dc6_dcn_j) = contract(&wi, &wj, |a, b| grid.get(a, b));

        Ok(PairCoefficients {
            c6,
            c8: 3.0 * ei.r4r2_scaled * ej.r4r2_scaled * c6,
            dc6_dcn_i,
            dc6_dcn_j,
        })
    }

    /// C6, ∂C6/∂CN and C8/C6 for every atom pair of a structure.
    ///
    /// `numbers` must already be covered by the table (see
    /// [`ReferenceTable::check_coverage`]).
    pub fn matrix(&self, numbers: &[u8], cn: &[f64]) -> Result<C6Matrix> {
        let n = numbers.len();
        let elements = numbers
            .iter()
            .map(|&z| self.element(z))
            .collect::<Result<Vec<_>>>()?;
        let weights: Vec<ReferenceWeights> = elements
            .iter()
            .zip(cn)
            .map(|(e, &cn)| reference_weights(e, cn))
            .collect();

        let rows: Vec<Vec<(f64, f64, f64)>> = (0..n)
            .into_par_iter()
            .map(|i| {
                (0..n)
                    .map(|j| {
                        let qq = 3.0 * elements[i].r4r2_scaled * elements[j].r4r2_scaled;
                        match self.table.pair(numbers[i], numbers[j]) {
                            Some(grid) => {
                                let (c6, dc6, _) =
                                    contract(&weights[i], &weights[j], |a, b| grid.get(a, b));
                                (c6, dc6, qq)
                            }
                            None => (0.0, 0.0, qq),
                        }
                    })
                    .collect()
            })
            .collect();

        let mut c6 = DMatrix::zeros(n, n);
        let mut dc6dcn = DMatrix::zeros(n, n);
        let mut qq = DMatrix::zeros(n, n);
        for (i, row) in rows.into_iter().enumerate() {
            for (j, (c, d, q)) in row.into_iter().enumerate() {
                c6[(i, j)] = c;
                dc6dcn[(i, j)] = d;
                qq[(i, j)] = q;
            }
        }
        Ok(C6Matrix { c6, dc6dcn, qq })
    }
}

/// Σ_ab w_a w_b C6_ab together with its derivatives along both weight sets.
fn contract<F: Fn(usize, usize) -> f64>(
    wi: &ReferenceWeights,
    wj: &ReferenceWeights,
    c6ref: F,
) -> (f64, f64, f64) {
    let mut c6 = 0.0;
    let mut dc6i = 0.0;
    let mut dc6j = 0.0;
    for (a, (w_a, dw_a)) in wi.weights.iter().zip(&wi.derivatives).enumerate() {
        for (b, (w_b, dw_b)) in wj.weights.iter().zip(&wj.derivatives).enumerate() {
            let r = c6ref(a, b);
            c6 += w_a * w_b * r;
            dc6i += dw_a * w_b * r;
            dc6j += w_a * dw_b * r;
        }
    }
    (c6, dc6i, dc6j)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::table::fixtures::sample_table;
    use approx::assert_relative_eq;

    #[test]
    fn test_weights_normalized() {
        let table = sample_table();
        let carbon = table.element(6).unwrap();
        for cn in [0.0, 0.5, 1.7, 3.2, 4.5] {
            let w = reference_weights(carbon, cn);
            assert_relative_eq!(w.weights.iter().sum::<f64>(), 1.0, epsilon = 1e-14);
            assert!(w.derivatives.iter().sum::<f64>().abs() < 1e-12);
        }
    }

    #[test]
    fn test_weights_underflow_fallback() {
        let table = sample_table();
        let carbon = table.element(6).unwrap();
        let w = reference_weights(carbon, 60.0);
        assert_eq!(w.weights, vec![0.0, 0.0, 0.0, 0.0, 1.0]);
        assert!(w.derivatives.iter().all(|d| *d == 0.0));
    }

    #[test]
    fn test_weights_far_above_references() {
        // Gaussians still normal while their squares underflow
        let table = sample_table();
        let argon = table.element(18).unwrap();
        for cn in [9.0, 10.0, 11.0, 12.0, 13.0] {
            let w = reference_weights(argon, cn);
            assert_eq!(w.weights, vec![1.0]);
            assert!(w.derivatives[0].abs() < 1e-12, "CN {}: {:?}", cn, w.derivatives);
        }

        let carbon = table.element(6).unwrap();
        for cn in [13.0, 14.5, 16.0, 17.0] {
            let w = reference_weights(carbon, cn);
            assert!(w.weights.iter().chain(&w.derivatives).all(|x| x.is_finite()), "CN {}", cn);
            assert_relative_eq!(w.weights.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_single_reference_is_constant() {
        let table = sample_table();
        let c6 = C6Interpolator::new(&table);
        let a = c6.pair(18, 0.0, 18, 0.0).unwrap();
        let b = c6.pair(18, 2.5, 18, 0.3).unwrap();
        assert_relative_eq!(a.c6, 64.6483, epsilon = 1e-12);
        assert_relative_eq!(b.c6, 64.6483, epsilon = 1e-12);
        assert_eq!(b.dc6_dcn_i, 0.0);
    }

    #[test]
    fn test_interpolation_at_reference_points() {
        // Near a reference CN the Gaussian of that reference dominates
        let table = sample_table();
        let c6 = C6Interpolator::new(&table);
        let hh = c6.pair(1, 0.0, 1, 0.0).unwrap();
        assert!((hh.c6 - 6.5).abs() < 0.3, "{}", hh.c6);
        // Smooth and monotonic between the two H references
        let mid = c6.pair(1, 0.45, 1, 0.45).unwrap();
        assert!(mid.c6 < hh.c6 && mid.c6 > 3.1);
    }

    #[test]
    fn test_c8_ratio() {
        let table = sample_table();
        let c6 = C6Interpolator::new(&table);
        let p = c6.pair(6, 3.0, 1, 1.0).unwrap();
        let (qc, qh) = (table.element(6).unwrap().r4r2_scaled, table.element(1).unwrap().r4r2_scaled);
        assert_relative_eq!(p.c8, 3.0 * qc * qh * p.c6, max_relative = 1e-14);
    }

    #[test]
    fn test_pair_symmetry_and_derivatives() {
        let table = sample_table();
        let c6 = C6Interpolator::new(&table);
        let (cn_c, cn_o) = (2.7, 1.1);
        let co = c6.pair(6, cn_c, 8, cn_o).unwrap();
        let oc = c6.pair(8, cn_o, 6, cn_c).unwrap();
        assert_relative_eq!(co.c6, oc.c6, max_relative = 1e-14);
        assert_relative_eq!(co.dc6_dcn_i, oc.dc6_dcn_j, max_relative = 1e-12, epsilon = 1e-12);

        let h = 1e-6;
        let fd_i = (c6.pair(6, cn_c + h, 8, cn_o).unwrap().c6 - c6.pair(6, cn_c - h, 8, cn_o).unwrap().c6) / (2.0 * h);
        let fd_j = (c6.pair(6, cn_c, 8, cn_o + h).unwrap().c6 - c6.pair(6, cn_c, 8, cn_o - h).unwrap().c6) / (2.0 * h);
        assert!((fd_i - co.dc6_dcn_i).abs() < 1e-7);
        assert!((fd_j - co.dc6_dcn_j).abs() < 1e-7);
    }

    #[test]
    fn test_matrix_matches_pairs() {
        let table = sample_table();
        let c6 = C6Interpolator::new(&table);
        let numbers = [6, 1, 8];
        let cn = [3.1, 0.95, 1.4];
        let m = c6.matrix(&numbers, &cn).unwrap();
        for i in 0..3 {
            for j in 0..3 {
                let p = c6.pair(numbers[i], cn[i], numbers[j], cn[j]).unwrap();
                assert_relative_eq!(m.c6[(i, j)], p.c6, max_relative = 1e-14);
                assert_relative_eq!(m.dc6dcn[(i, j)], p.dc6_dcn_i, max_relative = 1e-12, epsilon = 1e-14);
                assert_relative_eq!(m.qq[(i, j)] * m.c6[(i, j)], p.c8, max_relative = 1e-14);
            }
        }
    }

    #[test]
    fn test_missing_element() {
        let table = sample_table();
        let c6 = C6Interpolator::new(&table);
        assert!(matches!(
            c6.pair(26, 0.0, 1, 0.0),
            Err(DispersionError::MissingParameterization { number: 26, .. })
        ));
    }
}
