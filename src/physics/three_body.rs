// src/physics/three_body.rs

//! Axilrod–Teller–Muto three-body dispersion.
//!
//! **Formula**: E_ijk = −C9 · (3 cosθi cosθj cosθk + 1) / (R_ij R_ik R_jk)³ · f_damp
//! with C9 = −s9 · sqrt(|C6_ij C6_ik C6_jk|).
//!
//! Triangles are enumerated from every home atom over unordered pairs of its
//! neighbor entries, so each triangle is met once per vertex and contributes
//! a third of its energy per visit.

use super::c6::C6Matrix;
use super::contribution::{AtomContribution, TermResult};
use super::damping::Damping;
use super::neighbors::{Pair, PairList};
use crate::error::{DispersionError, Result};
use nalgebra::DMatrix;
use rayon::prelude::*;

/// Energy of one triangle and its derivatives with respect to the squared
/// side lengths (ij, ik, jk).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
    pub energy: f64,
    pub gradient: [f64; 3],
}

/// Angular factor as a function of the squared sides and its derivative
/// with respect to the first one. The factor is symmetric in its arguments.
#[inline]
fn angular(a: f64, b: f64, c: f64) -> (f64, f64) {
    let s = a + b + c;
    let (ta, tb, tc) = (s - 2.0 * a, s - 2.0 * b, s - 2.0 * c);
    let abc = a * b * c;
    let p15 = abc * abc.sqrt();
    let p25 = p15 * abc;

    let value = 0.375 * ta * tb * tc / p25 + 1.0 / p15;
    let dvalue = 0.375 * (ta * tc + ta * tb - tb * tc) / p25
        - 2.5 * 0.375 * ta * tb * tc / (p25 * a)
        - 1.5 / (p15 * a);
    (value, dvalue)
}

/// ATM energy of a single triangle.
///
/// Arrays are ordered (ij, ik, jk): pair C6 coefficients, damping radii and
/// squared side lengths.
pub fn triangle(c6: [f64; 3], r0: [f64; 3], sides2: [f64; 3], s9: f64, alp: f64) -> Triangle {
    let [a, b, c] = sides2;
    let c9 = -s9 * (c6[0] * c6[1] * c6[2]).abs().sqrt();

    let (ang, dang_a) = angular(a, b, c);
    let (_, dang_b) = angular(b, a, c);
    let (_, dang_c) = angular(c, b, a);

    let ratio = r0[0] * r0[1] * r0[2] / (a * b * c).sqrt();
    let p = ratio.powf(alp / 3.0);
    let fdmp = 1.0 / (1.0 + 6.0 * p);
    let dfdmp = alp * p * fdmp * fdmp;

    let de = |dang: f64, x: f64| -c9 * (dang * fdmp + ang * dfdmp / x);
    Triangle {
        energy: -c9 * ang * fdmp,
        gradient: [de(dang_a, a), de(dang_b, b), de(dang_c, c)],
    }
}

/// Three-body energy with direct derivatives over all triangles whose sides
/// are all within `cutoff`.
pub fn evaluate(
    pairs: &PairList,
    coefficients: &C6Matrix,
    vdw_radii: Option<&DMatrix<f64>>,
    damping: &Damping,
    s9: f64,
    alp: f64,
    cutoff: f64,
) -> Result<TermResult> {
    if damping.needs_vdw_radii() && vdw_radii.is_none() {
        return Err(DispersionError::InvalidParameters(
            "zero damping requires van der Waals radii".into(),
        ));
    }
    let cutoff2 = cutoff * cutoff;
    let radius = |i: usize, j: usize| {
        let r0 = vdw_radii.map_or(0.0, |r| r[(i, j)]);
        damping.atm_radius(coefficients.qq[(i, j)], r0)
    };

    let contributions: Vec<AtomContribution> = (0..pairs.natoms())
        .into_par_iter()
        .map(|i| {
            let mut contribution = AtomContribution::default();
            let near: Vec<&Pair> = pairs
                .neighbors(i)
                .iter()
                .filter(|p| p.distance <= cutoff)
                .collect();

            for (n, pj) in near.iter().enumerate() {
                for pk in &near[n + 1..] {
                    let vjk = pk.vector - pj.vector;
                    let c = vjk.norm_squared();
                    if c > cutoff2 || c == 0.0 {
                        continue;
                    }
                    let (j, k) = (pj.j, pk.j);
                    let c6 = [
                        coefficients.c6[(i, j)],
                        coefficients.c6[(i, k)],
                        coefficients.c6[(j, k)],
                    ];
                    if c6.iter().any(|x| *x == 0.0) {
                        continue;
                    }
                    let r0 = [radius(i, j), radius(i, k), radius(j, k)];
                    let sides2 = [pj.distance * pj.distance, pk.distance * pk.distance, c];
                    let t = triangle(c6, r0, sides2, s9, alp);
                    let [de_a, de_b, de_c] = t.gradient;

                    contribution.energy += t.energy / 3.0;
                    contribution.dedcn += 0.5
                        * t.energy
                        * (coefficients.dc6dcn[(i, j)] / c6[0] + coefficients.dc6dcn[(i, k)] / c6[1]);
                    contribution.gradient -= (pj.vector * de_a + pk.vector * de_b) * 2.0;
                    contribution.sigma += (pj.vector * pj.vector.transpose() * de_a
                        + pk.vector * pk.vector.transpose() * de_b
                        + vjk * vjk.transpose() * de_c)
                        * (2.0 / 3.0);
                }
            }
            contribution
        })
        .collect();

    let result = TermResult::from_contributions(contributions);
    log::debug!("three-body dispersion energy: {:.10} Eh", result.energy);
    Ok(result)
}
