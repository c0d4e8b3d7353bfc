// src/physics/ncoord.rs

//! Fractional coordination numbers.
//!
//! **Formula**: CN_i = Σ_j 1 / (1 + exp(−k1 · (k2 · (R_cov,i + R_cov,j) / R_ij − 1)))
//!
//! **Reference**: Grimme, Antony, Ehrlich & Krieg (2010) J. Chem. Phys. 132, 154104.

use super::contribution::{AtomContribution, TermResult};
use super::neighbors::PairList;
use crate::reference::ReferenceTable;
use rayon::prelude::*;

/// Steepness of the counting function
pub const KCN: f64 = 16.0;

/// Scaling of the summed covalent radii
pub const K2: f64 = 4.0 / 3.0;

/// Counting function and its derivative with respect to the distance.
///
/// `rc` is the sum of the two (unscaled) covalent radii. The derivative is
/// −k1 · rc' / R² · f · (1 − f) with rc' = k2 · rc.
#[inline]
pub fn counting_function(distance: f64, rc: f64) -> (f64, f64) {
    let rc = K2 * rc;
    let count = 1.0 / (1.0 + (-KCN * (rc / distance - 1.0)).exp());
    let dcount = -KCN * rc / (distance * distance) * count * (1.0 - count);
    (count, dcount)
}

#[derive(Clone, Debug)]
pub struct CoordinationNumbers {
    /// One value per atom
    pub cn: Vec<f64>,
    /// dCN_i/dR for every entry of the pair list (zero beyond the cutoff)
    pub dcn: Vec<f64>,
}

/// Coordination numbers from a full pair list.
///
/// Pairs farther apart than `cutoff` contribute nothing. `numbers` must be
/// covered by `table`.
pub fn coordination_numbers(
    numbers: &[u8],
    pairs: &PairList,
    table: &ReferenceTable,
    cutoff: f64,
) -> CoordinationNumbers {
    let radius = |z: u8| table.element(z).map(|e| e.covalent_radius).unwrap_or_default();

    let per_atom: Vec<(f64, Vec<f64>)> = (0..pairs.natoms())
        .into_par_iter()
        .map(|i| {
            let rcov_i = radius(numbers[i]);
            let mut cn = 0.0;
            let dcn = pairs
                .neighbors(i)
                .iter()
                .map(|pair| {
                    if pair.distance > cutoff {
                        return 0.0;
                    }
                    let (count, dcount) =
                        counting_function(pair.distance, rcov_i + radius(numbers[pair.j]));
                    cn += count;
                    dcount
                })
                .collect();
            (cn, dcn)
        })
        .collect();

    let mut result = CoordinationNumbers {
        cn: Vec::with_capacity(per_atom.len()),
        dcn: Vec::with_capacity(pairs.len()),
    };
    for (cn, dcn) in per_atom {
        result.cn.push(cn);
        result.dcn.extend(dcn);
    }
    log::trace!("coordination numbers: {:?}", result.cn);
    result
}

/// Gradient and virial of an energy that depends on the coordination numbers
/// through `dedcn` = ∂E/∂CN.
///
/// Gathered per atom: the pair (i, j) moves atom i through both CN_i and CN_j.
pub fn chain_rule(pairs: &PairList, cn: &CoordinationNumbers, dedcn: &[f64]) -> TermResult {
    let contributions: Vec<AtomContribution> = (0..pairs.natoms())
        .into_par_iter()
        .map(|i| {
            let mut c = AtomContribution::default();
            for (pair, dcount) in pairs.neighbors(i).iter().zip(&cn.dcn[pairs.range(i)]) {
                if *dcount == 0.0 {
                    continue;
                }
                let scale = dcount / pair.distance;
                c.gradient -= pair.vector * ((dedcn[i] + dedcn[pair.j]) * scale);
                c.sigma += pair.vector * pair.vector.transpose() * (dedcn[i] * scale);
            }
            c
        })
        .collect();
    TermResult::from_contributions(contributions)
}
