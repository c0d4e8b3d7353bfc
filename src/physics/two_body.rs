// src/physics/two_body.rs

//! Damped C6/C8 pair dispersion.
//!
//! E2 = ½ Σ_(i,j,T) sw(R) · C6_ij · f(R), summed over the full pair list so
//! that every pair (and every image of it) is counted once.

use super::c6::C6Matrix;
use super::contribution::{AtomContribution, TermResult};
use super::damping::{Damping, Switching};
use super::neighbors::PairList;
use crate::error::{DispersionError, Result};
use nalgebra::DMatrix;
use rayon::prelude::*;

/// Two-body dispersion energy with direct derivatives.
///
/// `vdw_radii` holds the per-atom-pair van der Waals radii and is required
/// for zero damping. The gradient returned here excludes the coordination
/// number dependence; `dedcn` carries that part.
pub fn evaluate(
    pairs: &PairList,
    coefficients: &C6Matrix,
    vdw_radii: Option<&DMatrix<f64>>,
    damping: &Damping,
    alp: f64,
    switching: Switching,
) -> Result<TermResult> {
    if damping.needs_vdw_radii() && vdw_radii.is_none() {
        return Err(DispersionError::InvalidParameters(
            "zero damping requires van der Waals radii".into(),
        ));
    }
    let n = pairs.natoms();
    if coefficients.c6.nrows() != n {
        return Err(DispersionError::InvalidParameters(format!(
            "coefficient matrix is {} x {}, expected {} atoms",
            coefficients.c6.nrows(),
            coefficients.c6.ncols(),
            n
        )));
    }

    let contributions: Vec<AtomContribution> = (0..n)
        .into_par_iter()
        .map(|i| {
            let mut c = AtomContribution::default();
            for pair in pairs.neighbors(i) {
                let d = pair.distance;
                let (sw, dsw) = switching.eval(d);
                if sw == 0.0 {
                    continue;
                }
                let j = pair.j;
                let r0 = vdw_radii.map_or(0.0, |r| r[(i, j)]);
                let c6 = coefficients.c6[(i, j)];
                let (f, df) = damping.pair(d, coefficients.qq[(i, j)], r0, alp);

                c.energy += 0.5 * c6 * f * sw;
                c.dedcn += f * sw * coefficients.dc6dcn[(i, j)];

                // Both directions of the pair move atom i
                let de = c6 * (df * sw + f * dsw);
                c.gradient -= pair.vector * (de / d);
                c.sigma += pair.vector * pair.vector.transpose() * (0.5 * de / d);
            }
            c
        })
        .collect();

    let result = TermResult::from_contributions(contributions);
    log::debug!("two-body dispersion energy: {:.10} Eh", result.energy);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::structure::Structure;
    use crate::reference::data::{r4_over_r2, scaled_r4_over_r2};
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    // Water dimer-like complex: water (O, H, H) and methanol (O, H, C, H, H, H)
    const NUMBERS: [u8; 9] = [8, 1, 1, 8, 1, 6, 1, 1, 1];
    const POSITIONS: [[f64; 3]; 9] = [
        [-4.224363834, 0.270465696, 0.527578960],
        [-5.011768887, 1.780116228, 1.143194385],
        [-2.468758653, 0.479766200, 0.982905589],
        [1.146167671, 0.452771215, 1.257722311],
        [1.841554378, -0.628298322, 2.538065200],
        [2.024899840, -0.438480095, -1.127412563],
        [1.210773578, 0.791908575, -2.550591723],
        [4.077073644, -0.342495506, -1.267841745],
        [1.404422261, -2.365753991, -1.503620411],
    ];
    const C6: [[f64; 9]; 9] = [
        [10.4125013, 5.4365230, 5.4351273, 10.4113941, 5.4319568, 13.6274719, 5.4359927, 5.4365005, 5.4364958],
        [5.4365230, 3.0927703, 3.0918815, 5.4358449, 3.0898616, 7.4717073, 3.0924325, 3.0927563, 3.0927527],
        [5.4351273, 3.0918815, 3.0909929, 5.4344497, 3.0889738, 7.4696641, 3.0915439, 3.0918674, 3.0918639],
        [10.4113941, 5.4358449, 5.4344497, 10.4102859, 5.4312797, 13.6258793, 5.4353147, 5.4358230, 5.4358177],
        [5.4319568, 3.0898616, 3.0889740, 5.4312797, 3.0869563, 7.4650211, 3.0895240, 3.0898473, 3.0898442],
        [13.6274719, 7.4717073, 7.4696641, 13.6258793, 7.4650211, 18.3402557, 7.4709311, 7.4716754, 7.4716673],
        [5.4359927, 3.0924325, 3.0915437, 5.4353147, 3.0895243, 7.4709306, 3.0920947, 3.0924184, 3.0924149],
        [5.4365005, 3.0927560, 3.0918674, 5.4358230, 3.0898476, 7.4716749, 3.0924184, 3.0927420, 3.0927389],
        [5.4364958, 3.0927529, 3.0918639, 5.4358177, 3.0898442, 7.4716673, 3.0924149, 3.0927389, 3.0927355],
    ];

    fn coefficients() -> C6Matrix {
        let q: Vec<f64> = NUMBERS
            .iter()
            .map(|&z| scaled_r4_over_r2(z, r4_over_r2(z).unwrap()))
            .collect();
        C6Matrix {
            c6: DMatrix::from_fn(9, 9, |i, j| C6[i][j]),
            dc6dcn: DMatrix::zeros(9, 9),
            qq: DMatrix::from_fn(9, 9, |i, j| 3.0 * q[i] * q[j]),
        }
    }

    fn energy(positions: &[[f64; 3]]) -> f64 {
        let s = Structure::molecule(&NUMBERS, positions);
        let pairs = PairList::build(&s, 60.0).unwrap();
        let damping = Damping::rational("r2scan").unwrap();
        evaluate(&pairs, &coefficients(), None, &damping, 14.0, Switching::new(55.0, 60.0))
            .unwrap()
            .energy
    }

    #[test]
    fn test_interaction_energy() {
        let mut shifted = POSITIONS;
        for p in shifted.iter_mut().skip(3) {
            p[0] += 100.0;
        }
        let difference = energy(&POSITIONS) - energy(&shifted);
        assert!((difference - (-0.00039647335)).abs() < 1e-9, "{}", difference);
    }

    #[test]
    fn test_per_atom_energies_sum() {
        let s = Structure::molecule(&NUMBERS, &POSITIONS);
        let pairs = PairList::build(&s, 60.0).unwrap();
        let damping = Damping::rational("r2scan").unwrap();
        let r = evaluate(&pairs, &coefficients(), None, &damping, 14.0, Switching::new(55.0, 60.0)).unwrap();
        assert_relative_eq!(r.energies.iter().sum::<f64>(), r.energy, max_relative = 1e-12);
        assert!(r.energies.iter().all(|e| *e < 0.0));
        // No coordination number dependence in a fixed coefficient matrix
        assert!(r.dedcn.iter().all(|x| *x == 0.0));
        // Forces of an isolated system sum to zero, up to the slight
        // asymmetry of the tabulated matrix
        let total: Vector3<f64> = r.gradient.iter().sum();
        assert!(total.norm() < 1e-9);
    }

    #[test]
    fn test_direct_gradient() {
        let s = Structure::molecule(&NUMBERS, &POSITIONS);
        let pairs = PairList::build(&s, 60.0).unwrap();
        let damping = Damping::rational("r2scan").unwrap();
        let r = evaluate(&pairs, &coefficients(), None, &damping, 14.0, Switching::new(55.0, 60.0)).unwrap();

        let h = 1e-5;
        for atom in [0, 5] {
            for k in 0..3 {
                let mut plus = POSITIONS;
                let mut minus = POSITIONS;
                plus[atom][k] += h;
                minus[atom][k] -= h;
                let numeric = (energy(&plus) - energy(&minus)) / (2.0 * h);
                // The tabulated matrix is slightly asymmetric
                assert!((numeric - r.gradient[atom][k]).abs() < 1e-8);
            }
        }
    }

    #[test]
    fn test_zero_damping_requires_radii() {
        let s = Structure::molecule(&NUMBERS, &POSITIONS);
        let pairs = PairList::build(&s, 60.0).unwrap();
        let damping = Damping::zero("pbe").unwrap();
        let err = evaluate(&pairs, &coefficients(), None, &damping, 14.0, Switching::new(55.0, 60.0));
        assert!(matches!(err, Err(DispersionError::InvalidParameters(_))));

        let radii = DMatrix::from_element(9, 9, 5.5);
        let ok = evaluate(&pairs, &coefficients(), Some(&radii), &damping, 14.0, Switching::new(55.0, 60.0)).unwrap();
        assert!(ok.energy < 0.0);
    }
}
