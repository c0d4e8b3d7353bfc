// src/physics/neighbors.rs

//! Pair geometry for the dispersion kernels.
//!
//! The kernels only ever see a [`PairList`]: a *full* list in which every
//! interacting pair appears in both directions, (i, j, T) and (j, i, −T),
//! grouped by the first atom. [`PairList::build`] enumerates lattice images
//! for periodic structures; [`PairList::from_pairs`] accepts pairs produced by
//! any other neighbor machinery.

use crate::constants::COINCIDENCE_TOLERANCE;
use crate::error::{DispersionError, Result};
use crate::model::structure::Structure;
use crate::utils::linalg::{cart_to_frac, lattice_matrix, plane_spacings, translation};
use nalgebra::Vector3;
use rayon::prelude::*;

/// Upper bound on the lattice translations searched for one pair list
pub const MAX_LATTICE_IMAGES: f64 = 2.0e6;

#[derive(Clone, Debug, PartialEq)]
pub struct Pair {
    pub i: usize,
    pub j: usize,
    /// Lattice translation applied to atom j, in cell units
    pub image: [i32; 3],
    /// r_j + T − r_i (Bohr)
    pub vector: Vector3<f64>,
    pub distance: f64,
}

impl Pair {
    pub fn new(i: usize, j: usize, image: [i32; 3], vector: Vector3<f64>) -> Self {
        Self {
            i,
            j,
            image,
            distance: vector.norm(),
            vector,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PairList {
    natoms: usize,
    cutoff: f64,
    pairs: Vec<Pair>,
    // pairs[offsets[i]..offsets[i + 1]] are the neighbors of atom i
    offsets: Vec<usize>,
}

fn check_cutoff(cutoff: f64) -> Result<()> {
    if !(cutoff.is_finite() && cutoff > 0.0) {
        return Err(DispersionError::InvalidGeometry(format!(
            "cutoff must be positive and finite, got {}",
            cutoff
        )));
    }
    Ok(())
}

fn degenerate(pair: &Pair) -> DispersionError {
    DispersionError::NumericalDegeneracy {
        first: pair.i,
        second: pair.j,
        image: pair.image,
        distance: pair.distance,
    }
}

impl PairList {
    /// Enumerates all pairs within `cutoff` (Bohr), including periodic images.
    ///
    /// The structure is assumed validated. Fails with
    /// [`DispersionError::NumericalDegeneracy`] if two distinct sites coincide.
    pub fn build(structure: &Structure, cutoff: f64) -> Result<Self> {
        check_cutoff(cutoff)?;
        let positions = structure.positions();
        let natoms = positions.len();

        let per_atom: Vec<Result<Vec<Pair>>> = match &structure.lattice {
            None => (0..natoms)
                .into_par_iter()
                .map(|i| {
                    let mut local = Vec::new();
                    for j in 0..natoms {
                        if i == j {
                            continue;
                        }
                        let pair = Pair::new(i, j, [0, 0, 0], positions[j] - positions[i]);
                        if pair.distance < COINCIDENCE_TOLERANCE {
                            return Err(degenerate(&pair));
                        }
                        if pair.distance <= cutoff {
                            local.push(pair);
                        }
                    }
                    Ok(local)
                })
                .collect(),
            Some(lattice) => {
                let basis = lattice_matrix(lattice);
                // Displacements are first folded into the home cell, so one
                // extra shell covers the remaining fractional offset.
                let spacings = plane_spacings(lattice);
                let shells: Vec<f64> = spacings.iter().map(|s| (cutoff / s).ceil() + 1.0).collect();
                let count: f64 = shells.iter().map(|n| 2.0 * n + 1.0).product();
                if !(count.is_finite() && count <= MAX_LATTICE_IMAGES) {
                    return Err(DispersionError::InvalidGeometry(format!(
                        "cell too thin for a {} bohr cutoff: plane spacings {:.3e}, {:.3e}, {:.3e} bohr",
                        cutoff, spacings[0], spacings[1], spacings[2]
                    )));
                }
                let reps: Vec<i32> = shells.iter().map(|&n| n as i32).collect();

                let mut images = Vec::new();
                for n1 in -reps[0]..=reps[0] {
                    for n2 in -reps[1]..=reps[1] {
                        for n3 in -reps[2]..=reps[2] {
                            images.push(([n1, n2, n3], translation(&basis, [n1, n2, n3])));
                        }
                    }
                }
                log::trace!("periodic pair search over {} lattice images", images.len());

                (0..natoms)
                    .into_par_iter()
                    .map(|i| {
                        let mut local = Vec::new();
                        for j in 0..natoms {
                            let direct = positions[j] - positions[i];
                            let frac = cart_to_frac(&direct, &basis).ok_or_else(|| {
                                DispersionError::InvalidGeometry("lattice is singular".into())
                            })?;
                            let fold = [
                                frac.x.round() as i32,
                                frac.y.round() as i32,
                                frac.z.round() as i32,
                            ];
                            let folded = direct - translation(&basis, fold);

                            for (n, shift) in &images {
                                let image = [n[0] - fold[0], n[1] - fold[1], n[2] - fold[2]];
                                if i == j && image == [0, 0, 0] {
                                    continue;
                                }
                                let pair = Pair::new(i, j, image, folded + shift);
                                if pair.distance < COINCIDENCE_TOLERANCE {
                                    return Err(degenerate(&pair));
                                }
                                if pair.distance <= cutoff {
                                    local.push(pair);
                                }
                            }
                        }
                        Ok(local)
                    })
                    .collect()
            }
        };

        let mut pairs = Vec::new();
        let mut offsets = Vec::with_capacity(natoms + 1);
        offsets.push(0);
        for local in per_atom {
            pairs.extend(local?);
            offsets.push(pairs.len());
        }

        log::debug!(
            "pair list: {} atoms, {} pairs within {:.2} bohr",
            natoms,
            pairs.len(),
            cutoff
        );
        Ok(Self {
            natoms,
            cutoff,
            pairs,
            offsets,
        })
    }

    /// Wraps pairs produced by an external neighbor search.
    ///
    /// The list must be full (both directions of every pair). Pairs beyond
    /// `cutoff` are dropped, pairs are regrouped by their first atom and
    /// coinciding sites are rejected.
    pub fn from_pairs(natoms: usize, cutoff: f64, pairs: Vec<Pair>) -> Result<Self> {
        check_cutoff(cutoff)?;
        let mut kept = Vec::with_capacity(pairs.len());
        for mut pair in pairs {
            if pair.i >= natoms || pair.j >= natoms {
                return Err(DispersionError::InvalidGeometry(format!(
                    "pair ({}, {}) refers to an atom outside 0..{}",
                    pair.i, pair.j, natoms
                )));
            }
            if pair.vector.iter().any(|x| !x.is_finite()) {
                return Err(DispersionError::InvalidGeometry(format!(
                    "pair ({}, {}) has a non-finite displacement",
                    pair.i, pair.j
                )));
            }
            pair.distance = pair.vector.norm();
            if pair.distance < COINCIDENCE_TOLERANCE {
                return Err(degenerate(&pair));
            }
            if pair.distance <= cutoff {
                kept.push(pair);
            }
        }
        kept.sort_by_key(|p| p.i);

        let mut offsets = vec![0; natoms + 1];
        for pair in &kept {
            offsets[pair.i + 1] += 1;
        }
        for i in 0..natoms {
            offsets[i + 1] += offsets[i];
        }

        Ok(Self {
            natoms,
            cutoff,
            pairs: kept,
            offsets,
        })
    }

    pub fn natoms(&self) -> usize {
        self.natoms
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[Pair] {
        &self.pairs
    }

    /// Index range of atom i's neighbors in [`PairList::pairs`].
    pub fn range(&self, i: usize) -> std::ops::Range<usize> {
        self.offsets[i]..self.offsets[i + 1]
    }

    pub fn neighbors(&self, i: usize) -> &[Pair] {
        &self.pairs[self.range(i)]
    }
}
