// src/model/structure.rs

use crate::error::{DispersionError, Result};
use crate::utils::linalg::{determinant, Lattice};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Smallest accepted |det| of a lattice matrix (Bohr³).
const MIN_CELL_VOLUME: f64 = 1.0e-8;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    /// Atomic number
    pub number: u8,
    /// Cartesian position in Bohr
    pub position: [f64; 3],
}

impl Atom {
    pub fn new(number: u8, position: [f64; 3]) -> Self {
        Self { number, position }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    // Lattice vectors: [a_vec, b_vec, c_vec], None for an isolated system
    #[serde(default)]
    pub lattice: Option<Lattice>,
    pub atoms: Vec<Atom>,
}

impl Structure {
    /// Isolated (non-periodic) structure.
    pub fn molecule(numbers: &[u8], positions: &[[f64; 3]]) -> Self {
        Self {
            lattice: None,
            atoms: numbers
                .iter()
                .zip(positions)
                .map(|(&z, &p)| Atom::new(z, p))
                .collect(),
        }
    }

    /// Structure periodic in all three lattice directions.
    pub fn periodic(numbers: &[u8], positions: &[[f64; 3]], lattice: Lattice) -> Self {
        Self {
            lattice: Some(lattice),
            ..Self::molecule(numbers, positions)
        }
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn is_periodic(&self) -> bool {
        self.lattice.is_some()
    }

    pub fn numbers(&self) -> Vec<u8> {
        self.atoms.iter().map(|a| a.number).collect()
    }

    pub fn positions(&self) -> Vec<Vector3<f64>> {
        self.atoms.iter().map(|a| Vector3::from(a.position)).collect()
    }

    /// Checks the invariants every calculation relies on: at least one atom,
    /// finite positions and, for periodic systems, a finite non-degenerate
    /// lattice.
    pub fn validate(&self) -> Result<()> {
        if self.atoms.is_empty() {
            return Err(DispersionError::InvalidGeometry(
                "structure contains no atoms".into(),
            ));
        }

        for (i, atom) in self.atoms.iter().enumerate() {
            if atom.position.iter().any(|x| !x.is_finite()) {
                return Err(DispersionError::InvalidGeometry(format!(
                    "atom {} has a non-finite position {:?}",
                    i, atom.position
                )));
            }
        }

        if let Some(lattice) = &self.lattice {
            if lattice.iter().flatten().any(|x| !x.is_finite()) {
                return Err(DispersionError::InvalidGeometry(
                    "lattice contains non-finite entries".into(),
                ));
            }
            let volume = determinant(lattice);
            if volume.abs() < MIN_CELL_VOLUME {
                return Err(DispersionError::InvalidGeometry(format!(
                    "lattice is degenerate (det = {:e})",
                    volume
                )));
            }
        }

        Ok(())
    }
}
