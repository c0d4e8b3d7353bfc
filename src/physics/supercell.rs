// src/physics/supercell.rs

use crate::error::{DispersionError, Result};
use crate::model::structure::{Atom, Structure};

/// Replicates a periodic cell nx × ny × nz times along its lattice vectors.
pub fn generate(structure: &Structure, nx: u32, ny: u32, nz: u32) -> Result<Structure> {
    let lattice = structure.lattice.ok_or_else(|| {
        DispersionError::InvalidGeometry("supercell of a non-periodic structure".into())
    })?;
    if nx == 0 || ny == 0 || nz == 0 {
        return Err(DispersionError::InvalidGeometry(format!(
            "supercell repetitions must be positive, got {}x{}x{}",
            nx, ny, nz
        )));
    }

    let [vec_a, vec_b, vec_c] = lattice;
    let mut new_atoms = Vec::with_capacity(structure.len() * (nx * ny * nz) as usize);

    for x in 0..nx {
        for y in 0..ny {
            for z in 0..nz {
                let translation = [
                    vec_a[0] * x as f64 + vec_b[0] * y as f64 + vec_c[0] * z as f64,
                    vec_a[1] * x as f64 + vec_b[1] * y as f64 + vec_c[1] * z as f64,
                    vec_a[2] * x as f64 + vec_b[2] * y as f64 + vec_c[2] * z as f64,
                ];

                for atom in &structure.atoms {
                    new_atoms.push(Atom::new(
                        atom.number,
                        [
                            atom.position[0] + translation[0],
                            atom.position[1] + translation[1],
                            atom.position[2] + translation[2],
                        ],
                    ));
                }
            }
        }
    }

    let new_lattice = [
        [vec_a[0] * nx as f64, vec_a[1] * nx as f64, vec_a[2] * nx as f64],
        [vec_b[0] * ny as f64, vec_b[1] * ny as f64, vec_b[2] * ny as f64],
        [vec_c[0] * nz as f64, vec_c[1] * nz as f64, vec_c[2] * nz as f64],
    ];

    log::debug!(
        "{}x{}x{} supercell with {} atoms",
        nx,
        ny,
        nz,
        new_atoms.len()
    );
    Ok(Structure {
        lattice: Some(new_lattice),
        atoms: new_atoms,
    })
}
