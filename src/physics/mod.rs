// src/physics/mod.rs
pub mod c6;
pub mod contribution;
pub mod damping;
pub mod dispersion;
pub mod ncoord;
pub mod neighbors;
pub mod supercell;
pub mod three_body;
pub mod two_body;

pub use damping::{Damping, DampingKind, Switching};
pub use dispersion::{dispersion_energy, DispersionModel, DispersionResult};
pub use neighbors::{Pair, PairList};
