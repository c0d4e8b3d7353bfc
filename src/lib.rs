// src/lib.rs

//! DFT-D3 dispersion correction: coordination-number dependent C6/C8
//! coefficients, damped two-body and Axilrod–Teller–Muto three-body terms,
//! analytic gradients and the virial for periodic cells.
//!
//! Lengths are in Bohr and energies in Hartree throughout.
//!
//! ```
//! use d3disp::{dispersion_energy, Damping, DispersionConfig, ReferenceFile, Structure};
//!
//! let table = ReferenceFile::new()
//!     .element(18, &[0.0])
//!     .pair(18, 18, vec![vec![64.6483]])
//!     .build()
//!     .unwrap();
//! let dimer = Structure::molecule(&[18, 18], &[[0.0; 3], [0.0, 0.0, 7.0]]);
//! let damping = Damping::rational("pbe").unwrap();
//! let energy = dispersion_energy(&dimer, &table, &damping, &DispersionConfig::default()).unwrap();
//! assert!(energy < 0.0);
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod io;
pub mod model;
pub mod physics;
pub mod reference;
pub mod utils;

pub use config::{Cutoffs, DispersionConfig};
pub use error::{DispersionError, Result};
pub use model::{Atom, Structure};
pub use physics::{
    dispersion_energy, Damping, DampingKind, DispersionModel, DispersionResult, Pair, PairList,
};
pub use reference::{ReferenceFile, ReferenceTable};
