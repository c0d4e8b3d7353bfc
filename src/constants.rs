// src/constants.rs

//! Fundamental constants and unit conversions.
//!
//! All internal quantities are atomic units: lengths in Bohr, energies in
//! Hartree.

/// Bohr radius in Angstrom (CODATA 2018).
pub const BOHR_TO_ANGSTROM: f64 = 0.529177210903;

pub const ANGSTROM_TO_BOHR: f64 = 1.0 / BOHR_TO_ANGSTROM;

/// Hartree in electron volts (CODATA 2018).
pub const HARTREE_TO_EV: f64 = 27.211386245988;

/// Hartree in kcal/mol.
pub const HARTREE_TO_KCAL_PER_MOL: f64 = 627.509474063;

/// Distances below this (Bohr) are treated as coinciding sites.
pub const COINCIDENCE_TOLERANCE: f64 = 1.0e-10;
