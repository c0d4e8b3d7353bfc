// src/error.rs

//! Typed errors for dispersion calculations.
//!
//! Every failure is reported before any summation starts, so a returned
//! error never comes with a partial energy.

use std::path::PathBuf;
use thiserror::Error;

/// Errors arising from input validation, reference data or file loading.
#[derive(Debug, Error)]
pub enum DispersionError {
    /// An atom's element (or an element pair it takes part in) has no
    /// entry in the reference table.
    #[error("missing D3 parameterization for atom {index} (Z = {number}): {reason}")]
    MissingParameterization {
        index: usize,
        number: u8,
        reason: String,
    },

    /// Non-finite positions, degenerate lattice, bad cutoffs.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Two distinct sites sit on top of each other.
    #[error(
        "atoms {first} and {second} coincide (image {image:?}, distance {distance:e} bohr)"
    )]
    NumericalDegeneracy {
        first: usize,
        second: usize,
        image: [i32; 3],
        distance: f64,
    },

    #[error("invalid reference table: {0}")]
    InvalidReference(String),

    #[error("invalid damping parameters: {0}")]
    InvalidParameters(String),

    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DispersionError>;
