// src/io/job.rs

//! JSON job description read by the `d3disp` command line tool.
//!
//! ```json
//! {
//!   "symbols": ["Ar", "Ar"],
//!   "positions": [[0.0, 0.0, 0.0], [0.0, 0.0, 4.0]],
//!   "unit": "angstrom",
//!   "method": "pbe",
//!   "three_body": false
//! }
//! ```

use crate::config::Config;
use crate::constants::ANGSTROM_TO_BOHR;
use crate::error::{DispersionError, Result};
use crate::model::{atomic_number, Structure};
use crate::physics::damping::Damping;
use crate::utils::linalg::Lattice;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    #[default]
    Angstrom,
    Bohr,
}

impl LengthUnit {
    pub fn to_bohr(&self) -> f64 {
        match self {
            LengthUnit::Angstrom => ANGSTROM_TO_BOHR,
            LengthUnit::Bohr => 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Atomic numbers; alternatively `symbols`
    #[serde(default)]
    pub numbers: Option<Vec<u8>>,
    #[serde(default)]
    pub symbols: Option<Vec<String>>,
    pub positions: Vec<[f64; 3]>,
    #[serde(default)]
    pub lattice: Option<Lattice>,
    #[serde(default)]
    pub unit: LengthUnit,

    /// Functional whose preset parameters are used
    #[serde(default)]
    pub method: Option<String>,
    /// Explicit parameters, overriding `method`
    #[serde(default)]
    pub damping: Option<Damping>,
    #[serde(default)]
    pub three_body: Option<bool>,
}

fn invalid(msg: String) -> DispersionError {
    DispersionError::InvalidGeometry(msg)
}

impl Job {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| DispersionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Atomic numbers from either `numbers` or `symbols`.
    pub fn atomic_numbers(&self) -> Result<Vec<u8>> {
        match (&self.numbers, &self.symbols) {
            (Some(numbers), None) => Ok(numbers.clone()),
            (None, Some(symbols)) => symbols
                .iter()
                .map(|s| atomic_number(s).ok_or_else(|| invalid(format!("unknown element symbol '{}'", s))))
                .collect(),
            (Some(_), Some(_)) => Err(invalid("give either numbers or symbols, not both".into())),
            (None, None) => Err(invalid("job lists neither numbers nor symbols".into())),
        }
    }

    /// Structure in Bohr.
    pub fn structure(&self) -> Result<Structure> {
        let numbers = self.atomic_numbers()?;
        if numbers.len() != self.positions.len() {
            return Err(invalid(format!(
                "{} atoms but {} positions",
                numbers.len(),
                self.positions.len()
            )));
        }

        let scale = self.unit.to_bohr();
        let positions: Vec<[f64; 3]> = self
            .positions
            .iter()
            .map(|p| [p[0] * scale, p[1] * scale, p[2] * scale])
            .collect();
        let structure = match self.lattice {
            Some(lattice) => Structure::periodic(&numbers, &positions, lattice.map(|row| row.map(|x| x * scale))),
            None => Structure::molecule(&numbers, &positions),
        };
        Ok(structure)
    }

    /// Damping parameters: explicit ones first, then the job's method, then
    /// the method and damping kind of the user settings.
    pub fn damping(&self, settings: &Config) -> Result<Damping> {
        if let Some(damping) = self.damping {
            return Ok(damping);
        }
        let method = self.method.as_deref().unwrap_or(&settings.method);
        Damping::preset(settings.damping, method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::damping::DampingKind;

    #[test]
    fn test_symbols_in_angstrom() {
        let job = Job::from_json_str(
            r#"{"symbols": ["O", "h", "H"], "positions": [[0, 0, 0], [1, 0, 0], [0, 1, 0]]}"#,
        )
        .unwrap();
        let s = job.structure().unwrap();
        assert_eq!(s.numbers(), vec![8, 1, 1]);
        assert!((s.atoms[1].position[0] - ANGSTROM_TO_BOHR).abs() < 1e-12);
        assert!(!s.is_periodic());
    }

    #[test]
    fn test_periodic_in_bohr() {
        let job = Job::from_json_str(
            r#"{"numbers": [18], "positions": [[0, 0, 0]], "unit": "bohr",
                "lattice": [[7, 0, 0], [0, 7, 0], [0, 0, 7]]}"#,
        )
        .unwrap();
        let s = job.structure().unwrap();
        assert_eq!(s.lattice, Some([[7.0, 0.0, 0.0], [0.0, 7.0, 0.0], [0.0, 0.0, 7.0]]));
    }

    #[test]
    fn test_rejects_bad_atoms() {
        let both = r#"{"numbers": [1], "symbols": ["H"], "positions": [[0, 0, 0]]}"#;
        assert!(Job::from_json_str(both).unwrap().structure().is_err());
        let unknown = r#"{"symbols": ["Xx"], "positions": [[0, 0, 0]]}"#;
        assert!(Job::from_json_str(unknown).unwrap().structure().is_err());
        let short = r#"{"numbers": [1, 1], "positions": [[0, 0, 0]]}"#;
        assert!(Job::from_json_str(short).unwrap().structure().is_err());
    }

    #[test]
    fn test_damping_resolution() {
        let mut settings = Config::default();
        let job = Job::from_json_str(r#"{"numbers": [18], "positions": [[0, 0, 0]]}"#).unwrap();
        assert_eq!(job.damping(&settings).unwrap(), Damping::rational("pbe").unwrap());

        settings.damping = DampingKind::Zero;
        let job = Job::from_json_str(r#"{"numbers": [18], "positions": [[0, 0, 0]], "method": "b3lyp"}"#).unwrap();
        assert_eq!(job.damping(&settings).unwrap(), Damping::zero("b3lyp").unwrap());

        let job = Job::from_json_str(
            r#"{"numbers": [18], "positions": [[0, 0, 0]], "method": "b3lyp",
                "damping": {"kind": "rational", "s6": 1.0, "s8": 1.0, "a1": 0.4, "a2": 5.0}}"#,
        )
        .unwrap();
        assert!(matches!(job.damping(&settings).unwrap(), Damping::Rational { a2, .. } if a2 == 5.0));
    }
}
