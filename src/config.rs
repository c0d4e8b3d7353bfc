// src/config.rs

use crate::error::{DispersionError, Result};
use crate::physics::damping::DampingKind;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

// --- Cutoffs ---

/// Interaction cutoffs in Bohr.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cutoffs {
  /// Coordination number counting
  pub cn: f64,
  /// Two-body sum; the switching function reaches zero here
  pub two_body: f64,
  /// Start of the two-body switching region
  pub two_body_onset: f64,
  /// Every side of a three-body triangle
  pub three_body: f64,
}

impl Default for Cutoffs {
  fn default() -> Self {
    Self {
      cn: 40.0,
      two_body: 60.0,
      two_body_onset: 55.0,
      three_body: 40.0,
    }
  }
}

// --- DispersionConfig ---

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispersionConfig {
  pub cutoffs: Cutoffs,
  /// Include the Axilrod–Teller–Muto term
  pub three_body: bool,
  /// Three-body scaling
  pub s9: f64,
  /// Exponent of the zero-damping and three-body damping functions
  pub alp: f64,
}

impl Default for DispersionConfig {
  fn default() -> Self {
    Self {
      cutoffs: Cutoffs::default(),
      three_body: false,
      s9: 1.0,
      alp: 14.0,
    }
  }
}

fn positive(value: f64, what: &str) -> Result<()> {
  if value.is_finite() && value > 0.0 {
    Ok(())
  } else {
    Err(DispersionError::InvalidGeometry(format!(
      "{} must be positive and finite, got {}",
      what, value
    )))
  }
}

impl DispersionConfig {
  pub fn with_three_body(mut self, enabled: bool) -> Self {
    self.three_body = enabled;
    self
  }

  /// True when the three-body term is requested and not scaled away.
  pub fn atm_enabled(&self) -> bool {
    self.three_body && self.s9 != 0.0
  }

  /// Cutoff of the pair list that serves every enabled term.
  pub fn pair_cutoff(&self) -> f64 {
    let c = &self.cutoffs;
    let mut cutoff = c.cn.max(c.two_body);
    if self.atm_enabled() {
      cutoff = cutoff.max(c.three_body);
    }
    cutoff
  }

  pub fn validate(&self) -> Result<()> {
    let c = &self.cutoffs;
    positive(c.cn, "coordination number cutoff")?;
    positive(c.two_body, "two-body cutoff")?;
    positive(c.three_body, "three-body cutoff")?;
    if !(c.two_body_onset.is_finite() && c.two_body_onset >= 0.0) {
      return Err(DispersionError::InvalidGeometry(format!(
        "switching onset must be non-negative and finite, got {}",
        c.two_body_onset
      )));
    }
    if !self.s9.is_finite() {
      return Err(DispersionError::InvalidParameters(format!(
        "s9 must be finite, got {}",
        self.s9
      )));
    }
    if !(self.alp.is_finite() && self.alp > 0.0) {
      return Err(DispersionError::InvalidParameters(format!(
        "alp must be positive and finite, got {}",
        self.alp
      )));
    }
    Ok(())
  }
}

// --- Main Config Struct ---

/// User settings of the `d3disp` command line tool.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
  /// Density functional used when a job names no damping
  pub method: String,
  pub damping: DampingKind,

  #[serde(default)]
  pub dispersion: DispersionConfig,

  /// Reference table loaded when none is given on the command line
  #[serde(default)]
  pub reference: Option<PathBuf>,

  #[serde(default = "default_log_level")]
  pub log_level: String,
}

fn default_log_level() -> String {
  "info".to_string()
}

impl Default for Config {
  fn default() -> Self {
    Self {
      method: "pbe".to_string(),
      damping: DampingKind::Rational,
      dispersion: DispersionConfig::default(),
      reference: None,
      log_level: default_log_level(),
    }
  }
}

impl Config {
  /// Loads config from standard OS location (e.g., ~/.config/d3disp/settings.json)
  pub fn load() -> (Self, String) {
    Self::load_from(&Self::get_path())
  }

  /// Loads config from `path`, falling back to defaults. The returned
  /// string describes what happened.
  pub fn load_from(path: &Path) -> (Self, String) {
    if !path.exists() {
      return (
        Self::default(),
        "No config found. Using defaults.".to_string(),
      );
    }
    match File::open(path) {
      Ok(file) => match serde_json::from_reader(BufReader::new(file)) {
        Ok(cfg) => (cfg, format!("Config loaded from {:?}", path)),
        Err(e) => (Self::default(), format!("Error parsing config {:?}: {}", path, e)),
      },
      Err(e) => (Self::default(), format!("Error opening config {:?}: {}", path, e)),
    }
  }

  /// Saves config to standard OS location
  pub fn save(&self) -> String {
    self.save_to(&Self::get_path())
  }

  pub fn save_to(&self, path: &Path) -> String {
    if let Some(parent) = path.parent() {
      if let Err(e) = fs::create_dir_all(parent) {
        return format!("Could not create config directory {:?}: {}", parent, e);
      }
    }

    match File::create(path) {
      Ok(file) => match serde_json::to_writer_pretty(BufWriter::new(file), self) {
        Ok(_) => format!("Config saved to {:?}", path),
        Err(e) => format!("Failed to save config: {}", e),
      },
      Err(e) => format!("Could not create config file {:?}: {}", path, e),
    }
  }

  fn get_path() -> PathBuf {
    if let Some(proj) = ProjectDirs::from("org", "d3disp", "d3disp") {
      proj.config_dir().join("settings.json")
    } else {
      PathBuf::from("settings.json")
    }
  }
}
