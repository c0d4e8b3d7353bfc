// src/physics/damping.rs

//! Short-range damping of the pairwise dispersion and the smooth long-range
//! switching function.

use crate::error::{DispersionError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

// --- Parameter sets ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DampingKind {
    /// Becke–Johnson rational damping, D3(BJ)
    Rational,
    /// Chai–Head-Gordon zero damping, D3(0)
    Zero,
}

impl fmt::Display for DampingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DampingKind::Rational => write!(f, "rational"),
            DampingKind::Zero => write!(f, "zero"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Damping {
    Rational { s6: f64, s8: f64, a1: f64, a2: f64 },
    Zero { s6: f64, s8: f64, rs6: f64, rs8: f64 },
}

// D3(BJ): (method, s6, s8, a1, a2)
const RATIONAL_PRESETS: &[(&str, f64, f64, f64, f64)] = &[
    ("pbe", 1.0, 0.7875, 0.4289, 4.4407),
    ("pbe0", 1.0, 1.2177, 0.4145, 4.8593),
    ("b3lyp", 1.0, 1.9889, 0.3981, 4.4211),
    ("blyp", 1.0, 2.6996, 0.4298, 4.2359),
    ("tpss", 1.0, 1.9435, 0.4535, 4.4752),
    ("revpbe", 1.0, 2.3550, 0.5238, 3.5016),
    ("b97d", 1.0, 2.2609, 0.5545, 3.2297),
    ("hf", 1.0, 0.9171, 0.3385, 2.8830),
    ("r2scan", 1.0, 0.78981345, 0.49484001, 5.73083694),
    ("b2plyp", 0.64, 0.9147, 0.3065, 5.0570),
];

// D3(0): (method, s6, s8, rs6), rs8 = 1
const ZERO_PRESETS: &[(&str, f64, f64, f64)] = &[
    ("pbe", 1.0, 0.722, 1.217),
    ("pbe0", 1.0, 0.928, 1.287),
    ("b3lyp", 1.0, 1.703, 1.261),
    ("blyp", 1.0, 1.682, 1.094),
    ("tpss", 1.0, 1.105, 1.166),
    ("revpbe", 1.0, 1.010, 0.923),
    ("b97d", 1.0, 0.909, 0.892),
];

fn normalize(method: &str) -> String {
    method
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | ' ' | '(' | ')'))
        .collect()
}

fn unknown(method: &str, kind: DampingKind) -> DispersionError {
    DispersionError::InvalidParameters(format!(
        "no {} damping parameters for method '{}'",
        kind, method
    ))
}

impl Damping {
    /// Published D3(BJ) parameters of a density functional.
    pub fn rational(method: &str) -> Result<Self> {
        let key = normalize(method);
        RATIONAL_PRESETS
            .iter()
            .find(|p| p.0 == key)
            .map(|&(_, s6, s8, a1, a2)| Damping::Rational { s6, s8, a1, a2 })
            .ok_or_else(|| unknown(method, DampingKind::Rational))
    }

    /// Published D3(0) parameters of a density functional.
    pub fn zero(method: &str) -> Result<Self> {
        let key = normalize(method);
        ZERO_PRESETS
            .iter()
            .find(|p| p.0 == key)
            .map(|&(_, s6, s8, rs6)| Damping::Zero {
                s6,
                s8,
                rs6,
                rs8: 1.0,
            })
            .ok_or_else(|| unknown(method, DampingKind::Zero))
    }

    pub fn preset(kind: DampingKind, method: &str) -> Result<Self> {
        match kind {
            DampingKind::Rational => Self::rational(method),
            DampingKind::Zero => Self::zero(method),
        }
    }

    /// Methods with a preset of the given kind.
    pub fn methods(kind: DampingKind) -> Vec<&'static str> {
        match kind {
            DampingKind::Rational => RATIONAL_PRESETS.iter().map(|p| p.0).collect(),
            DampingKind::Zero => ZERO_PRESETS.iter().map(|p| p.0).collect(),
        }
    }

    pub fn kind(&self) -> DampingKind {
        match self {
            Damping::Rational { .. } => DampingKind::Rational,
            Damping::Zero { .. } => DampingKind::Zero,
        }
    }

    /// Zero damping needs tabulated van der Waals radii for every pair.
    pub fn needs_vdw_radii(&self) -> bool {
        self.kind() == DampingKind::Zero
    }

    pub fn validate(&self) -> Result<()> {
        let values: [(&str, f64); 4] = match *self {
            Damping::Rational { s6, s8, a1, a2 } => [("s6", s6), ("s8", s8), ("a1", a1), ("a2", a2)],
            Damping::Zero { s6, s8, rs6, rs8 } => [("s6", s6), ("s8", s8), ("rs6", rs6), ("rs8", rs8)],
        };
        for (name, value) in values {
            if !value.is_finite() {
                return Err(DispersionError::InvalidParameters(format!(
                    "damping parameter {} is not finite ({})",
                    name, value
                )));
            }
        }
        if let Damping::Zero { rs6, rs8, .. } = *self {
            if rs6 <= 0.0 || rs8 <= 0.0 {
                return Err(DispersionError::InvalidParameters(format!(
                    "zero damping radii scalings must be positive (rs6 = {}, rs8 = {})",
                    rs6, rs8
                )));
            }
        }
        Ok(())
    }

    /// Damped pair energy per unit C6 and its distance derivative.
    ///
    /// `qq` is the C8/C6 ratio of the pair, `r0` the tabulated van der Waals
    /// radius (zero damping only) and `alp` the zero-damping exponent.
    #[inline]
    pub fn pair(&self, distance: f64, qq: f64, r0: f64, alp: f64) -> (f64, f64) {
        let d = distance;
        match *self {
            Damping::Rational { s6, s8, a1, a2 } => {
                let rr = a1 * qq.sqrt() + a2;
                let d2 = d * d;
                let d6 = d2 * d2 * d2;
                let d8 = d6 * d2;
                let rr2 = rr * rr;
                let rr6 = rr2 * rr2 * rr2;
                let t6 = 1.0 / (d6 + rr6);
                let t8 = 1.0 / (d8 + rr6 * rr2);

                let e = -(s6 * t6 + s8 * qq * t8);
                let de = 6.0 * s6 * d6 / d * t6 * t6 + 8.0 * s8 * qq * d8 / d * t8 * t8;
                (e, de)
            }
            Damping::Zero { s6, s8, rs6, rs8 } => {
                let (f6, df6) = zero_damping(d, rs6 * r0, alp);
                let (f8, df8) = zero_damping(d, rs8 * r0, alp + 2.0);
                let d6 = d.powi(6);
                let d8 = d6 * d * d;

                let e = -(s6 * f6 / d6 + s8 * qq * f8 / d8);
                let de = -(s6 * (df6 / d6 - 6.0 * f6 / (d6 * d))
                    + s8 * qq * (df8 / d8 - 8.0 * f8 / (d8 * d)));
                (e, de)
            }
        }
    }

    /// Cutoff radius of a pair entering the three-body damping.
    #[inline]
    pub fn atm_radius(&self, qq: f64, r0: f64) -> f64 {
        match *self {
            Damping::Rational { a1, a2, .. } => a1 * qq.sqrt() + a2,
            Damping::Zero { .. } => 4.0 / 3.0 * r0,
        }
    }
}

/// f = 1 / (1 + 6 (r0 / d)^alpha) and df/dd.
#[inline]
fn zero_damping(d: f64, r0: f64, alpha: f64) -> (f64, f64) {
    let x = (r0 / d).powf(alpha);
    let f = 1.0 / (1.0 + 6.0 * x);
    (f, 6.0 * alpha * x * f * f / d)
}

// --- Switching ---

/// Multiplicative switching: 1 below `onset`, 0 beyond `cutoff`, C2-smooth
/// in between. With `onset >= cutoff` it is a hard cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Switching {
    pub onset: f64,
    pub cutoff: f64,
}

impl Switching {
    pub fn new(onset: f64, cutoff: f64) -> Self {
        Self { onset, cutoff }
    }

    /// Value and distance derivative of the switching function.
    #[inline]
    pub fn eval(&self, distance: f64) -> (f64, f64) {
        if distance >= self.cutoff {
            return (0.0, 0.0);
        }
        if distance < self.onset || self.onset >= self.cutoff {
            return (1.0, 0.0);
        }
        let r2 = distance * distance;
        let rc2 = self.cutoff * self.cutoff;
        let ro2 = self.onset * self.onset;
        let denom = (rc2 - ro2).powi(3);

        let sw = (rc2 - r2).powi(2) * (rc2 + 2.0 * r2 - 3.0 * ro2) / denom;
        let dsw = 6.0 * (rc2 - r2) * (ro2 - r2) / denom * 2.0 * distance;
        (sw, dsw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn fd<F: Fn(f64) -> f64>(f: F, x: f64) -> f64 {
        let h = 1e-5;
        (f(x + h) - f(x - h)) / (2.0 * h)
    }

    #[test]
    fn test_presets() {
        assert_eq!(
            Damping::rational("PBE").unwrap(),
            Damping::Rational { s6: 1.0, s8: 0.7875, a1: 0.4289, a2: 4.4407 }
        );
        assert_eq!(Damping::rational("r2SCAN").unwrap(), Damping::rational("r2scan").unwrap());
        assert!(matches!(Damping::rational("B2-PLYP").unwrap(), Damping::Rational { s6, .. } if s6 == 0.64));
        assert!(matches!(Damping::zero("b3-lyp").unwrap(), Damping::Zero { rs8, .. } if rs8 == 1.0));
        assert!(matches!(
            Damping::zero("r2scan"),
            Err(DispersionError::InvalidParameters(_))
        ));
        assert!(Damping::methods(DampingKind::Rational).contains(&"hf"));
    }

    #[test]
    fn test_validate() {
        assert!(Damping::rational("pbe").unwrap().validate().is_ok());
        let bad = Damping::Rational { s6: 1.0, s8: f64::NAN, a1: 0.4, a2: 4.0 };
        assert!(bad.validate().is_err());
        let bad = Damping::Zero { s6: 1.0, s8: 1.0, rs6: 0.0, rs8: 1.0 };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_serde_tagged() {
        let json = r#"{"kind": "zero", "s6": 1.0, "s8": 0.722, "rs6": 1.217, "rs8": 1.0}"#;
        let d: Damping = serde_json::from_str(json).unwrap();
        assert_eq!(d, Damping::zero("pbe").unwrap());
        let back = serde_json::to_string(&Damping::rational("pbe").unwrap()).unwrap();
        assert!(back.contains("\"kind\":\"rational\""));
    }

    #[test]
    fn test_rational_limits() {
        let d = Damping::rational("pbe").unwrap();
        let qq = 30.0;
        // Finite at contact
        let (e0, _) = d.pair(1e-8, qq, 0.0, 14.0);
        assert!(e0.is_finite() && e0 < 0.0);
        // Undamped tail at long range
        let r: f64 = 200.0;
        let (e, _) = d.pair(r, qq, 0.0, 14.0);
        assert_relative_eq!(e, -(1.0 / r.powi(6) + 0.7875 * qq / r.powi(8)), max_relative = 1e-6);
    }

    #[test]
    fn test_pair_derivatives() {
        let rational = Damping::rational("b3lyp").unwrap();
        let zero = Damping::zero("b3lyp").unwrap();
        for damping in [rational, zero] {
            for r in [2.0, 4.5, 7.0, 12.0] {
                let analytic = damping.pair(r, 25.0, 5.5, 14.0).1;
                let numeric = fd(|x| damping.pair(x, 25.0, 5.5, 14.0).0, r);
                assert_relative_eq!(analytic, numeric, max_relative = 1e-6, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_zero_damping_vanishes_at_contact() {
        let d = Damping::zero("pbe").unwrap();
        let (e, _) = d.pair(0.5, 25.0, 5.5, 14.0);
        assert!(e.abs() < 1e-6);
    }

    #[test]
    fn test_switching() {
        let sw = Switching::new(55.0, 60.0);
        assert_eq!(sw.eval(10.0), (1.0, 0.0));
        assert_eq!(sw.eval(60.0), (0.0, 0.0));
        assert_relative_eq!(sw.eval(55.0).0, 1.0, epsilon = 1e-14);
        let mid = sw.eval(57.5).0;
        assert!(mid > 0.0 && mid < 1.0);
        for r in [55.5, 57.0, 59.5] {
            assert_relative_eq!(sw.eval(r).1, fd(|x| sw.eval(x).0, r), max_relative = 1e-6);
        }

        let hard = Switching::new(60.0, 60.0);
        assert_eq!(hard.eval(59.9), (1.0, 0.0));
        assert_eq!(hard.eval(60.1), (0.0, 0.0));
    }

    #[test]
    fn test_atm_radius() {
        let d = Damping::rational("pbe").unwrap();
        assert_relative_eq!(d.atm_radius(16.0, 0.0), 0.4289 * 4.0 + 4.4407);
        let z = Damping::zero("pbe").unwrap();
        assert_relative_eq!(z.atm_radius(16.0, 3.0), 4.0);
    }
}
