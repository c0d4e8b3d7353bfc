// src/physics/dispersion.rs

//! DFT-D3 dispersion energy of a structure.
//!
//! Pipeline: validation → pair list → coordination numbers → C6/C8
//! coefficients → two-body sum → optional three-body sum → CN chain rule.
//! Nothing is summed before every input has been checked.

use super::c6::C6Interpolator;
use super::damping::{Damping, Switching};
use super::neighbors::PairList;
use super::{ncoord, three_body, two_body};
use crate::config::DispersionConfig;
use crate::error::{DispersionError, Result};
use crate::model::structure::Structure;
use crate::reference::ReferenceTable;
use nalgebra::{DMatrix, Matrix3};
use serde::Serialize;

/// Energies in Hartree, gradients in Hartree/Bohr.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DispersionResult {
    pub energy: f64,
    pub two_body: f64,
    pub three_body: f64,
    /// Per-atom partition of `energy`
    pub energies: Vec<f64>,
    /// Coordination numbers
    pub cn: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gradient: Option<Vec<[f64; 3]>>,
    /// Strain derivative ∂E/∂ε, periodic structures only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sigma: Option<[[f64; 3]; 3]>,
}

/// A damping parameter set and configuration bound to a reference table.
#[derive(Clone, Debug)]
pub struct DispersionModel<'a> {
    table: &'a ReferenceTable,
    damping: Damping,
    config: DispersionConfig,
}

fn rows(m: &Matrix3<f64>) -> [[f64; 3]; 3] {
    std::array::from_fn(|a| std::array::from_fn(|b| m[(a, b)]))
}

impl<'a> DispersionModel<'a> {
    pub fn new(table: &'a ReferenceTable, damping: Damping, config: DispersionConfig) -> Self {
        Self {
            table,
            damping,
            config,
        }
    }

    pub fn damping(&self) -> &Damping {
        &self.damping
    }

    pub fn config(&self) -> &DispersionConfig {
        &self.config
    }

    /// Total dispersion energy in Hartree.
    pub fn energy(&self, structure: &Structure) -> Result<f64> {
        Ok(self.evaluate(structure, false)?.energy)
    }

    /// Energy, per-atom partition and, with `gradient`, the analytic
    /// derivatives.
    pub fn evaluate(&self, structure: &Structure, gradient: bool) -> Result<DispersionResult> {
        structure.validate()?;
        let numbers = structure.numbers();
        self.check(&numbers)?;
        let pairs = PairList::build(structure, self.config.pair_cutoff())?;
        self.compute(&numbers, &pairs, structure.is_periodic(), gradient)
    }

    /// Same as [`DispersionModel::evaluate`] on a pair list from an external
    /// neighbor search. `periodic` controls whether the virial is reported.
    pub fn evaluate_pairs(
        &self,
        numbers: &[u8],
        pairs: &PairList,
        periodic: bool,
        gradient: bool,
    ) -> Result<DispersionResult> {
        if numbers.len() != pairs.natoms() {
            return Err(DispersionError::InvalidGeometry(format!(
                "{} atomic numbers for a pair list over {} atoms",
                numbers.len(),
                pairs.natoms()
            )));
        }
        if numbers.is_empty() {
            return Err(DispersionError::InvalidGeometry("structure contains no atoms".into()));
        }
        self.check(numbers)?;
        if pairs.cutoff() < self.config.pair_cutoff() {
            log::warn!(
                "pair list cutoff {:.2} bohr is below the interaction cutoff {:.2} bohr",
                pairs.cutoff(),
                self.config.pair_cutoff()
            );
        }
        self.compute(numbers, pairs, periodic, gradient)
    }

    fn check(&self, numbers: &[u8]) -> Result<()> {
        self.config.validate()?;
        self.damping.validate()?;
        self.table.check_coverage(numbers, self.damping.needs_vdw_radii())
    }

    fn vdw_radii(&self, numbers: &[u8]) -> Result<DMatrix<f64>> {
        let n = numbers.len();
        let mut radii = DMatrix::zeros(n, n);
        for i in 0..n {
            for j in 0..n {
                radii[(i, j)] = self.table.vdw_radius(numbers[i], numbers[j]).ok_or_else(|| {
                    DispersionError::MissingParameterization {
                        index: i,
                        number: numbers[i],
                        reason: format!("no van der Waals radius for the pair with Z = {}", numbers[j]),
                    }
                })?;
            }
        }
        Ok(radii)
    }

    fn compute(
        &self,
        numbers: &[u8],
        pairs: &PairList,
        periodic: bool,
        gradient: bool,
    ) -> Result<DispersionResult> {
        let cfg = &self.config;
        let cutoffs = &cfg.cutoffs;

        let cn = ncoord::coordination_numbers(numbers, pairs, self.table, cutoffs.cn);
        let coefficients = C6Interpolator::new(self.table).matrix(numbers, &cn.cn)?;
        let radii = if self.damping.needs_vdw_radii() {
            Some(self.vdw_radii(numbers)?)
        } else {
            None
        };

        let switching = Switching::new(cutoffs.two_body_onset, cutoffs.two_body);
        let mut total = two_body::evaluate(
            pairs,
            &coefficients,
            radii.as_ref(),
            &self.damping,
            cfg.alp,
            switching,
        )?;
        let two_body = total.energy;

        let three_body = if cfg.atm_enabled() {
            let atm = three_body::evaluate(
                pairs,
                &coefficients,
                radii.as_ref(),
                &self.damping,
                cfg.s9,
                cfg.alp,
                cutoffs.three_body,
            )?;
            total.accumulate(&atm);
            atm.energy
        } else {
            0.0
        };

        log::debug!(
            "dispersion: {} atoms, E2 = {:.10}, E3 = {:.10}, E = {:.10} Eh",
            numbers.len(),
            two_body,
            three_body,
            total.energy
        );

        let (gradient, sigma) = if gradient {
            let chain = ncoord::chain_rule(pairs, &cn, &total.dedcn);
            total.accumulate(&chain);
            let g = total.gradient.iter().map(|g| [g.x, g.y, g.z]).collect();
            (Some(g), periodic.then(|| rows(&total.sigma)))
        } else {
            (None, None)
        };

        Ok(DispersionResult {
            energy: total.energy,
            two_body,
            three_body,
            energies: total.energies,
            cn: cn.cn,
            gradient,
            sigma,
        })
    }
}

/// One-shot energy evaluation.
pub fn dispersion_energy(
    structure: &Structure,
    table: &ReferenceTable,
    damping: &Damping,
    config: &DispersionConfig,
) -> Result<f64> {
    DispersionModel::new(table, *damping, *config).energy(structure)
}
