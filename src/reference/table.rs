// src/reference/table.rs

//! Reference dispersion data: per-element reference coordination numbers and
//! per-element-pair C6 grids.
//!
//! The table is immutable once built. Pair data is stored once per
//! normalized key (min Z, max Z); lookups with the elements in the other
//! order see the transposed grid.

use super::data;
use crate::error::{DispersionError, Result};
use crate::model::elements::{symbol, MAX_ATOMIC_NUMBER};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::OnceLock;

// --- Serialized form ---

/// One element's reference systems.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElementEntry {
    pub z: u8,
    /// Coordination numbers of the reference systems
    pub cn: Vec<f64>,
    /// Overrides the embedded covalent radius (Bohr)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub covalent_radius: Option<f64>,
    /// Overrides the embedded raw <r⁴>/<r²> ratio
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r4r2: Option<f64>,
}

/// C6 grid of an element pair; rows follow the references of `z[0]`,
/// columns those of `z[1]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PairEntry {
    pub z: [u8; 2],
    pub c6: Vec<Vec<f64>>,
}

/// Van der Waals cutoff radius of an element pair (Bohr), used by zero damping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RadiusEntry {
    pub z: [u8; 2],
    pub r0: f64,
}

/// Unvalidated reference data as read from JSON or assembled in code.
///
/// ```
/// use d3disp::reference::ReferenceFile;
///
/// let table = ReferenceFile::new()
///     .element(18, &[0.0])
///     .pair(18, 18, vec![vec![64.6483]])
///     .build()
///     .unwrap();
/// assert!(table.element(18).is_some());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceFile {
    #[serde(default)]
    pub elements: Vec<ElementEntry>,
    #[serde(default)]
    pub pairs: Vec<PairEntry>,
    #[serde(default)]
    pub vdw_radii: Vec<RadiusEntry>,
}

impl ReferenceFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn element(mut self, z: u8, cn: &[f64]) -> Self {
        self.elements.push(ElementEntry {
            z,
            cn: cn.to_vec(),
            covalent_radius: None,
            r4r2: None,
        });
        self
    }

    pub fn pair(mut self, zi: u8, zj: u8, c6: Vec<Vec<f64>>) -> Self {
        self.pairs.push(PairEntry { z: [zi, zj], c6 });
        self
    }

    pub fn vdw_radius(mut self, zi: u8, zj: u8, r0: f64) -> Self {
        self.vdw_radii.push(RadiusEntry { z: [zi, zj], r0 });
        self
    }

    pub fn build(self) -> Result<ReferenceTable> {
        ReferenceTable::try_from(self)
    }
}

// --- Validated table ---

#[derive(Clone, Debug, PartialEq)]
pub struct ElementReference {
    /// Covalent radius in Bohr
    pub covalent_radius: f64,
    /// Q = sqrt(0.5 · <r⁴>/<r²> · sqrt(Z))
    pub r4r2_scaled: f64,
    /// Reference coordination numbers
    pub cn: Vec<f64>,
}

#[derive(Clone, Debug, PartialEq)]
struct PairGrid {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

/// Read-only view of a pair grid oriented as requested by the caller.
#[derive(Clone, Copy, Debug)]
pub struct PairView<'a> {
    grid: &'a PairGrid,
    transposed: bool,
}

impl PairView<'_> {
    /// Reference C6 for reference `a` of the first and `b` of the second element.
    #[inline]
    pub fn get(&self, a: usize, b: usize) -> f64 {
        if self.transposed {
            self.grid.values[b * self.grid.cols + a]
        } else {
            self.grid.values[a * self.grid.cols + b]
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        if self.transposed {
            (self.grid.cols, self.grid.rows)
        } else {
            (self.grid.rows, self.grid.cols)
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReferenceTable {
    elements: BTreeMap<u8, ElementReference>,
    pairs: BTreeMap<(u8, u8), PairGrid>,
    vdw_radii: BTreeMap<(u8, u8), f64>,
}

fn key(zi: u8, zj: u8) -> (u8, u8) {
    (zi.min(zj), zi.max(zj))
}

fn invalid(msg: String) -> DispersionError {
    DispersionError::InvalidReference(msg)
}

fn check_number(z: u8) -> Result<()> {
    if z == 0 || z > MAX_ATOMIC_NUMBER {
        return Err(invalid(format!("atomic number {} outside 1..={}", z, MAX_ATOMIC_NUMBER)));
    }
    Ok(())
}

fn positive(value: f64, what: &str) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(invalid(format!("{} must be positive and finite, got {}", what, value)))
    }
}

impl TryFrom<ReferenceFile> for ReferenceTable {
    type Error = DispersionError;

    fn try_from(file: ReferenceFile) -> Result<Self> {
        let mut table = ReferenceTable::default();

        for entry in file.elements {
            check_number(entry.z)?;
            if entry.cn.is_empty() {
                return Err(invalid(format!("element {} has no reference systems", entry.z)));
            }
            if entry.cn.iter().any(|cn| !cn.is_finite() || *cn < 0.0) {
                return Err(invalid(format!(
                    "element {} has invalid reference coordination numbers {:?}",
                    entry.z, entry.cn
                )));
            }
            let covalent_radius = match entry.covalent_radius {
                Some(r) => positive(r, "covalent radius")?,
                None => data::covalent_radius(entry.z).unwrap_or_default(),
            };
            let r4r2 = match entry.r4r2 {
                Some(r) => positive(r, "<r4>/<r2> ratio")?,
                None => data::r4_over_r2(entry.z).unwrap_or_default(),
            };
            let element = ElementReference {
                covalent_radius,
                r4r2_scaled: data::scaled_r4_over_r2(entry.z, r4r2),
                cn: entry.cn,
            };
            if table.elements.insert(entry.z, element).is_some() {
                return Err(invalid(format!("element {} listed twice", entry.z)));
            }
        }

        for entry in file.pairs {
            let [zi, zj] = entry.z;
            let (rows, cols) = match (table.elements.get(&zi), table.elements.get(&zj)) {
                (Some(ei), Some(ej)) => (ei.cn.len(), ej.cn.len()),
                _ => {
                    return Err(invalid(format!(
                        "pair ({}, {}) refers to an element without reference systems",
                        zi, zj
                    )))
                }
            };
            if entry.c6.len() != rows || entry.c6.iter().any(|row| row.len() != cols) {
                return Err(invalid(format!(
                    "C6 grid of pair ({}, {}) must be {} x {}",
                    zi, zj, rows, cols
                )));
            }
            for c6 in entry.c6.iter().flatten() {
                positive(*c6, "reference C6")?;
            }

            // Store with the lower atomic number along the rows.
            let grid = if zi <= zj {
                PairGrid {
                    rows,
                    cols,
                    values: entry.c6.into_iter().flatten().collect(),
                }
            } else {
                let mut values = Vec::with_capacity(rows * cols);
                for b in 0..cols {
                    for row in &entry.c6 {
                        values.push(row[b]);
                    }
                }
                PairGrid {
                    rows: cols,
                    cols: rows,
                    values,
                }
            };
            if table.pairs.insert(key(zi, zj), grid).is_some() {
                return Err(invalid(format!("pair ({}, {}) listed twice", zi, zj)));
            }
        }

        for entry in file.vdw_radii {
            let [zi, zj] = entry.z;
            check_number(zi)?;
            check_number(zj)?;
            let r0 = positive(entry.r0, "van der Waals radius")?;
            if table.vdw_radii.insert(key(zi, zj), r0).is_some() {
                return Err(invalid(format!("van der Waals radius ({}, {}) listed twice", zi, zj)));
            }
        }

        log::debug!(
            "reference table: {} elements, {} pairs, {} vdW radii",
            table.elements.len(),
            table.pairs.len(),
            table.vdw_radii.len()
        );
        Ok(table)
    }
}

impl ReferenceTable {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: ReferenceFile = serde_json::from_str(json)?;
        Self::try_from(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let file: ReferenceFile = serde_json::from_reader(reader)?;
        Self::try_from(file)
    }

    /// Loads a JSON reference table from disk.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| DispersionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("loading reference table from {:?}", path);
        Self::from_reader(BufReader::new(file))
    }

    /// Serializable form of this table (pairs in normalized orientation).
    pub fn to_file(&self) -> ReferenceFile {
        let elements = self
            .elements
            .iter()
            .map(|(&z, e)| ElementEntry {
                z,
                cn: e.cn.clone(),
                covalent_radius: Some(e.covalent_radius),
                r4r2: Some(2.0 * e.r4r2_scaled * e.r4r2_scaled / (z as f64).sqrt()),
            })
            .collect();
        let pairs = self
            .pairs
            .iter()
            .map(|(&(zi, zj), grid)| PairEntry {
                z: [zi, zj],
                c6: grid.values.chunks(grid.cols).map(|row| row.to_vec()).collect(),
            })
            .collect();
        let vdw_radii = self
            .vdw_radii
            .iter()
            .map(|(&(zi, zj), &r0)| RadiusEntry { z: [zi, zj], r0 })
            .collect();
        ReferenceFile {
            elements,
            pairs,
            vdw_radii,
        }
    }

    pub fn element(&self, z: u8) -> Option<&ElementReference> {
        self.elements.get(&z)
    }

    /// C6 grid oriented so that rows follow the references of `zi`.
    pub fn pair(&self, zi: u8, zj: u8) -> Option<PairView<'_>> {
        self.pairs.get(&key(zi, zj)).map(|grid| PairView {
            grid,
            transposed: zi > zj,
        })
    }

    pub fn vdw_radius(&self, zi: u8, zj: u8) -> Option<f64> {
        self.vdw_radii.get(&key(zi, zj)).copied()
    }

    /// Atomic numbers with reference systems, ascending.
    pub fn supported_elements(&self) -> impl Iterator<Item = u8> + '_ {
        self.elements.keys().copied()
    }

    /// Verifies that every atom and every element pair present in `numbers`
    /// is parameterized. With `need_vdw_radii` the zero-damping radii are
    /// required as well.
    pub fn check_coverage(&self, numbers: &[u8], need_vdw_radii: bool) -> Result<()> {
        // Species in order of first appearance, with that atom's index.
        let mut species: Vec<(u8, usize)> = Vec::new();
        for (index, &z) in numbers.iter().enumerate() {
            if species.iter().any(|&(s, _)| s == z) {
                continue;
            }
            if self.element(z).is_none() {
                let reason = match symbol(z) {
                    Some(sym) => format!("no reference systems for {}", sym),
                    None => format!("atomic number outside 1..={}", MAX_ATOMIC_NUMBER),
                };
                return Err(DispersionError::MissingParameterization {
                    index,
                    number: z,
                    reason,
                });
            }
            species.push((z, index));
        }

        for (a, &(zi, index)) in species.iter().enumerate() {
            for &(zj, _) in &species[a..] {
                if self.pair(zi, zj).is_none() {
                    return Err(DispersionError::MissingParameterization {
                        index,
                        number: zi,
                        reason: format!("no reference C6 grid for the pair with Z = {}", zj),
                    });
                }
                if need_vdw_radii && self.vdw_radius(zi, zj).is_none() {
                    return Err(DispersionError::MissingParameterization {
                        index,
                        number: zi,
                        reason: format!("no van der Waals radius for the pair with Z = {}", zj),
                    });
                }
            }
        }
        Ok(())
    }
}

// --- Process-wide table ---

// Global reference table (installed once at startup)
static REFERENCE: OnceLock<ReferenceTable> = OnceLock::new();

/// Installs the process-wide reference table. The first installation wins;
/// later calls return the table already in place.
pub fn install(table: ReferenceTable) -> &'static ReferenceTable {
    let mut fresh = false;
    let installed = REFERENCE.get_or_init(|| {
        fresh = true;
        table
    });
    if !fresh {
        log::warn!("reference table already installed; keeping the existing one");
    }
    installed
}


#[cfg(test)]
mod tests {
    use super::fixtures::sample_table;
    use super::*;

    #[test]
    fn test_pair_symmetry() {
        let table = sample_table();
        let ch = table.pair(6, 1).unwrap();
        let hc = table.pair(1, 6).unwrap();
        assert_eq!(ch.shape(), (5, 2));
        assert_eq!(hc.shape(), (2, 5));
        for a in 0..5 {
            for b in 0..2 {
                assert_eq!(ch.get(a, b), hc.get(b, a));
            }
        }
    }

    #[test]
    fn test_transposed_insertion() {
        // Grid given with the heavier element first is stored transposed.
        let table = ReferenceFile::new()
            .element(1, &[0.0, 1.0])
            .element(6, &[0.0, 1.0, 2.0])
            .pair(6, 1, vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]])
            .build()
            .unwrap();
        let hc = table.pair(1, 6).unwrap();
        assert_eq!(hc.shape(), (2, 3));
        assert_eq!(hc.get(0, 2), 5.0);
        assert_eq!(hc.get(1, 0), 2.0);
        assert_eq!(table.pair(6, 1).unwrap().get(2, 1), 6.0);
    }

    #[test]
    fn test_rejects_bad_shape() {
        let err = ReferenceFile::new()
            .element(1, &[0.0, 1.0])
            .pair(1, 1, vec![vec![1.0, 2.0]])
            .build()
            .unwrap_err();
        assert!(matches!(err, DispersionError::InvalidReference(_)));
    }

    #[test]
    fn test_rejects_duplicates_and_bad_values() {
        assert!(ReferenceFile::new().element(1, &[0.0]).element(1, &[1.0]).build().is_err());
        assert!(ReferenceFile::new().element(0, &[0.0]).build().is_err());
        assert!(ReferenceFile::new().element(1, &[]).build().is_err());
        assert!(ReferenceFile::new()
            .element(1, &[0.0])
            .pair(1, 1, vec![vec![-1.0]])
            .build()
            .is_err());
        assert!(ReferenceFile::new()
            .element(1, &[0.0])
            .pair(1, 2, vec![vec![1.0]])
            .build()
            .is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let table = sample_table();
        let json = serde_json::to_string(&table.to_file()).unwrap();
        let back = ReferenceTable::from_json_str(&json).unwrap();

        assert_eq!(back.supported_elements().collect::<Vec<_>>(), vec![1, 6, 7, 8, 18]);
        let (a, b) = (table.element(8).unwrap(), back.element(8).unwrap());
        assert!((a.r4r2_scaled - b.r4r2_scaled).abs() < 1e-12);
        assert!((a.covalent_radius - b.covalent_radius).abs() < 1e-12);
        assert_eq!(back.pair(8, 6).unwrap().get(2, 4), table.pair(8, 6).unwrap().get(2, 4));
        assert_eq!(back.vdw_radius(1, 18), table.vdw_radius(18, 1));
    }

    #[test]
    fn test_json_defaults() {
        let json = r#"{"elements": [{"z": 18, "cn": [0.0]}], "pairs": [{"z": [18, 18], "c6": [[64.6483]]}]}"#;
        let table = ReferenceTable::from_json_str(json).unwrap();
        let ar = table.element(18).unwrap();
        assert!((ar.covalent_radius - data::covalent_radius(18).unwrap()).abs() < 1e-12);
        assert!(table.vdw_radius(18, 18).is_none());
    }

    #[test]
    fn test_coverage() {
        let table = sample_table();
        assert!(table.check_coverage(&[6, 1, 1, 8], true).is_ok());

        match table.check_coverage(&[6, 1, 26], false) {
            Err(DispersionError::MissingParameterization { index, number, .. }) => {
                assert_eq!(index, 2);
                assert_eq!(number, 26);
            }
            other => panic!("unexpected {:?}", other),
        }

        let partial = ReferenceFile::new()
            .element(1, &[0.0])
            .element(6, &[0.0])
            .pair(1, 1, vec![vec![3.0]])
            .pair(6, 6, vec![vec![40.0]])
            .build()
            .unwrap();
        let err = partial.check_coverage(&[1, 6], false).unwrap_err();
        assert!(err.to_string().contains("pair with Z = 6"));
        assert!(partial.check_coverage(&[6, 6], false).is_ok());
        assert!(partial.check_coverage(&[6, 6], true).is_err());
    }
}
