//! Static reference tables for dataset synthesis
//!
//! Species size ranges, silvicultural treatments, the 19 Bogotá localities,
//! condition/risk scales, authorization weights and the yearly economic
//! index (minimum wage and IVP). Loaded once at startup and immutable for
//! the lifetime of the process.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

/// Inclusive numeric range for a measurement field.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn is_valid(&self) -> bool {
        self.min <= self.max
    }
}

/// One botanical species with its valid measurement ranges.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Species {
    /// Common name as recorded in the census
    pub name: String,
    /// Trunk girth (circumference) in meters
    pub girth: Range,
    /// Total height in meters
    pub total_height: Range,
    /// Crown diameter along the polar axis, in meters
    pub crown_polar: Range,
    /// Crown diameter along the equatorial axis, in meters
    pub crown_equatorial: Range,
    /// Number of recorded individuals in the source census
    pub count: u32,
}

/// Errors raised while loading reference tables.
#[derive(Debug)]
pub enum ReferenceError {
    /// IO error reading the species range file
    Io(io::Error),
    /// A row has fewer columns than the table schema requires
    MissingColumn { line: usize, expected: usize, found: usize },
    /// A numeric column failed to parse
    BadNumber {
        line: usize,
        column: &'static str,
        value: String,
    },
    /// A min/max pair is inverted
    BadRange { line: usize, column: &'static str },
    /// The species table ended up empty
    EmptyTable,
}

impl fmt::Display for ReferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceError::Io(e) => write!(f, "could not read species table: {}", e),
            ReferenceError::MissingColumn {
                line,
                expected,
                found,
            } => write!(
                f,
                "species table line {}: expected {} columns, found {}",
                line, expected, found
            ),
            ReferenceError::BadNumber {
                line,
                column,
                value,
            } => write!(
                f,
                "species table line {}: column '{}' is not a number: '{}'",
                line, column, value
            ),
            ReferenceError::BadRange { line, column } => write!(
                f,
                "species table line {}: column '{}' has min greater than max",
                line, column
            ),
            ReferenceError::EmptyTable => write!(f, "species table contains no rows"),
        }
    }
}

impl std::error::Error for ReferenceError {}

impl From<io::Error> for ReferenceError {
    fn from(e: io::Error) -> Self {
        ReferenceError::Io(e)
    }
}

/// Expected columns in the external species range file, in order.
/// The file is semicolon-delimited because common names contain commas.
const SPECIES_COLUMNS: [&str; 10] = [
    "Especie",
    "PAP Min",
    "PAP Max",
    "Altura Min",
    "Altura Max",
    "Copa Polar Min",
    "Copa Polar Max",
    "Copa Ecuat Min",
    "Copa Ecuat Max",
    "Total",
];

/// Species lookup table, either built in or parsed from a range file.
#[derive(Clone, Debug, PartialEq)]
pub struct SpeciesTable {
    species: Vec<Species>,
}

impl SpeciesTable {
    /// Embedded species table, a representative subset of the Bogotá
    /// census species list with plausible size ranges.
    pub fn builtin() -> Self {
        let species = BUILTIN_SPECIES
            .iter()
            .map(|row| Species {
                name: row.0.to_string(),
                girth: Range::new(row.1, row.2),
                total_height: Range::new(row.3, row.4),
                crown_polar: Range::new(row.5, row.6),
                crown_equatorial: Range::new(row.7, row.8),
                count: row.9,
            })
            .collect();
        Self { species }
    }

    /// Build a table from an explicit species list.
    pub fn from_species(species: Vec<Species>) -> Result<Self, ReferenceError> {
        if species.is_empty() {
            return Err(ReferenceError::EmptyTable);
        }
        Ok(Self { species })
    }

    /// Parse a semicolon-delimited species range file. The first line is
    /// a header and is skipped; blank lines are ignored.
    pub fn from_file(path: &Path) -> Result<Self, ReferenceError> {
        let content = fs::read_to_string(path)?;
        Self::from_delimited(&content)
    }

    /// Parse species rows from semicolon-delimited text.
    pub fn from_delimited(content: &str) -> Result<Self, ReferenceError> {
        let mut species = Vec::new();
        for (idx, line) in content.lines().enumerate().skip(1) {
            let line_no = idx + 1;
            if line.trim().is_empty() {
                continue;
            }
            let parts: Vec<&str> = line.split(';').map(str::trim).collect();
            if parts.len() < SPECIES_COLUMNS.len() {
                return Err(ReferenceError::MissingColumn {
                    line: line_no,
                    expected: SPECIES_COLUMNS.len(),
                    found: parts.len(),
                });
            }

            let number = |col: usize| -> Result<f64, ReferenceError> {
                parts[col]
                    .parse::<f64>()
                    .map_err(|_| ReferenceError::BadNumber {
                        line: line_no,
                        column: SPECIES_COLUMNS[col],
                        value: parts[col].to_string(),
                    })
            };

            let girth = Range::new(number(1)?, number(2)?);
            let total_height = Range::new(number(3)?, number(4)?);
            let crown_polar = Range::new(number(5)?, number(6)?);
            let crown_equatorial = Range::new(number(7)?, number(8)?);
            let count =
                parts[9]
                    .parse::<u32>()
                    .map_err(|_| ReferenceError::BadNumber {
                        line: line_no,
                        column: SPECIES_COLUMNS[9],
                        value: parts[9].to_string(),
                    })?;

            for (range, column) in [
                (girth, SPECIES_COLUMNS[1]),
                (total_height, SPECIES_COLUMNS[3]),
                (crown_polar, SPECIES_COLUMNS[5]),
                (crown_equatorial, SPECIES_COLUMNS[7]),
            ] {
                if !range.is_valid() {
                    return Err(ReferenceError::BadRange {
                        line: line_no,
                        column,
                    });
                }
            }

            species.push(Species {
                name: parts[0].to_string(),
                girth,
                total_height,
                crown_polar,
                crown_equatorial,
                count,
            });
        }

        Self::from_species(species)
    }

    pub fn all(&self) -> &[Species] {
        &self.species
    }

    pub fn by_name(&self, name: &str) -> Option<&Species> {
        self.species.iter().find(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }
}

/// One silvicultural treatment with its four ordinal condition sub-scores.
///
/// Sub-scores are on the shared 1..=5 ordinal scale; the general condition
/// bucket of a treated tree is the floor of their mean.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Treatment {
    pub name: &'static str,
    pub trunk: u8,
    pub crown: u8,
    pub root: u8,
    pub phytosanitary: u8,
}

impl Treatment {
    /// Floor of the mean of the four sub-scores.
    pub fn condition_bucket(&self) -> u8 {
        (self.trunk + self.crown + self.root + self.phytosanitary) / 4
    }
}

/// Minimum wage and valuation index for one year.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct YearlyIndex {
    /// Monthly legal minimum wage (COP)
    pub minimum_wage: u64,
    /// IVP valuation index
    pub ivp: f64,
}

const TREATMENTS: [Treatment; 4] = [
    Treatment {
        name: "Poda",
        trunk: 4,
        crown: 4,
        root: 4,
        phytosanitary: 4,
    },
    Treatment {
        name: "Bloqueo y Traslado",
        trunk: 4,
        crown: 3,
        root: 3,
        phytosanitary: 3,
    },
    Treatment {
        name: "Control Fitosanitario",
        trunk: 3,
        crown: 3,
        root: 2,
        phytosanitary: 2,
    },
    Treatment {
        name: "Tala",
        trunk: 1,
        crown: 2,
        root: 1,
        phytosanitary: 1,
    },
];

const LOCALITIES: [(u8, &str); 19] = [
    (1, "USAQUÉN"),
    (2, "CHAPINERO"),
    (3, "SANTA FÉ"),
    (4, "SAN CRISTÓBAL"),
    (5, "USME"),
    (6, "TUNJUELITO"),
    (7, "BOSA"),
    (8, "KENNEDY"),
    (9, "FONTIBÓN"),
    (10, "ENGATIVÁ"),
    (11, "SUBA"),
    (12, "BARRIOS UNIDOS"),
    (13, "TEUSAQUILLO"),
    (14, "LAS MÁRTIRES"),
    (15, "ANTONIO NARIÑO"),
    (16, "PUENTE ARANDA"),
    (17, "LA CANDELARIA"),
    (18, "RAFAEL URIBE"),
    (19, "CIUDAD BOLÍVAR"),
];

/// General condition labels, indexed by ordinal bucket 1..=5.
const CONDITION_SCALE: [&str; 5] = ["Critico", "Malo", "Regular", "Bueno", "Optimo"];

/// Risk labels, indexed by the same ordinal bucket as the condition scale.
/// Bucket 1 (worst condition) maps to the highest risk.
const RISK_SCALE: [&str; 5] = ["Muy Alto", "Alto", "Medio", "Bajo", "Muy Bajo"];

/// Relative sampling weights per authorizing entity. They are relative
/// weights, not probabilities, and are not required to sum to 1.
const AUTHORIZATION_WEIGHTS: [(&str, f64); 6] = [
    ("OTRO", 0.10),
    ("ENEL", 0.25),
    ("IDU", 0.20),
    ("JBB", 0.25),
    ("UAESP", 0.10),
    ("EEAB", 0.10),
];

/// Minimum wage and IVP per supported year. Records are only stamped with
/// years present here.
const YEARLY_INDEX: [(u16, YearlyIndex); 5] = [
    (
        2020,
        YearlyIndex {
            minimum_wage: 877_803,
            ivp: 0.4379,
        },
    ),
    (
        2021,
        YearlyIndex {
            minimum_wage: 908_526,
            ivp: 0.432,
        },
    ),
    (
        2022,
        YearlyIndex {
            minimum_wage: 1_000_000,
            ivp: 0.4581,
        },
    ),
    (
        2023,
        YearlyIndex {
            minimum_wage: 1_160_000,
            ivp: 0.4476,
        },
    ),
    (
        2024,
        YearlyIndex {
            minimum_wage: 1_300_000,
            ivp: 0.4745,
        },
    ),
];

const SPACE_TYPES: [&str; 2] = ["Publico", "Privado"];

const EMPLACEMENTS: [&str; 5] = [
    "Anden",
    "Parque",
    "Separador vial",
    "Zona verde",
    "Antejardin",
];

const CT_TYPES: [&str; 3] = ["Ordinario", "Emergencia", "Seguimiento"];

/// Socioeconomic stratum range, inclusive.
pub const STRATUM_RANGE: (u8, u8) = (1, 6);

/// Read-only reference catalog. Static tables plus the species table,
/// which may come from an external range file.
#[derive(Clone, Debug)]
pub struct ReferenceCatalog {
    species: SpeciesTable,
}

impl ReferenceCatalog {
    /// Catalog backed by the embedded species table.
    pub fn builtin() -> Self {
        Self {
            species: SpeciesTable::builtin(),
        }
    }

    /// Catalog backed by an externally loaded species table.
    pub fn with_species(species: SpeciesTable) -> Self {
        Self { species }
    }

    pub fn species(&self) -> &SpeciesTable {
        &self.species
    }

    pub fn treatments(&self) -> &'static [Treatment] {
        &TREATMENTS
    }

    /// Locality code/name pairs, ordered by code.
    pub fn localities(&self) -> &'static [(u8, &'static str)] {
        &LOCALITIES
    }

    pub fn locality_name(&self, code: u8) -> Option<&'static str> {
        LOCALITIES
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, name)| *name)
    }

    /// General condition label for an ordinal bucket. Buckets outside
    /// 1..=5 clamp to the nearest scale entry.
    pub fn condition_label(bucket: u8) -> &'static str {
        CONDITION_SCALE[bucket.clamp(1, 5) as usize - 1]
    }

    /// Risk label for the same ordinal bucket as [`Self::condition_label`].
    pub fn risk_label(bucket: u8) -> &'static str {
        RISK_SCALE[bucket.clamp(1, 5) as usize - 1]
    }

    pub fn condition_scale(&self) -> &'static [&'static str] {
        &CONDITION_SCALE
    }

    pub fn risk_scale(&self) -> &'static [&'static str] {
        &RISK_SCALE
    }

    pub fn authorization_weights(&self) -> &'static [(&'static str, f64)] {
        &AUTHORIZATION_WEIGHTS
    }

    /// Year → economic index table, ordered by year.
    pub fn yearly_index_table(&self) -> &'static [(u16, YearlyIndex)] {
        &YEARLY_INDEX
    }

    pub fn yearly_index(&self, year: u16) -> Option<YearlyIndex> {
        YEARLY_INDEX
            .iter()
            .find(|(y, _)| *y == year)
            .map(|(_, idx)| *idx)
    }

    pub fn space_types(&self) -> &'static [&'static str] {
        &SPACE_TYPES
    }

    pub fn emplacements(&self) -> &'static [&'static str] {
        &EMPLACEMENTS
    }

    pub fn ct_types(&self) -> &'static [&'static str] {
        &CT_TYPES
    }
}

// name, girth min/max (m), height min/max (m), crown polar min/max (m),
// crown equatorial min/max (m), census count
const BUILTIN_SPECIES: [(&str, f64, f64, f64, f64, f64, f64, f64, f64, u32); 20] = [
    ("Roble", 0.5, 1.5, 5.0, 15.0, 2.0, 8.0, 2.0, 8.0, 1430),
    ("Urapán, Fresno", 0.6, 2.4, 8.0, 25.0, 3.0, 12.0, 3.0, 11.0, 5230),
    ("Eucalipto común", 0.8, 3.0, 10.0, 30.0, 2.5, 9.0, 2.5, 9.0, 3115),
    ("Pino patula", 0.5, 2.0, 8.0, 28.0, 2.0, 7.0, 2.0, 7.0, 980),
    ("Cipres italiano", 0.3, 1.2, 4.0, 18.0, 1.0, 3.5, 1.0, 3.5, 640),
    ("Palma de cera, Palma blanca", 0.4, 1.1, 6.0, 22.0, 1.5, 5.0, 1.5, 5.0, 210),
    ("Acacia japonesa", 0.3, 1.0, 3.0, 10.0, 1.5, 6.0, 1.5, 6.0, 1820),
    ("Carbonero rojo", 0.3, 0.9, 3.0, 9.0, 2.0, 6.5, 2.0, 6.5, 760),
    ("Cedro, cedro andino, cedro clavel", 0.6, 2.2, 7.0, 22.0, 3.0, 10.0, 3.0, 10.0, 890),
    ("Nogal, cedro nogal, cedro negro", 0.5, 1.8, 6.0, 18.0, 2.5, 9.0, 2.5, 9.0, 1040),
    ("Caucho sabanero", 0.7, 2.6, 6.0, 20.0, 3.0, 12.0, 3.0, 12.0, 2370),
    ("Sauce lloron", 0.4, 1.6, 4.0, 14.0, 2.5, 9.0, 2.5, 9.0, 430),
    ("Sangregao, drago, croto", 0.3, 1.0, 3.0, 12.0, 1.5, 5.0, 1.5, 5.0, 510),
    ("Sietecueros nazareno", 0.2, 0.7, 2.0, 8.0, 1.0, 4.0, 1.0, 4.0, 1260),
    ("Chicala, chirlobirlo, flor amarillo", 0.3, 1.1, 3.0, 12.0, 1.5, 6.0, 1.5, 6.0, 1680),
    ("Falso pimiento", 0.3, 1.2, 3.0, 12.0, 2.0, 7.0, 2.0, 7.0, 940),
    ("Holly liso", 0.1, 0.5, 1.5, 5.0, 0.8, 3.0, 0.8, 3.0, 720),
    ("Cayeno", 0.1, 0.4, 1.0, 4.0, 0.8, 2.5, 0.8, 2.5, 380),
    ("Liquidambar, estoraque", 0.4, 1.4, 5.0, 16.0, 2.0, 7.5, 2.0, 7.5, 550),
    ("Magnolio", 0.4, 1.3, 4.0, 14.0, 2.0, 7.0, 2.0, 7.0, 290),
];
