//! Dataset assembly and CSV export
//!
//! Repeats record synthesis with strictly sequential IDs and writes the
//! result as a fixed-column CSV table.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use rand_chacha::ChaCha8Rng;

use crate::boundaries::LocalityBoundaries;
use crate::record::{RecordSynthesizer, SynthesisError, TreeRecord};
use crate::reference::ReferenceCatalog;

/// Output column order, fixed across all rows for interoperability with
/// the reference exports.
pub const COLUMNS: [&str; 31] = [
    "ID",
    "Anio",
    "IVP",
    "Salario Minimo",
    "Concepto",
    "Tipo CT",
    "Consecutivo",
    "SIGAU",
    "Especie",
    "Tratamiento",
    "Espacio",
    "Emplazamiento",
    "Estrato",
    "Localidad",
    "Latitud",
    "Longitud",
    "PAP",
    "DAP",
    "Altura Total",
    "Altura Comercial",
    "Diam. Copa Polar",
    "Diam. Copa Ecuatorial",
    "Perimetro Basal",
    "Estado Fuste",
    "Estado Copa",
    "Estado Raiz",
    "Estado FitoSanitario",
    "Estado General",
    "Riesgo",
    "Interes Patrimonial",
    "Autorizado",
];

/// Errors raised while building a dataset.
#[derive(Debug)]
pub enum BuildError {
    /// Requested record count must be at least 1
    InvalidCount(usize),
    /// A record failed to synthesize
    Synthesis(SynthesisError),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::InvalidCount(n) => {
                write!(f, "invalid record count {}: must be at least 1", n)
            }
            BuildError::Synthesis(e) => write!(f, "dataset build failed: {}", e),
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BuildError::InvalidCount(_) => None,
            BuildError::Synthesis(e) => Some(e),
        }
    }
}

impl From<SynthesisError> for BuildError {
    fn from(e: SynthesisError) -> Self {
        BuildError::Synthesis(e)
    }
}

/// Ordered collection of synthesized records.
#[derive(Clone, Debug)]
pub struct Dataset {
    records: Vec<TreeRecord>,
}

impl Dataset {
    pub fn records(&self) -> &[TreeRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Write the dataset as CSV with the fixed [`COLUMNS`] header.
    /// Unresolved coordinates become empty cells.
    pub fn write_csv<W: Write>(&self, out: W) -> io::Result<()> {
        let mut out = BufWriter::new(out);
        writeln!(out, "{}", COLUMNS.join(","))?;
        for record in &self.records {
            let fields = row_fields(record);
            let row: Vec<String> = fields.iter().map(|f| csv_escape(f)).collect();
            writeln!(out, "{}", row.join(","))?;
        }
        out.flush()
    }

    pub fn write_csv_file(&self, path: &Path) -> io::Result<()> {
        let file = File::create(path)?;
        self.write_csv(file)
    }
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn row_fields(record: &TreeRecord) -> [String; 31] {
    [
        record.id.to_string(),
        record.year.to_string(),
        record.ivp.to_string(),
        record.minimum_wage.to_string(),
        record.concept_code.clone(),
        record.ct_type.clone(),
        record.consecutive_code.clone(),
        record.sigau_code.clone(),
        record.species.clone(),
        record.treatment.clone(),
        record.space_type.clone(),
        record.emplacement.clone(),
        record.stratum.to_string(),
        record.locality.clone(),
        optional(record.latitude),
        optional(record.longitude),
        record.girth.to_string(),
        record.diameter.to_string(),
        record.total_height.to_string(),
        record.commercial_height.to_string(),
        record.crown_diameter_polar.to_string(),
        record.crown_diameter_equatorial.to_string(),
        record.basal_perimeter.to_string(),
        record.trunk_condition.to_string(),
        record.crown_condition.to_string(),
        record.root_condition.to_string(),
        record.phytosanitary_condition.to_string(),
        record.general_condition.clone(),
        record.risk.clone(),
        if record.heritage_interest {
            "True".to_string()
        } else {
            "False".to_string()
        },
        record.authorized_by.clone(),
    ]
}

/// Quote a field when it contains the delimiter, a quote or a newline.
/// Species common names routinely contain commas.
fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Builds datasets of sequentially numbered records.
pub struct DatasetBuilder<'a> {
    synthesizer: RecordSynthesizer<'a>,
}

impl<'a> DatasetBuilder<'a> {
    pub fn new(catalog: &'a ReferenceCatalog, boundaries: &'a LocalityBoundaries) -> Self {
        Self {
            synthesizer: RecordSynthesizer::new(catalog, boundaries),
        }
    }

    /// Build `n` records with IDs 1..=n in generation order.
    pub fn build(&mut self, n: usize, rng: &mut ChaCha8Rng) -> Result<Dataset, BuildError> {
        if n == 0 {
            return Err(BuildError::InvalidCount(n));
        }
        let mut records = Vec::with_capacity(n);
        for id in 1..=n {
            records.push(self.synthesizer.synthesize(id as u32, rng)?);
        }
        Ok(Dataset { records })
    }
}
