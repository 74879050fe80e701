use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use orthoflow_core::eop::Eop;
use orthoflow_core::rotation::Mat3;

use crate::GeorefError;

/// One accepted exterior orientation, as logged.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceRecord {
    /// Camera label, the image file name.
    pub name: String,
    /// The accepted exterior orientation.
    pub eop: Eop,
    /// Position covariance in the local east-north-up frame, when the
    /// solve exported one. Direct georeferencing never carries it.
    pub covariance: Option<Mat3>,
}

/// Append-only exterior orientation log of a run.
///
/// Plain text, two header lines, one comma-delimited row per accepted
/// camera: name, position, omega-phi-kappa and an optional nine-value
/// covariance block. The estimated-priors mode re-imports these rows as
/// priors on every incremental solve, so rows must parse back exactly.
#[derive(Debug, Clone)]
pub struct ReferenceLog {
    path: PathBuf,
}

impl ReferenceLog {
    /// Create a fresh log at `path`, truncating any previous run.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, GeorefError> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::create(&path)?;
        writeln!(file, "exterior orientation reference log")?;
        writeln!(file, "name,x,y,z,omega,phi,kappa,covariance(9, optional)")?;
        Ok(Self { path })
    }

    /// Reopen an existing log for appending and re-import.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GeorefError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Self::create(path);
        }
        Ok(Self { path })
    }

    /// The log file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one accepted record.
    pub fn append(&self, record: &ReferenceRecord) -> Result<(), GeorefError> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        let p = record.eop.position;
        let mut row = format!(
            "{},{},{},{},{},{},{}",
            record.name, p[0], p[1], p[2], record.eop.omega, record.eop.phi, record.eop.kappa
        );
        if let Some(cov) = &record.covariance {
            for value in cov.iter().flatten() {
                row.push(',');
                row.push_str(&value.to_string());
            }
        }
        writeln!(file, "{row}")?;
        Ok(())
    }

    /// Read every record back, skipping the two header lines.
    pub fn read_all(&self) -> Result<Vec<ReferenceRecord>, GeorefError> {
        let reader = BufReader::new(File::open(&self.path)?);
        let mut records = Vec::new();

        for line in reader.lines().skip(2) {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(parse_row(&line)?);
        }
        Ok(records)
    }
}

fn parse_row(line: &str) -> Result<ReferenceRecord, GeorefError> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != 7 && fields.len() != 16 {
        return Err(GeorefError::MalformedLogRow(line.to_string()));
    }

    let mut values = [0.0; 15];
    for (value, field) in values.iter_mut().zip(&fields[1..]) {
        *value = field
            .trim()
            .parse()
            .map_err(|_| GeorefError::MalformedLogRow(line.to_string()))?;
    }

    let covariance = (fields.len() == 16).then(|| {
        let c = &values[6..15];
        [
            [c[0], c[1], c[2]],
            [c[3], c[4], c[5]],
            [c[6], c[7], c[8]],
        ]
    });

    Ok(ReferenceRecord {
        name: fields[0].to_string(),
        eop: Eop::new(
            [values[0], values[1], values[2]],
            values[3],
            values[4],
            values[5],
        ),
        covariance,
    })
}
