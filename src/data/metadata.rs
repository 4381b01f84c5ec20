//! Sample metadata records.
//!
//! Metadata is carried alongside a feature table and handed to the
//! operations unchanged; it never alters which samples a filter selects.

use crate::error::{Result, SharedAsvError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// A metadata value, either categorical or numeric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Variable {
    /// Categorical variable with string levels.
    Categorical(String),
    /// Numeric variable.
    Numeric(f64),
    /// Missing value.
    Missing,
}

impl Variable {
    /// Check if this is a missing value.
    pub fn is_missing(&self) -> bool {
        matches!(self, Variable::Missing)
    }

    /// Try to get as categorical string.
    pub fn as_categorical(&self) -> Option<&str> {
        match self {
            Variable::Categorical(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as f64.
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            Variable::Numeric(v) => Some(*v),
            _ => None,
        }
    }
}

impl std::fmt::Display for Variable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Variable::Categorical(s) => write!(f, "{}", s),
            Variable::Numeric(v) => write!(f, "{}", v),
            Variable::Missing => Ok(()),
        }
    }
}

/// Column type, inferred on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Categorical,
    Numeric,
}

/// Sample metadata: one record of named variables per sample.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    /// Sample IDs in order.
    sample_ids: Vec<String>,
    /// Column names.
    column_names: Vec<String>,
    /// Data stored as sample_id -> column_name -> Variable.
    data: HashMap<String, HashMap<String, Variable>>,
    /// Inferred type of each column.
    column_types: HashMap<String, ColumnType>,
}

fn is_missing_token(raw: &str) -> bool {
    raw.is_empty() || raw == "NA" || raw == "na"
}

impl Metadata {
    /// Create empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build metadata from in-memory rows of raw string values.
    ///
    /// Column types are inferred the same way as [`Metadata::from_tsv`].
    pub fn from_records(column_names: Vec<String>, rows: Vec<(String, Vec<String>)>) -> Result<Self> {
        let mut column_types = HashMap::new();
        for (col_idx, col_name) in column_names.iter().enumerate() {
            let all_numeric = rows.iter().all(|(_, values)| {
                values
                    .get(col_idx)
                    .map(|v| {
                        let v = v.trim();
                        is_missing_token(v) || v.parse::<f64>().is_ok()
                    })
                    .unwrap_or(true)
            });
            let col_type = if all_numeric {
                ColumnType::Numeric
            } else {
                ColumnType::Categorical
            };
            column_types.insert(col_name.clone(), col_type);
        }

        let mut sample_ids = Vec::with_capacity(rows.len());
        let mut data = HashMap::with_capacity(rows.len());

        for (sample_id, values) in rows {
            if data.contains_key(&sample_id) {
                return Err(SharedAsvError::DuplicateSample(sample_id));
            }
            let mut record = HashMap::new();
            for (col_idx, col_name) in column_names.iter().enumerate() {
                let var = match values.get(col_idx).map(|v| v.trim()) {
                    None => Variable::Missing,
                    Some(raw) if is_missing_token(raw) => Variable::Missing,
                    Some(raw) => match column_types.get(col_name) {
                        Some(ColumnType::Numeric) => raw
                            .parse::<f64>()
                            .map(Variable::Numeric)
                            .unwrap_or(Variable::Missing),
                        _ => Variable::Categorical(raw.to_string()),
                    },
                };
                record.insert(col_name.clone(), var);
            }
            sample_ids.push(sample_id.clone());
            data.insert(sample_id, record);
        }

        Ok(Self {
            sample_ids,
            column_names,
            data,
            column_types,
        })
    }

    /// Load metadata from a TSV file.
    ///
    /// Expected format:
    /// - First row: header with column names (first column is sample ID)
    /// - Subsequent rows: sample ID followed by variable values
    ///
    /// Lines starting with `#` (such as QIIME-style `#q2:types` directives)
    /// are skipped after the header. A header with no variable columns is
    /// allowed.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let header_line = lines
            .next()
            .ok_or_else(|| SharedAsvError::EmptyData("Empty metadata file".to_string()))??;
        let header: Vec<&str> = header_line.trim_end_matches('\r').split('\t').collect();
        let column_names: Vec<String> = header[1..].iter().map(|s| s.trim().to_string()).collect();

        let mut rows: Vec<(String, Vec<String>)> = Vec::new();
        for line_result in lines {
            let line = line_result?;
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            let sample_id = fields[0].trim().to_string();
            let values: Vec<String> = fields[1..].iter().map(|s| s.to_string()).collect();
            rows.push((sample_id, values));
        }

        if rows.is_empty() {
            return Err(SharedAsvError::EmptyData("No samples in metadata".to_string()));
        }

        Self::from_records(column_names, rows)
    }

    /// Write metadata to a TSV file.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        write!(writer, "sample_id")?;
        for column in &self.column_names {
            write!(writer, "\t{}", column)?;
        }
        writeln!(writer)?;

        for sample_id in &self.sample_ids {
            write!(writer, "{}", sample_id)?;
            for column in &self.column_names {
                let value = self.get(sample_id, column).unwrap_or(&Variable::Missing);
                write!(writer, "\t{}", value)?;
            }
            writeln!(writer)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Sample IDs in order.
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Column names.
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Number of samples.
    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Number of columns (variables).
    pub fn n_columns(&self) -> usize {
        self.column_names.len()
    }

    /// True when no samples are described.
    pub fn is_empty(&self) -> bool {
        self.sample_ids.is_empty()
    }

    /// Get a variable value for a specific sample and column.
    pub fn get(&self, sample_id: &str, column: &str) -> Option<&Variable> {
        self.data.get(sample_id).and_then(|m| m.get(column))
    }

    /// Get the inferred type of a column.
    pub fn column_type(&self, column: &str) -> Option<ColumnType> {
        self.column_types.get(column).copied()
    }

    /// Check if a sample exists.
    pub fn has_sample(&self, sample_id: &str) -> bool {
        self.data.contains_key(sample_id)
    }
}
