//! Tabular values: listing results for display, and typed input tables for extracts.

use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;
use std::io::{Read, Write};
use std::path::Path;

use crate::error::PlumberError;

/// Flat listing result: named columns over string rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Values of one column, by name.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let index = self.columns.iter().position(|c| c == name)?;
        Some(
            self.rows
                .iter()
                .map(|r| r.get(index).map_or("", String::as_str))
                .collect(),
        )
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), PlumberError> {
        let mut out = csv::Writer::from_writer(writer);
        out.write_record(&self.columns)?;
        for row in &self.rows {
            out.write_record(row)?;
        }
        out.flush()?;
        Ok(())
    }

    pub fn to_csv_file<P: AsRef<Path>>(&self, path: P) -> Result<(), PlumberError> {
        let file = std::fs::File::create(path)?;
        self.write_csv(file)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.columns.is_empty() {
            return writeln!(f, "(empty)");
        }
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                self.rows
                    .iter()
                    .map(|r| r.get(i).map_or(0, |cell| cell.chars().count()))
                    .chain(std::iter::once(c.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let line = |cells: &[String]| -> String {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{cell:<width$}"))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        writeln!(f, "{}", line(&self.columns))?;
        for row in &self.rows {
            writeln!(f, "{}", line(row))?;
        }
        Ok(())
    }
}

/// One column of an input table. `None` marks a missing value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataColumn {
    pub name: String,
    /// Runtime type name, e.g. `int64`, `float64`, `bool`, `datetime64[ns]`, `object`.
    pub dtype: String,
    pub values: Vec<Option<String>>,
}

impl DataColumn {
    pub fn new(name: impl Into<String>, dtype: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self {
            name: name.into(),
            dtype: dtype.into(),
            values,
        }
    }

    /// Builds a column from raw strings, treating empty strings as missing and
    /// inferring the type name from the values.
    pub fn from_raw(name: impl Into<String>, raw: Vec<String>) -> Self {
        let values: Vec<Option<String>> = raw
            .into_iter()
            .map(|v| if v.is_empty() { None } else { Some(v) })
            .collect();
        let dtype = infer_dtype(&values);
        Self {
            name: name.into(),
            dtype: dtype.to_string(),
            values,
        }
    }

    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_none()).count()
    }
}

/// In-memory input table for extract building.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataTable {
    pub columns: Vec<DataColumn>,
}

impl DataTable {
    pub fn new(columns: Vec<DataColumn>) -> Result<Self, PlumberError> {
        if let Some(first) = columns.first() {
            let rows = first.values.len();
            if let Some(bad) = columns.iter().find(|c| c.values.len() != rows) {
                return Err(PlumberError::InvalidArgument(format!(
                    "column '{}' has {} values, expected {rows}",
                    bad.name,
                    bad.values.len()
                )));
            }
        }
        Ok(Self { columns })
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(|c| c.values.len()).unwrap_or(0)
    }

    pub fn column(&self, name: &str) -> Option<&DataColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Reads a headed CSV, inferring each column's type name from its values.
    pub fn read_csv<R: Read>(reader: R) -> Result<Self, PlumberError> {
        let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        let mut raw: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
        for record in rdr.records() {
            let record = record?;
            for (i, cell) in raw.iter_mut().enumerate() {
                cell.push(record.get(i).unwrap_or("").to_string());
            }
        }
        let columns = headers
            .into_iter()
            .zip(raw)
            .map(|(name, values)| DataColumn::from_raw(name, values))
            .collect();
        Self::new(columns)
    }

    pub fn from_csv_file<P: AsRef<Path>>(path: P) -> Result<Self, PlumberError> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::read_csv(file)
    }

    /// Writes a headed CSV; missing values become empty fields.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), PlumberError> {
        let mut out = csv::Writer::from_writer(writer);
        out.write_record(self.columns.iter().map(|c| c.name.as_str()))?;
        for row in 0..self.row_count() {
            out.write_record(
                self.columns
                    .iter()
                    .map(|c| c.values[row].as_deref().unwrap_or("")),
            )?;
        }
        out.flush()?;
        Ok(())
    }
}

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

fn is_datetime(value: &str) -> bool {
    let value = value.trim_end_matches('Z');
    NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
        || DATETIME_FORMATS
            .iter()
            .any(|fmt| NaiveDateTime::parse_from_str(value, fmt).is_ok())
}

fn is_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "false")
}

/// Infers a runtime type name for a column.
///
/// Integer columns with gaps widen to `float64`, and all-missing columns are
/// `float64`, so the numeric fill value applies to them. Boolean and date
/// columns with gaps stay `object`.
pub fn infer_dtype(values: &[Option<String>]) -> &'static str {
    let present: Vec<&str> = values.iter().flatten().map(|v| v.trim()).collect();
    if present.is_empty() {
        return "float64";
    }
    let has_missing = present.len() < values.len();

    if present.iter().all(|v| v.parse::<i64>().is_ok()) {
        return if has_missing { "float64" } else { "int64" };
    }
    if present.iter().all(|v| v.parse::<f64>().is_ok()) {
        return "float64";
    }
    if !has_missing && present.iter().all(|v| is_bool(v)) {
        return "bool";
    }
    if !has_missing && present.iter().all(|v| is_datetime(v)) {
        return "datetime64[ns]";
    }
    "object"
}
