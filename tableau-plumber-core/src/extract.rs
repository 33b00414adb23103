//! # extract: building a local single-table extract file
//!
//! An extract holds exactly one table, `"Extract"."Extract"`. Building one:
//!
//! 1. Resolve the column list, either inferred from the input rows
//!    ([`create_extract_schema`]) or read from a custom schema file.
//! 2. Stage the rows as a temporary CSV (`temp*.csv`) in the staging
//!    directory. The staged file is removed when this function returns,
//!    whether or not the build succeeded.
//! 3. Hand the engine a fresh database path plus the DDL and a bulk `COPY`
//!    from the staged CSV.
//!
//! Missing cells are staged as the fill value of their column type, so numeric
//! gaps load as zero and timestamp, boolean and interval gaps load as NULL.
//! CSV inputs with a custom schema are copied straight from the source file
//! and never staged.

use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{error, info};

use crate::contract::ExtractEngine;
use crate::error::PlumberError;
use crate::schema::{
    create_extract_schema, fill_missing, load_custom_schema, ColumnDefinition, ExtractInput,
};
use crate::table::DataTable;

pub const EXTRACT_SCHEMA: &str = "Extract";
pub const EXTRACT_TABLE: &str = "Extract";

/// Quotes an SQL identifier, doubling embedded quotes.
pub fn escape_name(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quotes an SQL string literal, doubling embedded single quotes.
pub fn escape_string_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Fully qualified name of the extract table.
pub fn table_name() -> String {
    format!("{}.{}", escape_name(EXTRACT_SCHEMA), escape_name(EXTRACT_TABLE))
}

/// DDL and bulk load for one extract table fed from `csv_path`.
pub fn extract_commands(columns: &[ColumnDefinition], csv_path: &Path) -> Vec<String> {
    let column_sql = columns
        .iter()
        .map(|c| format!("{} {}", escape_name(&c.name), c.sql_type.sql()))
        .collect::<Vec<_>>()
        .join(", ");
    vec![
        format!("CREATE SCHEMA {}", escape_name(EXTRACT_SCHEMA)),
        format!("CREATE TABLE {} ({column_sql})", table_name()),
        format!(
            "COPY {} FROM {} WITH (format csv, NULL 'NULL', delimiter ',', header)",
            table_name(),
            escape_string_literal(&csv_path.to_string_lossy())
        ),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaSource {
    /// Infer column types from the input rows.
    Inferred,
    /// Read the column list from a JSON schema file.
    Custom(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractRequest {
    pub extract_path: PathBuf,
    pub input: ExtractInput,
    pub schema: SchemaSource,
    /// Where the temporary CSV is written; `None` means the working directory.
    pub staging_dir: Option<PathBuf>,
}

impl ExtractRequest {
    pub fn new(extract_path: impl Into<PathBuf>, input: ExtractInput) -> Self {
        Self {
            extract_path: extract_path.into(),
            input,
            schema: SchemaSource::Inferred,
            staging_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractReport {
    pub extract_path: PathBuf,
    pub columns: Vec<ColumnDefinition>,
    pub row_count: u64,
}

/// Where the engine reads rows from. Holding the temp file keeps it alive.
enum CopySource {
    Staged(NamedTempFile),
    Existing(PathBuf),
}

impl CopySource {
    fn path(&self) -> &Path {
        match self {
            CopySource::Staged(file) => file.path(),
            CopySource::Existing(path) => path,
        }
    }
}

fn stage_table(table: &DataTable, staging_dir: Option<&Path>) -> Result<NamedTempFile, PlumberError> {
    let dir = match staging_dir {
        Some(dir) => std::path::absolute(dir)?,
        None => std::env::current_dir()?,
    };
    let staged = tempfile::Builder::new()
        .prefix("temp")
        .suffix(".csv")
        .tempfile_in(&dir)?;
    table.write_csv(staged.as_file())?;
    info!(path = %staged.path().display(), rows = table.row_count(), "Staged extract rows");
    Ok(staged)
}

/// Builds a fresh extract file and reports the number of rows loaded.
pub async fn create_extract<E: ExtractEngine>(
    engine: &E,
    request: ExtractRequest,
) -> Result<ExtractReport, PlumberError> {
    let ExtractRequest {
        extract_path,
        input,
        schema,
        staging_dir,
    } = request;
    let staging_dir = staging_dir.as_deref();

    let (columns, source) = match schema {
        SchemaSource::Inferred => {
            let (columns, filled) = create_extract_schema(input)?;
            (columns, CopySource::Staged(stage_table(&filled, staging_dir)?))
        }
        SchemaSource::Custom(schema_path) => {
            let columns = load_custom_schema(&schema_path)?;
            let source = match input {
                ExtractInput::Table(mut table) => {
                    if table.columns.len() != columns.len() {
                        return Err(PlumberError::Schema(format!(
                            "schema declares {} columns, table has {}",
                            columns.len(),
                            table.columns.len()
                        )));
                    }
                    fill_missing(&mut table, &columns);
                    CopySource::Staged(stage_table(&table, staging_dir)?)
                }
                ExtractInput::CsvPath(path) => CopySource::Existing(path.canonicalize()?),
            };
            (columns, source)
        }
    };

    let database = std::path::absolute(&extract_path)?;
    let commands = extract_commands(&columns, source.path());
    info!(
        extract = %database.display(),
        columns = columns.len(),
        "Creating extract file"
    );

    let results = engine
        .execute_script(&database, &commands)
        .await
        .map_err(|e| {
            error!(error = %e, extract = %database.display(), "Extract creation failed");
            e
        })?;
    drop(source);

    let row_count = match results.as_slice() {
        [.., copied] if results.len() == commands.len() => *copied,
        _ => {
            return Err(PlumberError::Extract(format!(
                "engine ran {} of {} commands",
                results.len(),
                commands.len()
            )))
        }
    };

    info!(rows = row_count, extract = %database.display(), "Extract file has been generated");
    Ok(ExtractReport {
        extract_path: database,
        columns,
        row_count,
    })
}
