//! Extract column schema: runtime type names to extract SQL types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::error::PlumberError;
use crate::table::DataTable;

/// Column types available in an extract table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlType {
    Text,
    Timestamp,
    #[serde(alias = "boolean")]
    Bool,
    #[serde(alias = "integer")]
    Int,
    #[serde(alias = "bigint")]
    BigInt,
    #[serde(alias = "double_precision", alias = "float")]
    Double,
    Date,
    Interval,
}

impl SqlType {
    /// Type name as written in `CREATE TABLE`.
    pub fn sql(&self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Timestamp => "TIMESTAMP",
            SqlType::Bool => "BOOLEAN",
            SqlType::Int => "INTEGER",
            SqlType::BigInt => "BIGINT",
            SqlType::Double => "DOUBLE PRECISION",
            SqlType::Date => "DATE",
            SqlType::Interval => "INTERVAL",
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql())
    }
}

/// Value substituted for missing cells of a column.
///
/// `Null` is the marker the bulk load reads as SQL NULL; typed columns that
/// cannot parse an empty field get it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillValue {
    Zero,
    Empty,
    Null,
}

impl FillValue {
    pub fn as_str(&self) -> &'static str {
        match self {
            FillValue::Zero => "0",
            FillValue::Empty => "",
            FillValue::Null => "NULL",
        }
    }

    pub fn for_sql_type(sql_type: SqlType) -> Self {
        match sql_type {
            SqlType::Int | SqlType::BigInt | SqlType::Double => FillValue::Zero,
            SqlType::Text => FillValue::Empty,
            SqlType::Timestamp | SqlType::Bool | SqlType::Date | SqlType::Interval => {
                FillValue::Null
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub sql_type: SqlType,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
        }
    }
}

/// Maps a runtime type name to an extract type and a fill value.
///
/// Case-insensitive substring match, first rule wins: `datetime`, `str`,
/// `boolean`, `int`, `float`, `period`, `object`. Anything else, plain `bool`
/// included, is text.
pub fn convert_datatype(type_name: &str) -> (SqlType, FillValue) {
    let lowered = type_name.to_lowercase();
    let rules: [(&str, SqlType); 7] = [
        ("datetime", SqlType::Timestamp),
        ("str", SqlType::Text),
        ("boolean", SqlType::Bool),
        ("int", SqlType::Int),
        ("float", SqlType::Double),
        ("period", SqlType::Interval),
        ("object", SqlType::Text),
    ];
    let sql_type = rules
        .into_iter()
        .find(|(needle, _)| lowered.contains(needle))
        .map_or(SqlType::Text, |(_, sql_type)| sql_type);
    (sql_type, FillValue::for_sql_type(sql_type))
}

/// Replaces missing cells with the fill value of each column's declared type.
///
/// Columns are matched by position; `columns` must be as wide as the table.
pub fn fill_missing(table: &mut DataTable, columns: &[ColumnDefinition]) {
    for (column, definition) in table.columns.iter_mut().zip(columns) {
        let fill = FillValue::for_sql_type(definition.sql_type);
        for value in column.values.iter_mut().filter(|v| v.is_none()) {
            *value = Some(fill.as_str().to_string());
        }
    }
}

/// Where extract input rows come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractInput {
    Table(DataTable),
    CsvPath(PathBuf),
}

impl ExtractInput {
    pub fn load(self) -> Result<DataTable, PlumberError> {
        match self {
            ExtractInput::Table(table) => Ok(table),
            ExtractInput::CsvPath(path) => DataTable::from_csv_file(&path).map_err(|e| {
                error!(error = %e, path = %path.display(), "No readable CSV found");
                e
            }),
        }
    }
}

/// Derives column definitions from a table and fills its missing cells.
pub fn create_extract_schema(
    input: ExtractInput,
) -> Result<(Vec<ColumnDefinition>, DataTable), PlumberError> {
    let mut table = input.load()?;
    let mut columns = Vec::with_capacity(table.columns.len());

    for column in &table.columns {
        let (sql_type, _) = convert_datatype(&column.dtype);
        info!(
            column = %column.name,
            dtype = %column.dtype,
            converted = %sql_type,
            "Column datatype converted"
        );
        columns.push(ColumnDefinition::new(column.name.clone(), sql_type));
    }
    fill_missing(&mut table, &columns);

    Ok((columns, table))
}

/// Reads a column list from a JSON file: `[{"name": "...", "type": "integer"}, ...]`.
pub fn load_custom_schema<P: AsRef<Path>>(path: P) -> Result<Vec<ColumnDefinition>, PlumberError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        error!(error = ?e, path = %path.display(), "Schema file unreadable");
        PlumberError::Schema(format!("cannot read {}: {e}", path.display()))
    })?;
    let columns: Vec<ColumnDefinition> = serde_json::from_str(&content).map_err(|e| {
        error!(error = ?e, path = %path.display(), "Schema invalid");
        PlumberError::Schema(format!("cannot parse {}: {e}", path.display()))
    })?;
    if columns.is_empty() {
        return Err(PlumberError::Schema(format!(
            "{} declares no columns",
            path.display()
        )));
    }
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::DataColumn;
    use std::io::Write;

    #[test]
    fn maps_runtime_type_names() {
        let cases = [
            ("int64", SqlType::Int, FillValue::Zero),
            ("Int32", SqlType::Int, FillValue::Zero),
            ("datetime64[ns]", SqlType::Timestamp, FillValue::Null),
            ("float64", SqlType::Double, FillValue::Zero),
            ("bool", SqlType::Text, FillValue::Empty),
            ("boolean", SqlType::Bool, FillValue::Null),
            ("string", SqlType::Text, FillValue::Empty),
            ("period[D]", SqlType::Interval, FillValue::Null),
            ("object", SqlType::Text, FillValue::Empty),
            ("category", SqlType::Text, FillValue::Empty),
            ("", SqlType::Text, FillValue::Empty),
        ];
        for (name, sql_type, fill) in cases {
            assert_eq!(convert_datatype(name), (sql_type, fill), "{name}");
        }
    }

    #[test]
    fn fills_missing_numeric_cells_with_zero() {
        let table = DataTable::new(vec![
            DataColumn::new("qty", "float64", vec![Some("1.5".into()), None]),
            DataColumn::new("label", "object", vec![None, Some("b".into())]),
        ])
        .unwrap();

        let (columns, filled) = create_extract_schema(ExtractInput::Table(table)).unwrap();

        assert_eq!(
            columns,
            vec![
                ColumnDefinition::new("qty", SqlType::Double),
                ColumnDefinition::new("label", SqlType::Text),
            ]
        );
        assert_eq!(filled.columns[0].values[1].as_deref(), Some("0"));
        assert_eq!(filled.columns[1].values[0].as_deref(), Some(""));
    }

    #[test]
    fn typed_gaps_are_filled_with_the_null_marker() {
        let table = DataTable::new(vec![
            DataColumn::new("flag", "boolean", vec![Some("true".into()), None]),
            DataColumn::new("at", "datetime64[ns]", vec![None, Some("2024-01-02".into())]),
        ])
        .unwrap();

        let (columns, filled) = create_extract_schema(ExtractInput::Table(table)).unwrap();

        assert_eq!(columns[0].sql_type, SqlType::Bool);
        assert_eq!(filled.columns[0].values[1].as_deref(), Some("NULL"));
        assert_eq!(filled.columns[1].values[0].as_deref(), Some("NULL"));
    }

    #[test]
    fn csv_path_input_is_read_and_typed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "id,when\n1,2024-01-02\n,2024-01-03\n").unwrap();

        let (columns, filled) =
            create_extract_schema(ExtractInput::CsvPath(file.path().to_path_buf())).unwrap();

        assert_eq!(columns[0].sql_type, SqlType::Double);
        assert_eq!(columns[1].sql_type, SqlType::Timestamp);
        assert_eq!(filled.columns[0].values[1].as_deref(), Some("0"));
    }

    #[test]
    fn missing_csv_path_is_an_error() {
        let err = create_extract_schema(ExtractInput::CsvPath("/no/such/file.csv".into()));
        assert!(matches!(err, Err(PlumberError::Io(_))));
    }

    #[test]
    fn custom_schema_accepts_type_aliases() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"name":"id","type":"integer"}},{{"name":"ok","type":"boolean"}},{{"name":"at","type":"timestamp"}}]"#
        )
        .unwrap();

        let columns = load_custom_schema(file.path()).unwrap();
        assert_eq!(
            columns.iter().map(|c| c.sql_type).collect::<Vec<_>>(),
            vec![SqlType::Int, SqlType::Bool, SqlType::Timestamp]
        );
    }
}
