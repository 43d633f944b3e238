use std::fs::File;
use std::path::Path;

use arrow::array::{Array, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Date32Type, Float64Type};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use crate::error::DataSourceError;

use super::model::{BaseTable, IndexKind, Measure, Record};

pub const DATE_COLUMN: &str = "referencia";
pub const YEAR_COLUMN: &str = "ano";

/// Every column a source must provide. Extra columns are ignored.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    DATE_COLUMN,
    YEAR_COLUMN,
    "ipca_variacao",
    "inpc_variacao",
    "ipca15_variacao",
    "ipca_acumulado_doze_meses",
    "selic_meta",
    "salario_minimo",
];

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load the indicator table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one row per month
/// * `.json`    – `[{ "referencia": "2020-01-01", "ano": 2020, ... }, ...]`
/// * `.parquet` – flat columns; `referencia` as string, date or timestamp
///
/// The result is sorted by `referencia`. Any bad cell fails the whole load.
pub fn load_file(path: &Path) -> Result<BaseTable, DataSourceError> {
    if !path.exists() {
        return Err(DataSourceError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let records = match ext.as_str() {
        "csv" => load_csv(path)?,
        "json" => load_json(path)?,
        "parquet" | "pq" => load_parquet(path)?,
        other => return Err(DataSourceError::UnsupportedFormat(other.to_string())),
    };

    BaseTable::from_records(records)
}

fn open(path: &Path) -> Result<File, DataSourceError> {
    File::open(path).map_err(|source| DataSourceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn check_columns(present: impl Fn(&str) -> bool) -> Result<(), DataSourceError> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !present(c))
        .map(|c| c.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(DataSourceError::MissingColumns(missing))
    }
}

// ---------------------------------------------------------------------------
// Cell conversion shared by every format
// ---------------------------------------------------------------------------

/// One raw cell, before it is checked against the column it belongs to.
#[derive(Debug, Clone, Copy)]
enum Cell<'a> {
    Text(&'a str),
    Number(f64),
    /// Milliseconds since the Unix epoch (pandas' default JSON date format).
    EpochMillis(i64),
    Date(NaiveDate),
    Null,
}

fn invalid(row: usize, column: &str, message: impl Into<String>) -> DataSourceError {
    DataSourceError::InvalidCell {
        row,
        column: column.to_string(),
        message: message.into(),
    }
}

/// Accepts ISO dates, ISO date-times, `DD/MM/YYYY` and `YYYY-MM`.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    for fmt in ["%Y-%m-%d", "%d/%m/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d").ok()
}

fn date_cell(row: usize, cell: Cell<'_>) -> Result<NaiveDate, DataSourceError> {
    match cell {
        Cell::Date(d) => Ok(d),
        Cell::Text(s) => {
            parse_date(s).ok_or_else(|| invalid(row, DATE_COLUMN, format!("'{s}' is not a date")))
        }
        Cell::EpochMillis(ms) => DateTime::from_timestamp_millis(ms)
            .map(|dt| dt.date_naive())
            .ok_or_else(|| invalid(row, DATE_COLUMN, format!("timestamp {ms} out of range"))),
        Cell::Number(v) => Err(invalid(row, DATE_COLUMN, format!("{v} is not a date"))),
        Cell::Null => Err(invalid(row, DATE_COLUMN, "empty value")),
    }
}

fn number_cell(row: usize, column: &str, cell: Cell<'_>) -> Result<f64, DataSourceError> {
    let value = match cell {
        Cell::Number(v) => v,
        Cell::EpochMillis(v) => v as f64,
        Cell::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid(row, column, format!("'{s}' is not a number")))?,
        Cell::Date(d) => return Err(invalid(row, column, format!("{d} is not a number"))),
        Cell::Null => return Err(invalid(row, column, "empty value")),
    };
    if value.is_finite() {
        Ok(value)
    } else {
        Err(invalid(row, column, format!("{value} is not finite")))
    }
}

fn year_cell(row: usize, cell: Cell<'_>) -> Result<i32, DataSourceError> {
    let value = number_cell(row, YEAR_COLUMN, cell)?;
    if value.fract() != 0.0 || value < i32::MIN as f64 || value > i32::MAX as f64 {
        return Err(invalid(row, YEAR_COLUMN, format!("{value} is not a year")));
    }
    Ok(value as i32)
}

/// Build a [`Record`] from a row, `cell` looks a column up by name.
fn record_from_cells<'a>(
    row: usize,
    cell: impl Fn(&str) -> Cell<'a>,
) -> Result<Record, DataSourceError> {
    let number = |column: &str| number_cell(row, column, cell(column));
    Ok(Record {
        reference_date: date_cell(row, cell(DATE_COLUMN))?,
        year: year_cell(row, cell(YEAR_COLUMN))?,
        ipca_variation: number(IndexKind::Ipca.column())?,
        inpc_variation: number(IndexKind::Inpc.column())?,
        ipca15_variation: number(IndexKind::Ipca15.column())?,
        ipca_12m_accumulated: number(Measure::Ipca12m.column())?,
        selic_target: number(Measure::Selic.column())?,
        minimum_wage: number(Measure::MinimumWage.column())?,
    })
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one month per line.
/// Empty cells are rejected.
fn load_csv(path: &Path) -> Result<Vec<Record>, DataSourceError> {
    let malformed = |e: csv::Error| DataSourceError::Malformed {
        format: "CSV",
        message: e.to_string(),
    };

    let mut reader = csv::Reader::from_reader(open(path)?);
    let headers: Vec<String> = reader
        .headers()
        .map_err(malformed)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    check_columns(|c| headers.iter().any(|h| h == c))?;

    let position = |column: &str| headers.iter().position(|h| h == column);

    let mut records = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let row = i + 1;
        let line = result.map_err(malformed)?;
        let record = record_from_cells(row, |column| {
            match position(column).and_then(|idx| line.get(idx)) {
                Some(s) if !s.trim().is_empty() => Cell::Text(s),
                _ => Cell::Null,
            }
        })?;
        records.push(record);
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "referencia": 1577836800000, "ano": 2020, "ipca_variacao": 0.21, ... },
///   ...
/// ]
/// ```
///
/// `referencia` may be epoch milliseconds or a date string.
fn load_json(path: &Path) -> Result<Vec<Record>, DataSourceError> {
    let malformed = |message: String| DataSourceError::Malformed {
        format: "JSON",
        message,
    };

    let root: JsonValue =
        serde_json::from_reader(std::io::BufReader::new(open(path)?))
            .map_err(|e| malformed(e.to_string()))?;
    let rows = root
        .as_array()
        .ok_or_else(|| malformed("expected a top-level array".to_string()))?;

    let objects = rows
        .iter()
        .enumerate()
        .map(|(i, v)| {
            v.as_object()
                .ok_or_else(|| malformed(format!("row {} is not an object", i + 1)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    check_columns(|c| objects.iter().all(|o| o.contains_key(c)))?;

    objects
        .iter()
        .enumerate()
        .map(|(i, obj)| {
            record_from_cells(i + 1, |column| match obj.get(column) {
                Some(JsonValue::String(s)) => Cell::Text(s),
                Some(JsonValue::Number(n)) if column == DATE_COLUMN => match n.as_i64() {
                    Some(ms) => Cell::EpochMillis(ms),
                    None => Cell::Number(n.as_f64().unwrap_or(f64::NAN)),
                },
                Some(JsonValue::Number(n)) => Cell::Number(n.as_f64().unwrap_or(f64::NAN)),
                _ => Cell::Null,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// A required column pulled out of one record batch.
enum ColumnData {
    Numbers(Vec<Option<f64>>),
    Texts(Vec<Option<String>>),
    Dates(Vec<Option<NaiveDate>>),
}

impl ColumnData {
    fn cell(&self, row: usize) -> Cell<'_> {
        match self {
            ColumnData::Numbers(v) => v[row].map_or(Cell::Null, Cell::Number),
            ColumnData::Texts(v) => v[row].as_deref().map_or(Cell::Null, Cell::Text),
            ColumnData::Dates(v) => v[row].map_or(Cell::Null, Cell::Date),
        }
    }
}

fn arrow_error(e: arrow::error::ArrowError) -> DataSourceError {
    DataSourceError::Malformed {
        format: "Parquet",
        message: e.to_string(),
    }
}

/// Convert a batch column: the date column to dates, everything else to f64.
fn extract_column(batch: &RecordBatch, name: &str) -> Result<ColumnData, DataSourceError> {
    let col = batch
        .column_by_name(name)
        .ok_or_else(|| DataSourceError::MissingColumns(vec![name.to_string()]))?;

    if name != DATE_COLUMN {
        let floats = cast(col, &DataType::Float64).map_err(arrow_error)?;
        return Ok(ColumnData::Numbers(
            floats.as_primitive::<Float64Type>().iter().collect(),
        ));
    }

    match col.data_type() {
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => {
            let strings = cast(col, &DataType::Utf8).map_err(arrow_error)?;
            Ok(ColumnData::Texts(
                strings
                    .as_string::<i32>()
                    .iter()
                    .map(|s| s.map(str::to_string))
                    .collect(),
            ))
        }
        _ => {
            let days = cast(col, &DataType::Date32).map_err(arrow_error)?;
            Ok(ColumnData::Dates(
                days.as_primitive::<Date32Type>()
                    .iter()
                    .map(|d| {
                        d.and_then(|d| DateTime::from_timestamp(i64::from(d) * 86_400, 0))
                            .map(|dt| dt.date_naive())
                    })
                    .collect(),
            ))
        }
    }
}

/// Load a Parquet file with one flat column per indicator.
///
/// Works with files written by **Pandas** (`df.to_parquet()`), where
/// `referencia` is usually a timestamp column, as well as string dates.
fn load_parquet(path: &Path) -> Result<Vec<Record>, DataSourceError> {
    let malformed = |e: parquet::errors::ParquetError| DataSourceError::Malformed {
        format: "Parquet",
        message: e.to_string(),
    };

    let builder = ParquetRecordBatchReaderBuilder::try_new(open(path)?).map_err(malformed)?;
    {
        let schema = builder.schema();
        check_columns(|c| schema.index_of(c).is_ok())?;
    }
    let reader = builder.build().map_err(malformed)?;

    let mut records = Vec::new();
    for batch_result in reader {
        let batch = batch_result.map_err(arrow_error)?;

        let columns = REQUIRED_COLUMNS
            .iter()
            .map(|name| Ok((*name, extract_column(&batch, name)?)))
            .collect::<Result<Vec<_>, DataSourceError>>()?;

        for i in 0..batch.num_rows() {
            let row = records.len() + 1;
            let record = record_from_cells(row, |column| {
                columns
                    .iter()
                    .find(|(name, _)| *name == column)
                    .map_or(Cell::Null, |(_, data)| data.cell(i))
            })?;
            records.push(record);
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Arc;

    use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray, TimestampMillisecondArray};
    use arrow::datatypes::{Field, Schema, TimeUnit};
    use parquet::arrow::ArrowWriter;

    use super::*;

    const HEADER: &str = "referencia,ano,ipca_variacao,inpc_variacao,ipca15_variacao,\
                          ipca_acumulado_doze_meses,selic_meta,salario_minimo";

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn csv_is_loaded_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "inflacao.csv",
            &format!(
                "{HEADER}\n\
                 2021-02-01,2021,0.86,0.82,0.48,5.20,2.00,1100.00\n\
                 2021-01-01,2021,0.25,0.27,0.78,4.56,2.00,1100.00\n"
            ),
        );
        let table = load_file(&path).unwrap();
        assert_eq!(table.len(), 2);
        let first = table.records()[0];
        assert_eq!(first.reference_date, NaiveDate::from_ymd_opt(2021, 1, 1).unwrap());
        assert_eq!(first.inpc_variation, 0.27);
        assert_eq!(first.minimum_wage, 1100.0);
    }

    #[test]
    fn missing_columns_are_all_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "partial.csv",
            "referencia,ano,ipca_variacao,inpc_variacao,ipca15_variacao,ipca_acumulado_doze_meses\n",
        );
        match load_file(&path).unwrap_err() {
            DataSourceError::MissingColumns(cols) => {
                assert_eq!(cols, ["selic_meta", "salario_minimo"])
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bad_cell_fails_the_whole_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "bad.csv",
            &format!(
                "{HEADER}\n\
                 2021-01-01,2021,0.25,0.27,0.78,4.56,2.00,1100.00\n\
                 2021-02-01,2021,0.86,,0.48,5.20,2.00,1100.00\n"
            ),
        );
        match load_file(&path).unwrap_err() {
            DataSourceError::InvalidCell { row, column, .. } => {
                assert_eq!(row, 2);
                assert_eq!(column, "inpc_variacao");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_and_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_file(&dir.path().join("nope.csv")),
            Err(DataSourceError::NotFound { .. })
        ));
        let path = write_file(&dir, "data.xlsx", "");
        assert!(matches!(
            load_file(&path),
            Err(DataSourceError::UnsupportedFormat(ext)) if ext == "xlsx"
        ));
    }

    #[test]
    fn json_accepts_epoch_millis_and_strings() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "inflacao.json",
            r#"[
                {"referencia": 1612137600000, "ano": 2021, "ipca_variacao": 0.86,
                 "inpc_variacao": 0.82, "ipca15_variacao": 0.48,
                 "ipca_acumulado_doze_meses": 5.2, "selic_meta": 2.0, "salario_minimo": 1100},
                {"referencia": "2021-01-01", "ano": 2021, "ipca_variacao": 0.25,
                 "inpc_variacao": 0.27, "ipca15_variacao": 0.78,
                 "ipca_acumulado_doze_meses": 4.56, "selic_meta": 2.0, "salario_minimo": 1100}
            ]"#,
        );
        let table = load_file(&path).unwrap();
        let dates: Vec<String> = table
            .records()
            .iter()
            .map(|r| r.reference_date.to_string())
            .collect();
        assert_eq!(dates, ["2021-01-01", "2021-02-01"]);
    }

    #[test]
    fn json_must_be_an_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "x.json", r#"{"referencia": []}"#);
        assert!(matches!(
            load_file(&path),
            Err(DataSourceError::Malformed { format: "JSON", .. })
        ));
    }

    #[test]
    fn parquet_with_timestamp_dates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inflacao.parquet");

        let mut fields = vec![
            Field::new(DATE_COLUMN, DataType::Timestamp(TimeUnit::Millisecond, None), false),
            Field::new(YEAR_COLUMN, DataType::Int64, false),
        ];
        fields.extend(
            REQUIRED_COLUMNS[2..]
                .iter()
                .map(|c| Field::new(*c, DataType::Float64, false)),
        );
        fields.push(Field::new("fonte", DataType::Utf8, false));
        let schema = Arc::new(Schema::new(fields));

        let mut columns: Vec<ArrayRef> = Vec::new();
        columns.push(Arc::new(TimestampMillisecondArray::from(vec![
            1_612_137_600_000,
            1_609_459_200_000,
        ])));
        columns.push(Arc::new(Int64Array::from(vec![2021, 2021])));
        for _ in 2..REQUIRED_COLUMNS.len() {
            columns.push(Arc::new(Float64Array::from(vec![1.5, 0.5])));
        }
        columns.push(Arc::new(StringArray::from(vec!["IBGE", "IBGE"])));

        let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();
        let mut writer = ArrowWriter::try_new(File::create(&path).unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let table = load_file(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.records()[0].reference_date,
            NaiveDate::from_ymd_opt(2021, 1, 1).unwrap()
        );
        assert_eq!(table.records()[0].selic_target, 0.5);
        assert_eq!(table.records()[1].year, 2021);
    }

    #[test]
    fn date_formats() {
        let jan = NaiveDate::from_ymd_opt(2020, 1, 1);
        assert_eq!(parse_date("2020-01-01"), jan);
        assert_eq!(parse_date("2020-01-01 00:00:00"), jan);
        assert_eq!(parse_date("01/01/2020"), jan);
        assert_eq!(parse_date("2020-01"), jan);
        assert_eq!(parse_date("janeiro"), None);
    }
}
