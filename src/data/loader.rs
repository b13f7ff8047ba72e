use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{
    Array, AsArray, Float32Array, Float64Array, Int32Array, Int64Array, LargeListArray, ListArray,
    StringArray,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;

use super::matrix::Matrix;
use super::model::TimeSeriesProvider;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a time-series provider from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – columns `time`, `feature`, `rows`, `cols`, `values` (list)
/// * `.json`    – `{ "source": ..., "steps": [{ "time": t, "features": {...} }] }`
/// * `.csv`     – columns `time,feature,rows,cols,values`, values semicolon-separated
///
/// Every parquet/CSV row is one matrix, appended to its feature in file order.
pub fn load_file(path: &Path) -> Result<TimeSeriesProvider> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let provider = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }?;

    log::info!(
        "loaded {} time step(s) from {}",
        provider.steps().len(),
        path.display()
    );
    Ok(provider)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema:
///
/// ```json
/// {
///   "source": "core simulation, cycle 1",
///   "steps": [
///     {
///       "time": 0.0,
///       "features": {
///         "assemblies": [{ "rows": 1, "cols": 1, "values": [2.0] }],
///         "power":      [{ "rows": 2, "cols": 2, "values": [1.0, 1.1, 0.9, 1.0] }]
///       }
///     }
///   ]
/// }
/// ```
#[derive(Debug, Deserialize)]
struct JsonDocument {
    source: Option<String>,
    steps: Vec<JsonStep>,
}

#[derive(Debug, Deserialize)]
struct JsonStep {
    time: f64,
    #[serde(default)]
    features: BTreeMap<String, Vec<JsonMatrix>>,
}

#[derive(Debug, Deserialize)]
struct JsonMatrix {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

fn load_json(path: &Path) -> Result<TimeSeriesProvider> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let doc: JsonDocument = serde_json::from_str(&text).context("parsing JSON")?;

    let source = doc
        .source
        .unwrap_or_else(|| path.display().to_string());
    let mut provider = TimeSeriesProvider::new(source);

    for (i, step) in doc.steps.into_iter().enumerate() {
        for (feature, matrices) in step.features {
            let matrices = matrices
                .into_iter()
                .enumerate()
                .map(|(j, m)| {
                    Matrix::from_row_major(m.rows, m.cols, m.values)
                        .with_context(|| format!("Step {i}, {feature}[{j}]"))
                })
                .collect::<Result<Vec<_>>>()?;
            provider.add_series(step.time, &feature, matrices);
        }
    }

    Ok(provider)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row `time,feature,rows,cols,values`.
/// `values` holds the row-major cells as semicolon-separated floats:
///   `0.0,power,2,2,"1.0;1.1;0.9;1.0"`
fn load_csv(path: &Path) -> Result<TimeSeriesProvider> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .with_context(|| format!("CSV missing '{name}' column"))
    };
    let time_idx = column("time")?;
    let feature_idx = column("feature")?;
    let rows_idx = column("rows")?;
    let cols_idx = column("cols")?;
    let values_idx = column("values")?;

    let mut provider = TimeSeriesProvider::new(path.display().to_string());

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let field = |idx: usize| record.get(idx).unwrap_or("").trim();

        let time: f64 = field(time_idx)
            .parse()
            .with_context(|| format!("Row {row_no}: invalid time '{}'", field(time_idx)))?;
        let rows: usize = field(rows_idx)
            .parse()
            .with_context(|| format!("Row {row_no}: invalid rows '{}'", field(rows_idx)))?;
        let cols: usize = field(cols_idx)
            .parse()
            .with_context(|| format!("Row {row_no}: invalid cols '{}'", field(cols_idx)))?;
        let values = parse_semicolon_floats(field(values_idx), row_no, "values")?;

        let matrix = Matrix::from_row_major(rows, cols, values)
            .with_context(|| format!("CSV row {row_no}"))?;
        provider.add_series(time, field(feature_idx), vec![matrix]);
    }

    Ok(provider)
}

fn parse_semicolon_floats(s: &str, row: usize, col: &str) -> Result<Vec<f64>> {
    if s.is_empty() {
        return Ok(Vec::new());
    }
    s.split(';')
        .enumerate()
        .map(|(j, tok)| {
            tok.trim()
                .parse::<f64>()
                .with_context(|| format!("Row {row}, {col}[{j}]: '{tok}' is not a number"))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file holding one matrix per row.
///
/// Expected schema:
/// - `time`: Float64
/// - `feature`: Utf8 / LargeUtf8
/// - `rows`, `cols`: Int32 or Int64
/// - `values`: List<Float64> or LargeList<Float64> (Float32 inner accepted)
///
/// Files written by `generate_sample` follow this layout.
fn load_parquet(path: &Path) -> Result<TimeSeriesProvider> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut provider = TimeSeriesProvider::new(path.display().to_string());

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        let column = |name: &str| {
            schema
                .index_of(name)
                .map(|i| batch.column(i))
                .map_err(|_| anyhow::anyhow!("Parquet file missing '{name}' column"))
        };
        let time_col = column("time")?;
        let feature_col = column("feature")?;
        let rows_col = column("rows")?;
        let cols_col = column("cols")?;
        let values_col = column("values")?;

        let times = time_col
            .as_any()
            .downcast_ref::<Float64Array>()
            .context("'time' column must be Float64")?;

        for row in 0..batch.num_rows() {
            let feature = extract_string(feature_col, row)
                .with_context(|| format!("Row {row}: failed to read 'feature'"))?;
            let rows = extract_usize(rows_col, row)
                .with_context(|| format!("Row {row}: failed to read 'rows'"))?;
            let cols = extract_usize(cols_col, row)
                .with_context(|| format!("Row {row}: failed to read 'cols'"))?;
            let values = extract_f64_list(values_col, row)
                .with_context(|| format!("Row {row}: failed to read 'values'"))?;

            let matrix = Matrix::from_row_major(rows, cols, values)
                .with_context(|| format!("Row {row}"))?;
            provider.add_series(times.value(row), &feature, vec![matrix]);
        }
    }

    Ok(provider)
}

// -- Parquet / Arrow helpers --

/// Extract a `Vec<f64>` from a List or LargeList column at the given row.
fn extract_f64_list(col: &Arc<dyn Array>, row: usize) -> Result<Vec<f64>> {
    if col.is_null(row) {
        bail!("null value in list column");
    }

    let values_array = match col.data_type() {
        DataType::List(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<ListArray>()
                .context("expected ListArray")?;
            list_arr.value(row)
        }
        DataType::LargeList(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<LargeListArray>()
                .context("expected LargeListArray")?;
            list_arr.value(row)
        }
        other => bail!("Expected List or LargeList column, got {other:?}"),
    };

    // The inner array can be Float64 or Float32
    if let Some(f64_arr) = values_array.as_any().downcast_ref::<Float64Array>() {
        Ok(f64_arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    } else if let Some(f32_arr) = values_array.as_any().downcast_ref::<Float32Array>() {
        Ok(f32_arr.iter().map(|v| v.unwrap_or(f32::NAN) as f64).collect())
    } else {
        bail!(
            "List inner type is {:?}, expected Float64 or Float32",
            values_array.data_type()
        )
    }
}

fn extract_string(col: &Arc<dyn Array>, row: usize) -> Result<String> {
    if col.is_null(row) {
        bail!("null feature name");
    }
    match col.data_type() {
        DataType::Utf8 => {
            let arr = col
                .as_any()
                .downcast_ref::<StringArray>()
                .context("expected StringArray")?;
            Ok(arr.value(row).to_string())
        }
        DataType::LargeUtf8 => Ok(col.as_string::<i64>().value(row).to_string()),
        other => bail!("Expected Utf8 column, got {other:?}"),
    }
}

fn extract_usize(col: &Arc<dyn Array>, row: usize) -> Result<usize> {
    if col.is_null(row) {
        bail!("null dimension");
    }
    let value = match col.data_type() {
        DataType::Int32 => col
            .as_any()
            .downcast_ref::<Int32Array>()
            .context("expected Int32Array")?
            .value(row) as i64,
        DataType::Int64 => col
            .as_any()
            .downcast_ref::<Int64Array>()
            .context("expected Int64Array")?
            .value(row),
        other => bail!("Expected Int32 or Int64 column, got {other:?}"),
    };
    usize::try_from(value).with_context(|| format!("negative dimension {value}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::DataProvider;
    use arrow::array::{Float32Builder, Float64Builder, LargeListBuilder, LargeStringArray, ListBuilder};
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    fn write_batch(path: &Path, columns: Vec<(&str, Arc<dyn Array>)>) {
        let schema = Arc::new(Schema::new(
            columns
                .iter()
                .map(|(name, col)| Field::new(*name, col.data_type().clone(), true))
                .collect::<Vec<_>>(),
        ));
        let batch = RecordBatch::try_new(schema.clone(), columns.into_iter().map(|(_, c)| c).collect()).unwrap();
        let file = std::fs::File::create(path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
    }

    fn col(array: impl Array + 'static) -> Arc<dyn Array> {
        Arc::new(array)
    }

    fn f64_lists(rows: &[&[f64]]) -> Arc<dyn Array> {
        let mut builder = ListBuilder::new(Float64Builder::new());
        for row in rows {
            builder.values().append_slice(row);
            builder.append(true);
        }
        col(builder.finish())
    }

    /// Same layout `generate_sample` writes.
    fn core_columns(rows: Vec<i64>) -> Vec<(&'static str, Arc<dyn Array>)> {
        vec![
            ("time", col(Float64Array::from(vec![5.0, 0.0, 0.0]))),
            ("feature", col(StringArray::from(vec!["power", "assemblies", "power"]))),
            ("rows", col(Int64Array::from(rows))),
            ("cols", col(Int64Array::from(vec![2, 1, 2]))),
            ("values", f64_lists(&[&[5.0, 6.0, 7.0, 8.0], &[1.0], &[1.0, 2.0, 3.0, 4.0]])),
        ]
    }

    #[test]
    fn loads_parquet_rows_as_matrices() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("core.parquet");
        write_batch(&path, core_columns(vec![2, 1, 2]));

        let p = load_file(&path).unwrap();
        assert_eq!(p.times(), vec![0.0, 5.0]);
        assert_eq!(p.data_at("assemblies").unwrap()[0][(0, 0)], 1.0);
        let power = p.data_at("power").unwrap();
        assert_eq!(power[0].shape(), (2, 2));
        assert_eq!(power[0][(1, 0)], 3.0);

        assert!(p.select_time(5.0));
        assert_eq!(p.data_at("power").unwrap()[0].elements(), &[5.0, 6.0, 7.0, 8.0]);
        assert!(p.data_at("assemblies").is_none());
    }

    #[test]
    fn parquet_negative_dimension_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.parquet");
        write_batch(&path, core_columns(vec![2, -1, 2]));
        let err = load_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("negative dimension"));
    }

    #[test]
    fn parquet_accepts_large_and_narrow_types() {
        let mut values = LargeListBuilder::new(Float32Builder::new());
        values.values().append_slice(&[0.5, 1.5]);
        values.append(true);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("narrow.pq");
        write_batch(
            &path,
            vec![
                ("time", col(Float64Array::from(vec![1.0]))),
                ("feature", col(LargeStringArray::from(vec!["power"]))),
                ("rows", col(Int32Array::from(vec![1]))),
                ("cols", col(Int32Array::from(vec![2]))),
                ("values", col(values.finish())),
            ],
        );

        let p = load_file(&path).unwrap();
        assert_eq!(p.data_at("power").unwrap()[0].elements(), &[0.5, 1.5]);
    }

    #[test]
    fn oversized_json_dimensions_are_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.json");
        std::fs::write(
            &path,
            r#"{ "steps": [{ "time": 0.0, "features": {
                "power": [{ "rows": 4294967296, "cols": 4294967296, "values": [] }]
            } }] }"#,
        )
        .unwrap();
        let err = load_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("too large"));
    }

    #[test]
    fn loads_json_steps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("core.json");
        std::fs::write(
            &path,
            r#"{
                "source": "cycle 1",
                "steps": [
                    { "time": 1.0, "features": { "power": [{ "rows": 1, "cols": 2, "values": [3.0, 4.0] }] } },
                    { "time": 0.0, "features": { "power": [{ "rows": 1, "cols": 2, "values": [1.0, 2.0] }] } }
                ]
            }"#,
        )
        .unwrap();

        let p = load_file(&path).unwrap();
        assert_eq!(p.source_description(), "cycle 1");
        assert_eq!(p.times(), vec![0.0, 1.0]);
        assert_eq!(p.data_at("power").unwrap()[0].elements(), &[1.0, 2.0]);
    }

    #[test]
    fn loads_csv_rows_as_matrices() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("core.csv");
        std::fs::write(
            &path,
            "time,feature,rows,cols,values\n\
             0.0,power,2,2,1.0;2.0;3.0;4.0\n\
             0.0,power,2,2,5.0;6.0;7.0;8.0\n\
             0.0,assemblies,1,1,1\n",
        )
        .unwrap();

        let p = load_file(&path).unwrap();
        let power = p.data_at("power").unwrap();
        assert_eq!(power.len(), 2);
        assert_eq!(power[1][(1, 0)], 7.0);
        assert_eq!(p.data_at("assemblies").unwrap()[0][(0, 0)], 1.0);
    }

    #[test]
    fn rejects_bad_shapes_and_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "time,feature,rows,cols,values\n0.0,power,2,2,1.0;2.0\n").unwrap();
        assert!(load_file(&path).is_err());
        assert!(load_file(&dir.path().join("data.xlsx")).is_err());
    }
}
