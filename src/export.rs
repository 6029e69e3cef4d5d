use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use serde::{Deserialize, Serialize};

use crate::data::model::ObservationSeries;
use crate::error::{PipelineError, Result};

const COLUMNS: [&str; 4] = ["time", "time_error", "flux", "flux_error"];

// ---------------------------------------------------------------------------
// LightCurveArrays – what spectral analysis and plotting consume
// ---------------------------------------------------------------------------

/// Column arrays handed to the periodogram and plotting tools.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LightCurveArrays {
    pub time: Vec<f64>,
    pub time_error: Vec<f64>,
    pub flux: Vec<f64>,
    pub flux_error: Vec<f64>,
}

impl LightCurveArrays {
    pub fn from_series(series: &ObservationSeries) -> Self {
        let mut arrays = LightCurveArrays::default();
        for r in series {
            arrays.time.push(r.time);
            arrays.time_error.push(r.time_stdev);
            arrays.flux.push(r.flux);
            arrays.flux_error.push(r.flux_error);
        }
        arrays
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    fn columns(&self) -> [&Vec<f64>; 4] {
        [&self.time, &self.time_error, &self.flux, &self.flux_error]
    }
}

// ---------------------------------------------------------------------------
// Writers
// ---------------------------------------------------------------------------

/// Write arrays for a collaborator. Dispatch by extension:
/// * `.parquet` / `.pq` – four `Float64` columns
/// * `.json`            – `{ "time": [...], "time_error": [...], ... }`
pub fn write_arrays(path: &Path, arrays: &LightCurveArrays) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "parquet" | "pq" => write_parquet(path, arrays),
        "json" => write_json(path, arrays),
        other => Err(PipelineError::UnsupportedFormat {
            extension: other.to_string(),
        }),
    }
}

fn schema() -> Arc<Schema> {
    Arc::new(Schema::new(
        COLUMNS
            .iter()
            .map(|name| Field::new(*name, DataType::Float64, false))
            .collect::<Vec<_>>(),
    ))
}

pub fn write_parquet(path: &Path, arrays: &LightCurveArrays) -> Result<()> {
    let schema = schema();
    let columns: Vec<ArrayRef> = arrays
        .columns()
        .into_iter()
        .map(|col| Arc::new(Float64Array::from(col.clone())) as ArrayRef)
        .collect();
    let batch = RecordBatch::try_new(schema.clone(), columns)?;

    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    log::info!("wrote {} points to {}", arrays.len(), path.display());
    Ok(())
}

pub fn write_json(path: &Path, arrays: &LightCurveArrays) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, arrays)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Readers
// ---------------------------------------------------------------------------

pub fn read_json_arrays(path: &Path) -> Result<LightCurveArrays> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Read back a Parquet file written by [`write_parquet`] (or any file with
/// the same four `Float64` columns). Nulls read as NaN.
pub fn read_parquet_arrays(path: &Path) -> Result<LightCurveArrays> {
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut arrays = LightCurveArrays::default();
    for batch_result in reader {
        let batch = batch_result?;
        let schema = batch.schema();
        for name in COLUMNS {
            let idx = schema.index_of(name)?;
            let col = batch
                .column(idx)
                .as_any()
                .downcast_ref::<Float64Array>()
                .ok_or_else(|| {
                    ArrowError::SchemaError(format!("column '{name}' is not Float64"))
                })?;
            let target = match name {
                "time" => &mut arrays.time,
                "time_error" => &mut arrays.time_error,
                "flux" => &mut arrays.flux,
                _ => &mut arrays.flux_error,
            };
            target.extend(col.iter().map(|v| v.unwrap_or(f64::NAN)));
        }
    }
    Ok(arrays)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::series;
    use tempfile::TempDir;

    #[test]
    fn test_arrays_follow_series_order() {
        let arrays = LightCurveArrays::from_series(&series(&[(0.0, 5.0), (2.0, 7.0)]));
        assert_eq!(arrays.time, vec![0.0, 2.0]);
        assert_eq!(arrays.flux, vec![5.0, 7.0]);
        assert_eq!(arrays.time_error, vec![0.01, 0.01]);
        assert_eq!(arrays.flux_error, vec![1.0, 1.0]);
    }

    #[test]
    fn test_parquet_and_json_files() {
        let temp_dir = TempDir::new().unwrap();
        let arrays = LightCurveArrays::from_series(&series(&[(0.0, 5.0), (2.0, 7.0), (4.0, 6.5)]));

        let pq = temp_dir.path().join("curve.parquet");
        write_arrays(&pq, &arrays).unwrap();
        assert_eq!(read_parquet_arrays(&pq).unwrap(), arrays);

        let js = temp_dir.path().join("curve.json");
        write_arrays(&js, &arrays).unwrap();
        assert_eq!(read_json_arrays(&js).unwrap(), arrays);
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("curve.png");
        match write_arrays(&path, &LightCurveArrays::default()) {
            Err(PipelineError::UnsupportedFormat { extension }) => assert_eq!(extension, "png"),
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }
        assert!(!path.exists());
    }
}
