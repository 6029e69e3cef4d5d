use std::fmt;

use crate::error::{PipelineError, Result};

/// Number of fields in a well-formed observation row.
pub const RECORD_FIELDS: usize = 13;

/// Column names in file order, used in parse errors.
pub const FIELD_NAMES: [&str; RECORD_FIELDS] = [
    "stack_size",
    "exposure_mean",
    "exposure_stdev",
    "time",
    "time_stdev",
    "centroid_x",
    "centroid_y",
    "pixel_area",
    "flux",
    "flux_error",
    "magnitude",
    "magnitude_error",
    "filter",
];

// ---------------------------------------------------------------------------
// RawRow / RawTable – rows as read, before any numeric parsing
// ---------------------------------------------------------------------------

/// One line of a record file split on tabs.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// 1-based line number in the source file.
    pub line: usize,
    pub fields: Vec<String>,
}

impl RawRow {
    pub fn new(line: usize, fields: Vec<String>) -> Self {
        RawRow { line, fields }
    }

    /// Whether any part of the raw line contains `token`.
    pub fn contains(&self, token: &str) -> bool {
        self.fields.iter().any(|f| f.contains(token))
    }
}

/// A whole record file in raw form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub rows: Vec<RawRow>,
}

impl RawTable {
    pub fn from_rows(rows: Vec<RawRow>) -> Self {
        RawTable { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Parse every row into an [`ObservationRecord`].
    ///
    /// The first unparseable numeric field aborts the whole table. Callers are
    /// expected to run the cleaning filters first.
    pub fn parse(&self) -> Result<ObservationSeries> {
        let records = self
            .rows
            .iter()
            .map(ObservationRecord::from_raw)
            .collect::<Result<Vec<_>>>()?;
        Ok(ObservationSeries::from_records(records))
    }
}

// ---------------------------------------------------------------------------
// ObservationRecord – one exposure measurement
// ---------------------------------------------------------------------------

/// A single photometric measurement (one row of a record file).
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRecord {
    /// Number of exposures combined into this measurement.
    pub stack_size: f64,
    /// Mean exposure time (ms).
    pub exposure_mean: f64,
    /// Exposure time spread (ms).
    pub exposure_stdev: f64,
    /// Observation clock time (s).
    pub time: f64,
    pub time_stdev: f64,
    /// Centroid position (pixels).
    pub centroid_x: f64,
    pub centroid_y: f64,
    pub pixel_area: f64,
    /// Photon count.
    pub flux: f64,
    pub flux_error: f64,
    pub magnitude: f64,
    pub magnitude_error: f64,
    /// Opaque filter label, never interpreted numerically.
    pub filter: String,
}

impl ObservationRecord {
    /// Parse a raw row. Only the first 13 fields are read; a trailing empty
    /// 14th field left by a trailing tab is ignored.
    pub fn from_raw(row: &RawRow) -> Result<Self> {
        if row.fields.len() < RECORD_FIELDS {
            return Err(PipelineError::MalformedInput {
                line: row.line,
                field: FIELD_NAMES[row.fields.len()],
                value: String::new(),
            });
        }

        let num = |idx: usize| -> Result<f64> {
            let raw = row.fields[idx].trim();
            raw.parse::<f64>()
                .map_err(|_| PipelineError::MalformedInput {
                    line: row.line,
                    field: FIELD_NAMES[idx],
                    value: raw.to_string(),
                })
        };

        Ok(ObservationRecord {
            stack_size: num(0)?,
            exposure_mean: num(1)?,
            exposure_stdev: num(2)?,
            time: num(3)?,
            time_stdev: num(4)?,
            centroid_x: num(5)?,
            centroid_y: num(6)?,
            pixel_area: num(7)?,
            flux: num(8)?,
            flux_error: num(9)?,
            magnitude: num(10)?,
            magnitude_error: num(11)?,
            filter: row.fields[12].trim_end().to_string(),
        })
    }

    /// The numeric fields in file order (everything except `filter`).
    pub fn numeric_fields(&self) -> [f64; RECORD_FIELDS - 1] {
        [
            self.stack_size,
            self.exposure_mean,
            self.exposure_stdev,
            self.time,
            self.time_stdev,
            self.centroid_x,
            self.centroid_y,
            self.pixel_area,
            self.flux,
            self.flux_error,
            self.magnitude,
            self.magnitude_error,
        ]
    }

    /// Inverse of [`numeric_fields`](Self::numeric_fields).
    pub fn from_numeric_fields(values: [f64; RECORD_FIELDS - 1], filter: String) -> Self {
        let [
            stack_size,
            exposure_mean,
            exposure_stdev,
            time,
            time_stdev,
            centroid_x,
            centroid_y,
            pixel_area,
            flux,
            flux_error,
            magnitude,
            magnitude_error,
        ] = values;
        ObservationRecord {
            stack_size,
            exposure_mean,
            exposure_stdev,
            time,
            time_stdev,
            centroid_x,
            centroid_y,
            pixel_area,
            flux,
            flux_error,
            magnitude,
            magnitude_error,
            filter,
        }
    }

    /// Serialise to the 13 output fields.
    pub fn to_fields(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .numeric_fields()
            .iter()
            .map(|v| format_value(*v))
            .collect();
        out.push(self.filter.clone());
        out
    }
}

impl fmt::Display for ObservationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_fields().join("\t"))
    }
}

/// The single numeric formatting rule for every file this crate writes:
/// Rust's shortest round-trip `Display` for `f64`.
pub fn format_value(v: f64) -> String {
    format!("{v}")
}

// ---------------------------------------------------------------------------
// ObservationSeries – one light curve
// ---------------------------------------------------------------------------

/// An ordered sequence of records.
///
/// Stages never mutate a series in place; each one returns a new series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationSeries {
    pub records: Vec<ObservationRecord>,
}

impl ObservationSeries {
    pub fn from_records(records: Vec<ObservationRecord>) -> Self {
        ObservationSeries { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ObservationRecord> {
        self.records.iter()
    }

    pub fn times(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.time).collect()
    }

    pub fn fluxes(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.flux).collect()
    }
}

impl FromIterator<ObservationRecord> for ObservationSeries {
    fn from_iter<I: IntoIterator<Item = ObservationRecord>>(iter: I) -> Self {
        ObservationSeries::from_records(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ObservationSeries {
    type Item = &'a ObservationRecord;
    type IntoIter = std::slice::Iter<'a, ObservationRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
