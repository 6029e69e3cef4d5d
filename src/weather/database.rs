use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::data::loader::{load_series, tab_reader, tab_writer};
use crate::data::model::{format_value, ObservationSeries};
use crate::error::{PipelineError, Result};

/// Line written between two alternate sources in a database file.
pub const ALT_SEPARATOR: &str = "ALT_CHANGE";

/// Any first field containing this marks a separator line when reading.
const SEPARATOR_TOKEN: &str = "ALT";

const DB_FIELDS: [&str; 5] = ["time", "centroid_x", "centroid_y", "flux", "factor"];

// ---------------------------------------------------------------------------
// AlternateSourceSeries – one reference star's brightness profile
// ---------------------------------------------------------------------------

/// One sample of an alternate source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlternatePoint {
    pub time: f64,
    pub x: f64,
    pub y: f64,
    pub flux: f64,
    /// `max(flux over the series) / flux`.
    pub factor: f64,
}

/// Brightness-variation profile of a reference source, in time order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlternateSourceSeries {
    pub points: Vec<AlternatePoint>,
}

impl AlternateSourceSeries {
    /// Derive weather factors from an observed series.
    pub fn from_series(series: &ObservationSeries) -> Result<Self> {
        let peak = series
            .iter()
            .map(|r| r.flux)
            .fold(f64::NEG_INFINITY, f64::max);

        let points = series
            .iter()
            .map(|r| {
                if r.flux == 0.0 {
                    return Err(PipelineError::InvalidFactor {
                        time: r.time,
                        flux: r.flux,
                    });
                }
                Ok(AlternatePoint {
                    time: r.time,
                    x: r.centroid_x,
                    y: r.centroid_y,
                    flux: r.flux,
                    factor: peak / r.flux,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(AlternateSourceSeries { points })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Index of the first point that is earlier than its predecessor.
    fn first_unsorted(&self) -> Option<usize> {
        self.points
            .windows(2)
            .position(|p| p[1].time < p[0].time)
            .map(|i| i + 1)
    }
}

// ---------------------------------------------------------------------------
// WeatherDatabase
// ---------------------------------------------------------------------------

/// Read-only collection of alternate sources used for weather correction.
///
/// Built once; queries only take `&self`, so one database can serve any
/// number of corrections, including from several threads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherDatabase {
    alternates: Vec<AlternateSourceSeries>,
}

impl WeatherDatabase {
    /// Every alternate must be in chronological order.
    pub fn new(alternates: Vec<AlternateSourceSeries>) -> Result<Self> {
        for (series, alt) in alternates.iter().enumerate() {
            if let Some(index) = alt.first_unsorted() {
                return Err(PipelineError::UnsortedAlternate { series, index });
            }
        }
        Ok(WeatherDatabase { alternates })
    }

    pub fn alternates(&self) -> &[AlternateSourceSeries] {
        &self.alternates
    }

    pub fn len(&self) -> usize {
        self.alternates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alternates.is_empty()
    }
}

/// Build a database from already-cleaned alternate series, keeping input order.
pub fn build_weather_database(sources: &[ObservationSeries]) -> Result<WeatherDatabase> {
    let alternates = sources
        .iter()
        .enumerate()
        .map(|(i, s)| {
            if s.is_empty() {
                log::warn!("alternate source {i} has no records");
            }
            AlternateSourceSeries::from_series(s)
        })
        .collect::<Result<Vec<_>>>()?;
    log::info!("built weather database from {} alternate sources", alternates.len());
    WeatherDatabase::new(alternates)
}

/// Load each record file and build the database from them.
pub fn build_weather_database_from_paths(paths: &[PathBuf]) -> Result<WeatherDatabase> {
    let sources = paths
        .iter()
        .map(|p| load_series(p))
        .collect::<Result<Vec<_>>>()?;
    build_weather_database(&sources)
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

pub fn write_database(path: &Path, db: &WeatherDatabase) -> Result<()> {
    write_database_to(File::create(path)?, db)
}

/// Five columns per point, [`ALT_SEPARATOR`] between sources (not after the last).
pub fn write_database_to<W: Write>(wtr: W, db: &WeatherDatabase) -> Result<()> {
    let mut writer = tab_writer(wtr);
    for (i, alt) in db.alternates.iter().enumerate() {
        if i > 0 {
            writer.write_record([ALT_SEPARATOR])?;
        }
        for p in &alt.points {
            writer.write_record([p.time, p.x, p.y, p.flux, p.factor].map(format_value))?;
        }
    }
    writer.flush()?;
    Ok(())
}

pub fn read_database(path: &Path) -> Result<WeatherDatabase> {
    read_database_from(File::open(path)?)
}

pub fn read_database_from<R: Read>(rdr: R) -> Result<WeatherDatabase> {
    let mut reader = tab_reader(rdr);
    let mut alternates = Vec::new();
    let mut current = AlternateSourceSeries::default();
    let mut saw_rows = false;

    for (idx, result) in reader.records().enumerate() {
        let record = result?;
        saw_rows = true;
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(idx + 1);

        if record.get(0).is_some_and(|f| f.contains(SEPARATOR_TOKEN)) {
            alternates.push(std::mem::take(&mut current));
            continue;
        }

        let mut values = [0.0; 5];
        for (k, slot) in values.iter_mut().enumerate() {
            let raw = record.get(k).unwrap_or("").trim();
            *slot = raw.parse().map_err(|_| PipelineError::MalformedInput {
                line,
                field: DB_FIELDS[k],
                value: raw.to_string(),
            })?;
        }
        let [time, x, y, flux, factor] = values;
        current.points.push(AlternatePoint {
            time,
            x,
            y,
            flux,
            factor,
        });
    }
    if saw_rows {
        alternates.push(current);
    }

    log::info!("{} alternate sources found in the database", alternates.len());
    WeatherDatabase::new(alternates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::series;
    use approx::assert_relative_eq;

    #[test]
    fn test_factors_are_peak_over_flux() {
        let db = build_weather_database(&[series(&[(0.0, 50.0), (5.0, 100.0)])]).unwrap();
        let factors: Vec<f64> = db.alternates()[0].points.iter().map(|p| p.factor).collect();
        assert_eq!(factors, vec![2.0, 1.0]);
    }

    #[test]
    fn test_zero_flux_is_rejected() {
        let err = build_weather_database(&[series(&[(0.0, 50.0), (1.0, 0.0)])]).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidFactor { time, .. } if time == 1.0));
    }

    #[test]
    fn test_unsorted_alternate_is_rejected() {
        let err = build_weather_database(&[
            series(&[(0.0, 1.0), (1.0, 1.0)]),
            series(&[(0.0, 1.0), (2.0, 1.0), (1.0, 1.0)]),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::UnsortedAlternate { series: 1, index: 2 }
        ));
    }

    #[test]
    fn test_persisted_layout_and_reload() {
        let db = build_weather_database(&[
            series(&[(0.0, 50.0), (1.0, 100.0)]),
            series(&[(0.5, 40.0), (1.5, 80.0), (2.5, 60.0)]),
        ])
        .unwrap();

        let mut buf = Vec::new();
        write_database_to(&mut buf, &db).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "0\t10\t20\t50\t2");
        assert_eq!(lines[2], ALT_SEPARATOR);
        assert!(!text.trim_end().ends_with(ALT_SEPARATOR));

        let back = read_database_from(buf.as_slice()).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back.alternates()[1].len(), 3);
        assert_relative_eq!(back.alternates()[1].points[2].factor, 80.0 / 60.0);
    }

    #[test]
    fn test_read_rejects_bad_numbers() {
        let err = read_database_from("0\t1\t2\tbright\t1\n".as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MalformedInput { line: 1, field: "flux", .. }
        ));
    }
}
