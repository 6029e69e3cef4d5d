use super::database::{AlternatePoint, AlternateSourceSeries, WeatherDatabase};
use crate::data::model::{ObservationRecord, ObservationSeries};
use crate::error::{PipelineError, Result};

/// Widest alternate sampling gap (s) that is still interpolated across.
pub const DEFAULT_GAP_THRESHOLD: f64 = 3.0;

/// How factors from several alternates are combined for one timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Weighting {
    /// Arithmetic mean.
    #[default]
    Uniform,
    /// Weights of 1 / (centroid distance to the alternate).
    InverseDistance,
}

impl Weighting {
    pub fn from_flag(weighted: bool) -> Self {
        if weighted {
            Weighting::InverseDistance
        } else {
            Weighting::Uniform
        }
    }
}

/// One alternate's interpolated factor at a target timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contribution {
    pub factor: f64,
    /// Distance from the target centroid to the bracket's midpoint centroid.
    pub distance: f64,
}

impl AlternateSourceSeries {
    /// The samples `(a, b)` with `a.time <= t < b.time`.
    pub fn bracket(&self, t: f64) -> Option<(&AlternatePoint, &AlternatePoint)> {
        let idx = self.points.partition_point(|p| p.time <= t);
        if idx == 0 || idx == self.points.len() {
            return None;
        }
        Some((&self.points[idx - 1], &self.points[idx]))
    }
}

/// Straight line through the two samples, evaluated at `t`. Exact at `a.time`.
fn interpolate(a: &AlternatePoint, b: &AlternatePoint, t: f64) -> f64 {
    let frac = (t - a.time) / (b.time - a.time);
    a.factor + frac * (b.factor - a.factor)
}

/// Factors from every alternate that brackets the record's time with a gap
/// no wider than `gap_threshold`.
pub fn contributions(
    db: &WeatherDatabase,
    record: &ObservationRecord,
    gap_threshold: f64,
) -> Vec<Contribution> {
    db.alternates()
        .iter()
        .filter_map(|alt| alt.bracket(record.time))
        .filter(|(a, b)| b.time - a.time <= gap_threshold)
        .map(|(a, b)| {
            let mid_x = (a.x + b.x) / 2.0;
            let mid_y = (a.y + b.y) / 2.0;
            Contribution {
                factor: interpolate(a, b, record.time),
                distance: (record.centroid_x - mid_x).hypot(record.centroid_y - mid_y),
            }
        })
        .collect()
}

/// Combine contributions into one factor. `None` if there are none.
///
/// Inverse-distance weighting is undefined for an alternate at distance zero;
/// when any contribution sits exactly on the target, the mean of those
/// coincident factors is used instead.
pub fn aggregate(contribs: &[Contribution], weighting: Weighting) -> Option<f64> {
    if contribs.is_empty() {
        return None;
    }
    let mean = |cs: &[&Contribution]| cs.iter().map(|c| c.factor).sum::<f64>() / cs.len() as f64;

    match weighting {
        Weighting::Uniform => Some(mean(&contribs.iter().collect::<Vec<_>>())),
        Weighting::InverseDistance => {
            let coincident: Vec<&Contribution> =
                contribs.iter().filter(|c| c.distance == 0.0).collect();
            if !coincident.is_empty() {
                return Some(mean(&coincident));
            }
            let total: f64 = contribs.iter().map(|c| 1.0 / c.distance).sum();
            Some(
                contribs
                    .iter()
                    .map(|c| (1.0 / c.distance) / total * c.factor)
                    .sum(),
            )
        }
    }
}

/// Aggregated weather factor for a single record.
pub fn factor_at(
    db: &WeatherDatabase,
    record: &ObservationRecord,
    weighting: Weighting,
    gap_threshold: f64,
) -> Result<f64> {
    aggregate(&contributions(db, record, gap_threshold), weighting)
        .ok_or(PipelineError::NoFactorAvailable { time: record.time })
}

/// Multiply each record's flux and flux error by the weather factor at its
/// time. Records no alternate can vouch for are dropped, not passed through.
pub fn correct_weather(
    db: &WeatherDatabase,
    target: &ObservationSeries,
    weighting: Weighting,
    gap_threshold: f64,
) -> Result<ObservationSeries> {
    if db.is_empty() {
        return Err(PipelineError::InsufficientData {
            needed: 1,
            found: 0,
            context: "weather database alternates",
        });
    }

    let mut corrected = Vec::with_capacity(target.len());
    let mut dropped = 0usize;
    for rec in target {
        match factor_at(db, rec, weighting, gap_threshold) {
            Ok(factor) => {
                let mut out = rec.clone();
                out.flux *= factor;
                out.flux_error *= factor;
                corrected.push(out);
            }
            Err(PipelineError::NoFactorAvailable { time }) => {
                log::debug!("no weather factor at t = {time}, dropping record");
                dropped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    log::info!(
        "weather correction ({weighting:?}): {} corrected, {dropped} dropped without a factor",
        corrected.len()
    );
    Ok(ObservationSeries::from_records(corrected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::{record, series};
    use crate::weather::database::build_weather_database;
    use approx::assert_relative_eq;

    fn alt_at(points: &[(f64, f64)], x: f64, y: f64) -> ObservationSeries {
        points
            .iter()
            .map(|&(t, f)| {
                let mut r = record(t, f);
                r.centroid_x = x;
                r.centroid_y = y;
                r
            })
            .collect()
    }

    #[test]
    fn test_midpoint_interpolation() {
        let db = build_weather_database(&[series(&[(0.0, 50.0), (5.0, 100.0)])]).unwrap();
        let target = series(&[(2.5, 10.0)]);
        let out = correct_weather(&db, &target, Weighting::Uniform, 10.0).unwrap();
        assert_eq!(out.len(), 1);
        assert_relative_eq!(out.records[0].flux, 15.0);
        assert_relative_eq!(out.records[0].flux_error, 1.5);
        assert_eq!(out.records[0].magnitude, target.records[0].magnitude);
    }

    #[test]
    fn test_exact_at_sample_time() {
        let alt = series(&[(0.0, 30.0), (1.0, 70.0), (2.0, 100.0)]);
        let db = build_weather_database(&[alt]).unwrap();
        let f =
            factor_at(&db, &record(1.0, 1.0), Weighting::Uniform, DEFAULT_GAP_THRESHOLD).unwrap();
        assert_eq!(f, 100.0 / 70.0);
    }

    #[test]
    fn test_wide_gap_and_out_of_range_drop_records() {
        let alt = series(&[(0.0, 50.0), (5.0, 100.0), (6.0, 100.0)]);
        let db = build_weather_database(&[alt]).unwrap();
        // 2.5 falls in a 5 s gap, 6.0 is the last sample (no upper bracket), -1 is before.
        let target = series(&[(-1.0, 1.0), (2.5, 1.0), (5.5, 1.0), (6.0, 1.0)]);
        let out = correct_weather(&db, &target, Weighting::Uniform, DEFAULT_GAP_THRESHOLD).unwrap();
        assert_eq!(out.times(), vec![5.5]);
        assert!(matches!(
            factor_at(&db, &record(2.5, 1.0), Weighting::Uniform, DEFAULT_GAP_THRESHOLD),
            Err(PipelineError::NoFactorAvailable { .. })
        ));
    }

    #[test]
    fn test_uniform_mean_of_alternates() {
        let db = build_weather_database(&[
            series(&[(0.0, 50.0), (2.0, 50.0)]),  // factor 1
            series(&[(0.0, 100.0), (2.0, 50.0)]), // factor 1 -> 2
        ])
        .unwrap();
        let f =
            factor_at(&db, &record(1.0, 1.0), Weighting::Uniform, DEFAULT_GAP_THRESHOLD).unwrap();
        assert_relative_eq!(f, (1.0 + 1.5) / 2.0);
    }

    #[test]
    fn test_inverse_distance_weighting() {
        // Target centroid is (10, 20); alternates 1 and 3 px away.
        let db = build_weather_database(&[
            alt_at(&[(0.0, 100.0), (2.0, 100.0)], 11.0, 20.0), // factor 1
            alt_at(&[(0.0, 50.0), (2.0, 50.0)], 10.0, 23.0),   // factor 1
        ])
        .unwrap();
        let contribs = contributions(&db, &record(1.0, 1.0), DEFAULT_GAP_THRESHOLD);
        assert_eq!(contribs.len(), 2);
        assert_relative_eq!(contribs[0].distance, 1.0);
        assert_relative_eq!(contribs[1].distance, 3.0);

        let weighted = aggregate(
            &[
                Contribution { factor: 2.0, distance: 1.0 },
                Contribution { factor: 4.0, distance: 3.0 },
            ],
            Weighting::InverseDistance,
        )
        .unwrap();
        // weights 1 and 1/3 -> (2 + 4/3) / (4/3)
        assert_relative_eq!(weighted, 2.5, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_distance_uses_coincident_alternates() {
        let f = aggregate(
            &[
                Contribution { factor: 2.0, distance: 0.0 },
                Contribution { factor: 9.0, distance: 1.0 },
            ],
            Weighting::InverseDistance,
        )
        .unwrap();
        assert_eq!(f, 2.0);
    }

    #[test]
    fn test_empty_database_is_an_error() {
        let db = WeatherDatabase::default();
        assert!(matches!(
            correct_weather(&db, &series(&[(0.0, 1.0)]), Weighting::Uniform, 3.0),
            Err(PipelineError::InsufficientData { .. })
        ));
    }
}
