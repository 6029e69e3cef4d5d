use super::model::ObservationSeries;
use crate::error::{PipelineError, Result};

pub const DEFAULT_SIGMA: f64 = 3.0;
pub const DEFAULT_FLUX_CAP: f64 = 100_000.0;
pub const DEFAULT_TIME_MIN: f64 = 0.0;
pub const DEFAULT_TIME_MAX: f64 = 100_000.0;

/// Sample mean and Bessel-corrected standard deviation.
fn mean_stdev(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, var.sqrt())
}

/// Sigma-clip on successive flux differences.
///
/// Record `i + 1` survives when `flux[i + 1] - flux[i]` lies strictly inside
/// `mean ± sigma·stdev` of all differences. The first record always survives.
/// This catches abrupt jumps, not absolute flux extremes.
pub fn reject_flux_outliers(series: &ObservationSeries, sigma: f64) -> Result<ObservationSeries> {
    if series.len() < 3 {
        return Err(PipelineError::InsufficientData {
            needed: 3,
            found: series.len(),
            context: "flux outlier rejection",
        });
    }

    let diffs: Vec<f64> = series
        .records
        .windows(2)
        .map(|pair| pair[1].flux - pair[0].flux)
        .collect();
    let (mean, stdev) = mean_stdev(&diffs);
    let lower = mean - sigma * stdev;
    let upper = mean + sigma * stdev;

    let mut kept = Vec::with_capacity(series.len());
    kept.push(series.records[0].clone());
    let mut rejected = 0usize;
    for (d, rec) in diffs.iter().zip(&series.records[1..]) {
        // Zero spread: every difference equals the mean.
        if stdev == 0.0 || (*d > lower && *d < upper) {
            kept.push(rec.clone());
        } else {
            log::debug!("rejecting t = {} (flux jump {d})", rec.time);
            rejected += 1;
        }
    }

    log::info!("flux outliers: rejected {rejected} of {} records", series.len());
    Ok(ObservationSeries::from_records(kept))
}

/// Drop records with `flux >= flux_cap` inside `[time_min, time_max]`.
/// Records outside the window pass through untouched.
pub fn clamp_range(
    series: &ObservationSeries,
    flux_cap: f64,
    time_min: f64,
    time_max: f64,
) -> ObservationSeries {
    let kept: ObservationSeries = series
        .iter()
        .filter(|r| r.time < time_min || r.time > time_max || r.flux < flux_cap)
        .cloned()
        .collect();
    log::info!(
        "flux cap {flux_cap}: dropped {} of {} records",
        series.len() - kept.len(),
        series.len()
    );
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::series;
    use approx::assert_relative_eq;

    #[test]
    fn test_jump_into_spike_is_rejected() {
        let s = series(&[(0.0, 10.0), (1.0, 10.0), (2.0, 10.0), (3.0, 100.0)]);
        let kept = reject_flux_outliers(&s, 1.0).unwrap();
        assert_eq!(kept.times(), vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_constant_flux_keeps_everything() {
        let s = series(&[(0.0, 7.0), (1.0, 7.0), (2.0, 7.0), (3.0, 7.0)]);
        let kept = reject_flux_outliers(&s, 3.0).unwrap();
        assert_eq!(kept.len(), 4);
    }

    #[test]
    fn test_first_record_always_kept() {
        // Large opening drop, then a steady ramp.
        let mut points = vec![(0.0, 1000.0)];
        points.extend((1..20).map(|i| (i as f64, 10.0 + i as f64)));
        let kept = reject_flux_outliers(&series(&points), 2.0).unwrap();
        assert_eq!(kept.records[0].time, 0.0);
        assert_eq!(kept.records[0].flux, 1000.0);
        // The drop into t=1 is the only outlier.
        assert_eq!(kept.len(), 19);
        assert!(!kept.times().contains(&1.0));
    }

    #[test]
    fn test_too_few_records() {
        let s = series(&[(0.0, 1.0), (1.0, 2.0)]);
        assert!(matches!(
            reject_flux_outliers(&s, 3.0),
            Err(PipelineError::InsufficientData { found: 2, .. })
        ));
    }

    #[test]
    fn test_mean_stdev_bessel() {
        let (m, s) = mean_stdev(&[0.0, 0.0, 90.0]);
        assert_relative_eq!(m, 30.0);
        assert_relative_eq!(s, 2700.0_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_clamp_only_filters_inside_window() {
        let s = series(&[(-5.0, 1e6), (10.0, 1e6), (20.0, 50.0), (200.0, 1e6)]);
        let kept = clamp_range(&s, 1000.0, 0.0, 100.0);
        assert_eq!(kept.times(), vec![-5.0, 20.0, 200.0]);
    }

    #[test]
    fn test_clamp_cap_is_exclusive() {
        let s = series(&[(1.0, 1000.0), (2.0, 999.9)]);
        let kept = clamp_range(&s, 1000.0, DEFAULT_TIME_MIN, DEFAULT_TIME_MAX);
        assert_eq!(kept.times(), vec![2.0]);
    }
}
