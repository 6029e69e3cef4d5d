use super::model::{ObservationRecord, ObservationSeries, RECORD_FIELDS};

pub const DEFAULT_GAP_FACTOR: f64 = 1.025;

/// Smoothed series plus what the gap pruning did.
#[derive(Debug, Clone, PartialEq)]
pub struct Smoothed {
    pub series: ObservationSeries,
    /// Gap threshold used; `None` when there were no gaps to derive it from.
    pub threshold: Option<f64>,
    pub input_len: usize,
}

impl Smoothed {
    /// Percentage of input records that did not make it to the output.
    pub fn reduction_percent(&self) -> f64 {
        if self.input_len == 0 {
            return 0.0;
        }
        100.0 * (1.0 - self.series.len() as f64 / self.input_len as f64)
    }
}

/// Three-point moving average with gap pruning.
///
/// Every triplet `(i, i+1, i+2)` becomes one record holding the mean of each
/// numeric field. All output rows carry the filter label of the first input
/// record. The first smoothed record is always kept; smoothed record `i + 1`
/// is kept only when its gap to smoothed record `i` is at most `threshold`
/// (default `factor × mean gap`). Gaps are taken between neighbouring smoothed
/// records, whether or not the earlier one was kept.
pub fn smooth(series: &ObservationSeries, threshold: Option<f64>, factor: f64) -> Smoothed {
    let input_len = series.len();
    if input_len < 3 {
        log::info!("smooth: {input_len} records, nothing to average");
        return Smoothed {
            series: ObservationSeries::default(),
            threshold,
            input_len,
        };
    }

    let filter = series.records[0].filter.clone();
    let averaged: Vec<ObservationRecord> = series
        .records
        .windows(3)
        .map(|w| {
            let (a, b, c) = (w[0].numeric_fields(), w[1].numeric_fields(), w[2].numeric_fields());
            let mut mean = [0.0; RECORD_FIELDS - 1];
            for (k, m) in mean.iter_mut().enumerate() {
                *m = (a[k] + b[k] + c[k]) / 3.0;
            }
            ObservationRecord::from_numeric_fields(mean, filter.clone())
        })
        .collect();

    let gaps: Vec<f64> = averaged.windows(2).map(|p| p[1].time - p[0].time).collect();
    let threshold = threshold.or_else(|| {
        (!gaps.is_empty()).then(|| factor * gaps.iter().sum::<f64>() / gaps.len() as f64)
    });
    if let Some(t) = threshold {
        log::info!("smooth: gap threshold {t:.2} ({:.1}% of mean spacing)", 100.0 * factor);
    }

    let mut kept = Vec::with_capacity(averaged.len());
    kept.push(averaged[0].clone());
    if let Some(limit) = threshold {
        for (gap, rec) in gaps.iter().zip(&averaged[1..]) {
            if *gap <= limit {
                kept.push(rec.clone());
            }
        }
    }

    let out = Smoothed {
        series: ObservationSeries::from_records(kept),
        threshold,
        input_len,
    };
    log::info!(
        "smooth: {} input records, {} kept, reduction of {:.0}%",
        input_len,
        out.series.len(),
        out.reduction_percent()
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::{record, series};
    use approx::assert_relative_eq;

    #[test]
    fn test_even_spacing_yields_n_minus_two() {
        let s = series(&(0..10).map(|i| (i as f64, 100.0 + i as f64)).collect::<Vec<_>>());
        let out = smooth(&s, None, DEFAULT_GAP_FACTOR);
        assert_eq!(out.series.len(), 8);
        assert_relative_eq!(out.threshold.unwrap(), 1.025);
        assert_eq!(out.series.records[0].time, 1.0);
        assert_eq!(out.series.records[0].flux, 101.0);
    }

    #[test]
    fn test_fewer_than_three_records() {
        for n in 0..3 {
            let s = series(&(0..n).map(|i| (i as f64, 1.0)).collect::<Vec<_>>());
            assert!(smooth(&s, None, DEFAULT_GAP_FACTOR).series.is_empty());
        }
    }

    #[test]
    fn test_single_triplet_has_no_threshold() {
        let s = series(&[(0.0, 3.0), (1.0, 6.0), (2.0, 9.0)]);
        let out = smooth(&s, None, DEFAULT_GAP_FACTOR);
        assert_eq!(out.series.len(), 1);
        assert_eq!(out.threshold, None);
        assert_eq!(out.series.records[0].flux, 6.0);
    }

    #[test]
    fn test_filter_copied_from_first_record() {
        let mut recs: Vec<_> = (0..5).map(|i| record(i as f64, 1.0)).collect();
        for (i, r) in recs.iter_mut().enumerate() {
            r.filter = format!("F{i}");
        }
        let input: ObservationSeries = recs.into_iter().collect();
        let out = smooth(&input, None, DEFAULT_GAP_FACTOR);
        assert!(out.series.iter().all(|r| r.filter == "F0"));
    }

    #[test]
    fn test_gap_drops_record_without_bridging() {
        // Smoothed times: 1, 2, 12, 13, 14 -> gaps 1, 10, 1, 1
        let times = [0.0, 1.0, 2.0, 3.0, 31.0, 5.0, 6.0];
        let s = series(&times.iter().map(|&t| (t, 1.0)).collect::<Vec<_>>());
        let out = smooth(&s, Some(2.0), DEFAULT_GAP_FACTOR);
        assert_eq!(out.series.times(), vec![1.0, 2.0, 13.0, 14.0]);
        assert_relative_eq!(out.reduction_percent(), 100.0 * (1.0 - 4.0 / 7.0));
    }
}
