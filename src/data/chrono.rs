//! Timestamp normalisation: day-transition repair, zero-basing and sorting.
//!
//! The observation clock wraps at local midnight. Zero-basing and sorting
//! both refuse to run on data that still contains a wrap, because shifting or
//! reordering it would silently scramble the night.

use super::model::ObservationSeries;
use crate::error::{PipelineError, Result};

/// Seconds in a day; added to every record after a midnight wrap.
pub const SECONDS_PER_DAY: f64 = 86400.0;

/// Consecutive records further apart than this indicate an unrepaired wrap.
pub const DAY_TRANSITION_JUMP: f64 = 85000.0;

pub const DEFAULT_LOWER_LIMIT: f64 = 200.0;
pub const DEFAULT_UPPER_LIMIT: f64 = 86000.0;

/// Result of one [`repair_day_transition`] pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Repair {
    pub series: ObservationSeries,
    /// Index of the first record after midnight, if a wrap was found.
    pub transition: Option<usize>,
}

/// Fail with [`PipelineError::DayTransition`] if two consecutive records (in
/// file order) are more than [`DAY_TRANSITION_JUMP`] seconds apart.
pub fn check_day_transition(series: &ObservationSeries) -> Result<()> {
    for (i, pair) in series.records.windows(2).enumerate() {
        if (pair[1].time - pair[0].time).abs() > DAY_TRANSITION_JUMP {
            return Err(PipelineError::DayTransition {
                index: i + 1,
                previous: pair[0].time,
                current: pair[1].time,
            });
        }
    }
    Ok(())
}

/// Shift every timestamp so the first record sits at t = 0.
pub fn zero_base_time(series: &ObservationSeries) -> Result<ObservationSeries> {
    check_day_transition(series)?;
    let Some(first) = series.records.first() else {
        return Ok(ObservationSeries::default());
    };
    let t0 = first.time;
    Ok(series
        .iter()
        .map(|r| {
            let mut r = r.clone();
            r.time -= t0;
            r
        })
        .collect())
}

/// Repair the first midnight wrap: a record later than `upper_limit`
/// followed by one earlier than `lower_limit`. That later record and every
/// record after it gain [`SECONDS_PER_DAY`].
///
/// Only one wrap is repaired per call; see [`repair_all_day_transitions`].
pub fn repair_day_transition(
    series: &ObservationSeries,
    lower_limit: f64,
    upper_limit: f64,
) -> Repair {
    let transition = series
        .records
        .windows(2)
        .position(|pair| pair[0].time > upper_limit && pair[1].time < lower_limit)
        .map(|i| i + 1);

    let Some(start) = transition else {
        log::info!("no day transition found in {} records", series.len());
        return Repair {
            series: series.clone(),
            transition: None,
        };
    };

    log::info!("day transition at record {start}, shifting {} records", series.len() - start);
    let repaired = series
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let mut r = r.clone();
            if i >= start {
                r.time += SECONDS_PER_DAY;
            }
            r
        })
        .collect();

    Repair {
        series: repaired,
        transition: Some(start),
    }
}

/// Apply [`repair_day_transition`] until no wrap is left. Returns the
/// repaired series and the number of wraps fixed.
///
/// After `k` repairs every later wrap has already been shifted by `k` days,
/// so the limits move with it.
pub fn repair_all_day_transitions(
    series: &ObservationSeries,
    lower_limit: f64,
    upper_limit: f64,
) -> (ObservationSeries, usize) {
    let mut current = series.clone();
    let mut repaired = 0;
    for _ in 0..series.len() {
        let offset = repaired as f64 * SECONDS_PER_DAY;
        let pass = repair_day_transition(&current, lower_limit + offset, upper_limit + offset);
        current = pass.series;
        if pass.transition.is_none() {
            break;
        }
        repaired += 1;
    }
    (current, repaired)
}

/// Stable ascending sort by time. Equal timestamps keep file order.
pub fn sort_by_time(series: &ObservationSeries) -> Result<ObservationSeries> {
    check_day_transition(series)?;
    let mut records = series.records.clone();
    records.sort_by(|a, b| a.time.total_cmp(&b.time));
    Ok(ObservationSeries::from_records(records))
}
