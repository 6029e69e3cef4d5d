use std::path::Path;

use anyhow::Context;

use crate::config::PipelineConfig;
use crate::data::chrono::{repair_all_day_transitions, sort_by_time, zero_base_time};
use crate::data::filter::{filter_by_stack, remove_flagged, remove_malformed};
use crate::data::loader::{read_raw_table, write_series};
use crate::data::model::{ObservationSeries, RawTable};
use crate::data::outlier::{clamp_range, reject_flux_outliers};
use crate::data::smooth::smooth;
use crate::error::Result;

// ---------------------------------------------------------------------------
// Cleaning run
// ---------------------------------------------------------------------------

/// Output of a cleaning run plus how many records each stage removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanReport {
    pub series: ObservationSeries,
    pub raw_rows: usize,
    pub flagged: usize,
    pub malformed: usize,
    pub wrong_stack: usize,
    pub day_transitions: usize,
    pub outliers: usize,
    pub clamped: usize,
    /// Records lost to averaging and gap pruning.
    pub smoothed_away: usize,
}

/// Run every cleaning stage enabled in `config`, in order:
/// flagged rows → malformed rows → parse → stack size → midnight wraps →
/// zero-base → sort → flux outliers → flux cap → smoothing.
pub fn clean_series(table: &RawTable, config: &PipelineConfig) -> Result<CleanReport> {
    let mut report = CleanReport {
        raw_rows: table.len(),
        ..Default::default()
    };

    let unflagged = remove_flagged(table);
    report.flagged = table.len() - unflagged.len();
    let well_formed = remove_malformed(&unflagged);
    report.malformed = unflagged.len() - well_formed.len();

    let mut series = well_formed.parse()?;

    if let Some(stack) = config.stack_size {
        let selected = filter_by_stack(&series, stack);
        report.wrong_stack = series.len() - selected.len();
        series = selected;
    }

    let limits = &config.day_transition;
    let (repaired, wraps) =
        repair_all_day_transitions(&series, limits.lower_limit, limits.upper_limit);
    report.day_transitions = wraps;
    series = repaired;

    if config.zero_base {
        series = zero_base_time(&series)?;
    }
    series = sort_by_time(&series)?;

    if let Some(outliers) = &config.outliers {
        let kept = reject_flux_outliers(&series, outliers.sigma)?;
        report.outliers = series.len() - kept.len();
        series = kept;
    }

    if let Some(clamp) = &config.clamp {
        let kept = clamp_range(&series, clamp.flux_cap, clamp.time_min, clamp.time_max);
        report.clamped = series.len() - kept.len();
        series = kept;
    }

    if let Some(smoothing) = &config.smoothing {
        let smoothed = smooth(&series, smoothing.threshold, smoothing.factor);
        report.smoothed_away = series.len() - smoothed.series.len();
        series = smoothed.series;
    }

    log::info!(
        "cleaned {} raw rows down to {} records",
        report.raw_rows,
        series.len()
    );
    report.series = series;
    Ok(report)
}

/// Read `input`, clean it and write the result to `output`.
pub fn clean_file(
    input: &Path,
    output: &Path,
    config: &PipelineConfig,
) -> anyhow::Result<CleanReport> {
    let table = read_raw_table(input).with_context(|| format!("reading {}", input.display()))?;
    let report =
        clean_series(&table, config).with_context(|| format!("cleaning {}", input.display()))?;
    write_series(output, &report.series)
        .with_context(|| format!("writing {}", output.display()))?;
    Ok(report)
}
