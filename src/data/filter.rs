use super::model::{ObservationSeries, RawTable, RECORD_FIELDS};

/// Marker the extraction pipeline writes into rows where no source was found.
pub const NO_SOURCE_MARKER: &str = "SOURCE";

/// Absolute tolerance when matching stack sizes that went through a text
/// round trip.
pub const STACK_TOLERANCE: f64 = 1e-4;

// ---------------------------------------------------------------------------
// Row-level cleaning (raw text)
// ---------------------------------------------------------------------------

/// Drop every row whose raw content carries the no-source marker.
pub fn remove_flagged(table: &RawTable) -> RawTable {
    let rows: Vec<_> = table
        .rows
        .iter()
        .filter(|row| !row.contains(NO_SOURCE_MARKER))
        .cloned()
        .collect();
    log::debug!(
        "remove_flagged: dropped {} of {} rows",
        table.len() - rows.len(),
        table.len()
    );
    RawTable::from_rows(rows)
}

/// Keep rows with 13 fields, or 14 when a trailing tab added an extra one.
pub fn remove_malformed(table: &RawTable) -> RawTable {
    let rows: Vec<_> = table
        .rows
        .iter()
        .filter(|row| (RECORD_FIELDS..=RECORD_FIELDS + 1).contains(&row.fields.len()))
        .cloned()
        .collect();
    log::debug!(
        "remove_malformed: dropped {} of {} rows",
        table.len() - rows.len(),
        table.len()
    );
    RawTable::from_rows(rows)
}

// ---------------------------------------------------------------------------
// Record-level selection
// ---------------------------------------------------------------------------

/// Keep records taken with the requested stack size.
pub fn filter_by_stack(series: &ObservationSeries, stack_size: f64) -> ObservationSeries {
    series
        .iter()
        .filter(|r| (r.stack_size - stack_size).abs() < STACK_TOLERANCE)
        .cloned()
        .collect()
}
