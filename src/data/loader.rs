use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};

use super::model::{ObservationSeries, RawRow, RawTable};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Tab-separated readers / writers shared by record and database files
// ---------------------------------------------------------------------------

/// Reader for tab-delimited rows: no header, no quoting, ragged rows allowed
/// so that malformed lines survive until the cleaning filters see them.
pub(crate) fn tab_reader<R: Read>(rdr: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(rdr)
}

pub(crate) fn tab_writer<W: Write>(wtr: W) -> csv::Writer<W> {
    WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quote_style(QuoteStyle::Never)
        .from_writer(wtr)
}

// ---------------------------------------------------------------------------
// Record files
// ---------------------------------------------------------------------------

/// Read a record file into raw rows without interpreting any field.
///
/// Bytes that are not valid UTF-8 are replaced rather than rejected; the
/// cleaning filters decide what happens to such rows.
pub fn read_raw_table(path: &Path) -> Result<RawTable> {
    let file = File::open(path)?;
    read_raw_table_from(file)
}

pub fn read_raw_table_from<R: Read>(rdr: R) -> Result<RawTable> {
    let mut reader = tab_reader(rdr);
    let mut rows = Vec::new();

    for (idx, result) in reader.byte_records().enumerate() {
        let record = result?;
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(idx + 1);
        let fields = record
            .iter()
            .map(|f| String::from_utf8_lossy(f).into_owned())
            .collect();
        rows.push(RawRow::new(line, fields));
    }

    log::debug!("read {} raw rows", rows.len());
    Ok(RawTable::from_rows(rows))
}

/// Read and strictly parse a record file. Use this for files that already
/// went through the cleaning filters.
pub fn load_series(path: &Path) -> Result<ObservationSeries> {
    read_raw_table(path)?.parse()
}

/// Write a series as a record file (13 fields per row, no trailing tab).
pub fn write_series(path: &Path, series: &ObservationSeries) -> Result<()> {
    let file = File::create(path)?;
    write_series_to(file, series)
}

pub fn write_series_to<W: Write>(wtr: W, series: &ObservationSeries) -> Result<()> {
    let mut writer = tab_writer(wtr);
    for rec in series {
        writer.write_record(rec.to_fields())?;
    }
    writer.flush()?;
    Ok(())
}

/// Write raw rows back out unchanged (after row-level cleaning).
pub fn write_raw_table(path: &Path, table: &RawTable) -> Result<()> {
    let mut writer = tab_writer(File::create(path)?);
    for row in &table.rows {
        writer.write_record(&row.fields)?;
    }
    writer.flush()?;
    Ok(())
}
