/// Data layer: record model, file I/O and the per-series cleaning stages.
///
/// Architecture:
/// ```text
///   record file (13 tab-separated fields)
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  read rows → RawTable
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  drop flagged / malformed rows, select stack size
///   └──────────┘
///        │  RawTable::parse → ObservationSeries
///        ▼
///   ┌──────────┐
///   │  chrono   │  repair midnight wraps, zero-base, sort
///   └──────────┘
///        │
///        ▼
///   ┌────────────────────┐
///   │  outlier / smooth   │  sigma-clip jumps, flux cap, 3-point average
///   └────────────────────┘
/// ```

pub mod chrono;
pub mod filter;
pub mod loader;
pub mod model;
pub mod outlier;
pub mod smooth;
