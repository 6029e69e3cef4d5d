//! Light-curve cleaning for photometric time series.
//!
//! Raw per-exposure measurements go through row cleaning, timestamp
//! normalisation, outlier rejection and smoothing ([`data`]), weather
//! correction against reference sources ([`weather`]) and relative
//! photometry ([`photometry`]). The result is handed to spectral analysis
//! and plotting tools as plain arrays ([`export`]).

pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod photometry;
pub mod pipeline;
pub mod weather;

pub use error::{PipelineError, Result};
