//! Weather correction against alternate (reference) sources.
//!
//! Sources observed on the same frames share atmospheric and instrumental
//! variations. Each alternate source's flux, normalised to its own peak,
//! gives a multiplicative factor over time; the corrector interpolates those
//! factors at the target's timestamps and scales the target's flux by them.

pub mod corrector;
pub mod database;

pub use corrector::{correct_weather, Weighting};
pub use database::{build_weather_database, WeatherDatabase};
