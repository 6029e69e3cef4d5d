use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::chrono::{DEFAULT_LOWER_LIMIT, DEFAULT_UPPER_LIMIT};
use crate::data::outlier::{DEFAULT_FLUX_CAP, DEFAULT_SIGMA, DEFAULT_TIME_MAX, DEFAULT_TIME_MIN};
use crate::data::smooth::DEFAULT_GAP_FACTOR;
use crate::weather::corrector::DEFAULT_GAP_THRESHOLD;

// ---------------------------------------------------------------------------
// Pipeline configuration
// ---------------------------------------------------------------------------

/// Settings for every stage, loaded from JSON. Missing keys take defaults;
/// unknown keys are an error.
///
/// ```json
/// {
///   "stack_size": 4,
///   "outliers": { "sigma": 2.5 },
///   "smoothing": { "factor": 1.05 },
///   "weather": { "weighted": true }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Keep only records with this stack size.
    pub stack_size: Option<f64>,
    pub day_transition: DayTransitionConfig,
    /// Shift the first record to t = 0 after repairing wraps.
    pub zero_base: bool,
    /// `null` disables outlier rejection.
    pub outliers: Option<OutlierConfig>,
    pub clamp: Option<ClampConfig>,
    pub smoothing: Option<SmoothingConfig>,
    pub weather: WeatherConfig,
    pub relative: RelativeConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stack_size: None,
            day_transition: DayTransitionConfig::default(),
            zero_base: true,
            outliers: Some(OutlierConfig::default()),
            clamp: None,
            smoothing: None,
            weather: WeatherConfig::default(),
            relative: RelativeConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DayTransitionConfig {
    pub lower_limit: f64,
    pub upper_limit: f64,
}

impl Default for DayTransitionConfig {
    fn default() -> Self {
        Self {
            lower_limit: DEFAULT_LOWER_LIMIT,
            upper_limit: DEFAULT_UPPER_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutlierConfig {
    pub sigma: f64,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self { sigma: DEFAULT_SIGMA }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClampConfig {
    pub flux_cap: f64,
    pub time_min: f64,
    pub time_max: f64,
}

impl Default for ClampConfig {
    fn default() -> Self {
        Self {
            flux_cap: DEFAULT_FLUX_CAP,
            time_min: DEFAULT_TIME_MIN,
            time_max: DEFAULT_TIME_MAX,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SmoothingConfig {
    /// Fixed gap threshold; derived from the mean gap when absent.
    pub threshold: Option<f64>,
    pub factor: f64,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            threshold: None,
            factor: DEFAULT_GAP_FACTOR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WeatherConfig {
    pub weighted: bool,
    pub gap_threshold: f64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            weighted: false,
            gap_threshold: DEFAULT_GAP_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelativeConfig {
    pub threshold: f64,
}

impl Default for RelativeConfig {
    fn default() -> Self {
        Self { threshold: 1.0 }
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("parsing JSON")
    }

    /// Layer command-line flags over the loaded file. A sigma turns outlier
    /// rejection on even when the file disabled it; `smooth` only enables
    /// smoothing, it never replaces a configured section.
    pub fn apply_overrides(&mut self, stack: Option<f64>, sigma: Option<f64>, smooth: bool) {
        if stack.is_some() {
            self.stack_size = stack;
        }
        if let Some(sigma) = sigma {
            self.outliers.get_or_insert_with(Default::default).sigma = sigma;
        }
        if smooth && self.smoothing.is_none() {
            self.smoothing = Some(SmoothingConfig::default());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_gives_defaults() {
        let cfg = PipelineConfig::from_json("{}").unwrap();
        assert_eq!(cfg, PipelineConfig::default());
        assert_eq!(cfg.outliers.unwrap().sigma, 3.0);
        assert_eq!(cfg.weather.gap_threshold, 3.0);
        assert!(cfg.zero_base);
    }

    #[test]
    fn test_partial_sections() {
        let cfg = PipelineConfig::from_json(
            r#"{ "stack_size": 4, "outliers": null, "smoothing": { "factor": 1.1 } }"#,
        )
        .unwrap();
        assert_eq!(cfg.stack_size, Some(4.0));
        assert!(cfg.outliers.is_none());
        let smoothing = cfg.smoothing.unwrap();
        assert_eq!(smoothing.factor, 1.1);
        assert_eq!(smoothing.threshold, None);
    }

    #[test]
    fn test_overrides_layer_over_file() {
        let mut cfg = PipelineConfig::from_json(
            r#"{ "stack_size": 2, "outliers": null, "smoothing": { "factor": 1.1 } }"#,
        )
        .unwrap();
        cfg.apply_overrides(None, Some(2.5), true);
        assert_eq!(cfg.stack_size, Some(2.0));
        assert_eq!(cfg.outliers, Some(OutlierConfig { sigma: 2.5 }));
        assert_eq!(cfg.smoothing.as_ref().map(|s| s.factor), Some(1.1));

        cfg.apply_overrides(Some(4.0), None, false);
        assert_eq!(cfg.stack_size, Some(4.0));
        assert_eq!(cfg.outliers.map(|o| o.sigma), Some(2.5));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(PipelineConfig::from_json(r#"{ "sigma": 2 }"#).is_err());
    }
}
