use serde::Deserialize;
use std::{fs, path::PathBuf};
use time::Duration;

use crate::analysis::{recharge::RechargeThresholds, AnalysisSettings, AnalysisWindow};
use crate::normalize::timestamp::{is_bare_date, parse_datetime_text};

pub const CONFIG_ENV_VAR: &str = "TANK_ANALYTICS_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "tank-analytics.toml";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("freq_minutes must be at least 1, got {0}")]
    InvalidInterval(i64),
    #[error("invalid {field} '{value}'")]
    InvalidDate { field: &'static str, value: String },
    #[error("{0} must be at least 1")]
    InvalidBinCount(&'static str),
    #[error("percentile rank {0} is outside 0..=100")]
    InvalidPercentile(u8),
    #[error("percentile list is empty")]
    EmptyPercentiles,
    #[error("{0} must be a finite, non-negative number")]
    InvalidThreshold(&'static str),
    #[error("pipeline.workers must be at least 1")]
    InvalidWorkers,
    #[error("pipeline.channel_capacity must be at least 1")]
    InvalidChannelCapacity,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub freq_minutes: i64,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub asset_filter: Option<String>,
    pub min_amplitude_pct: f64,
    pub min_duration_min: f64,
    pub percentiles: Vec<u8>,
    pub level_histogram_bins: usize,
    pub amplitude_histogram_bins: usize,
    pub max_gaps: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            freq_minutes: 1,
            start_date: None,
            end_date: None,
            asset_filter: None,
            min_amplitude_pct: 10.0,
            min_duration_min: 30.0,
            percentiles: vec![1, 5, 10, 25, 50, 75, 90, 95, 99],
            level_histogram_bins: 20,
            amplitude_histogram_bins: 10,
            max_gaps: 10,
        }
    }
}

impl AnalysisConfig {
    /// Checks every knob and resolves the filter window. Must succeed before
    /// any reading is analyzed.
    pub fn validate(&self) -> Result<AnalysisSettings, ConfigError> {
        if self.freq_minutes < 1 {
            return Err(ConfigError::InvalidInterval(self.freq_minutes));
        }
        let freq = Duration::minutes(self.freq_minutes);

        if self.level_histogram_bins == 0 {
            return Err(ConfigError::InvalidBinCount("level_histogram_bins"));
        }
        if self.amplitude_histogram_bins == 0 {
            return Err(ConfigError::InvalidBinCount("amplitude_histogram_bins"));
        }
        if self.percentiles.is_empty() {
            return Err(ConfigError::EmptyPercentiles);
        }
        if let Some(bad) = self.percentiles.iter().find(|p| **p > 100) {
            return Err(ConfigError::InvalidPercentile(*bad));
        }
        for (name, value) in [
            ("min_amplitude_pct", self.min_amplitude_pct),
            ("min_duration_min", self.min_duration_min),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidThreshold(name));
            }
        }

        let start = parse_bound("start_date", self.start_date.as_deref(), false, freq)?;
        let end = parse_bound("end_date", self.end_date.as_deref(), true, freq)?;

        let asset_filter = self
            .asset_filter
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_lowercase);

        Ok(AnalysisSettings {
            freq,
            window: AnalysisWindow { start, end },
            asset_filter,
            recharge: RechargeThresholds {
                min_amplitude_pct: self.min_amplitude_pct,
                min_duration_min: self.min_duration_min,
            },
            percentiles: self.percentiles.clone(),
            level_histogram_bins: self.level_histogram_bins,
            amplitude_histogram_bins: self.amplitude_histogram_bins,
            max_gaps: self.max_gaps,
        })
    }
}

/// A bare `YYYY-MM-DD` end date covers the whole day, up to the last
/// expected sample slot.
fn parse_bound(
    field: &'static str,
    text: Option<&str>,
    is_end: bool,
    freq: Duration,
) -> Result<Option<time::OffsetDateTime>, ConfigError> {
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    let parsed = parse_datetime_text(text).ok_or_else(|| ConfigError::InvalidDate {
        field,
        value: text.to_string(),
    })?;
    if is_end && is_bare_date(text) {
        Ok(Some(parsed + Duration::days(1) - freq))
    } else {
        Ok(Some(parsed))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub workers: usize,
    pub channel_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            channel_capacity: 1024,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::InvalidWorkers);
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::InvalidChannelCapacity);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub output_dir: PathBuf,
    pub group: Option<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("reports"),
            group: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub analysis: AnalysisConfig,
    pub pipeline: PipelineConfig,
    pub report: ReportConfig,
}

impl AppConfig {
    /// Loads the TOML file named by `TANK_ANALYTICS_CONFIG`, falling back to
    /// `tank-analytics.toml`. Only the implicit default path may be absent.
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let cfg = match env::var(CONFIG_ENV_VAR) {
            Ok(path) => Self::from_path(&path)?,
            Err(_) if fs::metadata(DEFAULT_CONFIG_PATH).is_ok() => Self::from_path(DEFAULT_CONFIG_PATH)?,
            Err(_) => {
                tracing::info!("no config file found, using built-in defaults");
                Self::default()
            }
        };
        Ok(cfg)
    }

    pub fn from_path(path: &str) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config '{path}': {e}"))?;
        let cfg: AppConfig = toml::from_str(&contents)?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn defaults_validate() {
        let settings = AnalysisConfig::default().validate().unwrap();
        assert_eq!(settings.freq, Duration::minutes(1));
        assert_eq!(settings.window, AnalysisWindow::default());
        assert_eq!(settings.recharge.min_amplitude_pct, 10.0);
        assert_eq!(settings.recharge.min_duration_min, 30.0);
        assert_eq!(settings.max_gaps, 10);
    }

    #[test]
    fn zero_interval_is_fatal() {
        let cfg = AnalysisConfig {
            freq_minutes: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidInterval(0))));
    }

    #[test]
    fn bare_end_date_extends_to_last_slot_of_the_day() {
        let cfg = AnalysisConfig {
            freq_minutes: 15,
            start_date: Some("2024-01-10".to_string()),
            end_date: Some("2024-02-20".to_string()),
            ..Default::default()
        };
        let settings = cfg.validate().unwrap();
        assert_eq!(settings.window.start, Some(datetime!(2024-01-10 00:00:00 UTC)));
        assert_eq!(settings.window.end, Some(datetime!(2024-02-20 23:45:00 UTC)));
    }

    #[test]
    fn explicit_end_time_is_kept_as_is() {
        let cfg = AnalysisConfig {
            end_date: Some("2024-02-20 12:30:00".to_string()),
            ..Default::default()
        };
        let settings = cfg.validate().unwrap();
        assert_eq!(settings.window.end, Some(datetime!(2024-02-20 12:30:00 UTC)));
    }

    #[test]
    fn inverted_window_is_not_a_config_error() {
        let cfg = AnalysisConfig {
            start_date: Some("2024-03-01".to_string()),
            end_date: Some("2024-02-01".to_string()),
            ..Default::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn unparseable_date_is_rejected() {
        let cfg = AnalysisConfig {
            start_date: Some("yesterday".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidDate { field: "start_date", .. })
        ));
    }

    #[test]
    fn zero_workers_fail_pipeline_validation_from_any_config_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tank.toml");
        fs::write(&path, "[pipeline]\nworkers = 0\n").unwrap();

        let cfg = AppConfig::from_path(path.to_str().unwrap()).unwrap();

        assert!(matches!(cfg.pipeline.validate(), Err(ConfigError::InvalidWorkers)));
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_channel_capacity_is_rejected() {
        let cfg = PipelineConfig {
            channel_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidChannelCapacity)));
    }

    #[test]
    fn toml_sections_override_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [analysis]
            freq_minutes = 5
            asset_filter = " Norte "
            percentiles = [50]

            [pipeline]
            workers = 2
            "#,
        )
        .unwrap();

        assert_eq!(cfg.analysis.freq_minutes, 5);
        assert_eq!(cfg.analysis.min_amplitude_pct, 10.0);
        assert_eq!(cfg.pipeline.workers, 2);
        assert_eq!(cfg.pipeline.channel_capacity, 1024);
        assert_eq!(cfg.report.output_dir, PathBuf::from("reports"));

        let settings = cfg.analysis.validate().unwrap();
        assert_eq!(settings.asset_filter.as_deref(), Some("norte"));
        assert_eq!(settings.percentiles, vec![50]);
    }
}
