use time::OffsetDateTime;

use super::Signal;

/// A detected refill: a local minimum of the smoothed percent level followed
/// by a qualifying rise to a later local maximum.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RechargeEvent {
    pub asset_id: String,
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub start_time: OffsetDateTime,
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub end_time: OffsetDateTime,
    pub duration_minutes: f64,
    pub level_start: f64,
    pub level_end: f64,
    pub amplitude: f64,
}

/// Fit of absolute level against percent level. `None` fields are unavailable
/// (zero variance on either side).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CorrelationSummary {
    pub asset_id: String,
    pub pearson_r: Option<f64>,
    pub slope: Option<f64>,
    pub intercept: Option<f64>,
    pub r2: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ScatterPoint {
    pub asset_id: String,
    pub level_percent: f64,
    pub level_absolute: f64,
}

/// Descriptive statistics of one signal for one asset. Every `Option` is
/// `None` when the signal has no valid values.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SignalStats {
    pub asset_id: String,
    pub signal: Signal,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub std_dev: Option<f64>,
    pub total_count: usize,
    pub valid_count: usize,
    pub missing_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PercentileValue {
    pub asset_id: String,
    pub signal: Signal,
    /// `P<rank>`, e.g. `P50`.
    pub percentile: String,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct HistogramBin {
    pub asset_id: String,
    pub signal: Signal,
    pub bin_left: f64,
    pub bin_right: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TankSummary {
    pub asset_id: String,
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub date_min: OffsetDateTime,
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub date_max: OffsetDateTime,
    pub readings: usize,
    pub recharge_events: usize,
}
