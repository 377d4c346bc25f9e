//! Behavioural view of one tank: level statistics, recharge events and the
//! percent/absolute correlation.

use tank_domain::domain::{
    HistogramBin, PercentileValue, Reading, RechargeEvent, Signal, SignalStats, TankSummary,
};

use super::{
    correlation::{fit_levels, CorrelationFit},
    recharge::detect_recharge_events,
    stats::{describe, histogram, percentiles},
    AnalysisSettings,
};

#[derive(Debug, Clone, PartialEq)]
pub struct TankAssetReport {
    pub summary: TankSummary,
    pub stats: Vec<SignalStats>,
    pub percentiles: Vec<PercentileValue>,
    pub histograms: Vec<HistogramBin>,
    pub recharge_events: Vec<RechargeEvent>,
    pub amplitude_histogram: Vec<HistogramBin>,
    pub correlation: Option<CorrelationFit>,
}

impl TankAssetReport {
    pub fn has_percent_level(&self) -> bool {
        self.stats
            .iter()
            .any(|s| s.signal == Signal::LevelPercent && s.valid_count > 0)
    }
}

/// Expects readings already restricted to the window and sorted by time.
pub fn analyze_tank(
    asset_id: &str,
    readings: &[Reading],
    settings: &AnalysisSettings,
) -> Option<TankAssetReport> {
    let date_min = readings.first()?.timestamp;
    let date_max = readings.last()?.timestamp;

    let mut stats = Vec::with_capacity(Signal::LEVELS.len());
    let mut percentile_rows = Vec::new();
    let mut histograms = Vec::new();
    for signal in Signal::LEVELS {
        let samples: Vec<Option<f64>> = readings.iter().map(|r| r.level(signal)).collect();
        let valid: Vec<f64> = samples.iter().flatten().copied().collect();

        stats.push(describe(asset_id, signal, &samples));
        percentile_rows.extend(percentiles(asset_id, signal, &valid, &settings.percentiles));
        histograms.extend(histogram(asset_id, signal, &valid, settings.level_histogram_bins));
    }

    let recharge_events = detect_recharge_events(asset_id, readings, &settings.recharge);
    let amplitudes: Vec<f64> = recharge_events.iter().map(|e| e.amplitude).collect();
    let amplitude_histogram = histogram(
        asset_id,
        Signal::RechargeAmplitude,
        &amplitudes,
        settings.amplitude_histogram_bins,
    );

    let correlation = fit_levels(asset_id, readings);
    if correlation.is_none() {
        tracing::debug!(asset_id = %asset_id, "fewer than two paired levels, correlation unavailable");
    }

    Some(TankAssetReport {
        summary: TankSummary {
            asset_id: asset_id.to_string(),
            date_min,
            date_max,
            readings: readings.len(),
            recharge_events: recharge_events.len(),
        },
        stats,
        percentiles: percentile_rows,
        histograms,
        recharge_events,
        amplitude_histogram,
        correlation,
    })
}
