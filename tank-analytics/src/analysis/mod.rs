//! Per-asset computations over an already-loaded batch of readings.
//!
//! Everything here is synchronous and pure: one asset's readings in, row sets
//! out. Parallelism across assets is the caller's business.

pub mod correlation;
pub mod integrity;
pub mod recharge;
pub mod stats;
pub mod tank;

use tank_domain::domain::Reading;
use time::{Duration, OffsetDateTime};

use recharge::RechargeThresholds;

/// Optional inclusive `[start, end]` restriction on reading timestamps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalysisWindow {
    pub start: Option<OffsetDateTime>,
    pub end: Option<OffsetDateTime>,
}

impl AnalysisWindow {
    pub fn contains(&self, ts: OffsetDateTime) -> bool {
        self.start.map_or(true, |s| ts >= s) && self.end.map_or(true, |e| ts <= e)
    }
}

/// Validated analysis knobs, built by `AnalysisConfig::validate`.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSettings {
    pub freq: Duration,
    pub window: AnalysisWindow,
    /// Lowercased substring an asset id must contain.
    pub asset_filter: Option<String>,
    pub recharge: RechargeThresholds,
    pub percentiles: Vec<u8>,
    pub level_histogram_bins: usize,
    pub amplitude_histogram_bins: usize,
    pub max_gaps: usize,
}

impl AnalysisSettings {
    pub fn accepts_asset(&self, asset_id: &str) -> bool {
        match &self.asset_filter {
            Some(f) => asset_id.to_lowercase().contains(f.as_str()),
            None => true,
        }
    }
}

/// Number of sample slots in `[start, end]` at cadence `freq`.
///
/// `floor((end - start) / freq) + 1`, or 0 when a bound is missing, the range
/// is inverted, or `freq` is not positive.
pub fn expected_count(
    start: Option<OffsetDateTime>,
    end: Option<OffsetDateTime>,
    freq: Duration,
) -> u64 {
    let (Some(start), Some(end)) = (start, end) else {
        return 0;
    };
    let step = freq.whole_nanoseconds();
    if end < start || step <= 0 {
        return 0;
    }
    let span = (end - start).whole_nanoseconds();
    u64::try_from(span / step).map_or(u64::MAX, |n| n.saturating_add(1))
}

/// `max(expected - observed, 0) / expected * 100`, or 0 for an empty model.
pub fn missing_pct(expected: u64, observed: usize) -> f64 {
    if expected == 0 {
        return 0.0;
    }
    let missing = expected.saturating_sub(observed as u64);
    missing as f64 / expected as f64 * 100.0
}

/// Sorts an asset's readings by time and keeps those inside the window.
///
/// Returns `None`, with a warning, when nothing survives; such an asset must
/// not appear in any output.
pub fn prepare_asset(
    asset_id: &str,
    mut readings: Vec<Reading>,
    window: &AnalysisWindow,
) -> Option<Vec<Reading>> {
    readings.retain(|r| window.contains(r.timestamp));
    if readings.is_empty() {
        tracing::warn!(asset_id = %asset_id, "asset has no readings in the analysis window, skipping");
        metrics::counter!("analysis_assets_skipped_total").increment(1);
        return None;
    }
    readings.sort_by_key(|r| r.timestamp);
    Some(readings)
}

#[cfg(test)]
pub(crate) mod test_support {
    use tank_domain::domain::Reading;
    use time::{Duration, OffsetDateTime};

    /// Readings at `start + i * step` carrying the given percent levels.
    pub fn percent_series(
        asset_id: &str,
        start: OffsetDateTime,
        step: Duration,
        levels: &[f64],
    ) -> Vec<Reading> {
        levels
            .iter()
            .enumerate()
            .map(|(i, level)| Reading {
                timestamp: start + step * i as i32,
                asset_id: asset_id.to_string(),
                level_percent: Some(*level),
                level_absolute: None,
            })
            .collect()
    }

    pub fn at(asset_id: &str, timestamp: OffsetDateTime) -> Reading {
        Reading {
            timestamp,
            asset_id: asset_id.to_string(),
            level_percent: None,
            level_absolute: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::at;
    use super::*;
    use time::macros::datetime;

    #[test]
    fn expected_count_counts_both_endpoints() {
        let start = datetime!(2024-01-01 00:00:00 UTC);
        let end = datetime!(2024-01-01 01:00:00 UTC);
        assert_eq!(expected_count(Some(start), Some(end), Duration::minutes(1)), 61);
        assert_eq!(expected_count(Some(start), Some(end), Duration::minutes(15)), 5);
        assert_eq!(expected_count(Some(start), Some(start), Duration::minutes(15)), 1);
    }

    #[test]
    fn expected_count_floors_partial_slots() {
        let start = datetime!(2024-01-01 00:00:00 UTC);
        let end = datetime!(2024-01-01 00:59:59 UTC);
        assert_eq!(expected_count(Some(start), Some(end), Duration::minutes(15)), 4);
    }

    #[test]
    fn expected_count_is_zero_for_inverted_or_open_ranges() {
        let start = datetime!(2024-01-02 00:00:00 UTC);
        let end = datetime!(2024-01-01 00:00:00 UTC);
        assert_eq!(expected_count(Some(start), Some(end), Duration::minutes(1)), 0);
        assert_eq!(expected_count(None, Some(end), Duration::minutes(1)), 0);
        assert_eq!(expected_count(Some(start), None, Duration::minutes(1)), 0);
    }

    #[test]
    fn missing_pct_never_goes_negative() {
        assert_eq!(missing_pct(0, 5), 0.0);
        assert_eq!(missing_pct(4, 6), 0.0);
        assert_eq!(missing_pct(4, 3), 25.0);
    }

    #[test]
    fn prepare_asset_filters_inclusively_and_sorts() {
        let window = AnalysisWindow {
            start: Some(datetime!(2024-01-01 00:01:00 UTC)),
            end: Some(datetime!(2024-01-01 00:03:00 UTC)),
        };
        let readings = vec![
            at("t1", datetime!(2024-01-01 00:03:00 UTC)),
            at("t1", datetime!(2024-01-01 00:00:00 UTC)),
            at("t1", datetime!(2024-01-01 00:01:00 UTC)),
            at("t1", datetime!(2024-01-01 00:04:00 UTC)),
        ];
        let kept = prepare_asset("t1", readings, &window).unwrap();
        let times: Vec<_> = kept.iter().map(|r| r.timestamp).collect();
        assert_eq!(
            times,
            vec![
                datetime!(2024-01-01 00:01:00 UTC),
                datetime!(2024-01-01 00:03:00 UTC)
            ]
        );
    }

    #[test]
    fn prepare_asset_skips_assets_outside_the_window() {
        let window = AnalysisWindow {
            start: Some(datetime!(2025-01-01 00:00:00 UTC)),
            end: None,
        };
        let readings = vec![at("t1", datetime!(2024-01-01 00:00:00 UTC))];
        assert!(prepare_asset("t1", readings, &window).is_none());
    }
}
