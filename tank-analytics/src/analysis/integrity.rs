//! Coverage, gap, duplicate and monthly missing-rate checks for one asset.

use std::collections::BTreeSet;

use tank_domain::domain::{DuplicateGroup, Gap, IntegritySummary, MonthlyCoverage, Reading};
use time::{Date, Duration, Month, OffsetDateTime};

use super::{expected_count, missing_pct, AnalysisSettings};

#[derive(Debug, Clone, PartialEq)]
pub struct IntegrityAssetReport {
    pub summary: IntegritySummary,
    pub gaps: Vec<Gap>,
    pub duplicates: Vec<DuplicateGroup>,
    pub monthly: Vec<MonthlyCoverage>,
}

/// Runs every integrity check over readings already restricted to the window
/// and sorted by time (see `prepare_asset`). `readings` must be non-empty.
pub fn analyze_integrity(
    asset_id: &str,
    readings: &[Reading],
    settings: &AnalysisSettings,
) -> Option<IntegrityAssetReport> {
    let timestamps: Vec<OffsetDateTime> = readings.iter().map(|r| r.timestamp).collect();
    let (&date_min, &date_max) = (timestamps.first()?, timestamps.last()?);

    let range_start = settings.window.start.unwrap_or(date_min);
    let range_end = settings.window.end.unwrap_or(date_max);
    let expected = expected_count(Some(range_start), Some(range_end), settings.freq);
    let observed = timestamps.len();

    let (duplicates, duplicate_excess) = find_duplicates(asset_id, &timestamps);
    if duplicate_excess > 0 {
        let examples: Vec<String> = duplicates
            .iter()
            .take(5)
            .map(|d| d.timestamp.to_string())
            .collect();
        tracing::info!(
            asset_id = %asset_id,
            duplicate_excess,
            examples = ?examples,
            "duplicate timestamps found"
        );
    }

    let (gaps, max_gap_minutes) = find_gaps(asset_id, &timestamps, settings.freq, settings.max_gaps);
    let monthly = monthly_coverage(asset_id, &timestamps, range_start, range_end, settings.freq);

    Some(IntegrityAssetReport {
        summary: IntegritySummary {
            asset_id: asset_id.to_string(),
            observed,
            expected,
            missing_pct: missing_pct(expected, observed),
            duplicate_excess,
            max_gap_minutes,
            date_min,
            date_max,
        },
        gaps,
        duplicates,
        monthly,
    })
}

/// Gaps between consecutive sorted timestamps wider than `freq`.
///
/// Returns the `keep` widest gaps, widest first (ties stay in time order),
/// and the widest gap in minutes over the whole series (0 when none).
pub fn find_gaps(
    asset_id: &str,
    timestamps: &[OffsetDateTime],
    freq: Duration,
    keep: usize,
) -> (Vec<Gap>, f64) {
    let step = freq.whole_nanoseconds().max(1);
    let mut gaps: Vec<Gap> = timestamps
        .windows(2)
        .filter_map(|pair| {
            let delta = pair[1] - pair[0];
            if delta <= freq {
                return None;
            }
            let slots = delta.whole_nanoseconds() / step;
            Some(Gap {
                asset_id: asset_id.to_string(),
                start: pair[0],
                end: pair[1],
                duration_minutes: delta.as_seconds_f64() / 60.0,
                missing_points_estimate: u64::try_from(slots - 1).unwrap_or(0),
            })
        })
        .collect();

    let max_gap_minutes = gaps
        .iter()
        .map(|g| g.duration_minutes)
        .fold(0.0_f64, f64::max);

    gaps.sort_by(|a, b| b.duration_minutes.total_cmp(&a.duration_minutes));
    gaps.truncate(keep);
    (gaps, max_gap_minutes)
}

/// Timestamps seen more than once, in time order, plus the total excess
/// `Σ(count - 1)`. Input must be sorted.
pub fn find_duplicates(asset_id: &str, timestamps: &[OffsetDateTime]) -> (Vec<DuplicateGroup>, usize) {
    let groups: Vec<DuplicateGroup> = timestamps
        .chunk_by(|a, b| a == b)
        .filter(|run| run.len() > 1)
        .map(|run| DuplicateGroup {
            asset_id: asset_id.to_string(),
            timestamp: run[0],
            count: run.len(),
        })
        .collect();
    let excess = groups.iter().map(|g| g.count - 1).sum();
    (groups, excess)
}

/// Missing-rate per calendar month (UTC) that holds at least one reading.
///
/// Each month is clipped to `[range_start, range_end]`; months whose clipped
/// range is inverted are dropped. `timestamps` must be sorted.
pub fn monthly_coverage(
    asset_id: &str,
    timestamps: &[OffsetDateTime],
    range_start: OffsetDateTime,
    range_end: OffsetDateTime,
    freq: Duration,
) -> Vec<MonthlyCoverage> {
    let months: BTreeSet<(i32, Month)> = timestamps.iter().map(|t| (t.year(), t.month())).collect();

    months
        .into_iter()
        .filter_map(|(year, month)| {
            let (month_start, month_end) = month_bounds(year, month)?;
            let lo = month_start.max(range_start);
            let hi = month_end.min(range_end);
            if hi < lo {
                return None;
            }

            let first = timestamps.partition_point(|t| *t < lo);
            let past_last = timestamps.partition_point(|t| *t <= hi);
            let observed = past_last.saturating_sub(first);
            let expected = expected_count(Some(lo), Some(hi), freq);

            Some(MonthlyCoverage {
                asset_id: asset_id.to_string(),
                month: format!("{year:04}-{:02}", month as u8),
                observed,
                expected,
                missing_pct: missing_pct(expected, observed),
            })
        })
        .collect()
}

/// First instant of the month and the last representable instant before the
/// next one.
fn month_bounds(year: i32, month: Month) -> Option<(OffsetDateTime, OffsetDateTime)> {
    let start = Date::from_calendar_date(year, month, 1).ok()?;
    let next_year = if month == Month::December { year + 1 } else { year };
    let next = Date::from_calendar_date(next_year, month.next(), 1).ok()?;
    Some((
        start.midnight().assume_utc(),
        next.midnight().assume_utc() - Duration::nanoseconds(1),
    ))
}
