//! Recharge (refill) detection on the percent-level signal.
//!
//! The signal is smoothed with a centered rolling median, local extrema are
//! located on the smoothed values, and each minimum is paired with the next
//! unused maximum after it. A maximum is consumed by the first minimum that
//! reaches it, whether or not that pair qualifies as an event, and the scan
//! never looks back: minima left over once the maxima run out stay unmatched.

use tank_domain::domain::{Reading, RechargeEvent};
use time::OffsetDateTime;

pub const SMOOTHING_WINDOW: usize = 5;
const MIN_POINTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RechargeThresholds {
    pub min_amplitude_pct: f64,
    pub min_duration_min: f64,
}

impl Default for RechargeThresholds {
    fn default() -> Self {
        Self {
            min_amplitude_pct: 10.0,
            min_duration_min: 30.0,
        }
    }
}

impl RechargeThresholds {
    fn accepts(&self, amplitude: f64, duration_minutes: f64) -> bool {
        amplitude >= self.min_amplitude_pct && duration_minutes >= self.min_duration_min
    }
}

/// Extracts recharge events from one asset's readings.
///
/// Readings without a percent level are ignored; fewer than three remaining
/// points yield no events.
pub fn detect_recharge_events(
    asset_id: &str,
    readings: &[Reading],
    thresholds: &RechargeThresholds,
) -> Vec<RechargeEvent> {
    let mut points: Vec<(OffsetDateTime, f64)> = readings
        .iter()
        .filter_map(|r| r.level_percent.map(|level| (r.timestamp, level)))
        .collect();
    if points.len() < MIN_POINTS {
        return Vec::new();
    }
    points.sort_by_key(|(ts, _)| *ts);

    let times: Vec<OffsetDateTime> = points.iter().map(|(ts, _)| *ts).collect();
    let raw: Vec<f64> = points.iter().map(|(_, level)| *level).collect();
    let smoothed = rolling_median(&raw, SMOOTHING_WINDOW);

    pair_extrema(asset_id, &times, &smoothed, thresholds)
}

/// Centered rolling median; the window shrinks at both ends instead of
/// producing missing values.
pub fn rolling_median(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let before = window / 2;
    let after = window - 1 - before;
    let mut scratch = Vec::with_capacity(window);

    (0..values.len())
        .map(|i| {
            let lo = i.saturating_sub(before);
            let hi = (i + after).min(values.len() - 1);
            scratch.clear();
            scratch.extend_from_slice(&values[lo..=hi]);
            scratch.sort_by(f64::total_cmp);
            let mid = scratch.len() / 2;
            if scratch.len() % 2 == 0 {
                (scratch[mid - 1] + scratch[mid]) / 2.0
            } else {
                scratch[mid]
            }
        })
        .collect()
}

/// Interior local minima and maxima, in index order.
///
/// A minimum needs a strict drop into it and a non-strict rise out of it
/// (`v[i-1] > v[i] <= v[i+1]`), so a flat bottom is flagged once, at its
/// first sample. Maxima mirror that rule.
pub fn find_extrema(values: &[f64]) -> (Vec<usize>, Vec<usize>) {
    let mut minima = Vec::new();
    let mut maxima = Vec::new();
    for i in 1..values.len().saturating_sub(1) {
        let (prev, cur, next) = (values[i - 1], values[i], values[i + 1]);
        if prev > cur && cur <= next {
            minima.push(i);
        }
        if prev < cur && cur >= next {
            maxima.push(i);
        }
    }
    (minima, maxima)
}

fn pair_extrema(
    asset_id: &str,
    times: &[OffsetDateTime],
    smoothed: &[f64],
    thresholds: &RechargeThresholds,
) -> Vec<RechargeEvent> {
    let (minima, maxima) = find_extrema(smoothed);
    let mut events = Vec::new();

    let mut maxima = maxima.into_iter();
    let Some(mut current_max) = maxima.next() else {
        return events;
    };

    for min_idx in minima {
        while current_max <= min_idx {
            match maxima.next() {
                Some(next) => current_max = next,
                None => return events,
            }
        }

        let start_time = times[min_idx];
        let end_time = times[current_max];
        let duration_minutes = (end_time - start_time).as_seconds_f64() / 60.0;
        let amplitude = smoothed[current_max] - smoothed[min_idx];

        if thresholds.accepts(amplitude, duration_minutes) {
            events.push(RechargeEvent {
                asset_id: asset_id.to_string(),
                start_time,
                end_time,
                duration_minutes,
                level_start: smoothed[min_idx],
                level_end: smoothed[current_max],
                amplitude,
            });
        }

        match maxima.next() {
            Some(next) => current_max = next,
            None => break,
        }
    }

    events
}
