use tank_domain::domain::{HistogramBin, PercentileValue, Signal, SignalStats};

/// Descriptive statistics over a signal that may have missing samples.
///
/// `total_count` counts every sample, `valid_count` only the present ones.
/// Value fields are `None` when no sample is present; the standard deviation
/// (sample, n - 1) also needs at least two.
pub fn describe(asset_id: &str, signal: Signal, samples: &[Option<f64>]) -> SignalStats {
    let total_count = samples.len();
    let mut valid: Vec<f64> = samples.iter().flatten().copied().collect();
    let valid_count = valid.len();
    let missing_pct = if total_count == 0 {
        0.0
    } else {
        (total_count - valid_count) as f64 / total_count as f64 * 100.0
    };

    let mut stats = SignalStats {
        asset_id: asset_id.to_string(),
        signal,
        min: None,
        max: None,
        mean: None,
        median: None,
        std_dev: None,
        total_count,
        valid_count,
        missing_pct,
    };
    if valid.is_empty() {
        return stats;
    }

    valid.sort_by(f64::total_cmp);
    let n = valid_count as f64;
    let mean = valid.iter().sum::<f64>() / n;

    stats.min = valid.first().copied();
    stats.max = valid.last().copied();
    stats.mean = Some(mean);
    stats.median = percentile(&valid, 50.0);
    stats.std_dev = (valid_count > 1).then(|| {
        let ss: f64 = valid.iter().map(|v| (v - mean) * (v - mean)).sum();
        (ss / (n - 1.0)).sqrt()
    });
    stats
}

/// Linearly interpolated percentile of already sorted values.
///
/// The rank `p` maps to position `p / 100 * (n - 1)` between order
/// statistics.
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let pos = (p.clamp(0.0, 100.0) / 100.0) * last as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// One row per requested rank; values are `None` for an empty signal.
pub fn percentiles(asset_id: &str, signal: Signal, values: &[f64], ranks: &[u8]) -> Vec<PercentileValue> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    ranks
        .iter()
        .map(|rank| PercentileValue {
            asset_id: asset_id.to_string(),
            signal,
            percentile: format!("P{rank}"),
            value: percentile(&sorted, f64::from(*rank)),
        })
        .collect()
}

/// Equal-width histogram over `[min, max]` of the values.
///
/// The last bin is closed on the right. A constant series is given a unit
/// wide range centred on its value, so every sample lands in one bin.
/// No values, no bins.
pub fn histogram(asset_id: &str, signal: Signal, values: &[f64], bins: usize) -> Vec<HistogramBin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }
    let (mut lo, mut hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }

    let edges: Vec<f64> = (0..=bins)
        .map(|i| lo + (hi - lo) * i as f64 / bins as f64)
        .collect();
    let mut counts = vec![0_usize; bins];

    for v in values {
        let mut idx = (((v - lo) / (hi - lo)) * bins as f64) as usize;
        idx = idx.min(bins - 1);
        // Float rounding can put a value on the wrong side of an edge.
        if idx > 0 && *v < edges[idx] {
            idx -= 1;
        } else if idx + 1 < bins && *v >= edges[idx + 1] {
            idx += 1;
        }
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            asset_id: asset_id.to_string(),
            signal,
            bin_left: edges[i],
            bin_right: edges[i + 1],
            count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_of_one_to_five_is_three() {
        assert_eq!(percentile(&[1.0, 2.0, 3.0, 4.0, 5.0], 50.0), Some(3.0));
    }

    #[test]
    fn percentiles_interpolate_between_order_statistics() {
        let rows = percentiles("t1", Signal::LevelPercent, &[4.0, 1.0, 3.0, 2.0], &[0, 25, 50, 90, 100]);
        let expected = [1.0, 1.75, 2.5, 3.7, 4.0];
        for (row, want) in rows.iter().zip(expected) {
            assert!((row.value.unwrap() - want).abs() < 1e-12, "{}: {:?}", row.percentile, row.value);
        }
        assert_eq!(rows[1].percentile, "P25");
    }

    #[test]
    fn percentiles_of_an_empty_signal_are_unavailable() {
        let rows = percentiles("t1", Signal::LevelAbsolute, &[], &[1, 50, 99]);
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.value.is_none()));
    }

    #[test]
    fn describe_reports_missing_share_and_sample_std() {
        let stats = describe(
            "t1",
            Signal::LevelPercent,
            &[Some(2.0), None, Some(4.0), Some(4.0), None, Some(4.0), Some(5.0), Some(5.0), Some(7.0), Some(9.0)],
        );
        assert_eq!(stats.total_count, 10);
        assert_eq!(stats.valid_count, 8);
        assert_eq!(stats.missing_pct, 20.0);
        assert_eq!(stats.min, Some(2.0));
        assert_eq!(stats.max, Some(9.0));
        assert_eq!(stats.mean, Some(5.0));
        assert_eq!(stats.median, Some(4.5));
        let std = stats.std_dev.unwrap();
        assert!((std - (32.0_f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn describe_all_missing_is_unavailable_not_an_error() {
        let stats = describe("t1", Signal::LevelAbsolute, &[None, None]);
        assert_eq!(stats.valid_count, 0);
        assert_eq!(stats.missing_pct, 100.0);
        assert!(stats.min.is_none() && stats.max.is_none() && stats.mean.is_none());
        assert!(stats.median.is_none() && stats.std_dev.is_none());
    }

    #[test]
    fn describe_empty_signal_has_zero_missing_pct() {
        let stats = describe("t1", Signal::LevelPercent, &[]);
        assert_eq!(stats.total_count, 0);
        assert_eq!(stats.missing_pct, 0.0);
    }

    #[test]
    fn single_value_has_no_sample_std() {
        let stats = describe("t1", Signal::LevelPercent, &[Some(3.0)]);
        assert_eq!(stats.mean, Some(3.0));
        assert!(stats.std_dev.is_none());
    }

    #[test]
    fn histogram_spans_min_to_max_with_closed_last_bin() {
        let bins = histogram("t1", Signal::LevelPercent, &[0.0, 1.0, 2.5, 5.0, 9.9, 10.0], 4);
        assert_eq!(bins.len(), 4);
        assert_eq!(bins[0].bin_left, 0.0);
        assert_eq!(bins[3].bin_right, 10.0);
        let counts: Vec<_> = bins.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![2, 1, 1, 2]);
        assert_eq!(counts.iter().sum::<usize>(), 6);
    }

    #[test]
    fn constant_series_fills_a_single_bin() {
        let bins = histogram("t1", Signal::LevelPercent, &[42.0; 7], 20);
        assert_eq!(bins.len(), 20);
        let populated: Vec<_> = bins.iter().filter(|b| b.count > 0).collect();
        assert_eq!(populated.len(), 1);
        assert_eq!(populated[0].count, 7);
        assert!(populated[0].bin_left <= 42.0 && 42.0 < populated[0].bin_right);
    }

    #[test]
    fn empty_series_has_no_bins() {
        assert!(histogram("t1", Signal::RechargeAmplitude, &[], 10).is_empty());
    }
}
