use tank_domain::domain::{CorrelationSummary, Reading, ScatterPoint};

#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationFit {
    pub summary: CorrelationSummary,
    pub scatter: Vec<ScatterPoint>,
}

/// Fits `absolute = slope * percent + intercept` over readings carrying both
/// levels. Fewer than two pairs leaves the model unavailable (`None`).
pub fn fit_levels(asset_id: &str, readings: &[Reading]) -> Option<CorrelationFit> {
    let pairs: Vec<(f64, f64)> = readings.iter().filter_map(Reading::level_pair).collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let (dx, dy) = (x - mean_x, y - mean_y);
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }

    let pearson_r = (sxx > 0.0 && syy > 0.0).then(|| sxy / (sxx * syy).sqrt());
    let slope = (sxx > 0.0).then(|| sxy / sxx);
    let intercept = slope.map(|m| mean_y - m * mean_x);

    let r2 = match (slope, intercept) {
        (Some(m), Some(b)) if syy > 0.0 => {
            let ss_res: f64 = pairs
                .iter()
                .map(|(x, y)| {
                    let residual = y - (m * x + b);
                    residual * residual
                })
                .sum();
            Some(1.0 - ss_res / syy)
        }
        _ => None,
    };

    let scatter = pairs
        .iter()
        .map(|(x, y)| ScatterPoint {
            asset_id: asset_id.to_string(),
            level_percent: *x,
            level_absolute: *y,
        })
        .collect();

    Some(CorrelationFit {
        summary: CorrelationSummary {
            asset_id: asset_id.to_string(),
            pearson_r,
            slope,
            intercept,
            r2,
        },
        scatter,
    })
}
