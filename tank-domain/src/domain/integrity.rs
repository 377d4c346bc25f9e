use time::OffsetDateTime;

/// Interval between two consecutive readings that exceeds the sampling interval.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Gap {
    pub asset_id: String,
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub start: OffsetDateTime,
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub end: OffsetDateTime,
    pub duration_minutes: f64,
    pub missing_points_estimate: u64,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DuplicateGroup {
    pub asset_id: String,
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub timestamp: OffsetDateTime,
    pub count: usize,
}

/// Coverage of one calendar month, clipped to the analysis window.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MonthlyCoverage {
    pub asset_id: String,
    /// `YYYY-MM`
    pub month: String,
    pub observed: usize,
    pub expected: u64,
    pub missing_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct IntegritySummary {
    pub asset_id: String,
    pub observed: usize,
    pub expected: u64,
    pub missing_pct: f64,
    pub duplicate_excess: usize,
    pub max_gap_minutes: f64,
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub date_min: OffsetDateTime,
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub date_max: OffsetDateTime,
}
