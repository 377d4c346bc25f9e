use time::OffsetDateTime;

use super::Signal;

/// One canonical sensor reading for a tank asset.
///
/// Readings are produced once by a loader and never mutated afterwards.
/// `timestamp` is always a valid UTC instant and `asset_id` is non-empty.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Reading {
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub timestamp: OffsetDateTime,
    pub asset_id: String,
    pub level_percent: Option<f64>,
    pub level_absolute: Option<f64>,
}

impl Reading {
    /// Both levels, when the reading carries both.
    pub fn level_pair(&self) -> Option<(f64, f64)> {
        match (self.level_percent, self.level_absolute) {
            (Some(p), Some(a)) => Some((p, a)),
            _ => None,
        }
    }

    /// The value of a level signal; derived signals are never carried.
    pub fn level(&self, signal: Signal) -> Option<f64> {
        match signal {
            Signal::LevelPercent => self.level_percent,
            Signal::LevelAbsolute => self.level_absolute,
            Signal::RechargeAmplitude => None,
        }
    }
}
