use std::fmt;

/// How a source column encoded its timestamps. Chosen once per column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TimestampEncoding {
    EpochSeconds,
    EpochMillis,
    EpochMicros,
    GenericDatetime,
}

impl TimestampEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EpochSeconds => "epoch_seconds",
            Self::EpochMillis => "epoch_millis",
            Self::EpochMicros => "epoch_micros",
            Self::GenericDatetime => "generic_datetime",
        }
    }

    /// Nanoseconds per unit for the epoch encodings.
    pub fn nanos_per_unit(&self) -> Option<i128> {
        match self {
            Self::EpochSeconds => Some(1_000_000_000),
            Self::EpochMillis => Some(1_000_000),
            Self::EpochMicros => Some(1_000),
            Self::GenericDatetime => None,
        }
    }
}

impl fmt::Display for TimestampEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
