mod encoding;
mod integrity;
mod reading;
mod signal;
mod tank;

pub use encoding::TimestampEncoding;
pub use integrity::{DuplicateGroup, Gap, IntegritySummary, MonthlyCoverage};
pub use reading::Reading;
pub use signal::Signal;
pub use tank::{
    CorrelationSummary, HistogramBin, PercentileValue, RechargeEvent, ScatterPoint, SignalStats,
    TankSummary,
};
