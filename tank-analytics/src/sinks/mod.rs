pub mod report_csv;
pub mod sharded_analysis;

pub use report_csv::{CsvReportWriter, ReportError};
pub use sharded_analysis::{AssetAnalyzer, ShardedAnalysisSink};
