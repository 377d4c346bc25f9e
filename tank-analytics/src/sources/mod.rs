pub mod reading_ndjson_file;
pub mod tank_csv_file;

pub use reading_ndjson_file::ReadingNdjsonFileSource;
pub use tank_csv_file::{discover_csv_files, FileLoadReport, TankCsvFileSource};
