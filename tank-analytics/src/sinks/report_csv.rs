use std::{fs, path::PathBuf};

use serde::Serialize;

#[derive(thiserror::Error, Debug)]
pub enum ReportError {
    #[error("report io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("report csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// Writes report row sets as CSV files into one directory.
pub struct CsvReportWriter {
    dir: PathBuf,
}

impl CsvReportWriter {
    /// Creates `dir` (and parents) if needed.
    pub fn create<P: Into<PathBuf>>(dir: P) -> Result<Self, ReportError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// One header row from the row type's field names, then one line per row.
    /// An empty row set leaves an empty file.
    pub fn write_rows<I>(&self, file_name: &str, rows: I) -> Result<PathBuf, ReportError>
    where
        I: IntoIterator,
        I::Item: Serialize,
    {
        let path = self.dir.join(file_name);
        let mut wtr = csv::Writer::from_path(&path)?;
        let mut written = 0_usize;
        for row in rows {
            wtr.serialize(row)?;
            written += 1;
        }
        wtr.flush()?;

        tracing::debug!(path = %path.display(), rows = written, "report file written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tank_domain::domain::{CorrelationSummary, Signal, SignalStats};

    #[test]
    fn unavailable_values_are_written_as_empty_cells() {
        let dir = tempfile::tempdir().unwrap();
        let writer = CsvReportWriter::create(dir.path().join("nested/out")).unwrap();

        let rows = [CorrelationSummary {
            asset_id: "t1".to_string(),
            pearson_r: None,
            slope: Some(2.0),
            intercept: Some(1.0),
            r2: None,
        }];
        let path = writer.write_rows("correlation.csv", &rows).unwrap();

        let text = fs::read_to_string(path).unwrap();
        assert_eq!(text, "asset_id,pearson_r,slope,intercept,r2\nt1,,2.0,1.0,\n");
    }

    #[test]
    fn signals_are_written_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let writer = CsvReportWriter::create(dir.path()).unwrap();

        let row = SignalStats {
            asset_id: "t1".to_string(),
            signal: Signal::LevelAbsolute,
            min: None,
            max: None,
            mean: None,
            median: None,
            std_dev: None,
            total_count: 0,
            valid_count: 0,
            missing_pct: 0.0,
        };
        let path = writer.write_rows("statistics.csv", [row]).unwrap();

        let text = fs::read_to_string(path).unwrap();
        assert!(text.lines().nth(1).unwrap().starts_with("t1,level_absolute,"));
    }
}
