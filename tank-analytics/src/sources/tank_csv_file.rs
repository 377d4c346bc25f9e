//! CSV exports of tank telemetry, one or more files per asset.
//!
//! Each file is loaded whole: its header row is canonicalized once, its
//! timestamp column is decoded under a single encoding, and every row gets an
//! asset id from its label column or from the file's location.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use csv::{ReaderBuilder, StringRecord, Trim};
use futures::Stream;
use tank_domain::domain::{Reading, Signal, TimestampEncoding};
use tokio::sync::Mutex;
use walkdir::WalkDir;

use crate::normalize::{decode_column, AssetResolver, ColumnMap};
use crate::pipeline::{Envelope, PipelineError, Source};

/// What loading one file found, kept for the run notes.
#[derive(Debug, Clone, PartialEq)]
pub struct FileLoadReport {
    pub path: PathBuf,
    /// blake3 of the raw file bytes.
    pub fingerprint: String,
    /// `None` when the file had no usable timestamp column.
    pub encoding: Option<TimestampEncoding>,
    pub detected_levels: Vec<Signal>,
    pub rows: usize,
    pub invalid_timestamps: usize,
    pub malformed_rows: usize,
}

#[derive(Debug, Clone)]
pub struct LoadedFile {
    pub report: FileLoadReport,
    pub readings: Vec<Reading>,
}

fn parse_optional_f64(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

fn cell<'r>(record: &'r StringRecord, idx: Option<usize>) -> Option<&'r str> {
    idx.and_then(|i| record.get(i))
}

/// Loads one CSV file into canonical readings.
///
/// A file without a recognizable timestamp column, or whose timestamps are
/// all invalid, loads as zero readings rather than failing.
pub fn load_tank_csv(path: &Path) -> Result<LoadedFile, PipelineError> {
    let bytes = fs::read(path)
        .map_err(|e| PipelineError::Source(format!("failed to read '{}': {e}", path.display())))?;
    let fingerprint = blake3::hash(&bytes).to_hex().to_string();

    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(bytes.as_slice());
    let headers = rdr
        .headers()
        .map_err(|e| PipelineError::Source(format!("failed to read CSV headers of '{}': {e}", path.display())))?
        .clone();

    let mut report = FileLoadReport {
        path: path.to_path_buf(),
        fingerprint,
        encoding: None,
        detected_levels: Vec::new(),
        rows: 0,
        invalid_timestamps: 0,
        malformed_rows: 0,
    };

    let Some(columns) = ColumnMap::from_headers(&headers) else {
        tracing::warn!(path = %path.display(), "no timestamp column found, skipping file");
        return Ok(LoadedFile {
            report,
            readings: Vec::new(),
        });
    };
    report.detected_levels = columns.detected_levels();

    let mut records = Vec::new();
    for result in rdr.records() {
        match result {
            Ok(record) => records.push(record),
            Err(e) => {
                report.malformed_rows += 1;
                metrics::counter!("tank_csv_parse_errors_total").increment(1);
                tracing::warn!(path = %path.display(), error = %e, "skipping malformed CSV record");
            }
        }
    }
    report.rows = records.len();

    let raw_timestamps: Vec<&str> = records
        .iter()
        .map(|r| r.get(columns.timestamp).unwrap_or(""))
        .collect();
    let decoded = decode_column(&raw_timestamps);
    report.encoding = Some(decoded.encoding);
    report.invalid_timestamps = decoded.invalid_count();

    if report.invalid_timestamps > 0 {
        metrics::counter!("tank_csv_invalid_timestamps_total").increment(report.invalid_timestamps as u64);
        tracing::warn!(
            path = %path.display(),
            invalid_rows = report.invalid_timestamps,
            encoding = %decoded.encoding,
            "dropping rows with unparseable timestamps"
        );
    }
    if decoded.all_invalid() {
        tracing::warn!(path = %path.display(), rows = report.rows, "no valid timestamps, file contributes no readings");
        return Ok(LoadedFile {
            report,
            readings: Vec::new(),
        });
    }

    let resolver = AssetResolver::for_file(path);
    let readings = records
        .iter()
        .zip(decoded.instants)
        .filter_map(|(record, instant)| {
            Some(Reading {
                timestamp: instant?,
                asset_id: resolver.resolve(cell(record, columns.asset_label)),
                level_percent: cell(record, columns.level_percent).and_then(parse_optional_f64),
                level_absolute: cell(record, columns.level_absolute).and_then(parse_optional_f64),
            })
        })
        .collect();

    Ok(LoadedFile { report, readings })
}

/// Every `*.csv` file below `dir`, in path order.
///
/// Symlinks are not followed. Entries that cannot be read are logged and
/// skipped; only an unreadable `dir` itself is an error.
pub fn discover_csv_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) if e.depth() == 0 => return Err(e.into()),
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        let is_csv = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if entry.file_type().is_file() && is_csv {
            found.push(entry.into_path());
        }
    }
    found.sort();
    Ok(found)
}

/// Streams the readings of a list of CSV files, file by file.
///
/// Files that cannot be read are logged and skipped. Per-file load reports
/// accumulate behind [`TankCsvFileSource::reports`].
pub struct TankCsvFileSource {
    paths: Vec<PathBuf>,
    reports: Arc<Mutex<Vec<FileLoadReport>>>,
}

impl TankCsvFileSource {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            reports: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn reports(&self) -> Arc<Mutex<Vec<FileLoadReport>>> {
        self.reports.clone()
    }
}

#[async_trait::async_trait]
impl Source<Reading> for TankCsvFileSource {
    async fn stream(
        &self,
    ) -> std::pin::Pin<Box<dyn Stream<Item = Result<Envelope<Reading>, PipelineError>> + Send>> {
        let paths = self.paths.clone();
        let reports = self.reports.clone();
        let s = async_stream::try_stream! {
            for path in paths {
                let origin: Arc<str> = Arc::from(path.display().to_string());
                let blocking_path = path.clone();
                let loaded = tokio::task::spawn_blocking(move || load_tank_csv(&blocking_path))
                    .await
                    .map_err(|e| PipelineError::Source(format!("CSV loader task failed: {e}")))?;

                let loaded = match loaded {
                    Ok(l) => l,
                    Err(e) => {
                        metrics::counter!("tank_csv_unreadable_files_total").increment(1);
                        tracing::warn!(path = %path.display(), error = %e, "skipping unreadable file");
                        continue;
                    }
                };

                tracing::info!(
                    path = %path.display(),
                    readings = loaded.readings.len(),
                    "loaded CSV file"
                );
                reports.lock().await.push(loaded.report);

                for reading in loaded.readings {
                    yield Envelope::new(reading, origin.clone());
                }
            }
        };

        Box::pin(s)
    }
}
