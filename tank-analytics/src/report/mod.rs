//! Report assembly: the per-asset analyzer driven by the pipeline, run notes,
//! and the CSV layout of the integrity and tank reports.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
    sync::{atomic::Ordering, Arc},
};

use serde::Serialize;
use tank_domain::domain::{Reading, Signal};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::analysis::{
    integrity::{analyze_integrity, IntegrityAssetReport},
    prepare_asset,
    tank::{analyze_tank, TankAssetReport},
    AnalysisSettings,
};
use crate::config::PipelineConfig;
use crate::pipeline::{Pipeline, PipelineError, Source};
use crate::sinks::{AssetAnalyzer, CsvReportWriter, ReportError, ShardedAnalysisSink};
use crate::sources::FileLoadReport;
use crate::transform::ReadingValidation;

/// Which reports a run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportSelection {
    pub integrity: bool,
    pub tank: bool,
}

impl ReportSelection {
    pub const ALL: Self = Self {
        integrity: true,
        tank: true,
    };
    pub const INTEGRITY: Self = Self {
        integrity: true,
        tank: false,
    };
    pub const TANK: Self = Self {
        integrity: false,
        tank: true,
    };
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetReports {
    pub integrity: Option<IntegrityAssetReport>,
    pub tank: Option<TankAssetReport>,
}

pub struct ReportAnalyzer {
    settings: Arc<AnalysisSettings>,
    selection: ReportSelection,
}

impl ReportAnalyzer {
    pub fn new(settings: Arc<AnalysisSettings>, selection: ReportSelection) -> Self {
        Self { settings, selection }
    }
}

impl AssetAnalyzer for ReportAnalyzer {
    type Output = AssetReports;

    fn accepts(&self, asset_id: &str) -> bool {
        self.settings.accepts_asset(asset_id)
    }

    fn analyze(&self, asset_id: &str, readings: Vec<Reading>) -> Option<AssetReports> {
        let readings = prepare_asset(asset_id, readings, &self.settings.window)?;
        let integrity = if self.selection.integrity {
            analyze_integrity(asset_id, &readings, &self.settings)
        } else {
            None
        };
        let tank = if self.selection.tank {
            analyze_tank(asset_id, &readings, &self.settings)
        } else {
            None
        };
        Some(AssetReports { integrity, tank })
    }
}

#[derive(Debug, Default)]
pub struct RunOutcome {
    pub assets: BTreeMap<String, AssetReports>,
    /// Records dropped by validation or unreadable upstream.
    pub rejected_records: usize,
}

/// Drains `source` through validation into the sharded analyzer.
pub async fn run_analysis<S>(
    source: S,
    analyzer: ReportAnalyzer,
    pipeline: &PipelineConfig,
) -> Result<RunOutcome, PipelineError>
where
    S: Source<Reading> + 'static,
{
    let sink = ShardedAnalysisSink::new(analyzer, pipeline.workers, pipeline.channel_capacity);
    let results = sink.results();
    let rejected = sink.rejected();

    Pipeline::<S, Reading, _>::new(source, sink)
        .with_transform(Arc::new(ReadingValidation))
        .run()
        .await?;

    let assets = std::mem::take(&mut *results.lock().await);
    Ok(RunOutcome {
        assets,
        rejected_records: rejected.load(Ordering::Relaxed),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteRow {
    pub key: String,
    pub value: String,
}

impl NoteRow {
    fn new(key: impl Into<String>, value: impl ToString) -> Self {
        Self {
            key: key.into(),
            value: value.to_string(),
        }
    }
}

/// What a run was asked to do and what it saw while loading.
pub struct RunContext<'a> {
    pub input: &'a str,
    pub group: Option<&'a str>,
    pub settings: &'a AnalysisSettings,
    pub files: &'a [FileLoadReport],
}

fn format_instant(ts: Option<OffsetDateTime>) -> String {
    ts.and_then(|t| t.format(&Rfc3339).ok()).unwrap_or_default()
}

/// Key/value provenance rows written alongside every report.
pub fn run_notes(ctx: &RunContext<'_>, outcome: &RunOutcome) -> Vec<NoteRow> {
    let settings = ctx.settings;
    let mut notes = vec![
        NoteRow::new("input", ctx.input),
        NoteRow::new("group", ctx.group.unwrap_or_default()),
        NoteRow::new("asset_filter", settings.asset_filter.as_deref().unwrap_or_default()),
        NoteRow::new("window_start", format_instant(settings.window.start)),
        NoteRow::new("window_end", format_instant(settings.window.end)),
        NoteRow::new("freq_minutes", settings.freq.whole_minutes()),
        NoteRow::new("min_amplitude_pct", settings.recharge.min_amplitude_pct),
        NoteRow::new("min_duration_min", settings.recharge.min_duration_min),
        NoteRow::new("assets", outcome.assets.len()),
        NoteRow::new("rejected_records", outcome.rejected_records),
    ];

    if !ctx.files.is_empty() {
        let encodings: BTreeSet<&str> = ctx
            .files
            .iter()
            .filter_map(|f| f.encoding.map(|e| e.as_str()))
            .collect();
        let invalid: usize = ctx.files.iter().map(|f| f.invalid_timestamps).sum();
        notes.push(NoteRow::new("files", ctx.files.len()));
        notes.push(NoteRow::new(
            "timestamp_encodings",
            encodings.into_iter().collect::<Vec<_>>().join(","),
        ));
        notes.push(NoteRow::new("invalid_timestamps", invalid));

        for f in ctx.files {
            let levels: Vec<&str> = f.detected_levels.iter().map(Signal::as_str).collect();
            let encoding = f.encoding.map(|e| e.as_str()).unwrap_or("none");
            notes.push(NoteRow::new(
                format!("file:{}", f.path.display()),
                format!(
                    "encoding={encoding}; levels={}; rows={}; invalid_timestamps={}; malformed_rows={}; blake3={}",
                    levels.join("|"),
                    f.rows,
                    f.invalid_timestamps,
                    f.malformed_rows,
                    f.fingerprint
                ),
            ));
        }
    }

    notes.push(NoteRow::new("version", env!("CARGO_PKG_VERSION")));
    notes.push(NoteRow::new("generated_at", format_instant(Some(OffsetDateTime::now_utc()))));
    notes
}

/// Base directory of a run's reports: `output_dir`, or `output_dir/<group>`
/// when the run is labelled.
pub fn report_root(output_dir: &Path, group: Option<&str>) -> PathBuf {
    match group.map(str::trim).filter(|g| !g.is_empty()) {
        Some(g) => output_dir.join(g),
        None => output_dir.to_path_buf(),
    }
}

/// `summary.csv`, `gaps.csv`, `duplicates.csv`, `monthly.csv`, `notes.csv`.
pub fn write_integrity_report(
    dir: &Path,
    outcome: &RunOutcome,
    notes: &[NoteRow],
) -> Result<(), ReportError> {
    let writer = CsvReportWriter::create(dir)?;
    let reports: Vec<&IntegrityAssetReport> = outcome
        .assets
        .values()
        .filter_map(|a| a.integrity.as_ref())
        .collect();

    writer.write_rows("summary.csv", reports.iter().map(|r| &r.summary))?;
    writer.write_rows("gaps.csv", reports.iter().flat_map(|r| &r.gaps))?;
    writer.write_rows("duplicates.csv", reports.iter().flat_map(|r| &r.duplicates))?;
    writer.write_rows("monthly.csv", reports.iter().flat_map(|r| &r.monthly))?;
    writer.write_rows("notes.csv", notes)?;

    tracing::info!(dir = %dir.display(), assets = reports.len(), "integrity report written");
    Ok(())
}

/// `summary.csv`, `statistics.csv`, `percentiles.csv`, `histograms.csv`,
/// `recharge_events.csv`, `amplitude_histograms.csv`, `correlation.csv`,
/// `scatter.csv`, `notes.csv`.
pub fn write_tank_report(
    dir: &Path,
    outcome: &RunOutcome,
    notes: &[NoteRow],
) -> Result<(), ReportError> {
    let writer = CsvReportWriter::create(dir)?;
    let reports: Vec<&TankAssetReport> = outcome
        .assets
        .values()
        .filter_map(|a| a.tank.as_ref())
        .collect();

    let without_percent: Vec<&str> = reports
        .iter()
        .filter(|r| !r.has_percent_level())
        .map(|r| r.summary.asset_id.as_str())
        .collect();
    if !without_percent.is_empty() {
        tracing::warn!(assets = ?without_percent, "assets without percent-level data");
    }
    let mut notes = notes.to_vec();
    notes.push(NoteRow::new("assets_without_percent_level", without_percent.join(",")));

    writer.write_rows("summary.csv", reports.iter().map(|r| &r.summary))?;
    writer.write_rows("statistics.csv", reports.iter().flat_map(|r| &r.stats))?;
    writer.write_rows("percentiles.csv", reports.iter().flat_map(|r| &r.percentiles))?;
    writer.write_rows("histograms.csv", reports.iter().flat_map(|r| &r.histograms))?;
    writer.write_rows("recharge_events.csv", reports.iter().flat_map(|r| &r.recharge_events))?;
    writer.write_rows(
        "amplitude_histograms.csv",
        reports.iter().flat_map(|r| &r.amplitude_histogram),
    )?;
    writer.write_rows(
        "correlation.csv",
        reports.iter().filter_map(|r| r.correlation.as_ref()).map(|c| &c.summary),
    )?;
    writer.write_rows(
        "scatter.csv",
        reports
            .iter()
            .filter_map(|r| r.correlation.as_ref())
            .flat_map(|c| &c.scatter),
    )?;
    writer.write_rows("notes.csv", &notes)?;

    tracing::info!(dir = %dir.display(), assets = reports.len(), "tank report written");
    Ok(())
}
