use anyhow::{bail, Result};
use std::{env, path::PathBuf, sync::Arc};
use tank_analytics::{
    config::AppConfig,
    observability,
    report::{
        report_root, run_analysis, run_notes, write_integrity_report, write_tank_report,
        ReportAnalyzer, ReportSelection, RunContext,
    },
    sources::{discover_csv_files, TankCsvFileSource},
};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!("usage: tank-analytics <input_dir> [output_dir]");
    }
    let input_dir = PathBuf::from(&args[1]);

    // Point TANK_ANALYTICS_CONFIG at a TOML file to override the defaults.
    let cfg = AppConfig::load()?;
    let settings = Arc::new(cfg.analysis.validate()?);
    cfg.pipeline.validate()?;
    let output_dir = args
        .get(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| cfg.report.output_dir.clone());

    let files = discover_csv_files(&input_dir)
        .map_err(|e| anyhow::anyhow!("failed to scan '{}': {e}", input_dir.display()))?;
    if files.is_empty() {
        tracing::warn!(input = %input_dir.display(), "no CSV files found");
    }

    let source = TankCsvFileSource::new(files);
    let file_reports = source.reports();
    let analyzer = ReportAnalyzer::new(settings.clone(), ReportSelection::ALL);
    let outcome = run_analysis(source, analyzer, &cfg.pipeline).await?;

    let files = file_reports.lock().await.clone();
    let input = input_dir.display().to_string();
    let notes = run_notes(
        &RunContext {
            input: &input,
            group: cfg.report.group.as_deref(),
            settings: &settings,
            files: &files,
        },
        &outcome,
    );

    let root = report_root(&output_dir, cfg.report.group.as_deref());
    write_integrity_report(&root.join("integrity"), &outcome, &notes)?;
    write_tank_report(&root.join("tank"), &outcome, &notes)?;

    Ok(())
}
