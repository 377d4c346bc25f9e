use anyhow::{bail, Result};
use std::{env, path::PathBuf, sync::Arc};
use tank_analytics::{
    config::AppConfig,
    observability,
    report::{
        report_root, run_analysis, run_notes, write_tank_report, ReportAnalyzer, ReportSelection,
        RunContext,
    },
    sources::ReadingNdjsonFileSource,
};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!("usage: analyze_readings_ndjson <ndjson_file_path> [output_dir]");
    }
    let file_path = &args[1];

    let cfg = AppConfig::load()?;
    let settings = Arc::new(cfg.analysis.validate()?);
    cfg.pipeline.validate()?;
    let output_dir = args
        .get(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| cfg.report.output_dir.clone());

    let source = ReadingNdjsonFileSource::new(file_path);
    let analyzer = ReportAnalyzer::new(settings.clone(), ReportSelection::TANK);
    let outcome = run_analysis(source, analyzer, &cfg.pipeline).await?;

    let notes = run_notes(
        &RunContext {
            input: file_path,
            group: cfg.report.group.as_deref(),
            settings: &settings,
            files: &[],
        },
        &outcome,
    );

    let root = report_root(&output_dir, cfg.report.group.as_deref());
    write_tank_report(&root.join("tank"), &outcome, &notes)?;

    Ok(())
}
