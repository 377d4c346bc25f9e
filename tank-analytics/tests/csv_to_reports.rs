use std::{fs, path::Path, sync::Arc};

use tank_analytics::{
    config::{AnalysisConfig, PipelineConfig},
    report::{
        run_analysis, run_notes, write_integrity_report, write_tank_report, ReportAnalyzer,
        ReportSelection, RunContext,
    },
    sources::{discover_csv_files, TankCsvFileSource},
};
use tank_domain::domain::TimestampEncoding;

fn write(dir: &Path, rel: &str, contents: &str) {
    let path = dir.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// `tank_a`: text timestamps, no label column, one duplicate and one 4 minute
/// gap over 00:00..00:09, absolute = 2 * percent + 1.
/// `TK-B`: labelled epoch-second rows, one unparseable timestamp.
fn seed_inputs(dir: &Path) {
    let mut a = String::from("FechaHora,nivelPorcentual,NivelEstanque\n");
    for (minute, pct) in [(0, 10), (1, 20), (2, 30), (2, 30), (3, 40), (7, 50), (8, 60), (9, 70)] {
        a.push_str(&format!("2024-01-01 00:{minute:02}:00,{pct},{}\n", 2 * pct + 1));
    }
    write(dir, "tank_a/2024_01.csv", &a);

    let mut b = String::from("ts,asset_label,level_pct\n");
    for i in 0..5 {
        b.push_str(&format!("{},TK-B,{}\n", 1_704_067_200 + 60 * i, 50 + i));
    }
    b.push_str("x,TK-B,55\n");
    write(dir, "exports/b.csv", &b);

    write(dir, "readme.txt", "not a csv");
}

#[tokio::test]
async fn csv_exports_flow_into_both_reports() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    seed_inputs(input.path());

    let settings = Arc::new(AnalysisConfig::default().validate().unwrap());
    let files = discover_csv_files(input.path()).unwrap();
    assert_eq!(files.len(), 2);

    let source = TankCsvFileSource::new(files);
    let file_reports = source.reports();
    let pipeline = PipelineConfig {
        workers: 2,
        channel_capacity: 4,
    };
    let outcome = run_analysis(
        source,
        ReportAnalyzer::new(settings.clone(), ReportSelection::ALL),
        &pipeline,
    )
    .await
    .unwrap();

    let assets: Vec<&str> = outcome.assets.keys().map(String::as_str).collect();
    assert_eq!(assets, vec!["TK-B", "tank_a"]);
    assert_eq!(outcome.rejected_records, 0);

    let tank_a = &outcome.assets["tank_a"];
    let integrity = tank_a.integrity.as_ref().unwrap();
    assert_eq!(integrity.summary.observed, 8);
    assert_eq!(integrity.summary.expected, 10);
    assert_eq!(integrity.summary.missing_pct, 20.0);
    assert_eq!(integrity.summary.duplicate_excess, 1);
    assert_eq!(integrity.summary.max_gap_minutes, 4.0);
    assert_eq!(integrity.gaps.len(), 1);
    assert_eq!(integrity.gaps[0].missing_points_estimate, 3);
    assert_eq!(integrity.monthly.len(), 1);
    assert_eq!(integrity.monthly[0].month, "2024-01");

    let tank = tank_a.tank.as_ref().unwrap();
    let fit = tank.correlation.as_ref().unwrap();
    assert!((fit.summary.slope.unwrap() - 2.0).abs() < 1e-9);
    assert!((fit.summary.intercept.unwrap() - 1.0).abs() < 1e-9);
    assert!((fit.summary.r2.unwrap() - 1.0).abs() < 1e-9);
    assert_eq!(fit.scatter.len(), 8);

    let tank_b = &outcome.assets["TK-B"];
    assert_eq!(tank_b.integrity.as_ref().unwrap().summary.observed, 5);
    assert!(tank_b.tank.as_ref().unwrap().correlation.is_none());

    let files = file_reports.lock().await.clone();
    assert_eq!(files.len(), 2);
    let b_report = files.iter().find(|f| f.path.ends_with("exports/b.csv")).unwrap();
    assert_eq!(b_report.encoding, Some(TimestampEncoding::EpochSeconds));
    assert_eq!(b_report.invalid_timestamps, 1);

    let input_label = input.path().display().to_string();
    let notes = run_notes(
        &RunContext {
            input: &input_label,
            group: None,
            settings: &settings,
            files: &files,
        },
        &outcome,
    );
    write_integrity_report(&output.path().join("integrity"), &outcome, &notes).unwrap();
    write_tank_report(&output.path().join("tank"), &outcome, &notes).unwrap();

    let summary = fs::read_to_string(output.path().join("integrity/summary.csv")).unwrap();
    let lines: Vec<&str> = summary.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("TK-B,5,5,0.0,0,0.0,"));
    assert!(lines[2].starts_with("tank_a,8,10,20.0,1,4.0,"));

    let notes_csv = fs::read_to_string(output.path().join("tank/notes.csv")).unwrap();
    assert!(notes_csv.contains("timestamp_encodings,\"epoch_seconds,generic_datetime\""));
    assert!(notes_csv.contains("assets_without_percent_level,"));
}

#[tokio::test]
async fn asset_filter_and_window_restrict_the_run() {
    let input = tempfile::tempdir().unwrap();
    seed_inputs(input.path());

    let settings = AnalysisConfig {
        asset_filter: Some("tank".to_string()),
        start_date: Some("2024-01-01 00:05:00".to_string()),
        ..Default::default()
    }
    .validate()
    .unwrap();

    let source = TankCsvFileSource::new(discover_csv_files(input.path()).unwrap());
    let outcome = run_analysis(
        source,
        ReportAnalyzer::new(Arc::new(settings), ReportSelection::INTEGRITY),
        &PipelineConfig::default(),
    )
    .await
    .unwrap();

    let assets: Vec<&str> = outcome.assets.keys().map(String::as_str).collect();
    assert_eq!(assets, vec!["tank_a"]);
    let summary = &outcome.assets["tank_a"].integrity.as_ref().unwrap().summary;
    // 00:05..00:09 with readings at 07, 08, 09.
    assert_eq!(summary.observed, 3);
    assert_eq!(summary.expected, 5);
    assert!(outcome.assets["tank_a"].tank.is_none());
}
