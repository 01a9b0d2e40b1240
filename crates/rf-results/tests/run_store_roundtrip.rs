use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use rf_results::{
    ReportSummary, RunKind, RunManifest, RunStore, RunSummary, StoreSink, store::load_checkpoint_file,
};
use rf_sim::{OutputSink, RestartHint, SnapshotInfo, resolve_initial_suggestion};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    dir.push(format!("{}_{}", prefix, nanos));
    dir
}

fn manifest(run_id: &str, case_name: &str, timestamp: &str) -> RunManifest {
    RunManifest {
        run_id: run_id.to_string(),
        case_name: case_name.to_string(),
        timestamp: timestamp.to_string(),
        run_kind: RunKind::Fresh,
        solver_version: "0.1.0".to_string(),
        num_report_steps: 2,
        adaptive: true,
    }
}

fn info(report_step: usize, next: Option<f64>) -> SnapshotInfo {
    SnapshotInfo {
        report_step,
        elapsed: report_step as f64 * 10.0,
        is_substep: false,
        wall_time_s: 0.0,
        next_suggested_step: next,
    }
}

#[test]
fn sink_persists_snapshots_and_checkpoint() {
    let case_dir = unique_temp_dir("rf_results_case");
    fs::create_dir_all(&case_dir).expect("failed to create temp case dir");
    let store = RunStore::for_case(&case_dir.join("case.yaml")).expect("failed to create store");

    let run_dir = store
        .begin_run(&manifest("run-1", "demo", "2026-01-01T00:00:00Z"))
        .expect("failed to begin run");
    let mut sink: StoreSink<Vec<f64>> = StoreSink::open(&run_dir).expect("failed to open sink");

    sink.write_snapshot(&vec![1.0, 2.0], &info(0, None)).unwrap();
    sink.write_snapshot(&vec![1.5, 2.5], &info(1, Some(43_200.0)))
        .unwrap();
    assert_eq!(sink.snapshots_written(), 2);

    let snapshots = store.load_snapshots::<Vec<f64>>("run-1").unwrap();
    assert_eq!(snapshots.len(), 2);
    assert_eq!(snapshots[0].suggested_step_s, -1.0);
    assert_eq!(snapshots[1].state, vec![1.5, 2.5]);

    let checkpoint = store.load_checkpoint::<Vec<f64>>("run-1").unwrap();
    assert_eq!(checkpoint.report_step, 1);
    assert_eq!(
        resolve_initial_suggestion(Some(&checkpoint)),
        RestartHint::Resume(43_200.0)
    );

    let from_file = load_checkpoint_file::<Vec<f64>>(&sink.checkpoint_path()).unwrap();
    assert_eq!(from_file, checkpoint);

    // Not complete until a summary exists.
    assert!(!store.has_run("run-1"));
    store
        .save_summary(
            "run-1",
            &RunSummary {
                report: ReportSummary::default(),
                failures: ReportSummary::default(),
                final_elapsed_s: 10.0,
            },
        )
        .unwrap();
    assert!(store.has_run("run-1"));
    assert_eq!(store.load_summary("run-1").unwrap().final_elapsed_s, 10.0);
}

#[test]
fn list_filter_and_delete() {
    let store = RunStore::new(unique_temp_dir("rf_results_list")).unwrap();
    store
        .begin_run(&manifest("b", "demo", "2026-01-02T00:00:00Z"))
        .unwrap();
    store
        .begin_run(&manifest("a", "demo", "2026-01-01T00:00:00Z"))
        .unwrap();
    store
        .begin_run(&manifest("c", "other", "2026-01-03T00:00:00Z"))
        .unwrap();

    let demo: Vec<String> = store
        .list_runs(Some("demo"))
        .unwrap()
        .into_iter()
        .map(|m| m.run_id)
        .collect();
    assert_eq!(demo, vec!["a", "b"]);
    assert_eq!(store.list_runs(None).unwrap().len(), 3);

    store.delete_run("a").unwrap();
    assert!(store.load_manifest("a").is_err());
    assert_eq!(store.list_runs(Some("demo")).unwrap().len(), 1);
}

#[test]
fn missing_run_is_reported() {
    let store = RunStore::new(unique_temp_dir("rf_results_missing")).unwrap();
    assert!(matches!(
        store.load_manifest("nope"),
        Err(rf_results::ResultsError::RunNotFound { .. })
    ));
}
