use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use rf_app::{RunOptions, RunProgressEvent, RunRequest, RunStage, execute_case_with_progress};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    dir.push(format!("{}_{}", prefix, nanos));
    fs::create_dir_all(&dir).expect("failed to create temp dir");
    dir
}

#[test]
fn run_streams_stages_and_report_steps() {
    let dir = unique_temp_dir("rf_app_progress");
    let case_path = dir.join("case.yaml");
    fs::write(
        &case_path,
        r#"
version: 2
name: progress
reservoir:
  pore_volume_m3: 1.0e6
  compressibility_per_bar: 1.0e-4
  initial_pressure_bar: 200
well:
  name: P1
  productivity_index: 86.4
  bhp_min_bar: 100
stepping:
  terminal_output: false
schedule:
  steps:
    - length_days: 10
      repeat: 4
      rate_m3_per_day: 100
"#,
    )
    .expect("failed to write case");

    let mut events: Vec<RunProgressEvent> = Vec::new();
    let mut record = |event: RunProgressEvent| events.push(event);
    let request = RunRequest {
        case_path: &case_path,
        options: RunOptions {
            use_cache: false,
            ..RunOptions::default()
        },
    };
    execute_case_with_progress(&request, Some(&mut record)).expect("run failed");

    assert_eq!(events.first().map(|e| e.stage), Some(RunStage::LoadingCase));
    assert_eq!(events.last().map(|e| e.stage), Some(RunStage::Completed));
    assert!(events.iter().any(|e| e.stage == RunStage::SavingResults));
    assert!(!events.iter().any(|e| e.stage == RunStage::CheckingCache));

    let steps: Vec<_> = events.iter().filter_map(|e| e.schedule.as_ref()).collect();
    assert_eq!(steps.len(), 4);
    assert_eq!(steps[0].report_step, 1);
    assert_eq!(steps[3].report_step, 4);
    assert_eq!(steps[3].num_report_steps, 4);
    assert!((steps[3].fraction_complete - 1.0).abs() < 1e-12);
    assert!((steps[3].total_time_days - 40.0).abs() < 1e-9);
    assert!(steps.iter().all(|s| s.suggested_step_days.is_some()));
    assert!(
        events
            .windows(2)
            .all(|w| w[1].elapsed_wall_s >= w[0].elapsed_wall_s)
    );
}
