use clap::{Parser, Subcommand};
use rf_app::{
    AppResult, RunOptions, RunProgressEvent, RunRequest, RunStage, RunTimingSummary, query,
    run_service,
};
use rf_core::units::seconds_to_days;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rf-cli")]
#[command(about = "resflow CLI - report-step driven reservoir simulation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a case file
    Validate {
        /// Path to the case file (.yaml, .yml or .json)
        case_path: PathBuf,
    },
    /// Run a case
    Run {
        /// Path to the case file
        case_path: PathBuf,
        /// Resume from a checkpoint.json written by an earlier run
        #[arg(long)]
        restart: Option<PathBuf>,
        /// Run store directory (defaults to .resflow/runs next to the case)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// One solve per report step instead of adaptive substepping
        #[arg(long)]
        no_adaptive: bool,
        /// Skip cache and force re-run
        #[arg(long)]
        no_cache: bool,
        /// Suppress per-report-step log lines
        #[arg(short, long)]
        quiet: bool,
    },
    /// List runs in a run store
    Runs {
        /// Run store directory
        store_dir: PathBuf,
        /// Only runs of this case name
        #[arg(long)]
        case: Option<String>,
    },
    /// Show details of a stored run
    ShowRun {
        /// Run store directory
        store_dir: PathBuf,
        /// Run ID to display
        run_id: String,
    },
    /// Export a state variable time series from a run as CSV
    ExportSeries {
        /// Run store directory
        store_dir: PathBuf,
        /// Run ID
        run_id: String,
        /// Variable name (pressure, bhp, aquifer_pressure, rate_target, production, influx)
        variable: String,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { case_path } => cmd_validate(&case_path),
        Commands::Run {
            case_path,
            restart,
            output,
            no_adaptive,
            no_cache,
            quiet,
        } => {
            let options = RunOptions {
                use_cache: !no_cache,
                adaptive: no_adaptive.then_some(false),
                terminal_output: quiet.then_some(false),
                output_dir: output,
                restart_from: restart,
                ..RunOptions::default()
            };
            cmd_run(&case_path, options)
        }
        Commands::Runs { store_dir, case } => cmd_runs(&store_dir, case.as_deref()),
        Commands::ShowRun { store_dir, run_id } => cmd_show_run(&store_dir, &run_id),
        Commands::ExportSeries {
            store_dir,
            run_id,
            variable,
            output,
        } => cmd_export_series(&store_dir, &run_id, &variable, output.as_deref()),
    }
}

fn cmd_validate(case_path: &Path) -> AppResult<()> {
    println!("Validating case: {}", case_path.display());
    let case = rf_app::load_case(case_path)?;
    rf_app::compile_case(&case)?;
    let summary = rf_app::summarize_case(&case);

    println!("✓ Case is valid");
    println!("  Name: {}", summary.name);
    println!("  Well: {}", summary.well);
    println!(
        "  Report steps: {} ({:.1} days)",
        summary.report_steps, summary.total_days
    );
    println!("  Rate changes: {}", summary.rate_changes);
    println!("  Tuning entries: {}", summary.tuning_entries);
    println!("  Adaptive: {}", summary.adaptive);
    println!("  Aquifer: {}", summary.has_aquifer);
    Ok(())
}

fn cmd_run(case_path: &Path, options: RunOptions) -> AppResult<()> {
    println!("Running case: {}", case_path.display());
    if let Some(checkpoint) = &options.restart_from {
        println!("  Restarting from: {}", checkpoint.display());
    }

    let request = RunRequest { case_path, options };

    let mut last_emit = Instant::now();
    let mut last_fraction = -1.0f64;
    let response = run_service::execute_case_with_progress(
        &request,
        Some(&mut |event| {
            let fraction = event
                .schedule
                .as_ref()
                .map(|s| s.fraction_complete)
                .unwrap_or(-1.0);
            let emit_now = (fraction >= 0.0 && (fraction - last_fraction).abs() >= 0.005)
                || last_emit.elapsed().as_millis() >= 100;
            if emit_now {
                render_cli_progress(&event);
                if fraction >= 0.0 {
                    last_fraction = fraction;
                }
                last_emit = Instant::now();
            }
        }),
    )?;
    clear_progress_line();

    if response.loaded_from_cache {
        println!("✓ Loaded from cache: {}", response.run_id);
    } else {
        println!("✓ Simulation completed: {}", response.run_id);
    }
    println!("  Run directory: {}", response.run_dir.display());
    if response.restart.is_degraded() {
        println!("  Checkpoint step suggestion unusable, started from the configured step");
    } else if let Some(dt) = response.restart.step() {
        println!("  Resumed with step: {:.3} days", seconds_to_days(dt));
    }

    let report = &response.summary.report;
    println!("\nSimulation report:");
    println!("  Converged:         {}", report.converged);
    println!("  Substeps:          {}", report.substeps);
    println!("  Failed substeps:   {}", report.failed_substeps);
    println!("  Newton iterations: {}", report.newton_iterations);
    println!("  Linear iterations: {}", report.linear_iterations);
    println!("  Solver time:       {:.3}s", report.solver_time_s);
    println!("  Output time:       {:.3}s", report.output_write_time_s);
    println!(
        "  Simulated:         {:.1} days",
        seconds_to_days(response.summary.final_elapsed_s)
    );

    let failures = &response.summary.failures;
    if failures.failed_substeps > 0 {
        println!("\nFailure report:");
        println!("  Rejected attempts: {}", failures.failed_substeps);
        println!("  Newton iterations: {}", failures.newton_iterations);
        println!("  Solver time:       {:.3}s", failures.solver_time_s);
    }

    print_timing_summary(&response.timing);
    Ok(())
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(120));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &RunProgressEvent) {
    match (&event.stage, &event.schedule) {
        (RunStage::RunningSchedule, Some(s)) => {
            let width = 28usize;
            let filled = ((s.fraction_complete * width as f64).round() as usize).min(width);
            let bar = format!(
                "{}{}",
                "#".repeat(filled),
                "-".repeat(width.saturating_sub(filled))
            );
            print!(
                "\r[{}] {:>6.2}%  t={:.1}/{:.1}d  step={}/{}  substeps={}  failed={}  elapsed={:.1}s",
                bar,
                s.fraction_complete * 100.0,
                s.sim_time_days,
                s.total_time_days,
                s.report_step,
                s.num_report_steps,
                s.substeps,
                s.failed_substeps,
                event.elapsed_wall_s
            );
        }
        _ => {
            let spinner = ['|', '/', '-', '\\'];
            let spin_idx = ((event.elapsed_wall_s * 10.0) as usize) % spinner.len();
            let mut line = format!(
                "\r{} {}  elapsed={:.2}s",
                spinner[spin_idx],
                event.stage.label(),
                event.elapsed_wall_s
            );
            if let Some(msg) = &event.message {
                line.push_str(&format!("  {}", msg));
            }
            print!("{}", line);
        }
    }
    let _ = io::stdout().flush();
}

fn print_timing_summary(timing: &RunTimingSummary) {
    let total = timing.total_time_s.max(1.0e-12);
    println!("\nTiming summary:");
    println!(
        "  Compile: {:.3}s ({:.1}%)",
        timing.compile_time_s,
        100.0 * timing.compile_time_s / total
    );
    println!(
        "  Solve:   {:.3}s ({:.1}%)",
        timing.solve_time_s,
        100.0 * timing.solve_time_s / total
    );
    println!(
        "  Save:    {:.3}s ({:.1}%)",
        timing.save_time_s,
        100.0 * timing.save_time_s / total
    );
    if timing.load_cache_time_s > 0.0 {
        println!("  Cache load: {:.3}s", timing.load_cache_time_s);
    }
    println!("  Total:   {:.3}s", timing.total_time_s);
}

fn cmd_runs(store_dir: &Path, case_name: Option<&str>) -> AppResult<()> {
    let runs = run_service::list_runs(store_dir, case_name)?;

    if runs.is_empty() {
        println!("No runs found in {}", store_dir.display());
    } else {
        println!("Runs in {}:", store_dir.display());
        for manifest in runs {
            println!(
                "  {} {} ({}, {:?})",
                manifest.run_id, manifest.case_name, manifest.timestamp, manifest.run_kind
            );
        }
    }
    Ok(())
}

fn cmd_show_run(store_dir: &Path, run_id: &str) -> AppResult<()> {
    println!("Loading run: {}", run_id);

    let run = run_service::load_run(store_dir, run_id)?;
    let manifest = &run.manifest;
    println!("\nRun:");
    println!("  Case: {}", manifest.case_name);
    println!("  Created: {}", manifest.timestamp);
    println!("  Kind: {:?}", manifest.run_kind);
    println!("  Solver version: {}", manifest.solver_version);
    println!("  Adaptive: {}", manifest.adaptive);
    println!("  Report steps: {}", manifest.num_report_steps);

    match &run.summary {
        Some(summary) => {
            println!("\nSummary:");
            println!("  Converged: {}", summary.report.converged);
            println!("  Substeps: {}", summary.report.substeps);
            println!("  Failed substeps: {}", summary.report.failed_substeps);
            println!("  Total time: {:.3}s", summary.report.total_time_s);
        }
        None => println!("\nSummary: not written (run incomplete)"),
    }

    if let Ok(overview) = query::get_overview(&run.snapshots) {
        println!("\nSnapshots:");
        println!("  Count: {}", overview.record_count);
        println!(
            "  Time range: {:.1} - {:.1} days",
            overview.time_range_days.0, overview.time_range_days.1
        );
        println!("  Final pressure: {:.2} bar", overview.final_pressure_bar);
        println!(
            "  Cumulative production: {:.1} m3",
            overview.cumulative_production_m3
        );
        if overview.cumulative_influx_m3 > 0.0 {
            println!(
                "  Cumulative influx: {:.1} m3",
                overview.cumulative_influx_m3
            );
        }
        if let Some(step) = overview.bhp_switch_step {
            println!("  BHP control from report step: {}", step);
        }
    }

    Ok(())
}

fn cmd_export_series(
    store_dir: &Path,
    run_id: &str,
    variable: &str,
    output: Option<&Path>,
) -> AppResult<()> {
    let run = run_service::load_run(store_dir, run_id)?;
    let series = query::extract_series(&run.snapshots, variable)?;

    let mut csv = format!("time_days,{}\n", variable);
    for (t, val) in &series {
        csv.push_str(&format!("{},{}\n", t, val));
    }

    if let Some(path) = output {
        std::fs::write(path, csv)?;
        println!(
            "✓ Exported {} data points to {}",
            series.len(),
            path.display()
        );
    } else {
        print!("{}", csv);
    }

    Ok(())
}
