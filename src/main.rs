//! energy-sched entry point: CLI wiring, input loading and report output.

use std::io;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::{error, info, warn};

use energy_sched::config::{ConfigError, ScenarioConfig};
use energy_sched::dataset::{reference_profile, reference_tasks};
use energy_sched::demand::TaskRow;
use energy_sched::io::export::{export_assignments_csv, export_report_csv, write_json};
use energy_sched::io::load::{load_profile, load_tasks};
use energy_sched::profile::HourlyProfile;
use energy_sched::SchedError;
use energy_sched::runner::{self, RunResult, Strategy};
use energy_sched::sched::CostReport;

/// Energy-cost-aware scheduler for prioritized compute tasks.
///
/// Without --profile/--tasks the built-in reference day is used.
#[derive(Debug, Parser)]
#[command(name = "energy-sched", version, long_about = None)]
struct Cli {
    /// Load scenario from a TOML config file.
    #[arg(long, conflicts_with = "preset")]
    config: Option<PathBuf>,

    /// Use a built-in preset (reference, green_bias, strict).
    #[arg(long)]
    preset: Option<String>,

    /// Hourly profile CSV (hour,trad_price,green_price,green_supply).
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Task table CSV (time_range,high,mid,low).
    #[arg(long)]
    tasks: Option<PathBuf>,

    /// Override the strategy (greedy, optimal, in_place, compare).
    ///
    /// optimal and compare need the default HiGHS backend for full-day
    /// windows; a microlp-only build handles small models only.
    #[arg(long)]
    strategy: Option<String>,

    /// Write the per-hour report of the last strategy to CSV.
    #[arg(long)]
    report_out: Option<PathBuf>,

    /// Write the per-subtask assignments of the last strategy to CSV.
    #[arg(long)]
    assignments_out: Option<PathBuf>,

    /// Print the cost reports as JSON instead of text.
    #[arg(long)]
    json: bool,

    /// Also run N seeded perturbations of the input day.
    #[arg(long, value_name = "N")]
    robustness: Option<usize>,

    /// Override the robustness seed.
    #[arg(long)]
    seed: Option<u64>,
}

fn load_config(cli: &Cli) -> Result<ScenarioConfig, Vec<ConfigError>> {
    // --config takes priority, then --preset, then the reference default
    let mut scenario = if let Some(ref path) = cli.config {
        ScenarioConfig::from_toml_file(path).map_err(|e| vec![e])?
    } else if let Some(ref name) = cli.preset {
        ScenarioConfig::from_preset(name).map_err(|e| vec![e])?
    } else {
        ScenarioConfig::reference()
    };

    if let Some(ref strategy) = cli.strategy {
        scenario.run.strategy.clone_from(strategy);
    }
    if let Some(seed) = cli.seed {
        scenario.robustness.seed = seed;
    }
    if let Some(n) = cli.robustness {
        scenario.robustness.variants = n;
    }

    let errors = scenario.validate();
    if errors.is_empty() {
        Ok(scenario)
    } else {
        Err(errors)
    }
}

fn load_inputs(cli: &Cli) -> Result<(HourlyProfile, Vec<TaskRow>), SchedError> {
    let profile = match cli.profile {
        Some(ref path) => load_profile(path)?,
        None => reference_profile(),
    };
    let tasks = match cli.tasks {
        Some(ref path) => load_tasks(path)?,
        None => reference_tasks(),
    };
    Ok((profile, tasks))
}

fn print_reports(result: &RunResult, as_json: bool) -> Result<(), SchedError> {
    let reports: Vec<CostReport> = result.outcomes.iter().map(|o| o.report.clone()).collect();
    if as_json {
        return write_json(&reports, io::stdout().lock());
    }

    for report in &reports {
        println!("{report}\n");
    }
    if let Some(baseline) = result.report("in_place") {
        for report in reports.iter().filter(|r| r.strategy != "in_place") {
            let (saved, pct) = report.savings_vs(baseline);
            println!("{} saves {saved:.2} ({pct:.2}%) vs in_place", report.strategy);
        }
    }
    Ok(())
}

fn write_exports(cli: &Cli, profile: &HourlyProfile, result: &RunResult) -> io::Result<()> {
    let Some(last) = result.outcomes.last() else {
        return Ok(());
    };
    if let Some(ref path) = cli.report_out {
        export_report_csv(profile, &last.report, path)?;
        info!(path = %path.display(), "report written");
    }
    if let Some(ref path) = cli.assignments_out {
        export_assignments_csv(&last.schedule.assignments, path)?;
        info!(path = %path.display(), "assignments written");
    }
    Ok(())
}

fn run_robustness(
    scenario: &ScenarioConfig,
    strategy: Strategy,
    profile: &HourlyProfile,
    tasks: &[TaskRow],
) -> Result<(), SchedError> {
    let count = scenario.robustness.variants;
    info!(count, seed = scenario.robustness.seed, "robustness sweep");
    let variants = runner::run_robustness(scenario, strategy, profile, tasks, count)?;
    println!("\n--- Robustness ({count} variants) ---");
    for variant in &variants {
        for report in &variant.reports {
            println!(
                "variant {:>3} {:<9} cost {:>10.2}  avg utilization {:>6.2}%",
                variant.index,
                report.strategy,
                report.total_cost,
                report.avg_utilization_pct
            );
        }
    }
    Ok(())
}

fn fail(message: impl std::fmt::Display) -> ! {
    error!("{message}");
    process::exit(1);
}

fn main() {
    // Level is controlled by RUST_LOG (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let scenario = match load_config(&cli) {
        Ok(cfg) => cfg,
        Err(errors) => {
            for e in &errors {
                error!("{e}");
            }
            process::exit(1);
        }
    };
    let Some(strategy) = Strategy::from_name(&scenario.run.strategy) else {
        fail(format!("unknown strategy \"{}\"", scenario.run.strategy));
    };

    let (profile, tasks) = load_inputs(&cli).unwrap_or_else(|e| fail(e));
    if cli.profile.is_none() || cli.tasks.is_none() {
        warn!("using built-in reference data for missing inputs");
    }

    let result = runner::run(&scenario, strategy, &profile, &tasks).unwrap_or_else(|e| fail(e));
    for rejected in &result.demand.rejected {
        warn!("skipped: {rejected}");
    }

    if let Err(e) = print_reports(&result, cli.json) {
        fail(format!("failed to print reports: {e}"));
    }
    if let Err(e) = write_exports(&cli, &profile, &result) {
        fail(format!("failed to write CSV: {e}"));
    }

    if cli.robustness.is_some() {
        if let Err(e) = run_robustness(&scenario, strategy, &profile, &tasks) {
            fail(e);
        }
    }
}
