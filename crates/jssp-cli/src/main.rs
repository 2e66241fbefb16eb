//! jssp CLI - Job-Shop Scheduling Engine
//!
//! Command-line interface for validating instances, building greedy seed
//! schedules, and running the windowed decomposition optimizer.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use jssp_core::{is_valid, violations, Instance, Schedule};
use jssp_solver::{
    optimize, solve_greedily, solve_randomized, DriverConfig, SimulatedAnnealer,
};

mod parse;

#[derive(Parser)]
#[command(name = "jssp")]
#[command(author, version, about = "Job-shop scheduling engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and validate an instance file
    Check {
        /// Input file path
        #[arg(value_name = "FILE")]
        file: std::path::PathBuf,
    },

    /// Build a greedy seed schedule
    Greedy {
        /// Input file path
        #[arg(value_name = "FILE")]
        file: std::path::PathBuf,

        /// Randomize the job insertion order with this seed
        #[arg(short, long)]
        seed: Option<u64>,

        /// Emit the schedule as JSON instead of a machine timeline
        #[arg(long)]
        json: bool,
    },

    /// Optimize a schedule by windowed decomposition
    Solve {
        /// Input file path
        #[arg(value_name = "FILE")]
        file: std::path::PathBuf,

        /// Width of the sliding window
        #[arg(short, long, default_value_t = 8)]
        window_size: i64,

        /// Maximum number of passes over the schedule
        #[arg(short, long, default_value_t = 10)]
        passes: usize,

        /// Slack above the makespan when sweeping window starts
        #[arg(long, default_value_t = 3)]
        margin: i64,

        /// Annealer reads per window
        #[arg(long, default_value_t = 40)]
        num_reads: usize,

        /// Annealer sweeps per read
        #[arg(long, default_value_t = 200)]
        sweeps: usize,

        /// Seed for the greedy constructor, window order, and annealer
        #[arg(short, long, default_value_t = 0)]
        seed: u64,

        /// Visit window positions in random order
        #[arg(long)]
        shuffle: bool,

        /// Per-window wall-clock budget in milliseconds
        #[arg(long)]
        time_budget_ms: Option<u64>,

        /// Emit the final schedule as JSON instead of a machine timeline
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check { file } => {
            let instance = read_instance(&file)?;
            println!(
                "{}: {} jobs, {} machines, {} operations, total work {}",
                file.display(),
                instance.num_jobs(),
                instance.num_machines(),
                instance.num_operations(),
                instance.total_duration()
            );
        }
        Commands::Greedy { file, seed, json } => {
            let instance = read_instance(&file)?;
            let schedule = match seed {
                Some(seed) => {
                    let mut rng = StdRng::seed_from_u64(seed);
                    solve_randomized(&instance, &mut rng)
                }
                None => solve_greedily(&instance),
            };
            println!("makespan: {}", schedule.makespan(&instance));
            report(&instance, &schedule, json)?;
        }
        Commands::Solve {
            file,
            window_size,
            passes,
            margin,
            num_reads,
            sweeps,
            seed,
            shuffle,
            time_budget_ms,
            json,
        } => {
            let instance = read_instance(&file)?;
            let initial = solve_greedily(&instance);
            println!("seed makespan: {}", initial.makespan(&instance));

            let annealer = SimulatedAnnealer {
                num_reads,
                sweeps,
                seed,
                time_budget: time_budget_ms.map(Duration::from_millis),
            };
            let config = DriverConfig {
                window_size,
                passes,
                margin,
                shuffle,
                seed,
                ..DriverConfig::default()
            };

            let mut driver = optimize(&instance, initial, annealer, config);
            for improvement in driver.by_ref() {
                println!(
                    "window {:>4}: makespan {}",
                    improvement.window_start, improvement.makespan
                );
            }
            let schedule = driver.schedule().clone();
            println!("final makespan: {}", schedule.makespan(&instance));
            report(&instance, &schedule, json)?;
        }
    }

    Ok(())
}

fn read_instance(path: &std::path::Path) -> Result<Instance> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    parse::parse_instance(&text)
}

/// Print a schedule as JSON or as a per-machine timeline.
fn report(instance: &Instance, schedule: &Schedule, json: bool) -> Result<()> {
    if !is_valid(instance, schedule) {
        for violation in violations(instance, schedule) {
            eprintln!("{violation:?}");
        }
        anyhow::bail!("schedule is not feasible");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(schedule)?);
        return Ok(());
    }

    for (machine, slots) in schedule.machine_timeline(instance).iter().enumerate() {
        print!("m{machine}:");
        for slot in slots {
            print!(
                " [{}, {}) j{}.{}",
                slot.start,
                slot.start + slot.duration,
                slot.job,
                slot.position
            );
        }
        println!();
    }
    Ok(())
}
