//! Retirement projection CLI
//!
//! Simulates the configured portfolio, runs the savings program on the
//! simulated annual returns and prints metrics plus the detailed report.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;

use retirement_projection::{summarize, ScenarioConfig, ScenarioRunner, METRIC_KEYS};

#[derive(Debug, Parser)]
#[command(name = "retirement-projection", version, about)]
struct Cli {
    /// Scenario JSON; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the number of portfolio simulations
    #[arg(short = 'n', long)]
    simulations: Option<usize>,

    /// Override the portfolio simulation seed
    #[arg(long)]
    seed: Option<u64>,

    /// Simulation whose path feeds the detailed report
    #[arg(long, default_value_t = 0)]
    simulation: usize,

    /// Run the program on every simulation and print metric distributions
    #[arg(long)]
    all_simulations: bool,

    /// Write the detailed report as CSV
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ScenarioConfig::from_json_path(path)
            .with_context(|| format!("failed to load scenario {}", path.display()))?,
        None => ScenarioConfig::default(),
    };
    if let Some(n) = cli.simulations {
        config.simulation.num_simulations = n;
    }
    if let Some(seed) = cli.seed {
        config.simulation.seed = Some(seed);
    }

    println!("Retirement Projection v{}", env!("CARGO_PKG_VERSION"));
    println!("==========================\n");
    println!("Program: {:?}", config.program.kind);
    println!("  Entry age: {}", config.program.age);
    println!("  Sex: {:?}", config.program.sex);
    println!("  Horizon: {} years", config.program_years());
    println!("  Payment mode: {:?}", config.program.payment_mode);
    println!("  Simulations: {}", config.simulation.num_simulations);
    println!();

    let runner = ScenarioRunner::new(config).context("failed to prepare scenario")?;

    let start = Instant::now();
    let paths = runner.simulate_portfolio().context("portfolio simulation failed")?;
    println!(
        "Simulated {} paths of {} steps in {:?}\n",
        paths.num_simulations(),
        paths.num_steps(),
        start.elapsed()
    );

    let engine = runner
        .run(&paths, cli.simulation)
        .with_context(|| format!("program run failed on simulation {}", cli.simulation))?;
    let trajectory = engine.trajectory()?;
    let report = engine.detailed_report()?;
    let metrics = engine.compute_metrics()?;

    println!("Detailed report (simulation {}):", cli.simulation);
    print!("{}", report.to_table());

    println!("\nSummary:");
    println!("  Total Contributed: {:.2}", trajectory.total_contributed());
    println!("  Total Co-financing: {:.2}", trajectory.total_co_financing());
    println!("  Total Fees: {:.2}", trajectory.total_fees_paid());
    println!("  Final Accumulation: {:.2}", trajectory.final_accumulation);

    println!("\nMetrics:");
    for (key, value) in metrics.iter() {
        println!("  {:<8} {:>14.6}", key, value);
    }

    if cli.all_simulations {
        let start = Instant::now();
        let all = runner.run_all(&paths).context("program run failed")?;
        let summary = summarize(&all);

        println!("\nMetric distribution over {} simulations ({:?}):", all.len(), start.elapsed());
        println!("{:<8} {:>14} {:>14} {:>14} {:>14} {:>6}", "Metric", "Mean", "Median", "P5", "P95", "N");
        println!("{}", "-".repeat(76));
        for key in METRIC_KEYS {
            if let Some(s) = summary.get(key) {
                println!(
                    "{:<8} {:>14.6} {:>14.6} {:>14.6} {:>14.6} {:>6}",
                    key, s.mean, s.median, s.p5, s.p95, s.count
                );
            }
        }
    }

    if let Some(path) = &cli.output {
        report
            .write_csv_path(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("\nReport written to: {}", path.display());
    }

    Ok(())
}
