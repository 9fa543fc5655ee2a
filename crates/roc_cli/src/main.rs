use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDateTime};
use clap::{Parser, Subcommand};
use roc_core::metrics::{append_snapshot_row, write_snapshot_header};
use roc_core::{compute_snapshot, MassBalance, OperationStep, Spill, Weatherer};
use roc_world::{build_operations, build_spill, load_catalog, load_scenario, scenario_rng};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "roc_cli", about = "Oil spill response options CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a response scenario to completion.
    Run {
        #[arg(long)]
        scenario: PathBuf,
        #[arg(long, default_value = "./content")]
        content_dir: String,
        /// Overrides the scenario's seed.
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, default_value_t = 4)]
        print_every: u64,
        /// Write a mass-balance row per step to this CSV file.
        #[arg(long)]
        csv: Option<PathBuf>,
    },
}

// ---------------------------------------------------------------------------
// Run loop
// ---------------------------------------------------------------------------

fn step_duration(seconds: f64) -> Duration {
    #[allow(clippy::cast_possible_truncation)] // model steps are far below i64 ms
    Duration::milliseconds((seconds * 1000.0).round() as i64)
}

fn open_csv(path: &Path) -> Result<std::io::BufWriter<std::fs::File>> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating CSV file: {}", path.display()))?;
    let mut writer = std::io::BufWriter::new(file);
    write_snapshot_header(&mut writer).context("writing CSV header")?;
    Ok(writer)
}

fn run(
    scenario_path: &Path,
    content_dir: &str,
    seed: Option<u64>,
    print_every: u64,
    csv: Option<&Path>,
) -> Result<()> {
    let catalog = load_catalog(content_dir)?;
    let scenario = load_scenario(scenario_path)?;
    let (seed, mut rng) = scenario_rng(&scenario, seed);

    let mut spill = build_spill(&scenario, &mut rng);
    let mut operations = build_operations(&scenario, &catalog, &mut rng)?;
    let mut ledger = MassBalance::new();
    roc_core::prepare_run(&mut operations, &mut ledger);

    let mut csv_writer = csv.map(open_csv).transpose()?;
    let initial_mass = spill.total_mass();
    let print_every = print_every.max(1);

    println!(
        "Starting scenario '{}': steps={} step={}s seed={seed} elements={} mass={initial_mass:.0} kg operations={}",
        scenario.name,
        scenario.steps,
        scenario.time_step_s,
        spill.element_count(),
        operations.len(),
    );
    println!("{}", "-".repeat(80));

    let mut model_time = scenario.start_time;
    for step_index in 1..=scenario.steps {
        let steps = roc_core::step(
            &mut operations,
            &mut spill,
            &mut ledger,
            scenario.time_step_s,
            model_time,
        );
        model_time += step_duration(scenario.time_step_s);

        if let Some(writer) = csv_writer.as_mut() {
            let snapshot = compute_snapshot(step_index, model_time, &spill, &ledger);
            append_snapshot_row(writer, &snapshot).context("writing CSV row")?;
        }
        if step_index % print_every == 0 {
            print_status(step_index, model_time, &spill, &ledger, &steps);
        }
    }

    println!("{}", "-".repeat(80));
    println!("Done. Final state at {}:", model_time.format("%Y-%m-%d %H:%M"));
    print_removals(&spill, &ledger, initial_mass);

    for operation in &operations {
        for advisory in ledger.reports(operation.id()) {
            println!("  ! {}: {advisory}", operation.id());
        }
    }

    if let Some(mut writer) = csv_writer {
        writer.flush().context("final CSV flush")?;
        if let Some(path) = csv {
            println!("Mass balance written to {}", path.display());
        }
    }

    let json = serde_json::to_string_pretty(&ledger).context("serializing ledger")?;
    println!("{json}");
    Ok(())
}

fn print_status(
    step_index: u64,
    model_time: NaiveDateTime,
    spill: &Spill,
    ledger: &MassBalance,
    steps: &[OperationStep],
) {
    let phases: Vec<String> = steps
        .iter()
        .map(|s| {
            if s.active {
                format!("{}={}", s.id, s.phase)
            } else {
                format!("{}=off", s.id)
            }
        })
        .collect();
    println!(
        "[step={step_index:04}  {}]  floating={:.0}  removed={:.0}  {}",
        model_time.format("%m-%d %H:%M"),
        spill.total_mass(),
        ledger.total_removed(),
        phases.join("  "),
    );
}

fn print_removals(spill: &Spill, ledger: &MassBalance, initial_mass: f64) {
    let share = |kg: f64| {
        if initial_mass > 0.0 {
            100.0 * kg / initial_mass
        } else {
            0.0
        }
    };
    for key in [
        roc_core::BURNED,
        roc_core::BOOMED,
        roc_core::SKIMMED,
        roc_core::CHEM_DISPERSED,
    ] {
        let kg = ledger.mass(key);
        println!("  {key:<15} {kg:>14.1} kg  ({:5.1}%)", share(kg));
    }
    let floating = spill.total_mass();
    println!("  {:<15} {floating:>14.1} kg  ({:5.1}%)", "floating", share(floating));
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            scenario,
            content_dir,
            seed,
            print_every,
            csv,
        } => {
            tracing::info!(scenario = %scenario.display(), "starting run");
            run(&scenario, &content_dir, seed, print_every, csv.as_deref())?;
        }
    }
    Ok(())
}
