use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use signal_sim::simulation::{ControlPolicy, SimConfig, SimWorld, Topology};

#[derive(Parser)]
#[command(name = "signal_sim")]
#[command(about = "Headless traffic signal simulation")]
struct Cli {
    /// Number of simulation ticks to run
    #[arg(long, default_value = "1000")]
    ticks: u32,

    /// Time delta per tick in seconds
    #[arg(long, default_value = "0.1")]
    delta: f32,

    /// Seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Road layout, overrides the config file
    #[arg(long, value_enum)]
    topology: Option<Topology>,

    /// Signal policy, overrides the config file
    #[arg(long, value_enum)]
    policy: Option<ControlPolicy>,

    /// Simulation speed multiplier
    #[arg(long, default_value = "1.0")]
    speed: f32,

    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Hour of day at simulated time zero
    #[arg(long)]
    start_hour: Option<f32>,

    /// Print one JSON frame per simulated second instead of summaries
    #[arg(long)]
    frames: bool,

    /// Skip the per-second summaries and maps
    #[arg(long)]
    quiet: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn,signal_sim=info"))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    if let Some(topology) = cli.topology {
        config.topology = topology;
    }
    if let Some(policy) = cli.policy {
        config.policy = policy;
    }
    if let Some(start_hour) = cli.start_hour {
        config.start_hour = start_hour;
    }

    let mut world = match cli.seed {
        Some(seed) => SimWorld::new_with_seed(config, seed),
        None => SimWorld::new(config),
    };
    world.set_speed(cli.speed);

    run_headless(&mut world, &cli)
}

/// Run the simulation without graphics
fn run_headless(world: &mut SimWorld, cli: &Cli) -> Result<()> {
    let delta = cli.delta;
    if !(delta > 0.0) {
        anyhow::bail!("--delta must be positive, got {}", delta);
    }
    let verbose = !cli.quiet && !cli.frames;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    // Calculate how many ticks equal 1 second of simulation time
    let ticks_per_second = (1.0 / delta).ceil() as u32;
    if verbose {
        println!("Running signal simulation in headless mode...");
        println!("Ticks: {}, Delta: {}s", cli.ticks, delta);
        println!("Running {} ticks per second (simulated time)", ticks_per_second);
        println!();
        println!("Initial state:");
        world.print_summary();
        world.draw_map();
        println!();
    }

    let mut tick = 0;
    while tick < cli.ticks {
        let ticks_to_run = ticks_per_second.min(cli.ticks - tick);
        for _ in 0..ticks_to_run {
            tick += 1;
            world.tick(delta);
        }

        if cli.frames {
            let frame = serde_json::to_string(&world.snapshot())
                .context("Failed to serialize simulation frame")?;
            writeln!(out, "{}", frame).context("Failed to write simulation frame")?;
        } else if verbose {
            println!(
                "--- After tick {} ({:.1}s simulated time) ---",
                tick, world.time
            );
            world.print_summary();
            world.draw_map();
            println!();
        }
    }

    if verbose {
        println!("=== Final State ===");
        world.print_summary();
        world.draw_map();
    }

    let metrics = &world.metrics;
    info!("=== SIMULATION COMPLETE ===");
    info!("Simulated time: {:.2}s", world.time);
    info!("Total vehicles spawned: {}", metrics.total_vehicles);
    info!("Total vehicles exited: {}", metrics.vehicles_exited);
    info!("Active vehicles: {}", metrics.vehicle_count);
    info!("Average wait time: {:.2}s", metrics.average_wait_time);
    info!("Throughput: {:.1} vehicles/min", metrics.throughput_per_minute);
    Ok(())
}
