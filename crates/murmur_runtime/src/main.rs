//! Murmur Runtime
//!
//! Headless host: builds a flock, steps it and reports progress through
//! tracing. Rendering is left to whatever consumes the transform view.

use anyhow::{ensure, Context, Result};
use clap::Parser;
use murmur_core::{FlockConfig, Simulation, TickError};
use murmur_metrics::{FpsReadout, TickTimer};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "murmur", version, about = "Run a headless boid flock")]
struct Cli {
    /// Number of boids.
    #[arg(short, long, default_value_t = 5_000)]
    boids: usize,

    /// Ticks to simulate before exiting.
    #[arg(short, long, default_value_t = 600)]
    ticks: u64,

    /// Fixed step in seconds. Without it the measured wall-clock time of the
    /// previous tick is used.
    #[arg(long)]
    dt: Option<f32>,

    /// JSON flock configuration; missing fields take their defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured RNG seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Override the configured worker thread count.
    #[arg(long)]
    threads: Option<usize>,

    /// Seconds between frame-rate readouts.
    #[arg(long, default_value_t = 0.5)]
    refresh: f32,

    /// Retry an aborted tick this many times before giving up.
    #[arg(long, default_value_t = 1)]
    retries: u32,
}

fn validate_cli(cli: &Cli) -> Result<()> {
    ensure!(
        cli.refresh.is_finite() && cli.refresh > 0.0,
        "--refresh must be a positive number of seconds (got {})",
        cli.refresh
    );
    if let Some(dt) = cli.dt {
        ensure!(dt.is_finite() && dt >= 0.0, "--dt must be finite and >= 0 (got {dt})");
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<FlockConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => FlockConfig::default(),
    };

    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(threads) = cli.threads {
        config.worker_threads = Some(threads);
    }
    Ok(config)
}

fn step_with_retry(sim: &mut Simulation, dt: f32, retries: u32) -> Result<(), TickError> {
    let mut attempt = 0;
    loop {
        match sim.step(dt) {
            Ok(_) => return Ok(()),
            Err(err) if attempt < retries => {
                attempt += 1;
                tracing::warn!(attempt, error = %err, "retrying tick from previous state");
            }
            Err(err) => return Err(err),
        }
    }
}

fn log_stage_graph(sim: &Simulation) {
    let graph = sim.stage_graph();
    for (handle, descriptor) in graph.iter() {
        let after: Vec<&str> = graph
            .dependencies(handle)
            .unwrap_or_default()
            .iter()
            .filter_map(|&dep| graph.descriptor(dep).map(|d| d.name()))
            .collect();
        tracing::debug!(stage = descriptor.name(), after = ?after, "stage registered");
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    tracing::info!("Murmur v{}", murmur_core::VERSION);
    validate_cli(&cli)?;

    let config = load_config(&cli)?;
    let mut sim = murmur_core::initialize(cli.boids, config).context("initializing flock")?;
    log_stage_graph(&sim);

    let mut timer = TickTimer::new(120);
    let mut readout = FpsReadout::new(cli.refresh);
    let mut last_frame = Instant::now();
    let mut dt = cli.dt.unwrap_or(murmur_core::time::DEFAULT_DELTA_SECS);

    for _ in 0..cli.ticks {
        timer
            .measure(|| step_with_retry(&mut sim, dt, cli.retries))
            .context("tick failed")?;
        if let Some(fixed) = cli.dt {
            let budget = Duration::from_secs_f32(fixed);
            if timer.last() > budget {
                tracing::debug!(
                    tick_us = timer.last().as_micros() as u64,
                    budget_us = budget.as_micros() as u64,
                    "tick slower than real time"
                );
            }
        }

        let now = Instant::now();
        let frame_secs = now.duration_since(last_frame).as_secs_f32();
        last_frame = now;
        if cli.dt.is_none() {
            dt = frame_secs;
        }

        if let Some(fps) = readout.tick(frame_secs) {
            let stats = sim.stats();
            tracing::info!(
                fps = fps.floor() as u32,
                tick_ms = %format!("{:.3}", timer.average_ms()),
                headroom_hz = timer.headroom_hz().floor() as u64,
                cells = stats.occupied_cells,
                mean_nearby = %format!("{:.2}", stats.mean_nearby),
                extent = %format!("{:.1}", stats.max_abs_coordinate),
                "FPS: {}",
                fps.floor() as u32
            );
        }
    }

    let (min_ms, max_ms) = timer.range_ms();
    tracing::info!(
        ticks = sim.time().tick_count(),
        simulated_secs = sim.time().elapsed_secs(),
        avg_tick_ms = timer.average_ms(),
        min_ms,
        max_ms,
        aborted = sim.counter().aborted(),
        abort_rate = sim.counter().abort_rate(),
        "run complete"
    );
    for (stage, avg) in sim.profiler().iter() {
        tracing::info!(stage, avg_us = avg.as_micros() as u64, "stage timing");
    }

    murmur_core::dispose(sim);
    Ok(())
}
