//! Simulation handle: the host-facing `initialize` / `step` / `dispose`
//! contract.

use crate::aggregate::CellAggregates;
use crate::config::FlockConfig;
use crate::error::{SimulationError, TickError};
use crate::force::ForceParams;
use crate::grid::GridJitter;
use crate::pipeline::{flock_schedule, StageFn, TickContext};
use crate::schedule::{Schedule, StageCompletion, StageError, StageGraph};
use crate::stats::FlockStats;
use crate::store::BoidStore;
use crate::time::SimulationTime;
use crate::view::TransformView;
use murmur_metrics::{StageProfiler, TickCounter};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rayon::prelude::*;

/// Window of per-stage timing samples kept by the profiler.
const PROFILE_WINDOW: usize = 120;

/// One running flock.
pub struct Simulation {
    config: FlockConfig,
    params: ForceParams,
    store: BoidStore,
    rng: SmallRng,
    time: SimulationTime,
    schedule: Schedule<StageFn>,
    pool: Option<rayon::ThreadPool>,
    profiler: StageProfiler,
    counter: TickCounter,
    last_stats: FlockStats,
}

impl Simulation {
    /// Validate `config` and scatter `population` boids through the cage.
    pub fn initialize(population: usize, config: FlockConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        let mut rng = SmallRng::seed_from_u64(config.seed);
        let store = BoidStore::random(population, config.cage_half_extent, &mut rng);
        Self::build(store, config, rng)
    }

    /// Validate `config` and start from host-provided state.
    pub fn initialize_with(store: BoidStore, config: FlockConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        let rng = SmallRng::seed_from_u64(config.seed);
        Self::build(store, config, rng)
    }

    fn build(store: BoidStore, config: FlockConfig, rng: SmallRng) -> Result<Self, SimulationError> {
        let pool = match config.worker_threads {
            Some(threads) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|index| format!("murmur-worker-{index}"))
                    .build()?,
            ),
            None => None,
        };
        let schedule = flock_schedule()?;

        tracing::info!(
            population = store.len(),
            perception_radius = config.perception_radius,
            cage_half_extent = config.cage_half_extent,
            workers = config.worker_threads.unwrap_or_else(rayon::current_num_threads),
            seed = config.seed,
            "flock initialized"
        );

        let last_stats = FlockStats {
            population: store.len(),
            ..FlockStats::default()
        };
        Ok(Self {
            params: ForceParams::from(&config),
            config,
            store,
            rng,
            time: SimulationTime::new(),
            schedule,
            pool,
            profiler: StageProfiler::new(PROFILE_WINDOW),
            counter: TickCounter::new(),
            last_stats,
        })
    }

    /// Advance the flock by `delta_secs` and return the new transforms.
    ///
    /// Blocks until every stage finished. On error nothing has been written:
    /// the store still holds the previous tick's state.
    pub fn step(&mut self, delta_secs: f32) -> Result<TransformView<'_>, TickError> {
        if !(delta_secs.is_finite() && delta_secs >= 0.0) {
            return Err(TickError::InvalidDeltaTime(delta_secs));
        }

        if self.store.is_empty() {
            self.time.advance_tick(delta_secs);
            return Ok(self.view());
        }

        let jitter = GridJitter::draw(&mut self.rng, self.config.perception_radius);
        match self.run_tick(jitter, delta_secs) {
            Ok((completions, cells)) => {
                self.store.swap_buffers();
                self.time.advance_tick(delta_secs);
                self.record(&completions, &cells);
                tracing::debug!(
                    tick = self.time.tick_count(),
                    cells = cells.cell_count(),
                    "tick committed"
                );
                Ok(self.view())
            }
            Err(err) => {
                self.counter.abort();
                tracing::warn!(tick = self.time.tick_count() + 1, error = %err, "tick aborted");
                Err(err.into())
            }
        }
    }

    fn run_tick(
        &mut self,
        jitter: GridJitter,
        delta_secs: f32,
    ) -> Result<(Vec<StageCompletion>, CellAggregates), StageError> {
        let (current, next) = self.store.split_buffers();
        let ctx = TickContext::new(
            current,
            next,
            self.params,
            self.config.boid_speed,
            delta_secs,
            jitter,
        );

        let schedule = &self.schedule;
        let completions = match &self.pool {
            Some(pool) => pool.install(|| schedule.run(&ctx))?,
            None => schedule.run(&ctx)?,
        };

        let cells = ctx.into_cells().ok_or_else(|| StageError {
            stage: crate::pipeline::STAGE_MERGE.to_string(),
            fault: crate::schedule::StageFault::MissingInput(crate::pipeline::CELLS),
        })?;
        Ok((completions, cells))
    }

    fn record(&mut self, completions: &[StageCompletion], cells: &CellAggregates) {
        murmur_metrics::metrics! {
            for completion in completions {
                self.profiler
                    .record(self.schedule.stage_name(completion.handle), completion.elapsed);
            }
        }
        self.counter.commit();

        let nearby: u64 = (0..cells.len())
            .into_par_iter()
            .map(|index| u64::from(cells.cell_of(index).nearby_count()))
            .sum();
        let mean_nearby = nearby as f32 / cells.len().max(1) as f32;
        self.last_stats = FlockStats::measure(
            self.store.current(),
            self.config.boid_speed,
            cells.cell_count(),
            mean_nearby,
        );
    }

    /// Transforms of the committed state.
    pub fn view(&self) -> TransformView<'_> {
        TransformView::new(self.store.positions(), self.store.rotations())
    }

    pub fn store(&self) -> &BoidStore {
        &self.store
    }

    pub fn config(&self) -> &FlockConfig {
        &self.config
    }

    pub fn time(&self) -> &SimulationTime {
        &self.time
    }

    pub fn population(&self) -> usize {
        self.store.len()
    }

    /// Statistics of the last committed tick.
    pub fn stats(&self) -> FlockStats {
        self.last_stats
    }

    /// The per-tick stage graph.
    pub fn stage_graph(&self) -> &StageGraph {
        self.schedule.graph()
    }

    pub fn profiler(&self) -> &StageProfiler {
        &self.profiler
    }

    /// Committed and aborted tick counts.
    pub fn counter(&self) -> &TickCounter {
        &self.counter
    }

    /// Tear the simulation down. Consumes the handle.
    pub fn dispose(self) {
        tracing::info!(
            ticks = self.time.tick_count(),
            simulated_secs = self.time.elapsed_secs(),
            "flock disposed"
        );
    }
}
