//! Simulation time
//!
//! The host chooses the step length; time here is simply the sum of every
//! committed tick's delta.

/// Reference step used by the headless runtime (60 Hz)
pub const DEFAULT_TICK_RATE_HZ: u32 = 60;
pub const DEFAULT_DELTA_SECS: f32 = 1.0 / DEFAULT_TICK_RATE_HZ as f32;

/// Simulation time tracker
#[derive(Debug, Clone, Default)]
pub struct SimulationTime {
    tick_count: u64,
    elapsed_secs: f64,
}

impl SimulationTime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Record a committed tick of `delta_secs`.
    pub fn advance_tick(&mut self, delta_secs: f32) {
        self.tick_count += 1;
        self.elapsed_secs += f64::from(delta_secs);
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }
}
