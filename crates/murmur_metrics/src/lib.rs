//! Murmur Metrics - tick pipeline instrumentation
//!
//! Timing types compile to unit stubs unless the `metrics` feature is on, so
//! release hosts pay nothing for them. Tick outcome counts are always kept.
//!
//! # Feature Flags
//!
//! - `metrics` - Enable timing collection (default: disabled)
//!
//! # Usage
//!
//! ```ignore
//! use murmur_metrics::{FpsReadout, TickTimer};
//!
//! let mut timer = TickTimer::new(120);
//! let mut readout = FpsReadout::new(0.5);
//! let view = timer.measure(|| sim.step(dt))?;
//! if let Some(fps) = readout.tick(dt) {
//!     println!("FPS: {fps:.0}, tick {:.2} ms", timer.average_ms());
//! }
//! ```

mod tick_counter;

#[cfg(feature = "metrics")]
mod fps_readout;
#[cfg(feature = "metrics")]
mod ring_buffer;
#[cfg(feature = "metrics")]
mod stage_profiler;
#[cfg(feature = "metrics")]
mod tick_timer;

pub use tick_counter::TickCounter;

#[cfg(feature = "metrics")]
pub use fps_readout::FpsReadout;
#[cfg(feature = "metrics")]
pub use stage_profiler::StageProfiler;
#[cfg(feature = "metrics")]
pub use tick_timer::TickTimer;

/// Compile the enclosed statements only when the calling crate enables its
/// `metrics` feature.
#[macro_export]
macro_rules! metrics {
    ($($tt:tt)*) => {
        #[cfg(feature = "metrics")]
        {
            $($tt)*
        }
    };
}

// ----------------------------------------------------------------------------
// Stubs for builds without `metrics`
// ----------------------------------------------------------------------------

#[cfg(not(feature = "metrics"))]
pub struct TickTimer;

#[cfg(not(feature = "metrics"))]
impl TickTimer {
    pub fn new(_window: usize) -> Self { Self }
    pub fn measure<F, R>(&mut self, tick: F) -> R where F: FnOnce() -> R { tick() }
    pub fn last(&self) -> std::time::Duration { std::time::Duration::ZERO }
    pub fn average_ms(&self) -> f64 { 0.0 }
    pub fn range_ms(&self) -> (f64, f64) { (0.0, 0.0) }
    pub fn headroom_hz(&self) -> f64 { 0.0 }
}

#[cfg(not(feature = "metrics"))]
pub struct FpsReadout;

#[cfg(not(feature = "metrics"))]
impl FpsReadout {
    pub fn new(_refresh_secs: f32) -> Self { Self }
    pub fn tick(&mut self, _dt: f32) -> Option<f32> { None }
    pub fn fps(&self) -> f32 { 0.0 }
}

#[cfg(not(feature = "metrics"))]
#[derive(Default)]
pub struct StageProfiler;

#[cfg(not(feature = "metrics"))]
impl StageProfiler {
    pub fn new(_window: usize) -> Self { Self }
    pub fn record(&mut self, _name: &str, _elapsed: std::time::Duration) {}
    pub fn average(&self, _name: &str) -> std::time::Duration { std::time::Duration::ZERO }
    pub fn iter(&self) -> impl Iterator<Item = (&str, std::time::Duration)> + '_ { std::iter::empty() }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    #[test]
    fn api_is_identical_with_or_without_metrics() {
        let mut timer = super::TickTimer::new(60);
        assert_eq!(timer.measure(|| 3), 3);
        let mut readout = super::FpsReadout::new(0.5);
        let _ = readout.tick(1.0 / 60.0);
        let mut profiler = super::StageProfiler::new(8);
        profiler.record("hash", Duration::from_micros(5));
        let _ = profiler.average("hash");
        let mut counter = super::TickCounter::new();
        counter.commit();
        assert_eq!(counter.committed(), 1);
    }
}
