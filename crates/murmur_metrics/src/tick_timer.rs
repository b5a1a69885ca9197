//! Wall-clock cost of whole ticks.

use super::ring_buffer::RingBuffer;
use std::time::{Duration, Instant};

/// Rolling window over the cost of the last `window` ticks.
pub struct TickTimer {
    samples: RingBuffer<Duration>,
}

impl TickTimer {
    pub fn new(window: usize) -> Self {
        Self {
            samples: RingBuffer::new(window),
        }
    }

    /// Run `tick`, recording how long it took.
    pub fn measure<F, R>(&mut self, tick: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = tick();
        self.samples.push(start.elapsed());
        result
    }

    /// Cost of the most recent tick.
    pub fn last(&self) -> Duration {
        self.samples.latest().copied().unwrap_or_default()
    }

    pub fn average_ms(&self) -> f64 {
        self.samples.average().as_secs_f64() * 1000.0
    }

    pub fn range_ms(&self) -> (f64, f64) {
        let (min, max) = self.samples.min_max();
        (min.as_secs_f64() * 1000.0, max.as_secs_f64() * 1000.0)
    }

    /// Ticks per second the measured cost would allow.
    pub fn headroom_hz(&self) -> f64 {
        let avg = self.samples.average().as_secs_f64();
        if avg > 0.0 { 1.0 / avg } else { 0.0 }
    }
}
