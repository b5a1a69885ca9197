//! Rolling per-stage timings for the tick pipeline

use super::ring_buffer::RingBuffer;
use std::collections::HashMap;
use std::time::Duration;

pub struct StageProfiler {
    window: usize,
    timings: HashMap<String, RingBuffer<Duration>>,
}

impl StageProfiler {
    /// Keep the last `window` samples per stage.
    pub fn new(window: usize) -> Self {
        Self {
            window,
            timings: HashMap::new(),
        }
    }

    /// Record a stage duration reported by the executor.
    pub fn record(&mut self, name: &str, elapsed: Duration) {
        let window = self.window;
        self.timings
            .entry(name.to_string())
            .or_insert_with(|| RingBuffer::new(window))
            .push(elapsed);
    }

    /// Rolling average for `name`, zero if never recorded.
    pub fn average(&self, name: &str) -> Duration {
        self.timings
            .get(name)
            .map(|samples| samples.average())
            .unwrap_or(Duration::ZERO)
    }

    /// Stage averages, slowest first.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Duration)> + '_ {
        let mut averages: Vec<(&str, Duration)> = self
            .timings
            .iter()
            .map(|(name, samples)| (name.as_str(), samples.average()))
            .collect();
        averages.sort_by(|a, b| b.1.cmp(&a.1));
        averages.into_iter()
    }
}

impl Default for StageProfiler {
    fn default() -> Self {
        Self::new(60)
    }
}
