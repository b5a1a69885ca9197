//! Outcome counts for simulation ticks.

/// How many ticks were committed and how many were rolled back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickCounter {
    committed: u64,
    aborted: u64,
}

impl TickCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commit(&mut self) {
        self.committed += 1;
    }

    pub fn abort(&mut self) {
        self.aborted += 1;
    }

    pub fn committed(&self) -> u64 {
        self.committed
    }

    pub fn aborted(&self) -> u64 {
        self.aborted
    }

    /// Fraction of attempted ticks that were rolled back.
    pub fn abort_rate(&self) -> f64 {
        let attempted = self.committed + self.aborted;
        if attempted == 0 {
            0.0
        } else {
            self.aborted as f64 / attempted as f64
        }
    }
}
