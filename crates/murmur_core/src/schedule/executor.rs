//! Barrier executor for a [`StageGraph`].
//!
//! Stages inside one wave run concurrently on the current rayon pool; the
//! next wave starts only when every stage of the previous one has returned.
//! Each stage is expected to parallelise its own per-boid work.

use crate::schedule::{
    StageDescriptor, StageError, StageFault, StageGraph, StageGraphError, StageHandle,
};
use rayon::prelude::*;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

/// Completion record returned by every stage that finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageCompletion {
    pub handle: StageHandle,
    pub elapsed: Duration,
}

/// A stage graph paired with the function that implements each stage.
pub struct Schedule<F> {
    graph: StageGraph,
    stages: Vec<F>,
    waves: Vec<Vec<StageHandle>>,
}

impl<F> Schedule<F> {
    pub fn new() -> Self {
        Self {
            graph: StageGraph::new(),
            stages: Vec::new(),
            waves: Vec::new(),
        }
    }

    /// Register a stage and the function that runs it.
    pub fn add(
        &mut self,
        descriptor: StageDescriptor,
        stage: F,
    ) -> Result<StageHandle, StageGraphError> {
        let handle = self.graph.register(descriptor)?;
        self.stages.push(stage);
        self.waves = self.graph.waves();
        Ok(handle)
    }

    pub fn graph(&self) -> &StageGraph {
        &self.graph
    }

    pub fn waves(&self) -> &[Vec<StageHandle>] {
        &self.waves
    }

    /// Name of a registered stage.
    pub fn stage_name(&self, handle: StageHandle) -> &str {
        self.graph
            .descriptor(handle)
            .map(StageDescriptor::name)
            .unwrap_or("<unknown>")
    }

    /// Run every stage against `ctx`, wave by wave.
    ///
    /// The first failing wave stops execution: later waves never start.
    /// Panics inside a stage are caught and reported as
    /// [`StageFault::Panicked`].
    pub fn run<C>(&self, ctx: &C) -> Result<Vec<StageCompletion>, StageError>
    where
        C: Sync,
        F: Fn(&C) -> Result<(), StageFault> + Sync,
    {
        let mut completions = Vec::with_capacity(self.stages.len());
        for wave in &self.waves {
            let results: Vec<Result<StageCompletion, StageError>> = wave
                .par_iter()
                .map(|&handle| self.run_stage(handle, ctx))
                .collect();

            for result in results {
                completions.push(result?);
            }
        }
        Ok(completions)
    }

    fn run_stage<C>(&self, handle: StageHandle, ctx: &C) -> Result<StageCompletion, StageError>
    where
        F: Fn(&C) -> Result<(), StageFault>,
    {
        let stage = &self.stages[handle.index() as usize];
        let start = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| stage(ctx)));
        let elapsed = start.elapsed();

        let fault = match outcome {
            Ok(Ok(())) => {
                tracing::trace!(
                    stage = self.stage_name(handle),
                    elapsed_us = elapsed.as_micros() as u64,
                    "stage complete"
                );
                return Ok(StageCompletion { handle, elapsed });
            }
            Ok(Err(fault)) => fault,
            Err(payload) => StageFault::Panicked(panic_message(payload.as_ref())),
        };

        Err(StageError {
            stage: self.stage_name(handle).to_string(),
            fault,
        })
    }
}

impl<F> Default for Schedule<F> {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::BufferId;
    use std::sync::Mutex;

    const A: BufferId = BufferId::new("a");
    const B: BufferId = BufferId::new("b");
    const C: BufferId = BufferId::new("c");

    type TestStage = Box<dyn Fn(&Trace) -> Result<(), StageFault> + Send + Sync>;

    #[derive(Default)]
    struct Trace {
        order: Mutex<Vec<&'static str>>,
    }

    fn recorder(name: &'static str) -> TestStage {
        Box::new(move |trace: &Trace| {
            trace.order.lock().unwrap().push(name);
            Ok(())
        })
    }

    fn diamond(merge: TestStage) -> Schedule<TestStage> {
        let mut schedule = Schedule::new();
        schedule.add(StageDescriptor::new("copy").writes([A]), recorder("copy")).unwrap();
        schedule.add(StageDescriptor::new("hash").writes([B]), recorder("hash")).unwrap();
        schedule
            .add(
                StageDescriptor::new("merge").after(["copy", "hash"]).reads([B]).writes([A, C]),
                merge,
            )
            .unwrap();
        schedule
            .add(StageDescriptor::new("integrate").after(["merge"]).reads([C]), recorder("integrate"))
            .unwrap();
        schedule
    }

    #[test]
    fn respects_barriers_every_run() {
        let schedule = diamond(recorder("merge"));
        for _ in 0..50 {
            let trace = Trace::default();
            let completions = schedule.run(&trace).unwrap();
            assert_eq!(completions.len(), 4);

            let order = trace.order.into_inner().unwrap();
            let position = |name| order.iter().position(|n| *n == name).unwrap();
            assert!(position("copy") < position("merge"));
            assert!(position("hash") < position("merge"));
            assert!(position("merge") < position("integrate"));
        }
    }

    #[test]
    fn failure_stops_later_waves() {
        let schedule = diamond(Box::new(|_: &Trace| -> Result<(), StageFault> {
            Err(StageFault::MissingInput(B))
        }));
        let trace = Trace::default();
        let err = schedule.run(&trace).unwrap_err();
        assert_eq!(err.stage, "merge");
        assert!(matches!(err.fault, StageFault::MissingInput(buffer) if buffer == B));
        assert!(!trace.order.lock().unwrap().contains(&"integrate"));
    }

    #[test]
    fn panics_become_faults() {
        let schedule = diamond(Box::new(|_: &Trace| -> Result<(), StageFault> {
            panic!("merge exploded")
        }));
        let trace = Trace::default();
        let err = schedule.run(&trace).unwrap_err();
        assert!(matches!(err.fault, StageFault::Panicked(ref m) if m == "merge exploded"));
    }
}
