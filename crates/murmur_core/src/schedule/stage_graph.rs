use crate::schedule::{StageDescriptor, StageGraphError, StageHandle};
use std::collections::HashMap;

/// Registered stages and their dependency edges.
///
/// Dependencies must name stages that are already registered, so handles are
/// always in a valid topological order and the graph can never contain a
/// cycle. Two stages that share a buffer with at least one writer must be
/// ordered through dependencies, directly or transitively.
#[derive(Debug, Default)]
pub struct StageGraph {
    stages: Vec<RegisteredStage>,
    name_lookup: HashMap<String, StageHandle>,
}

impl StageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        descriptor: StageDescriptor,
    ) -> Result<StageHandle, StageGraphError> {
        if descriptor.is_empty() {
            return Err(StageGraphError::EmptyAccess {
                name: descriptor.name().to_string(),
            });
        }

        let name_key = descriptor.name().to_string();
        if self.name_lookup.contains_key(&name_key) {
            return Err(StageGraphError::DuplicateName { name: name_key });
        }

        let mut dependencies = Vec::with_capacity(descriptor.dependencies().len());
        for dependency in descriptor.dependencies() {
            let handle = self.name_lookup.get(dependency).copied().ok_or_else(|| {
                StageGraphError::UnknownDependency {
                    name: name_key.clone(),
                    dependency: dependency.clone(),
                }
            })?;
            dependencies.push(handle);
        }

        let ancestors = self.ancestors_of(&dependencies);
        for (index, existing) in self.stages.iter().enumerate() {
            if ancestors[index] {
                continue;
            }
            if let Some(buffer) = descriptor.conflict_with(&existing.descriptor) {
                return Err(StageGraphError::UnorderedAccess {
                    buffer,
                    existing: existing.descriptor.name().to_string(),
                    requested: name_key,
                    existing_handle: existing.handle,
                });
            }
        }

        let level = dependencies
            .iter()
            .map(|handle| self.stages[handle.index() as usize].level + 1)
            .max()
            .unwrap_or(0);

        let handle = StageHandle::new(self.stages.len() as u32);
        self.name_lookup.insert(name_key, handle);
        self.stages.push(RegisteredStage {
            handle,
            descriptor,
            dependencies,
            level,
        });

        Ok(handle)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn handle_of(&self, name: &str) -> Option<StageHandle> {
        self.name_lookup.get(name).copied()
    }

    pub fn descriptor(&self, handle: StageHandle) -> Option<&StageDescriptor> {
        self.stages
            .get(handle.index() as usize)
            .map(|stage| &stage.descriptor)
    }

    /// Direct dependencies of `handle`.
    pub fn dependencies(&self, handle: StageHandle) -> Option<&[StageHandle]> {
        self.stages
            .get(handle.index() as usize)
            .map(|stage| stage.dependencies.as_slice())
    }

    /// Stages grouped into barriers: every stage in wave `n` depends only on
    /// stages in earlier waves, so each wave may run fully concurrently.
    pub fn waves(&self) -> Vec<Vec<StageHandle>> {
        let depth = self.stages.iter().map(|stage| stage.level + 1).max().unwrap_or(0);
        let mut waves = vec![Vec::new(); depth];
        for stage in &self.stages {
            waves[stage.level].push(stage.handle);
        }
        waves
    }

    pub fn iter(&self) -> impl Iterator<Item = (StageHandle, &StageDescriptor)> {
        self.stages
            .iter()
            .map(|stage| (stage.handle, &stage.descriptor))
    }

    /// Mark every transitive dependency reachable from `roots`.
    fn ancestors_of(&self, roots: &[StageHandle]) -> Vec<bool> {
        let mut seen = vec![false; self.stages.len()];
        let mut pending: Vec<StageHandle> = roots.to_vec();
        while let Some(handle) = pending.pop() {
            let index = handle.index() as usize;
            if seen[index] {
                continue;
            }
            seen[index] = true;
            pending.extend_from_slice(&self.stages[index].dependencies);
        }
        seen
    }
}

#[derive(Debug)]
struct RegisteredStage {
    handle: StageHandle,
    descriptor: StageDescriptor,
    dependencies: Vec<StageHandle>,
    level: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::BufferId;

    const SNAPSHOT: BufferId = BufferId::new("snapshot");
    const GRID: BufferId = BufferId::new("grid");
    const CELLS: BufferId = BufferId::new("cells");
    const NEXT: BufferId = BufferId::new("next");

    fn flock_graph() -> StageGraph {
        let mut graph = StageGraph::new();
        graph
            .register(StageDescriptor::new("copy").writes([SNAPSHOT]))
            .unwrap();
        graph
            .register(StageDescriptor::new("hash").writes([GRID]))
            .unwrap();
        graph
            .register(
                StageDescriptor::new("merge")
                    .after(["copy", "hash"])
                    .reads([GRID])
                    .writes([SNAPSHOT, CELLS]),
            )
            .unwrap();
        graph
            .register(
                StageDescriptor::new("integrate")
                    .after(["merge"])
                    .reads([CELLS])
                    .writes([NEXT]),
            )
            .unwrap();
        graph
    }

    #[test]
    fn waves_follow_dependencies() {
        let graph = flock_graph();
        let names: Vec<Vec<&str>> = graph
            .waves()
            .iter()
            .map(|wave| {
                wave.iter()
                    .map(|&h| graph.descriptor(h).unwrap().name())
                    .collect()
            })
            .collect();
        assert_eq!(names, vec![vec!["copy", "hash"], vec!["merge"], vec!["integrate"]]);
    }

    #[test]
    fn rejects_unknown_and_duplicate_stages() {
        let mut graph = flock_graph();
        assert_eq!(
            graph.register(StageDescriptor::new("copy").writes([SNAPSHOT])),
            Err(StageGraphError::DuplicateName { name: "copy".into() })
        );
        assert!(matches!(
            graph.register(StageDescriptor::new("late").after(["nope"]).reads([NEXT])),
            Err(StageGraphError::UnknownDependency { .. })
        ));
        assert!(matches!(
            graph.register(StageDescriptor::new("idle")),
            Err(StageGraphError::EmptyAccess { .. })
        ));
    }

    #[test]
    fn rejects_unordered_writer() {
        let mut graph = StageGraph::new();
        graph.register(StageDescriptor::new("copy").writes([SNAPSHOT])).unwrap();
        let err = graph
            .register(StageDescriptor::new("merge").reads([SNAPSHOT]).writes([CELLS]))
            .unwrap_err();
        assert!(matches!(
            err,
            StageGraphError::UnorderedAccess { buffer, .. } if buffer == SNAPSHOT
        ));
    }

    #[test]
    fn transitive_order_satisfies_hazards() {
        let mut graph = flock_graph();
        // Touches SNAPSHOT, ordered after copy/merge only through integrate.
        let handle = graph
            .register(StageDescriptor::new("report").after(["integrate"]).reads([SNAPSHOT]))
            .unwrap();
        assert_eq!(graph.waves().len(), 4);
        assert_eq!(graph.dependencies(handle).unwrap().len(), 1);
    }
}
