use std::fmt;

/// Identifier of a per-tick buffer a stage reads or writes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(&'static str);

impl BufferId {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    #[inline]
    pub fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Metadata describing a stage: what must finish before it and which
/// buffers it touches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StageDescriptor {
    name: String,
    after: Vec<String>,
    reads: Vec<BufferId>,
    writes: Vec<BufferId>,
}

impl StageDescriptor {
    /// Create a new descriptor with the provided name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            after: Vec::new(),
            reads: Vec::new(),
            writes: Vec::new(),
        }
    }

    /// Stages that must complete before this one starts.
    pub fn after<I, S>(mut self, stages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.after = stages.into_iter().map(Into::into).collect();
        self.after.sort_unstable();
        self.after.dedup();
        self
    }

    /// Replace the read-only buffer set for this stage.
    pub fn reads<I>(mut self, buffers: I) -> Self
    where
        I: IntoIterator<Item = BufferId>,
    {
        self.reads = Self::sanitize(buffers);
        self
    }

    /// Replace the written buffer set for this stage.
    pub fn writes<I>(mut self, buffers: I) -> Self
    where
        I: IntoIterator<Item = BufferId>,
    {
        self.writes = Self::sanitize(buffers);
        self
    }

    /// Unique stage name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of the stages this one waits for.
    pub fn dependencies(&self) -> &[String] {
        &self.after
    }

    pub fn read_buffers(&self) -> &[BufferId] {
        &self.reads
    }

    pub fn write_buffers(&self) -> &[BufferId] {
        &self.writes
    }

    /// Whether the stage touches any buffer at all.
    pub fn is_empty(&self) -> bool {
        self.reads.is_empty() && self.writes.is_empty()
    }

    /// Whether running concurrently with `other` could race on a buffer:
    /// both touch it and at least one writes.
    pub fn conflict_with(&self, other: &StageDescriptor) -> Option<BufferId> {
        self.writes
            .iter()
            .find(|buffer| other.writes.contains(buffer) || other.reads.contains(buffer))
            .or_else(|| self.reads.iter().find(|buffer| other.writes.contains(buffer)))
            .copied()
    }

    fn sanitize<I>(buffers: I) -> Vec<BufferId>
    where
        I: IntoIterator<Item = BufferId>,
    {
        let mut list: Vec<BufferId> = buffers.into_iter().collect();
        list.sort_unstable();
        list.dedup();
        list
    }
}
