//! The four per-tick stages and the graph that orders them.
//!
//! ```text
//! copy ──┐
//!        ├──> merge ──> integrate
//! hash ──┘
//! ```
//!
//! `copy` and `hash` only read committed state and may overlap. `merge`
//! consumes both of their outputs, and `integrate` reads the merged cells
//! and is the only stage that writes boid state, into the store's write
//! buffer.

use crate::aggregate::CellAggregates;
use crate::force::{steering_force, ForceParams};
use crate::grid::{GridJitter, SpatialHashGrid};
use crate::integrate::integrate;
use crate::math::Vec3;
use crate::schedule::{BufferId, Schedule, StageDescriptor, StageFault, StageGraphError};
use crate::store::Poses;
use rayon::prelude::*;
use std::sync::{Mutex, MutexGuard};

pub const STAGE_COPY: &str = "copy";
pub const STAGE_HASH: &str = "hash";
pub const STAGE_MERGE: &str = "merge";
pub const STAGE_INTEGRATE: &str = "integrate";

/// Committed boid state, read by every stage.
pub const STORE: BufferId = BufferId::new("store");
/// Flat copies of positions and headings, later reused as cell sums.
pub const SNAPSHOT: BufferId = BufferId::new("snapshot");
/// Cell key multi-map.
pub const GRID: BufferId = BufferId::new("grid");
/// Merged cell aggregates and per-boid assignment.
pub const CELLS: BufferId = BufferId::new("cells");
/// Store write buffer.
pub const STORE_NEXT: BufferId = BufferId::new("store_next");

/// Signature shared by all flock stages.
pub type StageFn = for<'t> fn(&TickContext<'t>) -> Result<(), StageFault>;

/// Everything one tick reads and writes. Rebuilt for every tick.
pub struct TickContext<'a> {
    current: &'a Poses,
    next: Mutex<&'a mut Poses>,
    params: ForceParams,
    speed: f32,
    delta_secs: f32,
    jitter: GridJitter,
    snapshot: Mutex<Option<Snapshot>>,
    grid: Mutex<Option<SpatialHashGrid>>,
    cells: Mutex<Option<CellAggregates>>,
}

struct Snapshot {
    positions: Vec<Vec3>,
    headings: Vec<Vec3>,
}

impl<'a> TickContext<'a> {
    pub fn new(
        current: &'a Poses,
        next: &'a mut Poses,
        params: ForceParams,
        speed: f32,
        delta_secs: f32,
        jitter: GridJitter,
    ) -> Self {
        Self {
            current,
            next: Mutex::new(next),
            params,
            speed,
            delta_secs,
            jitter,
            snapshot: Mutex::new(None),
            grid: Mutex::new(None),
            cells: Mutex::new(None),
        }
    }

    /// Merged cells of this tick, once `merge` has run.
    pub fn into_cells(self) -> Option<CellAggregates> {
        self.cells.into_inner().ok().flatten()
    }
}

/// Build the copy ∥ hash → merge → integrate schedule.
pub fn flock_schedule() -> Result<Schedule<StageFn>, StageGraphError> {
    let mut schedule: Schedule<StageFn> = Schedule::new();
    schedule.add(
        StageDescriptor::new(STAGE_COPY).reads([STORE]).writes([SNAPSHOT]),
        copy_stage,
    )?;
    schedule.add(
        StageDescriptor::new(STAGE_HASH).reads([STORE]).writes([GRID]),
        hash_stage,
    )?;
    schedule.add(
        StageDescriptor::new(STAGE_MERGE)
            .after([STAGE_COPY, STAGE_HASH])
            .writes([SNAPSHOT, GRID, CELLS]),
        merge_stage,
    )?;
    schedule.add(
        StageDescriptor::new(STAGE_INTEGRATE)
            .after([STAGE_MERGE])
            .reads([STORE, CELLS])
            .writes([STORE_NEXT]),
        integrate_stage,
    )?;
    Ok(schedule)
}

fn lock<T>(mutex: &Mutex<T>, buffer: BufferId) -> Result<MutexGuard<'_, T>, StageFault> {
    mutex.lock().map_err(|_| StageFault::Poisoned(buffer))
}

/// Stage A: copy committed positions and headings into flat buffers.
fn copy_stage(ctx: &TickContext<'_>) -> Result<(), StageFault> {
    let positions: Vec<Vec3> = ctx.current.positions().par_iter().copied().collect();
    let headings: Vec<Vec3> = ctx.current.headings().par_iter().copied().collect();
    *lock(&ctx.snapshot, SNAPSHOT)? = Some(Snapshot { positions, headings });
    Ok(())
}

/// Stage B: hash every jittered position into the cell multi-map.
fn hash_stage(ctx: &TickContext<'_>) -> Result<(), StageFault> {
    let positions = ctx.current.positions();
    let grid = SpatialHashGrid::with_capacity(ctx.params.cell_size, ctx.jitter, positions.len());
    grid.insert_all(positions);
    *lock(&ctx.grid, GRID)? = Some(grid);
    Ok(())
}

/// Stage C: fold each cell into its representative's slot.
fn merge_stage(ctx: &TickContext<'_>) -> Result<(), StageFault> {
    let snapshot = lock(&ctx.snapshot, SNAPSHOT)?
        .take()
        .ok_or(StageFault::MissingInput(SNAPSHOT))?;
    let grid = lock(&ctx.grid, GRID)?
        .take()
        .ok_or(StageFault::MissingInput(GRID))?;

    let groups = grid.into_groups();
    let cells = CellAggregates::merge(&groups, snapshot.positions, snapshot.headings)?;
    *lock(&ctx.cells, CELLS)? = Some(cells);
    Ok(())
}

/// Stage D: steer and advance every boid into the write buffer.
fn integrate_stage(ctx: &TickContext<'_>) -> Result<(), StageFault> {
    let cells_guard = lock(&ctx.cells, CELLS)?;
    let cells = cells_guard
        .as_ref()
        .ok_or(StageFault::MissingInput(CELLS))?;
    let mut next_guard = lock(&ctx.next, STORE_NEXT)?;
    let next: &mut Poses = &mut next_guard;
    let current = ctx.current;

    next.positions
        .par_iter_mut()
        .zip(next.headings.par_iter_mut())
        .zip(next.rotations.par_iter_mut())
        .enumerate()
        .for_each(|(index, ((position, heading), rotation))| {
            let own_position = current.positions[index];
            let own_heading = current.headings[index];
            let force = steering_force(own_position, own_heading, &cells.cell_of(index), &ctx.params);
            let pose = integrate(
                own_position,
                own_heading,
                current.rotations[index],
                force,
                ctx.speed,
                ctx.delta_secs,
            );
            *position = pose.position;
            *heading = pose.heading;
            *rotation = pose.rotation;
        });

    match next.first_non_finite() {
        Some(index) => Err(StageFault::NonFinite { index }),
        None => Ok(()),
    }
}
