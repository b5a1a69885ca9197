//! Per-cell reduction ("merge").
//!
//! Every boid sharing a cell key is folded into the slot of the group's first
//! member, the representative. The position and heading buffers copied from
//! the store are reused as the accumulators, so after the merge the
//! representative's slot holds the sum over the whole cell (itself included)
//! and every other member just points at it.
//!
//! The fold is a plain sum, so the result does not depend on the order in
//! which members were inserted. Groups touch disjoint indices and are reduced
//! in parallel without synchronisation.

use crate::math::Vec3;
use rayon::prelude::*;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

const UNASSIGNED: usize = usize::MAX;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    #[error("boid {index} is out of range for a population of {len}")]
    OutOfRange { index: usize, len: usize },

    #[error("boid {index} appears in more than one cell")]
    DuplicateMember { index: usize },

    #[error("boid {index} was not hashed into any cell")]
    MissingMember { index: usize },

    #[error("position and heading buffers differ in length ({positions} vs {headings})")]
    LengthMismatch { positions: usize, headings: usize },
}

/// Reduced view of the cell a boid belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellAggregate {
    pub representative: usize,
    pub position_sum: Vec3,
    pub heading_sum: Vec3,
    /// Members including the boid itself.
    pub count: u32,
}

impl CellAggregate {
    /// Members other than the boid itself.
    #[inline]
    pub fn nearby_count(&self) -> u32 {
        self.count.saturating_sub(1)
    }
}

/// Result of merging one tick's cells.
#[derive(Debug, Clone)]
pub struct CellAggregates {
    assignment: Vec<usize>,
    position_sums: Vec<Vec3>,
    heading_sums: Vec<Vec3>,
    counts: Vec<u32>,
    cell_count: usize,
}

impl CellAggregates {
    /// Reduce `groups` over the raw per-boid `positions` and `headings`,
    /// taking ownership of both buffers as accumulator storage.
    ///
    /// `groups` must partition `0..positions.len()`: every boid in exactly one
    /// group. This is checked before any accumulation happens.
    pub fn merge(
        groups: &[Vec<usize>],
        mut positions: Vec<Vec3>,
        mut headings: Vec<Vec3>,
    ) -> Result<Self, MergeError> {
        let len = positions.len();
        if headings.len() != len {
            return Err(MergeError::LengthMismatch {
                positions: len,
                headings: headings.len(),
            });
        }
        check_partition(groups, len)?;

        let mut assignment = vec![UNASSIGNED; len];
        let mut counts = vec![0u32; len];
        {
            let assignment = ScatterSlice::new(&mut assignment);
            let counts = ScatterSlice::new(&mut counts);
            let positions = ScatterSlice::new(&mut positions);
            let headings = ScatterSlice::new(&mut headings);

            groups.par_iter().for_each(|members| {
                let Some((&representative, rest)) = members.split_first() else {
                    return;
                };

                // SAFETY: check_partition proved every index is in range and
                // owned by exactly one group, so no other task reads or writes
                // any slot touched here.
                unsafe {
                    let mut position_sum = positions.read(representative);
                    let mut heading_sum = headings.read(representative);
                    let mut count = 1u32;
                    assignment.write(representative, representative);

                    for &member in rest {
                        position_sum += positions.read(member);
                        heading_sum += headings.read(member);
                        count += 1;
                        assignment.write(member, representative);
                    }

                    positions.write(representative, position_sum);
                    headings.write(representative, heading_sum);
                    counts.write(representative, count);
                }
            });
        }

        let cell_count = groups.iter().filter(|members| !members.is_empty()).count();
        Ok(Self {
            assignment,
            position_sums: positions,
            heading_sums: headings,
            counts,
            cell_count,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.assignment.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.assignment.is_empty()
    }

    /// Occupied cells this tick.
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.cell_count
    }

    /// Representative index of the cell `index` belongs to.
    #[inline]
    pub fn representative(&self, index: usize) -> usize {
        self.assignment[index]
    }

    /// Aggregate of the cell `index` belongs to.
    #[inline]
    pub fn cell_of(&self, index: usize) -> CellAggregate {
        let representative = self.representative(index);
        CellAggregate {
            representative,
            position_sum: self.position_sums[representative],
            heading_sum: self.heading_sums[representative],
            count: self.counts[representative],
        }
    }
}

/// Every index below `len` must occur exactly once across `groups`.
fn check_partition(groups: &[Vec<usize>], len: usize) -> Result<(), MergeError> {
    let claimed: Vec<AtomicBool> = (0..len).map(|_| AtomicBool::new(false)).collect();

    groups.par_iter().flatten().try_for_each(|&index| {
        let slot = claimed
            .get(index)
            .ok_or(MergeError::OutOfRange { index, len })?;
        if slot.swap(true, Ordering::Relaxed) {
            return Err(MergeError::DuplicateMember { index });
        }
        Ok(())
    })?;

    match claimed.iter().position(|slot| !slot.load(Ordering::Relaxed)) {
        Some(index) => Err(MergeError::MissingMember { index }),
        None => Ok(()),
    }
}

/// Shared handle to a slice whose elements are written from many tasks, each
/// task owning a disjoint set of indices.
struct ScatterSlice<'a, T> {
    ptr: *mut T,
    len: usize,
    _marker: PhantomData<&'a mut [T]>,
}

// SAFETY: access goes through the unsafe read/write methods whose callers
// guarantee index-disjointness between threads.
unsafe impl<T: Send> Send for ScatterSlice<'_, T> {}
unsafe impl<T: Send> Sync for ScatterSlice<'_, T> {}

impl<'a, T: Copy> ScatterSlice<'a, T> {
    fn new(slice: &'a mut [T]) -> Self {
        Self {
            ptr: slice.as_mut_ptr(),
            len: slice.len(),
            _marker: PhantomData,
        }
    }

    /// # Safety
    /// `index < len` and no other thread writes `index` concurrently.
    #[inline]
    unsafe fn read(&self, index: usize) -> T {
        debug_assert!(index < self.len);
        *self.ptr.add(index)
    }

    /// # Safety
    /// `index < len` and no other thread reads or writes `index` concurrently.
    #[inline]
    unsafe fn write(&self, index: usize, value: T) {
        debug_assert!(index < self.len);
        *self.ptr.add(index) = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};

    fn lattice_point(rng: &mut SmallRng) -> Vec3 {
        // Integer coordinates keep f32 sums exact in any order.
        Vec3::new(
            rng.gen_range(-50..=50) as f32,
            rng.gen_range(-50..=50) as f32,
            rng.gen_range(-50..=50) as f32,
        )
    }

    #[test]
    fn sums_include_every_member() {
        let positions = vec![Vec3::X, Vec3::Y, Vec3::Z, Vec3::splat(10.0)];
        let headings = vec![Vec3::X, Vec3::X, Vec3::Y, Vec3::Z];
        let groups = vec![vec![2, 0, 1], vec![3]];

        let cells = CellAggregates::merge(&groups, positions, headings).unwrap();
        assert_eq!(cells.cell_count(), 2);

        for index in [0, 1, 2] {
            let cell = cells.cell_of(index);
            assert_eq!(cell.representative, 2);
            assert_eq!(cell.count, 3);
            assert_eq!(cell.nearby_count(), 2);
            assert_eq!(cell.position_sum, Vec3::ONE);
            assert_eq!(cell.heading_sum, Vec3::new(2.0, 1.0, 0.0));
        }

        let lonely = cells.cell_of(3);
        assert_eq!(lonely.representative, 3);
        assert_eq!(lonely.count, 1);
        assert_eq!(lonely.nearby_count(), 0);
        assert_eq!(lonely.position_sum, Vec3::splat(10.0));
    }

    #[test]
    fn sum_is_independent_of_member_order() {
        let mut rng = SmallRng::seed_from_u64(5);
        for _ in 0..50 {
            let k = rng.gen_range(1..40);
            let positions: Vec<Vec3> = (0..k).map(|_| lattice_point(&mut rng)).collect();
            let headings: Vec<Vec3> = (0..k).map(|_| lattice_point(&mut rng)).collect();
            let expected_position: Vec3 = positions.iter().copied().sum();
            let expected_heading: Vec3 = headings.iter().copied().sum();

            let mut members: Vec<usize> = (0..k).collect();
            for _ in 0..5 {
                members.shuffle(&mut rng);
                let cells = CellAggregates::merge(
                    &[members.clone()],
                    positions.clone(),
                    headings.clone(),
                )
                .unwrap();

                for index in 0..k {
                    let cell = cells.cell_of(index);
                    assert_eq!(cell.representative, members[0]);
                    assert_eq!(cell.count as usize, k);
                    assert_eq!(cell.position_sum, expected_position);
                    assert_eq!(cell.heading_sum, expected_heading);
                }
            }
        }
    }

    #[test]
    fn rejects_groups_that_are_not_a_partition() {
        let positions = vec![Vec3::ZERO; 3];
        let headings = vec![Vec3::Z; 3];

        let err = CellAggregates::merge(&[vec![0, 1], vec![1, 2]], positions.clone(), headings.clone())
            .unwrap_err();
        assert_eq!(err, MergeError::DuplicateMember { index: 1 });

        let err = CellAggregates::merge(&[vec![0, 1]], positions.clone(), headings.clone())
            .unwrap_err();
        assert_eq!(err, MergeError::MissingMember { index: 2 });

        let err = CellAggregates::merge(&[vec![0, 1, 2, 7]], positions, headings).unwrap_err();
        assert_eq!(err, MergeError::OutOfRange { index: 7, len: 3 });
    }

    #[test]
    fn empty_population_merges_to_nothing() {
        let cells = CellAggregates::merge(&[], Vec::new(), Vec::new()).unwrap();
        assert!(cells.is_empty());
        assert_eq!(cells.cell_count(), 0);
    }
}
