//! Tree-structured reduction across a group of workers.
//!
//! Rank 0 ingests and sorts the full point set once, then scatters
//! contiguous ranges: rank `r` receives points `[r·n/P, (r+1)·n/P)` of the
//! sorted order, so the ranges are separated by the vertical strips the
//! pairwise merge requires. Every rank triangulates its own range, then the
//! subdivisions flow up a binary tree: in round `k`, rank `r + 2^k`
//! serializes its subdivision to rank `r` (for `r` divisible by `2^(k+1)`)
//! and finishes, while the receiver grafts the message into its own store
//! and zips the two triangulations along their shared boundary.
//!
//! After the last round rank 0 holds the triangulation of the whole set —
//! its point slice is again the full sorted order — and projects the
//! result. The geometric output is identical for every group size; only
//! internal edge record identities differ.

use crate::core::delaunay::{ingest, InputError, Subdivision};
use crate::core::triangulation::{project, triangulate, Triangulation};
use crate::parallel::transport::{Communicator, TransportError};
use crate::parallel::wire::{
    decode_points, decode_subdivision, encode_points, encode_subdivision, graft, WireError,
};
use thiserror::Error;

/// A failure anywhere in the group computation, propagated to the caller as
/// a single error. The reduction never retries and produces no partial
/// output.
#[derive(Clone, Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum GroupError {
    /// The input was rejected before any work started.
    #[error(transparent)]
    Input(#[from] InputError),

    /// A peer became unreachable or the transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A reduction message failed to decode or validate.
    #[error(transparent)]
    Wire(#[from] WireError),

    /// The full point set must be supplied at rank 0 (and only there).
    #[error("rank {rank} has no input point set")]
    MissingInput {
        /// The rank that expected input.
        rank: usize,
    },

    /// Every rank needs at least two points of the sorted range.
    #[error("{points} points cannot give each of {size} ranks two points")]
    GroupTooLarge {
        /// Number of ingested points.
        points: usize,
        /// The group size.
        size: usize,
    },
}

/// Runs the group triangulation on this rank.
///
/// `points` must be `Some` on rank 0 and is ignored elsewhere. Returns
/// `Some(result)` on rank 0 after the final round, `None` on every other
/// rank (their role ends once their subdivision has been handed up the
/// tree).
///
/// The group size must satisfy `2·P ≤ n` so every rank holds at least two
/// points; larger `P` is rejected as [`GroupError::GroupTooLarge`].
///
/// # Errors
///
/// Any [`GroupError`] is fatal for the whole computation.
///
/// # Examples
///
/// ```
/// use parallel_delaunay::parallel::reduction::triangulate_group;
/// use parallel_delaunay::parallel::transport::LoopbackGroup;
/// use parallel_delaunay::parallel::Communicator;
///
/// let points = vec![(0.0, 0.0), (1.0, 0.0), (0.5, 1.0), (2.0, 1.0)];
/// let results = LoopbackGroup::run(2, |comm| {
///     let input = (comm.rank() == 0).then_some(points.as_slice());
///     triangulate_group(comm, input).unwrap()
/// });
/// let triangulation = results[0].as_ref().unwrap();
/// assert_eq!(triangulation.triangles.len(), 2);
/// ```
pub fn triangulate_group<C: Communicator>(
    comm: &mut C,
    points: Option<&[(f64, f64)]>,
) -> Result<Option<Triangulation>, GroupError> {
    let size = comm.size();
    let rank = comm.rank();

    if size == 1 {
        let input = points.ok_or(GroupError::MissingInput { rank })?;
        return Ok(Some(triangulate(input)?));
    }

    // Ingest and scatter (rank 0), or receive this rank's range.
    let mut rank0_context = None;
    let mut sub = if rank == 0 {
        let input = points.ok_or(GroupError::MissingInput { rank })?;
        let (sorted, ids) = ingest(input)?;
        let n = sorted.len();
        if n < 2 * size {
            return Err(GroupError::GroupTooLarge { points: n, size });
        }
        for r in 1..size {
            let (lo, hi) = (r * n / size, (r + 1) * n / size);
            comm.send(r, &encode_points(&sorted[lo..hi]))?;
        }
        let own = sorted[..n / size].to_vec();
        rank0_context = Some((ids, input));
        Subdivision::delaunay(own)?
    } else {
        let slice = decode_points(&comm.recv(0)?)?;
        Subdivision::delaunay(slice)?
    };

    // Reduce up the binary tree. A rank stays a receiver until the round in
    // which its own bit comes up, sends once, and is done.
    let mut step = 1;
    while step < size {
        if rank % (step * 2) == 0 {
            let partner = rank + step;
            if partner < size {
                let message = decode_subdivision(&comm.recv(partner)?)?;
                let (rdi, rdo) = graft(&mut sub, &message)?;
                sub.merge_adjacent(rdi, rdo);
            }
        } else {
            comm.send(rank - step, &encode_subdivision(&sub))?;
            return Ok(None);
        }
        step *= 2;
    }

    let (ids, input) = rank0_context.expect("rank 0 retains the ingestion context");
    Ok(Some(project(&sub, &ids, input)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::transport::LoopbackGroup;

    fn run_group(size: usize, points: &[(f64, f64)]) -> Triangulation {
        let mut results = LoopbackGroup::run(size, |comm| {
            let input = (comm.rank() == 0).then_some(points);
            triangulate_group(comm, input).unwrap()
        });
        for (rank, result) in results.iter().enumerate().skip(1) {
            assert!(result.is_none(), "rank {rank} must not produce output");
        }
        results[0].take().unwrap()
    }

    #[test]
    fn two_ranks_match_the_sequential_result() {
        let points = [
            (0.0, 0.0),
            (1.0, 2.0),
            (2.0, -1.0),
            (3.0, 1.0),
            (4.0, 0.5),
            (5.0, 2.5),
        ];
        assert_eq!(run_group(2, &points), triangulate(&points).unwrap());
    }

    #[test]
    fn missing_input_at_rank_zero_is_an_error() {
        let results = LoopbackGroup::run(1, |comm| triangulate_group(comm, None));
        assert_eq!(
            results[0],
            Err(GroupError::MissingInput { rank: 0 })
        );
    }

    #[test]
    fn oversized_groups_are_rejected() {
        let points = [(0.0, 0.0), (1.0, 0.0), (2.0, 1.0)];
        let results = LoopbackGroup::run(2, |comm| {
            let input = (comm.rank() == 0).then_some(points.as_slice());
            triangulate_group(comm, input)
        });
        assert_eq!(
            results[0],
            Err(GroupError::GroupTooLarge { points: 3, size: 2 })
        );
    }
}
