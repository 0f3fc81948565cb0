//! Projection of a completed subdivision into plain edge and triangle lists.
//!
//! The quad-edge store is the working representation; callers get a
//! [`Triangulation`]: the ingested points plus sorted, deduplicated edge
//! pairs and triangle triples in the caller's original point ids. Projection
//! is read-only and deterministic, so running the solver twice on the same
//! input yields byte-identical results.

use crate::core::delaunay::{ingest, InputError, Subdivision};
use crate::core::quad_edge::EdgeId;
use crate::geometry::point::Point;
use crate::geometry::predicates::{orient, Orientation};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A finished Delaunay triangulation in egress form.
///
/// `points` are the caller's input points in input order. `edges` holds each
/// undirected edge once as `(u, v)` with `u ≤ v`, sorted; `triangles` holds
/// each bounded face once as `(u, v, w)` with `u < v < w`, sorted. Ids are
/// input positions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Triangulation {
    /// The ingested points, in input order.
    pub points: Vec<Point>,
    /// Undirected edges as ordered id pairs.
    pub edges: Vec<(u32, u32)>,
    /// Bounded triangular faces as sorted id triples.
    pub triangles: Vec<(u32, u32, u32)>,
}

impl Triangulation {
    /// Number of triangles a triangulation of `n` points with `h` hull
    /// vertices must have (`2n − 2 − h`). Tests use this as a closed-form
    /// cross-check of projection output.
    #[must_use]
    pub fn expected_triangle_count(n: usize, hull: usize) -> usize {
        2 * n - 2 - hull
    }
}

/// Computes the Delaunay triangulation of a point set.
///
/// Ids in the result refer to input positions: point `i` of `points` is
/// vertex `i`. This is the single-process entry; the same solver runs under
/// the group coordinator in [`crate::parallel`].
///
/// # Errors
///
/// Returns [`InputError`] for fewer than two points, non-finite coordinates,
/// or duplicate points. No partial output is produced.
///
/// # Examples
///
/// ```
/// use parallel_delaunay::core::triangulation::triangulate;
///
/// let t = triangulate(&[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)]).unwrap();
/// assert_eq!(t.edges, vec![(0, 1), (0, 2), (1, 2)]);
/// assert_eq!(t.triangles, vec![(0, 1, 2)]);
/// ```
pub fn triangulate(points: &[(f64, f64)]) -> Result<Triangulation, InputError> {
    let (sorted, ids) = ingest(points)?;
    let sub = Subdivision::delaunay(sorted)?;
    Ok(project(&sub, &ids, points))
}

/// Walks a finished subdivision and emits its edge and triangle lists,
/// translating sorted vertex ids back to input ids via `ids`.
pub(crate) fn project(sub: &Subdivision, ids: &[u32], input: &[(f64, f64)]) -> Triangulation {
    let store = sub.store();
    let points = input.iter().map(|&p| Point::from(p)).collect();

    let mut edges: Vec<(u32, u32)> = store
        .primal_edges()
        .map(|e| {
            let u = ids[store.org(e) as usize];
            let v = ids[store.dest(e) as usize];
            (u.min(v), u.max(v))
        })
        .collect();
    edges.sort_unstable();

    // Every bounded triangular face is walked exactly once: pick an unvisited
    // directed edge, follow Lnext around its left face, and keep the face iff
    // it closes after three steps with counter-clockwise winding. The
    // unbounded face fails one of the two checks, as does each side of a
    // degenerate polyline.
    let mut visited: FxHashSet<EdgeId> =
        FxHashSet::with_capacity_and_hasher(store.len() * 2, Default::default());
    let mut triangles: BTreeSet<(u32, u32, u32)> = BTreeSet::new();
    for start in store.primal_edges().flat_map(|e| [e, e.sym()]) {
        if visited.contains(&start) {
            continue;
        }
        let mut face = Vec::with_capacity(4);
        let mut e = start;
        loop {
            visited.insert(e);
            face.push(store.org(e));
            e = store.lnext(e);
            if e == start {
                break;
            }
        }
        if face.len() != 3 {
            continue;
        }
        let (a, b, c) = (face[0], face[1], face[2]);
        let winding = orient(
            sub.points()[a as usize],
            sub.points()[b as usize],
            sub.points()[c as usize],
        );
        if winding == Orientation::LEFT {
            let mut t = [ids[a as usize], ids[b as usize], ids[c as usize]];
            t.sort_unstable();
            triangles.insert((t[0], t[1], t[2]));
        }
    }

    Triangulation {
        points,
        edges,
        triangles: triangles.into_iter().collect(),
    }
}
