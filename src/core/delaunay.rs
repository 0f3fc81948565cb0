//! Divide-and-conquer Delaunay triangulation over the quad-edge store.
//!
//! This is the Guibas & Stolfi algorithm: the lexicographically sorted point
//! set is split at ⌈n/2⌉, both halves are triangulated recursively down to
//! base cases of two or three points, and the halves are zipped back
//! together along their shared vertical strip by the pairwise merge. The
//! same zipper is exposed as [`Subdivision::merge_adjacent`] so a
//! tree-structured reduction can join subdivisions built in different
//! processes.
//!
//! A triangulation in progress is identified entirely by its two outer
//! hull edges `(le, re)`: `le` is the counter-clockwise-most edge out of the
//! leftmost vertex, `re` the clockwise-most edge out of the rightmost. That
//! pair is all the recursion and the reduction ever exchange.

use crate::core::quad_edge::{EdgeId, QuadEdgeStore};
use crate::geometry::point::{Point, VertexId};
use crate::geometry::predicates::{in_circle, left_of, orient, right_of, Orientation};
use rustc_hash::FxHashMap;
use thiserror::Error;

/// Rejected input. Surfaced before any triangulation work starts; there is
/// never partial output.
#[derive(Clone, Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum InputError {
    /// A triangulation needs at least two points.
    #[error("need at least 2 points, got {actual}")]
    TooFewPoints {
        /// Number of points supplied.
        actual: usize,
    },

    /// Vertex ids are 32-bit; larger inputs are not representable.
    #[error("point count {actual} exceeds the 32-bit vertex id space")]
    TooManyPoints {
        /// Number of points supplied.
        actual: usize,
    },

    /// A coordinate was NaN or infinite.
    #[error("non-finite coordinate ({x}, {y}) at input index {index}")]
    NonFiniteCoordinate {
        /// Position of the offending point in the input sequence.
        index: usize,
        /// Its x coordinate.
        x: f64,
        /// Its y coordinate.
        y: f64,
    },

    /// Two input points carry identical `(x, y)` coordinates.
    #[error("duplicate point: input indices {first} and {second} coincide")]
    DuplicatePoint {
        /// First occurrence.
        first: usize,
        /// Second occurrence.
        second: usize,
    },
}

/// Normalizes `-0.0` to `+0.0` so value-equal coordinates share a key.
#[inline]
fn coordinate_bits(v: f64) -> u64 {
    if v == 0.0 { 0 } else { v.to_bits() }
}

/// Validates and sorts raw input coordinates.
///
/// Returns the points in lexicographic `(x, y)` order together with the
/// permutation back to caller-assigned ids: `ids[k]` is the input position of
/// the `k`-th sorted point. The sort happens exactly once, here; every
/// recursive sub-slice below inherits it.
///
/// # Errors
///
/// Rejects inputs with fewer than two points, any non-finite coordinate, or
/// two points with identical coordinates.
pub(crate) fn ingest(points: &[(f64, f64)]) -> Result<(Vec<Point>, Vec<u32>), InputError> {
    if points.len() < 2 {
        return Err(InputError::TooFewPoints {
            actual: points.len(),
        });
    }
    if points.len() > u32::MAX as usize {
        return Err(InputError::TooManyPoints {
            actual: points.len(),
        });
    }

    let mut seen: FxHashMap<(u64, u64), usize> =
        FxHashMap::with_capacity_and_hasher(points.len(), Default::default());
    for (index, &(x, y)) in points.iter().enumerate() {
        if !x.is_finite() || !y.is_finite() {
            return Err(InputError::NonFiniteCoordinate { index, x, y });
        }
        if let Some(&first) = seen.get(&(coordinate_bits(x), coordinate_bits(y))) {
            return Err(InputError::DuplicatePoint {
                first,
                second: index,
            });
        }
        seen.insert((coordinate_bits(x), coordinate_bits(y)), index);
    }

    let mut ids: Vec<u32> = (0..points.len() as u32).collect();
    ids.sort_unstable_by(|&i, &j| {
        Point::from(points[i as usize]).lexicographic_cmp(&Point::from(points[j as usize]))
    });
    let sorted = ids
        .iter()
        .map(|&i| Point::from(points[i as usize]))
        .collect();
    Ok((sorted, ids))
}

/// A triangulated planar subdivision: sorted points, their quad-edge
/// topology, and the outer hull handle `(le, re)`.
#[derive(Clone, Debug)]
pub struct Subdivision {
    points: Vec<Point>,
    store: QuadEdgeStore,
    le: EdgeId,
    re: EdgeId,
}

impl Subdivision {
    /// Triangulates a slice of points pre-sorted lexicographically by
    /// `(x, y)`.
    ///
    /// This is the sequential divide-and-conquer solver. Callers that start
    /// from raw coordinates go through
    /// [`triangulate`](crate::core::triangulation::triangulate), which
    /// validates and sorts first; the reduction coordinator calls this
    /// directly on its scattered, already sorted slice.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::TooFewPoints`] for fewer than two points.
    pub fn delaunay(points: Vec<Point>) -> Result<Self, InputError> {
        if points.len() < 2 {
            return Err(InputError::TooFewPoints {
                actual: points.len(),
            });
        }
        debug_assert!(
            points
                .windows(2)
                .all(|w| w[0].lexicographic_cmp(&w[1]).is_lt()),
            "input points must be sorted and duplicate-free"
        );

        let n = points.len();
        // A planar triangulation on n vertices has at most 3n - 6 edges.
        let mut sub = Self {
            points,
            store: QuadEdgeStore::with_capacity(3 * n),
            le: EdgeId::from_parts(0, 0),
            re: EdgeId::from_parts(0, 0),
        };
        let (le, re) = sub.build(0, n as u32);
        sub.le = le;
        sub.re = re;
        debug_assert!(sub.store.validate().is_ok());
        Ok(sub)
    }

    /// The points of this subdivision, in lexicographic order. Vertex ids on
    /// the edges index into this slice.
    #[inline]
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// The underlying quad-edge store.
    #[inline]
    #[must_use]
    pub fn store(&self) -> &QuadEdgeStore {
        &self.store
    }

    /// The outer hull handle: the CCW-most edge out of the leftmost vertex
    /// and the CW-most edge out of the rightmost.
    #[inline]
    #[must_use]
    pub fn hull(&self) -> (EdgeId, EdgeId) {
        (self.le, self.re)
    }

    /// Split borrow for callers that navigate while mutating the store.
    #[inline]
    pub(crate) fn parts_mut(&mut self) -> (&[Point], &mut QuadEdgeStore) {
        (&self.points, &mut self.store)
    }

    /// Appends foreign points, returning the id offset they were shifted by.
    /// The caller is responsible for keeping the concatenation sorted
    /// (disjoint, increasing x-ranges).
    pub(crate) fn append_points(&mut self, points: &[Point]) -> u32 {
        let base = self.points.len() as u32;
        self.points.extend_from_slice(points);
        base
    }

    #[inline]
    fn point(&self, v: VertexId) -> Point {
        self.points[v as usize]
    }

    #[inline]
    fn org_point(&self, e: EdgeId) -> Point {
        self.point(self.store.org(e))
    }

    #[inline]
    fn dest_point(&self, e: EdgeId) -> Point {
        self.point(self.store.dest(e))
    }

    // -------------------------------------------------------------------------
    // Recursive build
    // -------------------------------------------------------------------------

    /// Triangulates the sorted sub-slice `lo..hi`, returning its hull handle.
    fn build(&mut self, lo: u32, hi: u32) -> (EdgeId, EdgeId) {
        let n = hi - lo;
        debug_assert!(n >= 2);
        match n {
            2 => {
                let a = self.store.make_oriented_edge(lo, lo + 1);
                (a, a.sym())
            }
            3 => self.build_triangle(lo),
            _ => {
                let mid = lo + n.div_ceil(2);
                let (ldo, ldi) = self.build(lo, mid);
                let (rdi, rdo) = self.build(mid, hi);
                self.merge(ldo, ldi, rdi, rdo)
            }
        }
    }

    /// Base case for three points: two chained edges, closed into a triangle
    /// unless the points are collinear, in which case the subdivision stays
    /// a polyline.
    fn build_triangle(&mut self, lo: u32) -> (EdgeId, EdgeId) {
        let (v1, v2, v3) = (lo, lo + 1, lo + 2);
        let a = self.store.make_oriented_edge(v1, v2);
        let b = self.store.make_oriented_edge(v2, v3);
        self.store.splice(a.sym(), b);

        match orient(self.point(v1), self.point(v2), self.point(v3)) {
            Orientation::LEFT => {
                self.store.connect(b, a);
                (a, b.sym())
            }
            Orientation::RIGHT => {
                let c = self.store.connect(b, a);
                (c.sym(), c)
            }
            Orientation::COLLINEAR => (a, b.sym()),
        }
    }

    // -------------------------------------------------------------------------
    // Pairwise merge
    // -------------------------------------------------------------------------

    /// Zips together two triangulations separated by an empty vertical
    /// strip: the left one presented by `(ldo, ldi)`, the right one by
    /// `(rdi, rdo)`. Returns the hull handle of the union.
    fn merge(
        &mut self,
        mut ldo: EdgeId,
        mut ldi: EdgeId,
        mut rdi: EdgeId,
        mut rdo: EdgeId,
    ) -> (EdgeId, EdgeId) {
        // Descend to the lower common tangent of the two hulls. Each step
        // either slides ldi counter-clockwise around the left face of the
        // left hull or rdi clockwise down the right hull, so the walk
        // terminates at the bottom bridge even when a side is a degenerate
        // polyline.
        loop {
            if left_of(self.org_point(rdi), self.org_point(ldi), self.dest_point(ldi)) {
                ldi = self.store.lnext(ldi);
            } else if right_of(self.org_point(ldi), self.org_point(rdi), self.dest_point(rdi)) {
                rdi = self.store.rprev(rdi);
            } else {
                break;
            }
        }

        // The base edge runs right-to-left so the merged region is its left
        // face.
        let mut basel = self.store.connect(rdi.sym(), ldi);
        if self.store.org(ldi) == self.store.org(ldo) {
            ldo = basel.sym();
        }
        if self.store.org(rdi) == self.store.org(rdo) {
            rdo = basel;
        }

        loop {
            // Left candidate: first edge counter-clockwise off the base at
            // its destination. While the candidate's successor would break
            // the empty-circle property, the candidate edge is no longer
            // Delaunay in the union and is removed.
            let mut lcand = self.store.onext(basel.sym());
            if self.above(lcand, basel) {
                loop {
                    let next = self.store.onext(lcand);
                    if !in_circle(
                        self.dest_point(basel),
                        self.org_point(basel),
                        self.dest_point(lcand),
                        self.dest_point(next),
                    ) {
                        break;
                    }
                    self.store.delete_edge(lcand);
                    lcand = next;
                }
            }

            // Right candidate, symmetrically, walking clockwise.
            let mut rcand = self.store.oprev(basel);
            if self.above(rcand, basel) {
                loop {
                    let prev = self.store.oprev(rcand);
                    if !in_circle(
                        self.dest_point(basel),
                        self.org_point(basel),
                        self.dest_point(rcand),
                        self.dest_point(prev),
                    ) {
                        break;
                    }
                    self.store.delete_edge(rcand);
                    rcand = prev;
                }
            }

            let l_valid = self.above(lcand, basel);
            let r_valid = self.above(rcand, basel);
            if !l_valid && !r_valid {
                // Upper common tangent reached; the hulls are joined.
                break;
            }

            // With both candidates in play, the left one wins exactly when
            // the right candidate's destination stays out of the left
            // candidate triangle's circumcircle. Cocircular quadruples fall
            // through to the left branch, the deterministic tie-break.
            if !l_valid || (r_valid && self.choose_right(lcand, rcand, basel)) {
                basel = self.store.connect(rcand, basel.sym());
            } else {
                basel = self.store.connect(basel.sym(), lcand.sym());
            }
        }

        (ldo, rdo)
    }

    /// Is the destination of candidate `e` above the base edge, i.e. does it
    /// still participate in the unmerged region?
    #[inline]
    fn above(&self, e: EdgeId, basel: EdgeId) -> bool {
        right_of(self.dest_point(e), self.org_point(basel), self.dest_point(basel))
    }

    /// Decides between two valid candidates: `true` selects the right one.
    fn choose_right(&self, lcand: EdgeId, rcand: EdgeId, basel: EdgeId) -> bool {
        debug_assert_eq!(
            orient(
                self.dest_point(lcand),
                self.org_point(lcand),
                self.org_point(rcand),
            ),
            Orientation::LEFT,
            "candidate triangle must wind CCW before the in-circle query",
        );
        debug_assert_eq!(self.store.org(lcand), self.store.dest(basel));
        debug_assert_eq!(self.store.org(rcand), self.store.org(basel));
        in_circle(
            self.dest_point(lcand),
            self.org_point(lcand),
            self.org_point(rcand),
            self.dest_point(rcand),
        )
    }

    /// Merges an adjacent subdivision that has already been grafted into
    /// this store, presented by its hull handle `(rdi, rdo)`.
    ///
    /// Precondition: every annexed point lies at or right of every point of
    /// the original subdivision (the empty-vertical-strip invariant of the
    /// reduction tree), so appending its points has kept the point slice
    /// sorted.
    pub fn merge_adjacent(&mut self, rdi: EdgeId, rdo: EdgeId) {
        debug_assert!(
            self.points
                .windows(2)
                .all(|w| w[0].lexicographic_cmp(&w[1]).is_lt()),
            "annexed points must extend the sorted order"
        );
        let (ldo, ldi) = (self.le, self.re);
        let (le, re) = self.merge(ldo, ldi, rdi, rdo);
        self.le = le;
        self.re = re;
        debug_assert!(self.store.validate().is_ok());
    }
}
