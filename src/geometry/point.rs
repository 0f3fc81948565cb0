//! Data and operations on 2-D points.
//!
//! A [`Point`] is a plain pair of finite `f64` coordinates. Identity is *not*
//! part of the point: the triangulation layers refer to points through a
//! [`VertexId`] index into a point slice, assigned once at ingestion. Two
//! distinct vertices may carry tying coordinates in one axis, although
//! ingestion rejects exact `(x, y)` duplicates.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Stable identity of an ingested point: its index into the owning slice.
pub type VertexId = u32;

/// A point in the Euclidean plane.
///
/// Coordinates are expected to be finite; [`Point::is_finite`] is the check
/// ingestion applies before any predicate ever sees the value.
///
/// # Examples
///
/// ```
/// use parallel_delaunay::geometry::point::Point;
///
/// let p = Point::new(1.0, -2.5);
/// assert!(p.is_finite());
/// assert_eq!(p.x, 1.0);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Point {
    /// Creates a point from its coordinates.
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns `true` iff both coordinates are finite (no NaN, no infinities).
    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Total lexicographic order by `(x, y)`.
    ///
    /// This is the order the divide-and-conquer build expects its input in,
    /// and the order ingestion establishes once at the top level. It uses
    /// [`f64::total_cmp`], which is a total order even on non-finite values,
    /// so sorting never panics on unvalidated data.
    #[inline]
    #[must_use]
    pub fn lexicographic_cmp(&self, other: &Self) -> Ordering {
        self.x
            .total_cmp(&other.x)
            .then_with(|| self.y.total_cmp(&other.y))
    }
}

impl From<(f64, f64)> for Point {
    #[inline]
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
