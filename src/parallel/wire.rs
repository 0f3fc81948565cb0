//! Wire format for subdivisions exchanged during the reduction.
//!
//! One message per reduction step, little-endian throughout, coordinates as
//! IEEE-754 binary64:
//!
//! ```text
//! u32 n_points
//! n_points × (f64 x, f64 y)
//! u32 n_edges
//! n_edges × (u32 org, u32 dest)      org < dest, local point indices
//! u32 le_ref
//! u32 re_ref                         edge-list index; high bit = reversed
//! ```
//!
//! Only *values* cross the boundary: coordinates and adjacency as integer
//! pairs, never edge record identities. The receiver re-materializes the
//! topology in its own store — one fresh quad per listed edge — and rebuilds
//! every `Onext` ring geometrically, by sorting each vertex's incident
//! directed edges counter-clockwise. For a planar straight-line subdivision
//! the ring order *is* the angular order, so the rebuilt store is
//! topologically identical to the sender's.
//!
//! The scatter step uses the same point block without the edge section.

use crate::core::delaunay::Subdivision;
use crate::core::quad_edge::EdgeId;
use crate::geometry::point::Point;
use crate::geometry::predicates::ccw_order;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::io::Cursor;
use thiserror::Error;

/// High bit of an edge reference: the hull edge runs `dest → org` of the
/// listed pair instead of `org → dest`.
const REVERSED: u32 = 0x8000_0000;

/// A malformed reduction message. Fatal: a corrupt frame means the sending
/// peer and this receiver no longer agree on the protocol.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum WireError {
    /// The message ended before the announced content.
    #[error("message truncated while reading {section}")]
    Truncated {
        /// The section being decoded when bytes ran out.
        section: &'static str,
    },

    /// The message is longer than its announced content.
    #[error("{0} trailing bytes after the message body")]
    TrailingBytes(usize),

    /// A coordinate decoded to NaN or an infinity.
    #[error("non-finite coordinate at point {index}")]
    NonFiniteCoordinate {
        /// Index of the offending point in the message.
        index: u32,
    },

    /// An edge referenced a point index outside the message's point list.
    #[error("edge {index} references point {point} of {n_points}")]
    PointOutOfRange {
        /// Index of the offending edge.
        index: u32,
        /// The out-of-range endpoint.
        point: u32,
        /// Number of points in the message.
        n_points: u32,
    },

    /// An edge pair was not in canonical `org < dest` order.
    #[error("edge {index} is not canonical: ({org}, {dest})")]
    NonCanonicalEdge {
        /// Index of the offending edge.
        index: u32,
        /// Its listed origin.
        org: u32,
        /// Its listed destination.
        dest: u32,
    },

    /// A hull reference pointed outside the edge list.
    #[error("hull reference {reference:#x} exceeds the {n_edges} listed edges")]
    EdgeOutOfRange {
        /// The raw hull reference.
        reference: u32,
        /// Number of edges in the message.
        n_edges: u32,
    },

    /// A listed point is not an endpoint of any listed edge, so its ring
    /// cannot be rebuilt.
    #[error("point {index} is isolated in the transmitted subdivision")]
    IsolatedPoint {
        /// Index of the isolated point.
        index: u32,
    },
}

/// Directed reference to a listed edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EdgeRef {
    /// Index into the message's edge list.
    pub index: u32,
    /// `true` if the referenced directed edge runs `dest → org`.
    pub reversed: bool,
}

impl EdgeRef {
    fn pack(self) -> u32 {
        self.index | if self.reversed { REVERSED } else { 0 }
    }

    fn unpack(raw: u32, n_edges: u32) -> Result<Self, WireError> {
        let index = raw & !REVERSED;
        if index >= n_edges {
            return Err(WireError::EdgeOutOfRange {
                reference: raw,
                n_edges,
            });
        }
        Ok(Self {
            index,
            reversed: raw & REVERSED != 0,
        })
    }
}

/// A decoded reduction message: a subdivision as values.
#[derive(Clone, Debug, PartialEq)]
pub struct WireSubdivision {
    /// Points in the sender's (sorted) local order.
    pub points: Vec<Point>,
    /// Canonical `org < dest` pairs of local point indices.
    pub edges: Vec<(u32, u32)>,
    /// The sender's CCW-most edge out of its leftmost vertex.
    pub le: EdgeRef,
    /// The sender's CW-most edge out of its rightmost vertex.
    pub re: EdgeRef,
}

fn write_points(buf: &mut Vec<u8>, points: &[Point]) {
    buf.write_u32::<LittleEndian>(points.len() as u32)
        .expect("writing to a Vec cannot fail");
    for p in points {
        buf.write_f64::<LittleEndian>(p.x).expect("vec write");
        buf.write_f64::<LittleEndian>(p.y).expect("vec write");
    }
}

fn read_points(cursor: &mut Cursor<&[u8]>) -> Result<Vec<Point>, WireError> {
    let n = cursor
        .read_u32::<LittleEndian>()
        .map_err(|_| WireError::Truncated { section: "point count" })?;
    let mut points = Vec::with_capacity(n as usize);
    for index in 0..n {
        let x = cursor
            .read_f64::<LittleEndian>()
            .map_err(|_| WireError::Truncated { section: "point coordinates" })?;
        let y = cursor
            .read_f64::<LittleEndian>()
            .map_err(|_| WireError::Truncated { section: "point coordinates" })?;
        if !x.is_finite() || !y.is_finite() {
            return Err(WireError::NonFiniteCoordinate { index });
        }
        points.push(Point::new(x, y));
    }
    Ok(points)
}

fn expect_end(cursor: &Cursor<&[u8]>) -> Result<(), WireError> {
    let remaining = cursor.get_ref().len() as u64 - cursor.position();
    if remaining != 0 {
        return Err(WireError::TrailingBytes(remaining as usize));
    }
    Ok(())
}

/// Encodes a bare point block (the scatter message).
#[must_use]
pub fn encode_points(points: &[Point]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4 + 16 * points.len());
    write_points(&mut buf, points);
    buf
}

/// Decodes a bare point block.
///
/// # Errors
///
/// Fails on truncation, trailing bytes, or non-finite coordinates.
pub fn decode_points(bytes: &[u8]) -> Result<Vec<Point>, WireError> {
    let mut cursor = Cursor::new(bytes);
    let points = read_points(&mut cursor)?;
    expect_end(&cursor)?;
    Ok(points)
}

/// Serializes a subdivision for transmission to its reduction partner.
#[must_use]
pub fn encode_subdivision(sub: &Subdivision) -> Vec<u8> {
    let store = sub.store();
    let mut buf = Vec::with_capacity(4 + 16 * sub.points().len() + 8 + 8 * store.len() + 8);
    write_points(&mut buf, sub.points());

    debug_assert!((store.len() as u64) < u64::from(REVERSED));
    buf.write_u32::<LittleEndian>(store.len() as u32)
        .expect("vec write");
    let mut quad_to_index: FxHashMap<u32, u32> =
        FxHashMap::with_capacity_and_hasher(store.len(), Default::default());
    for (index, e) in store.primal_edges().enumerate() {
        let (org, dest) = (store.org(e), store.dest(e));
        quad_to_index.insert(e.quad(), index as u32);
        buf.write_u32::<LittleEndian>(org.min(dest)).expect("vec write");
        buf.write_u32::<LittleEndian>(org.max(dest)).expect("vec write");
    }

    let (le, re) = sub.hull();
    for e in [le, re] {
        let reference = EdgeRef {
            index: quad_to_index[&e.quad()],
            reversed: store.org(e) > store.dest(e),
        };
        buf.write_u32::<LittleEndian>(reference.pack()).expect("vec write");
    }
    buf
}

/// Decodes and validates a reduction message.
///
/// # Errors
///
/// Fails on truncation, trailing bytes, non-finite coordinates,
/// non-canonical or out-of-range edges, and out-of-range hull references.
pub fn decode_subdivision(bytes: &[u8]) -> Result<WireSubdivision, WireError> {
    let mut cursor = Cursor::new(bytes);
    let points = read_points(&mut cursor)?;
    let n_points = points.len() as u32;

    let n_edges = cursor
        .read_u32::<LittleEndian>()
        .map_err(|_| WireError::Truncated { section: "edge count" })?;
    let mut edges = Vec::with_capacity(n_edges as usize);
    for index in 0..n_edges {
        let org = cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| WireError::Truncated { section: "edge list" })?;
        let dest = cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| WireError::Truncated { section: "edge list" })?;
        if org >= dest {
            return Err(WireError::NonCanonicalEdge { index, org, dest });
        }
        if dest >= n_points {
            return Err(WireError::PointOutOfRange {
                index,
                point: dest,
                n_points,
            });
        }
        edges.push((org, dest));
    }

    let le_raw = cursor
        .read_u32::<LittleEndian>()
        .map_err(|_| WireError::Truncated { section: "hull references" })?;
    let re_raw = cursor
        .read_u32::<LittleEndian>()
        .map_err(|_| WireError::Truncated { section: "hull references" })?;
    expect_end(&cursor)?;

    Ok(WireSubdivision {
        points,
        edges,
        le: EdgeRef::unpack(le_raw, n_edges)?,
        re: EdgeRef::unpack(re_raw, n_edges)?,
    })
}

/// Materializes a transmitted subdivision inside `sub`'s store.
///
/// Appends the points (shifting their ids past the existing ones), allocates
/// one quad per listed edge in list order, and rebuilds every `Onext` ring
/// by angular sort around its vertex. The dual `next` pointers follow from
/// the primal rings through `Onext(Rot(e)) = Rot⁻¹(Oprev(e))`, so one pass
/// fixes the whole quad.
///
/// Returns the annexed subdivision's hull handle `(le, re)`, translated into
/// the local store, ready for [`Subdivision::merge_adjacent`].
///
/// # Errors
///
/// Fails with [`WireError::IsolatedPoint`] if a listed point has no incident
/// edge (its ring cannot be rebuilt).
pub fn graft(sub: &mut Subdivision, msg: &WireSubdivision) -> Result<(EdgeId, EdgeId), WireError> {
    let base = sub.append_points(&msg.points);
    let (points, store) = sub.parts_mut();

    let mut edge_ids = Vec::with_capacity(msg.edges.len());
    for &(org, dest) in &msg.edges {
        edge_ids.push(store.make_oriented_edge(base + org, base + dest));
    }

    let mut fans: Vec<SmallVec<[EdgeId; 8]>> = vec![SmallVec::new(); msg.points.len()];
    for (i, &(org, dest)) in msg.edges.iter().enumerate() {
        fans[org as usize].push(edge_ids[i]);
        fans[dest as usize].push(edge_ids[i].sym());
    }

    for (local, fan) in fans.iter_mut().enumerate() {
        if fan.is_empty() {
            return Err(WireError::IsolatedPoint {
                index: local as u32,
            });
        }
        let center = msg.points[local];
        fan.sort_by(|&a, &b| {
            ccw_order(
                center,
                points[store.dest(a) as usize],
                points[store.dest(b) as usize],
            )
        });
        let k = fan.len();
        for i in 0..k {
            let e = fan[i];
            let succ = fan[(i + 1) % k];
            let pred = fan[(i + k - 1) % k];
            store.set_next(e, succ);
            store.set_next(e.rot(), pred.rot_inv());
        }
    }

    debug_assert!(store.validate().is_ok());

    let resolve = |r: EdgeRef| {
        let e = edge_ids[r.index as usize];
        if r.reversed { e.sym() } else { e }
    };
    Ok((resolve(msg.le), resolve(msg.re)))
}
