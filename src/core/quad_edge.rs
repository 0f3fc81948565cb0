//! Quad-edge store: the owning container for a planar subdivision.
//!
//! Every undirected edge of the subdivision is represented by a *quad* of
//! four directed edges in a fixed cyclic arrangement: the edge itself `e`,
//! its dual `e.Rot`, its reverse `e.Sym = e.Rot²`, and the reverse dual
//! `e.Rot³`. Only two pieces of state are stored per directed edge — the
//! origin label and the next edge counter-clockwise around that origin —
//! and everything else is edge algebra:
//!
//! - [`EdgeId::rot`], [`EdgeId::sym`] and [`EdgeId::rot_inv`] are pure bit
//!   arithmetic on the low two bits of the id, so `Rot⁴ = id` and
//!   `Sym² = id` hold structurally and cost nothing to maintain.
//! - Derived traversal ([`QuadEdgeStore::lnext`], [`QuadEdgeStore::oprev`],
//!   …) composes the stored `Onext` with rotations.
//!
//! The store owns all edge records exclusively. Mutation goes through
//! exactly three primitives — [`QuadEdgeStore::make_edge`],
//! [`QuadEdgeStore::splice`], [`QuadEdgeStore::delete_edge`] — plus the
//! composite [`QuadEdgeStore::connect`]; that is the complete vocabulary
//! needed to build any planar subdivision.

use crate::geometry::point::VertexId;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;
use thiserror::Error;

/// Identifier of one directed edge.
///
/// The quad index lives in the high 30 bits, the rotation (0 = the primal
/// edge, 1 = its dual, 2 = the reverse, 3 = the reverse dual) in the low two.
/// Ids are only meaningful to the [`QuadEdgeStore`] that issued them.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(u32);

impl EdgeId {
    /// Rotates 90° counter-clockwise within the quad: primal ↔ dual.
    #[inline]
    #[must_use]
    pub const fn rot(self) -> Self {
        Self((self.0 & !3) | (self.0.wrapping_add(1) & 3))
    }

    /// The oppositely directed edge: `rot` applied twice.
    #[inline]
    #[must_use]
    pub const fn sym(self) -> Self {
        Self(self.0 ^ 2)
    }

    /// Rotates 90° clockwise: the inverse of [`EdgeId::rot`].
    #[inline]
    #[must_use]
    pub const fn rot_inv(self) -> Self {
        Self((self.0 & !3) | (self.0.wrapping_add(3) & 3))
    }

    /// `true` for the two primal (vertex-labeled) members of the quad.
    #[inline]
    #[must_use]
    pub const fn is_primal(self) -> bool {
        self.0 & 1 == 0
    }

    /// Index of the owning quad.
    #[inline]
    #[must_use]
    pub(crate) const fn quad(self) -> u32 {
        self.0 >> 2
    }

    /// Rotation of this member within its quad, `0..4`.
    #[inline]
    #[must_use]
    pub(crate) const fn rotation(self) -> u32 {
        self.0 & 3
    }

    #[inline]
    pub(crate) const fn from_parts(quad: u32, rotation: u32) -> Self {
        Self(quad << 2 | rotation)
    }
}

impl fmt::Debug for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}r{}", self.quad(), self.rotation())
    }
}

/// A structural defect detected by [`QuadEdgeStore::validate`].
///
/// These never arise from valid use of the public operations; a violation
/// means a construction bug (typically a mis-sequenced `splice`) and is
/// treated as fatal by every caller.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum TopologyError {
    /// An edge's `Onext` points at a freed or out-of-range record.
    #[error("edge {edge:?} has a dangling Onext reference {next:?}")]
    DanglingNext {
        /// The edge holding the reference.
        edge: String,
        /// The stale target.
        next: String,
    },

    /// Following `Onext` from an edge never returned to it.
    #[error("Onext ring of edge {edge:?} does not close")]
    UnclosedRing {
        /// The edge whose ring was walked.
        edge: String,
    },

    /// Two edges on the same `Onext` ring disagree about their origin.
    #[error("Onext ring of edge {edge:?} mixes origins {origin} and {other}")]
    MixedRing {
        /// The edge whose ring was walked.
        edge: String,
        /// The origin label of the walked edge.
        origin: VertexId,
        /// The conflicting label found on the ring.
        other: VertexId,
    },

    /// A primal directed edge has no origin label.
    #[error("primal edge {edge:?} has no origin label")]
    UnlabeledPrimal {
        /// The offending edge.
        edge: String,
    },

    /// A dual directed edge carries an origin label (faces are unlabeled).
    #[error("dual edge {edge:?} carries an origin label")]
    LabeledDual {
        /// The offending edge.
        edge: String,
    },
}

#[derive(Clone, Debug)]
struct Quad {
    next: [EdgeId; 4],
    org: [Option<VertexId>; 4],
    alive: bool,
}

/// Arena of quad-edge records.
///
/// Records are addressed by [`EdgeId`] and reused after
/// [`QuadEdgeStore::delete_edge`]; the lowest free slot is always reused
/// first so identical operation sequences produce identical ids.
#[derive(Clone, Debug, Default)]
pub struct QuadEdgeStore {
    quads: Vec<Quad>,
    free: BinaryHeap<Reverse<u32>>,
    live: usize,
}

impl QuadEdgeStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store sized for `edges` undirected edges.
    #[must_use]
    pub fn with_capacity(edges: usize) -> Self {
        Self {
            quads: Vec::with_capacity(edges),
            free: BinaryHeap::new(),
            live: 0,
        }
    }

    /// Number of live undirected edges.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    /// `true` iff the store holds no live edges.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// `true` iff `e` refers to a live record of this store.
    #[inline]
    #[must_use]
    pub fn contains(&self, e: EdgeId) -> bool {
        self.quads
            .get(e.quad() as usize)
            .is_some_and(|q| q.alive)
    }

    /// Iterates the canonical primal edge of every live quad in ascending
    /// id order.
    pub fn primal_edges(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.quads
            .iter()
            .enumerate()
            .filter(|(_, q)| q.alive)
            .map(|(i, _)| EdgeId::from_parts(i as u32, 0))
    }

    // -------------------------------------------------------------------------
    // Stored state
    // -------------------------------------------------------------------------

    /// The next directed edge counter-clockwise around `org(e)`.
    #[inline]
    #[must_use]
    pub fn onext(&self, e: EdgeId) -> EdgeId {
        debug_assert!(self.contains(e), "onext of dead edge {e:?}");
        self.quads[e.quad() as usize].next[e.rotation() as usize]
    }

    /// The origin label of `e`, if it has one (dual edges never do).
    #[inline]
    #[must_use]
    pub fn org_opt(&self, e: EdgeId) -> Option<VertexId> {
        debug_assert!(self.contains(e), "org of dead edge {e:?}");
        self.quads[e.quad() as usize].org[e.rotation() as usize]
    }

    /// The origin vertex of a labeled primal edge.
    ///
    /// # Panics
    ///
    /// Panics if `e` has no origin label — that is a construction bug, not a
    /// recoverable condition.
    #[inline]
    #[must_use]
    pub fn org(&self, e: EdgeId) -> VertexId {
        self.org_opt(e).expect("edge has no origin label")
    }

    /// The destination vertex: `org(Sym(e))`.
    #[inline]
    #[must_use]
    pub fn dest(&self, e: EdgeId) -> VertexId {
        self.org(e.sym())
    }

    #[inline]
    pub(crate) fn set_next(&mut self, e: EdgeId, next: EdgeId) {
        self.quads[e.quad() as usize].next[e.rotation() as usize] = next;
    }

    #[inline]
    pub(crate) fn set_org(&mut self, e: EdgeId, v: VertexId) {
        self.quads[e.quad() as usize].org[e.rotation() as usize] = Some(v);
    }

    // -------------------------------------------------------------------------
    // Derived traversal
    // -------------------------------------------------------------------------

    /// The previous edge counter-clockwise around `org(e)`.
    #[inline]
    #[must_use]
    pub fn oprev(&self, e: EdgeId) -> EdgeId {
        self.onext(e.rot()).rot()
    }

    /// The next edge counter-clockwise around the left face of `e`.
    #[inline]
    #[must_use]
    pub fn lnext(&self, e: EdgeId) -> EdgeId {
        self.onext(e.rot_inv()).rot()
    }

    /// The previous edge around the left face of `e`.
    #[inline]
    #[must_use]
    pub fn lprev(&self, e: EdgeId) -> EdgeId {
        self.onext(e).sym()
    }

    /// The previous edge counter-clockwise around the right face of `e`.
    #[inline]
    #[must_use]
    pub fn rprev(&self, e: EdgeId) -> EdgeId {
        self.onext(e.sym())
    }

    // -------------------------------------------------------------------------
    // Topological operations
    // -------------------------------------------------------------------------

    /// Allocates a fresh, isolated edge.
    ///
    /// The new edge is its own `Onext` ring on both endpoints
    /// (`Onext(e) = e`, `Onext(Sym(e)) = Sym(e)`) and its dual crosses an
    /// unbounded face (`Onext(Rot(e)) = Rot⁻¹(e)`). Origins are unlabeled.
    /// The lowest previously freed slot is reused first.
    pub fn make_edge(&mut self) -> EdgeId {
        let quad = match self.free.pop() {
            Some(Reverse(q)) => {
                self.quads[q as usize].alive = true;
                q
            }
            None => {
                let q = self.quads.len() as u32;
                self.quads.push(Quad {
                    next: [EdgeId::from_parts(q, 0); 4],
                    org: [None; 4],
                    alive: true,
                });
                q
            }
        };
        let e = EdgeId::from_parts(quad, 0);
        self.quads[quad as usize].next = [e, e.rot_inv(), e.sym(), e.rot()];
        self.quads[quad as usize].org = [None; 4];
        self.live += 1;
        e
    }

    /// Allocates an isolated edge with both endpoints labeled.
    pub fn make_oriented_edge(&mut self, org: VertexId, dest: VertexId) -> EdgeId {
        let e = self.make_edge();
        self.set_org(e, org);
        self.set_org(e.sym(), dest);
        e
    }

    /// The Guibas–Stolfi splice primitive.
    ///
    /// Exchanges the `Onext` rings at `org(a)` and `org(b)`: if the two
    /// edges share an origin ring they are separated into two rings, and if
    /// they sit on distinct rings the rings are merged. The dual rings of
    /// the left faces are exchanged symmetrically. Never allocates or frees,
    /// and applying the same splice twice is the identity.
    pub fn splice(&mut self, a: EdgeId, b: EdgeId) {
        let alpha = self.onext(a).rot();
        let beta = self.onext(b).rot();

        let a_next = self.onext(a);
        let b_next = self.onext(b);
        self.set_next(a, b_next);
        self.set_next(b, a_next);

        let alpha_next = self.onext(alpha);
        let beta_next = self.onext(beta);
        self.set_next(alpha, beta_next);
        self.set_next(beta, alpha_next);
    }

    /// Connects `Dest(a)` to `org(b)` with a new edge, closing the face both
    /// edges bound: after the call `Lnext(a) = e` and `Lnext(e) = b`.
    ///
    /// Precondition: `a` and `b` bound a common left face.
    pub fn connect(&mut self, a: EdgeId, b: EdgeId) -> EdgeId {
        let e = self.make_oriented_edge(self.dest(a), self.org(b));
        let a_lnext = self.lnext(a);
        self.splice(e, a_lnext);
        self.splice(e.sym(), b);
        e
    }

    /// Detaches `e` from both of its origin rings and frees the record.
    ///
    /// After return every id of the quad (`e`, `Sym(e)` and the two duals)
    /// is invalid until the slot is reissued by [`QuadEdgeStore::make_edge`].
    pub fn delete_edge(&mut self, e: EdgeId) {
        debug_assert!(self.contains(e), "delete of dead edge {e:?}");
        let op = self.oprev(e);
        self.splice(e, op);
        let sym_op = self.oprev(e.sym());
        self.splice(e.sym(), sym_op);

        let quad = e.quad();
        self.quads[quad as usize].alive = false;
        self.free.push(Reverse(quad));
        self.live -= 1;
    }

    // -------------------------------------------------------------------------
    // Validation
    // -------------------------------------------------------------------------

    /// Checks the structural invariants of every live record.
    ///
    /// Verifies that all `Onext` references target live records, that every
    /// `Onext` ring closes and agrees on its origin label, and that primal
    /// edges are labeled while duals are not. Cheap enough for debug
    /// assertions on moderate subdivisions; tests run it after every build.
    ///
    /// # Errors
    ///
    /// Returns the first [`TopologyError`] found.
    pub fn validate(&self) -> Result<(), TopologyError> {
        let directed = self.live * 4;
        for (i, quad) in self.quads.iter().enumerate() {
            if !quad.alive {
                continue;
            }
            for r in 0..4 {
                let e = EdgeId::from_parts(i as u32, r);
                let next = quad.next[r as usize];
                if !self.contains(next) {
                    return Err(TopologyError::DanglingNext {
                        edge: format!("{e:?}"),
                        next: format!("{next:?}"),
                    });
                }
                if e.is_primal() && self.org_opt(e).is_none() {
                    return Err(TopologyError::UnlabeledPrimal {
                        edge: format!("{e:?}"),
                    });
                }
                if !e.is_primal() && self.org_opt(e).is_some() {
                    return Err(TopologyError::LabeledDual {
                        edge: format!("{e:?}"),
                    });
                }
                if e.is_primal() {
                    self.check_ring(e, directed)?;
                }
            }
        }
        Ok(())
    }

    fn check_ring(&self, e: EdgeId, bound: usize) -> Result<(), TopologyError> {
        let origin = self.org(e);
        let mut walk = self.onext(e);
        let mut steps = 0usize;
        while walk != e {
            match self.org_opt(walk) {
                Some(v) if v == origin => {}
                Some(other) => {
                    return Err(TopologyError::MixedRing {
                        edge: format!("{e:?}"),
                        origin,
                        other,
                    });
                }
                None => {
                    return Err(TopologyError::UnlabeledPrimal {
                        edge: format!("{walk:?}"),
                    });
                }
            }
            steps += 1;
            if steps > bound {
                return Err(TopologyError::UnclosedRing {
                    edge: format!("{e:?}"),
                });
            }
            walk = self.onext(walk);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_id_algebra_is_structural() {
        let e = EdgeId::from_parts(7, 0);
        assert_eq!(e.rot().rot().rot().rot(), e);
        assert_eq!(e.sym().sym(), e);
        assert_eq!(e.rot().rot(), e.sym());
        assert_eq!(e.rot().rot_inv(), e);
        assert!(e.is_primal());
        assert!(!e.rot().is_primal());
        assert!(e.sym().is_primal());
    }

    #[test]
    fn make_edge_starts_isolated() {
        let mut store = QuadEdgeStore::new();
        let e = store.make_edge();

        assert_eq!(store.onext(e), e);
        assert_eq!(store.onext(e.sym()), e.sym());
        assert_eq!(store.onext(e.rot()), e.rot_inv());
        assert_eq!(store.onext(e.rot_inv()), e.rot());
        assert_eq!(store.org_opt(e), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn splice_merges_and_separates_rings() {
        let mut store = QuadEdgeStore::new();
        let a = store.make_oriented_edge(0, 1);
        let b = store.make_oriented_edge(0, 2);

        store.splice(a, b);
        assert_eq!(store.onext(a), b);
        assert_eq!(store.onext(b), a);

        // Involution: the same splice separates the rings again.
        store.splice(a, b);
        assert_eq!(store.onext(a), a);
        assert_eq!(store.onext(b), b);
    }

    #[test]
    fn connect_closes_a_face() {
        let mut store = QuadEdgeStore::new();
        // a: 0 -> 1, b: 1 -> 2, then close 2 -> 0.
        let a = store.make_oriented_edge(0, 1);
        let b = store.make_oriented_edge(1, 2);
        store.splice(a.sym(), b);

        let c = store.connect(b, a);
        assert_eq!(store.org(c), 2);
        assert_eq!(store.dest(c), 0);
        assert_eq!(store.lnext(a), b);
        assert_eq!(store.lnext(b), c);
        assert_eq!(store.lnext(c), a);
        assert!(store.validate().is_ok());
    }

    #[test]
    fn delete_edge_restores_the_remaining_rings() {
        let mut store = QuadEdgeStore::new();
        let a = store.make_oriented_edge(0, 1);
        let b = store.make_oriented_edge(1, 2);
        store.splice(a.sym(), b);
        let c = store.connect(b, a);

        store.delete_edge(c);
        assert_eq!(store.len(), 2);
        assert!(!store.contains(c));
        // The triangle collapses back to the two-edge path 0 -> 1 -> 2.
        assert_eq!(store.onext(a), a);
        assert_eq!(store.lnext(a), b);
        assert!(store.validate().is_ok());
    }

    #[test]
    fn freed_slots_are_reused_lowest_first() {
        let mut store = QuadEdgeStore::new();
        let a = store.make_oriented_edge(0, 1);
        let b = store.make_oriented_edge(2, 3);
        let c = store.make_oriented_edge(4, 5);

        store.delete_edge(c);
        store.delete_edge(a);
        assert_eq!(store.len(), 1);

        let d = store.make_edge();
        assert_eq!(d.quad(), a.quad(), "lowest freed slot first");
        let e = store.make_edge();
        assert_eq!(e.quad(), c.quad());
        let f = store.make_edge();
        assert_eq!(f.quad(), b.quad() + 2);
    }

    #[test]
    fn validate_flags_a_mixed_ring() {
        let mut store = QuadEdgeStore::new();
        let a = store.make_oriented_edge(0, 1);
        let b = store.make_oriented_edge(7, 2);

        // Splicing edges with different origin labels corrupts the ring.
        store.splice(a, b);
        assert!(matches!(
            store.validate(),
            Err(TopologyError::MixedRing { .. })
        ));
    }
}
