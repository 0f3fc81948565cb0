//! # parallel-delaunay
//!
//! Delaunay triangulation of planar point sets by the Guibas & Stolfi
//! divide-and-conquer algorithm, with the divide step optionally spread
//! across a group of communicating workers.
//!
//! # Features
//!
//! - Quad-edge representation of the subdivision: four directed edges per
//!   undirected edge, rotation and symmetry by id arithmetic, `splice` as
//!   the single topological mutation primitive
//! - Exact adaptive-precision orientation and in-circle predicates, with a
//!   deterministic tie-break on cocircular configurations
//! - Sequential divide-and-conquer solver with polyline handling for
//!   collinear inputs
//! - Tree-structured reduction over an abstract process group: partition by
//!   x, triangulate locally, zip pairwise up a binary tree
//! - A compact little-endian wire format for subdivisions in flight, and an
//!   in-process loopback group for testing the full distributed path
//!
//! # Basic Usage
//!
//! ```rust
//! use parallel_delaunay::prelude::*;
//!
//! // Vertex ids are input positions: 0, 1, 2, 3.
//! let triangulation = triangulate(&[
//!     (0.0, 0.0),
//!     (2.0, 0.0),
//!     (1.0, 1.5),
//!     (1.0, 0.5),
//! ])
//! .unwrap();
//!
//! assert_eq!(triangulation.triangles, vec![(0, 1, 3), (0, 2, 3), (1, 2, 3)]);
//! assert_eq!(triangulation.edges.len(), 6);
//! ```
//!
//! # Group Usage
//!
//! The same computation runs across `P` workers; rank 0 supplies the points
//! and collects the result. [`parallel::transport::LoopbackGroup`] drives
//! the identical coordinator over in-process channels:
//!
//! ```rust
//! use parallel_delaunay::prelude::*;
//!
//! let points: Vec<(f64, f64)> = (0..32)
//!     .map(|i| {
//!         let a = f64::from(i) * 0.7;
//!         (a.cos() * (1.0 + a), a.sin() * (1.0 + a))
//!     })
//!     .collect();
//!
//! let sequential = triangulate(&points).unwrap();
//! let results = LoopbackGroup::run(4, |comm| {
//!     let input = (comm.rank() == 0).then_some(points.as_slice());
//!     triangulate_group(comm, input).unwrap()
//! });
//! assert_eq!(results[0].as_ref().unwrap(), &sequential);
//! ```
//!
//! # Invariants
//!
//! The quad-edge store maintains, after every public operation:
//!
//! - the `Onext` ring of every vertex is a closed cyclic walk of exactly the
//!   edges out of that vertex, counter-clockwise;
//! - `Sym(Sym(e)) = e` and `Rot⁴(e) = e` (structural, by id arithmetic);
//! - `splice` is an involution;
//! - no freed edge record is reachable.
//!
//! [`core::quad_edge::QuadEdgeStore::validate`] checks the stored parts of
//! these on demand; debug builds assert them after every build and merge.
//! On top of the store, a finished triangulation satisfies the Delaunay
//! property — no input point strictly inside any triangle's circumcircle —
//! and its egress form is deterministic: independent of input permutation,
//! of the number of workers, and of repetition.

// Forbid unsafe code throughout the entire crate
#![forbid(unsafe_code)]

/// The `core` module contains the quad-edge data structure and the
/// divide-and-conquer triangulation algorithms that run on it.
pub mod core {
    /// Divide-and-conquer Delaunay construction and the pairwise merge
    pub mod delaunay;
    /// The quad-edge arena and its topological operations
    pub mod quad_edge;
    /// Egress form of a finished triangulation and the projection into it
    pub mod triangulation;

    pub use delaunay::*;
    pub use quad_edge::*;
    pub use triangulation::*;
}

/// Contains the 2-D point type and the exact geometric predicates.
pub mod geometry {
    pub mod point;
    pub mod predicates;

    pub use point::*;
    pub use predicates::*;
}

/// Distributed reduction: process-group abstraction, wire format, and the
/// tree coordinator.
pub mod parallel {
    /// The binary reduction tree over a process group
    pub mod reduction;
    /// The `Communicator` trait and the in-process loopback group
    pub mod transport;
    /// Little-endian wire format for subdivisions in flight
    pub mod wire;

    pub use reduction::*;
    pub use transport::*;
    pub use wire::*;
}

/// A prelude module that re-exports the commonly used types and entry
/// points.
pub mod prelude {
    pub use crate::core::{
        delaunay::{InputError, Subdivision},
        quad_edge::{EdgeId, QuadEdgeStore, TopologyError},
        triangulation::{triangulate, Triangulation},
    };
    pub use crate::geometry::{
        point::{Point, VertexId},
        predicates::{in_circle, orient, Orientation},
    };
    pub use crate::parallel::{
        reduction::{triangulate_group, GroupError},
        transport::{Communicator, LoopbackComm, LoopbackGroup, TransportError},
        wire::WireError,
    };
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[test]
    fn prelude_covers_the_common_path() {
        let t = triangulate(&[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)]).unwrap();
        assert_eq!(t.triangles, vec![(0, 1, 2)]);
    }
}
