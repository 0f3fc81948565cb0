//! Geometric invariant checks shared by the integration suites.

use parallel_delaunay::prelude::*;
use std::collections::BTreeSet;

/// Indices of the convex hull of `points` (monotone chain), in CCW order.
/// Points lying on a hull edge are kept: the Euler-count cross-checks need
/// every point of the boundary walk, not just the corners.
pub fn convex_hull(points: &[(f64, f64)]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by(|&i, &j| {
        let (a, b) = (points[i], points[j]);
        a.0.total_cmp(&b.0).then_with(|| a.1.total_cmp(&b.1))
    });

    let turns_right = |o: usize, a: usize, b: usize| {
        orient(
            Point::new(points[o].0, points[o].1),
            Point::new(points[a].0, points[a].1),
            Point::new(points[b].0, points[b].1),
        ) == Orientation::RIGHT
    };

    let mut hull: Vec<usize> = Vec::with_capacity(order.len() * 2);
    for pass in 0..2 {
        let start = hull.len();
        let indices: Box<dyn Iterator<Item = &usize>> = if pass == 0 {
            Box::new(order.iter())
        } else {
            Box::new(order.iter().rev())
        };
        for &i in indices {
            while hull.len() >= start + 2
                && turns_right(hull[hull.len() - 2], hull[hull.len() - 1], i)
            {
                hull.pop();
            }
            hull.push(i);
        }
        hull.pop();
    }
    hull
}

/// Shoelace area of the polygon over `indices`.
pub fn polygon_area(points: &[(f64, f64)], indices: &[usize]) -> f64 {
    let mut twice = 0.0;
    for k in 0..indices.len() {
        let (x0, y0) = points[indices[k]];
        let (x1, y1) = points[indices[(k + 1) % indices.len()]];
        twice += x0 * y1 - x1 * y0;
    }
    twice.abs() / 2.0
}

/// Asserts that every emitted triangle satisfies the empty-circumcircle
/// property against every other input point, and that its id triple winds
/// CCW after mapping back to coordinates.
pub fn assert_delaunay(t: &Triangulation) {
    let pt = |id: u32| t.points[id as usize];
    for &(u, v, w) in &t.triangles {
        // The sorted triple can wind either way; normalize to CCW.
        let (a, b, c) = if orient(pt(u), pt(v), pt(w)) == Orientation::LEFT {
            (u, v, w)
        } else {
            (u, w, v)
        };
        assert_eq!(
            orient(pt(a), pt(b), pt(c)),
            Orientation::LEFT,
            "degenerate triangle ({u}, {v}, {w})"
        );
        for d in 0..t.points.len() as u32 {
            if d == u || d == v || d == w {
                continue;
            }
            assert!(
                !in_circle(pt(a), pt(b), pt(c), pt(d)),
                "point {d} lies inside the circumcircle of ({u}, {v}, {w})"
            );
        }
    }
}

/// Asserts the structural side of the egress contract: sorted, deduplicated,
/// canonical edge pairs and triangle triples, and the Euler count for
/// non-degenerate inputs.
pub fn assert_egress_form(t: &Triangulation) {
    assert!(t.edges.windows(2).all(|w| w[0] < w[1]), "edges sorted, unique");
    assert!(t.edges.iter().all(|&(u, v)| u < v), "canonical edge pairs");
    assert!(
        t.triangles.windows(2).all(|w| w[0] < w[1]),
        "triangles sorted, unique"
    );
    assert!(
        t.triangles.iter().all(|&(u, v, w)| u < v && v < w),
        "canonical triples"
    );
    if !t.triangles.is_empty() {
        assert_eq!(
            t.edges.len() as isize - t.points.len() as isize - t.triangles.len() as isize,
            -1,
            "Euler characteristic of a triangulated disk"
        );
    }
}

/// Asserts that the triangles exactly cover the convex hull: counted via
/// `2n − 2 − h` and measured by area.
pub fn assert_hull_coverage(input: &[(f64, f64)], t: &Triangulation) {
    let hull = convex_hull(input);
    assert_eq!(
        t.triangles.len(),
        Triangulation::expected_triangle_count(input.len(), hull.len()),
        "triangle count for {} points with {} hull vertices",
        input.len(),
        hull.len()
    );

    let hull_area = polygon_area(input, &hull);
    let triangle_area: f64 = t
        .triangles
        .iter()
        .map(|&(u, v, w)| polygon_area(input, &[u as usize, v as usize, w as usize]))
        .sum();
    let tolerance = hull_area.max(1.0) * 1e-9;
    assert!(
        (hull_area - triangle_area).abs() <= tolerance,
        "triangles cover {triangle_area}, hull covers {hull_area}"
    );
}

/// Canonical, id-free form of a triangle set: each triangle as its three
/// coordinate pairs (bit patterns), sorted. Invariant under input
/// permutation.
pub fn coordinate_triangles(t: &Triangulation) -> BTreeSet<[[u64; 2]; 3]> {
    t.triangles
        .iter()
        .map(|&(u, v, w)| {
            let mut tri = [u, v, w].map(|id| {
                let p = t.points[id as usize];
                [p.x.to_bits(), p.y.to_bits()]
            });
            tri.sort_unstable();
            tri
        })
        .collect()
}
