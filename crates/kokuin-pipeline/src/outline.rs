//! Boundary walking: trace the outline of one body.
//!
//! A Moore-neighbor-style walk over the binarized raster. Starting at
//! a pixel known to belong to a body, the walk repeatedly steps to the
//! first clockwise black neighbor that itself touches the boundary
//! (has a white neighbor or sits on the raster edge), rotating each
//! new pixel's scan order to begin where the walk came from so the
//! path hugs the boundary instead of cutting through the interior.
//!
//! The walk terminates when no neighbor qualifies. It is not
//! guaranteed to close back onto the start point; thin spurs and other
//! awkward topologies produce open walks, and callers treat that as
//! expected rather than an error.

use std::collections::HashSet;

use image::GrayImage;

use crate::binarize::is_black;
use crate::types::Point;

/// Clockwise neighbor offsets starting directly above.
const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];

/// Trace the boundary walk of the body containing `start`.
///
/// `start` must be a black pixel; the caller (the body finder) always
/// hands over the flood-fill seed. A single isolated pixel yields an
/// outline of exactly that one point.
#[must_use = "returns the ordered boundary walk"]
pub fn trace_outline(raster: &GrayImage, start: Point) -> Vec<Point> {
    let mut outline = Vec::new();
    let mut visited: HashSet<Point> = HashSet::new();

    let mut current = start;
    // Scan order for the current pixel's neighbors. The seed starts
    // directly above; every later pixel starts at its predecessor.
    let mut order = neighbors_clockwise(start);

    loop {
        outline.push(current);
        visited.insert(current);

        let mut next = None;
        for &candidate in &order {
            if visited.contains(&candidate) || !is_black(raster, candidate.x, candidate.y) {
                continue;
            }
            let candidate_order = neighbors_from(candidate, current);
            if qualifies(raster, candidate, &candidate_order) {
                next = Some((candidate, candidate_order));
                break;
            }
        }

        match next {
            Some((candidate, candidate_order)) => {
                current = candidate;
                order = candidate_order;
            }
            None => break,
        }
    }

    outline
}

/// A pixel qualifies as the next boundary step when it touches white
/// (scanned in the rotated order) or lies on the raster edge.
fn qualifies(raster: &GrayImage, candidate: Point, order: &[Point; 8]) -> bool {
    on_edge(raster, candidate) || order.iter().any(|n| !is_black(raster, n.x, n.y))
}

/// Returns `true` if `p` lies on the outermost row or column.
fn on_edge(raster: &GrayImage, p: Point) -> bool {
    let last_x = i64::from(raster.width()) - 1;
    let last_y = i64::from(raster.height()) - 1;
    p.x == 0 || p.y == 0 || i64::from(p.x) == last_x || i64::from(p.y) == last_y
}

/// The 8 neighbors of `p` in clockwise order starting directly above.
fn neighbors_clockwise(p: Point) -> [Point; 8] {
    NEIGHBOR_OFFSETS.map(|(dx, dy)| Point::new(p.x + dx, p.y + dy))
}

/// The 8 neighbors of `p`, rotated so the scan begins at `from`.
///
/// `from` must be one of `p`'s 8 neighbors. If it somehow is not, the
/// unrotated order is used.
fn neighbors_from(p: Point, from: Point) -> [Point; 8] {
    let mut neighbors = neighbors_clockwise(p);
    if let Some(offset) = neighbors.iter().position(|&n| n == from) {
        neighbors.rotate_left(offset);
    }
    neighbors
}
