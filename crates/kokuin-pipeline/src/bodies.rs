//! Body detection: flood-fill 8-connected clusters of black pixels.
//!
//! Pixels are scanned in row-major order (top-to-bottom,
//! left-to-right). Each unvisited black pixel seeds a breadth-first
//! flood fill that collects the whole 8-connected cluster into one
//! [`Body`], after which the outline tracer walks the cluster's
//! boundary from the seed. Discovery order is therefore the scan
//! order of each body's first-encountered pixel.
//!
//! The visited bitmap is local to one invocation and discarded
//! afterward; recomputing from a re-binarized raster starts fresh.

use std::collections::VecDeque;

use image::GrayImage;

use crate::binarize::is_black;
use crate::outline::trace_outline;
use crate::types::{Body, Point};

/// Offsets of the 8 neighbors used by the flood fill.
const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Find every body in the binarized raster, in discovery order.
///
/// Each body carries its complete point set and the boundary walk
/// traced from its seed. A body consisting of a single pixel still
/// receives a (degenerate) one-point outline.
#[must_use = "returns the discovered bodies"]
pub fn find_bodies(raster: &GrayImage) -> Vec<Body> {
    let width = raster.width() as usize;
    let height = raster.height() as usize;
    let mut visited = vec![false; width * height];
    let mut bodies = Vec::new();

    for y in 0..raster.height() {
        for x in 0..raster.width() {
            let index = y as usize * width + x as usize;
            if visited[index] || !is_black(raster, x.cast_signed(), y.cast_signed()) {
                continue;
            }
            let seed = Point::new(x.cast_signed(), y.cast_signed());
            let points = flood_fill(raster, &mut visited, seed);
            let outline = trace_outline(raster, seed);
            bodies.push(Body { points, outline });
        }
    }

    bodies
}

/// Breadth-first flood fill over 8-neighbors, collecting black pixels.
///
/// Pixels are marked visited as they are enqueued so no pixel enters
/// the queue twice. The seed is always the first collected point.
fn flood_fill(raster: &GrayImage, visited: &mut [bool], seed: Point) -> Vec<Point> {
    let width = raster.width() as usize;
    let mut points = Vec::new();
    let mut queue = VecDeque::new();

    visited[seed.y.unsigned_abs() as usize * width + seed.x.unsigned_abs() as usize] = true;
    queue.push_back(seed);

    while let Some(p) = queue.pop_front() {
        points.push(p);
        for (dx, dy) in NEIGHBOR_OFFSETS {
            let n = Point::new(p.x + dx, p.y + dy);
            if !is_black(raster, n.x, n.y) {
                continue;
            }
            // In bounds, since is_black rejects out-of-range coordinates.
            let index = n.y.unsigned_abs() as usize * width + n.x.unsigned_abs() as usize;
            if visited[index] {
                continue;
            }
            visited[index] = true;
            queue.push_back(n);
        }
    }

    points
}
