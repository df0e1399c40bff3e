//! Path routing: order etch geometry into one head-movement sequence.
//!
//! Raster mode sweeps scanlines top to bottom, picking per line
//! whichever end is closer to the head's last position — a greedy,
//! intentionally local heuristic that approximates a boustrophedon
//! sweep. Downstream time and G-code estimates are defined relative
//! to this exact ordering, so it must not be silently upgraded to a
//! true travel-optimal ordering.
//!
//! Stencil mode keeps bodies in discovery order, one outline path per
//! body, with no inter-body reordering.
//!
//! Both modes prepend a pre-etch trace: four clockwise [`MoveKind::Trace`]
//! moves around the pixel bounding rectangle, starting at (0,0).

use crate::types::{Body, Dimensions, EtchPath, Line, Move, MoveKind, Point, Route, Sequence};

/// Route scanlines into travel/etch moves (raster mode).
///
/// The head starts at pixel-space origin (0,0). For each line, the
/// closer of the line's start (leftmost) and end (rightmost) points
/// decides the sweep direction; ties favor the start. Sweeping left
/// to right, each segment gets a Travel to its start then an Etch to
/// its end; right to left, segments are taken in decreasing X and
/// etched end-to-start.
#[must_use = "returns the routed toolpath"]
pub fn route_raster(lines: &[Line], dimensions: Dimensions) -> Route {
    let mut moves = Vec::new();
    let mut last = Point::new(0, 0);

    for line in lines {
        let (Some(start), Some(end)) = (line.start_point(), line.end_point()) else {
            continue;
        };

        if last.distance(start) <= last.distance(end) {
            for seg in &line.segments {
                let seg_start = Point::new(seg.start, line.y);
                let seg_end = Point::new(seg.end, line.y);
                moves.push(Move::new(MoveKind::Travel, last, seg_start));
                moves.push(Move::new(MoveKind::Etch, seg_start, seg_end));
                last = seg_end;
            }
        } else {
            for seg in line.segments.iter().rev() {
                let seg_end = Point::new(seg.end, line.y);
                let seg_start = Point::new(seg.start, line.y);
                moves.push(Move::new(MoveKind::Travel, last, seg_end));
                moves.push(Move::new(MoveKind::Etch, seg_end, seg_start));
                last = seg_start;
            }
        }
    }

    Route {
        dimensions,
        trace: bounding_trace(dimensions),
        sequence: Sequence::Raster(moves),
    }
}

/// Route body outlines into paths (stencil mode).
///
/// One [`EtchPath`] per body, in body-discovery order. Bodies with an
/// empty outline never occur (even a single pixel yields a one-point
/// walk), but are skipped defensively by the length computation being
/// zero rather than by filtering.
#[must_use = "returns the routed toolpath"]
pub fn route_stencil(bodies: &[Body], dimensions: Dimensions) -> Route {
    let paths = bodies
        .iter()
        .map(|body| EtchPath::new(body.outline.clone()))
        .collect();

    Route {
        dimensions,
        trace: bounding_trace(dimensions),
        sequence: Sequence::Stencil(paths),
    }
}

/// The pre-etch boundary preview: four clockwise trace moves around
/// the pixel bounding rectangle, starting and ending at (0,0).
///
/// A zero-area raster has no rectangle to trace and yields no moves.
fn bounding_trace(dimensions: Dimensions) -> Vec<Move> {
    if dimensions.width == 0 || dimensions.height == 0 {
        return Vec::new();
    }

    let max_x = dimensions.width.cast_signed() - 1;
    let max_y = dimensions.height.cast_signed() - 1;
    let corners = [
        Point::new(0, 0),
        Point::new(max_x, 0),
        Point::new(max_x, max_y),
        Point::new(0, max_y),
        Point::new(0, 0),
    ];

    corners
        .windows(2)
        .map(|pair| Move::new(MoveKind::Trace, pair[0], pair[1]))
        .collect()
}
