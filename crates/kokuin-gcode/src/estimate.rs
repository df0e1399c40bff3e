//! Time and distance estimation for a routed toolpath.
//!
//! Converts the route's pixel-space geometry into physical
//! millimetres and wall-clock time using the configured speeds. The
//! serializer's progress markers reuse the same per-element timing so
//! `M73 R` values agree with the reported estimate.

use std::time::Duration;

use kokuin_pipeline::{EtchConfig, MoveKind, Point, Route, Sequence};

/// Estimated wall-clock duration and physical distance for a route.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    /// Total duration, rounded to the nearest millisecond.
    pub duration: Duration,
    /// Total head travel in millimetres (trace + travel + etch).
    pub distance_mm: f64,
}

/// Convert a speed in mm/min to mm/ms.
pub(crate) fn mm_per_ms(speed_mm_min: f64) -> f64 {
    speed_mm_min / 60_000.0
}

/// The configured speed (mm/min) that applies to a move kind.
///
/// The preview trace runs at travel speed; only etching runs at the
/// etch speed.
pub(crate) const fn speed_for(kind: MoveKind, config: &EtchConfig) -> f64 {
    match kind {
        MoveKind::Etch => config.etch_speed,
        MoveKind::Trace | MoveKind::Travel => config.travel_speed,
    }
}

/// Duration and distance of the preview trace, in (ms, mm).
///
/// Zero when the preview is disabled. Includes the fixed start and
/// end alignment pauses.
pub(crate) fn trace_cost(route: &Route, config: &EtchConfig) -> (f64, f64) {
    if !config.preview_trace || route.trace.is_empty() {
        return (0.0, 0.0);
    }

    let trace_speed = mm_per_ms(config.travel_speed);
    let mut ms = 0.0;
    let mut mm = 0.0;
    for m in &route.trace {
        let length_mm = m.length() * config.pixel_size;
        mm += length_mm;
        ms += length_mm / trace_speed;
    }

    #[allow(clippy::cast_precision_loss)]
    let pauses = 2.0 * config.trace_delay_ms as f64;
    (ms + pauses, mm)
}

/// Duration and distance of one pass of the main sequence, in (ms, mm).
///
/// Stencil routes include the laser-off travel between the end of one
/// path and the start of the next; the positioning move to the very
/// first path is not counted.
pub(crate) fn pass_cost(route: &Route, config: &EtchConfig) -> (f64, f64) {
    let travel = mm_per_ms(config.travel_speed);
    let etch = mm_per_ms(config.etch_speed);
    let mut ms = 0.0;
    let mut mm = 0.0;

    match &route.sequence {
        Sequence::Raster(moves) => {
            for m in moves {
                let length_mm = m.length() * config.pixel_size;
                mm += length_mm;
                ms += length_mm / mm_per_ms(speed_for(m.kind, config));
            }
        }
        Sequence::Stencil(paths) => {
            let mut previous_end = None;
            for path in paths {
                if let (Some(prev), Some(start)) = (previous_end, path.first()) {
                    let gap_mm = Point::distance(prev, start) * config.pixel_size;
                    mm += gap_mm;
                    ms += gap_mm / travel;
                }
                let length_mm = path.length() * config.pixel_size;
                mm += length_mm;
                ms += length_mm / etch;
                previous_end = path.last().or(previous_end);
            }
        }
    }

    (ms, mm)
}

/// Estimate total duration and distance for a route.
///
/// The preview trace (when enabled) runs once; the main sequence runs
/// once per configured pass. The final millisecond total is rounded
/// to the nearest whole millisecond.
#[must_use = "returns the computed estimate"]
pub fn estimate(route: &Route, config: &EtchConfig) -> Estimate {
    let (trace_ms, trace_mm) = trace_cost(route, config);
    let (pass_ms, pass_mm) = pass_cost(route, config);

    let passes = f64::from(config.passes);
    let total_ms = trace_ms + pass_ms * passes;
    let total_mm = trace_mm + pass_mm * passes;

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let duration = Duration::from_millis(total_ms.round().max(0.0) as u64);
    Estimate {
        duration,
        distance_mm: total_mm,
    }
}
