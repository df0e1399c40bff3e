//! Shared types for the kokuin raster-to-toolpath pipeline.

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference the
/// binarized raster without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbaImage` so downstream crates can reference the
/// original decoded image without depending on `image` directly.
pub use image::RgbaImage;

/// An integer pixel coordinate in image space.
///
/// Origin is the top-left corner of the raster; `x` grows rightward,
/// `y` grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: i32,
    /// Vertical position (pixels from top edge).
    pub y: i32,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Stepper-motion distance to another point.
    ///
    /// Axis-aligned moves (shared `x` or shared `y`) cost the absolute
    /// difference of the other component; everything else costs the
    /// Euclidean distance. This mirrors how the head actually travels:
    /// a single-axis move is one motor running, a diagonal is both.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        if self.x == other.x {
            dy.abs()
        } else if self.y == other.y {
            dx.abs()
        } else {
            dx.hypot(dy)
        }
    }
}

/// A contiguous run of black pixels on one scanline.
///
/// Both bounds are inclusive X coordinates; `start <= end` always.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EtchSegment {
    /// Leftmost X of the run (inclusive).
    pub start: i32,
    /// Rightmost X of the run (inclusive).
    pub end: i32,
}

impl EtchSegment {
    /// Create a new segment. Bounds are normalized so `start <= end`.
    #[must_use]
    pub const fn new(start: i32, end: i32) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// Pixel length of the run (inclusive bounds, so a single pixel
    /// has length 0 in move terms).
    #[must_use]
    pub const fn width(self) -> i32 {
        self.end - self.start
    }
}

/// One scanline: a row index plus its black runs in left-to-right order.
///
/// A line with zero segments is never materialized; the segmenter drops
/// empty rows instead of storing them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    /// Row index (pixels from top edge).
    pub y: i32,
    /// Black runs on this row, in increasing, non-overlapping X order.
    pub segments: Vec<EtchSegment>,
}

impl Line {
    /// Leftmost point of the line: the first segment's start.
    ///
    /// Returns `None` only for a segment-less line, which callers never
    /// construct through the segmenter.
    #[must_use]
    pub fn start_point(&self) -> Option<Point> {
        self.segments.first().map(|s| Point::new(s.start, self.y))
    }

    /// Rightmost point of the line: the last segment's end.
    #[must_use]
    pub fn end_point(&self) -> Option<Point> {
        self.segments.last().map(|s| Point::new(s.end, self.y))
    }
}

/// A maximal 8-connected cluster of black pixels plus its traced outline.
///
/// Bodies are discovered once per image in raster scan order and never
/// merged or split afterward. The first point is the flood-fill seed,
/// which is always the topmost-then-leftmost pixel of the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Body {
    /// Every pixel belonging to the cluster, in flood-fill visit order.
    pub points: Vec<Point>,
    /// Ordered boundary walk starting at the seed. May be an open walk;
    /// closure back to the start is not guaranteed.
    pub outline: Vec<Point>,
}

/// An ordered point sequence with its precomputed cumulative length.
///
/// Length sums consecutive-pair distances under the [`Point::distance`]
/// rule, in pixel units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EtchPath {
    points: Vec<Point>,
    length: f64,
}

impl EtchPath {
    /// Create a path, computing its cumulative length.
    #[must_use]
    pub fn new(points: Vec<Point>) -> Self {
        let length = points.windows(2).map(|w| w[0].distance(w[1])).sum();
        Self { points, length }
    }

    /// All points in walk order.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Cumulative length in pixel units.
    #[must_use]
    pub const fn length(&self) -> f64 {
        self.length
    }

    /// First point, if any.
    #[must_use]
    pub fn first(&self) -> Option<Point> {
        self.points.first().copied()
    }

    /// Last point, if any.
    #[must_use]
    pub fn last(&self) -> Option<Point> {
        self.points.last().copied()
    }

    /// Returns `true` if the path has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// What the laser is doing during a [`Move`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveKind {
    /// Low-power boundary-preview stroke.
    Trace,
    /// Laser-off repositioning.
    Travel,
    /// Laser-on etching stroke.
    Etch,
}

/// A single head movement between two pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Move {
    /// Laser state during the move.
    pub kind: MoveKind,
    /// Where the head starts.
    pub from: Point,
    /// Where the head ends.
    pub to: Point,
}

impl Move {
    /// Create a new move.
    #[must_use]
    pub const fn new(kind: MoveKind, from: Point, to: Point) -> Self {
        Self { kind, from, to }
    }

    /// Pixel length under the [`Point::distance`] rule.
    #[must_use]
    pub fn length(self) -> f64 {
        self.from.distance(self.to)
    }
}

/// The main etch sequence of a [`Route`], shaped by the etch mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Sequence {
    /// Raster mode: explicit travel/etch moves per scanline segment.
    Raster(Vec<Move>),
    /// Stencil mode: one outline path per body, in discovery order.
    Stencil(Vec<EtchPath>),
}

impl Sequence {
    /// Returns `true` if the sequence contains no moves or paths.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Raster(moves) => moves.is_empty(),
            Self::Stencil(paths) => paths.is_empty(),
        }
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Immutable result of routing one image.
///
/// A recompute (e.g. after a threshold change) builds an entirely new
/// `Route` from the original decoded image; routes are superseded,
/// never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Source raster dimensions in pixels.
    pub dimensions: Dimensions,
    /// Pre-etch boundary preview: four clockwise [`MoveKind::Trace`]
    /// moves around the pixel bounding rectangle, starting at (0,0).
    /// Empty for a zero-area raster.
    pub trace: Vec<Move>,
    /// The ordered main etch sequence.
    pub sequence: Sequence,
}

/// Which decomposition the router applies to the binarized raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EtchMode {
    /// Scanline sweep: etch every black run row by row.
    #[default]
    Raster,
    /// Outline-only: etch each body's traced boundary.
    Stencil,
}

/// Comment syntax accepted by the target firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CommentStyle {
    /// `; comment`
    #[default]
    Semicolon,
    /// `(comment)`
    Parentheses,
}

impl CommentStyle {
    /// Render `text` as a comment in this style.
    #[must_use]
    pub fn format(self, text: &str) -> String {
        match self {
            Self::Semicolon => format!("; {text}"),
            Self::Parentheses => format!("({text})"),
        }
    }
}

/// Physical and G-code parameters for routing, estimation, and
/// serialization.
///
/// The pipeline assumes the numeric values were validated upstream;
/// only `white_threshold` is range-checked because an out-of-range
/// threshold silently produces an all-black or all-white raster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EtchConfig {
    /// Etch mode: raster sweep or stencil outlines.
    pub mode: EtchMode,

    /// Perceptual-luminance cutoff in [0, 1]; pixels at or above it
    /// are white (not etched).
    pub white_threshold: f32,

    /// Physical size of one pixel in millimetres.
    pub pixel_size: f64,

    /// Machine X coordinate (mm) of pixel column 0.
    pub origin_x: f64,

    /// Machine Y coordinate (mm) of pixel row 0. Image Y grows
    /// downward, machine Y grows upward, so rows subtract from this.
    pub origin_y: f64,

    /// Focus height (mm). When set, the init block moves Z here.
    pub z_height: Option<f64>,

    /// Laser-off repositioning speed in mm/min. Also used for the
    /// boundary-preview trace.
    pub travel_speed: f64,

    /// Laser-on etching speed in mm/min.
    pub etch_speed: f64,

    /// How many times the main sequence is repeated.
    pub passes: u32,

    /// Firmware command that turns the laser off.
    pub laser_off: String,

    /// Firmware command for the low-power preview beam.
    pub laser_low: String,

    /// Firmware command for the full-power etching beam.
    pub laser_high: String,

    /// Motion command prefix, typically `G0` or `G1`.
    pub move_command: String,

    /// Comment syntax for the emitted program.
    pub comment_style: CommentStyle,

    /// Whether to home X/Y (`G28 X Y`) before etching.
    pub home_before_etch: bool,

    /// Whether to run the low-power boundary preview before etching.
    pub preview_trace: bool,

    /// Dwell inserted before and after the preview trace, in
    /// milliseconds. Gives the operator time to check alignment.
    pub trace_delay_ms: u64,
}

impl Default for EtchConfig {
    fn default() -> Self {
        Self {
            mode: EtchMode::default(),
            white_threshold: 0.6,
            pixel_size: 0.1,
            origin_x: 0.0,
            origin_y: 200.0,
            z_height: None,
            travel_speed: 3000.0,
            etch_speed: 600.0,
            passes: 1,
            laser_off: "M5".to_string(),
            laser_low: "M3 S20".to_string(),
            laser_high: "M3 S255".to_string(),
            move_command: "G1".to_string(),
            comment_style: CommentStyle::default(),
            home_before_etch: false,
            preview_trace: true,
            trace_delay_ms: 3000,
        }
    }
}

/// Errors that can occur while computing a route.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Configuration value outside its valid range.
    #[error("invalid etch configuration: {0}")]
    InvalidConfig(String),
}
