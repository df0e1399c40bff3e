//! kokuin-pipeline: raster image to laser toolpath (sans-IO).
//!
//! Converts a decoded image into a physically executable [`Route`]:
//! binarize -> (scanline segmentation | body detection + outline
//! tracing) -> path routing.
//!
//! This crate has **no I/O dependencies** — it operates on in-memory
//! byte slices and raster buffers and returns structured data. File
//! reading and program writing live in the `kokuin` CLI and
//! `kokuin-gcode`.
//!
//! Every stage is synchronous and CPU-bound; a recompute (after a
//! threshold or mode change) starts from the original decoded image
//! and builds an entirely new `Route`.

pub mod binarize;
pub mod bodies;
pub mod outline;
pub mod route;
pub mod scanline;
pub mod types;

pub use types::{
    Body, CommentStyle, Dimensions, EtchConfig, EtchMode, EtchPath, EtchSegment, Line, Move,
    MoveKind, PipelineError, Point, Route, Sequence,
};

/// Compute a route from raw image bytes.
///
/// Decodes the image (PNG, JPEG, BMP), binarizes it against the
/// configured white threshold, decomposes it per the configured etch
/// mode, and routes the result into a single head-movement sequence.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `image_bytes` is empty,
/// [`PipelineError::ImageDecode`] if decoding fails, and
/// [`PipelineError::InvalidConfig`] if the white threshold is outside
/// [0, 1].
pub fn process(image_bytes: &[u8], config: &EtchConfig) -> Result<Route, PipelineError> {
    if image_bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    let image = image::load_from_memory(image_bytes)?.to_rgba8();
    route_image(&image, config)
}

/// Compute a route from an already-decoded image.
///
/// Entry point for callers that hold on to the decoded image and
/// recompute when parameters change — each call starts from the
/// original pixels, so threshold changes never compound.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if the white threshold is
/// outside [0, 1].
pub fn route_image(
    image: &types::RgbaImage,
    config: &EtchConfig,
) -> Result<Route, PipelineError> {
    if !(0.0..=1.0).contains(&config.white_threshold) {
        return Err(PipelineError::InvalidConfig(format!(
            "white threshold {} is outside [0, 1]",
            config.white_threshold,
        )));
    }

    let raster = binarize::binarize(image, config.white_threshold);
    let dimensions = Dimensions {
        width: raster.width(),
        height: raster.height(),
    };

    let route = match config.mode {
        EtchMode::Raster => {
            let lines = scanline::segment_rows(&raster);
            route::route_raster(&lines, dimensions)
        }
        EtchMode::Stencil => {
            let bodies = bodies::find_bodies(&raster);
            route::route_stencil(&bodies, dimensions)
        }
    };

    Ok(route)
}
