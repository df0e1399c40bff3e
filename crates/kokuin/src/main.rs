//! Convert a raster image into a laser-etcher G-code program.
//!
//! Thin I/O glue around `kokuin-pipeline` and `kokuin-gcode`: read
//! the image file, assemble an [`EtchConfig`] from flags, route,
//! print the estimate, and write the program.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use kokuin_gcode::ProgramMetadata;
use kokuin_pipeline::{CommentStyle, EtchConfig, EtchMode};

/// Convert a raster image (PNG, JPEG, BMP) into a laser-etcher
/// G-code program.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// Input image path.
    input: PathBuf,

    /// Output G-code path.
    #[arg(short, long)]
    output: PathBuf,

    /// Etch mode: sweep scanlines or trace body outlines.
    #[arg(long, value_enum, default_value_t = Mode::Raster)]
    mode: Mode,

    /// White threshold in [0, 1]; pixels at or above it are skipped.
    #[arg(long, default_value_t = 0.6)]
    threshold: f32,

    /// Physical size of one pixel in millimetres.
    #[arg(long, default_value_t = 0.1)]
    pixel_size: f64,

    /// Machine X coordinate (mm) of the image's left edge.
    #[arg(long, default_value_t = 0.0)]
    origin_x: f64,

    /// Machine Y coordinate (mm) of the image's top edge.
    #[arg(long, default_value_t = 200.0)]
    origin_y: f64,

    /// Focus height in millimetres; omitted, no Z move is emitted.
    #[arg(long)]
    z_height: Option<f64>,

    /// Laser-off repositioning speed in mm/min.
    #[arg(long, default_value_t = 3000.0)]
    travel_speed: f64,

    /// Laser-on etching speed in mm/min.
    #[arg(long, default_value_t = 600.0)]
    etch_speed: f64,

    /// Number of etch passes.
    #[arg(long, default_value_t = 1)]
    passes: u32,

    /// Firmware command that turns the laser off.
    #[arg(long, default_value = "M5")]
    laser_off: String,

    /// Firmware command for the low-power preview beam.
    #[arg(long, default_value = "M3 S20")]
    laser_low: String,

    /// Firmware command for the full-power etching beam.
    #[arg(long, default_value = "M3 S255")]
    laser_high: String,

    /// Motion command prefix (G0 or G1).
    #[arg(long, default_value = "G1")]
    move_command: String,

    /// Comment syntax for the emitted program.
    #[arg(long, value_enum, default_value_t = Comments::Semicolon)]
    comments: Comments,

    /// Home X/Y before etching.
    #[arg(long)]
    home: bool,

    /// Skip the low-power boundary preview.
    #[arg(long)]
    no_preview: bool,

    /// Alignment pause before and after the preview, in milliseconds.
    #[arg(long, default_value_t = 3000)]
    trace_delay: u64,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Etch every black run, row by row.
    Raster,
    /// Etch each body's traced outline only.
    Stencil,
}

impl From<Mode> for EtchMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Raster => Self::Raster,
            Mode::Stencil => Self::Stencil,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Comments {
    /// `; comment`
    Semicolon,
    /// `(comment)`
    Parentheses,
}

impl From<Comments> for CommentStyle {
    fn from(style: Comments) -> Self {
        match style {
            Comments::Semicolon => Self::Semicolon,
            Comments::Parentheses => Self::Parentheses,
        }
    }
}

impl Args {
    fn config(&self) -> EtchConfig {
        EtchConfig {
            mode: self.mode.into(),
            white_threshold: self.threshold,
            pixel_size: self.pixel_size,
            origin_x: self.origin_x,
            origin_y: self.origin_y,
            z_height: self.z_height,
            travel_speed: self.travel_speed,
            etch_speed: self.etch_speed,
            passes: self.passes,
            laser_off: self.laser_off.clone(),
            laser_low: self.laser_low.clone(),
            laser_high: self.laser_high.clone(),
            move_command: self.move_command.clone(),
            comment_style: self.comments.into(),
            home_before_etch: self.home,
            preview_trace: !self.no_preview,
            trace_delay_ms: self.trace_delay,
        }
    }
}

/// Render a duration as `1h 02m 03s` / `2m 03s` / `3.1s`.
fn human_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs_f64();
    let hours = (total_secs / 3600.0).floor();
    let minutes = ((total_secs % 3600.0) / 60.0).floor();
    let seconds = total_secs % 60.0;
    if hours >= 1.0 {
        format!("{hours:.0}h {minutes:02.0}m {seconds:02.0}s")
    } else if minutes >= 1.0 {
        format!("{minutes:.0}m {seconds:02.0}s")
    } else {
        format!("{seconds:.1}s")
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = args.config();

    eprintln!("Reading image from {}", args.input.display());
    let image_bytes = std::fs::read(&args.input)?;

    let route = kokuin_pipeline::process(&image_bytes, &config)?;
    eprintln!(
        "Routed {}x{} image",
        route.dimensions.width, route.dimensions.height,
    );
    if route.sequence.is_empty() {
        eprintln!("Warning: nothing to etch at threshold {}", config.white_threshold);
    }

    let estimate = kokuin_gcode::estimate(&route, &config);
    eprintln!(
        "Estimated: {} over {:.1} mm of head travel",
        human_duration(estimate.duration),
        estimate.distance_mm,
    );

    let source = args
        .input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned());
    let metadata = ProgramMetadata {
        source: source.as_deref(),
        timestamp: None,
    };

    let file = File::create(&args.output)?;
    let mut sink = BufWriter::new(file);
    kokuin_gcode::write_program(&mut sink, &route, &config, &metadata)?;
    std::io::Write::flush(&mut sink)?;

    eprintln!("Program written to {}", args.output.display());
    Ok(())
}
