//! Machine-control program serialization.
//!
//! Emits a line-oriented UTF-8 G-code program for a routed toolpath:
//! header comments, machine initialization, an optional low-power
//! boundary preview, one block per etch pass with `M73` progress
//! markers, and a fixed cleanup block. Coordinates convert from pixel
//! space to machine millimetres (`x_mm = x_px * pixel_size + origin_x`,
//! `y_mm = origin_y - y_px * pixel_size`; Y inverts because the image
//! origin is top-left and the machine origin bottom-left) and are
//! formatted to 3 decimal places.
//!
//! Writes go straight to the sink; on failure the partially written
//! output is not valid and callers should discard it.

use std::io::Write;

use kokuin_pipeline::{EtchConfig, EtchPath, Move, MoveKind, Point, Route, Sequence};

use crate::estimate::{mm_per_ms, pass_cost, speed_for, trace_cost};

/// Dwell after `M400` in the cleanup block, milliseconds.
const POST_ETCH_PAUSE_MS: u64 = 500;

/// Header strings for the emitted program.
///
/// The core never reads the clock or the filesystem; callers supply
/// the timestamp and source filename as plain strings.
#[derive(Debug, Clone, Default)]
pub struct ProgramMetadata<'a> {
    /// Source image filename, emitted in the header when present.
    pub source: Option<&'a str>,

    /// Generation timestamp, emitted in the header when present.
    pub timestamp: Option<&'a str>,
}

/// Errors that can occur while writing a program.
#[derive(Debug, thiserror::Error)]
pub enum ProgramError {
    /// The output sink failed mid-write. The partial program is not
    /// valid machine input.
    #[error("failed to write program: {0}")]
    Io(#[from] std::io::Error),
}

/// Serialize the control program for `route` into `sink`.
///
/// # Errors
///
/// Returns [`ProgramError::Io`] when the sink fails; the partially
/// written output should be treated as corrupt.
pub fn write_program<W: Write>(
    sink: &mut W,
    route: &Route,
    config: &EtchConfig,
    metadata: &ProgramMetadata<'_>,
) -> Result<(), ProgramError> {
    let mut emitter = Emitter::new(sink, route, config);

    emitter.header(metadata)?;
    emitter.blank()?;
    emitter.init_block()?;
    emitter.blank()?;

    if config.preview_trace && !route.trace.is_empty() {
        emitter.preview_block()?;
        emitter.blank()?;
    }

    for pass in 1..=config.passes {
        emitter.pass_block(pass)?;
        emitter.blank()?;
    }

    emitter.cleanup_block()?;
    Ok(())
}

/// Stateful line emitter: owns coordinate conversion, comment
/// formatting, and progress accounting for one program.
struct Emitter<'a, W: Write> {
    sink: &'a mut W,
    route: &'a Route,
    config: &'a EtchConfig,
    /// Milliseconds written so far, on the estimator's clock.
    elapsed_ms: f64,
    /// Whole-program duration in ms (trace + all passes).
    total_ms: f64,
    /// Last emitted (percent, minutes-remaining) pair.
    last_marker: (u32, u32),
}

impl<'a, W: Write> Emitter<'a, W> {
    fn new(sink: &'a mut W, route: &'a Route, config: &'a EtchConfig) -> Self {
        let (trace_ms, _) = trace_cost(route, config);
        let (pass_ms, _) = pass_cost(route, config);
        let total_ms = trace_ms + pass_ms * f64::from(config.passes);
        let last_marker = progress(0.0, total_ms);
        Self {
            sink,
            route,
            config,
            elapsed_ms: 0.0,
            total_ms,
            last_marker,
        }
    }

    /// Write one line: a command, a comment, or both.
    fn line(&mut self, command: &str, comment: Option<&str>) -> Result<(), ProgramError> {
        match (command.is_empty(), comment) {
            (false, Some(text)) => writeln!(
                self.sink,
                "{command} {}",
                self.config.comment_style.format(text),
            )?,
            (false, None) => writeln!(self.sink, "{command}")?,
            (true, Some(text)) => writeln!(self.sink, "{}", self.config.comment_style.format(text))?,
            (true, None) => writeln!(self.sink)?,
        }
        Ok(())
    }

    fn blank(&mut self) -> Result<(), ProgramError> {
        self.line("", None)
    }

    fn comment(&mut self, text: &str) -> Result<(), ProgramError> {
        self.line("", Some(text))
    }

    /// Format a motion command targeting a pixel-space point.
    fn motion(&self, to: Point, speed_mm_min: f64) -> String {
        let x = f64::from(to.x) * self.config.pixel_size + self.config.origin_x;
        let y = self.config.origin_y - f64::from(to.y) * self.config.pixel_size;
        format!("{} X{x:.3} Y{y:.3} F{speed_mm_min}", self.config.move_command)
    }

    // --- Blocks ---

    fn header(&mut self, metadata: &ProgramMetadata<'_>) -> Result<(), ProgramError> {
        self.comment(concat!("kokuin v", env!("CARGO_PKG_VERSION")))?;
        if let Some(timestamp) = metadata.timestamp {
            self.comment(&format!("generated: {timestamp}"))?;
        }
        if let Some(source) = metadata.source {
            self.comment(&format!("source: {source}"))?;
        }
        Ok(())
    }

    fn init_block(&mut self) -> Result<(), ProgramError> {
        // Field accesses through the copied reference keep the config
        // borrow independent of `&mut self`.
        let config = self.config;
        self.line(&config.laser_off, Some("laser off"))?;
        self.line("G90", Some("absolute positioning"))?;
        self.line("G21", Some("millimeter units"))?;
        if let Some(z) = config.z_height {
            let command = format!("{} Z{z:.3} F{}", config.move_command, config.travel_speed);
            self.line(&command, Some("focus height"))?;
        }
        if config.home_before_etch {
            self.line("G28 X Y", Some("home"))?;
        }
        Ok(())
    }

    /// Low-power boundary preview: dwell, trace the bounding
    /// rectangle, dwell again, laser off.
    fn preview_block(&mut self) -> Result<(), ProgramError> {
        let config = self.config;
        let route = self.route;
        let dwell = format!("G4 P{}", config.trace_delay_ms);

        self.line(&config.laser_low, Some("preview beam"))?;
        self.line(&dwell, Some("alignment pause"))?;

        if let Some(first) = route.trace.first() {
            let command = self.motion(first.from, config.travel_speed);
            self.line(&command, None)?;
        }
        for m in &route.trace {
            let command = self.motion(m.to, config.travel_speed);
            self.line(&command, None)?;
        }

        self.line(&dwell, None)?;
        self.line(&config.laser_off, None)?;

        let (trace_ms, _) = trace_cost(route, config);
        self.elapsed_ms += trace_ms;
        Ok(())
    }

    fn pass_block(&mut self, pass: u32) -> Result<(), ProgramError> {
        self.comment(&format!("pass {pass} of {}", self.config.passes))?;

        let route = self.route;
        match &route.sequence {
            Sequence::Raster(moves) => {
                for &m in moves {
                    self.raster_move(m)?;
                }
            }
            Sequence::Stencil(paths) => {
                let mut previous_end: Option<Point> = None;
                for path in paths {
                    self.stencil_path(path, previous_end)?;
                    previous_end = path.last().or(previous_end);
                }
            }
        }
        Ok(())
    }

    fn raster_move(&mut self, m: Move) -> Result<(), ProgramError> {
        let config = self.config;
        let speed = speed_for(m.kind, config);
        let laser = match m.kind {
            MoveKind::Etch => &config.laser_high,
            MoveKind::Trace | MoveKind::Travel => &config.laser_off,
        };
        let command = self.motion(m.to, speed);
        self.line(laser, None)?;
        self.line(&command, None)?;

        self.elapsed_ms += m.length() * self.config.pixel_size / mm_per_ms(speed);
        self.progress_marker()
    }

    fn stencil_path(
        &mut self,
        path: &EtchPath,
        previous_end: Option<Point>,
    ) -> Result<(), ProgramError> {
        let Some(start) = path.first() else {
            return Ok(());
        };
        let config = self.config;
        self.line(&config.laser_off, None)?;
        let travel = self.motion(start, config.travel_speed);
        self.line(&travel, None)?;
        self.line(&config.laser_high, None)?;
        for &to in &path.points()[1..] {
            let command = self.motion(to, config.etch_speed);
            self.line(&command, None)?;
        }

        // Inter-path travel matches the estimator: the positioning
        // move to the very first path is not counted.
        if let Some(prev) = previous_end {
            let gap_mm = prev.distance(start) * config.pixel_size;
            self.elapsed_ms += gap_mm / mm_per_ms(config.travel_speed);
        }
        self.elapsed_ms += path.length() * config.pixel_size / mm_per_ms(config.etch_speed);
        self.progress_marker()
    }

    /// Emit `M73 P<pct> R<min>` when either rounded value moved since
    /// the last marker. The hysteresis keeps long runs of short moves
    /// from flooding the program with redundant markers.
    fn progress_marker(&mut self) -> Result<(), ProgramError> {
        let marker = progress(self.elapsed_ms, self.total_ms);
        if marker == self.last_marker {
            return Ok(());
        }
        self.last_marker = marker;
        let (percent, minutes) = marker;
        self.line(&format!("M73 P{percent} R{minutes}"), None)
    }

    fn cleanup_block(&mut self) -> Result<(), ProgramError> {
        let config = self.config;
        let park = self.motion(Point::new(0, 0), config.travel_speed);

        self.line(&config.laser_off, Some("laser off"))?;
        self.line("M400", Some("wait for moves to finish"))?;
        self.line(&format!("G4 P{POST_ETCH_PAUSE_MS}"), None)?;
        self.line(&park, Some("park"))?;
        self.line("M84", Some("disable steppers"))?;
        Ok(())
    }
}

/// Rounded (percent-complete, minutes-remaining) at `elapsed_ms`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn progress(elapsed_ms: f64, total_ms: f64) -> (u32, u32) {
    if total_ms <= 0.0 {
        return (100, 0);
    }
    let percent = (elapsed_ms / total_ms * 100.0).round().clamp(0.0, 100.0) as u32;
    let minutes = ((total_ms - elapsed_ms).max(0.0) / 60_000.0).round() as u32;
    (percent, minutes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use kokuin_pipeline::{CommentStyle, Dimensions, EtchMode, Sequence};

    fn render(route: &Route, config: &EtchConfig, metadata: &ProgramMetadata<'_>) -> String {
        let mut buf = Vec::new();
        write_program(&mut buf, route, config, metadata).unwrap();
        String::from_utf8(buf).unwrap()
    }

    /// A 2x2 all-black image routed in raster mode.
    fn two_by_two_route() -> Route {
        let image = kokuin_pipeline::types::RgbaImage::from_pixel(
            2,
            2,
            image::Rgba([0, 0, 0, 255]),
        );
        kokuin_pipeline::route_image(&image, &two_by_two_config()).unwrap()
    }

    fn two_by_two_config() -> EtchConfig {
        EtchConfig {
            mode: EtchMode::Raster,
            pixel_size: 1.0,
            origin_x: 0.0,
            origin_y: 0.0,
            passes: 1,
            preview_trace: false,
            ..EtchConfig::default()
        }
    }

    #[test]
    fn single_pass_program_structure() {
        let config = two_by_two_config();
        let program = render(&two_by_two_route(), &config, &ProgramMetadata::default());

        // Exactly one pass block.
        assert_eq!(program.matches("; pass").count(), 1);
        assert!(program.contains("; pass 1 of 1"));
        // No preview block.
        assert!(!program.contains(&config.laser_low));

        // Cleanup is the literal final sequence.
        let lines: Vec<&str> = program.lines().filter(|l| !l.is_empty()).collect();
        let tail = &lines[lines.len() - 5..];
        assert!(tail[0].starts_with("M5"));
        assert!(tail[1].starts_with("M400"));
        assert!(tail[2].starts_with("G4 P500"));
        assert!(tail[3].starts_with("G1 X0.000 Y0.000"));
        assert!(tail[4].starts_with("M84"));
    }

    #[test]
    fn init_block_has_fixed_structural_commands() {
        let program = render(
            &two_by_two_route(),
            &two_by_two_config(),
            &ProgramMetadata::default(),
        );
        assert!(program.contains("G90 ; absolute positioning"));
        assert!(program.contains("G21 ; millimeter units"));
        // Homing disabled by default.
        assert!(!program.contains("G28 X Y"));
    }

    #[test]
    fn homing_and_z_height_are_configurable() {
        let config = EtchConfig {
            home_before_etch: true,
            z_height: Some(12.5),
            ..two_by_two_config()
        };
        let program = render(&two_by_two_route(), &config, &ProgramMetadata::default());
        assert!(program.contains("G28 X Y ; home"));
        assert!(program.contains("G1 Z12.500 F3000 ; focus height"));
    }

    #[test]
    fn header_carries_metadata() {
        let metadata = ProgramMetadata {
            source: Some("logo.png"),
            timestamp: Some("2026-08-30 12:00:00"),
        };
        let program = render(&two_by_two_route(), &two_by_two_config(), &metadata);
        let mut lines = program.lines();
        assert!(lines.next().unwrap().starts_with("; kokuin v"));
        assert_eq!(lines.next(), Some("; generated: 2026-08-30 12:00:00"));
        assert_eq!(lines.next(), Some("; source: logo.png"));
    }

    #[test]
    fn parenthetical_comment_style() {
        let config = EtchConfig {
            comment_style: CommentStyle::Parentheses,
            ..two_by_two_config()
        };
        let program = render(&two_by_two_route(), &config, &ProgramMetadata::default());
        assert!(program.contains("G90 (absolute positioning)"));
        assert!(!program.contains("; absolute"));
    }

    #[test]
    fn coordinates_convert_to_machine_space() {
        // Pixel (1, 1) with pixel_size 2 and origin (10, 50):
        // X = 1*2 + 10 = 12, Y = 50 - 1*2 = 48.
        let config = EtchConfig {
            pixel_size: 2.0,
            origin_x: 10.0,
            origin_y: 50.0,
            ..two_by_two_config()
        };
        let program = render(&two_by_two_route(), &config, &ProgramMetadata::default());
        assert!(
            program.contains("X12.000 Y48.000"),
            "expected converted coordinates in:\n{program}",
        );
    }

    #[test]
    fn preview_block_traces_the_bounding_rectangle() {
        let config = EtchConfig {
            preview_trace: true,
            trace_delay_ms: 2000,
            ..two_by_two_config()
        };
        let program = render(&two_by_two_route(), &config, &ProgramMetadata::default());
        assert!(program.contains("M3 S20 ; preview beam"));
        assert_eq!(program.matches("G4 P2000").count(), 2);
        // 5 preview moves: position at (0,0) plus 4 corners.
        let preview_moves = program
            .lines()
            .skip_while(|l| !l.contains("preview beam"))
            .take_while(|l| !l.is_empty())
            .filter(|l| l.starts_with("G1 X"))
            .count();
        assert_eq!(preview_moves, 5);
    }

    #[test]
    fn each_pass_repeats_the_sequence() {
        let config = EtchConfig {
            passes: 3,
            ..two_by_two_config()
        };
        let program = render(&two_by_two_route(), &config, &ProgramMetadata::default());
        assert_eq!(program.matches("; pass").count(), 3);
        assert!(program.contains("; pass 3 of 3"));
        // Laser fires the same number of times in every pass.
        let per_pass = program.matches("M3 S255").count();
        assert_eq!(per_pass % 3, 0);
    }

    #[test]
    fn etch_moves_get_the_high_laser_command() {
        let program = render(
            &two_by_two_route(),
            &two_by_two_config(),
            &ProgramMetadata::default(),
        );
        // 2x2 all black: per row one travel (M5) + one etch (M3 S255).
        let pass: String = program
            .lines()
            .skip_while(|l| !l.contains("; pass"))
            .take_while(|l| !l.starts_with("M400"))
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(pass.matches("M3 S255").count(), 2);
    }

    #[test]
    fn progress_markers_appear_once_per_percent_step() {
        // A long run of equal-length etch moves: the rounded percent
        // changes between moves, so markers appear, but never twice
        // with the same values.
        let moves: Vec<Move> = (0..50)
            .map(|i| {
                Move::new(
                    MoveKind::Etch,
                    Point::new(0, i),
                    Point::new(100, i),
                )
            })
            .collect();
        let route = Route {
            dimensions: Dimensions {
                width: 101,
                height: 50,
            },
            trace: Vec::new(),
            sequence: Sequence::Raster(moves),
        };
        let program = render(&route, &two_by_two_config(), &ProgramMetadata::default());

        let markers: Vec<&str> = program
            .lines()
            .filter(|l| l.starts_with("M73"))
            .collect();
        assert!(!markers.is_empty(), "expected progress markers");
        for pair in markers.windows(2) {
            assert_ne!(pair[0], pair[1], "redundant progress marker emitted");
        }
        assert!(program.contains("M73 P100 R0"));
    }

    #[test]
    fn stencil_paths_are_serialized_with_travel_then_etch() {
        let image = kokuin_pipeline::types::RgbaImage::from_fn(6, 3, |x, _| {
            if (1..=3).contains(&x) {
                image::Rgba([0, 0, 0, 255])
            } else {
                image::Rgba([255, 255, 255, 255])
            }
        });
        let config = EtchConfig {
            mode: EtchMode::Stencil,
            ..two_by_two_config()
        };
        let route = kokuin_pipeline::route_image(&image, &config).unwrap();
        let program = render(&route, &config, &ProgramMetadata::default());

        // Laser off, travel to the outline start, then fire.
        let pass: Vec<&str> = program
            .lines()
            .skip_while(|l| !l.contains("; pass"))
            .skip(1)
            .take_while(|l| !l.is_empty())
            .collect();
        assert_eq!(pass[0], "M5");
        assert!(pass[1].starts_with("G1 X"));
        assert_eq!(pass[2], "M3 S255");
        assert!(pass[3].starts_with("G1 X"));
    }

    #[test]
    fn io_failure_surfaces_as_program_error() {
        struct FailingSink;
        impl Write for FailingSink {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("disk full"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let result = write_program(
            &mut FailingSink,
            &two_by_two_route(),
            &two_by_two_config(),
            &ProgramMetadata::default(),
        );
        assert!(matches!(result, Err(ProgramError::Io(_))));
    }
}
