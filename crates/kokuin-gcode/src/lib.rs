//! kokuin-gcode: estimation and program serialization (sans-IO).
//!
//! Consumes a [`kokuin_pipeline::Route`] and produces the two machine-
//! facing outputs: a wall-clock/distance [`Estimate`] and the textual
//! control program. Both are pure computations over the route and the
//! etch configuration; the program serializer writes to any
//! `std::io::Write` sink supplied by the caller.

pub mod estimate;
pub mod program;

pub use estimate::{Estimate, estimate};
pub use program::{ProgramError, ProgramMetadata, write_program};
