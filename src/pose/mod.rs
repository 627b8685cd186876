//! Pose module - per-frame landmark validation and angle derivation
//!
//! Everything here is a pure function of the current frame:
//! - `landmark`: the fixed 33-point landmark schema
//! - `gate`: visibility gating (none / partial / full)
//! - `angle`: joint angles from ordered candidate triples
//! - `exercise`: per-exercise gate sets, triples, and target zones

pub mod angle;
pub mod exercise;
pub mod gate;
pub mod landmark;

pub use angle::{angle_between, compute_angle, AngleSample, AngleZone, JointTriple};
pub use exercise::{catalog, find_exercise, ExerciseSpec};
pub use gate::{classify, is_usable, GateStatus};
pub use landmark::{Frame, Landmark, LandmarkIndex};
