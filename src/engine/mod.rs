//! Engine module housing the coaching core.
//!
//! This module exposes the time abstraction (`clock`) and the `CoachHandle`
//! orchestration layer (`core`) shared by the CLI, the debug HTTP server,
//! and embedding applications.

pub mod clock;
pub mod core;

pub use clock::{Clock, ManualClock, SystemClock};
pub use core::{CoachHandle, CoachObserver};
