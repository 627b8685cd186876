// Public observation surface for embedding UIs
//
// The coach is driven through `CoachHandle`; everything a UI observes is
// either returned from those calls (`FrameOutcome`) or streamed from the
// broadcast channels exposed here.

mod streams;
mod types;

pub use streams::{coaching_stream, live_stream, rep_stream, telemetry_stream};
pub use types::{CoachSnapshot, FrameOutcome, LiveUpdate, RepCompletedEvent};
