//! Feedback module - the path from usable frames to the analysis service
//!
//! Frames that pass the torso gate are rate limited by the [`Throttler`],
//! packed into [`TelemetryPacket`]s, and handed to the [`FeedbackChannel`],
//! which resolves every request into a session-tagged result.

pub mod channel;
pub mod protocol;
pub mod throttle;
pub mod transport;

pub use channel::FeedbackChannel;
pub use protocol::{
    AiCoaching, Biometrics, CoachingReport, FeedbackResult, ReportSummary, TaggedFeedback,
    TelemetryPacket,
};
pub use throttle::{CueDebouncer, Throttler};
pub use transport::{FeedbackTransport, HttpTransport, OfflineTransport};
