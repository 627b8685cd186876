//! Transmission Throttler - bounds the outbound packet rate
//!
//! The pose engine may deliver 30-60 frames per second; the analysis service
//! only needs a handful. The throttler is consulted after the torso gate, so
//! a rejected frame never consumes a send slot.

/// Rate limiter owning the last successful send time
#[derive(Debug, Clone)]
pub struct Throttler {
    interval_ms: u64,
    last_sent_ms: Option<u64>,
}

impl Throttler {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_sent_ms: None,
        }
    }

    /// Decide whether a packet may be sent at `now_ms`
    ///
    /// The first call always passes. Afterwards a send is allowed once more
    /// than `interval_ms` has passed since the last allowed send. Records
    /// `now_ms` as the last send time when returning true.
    pub fn should_send(&mut self, now_ms: u64) -> bool {
        let allowed = match self.last_sent_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) > self.interval_ms,
        };

        if allowed {
            self.last_sent_ms = Some(now_ms);
        }
        allowed
    }

    pub fn last_sent_ms(&self) -> Option<u64> {
        self.last_sent_ms
    }

    /// Forget the last send so the next usable frame goes out immediately
    pub fn reset(&mut self) {
        self.last_sent_ms = None;
    }
}

/// Debouncer for spoken/announced cues
///
/// A cue is announced when its text differs from the last announced one and
/// the throttle interval has passed.
#[derive(Debug, Clone)]
pub struct CueDebouncer {
    throttle: Throttler,
    last_cue: Option<String>,
}

impl CueDebouncer {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            throttle: Throttler::new(interval_ms),
            last_cue: None,
        }
    }

    pub fn should_announce(&mut self, cue: &str, now_ms: u64) -> bool {
        if self.last_cue.as_deref() == Some(cue) {
            return false;
        }
        if !self.throttle.should_send(now_ms) {
            return false;
        }
        self.last_cue = Some(cue.to_string());
        true
    }

    pub fn reset(&mut self) {
        self.throttle.reset();
        self.last_cue = None;
    }
}
