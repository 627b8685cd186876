//! Frame recordings for offline replay.
//!
//! A recording is JSON lines, one frame per line:
//! `{"timestamp_ms": 33, "landmarks": [{"id": 0, "x": .., "y": .., "z": .., "visibility": ..}, ..]}`.
//! Blank lines and lines starting with `#` are skipped.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::FrameOutcome;
use crate::engine::{CoachHandle, ManualClock};
use crate::pose::Frame;

/// One captured frame with the pose engine's timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    pub timestamp_ms: u64,
    pub landmarks: Frame,
}

/// Ordered frames read from a recording
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameRecording {
    frames: Vec<RecordedFrame>,
}

impl FrameRecording {
    pub fn new(frames: Vec<RecordedFrame>) -> Self {
        Self { frames }
    }

    /// Load a recording from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("opening recording {:?}", path))?;
        Self::from_reader(BufReader::new(file))
            .with_context(|| format!("reading recording {:?}", path))
    }

    /// Parse JSON lines; timestamps must not go backwards
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut frames: Vec<RecordedFrame> = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("line {}", index + 1))?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let frame: RecordedFrame = serde_json::from_str(trimmed)
                .with_context(|| format!("invalid frame on line {}", index + 1))?;

            if let Some(previous) = frames.last() {
                if frame.timestamp_ms < previous.timestamp_ms {
                    bail!(
                        "timestamp goes backwards on line {} ({} < {})",
                        index + 1,
                        frame.timestamp_ms,
                        previous.timestamp_ms
                    );
                }
            }
            frames.push(frame);
        }

        log::debug!("[Replay] Parsed {} frames", frames.len());
        Ok(Self { frames })
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        for frame in &self.frames {
            serde_json::to_writer(&mut writer, frame)?;
            writer.write_all(b"\n")?;
        }
        Ok(())
    }

    pub fn frames(&self) -> &[RecordedFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Feed every frame to `coach`, moving `clock` to each frame's timestamp
    ///
    /// Does not await feedback; callers settle the coach afterwards.
    pub fn play(&self, coach: &mut CoachHandle, clock: &ManualClock) -> Vec<FrameOutcome> {
        let outcomes: Vec<FrameOutcome> = self
            .frames
            .iter()
            .map(|recorded| {
                clock.set(recorded.timestamp_ms);
                coach.process_frame(&recorded.landmarks)
            })
            .collect();

        tracing::info!(
            "[Replay] Played {} frames, {} sent",
            outcomes.len(),
            outcomes.iter().filter(|outcome| outcome.sent).count()
        );
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::landmark::test_frames::visible_frame;

    fn recording_text(stamps: &[u64]) -> String {
        let mut out = Vec::new();
        FrameRecording::new(
            stamps
                .iter()
                .map(|&timestamp_ms| RecordedFrame {
                    timestamp_ms,
                    landmarks: visible_frame(),
                })
                .collect(),
        )
        .write_to(&mut out)
        .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_reads_written_recording() {
        let text = recording_text(&[0, 33, 66]);
        let recording = FrameRecording::from_reader(text.as_bytes()).unwrap();
        assert_eq!(recording.len(), 3);
        assert_eq!(recording.frames()[2].timestamp_ms, 66);
        assert!(recording.frames()[0].landmarks.is_complete());
    }

    #[test]
    fn test_skips_comments_and_blank_lines() {
        let text = format!("# squat take 1\n\n{}", recording_text(&[5]));
        let recording = FrameRecording::from_reader(text.as_bytes()).unwrap();
        assert_eq!(recording.len(), 1);
    }

    #[test]
    fn test_rejects_backwards_timestamps() {
        let text = recording_text(&[100, 50]);
        let err = FrameRecording::from_reader(text.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("backwards"));
    }

    #[test]
    fn test_reports_bad_line_number() {
        let text = format!("{}not json\n", recording_text(&[0]));
        let err = FrameRecording::from_reader(text.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
