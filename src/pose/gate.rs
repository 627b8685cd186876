//! Landmark Gate - decides whether a frame's joints are trustworthy
//!
//! Low-confidence or off-frame landmarks produce geometrically meaningless
//! angles, so gating runs before any angle or transmission logic.
//!
//! Two tiers:
//! - torso (both shoulders + both hips) gates transmission eligibility
//! - limb (exercise-specific sets) gates whether an angle can be trusted

use serde::{Deserialize, Serialize};

use crate::config::{GateConfig, GateThresholds};
use crate::pose::exercise::ExerciseSpec;
use crate::pose::landmark::{Frame, LandmarkIndex};

/// Joints that must be visible before a frame is worth sending
pub const TORSO_INDICES: [usize; 4] = [
    LandmarkIndex::LeftShoulder.idx(),
    LandmarkIndex::RightShoulder.idx(),
    LandmarkIndex::LeftHip.idx(),
    LandmarkIndex::RightHip.idx(),
];

/// Usability check for a subset of joints
///
/// Returns true iff the frame is complete and every required index has
/// `visibility > confidence_threshold` and `0 <= y <= y_bound`. An empty
/// `required` set is trivially usable on a complete frame.
pub fn is_usable(
    frame: &Frame,
    required: &[usize],
    confidence_threshold: f32,
    y_bound: f32,
) -> bool {
    if !frame.is_complete() {
        return false;
    }

    required.iter().all(|&index| match frame.get(index) {
        Some(lm) => lm.visibility > confidence_threshold && lm.y >= 0.0 && lm.y <= y_bound,
        None => false,
    })
}

/// [`is_usable`] with thresholds taken from a config tier
pub fn passes(frame: &Frame, required: &[usize], thresholds: &GateThresholds) -> bool {
    is_usable(frame, required, thresholds.confidence, thresholds.y_bound)
}

/// Outcome of gating one frame, surfaced to the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStatus {
    /// Torso not visible; nothing downstream runs
    #[serde(rename = "none")]
    NotDetected,
    /// Torso visible but the exercise's limbs are not; frame may still be sent
    Partial,
    /// Torso and at least one limb set visible
    Full,
}

impl GateStatus {
    /// True when the frame may be forwarded to the analysis service
    pub fn transmittable(self) -> bool {
        !matches!(self, GateStatus::NotDetected)
    }

    /// Advisory text for the user, if any
    pub fn advisory(self) -> Option<&'static str> {
        match self {
            GateStatus::NotDetected => Some("No body detected. Step into the frame."),
            GateStatus::Partial => Some("Partial view. Step back so your full body is visible."),
            GateStatus::Full => None,
        }
    }
}

/// Classify a frame against both gate tiers for the given exercise
pub fn classify(frame: &Frame, exercise: &ExerciseSpec, gate: &GateConfig) -> GateStatus {
    if !passes(frame, &TORSO_INDICES, &gate.torso) {
        return GateStatus::NotDetected;
    }

    let limb_visible = exercise
        .limb_sets
        .iter()
        .any(|set| passes(frame, set, &gate.limb));

    if limb_visible {
        GateStatus::Full
    } else {
        GateStatus::Partial
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::exercise::find_exercise;
    use crate::pose::landmark::test_frames::{visible_frame, with_landmark};
    use crate::pose::landmark::Landmark;

    #[test]
    fn test_visible_frame_is_usable() {
        let frame = visible_frame();
        assert!(is_usable(&frame, &TORSO_INDICES, 0.5, 1.0));
    }

    #[test]
    fn test_visibility_at_threshold_is_rejected() {
        let base = visible_frame();
        for &index in &TORSO_INDICES {
            let mut landmarks = base.landmarks().to_vec();
            landmarks[index].visibility = 0.5;
            let frame = Frame::new(landmarks);
            assert!(
                !is_usable(&frame, &TORSO_INDICES, 0.5, 1.0),
                "index {} at threshold must fail",
                index
            );
        }
    }

    #[test]
    fn test_y_bounds() {
        let base = visible_frame();
        let clipped = with_landmark(&base, LandmarkIndex::LeftHip, 0.5, 1.05, 0.99);
        assert!(!is_usable(&clipped, &TORSO_INDICES, 0.5, 1.0));
        assert!(is_usable(&clipped, &TORSO_INDICES, 0.5, 1.1));

        let above = with_landmark(&base, LandmarkIndex::LeftShoulder, 0.5, -0.01, 0.99);
        assert!(!is_usable(&above, &TORSO_INDICES, 0.5, 1.0));

        let edge = with_landmark(&base, LandmarkIndex::LeftShoulder, 0.5, 1.0, 0.99);
        assert!(is_usable(&edge, &TORSO_INDICES, 0.5, 1.0));
    }

    #[test]
    fn test_nan_is_rejected() {
        let base = visible_frame();
        let frame = with_landmark(&base, LandmarkIndex::RightHip, 0.5, f32::NAN, 0.99);
        assert!(!is_usable(&frame, &TORSO_INDICES, 0.5, 1.0));
    }

    #[test]
    fn test_short_frame_fails_every_gate() {
        let short = Frame::new(vec![Landmark::new(0, 0.5, 0.5, 0.0, 1.0)]);
        assert!(!is_usable(&short, &[0], 0.5, 1.0));
        assert!(!is_usable(&short, &[], 0.5, 1.0));

        let squat = find_exercise("Squat").unwrap();
        assert_eq!(
            classify(&short, squat, &GateConfig::default()),
            GateStatus::NotDetected
        );
    }

    #[test]
    fn test_out_of_range_index_fails() {
        assert!(!is_usable(&visible_frame(), &[40], 0.5, 1.0));
    }

    #[test]
    fn test_classify_partial_when_legs_hidden() {
        let squat = find_exercise("Squat").unwrap();
        let gate = GateConfig::default();
        let mut frame = visible_frame();
        for index in [LandmarkIndex::LeftAnkle, LandmarkIndex::RightAnkle] {
            frame = with_landmark(&frame, index, 0.5, 1.2, 0.2);
        }

        let status = classify(&frame, squat, &gate);
        assert_eq!(status, GateStatus::Partial);
        assert!(status.transmittable());
        assert!(status.advisory().unwrap().contains("Partial"));
    }

    #[test]
    fn test_classify_full_with_one_side_visible() {
        let squat = find_exercise("Squat").unwrap();
        let frame = with_landmark(&visible_frame(), LandmarkIndex::LeftKnee, 0.5, 0.5, 0.1);
        assert_eq!(classify(&frame, squat, &GateConfig::default()), GateStatus::Full);
    }

    #[test]
    fn test_classify_none_without_torso() {
        let squat = find_exercise("Squat").unwrap();
        let frame = with_landmark(&visible_frame(), LandmarkIndex::RightShoulder, 0.5, 0.5, 0.3);
        let status = classify(&frame, squat, &GateConfig::default());
        assert_eq!(status, GateStatus::NotDetected);
        assert!(!status.transmittable());
        assert!(status.advisory().unwrap().contains("No body"));
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&GateStatus::NotDetected).unwrap(),
            "\"none\""
        );
        assert_eq!(serde_json::to_string(&GateStatus::Partial).unwrap(), "\"partial\"");
    }
}
