//! Exercise catalog - per-exercise gate sets, angle triples, and target zones
//!
//! Each exercise picks one consistent limb gate and one ordered list of
//! candidate triples. The display name and the key sent to the analysis
//! service are kept separate because the service uses lowercase keys.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::config::GateConfig;
use crate::pose::angle::{compute_angle, AngleSample, AngleZone, JointTriple};
use crate::pose::landmark::{Frame, LandmarkIndex::*};

const LEFT_LEG: &[usize] = &[LeftKnee.idx(), LeftAnkle.idx()];
const RIGHT_LEG: &[usize] = &[RightKnee.idx(), RightAnkle.idx()];
const LEFT_ARM: &[usize] = &[LeftElbow.idx(), LeftWrist.idx()];
const RIGHT_ARM: &[usize] = &[RightElbow.idx(), RightWrist.idx()];

/// Static description of one supported exercise
#[derive(Debug, Clone, Serialize)]
pub struct ExerciseSpec {
    /// Identifier used by the UI and in session summaries
    pub id: &'static str,
    pub name: &'static str,
    /// Exercise key understood by the realtime analysis endpoint
    pub wire_key: &'static str,
    /// Any one of these joint sets passing the limb gate means a full view
    pub limb_sets: &'static [&'static [usize]],
    /// Candidate triples in priority order
    pub triples: &'static [JointTriple],
    /// Inclusive degree range drawn as "on target"
    pub target_degrees: (u16, u16),
}

impl ExerciseSpec {
    /// Angle for display, with the same-frame styling decision applied
    pub fn sample_angle(&self, frame: &Frame, gate: &GateConfig) -> AngleSample {
        let mut sample = compute_angle(frame, self.triples, &gate.limb);
        sample.zone = match sample.degrees {
            Some(degrees) if self.in_target(degrees) => AngleZone::Target,
            Some(_) => AngleZone::OutOfRange,
            None => AngleZone::Unknown,
        };
        sample
    }

    pub fn in_target(&self, degrees: u16) -> bool {
        let (low, high) = self.target_degrees;
        (low..=high).contains(&degrees)
    }
}

static CATALOG: [ExerciseSpec; 4] = [
    ExerciseSpec {
        id: "Squat",
        name: "Squat",
        wire_key: "squat",
        limb_sets: &[LEFT_LEG, RIGHT_LEG],
        triples: &[
            JointTriple::LeftHipKneeAnkle,
            JointTriple::RightHipKneeAnkle,
            JointTriple::LeftShoulderHipKnee,
            JointTriple::RightShoulderHipKnee,
        ],
        target_degrees: (70, 100),
    },
    ExerciseSpec {
        id: "Forward Lunge",
        name: "Forward Lunge",
        wire_key: "lunge",
        limb_sets: &[LEFT_LEG, RIGHT_LEG],
        triples: &[
            JointTriple::LeftHipKneeAnkle,
            JointTriple::RightHipKneeAnkle,
            JointTriple::LeftShoulderHipKnee,
            JointTriple::RightShoulderHipKnee,
        ],
        target_degrees: (80, 100),
    },
    ExerciseSpec {
        id: "Push-Up",
        name: "Push-Up",
        wire_key: "pushup",
        limb_sets: &[LEFT_ARM, RIGHT_ARM],
        triples: &[
            JointTriple::LeftShoulderElbowWrist,
            JointTriple::RightShoulderElbowWrist,
            JointTriple::LeftShoulderHipAnkle,
            JointTriple::RightShoulderHipAnkle,
        ],
        target_degrees: (60, 100),
    },
    ExerciseSpec {
        id: "Plank",
        name: "Plank",
        wire_key: "plank",
        limb_sets: &[LEFT_LEG, RIGHT_LEG],
        triples: &[
            JointTriple::LeftShoulderHipAnkle,
            JointTriple::RightShoulderHipAnkle,
            JointTriple::LeftShoulderHipKnee,
            JointTriple::RightShoulderHipKnee,
        ],
        target_degrees: (165, 180),
    },
];

// Lowercased id and wire key both resolve, so "Squat" and "squat" are the same exercise.
static LOOKUP: Lazy<HashMap<String, usize>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for (position, spec) in CATALOG.iter().enumerate() {
        map.insert(spec.id.to_lowercase(), position);
        map.insert(spec.wire_key.to_string(), position);
    }
    map
});

/// All supported exercises in display order
pub fn catalog() -> &'static [ExerciseSpec] {
    &CATALOG
}

/// Look up an exercise by id or wire key, case-insensitively
pub fn find_exercise(id: &str) -> Option<&'static ExerciseSpec> {
    LOOKUP
        .get(&id.trim().to_lowercase())
        .map(|&position| &CATALOG[position])
}
