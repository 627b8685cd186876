//! Angle Engine - joint angles from ordered candidate triples
//!
//! Each exercise lists (proximal, vertex, distal) triples in priority order.
//! The engine returns the first triple whose three joints individually pass
//! the limb gate, so adding an exercise means adding data, not branches.

use serde::{Deserialize, Serialize};

use crate::config::GateThresholds;
use crate::pose::gate::passes;
use crate::pose::landmark::{Frame, LandmarkIndex};

/// A (proximal, vertex, distal) joint triple; the angle is measured at the vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointTriple {
    LeftHipKneeAnkle,
    RightHipKneeAnkle,
    LeftShoulderHipKnee,
    RightShoulderHipKnee,
    LeftShoulderElbowWrist,
    RightShoulderElbowWrist,
    LeftShoulderHipAnkle,
    RightShoulderHipAnkle,
}

impl JointTriple {
    /// Landmark indices as (proximal, vertex, distal)
    pub fn indices(self) -> [usize; 3] {
        use LandmarkIndex::*;
        let [a, b, c] = match self {
            JointTriple::LeftHipKneeAnkle => [LeftHip, LeftKnee, LeftAnkle],
            JointTriple::RightHipKneeAnkle => [RightHip, RightKnee, RightAnkle],
            JointTriple::LeftShoulderHipKnee => [LeftShoulder, LeftHip, LeftKnee],
            JointTriple::RightShoulderHipKnee => [RightShoulder, RightHip, RightKnee],
            JointTriple::LeftShoulderElbowWrist => [LeftShoulder, LeftElbow, LeftWrist],
            JointTriple::RightShoulderElbowWrist => [RightShoulder, RightElbow, RightWrist],
            JointTriple::LeftShoulderHipAnkle => [LeftShoulder, LeftHip, LeftAnkle],
            JointTriple::RightShoulderHipAnkle => [RightShoulder, RightHip, RightAnkle],
        };
        [a.idx(), b.idx(), c.idx()]
    }
}

/// Red/green styling decision for the displayed angle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleZone {
    Target,
    OutOfRange,
    Unknown,
}

/// Angle derived from one frame
///
/// `degrees` is absent only when no candidate triple had trustworthy joints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AngleSample {
    pub degrees: Option<u16>,
    pub triple: Option<JointTriple>,
    pub zone: AngleZone,
}

impl AngleSample {
    pub fn absent() -> Self {
        Self {
            degrees: None,
            triple: None,
            zone: AngleZone::Unknown,
        }
    }

    pub fn is_absent(&self) -> bool {
        self.degrees.is_none()
    }
}

/// Angle at `b` between rays b→a and b→c, in whole degrees within [0, 180]
///
/// Uses the two-argument arctangent difference, reflects values above 180 as
/// `360 - angle`, and rounds to the nearest degree. Returns `None` only for
/// non-finite input.
pub fn angle_between(a: (f32, f32), b: (f32, f32), c: (f32, f32)) -> Option<u16> {
    let (ax, ay) = (a.0 as f64, a.1 as f64);
    let (bx, by) = (b.0 as f64, b.1 as f64);
    let (cx, cy) = (c.0 as f64, c.1 as f64);

    let radians = (cy - by).atan2(cx - bx) - (ay - by).atan2(ax - bx);
    let mut degrees = radians.to_degrees().abs();
    if degrees > 180.0 {
        degrees = 360.0 - degrees;
    }

    if !degrees.is_finite() {
        return None;
    }

    Some(degrees.round().clamp(0.0, 180.0) as u16)
}

/// Evaluate candidate triples in order and return the first computable angle
pub fn compute_angle(
    frame: &Frame,
    candidates: &[JointTriple],
    limb: &GateThresholds,
) -> AngleSample {
    for &triple in candidates {
        let indices = triple.indices();
        if !passes(frame, &indices, limb) {
            continue;
        }

        let points = indices.map(|index| frame.get(index).map(|lm| lm.xy()));
        if let [Some(a), Some(b), Some(c)] = points {
            if let Some(degrees) = angle_between(a, b, c) {
                return AngleSample {
                    degrees: Some(degrees),
                    triple: Some(triple),
                    zone: AngleZone::Unknown,
                };
            }
        }
    }

    AngleSample::absent()
}
