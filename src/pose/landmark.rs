//! Landmark schema produced by the pose engine.

use serde::{Deserialize, Serialize};

/// Indices into a frame, following the pose engine's 33-point convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum LandmarkIndex {
    Nose = 0,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
}

impl LandmarkIndex {
    /// Number of landmarks in a complete frame
    pub const COUNT: usize = 33;

    pub const fn idx(self) -> usize {
        self as usize
    }
}

/// One estimated joint position with its confidence
///
/// Coordinates are normalized to the image: x and y in [0, 1] when the joint
/// is inside the frame, z a relative depth estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub id: u8,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
    pub visibility: f32,
}

impl Landmark {
    pub fn new(id: u8, x: f32, y: f32, z: f32, visibility: f32) -> Self {
        Self {
            id,
            x,
            y,
            z,
            visibility,
        }
    }

    /// Position projected onto the image plane
    pub fn xy(&self) -> (f32, f32) {
        (self.x, self.y)
    }
}

/// All landmarks for one instant, in pose-engine index order
///
/// A frame is consumed by a single processing pass and never buffered.
/// Frames with fewer than [`LandmarkIndex::COUNT`] entries can still be
/// represented so malformed input reaches the gate instead of panicking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Frame {
    landmarks: Vec<Landmark>,
}

impl Frame {
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        Self { landmarks }
    }

    /// True when the frame carries the full 33-point schema
    pub fn is_complete(&self) -> bool {
        self.landmarks.len() == LandmarkIndex::COUNT
    }

    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.landmarks.get(index)
    }

    pub fn landmarks(&self) -> &[Landmark] {
        &self.landmarks
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    pub fn into_landmarks(self) -> Vec<Landmark> {
        self.landmarks
    }
}

impl From<Vec<Landmark>> for Frame {
    fn from(landmarks: Vec<Landmark>) -> Self {
        Self::new(landmarks)
    }
}
