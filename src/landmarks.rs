//! Landmark oracle boundary.
//!
//! Oracles report landmarks by position in their output tensor. The index is
//! resolved to a [`BodyPart`] here, once, so classification code only ever
//! deals in named parts.

use anyhow::Result;
use image::RgbImage;

use crate::types::{BodyPart, Landmark};

/// Number of landmarks in the body topology.
pub const LANDMARK_COUNT: usize = 33;

impl BodyPart {
    /// All parts in oracle output order.
    pub const ALL: [BodyPart; LANDMARK_COUNT] = [
        BodyPart::Nose,
        BodyPart::LeftEyeInner,
        BodyPart::LeftEye,
        BodyPart::LeftEyeOuter,
        BodyPart::RightEyeInner,
        BodyPart::RightEye,
        BodyPart::RightEyeOuter,
        BodyPart::LeftEar,
        BodyPart::RightEar,
        BodyPart::MouthLeft,
        BodyPart::MouthRight,
        BodyPart::LeftShoulder,
        BodyPart::RightShoulder,
        BodyPart::LeftElbow,
        BodyPart::RightElbow,
        BodyPart::LeftWrist,
        BodyPart::RightWrist,
        BodyPart::LeftPinky,
        BodyPart::RightPinky,
        BodyPart::LeftIndex,
        BodyPart::RightIndex,
        BodyPart::LeftThumb,
        BodyPart::RightThumb,
        BodyPart::LeftHip,
        BodyPart::RightHip,
        BodyPart::LeftKnee,
        BodyPart::RightKnee,
        BodyPart::LeftAnkle,
        BodyPart::RightAnkle,
        BodyPart::LeftHeel,
        BodyPart::RightHeel,
        BodyPart::LeftFootIndex,
        BodyPart::RightFootIndex,
    ];

    pub fn from_index(index: usize) -> Option<BodyPart> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Pluggable body landmark detector.
///
/// Returns `Ok(None)` when no body is found in the image. Implementations
/// must be shareable across worker threads.
pub trait LandmarkOracle: Send + Sync {
    fn detect(&self, image: &RgbImage) -> Result<Option<Vec<Landmark>>>;
}

/// Landmarks indexed by body part for constant-time lookup.
#[derive(Debug, Clone)]
pub struct LandmarkSet {
    slots: [Option<Landmark>; LANDMARK_COUNT],
}

impl LandmarkSet {
    pub fn new(landmarks: &[Landmark]) -> Self {
        let mut slots = [None; LANDMARK_COUNT];
        for lm in landmarks {
            slots[lm.part.index()] = Some(*lm);
        }
        Self { slots }
    }

    pub fn get(&self, part: BodyPart) -> Option<&Landmark> {
        self.slots[part.index()].as_ref()
    }

    /// The landmark for `part` if its visibility exceeds `threshold`.
    pub fn visible(&self, part: BodyPart, threshold: f32) -> Option<&Landmark> {
        self.get(part).filter(|lm| lm.visibility > threshold)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Landmark> {
        self.slots.iter().flatten()
    }
}
