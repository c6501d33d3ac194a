use crate::color::SkinTone;

/// Named body part in the 33-point body topology.
///
/// The discriminant is the position of the landmark in the oracle's output
/// tensor; see [`crate::landmarks`] for the mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyPart {
    Nose,
    LeftEyeInner,
    LeftEye,
    LeftEyeOuter,
    RightEyeInner,
    RightEye,
    RightEyeOuter,
    LeftEar,
    RightEar,
    MouthLeft,
    MouthRight,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftPinky,
    RightPinky,
    LeftIndex,
    RightIndex,
    LeftThumb,
    RightThumb,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
    LeftHeel,
    RightHeel,
    LeftFootIndex,
    RightFootIndex,
}

/// A single body landmark in normalized image coordinates.
#[derive(Debug, Clone, Copy)]
pub struct Landmark {
    pub part: BodyPart,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Confidence in [0, 1] that the landmark is visible.
    pub visibility: f32,
}

impl Landmark {
    pub fn new(part: BodyPart, x: f32, y: f32, z: f32, visibility: f32) -> Self {
        Self {
            part,
            x,
            y,
            z,
            visibility,
        }
    }
}

/// How much of a body is visible in an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    Full,
    Upper,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoseClassification {
    pub coverage: Coverage,
    pub front_facing: bool,
}

impl PoseClassification {
    pub const NONE: Self = Self {
        coverage: Coverage::None,
        front_facing: false,
    };
}

/// A product photo that produced a usable pose classification.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateImage {
    pub url: String,
    pub coverage: Coverage,
    pub front_facing: bool,
}

/// One cleaned catalog row, ready for ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRecord {
    pub id: String,
    pub gender: String,
    pub price: String,
    pub representative_image_url: String,
    pub skin_tone: Option<SkinTone>,
    pub source_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationResult {
    pub product_id: String,
    pub price: String,
    pub representative_image_url: String,
    pub source_url: String,
    pub color_distance: f64,
}

/// Output of a single [`crate::pipeline::Pipeline`] stage on one image.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutput {
    Pose(PoseClassification),
    SkinTone(SkinTone),
}
