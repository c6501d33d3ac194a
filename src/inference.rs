use anyhow::{anyhow, bail, Result};
use image::{imageops::FilterType, RgbImage};
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

use crate::config::ModelConfig;
use crate::landmarks::{LandmarkOracle, LANDMARK_COUNT};
use crate::types::{BodyPart, Landmark};

const INPUT_SIZE: u32 = 256;
/// x, y, z, visibility logit, presence logit.
const VALUES_PER_LANDMARK: usize = 5;

/// Full-body pose landmark network run through ONNX Runtime.
///
/// Expects a `1x256x256x3` RGB input in [0, 1]. Output 0 carries the
/// landmarks in input-pixel units, output 1 the pose presence score.
pub struct OnnxPoseLandmarker {
    session: Mutex<Session>,
    min_detection_confidence: f32,
}

impl OnnxPoseLandmarker {
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let model_path = &config.pose_landmark_path;
        if !Path::new(model_path).exists() {
            bail!("pose landmark model not found at {}", model_path);
        }

        info!("loading pose landmark model from {}", model_path);
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(config.intra_threads.max(1))?
            .commit_from_file(model_path)?;

        if session.outputs.len() < 2 {
            bail!(
                "pose landmark model has {} outputs, expected landmarks and presence",
                session.outputs.len()
            );
        }

        Ok(Self {
            session: Mutex::new(session),
            min_detection_confidence: config.min_detection_confidence,
        })
    }

    fn preprocess(image: &RgbImage) -> Vec<f32> {
        let resized = image::imageops::resize(image, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);
        let mut input_data = Vec::with_capacity((INPUT_SIZE * INPUT_SIZE * 3) as usize);
        for pixel in resized.pixels() {
            input_data.extend(pixel.0.iter().map(|&c| c as f32 / 255.0));
        }
        input_data
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Convert raw network output into named, normalized landmarks.
///
/// Returns `None` when the pose presence is below `min_presence` or the
/// output is too short to hold every landmark.
pub fn decode_landmarks(raw: &[f32], presence: f32, min_presence: f32) -> Option<Vec<Landmark>> {
    if presence < min_presence || raw.len() < LANDMARK_COUNT * VALUES_PER_LANDMARK {
        return None;
    }

    let scale = INPUT_SIZE as f32;
    let landmarks = BodyPart::ALL
        .iter()
        .zip(raw.chunks_exact(VALUES_PER_LANDMARK))
        .map(|(&part, v)| {
            Landmark::new(part, v[0] / scale, v[1] / scale, v[2] / scale, sigmoid(v[3]))
        })
        .collect();
    Some(landmarks)
}

impl LandmarkOracle for OnnxPoseLandmarker {
    fn detect(&self, image: &RgbImage) -> Result<Option<Vec<Landmark>>> {
        let input = ort::value::Tensor::from_array((vec![1, 256, 256, 3], Self::preprocess(image)))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("pose landmark session lock poisoned"))?;
        let outputs = session.run(ort::inputs![input])?;

        let (_, raw) = outputs[0].try_extract_tensor::<f32>()?;
        let (_, flag) = outputs[1].try_extract_tensor::<f32>()?;
        let presence = flag.first().copied().unwrap_or(0.0);
        debug!(presence, "pose landmark inference");

        Ok(decode_landmarks(raw, presence, self.min_detection_confidence))
    }
}
