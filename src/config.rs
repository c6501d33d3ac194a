use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::catalog::ColumnConfig;
use crate::fetch::FetchConfig;
use crate::pose::PoseThresholds;
use crate::skin::SkinToneSettings;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub fetch: FetchConfig,
    pub pose: PoseThresholds,
    pub skin: SkinToneSettings,
    pub models: ModelConfig,
    pub pipeline: PipelineConfig,
    pub columns: ColumnConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub pose_landmark_path: String,
    /// Pose presence score below which an image has no body.
    pub min_detection_confidence: f32,
    pub intra_threads: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Products processed concurrently.
    pub workers: usize,
    pub top_n: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            pose_landmark_path: "models/pose_landmark_full.onnx".to_string(),
            min_detection_confidence: 0.6,
            intra_threads: 1,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            top_n: 5,
        }
    }
}

impl AppConfig {
    pub const DEFAULT_PATH: &'static str = "config.json";

    /// Load from `path`. Missing fields take their defaults; a missing file is
    /// created with the defaults; an unreadable one falls back to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("configuration file not found, creating default at {}", path.display());
            let config = Self::default();
            config.save(path)?;
            return Ok(config);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => {
                info!("loaded configuration from {}", path.display());
                Ok(config)
            }
            Err(e) => {
                warn!("error parsing {}: {}. Using defaults.", path.display(), e);
                Ok(Self::default())
            }
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), content)
            .with_context(|| format!("writing {}", path.as_ref().display()))?;
        Ok(())
    }
}
