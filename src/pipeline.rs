//! Per-image processing stages and the batch runners that drive them over a
//! whole catalog.
//!
//! Products are independent units of work. Each runs on a bounded pool of
//! concurrent tasks and yields an immutable result tagged with its row; the
//! results are written into the catalog in one pass after every task is done.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use futures::stream::{self, StreamExt};
use image::{DynamicImage, RgbImage};
use tracing::{info, warn};

use crate::catalog::{candidate_urls, Catalog, ColumnConfig};
use crate::color::ToneCell;
use crate::fetch::{parse_image_url, ImageSource};
use crate::landmarks::LandmarkOracle;
use crate::pose::{classify, PoseThresholds};
use crate::selector::select_representative_image;
use crate::skin::{extract_dominant_skin_tone, SkinToneSettings};
use crate::types::{PipelineOutput, PoseClassification};

pub trait Pipeline: Send + Sync {
    fn name(&self) -> String;
    fn process(&self, frame: &RgbImage) -> Result<Option<PipelineOutput>>;
}

/// Landmark detection followed by pose classification.
pub struct PoseStage {
    oracle: Arc<dyn LandmarkOracle>,
    thresholds: PoseThresholds,
}

impl PoseStage {
    pub fn new(oracle: Arc<dyn LandmarkOracle>, thresholds: PoseThresholds) -> Self {
        Self { oracle, thresholds }
    }
}

impl Pipeline for PoseStage {
    fn name(&self) -> String {
        "Pose Classification".to_string()
    }

    fn process(&self, frame: &RgbImage) -> Result<Option<PipelineOutput>> {
        let classification = match self.oracle.detect(frame)? {
            Some(landmarks) => classify(&landmarks, frame.height(), &self.thresholds),
            None => PoseClassification::NONE,
        };
        Ok(Some(PipelineOutput::Pose(classification)))
    }
}

/// Dominant skin tone with a fixed minimum pixel count.
pub struct SkinToneStage {
    settings: SkinToneSettings,
    min_pixels: usize,
}

impl SkinToneStage {
    pub fn catalog(settings: SkinToneSettings) -> Self {
        let min_pixels = settings.min_pixels_catalog;
        Self {
            settings,
            min_pixels,
        }
    }

    pub fn user(settings: SkinToneSettings) -> Self {
        let min_pixels = settings.min_pixels_user;
        Self {
            settings,
            min_pixels,
        }
    }
}

impl Pipeline for SkinToneStage {
    fn name(&self) -> String {
        format!("Skin Tone (min {} px)", self.min_pixels)
    }

    fn process(&self, frame: &RgbImage) -> Result<Option<PipelineOutput>> {
        Ok(extract_dominant_skin_tone(frame, &self.settings, self.min_pixels)
            .map(PipelineOutput::SkinTone))
    }
}

/// Run a stage on a blocking worker thread.
pub async fn run_stage(stage: Arc<dyn Pipeline>, image: DynamicImage) -> Result<Option<PipelineOutput>> {
    tokio::task::spawn_blocking(move || stage.process(&image.to_rgb8()))
        .await
        .map_err(|e| anyhow!("stage worker failed: {}", e))?
}

/// Shared resources for a batch run.
#[derive(Clone)]
pub struct BatchContext {
    pub source: Arc<dyn ImageSource>,
    pub workers: usize,
    /// Once set, rows that have not started are skipped.
    pub stop: Arc<AtomicBool>,
}

impl BatchContext {
    pub fn new(source: Arc<dyn ImageSource>, workers: usize) -> Self {
        Self {
            source,
            workers: workers.max(1),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }
}

/// Result of one product's unit of work.
#[derive(Debug, Clone, PartialEq)]
pub struct RowResult<T> {
    pub row: usize,
    pub product_id: String,
    pub value: T,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageSummary {
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
}

fn product_id(catalog: &Catalog, columns: &ColumnConfig, row: usize) -> String {
    match catalog.value(row, &columns.product_id) {
        "" => format!("row {}", row + 1),
        id => id.to_string(),
    }
}

/// Stage 1: choose a representative image per product and store it in the
/// representative image column (blank when nothing qualifies).
pub async fn select_images(
    catalog: &mut Catalog,
    columns: &ColumnConfig,
    ctx: &BatchContext,
    pose: Arc<dyn Pipeline>,
) -> Result<StageSummary> {
    catalog.require(&[columns.model_image_url.as_str()])?;

    let total = catalog.len();
    let jobs: Vec<(usize, String, Vec<String>)> = (0..total)
        .map(|row| {
            let urls = candidate_urls(
                catalog.value(row, &columns.model_image_url),
                catalog.value(row, &columns.additional_images),
            );
            (row, product_id(catalog, columns, row), urls)
        })
        .collect();

    let results: Vec<RowResult<Option<String>>> = stream::iter(jobs)
        .map(|(row, product_id, urls)| {
            let ctx = ctx.clone();
            let pose = pose.clone();
            async move {
                if ctx.stopped() {
                    return RowResult { row, product_id, value: None };
                }
                info!(product = %product_id, candidates = urls.len(), "selecting model image");
                let chosen = select_representative_image(&urls, ctx.source.as_ref(), pose).await;
                if chosen.is_none() {
                    info!(product = %product_id, "no suitable model image found");
                }
                RowResult {
                    row,
                    product_id,
                    value: chosen.map(|c| c.url),
                }
            }
        })
        .buffer_unordered(ctx.workers)
        .collect()
        .await;

    let mut values = vec![String::new(); total];
    let mut summary = StageSummary {
        total,
        ..Default::default()
    };
    for result in results {
        match result.value {
            Some(url) => {
                summary.succeeded += 1;
                values[result.row] = url;
            }
            None => summary.skipped += 1,
        }
    }
    catalog.set_column(&columns.representative_image_url, values);
    info!(?summary, "representative image selection complete");
    Ok(summary)
}

async fn tone_for_url(url: &str, ctx: &BatchContext, stage: Arc<dyn Pipeline>) -> ToneCell {
    if let Err(e) = parse_image_url(url) {
        warn!(url, "{}", e);
        return ToneCell::NotDetected;
    }
    let image = match ctx.source.fetch_image(url).await {
        Ok(image) => image,
        Err(e) => {
            warn!(url, "could not fetch model image: {}", e);
            return ToneCell::NotDetected;
        }
    };
    match run_stage(stage, image).await {
        Ok(Some(PipelineOutput::SkinTone(tone))) => ToneCell::Tone(tone),
        Ok(_) => ToneCell::NotDetected,
        Err(e) => {
            warn!(url, "skin tone extraction failed: {:#}", e);
            ToneCell::Error
        }
    }
}

/// Stage 2: extract the dominant skin tone of every representative image and
/// store it, or the reason there is none, in the skin tone column.
pub async fn extract_skin_tones(
    catalog: &mut Catalog,
    columns: &ColumnConfig,
    ctx: &BatchContext,
    skin: Arc<dyn Pipeline>,
) -> Result<StageSummary> {
    catalog.require(&[columns.representative_image_url.as_str()])?;

    let total = catalog.len();
    let jobs: Vec<(usize, String, String)> = (0..total)
        .map(|row| {
            let url = catalog
                .value(row, &columns.representative_image_url)
                .trim()
                .to_string();
            (row, product_id(catalog, columns, row), url)
        })
        .collect();

    let results: Vec<RowResult<ToneCell>> = stream::iter(jobs)
        .map(|(row, product_id, url)| {
            let ctx = ctx.clone();
            let skin = skin.clone();
            async move {
                let value = if ctx.stopped() {
                    ToneCell::NotProcessed
                } else if url.is_empty() {
                    ToneCell::InvalidUrl
                } else {
                    tone_for_url(&url, &ctx, skin).await
                };
                match value {
                    ToneCell::Tone(tone) => {
                        info!(product = %product_id, %tone, "detected dominant skin color")
                    }
                    other => info!(product = %product_id, result = %other, "no skin color"),
                }
                RowResult { row, product_id, value }
            }
        })
        .buffer_unordered(ctx.workers)
        .collect()
        .await;

    let mut values = vec![ToneCell::NotProcessed.to_string(); total];
    let mut summary = StageSummary {
        total,
        ..Default::default()
    };
    for result in results {
        if result.value.tone().is_some() {
            summary.succeeded += 1;
        } else {
            summary.skipped += 1;
        }
        values[result.row] = result.value.to_string();
    }
    catalog.set_column(&columns.skin_tone, values);
    info!(?summary, "skin tone extraction complete");
    Ok(summary)
}
