use std::path::Path;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use image::RgbImage;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use attire_match::args::{Args, Command};
use attire_match::catalog::{self, Catalog};
use attire_match::config::AppConfig;
use attire_match::fetch::{HttpFetcher, ImageSource};
use attire_match::inference::OnnxPoseLandmarker;
use attire_match::pipeline::{self, BatchContext, Pipeline, PoseStage, SkinToneStage};
use attire_match::recommend::{available_genders, recommend_for_photo};
use attire_match::NoRecommendation;

fn create_pose_stage(config: &AppConfig) -> Result<Arc<dyn Pipeline>> {
    let oracle = OnnxPoseLandmarker::new(&config.models).context("loading pose landmark model")?;
    Ok(Arc::new(PoseStage::new(Arc::new(oracle), config.pose.clone())))
}

fn create_context(config: &AppConfig, fetcher: Arc<HttpFetcher>, workers: Option<usize>) -> BatchContext {
    let ctx = BatchContext::new(fetcher, workers.unwrap_or(config.pipeline.workers));

    // Stop enqueuing new products on Ctrl-C; in-flight ones run to completion.
    let stop = ctx.stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing in-flight products");
            stop.store(true, Ordering::Relaxed);
        }
    });
    ctx
}

async fn load_photo(photo: &str, fetcher: &HttpFetcher) -> Result<RgbImage> {
    if photo.starts_with("http://") || photo.starts_with("https://") {
        let image = fetcher.fetch_image(photo).await?;
        return Ok(image.to_rgb8());
    }
    if !Path::new(photo).exists() {
        anyhow::bail!("user image path not found: {}", photo);
    }
    let image = image::open(photo).with_context(|| format!("reading user image {}", photo))?;
    Ok(image.to_rgb8())
}

fn print_recommendations(results: &[attire_match::RecommendationResult]) {
    println!("\n--- Top {} Recommendations ---", results.len());
    for (i, rec) in results.iter().enumerate() {
        println!("{}", "-".repeat(20));
        println!("Recommendation {}:", i + 1);
        println!("  Price: {}", rec.price);
        println!("  Model Image: {}", rec.representative_image_url);
        println!("  Product URL: {}", rec.source_url);
        println!("  Skin Color Distance: {:.2}", rec.color_distance);
    }
    println!("{}", "-".repeat(20));
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _tracing = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .try_init();

    let args = Args::parse();

    // 0. Load Config
    let config = AppConfig::load(&args.config)?;
    let fetcher = Arc::new(HttpFetcher::new(config.fetch.clone())?);
    let columns = &config.columns;

    match args.command {
        Command::Select {
            input,
            output,
            workers,
        } => {
            let mut catalog = Catalog::read(&input)?;
            info!("loaded {} rows from {}", catalog.len(), input.display());
            let ctx = create_context(&config, fetcher, workers);
            let pose = create_pose_stage(&config)?;
            pipeline::select_images(&mut catalog, columns, &ctx, pose).await?;
            catalog.write(&output)?;
            info!("saved {}", output.display());
        }
        Command::SkinTone {
            input,
            output,
            workers,
        } => {
            let mut catalog = Catalog::read(&input)?;
            info!("loaded {} rows from {}", catalog.len(), input.display());
            let ctx = create_context(&config, fetcher, workers);
            let skin: Arc<dyn Pipeline> = Arc::new(SkinToneStage::catalog(config.skin.clone()));
            pipeline::extract_skin_tones(&mut catalog, columns, &ctx, skin).await?;
            catalog.write(&output)?;
            info!("saved {}", output.display());
        }
        Command::Run {
            input,
            output,
            workers,
        } => {
            let mut catalog = Catalog::read(&input)?;
            info!("loaded {} rows from {}", catalog.len(), input.display());
            let ctx = create_context(&config, fetcher, workers);
            let pose = create_pose_stage(&config)?;
            pipeline::select_images(&mut catalog, columns, &ctx, pose).await?;
            let skin: Arc<dyn Pipeline> = Arc::new(SkinToneStage::catalog(config.skin.clone()));
            pipeline::extract_skin_tones(&mut catalog, columns, &ctx, skin).await?;
            catalog.write(&output)?;
            info!("saved {}", output.display());
        }
        Command::Recommend {
            catalog: catalog_path,
            gender,
            photo,
            top_n,
        } => {
            let table = Catalog::read(&catalog_path)?;
            info!("loaded {} rows from {}", table.len(), catalog_path.display());
            let products = catalog::clean(&table, columns)?;
            if products.is_empty() {
                let reason = NoRecommendation::NoUsableColor { gender };
                eprintln!("Could not generate recommendations: {}", reason);
                return Ok(ExitCode::FAILURE);
            }

            let photo = load_photo(&photo, &fetcher).await?;
            let top_n = top_n.unwrap_or(config.pipeline.top_n);
            match recommend_for_photo(&products, &gender, &photo, &config.skin, top_n) {
                Ok(results) => print_recommendations(&results),
                Err(reason) => {
                    eprintln!("Could not generate recommendations: {}", reason);
                    if matches!(reason, NoRecommendation::NoGenderMatch { .. }) {
                        eprintln!("Available genders: {}", available_genders(&products).join(", "));
                    }
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
