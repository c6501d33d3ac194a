use anyhow::{bail, Result};
use attire_match::config::AppConfig;
use attire_match::inference::OnnxPoseLandmarker;
use attire_match::landmarks::LandmarkOracle;
use attire_match::pose::classify;
use attire_match::skin::{catalog_tone, user_tone};
use image::ImageReader;
use std::env;

/// Run the landmark model, pose classifier and skin tone extractor on one
/// local photo and print what each stage sees.
fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let Some(img_path) = args.get(1) else {
        bail!("Usage: classify_photo <image>");
    };
    let config = AppConfig::load(AppConfig::DEFAULT_PATH)?;

    println!("Loading {:?}", img_path);
    let img = ImageReader::open(img_path)?.decode()?.to_rgb8();
    println!("Dimensions: {}x{}", img.width(), img.height());

    let oracle = OnnxPoseLandmarker::new(&config.models)?;
    match oracle.detect(&img)? {
        Some(landmarks) => {
            let threshold = config.pose.visibility_threshold;
            let visible = landmarks.iter().filter(|lm| lm.visibility > threshold).count();
            println!("Landmarks: {} ({} visible)", landmarks.len(), visible);
            for lm in &landmarks {
                println!(
                    "  {:<16} x={:.3} y={:.3} z={:.3} vis={:.2}",
                    format!("{:?}", lm.part),
                    lm.x,
                    lm.y,
                    lm.z,
                    lm.visibility
                );
            }
            let pose = classify(&landmarks, img.height(), &config.pose);
            println!("Coverage: {:?}, front facing: {}", pose.coverage, pose.front_facing);
        }
        None => println!("No body detected."),
    }

    match catalog_tone(&img, &config.skin) {
        Some(tone) => println!("Catalog skin tone: {}", tone),
        None => println!("Catalog skin tone: Not Detected"),
    }
    match user_tone(&img, &config.skin) {
        Some(tone) => println!("User skin tone: {}", tone),
        None => println!("User skin tone: Not Detected"),
    }
    Ok(())
}
