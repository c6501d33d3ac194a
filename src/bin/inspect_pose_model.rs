use anyhow::Result;
use attire_match::config::AppConfig;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use std::env;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let model_path = match args.get(1) {
        Some(path) => path.clone(),
        None => AppConfig::load(AppConfig::DEFAULT_PATH)?.models.pose_landmark_path,
    };
    println!("Inspecting pose landmark model: {}", model_path);

    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level1)?
        .with_intra_threads(1)?
        .commit_from_file(&model_path)?;

    println!("\n--- Inputs ---");
    for (i, input) in session.inputs.iter().enumerate() {
        println!("#{}: Name: {}", i, input.name);
        println!("    Type: {:?}", input.input_type);
    }

    println!("\n--- Outputs ---");
    for (i, output) in session.outputs.iter().enumerate() {
        println!("#{}: Name: {}", i, output.name);
        println!("    Type: {:?}", output.output_type);
    }

    if session.outputs.len() < 2 {
        println!("\nWarning: expected a landmark output and a pose presence output.");
    }

    Ok(())
}
