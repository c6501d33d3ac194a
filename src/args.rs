use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file (created with defaults if missing)
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Pick a representative model image for every product
    Select {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Products processed concurrently (overrides config)
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Extract the dominant skin tone of every representative image
    SkinTone {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Run image selection followed by skin tone extraction
    Run {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Recommend products whose model skin tone is closest to a photo
    Recommend {
        /// Processed catalog with skin tone and gender columns
        #[arg(long)]
        catalog: PathBuf,
        /// Gender to match, e.g. Men, Women, Boys, Girls
        #[arg(short, long)]
        gender: String,
        /// Local image path or http(s) URL
        #[arg(short, long)]
        photo: String,
        #[arg(short = 'n', long)]
        top_n: Option<usize>,
    },
}
