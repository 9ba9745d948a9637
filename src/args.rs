use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tennis_coach::AppConfig;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file (JSON)
    #[arg(short, long, global = true, default_value = AppConfig::DEFAULT_PATH)]
    pub config: PathBuf,

    /// Debug logging
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze a stroke video and print the VideoAnalysis JSON
    Analyze {
        video: PathBuf,

        /// Frames sampled per second (defaults to analysis.sample_fps)
        #[arg(long)]
        fps: Option<f64>,

        /// Write the JSON here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Generate coaching feedback from a saved VideoAnalysis
    Coach {
        analysis: PathBuf,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Answer one chat message within a saved ChatSession
    Chat {
        session: PathBuf,

        #[arg(short, long)]
        message: String,
    },

    /// Run the pipeline on a synthetic forehand (no video or model needed)
    Demo {
        /// Seconds of simulated video
        #[arg(long, default_value_t = 3.0)]
        duration: f64,

        #[arg(long)]
        fps: Option<f64>,
    },
}
