use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Requirements;

#[derive(Parser, Debug)]
#[command(name = "reel")]
#[command(author, version, about = "Turn pending spreadsheet rows into narrated short videos")]
pub struct Cli {
    /// Load environment variables from this file instead of `.env`
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,

    /// Root directory for images/, audio/ and videos/
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// The subcommand, defaulting to `run`.
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Run)
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Process the first pending row through every stage
    Run,

    /// Show the first pending row without processing it
    Pending,

    /// Generate the image for a row id
    Image {
        /// Text prompt for the image model
        prompt: String,

        /// Row id naming the artifact
        id: String,
    },

    /// Synthesize the narration for a row id
    Audio {
        /// Narration text
        text: String,

        /// Row id naming the artifact
        id: String,
    },

    /// Compose the video for a row id from its image and audio
    Video {
        /// Row id naming the artifacts
        id: String,

        /// Caption overlaid at the bottom of the frame
        caption: Option<String>,
    },

    /// Check that required external tools are available
    CheckTools,
}

impl Commands {
    /// Configuration the command cannot run without.
    pub fn requirements(&self) -> Requirements {
        match self {
            Commands::Run => Requirements::FULL,
            Commands::Pending => Requirements::QUEUE,
            Commands::Image { .. } => Requirements::IMAGE,
            Commands::Audio { .. } => Requirements::AUDIO,
            Commands::Video { .. } => Requirements::VIDEO,
            Commands::CheckTools => Requirements::NONE,
        }
    }
}
