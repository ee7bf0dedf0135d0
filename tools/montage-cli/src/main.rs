//! Montage CLI: clip extraction and montage compositing from the command line.
//!
//! Usage:
//!   montage extract [OPTIONS]       Cut clips around audio peaks
//!   montage compose [OPTIONS]       Build a grid montage from a notes list
//!   montage init-config [PATH]      Write a config file with every default

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use montage_common::config::{AudioMixMode, LoggingConfig, MontageConfig};

mod commands;
mod progress;

#[derive(Parser)]
#[command(
    name = "montage",
    about = "Peak-driven clip extraction and note-timeline grid montages",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cut short clips around the loud moments of every video in a directory
    Extract {
        /// Directory containing source videos (.mp4, .mov)
        #[arg(long = "input_dir", alias = "input-dir")]
        input_dir: PathBuf,

        /// Directory the clips are written to (created if missing)
        #[arg(long = "output_dir", alias = "output-dir")]
        output_dir: PathBuf,

        /// Seconds kept before each peak [config: clip_pre_seconds]
        #[arg(long = "pre_sec", alias = "pre-sec")]
        pre_sec: Option<f64>,

        /// Single post-roll override in seconds [config: post_sec_preview_values]
        #[arg(long = "post_sec", alias = "post-sec")]
        post_sec: Option<f64>,

        /// Peak threshold on absolute amplitude, 0.0-1.0 [config: audio_peak_threshold]
        #[arg(long)]
        threshold: Option<f64>,

        /// Path to the JSON config file
        #[arg(long, default_value = "config.json")]
        config: PathBuf,
    },

    /// Compose a grid montage from a JSON list of note events
    Compose {
        /// JSON array of {time, duration, note, category_hint} records
        #[arg(long = "notes_list", alias = "notes-list")]
        notes_list: PathBuf,

        /// Root of the clip library (category subdirectories)
        #[arg(long = "library_dir", alias = "library-dir")]
        library_dir: PathBuf,

        /// Grid as ROWSxCOLS [config: default_grid_size]
        #[arg(long = "grid_size", alias = "grid-size")]
        grid_size: Option<String>,

        /// Output video path (parent directories are created)
        #[arg(long = "output_file", alias = "output-file")]
        output_file: PathBuf,

        /// Path to the JSON config file
        #[arg(long, default_value = "config.json")]
        config: PathBuf,

        /// Seed for grid placement and clip choice
        #[arg(long)]
        seed: Option<u64>,

        /// How event audio is combined: concatenate|mix [config: audio_mix_mode]
        #[arg(long = "audio_mode", alias = "audio-mode")]
        audio_mode: Option<AudioMixMode>,
    },

    /// Write a config file populated with every default
    InitConfig {
        /// Where to write the config
        #[arg(default_value = "config.json")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Commands {
    fn config_path(&self) -> Option<&PathBuf> {
        match self {
            Commands::Extract { config, .. } | Commands::Compose { config, .. } => Some(config),
            Commands::InitConfig { .. } => None,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let mut logging = cli
        .command
        .config_path()
        .and_then(|path| MontageConfig::read(path).ok())
        .map(|config| config.logging)
        .unwrap_or_else(LoggingConfig::default);
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    montage_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Extract {
            input_dir,
            output_dir,
            pre_sec,
            post_sec,
            threshold,
            config,
        } => commands::extract::run(input_dir, output_dir, pre_sec, post_sec, threshold, config),
        Commands::Compose {
            notes_list,
            library_dir,
            grid_size,
            output_file,
            config,
            seed,
            audio_mode,
        } => commands::compose::run(
            notes_list,
            library_dir,
            grid_size,
            output_file,
            config,
            seed,
            audio_mode,
        ),
        Commands::InitConfig { path, force } => commands::init::run(path, force),
    }
}
