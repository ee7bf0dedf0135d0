//! Compose a grid montage from a notes list.

use std::path::PathBuf;

use anyhow::Context;
use montage_clip_library::{DirectoryScanner, LibraryIndex};
use montage_common::config::{defaults, AudioMixMode, MontageConfig};
use montage_common::setting::Setting;
use montage_media_model::grid::GridSize;
use montage_media_model::note::parse_note_events;
use montage_render_engine::{
    CompositeSettings, EventOutcome, EventSkip, FfmpegEngine, TimelineCompositor,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::progress::progress_bar;

pub fn run(
    notes_list: PathBuf,
    library_dir: PathBuf,
    grid_size: Option<String>,
    output_file: PathBuf,
    config_path: PathBuf,
    seed: Option<u64>,
    audio_mode: Option<AudioMixMode>,
) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(&notes_list)
        .with_context(|| format!("Failed to read notes list {}", notes_list.display()))?;
    let events = parse_note_events(&content)
        .with_context(|| format!("Invalid notes list {}", notes_list.display()))?;

    let config = MontageConfig::load(&config_path);

    let grid_setting = Setting::from_sources(grid_size, config.default_grid_size.clone());
    let grid_source = grid_setting.source();
    let grid = grid_setting
        .unwrap_or(defaults::GRID_SIZE.to_string())
        .parse::<GridSize>()
        .context("Invalid grid size")?;

    let mode = Setting::from_sources(audio_mode, config.audio_mix_mode);
    tracing::debug!(
        grid = %grid,
        grid_source,
        audio_mode_source = mode.source(),
        seed = ?seed,
        "Resolved compose settings"
    );

    let mut settings = CompositeSettings::from_config(&config, grid);
    settings.audio_mode = mode.unwrap_or(AudioMixMode::default());

    println!("Composing montage from: {}", notes_list.display());
    println!("  Events: {}", events.len());
    println!("  Library: {}", library_dir.display());
    println!("  Grid: {grid}");
    println!(
        "  Output: {} ({}x{}{})",
        output_file.display(),
        settings.target.width,
        settings.target.height,
        if settings.rotate_ccw_90 { ", rotated" } else { "" }
    );
    println!("  Audio: {:?}", settings.audio_mode);

    let index = LibraryIndex::build(&library_dir, &DirectoryScanner)
        .map_err(|e| anyhow::anyhow!("Failed to index clip library: {e}"))?;
    println!("  Library clips: {}", index.len());

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let engine = FfmpegEngine::new();
    let compositor = TimelineCompositor::new(&engine, &index, settings);
    let (bar, callback) = progress_bar();
    let result = compositor.compose(&events, &output_file, &mut rng, Some(&callback));
    bar.finish_and_clear();
    let report = result.map_err(|e| anyhow::anyhow!("Compose failed: {e}"))?;

    for (event, outcome) in events.iter().zip(&report.events) {
        match outcome {
            EventOutcome::Placed(p) => println!(
                "[OK]   {:>8.3}s {:<4} -> ({}, {}) {}",
                event.time,
                event.note_name,
                p.cell.row,
                p.cell.col,
                p.clip.file_name()
            ),
            EventOutcome::Skipped(EventSkip::NoMatchingClip) => println!(
                "[SKIP] {:>8.3}s {:<4} no matching clip",
                event.time, event.note_name
            ),
            EventOutcome::Failed(err) => println!(
                "[FAIL] {:>8.3}s {:<4} {err}",
                event.time, event.note_name
            ),
        }
    }

    println!();
    println!(
        "Montage written: {} ({:.1}s, {} placed, {} skipped, {} failed)",
        report.output.display(),
        report.duration_secs,
        report.placed(),
        report.skipped(),
        report.failed()
    );
    if report.audio_segments == 0 {
        println!("  Note: no placed clip had audio, the montage is silent");
    }

    Ok(())
}
