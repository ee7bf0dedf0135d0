//! Write a default configuration file.

use std::path::PathBuf;

use montage_common::config::MontageConfig;

pub fn run(path: PathBuf, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    let config = MontageConfig::populated();
    config
        .save(&path)
        .map_err(|e| anyhow::anyhow!("Failed to write config: {e}"))?;

    println!("Config written to {}", path.display());
    println!(
        "  Clip window: -{}s / +{}s",
        config.clip_pre_seconds.unwrap_or_default(),
        config.clip_post_seconds.unwrap_or_default()
    );
    println!(
        "  Peak threshold: {}",
        config.audio_peak_threshold.unwrap_or_default()
    );
    println!(
        "  Output: {}x{} @ {} fps, {} {}",
        config.output_video_width_phone(),
        config.output_video_height_phone(),
        config.output_video_fps(),
        config.output_video_codec(),
        config.output_video_bitrate()
    );

    Ok(())
}
