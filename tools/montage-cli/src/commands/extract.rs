//! Extract clips around audio peaks.

use std::path::PathBuf;

use montage_common::config::{defaults, MontageConfig};
use montage_common::setting::Setting;
use montage_processing_core::peak::PeakDetectorConfig;
use montage_render_engine::{
    ClipExtractor, EncodeSettings, ExtractionRequest, FfmpegEngine, SkipReason, SourceOutcome,
};

use crate::progress::progress_bar;

pub fn run(
    input_dir: PathBuf,
    output_dir: PathBuf,
    pre_sec: Option<f64>,
    post_sec: Option<f64>,
    threshold: Option<f64>,
    config_path: PathBuf,
) -> anyhow::Result<()> {
    let config = MontageConfig::load(&config_path);

    let pre = Setting::from_sources(pre_sec, config.clip_pre_seconds);
    let threshold = Setting::from_sources(threshold, config.audio_peak_threshold);
    let post_values = match post_sec {
        Some(value) => vec![value],
        None => config.post_sec_values(),
    };
    tracing::debug!(
        pre_source = pre.source(),
        threshold_source = threshold.source(),
        post_override = post_sec.is_some(),
        "Resolved extraction settings"
    );

    let request = ExtractionRequest {
        input_dir: input_dir.clone(),
        output_dir: output_dir.clone(),
        pre_secs: pre.unwrap_or(defaults::CLIP_PRE_SECONDS),
        post_secs_values: post_values,
        detector: PeakDetectorConfig::with_threshold(
            threshold.unwrap_or(defaults::AUDIO_PEAK_THRESHOLD),
        ),
        encode: EncodeSettings::clip_defaults(),
    };

    println!("Extracting clips from: {}", input_dir.display());
    println!("  Output: {}", output_dir.display());
    println!("  Pre-roll: {}s", request.pre_secs);
    println!("  Post-roll: {:?}", request.post_secs_values);
    println!("  Threshold: {}", request.detector.threshold);

    let engine = FfmpegEngine::new();
    let extractor = ClipExtractor::new(&engine, request);
    let (bar, callback) = progress_bar();
    let result = extractor.run(Some(&callback));
    bar.finish_and_clear();
    let report = result.map_err(|e| anyhow::anyhow!("Extraction failed: {e}"))?;

    for source in &report.sources {
        let name = source
            .source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match &source.outcome {
            SourceOutcome::Extracted { clips, too_short } => {
                println!("[OK]   {name}: {} clip(s)", clips.len());
                if *too_short > 0 {
                    println!("       {too_short} window(s) too short, skipped");
                }
            }
            SourceOutcome::Skipped(SkipReason::NoAudioTrack) => {
                println!("[SKIP] {name}: no audio track");
            }
            SourceOutcome::Skipped(SkipReason::NoPeaks) => {
                println!("[SKIP] {name}: no peaks above threshold");
            }
            SourceOutcome::Failed { error, written } => {
                println!("[FAIL] {name}: {error}");
                for clip in written {
                    println!("       kept {}", clip.display());
                }
            }
        }
    }

    println!();
    println!(
        "Extraction complete: {} clip(s) from {} source(s) ({} skipped, {} failed)",
        report.clip_count(),
        report.sources.len(),
        report.skipped(),
        report.failed()
    );

    Ok(())
}
