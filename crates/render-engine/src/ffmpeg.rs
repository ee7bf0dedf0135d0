//! [`MediaEngine`] backed by the `ffmpeg` and `ffprobe` command-line tools.

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use montage_common::config::{defaults, AudioMixMode};
use montage_common::error::{MontageError, MontageResult};
use montage_media_model::clip::ClipWindow;
use montage_media_model::signal::AudioSignal;
use serde::Deserialize;

use crate::media::{
    AudioStreamInfo, CompositeJob, EncodeSettings, MediaEngine, MediaInfo, Progress,
    ProgressCallback, Stage,
};

/// Audio is resampled to this rate before concatenation or mixing.
const MIX_SAMPLE_RATE: u32 = 48_000;

/// Render progress is reported in per-mille of the montage duration.
const RENDER_PROGRESS_TOTAL: u64 = 1000;

#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegEngine {
    /// Use `ffmpeg` and `ffprobe` from `PATH`.
    pub fn new() -> Self {
        Self::with_binaries("ffmpeg", "ffprobe")
    }

    pub fn with_binaries(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    fn run_to_completion(&self, mut cmd: Command, what: &str) -> MontageResult<Vec<u8>> {
        let output = cmd
            .stdin(Stdio::null())
            .output()
            .map_err(|e| MontageError::media(format!("Failed to start {what}: {e}")))?;
        if !output.status.success() {
            return Err(MontageError::media(format!(
                "{what} failed (status {}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(output.stdout)
    }

    fn run_render(
        &self,
        args: &[String],
        expected_duration_secs: f64,
        progress: Option<&ProgressCallback>,
    ) -> MontageResult<()> {
        tracing::debug!(args = ?args, "Running ffmpeg");
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let start = std::time::Instant::now();
        let child = cmd
            .spawn()
            .map_err(|e| MontageError::composite(format!("Failed to start ffmpeg: {e}")))?;
        let mut guard = ChildGuard::new(child);

        tracing::info!(
            pid = guard.child().id(),
            args_len = args.len(),
            duration_secs = expected_duration_secs,
            "ffmpeg process started"
        );

        let stdout = guard
            .child()
            .stdout
            .take()
            .ok_or_else(|| MontageError::composite("Failed to capture ffmpeg stdout"))?;
        let stderr = guard
            .child()
            .stderr
            .take()
            .ok_or_else(|| MontageError::composite("Failed to capture ffmpeg stderr"))?;

        // ffmpeg blocks once the stderr pipe is full.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let mut reader = BufReader::new(stdout);
        let mut line = String::new();
        let mut latest = ProgressState::default();
        let mut last_progress_secs = 0.0f64;
        let mut last_progress_wall = std::time::Instant::now();
        loop {
            line.clear();
            let bytes = reader.read_line(&mut line).map_err(|e| {
                MontageError::composite(format!("Failed reading ffmpeg progress: {e}"))
            })?;
            if bytes == 0 {
                break;
            }

            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            latest.update(key, value);
            if key != "progress" {
                continue;
            }

            if latest.out_time_secs > last_progress_secs + 0.001 {
                last_progress_secs = latest.out_time_secs;
                last_progress_wall = std::time::Instant::now();
            }
            if let Some(cb) = progress {
                cb(progress_report(&latest, expected_duration_secs));
            }
            if last_progress_wall.elapsed().as_secs() >= 10 {
                tracing::warn!(
                    out_time_secs = latest.out_time_secs,
                    elapsed_secs = start.elapsed().as_secs_f64(),
                    "No ffmpeg progress advancement for 10s"
                );
                last_progress_wall = std::time::Instant::now();
            }
        }

        let status = guard
            .child()
            .wait()
            .map_err(|e| MontageError::composite(format!("Failed to wait on ffmpeg: {e}")))?;

        let stderr_output = stderr_task
            .join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if !status.success() {
            return Err(MontageError::composite(format!(
                "ffmpeg render failed (status {}): {}",
                status,
                stderr_output.trim()
            )));
        }

        tracing::info!(
            elapsed_secs = start.elapsed().as_secs_f64(),
            "ffmpeg render finished"
        );
        if let Some(cb) = progress {
            cb(Progress {
                stage: Stage::Complete,
                completed: RENDER_PROGRESS_TOTAL,
                total: RENDER_PROGRESS_TOTAL,
            });
        }
        Ok(())
    }
}

impl MediaEngine for FfmpegEngine {
    fn probe(&self, path: &Path) -> MontageResult<MediaInfo> {
        let mut cmd = Command::new(&self.ffprobe);
        cmd.args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path);
        let stdout = self.run_to_completion(cmd, "ffprobe")?;
        parse_probe(&String::from_utf8_lossy(&stdout))
            .map_err(|e| MontageError::media(format!("{}: {e}", path.display())))
    }

    fn decode_audio(&self, path: &Path, info: &MediaInfo) -> MontageResult<AudioSignal> {
        let stream = info
            .audio
            .ok_or_else(|| MontageError::media(format!("{} has no audio track", path.display())))?;

        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(["-v", "error", "-nostdin", "-i"])
            .arg(path)
            .args(["-map", "0:a:0", "-vn", "-f", "f32le", "-acodec", "pcm_f32le", "pipe:1"]);
        let stdout = self.run_to_completion(cmd, "ffmpeg audio decode")?;

        let interleaved = f32le_samples(&stdout);
        let signal = AudioSignal::first_channel(
            &interleaved,
            stream.channels.max(1) as usize,
            stream.sample_rate,
        );
        tracing::debug!(
            path = %path.display(),
            samples = signal.len(),
            sample_rate = signal.sample_rate(),
            "Decoded audio track"
        );
        Ok(signal)
    }

    fn write_subclip(
        &self,
        window: &ClipWindow,
        output: &Path,
        settings: &EncodeSettings,
    ) -> MontageResult<()> {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(subclip_args(window, output, settings));
        self.run_to_completion(cmd, "ffmpeg subclip")?;
        Ok(())
    }

    fn render_composite(
        &self,
        job: &CompositeJob,
        output: &Path,
        settings: &EncodeSettings,
        progress: Option<&ProgressCallback>,
    ) -> MontageResult<()> {
        if let Some(cb) = progress {
            cb(Progress {
                stage: Stage::Rendering,
                completed: 0,
                total: RENDER_PROGRESS_TOTAL,
            });
        }
        let args = composite_args(job, output, settings);
        self.run_render(&args, job.duration_secs, progress)
    }

    fn is_available(&self) -> bool {
        command_exists(&self.ffmpeg) && command_exists(&self.ffprobe)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Kills and reaps the child if it is still running when dropped.
struct ChildGuard {
    child: Child,
}

impl ChildGuard {
    fn new(child: Child) -> Self {
        Self { child }
    }

    fn child(&mut self) -> &mut Child {
        &mut self.child
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            tracing::warn!(pid = self.child.id(), "Killing unfinished ffmpeg process");
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    sample_rate: Option<String>,
    channels: Option<u32>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Parse `ffprobe -print_format json -show_format -show_streams` output.
fn parse_probe(json: &str) -> MontageResult<MediaInfo> {
    let probe: ProbeOutput = serde_json::from_str(json)?;

    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| MontageError::media("no video stream"))?;

    let duration_secs = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or(video.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| MontageError::media("unknown duration"))?;

    let audio = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"))
        .and_then(|s| {
            let sample_rate = s.sample_rate.as_deref()?.parse::<u32>().ok()?;
            Some(AudioStreamInfo {
                sample_rate,
                channels: s.channels.unwrap_or(1),
            })
        });

    Ok(MediaInfo {
        duration_secs,
        width: video.width.unwrap_or(0),
        height: video.height.unwrap_or(0),
        audio,
    })
}

fn f32le_samples(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

fn subclip_args(window: &ClipWindow, output: &Path, settings: &EncodeSettings) -> Vec<String> {
    let mut args: Vec<String> = ["-y", "-nostdin", "-v", "error", "-ss"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    args.push(secs_arg(window.start_secs));
    args.push("-i".to_string());
    args.push(window.source.to_string_lossy().into_owned());
    args.push("-t".to_string());
    args.push(secs_arg(window.duration_secs()));
    args.extend(["-map", "0:v:0", "-map", "0:a:0?"].iter().map(|s| s.to_string()));
    args.extend(codec_args(settings, true));
    args.push(output.to_string_lossy().into_owned());
    args
}

fn codec_args(settings: &EncodeSettings, with_audio: bool) -> Vec<String> {
    let mut args = vec![
        "-c:v".to_string(),
        settings.video_codec.clone(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
    ];
    if let Some(fps) = settings.fps {
        args.push("-r".to_string());
        args.push(fps.to_string());
    }
    if let Some(bitrate) = &settings.bitrate {
        args.push("-b:v".to_string());
        args.push(bitrate.clone());
    }
    if with_audio {
        args.push("-c:a".to_string());
        args.push(settings.audio_codec.clone());
    }
    args.push("-movflags".to_string());
    args.push("+faststart".to_string());
    args
}

/// Inputs and `-filter_complex` text for one composite render.
#[derive(Debug, Clone, PartialEq)]
struct CompositeGraph {
    /// One `-i` per layer, followed by one per audio segment.
    inputs: Vec<PathBuf>,
    filter: String,
    has_audio: bool,
}

fn build_composite_graph(job: &CompositeJob, fps: u32) -> CompositeGraph {
    let mut inputs: Vec<PathBuf> = Vec::with_capacity(job.layers.len() + job.audio.len());
    let mut chains: Vec<String> = Vec::new();

    chains.push(format!(
        "color=c=black:s={}x{}:d={}:r={}[base0]",
        job.canvas.width,
        job.canvas.height,
        secs_arg(job.duration_secs),
        fps
    ));

    for (i, layer) in job.layers.iter().enumerate() {
        let input = inputs.len();
        inputs.push(layer.source.clone());

        let mut chain = format!(
            "[{input}:v]setpts=PTS-STARTPTS,scale={}:{},setsar=1",
            layer.size.width, layer.size.height
        );
        if layer.pre_roll_secs > 0.0 {
            chain.push_str(&format!(
                ",tpad=start_duration={}:color=black",
                secs_arg(layer.pre_roll_secs)
            ));
        }
        chain.push_str(&format!(
            ",setpts=PTS+{}/TB[v{i}]",
            secs_arg(layer.start_secs)
        ));
        chains.push(chain);

        chains.push(format!(
            "[base{i}][v{i}]overlay=x={}:y={}:eof_action=pass:enable='gte(t,{})'[base{}]",
            layer.x,
            layer.y,
            secs_arg(layer.start_secs),
            i + 1
        ));
    }

    let last = job.layers.len();
    if job.rotate_ccw_90 {
        chains.push(format!("[base{last}]transpose=2,format=yuv420p[vout]"));
    } else {
        chains.push(format!("[base{last}]format=yuv420p[vout]"));
    }

    let has_audio = !job.audio.is_empty();
    if has_audio {
        let mut labels = String::new();
        for (k, segment) in job.audio.iter().enumerate() {
            let input = inputs.len();
            inputs.push(segment.source.clone());

            let mut chain = format!(
                "[{input}:a]atrim=0:{},asetpts=PTS-STARTPTS,aresample={MIX_SAMPLE_RATE},\
                 aformat=sample_fmts=fltp:channel_layouts=stereo",
                secs_arg(segment.duration_secs)
            );
            if job.audio_mode == AudioMixMode::Mix {
                let delay_ms = (segment.start_secs.max(0.0) * 1000.0).round() as u64;
                chain.push_str(&format!(",adelay=delays={delay_ms}:all=1"));
            }
            chain.push_str(&format!("[a{k}]"));
            chains.push(chain);
            labels.push_str(&format!("[a{k}]"));
        }

        let count = job.audio.len();
        match job.audio_mode {
            AudioMixMode::Concatenate => {
                chains.push(format!("{labels}concat=n={count}:v=0:a=1[aout]"));
            }
            AudioMixMode::Mix => {
                chains.push(format!(
                    "{labels}amix=inputs={count}:duration=longest:normalize=0[aout]"
                ));
            }
        }
    }

    CompositeGraph {
        inputs,
        filter: chains.join(";"),
        has_audio,
    }
}

fn composite_args(job: &CompositeJob, output: &Path, settings: &EncodeSettings) -> Vec<String> {
    let fps = settings.fps.unwrap_or(defaults::OUTPUT_VIDEO_FPS);
    let graph = build_composite_graph(job, fps);

    let mut args: Vec<String> = ["-y", "-nostdin", "-v", "error", "-progress", "pipe:1", "-nostats"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    for input in &graph.inputs {
        args.push("-i".to_string());
        args.push(input.to_string_lossy().into_owned());
    }
    args.push("-filter_complex".to_string());
    args.push(graph.filter);
    args.push("-map".to_string());
    args.push("[vout]".to_string());
    if graph.has_audio {
        args.push("-map".to_string());
        args.push("[aout]".to_string());
    }
    args.push("-t".to_string());
    args.push(secs_arg(job.duration_secs));
    args.extend(codec_args(
        &EncodeSettings {
            fps: Some(fps),
            ..settings.clone()
        },
        graph.has_audio,
    ));
    args.push(output.to_string_lossy().into_owned());
    args
}

fn secs_arg(secs: f64) -> String {
    format!("{secs:.3}")
}

fn command_exists(binary: &Path) -> bool {
    Command::new(binary)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[derive(Debug, Default)]
struct ProgressState {
    out_time_secs: f64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            // ffmpeg reports microseconds under both keys.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }
}

fn progress_report(state: &ProgressState, expected_duration_secs: f64) -> Progress {
    let fraction = if state.complete {
        1.0
    } else if expected_duration_secs <= 0.0 {
        0.0
    } else {
        (state.out_time_secs / expected_duration_secs).clamp(0.0, 1.0)
    };

    Progress {
        stage: Stage::Rendering,
        completed: (fraction * RENDER_PROGRESS_TOTAL as f64).round() as u64,
        total: RENDER_PROGRESS_TOTAL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{AudioSegment, VideoLayer};
    use montage_media_model::grid::Canvas;

    fn layer(source: &str, start: f64, x: u32, y: u32) -> VideoLayer {
        VideoLayer {
            source: PathBuf::from(source),
            start_secs: start,
            pre_roll_secs: 0.0,
            x,
            y,
            size: Canvas::new(540, 302),
        }
    }

    fn job(audio_mode: AudioMixMode, rotate: bool) -> CompositeJob {
        CompositeJob {
            canvas: Canvas::new(1080, 1920),
            duration_secs: 3.0,
            layers: vec![layer("a.mp4", 0.0, 0, 0), layer("b.mp4", 1.0, 540, 960)],
            audio: vec![
                AudioSegment {
                    source: PathBuf::from("a.mp4"),
                    start_secs: 0.0,
                    duration_secs: 1.0,
                },
                AudioSegment {
                    source: PathBuf::from("b.mp4"),
                    start_secs: 1.0,
                    duration_secs: 2.0,
                },
            ],
            audio_mode,
            rotate_ccw_90: rotate,
        }
    }

    #[test]
    fn test_parse_probe_video_with_audio() {
        let json = r#"{
            "streams": [
                {"codec_type": "video", "width": 1920, "height": 1080, "duration": "9.5"},
                {"codec_type": "audio", "sample_rate": "44100", "channels": 2}
            ],
            "format": {"duration": "10.000000"}
        }"#;
        let info = parse_probe(json).unwrap();
        assert_eq!(info.duration_secs, 10.0);
        assert_eq!(info.frame_size(), Canvas::new(1920, 1080));
        assert_eq!(
            info.audio,
            Some(AudioStreamInfo {
                sample_rate: 44100,
                channels: 2
            })
        );
    }

    #[test]
    fn test_parse_probe_without_audio_or_format_duration() {
        let json = r#"{"streams": [{"codec_type": "video", "width": 640, "height": 480, "duration": "4.2"}]}"#;
        let info = parse_probe(json).unwrap();
        assert_eq!(info.duration_secs, 4.2);
        assert!(!info.has_audio());
    }

    #[test]
    fn test_parse_probe_rejects_audio_only() {
        let json = r#"{"streams": [{"codec_type": "audio", "sample_rate": "8000"}], "format": {"duration": "1.0"}}"#;
        assert!(parse_probe(json).is_err());
        assert!(parse_probe("not json").is_err());
    }

    #[test]
    fn test_f32le_samples_ignores_trailing_bytes() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0.5f32.to_le_bytes());
        bytes.extend_from_slice(&(-1.0f32).to_le_bytes());
        bytes.push(7);
        assert_eq!(f32le_samples(&bytes), vec![0.5, -1.0]);
    }

    #[test]
    fn test_subclip_args_seek_and_duration() {
        let window = ClipWindow::new("in.mp4", 3.0, 8.0, 10.0).unwrap();
        let args = subclip_args(&window, Path::new("out.mp4"), &EncodeSettings::clip_defaults());
        let joined = args.join(" ");
        assert!(joined.contains("-ss 3.000 -i in.mp4 -t 5.000"));
        assert!(joined.contains("-c:v libx264"));
        assert!(joined.contains("-c:a aac"));
        assert!(!joined.contains("-b:v"));
        assert_eq!(args.last().map(String::as_str), Some("out.mp4"));
    }

    #[test]
    fn test_graph_overlays_in_layer_order() {
        let graph = build_composite_graph(&job(AudioMixMode::Concatenate, false), 30);
        assert_eq!(graph.inputs.len(), 4);
        assert!(graph.filter.starts_with("color=c=black:s=1080x1920:d=3.000:r=30[base0]"));
        let first = graph.filter.find("[base0][v0]overlay=x=0:y=0").unwrap();
        let second = graph.filter.find("[base1][v1]overlay=x=540:y=960").unwrap();
        assert!(first < second);
        assert!(graph.filter.contains("setpts=PTS+1.000/TB[v1]"));
        assert!(graph.filter.contains("[base2]format=yuv420p[vout]"));
        assert!(!graph.filter.contains("transpose"));
    }

    #[test]
    fn test_graph_concatenates_audio_by_default() {
        let graph = build_composite_graph(&job(AudioMixMode::Concatenate, false), 30);
        assert!(graph.has_audio);
        assert!(graph.filter.contains("[2:a]atrim=0:1.000"));
        assert!(graph.filter.contains("[3:a]atrim=0:2.000"));
        assert!(graph.filter.contains("[a0][a1]concat=n=2:v=0:a=1[aout]"));
        assert!(!graph.filter.contains("adelay"));
    }

    #[test]
    fn test_graph_mix_mode_delays_each_segment() {
        let graph = build_composite_graph(&job(AudioMixMode::Mix, false), 30);
        assert!(graph.filter.contains("adelay=delays=1000:all=1[a1]"));
        assert!(graph.filter.contains("amix=inputs=2"));
    }

    #[test]
    fn test_graph_rotation_and_pre_roll() {
        let mut job = job(AudioMixMode::Concatenate, true);
        job.layers[0].pre_roll_secs = 0.5;
        job.audio.clear();
        let graph = build_composite_graph(&job, 24);
        assert!(graph.filter.contains("tpad=start_duration=0.500:color=black"));
        assert!(graph.filter.contains("transpose=2,format=yuv420p[vout]"));
        assert!(!graph.has_audio);
        assert_eq!(graph.inputs.len(), 2);
    }

    #[test]
    fn test_composite_args_map_audio_only_when_present() {
        let settings = EncodeSettings {
            video_codec: "libx264".into(),
            audio_codec: "aac".into(),
            fps: Some(30),
            bitrate: Some("5000k".into()),
        };
        let args = composite_args(
            &job(AudioMixMode::Concatenate, false),
            Path::new("out.mp4"),
            &settings,
        );
        assert!(args.windows(2).any(|w| w[0] == "-map" && w[1] == "[aout]"));
        assert!(args.windows(2).any(|w| w[0] == "-b:v" && w[1] == "5000k"));
        assert!(args.windows(2).any(|w| w[0] == "-t" && w[1] == "3.000"));

        let mut silent = job(AudioMixMode::Concatenate, false);
        silent.audio.clear();
        let args = composite_args(&silent, Path::new("out.mp4"), &settings);
        assert!(!args.iter().any(|a| a == "[aout]"));
        assert!(!args.iter().any(|a| a == "-c:a"));
    }

    #[test]
    fn test_progress_report_clamps_and_completes() {
        let mut state = ProgressState::default();
        state.update("out_time_us", "1500000");
        assert_eq!(progress_report(&state, 3.0).completed, 500);
        state.update("out_time_ms", "9000000");
        assert_eq!(progress_report(&state, 3.0).completed, 1000);
        state.out_time_secs = 0.0;
        state.update("progress", "end");
        assert_eq!(progress_report(&state, 3.0).completed, 1000);
        assert_eq!(progress_report(&ProgressState::default(), 0.0).completed, 0);
    }
}
