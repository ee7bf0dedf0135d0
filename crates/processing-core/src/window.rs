//! Clip windows around detected peaks.

use std::path::Path;

use montage_media_model::clip::{ClipWindow, ExtractedClipName, PeakEvent};

/// Window `[peak - pre, peak + post]` clamped to `[0, source_duration]`.
///
/// Returns `None` when the clamped window is shorter than
/// [`montage_media_model::clip::MIN_CLIP_DURATION_SECS`].
pub fn clip_window(
    source: &Path,
    peak_secs: f64,
    pre_secs: f64,
    post_secs: f64,
    source_duration: f64,
) -> Option<ClipWindow> {
    let start = (peak_secs - pre_secs).max(0.0);
    let end = (peak_secs + post_secs).min(source_duration);
    ClipWindow::new(source, start, end, source_duration)
}

/// What to do for one (peak, post-roll) pair.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowPlan {
    /// Render `window` to a file called `name`.
    Render {
        window: ClipWindow,
        name: ExtractedClipName,
    },
    /// The clamped window was too short and is dropped.
    TooShort {
        ordinal: usize,
        peak_secs: f64,
        post_secs: f64,
    },
}

/// Plan every clip for one source: peaks in order, and for each peak every
/// post-roll value in order.
pub fn plan_clip_windows(
    source: &Path,
    base_name: &str,
    peaks: &[PeakEvent],
    pre_secs: f64,
    post_values: &[f64],
    source_duration: f64,
) -> Vec<WindowPlan> {
    let mut plans = Vec::with_capacity(peaks.len() * post_values.len());
    for (i, peak) in peaks.iter().enumerate() {
        let ordinal = i + 1;
        for &post_secs in post_values {
            match clip_window(source, peak.time_secs, pre_secs, post_secs, source_duration) {
                Some(window) => plans.push(WindowPlan::Render {
                    window,
                    name: ExtractedClipName::new(base_name, ordinal, peak.time_secs, post_secs),
                }),
                None => plans.push(WindowPlan::TooShort {
                    ordinal,
                    peak_secs: peak.time_secs,
                    post_secs,
                }),
            }
        }
    }
    plans
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_inside_source() {
        let w = clip_window(Path::new("a.mp4"), 5.0, 2.0, 3.0, 10.0).unwrap();
        assert_eq!((w.start_secs, w.end_secs), (3.0, 8.0));
    }

    #[test]
    fn test_window_clamped_at_both_ends() {
        let w = clip_window(Path::new("a.mp4"), 1.0, 3.0, 2.0, 10.0).unwrap();
        assert_eq!((w.start_secs, w.end_secs), (0.0, 3.0));

        let w = clip_window(Path::new("a.mp4"), 9.5, 1.0, 2.0, 10.0).unwrap();
        assert_eq!((w.start_secs, w.end_secs), (8.5, 10.0));
    }

    #[test]
    fn test_too_short_window_is_dropped() {
        // No pre-roll and the peak sits at the very end of the source.
        assert!(clip_window(Path::new("a.mp4"), 9.95, 0.0, 2.0, 10.0).is_none());
    }

    #[test]
    fn test_plan_orders_peaks_then_post_values() {
        let peaks = [
            PeakEvent {
                sample_index: 100,
                time_secs: 1.0,
            },
            PeakEvent {
                sample_index: 995,
                time_secs: 9.95,
            },
        ];
        let plans = plan_clip_windows(Path::new("src.mp4"), "src", &peaks, 0.0, &[1.0, 2.0], 10.0);
        assert_eq!(plans.len(), 4);

        let names: Vec<String> = plans
            .iter()
            .filter_map(|p| match p {
                WindowPlan::Render { name, .. } => Some(name.file_name()),
                WindowPlan::TooShort { .. } => None,
            })
            .collect();
        assert_eq!(
            names,
            vec!["src_clip_1_1000ms_post1.0s.mp4", "src_clip_1_1000ms_post2.0s.mp4"]
        );
        assert!(matches!(
            plans[2],
            WindowPlan::TooShort { ordinal: 2, .. }
        ));
    }
}
