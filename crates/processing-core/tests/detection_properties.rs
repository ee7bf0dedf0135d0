use std::collections::BTreeSet;
use std::path::Path;

use montage_media_model::clip::MIN_CLIP_DURATION_SECS;
use montage_media_model::signal::AudioSignal;
use montage_processing_core::peak::{PeakDetector, PeakDetectorConfig};
use montage_processing_core::window::{clip_window, plan_clip_windows, WindowPlan};
use proptest::prelude::*;

const RATE: u32 = 200;

fn detect_indices(signal: &AudioSignal, threshold: f64) -> BTreeSet<usize> {
    PeakDetector::new(PeakDetectorConfig::with_threshold(threshold))
        .detect(signal)
        .map(|p| p.sample_index)
        .collect()
}

fn signal_strategy() -> impl Strategy<Value = AudioSignal> {
    prop::collection::vec(-1.0f32..=1.0f32, 3..2_000)
        .prop_map(|samples| AudioSignal::new(samples, RATE))
}

proptest! {
    #[test]
    fn higher_threshold_gives_subset(
        signal in signal_strategy(),
        a in 0.0f64..=1.0,
        b in 0.0f64..=1.0,
    ) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let at_low = detect_indices(&signal, low);
        let at_high = detect_indices(&signal, high);
        prop_assert!(at_high.is_subset(&at_low));
    }

    #[test]
    fn peaks_respect_min_separation(signal in signal_strategy(), threshold in 0.0f64..=1.0) {
        let detector = PeakDetector::new(PeakDetectorConfig::with_threshold(threshold));
        let times: Vec<f64> = detector.detect(&signal).map(|p| p.time_secs).collect();
        for pair in times.windows(2) {
            prop_assert!(pair[1] > pair[0]);
            prop_assert!(pair[1] - pair[0] >= 0.5 - 1e-9);
        }
    }

    #[test]
    fn emitted_windows_are_well_formed(
        peak in 0.0f64..20.0,
        pre in 0.0f64..5.0,
        post in 0.0f64..5.0,
        duration in 0.0f64..20.0,
    ) {
        if let Some(w) = clip_window(Path::new("src.mp4"), peak, pre, post, duration) {
            prop_assert!(w.start_secs >= 0.0);
            prop_assert!(w.start_secs < w.end_secs);
            prop_assert!(w.end_secs <= duration);
            prop_assert!(w.duration_secs() >= MIN_CLIP_DURATION_SECS);
        }
    }
}

#[test]
fn single_spike_gives_single_window() {
    // 10 s mono, one 0.5 spike at t=5 s.
    let mut samples = vec![0.0f32; 10 * 1_000];
    samples[5_000] = 0.5;
    let signal = AudioSignal::new(samples, 1_000);

    let peaks: Vec<_> = PeakDetector::new(PeakDetectorConfig::with_threshold(0.3))
        .detect(&signal)
        .collect();
    let plans = plan_clip_windows(Path::new("src.mp4"), "src", &peaks, 2.0, &[3.0], 10.0);

    assert_eq!(plans.len(), 1);
    match &plans[0] {
        WindowPlan::Render { window, name } => {
            assert!((window.start_secs - 3.0).abs() < 1e-9);
            assert!((window.end_secs - 8.0).abs() < 1e-9);
            assert_eq!(name.file_name(), "src_clip_1_5000ms_post3.0s.mp4");
        }
        other => panic!("expected a rendered window, got {other:?}"),
    }
}
