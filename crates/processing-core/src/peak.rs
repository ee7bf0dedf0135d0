//! Amplitude peak detection.
//!
//! A peak is a local maximum of `|sample|` (flat tops resolve to their middle
//! sample) whose height reaches the threshold. Peaks closer than the minimum
//! separation are suppressed in favor of the higher one, tallest first.

use montage_common::error::{MontageError, MontageResult};
use montage_media_model::clip::PeakEvent;
use montage_media_model::signal::AudioSignal;

/// Minimum spacing between reported peaks (seconds).
pub const MIN_PEAK_SEPARATION_SECS: f64 = 0.5;

/// Peak detection parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakDetectorConfig {
    /// Minimum absolute amplitude, in [0.0, 1.0].
    pub threshold: f64,

    /// Minimum spacing between peaks (seconds).
    pub min_separation_secs: f64,
}

impl Default for PeakDetectorConfig {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            min_separation_secs: MIN_PEAK_SEPARATION_SECS,
        }
    }
}

impl PeakDetectorConfig {
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            threshold,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> MontageResult<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(MontageError::config(format!(
                "audio peak threshold must be within [0, 1], got {}",
                self.threshold
            )));
        }
        if !(self.min_separation_secs.is_finite() && self.min_separation_secs >= 0.0) {
            return Err(MontageError::config(format!(
                "minimum peak separation must be non-negative, got {}",
                self.min_separation_secs
            )));
        }
        Ok(())
    }
}

/// Peak detection engine.
#[derive(Debug, Clone)]
pub struct PeakDetector {
    config: PeakDetectorConfig,
}

impl PeakDetector {
    pub fn new(config: PeakDetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PeakDetectorConfig {
        &self.config
    }

    /// Separation in samples, rounded up so that reported peaks are never
    /// closer than `min_separation_secs`.
    pub fn min_distance_samples(&self, sample_rate: u32) -> usize {
        ((self.config.min_separation_secs * sample_rate as f64).ceil() as usize).max(1)
    }

    /// Detect peaks in `signal`, in ascending time order.
    ///
    /// An empty result is a normal outcome.
    pub fn detect<'a>(&self, signal: &'a AudioSignal) -> PeakEvents<'a> {
        let magnitudes: Vec<f64> = signal.samples().iter().map(|s| s.abs() as f64).collect();

        let candidates: Vec<usize> = local_maxima(&magnitudes)
            .into_iter()
            .filter(|&idx| magnitudes[idx] >= self.config.threshold)
            .collect();

        let distance = self.min_distance_samples(signal.sample_rate());
        let kept = suppress_close_peaks(&candidates, &magnitudes, distance);

        tracing::debug!(
            candidates = candidates.len(),
            kept = kept.len(),
            threshold = self.config.threshold,
            distance_samples = distance,
            "Peak detection finished"
        );

        PeakEvents {
            signal,
            indices: kept.into_iter(),
        }
    }
}

/// Detected peaks, converted to [`PeakEvent`]s as they are pulled.
#[derive(Debug)]
pub struct PeakEvents<'a> {
    signal: &'a AudioSignal,
    indices: std::vec::IntoIter<usize>,
}

impl Iterator for PeakEvents<'_> {
    type Item = PeakEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.indices.next().map(|sample_index| PeakEvent {
            sample_index,
            time_secs: self.signal.time_of(sample_index),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.indices.size_hint()
    }
}

impl ExactSizeIterator for PeakEvents<'_> {}

/// Indices of strict local maxima. A plateau counts once, at its middle;
/// the first and last samples never qualify.
fn local_maxima(x: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if x.len() < 3 {
        return peaks;
    }

    let i_max = x.len() - 1;
    let mut i = 1;
    while i < i_max {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead < i_max && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                let left = i;
                let right = ahead - 1;
                peaks.push((left + right) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    peaks
}

/// Non-maximum suppression: visit peaks tallest first and drop any
/// neighbor within `distance` samples. Input and output are ascending.
fn suppress_close_peaks(peaks: &[usize], heights: &[f64], distance: usize) -> Vec<usize> {
    let mut keep = vec![true; peaks.len()];

    let mut by_height: Vec<usize> = (0..peaks.len()).collect();
    by_height.sort_by(|&a, &b| heights[peaks[a]].total_cmp(&heights[peaks[b]]));

    for &j in by_height.iter().rev() {
        if !keep[j] {
            continue;
        }

        let mut k = j;
        while k > 0 && peaks[j] - peaks[k - 1] < distance {
            keep[k - 1] = false;
            k -= 1;
        }

        let mut k = j + 1;
        while k < peaks.len() && peaks[k] - peaks[j] < distance {
            keep[k] = false;
            k += 1;
        }
    }

    peaks
        .iter()
        .zip(keep)
        .filter_map(|(&p, keep)| keep.then_some(p))
        .collect()
}
