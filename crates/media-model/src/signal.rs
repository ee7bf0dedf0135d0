//! Decoded audio used for peak detection.

/// Mono amplitude samples at a fixed sample rate.
///
/// Multi-channel sources are reduced to their first channel by the decoder;
/// no downmix is performed.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSignal {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioSignal {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Build a mono signal from interleaved frames by keeping channel 0.
    pub fn first_channel(interleaved: &[f32], channels: usize, sample_rate: u32) -> Self {
        let channels = channels.max(1);
        let samples = interleaved.iter().step_by(channels).copied().collect();
        Self::new(samples, sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration covered by the samples.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Time of the sample at `index`.
    pub fn time_of(&self, index: usize) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        index as f64 / self.sample_rate as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_channel_takes_left_samples() {
        let interleaved = [0.1, -0.9, 0.2, -0.8, 0.3, -0.7];
        let signal = AudioSignal::first_channel(&interleaved, 2, 4);
        assert_eq!(signal.samples(), &[0.1, 0.2, 0.3]);
        assert!((signal.duration_secs() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_time_of_sample() {
        let signal = AudioSignal::new(vec![0.0; 48_000], 48_000);
        assert!((signal.time_of(24_000) - 0.5).abs() < 1e-9);
        assert!((signal.duration_secs() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_rate_is_harmless() {
        let signal = AudioSignal::new(vec![1.0], 0);
        assert_eq!(signal.duration_secs(), 0.0);
        assert_eq!(signal.time_of(10), 0.0);
    }
}
