/// Host transport as seen at the start of one audio block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HostTransport {
    pub is_playing: bool,
    /// Position in quarter notes at the first sample of the block.
    pub ppq_position: f64,
    pub tempo_bpm: f64,
    pub sample_rate: f64,
    /// Only used for bar shading in the editor.
    pub time_sig_numerator: u32,
    pub time_sig_denominator: u32,
}

impl Default for HostTransport {
    fn default() -> Self {
        Self {
            is_playing: false,
            ppq_position: 0.0,
            tempo_bpm: 120.0,
            sample_rate: 44100.0,
            time_sig_numerator: 4,
            time_sig_denominator: 4,
        }
    }
}

impl HostTransport {
    /// Quarter notes covered by `num_samples` at the current tempo.
    pub fn beats_for_samples(&self, num_samples: u32) -> f64 {
        beats_for_samples(num_samples, self.tempo_bpm, self.sample_rate)
    }

    /// Start and end tick of a block of `num_samples` samples.
    pub fn block_ticks(&self, num_samples: u32, timebase: u32) -> (f64, f64) {
        let start = self.ppq_position * timebase as f64;
        let span = beats_for_samples(num_samples, self.tempo_bpm * timebase as f64, self.sample_rate);
        (start, start + span)
    }

    /// The transport one block later, for hosts simulated offline.
    pub fn advanced(&self, num_samples: u32) -> Self {
        let mut next = *self;
        if self.is_playing {
            next.ppq_position += self.beats_for_samples(num_samples);
        }
        next
    }

    /// Ticks per bar for the current time signature.
    pub fn bar_length_ticks(&self, timebase: u32) -> f64 {
        if self.time_sig_denominator == 0 {
            return timebase as f64 * 4.0;
        }
        timebase as f64 * self.time_sig_numerator as f64 * 4.0 / self.time_sig_denominator as f64
    }
}

/// Beats elapsed over `num_samples`; 0 when tempo or rate are unusable.
/// Multiplies before dividing so whole-tick block boundaries stay exact.
pub(crate) fn beats_for_samples(num_samples: u32, tempo_bpm: f64, sample_rate: f64) -> f64 {
    if !(tempo_bpm > 0.0 && tempo_bpm.is_finite() && sample_rate > 0.0) {
        return 0.0;
    }
    num_samples as f64 * tempo_bpm / (60.0 * sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_ticks_scale_with_timebase() {
        let t = HostTransport {
            is_playing: true,
            ppq_position: 1.0,
            tempo_bpm: 120.0,
            sample_rate: 48000.0,
            ..HostTransport::default()
        };
        // 120 bpm = 2 beats/s; 24000 samples = half a second = 1 beat
        let (start, end) = t.block_ticks(24000, 96);
        assert_eq!(start, 96.0);
        assert!((end - 192.0).abs() < 1e-9);
    }

    #[test]
    fn advanced_only_moves_while_playing() {
        let mut t = HostTransport::default();
        assert_eq!(t.advanced(44100).ppq_position, 0.0);
        t.is_playing = true;
        assert!((t.advanced(44100).ppq_position - 2.0).abs() < 1e-9);
    }

    #[test]
    fn unusable_tempo_does_not_advance() {
        let t = HostTransport {
            tempo_bpm: 0.0,
            ..HostTransport::default()
        };
        let (start, end) = t.block_ticks(512, 96);
        assert_eq!(start, end);
    }

    #[test]
    fn bar_length() {
        let mut t = HostTransport::default();
        assert_eq!(t.bar_length_ticks(96), 384.0);
        t.time_sig_numerator = 6;
        t.time_sig_denominator = 8;
        assert_eq!(t.bar_length_ticks(96), 288.0);
    }
}
