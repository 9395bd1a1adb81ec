/// Sample rate for the SDR.
pub const SDR_SAMPLE_RATE: u32 = 1_000_000;
/// Wideband rate fed to the channelizer.
pub const RESAMPLE_RATE: u32 = 200_000;
/// Number of channels in the band.
pub const NUM_CHANNELS: usize = 16;
/// Rate of each channel stream, which is also the audio rate.
pub const AUDIO_SAMPLE_RATE: u32 = RESAMPLE_RATE / NUM_CHANNELS as u32;

/// Maximum number of complex samples read from the SDR per block.
pub const SDR_INPUT_CHUNK: usize = 100_000;
/// Upper bound on a blocking SDR read.
pub const SDR_READ_TIMEOUT_MS: u64 = 200;

/// Center of the PMR446 band (Hz).
pub const SDR_FREQUENCY: f64 = 446.1e6;
/// Spacing between adjacent channels (Hz).
pub const CHANNEL_SPACING: f64 = 12_500.0;
/// Tuner gain (dB).
pub const DEFAULT_GAIN: f64 = 42.0;
/// Audio gain applied after the high-pass filter.
pub const DEFAULT_AUDIO_GAIN: f32 = 4.0;
/// Channel squelch level (dB).
pub const DEFAULT_SQUELCH: f32 = -5.0;
/// Margin below the squelch level before a tuned channel is released (dB).
pub const DEFAULT_HYSTERESIS: f32 = 5.0;
/// Consecutive identical CTCSS evaluations required before reporting a code.
pub const DEFAULT_CTCSS_DEBOUNCE: usize = 5;

/// DC blocker pole distance from the unit circle.
pub const DC_BLOCK_ALPHA: f32 = 0.0005;
/// Stopband attenuation of the wideband resampler (dB).
pub const RESAMPLER_ATTEN: f32 = 60.0;
/// Filter semi-length of each channelizer branch, in symbols.
pub const CHANNELIZER_SEMI_LEN: usize = 13;
/// Stopband attenuation of the channelizer prototype (dB).
pub const CHANNELIZER_ATTEN: f32 = 80.0;
/// FM demodulator deviation (Hz).
pub const FM_DEVIATION: u32 = AUDIO_SAMPLE_RATE / 2;

/// Nominal CTCSS PLL center frequency (Hz).
pub const CTCSS_CENTER_FREQ: f32 = 150.0;
/// CTCSS PLL loop gain.
pub const CTCSS_LOOP_GAIN: f32 = 8.0;
/// Cutoff of the CTCSS loop and lock filters (Hz).
pub const CTCSS_FILTER_CUTOFF: f32 = 5.0;
/// Lock detector threshold.
pub const CTCSS_LOCK_THRESHOLD: f32 = 0.7;
/// CTCSS input AGC bandwidth.
pub const CTCSS_AGC_BANDWIDTH: f32 = 1e-3;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn verify_sample_rate() {
        assert_eq!(AUDIO_SAMPLE_RATE, 12_500);
        assert_eq!(SDR_SAMPLE_RATE % RESAMPLE_RATE, 0);
        assert_eq!(RESAMPLE_RATE as f64 / NUM_CHANNELS as f64, CHANNEL_SPACING);
    }
}
