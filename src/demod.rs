//! FM demodulation and audio shaping for the active channel.

use demod_fm::FmDemod;
use num::complex::Complex32;
use static_fir::FirFilter as FIRFilter;

use config::Config;
use filters::{Deemphasis, Delay};
use taps::{HighpassFir, LowpassFir, HIGHPASS_DELAY};

/// Splits demodulated audio into speech and sub-audible branches and shapes the speech.
pub struct AudioChain {
    /// Removes the sub-audible band.
    highpass: FIRFilter<HighpassFir>,
    /// Matches the high-pass group delay.
    delay: Delay,
    gain: f32,
    deemph: Deemphasis,
    /// Optional hiss filter.
    lowpass: Option<FIRFilter<LowpassFir>>,
}

impl AudioChain {
    pub fn new(config: &Config) -> Self {
        AudioChain {
            highpass: FIRFilter::new(),
            delay: Delay::new(HIGHPASS_DELAY),
            gain: config.audio_gain,
            deemph: Deemphasis::new(config.deemph),
            lowpass: if config.lowpass {
                Some(FIRFilter::new())
            } else {
                None
            },
        }
    }

    /// Feed in a demodulated sample, producing the next audio and sub-audible samples.
    pub fn feed(&mut self, x: f32) -> (f32, f32) {
        let speech = self.highpass.feed(x);
        let subtone = self.delay.feed(x) - speech;

        let mut audio = self.deemph.feed(speech * self.gain);

        if let Some(ref mut lp) = self.lowpass {
            audio = lp.feed(audio);
        }

        (audio, subtone)
    }
}

/// Demodulator bound to the active channel.
pub struct Demodulator {
    fm: FmDemod,
    /// Frequency deviation (Hz).
    deviation: u32,
    /// Channel sample rate (Hz).
    rate: u32,
    chain: AudioChain,
    /// Shaped audio for the last block.
    audio: Vec<f32>,
    /// Sub-audible branch for the last block.
    subtone: Vec<f32>,
}

impl Demodulator {
    /// Create a new `Demodulator` for FM with the given deviation (Hz).
    pub fn new(config: &Config, deviation: u32) -> Self {
        let cap = config.max_channel_len();
        let rate = config.audio_rate();

        Demodulator {
            fm: FmDemod::new(deviation, rate),
            deviation: deviation,
            rate: rate,
            chain: AudioChain::new(config),
            audio: Vec::with_capacity(cap),
            subtone: Vec::with_capacity(cap),
        }
    }

    /// Demodulate a block of channel samples.
    pub fn process(&mut self, samples: &[Complex32]) {
        self.audio.clear();
        self.subtone.clear();

        for &s in samples {
            let (audio, subtone) = self.chain.feed(self.fm.feed(s));

            self.audio.push(audio);
            self.subtone.push(subtone);
        }
    }

    pub fn audio(&self) -> &[f32] { &self.audio[..] }

    pub fn subtone(&self) -> &[f32] { &self.subtone[..] }

    /// Forget the phase of the previous channel.
    pub fn reset(&mut self) {
        self.fm = FmDemod::new(self.deviation, self.rate);
    }
}
