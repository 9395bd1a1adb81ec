//! Receiver configuration.

use std::fmt;
use std::str::FromStr;

use consts::*;
use ctcss::ToneTable;
use error::{Error, Result};

/// How the receiver behaves once a channel is tuned.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum LockMode {
    /// Stay on the first channel found until it drops out.
    Start,
    /// Follow the strongest enabled channel every block.
    Max,
}

impl FromStr for LockMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "start" => Ok(LockMode::Start),
            "max" => Ok(LockMode::Max),
            _ => Err(Error::Config(format!("unknown lock mode '{}' (start|max)", s))),
        }
    }
}

/// Which de-emphasis filter shapes the audio.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum DeemphKind {
    /// Single pole IIR for a 50us time constant.
    Iir,
    /// Linear phase FIR approximation.
    Fir,
}

impl FromStr for DeemphKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "iir" => Ok(DeemphKind::Iir),
            "fir" => Ok(DeemphKind::Fir),
            _ => Err(Error::Config(format!("unknown de-emphasis '{}' (iir|fir)", s))),
        }
    }
}

/// Set of channels eligible for scanning, as a bitmask over 0-based channel indexes.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct ChannelMask(u32);

impl ChannelMask {
    /// Mask with the first `count` channels enabled.
    pub fn all(count: usize) -> Self {
        if count >= 32 {
            ChannelMask(!0)
        } else {
            ChannelMask((1 << count) - 1)
        }
    }

    #[cfg(test)]
    pub fn from_bits(bits: u32) -> Self { ChannelMask(bits) }

    pub fn bits(&self) -> u32 { self.0 }

    pub fn is_empty(&self) -> bool { self.0 == 0 }

    /// Whether the given 0-based channel is enabled.
    pub fn contains(&self, chan: usize) -> bool {
        chan < 32 && self.0 & (1 << chan) != 0
    }

    /// Iterate enabled channels in ascending order.
    pub fn iter<'a>(&'a self) -> impl Iterator<Item = usize> + 'a {
        (0..32).filter(move |&c| self.contains(c))
    }

    /// Parse the `1,2,8-16` syntax, where channel numbers are 1-based and must lie in
    /// `1..=count`.
    pub fn parse(s: &str, count: usize) -> Result<Self> {
        let mut bits = 0u32;

        for part in s.split(',').map(str::trim) {
            if part.is_empty() {
                continue;
            }

            let (lo, hi) = match part.find('-') {
                Some(idx) => (parse_chan(&part[..idx], count)?,
                              parse_chan(&part[idx + 1..], count)?),
                None => {
                    let c = parse_chan(part, count)?;
                    (c, c)
                },
            };

            if lo > hi {
                return Err(Error::Config(format!("empty channel range '{}'", part)));
            }

            for c in lo..hi + 1 {
                bits |= 1 << (c - 1);
            }
        }

        Ok(ChannelMask(bits))
    }
}

fn parse_chan(s: &str, count: usize) -> Result<usize> {
    let c: usize = s.trim().parse().map_err(|_|
        Error::Config(format!("invalid channel number '{}'", s)))?;

    if c < 1 || c > count {
        return Err(Error::Config(format!(
            "channels in the channel mask must be in the range 1-{} (got {})", count, c)));
    }

    Ok(c)
}

impl fmt::Debug for ChannelMask {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ChannelMask(0x{:04X})", self.0)
    }
}

/// Immutable receiver settings.
#[derive(Clone, Debug)]
pub struct Config {
    /// Radio sample rate (Hz).
    pub sdr_rate: u32,
    /// Channelizer input rate (Hz).
    pub resample_rate: u32,
    /// Number of channels produced by the channelizer.
    pub num_channels: usize,
    /// Maximum samples per acquisition block.
    pub chunk: usize,
    /// Center frequency of the band (Hz).
    pub frequency: f64,
    /// Tuner gain (dB).
    pub gain: f64,
    /// Squelch level (dB).
    pub squelch: f32,
    /// Release margin below the squelch level (dB).
    pub hysteresis: f32,
    /// Channels eligible for scanning.
    pub mask: ChannelMask,
    /// Behavior once tuned.
    pub lock: LockMode,
    /// Audio gain factor.
    pub audio_gain: f32,
    /// De-emphasis filter variant.
    pub deemph: DeemphKind,
    /// Whether to apply the 4.5kHz audio low-pass.
    pub lowpass: bool,
    /// CTCSS debounce count.
    pub ctcss_debounce: usize,
    /// CTCSS tone table.
    pub tones: ToneTable,
    /// Audio ring buffer capacity (samples).
    pub ring_capacity: usize,
    /// Width of the textual waterfall, or 0 to disable it.
    pub waterfall: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            sdr_rate: SDR_SAMPLE_RATE,
            resample_rate: RESAMPLE_RATE,
            num_channels: NUM_CHANNELS,
            chunk: SDR_INPUT_CHUNK,
            frequency: SDR_FREQUENCY,
            gain: DEFAULT_GAIN,
            squelch: DEFAULT_SQUELCH,
            hysteresis: DEFAULT_HYSTERESIS,
            mask: ChannelMask::all(NUM_CHANNELS),
            lock: LockMode::Start,
            audio_gain: DEFAULT_AUDIO_GAIN,
            deemph: DeemphKind::Iir,
            lowpass: false,
            ctcss_debounce: DEFAULT_CTCSS_DEBOUNCE,
            tones: ToneTable::standard(),
            ring_capacity: AUDIO_SAMPLE_RATE as usize / 3,
            waterfall: 0,
        }
    }
}

impl Config {
    /// Sample rate of each channel stream and of the audio output.
    pub fn audio_rate(&self) -> u32 {
        self.resample_rate / self.num_channels as u32
    }

    /// Largest number of resampled samples a single block can produce.
    pub fn max_resampled(&self) -> usize {
        let num = self.chunk as u64 * self.resample_rate as u64;
        let den = self.sdr_rate as u64;

        ((num + den - 1) / den) as usize + 1
    }

    /// Largest number of samples per channel stream for a single block.
    pub fn max_channel_len(&self) -> usize {
        self.max_resampled() / self.num_channels + 1
    }

    /// Check the configuration for errors that must stop the receiver before any device
    /// is opened.
    pub fn validate(&self) -> Result<()> {
        if self.num_channels == 0 || self.num_channels > 32 {
            return Err(Error::Config(format!(
                "channel count must be in 1-32 (got {})", self.num_channels)));
        }

        if self.mask.is_empty() {
            return Err(Error::Config("no channels enabled in channel mask".to_string()));
        }

        if self.mask.bits() & !ChannelMask::all(self.num_channels).bits() != 0 {
            return Err(Error::Config(format!(
                "channel mask {:?} enables channels beyond {}", self.mask, self.num_channels)));
        }

        if self.resample_rate == 0 || self.resample_rate > self.sdr_rate {
            return Err(Error::Config(format!(
                "resample rate {} must be in (0, {}]", self.resample_rate, self.sdr_rate)));
        }

        // The fixed audio filters are designed for this rate.
        if self.resample_rate != self.num_channels as u32 * AUDIO_SAMPLE_RATE {
            return Err(Error::Config(format!(
                "channel rate must be {}Hz (resample rate {} / {} channels)",
                AUDIO_SAMPLE_RATE, self.resample_rate, self.num_channels)));
        }

        if self.chunk == 0 {
            return Err(Error::Config("acquisition chunk must be nonzero".to_string()));
        }

        if self.hysteresis < 0.0 {
            return Err(Error::Config("hysteresis must not be negative".to_string()));
        }

        if !(self.audio_gain > 0.0) {
            return Err(Error::Config(format!(
                "audio gain must be positive (got {})", self.audio_gain)));
        }

        if self.ctcss_debounce == 0 {
            return Err(Error::Config("CTCSS debounce count must be nonzero".to_string()));
        }

        if self.tones.is_empty() {
            return Err(Error::Config("CTCSS tone table is empty".to_string()));
        }

        // Each block's audio must fit in the ring with room for the consumer to lag.
        let per_block = self.max_channel_len();

        if self.ring_capacity < per_block {
            return Err(Error::Config(format!(
                "audio buffer of {} samples cannot hold one block ({} samples)",
                self.ring_capacity, per_block)));
        }

        Ok(())
    }
}
