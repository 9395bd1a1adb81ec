//! Terminal status rendering.

use std::f32::consts::PI;
use std::sync::Arc;

use num::complex::Complex32;
use num_complex;
use rustfft::{Fft, FftPlanner};

use config::{ChannelMask, Config};
use consts::CHANNEL_SPACING;
use pipeline::Status;
use scan::ScanState;

/// Level of the weakest shaded waterfall character (dB).
const REF_LEVEL: f32 = -40.0;
/// Level step between waterfall characters (dB).
const LEVEL_STEP: f32 = 5.0;
/// Waterfall intensity characters, weakest first.
const SHADES: &'static [u8] = b" .,-+*&NM#";

/// Frequency (Hz) at the center of the given channel.
pub fn channel_freq(config: &Config, chan: usize) -> f64 {
    config.frequency +
        (chan as f64 - (config.num_channels as f64 - 1.0) / 2.0) * CHANNEL_SPACING
}

/// Single line summary of the receiver state.
pub fn status_line(config: &Config, status: &Status) -> String {
    let chan = match status.state {
        ScanState::Tuned(c) => c,
        ScanState::Scanning => return format!("scanning [rssi: {:5.1}dB]", status.rssi),
    };

    let mut line = format!("channel {} ({:.5}MHz) [rssi: {:5.1}dB]", chan + 1,
                           channel_freq(config, chan) / 1e6, status.rssi);

    match (status.tone, status.ctcss) {
        (Some(t), _) => line.push_str(&format!(" [CTCSS: {}]", t)),
        (None, Some(f)) => line.push_str(&format!(" [CTCSS: ?? ({:.2}Hz)]", f)),
        (None, None) => {},
    }

    line
}

/// Text waterfall of the wideband spectrum with a channel legend beneath.
pub struct Waterfall {
    /// Characters per line, which is also the FFT size.
    width: usize,
    channels: usize,
    mask: ChannelMask,
    /// Center frequency (Hz).
    center: f64,
    fft: Arc<dyn Fft<f32>>,
    /// Hann window.
    window: Vec<f32>,
    /// Coherent gain of the window.
    gain: f32,
    buf: Vec<num_complex::Complex32>,
    /// Accumulated power per bin, lowest frequency first.
    psd: Vec<f32>,
}

impl Waterfall {
    pub fn new(width: usize, config: &Config) -> Self {
        assert!(width > 0);

        let window: Vec<f32> = (0..width)
            .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / width as f32).cos())
            .collect();

        let gain = window.iter().sum::<f32>().max(1.0);

        Waterfall {
            width: width,
            channels: config.num_channels,
            mask: config.mask,
            center: config.frequency,
            fft: FftPlanner::<f32>::new().plan_fft_forward(width),
            window: window,
            gain: gain,
            buf: vec![num_complex::Complex32::new(0.0, 0.0); width],
            psd: vec![0.0; width],
        }
    }

    /// Add the power spectrum of one segment, zero padded to the line width.
    fn accumulate(&mut self, seg: &[Complex32]) {
        for (i, b) in self.buf.iter_mut().enumerate() {
            *b = match seg.get(i) {
                Some(s) => num_complex::Complex32::new(s.re * self.window[i],
                                                       s.im * self.window[i]),
                None => num_complex::Complex32::new(0.0, 0.0),
            };
        }

        self.fft.process(&mut self.buf[..]);

        for (p, x) in self.psd.iter_mut().zip(self.buf.iter()) {
            *p += x.norm_sqr();
        }
    }

    /// Render one line of the waterfall from the given block of wideband samples,
    /// marking the peak level and its normalized frequency.
    pub fn line(&mut self, samples: &[Complex32], status: &Status) -> String {
        let w = self.width;

        for p in self.psd.iter_mut() {
            *p = 0.0;
        }

        let segments = if samples.len() >= w {
            samples.len() / w
        } else if samples.is_empty() {
            0
        } else {
            1
        };

        for k in 0..segments {
            let seg = &samples[k * w..samples.len().min((k + 1) * w)];
            self.accumulate(seg);
        }

        self.psd.rotate_left((w + 1) / 2);

        let norm = segments.max(1) as f32 * self.gain * self.gain;
        let mut peak = (::std::f32::NEG_INFINITY, 0.0);

        let ascii: String = self.psd.iter().enumerate().map(|(k, &p)| {
            let level = 10.0 * (p / norm).log10();

            if level > peak.0 {
                peak = (level, (k as f32 - (w / 2) as f32) / w as f32);
            }

            shade(level) as char
        }).collect();

        format!(" > {} < pk{:5.1}dB [{:5.2}] [rssi: {:5.1}dB]", ascii, peak.0, peak.1,
                status.rssi)
    }

    /// Render the legend marking enabled (`NN`), disabled (`--`), and active (`^^`)
    /// channels, followed by the tuned frequency and tone.
    pub fn footer(&self, status: &Status) -> String {
        let w = self.width;
        let mut buf = vec![b' '; w + 6];

        buf[1] = b'[';
        buf[w + 4] = b']';

        let chw = w as f32 / self.channels as f32;

        for i in 0..self.channels {
            let pos = (i as f32 * chw + chw / 2.0 + 2.0).round() as usize;

            let label = if status.active == Some(i) {
                "^^".to_string()
            } else if self.mask.contains(i) {
                format!("{:02}", i + 1)
            } else {
                "--".to_string()
            };

            for (j, &b) in label.as_bytes().iter().enumerate() {
                if pos + j < buf.len() {
                    buf[pos + j] = b;
                }
            }
        }

        let mut footer = String::from_utf8_lossy(&buf[..]).into_owned();

        footer.push_str(&match status.active {
            Some(c) => {
                let mut s = format!("{:8.3} MHz [{}]", self.center / 1e6, c + 1);

                match (status.tone, status.ctcss) {
                    (Some(t), Some(f)) =>
                        s.push_str(&format!("  [CTCSS:  {:02} ({:3.2}Hz)]", t.code, f)),
                    (_, Some(f)) => s.push_str(&format!("  [CTCSS:  ?? ({:3.2})]", f)),
                    _ => {},
                }

                s
            },
            None => format!("{:8.3} MHz", self.center / 1e6),
        });

        footer
    }
}

/// Waterfall character for the given level (dB).
fn shade(level: f32) -> u8 {
    if !(level > REF_LEVEL) {
        return SHADES[0];
    }

    let idx = ((level - REF_LEVEL) / LEVEL_STEP) as usize + 1;
    SHADES[idx.min(SHADES.len() - 1)]
}
