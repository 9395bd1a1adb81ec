//! Polyphase analysis filter bank splitting the band into equal channels.

use std::f32::consts::PI;

use num::complex::Complex32;
use num::traits::Zero;

use kaiser;
use nco::Nco;

/// Splits a wideband stream into `N` fully decimated channel streams.
///
/// The band is first recentered by an NCO so channel 0 sits on bin 0 of the bank. Each
/// group of `N` input samples yields one output sample per channel; incomplete groups
/// are carried over to the next call.
pub struct Channelizer {
    /// Number of channels.
    channels: usize,
    /// Band recentering oscillator.
    nco: Nco,
    /// Per-branch taps, `branches[p][r] = h[r * N + p]`.
    branches: Vec<Vec<f32>>,
    /// Per-branch history, newest first, stored twice back to back.
    hist: Vec<Vec<Complex32>>,
    /// Position of the newest sample in each branch history.
    idx: usize,
    /// DFT twiddles, `twiddle[k * N + p] = exp(j 2pi k p / N)`.
    twiddle: Vec<Complex32>,
    /// Mixed samples of the current incomplete group.
    group: Vec<Complex32>,
    /// Branch filter outputs for the current group.
    branch_out: Vec<Complex32>,
}

impl Channelizer {
    /// Create a new `Channelizer` with the given number of channels, filter semi-length
    /// `m` (in output samples), and prototype stopband attenuation (dB).
    pub fn new(channels: usize, m: usize, atten: f64) -> Self {
        assert!(channels > 0 && m > 0);

        let proto = prototype(channels, m, atten);
        let depth = 2 * m;

        let branches = (0..channels).map(|p| {
            (0..depth).map(|r| proto[r * channels + p]).collect()
        }).collect();

        let twiddle = (0..channels * channels).map(|i| {
            let (k, p) = (i / channels, i % channels);
            let w = 2.0 * PI * ((k * p) % channels) as f32 / channels as f32;
            Complex32::new(w.cos(), w.sin())
        }).collect();

        Channelizer {
            channels: channels,
            nco: Nco::for_channels(channels),
            branches: branches,
            hist: vec![vec![Complex32::zero(); depth * 2]; channels],
            idx: 0,
            twiddle: twiddle,
            group: Vec::with_capacity(channels),
            branch_out: vec![Complex32::zero(); channels],
        }
    }

    /// Channelize the given wideband block, replacing the contents of each `out[k]` with
    /// the samples of channel `k`.
    pub fn process(&mut self, input: &[Complex32], out: &mut [Vec<Complex32>]) {
        assert_eq!(out.len(), self.channels);

        for chan in out.iter_mut() {
            chan.clear();
        }

        for &s in input {
            let mixed = self.nco.mix_down(s);
            self.group.push(mixed);

            if self.group.len() == self.channels {
                self.execute(out);
                self.group.clear();
            }
        }
    }

    /// Run one full group through the bank.
    fn execute(&mut self, out: &mut [Vec<Complex32>]) {
        let n = self.channels;
        let depth = self.hist[0].len() / 2;

        self.idx = if self.idx == 0 { depth - 1 } else { self.idx - 1 };

        for p in 0..n {
            // Commutate in reverse, so the newest sample feeds branch 0.
            let s = self.group[n - 1 - p];
            let hist = &mut self.hist[p];

            hist[self.idx] = s;
            hist[self.idx + depth] = s;

            self.branch_out[p] = hist[self.idx..self.idx + depth].iter()
                .zip(self.branches[p].iter())
                .fold(Complex32::zero(), |acc, (&x, &h)| acc + x * h);
        }

        for (k, chan) in out.iter_mut().enumerate() {
            let tw = &self.twiddle[k * n..(k + 1) * n];
            let y = self.branch_out.iter().zip(tw.iter())
                .fold(Complex32::zero(), |acc, (&u, &w)| acc + u * w);

            chan.push(y);
        }
    }
}

/// Kaiser windowed sinc prototype with cutoff at half the channel spacing.
///
/// The sinc peaks at 1, so the bank has a gain of roughly `channels` for a tone centered
/// in a channel.
fn prototype(channels: usize, m: usize, atten: f64) -> Vec<f32> {
    let len = 2 * channels * m + 1;
    let mid = (channels * m) as f64;
    let fc = 0.5 / channels as f64;
    let beta = kaiser::beta(atten);

    (0..len - 1).map(|i| {
        (kaiser::sinc(2.0 * fc * (i as f64 - mid)) * kaiser::window(i, len, beta)) as f32
    }).collect()
}
