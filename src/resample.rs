//! Multistage rational resampling of the wideband stream.

use num::complex::Complex32;
use num::traits::Zero;

use kaiser;

/// Transition width of each stage relative to its stopband edge.
const TRANSITION_RATIO: f64 = 0.04;

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 { a } else { gcd(b, a % b) }
}

/// Prime factors of `n` in ascending order, with repetition.
fn factors(mut n: u32) -> Vec<u32> {
    let mut out = vec![];
    let mut p = 2;

    while p * p <= n {
        while n % p == 0 {
            out.push(p);
            n /= p;
        }

        p += 1;
    }

    if n > 1 {
        out.push(n);
    }

    out
}

/// Polyphase resampler by the rational factor `interp / decim`.
struct Stage {
    interp: usize,
    decim: usize,
    /// Prototype taps, padded to a multiple of `interp` and scaled by `interp`.
    taps: Vec<f32>,
    /// Input history, newest first, stored twice back to back.
    hist: Vec<Complex32>,
    /// Position of the newest sample in `hist`.
    idx: usize,
    /// Output phase in the upsampled domain, relative to the newest input.
    phase: usize,
}

impl Stage {
    fn new(interp: usize, decim: usize, atten: f64) -> Self {
        // Stopband starts at the output Nyquist frequency, so nothing folds back into
        // the band.
        let edge = 0.5 / interp.max(decim) as f64;
        let width = edge * TRANSITION_RATIO;
        let fc = edge - width / 2.0;

        let len = kaiser::order(atten, width);
        // Round up so every phase has the same number of taps.
        let len = (len + interp - 1) / interp * interp;

        let taps = kaiser::lowpass(len, fc, atten).into_iter()
            .map(|t| t * interp as f32)
            .collect();

        let depth = len / interp;

        Stage {
            interp: interp,
            decim: decim,
            taps: taps,
            hist: vec![Complex32::zero(); depth * 2],
            idx: 0,
            phase: 0,
        }
    }

    fn depth(&self) -> usize { self.hist.len() / 2 }

    /// Resample the given samples, appending to `out`.
    fn process(&mut self, input: &[Complex32], out: &mut Vec<Complex32>) {
        let depth = self.depth();

        for &s in input {
            self.idx = if self.idx == 0 { depth - 1 } else { self.idx - 1 };
            self.hist[self.idx] = s;
            self.hist[self.idx + depth] = s;

            let hist = &self.hist[self.idx..self.idx + depth];
            let interp = self.interp;

            while self.phase < interp {
                let taps = self.taps[self.phase..].iter().step_by(interp);
                let sum = hist.iter().zip(taps)
                    .fold(Complex32::zero(), |acc, (&x, &h)| acc + x * h);

                out.push(sum);
                self.phase += self.decim;
            }

            self.phase -= self.interp;
        }
    }
}

/// Converts a stream between two sample rates through a cascade of polyphase stages.
///
/// The rate ratio is reduced to `L / M`, then each prime factor of `M` becomes one
/// decimating stage, with the interpolation factor folded into the final stage.
/// Phase is continuous across calls, so the number of outputs per call varies.
pub struct Resampler {
    stages: Vec<Stage>,
    /// Scratch buffers between stages.
    scratch: Vec<Vec<Complex32>>,
}

impl Resampler {
    /// Create a new `Resampler` from `input` to `output` rate (Hz) with the given stopband
    /// attenuation (dB).
    pub fn new(input: u32, output: u32, atten: f64) -> Self {
        assert!(input > 0 && output > 0);

        let g = gcd(input, output);
        let interp = (output / g) as usize;
        let decim = input / g;

        let mut ratios: Vec<(usize, usize)> = factors(decim).into_iter()
            .map(|m| (1, m as usize))
            .collect();

        match ratios.last_mut() {
            Some(last) => last.0 = interp,
            None => ratios.push((interp, 1)),
        }

        let stages: Vec<Stage> = ratios.into_iter()
            .filter(|&(l, m)| l > 1 || m > 1)
            .map(|(l, m)| Stage::new(l, m, atten))
            .collect();

        for (i, s) in stages.iter().enumerate() {
            debug!("resampler stage {}: {}/{} with {} taps", i, s.interp, s.decim,
                   s.taps.len());
        }

        Resampler {
            scratch: vec![vec![]; stages.len()],
            stages: stages,
        }
    }

    /// Resample the given block into `out`, returning the number of samples produced.
    pub fn process(&mut self, input: &[Complex32], out: &mut Vec<Complex32>) -> usize {
        out.clear();

        if self.stages.is_empty() {
            out.extend_from_slice(input);
            return out.len();
        }

        let last = self.stages.len() - 1;

        for (i, stage) in self.stages.iter_mut().enumerate() {
            let (done, rest) = self.scratch.split_at_mut(i);
            let src = if i == 0 { input } else { &done[i - 1][..] };

            if i == last {
                stage.process(src, out);
            } else {
                let dst = &mut rest[0];
                dst.clear();
                stage.process(src, dst);
            }
        }

        out.len()
    }
}
