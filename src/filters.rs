//! Streaming filters shared by the wideband and audio stages.

use std::f64::consts::{FRAC_1_SQRT_2, PI};

use num::complex::Complex32;
use num::traits::Zero;
use static_fir::FirFilter as FIRFilter;

use config::DeemphKind;
use taps::DeemphFir;

/// Second order IIR section in transposed direct form II.
///
/// Coefficients and state are kept in double precision since the low cutoffs used here
/// put the poles very close to the unit circle.
#[derive(Clone)]
pub struct Biquad {
    b: [f64; 3],
    a: [f64; 2],
    z: [f64; 2],
}

impl Biquad {
    /// Create a new `Biquad` from feedforward coefficients `b` and feedback coefficients
    /// `a`, where `a[0]` normalizes the rest.
    pub fn new(b: [f64; 3], a: [f64; 3]) -> Self {
        Biquad {
            b: [b[0] / a[0], b[1] / a[0], b[2] / a[0]],
            a: [a[1] / a[0], a[2] / a[0]],
            z: [0.0; 2],
        }
    }

    /// Butterworth low-pass with the given cutoff (Hz) at the given sample rate (Hz).
    pub fn lowpass(cutoff: f64, rate: f64) -> Self {
        let w0 = 2.0 * PI * cutoff / rate;
        let alpha = w0.sin() / (2.0 * FRAC_1_SQRT_2);
        let cos = w0.cos();

        Biquad::new(
            [(1.0 - cos) / 2.0, 1.0 - cos, (1.0 - cos) / 2.0],
            [1.0 + alpha, -2.0 * cos, 1.0 - alpha],
        )
    }

    pub fn feed(&mut self, x: f32) -> f32 {
        let x = x as f64;
        let y = self.b[0] * x + self.z[0];

        self.z[0] = self.b[1] * x - self.a[0] * y + self.z[1];
        self.z[1] = self.b[2] * x - self.a[1] * y;

        y as f32
    }
}

/// Removes the DC component of a complex stream with a single pole high-pass.
pub struct DcBlocker {
    /// Pole location.
    pole: f32,
    /// Passband gain correction.
    gain: f32,
    /// Previous input.
    x1: Complex32,
    /// Previous output.
    y1: Complex32,
}

impl DcBlocker {
    /// Create a new `DcBlocker` with the pole at `1 - alpha`.
    pub fn new(alpha: f32) -> Self {
        DcBlocker {
            pole: 1.0 - alpha,
            gain: 1.0 - alpha / 2.0,
            x1: Complex32::zero(),
            y1: Complex32::zero(),
        }
    }

    pub fn feed(&mut self, x: Complex32) -> Complex32 {
        let y = (x - self.x1) * self.gain + self.y1 * self.pole;

        self.x1 = x;
        self.y1 = y;

        y
    }

    /// Filter the given block in place.
    pub fn process(&mut self, samples: &mut [Complex32]) {
        for s in samples.iter_mut() {
            *s = self.feed(*s);
        }
    }
}

/// Fixed delay line.
pub struct Delay {
    buf: Vec<f32>,
    idx: usize,
}

impl Delay {
    /// Create a new `Delay` of the given number of samples.
    pub fn new(len: usize) -> Self {
        Delay {
            buf: vec![0.0; len],
            idx: 0,
        }
    }

    /// Feed in a sample, producing the sample fed `len` calls earlier.
    pub fn feed(&mut self, x: f32) -> f32 {
        if self.buf.is_empty() {
            return x;
        }

        let out = self.buf[self.idx];

        self.buf[self.idx] = x;
        self.idx = (self.idx + 1) % self.buf.len();

        out
    }
}

/// De-emphasis filter, chosen once at startup.
pub enum Deemphasis {
    /// First order IIR for a 50us time constant.
    Iir(Biquad),
    /// FIR approximation of the same response.
    Fir(FIRFilter<DeemphFir>),
}

impl Deemphasis {
    pub fn new(kind: DeemphKind) -> Self {
        match kind {
            DeemphKind::Iir => Deemphasis::Iir(Biquad::new(
                [0.507301437230636, 0.507301437230636, 0.0],
                [1.0, 0.014602874461272194, 0.0],
            )),
            DeemphKind::Fir => Deemphasis::Fir(FIRFilter::new()),
        }
    }

    pub fn feed(&mut self, x: f32) -> f32 {
        match *self {
            Deemphasis::Iir(ref mut f) => f.feed(x),
            Deemphasis::Fir(ref mut f) => f.feed(x),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_biquad_lowpass() {
        let mut f = Biquad::lowpass(5.0, 12_500.0);

        // Unity DC gain.
        let mut y = 0.0;
        for _ in 0..50_000 {
            y = f.feed(1.0);
        }
        assert!((y - 1.0).abs() < 1e-3);

        // Strong rejection well above cutoff.
        let mut f = Biquad::lowpass(5.0, 12_500.0);
        let mut peak = 0.0f32;
        for i in 0..50_000 {
            let x = (2.0 * PI * 500.0 * i as f32 / 12_500.0).sin();
            let y = f.feed(x);

            if i > 25_000 {
                peak = peak.max(y.abs());
            }
        }
        assert!(peak < 1e-3);
    }

    #[test]
    fn test_dc_blocker() {
        let mut b = DcBlocker::new(0.0005);
        let mut y = Complex32::zero();

        for _ in 0..50_000 {
            y = b.feed(Complex32::new(0.3, -0.2));
        }

        assert!(y.norm() < 1e-3);
    }

    #[test]
    fn test_delay() {
        let mut d = Delay::new(2);
        assert_eq!(d.feed(1.0), 0.0);
        assert_eq!(d.feed(2.0), 0.0);
        assert_eq!(d.feed(3.0), 1.0);
        assert_eq!(d.feed(4.0), 2.0);

        let mut d = Delay::new(0);
        assert_eq!(d.feed(5.0), 5.0);
    }

    #[test]
    fn test_deemph_dc() {
        for &kind in &[DeemphKind::Iir, DeemphKind::Fir] {
            let mut d = Deemphasis::new(kind);
            let mut y = 0.0;

            for _ in 0..1000 {
                y = d.feed(1.0);
            }

            assert!((y - 1.0).abs() < 0.06);
        }
    }
}
