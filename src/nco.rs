//! Numerically controlled oscillator.

use std::f64::consts::PI;

use num::complex::Complex32;

/// Phase accumulator used to shift a complex stream in frequency.
pub struct Nco {
    /// Current phase (radians), kept in [-pi, pi).
    theta: f64,
    /// Phase step per sample (radians).
    omega: f64,
}

impl Nco {
    /// Create a new `Nco` with the given frequency (radians/sample).
    pub fn new(omega: f64) -> Self {
        Nco {
            theta: 0.0,
            omega: omega,
        }
    }

    /// Create an `Nco` that moves the lowest of `channels` equal channels onto bin 0 of
    /// an analysis bank.
    pub fn for_channels(channels: usize) -> Self {
        let n = channels as f64;
        Nco::new(-0.5 * (n - 1.0) / n * 2.0 * PI)
    }

    /// Mix the given sample down by the current phase, then step the phase.
    pub fn mix_down(&mut self, sample: Complex32) -> Complex32 {
        let (sin, cos) = self.theta.sin_cos();
        let out = sample * Complex32::new(cos as f32, -sin as f32);

        self.step();

        out
    }

    fn step(&mut self) {
        self.theta += self.omega;

        if self.theta >= PI {
            self.theta -= 2.0 * PI;
        } else if self.theta < -PI {
            self.theta += 2.0 * PI;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_mix_down() {
        // A tone at the NCO frequency lands at DC.
        let omega = 0.3;
        let mut nco = Nco::new(omega);

        for i in 0..10_000 {
            let x = Complex32::from_polar(&1.0, &((omega * i as f64 % (2.0 * PI)) as f32));
            let y = nco.mix_down(x);

            assert!((y.re - 1.0).abs() < 1e-3);
            assert!(y.im.abs() < 1e-3);
        }
    }

    #[test]
    fn test_channels() {
        let nco = Nco::for_channels(16);
        assert!((nco.omega + 15.0 / 16.0 * PI).abs() < 1e-12);
        assert_eq!(nco.theta, 0.0);
    }
}
