//! Kaiser window filter design.

use std::f64::consts::PI;

/// Zeroth order modified Bessel function of the first kind.
fn bessel_i0(x: f64) -> f64 {
    let half = x / 2.0;
    let mut sum = 1.0;
    let mut term = 1.0;

    for k in 1..50 {
        term *= half / k as f64;
        let t2 = term * term;
        sum += t2;

        if t2 < sum * 1e-12 {
            break;
        }
    }

    sum
}

/// Window shape parameter for the given stopband attenuation (dB).
pub fn beta(atten: f64) -> f64 {
    if atten > 50.0 {
        0.1102 * (atten - 8.7)
    } else if atten > 21.0 {
        0.5842 * (atten - 21.0).powf(0.4) + 0.07886 * (atten - 21.0)
    } else {
        0.0
    }
}

/// Filter length needed for the given stopband attenuation (dB) and normalized
/// transition width (cycles/sample).
pub fn order(atten: f64, transition: f64) -> usize {
    ((atten - 8.0) / (2.285 * 2.0 * PI * transition)).ceil() as usize + 1
}

/// Value of the Kaiser window of length `len` at index `n`.
pub fn window(n: usize, len: usize, beta: f64) -> f64 {
    if len < 2 {
        return 1.0;
    }

    let r = 2.0 * n as f64 / (len - 1) as f64 - 1.0;
    let arg = (1.0 - r * r).max(0.0).sqrt();

    bessel_i0(beta * arg) / bessel_i0(beta)
}

/// Normalized sinc, sin(pi x) / (pi x).
pub fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-9 {
        1.0
    } else {
        (PI * x).sin() / (PI * x)
    }
}

/// Design a low-pass filter of the given length with cutoff `fc` (cycles/sample) and
/// stopband attenuation `atten` (dB), scaled for unity DC gain.
pub fn lowpass(len: usize, fc: f64, atten: f64) -> Vec<f32> {
    let b = beta(atten);
    let mid = (len - 1) as f64 / 2.0;

    let taps: Vec<f64> = (0..len)
        .map(|i| 2.0 * fc * sinc(2.0 * fc * (i as f64 - mid)) * window(i, len, b))
        .collect();

    let sum: f64 = taps.iter().sum();

    taps.iter().map(|&t| (t / sum) as f32).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_bessel() {
        assert!((bessel_i0(0.0) - 1.0).abs() < 1e-12);
        assert!((bessel_i0(1.0) - 1.2660658777520082).abs() < 1e-9);
        assert!((bessel_i0(5.0) - 27.239871823604442).abs() < 1e-6);
    }

    #[test]
    fn test_beta() {
        assert!((beta(60.0) - 5.65326).abs() < 1e-4);
        assert!((beta(80.0) - 7.85726).abs() < 1e-4);
        assert_eq!(beta(10.0), 0.0);
    }

    #[test]
    fn test_window() {
        let b = beta(60.0);
        assert!((window(10, 21, b) - 1.0).abs() < 1e-12);
        assert!((window(0, 21, b) - window(20, 21, b)).abs() < 1e-12);
        assert!(window(0, 21, b) < 0.05);
    }

    #[test]
    fn test_lowpass() {
        let taps = lowpass(101, 0.1, 60.0);
        assert_eq!(taps.len(), 101);

        let dc: f32 = taps.iter().sum();
        assert!((dc - 1.0).abs() < 1e-5);

        for i in 0..50 {
            assert!((taps[i] - taps[100 - i]).abs() < 1e-7);
        }

        // Response near Nyquist is deep in the stopband.
        let nyq: f32 = taps.iter().enumerate()
            .map(|(i, &t)| if i % 2 == 0 { t } else { -t })
            .sum();
        assert!(nyq.abs() < 1e-3);
    }
}
