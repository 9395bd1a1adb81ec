//! CTCSS sub-tone decoding with a software PLL.

use std::f64::consts::PI;
use std::fmt;

use consts::*;
use filters::Biquad;

/// Standard CTCSS tone frequencies (Hz), in code order.
const STANDARD_TONES: [f32; 38] = [
    67.0, 71.9, 74.4, 77.0, 79.7, 82.5, 85.4, 88.5, 91.5, 94.8,
    97.4, 100.0, 103.5, 107.2, 110.9, 114.8, 118.8, 123.0, 127.3, 131.8,
    136.5, 141.3, 146.2, 151.4, 156.7, 162.2, 167.9, 173.8, 179.9, 186.2,
    192.8, 203.5, 210.7, 218.1, 225.7, 233.6, 241.8, 250.3,
];

/// A tone from the table.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Tone {
    /// 1-based position in the table.
    pub code: usize,
    /// Nominal frequency (Hz).
    pub freq: f32,
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({:.1}Hz)", self.code, self.freq)
    }
}

/// Ordered table of CTCSS tones.
#[derive(Clone, Debug)]
pub struct ToneTable(Vec<f32>);

impl ToneTable {
    /// The 38 standard tones from 67.0Hz to 250.3Hz.
    pub fn standard() -> Self {
        ToneTable(STANDARD_TONES.to_vec())
    }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// Find the tone nearest the given frequency, or `None` if it lies outside the span
    /// of the table.
    pub fn lookup(&self, freq: f32) -> Option<Tone> {
        let lo = self.0.iter().cloned().fold(::std::f32::INFINITY, f32::min);
        let hi = self.0.iter().cloned().fold(::std::f32::NEG_INFINITY, f32::max);

        if !(freq >= lo && freq <= hi) {
            return None;
        }

        self.0.iter().enumerate().fold(None, |best: Option<Tone>, (i, &t)| {
            match best {
                Some(b) if (b.freq - freq).abs() <= (t - freq).abs() => best,
                _ => Some(Tone { code: i + 1, freq: t }),
            }
        })
    }
}

/// Normalizes a tone to unit peak amplitude by tracking its mean power.
pub struct Agc {
    /// Power tracking rate.
    bandwidth: f32,
    /// Current power estimate.
    power: f32,
}

impl Agc {
    pub fn new(bandwidth: f32) -> Self {
        Agc {
            bandwidth: bandwidth,
            power: 1.0,
        }
    }

    pub fn feed(&mut self, x: f32) -> f32 {
        self.power += self.bandwidth * (x * x - self.power);

        if self.power > 0.0 {
            x / self.power.sqrt() * ::std::f32::consts::FRAC_1_SQRT_2
        } else {
            0.0
        }
    }
}

/// Phase-locked loop tracking a tone around a nominal center frequency.
pub struct Pll {
    /// Nominal center frequency (Hz).
    center: f64,
    /// Sample rate (Hz).
    rate: f64,
    /// Loop gain.
    gain: f32,
    /// Loop filter, whose output is the fractional deviation from center.
    loop_filt: Biquad,
    /// Lock detector filter.
    lock_filt: Biquad,
    /// Nominal phase plus integrated correction, in seconds of the center tone period.
    acc: f64,
    /// Current in-phase reference.
    sin_ref: f32,
    /// Last loop filter output.
    out: f32,
    /// Last lock detector output.
    lock: f32,
}

impl Pll {
    /// Create a new `Pll` around the given center frequency (Hz) at the given sample rate
    /// (Hz), with the given loop gain and loop filter cutoff (Hz).
    pub fn new(center: f32, rate: f32, gain: f32, cutoff: f32) -> Self {
        Pll {
            center: center as f64,
            rate: rate as f64,
            gain: gain,
            loop_filt: Biquad::lowpass(cutoff as f64, rate as f64),
            lock_filt: Biquad::lowpass(cutoff as f64, rate as f64),
            acc: 0.0,
            sin_ref: 0.0,
            out: 0.0,
            lock: 0.0,
        }
    }

    /// Feed in a normalized sample.
    pub fn feed(&mut self, x: f32) {
        let control = x * self.sin_ref * self.gain;
        self.out = self.loop_filt.feed(control);

        self.acc += control as f64 / self.rate;

        let (sin, cos) = (2.0 * PI * self.center * self.acc).sin_cos();
        self.sin_ref = sin as f32;

        self.lock = 2.0 * self.lock_filt.feed(-(cos as f32) * x);

        self.acc += 1.0 / self.rate;
        // Keep within one period of the center tone.
        self.acc %= 1.0 / self.center;
    }

    /// Frequency (Hz) the loop is currently tracking.
    pub fn frequency(&self) -> f32 {
        (self.center * (1.0 + self.out as f64)) as f32
    }

    /// Current lock detector level.
    pub fn lock_level(&self) -> f32 { self.lock }
}

/// Requires a value to repeat on consecutive evaluations before reporting it.
pub struct Debounce<T> {
    /// Repeats required.
    count: usize,
    /// Value of the current run.
    last: Option<T>,
    /// Length of the current run.
    run: usize,
    /// Whether the current run was already reported.
    reported: bool,
}

impl<T: Copy + PartialEq> Debounce<T> {
    pub fn new(count: usize) -> Self {
        Debounce {
            count: count,
            last: None,
            run: 0,
            reported: false,
        }
    }

    /// Record an evaluation, returning the value if its run just became long enough.
    pub fn feed(&mut self, v: Option<T>) -> Option<T> {
        if v == self.last {
            self.run += 1;
        } else {
            self.last = v;
            self.run = 1;
            self.reported = false;
        }

        match v {
            Some(v) if self.run >= self.count && !self.reported => {
                self.reported = true;
                Some(v)
            },
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        self.last = None;
        self.run = 0;
        self.reported = false;
    }
}

/// Decodes the CTCSS tone from the sub-audible branch of demodulated audio.
pub struct CtcssDecoder {
    agc: Agc,
    pll: Pll,
    /// Lock detector threshold.
    threshold: f32,
    tones: ToneTable,
    debounce: Debounce<usize>,
    /// Decoded frequency as of the last evaluation (Hz).
    freq: Option<f32>,
}

impl CtcssDecoder {
    /// Create a new `CtcssDecoder` at the given sample rate (Hz).
    pub fn new(rate: u32, tones: ToneTable, debounce: usize) -> Self {
        CtcssDecoder {
            agc: Agc::new(CTCSS_AGC_BANDWIDTH),
            pll: Pll::new(CTCSS_CENTER_FREQ, rate as f32, CTCSS_LOOP_GAIN,
                          CTCSS_FILTER_CUTOFF),
            threshold: CTCSS_LOCK_THRESHOLD,
            tones: tones,
            debounce: Debounce::new(debounce),
            freq: None,
        }
    }

    /// Run the loop over the given samples.
    pub fn process(&mut self, samples: &[f32]) {
        for &s in samples {
            let x = self.agc.feed(s);
            self.pll.feed(x);
        }
    }

    pub fn locked(&self) -> bool {
        self.pll.lock_level() > self.threshold
    }

    /// Update the decoded tone from the current loop state, returning a tone that was
    /// just acquired.
    pub fn evaluate(&mut self) -> Option<Tone> {
        self.freq = if self.locked() {
            Some(self.pll.frequency())
        } else {
            None
        };

        let tone = self.freq.and_then(|f| self.tones.lookup(f));

        self.debounce.feed(tone.map(|t| t.code)).and_then(|_| tone)
    }

    /// Decoded frequency as of the last evaluation, if locked.
    pub fn frequency(&self) -> Option<f32> { self.freq }

    /// Table entry nearest the decoded frequency.
    pub fn tone(&self) -> Option<Tone> {
        self.freq.and_then(|f| self.tones.lookup(f))
    }

    /// Forget the decoded tone. The loop itself keeps running from its current state.
    pub fn clear(&mut self) {
        self.freq = None;
        self.debounce.reset();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand::rngs::StdRng;

    fn tone(freq: f64, amp: f64, secs: f64) -> Vec<f32> {
        let rate = AUDIO_SAMPLE_RATE as f64;

        (0..(secs * rate) as usize).map(|n| {
            (amp * (2.0 * PI * freq * n as f64 / rate).sin()) as f32
        }).collect()
    }

    #[test]
    fn test_lookup() {
        let t = ToneTable::standard();

        assert_eq!(t.lookup(100.0), Some(Tone { code: 12, freq: 100.0 }));
        assert_eq!(t.lookup(67.0), Some(Tone { code: 1, freq: 67.0 }));
        assert_eq!(t.lookup(250.3), Some(Tone { code: 38, freq: 250.3 }));
        assert_eq!(t.lookup(99.1).map(|t| t.code), Some(12));
        assert_eq!(t.lookup(198.0).map(|t| t.code), Some(31));
        assert_eq!(t.lookup(199.0).map(|t| t.code), Some(32));

        assert_eq!(t.lookup(0.0), None);
        assert_eq!(t.lookup(300.0), None);
        assert_eq!(t.lookup(66.9), None);
        assert_eq!(t.lookup(250.4), None);
        assert_eq!(t.lookup(::std::f32::NAN), None);
    }

    #[test]
    fn test_agc() {
        let mut agc = Agc::new(CTCSS_AGC_BANDWIDTH);
        let mut peak = 0.0f32;

        for (i, &x) in tone(100.0, 0.05, 2.0).iter().enumerate() {
            let y = agc.feed(x);

            if i > 15_000 {
                peak = peak.max(y.abs());
            }
        }

        assert!((peak - 1.0).abs() < 0.05);
    }

    #[test]
    fn test_pll_tones() {
        for &f in &[67.0, 100.0, 150.0, 250.3] {
            let mut d = CtcssDecoder::new(AUDIO_SAMPLE_RATE, ToneTable::standard(), 5);
            d.process(&tone(f, 0.3, 1.5)[..]);
            d.evaluate();

            assert!(d.locked());
            assert!((d.frequency().unwrap() - f as f32).abs() < 1.0);
        }
    }

    #[test]
    fn test_pll_100hz() {
        let mut d = CtcssDecoder::new(AUDIO_SAMPLE_RATE, ToneTable::standard(), 5);
        let samples = tone(100.0, 0.2, 2.0);
        let mut acquired = vec![];

        // Evaluate once per 100ms block.
        for block in samples.chunks(1250) {
            d.process(block);

            if let Some(t) = d.evaluate() {
                acquired.push(t);
            }
        }

        assert_eq!(acquired, vec![Tone { code: 12, freq: 100.0 }]);
        assert!((d.frequency().unwrap() - 100.0).abs() < 1.0);
        assert_eq!(d.tone().map(|t| t.code), Some(12));

        d.clear();
        assert_eq!(d.frequency(), None);
        assert_eq!(d.tone(), None);

        // Loop state persists, so it is immediately locked again.
        d.process(&samples[..1250]);
        assert!(d.locked());
    }

    #[test]
    fn test_pll_noise() {
        let mut rng = StdRng::seed_from_u64(150);
        let noise: Vec<f32> = (0..50_000).map(|_| rng.gen_range(-0.2..0.2)).collect();

        let mut d = CtcssDecoder::new(AUDIO_SAMPLE_RATE, ToneTable::standard(), 5);

        for block in noise.chunks(1250) {
            d.process(block);
            assert_eq!(d.evaluate(), None);
        }
    }

    #[test]
    fn test_debounce() {
        let mut d = Debounce::new(5);

        // Alternating values never qualify.
        for i in 0..100 {
            assert_eq!(d.feed(Some(i % 2)), None);
        }

        // A stable run is reported exactly once.
        let hits = (0..20).filter_map(|_| d.feed(Some(7))).count();
        assert_eq!(hits, 1);

        // A break starts a new episode.
        assert_eq!(d.feed(None), None);
        for _ in 0..4 {
            assert_eq!(d.feed(Some(7)), None);
        }
        assert_eq!(d.feed(Some(7)), Some(7));

        // Changing values reset the count.
        for _ in 0..4 {
            assert_eq!(d.feed(Some(3)), None);
        }
        assert_eq!(d.feed(Some(4)), None);
        assert_eq!(d.feed(Some(3)), None);
    }
}
