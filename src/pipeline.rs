//! Radio chain from wideband samples to queued channel audio.

use std::sync::{Arc, Mutex, MutexGuard};

use num::complex::Complex32;

use channelizer::Channelizer;
use config::Config;
use consts::{CHANNELIZER_ATTEN, CHANNELIZER_SEMI_LEN, DC_BLOCK_ALPHA, FM_DEVIATION,
             RESAMPLER_ATTEN};
use ctcss::{CtcssDecoder, Tone};
use demod::Demodulator;
use error::Result;
use filters::DcBlocker;
use resample::Resampler;
use ring::{AudioHandle, AudioRing};
use scan::{ScanEvent, ScanState, Scanner};

/// Receiver state as of the last processed block.
#[derive(Copy, Clone, Debug)]
pub struct Status {
    pub state: ScanState,
    /// Active channel (0-based), if any.
    pub active: Option<usize>,
    /// Most recent level of the active or strongest channel (dB).
    pub rssi: f32,
    /// Decoded CTCSS frequency (Hz), if locked.
    pub ctcss: Option<f32>,
    /// Table entry nearest the decoded frequency.
    pub tone: Option<Tone>,
}

/// What happened while processing a block.
#[derive(Copy, Clone, Debug, Default)]
pub struct BlockReport {
    /// Scanner transition, if any.
    pub event: Option<ScanEvent>,
    /// CTCSS tone that was just acquired.
    pub acquired: Option<Tone>,
    /// Samples produced per channel.
    pub channel_len: usize,
}

/// Owns every stage of the radio chain along with the audio ring buffer.
pub struct Pipeline {
    dcblock: DcBlocker,
    resampler: Resampler,
    channelizer: Channelizer,
    scanner: Scanner,
    demod: Demodulator,
    ctcss: CtcssDecoder,
    /// Resampled wideband samples for the current block.
    resampled: Vec<Complex32>,
    /// Per-channel streams for the current block.
    channels: Vec<Vec<Complex32>>,
    ring: Arc<Mutex<AudioRing>>,
    /// Whether tuning and buffer logs are emitted. Off while the waterfall owns the
    /// terminal.
    verbose: bool,
}

impl Pipeline {
    /// Create a new `Pipeline` from the given validated configuration.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        let cap = config.max_channel_len();

        Ok(Pipeline {
            dcblock: DcBlocker::new(DC_BLOCK_ALPHA),
            resampler: Resampler::new(config.sdr_rate, config.resample_rate,
                                      RESAMPLER_ATTEN as f64),
            channelizer: Channelizer::new(config.num_channels, CHANNELIZER_SEMI_LEN,
                                          CHANNELIZER_ATTEN as f64),
            scanner: Scanner::new(config.mask, config.lock, config.squelch,
                                  config.hysteresis),
            demod: Demodulator::new(config, FM_DEVIATION),
            ctcss: CtcssDecoder::new(config.audio_rate(), config.tones.clone(),
                                     config.ctcss_debounce),
            resampled: Vec::with_capacity(config.max_resampled()),
            channels: vec![Vec::with_capacity(cap); config.num_channels],
            ring: Arc::new(Mutex::new(AudioRing::new(config.ring_capacity))),
            verbose: config.waterfall == 0,
        })
    }

    /// Create a consumer handle to the audio ring buffer.
    pub fn audio_handle(&self) -> AudioHandle {
        AudioHandle::new(&self.ring)
    }

    /// Run a block of wideband samples through the chain.
    ///
    /// The block is DC blocked in place. Audio for the active channel is queued into the
    /// ring buffer, and a ring overflow is returned as an error.
    pub fn process(&mut self, block: &mut [Complex32]) -> Result<BlockReport> {
        self.dcblock.process(block);
        self.resampler.process(block, &mut self.resampled);
        self.channelizer.process(&self.resampled[..], &mut self.channels[..]);

        let mut report = BlockReport::default();
        report.channel_len = self.channels[0].len();

        if report.channel_len == 0 {
            return Ok(report);
        }

        let channels = &self.channels;
        report.event = self.scanner.update(|c| rssi(&channels[c][..]));

        match report.event {
            Some(ScanEvent::Tuned { chan, rssi }) => if self.verbose {
                info!("Tuned to channel {} (RSSI: {:.2}dB)", chan + 1, rssi);
            },
            Some(ScanEvent::Retuned { from, to, rssi }) => {
                if self.verbose {
                    info!("Detuned from channel {}", from + 1);
                    info!("Tuned to channel {} (RSSI: {:.2}dB)", to + 1, rssi);
                }

                self.demod.reset();
                self.ctcss.clear();
            },
            Some(ScanEvent::Detuned { chan, .. }) => {
                if self.verbose {
                    info!("Detuned from channel {}", chan + 1);
                }

                self.demod.reset();
                self.ctcss.clear();
            },
            None => {},
        }

        if let Some(chan) = self.scanner.active() {
            self.demod.process(&self.channels[chan][..]);
            self.ctcss.process(self.demod.subtone());

            report.acquired = self.ctcss.evaluate();

            match report.acquired {
                Some(tone) if self.verbose => info!("Acquired CTCSS code: {}", tone),
                _ => {},
            }

            self.lock_ring().write(self.demod.audio())?;
        }

        if self.verbose {
            // Logged after the ring lock is released.
            let (len, cap) = {
                let ring = self.lock_ring();
                (ring.len(), ring.capacity())
            };

            if len > 0 {
                debug!("{} samples in audio buffer ({:3.1}% used)", len,
                       len as f32 * 100.0 / cap as f32);
            }
        }

        Ok(report)
    }

    fn lock_ring(&self) -> MutexGuard<AudioRing> {
        match self.ring.lock() {
            Ok(r) => r,
            // Ring contents are consistent after every write/read.
            Err(p) => p.into_inner(),
        }
    }

    pub fn status(&self) -> Status {
        Status {
            state: self.scanner.state(),
            active: self.scanner.active(),
            rssi: self.scanner.rssi(),
            ctcss: self.ctcss.frequency(),
            tone: self.ctcss.tone(),
        }
    }

    /// Wideband samples fed to the channelizer for the last block.
    pub fn resampled(&self) -> &[Complex32] { &self.resampled[..] }

    /// Level of every channel over the last block (dB).
    #[cfg(test)]
    pub fn levels(&self) -> Vec<f32> {
        self.channels.iter().map(|c| rssi(&c[..])).collect()
    }
}

/// Signal level of the given channel stream as `20 log10(mean |x|)`.
pub fn rssi(samples: &[Complex32]) -> f32 {
    let sum: f32 = samples.iter().map(|s| s.norm()).sum();
    20.0 * (sum / samples.len() as f32).log10()
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;
    use rand::{Rng, SeedableRng};
    use rand::rngs::StdRng;
    use std::cell::RefCell;
    use log::{self, LevelFilter, Log, Metadata, Record};
    use config::{ChannelMask, LockMode};
    use consts::*;
    use error::Error;

    /// Offset of the given channel from the band center (Hz).
    fn offset(chan: usize) -> f64 {
        (chan as f64 - 7.5) * CHANNEL_SPACING
    }

    /// FM carriers sharing the same modulation, sampled at the radio rate.
    struct FmSource {
        rng: StdRng,
        /// Carriers as (offset, amplitude) pairs.
        carriers: Vec<(f64, f32)>,
        /// Modulating tones as (frequency, deviation) pairs in Hz.
        tones: Vec<(f64, f64)>,
        /// Phase of each carrier.
        phases: Vec<f64>,
        n: u64,
    }

    impl FmSource {
        fn new(chan: usize, tones: Vec<(f64, f64)>) -> Self {
            FmSource::carriers(vec![(offset(chan), 0.5)], tones)
        }

        fn carriers(carriers: Vec<(f64, f32)>, tones: Vec<(f64, f64)>) -> Self {
            FmSource {
                rng: StdRng::seed_from_u64(446),
                phases: vec![0.0; carriers.len()],
                carriers: carriers,
                tones: tones,
                n: 0,
            }
        }

        fn block(&mut self, len: usize) -> Vec<Complex32> {
            let rate = SDR_SAMPLE_RATE as f64;

            (0..len).map(|_| {
                let t = self.n as f64 / rate;
                let dev = self.tones.iter()
                    .map(|&(f, dev)| dev * (2.0 * PI * f * t).sin())
                    .sum::<f64>();

                self.n += 1;

                let mut s = Complex32::new(self.rng.gen_range(-0.02..0.02),
                                           self.rng.gen_range(-0.02..0.02));

                for (&(off, amp), phase) in self.carriers.iter().zip(self.phases.iter_mut()) {
                    *phase = (*phase + 2.0 * PI * (off + dev) / rate) % (2.0 * PI);
                    s = s + Complex32::from_polar(&amp, &(*phase as f32));
                }

                s
            }).collect()
        }
    }

    /// Log records emitted on the current thread.
    struct Captured {
        lines: Vec<String>,
        ring: Arc<Mutex<AudioRing>>,
        /// Records emitted while the audio ring was locked.
        under_lock: usize,
    }

    thread_local! {
        static CAPTURED: RefCell<Option<Captured>> = RefCell::new(None);
    }

    struct Capture;

    impl Log for Capture {
        fn enabled(&self, _: &Metadata) -> bool { true }

        fn log(&self, record: &Record) {
            CAPTURED.with(|c| {
                if let Some(ref mut c) = *c.borrow_mut() {
                    if c.ring.try_lock().is_err() {
                        c.under_lock += 1;
                    }

                    c.lines.push(format!("{}", record.args()));
                }
            });
        }

        fn flush(&self) {}
    }

    static CAPTURE: Capture = Capture;

    /// Start recording this thread's log records.
    fn capture(p: &Pipeline) {
        let _ = log::set_logger(&CAPTURE);
        log::set_max_level(LevelFilter::Debug);

        CAPTURED.with(|c| *c.borrow_mut() = Some(Captured {
            lines: vec![],
            ring: p.ring.clone(),
            under_lock: 0,
        }));
    }

    /// Stop recording, returning the records and how many were logged under the ring
    /// lock.
    fn captured() -> (Vec<String>, usize) {
        CAPTURED.with(|c| match c.borrow_mut().take() {
            Some(c) => (c.lines, c.under_lock),
            None => (vec![], 0),
        })
    }

    #[test]
    fn test_rssi() {
        let s = vec![Complex32::new(0.0, 1.0); 10];
        assert!(rssi(&s[..]).abs() < 1e-6);

        let s = vec![Complex32::new(0.1, 0.0); 10];
        assert!((rssi(&s[..]) + 20.0).abs() < 1e-4);

        assert_eq!(rssi(&[Complex32::new(0.0, 0.0)][..]), ::std::f32::NEG_INFINITY);
    }

    #[test]
    fn test_invalid_config() {
        let config = Config { mask: ChannelMask::from_bits(0), ..Config::default() };

        match Pipeline::new(&config) {
            Err(Error::Config(_)) => {},
            _ => panic!("empty mask accepted"),
        }
    }

    #[test]
    fn test_channel_five() {
        let config = Config::default();
        let mut p = Pipeline::new(&config).unwrap();
        let handle = p.audio_handle();
        let mut src = FmSource::new(5, vec![(1000.0, 2500.0)]);

        assert_eq!(p.status().state, ScanState::Scanning);

        let mut events = vec![];

        for _ in 0..4 {
            let mut block = src.block(50_000);
            let report = p.process(&mut block[..]).unwrap();

            assert_eq!(report.channel_len, 625);
            events.extend(report.event);
            assert_eq!(p.status().active, Some(5));
        }

        assert_eq!(events.len(), 1);

        match events[0] {
            ScanEvent::Tuned { chan, rssi } => {
                assert_eq!(chan, 5);
                assert!(rssi > 10.0);
            },
            _ => panic!("unexpected event"),
        }

        let levels = p.levels();

        for (c, &l) in levels.iter().enumerate() {
            if c != 5 {
                assert!(l < config.squelch - 10.0);
            }
        }

        let mut audio = vec![0.0; config.ring_capacity];
        assert_eq!(handle.fill(&mut audio[..]), 2500);

        let peak = audio.iter().fold(0.0f32, |m, &s| m.max(s.abs()));
        assert!(peak > 0.5);
    }

    #[test]
    fn test_masked_channel() {
        let config = Config {
            mask: ChannelMask::parse("1-5,7-16", NUM_CHANNELS).unwrap(),
            ..Config::default()
        };

        let mut p = Pipeline::new(&config).unwrap();
        let handle = p.audio_handle();
        let mut src = FmSource::new(5, vec![(1000.0, 2500.0)]);

        for _ in 0..3 {
            let mut block = src.block(50_000);
            let report = p.process(&mut block[..]).unwrap();

            assert!(report.event.is_none());
            assert_eq!(p.status().active, None);
        }

        let mut audio = vec![0.0; 16];
        assert_eq!(handle.fill(&mut audio[..]), 0);
    }

    #[test]
    fn test_ctcss_acquire() {
        let config = Config::default();
        let mut p = Pipeline::new(&config).unwrap();
        let handle = p.audio_handle();
        let mut src = FmSource::new(9, vec![(1000.0, 2500.0), (100.0, 500.0)]);
        let mut acquired = vec![];
        let mut audio = vec![0.0; config.ring_capacity];

        for _ in 0..15 {
            let mut block = src.block(100_000);
            let report = p.process(&mut block[..]).unwrap();

            acquired.extend(report.acquired);
            handle.fill(&mut audio[..]);
        }

        assert_eq!(acquired.len(), 1);
        assert_eq!(acquired[0].code, 12);

        let status = p.status();
        assert_eq!(status.active, Some(9));
        assert!((status.ctcss.unwrap() - 100.0).abs() < 1.0);
        assert_eq!(status.tone.unwrap().code, 12);
    }

    #[test]
    fn test_overflow() {
        let config = Config::default();
        let mut p = Pipeline::new(&config).unwrap();
        let mut src = FmSource::new(0, vec![(1000.0, 2500.0)]);

        // Nothing drains the ring, so it fills after a few blocks.
        let failed = (0..10).any(|_| {
            let mut block = src.block(100_000);

            match p.process(&mut block[..]) {
                Err(Error::Overflow { .. }) => true,
                Err(_) => panic!("unexpected error"),
                Ok(_) => false,
            }
        });

        assert!(failed);
    }

    #[test]
    fn test_detune() {
        let config = Config::default();
        let mut p = Pipeline::new(&config).unwrap();
        let handle = p.audio_handle();
        let mut src = FmSource::new(9, vec![(1000.0, 2500.0), (100.0, 500.0)]);
        let mut audio = vec![0.0; config.ring_capacity];

        for _ in 0..15 {
            let mut block = src.block(100_000);
            p.process(&mut block[..]).unwrap();
            handle.fill(&mut audio[..]);
        }

        let status = p.status();
        assert_eq!(status.active, Some(9));
        assert!(status.ctcss.is_some());
        assert!(status.tone.is_some());

        // Carrier goes away.
        src.carriers[0].1 = 0.0;

        let mut block = src.block(100_000);
        let report = p.process(&mut block[..]).unwrap();

        match report.event {
            Some(ScanEvent::Detuned { chan, rssi }) => {
                assert_eq!(chan, 9);
                assert!(rssi < config.squelch - config.hysteresis);
            },
            _ => panic!("expected detune"),
        }

        let status = p.status();
        assert_eq!(status.state, ScanState::Scanning);
        assert_eq!(status.active, None);
        assert_eq!(status.ctcss, None);
        assert!(status.tone.is_none());
        assert!(report.acquired.is_none());
    }

    #[test]
    fn test_max_retune() {
        let config = Config { lock: LockMode::Max, ..Config::default() };
        let mut p = Pipeline::new(&config).unwrap();
        let handle = p.audio_handle();
        let mut src = FmSource::carriers(vec![(offset(3), 0.5), (offset(11), 0.0)],
                                         vec![(1000.0, 2500.0)]);
        let mut events = vec![];

        for _ in 0..2 {
            let mut block = src.block(50_000);
            events.extend(p.process(&mut block[..]).unwrap().event);
        }

        assert_eq!(events.len(), 1);

        match events[0] {
            ScanEvent::Tuned { chan, .. } => assert_eq!(chan, 3),
            _ => panic!("expected tune"),
        }

        // A stronger carrier appears on another channel.
        src.carriers[1].1 = 1.0;

        let mut block = src.block(50_000);
        let report = p.process(&mut block[..]).unwrap();

        match report.event {
            Some(ScanEvent::Retuned { from, to, rssi }) => {
                assert_eq!(from, 3);
                assert_eq!(to, 11);
                assert!(rssi > 15.0);
            },
            _ => panic!("expected retune"),
        }

        let status = p.status();
        assert_eq!(status.state, ScanState::Tuned(11));
        assert_eq!(status.active, Some(11));
        assert_eq!(status.ctcss, None);

        // Audio from both channels was queued.
        let mut audio = vec![0.0; config.ring_capacity];
        assert_eq!(handle.fill(&mut audio[..]), 1875);
    }

    #[test]
    fn test_out_of_band() {
        // Carriers just past the resampled band edges fold onto the edge channels
        // unless the resampler rejects them.
        let config = Config::default();
        let mut p = Pipeline::new(&config).unwrap();
        let mut src = FmSource::carriers(vec![(104_000.0, 0.5), (-104_000.0, 0.5)],
                                         vec![]);

        for _ in 0..3 {
            let mut block = src.block(50_000);
            let report = p.process(&mut block[..]).unwrap();

            assert!(report.event.is_none());
            assert_eq!(p.status().active, None);

            for &l in p.levels().iter() {
                assert!(l < config.squelch - 10.0);
            }
        }
    }

    #[test]
    fn test_ring_log() {
        let config = Config::default();
        let mut p = Pipeline::new(&config).unwrap();
        let mut src = FmSource::new(5, vec![(1000.0, 2500.0)]);

        capture(&p);

        for _ in 0..2 {
            let mut block = src.block(50_000);
            p.process(&mut block[..]).unwrap();
        }

        let (lines, under_lock) = captured();

        assert!(lines.iter().any(|l| l.starts_with("Tuned to channel 6 (RSSI: ")));
        assert!(lines.iter().any(|l| l == "625 samples in audio buffer (15.0% used)"));
        assert!(lines.iter().any(|l| l == "1250 samples in audio buffer (30.0% used)"));
        assert_eq!(under_lock, 0);
    }

    #[test]
    fn test_quiet_waterfall() {
        let config = Config { waterfall: 32, ..Config::default() };
        let mut p = Pipeline::new(&config).unwrap();
        let mut src = FmSource::new(5, vec![(1000.0, 2500.0)]);
        let mut events = vec![];

        capture(&p);

        for _ in 0..2 {
            let mut block = src.block(50_000);
            events.extend(p.process(&mut block[..]).unwrap().event);
        }

        let (lines, _) = captured();

        // Tuning still happens, it just isn't logged.
        assert_eq!(events.len(), 1);
        assert_eq!(p.status().active, Some(5));
        assert!(lines.is_empty());
        assert_eq!(p.resampled().len(), 10_000);
    }
}
