//! Periodic audio output.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use error::Result;
use ring::AudioHandle;

/// Drains the audio ring buffer once per period and writes the samples to a stream.
pub struct AudioTask<W: Write> {
    /// Stream to write to.
    stream: W,
    /// Source of queued audio.
    ring: AudioHandle,
    /// Samples delivered per period.
    period: usize,
    /// Wall time per period.
    interval: Duration,
    /// Set to stop the task.
    stop: Arc<AtomicBool>,
}

impl<W: Write> AudioTask<W> {
    /// Create a new `AudioTask` writing mono samples at the given rate (Hz), with each
    /// period covering a tenth of a second.
    pub fn new(stream: W, ring: AudioHandle, rate: u32, stop: Arc<AtomicBool>) -> Self {
        let period = rate as usize / 10;

        AudioTask {
            stream: stream,
            ring: ring,
            period: period,
            interval: Duration::from_nanos(period as u64 * 1_000_000_000 / rate as u64),
            stop: stop,
        }
    }

    /// Begin delivering audio, blocking the current thread until stopped or the ring
    /// buffer goes away.
    pub fn run(&mut self) -> Result<()> {
        let mut samples = vec![0.0; self.period];
        let mut bytes = Vec::with_capacity(self.period * 4);
        let mut deadline = Instant::now();

        while !self.stop.load(Ordering::Relaxed) && self.ring.is_alive() {
            self.deliver(&mut samples[..], &mut bytes)?;

            deadline += self.interval;
            let now = Instant::now();

            if deadline > now {
                thread::sleep(deadline - now);
            } else {
                // Fell behind, so start a fresh schedule rather than bursting.
                deadline = now;
            }
        }

        self.stream.flush()?;

        Ok(())
    }

    /// Deliver one period of audio.
    fn deliver(&mut self, samples: &mut [f32], bytes: &mut Vec<u8>) -> Result<()> {
        let n = self.ring.fill(samples);

        if n < samples.len() {
            trace!("audio underrun: {} of {} samples", n, samples.len());
        }

        bytes.clear();

        for s in samples.iter() {
            bytes.extend_from_slice(&s.to_le_bytes());
        }

        self.stream.write_all(&bytes[..])?;
        self.stream.flush()?;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Mutex;
    use ring::AudioRing;

    fn decode(bytes: &[u8]) -> Vec<f32> {
        bytes.chunks(4).map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])).collect()
    }

    #[test]
    fn test_period() {
        let ring = Arc::new(Mutex::new(AudioRing::new(100)));
        let stop = Arc::new(AtomicBool::new(false));
        let mut task = AudioTask::new(Vec::<u8>::new(), AudioHandle::new(&ring), 40, stop);

        ring.lock().unwrap().write(&[0.25, -0.5, 1.0]).unwrap();

        let mut samples = vec![0.0; task.period];
        let mut bytes = vec![];
        task.deliver(&mut samples[..], &mut bytes).unwrap();
        task.deliver(&mut samples[..], &mut bytes).unwrap();

        assert_eq!(decode(&task.stream[..]), vec![0.25, -0.5, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_stops() {
        let ring = Arc::new(Mutex::new(AudioRing::new(200)));
        let stop = Arc::new(AtomicBool::new(false));
        let mut task = AudioTask::new(Vec::<u8>::new(), AudioHandle::new(&ring), 1000,
                                      stop.clone());

        ring.lock().unwrap().write(&[0.5; 150]).unwrap();

        let t = thread::spawn(move || {
            task.run().unwrap();
            task.stream
        });

        thread::sleep(Duration::from_millis(250));
        stop.store(true, Ordering::Relaxed);

        let out = decode(&t.join().unwrap()[..]);

        // Whole periods only, with every queued sample delivered in order.
        assert_eq!(out.len() % 100, 0);
        assert!(out.len() >= 200);
        assert_eq!(&out[..100], &[0.5; 100][..]);
        assert_eq!(out[100..].iter().filter(|&&s| s == 0.5).count(), 50);
    }

    #[test]
    fn test_ring_dropped() {
        let ring = Arc::new(Mutex::new(AudioRing::new(10)));
        let stop = Arc::new(AtomicBool::new(false));
        let mut task = AudioTask::new(Vec::<u8>::new(), AudioHandle::new(&ring), 1000, stop);

        drop(ring);
        task.run().unwrap();

        assert!(task.stream.is_empty());
    }
}
