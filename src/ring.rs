//! Audio ring buffer shared between the receiver and the audio output.

use std::sync::{Arc, Mutex, Weak};

use error::{Error, Result};

/// Bounded circular buffer of audio samples.
pub struct AudioRing {
    buf: Vec<f32>,
    /// Index of the oldest sample.
    head: usize,
    /// Number of queued samples.
    len: usize,
}

impl AudioRing {
    /// Create a new `AudioRing` holding at most `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0);

        AudioRing {
            buf: vec![0.0; capacity],
            head: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize { self.buf.len() }

    /// Number of queued samples.
    pub fn len(&self) -> usize { self.len }

    /// Append the given samples.
    ///
    /// Samples that don't fit are dropped and reported as an overflow, leaving the queued
    /// samples intact.
    pub fn write(&mut self, samples: &[f32]) -> Result<()> {
        let cap = self.capacity();
        let n = samples.len().min(cap - self.len);

        for &s in &samples[..n] {
            let idx = (self.head + self.len) % cap;
            self.buf[idx] = s;
            self.len += 1;
        }

        if n < samples.len() {
            Err(Error::Overflow {
                dropped: samples.len() - n,
                capacity: cap,
            })
        } else {
            Ok(())
        }
    }

    /// Move up to `out.len()` of the oldest samples into `out`, returning how many were
    /// copied.
    pub fn read(&mut self, out: &mut [f32]) -> usize {
        let cap = self.capacity();
        let n = out.len().min(self.len);

        for o in out[..n].iter_mut() {
            *o = self.buf[self.head];
            self.head = (self.head + 1) % cap;
        }

        self.len -= n;

        n
    }
}

/// Consumer access to a ring buffer owned elsewhere.
#[derive(Clone)]
pub struct AudioHandle(Weak<Mutex<AudioRing>>);

impl AudioHandle {
    /// Create a new `AudioHandle` that doesn't keep the given ring alive.
    pub fn new(ring: &Arc<Mutex<AudioRing>>) -> Self {
        AudioHandle(Arc::downgrade(ring))
    }

    /// Fill the given buffer from the ring, padding any shortfall with silence, and
    /// return the number of queued samples delivered.
    ///
    /// This never waits on the producer beyond the short ring critical section.
    pub fn fill(&self, out: &mut [f32]) -> usize {
        let n = match self.0.upgrade() {
            Some(ring) => match ring.lock() {
                Ok(mut ring) => ring.read(out),
                Err(_) => 0,
            },
            None => 0,
        };

        for s in out[n..].iter_mut() {
            *s = 0.0;
        }

        n
    }

    /// Whether the owning ring still exists.
    pub fn is_alive(&self) -> bool {
        self.0.upgrade().is_some()
    }
}
