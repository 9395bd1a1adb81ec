//! Wideband sample sources.

use std::fmt;
use std::io::{self, Read};
use std::str::FromStr;
use std::thread;
use std::time::{Duration, Instant};

use num::complex::Complex32;

use error::Error;

/// Failure to read a block of samples.
#[derive(Debug)]
pub enum ReadError {
    /// No samples arrived within the timeout.
    Timeout,
    /// The source has no more samples.
    Eof,
    /// The stream reported an error.
    Stream(String),
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ReadError::Timeout => write!(f, "read timed out"),
            ReadError::Eof => write!(f, "end of stream"),
            ReadError::Stream(ref msg) => write!(f, "stream error: {}", msg),
        }
    }
}

impl From<io::Error> for ReadError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ReadError::Timeout,
            io::ErrorKind::UnexpectedEof => ReadError::Eof,
            _ => ReadError::Stream(err.to_string()),
        }
    }
}

/// Produces complex baseband samples at the radio sample rate.
pub trait SampleSource {
    /// Read up to `buf.len()` samples, waiting at most about `timeout`, and return the
    /// number of samples read.
    fn read(&mut self, buf: &mut [Complex32], timeout: Duration) -> Result<usize, ReadError>;
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn read(&mut self, buf: &mut [Complex32], timeout: Duration) -> Result<usize, ReadError> {
        (**self).read(buf, timeout)
    }
}

/// Encoding of recorded baseband samples.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SampleFormat {
    /// Interleaved little-endian `f32` I/Q pairs.
    Cf32,
    /// Interleaved unsigned 8-bit I/Q pairs, as written by `rtl_sdr`.
    Cu8,
}

impl SampleFormat {
    /// Bytes per complex sample.
    pub fn size(&self) -> usize {
        match *self {
            SampleFormat::Cf32 => 8,
            SampleFormat::Cu8 => 2,
        }
    }

    fn decode(&self, bytes: &[u8]) -> Complex32 {
        match *self {
            SampleFormat::Cf32 => Complex32::new(
                f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
                f32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            ),
            SampleFormat::Cu8 => Complex32::new(
                (bytes[0] as f32 - 127.5) / 128.0,
                (bytes[1] as f32 - 127.5) / 128.0,
            ),
        }
    }
}

impl FromStr for SampleFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cf32" => Ok(SampleFormat::Cf32),
            "cu8" => Ok(SampleFormat::Cu8),
            _ => Err(Error::Config(format!("unknown sample format '{}' (cf32|cu8)", s))),
        }
    }
}

/// Replays recorded baseband from a byte stream.
pub struct FileSource<R: Read> {
    stream: R,
    format: SampleFormat,
    /// Raw bytes, including a partial sample left from the previous read.
    bytes: Vec<u8>,
    /// Number of valid bytes in `bytes`.
    fill: usize,
    /// Sample rate to pace delivery at, if any.
    pace: Option<u32>,
    /// Start time and samples delivered since, for pacing.
    clock: Option<(Instant, u64)>,
}

impl<R: Read> FileSource<R> {
    /// Create a new `FileSource` over the given stream. If `pace` is given, samples are
    /// delivered no faster than that rate (samples per second).
    pub fn new(stream: R, format: SampleFormat, pace: Option<u32>) -> Self {
        FileSource {
            stream: stream,
            format: format,
            bytes: vec![],
            fill: 0,
            pace: pace,
            clock: None,
        }
    }

    /// Sleep until the given number of samples are due.
    fn wait(&mut self, count: usize) {
        let rate = match self.pace {
            Some(r) => r as u64,
            None => return,
        };

        let (start, sent) = *self.clock.get_or_insert_with(|| (Instant::now(), 0));
        let sent = sent + count as u64;
        let due = start + Duration::from_micros(sent * 1_000_000 / rate);
        let now = Instant::now();

        if due > now {
            thread::sleep(due - now);
        }

        self.clock = Some((start, sent));
    }
}

impl<R: Read> SampleSource for FileSource<R> {
    fn read(&mut self, buf: &mut [Complex32], _: Duration) -> Result<usize, ReadError> {
        let size = self.format.size();
        let want = buf.len() * size;

        if self.bytes.len() < want {
            self.bytes.resize(want, 0);
        }

        // Fill as much of the buffer as the stream provides, stopping at end of stream.
        while self.fill < want {
            match self.stream.read(&mut self.bytes[self.fill..want]) {
                Ok(0) => break,
                Ok(n) => self.fill += n,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        let count = self.fill / size;

        if count == 0 {
            return Err(ReadError::Eof);
        }

        for (s, b) in buf.iter_mut().zip(self.bytes[..count * size].chunks(size)) {
            *s = self.format.decode(b);
        }

        // Keep any trailing partial sample for the next read.
        let used = count * size;
        let rem = self.fill - used;

        for i in 0..rem {
            self.bytes[i] = self.bytes[used + i];
        }

        self.fill = rem;
        self.wait(count);

        Ok(count)
    }
}

#[cfg(feature = "soapy")]
pub use self::soapy::SoapySource;

#[cfg(feature = "soapy")]
mod soapy {
    use std::time::Duration;

    use num::complex::Complex32;
    use num_complex;
    use soapysdr::{self, Device, Direction, ErrorCode, RxStream};

    use error::{Error, Result};
    use super::{ReadError, SampleSource};

    /// Live samples from a SoapySDR device.
    pub struct SoapySource {
        stream: RxStream<num_complex::Complex32>,
        /// Device-native samples for the current read.
        raw: Vec<num_complex::Complex32>,
    }

    fn device_err(e: soapysdr::Error) -> Error {
        Error::Device(e.to_string())
    }

    impl SoapySource {
        /// Open the device matching the given arguments and start streaming from its
        /// single receive channel.
        pub fn open(args: &str, freq: f64, rate: u32, gain: f64) -> Result<Self> {
            let dev = Device::new(args).map_err(device_err)?;

            let chans = dev.num_channels(Direction::Rx).map_err(device_err)?;

            if chans != 1 {
                return Err(Error::Device(format!(
                    "expected a single receive channel (device has {})", chans)));
            }

            dev.set_sample_rate(Direction::Rx, 0, rate as f64).map_err(device_err)?;
            dev.set_frequency(Direction::Rx, 0, freq, ()).map_err(device_err)?;
            dev.set_gain(Direction::Rx, 0, gain).map_err(device_err)?;

            info!("opened {} at {:.3}MHz, {}S/s", args, freq / 1e6, rate);

            let mut stream = dev.rx_stream::<num_complex::Complex32>(&[0]).map_err(device_err)?;
            stream.activate(None).map_err(device_err)?;

            Ok(SoapySource {
                stream: stream,
                raw: Vec::new(),
            })
        }
    }

    impl SampleSource for SoapySource {
        fn read(&mut self, buf: &mut [Complex32], timeout: Duration)
            -> ::std::result::Result<usize, ReadError>
        {
            let us = timeout.as_micros() as i64;

            self.raw.resize(buf.len(), num_complex::Complex32::new(0.0, 0.0));

            match self.stream.read(&mut [&mut self.raw[..]], us) {
                Ok(n) => {
                    for (dst, src) in buf.iter_mut().zip(&self.raw[..n]) {
                        *dst = Complex32::new(src.re, src.im);
                    }

                    Ok(n)
                },
                Err(e) => match e.code {
                    ErrorCode::Timeout => Err(ReadError::Timeout),
                    _ => Err(ReadError::Stream(e.to_string())),
                },
            }
        }
    }

    impl Drop for SoapySource {
        fn drop(&mut self) {
            if let Err(e) = self.stream.deactivate(None) {
                warn!("unable to stop stream: {}", e);
            }
        }
    }
}
