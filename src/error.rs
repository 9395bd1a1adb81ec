//! Receiver error types.

use std::error;
use std::fmt;
use std::io;

/// Result with the receiver `Error` type.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal receiver errors.
///
/// Anything surfacing as an `Error` terminates the process. Transient radio read failures
/// are reported separately through `sdr::ReadError`.
#[derive(Debug)]
pub enum Error {
    /// Invalid user configuration, detected before any device is opened.
    Config(String),
    /// Radio or audio device is missing or rejected a setting.
    Device(String),
    /// I/O error on a replay file or audio output stream.
    Io(io::Error),
    /// The audio producer wrote past the ring buffer capacity.
    Overflow {
        /// Samples that could not be queued.
        dropped: usize,
        /// Ring buffer capacity.
        capacity: usize,
    },
    /// A worker thread panicked.
    Thread(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Config(ref msg) => write!(f, "invalid configuration: {}", msg),
            Error::Device(ref msg) => write!(f, "device error: {}", msg),
            Error::Io(ref err) => write!(f, "I/O error: {}", err),
            Error::Overflow { dropped, capacity } =>
                write!(f, "audio buffer overflow: {} samples dropped (capacity {})",
                       dropped, capacity),
            Error::Thread(name) => write!(f, "{} thread panicked", name),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Io(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Error::Config("empty channel mask".to_string()).to_string(),
                   "invalid configuration: empty channel mask");
        assert_eq!(Error::Overflow { dropped: 3, capacity: 10 }.to_string(),
                   "audio buffer overflow: 3 samples dropped (capacity 10)");
    }
}
