//! Acquisition loop driving the radio chain.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use num::complex::Complex32;
use num::traits::Zero;

use config::Config;
use consts::SDR_READ_TIMEOUT_MS;
use error::Result;
use pipeline::{BlockReport, Pipeline};
use sdr::{ReadError, SampleSource};
use ui::{self, Waterfall};

/// Reads sample blocks from a source and runs them through the pipeline.
pub struct RecvTask<'a, S: SampleSource> {
    source: S,
    pipeline: Pipeline,
    /// Current sample block.
    buf: Vec<Complex32>,
    /// Process-wide shutdown request.
    stop: &'a AtomicBool,
    config: Config,
    waterfall: Option<Waterfall>,
}

impl<'a, S: SampleSource> RecvTask<'a, S> {
    /// Create a new `RecvTask` reading from the given source until it ends or `stop` is
    /// set.
    pub fn new(source: S, pipeline: Pipeline, config: &Config, stop: &'a AtomicBool)
        -> Self
    {
        RecvTask {
            source: source,
            pipeline: pipeline,
            buf: vec![Complex32::zero(); config.chunk],
            stop: stop,
            config: config.clone(),
            waterfall: if config.waterfall > 0 {
                Some(Waterfall::new(config.waterfall, config))
            } else {
                None
            },
        }
    }

    /// Begin receiving, blocking the current thread.
    ///
    /// Returns when the source ends or shutdown is requested, or with the first fatal
    /// error.
    pub fn run(&mut self) -> Result<()> {
        let timeout = Duration::from_millis(SDR_READ_TIMEOUT_MS);

        while !self.stop.load(Ordering::Relaxed) {
            let n = match self.source.read(&mut self.buf[..], timeout) {
                Ok(n) => n,
                Err(ReadError::Eof) => {
                    info!("end of samples");
                    return Ok(());
                },
                Err(e) => {
                    warn!("unable to read samples: {}", e);
                    continue;
                },
            };

            if n == 0 {
                continue;
            }

            let report = self.pipeline.process(&mut self.buf[..n])?;
            self.show(&report)?;
        }

        info!("stopping receiver");

        Ok(())
    }

    /// Output the status for the last block.
    fn show(&mut self, report: &BlockReport) -> Result<()> {
        let status = self.pipeline.status();

        let wf = match self.waterfall {
            Some(ref mut wf) => wf,
            None => {
                if report.channel_len > 0 {
                    debug!("{}", ui::status_line(&self.config, &status));
                }

                return Ok(());
            },
        };

        let stdout = io::stdout();
        let mut out = stdout.lock();

        write!(out, "{}\n{}\r", wf.line(self.pipeline.resampled(), &status),
               wf.footer(&status))?;
        out.flush()?;

        Ok(())
    }
}
