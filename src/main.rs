extern crate clap;
extern crate crossbeam;
extern crate demod_fm;
extern crate env_logger;
extern crate libc;
extern crate num;
extern crate num_complex;
extern crate rustfft;

#[macro_use]
extern crate static_fir;

#[macro_use]
extern crate log;

#[cfg(feature = "soapy")]
extern crate soapysdr;

#[cfg(test)]
extern crate rand;

use std::fmt::Display;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Write};
use std::process;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{App, Arg, ArgMatches};

mod audio;
mod channelizer;
mod config;
mod consts;
mod ctcss;
mod demod;
mod error;
mod filters;
mod kaiser;
mod nco;
mod pipeline;
mod recv;
mod resample;
mod ring;
mod scan;
mod sdr;
mod taps;
mod ui;

use audio::AudioTask;
use config::{ChannelMask, Config};
use error::{Error, Result};
use pipeline::Pipeline;
use recv::RecvTask;
use sdr::{FileSource, SampleFormat, SampleSource};

/// Set by the signal handler to request shutdown.
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_signal(_: libc::c_int) {
    SHUTDOWN.store(true, Ordering::Relaxed);
}

fn install_signals() -> Result<()> {
    for &sig in &[libc::SIGINT, libc::SIGTERM, libc::SIGQUIT] {
        let prev = unsafe {
            libc::signal(sig, handle_signal as extern "C" fn(libc::c_int) as libc::sighandler_t)
        };

        if prev == libc::SIG_ERR {
            return Err(io::Error::last_os_error().into());
        }
    }

    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    if let Err(e) = run() {
        error!("{}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = App::new("pmr446rx")
        .about("PMR446 band scanner/receiver")
        .arg(Arg::with_name("gain")
             .short("g")
             .help("tuner gain in dB (default: 42)")
             .value_name("GAIN"))
        .arg(Arg::with_name("freq")
             .short("f")
             .help("center frequency in Hz (default: 446100000)")
             .value_name("FREQ"))
        .arg(Arg::with_name("squelch")
             .short("s")
             .help("squelch level in dB (default: -5)")
             .value_name("LEVEL"))
        .arg(Arg::with_name("hysteresis")
             .short("H")
             .help("margin below squelch before a channel is released, in dB (default: 5)")
             .value_name("DB"))
        .arg(Arg::with_name("audio-gain")
             .short("a")
             .help("audio gain (default: 4)")
             .value_name("GAIN"))
        .arg(Arg::with_name("mask")
             .short("m")
             .help("channel mask, e.g. 1,2,8-16 to only listen to channels 1, 2, and 8-16")
             .value_name("CHANNELS"))
        .arg(Arg::with_name("lock")
             .short("k")
             .help("lock mode: stay on the first channel (start) or follow the strongest (max)")
             .value_name("MODE"))
        .arg(Arg::with_name("waterfall")
             .short("w")
             .help("print an ASCII waterfall of the given width")
             .value_name("WIDTH"))
        .arg(Arg::with_name("lowpass")
             .short("l")
             .help("enable the 4.5kHz audio lowpass filter"))
        .arg(Arg::with_name("deemph")
             .short("e")
             .help("de-emphasis filter: iir or fir (default: iir)")
             .value_name("KIND"))
        .arg(Arg::with_name("audio")
             .short("o")
             .help("file/fifo for audio samples (f32le/12.5kHz/mono, default: stdout)")
             .value_name("FILE"))
        .arg(Arg::with_name("replay")
             .short("r")
             .help("replay from baseband samples in FILE (- for stdin)")
             .value_name("FILE"))
        .arg(Arg::with_name("format")
             .short("F")
             .help("replay sample format: cf32 or cu8 (default: cf32)")
             .value_name("FORMAT"))
        .arg(Arg::with_name("device")
             .short("d")
             .help("SoapySDR device arguments, e.g. driver=rtlsdr")
             .value_name("ARGS"))
        .get_matches();

    let config = build_config(&args)?;

    info!("gain: {:5.2} dB, audio_gain: {:5.2}, squelch level: {:5.2} dB, waterfall: {}",
          config.gain, config.audio_gain, config.squelch, config.waterfall);
    info!("audio lowpass: {}, channel mask: 0x{:04X}",
          if config.lowpass { "enabled" } else { "disabled" }, config.mask.bits());
    info!("lock mode: {:?}, de-emphasis: {:?}", config.lock, config.deemph);

    config.validate()?;

    if config.waterfall > 0 && args.value_of("audio").unwrap_or("-") == "-" {
        return Err(Error::Config("the waterfall needs an audio output other than stdout"
                                 .to_string()));
    }

    let stream = open_audio(args.value_of("audio").unwrap_or("-"))?;

    install_signals()?;

    let pipeline = Pipeline::new(&config)?;
    let stop_audio = Arc::new(AtomicBool::new(false));

    let mut audio = AudioTask::new(stream, pipeline.audio_handle(), config.audio_rate(),
                                   stop_audio.clone());
    let (args, config) = (&args, &config);

    crossbeam::scope(|scope| -> Result<()> {
        let audio = scope.builder()
            .name("audio".to_string())
            .spawn(move |_| audio.run())?;

        let receiver = match scope.builder()
            .name("receiver".to_string())
            .spawn(move |_| -> Result<()> {
                // Device streams stay on the thread that opened them.
                let source = open_source(args, config)?;
                RecvTask::new(source, pipeline, config, &SHUTDOWN).run()
            })
        {
            Ok(h) => h,
            Err(e) => {
                stop_audio.store(true, Ordering::Relaxed);
                return Err(e.into());
            },
        };

        let recv_res = receiver.join().unwrap_or(Err(Error::Thread("receiver")));

        // Audio stops only once the receiver is done with the ring.
        stop_audio.store(true, Ordering::Relaxed);

        let audio_res = audio.join().unwrap_or(Err(Error::Thread("audio")));

        recv_res.and(audio_res)
    }).unwrap_or(Err(Error::Thread("main")))
}

/// Parse the optional argument with the given name.
fn parse_arg<T>(args: &ArgMatches, name: &str, default: T) -> Result<T>
    where T: FromStr, T::Err: Display
{
    match args.value_of(name) {
        Some(s) => s.parse().map_err(|e| {
            Error::Config(format!("invalid {} '{}': {}", name, s, e))
        }),
        None => Ok(default),
    }
}

/// Parse the optional argument with the given name, for types that report their own
/// configuration errors.
fn parse_kind<T: FromStr<Err = Error>>(args: &ArgMatches, name: &str, default: T)
    -> Result<T>
{
    args.value_of(name).map_or(Ok(default), |s| s.parse())
}

fn build_config(args: &ArgMatches) -> Result<Config> {
    let d = Config::default();

    let mask = match args.value_of("mask") {
        Some(s) => ChannelMask::parse(s, d.num_channels)?,
        None => d.mask,
    };

    Ok(Config {
        frequency: parse_arg(args, "freq", d.frequency)?,
        gain: parse_arg(args, "gain", d.gain)?,
        squelch: parse_arg(args, "squelch", d.squelch)?,
        hysteresis: parse_arg(args, "hysteresis", d.hysteresis)?,
        audio_gain: parse_arg(args, "audio-gain", d.audio_gain)?,
        lock: parse_kind(args, "lock", d.lock)?,
        deemph: parse_kind(args, "deemph", d.deemph)?,
        waterfall: parse_arg(args, "waterfall", d.waterfall)?,
        lowpass: args.is_present("lowpass"),
        mask: mask,
        ..d
    })
}

fn open_source(args: &ArgMatches, config: &Config) -> Result<Box<dyn SampleSource>> {
    let path = match args.value_of("replay") {
        Some(p) => p,
        None => return open_device(args, config),
    };

    let format = parse_kind(args, "format", SampleFormat::Cf32)?;
    let pace = Some(config.sdr_rate);

    info!("replaying {} ({:?})", path, format);

    Ok(if path == "-" {
        Box::new(FileSource::new(io::stdin(), format, pace))
    } else {
        let file = File::open(path).map_err(|e| {
            Error::Device(format!("unable to open replay file {}: {}", path, e))
        })?;

        Box::new(FileSource::new(BufReader::new(file), format, pace))
    })
}

#[cfg(feature = "soapy")]
fn open_device(args: &ArgMatches, config: &Config) -> Result<Box<dyn SampleSource>> {
    let dev = sdr::SoapySource::open(args.value_of("device").unwrap_or(""), config.frequency,
                                     config.sdr_rate, config.gain)?;

    Ok(Box::new(dev))
}

#[cfg(not(feature = "soapy"))]
fn open_device(_: &ArgMatches, _: &Config) -> Result<Box<dyn SampleSource>> {
    Err(Error::Device("built without SoapySDR support (enable the soapy feature or \
                       replay a recording with -r)".to_string()))
}

fn open_audio(path: &str) -> Result<Box<dyn Write + Send>> {
    if path == "-" {
        return Ok(Box::new(io::stdout()));
    }

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| Error::Device(format!("unable to open audio output {}: {}", path, e)))?;

    Ok(Box::new(file))
}
