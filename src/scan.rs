//! Channel scan and squelch state machine.

use config::{ChannelMask, LockMode};

use self::ScanState::*;
use self::StateChange::*;

/// Current state of the scanner.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ScanState {
    /// Looking for a channel above squelch.
    Scanning,
    /// Locked onto the given channel.
    Tuned(usize),
}

/// Transition the receiver should act on.
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum ScanEvent {
    /// A channel rose above squelch while scanning.
    Tuned { chan: usize, rssi: f32 },
    /// A stronger channel took over from the active one.
    Retuned { from: usize, to: usize, rssi: f32 },
    /// The active channel dropped below the release level.
    Detuned { chan: usize, rssi: f32 },
}

/// How the state machine should change/output.
enum StateChange {
    Change(ScanState, ScanEvent),
    NoChange,
}

/// Squelch and lock policy over per-channel signal levels.
pub struct Scanner {
    /// Current state.
    state: ScanState,
    /// Channels eligible for selection.
    mask: ChannelMask,
    /// Behavior once tuned.
    lock: LockMode,
    /// Level a channel must exceed to be selected (dB).
    squelch: f32,
    /// Margin below squelch before the active channel is released (dB).
    hysteresis: f32,
    /// Most recent level of the active or strongest channel (dB).
    rssi: f32,
}

impl Scanner {
    /// Create a new `Scanner` over the given channels. The scanner starts out scanning.
    pub fn new(mask: ChannelMask, lock: LockMode, squelch: f32, hysteresis: f32) -> Self {
        Scanner {
            state: Scanning,
            mask: mask,
            lock: lock,
            squelch: squelch,
            hysteresis: hysteresis,
            rssi: ::std::f32::NEG_INFINITY,
        }
    }

    pub fn state(&self) -> ScanState { self.state }

    /// Currently active channel, if any.
    pub fn active(&self) -> Option<usize> {
        match self.state {
            Scanning => None,
            Tuned(c) => Some(c),
        }
    }

    /// Most recently measured level (dB).
    pub fn rssi(&self) -> f32 { self.rssi }

    /// Evaluate one block, where `rssi` measures the level of the given channel.
    ///
    /// Only channels in the mask are ever measured.
    pub fn update<F: FnMut(usize) -> f32>(&mut self, mut rssi: F) -> Option<ScanEvent> {
        let next = match self.state {
            Scanning => match self.strongest(&mut rssi) {
                Some((chan, r)) => {
                    self.rssi = r;

                    if r > self.squelch {
                        Change(Tuned(chan), ScanEvent::Tuned { chan: chan, rssi: r })
                    } else {
                        NoChange
                    }
                },
                None => NoChange,
            },
            Tuned(cur) => match self.lock {
                LockMode::Start => {
                    let r = rssi(cur);
                    self.rssi = r;

                    if r < self.release() {
                        Change(Scanning, ScanEvent::Detuned { chan: cur, rssi: r })
                    } else {
                        NoChange
                    }
                },
                LockMode::Max => match self.strongest(&mut rssi) {
                    Some((best, r)) => {
                        self.rssi = r;

                        if r < self.release() {
                            Change(Scanning, ScanEvent::Detuned { chan: cur, rssi: r })
                        } else if best != cur {
                            Change(Tuned(best),
                                   ScanEvent::Retuned { from: cur, to: best, rssi: r })
                        } else {
                            NoChange
                        }
                    },
                    None => NoChange,
                },
            },
        };

        self.handle_change(next)
    }

    /// Level below which the active channel is released.
    fn release(&self) -> f32 {
        self.squelch - self.hysteresis
    }

    /// Find the strongest enabled channel, favoring the lowest index on ties.
    fn strongest<F: FnMut(usize) -> f32>(&self, rssi: &mut F) -> Option<(usize, f32)> {
        self.mask.iter().fold(None, |best, chan| {
            let r = rssi(chan);

            match best {
                Some((_, br)) if !(r > br) => best,
                _ => Some((chan, r)),
            }
        })
    }

    /// Apply the given state change.
    fn handle_change(&mut self, c: StateChange) -> Option<ScanEvent> {
        match c {
            Change(s, e) => {
                self.state = s;
                Some(e)
            },
            NoChange => None,
        }
    }
}
