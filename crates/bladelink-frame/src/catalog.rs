//! Typed constructors for common device commands.
//!
//! A convenience layer over [`Command`]; anything not covered here can be
//! built with `Command::new` directly.

use std::fmt;

use crate::command::Command;
use crate::target::{DST, LIO, MIC, SALVO, SLIO, SYS, UMIX, UMIXSUB};

/// Source id that disconnects a destination.
pub const SRC_NONE: &str = "0000FFFF";

/// Utility mixer output bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bus {
    A,
    B,
}

impl Bus {
    fn suffix(self) -> char {
        match self {
            Bus::A => 'A',
            Bus::B => 'B',
        }
    }
}

impl fmt::Display for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.suffix())
    }
}

/// Direction and bus of an input ramp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ramp {
    Up(Bus),
    Down(Bus),
}

impl Ramp {
    fn key(self) -> String {
        match self {
            Ramp::Up(bus) => format!("URAMP{bus}"),
            Ramp::Down(bus) => format!("DRAMP{bus}"),
        }
    }
}

/// Ramp speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampSpeed {
    Off = 0,
    Fast = 1,
    Medium = 2,
    Slow = 3,
}

fn flag(on: bool) -> u8 {
    u8::from(on)
}

fn input(mixer: u8, channel: u8) -> Command {
    Command::new(UMIX).at(format!("{mixer}.{channel}"))
}

fn output(mixer: u8, bus: Bus) -> Command {
    Command::new(UMIX).at(format!("{mixer}.{bus}"))
}

/// `<SYS|IFID:name>`: identify this client to the device.
pub fn set_interface_id(name: &str) -> Command {
    Command::new(SYS).param("IFID", name)
}

/// `<SYS|SUBRATE:capacity.rate>`: subscription burst capacity and messages per second.
pub fn set_subscription_rate(capacity: u32, rate: u32) -> Command {
    Command::new(SYS).param("SUBRATE", format!("{capacity}.{rate}"))
}

/// `<SYS?>`: request system information.
pub fn system_info() -> Command {
    Command::query(SYS)
}

pub fn umix_input_on(mixer: u8, channel: u8, on: bool) -> Command {
    input(mixer, channel).param("ON", flag(on))
}

/// Set the A or B fader of an input, in dB.
pub fn umix_input_fader(mixer: u8, channel: u8, bus: Bus, db: f32) -> Command {
    input(mixer, channel).param(format!("FDR{bus}"), db)
}

/// Nudge the A or B fader of an input by `delta` dB.
pub fn umix_input_increment(mixer: u8, channel: u8, bus: Bus, delta: f32) -> Command {
    input(mixer, channel).param(format!("INC{bus}"), delta)
}

pub fn umix_input_duck(mixer: u8, channel: u8, bus: Bus, on: bool) -> Command {
    input(mixer, channel).param(format!("DUCK{bus}"), flag(on))
}

/// Set the balance toward bus A or B, -100..=100 percent.
pub fn umix_input_balance(mixer: u8, channel: u8, bus: Bus, percent: i8) -> Command {
    input(mixer, channel).param(format!("BAL{bus}"), percent)
}

pub fn umix_input_ramp(mixer: u8, channel: u8, ramp: Ramp, speed: RampSpeed) -> Command {
    input(mixer, channel).param(ramp.key(), speed as u8)
}

pub fn umix_output_on(mixer: u8, bus: Bus, on: bool) -> Command {
    output(mixer, bus).param("ON", flag(on))
}

pub fn umix_master_fader(mixer: u8, bus: Bus, db: f32) -> Command {
    output(mixer, bus).param("MFDR", db)
}

pub fn umix_master_increment(mixer: u8, bus: Bus, delta: f32) -> Command {
    output(mixer, bus).param("MINC", delta)
}

/// Subscribe to (or unsubscribe from) change events for one mixer parameter.
///
/// The device answers with `<OK>` and then emits `UMIXEVENT` frames.
pub fn umix_subscribe(subaddr: &str, parameter: &str, enabled: bool) -> Command {
    Command::new(UMIXSUB).at(subaddr).param(parameter, flag(enabled))
}

pub fn dst_set_source(dst: &str, src: &str) -> Command {
    Command::new(DST).at(dst).param("SRC", src)
}

pub fn dst_disconnect(dst: &str) -> Command {
    dst_set_source(dst, SRC_NONE)
}

pub fn dst_lock(dst: &str, locked: bool) -> Command {
    Command::new(DST).at(dst).param("LOCKED", flag(locked))
}

pub fn salvo_fire(salvo: u16) -> Command {
    Command::new(SALVO).at(salvo.to_string()).param("FIRE", 1)
}

/// Drive a stereo logic pin. `index` is a pin on card 0 or `CARD.CIRCUIT`.
pub fn slio_level(index: &str, high: bool) -> Command {
    Command::new(SLIO).at(index).param("LVL", flag(high))
}

pub fn lio_level(index: &str, high: bool) -> Command {
    Command::new(LIO).at(index).param("LVL", flag(high))
}

/// Switch phantom power. `mic` is a source id in hex or dotted notation.
pub fn mic_phantom_power(mic: &str, on: bool) -> Command {
    Command::new(MIC).at(mic).param("PPWR", flag(on))
}
