//! Host Register Map
//!
//! Seven registers per voice follow the SID ordering (frequency, pulse width,
//! attack/decay, sustain/release, control) and four registers for the filter
//! block (cutoff, resonance/routing, mode/volume). The engine reads these once
//! per tick; the host writes them at any time.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of registers per voice
pub const VOICE_REGISTER_COUNT: usize = 7;

/// Number of filter registers
pub const FILTER_REGISTER_COUNT: usize = 4;

/// Bus address bit selecting the filter block
pub const BUS_FILTER_SELECT: u8 = 0x20;

bitflags! {
    /// Waveform control register bits ($D404 layout)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ControlFlags: u8 {
        /// Envelope gate
        const GATE = 0x01;
        /// Hard sync to the source voice
        const SYNC = 0x02;
        /// Ring modulation by the source voice
        const RING = 0x04;
        /// Hold oscillator and noise register in reset
        const TEST = 0x08;
        /// Triangle waveform select
        const TRIANGLE = 0x10;
        /// Sawtooth waveform select
        const SAWTOOTH = 0x20;
        /// Pulse waveform select
        const PULSE = 0x40;
        /// Noise waveform select
        const NOISE = 0x80;
    }
}

impl ControlFlags {
    /// Only the waveform select bits
    #[inline]
    pub fn waveforms(self) -> Self {
        self & (Self::TRIANGLE | Self::SAWTOOTH | Self::PULSE | Self::NOISE)
    }
}

bitflags! {
    /// Filter mode nibble (upper half of the mode/volume register)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ModeFlags: u8 {
        /// Low-pass output select
        const LOWPASS = 0x10;
        /// Band-pass output select
        const BANDPASS = 0x20;
        /// High-pass output select
        const HIGHPASS = 0x40;
        /// Remove voice 3 from the direct path
        const VOICE3_OFF = 0x80;
    }
}

/// Target of a register write: one voice or the filter block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegisterTarget {
    /// Voice by index
    Voice(usize),
    /// Filter block
    Filter,
}

impl fmt::Display for RegisterTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterTarget::Voice(index) => write!(f, "voice {}", index),
            RegisterTarget::Filter => write!(f, "filter"),
        }
    }
}

/// Decode a flat bus address into a target and register address
///
/// Bits 0-2 select the register, bits 3-4 the voice. Bit 5 selects the
/// filter block instead of a voice.
pub fn decode_bus_address(addr: u8) -> (RegisterTarget, u8) {
    if addr & BUS_FILTER_SELECT != 0 {
        (RegisterTarget::Filter, addr & 0x07)
    } else {
        (RegisterTarget::Voice(((addr >> 3) & 0x03) as usize), addr & 0x07)
    }
}

/// Per-voice register address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoiceRegister {
    /// Frequency (low byte)
    FreqLo = 0x00,
    /// Frequency (high byte)
    FreqHi = 0x01,
    /// Pulse width (low byte)
    PulseWidthLo = 0x02,
    /// Pulse width (high nibble, 12-bit pulse width only)
    PulseWidthHi = 0x03,
    /// Attack and decay rates (packed nibbles)
    AttackDecay = 0x04,
    /// Sustain level and release rate (packed nibbles)
    SustainRelease = 0x05,
    /// Waveform control flags
    Control = 0x06,
}

impl VoiceRegister {
    /// Convert a raw register number to a voice register
    pub fn from_addr(addr: u8) -> Option<Self> {
        match addr {
            0x00 => Some(VoiceRegister::FreqLo),
            0x01 => Some(VoiceRegister::FreqHi),
            0x02 => Some(VoiceRegister::PulseWidthLo),
            0x03 => Some(VoiceRegister::PulseWidthHi),
            0x04 => Some(VoiceRegister::AttackDecay),
            0x05 => Some(VoiceRegister::SustainRelease),
            0x06 => Some(VoiceRegister::Control),
            _ => None,
        }
    }

    /// Get the register address value
    pub fn addr(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for VoiceRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoiceRegister::FreqLo => write!(f, "R0 (Frequency Low)"),
            VoiceRegister::FreqHi => write!(f, "R1 (Frequency High)"),
            VoiceRegister::PulseWidthLo => write!(f, "R2 (Pulse Width Low)"),
            VoiceRegister::PulseWidthHi => write!(f, "R3 (Pulse Width High)"),
            VoiceRegister::AttackDecay => write!(f, "R4 (Attack/Decay)"),
            VoiceRegister::SustainRelease => write!(f, "R5 (Sustain/Release)"),
            VoiceRegister::Control => write!(f, "R6 (Waveform Control)"),
        }
    }
}

/// Filter block register address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterRegister {
    /// Cutoff (low 3 bits)
    CutoffLo = 0x00,
    /// Cutoff (high 8 bits)
    CutoffHi = 0x01,
    /// Resonance (high nibble) and voice routing (low nibble)
    ResonanceRouting = 0x02,
    /// Mode flags (high nibble) and volume (low nibble)
    ModeVolume = 0x03,
}

impl FilterRegister {
    /// Convert a raw register number to a filter register
    pub fn from_addr(addr: u8) -> Option<Self> {
        match addr {
            0x00 => Some(FilterRegister::CutoffLo),
            0x01 => Some(FilterRegister::CutoffHi),
            0x02 => Some(FilterRegister::ResonanceRouting),
            0x03 => Some(FilterRegister::ModeVolume),
            _ => None,
        }
    }

    /// Get the register address value
    pub fn addr(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for FilterRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterRegister::CutoffLo => write!(f, "F0 (Cutoff Low)"),
            FilterRegister::CutoffHi => write!(f, "F1 (Cutoff High)"),
            FilterRegister::ResonanceRouting => write!(f, "F2 (Resonance/Routing)"),
            FilterRegister::ModeVolume => write!(f, "F3 (Mode/Volume)"),
        }
    }
}

/// Nibble order of the packed envelope registers
///
/// Several incompatible layouts exist across hardware variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterLayout {
    /// Attack/sustain in the high nibble, decay/release in the low nibble
    #[default]
    Sid,
    /// Decay/release in the high nibble, attack/sustain in the low nibble
    Swapped,
}

impl RegisterLayout {
    /// Split a packed register into (attack or sustain, decay or release)
    #[inline]
    fn unpack(self, value: u8) -> (u8, u8) {
        let (hi, lo) = (value >> 4, value & 0x0F);
        match self {
            RegisterLayout::Sid => (hi, lo),
            RegisterLayout::Swapped => (lo, hi),
        }
    }
}

/// Decoded per-voice registers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoiceRegisters {
    /// 16-bit phase increment
    pub frequency: u16,
    /// Pulse width (8 or 12 bits)
    pub pulse_width: u16,
    /// Attack rate index (0-15)
    pub attack: u8,
    /// Decay rate index (0-15)
    pub decay: u8,
    /// Sustain level (0-15)
    pub sustain: u8,
    /// Release rate index (0-15)
    pub release: u8,
    /// Waveform control flags
    pub control: ControlFlags,
    raw: [u8; VOICE_REGISTER_COUNT],
}

impl VoiceRegisters {
    /// Gate bit
    #[inline]
    pub fn gate(&self) -> bool {
        self.control.contains(ControlFlags::GATE)
    }

    /// Sync bit
    #[inline]
    pub fn sync(&self) -> bool {
        self.control.contains(ControlFlags::SYNC)
    }

    /// Ring modulation bit
    #[inline]
    pub fn ring(&self) -> bool {
        self.control.contains(ControlFlags::RING)
    }

    /// Test bit
    #[inline]
    pub fn test(&self) -> bool {
        self.control.contains(ControlFlags::TEST)
    }

    fn write(&mut self, reg: VoiceRegister, value: u8, layout: RegisterLayout, pw_bits: u8) {
        self.raw[reg as usize] = value;
        match reg {
            VoiceRegister::FreqLo => self.frequency = (self.frequency & 0xFF00) | value as u16,
            VoiceRegister::FreqHi => {
                self.frequency = (self.frequency & 0x00FF) | ((value as u16) << 8)
            }
            VoiceRegister::PulseWidthLo => {
                self.pulse_width = if pw_bits > 8 {
                    (self.pulse_width & 0x0F00) | value as u16
                } else {
                    value as u16
                }
            }
            VoiceRegister::PulseWidthHi => {
                if pw_bits > 8 {
                    self.pulse_width = (self.pulse_width & 0x00FF) | (((value & 0x0F) as u16) << 8);
                }
            }
            VoiceRegister::AttackDecay => (self.attack, self.decay) = layout.unpack(value),
            VoiceRegister::SustainRelease => (self.sustain, self.release) = layout.unpack(value),
            VoiceRegister::Control => self.control = ControlFlags::from_bits_retain(value),
        }
    }
}

/// Decoded filter block registers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterRegisters {
    /// 11-bit cutoff
    pub cutoff: u16,
    /// Resonance (0-15)
    pub resonance: u8,
    /// Voice routing mask (bit n routes voice n into the filter)
    pub routing: u8,
    /// Mode flags
    pub mode: ModeFlags,
    /// Output volume (0-15)
    pub volume: u8,
    raw: [u8; FILTER_REGISTER_COUNT],
}

impl FilterRegisters {
    fn write(&mut self, reg: FilterRegister, value: u8) {
        self.raw[reg as usize] = value;
        match reg {
            FilterRegister::CutoffLo => self.cutoff = (self.cutoff & 0x7F8) | (value & 0x07) as u16,
            FilterRegister::CutoffHi => self.cutoff = (self.cutoff & 0x007) | ((value as u16) << 3),
            FilterRegister::ResonanceRouting => {
                self.resonance = value >> 4;
                self.routing = value & 0x0F;
            }
            FilterRegister::ModeVolume => {
                self.mode = ModeFlags::from_bits_truncate(value & 0xF0);
                self.volume = value & 0x0F;
            }
        }
    }
}

/// Complete register file for all voices and the filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterFile {
    voices: Vec<VoiceRegisters>,
    filter: FilterRegisters,
    layout: RegisterLayout,
    pulse_width_bits: u8,
}

impl RegisterFile {
    /// Create a zeroed register file
    pub fn new(voices: usize, layout: RegisterLayout, pulse_width_bits: u8) -> Self {
        RegisterFile {
            voices: vec![VoiceRegisters::default(); voices],
            filter: FilterRegisters::default(),
            layout,
            pulse_width_bits,
        }
    }

    /// Write a register
    ///
    /// Returns false (and changes nothing) when the target or address does not exist.
    pub fn write(&mut self, target: RegisterTarget, addr: u8, value: u8) -> bool {
        match target {
            RegisterTarget::Voice(index) => {
                let (Some(voice), Some(reg)) =
                    (self.voices.get_mut(index), VoiceRegister::from_addr(addr))
                else {
                    return false;
                };
                voice.write(reg, value, self.layout, self.pulse_width_bits);
                true
            }
            RegisterTarget::Filter => match FilterRegister::from_addr(addr) {
                Some(reg) => {
                    self.filter.write(reg, value);
                    true
                }
                None => false,
            },
        }
    }

    /// Read back the last value written to a register, or 0 for invalid addresses
    pub fn read(&self, target: RegisterTarget, addr: u8) -> u8 {
        let addr = addr as usize;
        match target {
            RegisterTarget::Voice(index) => self
                .voices
                .get(index)
                .and_then(|voice| voice.raw.get(addr).copied())
                .unwrap_or(0),
            RegisterTarget::Filter => self.filter.raw.get(addr).copied().unwrap_or(0),
        }
    }

    /// Raw register bytes: each voice's seven registers, then the filter block
    pub fn dump(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.voices.len() * VOICE_REGISTER_COUNT + FILTER_REGISTER_COUNT);
        for voice in &self.voices {
            out.extend_from_slice(&voice.raw);
        }
        out.extend_from_slice(&self.filter.raw);
        out
    }

    /// Decoded registers for one voice
    #[inline]
    pub fn voice(&self, index: usize) -> &VoiceRegisters {
        &self.voices[index]
    }

    /// Decoded registers for all voices
    #[inline]
    pub fn voices(&self) -> &[VoiceRegisters] {
        &self.voices
    }

    /// Decoded filter registers
    #[inline]
    pub fn filter(&self) -> &FilterRegisters {
        &self.filter
    }

    /// Clear every register to zero
    pub fn clear(&mut self) {
        self.voices.fill(VoiceRegisters::default());
        self.filter = FilterRegisters::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file() -> RegisterFile {
        RegisterFile::new(3, RegisterLayout::Sid, 12)
    }

    #[test]
    fn test_register_conversion() {
        assert_eq!(VoiceRegister::from_addr(0x00), Some(VoiceRegister::FreqLo));
        assert_eq!(VoiceRegister::from_addr(0x06), Some(VoiceRegister::Control));
        assert_eq!(VoiceRegister::from_addr(0x07), None);
        assert_eq!(FilterRegister::from_addr(0x03), Some(FilterRegister::ModeVolume));
        assert_eq!(FilterRegister::from_addr(0x04), None);
    }

    #[test]
    fn test_frequency_bytes_combine() {
        let mut regs = file();
        regs.write(RegisterTarget::Voice(1), 0, 0x34);
        regs.write(RegisterTarget::Voice(1), 1, 0x12);
        assert_eq!(regs.voice(1).frequency, 0x1234);
        assert_eq!(regs.voice(0).frequency, 0);
    }

    #[test]
    fn test_pulse_width_12_bit() {
        let mut regs = file();
        regs.write(RegisterTarget::Voice(0), 2, 0xAB);
        regs.write(RegisterTarget::Voice(0), 3, 0xFC);
        assert_eq!(regs.voice(0).pulse_width, 0xCAB);
    }

    #[test]
    fn test_pulse_width_8_bit_ignores_high_byte() {
        let mut regs = RegisterFile::new(1, RegisterLayout::Sid, 8);
        regs.write(RegisterTarget::Voice(0), 2, 0x80);
        regs.write(RegisterTarget::Voice(0), 3, 0x0F);
        assert_eq!(regs.voice(0).pulse_width, 0x80);
    }

    #[test]
    fn test_nibble_layouts() {
        let mut sid = file();
        sid.write(RegisterTarget::Voice(0), 4, 0x3A);
        sid.write(RegisterTarget::Voice(0), 5, 0xC5);
        let v = sid.voice(0);
        assert_eq!((v.attack, v.decay, v.sustain, v.release), (0x3, 0xA, 0xC, 0x5));

        let mut swapped = RegisterFile::new(1, RegisterLayout::Swapped, 8);
        swapped.write(RegisterTarget::Voice(0), 4, 0x3A);
        swapped.write(RegisterTarget::Voice(0), 5, 0xC5);
        let v = swapped.voice(0);
        assert_eq!((v.attack, v.decay, v.sustain, v.release), (0xA, 0x3, 0x5, 0xC));
    }

    #[test]
    fn test_filter_registers() {
        let mut regs = file();
        regs.write(RegisterTarget::Filter, 0, 0xFF);
        regs.write(RegisterTarget::Filter, 1, 0x80);
        regs.write(RegisterTarget::Filter, 2, 0xF5);
        regs.write(RegisterTarget::Filter, 3, 0x9C);
        let f = regs.filter();
        assert_eq!(f.cutoff, (0x80 << 3) | 0x07);
        assert_eq!(f.resonance, 0x0F);
        assert_eq!(f.routing, 0x05);
        assert_eq!(f.mode, ModeFlags::LOWPASS | ModeFlags::VOICE3_OFF);
        assert_eq!(f.volume, 0x0C);
    }

    #[test]
    fn test_out_of_range_writes_are_ignored() {
        let mut regs = file();
        regs.write(RegisterTarget::Voice(0), 0, 0x11);
        let before = regs.clone();
        assert!(!regs.write(RegisterTarget::Voice(0), 7, 0xFF));
        assert!(!regs.write(RegisterTarget::Voice(3), 0, 0xFF));
        assert!(!regs.write(RegisterTarget::Filter, 4, 0xFF));
        assert_eq!(regs, before);
    }

    #[test]
    fn test_read_back_and_dump() {
        let mut regs = file();
        regs.write(RegisterTarget::Voice(2), 6, 0x41);
        regs.write(RegisterTarget::Filter, 3, 0x1F);
        assert_eq!(regs.read(RegisterTarget::Voice(2), 6), 0x41);
        assert_eq!(regs.read(RegisterTarget::Voice(9), 6), 0);
        let dump = regs.dump();
        assert_eq!(dump.len(), 3 * VOICE_REGISTER_COUNT + FILTER_REGISTER_COUNT);
        assert_eq!(dump[2 * VOICE_REGISTER_COUNT + 6], 0x41);
        assert_eq!(dump[dump.len() - 1], 0x1F);
    }

    #[test]
    fn test_bus_address_decoding() {
        assert_eq!(decode_bus_address(0x00), (RegisterTarget::Voice(0), 0));
        assert_eq!(decode_bus_address(0x0E), (RegisterTarget::Voice(1), 6));
        assert_eq!(decode_bus_address(0x1D), (RegisterTarget::Voice(3), 5));
        assert_eq!(decode_bus_address(0x23), (RegisterTarget::Filter, 3));
    }

    #[test]
    fn test_control_flags_waveforms() {
        let flags = ControlFlags::from_bits_retain(0x61);
        assert_eq!(flags.waveforms(), ControlFlags::SAWTOOTH | ControlFlags::PULSE);
        assert!(flags.contains(ControlFlags::GATE));
    }
}
