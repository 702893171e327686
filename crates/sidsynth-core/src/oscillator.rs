//! Phase accumulators
//!
//! Each voice owns a W-bit phase accumulator advanced once per tick by its
//! 16-bit frequency register. The accumulator MSB drives hard sync, ring
//! modulation and (through a lower bit) the noise clock.

use serde::{Deserialize, Serialize};

/// Width of a phase accumulator in bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseWidth(u8);

impl PhaseWidth {
    /// Create a phase width (16-32 bits; configuration limits it further)
    pub fn new(bits: u8) -> Self {
        debug_assert!((16..=32).contains(&bits), "phase width {bits} out of range");
        PhaseWidth(bits)
    }

    /// Number of bits
    #[inline]
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Modulus mask (2^W - 1)
    #[inline]
    pub fn mask(self) -> u32 {
        if self.0 >= 32 {
            u32::MAX
        } else {
            (1u32 << self.0) - 1
        }
    }

    /// Advance a phase by an increment, wrapping modulo 2^W
    #[inline]
    pub fn advance(self, phase: u32, increment: u16) -> u32 {
        phase.wrapping_add(increment as u32) & self.mask()
    }

    /// Whether the top bit of the phase is set
    #[inline]
    pub fn msb(self, phase: u32) -> bool {
        (phase >> (self.0 - 1)) & 1 != 0
    }

    /// Whether a given phase bit is set
    #[inline]
    pub fn bit(self, phase: u32, bit: u8) -> bool {
        (phase >> bit) & 1 != 0
    }

    /// The top `n` bits of the phase
    #[inline]
    pub fn top(self, phase: u32, n: u8) -> u32 {
        (phase & self.mask()) >> (self.0 - n)
    }

    /// Pitch in Hz produced by a frequency register at a given tick rate
    pub fn frequency_to_hz(self, frequency: u16, tick_rate: f64) -> f64 {
        frequency as f64 * tick_rate / (1u64 << self.0) as f64
    }

    /// Frequency register value for a pitch, rounded and clamped to 1..=65535
    pub fn hz_to_frequency(self, hz: f64, tick_rate: f64) -> u16 {
        let value = (hz * (1u64 << self.0) as f64 / tick_rate).round();
        value.clamp(1.0, u16::MAX as f64) as u16
    }
}

/// Which MSB transition of the source voice triggers hard sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncEdge {
    /// MSB goes 0 -> 1 (half-way through the source period)
    #[default]
    Rising,
    /// MSB goes 1 -> 0 (the source phase wraps)
    Falling,
}

impl SyncEdge {
    /// Detect this edge between the latched and the new MSB
    #[inline]
    pub fn detect(self, previous: bool, current: bool) -> bool {
        match self {
            SyncEdge::Rising => !previous && current,
            SyncEdge::Falling => previous && !current,
        }
    }
}

/// Result of advancing an oscillator, before sync is applied
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OscillatorStep {
    /// Advanced phase
    pub phase: u32,
    /// Whether the MSB showed the configured sync edge
    pub edge: bool,
}

/// A voice's phase accumulator with its latched MSB
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Oscillator {
    phase: u32,
    msb_latch: bool,
}

impl Oscillator {
    /// Create a zeroed oscillator
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase
    #[inline]
    pub fn phase(&self) -> u32 {
        self.phase
    }

    /// MSB latched at the previous tick
    #[inline]
    pub fn msb_latch(&self) -> bool {
        self.msb_latch
    }

    /// Compute the next phase without mutating
    ///
    /// `test` holds the accumulator at zero.
    #[inline]
    pub fn step(&self, width: PhaseWidth, frequency: u16, test: bool, edge: SyncEdge) -> OscillatorStep {
        let phase = if test { 0 } else { width.advance(self.phase, frequency) };
        OscillatorStep {
            phase,
            edge: edge.detect(self.msb_latch, width.msb(phase)),
        }
    }

    /// Commit a phase computed for this tick and latch its MSB
    #[inline]
    pub fn commit(&mut self, width: PhaseWidth, phase: u32) {
        self.phase = phase;
        self.msb_latch = width.msb(phase);
    }

    /// Reset to zero
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_phase_wraps_silently() {
        let width = PhaseWidth::new(16);
        assert_eq!(width.advance(0xFFF0, 0x20), 0x0010);
        let width = PhaseWidth::new(24);
        assert_eq!(width.advance(0xFF_FFFF, 1), 0);
    }

    #[test]
    fn test_test_bit_holds_zero() {
        let width = PhaseWidth::new(24);
        let mut osc = Oscillator::new();
        osc.commit(width, 0x12_3456);
        let step = osc.step(width, 1000, true, SyncEdge::Rising);
        assert_eq!(step.phase, 0);
    }

    #[test]
    fn test_msb_edges() {
        let width = PhaseWidth::new(16);
        let mut osc = Oscillator::new();
        osc.commit(width, 0x7FFF);
        assert!(osc.step(width, 1, false, SyncEdge::Rising).edge);
        assert!(!osc.step(width, 1, false, SyncEdge::Falling).edge);

        osc.commit(width, 0xFFFF);
        assert!(osc.step(width, 1, false, SyncEdge::Falling).edge);
        assert!(!osc.step(width, 1, false, SyncEdge::Rising).edge);
    }

    #[test]
    fn test_hz_conversion() {
        let width = PhaseWidth::new(24);
        // 262 Hz at 1 MHz effective with a 24-bit accumulator
        assert_eq!(width.hz_to_frequency(262.0, 1_000_000.0), 4396);
        assert_relative_eq!(
            width.frequency_to_hz(4396, 1_000_000.0),
            262.0,
            epsilon = 0.1
        );
        assert_eq!(width.hz_to_frequency(0.0, 1_000_000.0), 1);
        assert_eq!(width.hz_to_frequency(1.0e9, 1_000_000.0), u16::MAX);
    }

    #[test]
    fn test_top_bits() {
        let width = PhaseWidth::new(24);
        assert_eq!(width.top(0xABCDEF, 12), 0xABC);
        assert_eq!(width.top(0xABCDEF, 8), 0xAB);
    }
}
