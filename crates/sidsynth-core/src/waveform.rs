//! Waveform generation
//!
//! Derives the four candidate waveforms from a voice's new phase and combines
//! the selected ones. Hardware variants disagree on the combination rule, so
//! it is a [`CombinePolicy`] rather than a fixed behavior.

use crate::oscillator::PhaseWidth;
use crate::registers::ControlFlags;
use serde::{Deserialize, Serialize};

/// How simultaneously selected waveforms are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombinePolicy {
    /// Bitwise AND of all selected waveforms, starting from all-ones
    #[default]
    And,
    /// Bitwise OR of all selected waveforms, starting from zero
    Or,
}

/// Per-tick inputs for one voice's waveform
#[derive(Debug, Clone, Copy, Default)]
pub struct WaveformInputs {
    /// Phase after this tick's advance and sync
    pub phase: u32,
    /// Waveform control register
    pub control: ControlFlags,
    /// Pulse width register
    pub pulse_width: u16,
    /// MSB of the modulating voice's phase (used when ring is set)
    pub ring_msb: bool,
    /// Noise register output, already aligned to the output width
    pub noise: u16,
}

/// Waveform generator for a fixed output resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveformGenerator {
    width: PhaseWidth,
    output_bits: u8,
    pulse_width_bits: u8,
    policy: CombinePolicy,
}

impl WaveformGenerator {
    /// Create a generator
    ///
    /// `output_bits` must be smaller than the phase width.
    pub fn new(width: PhaseWidth, output_bits: u8, pulse_width_bits: u8, policy: CombinePolicy) -> Self {
        debug_assert!(output_bits < width.bits());
        Self {
            width,
            output_bits,
            pulse_width_bits,
            policy,
        }
    }

    /// All-ones value at the output width
    #[inline]
    pub fn full_scale(&self) -> u16 {
        ((1u32 << self.output_bits) - 1) as u16
    }

    /// Output resolution in bits
    #[inline]
    pub fn output_bits(&self) -> u8 {
        self.output_bits
    }

    /// Combination policy in use
    #[inline]
    pub fn policy(&self) -> CombinePolicy {
        self.policy
    }

    /// Top bits of the phase
    #[inline]
    pub fn sawtooth(&self, phase: u32) -> u16 {
        self.width.top(phase, self.output_bits) as u16
    }

    /// Bits below the MSB, inverted when `fold` is set
    #[inline]
    pub fn triangle(&self, phase: u32, fold: bool) -> u16 {
        let ramp = self.width.top(phase, self.output_bits + 1) as u16 & self.full_scale();
        if fold {
            ramp ^ self.full_scale()
        } else {
            ramp
        }
    }

    /// All-ones while the phase exceeds the pulse width, else zero
    #[inline]
    pub fn pulse(&self, phase: u32, pulse_width: u16) -> u16 {
        if self.width.top(phase, self.pulse_width_bits) > pulse_width as u32 {
            self.full_scale()
        } else {
            0
        }
    }

    /// Combine the waveforms selected in `inputs.control`
    pub fn generate(&self, inputs: &WaveformInputs) -> u16 {
        let select = inputs.control.waveforms();
        if select.is_empty() {
            return 0;
        }

        let mut output = match self.policy {
            CombinePolicy::And => self.full_scale(),
            CombinePolicy::Or => 0,
        };
        let mut combine = |wave: u16| match self.policy {
            CombinePolicy::And => output &= wave,
            CombinePolicy::Or => output |= wave,
        };

        if select.contains(ControlFlags::TRIANGLE) {
            // Sawtooth alongside triangle suppresses the fold
            let fold = if select.contains(ControlFlags::SAWTOOTH) {
                false
            } else if inputs.control.contains(ControlFlags::RING) {
                inputs.ring_msb
            } else {
                self.width.msb(inputs.phase)
            };
            combine(self.triangle(inputs.phase, fold));
        }
        if select.contains(ControlFlags::SAWTOOTH) {
            combine(self.sawtooth(inputs.phase));
        }
        if select.contains(ControlFlags::PULSE) {
            combine(self.pulse(inputs.phase, inputs.pulse_width));
        }
        if select.contains(ControlFlags::NOISE) {
            combine(inputs.noise & self.full_scale());
        }

        output
    }
}
