//! Noise generator using a Fibonacci LFSR
//!
//! The register shifts left once per clock, feeding back the parity of the
//! tapped bits into bit 0. It is clocked by a rising edge of one phase bit of
//! the tracking voice, so the noise pitch follows that voice's frequency.

use crate::{Result, SidError};

/// Width-parameterized linear-feedback shift register
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoiseLfsr {
    state: u32,
    width: u8,
    taps: u32,
    seed: u32,
}

impl NoiseLfsr {
    /// Create an LFSR
    ///
    /// The tap mask must include the top bit so the shift is invertible; with
    /// that and a nonzero seed the register can never reach the all-zero
    /// lock-up state.
    pub fn new(width: u8, taps: u32, seed: u32) -> Result<Self> {
        if !(2..=32).contains(&width) {
            return Err(SidError::Config(format!(
                "noise LFSR width {width} out of range (2-32)"
            )));
        }
        let mask = Self::mask_for(width);
        if taps & !mask != 0 {
            return Err(SidError::Config(format!(
                "noise tap mask {taps:#x} exceeds {width}-bit register"
            )));
        }
        if taps & (1 << (width - 1)) == 0 {
            return Err(SidError::Config(format!(
                "noise tap mask {taps:#x} must include bit {}",
                width - 1
            )));
        }
        if seed & mask == 0 {
            return Err(SidError::Config(
                "noise seed must be nonzero within the register width".to_string(),
            ));
        }
        Ok(Self::from_checked(width, taps, seed))
    }

    /// Build from parameters already checked by [`NoiseLfsr::new`]
    pub(crate) fn from_checked(width: u8, taps: u32, seed: u32) -> Self {
        let seed = seed & Self::mask_for(width);
        Self {
            state: seed,
            width,
            taps,
            seed,
        }
    }

    #[inline]
    fn mask_for(width: u8) -> u32 {
        if width >= 32 {
            u32::MAX
        } else {
            (1u32 << width) - 1
        }
    }

    /// Shift once: new state = (state << 1) | parity(state & taps)
    #[inline]
    pub fn step(&mut self) {
        let feedback = (self.state & self.taps).count_ones() & 1;
        self.state = ((self.state << 1) | feedback) & Self::mask_for(self.width);
    }

    /// Return to the seed
    #[inline]
    pub fn reset(&mut self) {
        self.state = self.seed;
    }

    /// Current register contents
    #[inline]
    pub fn state(&self) -> u32 {
        self.state
    }

    /// Register width in bits
    #[inline]
    pub fn width(&self) -> u8 {
        self.width
    }

    /// The top `bits` bits of the register, left-aligned when the register is narrower
    #[inline]
    pub fn output(&self, bits: u8) -> u16 {
        let value = if self.width >= bits {
            self.state >> (self.width - bits)
        } else {
            self.state << (bits - self.width)
        };
        (value & ((1u32 << bits) - 1)) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_seed() {
        assert!(NoiseLfsr::new(15, 0x6000, 0).is_err());
        assert!(NoiseLfsr::new(15, 0x6000, 0x8000).is_err());
    }

    #[test]
    fn test_rejects_taps_without_top_bit() {
        assert!(NoiseLfsr::new(15, 0x2001, 1).is_err());
        assert!(NoiseLfsr::new(15, 0x1_6000, 1).is_err());
    }

    #[test]
    fn test_noise_generator_lfsr() {
        let mut noise = NoiseLfsr::new(23, 0x42_0000, 0x7F_FFFF).unwrap();
        let mut outputs = Vec::new();
        for _ in 0..100 {
            noise.step();
            outputs.push(noise.output(12));
        }
        let has_variation = outputs.windows(2).any(|w| w[0] != w[1]);
        assert!(has_variation, "Noise generator should produce varying output");
    }

    #[test]
    fn test_never_reaches_zero_over_full_period() {
        // Small widths so the whole state space can be swept
        for (width, taps) in [(4u8, 0xCu32), (5, 0x14), (7, 0x60), (8, 0xB8)] {
            for seed in 1..(1u32 << width) {
                let mut lfsr = NoiseLfsr::new(width, taps, seed).unwrap();
                let mut returned = false;
                for _ in 0..(1u32 << width) {
                    lfsr.step();
                    assert_ne!(lfsr.state(), 0, "width {width} seed {seed} locked up");
                    if lfsr.state() == seed {
                        returned = true;
                        break;
                    }
                }
                assert!(returned, "width {width} seed {seed} never cycled back");
            }
        }
    }

    #[test]
    fn test_maximal_length_taps() {
        let mut lfsr = NoiseLfsr::new(4, 0xC, 1).unwrap();
        let mut period = 0;
        loop {
            lfsr.step();
            period += 1;
            if lfsr.state() == 1 {
                break;
            }
        }
        assert_eq!(period, 15);
    }

    #[test]
    fn test_reset_restores_seed() {
        let mut lfsr = NoiseLfsr::new(15, 0x6000, 0x1234).unwrap();
        for _ in 0..37 {
            lfsr.step();
        }
        lfsr.reset();
        assert_eq!(lfsr.state(), 0x1234);
    }

    #[test]
    fn test_output_alignment() {
        let lfsr = NoiseLfsr::new(8, 0xB8, 0xA5).unwrap();
        assert_eq!(lfsr.output(8), 0xA5);
        assert_eq!(lfsr.output(4), 0xA);
        assert_eq!(lfsr.output(12), 0xA50);
    }
}
