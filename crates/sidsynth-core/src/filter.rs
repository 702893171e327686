//! Chamberlin state-variable filter
//!
//! Two-integrator SVF in signed fixed point:
//!
//! ```text
//! hp  = in - lp - damping * bp
//! bp' = bp + cutoff * hp
//! lp' = lp + cutoff * bp'
//! ```
//!
//! Coefficients carry a configurable number of fractional bits. Products are
//! formed at 64 bits and every sum saturates instead of wrapping, so a high
//! resonance setting clips rather than running away.
//!
//! The mapping from the cutoff and resonance registers to coefficients is a
//! [`CoefficientMap`] strategy that can be replaced at runtime.

use crate::registers::ModeFlags;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Largest cutoff register value (11 bits)
pub const CUTOFF_MAX: u16 = 0x7FF;

/// Largest resonance register value
pub const RESONANCE_MAX: u8 = 15;

/// Register-to-coefficient mapping strategy
///
/// Both methods return fixed-point values with `frac_bits` fractional bits.
/// `cutoff` must be non-decreasing in the register value and `damping`
/// non-increasing in resonance.
pub trait CoefficientMap: Send + Debug {
    /// Frequency coefficient for an 11-bit cutoff register
    fn cutoff(&self, cutoff: u16, frac_bits: u8) -> i32;

    /// Damping coefficient (1/Q) for a 4-bit resonance register
    fn damping(&self, resonance: u8, frac_bits: u8) -> i32;
}

#[inline]
fn to_fixed(value: f64, frac_bits: u8) -> i32 {
    (value * (1u32 << frac_bits) as f64).round() as i32
}

/// Straight-line interpolation across the register range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearMap {
    /// Frequency coefficient at cutoff 0
    pub min_cutoff: f64,
    /// Frequency coefficient at the maximum cutoff
    pub max_cutoff: f64,
    /// Damping at resonance 0
    pub max_damping: f64,
    /// Damping at resonance 15
    pub min_damping: f64,
}

impl Default for LinearMap {
    fn default() -> Self {
        LinearMap {
            min_cutoff: 0.005,
            max_cutoff: 0.9,
            max_damping: std::f64::consts::SQRT_2,
            min_damping: 0.15,
        }
    }
}

impl CoefficientMap for LinearMap {
    fn cutoff(&self, cutoff: u16, frac_bits: u8) -> i32 {
        let t = cutoff.min(CUTOFF_MAX) as f64 / CUTOFF_MAX as f64;
        to_fixed(self.min_cutoff + (self.max_cutoff - self.min_cutoff) * t, frac_bits)
    }

    fn damping(&self, resonance: u8, frac_bits: u8) -> i32 {
        let t = resonance.min(RESONANCE_MAX) as f64 / RESONANCE_MAX as f64;
        to_fixed(self.max_damping - (self.max_damping - self.min_damping) * t, frac_bits)
    }
}

/// Shift-add approximation of [`LinearMap`]
///
/// Keeps only the `terms` most significant set bits of each coefficient, as a
/// multiplier built from that many shifted adds would.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShiftAddMap {
    /// Number of shift-add terms (at least 1)
    pub terms: u8,
    base: LinearMap,
}

impl ShiftAddMap {
    /// Create a shift-add map over the default linear curve
    pub fn new(terms: u8) -> Self {
        ShiftAddMap {
            terms: terms.max(1),
            base: LinearMap::default(),
        }
    }

    fn truncate(&self, value: i32) -> i32 {
        let mut remaining = value.max(0) as u32;
        let mut kept = 0u32;
        for _ in 0..self.terms {
            if remaining == 0 {
                break;
            }
            let top = 1u32 << (31 - remaining.leading_zeros());
            kept |= top;
            remaining &= !top;
        }
        kept as i32
    }
}

impl CoefficientMap for ShiftAddMap {
    fn cutoff(&self, cutoff: u16, frac_bits: u8) -> i32 {
        self.truncate(self.base.cutoff(cutoff, frac_bits))
    }

    fn damping(&self, resonance: u8, frac_bits: u8) -> i32 {
        self.truncate(self.base.damping(resonance, frac_bits))
    }
}

/// Serializable choice of built-in coefficient map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CoefficientMapping {
    /// [`LinearMap`] with default endpoints
    #[default]
    Linear,
    /// [`ShiftAddMap`] with the given number of terms
    ShiftAdd {
        /// Number of shift-add terms
        terms: u8,
    },
}

impl CoefficientMapping {
    /// Instantiate the strategy
    pub fn build(self) -> Box<dyn CoefficientMap> {
        match self {
            CoefficientMapping::Linear => Box::new(LinearMap::default()),
            CoefficientMapping::ShiftAdd { terms } => Box::new(ShiftAddMap::new(terms)),
        }
    }
}

/// Selected filter output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// Input passes through untouched
    Bypass,
    /// Low-pass output
    Lowpass,
    /// Band-pass output
    Bandpass,
    /// High-pass output
    Highpass,
}

impl FilterMode {
    /// Resolve the mode register with priority HP > BP > LP
    ///
    /// Bypass when no voice is routed or no mode bit is set.
    pub fn select(mode: ModeFlags, any_routed: bool) -> Self {
        if !any_routed {
            FilterMode::Bypass
        } else if mode.contains(ModeFlags::HIGHPASS) {
            FilterMode::Highpass
        } else if mode.contains(ModeFlags::BANDPASS) {
            FilterMode::Bandpass
        } else if mode.contains(ModeFlags::LOWPASS) {
            FilterMode::Lowpass
        } else {
            FilterMode::Bypass
        }
    }
}

/// Apply the 4-bit volume register as volume/15
#[inline]
pub fn scale_volume(sample: i32, volume: u8) -> i32 {
    ((sample as i64 * volume.min(15) as i64) / 15) as i32
}

#[inline]
fn mul_fixed(coefficient: i32, value: i32, frac_bits: u8) -> i32 {
    ((coefficient as i64 * value as i64) >> frac_bits).clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Filter state and cached coefficients
#[derive(Debug)]
pub struct Filter {
    frac_bits: u8,
    map: Box<dyn CoefficientMap>,
    registers: Option<(u16, u8)>,
    cutoff: i32,
    damping: i32,
    lowpass: i32,
    bandpass: i32,
}

impl Filter {
    /// Create a filter with zeroed integrators
    pub fn new(frac_bits: u8, map: Box<dyn CoefficientMap>) -> Self {
        let mut filter = Filter {
            frac_bits,
            map,
            registers: None,
            cutoff: 0,
            damping: 0,
            lowpass: 0,
            bandpass: 0,
        };
        filter.update(0, 0);
        filter
    }

    /// Replace the coefficient strategy
    pub fn set_coefficient_map(&mut self, map: Box<dyn CoefficientMap>) {
        self.map = map;
        let (cutoff, resonance) = self.registers.unwrap_or((0, 0));
        self.registers = None;
        self.update(cutoff, resonance);
    }

    /// Refresh coefficients when the cutoff or resonance register changed
    pub fn update(&mut self, cutoff: u16, resonance: u8) {
        if self.registers == Some((cutoff, resonance)) {
            return;
        }
        self.cutoff = self.map.cutoff(cutoff, self.frac_bits);
        self.damping = self.map.damping(resonance, self.frac_bits);
        self.registers = Some((cutoff, resonance));
    }

    /// Current (cutoff, damping) coefficients
    #[inline]
    pub fn coefficients(&self) -> (i32, i32) {
        (self.cutoff, self.damping)
    }

    /// Low-pass integrator
    #[inline]
    pub fn lowpass(&self) -> i32 {
        self.lowpass
    }

    /// Band-pass integrator
    #[inline]
    pub fn bandpass(&self) -> i32 {
        self.bandpass
    }

    /// Run one step and return the selected output
    ///
    /// Bypass returns the input unchanged and leaves the integrators alone.
    pub fn process(&mut self, input: i32, mode: FilterMode) -> i32 {
        if mode == FilterMode::Bypass {
            return input;
        }

        let highpass = input
            .saturating_sub(self.lowpass)
            .saturating_sub(mul_fixed(self.damping, self.bandpass, self.frac_bits));
        self.bandpass = self
            .bandpass
            .saturating_add(mul_fixed(self.cutoff, highpass, self.frac_bits));
        self.lowpass = self
            .lowpass
            .saturating_add(mul_fixed(self.cutoff, self.bandpass, self.frac_bits));

        match mode {
            FilterMode::Lowpass => self.lowpass,
            FilterMode::Bandpass => self.bandpass,
            FilterMode::Highpass => highpass,
            FilterMode::Bypass => input,
        }
    }

    /// Zero the integrators
    pub fn reset(&mut self) {
        self.lowpass = 0;
        self.bandpass = 0;
    }
}
