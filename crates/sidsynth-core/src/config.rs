//! Engine configuration
//!
//! Every parameter that differs between hardware variants lives here:
//! accumulator and waveform widths, envelope depth and rate family, the
//! waveform combine rule, sync edge, noise register shape and routing, filter
//! precision, register layout and write mode.
//!
//! Configurations are plain serde structs, so they load from JSON and can be
//! embedded in register scripts. Missing fields fall back to the default
//! preset.

use crate::envelope::{RateFamily, RateTable};
use crate::filter::CoefficientMapping;
use crate::noise::NoiseLfsr;
use crate::oscillator::{PhaseWidth, SyncEdge};
use crate::registers::RegisterLayout;
use crate::waveform::CombinePolicy;
use crate::{Result, SidError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Maximum number of voices addressable on the register bus
pub const MAX_VOICES: usize = 4;

/// When register writes become visible to synthesis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Visible to the very next tick
    #[default]
    Immediate,
    /// Buffered and committed together at the next tick boundary
    Latched,
}

/// Which voice clocks the noise register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NoiseRouting {
    /// One register shared by all voices, clocked by `source`
    Shared {
        /// Voice whose phase clocks the register
        source: usize,
    },
    /// One register per voice, each clocked by its own voice
    PerVoice,
}

impl Default for NoiseRouting {
    fn default() -> Self {
        NoiseRouting::Shared { source: 0 }
    }
}

/// Noise LFSR parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    /// Register width in bits
    pub width: u8,
    /// Feedback tap mask (must include the top bit)
    pub taps: u32,
    /// Nonzero reset value
    pub seed: u32,
    /// Clock routing
    pub routing: NoiseRouting,
    /// Phase bit whose rising edge clocks the register (default: W - 5)
    pub clock_bit: Option<u8>,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        NoiseConfig {
            width: 23,
            taps: 0x42_0000,
            seed: 0x7F_FFFF,
            routing: NoiseRouting::default(),
            clock_bit: None,
        }
    }
}

/// Filter precision and coefficient mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Fractional bits of the fixed-point coefficients
    pub frac_bits: u8,
    /// Register-to-coefficient strategy
    pub mapping: CoefficientMapping,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            frac_bits: 12,
            mapping: CoefficientMapping::Linear,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of voices (1-4)
    pub voices: usize,
    /// Phase accumulator width W (16-24)
    pub phase_bits: u8,
    /// Ticks per second; one tick produces one sample
    pub tick_rate: u32,
    /// Waveform and output sample width (8-12)
    pub waveform_bits: u8,
    /// Pulse-width register width (8 or 12)
    pub pulse_width_bits: u8,
    /// Envelope depth in bits (4-8)
    pub envelope_bits: u8,
    /// Envelope rate-table family
    pub rate_family: RateFamily,
    /// Enter an explicit Sustain state instead of holding in Decay
    pub sustain_state: bool,
    /// How simultaneously selected waveforms combine
    pub combine: CombinePolicy,
    /// Sync-source MSB edge that resets a synced voice
    pub sync_edge: SyncEdge,
    /// Noise register
    pub noise: NoiseConfig,
    /// Filter
    pub filter: FilterConfig,
    /// Packed nibble order of the envelope registers
    pub layout: RegisterLayout,
    /// Register write visibility
    pub write_mode: WriteMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            voices: 3,
            phase_bits: 16,
            tick_rate: 44_100,
            waveform_bits: 12,
            pulse_width_bits: 12,
            envelope_bits: 8,
            rate_family: RateFamily::Exponential,
            sustain_state: false,
            combine: CombinePolicy::And,
            sync_edge: SyncEdge::Rising,
            noise: NoiseConfig::default(),
            filter: FilterConfig::default(),
            layout: RegisterLayout::Sid,
            write_mode: WriteMode::Immediate,
        }
    }
}

impl EngineConfig {
    /// Compact single-voice design
    ///
    /// 24-bit accumulator at a 1 MHz effective tick, 8-bit waveforms, 4-bit
    /// linear envelope with an explicit sustain state, OR combining and a
    /// 15-bit noise register. Attack and sustain sit in the low nibbles.
    pub fn single_voice() -> Self {
        EngineConfig {
            voices: 1,
            phase_bits: 24,
            tick_rate: 1_000_000,
            waveform_bits: 8,
            pulse_width_bits: 8,
            envelope_bits: 4,
            rate_family: RateFamily::Linear,
            sustain_state: true,
            combine: CombinePolicy::Or,
            noise: NoiseConfig {
                width: 15,
                taps: 0x6000,
                seed: 0x7FFF,
                ..NoiseConfig::default()
            },
            layout: RegisterLayout::Swapped,
            ..Self::default()
        }
    }

    /// Three voices with a 24-bit accumulator at 1 MHz and per-voice noise
    pub fn sid_like() -> Self {
        EngineConfig {
            phase_bits: 24,
            tick_rate: 1_000_000,
            noise: NoiseConfig {
                routing: NoiseRouting::PerVoice,
                ..NoiseConfig::default()
            },
            ..Self::default()
        }
    }

    /// Load and validate a configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parse and validate a configuration from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the voice count
    pub fn with_voices(mut self, voices: usize) -> Self {
        self.voices = voices;
        self
    }

    /// Set the tick rate
    pub fn with_tick_rate(mut self, tick_rate: u32) -> Self {
        self.tick_rate = tick_rate;
        self
    }

    /// Set the waveform combine policy
    pub fn with_combine(mut self, combine: CombinePolicy) -> Self {
        self.combine = combine;
        self
    }

    /// Set the sync edge
    pub fn with_sync_edge(mut self, edge: SyncEdge) -> Self {
        self.sync_edge = edge;
        self
    }

    /// Set envelope depth and rate family
    pub fn with_envelope(mut self, bits: u8, family: RateFamily) -> Self {
        self.envelope_bits = bits;
        self.rate_family = family;
        self
    }

    /// Set the register write mode
    pub fn with_write_mode(mut self, mode: WriteMode) -> Self {
        self.write_mode = mode;
        self
    }

    /// Set the noise routing
    pub fn with_noise_routing(mut self, routing: NoiseRouting) -> Self {
        self.noise.routing = routing;
        self
    }

    /// Set the filter coefficient mapping
    pub fn with_coefficient_mapping(mut self, mapping: CoefficientMapping) -> Self {
        self.filter.mapping = mapping;
        self
    }

    /// Check that every parameter is within its supported range
    pub fn validate(&self) -> Result<()> {
        fn check(ok: bool, message: impl FnOnce() -> String) -> Result<()> {
            if ok {
                Ok(())
            } else {
                Err(SidError::Config(message()))
            }
        }

        check((1..=MAX_VOICES).contains(&self.voices), || {
            format!("voice count {} out of range (1-{MAX_VOICES})", self.voices)
        })?;
        check((16..=24).contains(&self.phase_bits), || {
            format!("phase width {} out of range (16-24)", self.phase_bits)
        })?;
        check(self.tick_rate > 0, || "tick rate must be nonzero".to_string())?;
        check((8..=12).contains(&self.waveform_bits), || {
            format!("waveform width {} out of range (8-12)", self.waveform_bits)
        })?;
        check(matches!(self.pulse_width_bits, 8 | 12), || {
            format!("pulse width register must be 8 or 12 bits, got {}", self.pulse_width_bits)
        })?;
        check((4..=8).contains(&self.envelope_bits), || {
            format!("envelope depth {} out of range (4-8)", self.envelope_bits)
        })?;
        check((8..=16).contains(&self.filter.frac_bits), || {
            format!("filter fractional bits {} out of range (8-16)", self.filter.frac_bits)
        })?;

        NoiseLfsr::new(self.noise.width, self.noise.taps, self.noise.seed)?;
        let clock_bit = self.noise_clock_bit();
        check(clock_bit < self.phase_bits, || {
            format!("noise clock bit {clock_bit} outside {}-bit phase", self.phase_bits)
        })?;
        if let NoiseRouting::Shared { source } = self.noise.routing {
            check(source < self.voices, || {
                format!("noise source voice {source} out of range for {} voices", self.voices)
            })?;
        }
        Ok(())
    }

    /// Phase accumulator width
    #[inline]
    pub fn phase_width(&self) -> PhaseWidth {
        PhaseWidth::new(self.phase_bits)
    }

    /// Phase bit that clocks the noise register
    #[inline]
    pub fn noise_clock_bit(&self) -> u8 {
        self.noise
            .clock_bit
            .unwrap_or_else(|| self.phase_bits.saturating_sub(5))
    }

    /// Voice whose MSB drives sync and ring for `voice`
    #[inline]
    pub fn sync_source(&self, voice: usize) -> usize {
        (voice + self.voices - 1) % self.voices
    }

    /// Envelope rate table for this configuration
    pub fn rate_table(&self) -> RateTable {
        RateTable::new(self.rate_family, self.envelope_bits, self.tick_rate)
    }

    /// Largest output sample value
    #[inline]
    pub fn sample_max(&self) -> u16 {
        ((1u32 << self.waveform_bits) - 1) as u16
    }

    /// Frequency register value for a pitch in Hz (rounded, clamped to 1-65535)
    pub fn hz_to_frequency(&self, hz: f64) -> u16 {
        self.phase_width().hz_to_frequency(hz, self.tick_rate as f64)
    }

    /// Pitch in Hz for a frequency register value
    pub fn frequency_to_hz(&self, frequency: u16) -> f64 {
        self.phase_width().frequency_to_hz(frequency, self.tick_rate as f64)
    }

    /// One-line summary for logs and the CLI
    pub fn summary(&self) -> String {
        format!(
            "{} voice(s), {}-bit phase @ {} Hz, {}-bit waveform ({:?}), {}-bit {:?} envelope, {}-bit noise, {:?} writes",
            self.voices,
            self.phase_bits,
            self.tick_rate,
            self.waveform_bits,
            self.combine,
            self.envelope_bits,
            self.rate_family,
            self.noise.width,
            self.write_mode,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_presets_validate() {
        EngineConfig::default().validate().unwrap();
        EngineConfig::single_voice().validate().unwrap();
        EngineConfig::sid_like().validate().unwrap();
    }

    #[test]
    fn test_preset_layouts() {
        assert_eq!(EngineConfig::default().layout, RegisterLayout::Sid);
        assert_eq!(EngineConfig::sid_like().layout, RegisterLayout::Sid);
        assert_eq!(EngineConfig::single_voice().layout, RegisterLayout::Swapped);
    }

    #[test]
    fn test_rejects_bad_ranges() {
        assert!(EngineConfig::default().with_voices(0).validate().is_err());
        assert!(EngineConfig::default().with_voices(5).validate().is_err());

        let config = EngineConfig {
            phase_bits: 25,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());

        let config = EngineConfig {
            pulse_width_bits: 10,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());

        let config = EngineConfig::default().with_envelope(9, RateFamily::Linear);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_noise() {
        let mut config = EngineConfig::default();
        config.noise.seed = 0x80_0000;
        assert!(matches!(config.validate(), Err(SidError::Config(_))));

        let mut config = EngineConfig::default();
        config.noise.taps = 0x02_0001;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.noise.clock_bit = Some(16);
        assert!(config.validate().is_err());

        let config = EngineConfig::default().with_voices(2).with_noise_routing(NoiseRouting::Shared { source: 2 });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sync_source_is_circular() {
        let config = EngineConfig::default();
        assert_eq!(config.sync_source(0), 2);
        assert_eq!(config.sync_source(1), 0);
        assert_eq!(config.sync_source(2), 1);
        assert_eq!(EngineConfig::single_voice().sync_source(0), 0);
    }

    #[test]
    fn test_noise_clock_bit_default() {
        assert_eq!(EngineConfig::sid_like().noise_clock_bit(), 19);
        assert_eq!(EngineConfig::default().noise_clock_bit(), 11);
    }

    #[test]
    fn test_frequency_helpers() {
        let config = EngineConfig::single_voice();
        let freq = config.hz_to_frequency(440.0);
        assert_relative_eq!(config.frequency_to_hz(freq), 440.0, epsilon = 0.1);

        let config = EngineConfig::default();
        assert_relative_eq!(config.frequency_to_hz(65535), 44_099.3, epsilon = 0.1);
    }

    #[test]
    fn test_json_round_trip_with_defaults() {
        let config = EngineConfig::from_json(r#"{ "voices": 2, "combine": "or" }"#).unwrap();
        assert_eq!(config.voices, 2);
        assert_eq!(config.combine, CombinePolicy::Or);
        assert_eq!(config.phase_bits, 16);

        let json = serde_json::to_string(&EngineConfig::sid_like()).unwrap();
        let back = EngineConfig::from_json(&json).unwrap();
        assert_eq!(back, EngineConfig::sid_like());
    }

    #[test]
    fn test_json_validates() {
        assert!(EngineConfig::from_json(r#"{ "voices": 9 }"#).is_err());
        assert!(matches!(
            EngineConfig::from_json("{ not json"),
            Err(SidError::Json(_))
        ));
    }
}
