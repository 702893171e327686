//! Voice multiplier and output mixer
//!
//! Each voice's waveform is scaled by its envelope, then the voices are split
//! into a direct bus and a filter bus according to the routing register. The
//! mixer sums each bus at full width and divides by the next power of two at
//! or above the voice count, leaving headroom.

use crate::registers::ModeFlags;

/// Index of the voice that `VOICE3_OFF` removes from the direct path
pub const VOICE3_INDEX: usize = 2;

/// Scale a waveform by an envelope level
///
/// Uses the full product width, then keeps the high-order bits. The level is
/// first stretched by its own top bit so that level zero is silent and the
/// maximum level reproduces the waveform exactly.
#[inline]
pub fn voice_output(waveform: u16, level: u16, envelope_bits: u8) -> u16 {
    let level = level as u32;
    let scale = level + (level >> (envelope_bits - 1));
    ((waveform as u32 * scale) >> envelope_bits) as u16
}

/// Accumulated buses for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MixBuses {
    /// Sum of voices bypassing the filter
    pub direct: u32,
    /// Sum of voices routed into an active filter
    pub filtered: u32,
    /// Number of voices summed into `filtered`
    pub filtered_count: u32,
}

/// Output mixer
#[derive(Debug, Clone)]
pub struct Mixer {
    muted: Vec<bool>,
    shift: u8,
}

impl Mixer {
    /// Create a mixer for `voices` voices
    pub fn new(voices: usize) -> Self {
        Mixer {
            muted: vec![false; voices],
            shift: Self::headroom_bits(voices),
        }
    }

    /// ceil(log2(voices)): extra accumulator bits and the output shift
    pub fn headroom_bits(voices: usize) -> u8 {
        voices.max(1).next_power_of_two().trailing_zeros() as u8
    }

    /// Output shift in bits
    #[inline]
    pub fn shift(&self) -> u8 {
        self.shift
    }

    /// Mute or unmute a voice; returns false for an unknown voice
    pub fn set_mute(&mut self, voice: usize, mute: bool) -> bool {
        match self.muted.get_mut(voice) {
            Some(slot) => {
                *slot = mute;
                true
            }
            None => false,
        }
    }

    /// Whether a voice is muted
    #[inline]
    pub fn is_muted(&self, voice: usize) -> bool {
        self.muted.get(voice).copied().unwrap_or(false)
    }

    /// Split voice outputs into the direct and filter buses
    ///
    /// With `filter_active` false every routed voice joins the direct bus.
    pub fn route(&self, outputs: &[u16], routing: u8, mode: ModeFlags, filter_active: bool) -> MixBuses {
        let mut buses = MixBuses::default();
        for (index, &output) in outputs.iter().enumerate() {
            if self.is_muted(index) {
                continue;
            }
            let routed = routing & (1 << index) != 0;
            if routed && filter_active {
                buses.filtered += output as u32;
                buses.filtered_count += 1;
            } else if routed || !(index == VOICE3_INDEX && mode.contains(ModeFlags::VOICE3_OFF)) {
                buses.direct += output as u32;
            }
        }
        buses
    }

    /// Combine the direct bus with the filter output and scale to `full_scale`
    pub fn output(&self, direct: u32, filtered: i32, full_scale: u16) -> u16 {
        let total = (direct as i64 + filtered as i64).max(0) >> self.shift;
        total.min(full_scale as i64) as u16
    }
}
