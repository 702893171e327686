//! ADSR Envelope Generator
//!
//! Five-state machine (Idle, Attack, Decay, Sustain, Releasing) stepping an
//! unsigned level of configurable depth. Each step is gated by a rate counter
//! whose period comes from a [`RateTable`]. Two table families exist:
//!
//! - **Linear**: the period depends only on the 4-bit rate index
//! - **Exponential**: decay and release periods are stretched as the level
//!   falls (periods x1, x2, x4, x8, x16, x30 below levels 255, 93, 54, 26,
//!   14, 6 on an 8-bit scale), approximating a capacitor discharge
//!
//! Table periods are derived from the nominal attack times (2 ms to 8 s),
//! with decay and release three times slower, expressed in engine ticks.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Nominal attack time per rate index, in milliseconds
const ATTACK_MS: [u32; 16] = [
    2, 8, 16, 24, 38, 56, 68, 80, 100, 250, 500, 800, 1000, 3000, 5000, 8000,
];

/// Decay and release are three times slower than attack at the same index
const DECAY_RELEASE_FACTOR: u32 = 3;

/// Rate-table family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateFamily {
    /// Fixed period per rate index
    Linear,
    /// Decay/release periods grow as the level approaches zero
    #[default]
    Exponential,
}

/// Envelope state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvelopeState {
    /// Held at zero, waiting for a gate rising edge
    #[default]
    Idle,
    /// Rising toward the maximum level
    Attack,
    /// Falling toward the sustain level
    Decay,
    /// Holding the sustain level (only with an explicit sustain state)
    Sustain,
    /// Falling toward zero after gate off
    Releasing,
}

impl fmt::Display for EnvelopeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvelopeState::Idle => write!(f, "Idle"),
            EnvelopeState::Attack => write!(f, "Attack"),
            EnvelopeState::Decay => write!(f, "Decay"),
            EnvelopeState::Sustain => write!(f, "Sustain"),
            EnvelopeState::Releasing => write!(f, "Releasing"),
        }
    }
}

/// Which of the three rate registers a step uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatePhase {
    /// Attack rate
    Attack,
    /// Decay rate (also used while sustaining)
    Decay,
    /// Release rate
    Release,
}

/// Envelope step periods, in engine ticks, for every rate index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateTable {
    attack: [u32; 16],
    decay_release: [u32; 16],
    family: RateFamily,
    depth: u8,
}

impl RateTable {
    /// Build a table for an envelope depth and engine tick rate
    ///
    /// A full-scale sweep at rate index `r` takes roughly the nominal time for
    /// that index: each step lasts `time / 2^depth`, never less than one tick.
    pub fn new(family: RateFamily, depth: u8, tick_rate: u32) -> Self {
        let levels = (1u64 << depth) as f64;
        let to_ticks = |ms: u32| -> u32 {
            let ticks = (ms as f64 / 1000.0 * tick_rate as f64 / levels).round();
            (ticks as u32).max(1)
        };
        let mut attack = [0u32; 16];
        let mut decay_release = [0u32; 16];
        for (index, ms) in ATTACK_MS.iter().enumerate() {
            attack[index] = to_ticks(*ms);
            decay_release[index] = to_ticks(*ms * DECAY_RELEASE_FACTOR);
        }
        RateTable {
            attack,
            decay_release,
            family,
            depth,
        }
    }

    /// Rate-table family
    #[inline]
    pub fn family(&self) -> RateFamily {
        self.family
    }

    /// Envelope depth in bits
    #[inline]
    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// Maximum envelope level (2^depth - 1)
    #[inline]
    pub fn max_level(&self) -> u16 {
        ((1u32 << self.depth) - 1) as u16
    }

    /// Sustain nibble scaled to the envelope depth
    #[inline]
    pub fn sustain_level(&self, nibble: u8) -> u16 {
        ((nibble.min(15) as u32 * self.max_level() as u32) / 15) as u16
    }

    /// Base step period for a rate index, ignoring the current level
    #[inline]
    pub fn base_period(&self, phase: RatePhase, rate: u8) -> u32 {
        let index = (rate & 0x0F) as usize;
        match phase {
            RatePhase::Attack => self.attack[index],
            RatePhase::Decay | RatePhase::Release => self.decay_release[index],
        }
    }

    /// Step period at the current level
    pub fn period(&self, phase: RatePhase, rate: u8, level: u16) -> u32 {
        let base = self.base_period(phase, rate);
        match (self.family, phase) {
            (RateFamily::Linear, _) | (_, RatePhase::Attack) => base,
            (RateFamily::Exponential, _) => base.saturating_mul(self.exponential_multiplier(level)),
        }
    }

    fn exponential_multiplier(&self, level: u16) -> u32 {
        // Thresholds are defined on an 8-bit scale
        let scaled = if self.depth >= 8 {
            (level >> (self.depth - 8)) as u32
        } else {
            (level as u32) << (8 - self.depth)
        };
        match scaled {
            94.. => 1,
            55..=93 => 2,
            27..=54 => 4,
            15..=26 => 8,
            7..=14 => 16,
            _ => 30,
        }
    }
}

/// Envelope generator for one voice
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnvelopeGenerator {
    state: EnvelopeState,
    level: u16,
    counter: u32,
    gate_latch: bool,
    sustain_state: bool,
}

impl EnvelopeGenerator {
    /// Create an idle envelope
    ///
    /// With `sustain_state` the generator enters an explicit Sustain state
    /// when decay reaches the target; otherwise Decay holds there.
    pub fn new(sustain_state: bool) -> Self {
        Self {
            sustain_state,
            ..Self::default()
        }
    }

    /// Current level
    #[inline]
    pub fn level(&self) -> u16 {
        self.level
    }

    /// Current state
    #[inline]
    pub fn state(&self) -> EnvelopeState {
        self.state
    }

    /// Gate value seen on the previous clock
    #[inline]
    pub fn gate_latch(&self) -> bool {
        self.gate_latch
    }

    /// Return to Idle at level zero
    pub fn reset(&mut self) {
        *self = Self::new(self.sustain_state);
    }

    /// Advance the rate counter, returning true when a level step is due
    pub fn should_tick(&mut self, table: &RateTable, phase: RatePhase, rate: u8) -> bool {
        self.counter = self.counter.saturating_add(1);
        if self.counter >= table.period(phase, rate, self.level) {
            self.counter = 0;
            true
        } else {
            false
        }
    }

    /// Process the gate and advance one tick, returning the new level
    pub fn clock(
        &mut self,
        table: &RateTable,
        gate: bool,
        attack: u8,
        decay: u8,
        sustain: u8,
        release: u8,
    ) -> u16 {
        if gate && !self.gate_latch {
            // Retrigger from the current level, even mid-release
            self.state = EnvelopeState::Attack;
            self.counter = 0;
        } else if !gate && self.gate_latch && self.state != EnvelopeState::Idle {
            self.state = EnvelopeState::Releasing;
            self.counter = 0;
        }
        self.gate_latch = gate;

        let max = table.max_level();
        let target = table.sustain_level(sustain);

        match self.state {
            EnvelopeState::Idle => self.level = 0,
            EnvelopeState::Attack => {
                if self.should_tick(table, RatePhase::Attack, attack) {
                    self.level = (self.level + 1).min(max);
                }
                if self.level >= max {
                    self.state = EnvelopeState::Decay;
                    self.counter = 0;
                }
            }
            EnvelopeState::Decay => {
                if self.level > target {
                    if self.should_tick(table, RatePhase::Decay, decay) {
                        self.level -= 1;
                    }
                } else if self.sustain_state {
                    self.state = EnvelopeState::Sustain;
                }
            }
            EnvelopeState::Sustain => {
                // A lowered sustain register still pulls the level down
                if self.level > target && self.should_tick(table, RatePhase::Decay, decay) {
                    self.level -= 1;
                }
            }
            EnvelopeState::Releasing => {
                if self.level > 0 && self.should_tick(table, RatePhase::Release, release) {
                    self.level -= 1;
                }
                if self.level == 0 {
                    self.state = EnvelopeState::Idle;
                }
            }
        }

        self.level
    }
}
