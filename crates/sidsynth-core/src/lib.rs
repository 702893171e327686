//! SID-style subtractive synthesis core
//!
//! A deterministic, sample-clocked software model of a multi-voice SID-style
//! sound generator. Every call to [`SidEngine::tick`] produces exactly one
//! output sample from the current register state.
//!
//! # Features
//! - Per-voice phase accumulators (16 to 24 bit) with hard sync and ring modulation
//! - Triangle, sawtooth, pulse and noise waveforms with AND or OR combination
//! - ADSR envelopes with linear or exponential rate tables and configurable depth
//! - Fixed-point Chamberlin state-variable filter (LP/BP/HP) with saturation
//! - Immediate or tick-latched register writes, plus a thread-safe [`RegisterPort`]
//! - Register scripts and WAV rendering
//!
//! # Crate feature flags
//! - `export-wav` (default): WAV rendering through `hound` (`export`)
//!
//! # Quick start
//! ```
//! use sidsynth::{RegisterTarget, SidEngine};
//! use sidsynth::registers::{ControlFlags, VoiceRegister};
//!
//! let mut engine = SidEngine::default();
//! let voice = RegisterTarget::Voice(0);
//! engine.set_register(voice, VoiceRegister::FreqLo.addr(), 0x1C);
//! engine.set_register(voice, VoiceRegister::FreqHi.addr(), 0x0A);
//! engine.set_register(voice, VoiceRegister::SustainRelease.addr(), 0xF0);
//! let control = ControlFlags::SAWTOOTH | ControlFlags::GATE;
//! engine.set_register(voice, VoiceRegister::Control.addr(), control.bits());
//!
//! let sample: u16 = engine.tick();
//! # let _ = sample;
//! ```

#![warn(missing_docs)]

pub mod backend; // Backend trait abstraction
pub mod config; // Variant configuration and presets
pub mod engine; // Per-tick orchestration
pub mod envelope; // ADSR state machine and rate tables
pub mod filter; // State-variable filter
pub mod mixer; // Voice multiplier and mixer
pub mod noise; // Noise LFSR
pub mod oscillator; // Phase accumulators and sync edges
pub mod port; // Cross-thread register queue
pub mod registers; // Host register map
pub mod script; // Register scripts
pub mod waveform; // Waveform generation

#[cfg(feature = "export-wav")]
pub mod export; // WAV rendering

/// Error types for synthesis engine operations
///
/// Synthesis itself never fails; these cover construction, scripts and export.
#[derive(thiserror::Error, Debug)]
pub enum SidError {
    /// Invalid engine configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Malformed register script
    #[error("Script error: {0}")]
    Script(String),

    /// Error writing audio file
    #[error("Export error: {0}")]
    Export(String),

    /// IO error from filesystem
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, SidError>;

// Public API exports
pub use backend::SynthBackend;
pub use config::EngineConfig;
pub use engine::SidEngine;
pub use port::RegisterPort;
pub use registers::RegisterTarget;
pub use script::{RegisterScript, ScriptPlayer};
