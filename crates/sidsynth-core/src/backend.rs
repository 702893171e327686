//! Backend trait abstraction for tick-driven synthesizers
//!
//! Export and the command-line renderer are written against this trait rather
//! than a concrete engine, so a script player, a differently configured
//! engine or a test double can stand in.

use crate::engine::SidEngine;
use crate::registers::RegisterTarget;

/// Common interface for sample-clocked synthesizer backends
///
/// # Example
///
/// ```
/// use sidsynth::{RegisterTarget, SidEngine, SynthBackend};
///
/// fn play_note<B: SynthBackend>(synth: &mut B) -> Vec<f32> {
///     let voice = RegisterTarget::Voice(0);
///     synth.set_register(voice, 0x00, 0x1C); // Frequency low
///     synth.set_register(voice, 0x01, 0x0A); // Frequency high
///     synth.set_register(voice, 0x05, 0xF0); // Sustain max, fast release
///     synth.set_register(voice, 0x06, 0x21); // Sawtooth + gate
///     synth.generate_normalized(1024)
/// }
///
/// let samples = play_note(&mut SidEngine::default());
/// assert_eq!(samples.len(), 1024);
/// ```
pub trait SynthBackend: Send {
    /// Reset to the power-on state
    fn reset(&mut self);

    /// Write one register; unknown registers are ignored
    fn set_register(&mut self, target: RegisterTarget, address: u8, value: u8);

    /// Advance one tick and return the unsigned output sample
    fn tick(&mut self) -> u16;

    /// Width of the unsigned samples returned by [`SynthBackend::tick`]
    fn sample_bits(&self) -> u8;

    /// Samples per second
    fn sample_rate(&self) -> u32;

    /// Generate multiple raw samples
    fn generate_samples(&mut self, count: usize) -> Vec<u16> {
        let mut samples = vec![0; count];
        self.generate_samples_into(&mut samples);
        samples
    }

    /// Generate raw samples into a caller-provided buffer
    ///
    /// Avoids per-call allocations; prefer this in hot paths.
    fn generate_samples_into(&mut self, buffer: &mut [u16]) {
        for sample in buffer.iter_mut() {
            *sample = self.tick();
        }
    }

    /// Generate samples centered and scaled to [-1.0, 1.0]
    fn generate_normalized(&mut self, count: usize) -> Vec<f32> {
        let half = (1u32 << (self.sample_bits() - 1)) as f32;
        (0..count)
            .map(|_| ((self.tick() as f32 - half) / half).clamp(-1.0, 1.0))
            .collect()
    }
}

impl SynthBackend for SidEngine {
    fn reset(&mut self) {
        SidEngine::reset(self);
    }

    fn set_register(&mut self, target: RegisterTarget, address: u8, value: u8) {
        SidEngine::set_register(self, target, address, value);
    }

    fn tick(&mut self) -> u16 {
        SidEngine::tick(self)
    }

    fn sample_bits(&self) -> u8 {
        SidEngine::sample_bits(self)
    }

    fn sample_rate(&self) -> u32 {
        self.config().tick_rate
    }

    fn generate_samples_into(&mut self, buffer: &mut [u16]) {
        self.tick_into(buffer);
    }
}
