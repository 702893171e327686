//! Built-in demo scenarios
//!
//! Each demo is an ordinary [`RegisterScript`] on the default engine
//! configuration, so it can be rendered directly or saved and edited.

use clap::ValueEnum;
use sidsynth::config::EngineConfig;
use sidsynth::registers::{ControlFlags, FilterRegister, ModeFlags, VoiceRegister};
use sidsynth::{RegisterScript, RegisterTarget};

/// Built-in scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Demo {
    /// Plain sawtooth note
    Sawtooth,
    /// Plain triangle note
    Triangle,
    /// Pulse with a slow width sweep
    Pulse,
    /// Noise hits with short decays
    Noise,
    /// Hard-synced sawtooth with a swept slave pitch
    Sync,
    /// Three-voice chord through a sweeping low-pass filter
    Chord,
    /// Short note with a long exponential release
    Release,
}

/// Script writer working in seconds and Hz
struct Score {
    config: EngineConfig,
    script: RegisterScript,
}

impl Score {
    fn new(seconds: f64) -> Self {
        let config = EngineConfig::default();
        let duration = (seconds * config.tick_rate as f64) as u64;
        Score {
            script: RegisterScript::new(Some(config.clone()), duration),
            config,
        }
    }

    fn tick(&self, seconds: f64) -> u64 {
        (seconds * self.config.tick_rate as f64) as u64
    }

    fn voice(&mut self, at: f64, voice: usize, reg: VoiceRegister, value: u8) {
        let tick = self.tick(at);
        self.script.push(tick, RegisterTarget::Voice(voice), reg.addr(), value);
    }

    fn filter(&mut self, at: f64, reg: FilterRegister, value: u8) {
        let tick = self.tick(at);
        self.script.push(tick, RegisterTarget::Filter, reg.addr(), value);
    }

    fn pitch(&mut self, at: f64, voice: usize, hz: f64) {
        let frequency = self.config.hz_to_frequency(hz);
        self.voice(at, voice, VoiceRegister::FreqLo, frequency as u8);
        self.voice(at, voice, VoiceRegister::FreqHi, (frequency >> 8) as u8);
    }

    fn pulse_width(&mut self, at: f64, voice: usize, width: u16) {
        self.voice(at, voice, VoiceRegister::PulseWidthLo, width as u8);
        self.voice(at, voice, VoiceRegister::PulseWidthHi, (width >> 8) as u8);
    }

    /// Set pitch and envelope, then raise the gate
    fn note_on(&mut self, at: f64, voice: usize, hz: f64, adsr: u16, wave: ControlFlags) {
        self.pitch(at, voice, hz);
        self.voice(at, voice, VoiceRegister::AttackDecay, (adsr >> 8) as u8);
        self.voice(at, voice, VoiceRegister::SustainRelease, adsr as u8);
        self.voice(at, voice, VoiceRegister::Control, (wave | ControlFlags::GATE).bits());
    }

    fn note_off(&mut self, at: f64, voice: usize, wave: ControlFlags) {
        self.voice(at, voice, VoiceRegister::Control, wave.bits());
    }

    fn finish(self) -> RegisterScript {
        self.script
    }
}

impl Demo {
    /// Build the scenario's register script
    pub fn script(self) -> RegisterScript {
        match self {
            Demo::Sawtooth => single_note(ControlFlags::SAWTOOTH, 220.0),
            Demo::Triangle => single_note(ControlFlags::TRIANGLE, 440.0),
            Demo::Pulse => pulse_sweep(),
            Demo::Noise => noise_hits(),
            Demo::Sync => sync_sweep(),
            Demo::Chord => filtered_chord(),
            Demo::Release => long_release(),
        }
    }
}

fn single_note(wave: ControlFlags, hz: f64) -> RegisterScript {
    let mut score = Score::new(2.0);
    score.filter(0.0, FilterRegister::ModeVolume, 0x0F);
    score.note_on(0.0, 0, hz, 0x0A_F6, wave);
    score.note_off(1.5, 0, wave);
    score.finish()
}

fn pulse_sweep() -> RegisterScript {
    let mut score = Score::new(3.0);
    let wave = ControlFlags::PULSE;
    score.filter(0.0, FilterRegister::ModeVolume, 0x0F);
    score.pulse_width(0.0, 0, 0x080);
    score.note_on(0.0, 0, 110.0, 0x00_F8, wave);
    for step in 1..32u16 {
        score.pulse_width(step as f64 * 0.08, 0, 0x080 + step * 0x38);
    }
    score.note_off(2.6, 0, wave);
    score.finish()
}

fn noise_hits() -> RegisterScript {
    let mut score = Score::new(2.0);
    let wave = ControlFlags::NOISE;
    score.filter(0.0, FilterRegister::ModeVolume, 0x0F);
    for (index, hz) in [2000.0, 4000.0, 1200.0, 8000.0].into_iter().enumerate() {
        let at = index as f64 * 0.45;
        score.note_on(at, 0, hz, 0x09_08, wave);
        score.note_off(at + 0.3, 0, wave);
    }
    score.finish()
}

fn sync_sweep() -> RegisterScript {
    let mut score = Score::new(3.0);
    let slave = ControlFlags::SAWTOOTH | ControlFlags::SYNC;
    score.filter(0.0, FilterRegister::ModeVolume, 0x0F);
    // Voice 0 only provides the sync edge for voice 1
    score.note_on(0.0, 0, 110.0, 0x00_F0, ControlFlags::empty());
    score.note_on(0.0, 1, 220.0, 0x00_F8, slave);
    for step in 1..60 {
        let at = step as f64 * 0.04;
        score.pitch(at, 1, 220.0 * 2f64.powf(step as f64 / 20.0));
    }
    score.note_off(2.5, 1, slave);
    score.finish()
}

fn filtered_chord() -> RegisterScript {
    let mut score = Score::new(4.0);
    let waves = [ControlFlags::SAWTOOTH, ControlFlags::PULSE, ControlFlags::SAWTOOTH];
    let notes = [261.63, 329.63, 392.0];

    score.filter(0.0, FilterRegister::CutoffHi, 0x08);
    score.filter(0.0, FilterRegister::ResonanceRouting, 0xA7);
    score.filter(0.0, FilterRegister::ModeVolume, ModeFlags::LOWPASS.bits() | 0x0F);
    score.pulse_width(0.0, 1, 0x600);
    for (voice, (wave, hz)) in waves.into_iter().zip(notes).enumerate() {
        score.note_on(0.0, voice, hz, 0x48_B8, wave);
    }
    for step in 1..40u8 {
        let cutoff = if step < 20 { 0x08 + step * 6 } else { 0x08 + (40 - step) * 6 };
        score.filter(step as f64 * 0.08, FilterRegister::CutoffHi, cutoff);
    }
    for (voice, wave) in waves.into_iter().enumerate() {
        score.note_off(3.3, voice, wave);
    }
    score.finish()
}

fn long_release() -> RegisterScript {
    let mut score = Score::new(4.0);
    let wave = ControlFlags::TRIANGLE;
    score.filter(0.0, FilterRegister::ModeVolume, 0x0F);
    score.note_on(0.0, 0, 330.0, 0x00_FB, wave);
    score.note_off(0.25, 0, wave);
    score.finish()
}
