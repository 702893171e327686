//! Audio export
//!
//! Converts unsigned engine samples to signed 16-bit PCM and writes WAV files
//! through `hound`.
//!
//! # Example
//!
//! ```no_run
//! use sidsynth::export::{render_to_wav, ExportConfig};
//! use sidsynth::{RegisterScript, ScriptPlayer};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let script = RegisterScript::from_json_file("tune.json")?;
//! let ticks = script.duration_ticks as usize;
//! let mut player = ScriptPlayer::new(script)?;
//!
//! let config = ExportConfig::stereo().normalize(true).fade_out(0.5);
//! render_to_wav(&mut player, ticks, "tune.wav", &config)?;
//! # Ok(())
//! # }
//! ```

mod wav;
pub use wav::*;

/// Peak level targeted by normalization
const NORMALIZE_PEAK: f32 = 0.95;

/// Export configuration options
#[derive(Debug, Clone, PartialEq)]
pub struct ExportConfig {
    /// WAV header sample rate (default: the backend's tick rate)
    pub sample_rate: Option<u32>,
    /// Number of audio channels (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Scale the rendered audio so its peak sits just below full scale
    pub normalize: bool,
    /// Fade out duration in seconds (0 = no fade)
    pub fade_out_duration: f32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            sample_rate: None,
            channels: 1,
            normalize: false,
            fade_out_duration: 0.0,
        }
    }
}

impl ExportConfig {
    /// Create config for stereo export
    pub fn stereo() -> Self {
        Self {
            channels: 2,
            ..Default::default()
        }
    }

    /// Create config with a fixed header sample rate
    pub fn with_sample_rate(sample_rate: u32) -> Self {
        Self {
            sample_rate: Some(sample_rate),
            ..Default::default()
        }
    }

    /// Enable normalization
    pub fn normalize(mut self, enable: bool) -> Self {
        self.normalize = enable;
        self
    }

    /// Add fade out at the end
    pub fn fade_out(mut self, duration_seconds: f32) -> Self {
        self.fade_out_duration = duration_seconds;
        self
    }
}

/// Convert unsigned `bits`-wide samples to signed 16-bit PCM
///
/// The midpoint maps to zero: `(v - 2^(bits-1)) << (16 - bits)`, so 8-bit
/// input becomes `(v - 128) * 256`.
pub fn raw_to_pcm16(samples: &[u16], bits: u8) -> Vec<i16> {
    let bits = bits.clamp(1, 16);
    let mid = 1i32 << (bits - 1);
    let shift = 16 - bits;
    samples
        .iter()
        .map(|&v| {
            let centered = (v as i32).min((1 << bits) - 1) - mid;
            (centered << shift) as i16
        })
        .collect()
}

/// Scale samples so the peak reaches 0.95 of full scale
///
/// Silent input is left untouched.
pub fn normalize_samples(samples: &mut [f32]) {
    let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
    if peak <= f32::EPSILON {
        return;
    }
    let scale = NORMALIZE_PEAK / peak;
    for sample in samples.iter_mut() {
        *sample *= scale;
    }
}

/// Apply a linear fade out to the end of the samples
pub fn apply_fade_out(samples: &mut [f32], fade_duration: f32, sample_rate: u32) {
    if fade_duration <= 0.0 || samples.is_empty() {
        return;
    }

    let fade_samples = ((fade_duration * sample_rate as f32) as usize).max(1);
    let start_fade = samples.len().saturating_sub(fade_samples);

    for (i, sample) in samples.iter_mut().enumerate().skip(start_fade) {
        let progress = (i - start_fade + 1) as f32 / fade_samples as f32;
        *sample *= (1.0 - progress).max(0.0);
    }
}
