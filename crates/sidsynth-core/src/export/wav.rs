//! WAV file export

use super::{apply_fade_out, normalize_samples, raw_to_pcm16, ExportConfig};
use crate::backend::SynthBackend;
use crate::{Result, SidError};
use std::path::Path;
use tracing::{debug, info};

/// Render ticks from a backend into a 16-bit PCM WAV file
///
/// # Arguments
///
/// * `backend` - Engine or script player to render from its current position
/// * `ticks` - Number of samples to render
/// * `output_path` - Path where the WAV file will be written
/// * `config` - Export configuration (sample rate, channels, normalization, fade)
pub fn render_to_wav<B, P>(backend: &mut B, ticks: usize, output_path: P, config: &ExportConfig) -> Result<()>
where
    B: SynthBackend + ?Sized,
    P: AsRef<Path>,
{
    let sample_rate = config.sample_rate.unwrap_or_else(|| backend.sample_rate());
    info!(
        ticks,
        sample_rate,
        path = %output_path.as_ref().display(),
        "rendering {:.2}s of audio",
        ticks as f64 / sample_rate.max(1) as f64
    );

    let raw = backend.generate_samples(ticks);
    let pcm = raw_to_pcm16(&raw, backend.sample_bits());
    let mut samples: Vec<f32> = pcm.iter().map(|&s| s as f32 / 32768.0).collect();

    if config.normalize {
        debug!("normalizing audio");
        normalize_samples(&mut samples);
    }

    if config.fade_out_duration > 0.0 {
        debug!(seconds = config.fade_out_duration, "applying fade out");
        apply_fade_out(&mut samples, config.fade_out_duration, sample_rate);
    }

    let final_samples = if config.channels == 2 {
        mono_to_stereo(&samples)
    } else {
        samples
    };

    write_wav_file(output_path.as_ref(), &final_samples, sample_rate, config.channels)?;
    info!(path = %output_path.as_ref().display(), "export complete");
    Ok(())
}

/// Write already-rendered unsigned samples to a mono WAV file
pub fn write_raw_wav<P: AsRef<Path>>(path: P, samples: &[u16], bits: u8, sample_rate: u32) -> Result<()> {
    let pcm: Vec<f32> = raw_to_pcm16(samples, bits)
        .iter()
        .map(|&s| s as f32 / 32768.0)
        .collect();
    write_wav_file(path.as_ref(), &pcm, sample_rate, 1)
}

/// Convert mono samples to stereo (duplicate each sample)
fn mono_to_stereo(mono: &[f32]) -> Vec<f32> {
    let mut stereo = Vec::with_capacity(mono.len() * 2);
    for &sample in mono {
        stereo.push(sample);
        stereo.push(sample);
    }
    stereo
}

/// Write samples to WAV file
fn write_wav_file(path: &Path, samples: &[f32], sample_rate: u32, channels: u16) -> Result<()> {
    if !(1..=2).contains(&channels) {
        return Err(SidError::Export(format!("unsupported channel count {channels}")));
    }
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .map_err(|e| SidError::Export(format!("Failed to create WAV file: {}", e)))?;

    for &sample in samples {
        let sample_i16 = (sample.clamp(-1.0, 1.0) * 32768.0).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        writer
            .write_sample(sample_i16)
            .map_err(|e| SidError::Export(format!("Failed to write sample: {}", e)))?;
    }

    writer
        .finalize()
        .map_err(|e| SidError::Export(format!("Failed to finalize WAV file: {}", e)))?;

    Ok(())
}
