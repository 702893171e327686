//! Benchmarks for the per-tick hot path
//!
//! Run with: cargo bench --bench engine -p sidsynth

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use sidsynth::config::EngineConfig;
use sidsynth::registers::{ControlFlags, FilterRegister, ModeFlags, VoiceRegister};
use sidsynth::{RegisterTarget, SidEngine, SynthBackend};
use std::hint::black_box;

/// Three gated voices (saw, pulse, noise) with voice 1 routed through a low-pass
fn busy_engine(config: EngineConfig) -> SidEngine {
    let mut engine = SidEngine::new(config).expect("benchmark config is valid");
    let waves = [ControlFlags::SAWTOOTH, ControlFlags::PULSE, ControlFlags::NOISE];
    for (index, wave) in waves.iter().enumerate() {
        let voice = RegisterTarget::Voice(index);
        engine.set_register(voice, VoiceRegister::FreqHi.addr(), 0x10 + index as u8 * 4);
        engine.set_register(voice, VoiceRegister::PulseWidthHi.addr(), 0x08);
        engine.set_register(voice, VoiceRegister::AttackDecay.addr(), 0x22);
        engine.set_register(voice, VoiceRegister::SustainRelease.addr(), 0xA4);
        engine.set_register(voice, VoiceRegister::Control.addr(), (*wave | ControlFlags::GATE).bits());
    }
    engine.set_register(RegisterTarget::Filter, FilterRegister::CutoffHi.addr(), 0x40);
    engine.set_register(RegisterTarget::Filter, FilterRegister::ResonanceRouting.addr(), 0x81);
    engine.set_register(
        RegisterTarget::Filter,
        FilterRegister::ModeVolume.addr(),
        ModeFlags::LOWPASS.bits() | 0x0F,
    );
    engine
}

fn bench_tick_iterations(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");

    let presets = [
        ("default", EngineConfig::default()),
        ("sid_like", EngineConfig::sid_like()),
    ];
    for (name, config) in presets {
        let mut engine = busy_engine(config);
        for iterations in [100, 1000, 10000].iter() {
            group.bench_with_input(
                BenchmarkId::new(name, iterations),
                iterations,
                |b, &iterations| {
                    b.iter(|| {
                        for _ in 0..iterations {
                            black_box(engine.tick());
                        }
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_generate_samples(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_samples");

    let mut engine = busy_engine(EngineConfig::default());
    let mut buffer = vec![0u16; 44_100];

    for sample_count in [882, 4410, 44100].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(sample_count),
            sample_count,
            |b, &sample_count| {
                b.iter(|| {
                    engine.generate_samples_into(&mut buffer[..sample_count]);
                    black_box(&buffer);
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_tick_iterations, bench_generate_samples);
criterion_main!(benches);
