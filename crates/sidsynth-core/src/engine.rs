//! Synthesis engine
//!
//! [`SidEngine`] owns the register file and every piece of per-voice state
//! and produces one sample per [`SidEngine::tick`]. A tick is computed like
//! synchronous logic: every voice's next phase is derived from a frozen view
//! of the previous tick, and only then are the new phases committed. Sync,
//! ring modulation and the noise clock therefore never depend on the order in
//! which voices are visited.
//!
//! Per tick:
//!
//! 1. Drain the [`RegisterPort`] and apply queued writes
//! 2. Commit latched writes (latched mode only)
//! 3. Advance every oscillator from the previous-tick snapshot
//! 4. Apply hard sync from the sources' MSB edges
//! 5. Clock the noise register(s) from the tracked voice's phase bit
//! 6. Generate waveforms (ring from the latched MSBs), clock envelopes,
//!    scale by envelope
//! 7. Commit phases and latch MSBs
//! 8. Route into the direct and filter buses, filter, scale by volume, mix
//!    and clamp

use crate::config::{EngineConfig, NoiseRouting, WriteMode};
use crate::envelope::{EnvelopeGenerator, EnvelopeState, RateTable};
use crate::filter::{scale_volume, CoefficientMap, Filter, FilterMode};
use crate::mixer::{voice_output, Mixer};
use crate::noise::NoiseLfsr;
use crate::oscillator::{Oscillator, OscillatorStep, PhaseWidth};
use crate::port::{RegisterPort, RegisterWrite};
use crate::registers::{decode_bus_address, RegisterFile, RegisterTarget};
use crate::waveform::{WaveformGenerator, WaveformInputs};
use crate::Result;
use tracing::{debug, trace};

/// Multi-voice synthesis engine
#[derive(Debug)]
pub struct SidEngine {
    config: EngineConfig,
    width: PhaseWidth,
    waveform: WaveformGenerator,
    rates: RateTable,
    noise_clock_bit: u8,

    // Registers as seen by synthesis, and the host-side shadow in latched mode
    registers: RegisterFile,
    shadow: RegisterFile,
    shadow_dirty: bool,

    oscillators: Vec<Oscillator>,
    envelopes: Vec<EnvelopeGenerator>,
    noise: Vec<NoiseLfsr>,
    filter: Filter,
    mixer: Mixer,

    port: RegisterPort,

    // Per-tick scratch, kept to avoid allocating in the hot path
    steps: Vec<OscillatorStep>,
    outputs: Vec<u16>,
    pending: Vec<RegisterWrite>,

    tick_count: u64,
    last_sample: u16,
}

impl SidEngine {
    /// Create an engine from a configuration
    ///
    /// Fails with [`crate::SidError::Config`] when the configuration is invalid.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_validated(config))
    }

    fn from_validated(config: EngineConfig) -> Self {
        let width = config.phase_width();
        let voices = config.voices;
        let noise_count = match config.noise.routing {
            NoiseRouting::Shared { .. } => 1,
            NoiseRouting::PerVoice => voices,
        };
        let lfsr = NoiseLfsr::from_checked(config.noise.width, config.noise.taps, config.noise.seed);
        let registers = RegisterFile::new(voices, config.layout, config.pulse_width_bits);

        debug!(
            voices,
            phase_bits = config.phase_bits,
            tick_rate = config.tick_rate,
            "creating synthesis engine: {}",
            config.summary()
        );

        SidEngine {
            width,
            waveform: WaveformGenerator::new(
                width,
                config.waveform_bits,
                config.pulse_width_bits,
                config.combine,
            ),
            rates: config.rate_table(),
            noise_clock_bit: config.noise_clock_bit(),
            shadow: registers.clone(),
            registers,
            shadow_dirty: false,
            oscillators: vec![Oscillator::new(); voices],
            envelopes: vec![EnvelopeGenerator::new(config.sustain_state); voices],
            noise: vec![lfsr; noise_count],
            filter: Filter::new(config.filter.frac_bits, config.filter.mapping.build()),
            mixer: Mixer::new(voices),
            port: RegisterPort::new(),
            steps: vec![OscillatorStep::default(); voices],
            outputs: vec![0; voices],
            pending: Vec::new(),
            tick_count: 0,
            last_sample: 0,
            config,
        }
    }

    /// Replace the filter's coefficient strategy
    pub fn with_coefficient_map(mut self, map: Box<dyn CoefficientMap>) -> Self {
        self.filter.set_coefficient_map(map);
        self
    }

    /// Active configuration
    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Handle for queueing writes from another thread
    pub fn port(&self) -> RegisterPort {
        self.port.clone()
    }

    /// Write one register
    ///
    /// Unknown voices or addresses are ignored. In latched mode the write is
    /// held until the next tick boundary.
    pub fn set_register(&mut self, target: RegisterTarget, address: u8, value: u8) {
        let applied = match self.config.write_mode {
            WriteMode::Immediate => self.registers.write(target, address, value),
            WriteMode::Latched => {
                let applied = self.shadow.write(target, address, value);
                self.shadow_dirty |= applied;
                applied
            }
        };
        if !applied {
            trace!(%target, address, value, "ignoring write to nonexistent register");
        }
    }

    /// Write through a flat bus address
    ///
    /// Bits 0-2 select the register, bits 3-4 the voice, and bit 5 the filter
    /// block.
    pub fn write_bus(&mut self, address: u8, value: u8) {
        let (target, register) = decode_bus_address(address);
        self.set_register(target, register, value);
    }

    /// Last byte written to a register (0 for unknown registers)
    pub fn read_register(&self, target: RegisterTarget, address: u8) -> u8 {
        self.host_registers().read(target, address)
    }

    /// Every register byte: each voice's block, then the filter block
    pub fn dump_registers(&self) -> Vec<u8> {
        self.host_registers().dump()
    }

    fn host_registers(&self) -> &RegisterFile {
        match self.config.write_mode {
            WriteMode::Immediate => &self.registers,
            WriteMode::Latched => &self.shadow,
        }
    }

    /// Mute or unmute a voice without touching its state
    pub fn set_voice_mute(&mut self, voice: usize, mute: bool) {
        if !self.mixer.set_mute(voice, mute) {
            trace!(voice, "ignoring mute for nonexistent voice");
        }
    }

    /// Whether a voice is muted
    pub fn is_voice_muted(&self, voice: usize) -> bool {
        self.mixer.is_muted(voice)
    }

    /// Envelope-scaled output of a voice on the last tick
    pub fn voice_output(&self, voice: usize) -> u16 {
        self.outputs.get(voice).copied().unwrap_or(0)
    }

    /// Envelope level of a voice
    pub fn envelope_level(&self, voice: usize) -> u16 {
        self.envelopes.get(voice).map_or(0, EnvelopeGenerator::level)
    }

    /// Envelope state of a voice
    pub fn envelope_state(&self, voice: usize) -> EnvelopeState {
        self.envelopes
            .get(voice)
            .map_or(EnvelopeState::Idle, EnvelopeGenerator::state)
    }

    /// Phase accumulator of a voice
    pub fn phase(&self, voice: usize) -> u32 {
        self.oscillators.get(voice).map_or(0, Oscillator::phase)
    }

    /// Noise register contents (shared register, or the voice's own)
    pub fn noise_state(&self, voice: usize) -> u32 {
        let index = if self.noise.len() == 1 { 0 } else { voice };
        self.noise.get(index).map_or(0, NoiseLfsr::state)
    }

    /// Ticks since construction or the last reset
    #[inline]
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Sample produced by the last tick
    #[inline]
    pub fn last_sample(&self) -> u16 {
        self.last_sample
    }

    /// Output sample width in bits
    #[inline]
    pub fn sample_bits(&self) -> u8 {
        self.config.waveform_bits
    }

    /// Clear every register and all engine state
    ///
    /// Voice mutes are host settings and survive a reset.
    pub fn reset(&mut self) {
        self.registers.clear();
        self.shadow.clear();
        self.shadow_dirty = false;
        self.oscillators.iter_mut().for_each(Oscillator::reset);
        self.envelopes.iter_mut().for_each(EnvelopeGenerator::reset);
        self.noise.iter_mut().for_each(NoiseLfsr::reset);
        self.filter.reset();
        self.port.clear();
        self.outputs.fill(0);
        self.tick_count = 0;
        self.last_sample = 0;
        debug!("engine reset");
    }

    /// Advance one tick and return the output sample
    pub fn tick(&mut self) -> u16 {
        self.apply_port_writes();
        if self.shadow_dirty {
            self.registers.clone_from(&self.shadow);
            self.shadow_dirty = false;
        }

        let voices = self.config.voices;
        let width = self.width;

        // Next phases from the frozen previous state
        for (index, osc) in self.oscillators.iter().enumerate() {
            let regs = self.registers.voice(index);
            self.steps[index] = osc.step(width, regs.frequency, regs.test(), self.config.sync_edge);
        }

        // Hard sync reads the sources' pre-sync edges, so visiting order is irrelevant
        for index in 0..voices {
            let source = self.config.sync_source(index);
            if source != index && self.registers.voice(index).sync() && self.steps[source].edge {
                self.steps[index].phase = 0;
            }
        }

        self.clock_noise();

        let shared_noise = self.noise.len() == 1;
        for index in 0..voices {
            let regs = *self.registers.voice(index);
            let source = self.config.sync_source(index);
            let noise = if shared_noise { &self.noise[0] } else { &self.noise[index] };
            let wave = self.waveform.generate(&WaveformInputs {
                phase: self.steps[index].phase,
                control: regs.control,
                pulse_width: regs.pulse_width,
                ring_msb: self.oscillators[source].msb_latch(),
                noise: noise.output(self.config.waveform_bits),
            });
            let level = self.envelopes[index].clock(
                &self.rates,
                regs.gate(),
                regs.attack,
                regs.decay,
                regs.sustain,
                regs.release,
            );
            self.outputs[index] = voice_output(wave, level, self.config.envelope_bits);
        }

        // Ring reads the previous tick's latches, so commit only after every voice
        for (osc, step) in self.oscillators.iter_mut().zip(&self.steps) {
            osc.commit(width, step.phase);
        }

        let filter_regs = *self.registers.filter();
        let voice_mask = ((1u32 << voices) - 1) as u8;
        let mode = FilterMode::select(filter_regs.mode, filter_regs.routing & voice_mask != 0);
        let buses = self
            .mixer
            .route(&self.outputs, filter_regs.routing, filter_regs.mode, mode != FilterMode::Bypass);

        self.filter.update(filter_regs.cutoff, filter_regs.resonance);
        let filtered = if buses.filtered_count > 0 {
            scale_volume(self.filter.process(buses.filtered as i32, mode), filter_regs.volume)
        } else {
            0
        };

        let sample = self.mixer.output(buses.direct, filtered, self.config.sample_max());
        self.tick_count += 1;
        self.last_sample = sample;
        sample
    }

    /// Advance several ticks, writing samples into `buffer`
    pub fn tick_into(&mut self, buffer: &mut [u16]) {
        for slot in buffer.iter_mut() {
            *slot = self.tick();
        }
    }

    fn apply_port_writes(&mut self) {
        let mut pending = std::mem::take(&mut self.pending);
        self.port.drain_into(&mut pending);
        for write in pending.drain(..) {
            self.set_register(write.target, write.address, write.value);
        }
        self.pending = pending;
    }

    fn clock_noise(&mut self) {
        let bit = self.noise_clock_bit;
        let width = self.width;
        let shared_source = match self.config.noise.routing {
            NoiseRouting::Shared { source } => Some(source),
            NoiseRouting::PerVoice => None,
        };
        for (index, lfsr) in self.noise.iter_mut().enumerate() {
            let voice = shared_source.unwrap_or(index);
            if self.registers.voice(voice).test() {
                lfsr.reset();
                continue;
            }
            // Rising edge between the committed phase and this tick's phase
            let previous = width.bit(self.oscillators[voice].phase(), bit);
            let current = width.bit(self.steps[voice].phase, bit);
            if !previous && current {
                lfsr.step();
            }
        }
    }
}

impl Default for SidEngine {
    fn default() -> Self {
        Self::from_validated(EngineConfig::default())
    }
}
