//! The synthesizer engine: owns the voice pool, effects chain, arpeggiator
//! and sequencer, and renders mono buffers for the audio callback.

pub mod arpeggiator;
pub mod control;
pub mod sequencer;

use rtrb::{Consumer, RingBuffer};

use crate::dsp::envelope::{MIN_ATTACK_SECS, MIN_DECAY_SECS, MIN_RELEASE_SECS};
use crate::dsp::lfo::Lfo;
use crate::effects::{Chorus, Delay, Reverb};
use crate::synth::message::ControlMessage;
use crate::synth::params::VoiceParams;
use crate::synth::pool::VoicePool;
use crate::synth::voice::Voice;

pub use arpeggiator::{ArpPattern, ArpSubdivision, Arpeggiator};
pub use control::{ControlBridge, CONTROL_QUEUE_CAPACITY};
pub use sequencer::{SequencerStep, StepLength, StepSequencer};

/// Fixed make-up gain applied after the effects chain.
const OUTPUT_GAIN: f32 = 0.55;

/// Per-sample smoothing coefficient for the polyphony gain.
const POLY_GAIN_SMOOTHING: f32 = 0.001;

/// Soft-knee limiter: above the knee, excess is scaled by the slope.
const LIMITER_KNEE: f32 = 0.9;
const LIMITER_SLOPE: f32 = 0.2;

/// The audio-thread half of the synthesizer.
///
/// All mutable audio state lives here and is only ever touched from
/// [`Engine::render`]. Construction performs every allocation (voice pool,
/// effect ring buffers, step table) so the render path never allocates,
/// locks, or blocks.
pub struct Engine {
    sample_rate: f32,
    rx: Consumer<ControlMessage>,

    pool: VoicePool,
    params: VoiceParams,
    lfo: Lfo,

    chorus: Chorus,
    delay: Delay,
    reverb: Reverb,

    arpeggiator: Arpeggiator,
    sequencer: StepSequencer,

    /// Smoothed 1/√n polyphony normalization.
    poly_gain: f32,
}

impl Engine {
    /// Build an engine draining `rx`. All buffers are sized from
    /// `sample_rate` here, up front.
    pub fn new(sample_rate: f32, rx: Consumer<ControlMessage>) -> Self {
        Self {
            sample_rate,
            rx,
            pool: VoicePool::new(),
            params: VoiceParams::default(),
            lfo: Lfo::new(),
            chorus: Chorus::new(sample_rate),
            delay: Delay::new(sample_rate),
            reverb: Reverb::new(sample_rate),
            arpeggiator: Arpeggiator::new(),
            sequencer: StepSequencer::new(),
            poly_gain: 1.0,
        }
    }

    /// Convenience constructor wiring up the control queue.
    pub fn with_bridge(sample_rate: f32) -> (Self, ControlBridge) {
        let (tx, rx) = RingBuffer::new(CONTROL_QUEUE_CAPACITY);
        (Self::new(sample_rate, rx), ControlBridge::new(tx))
    }

    /// Render one buffer of mono samples in [-1, 1].
    ///
    /// Control events are applied atomically at the buffer boundary; the
    /// arpeggiator or sequencer then injects its note events; finally every
    /// frame is mixed through the voice pool and the effects chain.
    pub fn render(&mut self, out: &mut [f32]) {
        out.fill(0.0);

        while let Ok(message) = self.rx.pop() {
            self.apply(message);
        }

        let frames = out.len();
        if self.sequencer.is_enabled() {
            self.sequencer
                .advance(frames, self.sample_rate, &mut self.pool, &self.params);
        } else if self.arpeggiator.is_enabled() {
            self.arpeggiator
                .advance(frames, self.sample_rate, &mut self.pool, &self.params);
        }

        for slot in out.iter_mut() {
            let lfo = self.lfo.process(self.sample_rate);
            let (sum, active) = self.pool.render_frame(self.sample_rate, lfo);

            let target = if active > 0 {
                1.0 / (active as f32).sqrt()
            } else {
                1.0
            };
            self.poly_gain += POLY_GAIN_SMOOTHING * (target - self.poly_gain);

            let mut sample = sum * self.poly_gain;
            sample = self.chorus.process(sample);
            sample = self.delay.process(sample);
            sample = self.reverb.process(sample);
            sample *= OUTPUT_GAIN;

            let magnitude = sample.abs();
            if magnitude > LIMITER_KNEE {
                sample = sample.signum() * (LIMITER_KNEE + (magnitude - LIMITER_KNEE) * LIMITER_SLOPE);
            }
            sample = (sample * 0.5).tanh();

            *slot = sample.clamp(-1.0, 1.0);
        }
    }

    /// Release every sounding voice and the arpeggiator's held keys. Used
    /// on shutdown before the platform stream stops.
    pub fn release_all(&mut self) {
        let pool = &mut self.pool;
        if self.arpeggiator.is_enabled() {
            self.arpeggiator.set_enabled(false, pool);
        }
        if self.sequencer.is_enabled() {
            self.sequencer.set_enabled(false, pool);
        }
        pool.release_all();
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Read-only view of the pool, for metering and tests.
    pub fn voices(&self) -> &[Voice] {
        self.pool.voices()
    }

    /// True while any voice still has audible (or soon-audible) output.
    pub fn any_voice_producing_audio(&self) -> bool {
        self.pool.any_producing_audio()
    }

    fn apply(&mut self, message: ControlMessage) {
        match message {
            ControlMessage::NoteOn { note } => {
                let note = i32::from(note.min(127));
                if self.arpeggiator.is_enabled() {
                    self.arpeggiator.key_on(note);
                } else {
                    self.pool.note_on(note, &self.params);
                }
            }
            ControlMessage::NoteOff { note } => {
                let note = i32::from(note.min(127));
                if self.arpeggiator.is_enabled() {
                    self.arpeggiator.key_off(note);
                } else {
                    self.pool.note_off(note);
                }
            }
            ControlMessage::AllNotesOff => {
                self.arpeggiator.clear_held();
                self.pool.release_all();
            }

            ControlMessage::SetWaveform(waveform) => {
                // Future note-ons only; sounding voices keep their shape.
                self.params.waveform = waveform;
            }

            ControlMessage::SetFilterCutoff(cutoff) => {
                self.params.cutoff = cutoff.clamp(0.0, 1.0);
                self.pool.apply_params(&self.params);
            }
            ControlMessage::SetFilterResonance(resonance) => {
                self.params.resonance = resonance.clamp(0.0, 1.0);
                self.pool.apply_params(&self.params);
            }

            ControlMessage::SetAttack(seconds) => {
                self.params.amp.attack = seconds.max(MIN_ATTACK_SECS);
                self.pool.apply_params(&self.params);
            }
            ControlMessage::SetDecay(seconds) => {
                self.params.amp.decay = seconds.max(MIN_DECAY_SECS);
                self.pool.apply_params(&self.params);
            }
            ControlMessage::SetSustain(level) => {
                self.params.amp.sustain = level.clamp(0.0, 1.0);
                self.pool.apply_params(&self.params);
            }
            ControlMessage::SetRelease(seconds) => {
                self.params.amp.release = seconds.max(MIN_RELEASE_SECS);
                self.pool.apply_params(&self.params);
            }

            ControlMessage::SetFilterAttack(seconds) => {
                self.params.filter_env.attack = seconds.max(MIN_ATTACK_SECS);
                self.pool.apply_params(&self.params);
            }
            ControlMessage::SetFilterDecay(seconds) => {
                self.params.filter_env.decay = seconds.max(MIN_DECAY_SECS);
                self.pool.apply_params(&self.params);
            }
            ControlMessage::SetFilterSustain(level) => {
                self.params.filter_env.sustain = level.clamp(0.0, 1.0);
                self.pool.apply_params(&self.params);
            }
            ControlMessage::SetFilterRelease(seconds) => {
                self.params.filter_env.release = seconds.max(MIN_RELEASE_SECS);
                self.pool.apply_params(&self.params);
            }
            ControlMessage::SetFilterEnvelopeAmount(amount) => {
                self.params.filter_env_amount = amount.clamp(0.0, 1.0);
                self.pool.apply_params(&self.params);
            }

            ControlMessage::SetLfoRate(hz) => self.lfo.set_rate(hz),
            ControlMessage::SetLfoAmount(amount) => self.lfo.set_amount(amount),

            ControlMessage::SetDelayEnabled(enabled) => self.delay.set_enabled(enabled),
            ControlMessage::SetDelayTime(seconds) => self.delay.set_time(seconds),
            ControlMessage::SetDelayFeedback(feedback) => self.delay.set_feedback(feedback),
            ControlMessage::SetDelayMix(mix) => self.delay.set_mix(mix),

            ControlMessage::SetChorusEnabled(enabled) => self.chorus.set_enabled(enabled),
            ControlMessage::SetChorusRate(hz) => self.chorus.set_rate(hz),
            ControlMessage::SetChorusDepth(depth) => self.chorus.set_depth(depth),
            ControlMessage::SetChorusMix(mix) => self.chorus.set_mix(mix),

            ControlMessage::SetReverbEnabled(enabled) => self.reverb.set_enabled(enabled),
            ControlMessage::SetReverbSize(size) => self.reverb.set_size(size),
            ControlMessage::SetReverbDamping(damping) => self.reverb.set_damping(damping),
            ControlMessage::SetReverbMix(mix) => self.reverb.set_mix(mix),

            ControlMessage::SetArpeggiatorEnabled(enabled) => {
                self.arpeggiator.set_enabled(enabled, &mut self.pool);
            }
            ControlMessage::SetArpeggiatorPattern(pattern) => {
                self.arpeggiator.set_pattern(pattern);
            }
            ControlMessage::SetArpeggiatorRate(bpm) => self.arpeggiator.set_bpm(bpm),
            ControlMessage::SetArpeggiatorGate(gate) => self.arpeggiator.set_gate(gate),
            ControlMessage::SetArpeggiatorSubdivision(subdivision) => {
                self.arpeggiator.set_subdivision(subdivision);
            }

            ControlMessage::SetSequencerEnabled(enabled) => {
                self.sequencer.set_enabled(enabled, &mut self.pool);
            }
            ControlMessage::SetSequencerTempo(bpm) => self.sequencer.set_tempo(bpm),
            ControlMessage::SetSequencerStepLength(step_length) => {
                self.sequencer.set_step_length(step_length);
            }
            ControlMessage::SetSequencerMeasures(measures) => {
                self.sequencer.set_measures(measures);
            }
            ControlMessage::SetSequencerStep {
                index,
                note,
                active,
            } => {
                self.sequencer.set_step(index, note, active);
            }
        }
    }
}
