use crate::dsp::envelope::AdsrEnvelope;
use crate::dsp::filter::SvFilter;
use crate::dsp::oscillator::{Oscillator, Waveform};

use super::params::VoiceParams;

/// Fade-in applied after a retrigger on a new note, ~2 ms at 48 kHz.
pub const CLICK_FADE_SAMPLES: u32 = 96;
/// Grace period after the envelopes go idle before the slot is reclaimed,
/// ~1 ms at 48 kHz.
pub const STOP_FADE_SAMPLES: u32 = 48;

/// Sentinel for "no note assigned".
pub const NO_NOTE: i32 = -1;

/// Equal-tempered MIDI-note-to-frequency conversion (A4 = 440 Hz = note 69).
pub fn midi_note_to_freq(note: i32) -> f32 {
    440.0 * 2f32.powf((note - 69) as f32 / 12.0)
}

/// One note's complete signal chain: oscillator → filter (driven by its own
/// envelope plus the shared LFO) → amp envelope.
///
/// A voice is identified by the MIDI note it carries; `midi_note == -1`
/// means the slot is fully idle and free for allocation.
#[derive(Debug)]
pub struct Voice {
    osc: Oscillator,
    amp_env: AdsrEnvelope,
    filter_env: AdsrEnvelope,
    filter: SvFilter,

    frequency: f32,
    midi_note: i32,
    key_held: bool,
    filter_env_amount: f32,

    click_suppression_samples: u32,
    stop_fadeout_samples: u32,
}

impl Voice {
    pub fn new() -> Self {
        Self {
            osc: Oscillator::new(Waveform::default()),
            amp_env: AdsrEnvelope::new(),
            filter_env: AdsrEnvelope::new(),
            filter: SvFilter::new(),
            frequency: 0.0,
            midi_note: NO_NOTE,
            key_held: false,
            filter_env_amount: 0.0,
            click_suppression_samples: 0,
            stop_fadeout_samples: 0,
        }
    }

    /// Push the cached instrument parameters into this voice. Called on
    /// every trigger and whenever a parameter setter arrives, so envelope
    /// and filter changes reach notes that are already sounding. Waveform is
    /// deliberately not touched here; it is chosen at note-on.
    pub fn apply_params(&mut self, params: &VoiceParams) {
        self.amp_env.set_attack(params.amp.attack);
        self.amp_env.set_decay(params.amp.decay);
        self.amp_env.set_sustain(params.amp.sustain);
        self.amp_env.set_release(params.amp.release);

        self.filter_env.set_attack(params.filter_env.attack);
        self.filter_env.set_decay(params.filter_env.decay);
        self.filter_env.set_sustain(params.filter_env.sustain);
        self.filter_env.set_release(params.filter_env.release);

        self.filter.set_cutoff(params.cutoff);
        self.filter.set_resonance(params.resonance);
        self.filter_env_amount = params.filter_env_amount.clamp(0.0, 1.0);
    }

    pub fn note_on(&mut self, midi_note: i32, waveform: Waveform) {
        let same_note = midi_note == self.midi_note;

        self.midi_note = midi_note;
        self.key_held = true;
        self.frequency = midi_note_to_freq(midi_note);
        self.osc.set_waveform(waveform);

        self.amp_env.note_on();
        self.filter_env.note_on();

        if !same_note {
            // New pitch: restart the cycle and let the filter state bleed
            // away instead of carrying the old note's resonance.
            self.osc.reset();
            self.filter.reset();
            self.click_suppression_samples = CLICK_FADE_SAMPLES;
        }
        self.stop_fadeout_samples = STOP_FADE_SAMPLES;
    }

    pub fn note_off(&mut self) {
        self.key_held = false;
        self.amp_env.note_off();
        self.filter_env.note_off();
    }

    /// Render one sample. `lfo` is the shared bipolar cutoff modulation.
    pub fn process(&mut self, sample_rate: f32, lfo: f32) -> f32 {
        if self.midi_note == NO_NOTE {
            return 0.0;
        }

        if !self.amp_env.is_active() && !self.filter_env.is_active() {
            // Post-envelope tail: hold the slot briefly, then free it.
            if self.stop_fadeout_samples > 0 {
                self.stop_fadeout_samples -= 1;
            }
            if self.stop_fadeout_samples == 0 {
                self.midi_note = NO_NOTE;
                self.key_held = false;
            }
            return 0.0;
        }

        let mut sample = self.osc.next_sample(self.frequency, sample_rate);

        if self.click_suppression_samples > 0 {
            let fade = 1.0 - self.click_suppression_samples as f32 / CLICK_FADE_SAMPLES as f32;
            sample *= fade;
            self.click_suppression_samples -= 1;
        }

        let amp = self.amp_env.process(sample_rate);
        let filter_mod = self.filter_env.process(sample_rate) * self.filter_env_amount + lfo;
        sample = self.filter.process(sample, sample_rate, filter_mod);

        sample * amp
    }

    /// The note is audibly sounding (amp envelope not idle).
    pub fn is_note_active(&self) -> bool {
        self.amp_env.is_active()
    }

    /// The slot cannot be reclaimed yet: key down, an envelope still moving,
    /// or one of the short fade counters still running.
    pub fn is_producing_audio(&self) -> bool {
        self.key_held
            || self.amp_env.is_active()
            || self.filter_env.is_active()
            || self.click_suppression_samples > 0
            || self.stop_fadeout_samples > 0
    }

    /// Stealing policy: released and already quiet.
    pub fn can_be_stolen(&self) -> bool {
        !self.key_held && self.amp_env.level() < 0.1
    }

    pub fn midi_note(&self) -> i32 {
        self.midi_note
    }

    pub fn key_held(&self) -> bool {
        self.key_held
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn amp_level(&self) -> f32 {
        self.amp_env.level()
    }

    pub fn amp_state(&self) -> crate::dsp::envelope::EnvelopeState {
        self.amp_env.state()
    }
}

impl Default for Voice {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::envelope::EnvelopeState;

    const SAMPLE_RATE: f32 = 48_000.0;

    fn triggered_voice(note: i32) -> Voice {
        let mut voice = Voice::new();
        voice.apply_params(&VoiceParams::default());
        voice.note_on(note, Waveform::Sawtooth);
        voice
    }

    #[test]
    fn midi_note_conversion_hits_reference_pitches() {
        assert!((midi_note_to_freq(69) - 440.0).abs() < 1e-3);
        assert!((midi_note_to_freq(60) - 261.626).abs() < 1e-2);
        assert!((midi_note_to_freq(81) - 880.0).abs() < 1e-2);
    }

    #[test]
    fn fresh_voice_is_silent_and_free() {
        let mut voice = Voice::new();
        assert_eq!(voice.midi_note(), NO_NOTE);
        assert!(!voice.is_producing_audio());
        for _ in 0..128 {
            assert_eq!(voice.process(SAMPLE_RATE, 0.0), 0.0);
        }
    }

    #[test]
    fn triggered_voice_produces_audio() {
        let mut voice = triggered_voice(60);
        let mut energy = 0.0;
        for _ in 0..4800 {
            energy += voice.process(SAMPLE_RATE, 0.0).abs();
        }
        assert!(energy > 1.0, "voice stayed silent: {energy}");
        assert!(voice.is_note_active());
    }

    #[test]
    fn click_fade_suppresses_the_first_samples() {
        let mut voice = triggered_voice(60);
        let first = voice.process(SAMPLE_RATE, 0.0).abs();
        // Fully faded-in sawtooth at the same point in a later cycle would
        // start near -1; the very first sample must be heavily attenuated.
        assert!(first < 0.05, "click fade missing, first sample {first}");
    }

    #[test]
    fn released_voice_goes_fully_idle_and_frees_its_slot() {
        let mut voice = triggered_voice(64);
        for _ in 0..4800 {
            voice.process(SAMPLE_RATE, 0.0);
        }
        voice.note_off();

        // Default release is 0.3 s; run well past it plus the stop fade.
        for _ in 0..(0.4 * SAMPLE_RATE) as usize {
            voice.process(SAMPLE_RATE, 0.0);
        }
        assert_eq!(voice.midi_note(), NO_NOTE);
        assert!(!voice.is_producing_audio());
        assert_eq!(voice.process(SAMPLE_RATE, 0.0), 0.0);
    }

    #[test]
    fn retrigger_same_note_keeps_phase_and_skips_click_fade() {
        let mut voice = triggered_voice(60);
        for _ in 0..CLICK_FADE_SAMPLES + 100 {
            voice.process(SAMPLE_RATE, 0.0);
        }
        let level_before = voice.amp_level();
        voice.note_on(60, Waveform::Sawtooth);
        voice.process(SAMPLE_RATE, 0.0);
        assert!(voice.is_note_active());
        assert!(matches!(voice.amp_state(), EnvelopeState::Attack));
        // Same pitch: the envelope continues from where it was instead of
        // dipping through a fade-in.
        assert!(
            voice.amp_level() >= level_before - 1e-4,
            "retrigger dropped the envelope from {level_before} to {}",
            voice.amp_level()
        );
    }

    #[test]
    fn steal_eligibility_tracks_key_and_level() {
        let mut voice = triggered_voice(72);
        for _ in 0..4800 {
            voice.process(SAMPLE_RATE, 0.0);
        }
        assert!(!voice.can_be_stolen(), "held note must not be stolen");

        voice.note_off();
        // Render until the release tail drops under the steal threshold.
        for _ in 0..(0.3 * SAMPLE_RATE) as usize {
            voice.process(SAMPLE_RATE, 0.0);
            if voice.can_be_stolen() {
                return;
            }
        }
        panic!("released voice never became stealable");
    }
}
