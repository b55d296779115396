use rtrb::{Producer, PushError};

use crate::dsp::oscillator::Waveform;
use crate::synth::message::ControlMessage;

use super::arpeggiator::{ArpPattern, ArpSubdivision};
use super::sequencer::StepLength;

/// Capacity of the control queue. Sized well past any realistic UI burst so
/// parameter shedding is a pathological-case behavior, not a normal one.
pub const CONTROL_QUEUE_CAPACITY: usize = 512;

/// The control thread's handle to the engine.
///
/// Every method enqueues a [`ControlMessage`] into a wait-free SPSC ring; the
/// audio thread drains the ring at the top of each render, so callers never
/// contend with the audio callback.
///
/// Overflow policy: parameter updates are shed when the queue is full (the
/// next slider tick re-sends the value anyway), but note events are never
/// dropped - those calls spin until space frees, which only stalls the
/// non-realtime UI thread.
pub struct ControlBridge {
    tx: Producer<ControlMessage>,
}

impl ControlBridge {
    pub(crate) fn new(tx: Producer<ControlMessage>) -> Self {
        Self { tx }
    }

    pub fn note_on(&mut self, note: u8) {
        self.send_note(ControlMessage::NoteOn { note });
    }

    pub fn note_off(&mut self, note: u8) {
        self.send_note(ControlMessage::NoteOff { note });
    }

    pub fn all_notes_off(&mut self) {
        self.send_note(ControlMessage::AllNotesOff);
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.send(ControlMessage::SetWaveform(waveform));
    }

    pub fn set_filter_cutoff(&mut self, cutoff: f32) {
        self.send(ControlMessage::SetFilterCutoff(cutoff));
    }

    pub fn set_filter_resonance(&mut self, resonance: f32) {
        self.send(ControlMessage::SetFilterResonance(resonance));
    }

    pub fn set_attack(&mut self, seconds: f32) {
        self.send(ControlMessage::SetAttack(seconds));
    }

    pub fn set_decay(&mut self, seconds: f32) {
        self.send(ControlMessage::SetDecay(seconds));
    }

    pub fn set_sustain(&mut self, level: f32) {
        self.send(ControlMessage::SetSustain(level));
    }

    pub fn set_release(&mut self, seconds: f32) {
        self.send(ControlMessage::SetRelease(seconds));
    }

    pub fn set_filter_attack(&mut self, seconds: f32) {
        self.send(ControlMessage::SetFilterAttack(seconds));
    }

    pub fn set_filter_decay(&mut self, seconds: f32) {
        self.send(ControlMessage::SetFilterDecay(seconds));
    }

    pub fn set_filter_sustain(&mut self, level: f32) {
        self.send(ControlMessage::SetFilterSustain(level));
    }

    pub fn set_filter_release(&mut self, seconds: f32) {
        self.send(ControlMessage::SetFilterRelease(seconds));
    }

    pub fn set_filter_envelope_amount(&mut self, amount: f32) {
        self.send(ControlMessage::SetFilterEnvelopeAmount(amount));
    }

    pub fn set_lfo_rate(&mut self, hz: f32) {
        self.send(ControlMessage::SetLfoRate(hz));
    }

    pub fn set_lfo_amount(&mut self, amount: f32) {
        self.send(ControlMessage::SetLfoAmount(amount));
    }

    pub fn set_delay_enabled(&mut self, enabled: bool) {
        self.send(ControlMessage::SetDelayEnabled(enabled));
    }

    pub fn set_delay_time(&mut self, seconds: f32) {
        self.send(ControlMessage::SetDelayTime(seconds));
    }

    pub fn set_delay_feedback(&mut self, feedback: f32) {
        self.send(ControlMessage::SetDelayFeedback(feedback));
    }

    pub fn set_delay_mix(&mut self, mix: f32) {
        self.send(ControlMessage::SetDelayMix(mix));
    }

    pub fn set_chorus_enabled(&mut self, enabled: bool) {
        self.send(ControlMessage::SetChorusEnabled(enabled));
    }

    pub fn set_chorus_rate(&mut self, hz: f32) {
        self.send(ControlMessage::SetChorusRate(hz));
    }

    pub fn set_chorus_depth(&mut self, depth: f32) {
        self.send(ControlMessage::SetChorusDepth(depth));
    }

    pub fn set_chorus_mix(&mut self, mix: f32) {
        self.send(ControlMessage::SetChorusMix(mix));
    }

    pub fn set_reverb_enabled(&mut self, enabled: bool) {
        self.send(ControlMessage::SetReverbEnabled(enabled));
    }

    pub fn set_reverb_size(&mut self, size: f32) {
        self.send(ControlMessage::SetReverbSize(size));
    }

    pub fn set_reverb_damping(&mut self, damping: f32) {
        self.send(ControlMessage::SetReverbDamping(damping));
    }

    pub fn set_reverb_mix(&mut self, mix: f32) {
        self.send(ControlMessage::SetReverbMix(mix));
    }

    pub fn set_arpeggiator_enabled(&mut self, enabled: bool) {
        self.send(ControlMessage::SetArpeggiatorEnabled(enabled));
    }

    pub fn set_arpeggiator_pattern(&mut self, pattern: ArpPattern) {
        self.send(ControlMessage::SetArpeggiatorPattern(pattern));
    }

    pub fn set_arpeggiator_rate(&mut self, bpm: f32) {
        self.send(ControlMessage::SetArpeggiatorRate(bpm));
    }

    pub fn set_arpeggiator_gate(&mut self, gate: f32) {
        self.send(ControlMessage::SetArpeggiatorGate(gate));
    }

    pub fn set_arpeggiator_subdivision(&mut self, subdivision: ArpSubdivision) {
        self.send(ControlMessage::SetArpeggiatorSubdivision(subdivision));
    }

    pub fn set_sequencer_enabled(&mut self, enabled: bool) {
        self.send(ControlMessage::SetSequencerEnabled(enabled));
    }

    pub fn set_sequencer_tempo(&mut self, bpm: f32) {
        self.send(ControlMessage::SetSequencerTempo(bpm));
    }

    pub fn set_sequencer_step_length(&mut self, step_length: StepLength) {
        self.send(ControlMessage::SetSequencerStepLength(step_length));
    }

    pub fn set_sequencer_measures(&mut self, measures: usize) {
        self.send(ControlMessage::SetSequencerMeasures(measures));
    }

    pub fn set_sequencer_step(&mut self, index: usize, note: u8, active: bool) {
        self.send(ControlMessage::SetSequencerStep {
            index,
            note,
            active,
        });
    }

    /// Best-effort enqueue for parameter updates; shed on overflow.
    fn send(&mut self, message: ControlMessage) {
        let _ = self.tx.push(message);
    }

    /// Blocking enqueue for note events. Spins on the (non-realtime) caller
    /// until the audio thread frees a slot, or gives up if the engine is
    /// gone.
    fn send_note(&mut self, message: ControlMessage) {
        debug_assert!(message.is_note_event());
        let mut message = message;
        loop {
            match self.tx.push(message) {
                Ok(()) => return,
                Err(PushError::Full(returned)) => {
                    if self.tx.is_abandoned() {
                        return;
                    }
                    message = returned;
                    std::thread::yield_now();
                }
            }
        }
    }
}
