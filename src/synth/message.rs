use crate::dsp::oscillator::Waveform;
use crate::engine::arpeggiator::{ArpPattern, ArpSubdivision};
use crate::engine::sequencer::StepLength;

/// One control-thread command, published through the SPSC queue and applied
/// by the audio thread at the top of a render.
///
/// Messages carry raw caller values; range clamping happens in one place,
/// when the engine applies the message.
#[derive(Debug, Clone, Copy)]
pub enum ControlMessage {
    NoteOn { note: u8 },
    NoteOff { note: u8 },
    AllNotesOff,

    SetWaveform(Waveform),

    SetFilterCutoff(f32),
    SetFilterResonance(f32),

    SetAttack(f32),
    SetDecay(f32),
    SetSustain(f32),
    SetRelease(f32),

    SetFilterAttack(f32),
    SetFilterDecay(f32),
    SetFilterSustain(f32),
    SetFilterRelease(f32),
    SetFilterEnvelopeAmount(f32),

    SetLfoRate(f32),
    SetLfoAmount(f32),

    SetDelayEnabled(bool),
    SetDelayTime(f32),
    SetDelayFeedback(f32),
    SetDelayMix(f32),

    SetChorusEnabled(bool),
    SetChorusRate(f32),
    SetChorusDepth(f32),
    SetChorusMix(f32),

    SetReverbEnabled(bool),
    SetReverbSize(f32),
    SetReverbDamping(f32),
    SetReverbMix(f32),

    SetArpeggiatorEnabled(bool),
    SetArpeggiatorPattern(ArpPattern),
    SetArpeggiatorRate(f32),
    SetArpeggiatorGate(f32),
    SetArpeggiatorSubdivision(ArpSubdivision),

    SetSequencerEnabled(bool),
    SetSequencerTempo(f32),
    SetSequencerStepLength(StepLength),
    SetSequencerMeasures(usize),
    SetSequencerStep { index: usize, note: u8, active: bool },
}

impl ControlMessage {
    /// Note events may never be dropped; everything else may be shed under
    /// queue pressure (see the bridge's overflow policy).
    pub fn is_note_event(&self) -> bool {
        matches!(
            self,
            ControlMessage::NoteOn { .. } | ControlMessage::NoteOff { .. } | ControlMessage::AllNotesOff
        )
    }
}
