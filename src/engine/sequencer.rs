#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::synth::params::VoiceParams;
use crate::synth::pool::VoicePool;
use crate::synth::voice::NO_NOTE;

/// Musical length of one sequencer step.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepLength {
    #[default]
    Eighth,
    Quarter,
    Half,
    Whole,
}

impl StepLength {
    pub fn steps_per_measure(self) -> usize {
        match self {
            StepLength::Eighth => 8,
            StepLength::Quarter => 4,
            StepLength::Half => 2,
            StepLength::Whole => 1,
        }
    }

    /// Step duration as a multiple of one beat at the sequencer tempo.
    pub fn duration_multiplier(self) -> f32 {
        match self {
            StepLength::Eighth => 0.5,
            StepLength::Quarter => 1.0,
            StepLength::Half => 2.0,
            StepLength::Whole => 4.0,
        }
    }
}

/// One slot in the step table.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy)]
pub struct SequencerStep {
    pub midi_note: u8,
    pub active: bool,
}

/// The seed line for fresh steps: an ascending C-major octave.
const DEFAULT_SCALE: [u8; 8] = [60, 62, 64, 65, 67, 69, 71, 72];

const MIN_BPM: f32 = 20.0;
const MAX_MEASURES: usize = 16;
/// Upper bound on the step table; reserves capacity so edits on the audio
/// thread never allocate.
const MAX_STEPS: usize = MAX_MEASURES * 8;

/// Notes are held for this fraction of each step.
const GATE_FRACTION: f32 = 0.9;

/*
The sequencer shares the arpeggiator's timebase shape: a sample counter per
render buffer, a step duration derived from tempo, and a gate that releases
the note 90% of the way through the step. Unlike the arpeggiator it walks a
user-editable table instead of the held keys, and inactive steps are rests.
*/
#[derive(Debug)]
pub struct StepSequencer {
    enabled: bool,
    bpm: f32,
    step_length: StepLength,
    measures: usize,
    steps: Vec<SequencerStep>,

    counter: f32,
    current_step: usize,
    active_note: i32,
    note_active: bool,
    step_started: bool,
}

impl StepSequencer {
    pub fn new() -> Self {
        let mut sequencer = Self {
            enabled: false,
            bpm: 120.0,
            step_length: StepLength::default(),
            measures: 1,
            steps: Vec::with_capacity(MAX_STEPS),
            counter: 0.0,
            current_step: 0,
            active_note: NO_NOTE,
            note_active: false,
            step_started: false,
        };
        sequencer.reseed_table();
        sequencer
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool, pool: &mut VoicePool) {
        if enabled == self.enabled {
            return;
        }
        if !enabled && self.note_active {
            pool.note_off(self.active_note);
        }
        self.counter = 0.0;
        self.current_step = 0;
        self.active_note = NO_NOTE;
        self.note_active = false;
        self.step_started = false;
        self.enabled = enabled;
    }

    pub fn set_tempo(&mut self, bpm: f32) {
        self.bpm = bpm.max(MIN_BPM);
    }

    pub fn set_step_length(&mut self, step_length: StepLength) {
        if step_length != self.step_length {
            self.step_length = step_length;
            self.reseed_table();
        }
    }

    pub fn set_measures(&mut self, measures: usize) {
        let measures = measures.clamp(1, MAX_MEASURES);
        if measures != self.measures {
            self.measures = measures;
            self.reseed_table();
        }
    }

    /// Write one step. Out-of-range indices are ignored.
    pub fn set_step(&mut self, index: usize, midi_note: u8, active: bool) {
        if let Some(step) = self.steps.get_mut(index) {
            step.midi_note = midi_note.min(127);
            step.active = active;
        }
    }

    pub fn steps(&self) -> &[SequencerStep] {
        &self.steps
    }

    /// Resize the table to `measures × steps_per_measure`, preserving the
    /// overlapping prefix and seeding new trailing steps from the default
    /// scale. Stays within the pre-reserved capacity.
    fn reseed_table(&mut self) {
        let len = self.measures * self.step_length.steps_per_measure();
        let old_len = self.steps.len();
        if len < old_len {
            self.steps.truncate(len);
        } else {
            for i in old_len..len {
                self.steps.push(SequencerStep {
                    midi_note: DEFAULT_SCALE[i % DEFAULT_SCALE.len()],
                    active: true,
                });
            }
        }
    }

    /// Advance the timebase by one render buffer, emitting note events into
    /// the pool.
    pub fn advance(
        &mut self,
        frames: usize,
        sample_rate: f32,
        pool: &mut VoicePool,
        params: &VoiceParams,
    ) {
        if !self.enabled || self.steps.is_empty() {
            return;
        }

        self.counter += frames as f32;

        let step_samples =
            (60.0 / self.bpm) * self.step_length.duration_multiplier() * sample_rate;
        let gate_samples = step_samples * GATE_FRACTION;

        if !self.step_started {
            let step = self.steps[self.current_step % self.steps.len()];
            if step.active {
                let note = i32::from(step.midi_note);
                pool.note_on(note, params);
                self.active_note = note;
                self.note_active = true;
            }
            self.step_started = true;
        }

        if self.note_active && self.counter >= gate_samples {
            pool.note_off(self.active_note);
            self.note_active = false;
        }

        if self.counter >= step_samples {
            if self.note_active {
                pool.note_off(self.active_note);
                self.note_active = false;
            }
            self.counter -= step_samples;
            self.current_step = (self.current_step + 1) % self.steps.len();
            self.step_started = false;
        }
    }
}

impl Default for StepSequencer {
    fn default() -> Self {
        Self::new()
    }
}
