#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::synth::params::VoiceParams;
use crate::synth::pool::VoicePool;
use crate::synth::voice::NO_NOTE;

/*
Arpeggiator
===========

While enabled, key presses land in an ordered held-note set instead of the
voice pool; the arpeggiator walks that set on a sample-accurate timebase and
emits the note events itself. Emission goes straight into the pool, so there
is no path from an internally generated note back into the held set.

One step:

  |<-------------- step_samples -------------->|
  |<---- gate_samples ---->|
  note_on                  note_off             next index

  step_samples = (60 / BPM) · subdivision · sample_rate
  gate_samples = step_samples · gate
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArpPattern {
    #[default]
    Up,
    Down,
    UpDown,
    Random,
}

/// Musical subdivision of a beat, as a multiplier on the beat duration.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArpSubdivision {
    Half,
    #[default]
    Quarter,
    Eighth,
    Sixteenth,
}

impl ArpSubdivision {
    pub fn multiplier(self) -> f32 {
        match self {
            ArpSubdivision::Half => 2.0,
            ArpSubdivision::Quarter => 1.0,
            ArpSubdivision::Eighth => 0.5,
            ArpSubdivision::Sixteenth => 0.25,
        }
    }
}

/// Xorshift32, seeded at construction so renders are reproducible.
#[derive(Debug)]
struct Xorshift32 {
    state: u32,
}

impl Xorshift32 {
    fn new(seed: u32) -> Self {
        Self {
            state: seed.max(1),
        }
    }

    fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }
}

const ARP_SEED: u32 = 0x9E37_79B9;

const MIN_BPM: f32 = 20.0;
const MIN_GATE: f32 = 0.05;

/// Held notes are capped so key handling never allocates on the audio
/// thread. 128 covers the whole MIDI range.
const HELD_CAPACITY: usize = 128;

#[derive(Debug)]
pub struct Arpeggiator {
    enabled: bool,
    pattern: ArpPattern,
    bpm: f32,
    /// Fraction of the step the note is held, 0.05..1.
    gate: f32,
    subdivision: ArpSubdivision,

    /// Deduplicated, insertion-ordered. Pre-allocated; see HELD_CAPACITY.
    held_notes: Vec<i32>,
    /// Samples elapsed in the current step.
    counter: f32,
    /// Monotonic step count; each pattern reduces it modulo its own cycle.
    step_index: usize,
    current_note: i32,
    note_active: bool,
    step_started: bool,
    rng: Xorshift32,
}

impl Arpeggiator {
    pub fn new() -> Self {
        Self {
            enabled: false,
            pattern: ArpPattern::default(),
            bpm: 120.0,
            gate: 0.5,
            subdivision: ArpSubdivision::default(),
            held_notes: Vec::with_capacity(HELD_CAPACITY),
            counter: 0.0,
            step_index: 0,
            current_note: NO_NOTE,
            note_active: false,
            step_started: false,
            rng: Xorshift32::new(ARP_SEED),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool, pool: &mut VoicePool) {
        if enabled == self.enabled {
            return;
        }
        if !enabled && self.note_active {
            pool.note_off(self.current_note);
        }
        self.reset_run_state();
        self.held_notes.clear();
        self.enabled = enabled;
    }

    pub fn set_pattern(&mut self, pattern: ArpPattern) {
        self.pattern = pattern;
    }

    pub fn set_bpm(&mut self, bpm: f32) {
        self.bpm = bpm.max(MIN_BPM);
    }

    pub fn set_gate(&mut self, gate: f32) {
        self.gate = gate.clamp(MIN_GATE, 1.0);
    }

    pub fn set_subdivision(&mut self, subdivision: ArpSubdivision) {
        self.subdivision = subdivision;
    }

    /// Capture a key press into the held set. Duplicates are ignored; the
    /// set keeps insertion order.
    pub fn key_on(&mut self, note: i32) {
        if !self.held_notes.contains(&note) && self.held_notes.len() < HELD_CAPACITY {
            self.held_notes.push(note);
        }
    }

    pub fn key_off(&mut self, note: i32) {
        if let Some(index) = self.held_notes.iter().position(|&n| n == note) {
            self.held_notes.remove(index);
        }
    }

    /// Drop every held key. The next `advance` releases whatever is still
    /// sounding and parks the run state.
    pub fn clear_held(&mut self) {
        self.held_notes.clear();
    }

    pub fn held_notes(&self) -> &[i32] {
        &self.held_notes
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
        if !self.enabled {
            return;
        }

        let note_count = self.held_notes.len();
        if note_count == 0 {
            if self.note_active {
                pool.note_off(self.current_note);
                self.note_active = false;
                self.current_note = NO_NOTE;
            }
            // Idle until the next key press starts a fresh run.
            self.counter = 0.0;
            self.step_index = 0;
            self.step_started = false;
            return;
        }

        self.counter += frames as f32;

        let step_samples = (60.0 / self.bpm) * self.subdivision.multiplier() * sample_rate;
        let gate_samples = step_samples * self.gate;

        if !self.step_started {
            let pick = self.pattern_index(note_count);
            let note = self.held_notes[pick];
            if self.note_active {
                pool.note_off(self.current_note);
            }
            pool.note_on(note, params);
            self.current_note = note;
            self.note_active = true;
            self.step_started = true;
        }

        if self.note_active && self.counter >= gate_samples {
            pool.note_off(self.current_note);
            self.note_active = false;
        }

        if self.counter >= step_samples {
            if self.note_active {
                pool.note_off(self.current_note);
                self.note_active = false;
            }
            self.counter -= step_samples;
            self.step_index = self.step_index.wrapping_add(1);
            self.step_started = false;
        }
    }

    fn pattern_index(&mut self, note_count: usize) -> usize {
        match self.pattern {
            ArpPattern::Up => self.step_index % note_count,
            ArpPattern::Down => note_count - 1 - (self.step_index % note_count),
            ArpPattern::UpDown => {
                if note_count == 1 {
                    0
                } else {
                    let cycle = 2 * note_count - 2;
                    let position = self.step_index % cycle;
                    if position < note_count {
                        position
                    } else {
                        cycle - position
                    }
                }
            }
            ArpPattern::Random => self.rng.next_u32() as usize % note_count,
        }
    }

    fn reset_run_state(&mut self) {
        self.counter = 0.0;
        self.step_index = 0;
        self.current_note = NO_NOTE;
        self.note_active = false;
        self.step_started = false;
    }
}

impl Default for Arpeggiator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48_000.0;
    const BUFFER: usize = 480;

    fn enabled_arp(pool: &mut VoicePool) -> Arpeggiator {
        let mut arp = Arpeggiator::new();
        arp.set_enabled(true, pool);
        arp
    }

    /// Drive the arp buffer by buffer, recording each newly started note.
    fn collect_steps(
        arp: &mut Arpeggiator,
        pool: &mut VoicePool,
        buffers: usize,
    ) -> Vec<i32> {
        let params = VoiceParams::default();
        let mut steps = Vec::new();
        for _ in 0..buffers {
            let started_before = arp.step_started;
            arp.advance(BUFFER, SAMPLE_RATE, pool, &params);
            if !started_before && arp.step_started {
                steps.push(arp.current_note);
            }
            pool.render_frame(SAMPLE_RATE, 0.0);
        }
        steps
    }

    #[test]
    fn held_set_deduplicates_and_keeps_order() {
        let mut pool = VoicePool::new();
        let mut arp = enabled_arp(&mut pool);
        arp.key_on(60);
        arp.key_on(64);
        arp.key_on(60);
        arp.key_on(67);
        assert_eq!(arp.held_notes(), &[60, 64, 67]);

        arp.key_off(64);
        assert_eq!(arp.held_notes(), &[60, 67]);
    }

    #[test]
    fn up_pattern_cycles_in_insertion_order() {
        let mut pool = VoicePool::new();
        let mut arp = enabled_arp(&mut pool);
        for note in [60, 64, 67] {
            arp.key_on(note);
        }
        // 120 BPM quarter steps = 0.5 s = 50 buffers per step.
        let steps = collect_steps(&mut arp, &mut pool, 350);
        assert!(steps.len() >= 6);
        assert_eq!(&steps[..6], &[60, 64, 67, 60, 64, 67]);
    }

    #[test]
    fn down_pattern_walks_backwards() {
        let mut pool = VoicePool::new();
        let mut arp = enabled_arp(&mut pool);
        arp.set_pattern(ArpPattern::Down);
        for note in [60, 64, 67] {
            arp.key_on(note);
        }
        let steps = collect_steps(&mut arp, &mut pool, 350);
        assert_eq!(&steps[..6], &[67, 64, 60, 67, 64, 60]);
    }

    #[test]
    fn updown_pattern_bounces_without_repeating_endpoints() {
        let mut pool = VoicePool::new();
        let mut arp = enabled_arp(&mut pool);
        arp.set_pattern(ArpPattern::UpDown);
        for note in [60, 64, 67] {
            arp.key_on(note);
        }
        let steps = collect_steps(&mut arp, &mut pool, 500);
        // Cycle of 2n-2 = 4: 60 64 67 64 | 60 64 67 64 ...
        assert_eq!(&steps[..8], &[60, 64, 67, 64, 60, 64, 67, 64]);
    }

    #[test]
    fn updown_with_single_note_repeats_it() {
        let mut pool = VoicePool::new();
        let mut arp = enabled_arp(&mut pool);
        arp.set_pattern(ArpPattern::UpDown);
        arp.key_on(72);
        let steps = collect_steps(&mut arp, &mut pool, 200);
        assert!(steps.len() >= 3);
        assert!(steps.iter().all(|&n| n == 72));
    }

    #[test]
    fn random_pattern_only_draws_held_notes() {
        let mut pool = VoicePool::new();
        let mut arp = enabled_arp(&mut pool);
        arp.set_pattern(ArpPattern::Random);
        for note in [60, 63, 66, 69] {
            arp.key_on(note);
        }
        let steps = collect_steps(&mut arp, &mut pool, 800);
        assert!(steps.len() >= 10);
        assert!(steps.iter().all(|n| [60, 63, 66, 69].contains(n)));
    }

    #[test]
    fn gate_releases_the_note_mid_step() {
        let params = VoiceParams::default();
        let mut pool = VoicePool::new();
        let mut arp = enabled_arp(&mut pool);
        arp.set_gate(0.5);
        arp.key_on(60);

        // First buffer starts the step and the note.
        arp.advance(BUFFER, SAMPLE_RATE, &mut pool, &params);
        assert!(arp.note_active);

        // Step is 24000 samples at 120 BPM; gate fires at 12000.
        let buffers_to_gate = 12_000 / BUFFER;
        for _ in 0..buffers_to_gate {
            arp.advance(BUFFER, SAMPLE_RATE, &mut pool, &params);
        }
        assert!(!arp.note_active, "gate should have released the note");
        let held: Vec<i32> = pool
            .voices()
            .iter()
            .filter(|v| v.key_held())
            .map(|v| v.midi_note())
            .collect();
        assert!(held.is_empty(), "voice still held after gate: {held:?}");
    }

    #[test]
    fn releasing_all_keys_silences_and_resets() {
        let params = VoiceParams::default();
        let mut pool = VoicePool::new();
        let mut arp = enabled_arp(&mut pool);
        arp.key_on(60);
        arp.advance(BUFFER, SAMPLE_RATE, &mut pool, &params);
        assert!(arp.note_active);

        arp.key_off(60);
        arp.advance(BUFFER, SAMPLE_RATE, &mut pool, &params);
        assert!(!arp.note_active);
        assert!(!pool.voices().iter().any(|v| v.key_held()));
    }

    #[test]
    fn disable_releases_the_sounding_note() {
        let params = VoiceParams::default();
        let mut pool = VoicePool::new();
        let mut arp = enabled_arp(&mut pool);
        arp.key_on(65);
        arp.advance(BUFFER, SAMPLE_RATE, &mut pool, &params);

        arp.set_enabled(false, &mut pool);
        assert!(arp.held_notes().is_empty());
        assert!(!pool.voices().iter().any(|v| v.key_held()));
    }

    #[test]
    fn one_note_pair_per_step_for_single_held_note() {
        let params = VoiceParams::default();
        let mut pool = VoicePool::new();
        let mut arp = enabled_arp(&mut pool);
        arp.set_gate(0.5);
        arp.key_on(60);

        // Four seconds = 8 quarter steps at 120 BPM.
        let mut note_ons = 0;
        let mut was_active = false;
        for _ in 0..400 {
            arp.advance(BUFFER, SAMPLE_RATE, &mut pool, &params);
            if arp.note_active && !was_active {
                note_ons += 1;
            }
            was_active = arp.note_active;
            pool.render_frame(SAMPLE_RATE, 0.0);
        }
        assert_eq!(note_ons, 8, "expected one note-on per step");
    }
}
