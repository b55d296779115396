use crate::MAX_VOICES;

use super::params::VoiceParams;
use super::voice::{Voice, NO_NOTE};

/// Fixed-size voice arena. Voices are addressed by stable index; nothing in
/// the engine holds a pointer to a voice.
///
/// Allocation order for a new note:
///   1. a voice already carrying the same note (retrigger),
///   2. a fully idle slot,
///   3. a slot that is no longer producing audio,
///   4. steal the quietest voice.
#[derive(Debug)]
pub struct VoicePool {
    voices: [Voice; MAX_VOICES],
}

impl VoicePool {
    pub fn new() -> Self {
        Self {
            voices: std::array::from_fn(|_| Voice::new()),
        }
    }

    pub fn note_on(&mut self, midi_note: i32, params: &VoiceParams) {
        let index = self
            .voices
            .iter()
            .position(|v| v.midi_note() == midi_note)
            .or_else(|| self.voices.iter().position(|v| v.midi_note() == NO_NOTE))
            .or_else(|| self.voices.iter().position(|v| !v.is_producing_audio()))
            .unwrap_or_else(|| self.quietest_voice());

        let voice = &mut self.voices[index];
        voice.apply_params(params);
        voice.note_on(midi_note, params.waveform);
    }

    /// Release the voice carrying `midi_note`. Notes that were stolen or
    /// already reclaimed are silently ignored.
    pub fn note_off(&mut self, midi_note: i32) {
        if let Some(voice) = self
            .voices
            .iter_mut()
            .find(|v| v.midi_note() == midi_note)
        {
            voice.note_off();
        }
    }

    /// Release every sounding voice (engine shutdown, all-notes-off).
    pub fn release_all(&mut self) {
        for voice in &mut self.voices {
            if voice.is_note_active() {
                voice.note_off();
            }
        }
    }

    /// Re-apply the cached parameters to every voice so envelope and filter
    /// changes reach notes that are already sounding.
    pub fn apply_params(&mut self, params: &VoiceParams) {
        for voice in &mut self.voices {
            voice.apply_params(params);
        }
    }

    /// Mix one frame from all voices. Returns the raw sum and the number of
    /// audibly active voices (for polyphony gain).
    pub fn render_frame(&mut self, sample_rate: f32, lfo: f32) -> (f32, usize) {
        let mut sum = 0.0;
        let mut active = 0;
        for voice in &mut self.voices {
            if voice.is_note_active() {
                active += 1;
            }
            sum += voice.process(sample_rate, lfo);
        }
        (sum, active)
    }

    pub fn any_producing_audio(&self) -> bool {
        self.voices.iter().any(Voice::is_producing_audio)
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    fn quietest_voice(&self) -> usize {
        // Last-resort steal: the minimum envelope level, held or not. The
        // pool is never empty, so there is always a slot to take.
        self.voices
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.amp_level().total_cmp(&b.1.amp_level()))
            .map(|(index, _)| index)
            .unwrap_or(0)
    }
}

impl Default for VoicePool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48_000.0;

    fn params() -> VoiceParams {
        VoiceParams::default()
    }

    fn active_notes(pool: &VoicePool) -> Vec<i32> {
        pool.voices()
            .iter()
            .filter(|v| v.is_note_active())
            .map(|v| v.midi_note())
            .collect()
    }

    #[test]
    fn allocates_distinct_voices_for_a_chord() {
        let mut pool = VoicePool::new();
        for note in [60, 64, 67] {
            pool.note_on(note, &params());
        }
        let mut notes = active_notes(&pool);
        notes.sort();
        assert_eq!(notes, vec![60, 64, 67]);
    }

    #[test]
    fn same_note_retriggers_in_place() {
        let mut pool = VoicePool::new();
        pool.note_on(60, &params());
        pool.note_on(60, &params());
        assert_eq!(active_notes(&pool), vec![60]);
    }

    #[test]
    fn note_off_releases_only_the_matching_voice() {
        let mut pool = VoicePool::new();
        pool.note_on(60, &params());
        pool.note_on(64, &params());
        pool.note_off(60);

        let held: Vec<i32> = pool
            .voices()
            .iter()
            .filter(|v| v.key_held())
            .map(|v| v.midi_note())
            .collect();
        assert_eq!(held, vec![64]);
    }

    #[test]
    fn note_off_for_unknown_note_is_ignored() {
        let mut pool = VoicePool::new();
        pool.note_on(60, &params());
        pool.note_off(99);
        assert_eq!(active_notes(&pool), vec![60]);
    }

    #[test]
    fn overflow_steals_a_voice_instead_of_dropping_the_note() {
        let mut pool = VoicePool::new();
        for note in 0..MAX_VOICES as i32 {
            pool.note_on(40 + note, &params());
        }
        // Pool is full of held notes; the ninth note must still sound.
        pool.note_on(90, &params());
        assert!(
            active_notes(&pool).contains(&90),
            "stolen slot should carry the new note"
        );
        assert_eq!(
            pool.voices().iter().filter(|v| v.midi_note() == 90).count(),
            1
        );
    }

    #[test]
    fn stealing_takes_the_minimum_level_voice() {
        let mut pool = VoicePool::new();
        for note in 0..MAX_VOICES as i32 {
            pool.note_on(40 + note, &params());
        }
        // Let envelopes rise, then release one note and let it fade below
        // the held voices' sustain level.
        for _ in 0..4800 {
            pool.render_frame(SAMPLE_RATE, 0.0);
        }
        pool.note_off(43);
        for _ in 0..(0.25 * SAMPLE_RATE) as usize {
            pool.render_frame(SAMPLE_RATE, 0.0);
        }

        pool.note_on(95, &params());
        assert!(active_notes(&pool).contains(&95));
        // The fading release was the quietest slot; the held notes survive.
        for note in [40, 41, 42, 44, 45, 46, 47] {
            assert!(
                pool.voices().iter().any(|v| v.midi_note() == note),
                "held note {note} was stolen"
            );
        }
    }

    #[test]
    fn stealing_takes_a_held_voice_when_it_is_the_quietest() {
        let mut pool = VoicePool::new();
        for note in 0..7 {
            pool.note_on(40 + note, &params());
        }
        // Seven voices settle at sustain; the eighth is freshly keyed and
        // still at the very bottom of its attack.
        for _ in 0..4800 {
            pool.render_frame(SAMPLE_RATE, 0.0);
        }
        pool.note_on(47, &params());

        pool.note_on(95, &params());
        assert!(active_notes(&pool).contains(&95));
        assert!(
            !pool.voices().iter().any(|v| v.midi_note() == 47),
            "the quietest voice was held, but must still be the one stolen"
        );
        for note in 40..47 {
            assert!(
                pool.voices().iter().any(|v| v.midi_note() == note),
                "sustaining note {note} was stolen instead of the quietest"
            );
        }
    }

    #[test]
    fn release_all_silences_the_pool() {
        let mut pool = VoicePool::new();
        for note in [60, 64, 67] {
            pool.note_on(note, &params());
        }
        for _ in 0..2400 {
            pool.render_frame(SAMPLE_RATE, 0.0);
        }
        pool.release_all();

        for _ in 0..(0.4 * SAMPLE_RATE) as usize {
            pool.render_frame(SAMPLE_RATE, 0.0);
        }
        assert!(!pool.any_producing_audio());
        let (sum, active) = pool.render_frame(SAMPLE_RATE, 0.0);
        assert_eq!(sum, 0.0);
        assert_eq!(active, 0);
    }
}
