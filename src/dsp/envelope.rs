/*
ADSR Envelope with Click-Free Retrigger
=======================================

Level
  1.0 ┐     ╱╲________
      │    ╱  ╲       ╲
  0.7 │   ╱    ╲_______╲___
      │  ╱              ╲  ╲
  0.0 └─╱────────────────╲──╲─→ Time
      Attack Decay Sustain Release

Each phase interpolates linearly over its configured time. The twist over a
textbook ADSR is the two memo fields:

  attack_start_level   Captured at note_on. A retriggered note ramps from
                       wherever the envelope currently sits instead of
                       snapping to zero - snapping is an audible click.

  release_start_level  Captured at note_off. Release ramps from the actual
                       level at key-up, not from the sustain setting, so a
                       note released mid-attack fades from its true level.

Time is phase-local: it resets to zero on every phase transition, which keeps
the interpolation formulas trivial and lets a watchdog catch any transient
phase that overstays (ill-posed parameters can otherwise park the envelope
forever).
*/

/// Shortest permitted attack/decay, 0.1 ms.
pub const MIN_ATTACK_SECS: f32 = 0.0001;
pub const MIN_DECAY_SECS: f32 = 0.0001;
/// Shortest permitted release, 5 ms. Anything faster clicks.
pub const MIN_RELEASE_SECS: f32 = 0.005;

/// Transient phases (attack, decay, release) are forced to Idle after this
/// long. Protects the voice pool from parameters that never converge.
const STUCK_PHASE_SECS: f32 = 10.0;

/// Release exits early once the level is inaudible.
const RELEASE_FLOOR: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeState {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

#[derive(Debug, Clone)]
pub struct AdsrEnvelope {
    attack: f32,
    decay: f32,
    sustain: f32,
    release: f32,

    state: EnvelopeState,
    level: f32,
    /// Seconds spent in the current phase.
    time: f32,
    attack_start_level: f32,
    release_start_level: f32,
}

impl AdsrEnvelope {
    pub fn new() -> Self {
        Self {
            attack: 0.01,
            decay: 0.1,
            sustain: 0.7,
            release: 0.3,
            state: EnvelopeState::Idle,
            level: 0.0,
            time: 0.0,
            attack_start_level: 0.0,
            release_start_level: 0.0,
        }
    }

    pub fn set_attack(&mut self, attack: f32) {
        self.attack = attack.max(MIN_ATTACK_SECS);
    }

    pub fn set_decay(&mut self, decay: f32) {
        self.decay = decay.max(MIN_DECAY_SECS);
    }

    pub fn set_sustain(&mut self, sustain: f32) {
        self.sustain = sustain.clamp(0.0, 1.0);
    }

    pub fn set_release(&mut self, release: f32) {
        self.release = release.max(MIN_RELEASE_SECS);
    }

    /// Begin (or retrigger) the attack phase from the current level.
    pub fn note_on(&mut self) {
        self.attack_start_level = self.level;
        self.state = EnvelopeState::Attack;
        self.time = 0.0;
    }

    /// Enter release from the current level. No-op when already idle or
    /// releasing.
    pub fn note_off(&mut self) {
        if !matches!(self.state, EnvelopeState::Idle | EnvelopeState::Release) {
            self.release_start_level = self.level;
            self.state = EnvelopeState::Release;
            self.time = 0.0;
        }
    }

    /// Advance one sample and return the new level in [0, 1].
    pub fn process(&mut self, sample_rate: f32) -> f32 {
        self.time += 1.0 / sample_rate;

        match self.state {
            EnvelopeState::Idle => self.level = 0.0,
            EnvelopeState::Attack => {
                if self.time >= self.attack {
                    self.level = 1.0;
                    self.state = EnvelopeState::Decay;
                    self.time = 0.0;
                } else {
                    let span = 1.0 - self.attack_start_level;
                    self.level = self.attack_start_level + span * (self.time / self.attack);
                }
            }
            EnvelopeState::Decay => {
                if self.time >= self.decay {
                    self.level = self.sustain;
                    self.state = EnvelopeState::Sustain;
                } else {
                    self.level = 1.0 - (1.0 - self.sustain) * (self.time / self.decay);
                }
            }
            EnvelopeState::Sustain => self.level = self.sustain,
            EnvelopeState::Release => {
                self.level = self.release_start_level * (1.0 - self.time / self.release);
                if self.time >= self.release || self.level <= RELEASE_FLOOR {
                    self.level = 0.0;
                    self.state = EnvelopeState::Idle;
                }
            }
        }

        // Watchdog: a transient phase that outlives any sane parameter set
        // is forced back to Idle.
        if !matches!(self.state, EnvelopeState::Sustain | EnvelopeState::Idle)
            && self.time > STUCK_PHASE_SECS
        {
            self.state = EnvelopeState::Idle;
            self.level = 0.0;
        }

        self.level = self.level.clamp(0.0, 1.0);
        self.level
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.state, EnvelopeState::Idle)
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn state(&self) -> EnvelopeState {
        self.state
    }
}

impl Default for AdsrEnvelope {
    fn default() -> Self {
        Self::new()
    }
}
