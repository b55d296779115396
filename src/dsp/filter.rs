use std::f32::consts::PI;

/*
State-Variable Low-Pass Filter
==============================

Chamberlin-topology SVF driven by normalized controls. Both knobs are 0..1
and mapped exponentially onto musically useful ranges:

  cutoff     0..1  →  20 Hz .. 12 kHz      f_hz = 20 · 600^cutoff
  resonance  0..1  →  Q 0.707 .. 12        damping d = 1/Q, clamped

The coefficient is recomputed every sample so the filter-envelope and LFO can
sweep the cutoff without artifacts:

  f  = min(2·sin(π·f_hz / SR), 0.99)
  lp += f·bp
  hp  = input − lp − d·bp
  bp += f·hp

Two guards keep the recurrence safe on the audio thread: subnormal state is
flushed to zero before and after the update (denormal arithmetic is orders of
magnitude slower than normal floats), and every state variable is clamped to
|x| ≤ 10 so high resonance can never run away.
*/

const MIN_CUTOFF_HZ: f32 = 20.0;
const MAX_CUTOFF_HZ: f32 = 12_000.0;

const MIN_Q: f32 = 0.707;
const MAX_Q: f32 = 12.0;

/// Post-update bound on each state variable.
const STATE_LIMIT: f32 = 10.0;
/// Values below this are flushed to zero.
const DENORMAL_FLOOR: f32 = 1e-15;

#[derive(Debug, Clone)]
pub struct SvFilter {
    /// Normalized cutoff, 0..1.
    cutoff: f32,
    /// Normalized resonance, 0..1.
    resonance: f32,

    lowpass: f32,
    bandpass: f32,
    highpass: f32,
}

impl SvFilter {
    pub fn new() -> Self {
        Self {
            cutoff: 1.0,
            resonance: 0.0,
            lowpass: 0.0,
            bandpass: 0.0,
            highpass: 0.0,
        }
    }

    pub fn set_cutoff(&mut self, cutoff: f32) {
        self.cutoff = cutoff.clamp(0.0, 1.0);
    }

    pub fn set_resonance(&mut self, resonance: f32) {
        self.resonance = resonance.clamp(0.0, 1.0);
    }

    /// Filter one sample. `modulation` is added to the normalized cutoff
    /// before mapping (filter envelope plus LFO).
    pub fn process(&mut self, input: f32, sample_rate: f32, modulation: f32) -> f32 {
        let cutoff = (self.cutoff + modulation).clamp(0.0, 1.0);
        let f_hz = MIN_CUTOFF_HZ * (MAX_CUTOFF_HZ / MIN_CUTOFF_HZ).powf(cutoff);
        let f = (2.0 * (PI * f_hz / sample_rate).sin()).min(0.99);

        let q = MIN_Q * (MAX_Q / MIN_Q).powf(self.resonance);
        let damp = (1.0 / q).clamp(0.05, 1.4);

        self.flush_denormals();

        self.lowpass += f * self.bandpass;
        self.highpass = input - self.lowpass - damp * self.bandpass;
        self.bandpass += f * self.highpass;

        self.lowpass = self.lowpass.clamp(-STATE_LIMIT, STATE_LIMIT);
        self.bandpass = self.bandpass.clamp(-STATE_LIMIT, STATE_LIMIT);
        self.highpass = self.highpass.clamp(-STATE_LIMIT, STATE_LIMIT);

        self.flush_denormals();

        self.lowpass
    }

    /// Soft reset: decay the state instead of zeroing it, so retuning a
    /// voice to a new note does not step the filter output.
    pub fn reset(&mut self) {
        self.lowpass *= 0.1;
        self.bandpass *= 0.1;
        self.highpass *= 0.1;
    }

    fn flush_denormals(&mut self) {
        if self.lowpass.abs() < DENORMAL_FLOOR {
            self.lowpass = 0.0;
        }
        if self.bandpass.abs() < DENORMAL_FLOOR {
            self.bandpass = 0.0;
        }
        if self.highpass.abs() < DENORMAL_FLOOR {
            self.highpass = 0.0;
        }
    }

    #[cfg(test)]
    pub(crate) fn states(&self) -> [f32; 3] {
        [self.lowpass, self.bandpass, self.highpass]
    }
}

impl Default for SvFilter {
    fn default() -> Self {
        Self::new()
    }
}
