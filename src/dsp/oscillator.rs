#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/*
Oscillator
==========

A phase accumulator in normalized phase t ∈ [0, 1) plus four analytic
waveform shapes evaluated directly at t:

  Sine      sin(2πt)
  Sawtooth  2t − 1
  Square    t < 0.5 ? +1 : −1
  Triangle  t < 0.5 ? 4t − 1 : 3 − 4t

Phase advances by frequency/sample_rate each sample and wraps at 1. The
shapes are not band-limited; aliasing above Nyquist is accepted for this
engine (the low-pass filter sits right behind the oscillator).
*/

/// The shape of the waveform. Selects the oscillator's timbre.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    Sine,
    #[default]
    Sawtooth,
    Square,
    Triangle,
}

#[derive(Debug, Clone)]
pub struct Oscillator {
    /// Normalized phase in [0, 1).
    phase: f32,
    waveform: Waveform,
}

impl Oscillator {
    pub fn new(waveform: Waveform) -> Self {
        Self {
            phase: 0.0,
            waveform,
        }
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Restart the cycle. Done on note changes, never mid-note.
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    /// Emit the waveform value at the current phase, then advance.
    /// Output is in [-1, 1].
    pub fn next_sample(&mut self, frequency: f32, sample_rate: f32) -> f32 {
        let t = self.phase;
        let sample = match self.waveform {
            Waveform::Sine => (TAU * t).sin(),
            Waveform::Sawtooth => 2.0 * t - 1.0,
            Waveform::Square => {
                if t < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Triangle => {
                if t < 0.5 {
                    4.0 * t - 1.0
                } else {
                    3.0 - 4.0 * t
                }
            }
        };

        self.phase += frequency / sample_rate;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }

        sample
    }

    #[cfg(test)]
    pub(crate) fn phase(&self) -> f32 {
        self.phase
    }
}
