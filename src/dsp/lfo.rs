use std::f32::consts::TAU;

/// Sinusoidal low-frequency oscillator for cutoff modulation.
///
/// Output is bipolar and half-scaled: `sin(2π·phase) · amount · 0.5`. The
/// half scaling keeps a full-amount sweep inside the additive range of the
/// normalized 0..1 cutoff it modulates.
#[derive(Debug, Clone)]
pub struct Lfo {
    /// Normalized phase in [0, 1).
    phase: f32,
    /// Rate in Hz.
    rate: f32,
    /// Modulation amount, 0..1.
    amount: f32,
}

const MIN_RATE_HZ: f32 = 0.1;

impl Lfo {
    pub fn new() -> Self {
        Self {
            phase: 0.0,
            rate: 2.0,
            amount: 0.0,
        }
    }

    pub fn set_rate(&mut self, rate: f32) {
        self.rate = rate.max(MIN_RATE_HZ);
    }

    pub fn set_amount(&mut self, amount: f32) {
        self.amount = amount.clamp(0.0, 1.0);
    }

    /// Advance one sample and return the bipolar modulation value.
    pub fn process(&mut self, sample_rate: f32) -> f32 {
        let output = (TAU * self.phase).sin() * self.amount * 0.5;
        self.phase += self.rate / sample_rate;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        output
    }
}

impl Default for Lfo {
    fn default() -> Self {
        Self::new()
    }
}
