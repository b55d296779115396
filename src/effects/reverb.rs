/*
Schroeder Reverb
================

Input ──┬──→ [Comb 1] ──┐
        ├──→ [Comb 2] ──┤
        ├──→ [Comb 3] ──┼──→ (+)/4 ──→ [Allpass 1] ──→ [Allpass 2] ──→ wet
        └──→ [Comb 4] ──┘

Four parallel feedback combs build the echo density; a one-pole low-pass in
each feedback path absorbs highs the way walls do. Two short series
all-passes smear the comb output into a diffuse tail without coloring it.
The comb delays are mutually prime so their echoes never pile up on a common
period.

Control mapping:

  damp     = 0.2 + 0.75 · damping
  feedback = 0.7 · (0.3 + 0.7 · size)
*/

/// Comb delays in seconds. Mutually prime lengths at any sample rate.
const COMB_TUNINGS: [f32; 4] = [0.0297, 0.0371, 0.0411, 0.0437];
/// Allpass delays in seconds.
const ALLPASS_TUNINGS: [f32; 2] = [0.005, 0.0017];

/// Diffusion gain of the series all-passes.
const ALLPASS_GAIN: f32 = 0.5;

const DENORMAL_FLOOR: f32 = 1e-15;

/// Feedback comb with a damped (one-pole low-passed) feedback path.
#[derive(Debug)]
struct CombFilter {
    buffer: Vec<f32>,
    index: usize,
    filter_store: f32,
    feedback: f32,
    damp: f32,
}

impl CombFilter {
    fn new(delay_samples: usize) -> Self {
        Self {
            buffer: vec![0.0; delay_samples.max(1)],
            index: 0,
            filter_store: 0.0,
            feedback: 0.5,
            damp: 0.5,
        }
    }

    fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.index];

        self.filter_store = delayed * (1.0 - self.damp) + self.filter_store * self.damp;
        if self.filter_store.abs() < DENORMAL_FLOOR {
            self.filter_store = 0.0;
        }

        self.buffer[self.index] = input + self.filter_store * self.feedback;
        self.index = (self.index + 1) % self.buffer.len();

        delayed
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.filter_store = 0.0;
        self.index = 0;
    }
}

/// Unit-gain all-pass diffuser.
#[derive(Debug)]
struct AllpassFilter {
    buffer: Vec<f32>,
    index: usize,
}

impl AllpassFilter {
    fn new(delay_samples: usize) -> Self {
        Self {
            buffer: vec![0.0; delay_samples.max(1)],
            index: 0,
        }
    }

    fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.index];
        let output = -input + delayed;

        self.buffer[self.index] = input + delayed * ALLPASS_GAIN;
        self.index = (self.index + 1) % self.buffer.len();

        output
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.index = 0;
    }
}

/// Schroeder reverb: 4 parallel damped combs into 2 series all-passes.
#[derive(Debug)]
pub struct Reverb {
    combs: [CombFilter; 4],
    allpasses: [AllpassFilter; 2],

    enabled: bool,
    size: f32,
    damping: f32,
    mix: f32,
}

impl Reverb {
    pub fn new(sample_rate: f32) -> Self {
        let mut reverb = Self {
            combs: COMB_TUNINGS.map(|secs| CombFilter::new((secs * sample_rate) as usize)),
            allpasses: ALLPASS_TUNINGS.map(|secs| AllpassFilter::new((secs * sample_rate) as usize)),
            enabled: false,
            size: 0.5,
            damping: 0.5,
            mix: 0.3,
        };
        reverb.update_comb_coefficients();
        reverb
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled && !self.enabled {
            for comb in &mut self.combs {
                comb.clear();
            }
            for allpass in &mut self.allpasses {
                allpass.clear();
            }
        }
        self.enabled = enabled;
    }

    pub fn set_size(&mut self, size: f32) {
        self.size = size.clamp(0.0, 1.0);
        self.update_comb_coefficients();
    }

    pub fn set_damping(&mut self, damping: f32) {
        self.damping = damping.clamp(0.0, 1.0);
        self.update_comb_coefficients();
    }

    pub fn set_mix(&mut self, mix: f32) {
        self.mix = mix.clamp(0.0, 1.0);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn update_comb_coefficients(&mut self) {
        let damp = 0.2 + 0.75 * self.damping;
        let feedback = 0.7 * (0.3 + 0.7 * self.size);
        for comb in &mut self.combs {
            comb.damp = damp;
            comb.feedback = feedback;
        }
    }

    pub fn process(&mut self, input: f32) -> f32 {
        if !self.enabled {
            return input;
        }

        let mut sum = 0.0;
        for comb in &mut self.combs {
            sum += comb.process(input);
        }
        let mut wet = sum * 0.25;

        for allpass in &mut self.allpasses {
            wet = allpass.process(wet);
        }

        input * (1.0 - self.mix) + wet * self.mix
    }
}
