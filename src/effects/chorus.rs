use std::f32::consts::TAU;

use super::RING_SECONDS;

/*
Chorus
======

Two delay taps swept by quadrature LFOs (phases offset by a quarter cycle)
around a 12 ms center:

  delay_ms(i) = 12 + 8 · depth · sin(2π·φ_i)

Because the tap position moves continuously, reading on whole-sample
boundaries would zipper; each tap linearly interpolates between the two
neighboring samples instead. The wet signal is the mean of the two taps,
blended against the dry input by `mix`.
*/

const BASE_DELAY_MS: f32 = 12.0;
const SWEEP_MS: f32 = 8.0;

#[derive(Debug)]
pub struct Chorus {
    buffer: Vec<f32>,
    write_pos: usize,
    sample_rate: f32,

    phase1: f32,
    phase2: f32,

    enabled: bool,
    /// LFO rate in Hz.
    rate: f32,
    depth: f32,
    mix: f32,
}

impl Chorus {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            buffer: vec![0.0; (RING_SECONDS * sample_rate) as usize],
            write_pos: 0,
            sample_rate,
            phase1: 0.0,
            phase2: 0.25,
            enabled: false,
            rate: 0.8,
            depth: 0.5,
            mix: 0.4,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled && !self.enabled {
            self.buffer.fill(0.0);
        }
        self.enabled = enabled;
    }

    pub fn set_rate(&mut self, rate: f32) {
        self.rate = rate.clamp(0.1, 10.0);
    }

    pub fn set_depth(&mut self, depth: f32) {
        self.depth = depth.clamp(0.0, 1.0);
    }

    pub fn set_mix(&mut self, mix: f32) {
        self.mix = mix.clamp(0.0, 1.0);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn process(&mut self, input: f32) -> f32 {
        if !self.enabled || self.buffer.is_empty() {
            return input;
        }

        let tap1 = self.read_tap(self.phase1);
        let tap2 = self.read_tap(self.phase2);
        let wet = 0.5 * (tap1 + tap2);

        let len = self.buffer.len();
        self.buffer[self.write_pos] = input;
        self.write_pos = (self.write_pos + 1) % len;

        let phase_inc = self.rate / self.sample_rate;
        self.phase1 = wrap_phase(self.phase1 + phase_inc);
        self.phase2 = wrap_phase(self.phase2 + phase_inc);

        input * (1.0 - self.mix) + wet * self.mix
    }

    /// Fractional-delay read for one modulated tap.
    fn read_tap(&self, phase: f32) -> f32 {
        let len = self.buffer.len();
        let modulation = (TAU * phase).sin();
        let delay_ms = BASE_DELAY_MS + SWEEP_MS * self.depth * modulation;
        let delay_samples = delay_ms * self.sample_rate / 1000.0;

        let mut pos = self.write_pos as f32 - delay_samples;
        if pos < 0.0 {
            pos += len as f32;
        }
        let index = pos as usize % len;
        let frac = pos - pos.floor();
        let next = (index + 1) % len;

        self.buffer[index] * (1.0 - frac) + self.buffer[next] * frac
    }
}

#[inline]
fn wrap_phase(phase: f32) -> f32 {
    if phase >= 1.0 {
        phase - 1.0
    } else {
        phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48_000.0;

    #[test]
    fn disabled_chorus_is_exact_bypass() {
        let mut chorus = Chorus::new(SAMPLE_RATE);
        for i in 0..256 {
            let x = (i as f32 * 0.21).sin();
            assert_eq!(chorus.process(x), x);
        }
    }

    #[test]
    fn wet_signal_appears_after_base_delay() {
        let mut chorus = Chorus::new(SAMPLE_RATE);
        chorus.set_enabled(true);
        chorus.set_depth(0.0); // fixed 12 ms taps
        chorus.set_mix(1.0);

        chorus.process(1.0);
        let mut nonzero_at = None;
        for i in 1..2048 {
            if chorus.process(0.0).abs() > 1e-6 {
                nonzero_at = Some(i);
                break;
            }
        }
        // 12 ms at 48 kHz = 576 samples.
        let at = nonzero_at.expect("the impulse never came back");
        assert!(
            (575..=577).contains(&at),
            "echo expected near 576 samples, got {at}"
        );
    }

    #[test]
    fn output_stays_bounded_for_full_scale_input() {
        let mut chorus = Chorus::new(SAMPLE_RATE);
        chorus.set_enabled(true);
        chorus.set_rate(5.0);
        chorus.set_depth(1.0);
        chorus.set_mix(0.5);

        for i in 0..8192 {
            let x = (TAU * 440.0 * i as f32 / SAMPLE_RATE).sin();
            let y = chorus.process(x);
            assert!(y.abs() <= 1.0 + 1e-6, "chorus output escaped: {y}");
        }
    }

    #[test]
    fn modulated_taps_detune_the_signal() {
        // With depth up, the two taps sweep; the output of a pure tone stops
        // being a pure copy. Compare against a depth-zero render.
        let render = |depth: f32| {
            let mut chorus = Chorus::new(SAMPLE_RATE);
            chorus.set_enabled(true);
            chorus.set_rate(2.0);
            chorus.set_depth(depth);
            chorus.set_mix(1.0);
            let mut out = Vec::with_capacity(4096);
            for i in 0..4096 {
                let x = (TAU * 440.0 * i as f32 / SAMPLE_RATE).sin();
                out.push(chorus.process(x));
            }
            out
        };

        let still = render(0.0);
        let swept = render(1.0);
        let difference: f32 = still
            .iter()
            .zip(&swept)
            .skip(1024)
            .map(|(a, b)| (a - b).abs())
            .sum();
        assert!(difference > 1.0, "depth had no audible effect: {difference}");
    }
}
