//! Low-level DSP primitives embedded in voices and the engine.
//!
//! Everything here is allocation-free and realtime-safe: plain structs with
//! per-sample `process` methods, no heap, no locks. Orchestration (voice
//! allocation, sequencing, the effects chain) lives in the layers above.

/// Attack/decay/sustain/release envelope generator.
pub mod envelope;
/// State-variable low-pass filter with modulated cutoff.
pub mod filter;
/// Sinusoidal control-rate modulator.
pub mod lfo;
/// Oscillator waveforms and the phase accumulator.
pub mod oscillator;

pub use envelope::{AdsrEnvelope, EnvelopeState};
pub use filter::SvFilter;
pub use lfo::Lfo;
pub use oscillator::{Oscillator, Waveform};
