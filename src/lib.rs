//! polysub - real-time polyphonic subtractive synthesizer engine.
//!
//! The engine renders mono f32 frames on demand from a high-priority audio
//! callback and accepts control events (notes, parameter changes, sequencer
//! edits) from a UI thread through a wait-free SPSC queue. All audio-path
//! state is owned by the audio thread; the [`engine::ControlBridge`] is the
//! only handle the control thread ever touches.
//!
//! ```no_run
//! use polysub::engine::Engine;
//!
//! let (mut engine, mut controls) = Engine::with_bridge(48_000.0);
//! controls.note_on(60);
//!
//! // Inside the audio callback:
//! let mut buffer = vec![0.0f32; 480];
//! engine.render(&mut buffer);
//! ```

pub mod dsp;
pub mod effects;
pub mod engine;
pub mod synth;

/// Fixed polyphony of the voice pool.
pub const MAX_VOICES: usize = 8;

pub use dsp::oscillator::Waveform;
pub use engine::{ArpPattern, ArpSubdivision, ControlBridge, Engine, StepLength};
pub use synth::message::ControlMessage;
