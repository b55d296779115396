//! Voice management: the per-note signal chain and the fixed pool that
//! allocates it.

pub mod message;
pub mod params;
pub mod pool;
pub mod voice;

pub use message::ControlMessage;
pub use params::{AdsrParams, VoiceParams};
pub use pool::VoicePool;
pub use voice::Voice;
