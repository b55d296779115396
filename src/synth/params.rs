use crate::dsp::oscillator::Waveform;

/// ADSR times in seconds plus the sustain level.
#[derive(Debug, Clone, Copy)]
pub struct AdsrParams {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl Default for AdsrParams {
    fn default() -> Self {
        Self {
            attack: 0.01,
            decay: 0.1,
            sustain: 0.7,
            release: 0.3,
        }
    }
}

/// The engine's cached instrument settings, applied to a voice on every
/// (re)trigger and pushed to all sounding voices when a setter arrives.
///
/// `waveform` is the exception: it is read at note-on only, so changing it
/// never warps a note that is already sounding.
#[derive(Debug, Clone, Copy)]
pub struct VoiceParams {
    pub amp: AdsrParams,
    pub filter_env: AdsrParams,
    /// Normalized filter cutoff, 0..1.
    pub cutoff: f32,
    /// Normalized filter resonance, 0..1.
    pub resonance: f32,
    /// How hard the filter envelope drives the cutoff, 0..1.
    pub filter_env_amount: f32,
    pub waveform: Waveform,
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self {
            amp: AdsrParams::default(),
            filter_env: AdsrParams::default(),
            cutoff: 1.0,
            resonance: 0.0,
            filter_env_amount: 0.0,
            waveform: Waveform::default(),
        }
    }
}
