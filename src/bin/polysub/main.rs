//! polysub - playable engine demo.
//!
//! Opens the default output device, runs the engine in the audio callback,
//! and drives a short keyboard / arpeggiator / sequencer tour from the
//! control thread. Run with: cargo run --bin polysub

use std::thread::sleep;
use std::time::Duration;

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use polysub::engine::Engine;
use polysub::{ArpPattern, Waveform};

/// Largest callback the demo expects; bigger requests are rendered in
/// chunks.
const MAX_BLOCK_SIZE: usize = 4096;

fn main() -> EyreResult<()> {
    color_eyre::install()?;

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| eyre!("no default output device available"))?;
    let config = device
        .default_output_config()
        .wrap_err("failed to fetch default output config")?;

    let sample_rate = config.sample_rate().0 as f32;
    let channels = config.channels() as usize;

    println!("=== polysub ===");
    println!("Sample rate: {} Hz", sample_rate);
    println!("Channels: {}", channels);
    println!();

    let (mut engine, mut controls) = Engine::with_bridge(sample_rate);
    let mut mono = vec![0.0f32; MAX_BLOCK_SIZE];

    let stream = device.build_output_stream(
        &config.into(),
        move |data: &mut [f32], _| {
            let total_frames = data.len() / channels;
            let mut frames_written = 0;

            while frames_written < total_frames {
                let frames = (total_frames - frames_written).min(MAX_BLOCK_SIZE);
                let block = &mut mono[..frames];
                engine.render(block);

                // Mono to all channels.
                let offset = frames_written * channels;
                for (i, &sample) in block.iter().enumerate() {
                    for channel in 0..channels {
                        data[offset + i * channels + channel] = sample;
                    }
                }
                frames_written += frames;
            }
        },
        |err| eprintln!("audio error: {err}"),
        None,
    )?;
    stream.play()?;

    println!("Playing a chord...");
    controls.set_waveform(Waveform::Sawtooth);
    controls.set_filter_cutoff(0.7);
    controls.set_filter_resonance(0.3);
    for note in [60, 64, 67] {
        controls.note_on(note);
    }
    sleep(Duration::from_secs(2));
    for note in [60, 64, 67] {
        controls.note_off(note);
    }
    sleep(Duration::from_millis(500));

    println!("Arpeggiator, up pattern...");
    controls.set_arpeggiator_enabled(true);
    controls.set_arpeggiator_pattern(ArpPattern::Up);
    controls.set_arpeggiator_rate(140.0);
    controls.set_arpeggiator_gate(0.4);
    controls.set_delay_enabled(true);
    controls.set_delay_time(0.25);
    controls.set_delay_feedback(0.35);
    controls.set_delay_mix(0.3);
    for note in [57, 60, 64, 69] {
        controls.note_on(note);
    }
    sleep(Duration::from_secs(4));
    for note in [57, 60, 64, 69] {
        controls.note_off(note);
    }
    controls.set_arpeggiator_enabled(false);
    sleep(Duration::from_millis(500));

    println!("Step sequencer with reverb...");
    controls.set_delay_enabled(false);
    controls.set_reverb_enabled(true);
    controls.set_reverb_size(0.6);
    controls.set_reverb_damping(0.35);
    controls.set_reverb_mix(0.4);
    controls.set_sequencer_enabled(true);
    controls.set_sequencer_tempo(128.0);
    sleep(Duration::from_secs(4));
    controls.set_sequencer_enabled(false);

    println!("Done.");
    controls.all_notes_off();
    sleep(Duration::from_secs(1));

    Ok(())
}
