//! Audio engine for real-time MIDI synthesis.
//!
//! Sounds MIDI events with rustysynth and streams the mix through rodio.

use crate::midi::{MidiEvent, MidiEventKind};
use crate::play::MidiOutput;
use anyhow::{Context, Result};
use rodio::{OutputStream, OutputStreamHandle, Source};
use rustysynth::{SoundFont, Synthesizer, SynthesizerSettings};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Sample rate for audio synthesis (44.1 kHz standard).
pub const SAMPLE_RATE: u32 = 44100;

/// Audio buffer size for low-latency playback.
/// Smaller = lower latency but higher CPU usage.
const BUFFER_SIZE: usize = 256;

/// Audio source that generates samples from the synthesizer.
struct SynthSource {
    synth: Arc<Mutex<Synthesizer>>,
    left_buf: Vec<f32>,
    right_buf: Vec<f32>,
    buf_pos: usize,
    /// 0 = left, 1 = right.
    channel: usize,
}

impl SynthSource {
    fn new(synth: Arc<Mutex<Synthesizer>>) -> Self {
        Self {
            synth,
            left_buf: vec![0.0; BUFFER_SIZE],
            right_buf: vec![0.0; BUFFER_SIZE],
            buf_pos: BUFFER_SIZE, // Start at end to trigger first render
            channel: 0,
        }
    }
}

impl Iterator for SynthSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.buf_pos >= BUFFER_SIZE {
            if let Ok(mut synth) = self.synth.lock() {
                synth.render(&mut self.left_buf, &mut self.right_buf);
            } else {
                self.left_buf.fill(0.0);
                self.right_buf.fill(0.0);
            }
            self.buf_pos = 0;
        }

        // Interleave stereo samples: L, R, L, R, ...
        let sample = if self.channel == 0 {
            self.left_buf[self.buf_pos]
        } else {
            self.right_buf[self.buf_pos]
        };

        self.channel = 1 - self.channel;
        if self.channel == 0 {
            self.buf_pos += 1;
        }

        Some(sample)
    }
}

impl Source for SynthSource {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        2
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

/// Encodes an event as the (command, data1, data2) triple rustysynth takes.
fn to_midi_message(event: &MidiEvent) -> (i32, i32, i32) {
    match event.kind {
        MidiEventKind::NoteOn { key, velocity } => (0x90, key as i32, velocity as i32),
        MidiEventKind::NoteOff { key } => (0x80, key as i32, 0),
        MidiEventKind::ProgramChange { program } => (0xC0, program as i32, 0),
        MidiEventKind::Controller { controller, value } => {
            (0xB0, controller as i32, value as i32)
        }
        MidiEventKind::PitchBend { value } => {
            (0xE0, (value & 0x7F) as i32, ((value >> 7) & 0x7F) as i32)
        }
    }
}

/// The synthesizer output device.
pub struct AudioEngine {
    /// The synthesizer (wrapped for sharing with the audio thread).
    synth: Arc<Mutex<Synthesizer>>,
    /// Audio output stream (must be kept alive).
    _stream: OutputStream,
    _stream_handle: OutputStreamHandle,
}

impl AudioEngine {
    /// Creates a new audio engine with the specified SoundFont.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The SoundFont file cannot be read
    /// - The SoundFont is invalid
    /// - Audio output cannot be initialized
    pub fn new<P: AsRef<Path>>(soundfont_path: P) -> Result<Self> {
        let mut file = BufReader::new(File::open(soundfont_path.as_ref()).with_context(|| {
            format!(
                "Failed to open SoundFont: {}",
                soundfont_path.as_ref().display()
            )
        })?);
        let soundfont = Arc::new(
            SoundFont::new(&mut file)
                .map_err(|e| anyhow::anyhow!("Failed to load SoundFont: {:?}", e))?,
        );

        let settings = SynthesizerSettings::new(SAMPLE_RATE as i32);
        let synth = Synthesizer::new(&soundfont, &settings)
            .map_err(|e| anyhow::anyhow!("Failed to create synthesizer: {:?}", e))?;
        let synth = Arc::new(Mutex::new(synth));

        let (stream, stream_handle) =
            OutputStream::try_default().context("Failed to open audio output")?;

        let source = SynthSource::new(Arc::clone(&synth));
        stream_handle
            .play_raw(source)
            .context("Failed to start audio playback")?;

        tracing::info!(
            "Audio engine ready with {}",
            soundfont_path.as_ref().display()
        );
        Ok(Self {
            synth,
            _stream: stream,
            _stream_handle: stream_handle,
        })
    }

    /// Stops all playing notes.
    pub fn all_notes_off(&self, immediate: bool) {
        if let Ok(mut synth) = self.synth.lock() {
            synth.note_off_all(immediate);
        }
    }
}

impl MidiOutput for AudioEngine {
    fn write(&mut self, event: &MidiEvent) {
        let (command, data1, data2) = to_midi_message(event);
        match self.synth.lock() {
            Ok(mut synth) => {
                synth.process_midi_message(event.channel as i32, command, data1, data2)
            }
            Err(_) => tracing::warn!("Synthesizer lock poisoned, dropping {:?}", event),
        }
    }

    fn reset(&mut self) {
        self.all_notes_off(true);
        if let Ok(mut synth) = self.synth.lock() {
            synth.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_messages() {
        assert_eq!(
            to_midi_message(&MidiEvent::note_on(0, 60, 100)),
            (0x90, 60, 100)
        );
        assert_eq!(to_midi_message(&MidiEvent::note_off(3, 61)), (0x80, 61, 0));
        // Zero-velocity note-ons are sent as note-offs.
        assert_eq!(to_midi_message(&MidiEvent::note_on(0, 62, 0)), (0x80, 62, 0));
    }

    #[test]
    fn test_channel_messages() {
        let program = MidiEvent {
            channel: 9,
            kind: MidiEventKind::ProgramChange { program: 42 },
        };
        assert_eq!(to_midi_message(&program), (0xC0, 42, 0));

        let volume = MidiEvent {
            channel: 0,
            kind: MidiEventKind::Controller {
                controller: 7,
                value: 90,
            },
        };
        assert_eq!(to_midi_message(&volume), (0xB0, 7, 90));

        let bend = MidiEvent {
            channel: 0,
            kind: MidiEventKind::PitchBend { value: 0x2000 },
        };
        assert_eq!(to_midi_message(&bend), (0xE0, 0x00, 0x40));
    }
}
