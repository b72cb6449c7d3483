//! Audio output for play sessions.
//!
//! Real-time MIDI synthesis using rustysynth with audio output via rodio.
//! The engine is the session's output device.

pub mod engine;

pub use engine::AudioEngine;
