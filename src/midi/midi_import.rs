//! Standard MIDI File (SMF) import functionality.
//!
//! Imports .mid and .midi files into a `Song` whose events are placed on an
//! absolute microsecond clock.
//!
//! # Limitations
//!
//! - Only metrical timing is supported (SMPTE timecode files are rejected)
//! - Format 2 (sequential) files are rejected
//! - Format 0 files are split into one track per channel so the player can
//!   pick a hand or instrument; format 1 files keep their file tracks
//! - Tempo changes from every track form one global tempo map
//! - Aftertouch, SysEx and meta events other than tempo and track names are ignored

use super::{MidiEvent, MidiEventKind, Microseconds, Note, Song, Track};
use midly::{Format, MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Tempo assumed until the first tempo event (120 BPM).
const DEFAULT_USEC_PER_BEAT: u32 = 500_000;

/// Errors that can occur during MIDI import.
#[derive(Debug, Error)]
pub enum MidiImportError {
    /// File could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// MIDI parsing failed
    #[error("MIDI parse error: {0}")]
    Parse(String),
    /// Unsupported MIDI format or timing
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Imports a MIDI file and creates a Song.
///
/// # Arguments
///
/// * `path` - Path to the .mid or .midi file
///
/// # Errors
///
/// Returns error if file cannot be read or parsed
pub fn import_from_midi<P: AsRef<Path>>(path: P) -> Result<Song, MidiImportError> {
    let path = path.as_ref();
    let data = fs::read(path)?;

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Imported MIDI")
        .to_string();

    Song::from_smf_bytes(name, &data)
}

impl Song {
    /// Parses an in-memory Standard MIDI File.
    pub fn from_smf_bytes(name: impl Into<String>, data: &[u8]) -> Result<Song, MidiImportError> {
        let smf = Smf::parse(data).map_err(|e| MidiImportError::Parse(e.to_string()))?;
        let name = name.into();

        let ticks_per_beat = match smf.header.timing {
            Timing::Metrical(tpb) => tpb.as_int() as u32,
            Timing::Timecode(_, _) => {
                return Err(MidiImportError::UnsupportedFormat(
                    "SMPTE timecode timing not supported".to_string(),
                ))
            }
        };
        if ticks_per_beat == 0 {
            return Err(MidiImportError::Parse(
                "header declares zero ticks per beat".to_string(),
            ));
        }

        let builders: Vec<TrackBuilder> = match smf.header.format {
            Format::SingleTrack => smf
                .tracks
                .iter()
                .flat_map(|track| split_by_channel(read_track(track, 0)))
                .collect(),
            Format::Parallel => smf
                .tracks
                .iter()
                .enumerate()
                .map(|(idx, track)| read_track(track, idx))
                .collect(),
            Format::Sequential => {
                return Err(MidiImportError::UnsupportedFormat(
                    "Format 2 (sequential) MIDI files not supported".to_string(),
                ))
            }
        };

        let tempo_map = TempoMap::new(
            builders.iter().flat_map(|b| b.tempos.iter().copied()),
            ticks_per_beat,
        );

        let tracks: Vec<Track> = builders
            .into_iter()
            .enumerate()
            .map(|(idx, builder)| builder.build(idx, &tempo_map))
            .collect();

        let song = Song::new(name, tracks);
        tracing::info!(
            "Imported '{}': {} tracks, {} notes, {:.1}s",
            song.name,
            song.track_count(),
            song.note_count(),
            song.tracks()
                .iter()
                .map(|t| t.end_time())
                .max()
                .unwrap_or(0) as f64
                / 1_000_000.0
        );
        Ok(song)
    }
}

/// Converts ticks to microseconds across tempo changes.
#[derive(Debug, Clone)]
struct TempoMap {
    ticks_per_beat: u32,
    /// Segments as (start tick, microseconds at start tick, microseconds per beat).
    segments: Vec<(u64, Microseconds, u32)>,
}

impl TempoMap {
    fn new(changes: impl IntoIterator<Item = (u64, u32)>, ticks_per_beat: u32) -> Self {
        // Later events at the same tick win.
        let by_tick: BTreeMap<u64, u32> = changes.into_iter().collect();

        let mut segments = vec![(0u64, 0 as Microseconds, DEFAULT_USEC_PER_BEAT)];
        for (tick, usec_per_beat) in by_tick {
            let time = Self::offset(segments[segments.len() - 1], tick, ticks_per_beat);
            if tick == 0 {
                segments[0].2 = usec_per_beat;
            } else {
                segments.push((tick, time, usec_per_beat));
            }
        }

        Self {
            ticks_per_beat,
            segments,
        }
    }

    fn offset(segment: (u64, Microseconds, u32), tick: u64, ticks_per_beat: u32) -> Microseconds {
        let (start_tick, start_time, usec_per_beat) = segment;
        let ticks = tick.saturating_sub(start_tick);
        start_time + (ticks as u128 * usec_per_beat as u128 / ticks_per_beat as u128) as Microseconds
    }

    fn to_microseconds(&self, tick: u64) -> Microseconds {
        let idx = self
            .segments
            .partition_point(|(start, _, _)| *start <= tick)
            .saturating_sub(1);
        Self::offset(self.segments[idx], tick, self.ticks_per_beat)
    }
}

/// Tick-timed contents of one track before tempo conversion.
#[derive(Debug, Default)]
struct TrackBuilder {
    name: Option<String>,
    file_index: usize,
    /// (start tick, end tick, channel, pitch, velocity)
    notes: Vec<(u64, u64, u8, u8, u8)>,
    events: Vec<(u64, MidiEvent)>,
    tempos: Vec<(u64, u32)>,
}

impl TrackBuilder {
    fn first_channel(&self) -> u8 {
        self.events.first().map(|(_, e)| e.channel).unwrap_or(0)
    }

    fn build(self, index: usize, tempo_map: &TempoMap) -> Track {
        let channel = self.first_channel();
        let name = self
            .name
            .clone()
            .unwrap_or_else(|| format!("Track {}", self.file_index + 1));
        let mut track = Track::new(name, channel);

        track.program = self.events.iter().find_map(|(_, e)| match e.kind {
            MidiEventKind::ProgramChange { program } => Some(program),
            _ => None,
        });

        for (start, end, _, pitch, velocity) in self.notes {
            track.add_note(Note::new(
                index,
                pitch,
                velocity,
                tempo_map.to_microseconds(start),
                tempo_map.to_microseconds(end),
            ));
        }
        for (tick, event) in self.events {
            track.add_event(tempo_map.to_microseconds(tick), event);
        }
        track
    }
}

/// Reads one SMF track into ticks, pairing note-on/note-off into notes.
fn read_track(track: &[midly::TrackEvent], file_index: usize) -> TrackBuilder {
    let mut builder = TrackBuilder {
        file_index,
        ..Default::default()
    };
    // Key is (channel, pitch), value is (start tick, velocity).
    let mut active: HashMap<(u8, u8), (u64, u8)> = HashMap::new();
    let mut tick: u64 = 0;

    for event in track {
        tick += event.delta.as_int() as u64;

        match event.kind {
            TrackEventKind::Meta(MetaMessage::TrackName(bytes)) => {
                if let Ok(name) = std::str::from_utf8(bytes) {
                    let name = name.trim();
                    if !name.is_empty() {
                        builder.name = Some(name.to_string());
                    }
                }
            }
            TrackEventKind::Meta(MetaMessage::Tempo(tempo)) => {
                let usec_per_beat = tempo.as_int();
                if usec_per_beat > 0 {
                    builder.tempos.push((tick, usec_per_beat));
                }
            }
            TrackEventKind::Midi { channel, message } => {
                let ch = channel.as_int();
                let event = match message {
                    MidiMessage::NoteOn { key, vel } => {
                        MidiEvent::note_on(ch, key.as_int(), vel.as_int())
                    }
                    MidiMessage::NoteOff { key, .. } => MidiEvent::note_off(ch, key.as_int()),
                    MidiMessage::ProgramChange { program } => MidiEvent {
                        channel: ch,
                        kind: MidiEventKind::ProgramChange {
                            program: program.as_int(),
                        },
                    },
                    MidiMessage::Controller { controller, value } => MidiEvent {
                        channel: ch,
                        kind: MidiEventKind::Controller {
                            controller: controller.as_int(),
                            value: value.as_int(),
                        },
                    },
                    MidiMessage::PitchBend { bend } => MidiEvent {
                        channel: ch,
                        kind: MidiEventKind::PitchBend {
                            value: bend.0.as_int(),
                        },
                    },
                    _ => continue, // Aftertouch is not routed
                };

                match event.kind {
                    MidiEventKind::NoteOn { key, velocity } => {
                        // A repeated note-on closes the sounding note first.
                        if let Some((start, vel)) = active.insert((ch, key), (tick, velocity)) {
                            builder.notes.push((start, tick, ch, key, vel));
                        }
                    }
                    MidiEventKind::NoteOff { key } => {
                        if let Some((start, vel)) = active.remove(&(ch, key)) {
                            builder.notes.push((start, tick, ch, key, vel));
                        }
                    }
                    _ => {}
                }
                builder.events.push((tick, event));
            }
            _ => {} // Ignore SysEx and other events
        }
    }

    // Close notes the file never released at the last event of the track.
    for ((ch, pitch), (start, vel)) in active {
        builder.notes.push((start, tick, ch, pitch, vel));
        builder.events.push((tick, MidiEvent::note_off(ch, pitch)));
    }
    builder.notes.sort_by_key(|(start, _, ch, pitch, _)| (*start, *ch, *pitch));

    builder
}

/// Splits a format 0 track into one builder per channel.
fn split_by_channel(builder: TrackBuilder) -> Vec<TrackBuilder> {
    let mut by_channel: BTreeMap<u8, TrackBuilder> = BTreeMap::new();

    for note in builder.notes {
        channel_entry(&mut by_channel, note.2).notes.push(note);
    }
    for (tick, event) in builder.events {
        channel_entry(&mut by_channel, event.channel)
            .events
            .push((tick, event));
    }

    let mut tracks: Vec<TrackBuilder> = by_channel
        .into_iter()
        .map(|(ch, mut b)| {
            b.name = Some(match &builder.name {
                Some(name) => format!("{} (Ch {})", name, ch + 1),
                None => format!("Channel {}", ch + 1),
            });
            b
        })
        .collect();

    // Tempo changes ride along with the first split track.
    match tracks.first_mut() {
        Some(first) => first.tempos = builder.tempos,
        None => tracks.push(TrackBuilder {
            tempos: builder.tempos,
            ..Default::default()
        }),
    }
    tracks
}

fn channel_entry(map: &mut BTreeMap<u8, TrackBuilder>, channel: u8) -> &mut TrackBuilder {
    map.entry(channel).or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::play::TimelineSource;
    use midly::num::{u15, u24, u28, u4, u7};
    use midly::{Header, TrackEvent};

    fn midi(delta: u32, channel: u8, message: MidiMessage) -> TrackEvent<'static> {
        TrackEvent {
            delta: u28::new(delta),
            kind: TrackEventKind::Midi {
                channel: u4::new(channel),
                message,
            },
        }
    }

    fn on(delta: u32, channel: u8, key: u8) -> TrackEvent<'static> {
        midi(
            delta,
            channel,
            MidiMessage::NoteOn {
                key: u7::new(key),
                vel: u7::new(100),
            },
        )
    }

    fn off(delta: u32, channel: u8, key: u8) -> TrackEvent<'static> {
        midi(
            delta,
            channel,
            MidiMessage::NoteOff {
                key: u7::new(key),
                vel: u7::new(0),
            },
        )
    }

    fn meta(delta: u32, message: MetaMessage<'static>) -> TrackEvent<'static> {
        TrackEvent {
            delta: u28::new(delta),
            kind: TrackEventKind::Meta(message),
        }
    }

    fn encode(format: Format, tracks: Vec<Vec<TrackEvent<'static>>>) -> Vec<u8> {
        let mut smf = Smf::new(Header::new(format, Timing::Metrical(u15::new(480))));
        smf.tracks = tracks;
        let mut buf = Vec::new();
        smf.write(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_default_tempo_conversion() {
        // 480 ticks at 120 BPM = 500ms
        let data = encode(
            Format::Parallel,
            vec![vec![on(0, 0, 60), off(480, 0, 60), meta(0, MetaMessage::EndOfTrack)]],
        );
        let song = Song::from_smf_bytes("Test", &data).unwrap();
        let notes = song.notes();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].start, 0);
        assert_eq!(notes[0].end, 500_000);
        assert_eq!(song.total_length(), 500_000);
    }

    #[test]
    fn test_tempo_change_applies_across_tracks() {
        let tempo_track = vec![
            meta(0, MetaMessage::Tempo(u24::new(1_000_000))), // 60 BPM
            meta(480, MetaMessage::Tempo(u24::new(250_000))), // 240 BPM
            meta(0, MetaMessage::EndOfTrack),
        ];
        let music = vec![
            meta(0, MetaMessage::TrackName(b"Melody")),
            on(0, 0, 60),
            off(480, 0, 60),
            on(0, 0, 62),
            off(480, 0, 62),
        ];
        let data = encode(Format::Parallel, vec![tempo_track, music]);
        let song = Song::from_smf_bytes("Test", &data).unwrap();

        assert_eq!(song.track_count(), 2);
        assert!(!song.tracks()[0].has_notes());
        assert_eq!(song.tracks()[1].name, "Melody");

        let notes = song.notes();
        assert_eq!((notes[0].start, notes[0].end), (0, 1_000_000));
        assert_eq!((notes[1].start, notes[1].end), (1_000_000, 1_250_000));
        assert!(notes.iter().all(|n| n.track_id == 1));
    }

    #[test]
    fn test_format_zero_split_by_channel() {
        let data = encode(
            Format::SingleTrack,
            vec![vec![
                on(0, 0, 48),
                on(0, 1, 72),
                off(480, 0, 48),
                off(0, 1, 72),
            ]],
        );
        let song = Song::from_smf_bytes("Test", &data).unwrap();
        assert_eq!(song.track_count(), 2);
        assert_eq!(song.tracks()[0].channel, 0);
        assert_eq!(song.tracks()[1].channel, 1);
        assert_eq!(song.tracks()[1].name, "Channel 2");
        assert_eq!(song.tracks()[1].notes()[0].track_id, 1);
    }

    #[test]
    fn test_unterminated_note_closed_at_track_end() {
        let data = encode(
            Format::Parallel,
            vec![vec![on(0, 0, 60), on(240, 0, 64), off(240, 0, 64)]],
        );
        let song = Song::from_smf_bytes("Test", &data).unwrap();
        let notes = song.notes();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].pitch, 60);
        assert_eq!(notes[0].end, 500_000);
    }

    #[test]
    fn test_program_change_recorded() {
        let data = encode(
            Format::Parallel,
            vec![vec![
                midi(
                    0,
                    2,
                    MidiMessage::ProgramChange {
                        program: u7::new(40),
                    },
                ),
                on(0, 2, 60),
                off(10, 2, 60),
            ]],
        );
        let song = Song::from_smf_bytes("Test", &data).unwrap();
        assert_eq!(song.tracks()[0].program, Some(40));
        assert_eq!(song.tracks()[0].channel, 2);
    }

    #[test]
    fn test_rejects_garbage() {
        let err = Song::from_smf_bytes("Bad", b"not a midi file").unwrap_err();
        assert!(matches!(err, MidiImportError::Parse(_)));
    }

    #[test]
    fn test_rejects_sequential_format() {
        let data = encode(Format::Sequential, vec![vec![on(0, 0, 60), off(10, 0, 60)]]);
        let err = Song::from_smf_bytes("Seq", &data).unwrap_err();
        assert!(matches!(err, MidiImportError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_tempo_map_segments() {
        let map = TempoMap::new(vec![(0, 1_000_000), (960, 500_000)], 480);
        assert_eq!(map.to_microseconds(480), 1_000_000);
        assert_eq!(map.to_microseconds(960), 2_000_000);
        assert_eq!(map.to_microseconds(1440), 2_500_000);
    }
}
