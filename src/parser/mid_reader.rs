//! Reader for Guitar Hero / Rock Band style MIDI charts.
//!
//! Note layout of an instrument track, per difficulty base key
//! (Easy 60, Medium 72, Hard 84, Expert 96):
//! base..=base+4 are the five lanes, base+5 marks forced notes.
//! Shared by every difficulty: 103 solo, 104 tap, 116 star power.

use crate::chart::chart_object::{ChartEvent, FretType, Note, NoteFlags, StarPower};
use crate::chart::song::{Difficulty, GlobalEvent, Instrument, Song, TempoChange, TimeSignature};
use crate::parser::primitive_parser::make_string;
use crate::ChartError;
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use std::collections::HashMap;
use std::ops::Range;
use std::path::Path;

pub const SOLO_KEY: u8 = 103;
pub const TAP_KEY: u8 = 104;
pub const PHRASE_START_KEY: u8 = 105;
pub const PHRASE_END_KEY: u8 = 106;
pub const STAR_POWER_KEY: u8 = 116;

const FORCED_OFFSET: u8 = 5;

pub const EVENTS_TRACK: &str = "EVENTS";
pub const VOCALS_TRACK: &str = "PART VOCALS";

/// Lowest key of each difficulty
pub const fn difficulty_base_key(difficulty: Difficulty) -> u8 {
    match difficulty {
        Difficulty::Easy => 60,
        Difficulty::Medium => 72,
        Difficulty::Hard => 84,
        Difficulty::Expert => 96,
    }
}

/// A note held from `start` until `end`
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct NoteRange {
    key: u8,
    start: u32,
    end: u32,
}

impl NoteRange {
    const fn length(&self) -> u32 {
        self.end - self.start
    }

    const fn ticks(&self) -> Range<u32> {
        self.start..self.end
    }
}

pub fn read_mid(path: &Path) -> Result<Song, ChartError> {
    let data = std::fs::read(path)?;
    parse_mid_data(&data)
}

/// Build a song from the bytes of a standard MIDI file
pub fn parse_mid_data(data: &[u8]) -> Result<Song, ChartError> {
    let smf = Smf::parse(data).map_err(|e| ChartError::MidiError(e.to_string()))?;
    let resolution = match smf.header.timing {
        Timing::Metrical(ticks) => u32::from(ticks.as_int()),
        Timing::Timecode(fps, sub) => {
            return Err(ChartError::MidiError(format!(
                "timecode timing is not supported ({} fps, {sub} subframes)",
                fps.as_f32()
            )))
        }
    };
    log::debug!(
        "MIDI with {} tracks at resolution {resolution}",
        smf.tracks.len()
    );

    let mut song = Song::new(resolution);
    for (track_index, track) in smf.tracks.iter().enumerate() {
        let events = absolute_events(track);
        read_sync_events(&mut song, &events);

        let track_name = track_name(&events);
        if track_index == 0 {
            if let Some(name) = &track_name {
                song.metadata.name = name.clone();
            }
            continue;
        }
        let Some(track_name) = track_name else {
            log::debug!("Skipping unnamed track {track_index}");
            continue;
        };
        if let Some(instrument) = Instrument::from_midi_track_name(&track_name) {
            read_instrument_track(&mut song, instrument, &events);
        } else if track_name == EVENTS_TRACK {
            read_events_track(&mut song, &events);
        } else if track_name == VOCALS_TRACK {
            read_vocals_track(&mut song, &events);
        } else {
            log::debug!("Skipping track '{track_name}'");
        }
    }

    song.sync_track.tempos.sort_by_key(|t| t.position);
    song.sync_track.time_signatures.sort_by_key(|ts| ts.position);
    song.events.sort_by_key(|e| e.position);

    if song.note_count() == 0 {
        return Err(ChartError::UnusableSong("no playable notes found".to_string()));
    }
    Ok(song)
}

/// Events paired with their absolute tick
fn absolute_events<'a>(track: &'a [TrackEvent<'a>]) -> Vec<(u32, &'a TrackEventKind<'a>)> {
    let mut tick: u32 = 0;
    track
        .iter()
        .map(|event| {
            tick = tick.saturating_add(event.delta.as_int());
            (tick, &event.kind)
        })
        .collect()
}

fn track_name(events: &[(u32, &TrackEventKind)]) -> Option<String> {
    events.iter().find_map(|(_, kind)| match kind {
        TrackEventKind::Meta(MetaMessage::TrackName(name)) => Some(make_string(name)),
        _ => None,
    })
}

fn read_sync_events(song: &mut Song, events: &[(u32, &TrackEventKind)]) {
    for (tick, kind) in events {
        match kind {
            TrackEventKind::Meta(MetaMessage::Tempo(micros_per_beat)) => {
                let micros = u64::from(micros_per_beat.as_int().max(1));
                let milli_bpm = 60_000_000_000 / micros;
                song.sync_track.tempos.push(TempoChange {
                    position: *tick,
                    milli_bpm: u32::try_from(milli_bpm).unwrap_or(u32::MAX),
                });
            }
            TrackEventKind::Meta(MetaMessage::TimeSignature(numerator, denominator_exp, _, _)) => {
                song.sync_track.time_signatures.push(TimeSignature {
                    position: *tick,
                    numerator: u32::from(*numerator),
                    denominator_exp: u32::from(*denominator_exp),
                });
            }
            _ => {}
        }
    }
}

/// Pair note on/off messages. A note on with velocity 0 counts as note off,
/// notes never released end where they start.
fn note_ranges(events: &[(u32, &TrackEventKind)]) -> Vec<NoteRange> {
    let mut open: HashMap<u8, Vec<u32>> = HashMap::new();
    let mut ranges = Vec::new();
    for (tick, kind) in events {
        let TrackEventKind::Midi { message, .. } = kind else {
            continue;
        };
        let (key, pressed) = match message {
            MidiMessage::NoteOn { key, vel } => (key.as_int(), vel.as_int() > 0),
            MidiMessage::NoteOff { key, .. } => (key.as_int(), false),
            _ => continue,
        };
        if pressed {
            open.entry(key).or_default().push(*tick);
        } else if let Some(start) = open.get_mut(&key).and_then(|starts| starts.pop()) {
            ranges.push(NoteRange {
                key,
                start,
                end: *tick,
            });
        }
    }
    for (key, starts) in open {
        for start in starts {
            log::debug!("Note {key} at {start} is never released");
            ranges.push(NoteRange {
                key,
                start,
                end: start,
            });
        }
    }
    ranges.sort_by_key(|r| (r.start, r.key));
    ranges
}

fn read_instrument_track(
    song: &mut Song,
    instrument: Instrument,
    events: &[(u32, &TrackEventKind)],
) {
    // notes shorter than a third of a beat are not sustained
    let sustain_cutoff = song.resolution / 3;
    let mut forced: Vec<(Difficulty, Range<u32>)> = Vec::new();
    let mut taps: Vec<Range<u32>> = Vec::new();

    for range in note_ranges(events) {
        match range.key {
            SOLO_KEY => {
                for difficulty in Difficulty::ALL {
                    let track = song.track_mut(instrument, difficulty);
                    track.insert(ChartEvent::new(range.start, "solo"));
                    track.insert(ChartEvent::new(range.end, "soloend"));
                }
            }
            TAP_KEY => taps.push(range.ticks()),
            STAR_POWER_KEY => {
                for difficulty in Difficulty::ALL {
                    song.track_mut(instrument, difficulty)
                        .insert(StarPower::new(range.start, range.length()));
                }
            }
            key => {
                let Some(difficulty) = Difficulty::ALL.into_iter().find(|d| {
                    (difficulty_base_key(*d)..=difficulty_base_key(*d) + FORCED_OFFSET)
                        .contains(&key)
                }) else {
                    continue;
                };
                let offset = key - difficulty_base_key(difficulty);
                match FretType::from_code(i32::from(offset)) {
                    Some(fret_type) => {
                        let sustain = if range.length() < sustain_cutoff {
                            0
                        } else {
                            range.length()
                        };
                        song.track_mut(instrument, difficulty)
                            .insert(Note::new(range.start, fret_type, sustain));
                    }
                    None => forced.push((difficulty, range.ticks())),
                }
            }
        }
    }

    for (difficulty, ticks) in forced {
        for note in song.track_mut(instrument, difficulty).notes_in_range_mut(ticks) {
            note.flags = note.flags.union(NoteFlags::FORCED);
        }
    }
    for ticks in taps {
        for difficulty in Difficulty::ALL {
            for note in song
                .track_mut(instrument, difficulty)
                .notes_in_range_mut(ticks.clone())
            {
                note.flags = note.flags.union(NoteFlags::TAP);
            }
        }
    }
    log::debug!(
        "Read {:?} with {} notes",
        instrument,
        Difficulty::ALL
            .into_iter()
            .filter_map(|d| song.track(instrument, d))
            .map(|t| t.note_count())
            .sum::<usize>()
    );
}

fn text_event(kind: &TrackEventKind) -> Option<String> {
    match kind {
        TrackEventKind::Meta(MetaMessage::Text(text) | MetaMessage::Marker(text)) => {
            Some(make_string(text))
        }
        _ => None,
    }
}

/// `[section intro]` becomes `section intro`
fn strip_brackets(text: &str) -> &str {
    let text = text.trim();
    text.strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .unwrap_or(text)
}

fn read_events_track(song: &mut Song, events: &[(u32, &TrackEventKind)]) {
    for (tick, kind) in events {
        if let Some(text) = text_event(kind) {
            let text = strip_brackets(&text);
            if !text.is_empty() {
                song.events.push(GlobalEvent::new(*tick, text));
            }
        }
    }
}

fn read_vocals_track(song: &mut Song, events: &[(u32, &TrackEventKind)]) {
    for (tick, kind) in events {
        let lyric = match kind {
            TrackEventKind::Meta(MetaMessage::Lyric(text)) => Some(make_string(text)),
            // older charts carry lyrics as plain text events
            _ => text_event(kind).filter(|t| !t.trim_start().starts_with('[')),
        };
        if let Some(lyric) = lyric {
            let lyric = lyric.trim();
            if !lyric.is_empty() {
                song.events.push(GlobalEvent::new(*tick, format!("lyric {lyric}")));
            }
        }
    }
    for range in note_ranges(events) {
        if range.key == PHRASE_START_KEY || range.key == PHRASE_END_KEY {
            song.events.push(GlobalEvent::new(range.start, "phrase_start"));
            song.events.push(GlobalEvent::new(range.end, "phrase_end"));
        }
    }
}
