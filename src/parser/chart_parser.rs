//! Reader for complete `.chart` files.

use crate::chart::song::{
    parse_section_name, AudioInstrument, GlobalEvent, Song, TempoChange, TimeSignature,
    DEFAULT_RESOLUTION,
};
use crate::parser::chart_codec;
use crate::parser::primitive_parser::{
    make_string, parse_assignment, parse_section_header, parse_token, parse_uint_token, unquote,
};
use crate::ChartError;
use nom::IResult;
use std::path::Path;

pub const SONG_SECTION: &str = "Song";
pub const SYNC_TRACK_SECTION: &str = "SyncTrack";
pub const EVENTS_SECTION: &str = "Events";

/// A `[Name] { ... }` block; `first_line` is the file line of the first body line,
/// assuming the opening brace sits on the line after the header
#[derive(Debug)]
struct Section<'a> {
    name: &'a str,
    first_line: usize,
    lines: Vec<&'a str>,
}

pub fn read_chart(path: &Path) -> Result<Song, ChartError> {
    let data = std::fs::read(path)?;
    parse_chart_data(&data)
}

pub fn parse_chart_data(data: &[u8]) -> Result<Song, ChartError> {
    parse_chart_str(&make_string(data))
}

pub fn parse_chart_str(text: &str) -> Result<Song, ChartError> {
    let sections = split_sections(text);
    let mut song = Song::new(DEFAULT_RESOLUTION);

    // [Song] may come after the tracks
    if let Some(section) = sections.iter().find(|s| s.name == SONG_SECTION) {
        read_song_section(&mut song, section);
    }

    for section in &sections {
        match section.name {
            SONG_SECTION => {}
            SYNC_TRACK_SECTION => read_sync_track(&mut song, section)?,
            EVENTS_SECTION => read_events(&mut song, section)?,
            name => match parse_section_name(name) {
                Some((instrument, difficulty)) => {
                    let timeline = chart_codec::decode(&section.lines)
                        .map_err(|e| with_line_offset(e, section.first_line))?;
                    song.set_track(instrument, difficulty, timeline);
                }
                None => log::debug!("Skipping section [{name}]"),
            },
        }
    }
    Ok(song)
}

fn split_sections(text: &str) -> Vec<Section<'_>> {
    let mut sections = Vec::new();
    let mut current: Option<Section<'_>> = None;
    for (index, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        let header: IResult<&str, &str> = parse_section_header(line);
        if let Ok((_, name)) = header {
            if let Some(section) = current.take() {
                sections.push(section);
            }
            current = Some(Section {
                name,
                first_line: index + 3,
                lines: Vec::new(),
            });
        } else if trimmed == "{" || trimmed == "}" {
            continue;
        } else if let Some(section) = current.as_mut() {
            section.lines.push(line);
        }
    }
    sections.extend(current);
    sections
}

/// Turn a line number relative to a section body into a file line number
fn with_line_offset(error: ChartError, first_line: usize) -> ChartError {
    match error {
        ChartError::MalformedLine {
            line_number,
            line,
            reason,
        } => ChartError::MalformedLine {
            line_number: line_number + first_line - 1,
            line,
            reason,
        },
        other => other,
    }
}

fn malformed(section: &Section<'_>, index: usize, reason: impl Into<String>) -> ChartError {
    ChartError::MalformedLine {
        line_number: section.first_line + index,
        line: section.lines[index].trim().to_string(),
        reason: reason.into(),
    }
}

fn read_song_section(song: &mut Song, section: &Section<'_>) {
    for line in &section.lines {
        let Ok((_, (key, value))) = parse_assignment(line) else {
            continue;
        };
        let value = unquote(value);
        match key {
            "Name" => song.metadata.name = value.to_string(),
            "Artist" => song.metadata.artist = value.to_string(),
            "Charter" => song.metadata.charter = value.to_string(),
            "Album" => song.metadata.album = value.to_string(),
            "Year" => {
                song.metadata.year = value.trim_start_matches(", ").to_string();
            }
            "Genre" => song.metadata.genre = value.to_string(),
            "Offset" => match value.parse() {
                Ok(offset) => song.offset = offset,
                Err(_) => log::warn!("Ignoring invalid offset '{value}'"),
            },
            "Resolution" => match parse_uint_token(value) {
                Some(resolution) if resolution > 0 => song.resolution = resolution,
                _ => log::warn!("Ignoring invalid resolution '{value}'"),
            },
            key => match AudioInstrument::from_stream_key(key) {
                Some(channel) => song.set_audio_location(channel, value),
                None => log::debug!("Ignoring song property {key}"),
            },
        }
    }
}

/// `<position> = <marker> <fields...>` as position, marker and remaining tokens
fn split_timed_line(line: &str) -> Option<(&str, &str, Vec<&str>)> {
    let (_, (lhs, rhs)) = parse_assignment(line.trim_end()).ok()?;
    let parsed: IResult<&str, &str> = parse_token(rhs);
    let (body, marker) = parsed.ok()?;
    Some((lhs, marker, body.split_whitespace().collect()))
}

fn read_sync_track(song: &mut Song, section: &Section<'_>) -> Result<(), ChartError> {
    for (index, line) in section.lines.iter().enumerate() {
        let Some((position, marker, fields)) = split_timed_line(line) else {
            continue;
        };
        let numbers: Option<Vec<u32>> = std::iter::once(position)
            .chain(fields.iter().copied())
            .map(parse_uint_token)
            .collect();
        match (marker, numbers.as_deref()) {
            ("B", Some(&[position, milli_bpm])) => song.sync_track.tempos.push(TempoChange {
                position,
                milli_bpm,
            }),
            ("TS", Some(&[position, numerator])) => {
                song.sync_track.time_signatures.push(TimeSignature {
                    position,
                    numerator,
                    denominator_exp: 2,
                });
            }
            ("TS", Some(&[position, numerator, denominator_exp])) => {
                song.sync_track.time_signatures.push(TimeSignature {
                    position,
                    numerator,
                    denominator_exp,
                });
            }
            ("B" | "TS", _) => return Err(malformed(section, index, "invalid sync event")),
            _ => log::debug!("Skipping sync event {marker}"),
        }
    }
    Ok(())
}

fn read_events(song: &mut Song, section: &Section<'_>) -> Result<(), ChartError> {
    for (index, line) in section.lines.iter().enumerate() {
        let Ok((_, (lhs, rhs))) = parse_assignment(line.trim_end()) else {
            continue;
        };
        let Some(text) = rhs.strip_prefix("E ") else {
            continue;
        };
        let position =
            parse_uint_token(lhs).ok_or_else(|| malformed(section, index, "invalid position"))?;
        song.events.push(GlobalEvent::new(position, unquote(text)));
    }
    Ok(())
}
