//! Text codec for the body of a track section.
//!
//! ```text
//! 768 = N 2 0      note: lane 0..4, sustain length
//! 768 = N 5 0      forced flag for every note at 768
//! 768 = N 6 0      tap flag for every note at 768
//! 768 = S 2 384    star power phrase
//! 768 = E solo     track event
//! ```

use crate::chart::chart_object::{ChartEvent, ChartObject, FretType, Note, NoteFlags, StarPower};
use crate::chart::timeline::Timeline;
use crate::parser::primitive_parser::{parse_assignment, parse_token, parse_uint_token};
use crate::ChartError;
use nom::character::complete::{i32 as parse_i32, space0, space1, u32 as parse_u32};
use nom::combinator::eof;
use nom::sequence::{preceded, terminated};
use nom::{IResult, Parser};

/// Type code of a star power phrase in `S` lines
pub const STAR_POWER_CODE: u32 = 2;

const NOTE_MARKER: &str = "N";
const SPECIAL_MARKER: &str = "S";
const EVENT_MARKER: &str = "E";

/// A recognised line of a track section
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackLine<'a> {
    /// Lane or flag code with its length
    Note {
        position: u32,
        code: i32,
        length: u32,
    },
    Special {
        position: u32,
        code: u32,
        length: u32,
    },
    Event {
        position: u32,
        name: &'a str,
    },
}

/// `<lane> <length>` with nothing after it
fn parse_note_fields(i: &str) -> IResult<&str, (i32, u32)> {
    terminated(
        (preceded(space1, parse_i32), preceded(space1, parse_u32)),
        (space0, eof),
    )
    .parse(i)
}

/// `<type> <length>` with nothing after it
fn parse_special_fields(i: &str) -> IResult<&str, (u32, u32)> {
    terminated(
        (preceded(space1, parse_u32), preceded(space1, parse_u32)),
        (space0, eof),
    )
    .parse(i)
}

/// Classify a single line.
///
/// `Ok(None)` for lines that are not track objects (braces, blank lines,
/// unknown markers, events without a name). `Err` carries the reason when a
/// line uses a known marker but its fields do not parse.
pub fn parse_track_line(line: &str) -> Result<Option<TrackLine<'_>>, String> {
    let line = line.trim_end();
    let Ok((_, (lhs, rhs))) = parse_assignment(line) else {
        return Ok(None);
    };
    let parsed: IResult<&str, &str> = parse_token(rhs);
    let Ok((body, marker)) = parsed else {
        return Ok(None);
    };
    if ![NOTE_MARKER, SPECIAL_MARKER, EVENT_MARKER].contains(&marker) {
        return Ok(None);
    }

    let position = parse_uint_token(lhs).ok_or_else(|| format!("invalid position '{lhs}'"))?;

    let track_line = match marker {
        NOTE_MARKER => {
            let (_, (code, length)) = parse_note_fields(body)
                .map_err(|_| "expected '<lane> <length>' after N".to_string())?;
            TrackLine::Note {
                position,
                code,
                length,
            }
        }
        SPECIAL_MARKER => {
            let (_, (code, length)) = parse_special_fields(body)
                .map_err(|_| "expected '<type> <length>' after S".to_string())?;
            TrackLine::Special {
                position,
                code,
                length,
            }
        }
        _ => {
            // a bare `E` carries nothing to keep
            let parsed: IResult<&str, &str> = preceded(space1, parse_token).parse(body);
            let Ok((_, name)) = parsed else {
                log::debug!("Skipping event line without name '{line}'");
                return Ok(None);
            };
            TrackLine::Event { position, name }
        }
    };
    Ok(Some(track_line))
}

/// Decode the lines of one track section.
///
/// Flag lines are applied once every note is in place, so a flag may precede
/// its notes. Any malformed line fails the whole track.
pub fn decode<I, S>(lines: I) -> Result<Timeline, ChartError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut timeline = Timeline::new();
    let mut flag_lines: Vec<(u32, i32)> = Vec::new();

    for (index, line) in lines.into_iter().enumerate() {
        let line = line.as_ref();
        let parsed = parse_track_line(line).map_err(|reason| ChartError::MalformedLine {
            line_number: index + 1,
            line: line.trim().to_string(),
            reason,
        })?;
        match parsed {
            Some(TrackLine::Note {
                position,
                code,
                length,
            }) => match FretType::from_code(code) {
                Some(fret_type) => {
                    timeline.insert(Note::new(position, fret_type, length));
                }
                None => flag_lines.push((position, code)),
            },
            Some(TrackLine::Special {
                position,
                code: STAR_POWER_CODE,
                length,
            }) => {
                timeline.insert(StarPower::new(position, length));
            }
            Some(TrackLine::Special { position, code, .. }) => {
                log::debug!("Ignoring special phrase {code} at {position}");
            }
            Some(TrackLine::Event { position, name }) => {
                timeline.insert(ChartEvent::new(position, name));
            }
            None => {}
        }
    }

    for (position, code) in flag_lines {
        match NoteFlags::from_code(code) {
            Some(flag) => {
                timeline.add_flags_at_position(position, flag);
            }
            None => log::debug!("Ignoring note code {code} at {position}"),
        }
    }

    Ok(timeline)
}

/// Track event names are read back up to the first blank
fn is_single_token(name: &str) -> bool {
    !name.is_empty() && !name.contains(char::is_whitespace)
}

/// Encode a track in timeline order.
///
/// Flags are written once per position, after the last note sitting there,
/// combining the flags of every note at that position. Events whose name
/// would not read back as a single token are left out.
pub fn encode(timeline: &Timeline) -> Vec<String> {
    let mut lines = Vec::with_capacity(timeline.len());
    for (index, object) in timeline.iter().enumerate() {
        match object {
            ChartObject::Note(note) => {
                lines.push(format!(
                    "{} = {NOTE_MARKER} {} {}",
                    note.position,
                    note.fret_type.code(),
                    note.sustain_length
                ));
                if timeline.is_last_note_at_position(index) {
                    let flags = timeline
                        .notes_at_position(note.position)
                        .fold(NoteFlags::NONE, |acc, n| acc.union(n.flags));
                    for code in flags.codes() {
                        lines.push(format!("{} = {NOTE_MARKER} {code} 0", note.position));
                    }
                }
            }
            ChartObject::StarPower(sp) => lines.push(format!(
                "{} = {SPECIAL_MARKER} {STAR_POWER_CODE} {}",
                sp.position, sp.length
            )),
            ChartObject::Event(event) if is_single_token(&event.event_name) => lines.push(
                format!("{} = {EVENT_MARKER} {}", event.position, event.event_name),
            ),
            ChartObject::Event(event) => log::warn!(
                "Dropping track event '{}' at {}, names must be a single word",
                event.event_name,
                event.position
            ),
        }
    }
    lines
}
