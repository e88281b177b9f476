use crate::chart::chart_object::{ChartObject, NoteFlags};
use crate::chart::song::{section_name, Difficulty, Instrument, Song, DEFAULT_TEMPO};
use crate::chart::timeline::Timeline;
use crate::config::ExportConfig;
use crate::export::error_report::ErrorReport;
use crate::export::SongWriter;
use crate::parser::chart_codec;
use crate::parser::chart_parser::{EVENTS_SECTION, SONG_SECTION, SYNC_TRACK_SECTION};
use crate::ChartError;
use std::fmt::Write as _;
use std::path::Path;

const LYRIC_PREFIX: &str = "lyric ";
/// Vocal markup without meaning in a chart lyric
const LYRIC_MARKUP: [char; 6] = ['#', '^', '*', '%', '$', '/'];

/// Writes songs as `.chart` text
#[derive(Debug, Default, Copy, Clone)]
pub struct ChartWriter;

impl SongWriter for ChartWriter {
    fn write_song(
        &self,
        song: &Song,
        config: &ExportConfig,
        path: &Path,
    ) -> Result<ErrorReport, ChartError> {
        let (text, report) = render_chart(song, config);
        write_atomically(path, text.as_bytes())?;
        log::debug!("Wrote {} bytes to {path:?}", text.len());
        Ok(report)
    }
}

/// Write to a sibling temporary file then move it in place,
/// an interrupted export never leaves a truncated chart behind.
pub fn write_atomically(path: &Path, data: &[u8]) -> Result<(), ChartError> {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);
    std::fs::write(&tmp_path, data)?;
    if let Err(err) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(err.into());
    }
    Ok(())
}

/// Position scaling between the song resolution and the exported one
#[derive(Debug, Copy, Clone)]
struct Rescaler {
    source: u64,
    target: u64,
}

impl Rescaler {
    fn new(source: u32, target: u32) -> Self {
        let source = u64::from(source.max(1));
        let target = if target == 0 { source } else { u64::from(target) };
        Self { source, target }
    }

    const fn is_identity(&self) -> bool {
        self.source == self.target
    }

    /// Scaled tick, rounded to nearest, and whether it was exact
    fn scale(&self, tick: u32) -> (u32, bool) {
        let scaled = u64::from(tick) * self.target;
        let rounded = (scaled + self.source / 2) / self.source;
        (
            u32::try_from(rounded).unwrap_or(u32::MAX),
            scaled % self.source == 0,
        )
    }

    fn tick(&self, tick: u32) -> u32 {
        self.scale(tick).0
    }
}

/// Render the full chart text together with the export report
pub fn render_chart(song: &Song, config: &ExportConfig) -> (String, ErrorReport) {
    let mut report = ErrorReport::new();
    let rescaler = Rescaler::new(song.resolution, config.target_resolution);
    let mut out = String::new();

    write_song_section(&mut out, song, rescaler);
    write_sync_track(&mut out, song, rescaler);
    write_events(&mut out, song, config, rescaler);

    for instrument in Instrument::ALL {
        for difficulty in Difficulty::ALL.into_iter().rev() {
            let exported = export_track(song, instrument, difficulty, config, &mut report);
            let Some(timeline) = exported else {
                continue;
            };
            let timeline = rescale_track(&timeline, rescaler, &mut report, instrument, difficulty);
            let timeline = if config.forced {
                timeline
            } else {
                strip_forced(timeline)
            };
            open_section(&mut out, &section_name(instrument, difficulty));
            for line in chart_codec::encode(&timeline) {
                let _ = writeln!(out, "  {line}");
            }
            close_section(&mut out);
        }
    }
    (out, report)
}

fn open_section(out: &mut String, name: &str) {
    let _ = writeln!(out, "[{name}]");
    out.push_str("{\n");
}

fn close_section(out: &mut String) {
    out.push_str("}\n");
}

fn write_song_section(out: &mut String, song: &Song, rescaler: Rescaler) {
    let metadata = &song.metadata;
    open_section(out, SONG_SECTION);
    let _ = writeln!(out, "  Name = \"{}\"", metadata.name);
    let _ = writeln!(out, "  Artist = \"{}\"", metadata.artist);
    let _ = writeln!(out, "  Charter = \"{}\"", metadata.charter);
    let _ = writeln!(out, "  Album = \"{}\"", metadata.album);
    if metadata.year.is_empty() {
        out.push_str("  Year = \"\"\n");
    } else {
        let _ = writeln!(out, "  Year = \", {}\"", metadata.year);
    }
    let _ = writeln!(out, "  Offset = {}", song.offset);
    let _ = writeln!(out, "  Resolution = {}", rescaler.target);
    let _ = writeln!(out, "  Genre = \"{}\"", metadata.genre);
    out.push_str("  MediaType = \"cd\"\n");
    for (channel, path) in song.audio_locations() {
        // streams are relative to the chart folder
        let file_name = path
            .file_name()
            .map_or_else(|| path.to_string_lossy(), |name| name.to_string_lossy());
        let _ = writeln!(out, "  {} = \"{file_name}\"", channel.stream_key());
    }
    close_section(out);
}

fn write_sync_track(out: &mut String, song: &Song, rescaler: Rescaler) {
    open_section(out, SYNC_TRACK_SECTION);
    let sync_track = &song.sync_track;
    let mut lines: Vec<(u32, u8, String)> = Vec::new();
    for ts in &sync_track.time_signatures {
        let line = if ts.denominator_exp == 2 {
            format!("TS {}", ts.numerator)
        } else {
            format!("TS {} {}", ts.numerator, ts.denominator_exp)
        };
        lines.push((rescaler.tick(ts.position), 0, line));
    }
    for tempo in &sync_track.tempos {
        lines.push((rescaler.tick(tempo.position), 1, format!("B {}", tempo.milli_bpm)));
    }
    // players expect both a time signature and a tempo at tick 0
    if !sync_track.time_signatures.iter().any(|ts| ts.position == 0) {
        lines.push((0, 0, "TS 4".to_string()));
    }
    if !sync_track.tempos.iter().any(|t| t.position == 0) {
        lines.push((0, 1, format!("B {DEFAULT_TEMPO}")));
    }
    lines.sort_by_key(|(position, kind, _)| (*position, *kind));
    for (position, _, line) in lines {
        let _ = writeln!(out, "  {position} = {line}");
    }
    close_section(out);
}

fn write_events(out: &mut String, song: &Song, config: &ExportConfig, rescaler: Rescaler) {
    open_section(out, EVENTS_SECTION);
    for event in &song.events {
        let text = if config.substitute_lyric_chars {
            match substitute_lyric_chars(&event.text) {
                Some(text) => text,
                None => continue,
            }
        } else {
            event.text.clone()
        };
        let _ = writeln!(out, "  {} = E \"{text}\"", rescaler.tick(event.position));
    }
    close_section(out);
}

/// Clean up a `lyric` event for chart players, `None` when nothing is left to show.
/// Other events are returned untouched.
pub fn substitute_lyric_chars(text: &str) -> Option<String> {
    let Some(lyric) = text.strip_prefix(LYRIC_PREFIX) else {
        return Some(text.to_string());
    };
    let lyric: String = lyric
        .chars()
        .filter(|c| !LYRIC_MARKUP.contains(c))
        .map(|c| match c {
            '=' => '-',
            '"' => '\'',
            c => c,
        })
        .collect();
    let lyric = lyric.trim();
    if lyric.is_empty() || lyric == "+" {
        None
    } else {
        Some(format!("{LYRIC_PREFIX}{lyric}"))
    }
}

/// Track to write, copied down from the nearest harder difficulty when empty
fn export_track(
    song: &Song,
    instrument: Instrument,
    difficulty: Difficulty,
    config: &ExportConfig,
    report: &mut ErrorReport,
) -> Option<Timeline> {
    let own = song
        .track(instrument, difficulty)
        .filter(|t| t.note_count() > 0);
    if let Some(timeline) = own {
        return Some(timeline.clone());
    }
    if !config.copy_down_empty_difficulty {
        return None;
    }
    let (source, timeline) = difficulty.harder().find_map(|harder| {
        song.track(instrument, harder)
            .filter(|t| t.note_count() > 0)
            .map(|t| (harder, t))
    })?;
    report.add(format!(
        "{}: empty, copied from {}",
        section_name(instrument, difficulty),
        section_name(instrument, source)
    ));
    Some(timeline.clone())
}

fn rescale_track(
    timeline: &Timeline,
    rescaler: Rescaler,
    report: &mut ErrorReport,
    instrument: Instrument,
    difficulty: Difficulty,
) -> Timeline {
    if rescaler.is_identity() {
        return timeline.clone();
    }
    let section = section_name(instrument, difficulty);
    timeline
        .iter()
        .map(|object| {
            let mut object = object.clone();
            let (position, exact) = rescaler.scale(object.position());
            if !exact {
                report.add(format!(
                    "{section}: {} at {} rounded to {position} at resolution {}",
                    object.kind(),
                    object.position(),
                    rescaler.target
                ));
            }
            object.set_position(position);
            match &mut object {
                ChartObject::Note(note) => note.sustain_length = rescaler.tick(note.sustain_length),
                ChartObject::StarPower(sp) => sp.length = rescaler.tick(sp.length),
                ChartObject::Event(_) => {}
            }
            object
        })
        .collect()
}

fn strip_forced(timeline: Timeline) -> Timeline {
    timeline
        .iter()
        .cloned()
        .map(|mut object| {
            if let ChartObject::Note(note) = &mut object {
                note.flags = note.flags.difference(NoteFlags::FORCED);
            }
            object
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::chart_object::{ChartEvent, FretType, Note, StarPower};
    use crate::chart::song::{AudioInstrument, GlobalEvent, TempoChange};
    use crate::config::OutputFormat;
    use crate::parser::chart_parser::parse_chart_str;

    fn sample_song() -> Song {
        let mut song = Song::new(480);
        song.metadata.name = "Song".to_string();
        song.metadata.year = "2006".to_string();
        song.sync_track.tempos.push(TempoChange {
            position: 0,
            milli_bpm: 150_000,
        });
        song.events.push(GlobalEvent::new(0, "section Intro"));
        song.events.push(GlobalEvent::new(480, "lyric Hel=#"));
        song.events.push(GlobalEvent::new(600, "lyric +"));
        song.set_audio_location(AudioInstrument::Song, "/tmp/out/song.ogg");

        let expert = song.track_mut(Instrument::Guitar, Difficulty::Expert);
        expert.insert(Note::new(480, FretType::Green, 0).with_flags(NoteFlags::FORCED));
        expert.insert(Note::new(480, FretType::Red, 0).with_flags(NoteFlags::FORCED));
        expert.insert(Note::new(960, FretType::Yellow, 480));
        expert.insert(StarPower::new(480, 960));
        expert.insert(ChartEvent::new(960, "solo"));
        song
    }

    #[test]
    fn test_render_chart_rescales() {
        let song = sample_song();
        let config = ExportConfig {
            copy_down_empty_difficulty: false,
            ..ExportConfig::default()
        };
        let (text, report) = render_chart(&song, &config);
        assert!(!report.has_errors(), "{report}");

        let expected_track = "[ExpertSingle]
{
  192 = N 0 0
  192 = N 1 0
  192 = N 5 0
  192 = S 2 384
  384 = N 2 192
  384 = E solo
}
";
        assert!(text.contains(expected_track), "{text}");
        assert!(text.contains("  Resolution = 192\n"));
        assert!(text.contains("  Year = \", 2006\"\n"));
        assert!(text.contains("  MusicStream = \"song.ogg\"\n"));
        assert!(text.contains("  0 = TS 4\n  0 = B 150000\n"));
        assert!(text.contains("  192 = E \"lyric Hel-\"\n"));
        assert!(!text.contains("lyric +"));
        assert!(!text.contains("HardSingle"));
    }

    #[test]
    fn test_rendered_chart_reads_back() {
        let song = sample_song();
        let config = ExportConfig {
            target_resolution: 0,
            ..ExportConfig::default()
        };
        let (text, report) = render_chart(&song, &config);
        assert_eq!(
            report.entries(),
            &[
                "HardSingle: empty, copied from ExpertSingle",
                "MediumSingle: empty, copied from ExpertSingle",
                "EasySingle: empty, copied from ExpertSingle",
            ]
        );
        let read = parse_chart_str(&text).unwrap();
        assert_eq!(read.resolution, 480);
        assert_eq!(read.metadata.year, "2006");
        assert_eq!(
            read.track(Instrument::Guitar, Difficulty::Expert),
            song.track(Instrument::Guitar, Difficulty::Expert)
        );
        // copied down to every easier difficulty
        for difficulty in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
            assert_eq!(
                read.track(Instrument::Guitar, difficulty).unwrap().note_count(),
                3
            );
        }
        assert!(read.track(Instrument::Bass, Difficulty::Expert).is_none());
    }

    #[test]
    fn test_inexact_rescale_is_reported() {
        let mut song = Song::new(480);
        let hard = song.track_mut(Instrument::Bass, Difficulty::Hard);
        hard.insert(Note::new(1, FretType::Green, 0));
        hard.insert(Note::new(480, FretType::Red, 0));
        hard.insert(ChartEvent::new(601, "solo"));
        let config = ExportConfig {
            copy_down_empty_difficulty: false,
            ..ExportConfig::default()
        };
        let (text, report) = render_chart(&song, &config);
        assert_eq!(
            report.entries(),
            &[
                "HardDoubleBass: note at 1 rounded to 0 at resolution 192",
                "HardDoubleBass: event at 601 rounded to 240 at resolution 192",
            ]
        );
        assert!(text.contains("  0 = N 0 0\n"));
    }

    #[test]
    fn test_forced_flags_dropped() {
        let config = ExportConfig {
            forced: false,
            format: OutputFormat::Msce,
            ..ExportConfig::default()
        };
        let (text, _) = render_chart(&sample_song(), &config);
        assert!(!text.contains("= N 5 0"));
    }

    #[test]
    fn test_substitute_lyric_chars() {
        assert_eq!(
            substitute_lyric_chars("lyric say\"hi\"="),
            Some("lyric say'hi'-".to_string())
        );
        assert_eq!(substitute_lyric_chars("lyric $#"), None);
        assert_eq!(
            substitute_lyric_chars("section Verse #1"),
            Some("section Verse #1".to_string())
        );
    }

    #[test]
    fn test_write_atomically_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.chart");
        write_atomically(&path, b"first").unwrap();
        write_atomically(&path, b"second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
