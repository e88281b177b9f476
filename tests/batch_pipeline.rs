//! End to end batch conversions over temporary song libraries.

use chartconv::chart::song::AudioInstrument;
use chartconv::parser::chart_parser::read_chart;
use chartconv::{
    BatchConverter, BatchOptions, ChartError, ChartWriter, Difficulty, ExportConfig, FretType,
    Instrument, MidReader, Note, Song, SongReader,
};
use midly::num::{u15, u24, u28, u4, u7};
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
};
use std::fs;
use std::path::Path;

fn init_logger() {
    env_logger::builder()
        .is_test(true)
        .try_init()
        .unwrap_or_default();
}

fn meta(delta: u32, message: MetaMessage<'_>) -> TrackEvent<'_> {
    TrackEvent {
        delta: u28::from(delta),
        kind: TrackEventKind::Meta(message),
    }
}

fn note(delta: u32, key: u8, vel: u8) -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::from(delta),
        kind: TrackEventKind::Midi {
            channel: u4::from(0),
            message: MidiMessage::NoteOn {
                key: u7::from(key),
                vel: u7::from(vel),
            },
        },
    }
}

/// A two note expert guitar song at 480 ticks per beat
fn midi_song(name: &'static [u8]) -> Vec<u8> {
    let sync: Track = vec![
        meta(0, MetaMessage::TrackName(name)),
        meta(0, MetaMessage::Tempo(u24::from(500_000))),
        meta(0, MetaMessage::TimeSignature(4, 2, 24, 8)),
        meta(0, MetaMessage::EndOfTrack),
    ];
    let guitar: Track = vec![
        meta(0, MetaMessage::TrackName(b"PART GUITAR")),
        note(0, 96, 100),
        note(120, 96, 0),
        note(360, 98, 100),
        note(960, 98, 0),
        meta(0, MetaMessage::EndOfTrack),
    ];
    let smf = Smf {
        header: Header {
            format: Format::Parallel,
            timing: Timing::Metrical(u15::from(480)),
        },
        tracks: vec![sync, guitar],
    };
    let mut data = Vec::new();
    smf.write(&mut data).unwrap();
    data
}

fn write(path: &Path, data: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, data).unwrap();
}

fn default_converter(options: BatchOptions) -> BatchConverter<MidReader, ChartWriter> {
    BatchConverter::with_defaults(ExportConfig::default(), options)
}

#[test]
fn test_converts_midi_library() {
    init_logger();
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write(&input.path().join("Song A/notes.mid"), &midi_song(b"Song A"));
    write(&input.path().join("Song A/song.ogg"), b"music");
    write(
        &input.path().join("Song A/song.ini"),
        b"[song]\nartist = The Band\ndelay = 500\n",
    );

    let summary = default_converter(BatchOptions::default())
        .run(input.path(), output.path())
        .unwrap();
    assert_eq!(summary.converted(), 1);

    let chart_path = output.path().join("Song A/notes.chart");
    let song = read_chart(&chart_path).unwrap();
    assert_eq!(song.resolution, 192);
    assert_eq!(song.metadata.name, "Song A");
    assert_eq!(song.metadata.artist, "The Band");
    assert!((song.offset - 0.5).abs() < 1e-9);
    assert_eq!(
        song.audio_location(AudioInstrument::Song),
        Some(Path::new("song.ogg"))
    );

    let expert: Vec<_> = song
        .track(Instrument::Guitar, Difficulty::Expert)
        .unwrap()
        .notes()
        .cloned()
        .collect();
    assert_eq!(
        expert,
        vec![
            Note::new(0, FretType::Green, 0),
            Note::new(192, FretType::Yellow, 384),
        ]
    );
    // empty difficulties are filled from expert
    for difficulty in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
        let notes = song.track(Instrument::Guitar, difficulty).unwrap();
        assert_eq!(notes.note_count(), 2);
    }
}

#[test]
fn test_discovery_depth() {
    init_logger();
    let input = tempfile::tempdir().unwrap();
    write(&input.path().join("Top/notes.mid"), &midi_song(b"Top"));
    write(&input.path().join("pack/Nested/notes.mid"), &midi_song(b"Nested"));

    let output = tempfile::tempdir().unwrap();
    let summary = default_converter(BatchOptions::default())
        .run(input.path(), output.path())
        .unwrap();
    assert_eq!(summary.converted(), 1);
    assert!(!output.path().join("Nested").exists());

    let output = tempfile::tempdir().unwrap();
    let options = BatchOptions {
        recursive: true,
        ..BatchOptions::default()
    };
    let summary = default_converter(options)
        .run(input.path(), output.path())
        .unwrap();
    assert_eq!(summary.converted(), 2);
    assert!(output.path().join("Nested/notes.chart").exists());
    assert!(output.path().join("Top/notes.chart").exists());
}

#[test]
fn test_empty_library() {
    init_logger();
    let input = tempfile::tempdir().unwrap();
    fs::create_dir_all(input.path().join("no songs here")).unwrap();
    let output = tempfile::tempdir().unwrap();
    let summary = default_converter(BatchOptions::default())
        .run(input.path(), output.path())
        .unwrap();
    assert!(summary.packages.is_empty());
    assert_eq!(summary.converted(), 0);
}

/// Reads midi files, refusing the second package
struct FailSecond;

impl SongReader for FailSecond {
    fn read_song(&self, path: &Path) -> Result<Song, ChartError> {
        if path.to_string_lossy().contains("2 -") {
            return Err(ChartError::UnusableSong("no playable notes".to_string()));
        }
        MidReader.read_song(path)
    }
}

#[test]
fn test_partial_failure_is_isolated() {
    init_logger();
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    for name in ["1 - First", "2 - Second", "3 - Third"] {
        write(&input.path().join(name).join("notes.mid"), &midi_song(b"x"));
    }

    let converter = BatchConverter::new(
        FailSecond,
        ChartWriter,
        ExportConfig::default(),
        BatchOptions::default(),
    );
    let summary = converter.run(input.path(), output.path()).unwrap();
    assert_eq!(summary.converted(), 2);
    assert_eq!(summary.skipped(), 1);
    assert_eq!(summary.packages[1].directory_name, "2 - Second");
    assert!(summary.packages[1].result.is_err());
    assert!(output.path().join("1 - First/notes.chart").exists());
    assert!(!output.path().join("2 - Second").exists());
    assert!(output.path().join("3 - Third/notes.chart").exists());
}

#[test]
fn test_unusable_midi_is_skipped() {
    init_logger();
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write(&input.path().join("Broken/notes.mid"), b"not a midi file");
    write(&input.path().join("Fine/notes.mid"), &midi_song(b"Fine"));

    let summary = default_converter(BatchOptions::default())
        .run(input.path(), output.path())
        .unwrap();
    assert_eq!(summary.converted(), 1);
    assert!(matches!(
        summary.packages[0].result,
        Err(ChartError::MidiError(_))
    ));
}

#[test]
fn test_rerun_is_idempotent() {
    init_logger();
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write(&input.path().join("Song/notes.mid"), &midi_song(b"Song"));
    write(&input.path().join("Song/album.png"), b"first art");

    let converter = default_converter(BatchOptions::default());
    converter.run(input.path(), output.path()).unwrap();
    let chart_path = output.path().join("Song/notes.chart");
    let first = fs::read(&chart_path).unwrap();

    // assets are replaced by the newer source
    write(&input.path().join("Song/album.png"), b"second art");
    let summary = converter.run(input.path(), output.path()).unwrap();
    assert_eq!(summary.converted(), 1);
    assert_eq!(fs::read(&chart_path).unwrap(), first);
    assert_eq!(
        fs::read(output.path().join("Song/album.png")).unwrap(),
        b"second art"
    );
    assert!(!output.path().join("Song/notes.chart.tmp").exists());
}

#[test]
fn test_invalid_invocation() {
    init_logger();
    let output = tempfile::tempdir().unwrap();
    let result = default_converter(BatchOptions::default())
        .run(&output.path().join("missing"), output.path());
    assert!(matches!(result, Err(ChartError::InvalidInvocation(_))));
}
