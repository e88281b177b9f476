use crate::chart::timeline::Timeline;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Resolution used by most charts (ticks per beat)
pub const DEFAULT_RESOLUTION: u32 = 192;
/// Tempo assumed when a song carries no tempo change, in milli-BPM
pub const DEFAULT_TEMPO: u32 = 120_000;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Instrument {
    Guitar,
    GuitarCoop,
    Bass,
    Rhythm,
    Keys,
}

impl Instrument {
    pub const ALL: [Self; 5] = [
        Self::Guitar,
        Self::GuitarCoop,
        Self::Bass,
        Self::Rhythm,
        Self::Keys,
    ];

    /// Suffix of the chart section name, e.g. `Single` in `ExpertSingle`
    pub const fn section_suffix(self) -> &'static str {
        match self {
            Self::Guitar => "Single",
            Self::GuitarCoop => "DoubleGuitar",
            Self::Bass => "DoubleBass",
            Self::Rhythm => "DoubleRhythm",
            Self::Keys => "Keyboard",
        }
    }

    /// Name of the MIDI track holding this instrument
    pub const fn midi_track_name(self) -> &'static str {
        match self {
            Self::Guitar => "PART GUITAR",
            Self::GuitarCoop => "PART GUITAR COOP",
            Self::Bass => "PART BASS",
            Self::Rhythm => "PART RHYTHM",
            Self::Keys => "PART KEYS",
        }
    }

    pub fn from_midi_track_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|i| i.midi_track_name().eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Expert,
}

impl Difficulty {
    pub const ALL: [Self; 4] = [Self::Easy, Self::Medium, Self::Hard, Self::Expert];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Easy => "Easy",
            Self::Medium => "Medium",
            Self::Hard => "Hard",
            Self::Expert => "Expert",
        }
    }

    /// Difficulties above this one, nearest first
    pub fn harder(self) -> impl Iterator<Item = Self> {
        Self::ALL.into_iter().filter(move |d| *d > self)
    }
}

/// Chart section name for a track, e.g. `ExpertSingle`
pub fn section_name(instrument: Instrument, difficulty: Difficulty) -> String {
    format!("{}{}", difficulty.name(), instrument.section_suffix())
}

/// Parse a chart section name back into its track key
pub fn parse_section_name(name: &str) -> Option<(Instrument, Difficulty)> {
    Difficulty::ALL.into_iter().find_map(|difficulty| {
        let suffix = name.strip_prefix(difficulty.name())?;
        Instrument::ALL
            .into_iter()
            .find(|i| i.section_suffix() == suffix)
            .map(|instrument| (instrument, difficulty))
    })
}

/// Audio stem of a song package
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AudioInstrument {
    Song,
    Guitar,
    Bass,
    Rhythm,
    Keys,
    Drum,
    Drums2,
    Drums3,
    Drums4,
    Vocals,
    Crowd,
}

impl AudioInstrument {
    pub const ALL: [Self; 11] = [
        Self::Song,
        Self::Guitar,
        Self::Bass,
        Self::Rhythm,
        Self::Keys,
        Self::Drum,
        Self::Drums2,
        Self::Drums3,
        Self::Drums4,
        Self::Vocals,
        Self::Crowd,
    ];

    /// Conventional file name of the stem inside a song folder
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Song => "song.ogg",
            Self::Guitar => "guitar.ogg",
            Self::Bass => "bass.ogg",
            Self::Rhythm => "rhythm.ogg",
            Self::Keys => "keys.ogg",
            Self::Drum => "drums_1.ogg",
            Self::Drums2 => "drums_2.ogg",
            Self::Drums3 => "drums_3.ogg",
            Self::Drums4 => "drums_4.ogg",
            Self::Vocals => "vocals.ogg",
            Self::Crowd => "crowd.ogg",
        }
    }

    /// Key of the stem in the `[Song]` section
    pub const fn stream_key(self) -> &'static str {
        match self {
            Self::Song => "MusicStream",
            Self::Guitar => "GuitarStream",
            Self::Bass => "BassStream",
            Self::Rhythm => "RhythmStream",
            Self::Keys => "KeysStream",
            Self::Drum => "DrumStream",
            Self::Drums2 => "Drum2Stream",
            Self::Drums3 => "Drum3Stream",
            Self::Drums4 => "Drum4Stream",
            Self::Vocals => "VocalStream",
            Self::Crowd => "CrowdStream",
        }
    }

    pub fn from_stream_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.stream_key() == key)
    }
}

impl fmt::Display for AudioInstrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub name: String,
    pub artist: String,
    pub charter: String,
    pub album: String,
    pub year: String,
    pub genre: String,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TempoChange {
    pub position: u32,
    /// Beats per minute times 1000
    pub milli_bpm: u32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TimeSignature {
    pub position: u32,
    pub numerator: u32,
    /// Denominator as a power of two (2 = quarter note)
    pub denominator_exp: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncTrack {
    pub tempos: Vec<TempoChange>,
    pub time_signatures: Vec<TimeSignature>,
}

impl SyncTrack {
    /// Seconds elapsed at `tick`, walking the tempo map
    pub fn tick_to_seconds(&self, tick: u32, resolution: u32) -> f64 {
        let resolution = f64::from(resolution.max(1));
        let mut seconds = 0.0;
        let mut last_tick = 0;
        let mut milli_bpm = DEFAULT_TEMPO;
        for tempo in self.tempos.iter().take_while(|t| t.position <= tick) {
            seconds += ticks_to_seconds(tempo.position - last_tick, milli_bpm, resolution);
            last_tick = tempo.position;
            milli_bpm = tempo.milli_bpm;
        }
        seconds + ticks_to_seconds(tick - last_tick, milli_bpm, resolution)
    }
}

fn ticks_to_seconds(ticks: u32, milli_bpm: u32, resolution: f64) -> f64 {
    let beats = f64::from(ticks) / resolution;
    beats * 60_000.0 / f64::from(milli_bpm.max(1))
}

/// Song level event, e.g. sections and lyrics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalEvent {
    pub position: u32,
    pub text: String,
}

impl GlobalEvent {
    pub fn new(position: u32, text: impl Into<String>) -> Self {
        Self {
            position,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Song {
    /// Ticks per beat
    pub resolution: u32,
    pub metadata: Metadata,
    /// Audio offset in seconds
    pub offset: f64,
    /// Length of the audio in seconds, 0 when unknown
    pub audio_length: f64,
    pub sync_track: SyncTrack,
    pub events: Vec<GlobalEvent>,
    tracks: BTreeMap<(Instrument, Difficulty), Timeline>,
    audio_locations: BTreeMap<AudioInstrument, PathBuf>,
}

impl Song {
    pub fn new(resolution: u32) -> Self {
        Self {
            resolution,
            ..Self::default()
        }
    }

    pub fn tick_to_seconds(&self, tick: u32) -> f64 {
        self.sync_track.tick_to_seconds(tick, self.resolution)
    }

    pub fn track(&self, instrument: Instrument, difficulty: Difficulty) -> Option<&Timeline> {
        self.tracks.get(&(instrument, difficulty))
    }

    /// Track for the given key, created empty on first access
    pub fn track_mut(&mut self, instrument: Instrument, difficulty: Difficulty) -> &mut Timeline {
        self.tracks.entry((instrument, difficulty)).or_default()
    }

    pub fn set_track(
        &mut self,
        instrument: Instrument,
        difficulty: Difficulty,
        timeline: Timeline,
    ) {
        self.tracks.insert((instrument, difficulty), timeline);
    }

    /// Tracks in section order, empty ones included
    pub fn tracks(&self) -> impl Iterator<Item = (Instrument, Difficulty, &Timeline)> {
        self.tracks.iter().map(|((i, d), t)| (*i, *d, t))
    }

    pub fn note_count(&self) -> usize {
        self.tracks.values().map(Timeline::note_count).sum()
    }

    pub fn set_audio_location(&mut self, channel: AudioInstrument, path: impl AsRef<Path>) {
        self.audio_locations
            .insert(channel, path.as_ref().to_path_buf());
    }

    pub fn audio_location(&self, channel: AudioInstrument) -> Option<&Path> {
        self.audio_locations.get(&channel).map(PathBuf::as_path)
    }

    pub fn audio_locations(&self) -> impl Iterator<Item = (AudioInstrument, &Path)> {
        self.audio_locations
            .iter()
            .map(|(channel, path)| (*channel, path.as_path()))
    }
}
