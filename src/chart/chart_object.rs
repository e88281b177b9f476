use std::cmp::Ordering;
use std::fmt;

/// Number of playable lanes on a five-fret track
pub const LANE_COUNT: i32 = 5;

/// Flag code marking a forced note in the text format
pub const FORCED_FLAG_CODE: i32 = 5;
/// Flag code marking a tap note in the text format
pub const TAP_FLAG_CODE: i32 = 6;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FretType {
    Green,
    Red,
    Yellow,
    Blue,
    Orange,
}

impl FretType {
    pub const ALL: [Self; 5] = [
        Self::Green,
        Self::Red,
        Self::Yellow,
        Self::Blue,
        Self::Orange,
    ];

    /// Lane code used by the text format, 0 to 4
    pub const fn code(self) -> i32 {
        match self {
            Self::Green => 0,
            Self::Red => 1,
            Self::Yellow => 2,
            Self::Blue => 3,
            Self::Orange => 4,
        }
    }

    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Green),
            1 => Some(Self::Red),
            2 => Some(Self::Yellow),
            3 => Some(Self::Blue),
            4 => Some(Self::Orange),
            _ => None,
        }
    }
}

/// Set of note rendering modifiers.
///
/// Flags belong to a position rather than to a single note: every note sharing
/// a position is expected to carry the same set once a track is decoded.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct NoteFlags(u8);

impl NoteFlags {
    pub const NONE: Self = Self(0);
    pub const FORCED: Self = Self(0b01);
    pub const TAP: Self = Self(0b10);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Flag codes present in this set, in the order they are written out
    pub fn codes(self) -> impl Iterator<Item = i32> {
        [(Self::FORCED, FORCED_FLAG_CODE), (Self::TAP, TAP_FLAG_CODE)]
            .into_iter()
            .filter(move |(flag, _)| self.contains(*flag))
            .map(|(_, code)| code)
    }

    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            FORCED_FLAG_CODE => Some(Self::FORCED),
            TAP_FLAG_CODE => Some(Self::TAP),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub position: u32,
    pub fret_type: FretType,
    pub sustain_length: u32,
    pub flags: NoteFlags,
}

impl Note {
    pub const fn new(position: u32, fret_type: FretType, sustain_length: u32) -> Self {
        Self {
            position,
            fret_type,
            sustain_length,
            flags: NoteFlags::NONE,
        }
    }

    pub const fn with_flags(mut self, flags: NoteFlags) -> Self {
        self.flags = flags;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StarPower {
    pub position: u32,
    pub length: u32,
}

impl StarPower {
    pub const fn new(position: u32, length: u32) -> Self {
        Self { position, length }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartEvent {
    pub position: u32,
    pub event_name: String,
}

impl ChartEvent {
    pub fn new(position: u32, event_name: impl Into<String>) -> Self {
        Self {
            position,
            event_name: event_name.into(),
        }
    }
}

/// Discriminant of a chart object, also the tie-break between kinds sharing a position
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectKind {
    Note,
    StarPower,
    Event,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Note => "note",
            Self::StarPower => "star power",
            Self::Event => "event",
        };
        f.write_str(name)
    }
}

/// A timed element of a track
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartObject {
    Note(Note),
    StarPower(StarPower),
    Event(ChartEvent),
}

impl ChartObject {
    pub const fn position(&self) -> u32 {
        match self {
            Self::Note(note) => note.position,
            Self::StarPower(sp) => sp.position,
            Self::Event(event) => event.position,
        }
    }

    pub const fn kind(&self) -> ObjectKind {
        match self {
            Self::Note(_) => ObjectKind::Note,
            Self::StarPower(_) => ObjectKind::StarPower,
            Self::Event(_) => ObjectKind::Event,
        }
    }

    pub const fn as_note(&self) -> Option<&Note> {
        match self {
            Self::Note(note) => Some(note),
            _ => None,
        }
    }

    pub fn as_note_mut(&mut self) -> Option<&mut Note> {
        match self {
            Self::Note(note) => Some(note),
            _ => None,
        }
    }

    pub(crate) fn set_position(&mut self, position: u32) {
        match self {
            Self::Note(note) => note.position = position,
            Self::StarPower(sp) => sp.position = position,
            Self::Event(event) => event.position = position,
        }
    }

    /// Ordering used by the timeline: position, then kind, then lane for notes.
    /// Objects comparing equal keep their insertion order.
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        self.position()
            .cmp(&other.position())
            .then_with(|| self.kind().cmp(&other.kind()))
            .then_with(|| match (self, other) {
                (Self::Note(a), Self::Note(b)) => a.fret_type.cmp(&b.fret_type),
                _ => Ordering::Equal,
            })
    }
}

impl From<Note> for ChartObject {
    fn from(note: Note) -> Self {
        Self::Note(note)
    }
}

impl From<StarPower> for ChartObject {
    fn from(sp: StarPower) -> Self {
        Self::StarPower(sp)
    }
}

impl From<ChartEvent> for ChartObject {
    fn from(event: ChartEvent) -> Self {
        Self::Event(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_codes() {
        let flags = NoteFlags::TAP.union(NoteFlags::FORCED);
        assert_eq!(flags.codes().collect::<Vec<_>>(), vec![5, 6]);
        assert!(NoteFlags::NONE.codes().next().is_none());
        assert_eq!(NoteFlags::from_code(7), None);
        assert_eq!(flags.difference(NoteFlags::FORCED), NoteFlags::TAP);
    }

    #[test]
    fn test_sort_cmp_tie_break() {
        let note = ChartObject::from(Note::new(10, FretType::Blue, 0));
        let lower_note = ChartObject::from(Note::new(10, FretType::Green, 0));
        let sp = ChartObject::from(StarPower::new(10, 100));
        let event = ChartObject::from(ChartEvent::new(5, "solo"));
        assert_eq!(lower_note.sort_cmp(&note), Ordering::Less);
        assert_eq!(note.sort_cmp(&sp), Ordering::Less);
        assert_eq!(event.sort_cmp(&note), Ordering::Less);
        assert_eq!(sp.sort_cmp(&sp.clone()), Ordering::Equal);
    }
}
