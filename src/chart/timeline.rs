use crate::chart::chart_object::{ChartObject, Note, NoteFlags, ObjectKind};
use crate::chart::song::Song;
use std::ops::Range;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

/// Sorted objects of one instrument difficulty.
///
/// Entries are kept ordered by [`ChartObject::sort_cmp`]; entries comparing
/// equal stay in insertion order. Positions are not unique: chords put several
/// notes on the same tick, and events or star power may share it too.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeline {
    objects: Vec<ChartObject>,
}

impl Timeline {
    pub const fn new() -> Self {
        Self {
            objects: Vec::new(),
        }
    }

    /// Insert preserving order, returns the index the object landed at
    pub fn insert(&mut self, object: impl Into<ChartObject>) -> usize {
        let object = object.into();
        let index = self
            .objects
            .partition_point(|existing| existing.sort_cmp(&object).is_le());
        self.objects.insert(index, object);
        index
    }

    /// Remove the entry equal to `object`, false if there is none
    pub fn remove(&mut self, object: &ChartObject) -> bool {
        match self.index_of(object) {
            Some(index) => {
                self.objects.remove(index);
                true
            }
            None => false,
        }
    }

    /// Index of the entry equal to `object`
    pub fn index_of(&self, object: &ChartObject) -> Option<usize> {
        let start = self.lower_bound(object.position());
        self.objects[start..]
            .iter()
            .take_while(|o| o.position() == object.position())
            .position(|o| o == object)
            .map(|offset| start + offset)
    }

    /// All entries at `position`, in timeline order
    pub fn find_at_position(&self, position: u32) -> &[ChartObject] {
        let start = self.lower_bound(position);
        let end = self.upper_bound(position);
        &self.objects[start..end]
    }

    pub fn notes_at_position(&self, position: u32) -> impl Iterator<Item = &Note> {
        self.find_at_position(position)
            .iter()
            .filter_map(ChartObject::as_note)
    }

    /// Add `flags` to every note at `position`, returns how many notes were flagged
    pub fn add_flags_at_position(&mut self, position: u32, flags: NoteFlags) -> usize {
        let mut count = 0;
        for note in self.notes_at_position_mut(position) {
            note.flags = note.flags.union(flags);
            count += 1;
        }
        count
    }

    // positions handed out here must not change, the order depends on them
    pub(crate) fn notes_at_position_mut(
        &mut self,
        position: u32,
    ) -> impl Iterator<Item = &mut Note> {
        let start = self.lower_bound(position);
        let end = self.upper_bound(position);
        self.objects[start..end]
            .iter_mut()
            .filter_map(ChartObject::as_note_mut)
    }

    /// Notes with a position inside `range`
    pub(crate) fn notes_in_range_mut(
        &mut self,
        range: Range<u32>,
    ) -> impl Iterator<Item = &mut Note> {
        let start = self.lower_bound(range.start);
        let end = self.lower_bound(range.end).max(start);
        self.objects[start..end]
            .iter_mut()
            .filter_map(ChartObject::as_note_mut)
    }

    /// Nearest entry of `kind` before or after `from_index`, excluding `from_index` itself
    pub fn find_neighbor(
        &self,
        kind: ObjectKind,
        from_index: usize,
        direction: Direction,
    ) -> Option<(usize, &ChartObject)> {
        match direction {
            Direction::Next => self
                .objects
                .iter()
                .enumerate()
                .skip(from_index.saturating_add(1))
                .find(|(_, o)| o.kind() == kind),
            Direction::Previous => self
                .objects
                .iter()
                .enumerate()
                .take(from_index.min(self.objects.len()))
                .rev()
                .find(|(_, o)| o.kind() == kind),
        }
    }

    /// True when no later note shares the position of the note at `index`
    pub fn is_last_note_at_position(&self, index: usize) -> bool {
        let Some(position) = self.objects.get(index).map(ChartObject::position) else {
            return false;
        };
        match self.find_neighbor(ObjectKind::Note, index, Direction::Next) {
            Some((_, next)) => next.position() != position,
            None => true,
        }
    }

    pub fn get(&self, index: usize) -> Option<&ChartObject> {
        self.objects.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChartObject> {
        self.objects.iter()
    }

    #[allow(clippy::missing_const_for_fn)]
    pub fn objects(&self) -> &[ChartObject] {
        &self.objects
    }

    pub fn notes(&self) -> impl Iterator<Item = &Note> {
        self.objects.iter().filter_map(ChartObject::as_note)
    }

    pub fn note_count(&self) -> usize {
        self.notes().count()
    }

    pub const fn len(&self) -> usize {
        self.objects.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn clear(&mut self) {
        self.objects.clear();
    }

    /// Seconds until the later of the last object and the song audio
    pub fn end_time(&self, song: &Song) -> f64 {
        let object_time = self
            .objects
            .last()
            .map(|o| song.tick_to_seconds(o.position()))
            .unwrap_or_default();
        object_time.max(song.audio_length)
    }

    fn lower_bound(&self, position: u32) -> usize {
        self.objects.partition_point(|o| o.position() < position)
    }

    fn upper_bound(&self, position: u32) -> usize {
        self.objects.partition_point(|o| o.position() <= position)
    }
}

impl<'a> IntoIterator for &'a Timeline {
    type Item = &'a ChartObject;
    type IntoIter = std::slice::Iter<'a, ChartObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.objects.iter()
    }
}

impl FromIterator<ChartObject> for Timeline {
    fn from_iter<T: IntoIterator<Item = ChartObject>>(iter: T) -> Self {
        let mut timeline = Self::new();
        for object in iter {
            timeline.insert(object);
        }
        timeline
    }
}
