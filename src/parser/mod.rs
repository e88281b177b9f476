use crate::chart::song::Song;
use crate::ChartError;
use std::path::Path;

pub mod chart_codec;
pub mod chart_parser;
pub mod ini_parser;
pub mod mid_reader;
pub mod primitive_parser;

/// Builds a song from a source file
pub trait SongReader {
    /// An error means the file holds no usable song
    fn read_song(&self, path: &Path) -> Result<Song, ChartError>;
}

/// Reads Guitar Hero style MIDI files
#[derive(Debug, Default, Copy, Clone)]
pub struct MidReader;

impl SongReader for MidReader {
    fn read_song(&self, path: &Path) -> Result<Song, ChartError> {
        mid_reader::read_mid(path)
    }
}

/// Reads `.chart` files
#[derive(Debug, Default, Copy, Clone)]
pub struct ChartReader;

impl SongReader for ChartReader {
    fn read_song(&self, path: &Path) -> Result<Song, ChartError> {
        chart_parser::read_chart(path)
    }
}
