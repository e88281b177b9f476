//! Minimal reader for `song.ini` metadata files.

use crate::chart::song::Song;
use crate::parser::primitive_parser::{make_string, parse_section_header};
use crate::ChartError;
use nom::bytes::complete::take_till1;
use nom::character::complete::{char, space0};
use nom::combinator::rest;
use nom::sequence::{delimited, preceded};
use nom::{IResult, Parser};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

pub const SONG_SECTION: &str = "song";

/// Key/value pairs grouped by section, lookups ignore case
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniFile {
    sections: HashMap<String, HashMap<String, String>>,
}

/// `key = value`, blanks around `=` optional
fn parse_key_value(i: &str) -> IResult<&str, (&str, &str)> {
    (
        delimited(space0, take_till1(|c| c == '='), char('=')),
        preceded(space0, rest),
    )
        .parse(i)
}

impl IniFile {
    pub fn open(path: &Path) -> Result<Self, ChartError> {
        let data = std::fs::read(path)
            .map_err(|e| ChartError::IniError(format!("{}: {e}", path.display())))?;
        Ok(Self::parse(&make_string(&data)))
    }

    pub fn parse(text: &str) -> Self {
        let mut ini = Self::default();
        let mut section = String::new();
        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with(';') || trimmed.starts_with('#') {
                continue;
            }
            let header: IResult<&str, &str> = parse_section_header(trimmed);
            if let Ok((_, name)) = header {
                section = name.to_lowercase();
                continue;
            }
            match parse_key_value(trimmed) {
                Ok((_, (key, value))) => {
                    ini.sections
                        .entry(section.clone())
                        .or_default()
                        .insert(key.trim().to_lowercase(), value.trim().to_string());
                }
                Err(_) => log::debug!("Ignoring ini line '{trimmed}'"),
            }
        }
        ini
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(&section.to_lowercase())?
            .get(&key.to_lowercase())
            .map(String::as_str)
    }

    /// String value, or `default` when the key is absent
    pub fn read_value(&self, section: &str, key: &str, default: &str) -> String {
        self.get(section, key).unwrap_or(default).to_string()
    }

    /// Parsed value, or `default` when the key is absent or does not parse
    pub fn read_parsed<T: FromStr>(&self, section: &str, key: &str, default: T) -> T {
        match self.get(section, key) {
            Some(value) => value.parse().unwrap_or_else(|_| {
                log::warn!("Invalid value '{value}' for {section}.{key}");
                default
            }),
            None => default,
        }
    }

    /// Override song metadata with the values present in the `[song]` section
    pub fn merge_into(&self, song: &mut Song) {
        let metadata = &mut song.metadata;
        metadata.name = self.read_value(SONG_SECTION, "name", &metadata.name);
        metadata.artist = self.read_value(SONG_SECTION, "artist", &metadata.artist);
        let charter = self.read_value(SONG_SECTION, "frets", &metadata.charter);
        metadata.charter = self.read_value(SONG_SECTION, "charter", &charter);
        metadata.album = self.read_value(SONG_SECTION, "album", &metadata.album);
        metadata.year = self.read_value(SONG_SECTION, "year", &metadata.year);
        metadata.genre = self.read_value(SONG_SECTION, "genre", &metadata.genre);

        // delay is in milliseconds
        let delay_ms = self.read_parsed(SONG_SECTION, "delay", song.offset * 1000.0);
        song.offset = delay_ms / 1000.0;
    }
}
