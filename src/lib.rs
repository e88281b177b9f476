//! Chartconv - batch converter from Guitar Hero style MIDI packages to `.chart` files
//!
//! This library provides:
//! - An ordered note timeline and the line codec of `.chart` tracks
//! - Readers for MIDI, `.chart` and `song.ini` files
//! - A `.chart` writer with resolution rescaling
//! - A batch pipeline converting whole song libraries
//!
//! # Example
//!
//! ```no_run
//! use chartconv::{BatchConverter, BatchOptions, ExportConfig};
//! use std::path::Path;
//!
//! let converter = BatchConverter::with_defaults(ExportConfig::default(), BatchOptions::default());
//! let summary = converter.run(Path::new("songs"), Path::new("charts")).unwrap();
//! println!("{} converted, {} skipped", summary.converted(), summary.skipped());
//! ```

pub mod batch;
pub mod chart;
pub mod config;
pub mod error;
pub mod export;
pub mod parser;

// Re-export main types for convenience
pub use batch::{find_song_packages, BatchConverter, BatchSummary, SongPackage};
pub use chart::chart_object::{ChartEvent, ChartObject, FretType, Note, NoteFlags, StarPower};
pub use chart::song::{Difficulty, Instrument, Song};
pub use chart::timeline::{Direction, Timeline};
pub use config::{BatchOptions, Config, ExportConfig, OutputFormat};
pub use error::ChartError;
pub use export::{chart_writer::ChartWriter, ErrorReport, SongWriter};
pub use parser::{ChartReader, MidReader, SongReader};
