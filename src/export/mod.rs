use crate::chart::song::Song;
use crate::config::ExportConfig;
use crate::ChartError;
use std::path::Path;

pub mod chart_writer;
pub mod error_report;

pub use error_report::ErrorReport;

/// Turns a song into an output file
pub trait SongWriter {
    /// Write `song` to `path`. Problems that did not prevent the write end up
    /// in the returned report.
    fn write_song(
        &self,
        song: &Song,
        config: &ExportConfig,
        path: &Path,
    ) -> Result<ErrorReport, ChartError>;
}
