use crate::batch::package::{find_song_packages, SongPackage, INI_FILE_NAME};
use crate::config::{BatchOptions, ExportConfig};
use crate::export::chart_writer::ChartWriter;
use crate::export::{ErrorReport, SongWriter};
use crate::parser::ini_parser::IniFile;
use crate::parser::{MidReader, SongReader};
use crate::ChartError;
use std::fs;
use std::path::{Path, PathBuf};

/// What a successful package conversion produced
#[derive(Debug)]
pub struct ConversionOutcome {
    pub chart_path: PathBuf,
    pub copied_files: Vec<PathBuf>,
    pub report: ErrorReport,
}

#[derive(Debug)]
pub struct PackageReport {
    pub directory_name: String,
    pub midi_path: PathBuf,
    pub result: Result<ConversionOutcome, ChartError>,
}

impl PackageReport {
    pub fn has_warnings(&self) -> bool {
        self.result
            .as_ref()
            .is_ok_and(|outcome| outcome.report.has_errors())
    }
}

/// Per package results of a batch run, in processing order
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub packages: Vec<PackageReport>,
}

impl BatchSummary {
    pub fn converted(&self) -> usize {
        self.packages.iter().filter(|p| p.result.is_ok()).count()
    }

    pub fn skipped(&self) -> usize {
        self.packages.iter().filter(|p| p.result.is_err()).count()
    }

    pub fn with_warnings(&self) -> usize {
        self.packages.iter().filter(|p| p.has_warnings()).count()
    }
}

/// Converts every song package found under a directory.
///
/// A failing package is logged and recorded in the summary, the batch moves
/// on to the next one.
pub struct BatchConverter<R, W> {
    reader: R,
    writer: W,
    config: ExportConfig,
    options: BatchOptions,
}

impl BatchConverter<MidReader, ChartWriter> {
    pub const fn with_defaults(config: ExportConfig, options: BatchOptions) -> Self {
        Self::new(MidReader, ChartWriter, config, options)
    }
}

impl<R: SongReader, W: SongWriter> BatchConverter<R, W> {
    pub const fn new(reader: R, writer: W, config: ExportConfig, options: BatchOptions) -> Self {
        Self {
            reader,
            writer,
            config,
            options,
        }
    }

    /// Fails only when the directories are unusable, before any package is touched
    pub fn run(&self, input: &Path, output: &Path) -> Result<BatchSummary, ChartError> {
        if !input.is_dir() {
            return Err(ChartError::InvalidInvocation(format!(
                "input directory {input:?} does not exist"
            )));
        }
        fs::create_dir_all(output).map_err(|err| {
            ChartError::InvalidInvocation(format!(
                "cannot create output directory {output:?}: {err}"
            ))
        })?;

        let packages = find_song_packages(input, self.options.recursive);
        log::info!("Found {} song packages in {input:?}", packages.len());

        let mut summary = BatchSummary::default();
        for package in packages {
            let result = self.convert_package(&package, output);
            match &result {
                Ok(outcome) if outcome.report.has_errors() => log::warn!(
                    "Warnings/Errors while processing {}:\n{}",
                    package.directory_name,
                    outcome.report.full_report()
                ),
                Ok(outcome) => log::info!(
                    "Processed: {:?} -> {:?}",
                    package.midi_path,
                    outcome.chart_path
                ),
                Err(err) => log::error!("Error processing {}: {err}", package.directory_name),
            }
            summary.packages.push(PackageReport {
                directory_name: package.directory_name,
                midi_path: package.midi_path,
                result,
            });
        }

        log::info!(
            "Converted {} packages, skipped {}",
            summary.converted(),
            summary.skipped()
        );
        Ok(summary)
    }

    /// Convert one package into `output_root/<directory_name>`
    pub fn convert_package(
        &self,
        package: &SongPackage,
        output_root: &Path,
    ) -> Result<ConversionOutcome, ChartError> {
        let mut song = self.reader.read_song(&package.midi_path)?;

        let output_dir = output_root.join(&package.directory_name);
        fs::create_dir_all(&output_dir)?;
        let mut copied_files = Vec::new();

        if self.options.include_audio {
            for (channel, source) in &package.audio_paths {
                let destination = copy_into(source, &output_dir, None)?;
                song.set_audio_location(*channel, &destination);
                copied_files.push(destination);
            }
        }

        if let Some(album_art) = &package.album_art_path {
            copied_files.push(copy_into(album_art, &output_dir, None)?);
        }

        if let Some(ini_path) = &package.ini_path {
            copied_files.push(copy_into(ini_path, &output_dir, Some(INI_FILE_NAME))?);
            match IniFile::open(ini_path) {
                Ok(ini) => ini.merge_into(&mut song),
                Err(err) => log::warn!("Error processing INI file {ini_path:?}: {err}"),
            }
        }

        let stem = package
            .midi_path
            .file_stem()
            .map_or_else(|| "notes".into(), |s| s.to_string_lossy());
        let chart_path = output_dir.join(format!("{stem}.{}", self.config.format.extension()));
        let report = self.writer.write_song(&song, &self.config, &chart_path)?;

        Ok(ConversionOutcome {
            chart_path,
            copied_files,
            report,
        })
    }
}

/// Copy `source` into `dir`, replacing any previous copy
fn copy_into(source: &Path, dir: &Path, file_name: Option<&str>) -> Result<PathBuf, ChartError> {
    let destination = match file_name {
        Some(name) => dir.join(name),
        None => dir.join(source.file_name().unwrap_or_default()),
    };
    if destination != source {
        fs::copy(source, &destination)?;
    }
    Ok(destination)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::chart_object::{FretType, Note};
    use crate::chart::song::{AudioInstrument, Difficulty, Instrument, Song};
    use std::ffi::OsStr;

    /// Builds a one note song, fails for any folder named `broken`
    struct StubReader;

    impl SongReader for StubReader {
        fn read_song(&self, path: &Path) -> Result<Song, ChartError> {
            if path.parent().and_then(Path::file_name) == Some(OsStr::new("broken")) {
                return Err(ChartError::UnusableSong("no notes".to_string()));
            }
            let mut song = Song::new(192);
            song.metadata.name = "midi name".to_string();
            song.track_mut(Instrument::Guitar, Difficulty::Expert)
                .insert(Note::new(0, FretType::Green, 0));
            Ok(song)
        }
    }

    fn write(path: &Path, data: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, data).unwrap();
    }

    fn converter(options: BatchOptions) -> BatchConverter<StubReader, ChartWriter> {
        BatchConverter::new(StubReader, ChartWriter, ExportConfig::default(), options)
    }

    #[test]
    fn test_package_copies_assets() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write(&input.path().join("Song/notes.mid"), "");
        write(&input.path().join("Song/song.ini"), "[song]\nname = ini name\n");
        write(&input.path().join("Song/guitar.ogg"), "audio");
        write(&input.path().join("Song/album.png"), "art");

        let summary = converter(BatchOptions::default())
            .run(input.path(), output.path())
            .unwrap();
        assert_eq!(summary.converted(), 1);
        let outcome = summary.packages[0].result.as_ref().unwrap();

        let song_dir = output.path().join("Song");
        assert_eq!(outcome.chart_path, song_dir.join("notes.chart"));
        assert_eq!(outcome.copied_files.len(), 3);
        assert_eq!(fs::read_to_string(song_dir.join("guitar.ogg")).unwrap(), "audio");
        assert!(song_dir.join("album.png").exists());

        let chart = fs::read_to_string(&outcome.chart_path).unwrap();
        assert!(chart.contains("Name = \"ini name\""));
        assert!(chart.contains(&format!(
            "{} = \"guitar.ogg\"",
            AudioInstrument::Guitar.stream_key()
        )));
    }

    #[test]
    fn test_audio_can_be_left_out() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write(&input.path().join("Song/notes.mid"), "");
        write(&input.path().join("Song/song.ogg"), "audio");

        let options = BatchOptions {
            include_audio: false,
            ..BatchOptions::default()
        };
        let summary = converter(options).run(input.path(), output.path()).unwrap();
        assert_eq!(summary.converted(), 1);
        assert!(!output.path().join("Song/song.ogg").exists());
        assert!(output.path().join("Song/notes.chart").exists());
    }

    #[test]
    fn test_failed_package_is_skipped() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write(&input.path().join("a/notes.mid"), "");
        write(&input.path().join("broken/notes.mid"), "");
        write(&input.path().join("c/notes.mid"), "");

        let summary = converter(BatchOptions::default())
            .run(input.path(), output.path())
            .unwrap();
        assert_eq!(summary.converted(), 2);
        assert_eq!(summary.skipped(), 1);
        // expert is copied down to the empty difficulties
        assert_eq!(summary.with_warnings(), 2);
        assert!(matches!(
            summary.packages[1].result,
            Err(ChartError::UnusableSong(_))
        ));
        assert!(!output.path().join("broken").exists());
        assert!(output.path().join("c/notes.chart").exists());
    }

    #[test]
    fn test_missing_input_directory() {
        let output = tempfile::tempdir().unwrap();
        let missing = output.path().join("missing");
        let result = converter(BatchOptions::default()).run(&missing, output.path());
        assert!(matches!(result, Err(ChartError::InvalidInvocation(_))));
    }
}
