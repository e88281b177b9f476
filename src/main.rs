use chartconv::{BatchConverter, ChartError, Config, OutputFormat};
use clap::Parser;
use std::path::{Path, PathBuf};

fn main() {
    let result = main_result();
    std::process::exit(match result {
        Ok(()) => 0,
        Err(err) => {
            // use Display instead of Debug for user friendly error messages
            log::error!("{err}");
            1
        }
    });
}

pub fn main_result() -> Result<(), AppError> {
    // setup logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("chartconv=info"))
        .init();

    // args
    let args = CliArgs::parse();
    let input_directory = PathBuf::from(&args.input_directory);
    let output_directory = PathBuf::from(&args.output_directory);

    // check if input directory exists
    if !input_directory.is_dir() {
        let err = AppError::InvalidInvocation(format!(
            "Input directory not found {input_directory:?}"
        ));
        return Err(err);
    }

    // read local config, flags take precedence
    let mut config = match &args.config {
        Some(path) => Config::read_from(Path::new(path))?,
        None => Config::read_config()?,
    };
    args.apply_to(&mut config);
    log::debug!("Running with {config:?}");

    // go!
    let converter = BatchConverter::with_defaults(config.export, config.batch);
    let summary = converter.run(&input_directory, &output_directory)?;
    println!(
        "Conversion complete: {} converted, {} skipped ({} with warnings)",
        summary.converted(),
        summary.skipped(),
        summary.with_warnings()
    );
    Ok(())
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct CliArgs {
    /// Folder holding the song packages.
    input_directory: String,
    /// Folder receiving one converted folder per package.
    output_directory: String,
    /// Tick resolution of the written charts.
    #[arg(long)]
    resolution: Option<u32>,
    /// Keep lyric events as they are in the source.
    #[arg(long, default_value_t = false)]
    no_lyrics_fix: bool,
    /// Leave empty difficulties empty.
    #[arg(long, default_value_t = false)]
    no_copy_down: bool,
    /// Drop forced note flags.
    #[arg(long, default_value_t = false)]
    no_forced: bool,
    /// Scan every sub folder instead of the direct children only.
    #[arg(short, long, default_value_t = false)]
    recursive: bool,
    /// Do not copy audio stems.
    #[arg(long, default_value_t = false)]
    no_audio: bool,
    /// Output format.
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,
    /// Optional path to a configuration file replacing the one in the home folder.
    #[arg(long)]
    config: Option<String>,
}

impl CliArgs {
    fn apply_to(&self, config: &mut Config) {
        let export = &mut config.export;
        if let Some(resolution) = self.resolution {
            export.target_resolution = resolution;
        }
        if let Some(format) = self.format {
            export.format = format;
        }
        export.substitute_lyric_chars &= !self.no_lyrics_fix;
        export.copy_down_empty_difficulty &= !self.no_copy_down;
        export.forced &= !self.no_forced;
        config.batch.recursive |= self.recursive;
        config.batch.include_audio &= !self.no_audio;
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("invalid invocation: {0}")]
    InvalidInvocation(String),
    #[error("configuration error: {0}")]
    ConfigError(String),
    #[error("other error: {0}")]
    OtherError(String),
}

impl From<ChartError> for AppError {
    fn from(error: ChartError) -> Self {
        match error {
            ChartError::InvalidInvocation(s) => Self::InvalidInvocation(s),
            ChartError::ConfigError(s) => Self::ConfigError(s),
            other => Self::OtherError(other.to_string()),
        }
    }
}
