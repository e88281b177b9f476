pub mod package;
pub mod pipeline;

pub use package::{find_song_packages, SongPackage};
pub use pipeline::{BatchConverter, BatchSummary, ConversionOutcome, PackageReport};
