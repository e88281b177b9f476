use crate::chart::song::AudioInstrument;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const INI_FILE_NAME: &str = "song.ini";
pub const ALBUM_ART_FILE_NAMES: [&str; 2] = ["album.png", "album.jpg"];
/// Notation file picked first when a folder holds several
pub const PREFERRED_MIDI_FILE_NAME: &str = "notes.mid";
const MIDI_EXTENSIONS: [&str; 2] = ["mid", "midi"];

/// Files of one song folder, as found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongPackage {
    pub source_dir: PathBuf,
    pub midi_path: PathBuf,
    pub ini_path: Option<PathBuf>,
    pub album_art_path: Option<PathBuf>,
    pub audio_paths: BTreeMap<AudioInstrument, PathBuf>,
    /// Name of the folder created in the output directory
    pub directory_name: String,
}

fn is_midi_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| MIDI_EXTENSIONS.iter().any(|m| m.eq_ignore_ascii_case(ext)))
}

/// Regular files of `dir` keyed by lowercased file name
fn list_files(dir: &Path) -> std::io::Result<BTreeMap<String, PathBuf>> {
    let mut files = BTreeMap::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            let name = entry.file_name().to_string_lossy().to_lowercase();
            files.insert(name, entry.path());
        }
    }
    Ok(files)
}

/// Describe the package held by `dir`, `None` without a notation file
pub fn package_for_dir(
    dir: &Path,
    directory_name: String,
) -> std::io::Result<Option<SongPackage>> {
    let files = list_files(dir)?;
    let midi_path = files
        .get(PREFERRED_MIDI_FILE_NAME)
        .cloned()
        .or_else(|| files.values().find(|path| is_midi_file(path)).cloned());
    let Some(midi_path) = midi_path else {
        return Ok(None);
    };

    let audio_paths = AudioInstrument::ALL
        .into_iter()
        .filter_map(|channel| {
            files
                .get(channel.file_name())
                .map(|path| (channel, path.clone()))
        })
        .collect();

    Ok(Some(SongPackage {
        source_dir: dir.to_path_buf(),
        midi_path,
        ini_path: files.get(INI_FILE_NAME).cloned(),
        album_art_path: ALBUM_ART_FILE_NAMES
            .iter()
            .find_map(|name| files.get(*name).cloned()),
        audio_paths,
        directory_name,
    }))
}

/// Find every folder under `root` holding a notation file.
///
/// Without `recursive` only `root` and its direct children are looked at.
/// Folders are visited in file name order and output names are made unique,
/// so the same library always routes to the same output folders.
pub fn find_song_packages(root: &Path, recursive: bool) -> Vec<SongPackage> {
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut taken_names: HashSet<String> = HashSet::new();
    let mut packages = Vec::new();

    let walker = WalkDir::new(root)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                log::warn!("Skipping unreadable entry: {err}");
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }

        let mut name = entry.file_name().to_string_lossy().to_string();
        if name.is_empty() || name == "." || name == ".." {
            name = "song".to_string();
        }
        let directory_name = unique_name(&name, &taken_names);

        match package_for_dir(entry.path(), directory_name) {
            Ok(Some(package)) => {
                log::debug!("Found package {:?}", package.midi_path);
                taken_names.insert(package.directory_name.clone());
                packages.push(package);
            }
            Ok(None) => {}
            Err(err) => log::warn!("Skipping folder {:?}: {err}", entry.path()),
        }
    }
    packages
}

/// `name`, or `name (n)` with the lowest free `n` starting at 2
fn unique_name(name: &str, taken_names: &HashSet<String>) -> String {
    if !taken_names.contains(name) {
        return name.to_string();
    }
    (2..)
        .map(|n| format!("{name} ({n})"))
        .find(|candidate| !taken_names.contains(candidate))
        .unwrap_or_else(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_package_files() {
        let dir = tempfile::tempdir().unwrap();
        let song_dir = dir.path().join("Band - Song");
        touch(&song_dir.join("other.mid"));
        touch(&song_dir.join("notes.mid"));
        touch(&song_dir.join("Song.ini"));
        touch(&song_dir.join("album.jpg"));
        touch(&song_dir.join("guitar.ogg"));
        touch(&song_dir.join("song.ogg"));
        touch(&song_dir.join("readme.txt"));

        let packages = find_song_packages(dir.path(), false);
        assert_eq!(packages.len(), 1);
        let package = &packages[0];
        assert_eq!(package.directory_name, "Band - Song");
        assert_eq!(package.midi_path, song_dir.join("notes.mid"));
        assert_eq!(package.ini_path, Some(song_dir.join("Song.ini")));
        assert_eq!(package.album_art_path, Some(song_dir.join("album.jpg")));
        assert_eq!(
            package.audio_paths.keys().copied().collect::<Vec<_>>(),
            vec![AudioInstrument::Song, AudioInstrument::Guitar]
        );
    }

    #[test]
    fn test_recursive_scan_depth() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("empty/nested")).unwrap();
        touch(&dir.path().join("a/b/Deep Song/song.mid"));

        assert!(find_song_packages(dir.path(), false).is_empty());
        let packages = find_song_packages(dir.path(), true);
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].directory_name, "Deep Song");
    }

    #[test]
    fn test_no_notation_file() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("song/song.ogg"));
        touch(&dir.path().join("song/notes.chart"));
        assert!(find_song_packages(dir.path(), true).is_empty());
    }

    #[test]
    fn test_duplicate_names_are_routed_apart() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("pack1/Song/notes.mid"));
        touch(&dir.path().join("pack2/Song/notes.mid"));
        touch(&dir.path().join("pack3/Song/notes.mid"));
        let names: Vec<_> = find_song_packages(dir.path(), true)
            .into_iter()
            .map(|p| p.directory_name)
            .collect();
        assert_eq!(names, vec!["Song", "Song (2)", "Song (3)"]);
    }

    #[test]
    fn test_generated_names_skip_existing_folders() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("Song/notes.mid"));
        touch(&dir.path().join("Song (2)/notes.mid"));
        touch(&dir.path().join("x/Song/notes.mid"));
        let names: Vec<_> = find_song_packages(dir.path(), true)
            .into_iter()
            .map(|p| p.directory_name)
            .collect();
        assert_eq!(names, vec!["Song", "Song (2)", "Song (3)"]);
    }
}
