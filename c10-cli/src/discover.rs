//! Input file discovery

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// File extensions recognised when walking directories
const RECORDING_EXTENSIONS: &[&str] = &["c10", "ch10"];

/// Expand the given paths into a list of recordings
///
/// Files are taken as given; directories are walked recursively for files
/// with a recording extension (case-insensitive), in sorted order.
pub fn collect_files(paths: &[PathBuf]) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            walk(path, &mut files)?;
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}

fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            walk(&path, files)?;
        } else if is_recording(&path) {
            files.push(path);
        }
    }
    Ok(())
}

fn is_recording(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase())
        .is_some_and(|ext| RECORDING_EXTENSIONS.contains(&ext.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_walks_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("day2");
        fs::create_dir(&nested).unwrap();

        for name in ["b.c10", "a.CH10", "notes.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::write(nested.join("c.c10"), b"").unwrap();

        let explicit = dir.path().join("notes.txt");
        let files = collect_files(&[dir.path().to_path_buf(), explicit.clone()]).unwrap();

        assert_eq!(
            files,
            vec![
                dir.path().join("a.CH10"),
                dir.path().join("b.c10"),
                nested.join("c.c10"),
                explicit,
            ]
        );
    }

    #[test]
    fn test_recording_extensions() {
        assert!(is_recording(Path::new("x.c10")));
        assert!(is_recording(Path::new("x.Ch10")));
        assert!(!is_recording(Path::new("x.c100")));
        assert!(!is_recording(Path::new("c10")));
    }
}
