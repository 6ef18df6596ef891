use indicatif::{ProgressBar, ProgressStyle};
use log::error;
use rayon::prelude::*;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering::Relaxed};
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::types::{ImagePair, ProcessingStats, IGNORED_EXTENSION, IMG_FORMATS};

/// Create a progress bar with the given length and label
pub fn create_progress_bar(len: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{}] [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} ({{eta}})",
                label
            ))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

/// Delete and recreate an output directory so stale files never leak into it
pub fn create_output_directory(path: &Path) -> std::io::Result<PathBuf> {
    if path.exists() {
        log::warn!(
            "Directory {:?} already exists. Deleting and recreating it.",
            path
        );
        fs::remove_dir_all(path).and_then(|_| fs::create_dir_all(path))?;
    } else {
        fs::create_dir_all(path)?;
    }
    Ok(path.to_path_buf())
}

/// Create a directory (and parents) if it is missing, keeping existing content
pub fn ensure_directory(path: &Path) -> std::io::Result<PathBuf> {
    fs::create_dir_all(path)?;
    Ok(path.to_path_buf())
}

/// Fail with `MissingDirectory` unless `path` is a directory
pub fn require_directory(path: &Path) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(Error::MissingDirectory(path.to_path_buf()))
    }
}

/// Entries of a directory sorted by file name, skipping thumbnail caches
pub fn list_dir_sorted(path: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(path)? {
        let path = entry?.path();
        if file_name(&path).ends_with(IGNORED_EXTENSION) {
            continue;
        }
        entries.push(path);
    }
    entries.sort();
    Ok(entries)
}

/// Whether the extension is one of the supported image formats
pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| IMG_FORMATS.contains(&e.to_ascii_lowercase().as_str()))
}

/// Sorted sub-directories of `path`
pub fn list_subdirs(path: &Path) -> std::io::Result<Vec<PathBuf>> {
    Ok(list_dir_sorted(path)?
        .into_iter()
        .filter(|p| p.is_dir())
        .collect())
}

/// File name as a string, empty when the path has none
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Path of `target` relative to the directory `base`, using `..` where needed.
///
/// Both paths are made absolute against the current directory first, so the
/// result is only meaningful for paths on the same filesystem root.
pub fn relative_path(target: &Path, base: &Path) -> PathBuf {
    let absolute = |p: &Path| -> PathBuf {
        let joined = if p.is_absolute() {
            p.to_path_buf()
        } else {
            std::env::current_dir().unwrap_or_default().join(p)
        };
        normalize(&joined)
    };
    let target = absolute(target);
    let base = absolute(base);

    let target_parts: Vec<_> = target.components().collect();
    let base_parts: Vec<_> = base.components().collect();
    let common = target_parts
        .iter()
        .zip(base_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..base_parts.len() {
        relative.push("..");
    }
    for part in &target_parts[common..] {
        relative.push(part.as_os_str());
    }
    relative
}

// Lexically resolve `.` and `..` components
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Copy pairs into `<dest>/images` and `<dest>/labels` in parallel.
///
/// Every file is attempted. Failures are logged, and if any occurred the
/// summary is printed and `Error::CopyFailed` carries the counts together
/// with the first failure.
pub fn copy_pairs_in_parallel(pairs: &[ImagePair], dest: &Path, pb: &ProgressBar) -> Result<ProcessingStats> {
    let images_dir = dest.join("images");
    let labels_dir = dest.join("labels");
    ensure_directory(&images_dir)?;
    ensure_directory(&labels_dir)?;

    let copied = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let first_error: Mutex<Option<std::io::Error>> = Mutex::new(None);

    pairs.par_iter().for_each(|pair| {
        let result = copy_into(&pair.image, &images_dir).and_then(|_| copy_into(&pair.label, &labels_dir));
        match result {
            Ok(()) => {
                copied.fetch_add(1, Relaxed);
            }
            Err(e) => {
                error!("Failed to copy pair {}: {}", pair.image.display(), e);
                failed.fetch_add(1, Relaxed);
                if let Ok(mut slot) = first_error.lock() {
                    slot.get_or_insert(e);
                }
            }
        }
        pb.inc(1);
    });

    let stats = ProcessingStats {
        total_files_processed: pairs.len(),
        successful_copies: copied.into_inner(),
        failed_copies: failed.into_inner(),
    };
    if let Some(source) = first_error.into_inner().ok().flatten() {
        stats.print_summary(&dest.display().to_string());
        return Err(Error::CopyFailed {
            failed: stats.failed_copies,
            total: stats.total_files_processed,
            source,
        });
    }
    Ok(stats)
}

/// Copy `file` into `dir`, keeping its (sanitized) file name
pub fn copy_into(file: &Path, dir: &Path) -> std::io::Result<()> {
    let name = sanitize_filename::sanitize(file_name(file));
    fs::copy(file, dir.join(name)).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path_sibling() {
        let rel = relative_path(Path::new("/data/results/a/img.png"), Path::new("/data/report"));
        assert_eq!(rel, PathBuf::from("../results/a/img.png"));
    }

    #[test]
    fn test_relative_path_nested() {
        let rel = relative_path(Path::new("/data/report/x.png"), Path::new("/data/report"));
        assert_eq!(rel, PathBuf::from("x.png"));
    }

    #[test]
    fn test_list_dir_skips_thumbnail_cache() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.png"), b"").unwrap();
        fs::write(dir.path().join("a.png"), b"").unwrap();
        fs::write(dir.path().join("Thumbs.db"), b"").unwrap();

        let names: Vec<_> = list_dir_sorted(dir.path())
            .unwrap()
            .iter()
            .map(|p| file_name(p))
            .collect();
        assert_eq!(names, vec!["a.png", "b.png"]);
    }

    #[test]
    fn test_copy_pairs_reports_failures() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("a.png"), b"a").unwrap();
        fs::write(src.join("a_label.png"), b"a").unwrap();
        let pairs = vec![
            ImagePair {
                image: src.join("a.png"),
                label: src.join("a_label.png"),
            },
            ImagePair {
                image: src.join("missing.png"),
                label: src.join("missing_label.png"),
            },
        ];

        let pb = ProgressBar::hidden();
        let result = copy_pairs_in_parallel(&pairs, &dir.path().join("out"), &pb);
        assert!(matches!(result, Err(Error::CopyFailed { failed: 1, total: 2, .. })));
        assert!(dir.path().join("out/images/a.png").exists());
    }

    #[test]
    fn test_copy_pairs_counts_successes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.png"), b"b").unwrap();
        fs::write(dir.path().join("b.txt"), b"b").unwrap();
        let pairs = vec![ImagePair {
            image: dir.path().join("b.png"),
            label: dir.path().join("b.txt"),
        }];

        let stats = copy_pairs_in_parallel(&pairs, &dir.path().join("out"), &ProgressBar::hidden()).unwrap();
        assert_eq!((stats.successful_copies, stats.failed_copies), (1, 0));
    }

    #[test]
    fn test_is_image() {
        assert!(is_image(Path::new("a/b.PNG")));
        assert!(is_image(Path::new("c.tif")));
        assert!(!is_image(Path::new("notes.txt")));
        assert!(!is_image(Path::new("noext")));
    }
}
