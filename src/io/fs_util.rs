//! Filesystem helpers shared by both pipelines: deterministic listings,
//! collision-free names and atomic commit of finished files.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

/// Regular files directly inside `dir` whose extension matches `extension`
/// (case-insensitive), sorted by path.
pub fn list_with_extension(dir: &Path, extension: &str) -> io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = list_files(dir)?
        .into_iter()
        .filter(|p| {
            p.extension()
                .map(|e| e.to_string_lossy().eq_ignore_ascii_case(extension))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Regular, non-hidden files directly inside `dir`, sorted by path
pub fn list_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && !is_hidden(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Non-hidden immediate subdirectories of `dir`, in directory order
pub fn list_subdirs(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() && !is_hidden(&path) {
            dirs.push(path);
        }
    }
    Ok(dirs)
}

/// `dir/file_name`, or `dir/<stem>_<n><.ext>` with the smallest `n >= 1` that is free
pub fn unique_path(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }
    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, format!(".{}", ext)),
        _ => (file_name, String::new()),
    };
    let mut counter = 1usize;
    loop {
        let candidate = dir.join(format!("{}_{}{}", stem, counter, ext));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Move a finished file to `dst` so that `dst` only ever names a complete file.
///
/// Same filesystem: a plain rename. Across filesystems the data is copied to a
/// hidden temporary inside the destination directory first and renamed over `dst`.
/// An existing `dst` is replaced.
pub fn commit_file(src: &Path, dst: &Path) -> io::Result<()> {
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            let dir = dst.parent().unwrap_or_else(|| Path::new("."));
            debug!("Cross-device commit of {:?} via {:?}", src, dir);
            let mut staged = tempfile::Builder::new()
                .prefix(".partial-")
                .tempfile_in(dir)?;
            io::copy(&mut fs::File::open(src)?, staged.as_file_mut())?;
            staged.as_file().sync_all()?;
            persist(staged, dst)?;
            fs::remove_file(src)
        }
        Err(e) => Err(e),
    }
}

fn persist(staged: NamedTempFile, dst: &Path) -> io::Result<()> {
    staged.persist(dst).map(|_| ()).map_err(|e| e.error)
}

/// Move every regular file of `src_dir` into `dst_dir`, renaming on collision.
/// Returns the number of files moved.
pub fn move_all(src_dir: &Path, dst_dir: &Path) -> io::Result<usize> {
    let mut moved = 0;
    for file in list_files(src_dir)? {
        let name = match file.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => continue,
        };
        let dst = unique_path(dst_dir, &name);
        commit_file(&file, &dst)?;
        moved += 1;
    }
    Ok(moved)
}

/// Remove a file, treating "already gone" as success
pub fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
