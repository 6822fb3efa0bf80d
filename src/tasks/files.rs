use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};
use walkdir::{DirEntry, WalkDir};

use crate::catalog::Catalog;
use crate::config::Configuration;
use crate::error::Error;
use crate::events::ImageId;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tif", "tiff", "webp"];

/// Build the session catalog from the configured library.
///
/// # Errors
/// [`Error::BadDir`] if the library is missing or not a directory,
/// [`Error::EmptyCatalog`] if no image was found.
pub fn discover_catalog(cfg: &Configuration) -> Result<Catalog, Error> {
    let found = discover(&cfg.photo_library_path, &cfg.folder_filter)?;
    Catalog::new(found.into_iter().map(ImageId::from).collect())
}

/// Recursively collect image files under `root`, sorted by path.
///
/// With a non-empty `folder_filter`, only first-level subfolders whose name
/// is listed are scanned. Hidden directories below the root are skipped.
#[instrument(skip(folder_filter), fields(root = %root.display()))]
pub fn discover(root: &Path, folder_filter: &[String]) -> Result<Vec<PathBuf>, Error> {
    if !root.is_dir() {
        return Err(Error::BadDir(root.display().to_string()));
    }

    let mut found = Vec::new();
    if folder_filter.is_empty() {
        walk_into(root, &mut found);
    } else {
        for entry in std::fs::read_dir(root)? {
            let entry = entry?;
            let path = entry.path();
            let selected = path.is_dir()
                && path
                    .file_name()
                    .and_then(OsStr::to_str)
                    .is_some_and(|name| folder_filter.iter().any(|f| f == name));
            if selected {
                debug!(folder = %path.display(), "scanning filtered folder");
                walk_into(&path, &mut found);
            }
        }
    }

    found.sort();
    info!(
        discovered = found.len(),
        filtered = !folder_filter.is_empty(),
        "image discovery complete"
    );
    Ok(found)
}

fn walk_into(dir: &Path, out: &mut Vec<PathBuf>) {
    for entry in WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| !is_hidden_dir(e))
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
    {
        if is_image(entry.path()) {
            out.push(entry.into_path());
        }
    }
}

#[inline]
pub fn is_image(p: &Path) -> bool {
    matches!(
        p.extension()
            .and_then(OsStr::to_str)
            .map(|s| s.to_ascii_lowercase()),
        Some(ref e) if IMAGE_EXTENSIONS.contains(&e.as_str())
    )
}

fn is_hidden_dir(entry: &DirEntry) -> bool {
    // The root itself may legitimately be a dot-dir.
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|n| n.starts_with('.'))
}
