use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::{LabelError, RecordStore};

/// Extensions picked up by a directory scan, compared case-insensitively.
pub const IMAGE_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "gif", "tif", "tiff", "psd", "bmp"];

/// Where the images of a session come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Paths used verbatim, in the given order.
    Explicit(Vec<PathBuf>),
    /// Directory scanned recursively for image files.
    Directory(PathBuf),
    /// Snapshot of an earlier session to resume.
    Snapshot(PathBuf),
}

impl ImageSource {
    /// Picks the active source when several were given: explicit list first,
    /// then directory, then snapshot.
    pub fn select(
        images: Option<Vec<PathBuf>>,
        folder: Option<PathBuf>,
        snapshot: Option<PathBuf>,
    ) -> Result<Self, LabelError> {
        if let Some(images) = images {
            return Ok(ImageSource::Explicit(images));
        }
        if let Some(folder) = folder {
            return Ok(ImageSource::Directory(folder));
        }
        if let Some(snapshot) = snapshot {
            return Ok(ImageSource::Snapshot(snapshot));
        }
        Err(LabelError::NoImagesFound)
    }
}

/// Outcome of [`resolve`].
#[derive(Debug)]
pub struct Resolved {
    pub store: RecordStore,
    /// Positions whose file was missing when the snapshot was loaded.
    pub missing: Vec<usize>,
}

pub fn resolve(source: &ImageSource) -> Result<Resolved, LabelError> {
    let resolved = match source {
        ImageSource::Explicit(paths) => Resolved {
            store: RecordStore::initialize(paths.iter().cloned()),
            missing: Vec::new(),
        },
        ImageSource::Directory(dir) => Resolved {
            store: RecordStore::initialize(find_images(dir)?),
            missing: Vec::new(),
        },
        ImageSource::Snapshot(path) => {
            let store = RecordStore::load(path)?;
            let missing: Vec<usize> = store
                .paths()
                .enumerate()
                .filter(|(_, p)| !p.exists())
                .map(|(position, p)| {
                    warn!(position, path = %p.display(), "image from snapshot is missing");
                    position
                })
                .collect();
            if missing.len() == store.len() {
                return Err(LabelError::NoImagesFound);
            }
            Resolved { store, missing }
        }
    };

    if resolved.store.is_empty() {
        return Err(LabelError::NoImagesFound);
    }

    info!(
        records = resolved.store.len(),
        labeled = resolved.store.labeled_count(),
        missing = resolved.missing.len(),
        "resolved images"
    );
    Ok(resolved)
}

/// Recursively collects image files below `dir`, sorted by path.
pub fn find_images(dir: &Path) -> Result<Vec<PathBuf>, LabelError> {
    let mut paths = Vec::new();

    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|source| LabelError::Scan {
            path: dir.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_dir() {
            continue;
        }
        if is_image(entry.path()) {
            paths.push(entry.into_path());
        }
    }

    // Walk order depends on the filesystem.
    paths.sort();
    Ok(paths)
}

pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.iter().any(|known| e.eq_ignore_ascii_case(known)))
}
