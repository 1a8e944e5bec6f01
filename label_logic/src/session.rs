use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{Boundary, LabelError, Navigator, Record, RecordStore};

/// Snapshot file name inside the destination folder.
pub const SNAPSHOT_FILE: &str = "data.json";

/// Result of a successful vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vote {
    pub position: usize,
    pub label: String,
    pub copied_to: PathBuf,
    /// Set when the record voted on was the last one.
    pub boundary: Option<Boundary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub position: usize,
    pub count: usize,
    pub labeled: usize,
}

/// A labeling session: records, current position, labels and output folder.
///
/// Every vote runs label update, copy, snapshot write and advance in that
/// order before returning.
#[derive(Debug)]
pub struct Session {
    store: RecordStore,
    navigator: Navigator,
    labels: Vec<String>,
    destination: PathBuf,
}

impl Session {
    pub fn new(
        store: RecordStore,
        labels: Vec<String>,
        destination: impl Into<PathBuf>,
    ) -> Result<Self, LabelError> {
        if store.is_empty() {
            return Err(LabelError::NoImagesFound);
        }
        if labels.is_empty() {
            return Err(LabelError::NoLabels);
        }
        for (i, label) in labels.iter().enumerate() {
            if !is_folder_name(label) {
                return Err(LabelError::InvalidLabelName(label.clone()));
            }
            if labels[..i].contains(label) {
                return Err(LabelError::DuplicateLabel(label.clone()));
            }
        }

        Ok(Self {
            navigator: Navigator::new(store.len()),
            store,
            labels,
            destination: destination.into(),
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.destination.join(SNAPSHOT_FILE)
    }

    pub fn position(&self) -> usize {
        self.navigator.position()
    }

    pub fn current(&self) -> Result<&Record, LabelError> {
        self.store.get(self.navigator.position())
    }

    /// Whether the file behind the current record is still on disk.
    pub fn is_available(&self) -> bool {
        self.current().is_ok_and(|r| r.path.is_file())
    }

    pub fn progress(&self) -> Progress {
        Progress {
            position: self.navigator.position(),
            count: self.store.len(),
            labeled: self.store.labeled_count(),
        }
    }

    /// Labels the current record, copies its file into
    /// `<destination>/<label>/`, writes the snapshot and advances.
    ///
    /// If the copy or the snapshot write fails the previous label is restored
    /// and the position is left unchanged.
    pub fn vote(&mut self, label: &str) -> Result<Vote, LabelError> {
        if !self.labels.iter().any(|l| l == label) {
            return Err(LabelError::InvalidLabel(label.to_string()));
        }

        let position = self.navigator.position();
        let previous = self.store.set_label(position, Some(label.to_string()))?;

        let written = self
            .copy_to_label(position, label)
            .and_then(|to| self.store.persist(self.snapshot_path()).map(|()| to));
        let copied_to = match written {
            Ok(to) => to,
            Err(e) => {
                warn!(position, label, error = %e, "vote not recorded");
                self.store.set_label(position, previous)?;
                return Err(e);
            }
        };

        let boundary = self.navigator.next();
        if let Some(boundary) = boundary {
            debug!(position, %boundary, "vote on last record");
        }

        Ok(Vote {
            position,
            label: label.to_string(),
            copied_to,
            boundary,
        })
    }

    /// Votes for the `key`-th configured label, counting from 1.
    pub fn vote_key(&mut self, key: usize) -> Result<Vote, LabelError> {
        let label = key
            .checked_sub(1)
            .and_then(|i| self.labels.get(i))
            .cloned()
            .ok_or_else(|| LabelError::InvalidLabel(key.to_string()))?;
        self.vote(&label)
    }

    pub fn next(&mut self) -> Option<Boundary> {
        let boundary = self.navigator.next();
        self.log_boundary(boundary)
    }

    pub fn prev(&mut self) -> Option<Boundary> {
        let boundary = self.navigator.prev();
        self.log_boundary(boundary)
    }

    pub fn jump_to_unlabeled(&mut self) -> Option<Boundary> {
        let boundary = self.navigator.jump_to_unlabeled(&self.store);
        self.log_boundary(boundary)
    }

    pub fn seek(&mut self, position: usize) -> Result<(), LabelError> {
        self.navigator.seek(position)
    }

    fn log_boundary(&self, boundary: Option<Boundary>) -> Option<Boundary> {
        if let Some(boundary) = boundary {
            debug!(position = self.navigator.position(), %boundary, "move clamped");
        }
        boundary
    }

    fn copy_to_label(&self, position: usize, label: &str) -> Result<PathBuf, LabelError> {
        let from = &self.store.get(position)?.path;
        let folder = self.destination.join(label);
        let Some(file_name) = from.file_name() else {
            return Err(LabelError::CopyFailure {
                from: from.clone(),
                to: folder,
                source: io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
            });
        };
        let to = folder.join(file_name);
        let failure = |source: io::Error| LabelError::CopyFailure {
            from: from.clone(),
            to: to.clone(),
            source,
        };

        fs::create_dir_all(&folder).map_err(failure)?;
        // Copying a file onto itself would truncate it.
        if !is_same_file(from, &to) {
            fs::copy(from, &to).map_err(failure)?;
        }

        info!("{} -> {}", from.display(), to.display());
        Ok(to)
    }
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn is_folder_name(label: &str) -> bool {
    if label.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(label).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(name)), None) if name == label
    )
}
