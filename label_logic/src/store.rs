use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::LabelError;

/// One image and the label voted for it, if any.
///
/// Field order matches the sorted key order of the snapshot file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default)]
    pub label: Option<String>,
    pub path: PathBuf,
}

impl Record {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            label: None,
            path: path.into(),
        }
    }

    pub fn is_labeled(&self) -> bool {
        self.label.is_some()
    }
}

/// Position-indexed records of a labeling session.
///
/// Positions are the indices `0..len()` and never change once the store is
/// built; only labels are mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordStore {
    records: Vec<Record>,
}

impl RecordStore {
    /// Fresh store in the given order with every label unset.
    pub fn initialize<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            records: paths.into_iter().map(Record::new).collect(),
        }
    }

    /// Reads a snapshot written by [`RecordStore::persist`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LabelError> {
        let path = path.as_ref();
        let corrupt = |reason: String| LabelError::CorruptSnapshot {
            path: path.to_path_buf(),
            reason,
        };

        let text = fs::read_to_string(path).map_err(|e| corrupt(e.to_string()))?;
        let Entries(mut entries) =
            serde_json::from_str(&text).map_err(|e| corrupt(e.to_string()))?;
        entries.sort_by_key(|(position, _)| *position);

        let mut records = Vec::with_capacity(entries.len());
        for (expected, (position, record)) in entries.into_iter().enumerate() {
            if position != expected {
                return Err(corrupt(format!(
                    "expected position {expected}, found {position}"
                )));
            }
            records.push(record);
        }

        debug!(path = %path.display(), records = records.len(), "snapshot loaded");
        Ok(Self { records })
    }

    /// Writes the whole store to `path` as pretty JSON with sorted keys.
    ///
    /// The file is written next to the target and renamed into place, so the
    /// previous snapshot survives a failed write.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<(), LabelError> {
        let path = path.as_ref();
        let failure = |source: io::Error| LabelError::PersistFailure {
            path: path.to_path_buf(),
            source,
        };

        let entries: BTreeMap<usize, &Record> = self.records.iter().enumerate().collect();
        let mut json = serde_json::to_string_pretty(&entries).map_err(|e| failure(e.into()))?;
        json.push('\n');

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(failure)?;
        }

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(failure)?;
        if let Err(e) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(failure(e));
        }

        debug!(path = %path.display(), records = self.records.len(), "snapshot written");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, position: usize) -> Result<&Record, LabelError> {
        self.records
            .get(position)
            .ok_or(LabelError::IndexOutOfRange {
                position,
                count: self.records.len(),
            })
    }

    /// Replaces the label at `position` and returns the previous one.
    pub fn set_label(
        &mut self,
        position: usize,
        label: Option<String>,
    ) -> Result<Option<String>, LabelError> {
        let count = self.records.len();
        let record = self
            .records
            .get_mut(position)
            .ok_or(LabelError::IndexOutOfRange { position, count })?;
        Ok(std::mem::replace(&mut record.label, label))
    }

    pub fn first_unlabeled(&self) -> Option<usize> {
        self.records.iter().position(|r| !r.is_labeled())
    }

    pub fn labeled_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_labeled()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.records.iter().map(|r| r.path.as_path())
    }
}

/// Snapshot entries in file order, repeated keys included.
struct Entries(Vec<(usize, Record)>);

impl<'de> Deserialize<'de> for Entries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = Entries;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of positions to records")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Entries, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<usize, Record>()? {
                    entries.push(entry);
                }
                Ok(Entries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}
