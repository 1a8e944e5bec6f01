use std::fmt;

use crate::{LabelError, RecordStore};

/// Reported when a move had to be clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    PastLast,
    BeforeFirst,
    AllLabeled,
}

impl Boundary {
    pub fn message(&self) -> &'static str {
        match self {
            Boundary::PastLast => "cannot go past last image",
            Boundary::BeforeFirst => "cannot go before first image",
            Boundary::AllLabeled => "all images are labeled",
        }
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Current position within `count` records.
///
/// The position stays within `[0, count - 1]`; moves that would leave that
/// range are clamped and report a [`Boundary`]. There is no terminal state,
/// the navigator simply stays on the last record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigator {
    position: usize,
    count: usize,
}

impl Navigator {
    pub fn new(count: usize) -> Self {
        Self { position: 0, count }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn count(&self) -> usize {
        self.count
    }

    fn last(&self) -> usize {
        self.count.saturating_sub(1)
    }

    pub fn next(&mut self) -> Option<Boundary> {
        if self.position + 1 >= self.count {
            self.position = self.last();
            return Some(Boundary::PastLast);
        }
        self.position += 1;
        None
    }

    pub fn prev(&mut self) -> Option<Boundary> {
        match self.position.checked_sub(1) {
            Some(position) => {
                self.position = position;
                None
            }
            None => Some(Boundary::BeforeFirst),
        }
    }

    /// Moves to the lowest unlabeled position, or to the last one when every
    /// record carries a label.
    ///
    /// A plain linear scan; sessions hold at most a few thousand records.
    pub fn jump_to_unlabeled(&mut self, store: &RecordStore) -> Option<Boundary> {
        match store.first_unlabeled() {
            Some(position) if position < self.count => {
                self.position = position;
                None
            }
            _ => {
                self.position = self.last();
                Some(Boundary::AllLabeled)
            }
        }
    }

    pub fn seek(&mut self, position: usize) -> Result<(), LabelError> {
        if position >= self.count {
            return Err(LabelError::IndexOutOfRange {
                position,
                count: self.count,
            });
        }
        self.position = position;
        Ok(())
    }
}
