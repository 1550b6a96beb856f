#![forbid(unsafe_code)]

//! The history log: an ordered list of Versions and a cursor.
//!
//! # Invariants
//!
//! 1. `cursor <= versions.len()`; `cursor` is the number of applied Versions.
//! 2. `versions.len() <= config.max_depth` after every mutation.
//! 3. Opening a new group discards every Version after the cursor.
//! 4. [`HistoryLog::undo_and_results`] is pure: it lists steps, the caller
//!    applies them and then moves the cursor with [`HistoryLog::set_cursor`].
//!
//! ```text
//! versions: [v0, v1, v2, v3]      cursor = 2 (v0, v1 applied)
//!
//! undo_and_results(0) -> v1 (last value first), v0 (last value first), Undo
//! undo_and_results(4) -> v2 (first value first), v3 (first value first), Redo
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::HistoryConfig;
use crate::error::{HistoryError, Result};
use crate::item::UndoItem;
use crate::value::{Direction, UndoDataValue, Version};

/// One value to apply during time travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub version: usize,
    pub value: usize,
    pub direction: Direction,
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    cursor: usize,
    versions: Vec<Version>,
}

/// Versions plus the cursor separating applied from redoable ones.
#[derive(Clone, Default)]
pub struct HistoryLog {
    versions: Vec<Version>,
    cursor: usize,
    config: HistoryConfig,
}

impl fmt::Debug for HistoryLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryLog")
            .field("versions", &self.versions.len())
            .field("cursor", &self.cursor)
            .field("config", &self.config)
            .finish()
    }
}

impl HistoryLog {
    /// An empty log. Zero limits in `config` are raised to one.
    #[must_use]
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            versions: Vec::new(),
            cursor: 0,
            config: config.sanitized(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.cursor < self.versions.len()
    }

    #[must_use]
    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    #[must_use]
    pub fn version(&self, index: usize) -> Option<&Version> {
        self.versions.get(index)
    }

    pub(crate) fn version_mut(&mut self, index: usize) -> Option<&mut Version> {
        self.versions.get_mut(index)
    }

    /// Description of the Version the next undo reverts.
    #[must_use]
    pub fn undo_description(&self) -> Option<&str> {
        self.cursor
            .checked_sub(1)
            .and_then(|i| self.versions.get(i))
            .map(|v| v.description.as_str())
    }

    /// Description of the Version the next redo re-applies.
    #[must_use]
    pub fn redo_description(&self) -> Option<&str> {
        self.versions
            .get(self.cursor)
            .map(|v| v.description.as_str())
    }

    /// Open a new undo group.
    ///
    /// Discards the redo branch, pushes a Version (seeded with a restore-root
    /// value when `restore_root` is given), advances the cursor and evicts the
    /// oldest Versions beyond `max_depth`.
    pub fn new_undo_group(
        &mut self,
        description: impl Into<String>,
        restore_root: Option<usize>,
    ) -> &mut Version {
        let discarded = self.versions.len() - self.cursor;
        self.versions.truncate(self.cursor);
        if discarded > 0 {
            tracing::debug!(target: "palimpsest.history", discarded, "discarded redo branch");
        }

        let description = description.into();
        let version = match restore_root {
            Some(root) => Version::with_restore_root(description, root),
            None => Version::new(description),
        };
        self.versions.push(version);

        let max_depth = self.config.max_depth.max(1);
        if self.versions.len() > max_depth {
            let evicted = self.versions.len() - max_depth;
            self.versions.drain(..evicted);
            tracing::debug!(target: "palimpsest.history", evicted, "evicted oldest versions");
        }
        self.cursor = self.versions.len();

        let last = self.versions.len() - 1;
        &mut self.versions[last]
    }

    /// Append a loaded value to the Version at the cursor.
    ///
    /// Opens a new group first if no Version is open at the cursor or a
    /// redo branch would be left behind.
    pub fn append(&mut self, undo: UndoItem, redo: UndoItem) {
        if self.cursor == 0 || self.cursor < self.versions.len() {
            self.new_undo_group(String::new(), None);
        }
        let index = self.cursor - 1;
        self.versions[index].push(UndoDataValue::new(undo, redo));
    }

    /// The steps moving the cursor to `target`, in application order.
    ///
    /// `target` is clamped to the number of Versions.
    #[must_use]
    pub fn undo_and_results(&self, target: usize) -> Vec<Step> {
        let target = target.min(self.versions.len());
        let mut steps = Vec::new();
        if target < self.cursor {
            for version in (target..self.cursor).rev() {
                let len = self.versions[version].len();
                steps.extend((0..len).rev().map(|value| Step {
                    version,
                    value,
                    direction: Direction::Undo,
                }));
            }
        } else {
            for version in self.cursor..target {
                let len = self.versions[version].len();
                steps.extend((0..len).map(|value| Step {
                    version,
                    value,
                    direction: Direction::Redo,
                }));
            }
        }
        steps
    }

    /// Move the cursor after the steps of `undo_and_results(target)` ran.
    pub fn set_cursor(&mut self, target: usize) {
        self.cursor = target.min(self.versions.len());
    }

    /// Drop every Version.
    pub fn reset(&mut self) {
        self.versions.clear();
        self.cursor = 0;
    }

    /// Unload Versions farther than `keep_loaded` from the cursor.
    ///
    /// Returns how many Versions were unloaded.
    pub fn unload_distant(&mut self) -> Result<usize> {
        let keep = self.config.keep_loaded;
        let cursor = self.cursor;
        let mut unloaded = 0;
        for (index, version) in self.versions.iter_mut().enumerate() {
            let distance = if index < cursor {
                cursor - 1 - index
            } else {
                index - cursor
            };
            if distance >= keep && version.is_loaded() {
                version.unload()?;
                unloaded += 1;
            }
        }
        if unloaded > 0 {
            tracing::debug!(target: "palimpsest.history", unloaded, "unloaded distant versions");
        }
        Ok(unloaded)
    }

    /// Serialize the log with every value in unloaded form.
    pub fn to_json(&self) -> Result<String> {
        let mut versions = self.versions.clone();
        versions.iter_mut().try_for_each(Version::unload)?;
        let snapshot = Snapshot {
            cursor: self.cursor,
            versions,
        };
        serde_json::to_string(&snapshot).map_err(HistoryError::Encode)
    }

    /// Rebuild a log from [`HistoryLog::to_json`] output.
    ///
    /// Every value comes back marked for reconciliation.
    pub fn from_json(json: &str, config: HistoryConfig) -> Result<Self> {
        let mut snapshot: Snapshot = serde_json::from_str(json).map_err(HistoryError::Decode)?;
        if snapshot.cursor > snapshot.versions.len() {
            return Err(HistoryError::Decode(<serde_json::Error as serde::de::Error>::custom(
                format!(
                    "cursor {} exceeds {} versions",
                    snapshot.cursor,
                    snapshot.versions.len()
                ),
            )));
        }
        for version in &mut snapshot.versions {
            version.require_check();
        }
        Ok(Self {
            versions: snapshot.versions,
            cursor: snapshot.cursor,
            config: config.sanitized(),
        })
    }
}
