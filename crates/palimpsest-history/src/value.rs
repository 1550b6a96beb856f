#![forbid(unsafe_code)]

//! Undo data values and versions.
//!
//! An [`UndoDataValue`] pairs the forward (redo) and inverse (undo) items of
//! one recorded edit. It is either loaded, holding both items, or unloaded,
//! holding their encoded form only. Unloaded values are decoded on first use
//! and must then pass through the reconciler, because the state they were
//! computed from may have drifted.
//!
//! A [`Version`] is one undo group: the values recorded by one user action.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{HistoryError, Result};
use crate::item::{ItemKind, UndoItem};

/// Direction of one replay step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Undo,
    Redo,
}

impl Direction {
    /// The opposite direction.
    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::Undo => Self::Redo,
            Self::Redo => Self::Undo,
        }
    }
}

/// A decoded `(undo, redo)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemPair {
    pub undo: UndoItem,
    pub redo: UndoItem,
}

impl ItemPair {
    #[must_use]
    pub fn new(undo: UndoItem, redo: UndoItem) -> Self {
        Self { undo, redo }
    }

    #[must_use]
    pub fn side(&self, direction: Direction) -> &UndoItem {
        match direction {
            Direction::Undo => &self.undo,
            Direction::Redo => &self.redo,
        }
    }

    /// The side about to be applied and the side that reverts it.
    pub fn split_mut(&mut self, direction: Direction) -> (&mut UndoItem, &mut UndoItem) {
        match direction {
            Direction::Undo => (&mut self.undo, &mut self.redo),
            Direction::Redo => (&mut self.redo, &mut self.undo),
        }
    }
}

/// Encoded form of an unloaded pair: the item tag plus the serialized pair.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedPair {
    pub kind: ItemKind,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for EncodedPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedPair")
            .field("kind", &self.kind)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl EncodedPair {
    pub fn encode(pair: &ItemPair) -> Result<Self> {
        let bytes = serde_json::to_vec(pair).map_err(HistoryError::Encode)?;
        Ok(Self {
            kind: pair.redo.kind(),
            bytes,
        })
    }

    pub fn decode(&self) -> Result<ItemPair> {
        serde_json::from_slice(&self.bytes).map_err(HistoryError::Decode)
    }
}

/// Storage state of a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Storage {
    Loaded(ItemPair),
    Unloaded(EncodedPair),
}

/// One recorded edit: an undo/redo pair plus its storage and health flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndoDataValue {
    storage: Storage,
    /// Must be reconciled before its next application.
    needs_check: bool,
    /// Reconciliation found no consistent repair; replay skips this value.
    erroneous: bool,
}

impl UndoDataValue {
    /// A loaded value recorded against the current document.
    #[must_use]
    pub fn new(undo: UndoItem, redo: UndoItem) -> Self {
        Self {
            storage: Storage::Loaded(ItemPair::new(undo, redo)),
            needs_check: false,
            erroneous: false,
        }
    }

    /// An unloaded value; it will be reconciled on first use.
    #[must_use]
    pub fn unloaded(encoded: EncodedPair) -> Self {
        Self {
            storage: Storage::Unloaded(encoded),
            needs_check: true,
            erroneous: false,
        }
    }

    /// A value restoring the animation root index in both directions.
    #[must_use]
    pub fn restore_root(root: usize) -> Self {
        Self::new(UndoItem::RootIndex(root), UndoItem::RootIndex(root))
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        matches!(self.storage, Storage::Loaded(_))
    }

    #[must_use]
    pub fn needs_check(&self) -> bool {
        self.needs_check
    }

    #[must_use]
    pub fn is_erroneous(&self) -> bool {
        self.erroneous
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Item kind, available without decoding.
    #[must_use]
    pub fn kind(&self) -> ItemKind {
        match &self.storage {
            Storage::Loaded(pair) => pair.redo.kind(),
            Storage::Unloaded(encoded) => encoded.kind,
        }
    }

    /// The decoded pair, if loaded.
    #[must_use]
    pub fn pair(&self) -> Option<&ItemPair> {
        match &self.storage {
            Storage::Loaded(pair) => Some(pair),
            Storage::Unloaded(_) => None,
        }
    }

    /// Decode an unloaded value in place. Loaded values are left untouched.
    ///
    /// The value keeps `needs_check` set until it is reconciled.
    pub fn materialize(&mut self) -> Result<&mut ItemPair> {
        if let Storage::Unloaded(encoded) = &self.storage {
            let pair = encoded.decode()?;
            self.storage = Storage::Loaded(pair);
        }
        match &mut self.storage {
            Storage::Loaded(pair) => Ok(pair),
            Storage::Unloaded(_) => unreachable!("storage was just loaded"),
        }
    }

    /// Re-encode a loaded value to release its decoded payload.
    ///
    /// Erroneous values are kept as they are.
    pub fn unload(&mut self) -> Result<()> {
        if self.erroneous {
            return Ok(());
        }
        if let Storage::Loaded(pair) = &self.storage {
            let encoded = EncodedPair::encode(pair)?;
            self.storage = Storage::Unloaded(encoded);
            self.needs_check = true;
        }
        Ok(())
    }

    pub(crate) fn require_check(&mut self) {
        if !self.erroneous {
            self.needs_check = true;
        }
    }

    pub(crate) fn mark_checked(&mut self) {
        self.needs_check = false;
    }

    pub(crate) fn mark_erroneous(&mut self) {
        self.erroneous = true;
        self.needs_check = false;
    }
}

/// One undo group.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Version {
    pub description: String,
    values: Vec<UndoDataValue>,
    /// The head value restores the root index captured for this version.
    first_reverse: bool,
}

impl Version {
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            values: Vec::new(),
            first_reverse: false,
        }
    }

    /// A version whose head restores `root` in both directions.
    #[must_use]
    pub fn with_restore_root(description: impl Into<String>, root: usize) -> Self {
        let mut version = Self::new(description);
        version.values.push(UndoDataValue::restore_root(root));
        version.first_reverse = true;
        version
    }

    #[must_use]
    pub fn values(&self) -> &[UndoDataValue] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn first_reverse(&self) -> bool {
        self.first_reverse
    }

    #[must_use]
    pub fn value(&self, index: usize) -> Option<&UndoDataValue> {
        self.values.get(index)
    }

    pub(crate) fn value_mut(&mut self, index: usize) -> Option<&mut UndoDataValue> {
        self.values.get_mut(index)
    }

    pub fn push(&mut self, value: UndoDataValue) {
        self.values.push(value);
    }

    /// Insert a restore-root value at the head and flag the version.
    ///
    /// Returns `false` if the version was already flagged.
    pub(crate) fn insert_restore_root(&mut self, root: usize) -> bool {
        if self.first_reverse {
            return false;
        }
        self.values.insert(0, UndoDataValue::restore_root(root));
        self.first_reverse = true;
        true
    }

    /// Number of erroneous values.
    #[must_use]
    pub fn erroneous_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_erroneous()).count()
    }

    /// Unload every value. Stops at the first encoding failure.
    pub fn unload(&mut self) -> Result<()> {
        self.values.iter_mut().try_for_each(UndoDataValue::unload)
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.values.iter().all(UndoDataValue::is_loaded)
    }

    pub(crate) fn require_check(&mut self) {
        self.values.iter_mut().for_each(UndoDataValue::require_check);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Edit;
    use palimpsest_core::Layer;
    use palimpsest_core::fixtures::stroke;

    fn pair() -> ItemPair {
        ItemPair::new(
            UndoItem::Strokes {
                keyframe: 0,
                layer: Layer::Main,
                edit: Edit::Remove(vec![0]),
            },
            UndoItem::Strokes {
                keyframe: 0,
                layer: Layer::Main,
                edit: Edit::Append(vec![stroke(1)]),
            },
        )
    }

    #[test]
    fn unload_then_materialize_restores_pair() {
        let original = pair();
        let mut value = UndoDataValue::new(original.undo.clone(), original.redo.clone());
        assert!(!value.needs_check());

        value.unload().unwrap();
        assert!(!value.is_loaded());
        assert!(value.needs_check());
        assert_eq!(value.kind(), ItemKind::Strokes);
        assert!(value.pair().is_none());

        let decoded = value.materialize().unwrap().clone();
        assert_eq!(decoded, original);
        assert!(value.is_loaded());
        assert!(value.needs_check());
    }

    #[test]
    fn corrupt_bytes_fail_to_decode() {
        let mut value = UndoDataValue::unloaded(EncodedPair {
            kind: ItemKind::Strokes,
            bytes: b"{not json".to_vec(),
        });
        assert!(matches!(value.materialize(), Err(HistoryError::Decode(_))));
        assert!(!value.is_loaded());
    }

    #[test]
    fn erroneous_values_stay_loaded() {
        let mut value = UndoDataValue::new(pair().undo, pair().redo);
        value.mark_erroneous();
        value.unload().unwrap();
        assert!(value.is_loaded());
        assert!(value.is_erroneous());
    }

    #[test]
    fn split_mut_orders_sides_by_direction() {
        let mut p = pair();
        let (apply, other) = p.split_mut(Direction::Redo);
        assert_eq!(apply.edit_name(), "append");
        assert_eq!(other.edit_name(), "remove");
        assert_eq!(Direction::Redo.reversed(), Direction::Undo);
    }

    #[test]
    fn restore_root_head_is_inserted_once() {
        let mut version = Version::new("draw");
        version.push(UndoDataValue::new(pair().undo, pair().redo));
        assert!(version.insert_restore_root(3));
        assert!(!version.insert_restore_root(5));
        assert_eq!(version.len(), 2);
        assert_eq!(
            version.value(0).and_then(UndoDataValue::pair).map(|p| &p.redo),
            Some(&UndoItem::RootIndex(3))
        );
        assert!(version.first_reverse());
    }

    #[test]
    fn encoded_pair_debug_hides_bytes() {
        let encoded = EncodedPair::encode(&pair()).unwrap();
        let debug = format!("{encoded:?}");
        assert!(debug.contains("EncodedPair"));
        assert!(debug.contains("len"));
    }
}
