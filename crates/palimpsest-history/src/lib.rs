#![forbid(unsafe_code)]

//! History: versioned undo/redo for palimpsest documents.
//!
//! # Role in palimpsest
//! `palimpsest-history` records every document edit as an `(undo, redo)`
//! pair of structural operations, groups pairs into Versions, and moves the
//! document to any Version by replaying pairs. Distant Versions are kept in
//! encoded form and reconciled against current state when used again.
//!
//! # Primary responsibilities
//! - **Operations**: [`UndoItem`] and the [`apply`](apply::apply) executor.
//! - **Log**: [`HistoryLog`] of [`Version`]s with a cursor.
//! - **Reconciliation**: repairing drifted values or flagging them erroneous.
//! - **Editing surface**: [`Editor`] capture helpers, groups and time travel.
//! - **Off-thread work**: [`BatchJob`] with cooperative cancellation.
//!
//! # Example
//!
//! ```
//! use palimpsest_core::{Document, Guide, Orientation};
//! use palimpsest_history::{Editor, target::Guides};
//!
//! let mut editor = Editor::new(Document::with_keyframes(1));
//! let guide = Guide { orientation: Orientation::Horizontal, position: 12.0 };
//! editor.append("add guide", Guides, vec![guide]);
//! editor.undo();
//! assert!(editor.document().guides.is_empty());
//! editor.redo();
//! assert_eq!(editor.document().guides.len(), 1);
//! ```

pub mod apply;
pub mod batch;
pub mod config;
pub mod editor;
pub mod error;
pub mod item;
pub mod log;
pub mod pasteboard;
pub mod reconcile;
pub mod target;
pub mod value;

pub use apply::{ApplyOutcome, Highlight, SkipReason, Touched, apply};
pub use batch::{BatchJob, BatchOutcome, CancellationToken, DocumentSnapshot};
pub use config::HistoryConfig;
pub use editor::Editor;
pub use error::{HistoryError, Result};
pub use item::{Edit, Indexed, ItemKind, UndoItem};
pub use log::{HistoryLog, Step};
pub use pasteboard::{Pasteboard, Selection};
pub use reconcile::{Reconciliation, reconcile};
pub use value::{Direction, ItemPair, Storage, UndoDataValue, Version};
