//! # Quire Editor
//!
//! Rich-text document editing engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ host: key events, toolbar, rendering        │
//! └─────────────────────────────────────────────┘
//!                     ↓ Command
//! ┌─────────────────────────────────────────────┐
//! │ editor: command bus + transactions          │
//! │  - Prioritized command handlers             │
//! │  - Copy-on-write snapshots                  │
//! │  - Normalize, validate, publish             │
//! │  - Undo/redo with typing coalescing         │
//! └─────────────────────────────────────────────┘
//!                     ↓ EditorState
//! ┌─────────────────────────────────────────────┐
//! │ serializer / compiler-html: JSON, HTML      │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Snapshots are immutable**: every edit produces a new one
//! 2. **Transactions are atomic**: a failed edit leaves nothing behind
//! 3. **Keys are identity**: a node keeps its key across edits
//! 4. **Commands are data**: hosts and plugins intercept them by priority
//!
//! ## Usage
//!
//! ```rust,ignore
//! use quire_editor::{Command, Editor, TextFormat};
//!
//! let mut editor = Editor::default();
//! editor.dispatch(Command::InsertText("Hello".into()))?;
//! editor.dispatch(Command::ToggleFormat(TextFormat::BOLD))?;
//!
//! let json = editor.to_json_string()?;
//! ```

mod commands;
mod config;
mod editor;
mod errors;
mod history;
mod id_generator;
mod mutations;
mod node;
mod rich_text;
mod selection;
mod serializer;
mod state;
mod toolbar;
mod transaction;
mod visitor;

pub use commands::{Command, CommandBus, CommandHandler, CommandKind, CommandPriority, CommandRegistration};
pub use config::{EditorConfig, HistoryConfig};
pub use editor::{Editor, ListenerId, UpdateListener};
pub use errors::{DeserializationError, EditorError, EditorWarning, ValidationError};
pub use history::{register_history, HistoryManager, Significance};
pub use id_generator::{KeyGenerator, NodeKey};
pub use node::{
    Alignment, BlockType, DecoratorPayload, ElementProps, ElementTag, HeadingLevel, ImagePayload, ListType, Node,
    NodeData, TextFormat, TextNode,
};
pub use rich_text::register_rich_text;
pub use selection::{Point, Selection};
pub use serializer::{
    SerializedDocument, SerializedElement, SerializedHeading, SerializedList, SerializedNode, SerializedText,
    DOCUMENT_VERSION,
};
pub use state::{Caret, EditorState, LeafSpan};
pub use toolbar::ToolbarState;
pub use transaction::{QueuedMutator, Transaction, UpdateOutcome, UpdatePhase, UpdateQueue, UpdateTag};
pub use visitor::{walk_children, walk_node, walk_state, Visitor};

/// Editing operations usable inside custom command handlers
pub mod ops {
    pub use crate::mutations::*;
}

/// JSON import/export functions
pub mod json {
    pub use crate::serializer::{export, from_json_str, import, to_json_pretty, to_json_string};
}
