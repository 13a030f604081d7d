//! # Command Bus
//!
//! Typed commands routed to prioritized handlers. Dispatch tries handlers
//! from highest to lowest priority, ties in registration order, and stops at
//! the first one that reports the command handled.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::editor::Editor;
use crate::errors::EditorError;
use crate::node::{Alignment, BlockType, DecoratorPayload, ListType, TextFormat};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    InsertText(String),
    DeleteBackward,
    InsertParagraph,
    ToggleFormat(TextFormat),
    SetAlignment(Alignment),
    SetBlockType(BlockType),
    InsertList(ListType),
    RemoveList,
    InsertDecorator(DecoratorPayload),
    DuplicateBlock,
    Undo,
    Redo,
    ClearHistory,
}

/// Payload-free command identity, used as the registry key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    InsertText,
    DeleteBackward,
    InsertParagraph,
    ToggleFormat,
    SetAlignment,
    SetBlockType,
    InsertList,
    RemoveList,
    InsertDecorator,
    DuplicateBlock,
    Undo,
    Redo,
    ClearHistory,
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::InsertText(_) => CommandKind::InsertText,
            Command::DeleteBackward => CommandKind::DeleteBackward,
            Command::InsertParagraph => CommandKind::InsertParagraph,
            Command::ToggleFormat(_) => CommandKind::ToggleFormat,
            Command::SetAlignment(_) => CommandKind::SetAlignment,
            Command::SetBlockType(_) => CommandKind::SetBlockType,
            Command::InsertList(_) => CommandKind::InsertList,
            Command::RemoveList => CommandKind::RemoveList,
            Command::InsertDecorator(_) => CommandKind::InsertDecorator,
            Command::DuplicateBlock => CommandKind::DuplicateBlock,
            Command::Undo => CommandKind::Undo,
            Command::Redo => CommandKind::Redo,
            Command::ClearHistory => CommandKind::ClearHistory,
        }
    }
}

impl CommandKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::InsertText => "insert-text",
            CommandKind::DeleteBackward => "delete-backward",
            CommandKind::InsertParagraph => "insert-paragraph",
            CommandKind::ToggleFormat => "toggle-format",
            CommandKind::SetAlignment => "set-alignment",
            CommandKind::SetBlockType => "set-block-type",
            CommandKind::InsertList => "insert-list",
            CommandKind::RemoveList => "remove-list",
            CommandKind::InsertDecorator => "insert-decorator",
            CommandKind::DuplicateBlock => "duplicate-block",
            CommandKind::Undo => "undo",
            CommandKind::Redo => "redo",
            CommandKind::ClearHistory => "clear-history",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handler precedence, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CommandPriority {
    /// Built-in behaviour, runs after everything else
    Editor,
    Low,
    Normal,
    High,
    Critical,
}

/// Returns `Ok(true)` when the command was handled and dispatch should stop
pub type CommandHandler = Rc<dyn Fn(&mut Editor, &Command) -> Result<bool, EditorError>>;

/// Receipt for a registered handler, used to unregister it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandRegistration {
    kind: CommandKind,
    id: u64,
}

impl CommandRegistration {
    pub fn kind(&self) -> CommandKind {
        self.kind
    }
}

struct RegisteredHandler {
    id: u64,
    priority: CommandPriority,
    handler: CommandHandler,
}

#[derive(Default)]
pub struct CommandBus {
    handlers: HashMap<CommandKind, Vec<RegisteredHandler>>,
    next_id: u64,
}

impl CommandBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, kind: CommandKind, priority: CommandPriority, handler: F) -> CommandRegistration
    where
        F: Fn(&mut Editor, &Command) -> Result<bool, EditorError> + 'static,
    {
        self.next_id += 1;
        let id = self.next_id;

        let handlers = self.handlers.entry(kind).or_default();
        handlers.push(RegisteredHandler {
            id,
            priority,
            handler: Rc::new(handler),
        });
        // Descending priority, stable for equal priorities
        handlers.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)));

        CommandRegistration { kind, id }
    }

    pub fn unregister(&mut self, registration: CommandRegistration) -> bool {
        let Some(handlers) = self.handlers.get_mut(&registration.kind) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|entry| entry.id != registration.id);
        before != handlers.len()
    }

    /// Handlers for `kind` in dispatch order
    ///
    /// Returned as clones so the caller can hand the editor out mutably
    /// while iterating.
    pub fn handlers(&self, kind: CommandKind) -> Vec<CommandHandler> {
        self.handlers
            .get(&kind)
            .map(|entries| entries.iter().map(|entry| Rc::clone(&entry.handler)).collect())
            .unwrap_or_default()
    }

    pub fn handler_count(&self, kind: CommandKind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }
}

impl fmt::Debug for CommandBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<_, _> = self
            .handlers
            .iter()
            .map(|(kind, entries)| (kind.as_str(), entries.len()))
            .collect();
        f.debug_struct("CommandBus").field("handlers", &counts).finish()
    }
}
