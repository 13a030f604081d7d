//! # Editor
//!
//! Owns the current snapshot and everything that moves it forward: the key
//! generator, the command bus, history, update listeners and the queue of
//! deferred updates.
//!
//! ```text
//!   dispatch(Command) ──► handlers (by priority) ──► update(mutator)
//!                                                        │
//!   listeners ◄── publish ◄── history ◄── commit ◄───────┘
//!                    │
//!                    └──► drain queued updates, one transaction each
//! ```

use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::commands::{Command, CommandBus, CommandKind, CommandPriority, CommandRegistration};
use crate::config::EditorConfig;
use crate::errors::EditorError;
use crate::history::{register_history, HistoryManager};
use crate::id_generator::KeyGenerator;
use crate::node::{NodeData, TextFormat};
use crate::rich_text::register_rich_text;
use crate::selection::Selection;
use crate::serializer::{self, SerializedDocument};
use crate::state::EditorState;
use crate::transaction::{Transaction, UpdateOutcome, UpdatePhase, UpdateQueue, UpdateTag};

pub type UpdateListener = Box<dyn FnMut(&EditorState, &UpdateOutcome)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub struct Editor {
    config: EditorConfig,
    keys: KeyGenerator,
    current: Rc<EditorState>,
    history: HistoryManager,
    commands: CommandBus,
    listeners: Vec<(ListenerId, UpdateListener)>,
    next_listener: u64,
    queue: UpdateQueue,
    phase: UpdatePhase,
}

impl Editor {
    /// Bare editor over an empty document, no command handlers registered
    pub fn new(config: EditorConfig) -> Self {
        let mut keys = KeyGenerator::new();
        let current = Rc::new(EditorState::empty(&mut keys));
        let history = HistoryManager::new(Rc::clone(&current), config.history);

        Self {
            config,
            keys,
            current,
            history,
            commands: CommandBus::new(),
            listeners: Vec::new(),
            next_listener: 0,
            queue: UpdateQueue::default(),
            phase: UpdatePhase::Idle,
        }
    }

    /// Editor with the rich-text and history handlers registered
    pub fn with_rich_text(config: EditorConfig) -> Self {
        let mut editor = Self::new(config);
        register_rich_text(&mut editor);
        register_history(&mut editor);
        editor
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn phase(&self) -> UpdatePhase {
        self.phase
    }

    /// The current published snapshot
    pub fn state(&self) -> Rc<EditorState> {
        Rc::clone(&self.current)
    }

    pub fn read<R>(&self, f: impl FnOnce(&EditorState) -> R) -> R {
        f(&self.current)
    }

    pub fn selection(&self) -> Option<Selection> {
        self.current.selection().copied()
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    /// Handle for scheduling updates from outside a transaction, e.g. from a
    /// listener
    pub fn update_queue(&self) -> UpdateQueue {
        self.queue.clone()
    }

    // ------------------------------------------------------------------
    // Updates
    // ------------------------------------------------------------------

    pub fn update<F>(&mut self, mutator: F) -> Result<UpdateOutcome, EditorError>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<(), EditorError>,
    {
        self.update_with(UpdateTag::high(), mutator)
    }

    /// Run `mutator` in a transaction and publish the result
    ///
    /// On error nothing is published and updates the mutator queued are
    /// dropped. Updates queued by a successful commit (or by listeners)
    /// run afterwards, each in its own transaction.
    pub fn update_with<F>(&mut self, tag: UpdateTag, mutator: F) -> Result<UpdateOutcome, EditorError>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<(), EditorError>,
    {
        let outcome = self.run_transaction(tag, mutator)?;
        self.flush_queued_updates();
        Ok(outcome)
    }

    /// Run queued updates until the queue is empty, returning how many ran
    ///
    /// A failing queued update is logged and skipped.
    pub fn flush_queued_updates(&mut self) -> usize {
        let mut ran = 0;
        while let Some(next) = self.queue.pop() {
            ran += 1;
            trace!(namespace = %self.config.namespace, "running queued update");
            if let Err(err) = self.run_transaction(next.tag, next.mutator) {
                warn!(namespace = %self.config.namespace, %err, "queued update failed");
            }
        }
        ran
    }

    fn run_transaction<F>(&mut self, tag: UpdateTag, mutator: F) -> Result<UpdateOutcome, EditorError>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<(), EditorError>,
    {
        self.phase = UpdatePhase::Open;
        trace!(namespace = %self.config.namespace, ?tag, "transaction open");

        let mut tx = Transaction::new((*self.current).clone(), &mut self.keys);
        if let Err(err) = mutator(&mut tx) {
            self.phase = UpdatePhase::Idle;
            debug!(namespace = %self.config.namespace, %err, "transaction discarded");
            return Err(err);
        }

        self.phase = UpdatePhase::Applying;
        let committed = match tx.commit() {
            Ok(committed) => committed,
            Err(err) => {
                self.phase = UpdatePhase::Idle;
                debug!(namespace = %self.config.namespace, %err, "transaction failed validation");
                return Err(err.into());
            }
        };

        for update in committed.queued {
            self.queue.push_entry(update);
        }

        let outcome = UpdateOutcome {
            dirty: committed.dirty,
            tree_changed: committed.tree_changed,
            warnings: committed.warnings,
            tag,
        };

        if outcome.dirty {
            let state = Rc::new(committed.state);
            if !tag.skip_history {
                if outcome.tree_changed {
                    self.history.record(Rc::clone(&state), tag.significance);
                } else {
                    self.history.replace_current(Rc::clone(&state));
                }
            }
            self.current = state;
            debug!(
                namespace = %self.config.namespace,
                tree_changed = outcome.tree_changed,
                nodes = self.current.len(),
                "snapshot published"
            );
        }

        self.notify(&outcome);
        self.phase = UpdatePhase::Idle;
        Ok(outcome)
    }

    /// Publish a snapshot produced outside a transaction
    fn restore(&mut self, state: Rc<EditorState>) -> UpdateOutcome {
        self.phase = UpdatePhase::Applying;
        self.current = state;

        let outcome = UpdateOutcome {
            dirty: true,
            tree_changed: true,
            warnings: Vec::new(),
            tag: UpdateTag::historic(),
        };
        self.notify(&outcome);
        self.phase = UpdatePhase::Idle;
        self.flush_queued_updates();
        outcome
    }

    fn notify(&mut self, outcome: &UpdateOutcome) {
        let state = Rc::clone(&self.current);
        for (_, listener) in self.listeners.iter_mut() {
            listener(&state, outcome);
        }
    }

    /// Replace the selection, picking up the format of the text under it
    pub fn set_selection(&mut self, selection: Option<Selection>) -> Result<UpdateOutcome, EditorError> {
        self.update(move |tx| {
            let selection = selection.map(|sel| {
                let format = format_at(tx.state(), &sel);
                sel.with_format(format)
            });
            tx.set_selection(selection);
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Listeners
    // ------------------------------------------------------------------

    /// Called once per publish, in registration order
    pub fn register_update_listener<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&EditorState, &UpdateOutcome) + 'static,
    {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn remove_update_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        before != self.listeners.len()
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    pub fn register_command<F>(&mut self, kind: CommandKind, priority: CommandPriority, handler: F) -> CommandRegistration
    where
        F: Fn(&mut Editor, &Command) -> Result<bool, EditorError> + 'static,
    {
        self.commands.register(kind, priority, handler)
    }

    pub fn unregister_command(&mut self, registration: CommandRegistration) -> bool {
        self.commands.unregister(registration)
    }

    pub fn commands(&self) -> &CommandBus {
        &self.commands
    }

    /// Offer `command` to its handlers until one handles it
    ///
    /// Returns `Ok(false)` when no handler took it. A handler error stops
    /// dispatch and is returned as is.
    pub fn dispatch(&mut self, command: Command) -> Result<bool, EditorError> {
        let kind = command.kind();
        for handler in self.commands.handlers(kind) {
            if handler(self, &command)? {
                debug!(namespace = %self.config.namespace, command = %kind, "command handled");
                return Ok(true);
            }
        }
        debug!(namespace = %self.config.namespace, command = %kind, "command not handled");
        Ok(false)
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(state) => {
                self.restore(state);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(state) => {
                self.restore(state);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    // ------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------

    pub fn export_json(&self) -> SerializedDocument {
        serializer::export(&self.current)
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serializer::to_json_string(&self.current)
    }

    /// Replace the document with a parsed one
    ///
    /// The imported tree gets fresh keys and no selection, and history
    /// starts over from it. On error the current document is untouched.
    pub fn import_json(&mut self, json: &str) -> Result<UpdateOutcome, EditorError> {
        let state = serializer::from_json_str(json, &mut self.keys)?;
        let state = Rc::new(state);
        self.history.reset(Rc::clone(&state));
        debug!(namespace = %self.config.namespace, nodes = state.len(), "document imported");
        Ok(self.restore(state))
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::with_rich_text(EditorConfig::default())
    }
}

impl fmt::Debug for Editor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Editor")
            .field("namespace", &self.config.namespace)
            .field("phase", &self.phase)
            .field("nodes", &self.current.len())
            .field("listeners", &self.listeners.len())
            .field("commands", &self.commands)
            .finish()
    }
}

/// Format a selection should carry: that of the text it sits in or covers
fn format_at(state: &EditorState, selection: &Selection) -> TextFormat {
    if selection.is_range() {
        return state.selection_format(selection);
    }

    let point = selection.anchor;
    let Some(node) = state.node(point.key) else {
        return selection.format;
    };
    match node.data() {
        NodeData::Text(text) => text.format,
        _ if node.is_element() && point.offset > 0 => node
            .children()
            .get(point.offset - 1)
            .and_then(|key| state.node(*key))
            .and_then(|node| node.as_text())
            .map(|text| text.format)
            .unwrap_or_default(),
        _ => TextFormat::empty(),
    }
}
