//! # History Manager
//!
//! Snapshot-based undo/redo. The top of the undo stack is always the
//! current snapshot, so undo pops it onto the redo stack and republishes
//! the entry below.
//!
//! ## Coalescing
//!
//! Low-significance updates (single characters typed) arriving within the
//! coalesce window of the previous low-significance update replace the top
//! entry instead of pushing a new one. Anything else closes the burst:
//!
//! ```text
//!   [t, t, t]  -> 1 entry
//!   [t, t, S]  -> 2 entries
//!   [t, S, t]  -> 3 entries
//! ```

use std::rc::Rc;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::commands::{CommandKind, CommandPriority, CommandRegistration};
use crate::config::HistoryConfig;
use crate::editor::Editor;
use crate::state::EditorState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Significance {
    /// May be merged with neighbouring low-significance updates
    Low,
    #[default]
    High,
}

#[derive(Debug, Clone)]
struct HistoryEntry {
    state: Rc<EditorState>,
    significance: Significance,
    recorded_at: Instant,
}

#[derive(Debug)]
pub struct HistoryManager {
    /// Most recent last; the last entry is the current snapshot
    undo_stack: Vec<HistoryEntry>,
    /// Most recent last
    redo_stack: Vec<HistoryEntry>,
    config: HistoryConfig,
    /// Whether the top entry may absorb the next low-significance update
    burst_open: bool,
}

impl HistoryManager {
    pub fn new(initial: Rc<EditorState>, config: HistoryConfig) -> Self {
        Self {
            undo_stack: vec![HistoryEntry {
                state: initial,
                significance: Significance::High,
                recorded_at: Instant::now(),
            }],
            redo_stack: Vec::new(),
            config,
            burst_open: false,
        }
    }

    pub fn current(&self) -> Option<&Rc<EditorState>> {
        self.undo_stack.last().map(|entry| &entry.state)
    }

    pub fn record(&mut self, state: Rc<EditorState>, significance: Significance) {
        self.record_at(state, significance, Instant::now());
    }

    /// Record a published snapshot as the new current entry
    ///
    /// Clears the redo stack.
    pub fn record_at(&mut self, state: Rc<EditorState>, significance: Significance, now: Instant) {
        self.redo_stack.clear();

        let window = Duration::from_millis(self.config.coalesce_window_ms);
        let coalesce = significance == Significance::Low
            && self.burst_open
            && self.undo_stack.len() > 1
            && self.undo_stack.last().is_some_and(|top| {
                top.significance == Significance::Low && now.saturating_duration_since(top.recorded_at) <= window
            });

        let entry = HistoryEntry {
            state,
            significance,
            recorded_at: now,
        };

        if coalesce {
            trace!("coalescing history entry");
            if let Some(top) = self.undo_stack.last_mut() {
                *top = entry;
            }
        } else {
            self.undo_stack.push(entry);
            self.trim();
        }
        self.burst_open = significance == Significance::Low;
    }

    /// Swap the current snapshot without adding an undo level
    ///
    /// Used for selection-only changes. Closes any open burst.
    pub fn replace_current(&mut self, state: Rc<EditorState>) {
        if let Some(top) = self.undo_stack.last_mut() {
            top.state = state;
        }
        self.burst_open = false;
    }

    pub fn undo(&mut self) -> Option<Rc<EditorState>> {
        if !self.can_undo() {
            return None;
        }
        self.burst_open = false;
        let entry = self.undo_stack.pop()?;
        self.redo_stack.push(entry);
        self.current().cloned()
    }

    pub fn redo(&mut self) -> Option<Rc<EditorState>> {
        let entry = self.redo_stack.pop()?;
        self.burst_open = false;
        let state = Rc::clone(&entry.state);
        self.undo_stack.push(entry);
        Some(state)
    }

    pub fn can_undo(&self) -> bool {
        self.undo_stack.len() > 1
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len().saturating_sub(1)
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    /// Drop every level, keeping the current snapshot
    pub fn clear(&mut self) {
        let top = self.undo_stack.pop();
        self.undo_stack.clear();
        self.undo_stack.extend(top);
        self.redo_stack.clear();
        self.burst_open = false;
    }

    /// Start over from `state`
    pub fn reset(&mut self, state: Rc<EditorState>) {
        *self = Self::new(state, self.config);
    }

    fn trim(&mut self) {
        let max = self.config.max_levels;
        if max > 0 && self.undo_levels() > max {
            let excess = self.undo_levels() - max;
            self.undo_stack.drain(..excess);
        }
    }
}

/// Route Undo, Redo and ClearHistory to the editor's history
pub fn register_history(editor: &mut Editor) -> Vec<CommandRegistration> {
    vec![
        editor.register_command(CommandKind::Undo, CommandPriority::Editor, |editor, _| {
            editor.undo();
            Ok(true)
        }),
        editor.register_command(CommandKind::Redo, CommandPriority::Editor, |editor, _| {
            editor.redo();
            Ok(true)
        }),
        editor.register_command(CommandKind::ClearHistory, CommandPriority::Editor, |editor, _| {
            editor.clear_history();
            Ok(true)
        }),
    ]
}
