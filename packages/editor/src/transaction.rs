//! # Transaction Engine
//!
//! A transaction is the only write path. It works on a private clone of the
//! current snapshot; nothing is visible to readers until commit.
//!
//! ```text
//!   current ──clone──► Transaction ──mutator──► normalize ──► validate
//!      ▲                                                         │
//!      └──────── publish (Rc) ◄── repair selection ◄─────────────┘
//! ```
//!
//! A failing mutator or a failed validation discards the clone and leaves
//! the current snapshot untouched.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use tracing::{trace, warn};

use crate::errors::{EditorError, EditorWarning, ValidationError};
use crate::history::Significance;
use crate::id_generator::{KeyGenerator, NodeKey};
use crate::node::{byte_offset, Alignment, ListType, Node, NodeData, TextFormat};
use crate::selection::{Point, Selection};
use crate::state::EditorState;

/// Lifecycle of the editor's update machinery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdatePhase {
    #[default]
    Idle,
    /// A mutator is running against a private clone
    Open,
    /// Normalizing, validating and publishing
    Applying,
}

/// How an update should be treated by history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateTag {
    pub significance: Significance,
    pub skip_history: bool,
}

impl UpdateTag {
    pub fn low() -> Self {
        Self {
            significance: Significance::Low,
            skip_history: false,
        }
    }

    pub fn high() -> Self {
        Self::default()
    }

    /// Published but never recorded, used for undo/redo and imports
    pub fn historic() -> Self {
        Self {
            significance: Significance::High,
            skip_history: true,
        }
    }
}

/// What a committed update changed
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpdateOutcome {
    /// A new snapshot was published
    pub dirty: bool,
    /// The tree changed, not just the selection
    pub tree_changed: bool,
    pub warnings: Vec<EditorWarning>,
    pub tag: UpdateTag,
}

pub type QueuedMutator = Box<dyn FnOnce(&mut Transaction<'_>) -> Result<(), EditorError>>;

pub(crate) struct QueuedUpdate {
    pub(crate) tag: UpdateTag,
    pub(crate) mutator: QueuedMutator,
}

/// FIFO of updates requested while another update was running
///
/// Cloning shares the queue, so a listener can capture a handle and push
/// follow-up work.
#[derive(Clone, Default)]
pub struct UpdateQueue {
    inner: Rc<RefCell<VecDeque<QueuedUpdate>>>,
}

impl UpdateQueue {
    pub fn push<F>(&self, tag: UpdateTag, mutator: F)
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<(), EditorError> + 'static,
    {
        self.push_entry(QueuedUpdate {
            tag,
            mutator: Box::new(mutator),
        });
    }

    pub(crate) fn push_entry(&self, update: QueuedUpdate) {
        self.inner.borrow_mut().push_back(update);
    }

    pub(crate) fn pop(&self) -> Option<QueuedUpdate> {
        self.inner.borrow_mut().pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }
}

impl fmt::Debug for UpdateQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateQueue").field("len", &self.len()).finish()
    }
}

pub(crate) struct Committed {
    pub(crate) state: EditorState,
    pub(crate) dirty: bool,
    pub(crate) tree_changed: bool,
    pub(crate) warnings: Vec<EditorWarning>,
    pub(crate) queued: Vec<QueuedUpdate>,
}

/// Write view over a private copy of the current snapshot
pub struct Transaction<'a> {
    state: EditorState,
    keys: &'a mut KeyGenerator,
    dirty: bool,
    tree_changed: bool,
    queued: Vec<QueuedUpdate>,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(state: EditorState, keys: &'a mut KeyGenerator) -> Self {
        Self {
            state,
            keys,
            dirty: false,
            tree_changed: false,
            queued: Vec::new(),
        }
    }

    /// The working copy, including edits made so far
    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn root_key(&self) -> NodeKey {
        self.state.root
    }

    pub fn node(&self, key: NodeKey) -> Result<&Node, ValidationError> {
        self.state.node(key).ok_or(ValidationError::NodeNotFound(key))
    }

    pub fn selection(&self) -> Option<Selection> {
        self.state.selection
    }

    pub fn set_selection(&mut self, selection: Option<Selection>) {
        if self.state.selection != selection {
            self.state.selection = selection;
            self.dirty = true;
        }
    }

    /// Schedule another update to run after this one commits
    ///
    /// Dropped if this transaction is discarded.
    pub fn queue_update<F>(&mut self, tag: UpdateTag, mutator: F)
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<(), EditorError> + 'static,
    {
        self.queued.push(QueuedUpdate {
            tag,
            mutator: Box::new(mutator),
        });
    }

    fn touch(&mut self) {
        self.dirty = true;
        self.tree_changed = true;
    }

    fn node_mut(&mut self, key: NodeKey) -> Result<&mut Node, ValidationError> {
        self.state
            .nodes
            .get_mut(&key)
            .ok_or(ValidationError::NodeNotFound(key))
    }

    fn children_mut(&mut self, key: NodeKey) -> Result<&mut Vec<NodeKey>, ValidationError> {
        self.node_mut(key)?
            .children_mut()
            .ok_or(ValidationError::NotAnElement(key))
    }

    fn text_mut(&mut self, key: NodeKey) -> Result<&mut crate::node::TextNode, ValidationError> {
        match self.node_mut(key)?.data_mut() {
            NodeData::Text(text) => Ok(text),
            _ => Err(ValidationError::NotText(key)),
        }
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    /// Create a detached node with a fresh key
    ///
    /// Any children listed in `data` are dropped; attach children with
    /// [`append`](Self::append) or [`insert_child`](Self::insert_child).
    pub fn create_node(&mut self, data: NodeData) -> NodeKey {
        let node = Node::create(self.keys, data.without_children());
        let key = node.key();
        self.state.nodes.insert(key, node);
        self.touch();
        key
    }

    pub fn append(&mut self, parent: NodeKey, child: NodeKey) -> Result<(), ValidationError> {
        let len = self.node(parent)?.children().len();
        self.insert_child(parent, len, child)
    }

    /// Place `child` at `index` under `parent`, moving it if attached
    pub fn insert_child(&mut self, parent: NodeKey, index: usize, child: NodeKey) -> Result<(), ValidationError> {
        let parent_node = self.node(parent)?;
        if !parent_node.is_element() {
            return Err(ValidationError::NotAnElement(parent));
        }
        let child_node = self.node(child)?;
        if child_node.is_root() || child == self.state.root {
            return Err(ValidationError::RootMutation);
        }
        if self.state.is_ancestor_or_self(child, parent) {
            return Err(ValidationError::CycleDetected(child));
        }

        let mut index = index;
        if child_node.parent() == Some(parent) {
            if let Some(current) = self.state.index_in_parent(child) {
                if current < index {
                    index -= 1;
                }
            }
        }
        if child_node.parent().is_some() {
            self.detach(child)?;
        }

        let len = self.node(parent)?.children().len();
        if index > len {
            return Err(ValidationError::OffsetOutOfRange {
                key: parent,
                offset: index,
                len,
            });
        }

        self.children_mut(parent)?.insert(index, child);
        self.node_mut(child)?.set_parent(Some(parent));
        self.shift_element_points(parent, index, 1);
        self.touch();
        Ok(())
    }

    pub fn insert_before(&mut self, sibling: NodeKey, node: NodeKey) -> Result<(), ValidationError> {
        let (parent, index) = self.position(sibling)?;
        self.insert_child(parent, index, node)
    }

    pub fn insert_after(&mut self, sibling: NodeKey, node: NodeKey) -> Result<(), ValidationError> {
        let (parent, index) = self.position(sibling)?;
        self.insert_child(parent, index + 1, node)
    }

    /// Parent and index of an attached node
    pub fn position(&self, key: NodeKey) -> Result<(NodeKey, usize), ValidationError> {
        if key == self.state.root {
            return Err(ValidationError::RootMutation);
        }
        let parent = self.node(key)?.parent().ok_or(ValidationError::Orphan(key))?;
        let index = self
            .state
            .index_in_parent(key)
            .ok_or(ValidationError::ParentMismatch {
                child: key,
                expected: parent,
                found: Some(parent),
            })?;
        Ok((parent, index))
    }

    /// Unlink a node from its parent, keeping it in the working copy
    ///
    /// A detached node must be reattached or removed before commit.
    pub fn detach(&mut self, key: NodeKey) -> Result<(), ValidationError> {
        let (parent, index) = self.position(key)?;
        self.children_mut(parent)?.remove(index);
        self.node_mut(key)?.set_parent(None);
        self.shift_element_points(parent, index, -1);
        self.touch();
        Ok(())
    }

    /// Remove a node and its whole subtree
    pub fn remove(&mut self, key: NodeKey) -> Result<(), ValidationError> {
        if key == self.state.root {
            return Err(ValidationError::RootMutation);
        }
        if self.node(key)?.parent().is_some() {
            self.detach(key)?;
        }

        let mut stack = vec![key];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.state.nodes.remove(&next) {
                stack.extend(node.children().iter().copied());
            }
        }
        self.touch();
        Ok(())
    }

    /// Append every child of `from` to `to`, leaving `from` empty
    pub fn move_children(&mut self, from: NodeKey, to: NodeKey) -> Result<(), ValidationError> {
        let children = self.node(from)?.children().to_vec();
        let base = self.node(to)?.children().len();
        let before = self.state.selection;
        for child in children {
            self.append(to, child)?;
        }
        self.follow_element_points(before, from, to, |offset| Some(base + offset));
        Ok(())
    }

    /// Deep copy of a subtree under fresh keys, detached
    pub fn clone_subtree(&mut self, key: NodeKey) -> Result<NodeKey, ValidationError> {
        let data = self.node(key)?.data().without_children();
        let children = self.node(key)?.children().to_vec();
        let copy = self.create_node(data);
        for child in children {
            let child_copy = self.clone_subtree(child)?;
            self.append(copy, child_copy)?;
        }
        Ok(copy)
    }

    /// Swap an element for a new one of a different type
    ///
    /// The replacement gets a fresh key, takes over the children and the
    /// alignment, and selection points on the old element follow it.
    pub fn replace_element(&mut self, key: NodeKey, data: NodeData) -> Result<NodeKey, ValidationError> {
        if key == self.state.root {
            return Err(ValidationError::RootMutation);
        }
        let old = self.node(key)?;
        let align = old.align().ok_or(ValidationError::NotAnElement(key))?;

        let mut data = data.without_children();
        match data.props_mut() {
            Some(props) => props.align = align,
            None => return Err(ValidationError::NotAnElement(key)),
        }

        let replacement = self.create_node(data);
        self.insert_before(key, replacement)?;
        self.move_children(key, replacement)?;
        self.remove(key)?;
        Ok(replacement)
    }

    /// Split a text node, returning the key of the right half
    ///
    /// The left half keeps the original key. Points past the split move to
    /// the right half; a point exactly at the split stays left.
    pub fn split_text(&mut self, key: NodeKey, offset: usize) -> Result<NodeKey, ValidationError> {
        let text = self.node(key)?.as_text().ok_or(ValidationError::NotText(key))?;
        let len = text.len();
        if offset > len {
            return Err(ValidationError::OffsetOutOfRange { key, offset, len });
        }

        let at = byte_offset(&text.text, offset);
        let right_text = text.text[at..].to_string();
        let format = text.format;

        self.text_mut(key)?.text.truncate(at);
        let right = self.create_node(NodeData::text(right_text, format));
        self.insert_after(key, right)?;

        if let Some(selection) = self.state.selection.as_mut() {
            for point in selection.points_mut() {
                if point.key == key && point.offset > offset {
                    *point = Point::new(right, point.offset - offset);
                }
            }
        }
        Ok(right)
    }

    /// Split an element before child `index`, returning the new right
    /// sibling which holds the moved children
    pub fn split_element(&mut self, key: NodeKey, index: usize) -> Result<NodeKey, ValidationError> {
        if key == self.state.root {
            return Err(ValidationError::RootMutation);
        }
        let node = self.node(key)?;
        let len = node.children().len();
        if !node.is_element() {
            return Err(ValidationError::NotAnElement(key));
        }
        if index > len {
            return Err(ValidationError::OffsetOutOfRange { key, offset: index, len });
        }

        let moved = node.children()[index..].to_vec();
        let data = node.data().without_children();
        let before = self.state.selection;
        let right = self.create_node(data);
        self.insert_after(key, right)?;
        for child in moved {
            self.append(right, child)?;
        }
        self.follow_element_points(before, key, right, |offset| (offset > index).then(|| offset - index));
        Ok(right)
    }

    /// Insert a detached node at a point, splitting whatever is in the way
    ///
    /// Inline nodes land inside the block holding the point. Block nodes
    /// land between blocks, splitting the containing block when the point
    /// is not at one of its boundaries.
    pub fn insert_at_point(&mut self, point: Point, node: NodeKey) -> Result<(), ValidationError> {
        let inserting_inline = self.node(node)?.is_inline();
        let target = self.node(point.key)?;

        if target.is_inline() {
            let size = target.size();
            let is_text = target.is_text();
            let (parent, index) = self.position(point.key)?;

            let index = if point.offset == 0 {
                index
            } else if point.offset >= size || !is_text {
                index + 1
            } else {
                self.split_text(point.key, point.offset)?;
                index + 1
            };

            return if inserting_inline {
                self.insert_child(parent, index, node)
            } else {
                self.insert_at_point(Point::new(parent, index), node)
            };
        }

        let accepts = match target.data() {
            NodeData::Element { .. } if target.is_root() => !inserting_inline,
            NodeData::List { .. } => matches!(self.node(node)?.data(), NodeData::ListItem(_)),
            _ => inserting_inline,
        };
        if accepts {
            return self.insert_child(point.key, point.offset, node);
        }

        if !target.is_block() || inserting_inline {
            return Err(ValidationError::InvalidChild {
                parent: point.key,
                child: node,
            });
        }

        let len = target.children().len();
        if point.offset == 0 {
            self.insert_before(point.key, node)
        } else if point.offset >= len {
            self.insert_after(point.key, node)
        } else {
            self.split_element(point.key, point.offset)?;
            self.insert_after(point.key, node)
        }
    }

    // ------------------------------------------------------------------
    // Payload
    // ------------------------------------------------------------------

    /// Insert characters at a character offset
    pub fn insert_text(&mut self, key: NodeKey, offset: usize, text: &str) -> Result<(), ValidationError> {
        let node = self.text_mut(key)?;
        let len = node.len();
        if offset > len {
            return Err(ValidationError::OffsetOutOfRange { key, offset, len });
        }
        let at = byte_offset(&node.text, offset);
        node.text.insert_str(at, text);
        self.touch();
        Ok(())
    }

    /// Delete the characters in `start..end`
    pub fn delete_text(&mut self, key: NodeKey, start: usize, end: usize) -> Result<(), ValidationError> {
        let node = self.text_mut(key)?;
        let len = node.len();
        if start > end || end > len {
            return Err(ValidationError::OffsetOutOfRange { key, offset: end, len });
        }
        let from = byte_offset(&node.text, start);
        let to = byte_offset(&node.text, end);
        node.text.replace_range(from..to, "");

        let removed = end - start;
        if let Some(selection) = self.state.selection.as_mut() {
            for point in selection.points_mut() {
                if point.key == key && point.offset > start {
                    point.offset = point.offset.saturating_sub(removed).max(start);
                }
            }
        }
        self.touch();
        Ok(())
    }

    pub fn set_format(&mut self, key: NodeKey, format: TextFormat) -> Result<(), ValidationError> {
        let text = self.text_mut(key)?;
        if text.format != format {
            text.format = format;
            self.touch();
        }
        Ok(())
    }

    pub fn set_align(&mut self, key: NodeKey, align: Alignment) -> Result<(), ValidationError> {
        let props = self
            .node_mut(key)?
            .data_mut()
            .props_mut()
            .ok_or(ValidationError::NotAnElement(key))?;
        if props.align != align {
            props.align = align;
            self.touch();
        }
        Ok(())
    }

    pub fn set_list_type(&mut self, key: NodeKey, list_type: ListType) -> Result<(), ValidationError> {
        match self.node_mut(key)?.data_mut() {
            NodeData::List { list_type: current, .. } => {
                if *current != list_type {
                    *current = list_type;
                    self.touch();
                }
                Ok(())
            }
            _ => Err(ValidationError::NotAnElement(key)),
        }
    }

    // ------------------------------------------------------------------
    // Selection bookkeeping
    // ------------------------------------------------------------------

    /// Element points on `parent` past `index` shift by `delta`
    fn shift_element_points(&mut self, parent: NodeKey, index: usize, delta: isize) {
        if let Some(selection) = self.state.selection.as_mut() {
            for point in selection.points_mut() {
                if point.key == parent && point.offset > index {
                    point.offset = point.offset.saturating_add_signed(delta);
                }
            }
        }
    }

    /// Element points that were on `from` before a move follow the moved
    /// children to `to`, with `map` giving the new offset
    ///
    /// `before` is the selection prior to the move, since detaching the
    /// children has already shifted the live points.
    fn follow_element_points(
        &mut self,
        before: Option<Selection>,
        from: NodeKey,
        to: NodeKey,
        map: impl Fn(usize) -> Option<usize>,
    ) {
        let (Some(before), Some(selection)) = (before, self.state.selection.as_mut()) else {
            return;
        };
        for (old, point) in [before.anchor, before.focus].into_iter().zip(selection.points_mut()) {
            if old.key != from {
                continue;
            }
            if let Some(offset) = map(old.offset) {
                *point = Point::new(to, offset);
            }
        }
    }

    // ------------------------------------------------------------------
    // Commit
    // ------------------------------------------------------------------

    pub(crate) fn commit(mut self) -> Result<Committed, ValidationError> {
        if self.tree_changed {
            self.normalize()?;
        }
        self.state.validate()?;
        let warnings = self.repair_selection().into_iter().collect();

        Ok(Committed {
            state: self.state,
            dirty: self.dirty,
            tree_changed: self.tree_changed,
            warnings,
            queued: self.queued,
        })
    }

    /// Merge adjacent text siblings of equal format and drop empty text
    /// nodes the selection does not reference
    fn normalize(&mut self) -> Result<(), ValidationError> {
        let parents: Vec<NodeKey> = self
            .state
            .nodes
            .values()
            .filter(|node| node.is_block())
            .map(Node::key)
            .collect();

        for parent in parents {
            let mut index = 0;
            loop {
                let children = self.state.children(parent).to_vec();
                let Some(key) = children.get(index).copied() else {
                    break;
                };
                let Some(text) = self.node(key)?.as_text().cloned() else {
                    index += 1;
                    continue;
                };

                let referenced = self.state.selection.is_some_and(|sel| sel.references(key));
                if text.is_empty() && !referenced {
                    trace!(%key, "dropping empty text node");
                    self.remove(key)?;
                    continue;
                }

                let next = children
                    .get(index + 1)
                    .and_then(|next| self.state.node(*next))
                    .and_then(|node| node.as_text().map(|t| (node.key(), t.clone())));
                match next {
                    Some((next_key, next_text)) if next_text.format == text.format => {
                        trace!(left = %key, right = %next_key, "merging text nodes");
                        let left_len = text.len();
                        self.text_mut(key)?.text.push_str(&next_text.text);
                        if let Some(selection) = self.state.selection.as_mut() {
                            for point in selection.points_mut() {
                                if point.key == next_key {
                                    *point = Point::new(key, left_len + point.offset);
                                } else if point.key == parent && point.offset == index + 1 {
                                    *point = Point::new(key, left_len);
                                }
                            }
                        }
                        self.remove(next_key)?;
                    }
                    _ => index += 1,
                }
            }
        }
        Ok(())
    }

    /// Clamp offsets and drop dangling endpoints
    fn repair_selection(&mut self) -> Option<EditorWarning> {
        let selection = self.state.selection?;
        let clamp = |state: &EditorState, point: Point| {
            state
                .node(point.key)
                .map(|node| Point::new(point.key, point.offset.min(node.size())))
        };

        let anchor = clamp(&self.state, selection.anchor);
        let focus = clamp(&self.state, selection.focus);
        let repaired = match (anchor, focus) {
            (Some(anchor), Some(focus)) => Some(Selection { anchor, focus, ..selection }),
            (Some(point), None) | (None, Some(point)) => Some(Selection {
                anchor: point,
                focus: point,
                ..selection
            }),
            (None, None) => None,
        };

        if repaired == Some(selection) {
            return None;
        }

        warn!(cleared = repaired.is_none(), "selection referenced invalid positions");
        self.state.selection = repaired;
        self.dirty = true;
        Some(EditorWarning::SelectionInvalidated {
            cleared: repaired.is_none(),
        })
    }
}
