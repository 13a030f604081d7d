//! # Editor State
//!
//! An immutable snapshot: the node map, the root key and the selection.
//! Published snapshots are shared behind `Rc` and never mutated again; a
//! transaction works on its own clone.
//!
//! Ordering between points is done on carets, a (path, offset) pair where
//! the path is the child index sequence from the root down to a leaf.

use std::collections::{BTreeMap, HashSet, VecDeque};

use crate::errors::ValidationError;
use crate::id_generator::{KeyGenerator, NodeKey};
use crate::node::{Node, NodeData, TextFormat};
use crate::selection::{Point, Selection};
use crate::visitor::{walk_children, walk_state, Visitor};

#[derive(Debug, Clone, PartialEq)]
pub struct EditorState {
    pub(crate) nodes: BTreeMap<NodeKey, Node>,
    pub(crate) root: NodeKey,
    pub(crate) selection: Option<Selection>,
}

/// Document-order position of a point, comparable across the tree
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Caret {
    pub path: Vec<usize>,
    pub offset: usize,
}

/// Part of a leaf covered by a range selection
///
/// Text spans count characters; a decorator is always `0..1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafSpan {
    pub key: NodeKey,
    pub start: usize,
    pub end: usize,
}

impl EditorState {
    /// A root holding one empty paragraph, caret inside it
    pub fn empty(keys: &mut KeyGenerator) -> Self {
        let mut root = Node::create(keys, NodeData::root());
        let mut paragraph = Node::create(keys, NodeData::paragraph());

        paragraph.set_parent(Some(root.key()));
        if let Some(children) = root.children_mut() {
            children.push(paragraph.key());
        }

        let selection = Selection::collapsed(Point::new(paragraph.key(), 0));
        let root_key = root.key();

        let mut nodes = BTreeMap::new();
        nodes.insert(root.key(), root);
        nodes.insert(paragraph.key(), paragraph);

        Self {
            nodes,
            root: root_key,
            selection: Some(selection),
        }
    }

    pub(crate) fn from_parts(
        nodes: BTreeMap<NodeKey, Node>,
        root: NodeKey,
        selection: Option<Selection>,
    ) -> Self {
        Self {
            nodes,
            root,
            selection,
        }
    }

    pub fn root_key(&self) -> NodeKey {
        self.root
    }

    pub fn root(&self) -> &Node {
        // The root is present in every published snapshot
        &self.nodes[&self.root]
    }

    pub fn node(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(&key)
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        self.node(key).map(Node::children).unwrap_or(&[])
    }

    pub fn parent_of(&self, key: NodeKey) -> Option<NodeKey> {
        self.node(key).and_then(Node::parent)
    }

    pub fn index_in_parent(&self, key: NodeKey) -> Option<usize> {
        let parent = self.parent_of(key)?;
        self.children(parent).iter().position(|child| *child == key)
    }

    pub fn previous_sibling(&self, key: NodeKey) -> Option<NodeKey> {
        let parent = self.parent_of(key)?;
        let index = self.index_in_parent(key)?;
        index.checked_sub(1).map(|ix| self.children(parent)[ix])
    }

    pub fn next_sibling(&self, key: NodeKey) -> Option<NodeKey> {
        let parent = self.parent_of(key)?;
        let index = self.index_in_parent(key)?;
        self.children(parent).get(index + 1).copied()
    }

    /// Is `ancestor` equal to `key` or above it
    pub fn is_ancestor_or_self(&self, ancestor: NodeKey, key: NodeKey) -> bool {
        let mut current = Some(key);
        while let Some(k) = current {
            if k == ancestor {
                return true;
            }
            current = self.parent_of(k);
        }
        false
    }

    /// Child indices from the root down to `key`
    pub fn path_of(&self, key: NodeKey) -> Option<Vec<usize>> {
        let mut path = Vec::new();
        let mut current = key;
        while current != self.root {
            path.push(self.index_in_parent(current)?);
            current = self.parent_of(current)?;
        }
        path.reverse();
        Some(path)
    }

    /// Closest block element containing `key`, `key` itself included
    pub fn nearest_block(&self, key: NodeKey) -> Option<NodeKey> {
        let mut current = Some(key);
        while let Some(k) = current {
            let node = self.node(k)?;
            if node.is_block() {
                return Some(k);
            }
            current = node.parent();
        }
        None
    }

    /// Ancestor of `key` that sits directly under the root
    pub fn top_level_block(&self, key: NodeKey) -> Option<NodeKey> {
        let mut current = key;
        loop {
            let parent = self.parent_of(current)?;
            if parent == self.root {
                return Some(current);
            }
            current = parent;
        }
    }

    /// Text and decorator leaves in document order
    pub fn leaves(&self) -> Vec<NodeKey> {
        let mut collector = Collector::new(Node::is_inline);
        walk_state(&mut collector, self);
        collector.keys
    }

    /// Block elements in document order
    pub fn blocks(&self) -> Vec<NodeKey> {
        let mut collector = Collector::new(Node::is_block);
        walk_state(&mut collector, self);
        collector.keys
    }

    /// Plain text of the document, blocks separated by newlines
    pub fn text_content(&self) -> String {
        self.blocks()
            .into_iter()
            .map(|block| self.block_text(block))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn block_text(&self, block: NodeKey) -> String {
        self.children(block)
            .iter()
            .filter_map(|child| self.node(*child).and_then(Node::as_text))
            .map(|text| text.text.as_str())
            .collect()
    }

    fn first_descendant(&self, key: NodeKey) -> NodeKey {
        let mut current = key;
        while let Some(first) = self.children(current).first() {
            current = *first;
        }
        current
    }

    fn last_descendant(&self, key: NodeKey) -> NodeKey {
        let mut current = key;
        while let Some(last) = self.children(current).last() {
            current = *last;
        }
        current
    }

    /// Document position of a point
    ///
    /// Element points resolve to the leaf at or just before the child
    /// boundary they name. Returns `None` for points on missing nodes.
    pub fn caret(&self, point: &Point) -> Option<Caret> {
        let node = self.node(point.key)?;
        if !node.is_element() {
            return Some(Caret {
                path: self.path_of(point.key)?,
                offset: point.offset.min(node.size()),
            });
        }

        let children = node.children();
        if let Some(child) = children.get(point.offset) {
            let target = self.first_descendant(*child);
            return Some(Caret {
                path: self.path_of(target)?,
                offset: 0,
            });
        }

        match children.last() {
            Some(last) => {
                let target = self.last_descendant(*last);
                let size = self.node(target).map(Node::size).unwrap_or(0);
                Some(Caret {
                    path: self.path_of(target)?,
                    offset: size,
                })
            }
            None => Some(Caret {
                path: self.path_of(point.key)?,
                offset: 0,
            }),
        }
    }

    /// Selection endpoints in document order
    pub fn ordered_points(&self, selection: &Selection) -> Option<(Point, Point)> {
        let anchor = self.caret(&selection.anchor)?;
        let focus = self.caret(&selection.focus)?;
        if focus < anchor {
            Some((selection.focus, selection.anchor))
        } else {
            Some((selection.anchor, selection.focus))
        }
    }

    /// Leaves covered by a range, with the covered part of each
    ///
    /// Zero-width text segments are skipped; a decorator is included only
    /// when both of its positions fall inside the range.
    pub fn covered_leaves(&self, selection: &Selection) -> Vec<LeafSpan> {
        let (Some(anchor), Some(focus)) = (self.caret(&selection.anchor), self.caret(&selection.focus)) else {
            return Vec::new();
        };
        let (start, end) = if focus < anchor { (focus, anchor) } else { (anchor, focus) };

        let mut spans = Vec::new();
        for key in self.leaves() {
            let (Some(node), Some(path)) = (self.node(key), self.path_of(key)) else {
                continue;
            };
            let size = node.size();

            let from = match path.cmp(&start.path) {
                std::cmp::Ordering::Less => continue,
                std::cmp::Ordering::Equal => start.offset,
                std::cmp::Ordering::Greater => 0,
            };
            let to = match path.cmp(&end.path) {
                std::cmp::Ordering::Greater => break,
                std::cmp::Ordering::Equal => end.offset,
                std::cmp::Ordering::Less => size,
            };

            let covered = if node.is_decorator() {
                from == 0 && to >= 1
            } else {
                from < to
            };
            if covered {
                spans.push(LeafSpan {
                    key,
                    start: from.min(size),
                    end: to.min(size),
                });
            }
        }
        spans
    }

    /// Text part of [`covered_leaves`](Self::covered_leaves)
    pub fn covered_text(&self, selection: &Selection) -> Vec<LeafSpan> {
        self.covered_leaves(selection)
            .into_iter()
            .filter(|span| self.node(span.key).is_some_and(Node::is_text))
            .collect()
    }

    /// Text spans that decide a range's format
    ///
    /// Only text nodes the range covers whole count. A range lying inside
    /// a single node, or between two partial ends, falls back to the
    /// partially covered text.
    pub fn format_spans(&self, selection: &Selection) -> Vec<LeafSpan> {
        let spans = self.covered_text(selection);
        let full: Vec<LeafSpan> = spans
            .iter()
            .filter(|span| span.start == 0 && self.node(span.key).is_some_and(|node| span.end == node.size()))
            .copied()
            .collect();
        if full.is_empty() {
            spans
        } else {
            full
        }
    }

    /// Blocks touched by the selection in document order
    pub fn selected_blocks(&self, selection: &Selection) -> Vec<NodeKey> {
        let Some((start, end)) = self.ordered_points(selection) else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let mut blocks = Vec::new();
        let mut push = |block: Option<NodeKey>| {
            if let Some(block) = block {
                if seen.insert(block) {
                    blocks.push(block);
                }
            }
        };

        push(self.nearest_block(start.key));
        if selection.is_range() {
            let (from, to) = (self.caret(&start), self.caret(&end));
            for block in self.blocks() {
                let Some(path) = self.path_of(block) else {
                    continue;
                };
                // A block lies inside the range when its path falls between
                // the two carets' paths
                let after_start = from.as_ref().is_some_and(|c| path > c.path);
                let before_end = to.as_ref().is_some_and(|c| path < c.path);
                if after_start && before_end {
                    push(Some(block));
                }
            }
            push(self.nearest_block(end.key));
        }
        blocks
    }

    /// Format shared by the text deciding a range's format, or the pending
    /// format of a caret
    pub fn selection_format(&self, selection: &Selection) -> TextFormat {
        if selection.is_collapsed() {
            return selection.format;
        }
        let mut spans = self.format_spans(selection).into_iter();
        let Some(first) = spans.next() else {
            return selection.format;
        };
        let format_of = |key| {
            self.node(key)
                .and_then(Node::as_text)
                .map(|text| text.format)
                .unwrap_or_default()
        };
        spans.fold(format_of(first.key), |acc, span| acc & format_of(span.key))
    }

    /// Structural equality ignoring keys and selection
    pub fn content_eq(&self, other: &EditorState) -> bool {
        fn eq(a: &EditorState, ak: NodeKey, b: &EditorState, bk: NodeKey) -> bool {
            let (Some(an), Some(bn)) = (a.node(ak), b.node(bk)) else {
                return false;
            };
            an.data().shallow_eq(bn.data())
                && an.children().len() == bn.children().len()
                && an
                    .children()
                    .iter()
                    .zip(bn.children())
                    .all(|(ac, bc)| eq(a, *ac, b, *bc))
        }
        eq(self, self.root, other, other.root)
    }

    /// Check the structural invariants of the tree
    ///
    /// Every child reference resolves, every parent reference is mirrored,
    /// every node is reachable from the root exactly once.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let root = self
            .node(self.root)
            .ok_or(ValidationError::NodeNotFound(self.root))?;
        if !root.is_root() {
            return Err(ValidationError::NotAnElement(self.root));
        }
        if root.parent().is_some() {
            return Err(ValidationError::RootMutation);
        }

        for (key, node) in &self.nodes {
            for child in node.children() {
                let child_node = self.node(*child).ok_or(ValidationError::DanglingChild {
                    parent: *key,
                    child: *child,
                })?;
                if child_node.parent() != Some(*key) {
                    return Err(ValidationError::ParentMismatch {
                        child: *child,
                        expected: *key,
                        found: child_node.parent(),
                    });
                }
                if child_node.is_root() {
                    return Err(ValidationError::InvalidChild {
                        parent: *key,
                        child: *child,
                    });
                }
            }

            match node.parent() {
                Some(parent) => {
                    let parent_node = self
                        .node(parent)
                        .ok_or(ValidationError::ParentNotFound(parent))?;
                    if !parent_node.children().contains(key) {
                        return Err(ValidationError::Orphan(*key));
                    }
                }
                None if *key != self.root => return Err(ValidationError::Orphan(*key)),
                None => {}
            }
        }

        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([self.root]);
        while let Some(key) = queue.pop_front() {
            if !visited.insert(key) {
                return Err(ValidationError::CycleDetected(key));
            }
            queue.extend(self.children(key).iter().copied());
        }

        if visited.len() != self.nodes.len() {
            if let Some(unreachable) = self.nodes.keys().find(|key| !visited.contains(key)) {
                return Err(ValidationError::Orphan(*unreachable));
            }
        }

        Ok(())
    }
}

struct Collector {
    filter: fn(&Node) -> bool,
    keys: Vec<NodeKey>,
}

impl Collector {
    fn new(filter: fn(&Node) -> bool) -> Self {
        Self {
            filter,
            keys: Vec::new(),
        }
    }
}

impl Visitor for Collector {
    fn visit_node(&mut self, state: &EditorState, node: &Node) {
        if (self.filter)(node) {
            self.keys.push(node.key());
        }
        walk_children(self, state, node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// root > [p1 > ["Hello", "World"], p2 > ["!"]]
    fn two_paragraphs() -> (EditorState, Vec<NodeKey>) {
        let mut keys = KeyGenerator::new();
        let mut nodes = BTreeMap::new();

        let mut make = |data: NodeData, parent: Option<NodeKey>, nodes: &mut BTreeMap<NodeKey, Node>| {
            let mut node = Node::create(&mut keys, data);
            node.set_parent(parent);
            let key = node.key();
            if let Some(parent) = parent {
                nodes
                    .get_mut(&parent)
                    .and_then(Node::children_mut)
                    .unwrap()
                    .push(key);
            }
            nodes.insert(key, node);
            key
        };

        let root = make(NodeData::root(), None, &mut nodes);
        let p1 = make(NodeData::paragraph(), Some(root), &mut nodes);
        let hello = make(NodeData::text("Hello", TextFormat::BOLD), Some(p1), &mut nodes);
        let world = make(NodeData::text("World", TextFormat::empty()), Some(p1), &mut nodes);
        let p2 = make(NodeData::paragraph(), Some(root), &mut nodes);
        let bang = make(NodeData::text("!", TextFormat::BOLD), Some(p2), &mut nodes);

        (
            EditorState::from_parts(nodes, root, None),
            vec![root, p1, hello, world, p2, bang],
        )
    }

    #[test]
    fn test_empty_state_is_valid() {
        let mut keys = KeyGenerator::new();
        let state = EditorState::empty(&mut keys);

        assert!(state.validate().is_ok());
        assert_eq!(state.len(), 2);
        assert!(state.selection().unwrap().is_collapsed());
        assert_eq!(state.text_content(), "");
    }

    #[test]
    fn test_paths_and_blocks() {
        let (state, k) = two_paragraphs();

        assert_eq!(state.path_of(k[3]), Some(vec![0, 1]));
        assert_eq!(state.nearest_block(k[3]), Some(k[1]));
        assert_eq!(state.top_level_block(k[5]), Some(k[4]));
        assert_eq!(state.leaves(), vec![k[2], k[3], k[5]]);
        assert_eq!(state.text_content(), "HelloWorld\n!");
    }

    #[test]
    fn test_element_point_resolves_to_leaf_caret() {
        let (state, k) = two_paragraphs();

        let start = state.caret(&Point::new(k[1], 0)).unwrap();
        assert_eq!(start, Caret { path: vec![0, 0], offset: 0 });

        let end = state.caret(&Point::new(k[1], 2)).unwrap();
        assert_eq!(end, Caret { path: vec![0, 1], offset: 5 });
    }

    #[test]
    fn test_covered_text_across_blocks() {
        let (state, k) = two_paragraphs();
        let range = Selection::range(Point::new(k[5], 1), Point::new(k[2], 3));

        assert!(range.is_backward(&state));
        let spans = state.covered_text(&range);
        assert_eq!(
            spans,
            vec![
                LeafSpan { key: k[2], start: 3, end: 5 },
                LeafSpan { key: k[3], start: 0, end: 5 },
                LeafSpan { key: k[5], start: 0, end: 1 },
            ]
        );
        assert_eq!(state.selected_blocks(&range), vec![k[1], k[4]]);
    }

    #[test]
    fn test_range_has_format_requires_every_fully_covered_node() {
        let (state, k) = two_paragraphs();

        let bold_only = Selection::range(Point::new(k[2], 0), Point::new(k[2], 5));
        assert!(bold_only.has_format(&state, TextFormat::BOLD));

        let mixed = Selection::range(Point::new(k[2], 0), Point::new(k[5], 1));
        assert!(!mixed.has_format(&state, TextFormat::BOLD));

        // "World" is only partly selected, so the whole bold "Hello" decides
        let partial_end = Selection::range(Point::new(k[2], 0), Point::new(k[3], 2));
        assert!(partial_end.has_format(&state, TextFormat::BOLD));
        assert_eq!(state.selection_format(&partial_end), TextFormat::BOLD);

        // Two partial ends and nothing whole in between
        let partial_only = Selection::range(Point::new(k[2], 3), Point::new(k[3], 2));
        assert!(!partial_only.has_format(&state, TextFormat::BOLD));
        let inside = Selection::range(Point::new(k[3], 1), Point::new(k[3], 4));
        assert!(!inside.has_format(&state, TextFormat::BOLD));

        // Boundary-only coverage of "World" does not count
        let boundary = Selection::range(Point::new(k[2], 1), Point::new(k[3], 0));
        assert!(boundary.has_format(&state, TextFormat::BOLD));
    }

    #[test]
    fn test_validate_detects_broken_links() {
        let (mut state, k) = two_paragraphs();
        state.nodes.get_mut(&k[3]).unwrap().set_parent(Some(k[4]));

        assert_eq!(
            state.validate(),
            Err(ValidationError::ParentMismatch {
                child: k[3],
                expected: k[1],
                found: Some(k[4]),
            })
        );
    }

    #[test]
    fn test_validate_detects_orphans() {
        let (mut state, k) = two_paragraphs();
        state
            .nodes
            .get_mut(&k[1])
            .and_then(Node::children_mut)
            .unwrap()
            .retain(|child| *child != k[3]);

        assert_eq!(state.validate(), Err(ValidationError::Orphan(k[3])));
    }

    #[test]
    fn test_content_eq_ignores_keys() {
        let (a, _) = two_paragraphs();
        let (b, _) = two_paragraphs();
        assert!(a.content_eq(&b));

        let (mut c, k) = two_paragraphs();
        if let NodeData::Text(text) = c.nodes.get_mut(&k[5]).unwrap().data_mut() {
            text.text.push('?');
        }
        assert!(!a.content_eq(&c));
    }
}
