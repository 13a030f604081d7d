//! # Selection Model
//!
//! Anchor/focus addressing by node key. Offsets count characters inside
//! text nodes and children inside element nodes; a decorator has two
//! positions, before (0) and after (1).

use crate::id_generator::NodeKey;
use crate::node::TextFormat;
use crate::state::EditorState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub key: NodeKey,
    pub offset: usize,
}

impl Point {
    pub fn new(key: NodeKey, offset: usize) -> Self {
        Self { key, offset }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub anchor: Point,
    pub focus: Point,
    /// Format applied to the next text typed at a caret
    pub format: TextFormat,
}

impl Selection {
    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point,
            focus: point,
            format: TextFormat::empty(),
        }
    }

    pub fn range(anchor: Point, focus: Point) -> Self {
        Self {
            anchor,
            focus,
            format: TextFormat::empty(),
        }
    }

    pub fn with_format(mut self, format: TextFormat) -> Self {
        self.format = format;
        self
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn is_range(&self) -> bool {
        !self.is_collapsed()
    }

    /// Focus comes before anchor in document order
    pub fn is_backward(&self, state: &EditorState) -> bool {
        match (state.caret(&self.anchor), state.caret(&self.focus)) {
            (Some(anchor), Some(focus)) => focus < anchor,
            _ => false,
        }
    }

    pub fn references(&self, key: NodeKey) -> bool {
        self.anchor.key == key || self.focus.key == key
    }

    /// Whether `format` is active for this selection
    ///
    /// A caret reports its pending format. A range reports true only when
    /// every text node it fully covers carries the flag. Partly covered
    /// nodes at the ends are ignored unless the range covers no node whole
    /// (see [`EditorState::format_spans`]). A range covering no text
    /// reports false.
    pub fn has_format(&self, state: &EditorState, format: TextFormat) -> bool {
        if self.is_collapsed() {
            return self.format.contains(format);
        }

        let spans = state.format_spans(self);
        !spans.is_empty()
            && spans.iter().all(|span| {
                state
                    .node(span.key)
                    .and_then(|node| node.as_text())
                    .is_some_and(|text| text.has_format(format))
            })
    }

    pub(crate) fn points_mut(&mut self) -> [&mut Point; 2] {
        [&mut self.anchor, &mut self.focus]
    }
}
