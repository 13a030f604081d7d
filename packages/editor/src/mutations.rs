//! # Mutations
//!
//! High-level editing operations over a [`Transaction`]. Each one reads the
//! transaction's selection, reshapes the tree through the transaction's
//! primitives, and leaves a selection that makes sense for the next edit.
//!
//! All of them are no-ops when there is no selection.

use crate::errors::{EditorError, ValidationError};
use crate::id_generator::NodeKey;
use crate::node::{char_len, Alignment, BlockType, DecoratorPayload, ListType, NodeData, TextFormat};
use crate::selection::{Point, Selection};
use crate::state::EditorState;
use crate::transaction::Transaction;

type Result<T> = std::result::Result<T, EditorError>;

/// Insert text at the caret, replacing a range first
///
/// Text joins the neighbouring text node when its format matches the
/// selection's pending format, otherwise it gets its own node.
pub fn insert_text(tx: &mut Transaction<'_>, text: &str) -> Result<()> {
    let Some(selection) = collapse(tx)? else {
        return Ok(());
    };
    if text.is_empty() {
        return Ok(());
    }

    let format = selection.format;
    let point = block_point(tx.state(), selection.anchor);
    let node = tx.node(point.key)?.clone();
    let inserted = char_len(text);

    let caret = match node.data() {
        NodeData::Text(existing) if existing.format == format => {
            tx.insert_text(point.key, point.offset, text)?;
            Point::new(point.key, point.offset + inserted)
        }
        _ if node.is_block() => {
            let children = node.children();
            let before = point
                .offset
                .checked_sub(1)
                .and_then(|ix| children.get(ix))
                .and_then(|key| text_with_format(tx.state(), *key, format));
            let after = children
                .get(point.offset)
                .and_then(|key| text_with_format(tx.state(), *key, format));

            match (before, after) {
                (Some((key, len)), _) => {
                    tx.insert_text(key, len, text)?;
                    Point::new(key, len + inserted)
                }
                (None, Some((key, _))) => {
                    tx.insert_text(key, 0, text)?;
                    Point::new(key, inserted)
                }
                (None, None) => {
                    let key = tx.create_node(NodeData::text(text, format));
                    tx.insert_child(point.key, point.offset, key)?;
                    Point::new(key, inserted)
                }
            }
        }
        _ => {
            let key = tx.create_node(NodeData::text(text, format));
            tx.insert_at_point(point, key)?;
            Point::new(key, inserted)
        }
    };

    tx.set_selection(Some(Selection::collapsed(caret).with_format(format)));
    Ok(())
}

/// Delete the range, or one unit before the caret
///
/// At the start of a block the block merges into the previous one; a
/// heading or quote at the very start of the document turns into a
/// paragraph instead.
pub fn delete_backward(tx: &mut Transaction<'_>) -> Result<()> {
    let Some(selection) = tx.selection() else {
        return Ok(());
    };
    if selection.is_range() {
        collapse(tx)?;
        return Ok(());
    }

    let point = block_point(tx.state(), selection.anchor);
    let node = tx.node(point.key)?.clone();

    if node.is_text() && point.offset > 0 {
        tx.delete_text(point.key, point.offset - 1, point.offset)?;
        return finish_caret(tx, Point::new(point.key, point.offset - 1), selection.format);
    }

    // Position of the caret among the block's children
    let (block, index) = if node.is_inline() {
        let (parent, index) = tx.position(point.key)?;
        let past = node.is_decorator() && point.offset > 0;
        (parent, if past { index + 1 } else { index })
    } else {
        (point.key, point.offset)
    };

    if index > 0 {
        let previous = tx.state().children(block)[index - 1];
        let previous_node = tx.node(previous)?.clone();
        let caret = match previous_node.as_text() {
            Some(text) if !text.is_empty() => {
                let len = text.len();
                tx.delete_text(previous, len - 1, len)?;
                if node.is_text() {
                    point
                } else {
                    Point::new(previous, len - 1)
                }
            }
            _ => {
                tx.remove(previous)?;
                if node.is_text() {
                    point
                } else {
                    Point::new(block, index - 1)
                }
            }
        };
        return finish_caret(tx, caret, selection.format);
    }

    let previous = tx.state().previous_sibling(block);
    if let Some(target) = previous.and_then(|previous| merge_target(tx.state(), previous)) {
        let base = tx.node(target)?.children().len();
        tx.move_children(block, target)?;
        remove_block(tx, block)?;
        let caret = if node.is_inline() { point } else { Point::new(target, base) };
        return finish_caret(tx, caret, selection.format);
    }

    let at_document_start = previous.is_none() && tx.state().parent_of(block) == Some(tx.root_key());
    let block_type = tx.node(block)?.block_type();
    if at_document_start && block_type != Some(BlockType::Paragraph) {
        tx.replace_element(block, NodeData::paragraph())?;
    }
    Ok(())
}

/// Split the block at the caret
pub fn insert_paragraph(tx: &mut Transaction<'_>) -> Result<()> {
    let Some(selection) = collapse(tx)? else {
        return Ok(());
    };
    let point = block_point(tx.state(), selection.anchor);
    let node = tx.node(point.key)?.clone();

    let (block, index) = if node.is_inline() {
        let (parent, index) = tx.position(point.key)?;
        let index = if point.offset == 0 {
            index
        } else if point.offset >= node.size() || node.is_decorator() {
            index + 1
        } else {
            tx.split_text(point.key, point.offset)?;
            index + 1
        };
        (parent, index)
    } else {
        (point.key, point.offset)
    };

    if !tx.node(block)?.is_block() {
        return Err(ValidationError::NotAnElement(block).into());
    }

    let mut right = tx.split_element(block, index)?;
    let is_heading = matches!(tx.node(block)?.data(), NodeData::Heading { .. });
    if is_heading && tx.node(right)?.children().is_empty() {
        right = tx.replace_element(right, NodeData::paragraph())?;
    }

    let first_text = tx
        .state()
        .children(right)
        .first()
        .copied()
        .filter(|first| tx.state().node(*first).is_some_and(|n| n.is_text()));
    let caret = match first_text {
        Some(first) => Point::new(first, 0),
        None => Point::new(right, 0),
    };
    tx.set_selection(Some(Selection::collapsed(caret).with_format(selection.format)));
    Ok(())
}

/// Toggle a format flag over the selection
///
/// A caret only flips its pending format. A range splits the text at its
/// edges and sets the flag on everything covered, or clears it when the
/// selection already reports the flag through [`Selection::has_format`].
pub fn toggle_format(tx: &mut Transaction<'_>, flag: TextFormat) -> Result<()> {
    let Some(selection) = tx.selection() else {
        return Ok(());
    };

    let spans = tx.state().covered_text(&selection);
    if selection.is_collapsed() || spans.is_empty() {
        tx.set_selection(Some(selection.with_format(selection.format ^ flag)));
        return Ok(());
    }

    let enable = !selection.has_format(tx.state(), flag);
    let backward = selection.is_backward(tx.state());

    let mut covered = Vec::with_capacity(spans.len());
    for span in spans {
        let len = tx.node(span.key)?.size();
        if span.end < len {
            tx.split_text(span.key, span.end)?;
        }
        let key = if span.start > 0 {
            tx.split_text(span.key, span.start)?
        } else {
            span.key
        };
        covered.push(key);
    }

    let mut shared = TextFormat::all();
    for key in &covered {
        let current = tx.node(*key)?.as_text().map(|t| t.format).unwrap_or_default();
        let next = if enable { current | flag } else { current - flag };
        tx.set_format(*key, next)?;
        shared &= next;
    }

    let (Some(first), Some(last)) = (covered.first(), covered.last()) else {
        return Ok(());
    };
    let start = Point::new(*first, 0);
    let end = Point::new(*last, tx.node(*last)?.size());
    let (anchor, focus) = if backward { (end, start) } else { (start, end) };
    tx.set_selection(Some(Selection::range(anchor, focus).with_format(shared)));
    Ok(())
}

pub fn set_alignment(tx: &mut Transaction<'_>, align: Alignment) -> Result<()> {
    let Some(selection) = tx.selection() else {
        return Ok(());
    };
    for block in tx.state().selected_blocks(&selection) {
        tx.set_align(block, align)?;
    }
    Ok(())
}

/// Convert the selected blocks, keeping their content and alignment
///
/// List types go through [`insert_list`]. List items are left alone.
pub fn set_block_type(tx: &mut Transaction<'_>, block_type: BlockType) -> Result<()> {
    if let BlockType::List(list_type) = block_type {
        return insert_list(tx, list_type);
    }
    let Some(selection) = tx.selection() else {
        return Ok(());
    };

    for block in tx.state().selected_blocks(&selection) {
        let node = tx.node(block)?;
        if matches!(node.data(), NodeData::ListItem(_)) || node.block_type() == Some(block_type) {
            continue;
        }
        tx.replace_element(block, NodeData::block(block_type))?;
    }
    Ok(())
}

/// Wrap the selected blocks into list items
///
/// Consecutive blocks share one list, and a block directly after a list of
/// the same type joins it. Items already in a list change the list's type.
pub fn insert_list(tx: &mut Transaction<'_>, list_type: ListType) -> Result<()> {
    let Some(selection) = tx.selection() else {
        return Ok(());
    };

    for block in tx.state().selected_blocks(&selection) {
        let node = tx.node(block)?.clone();
        if matches!(node.data(), NodeData::ListItem(_)) {
            if let Some(list) = node.parent() {
                tx.set_list_type(list, list_type)?;
            }
            continue;
        }

        let existing = tx.state().previous_sibling(block).filter(|previous| {
            matches!(
                tx.state().node(*previous).map(|n| n.data()),
                Some(NodeData::List { list_type: t, .. }) if *t == list_type
            )
        });
        let list = match existing {
            Some(list) => list,
            None => {
                let list = tx.create_node(NodeData::list(list_type));
                tx.insert_before(block, list)?;
                list
            }
        };

        let item = tx.create_node(NodeData::list_item());
        tx.append(list, item)?;
        if let Some(align) = node.align() {
            tx.set_align(item, align)?;
        }
        tx.move_children(block, item)?;
        tx.remove(block)?;
    }
    Ok(())
}

/// Turn every list touched by the selection back into paragraphs
pub fn remove_list(tx: &mut Transaction<'_>) -> Result<()> {
    let Some(selection) = tx.selection() else {
        return Ok(());
    };

    let mut lists: Vec<NodeKey> = Vec::new();
    for block in tx.state().selected_blocks(&selection) {
        let node = tx.node(block)?;
        if matches!(node.data(), NodeData::ListItem(_)) {
            if let Some(list) = node.parent() {
                if !lists.contains(&list) {
                    lists.push(list);
                }
            }
        }
    }

    for list in lists {
        for item in tx.state().children(list).to_vec() {
            let align = tx.node(item)?.align().unwrap_or_default();
            let paragraph = tx.create_node(NodeData::paragraph());
            tx.insert_before(list, paragraph)?;
            tx.set_align(paragraph, align)?;
            tx.move_children(item, paragraph)?;
        }
        tx.remove(list)?;
    }
    Ok(())
}

/// Insert a decorator inline at the caret, splitting text around it
///
/// The caret lands right after the decorator.
pub fn insert_decorator(tx: &mut Transaction<'_>, payload: DecoratorPayload) -> Result<()> {
    let Some(selection) = collapse(tx)? else {
        return Ok(());
    };
    let point = block_point(tx.state(), selection.anchor);

    let key = tx.create_node(NodeData::Decorator(payload));
    tx.insert_at_point(point, key)?;

    let next_text = tx
        .state()
        .next_sibling(key)
        .filter(|next| tx.state().node(*next).is_some_and(|n| n.is_text()));
    let caret = match next_text {
        Some(next) => Point::new(next, 0),
        None => {
            let (parent, index) = tx.position(key)?;
            Point::new(parent, index + 1)
        }
    };
    tx.set_selection(Some(Selection::collapsed(caret).with_format(selection.format)));
    Ok(())
}

/// Copy the top-level block holding the caret right after itself
pub fn duplicate_block(tx: &mut Transaction<'_>) -> Result<()> {
    let Some(selection) = tx.selection() else {
        return Ok(());
    };
    let Some(block) = tx.state().top_level_block(selection.anchor.key) else {
        return Ok(());
    };
    let copy = tx.clone_subtree(block)?;
    tx.insert_after(block, copy)?;
    Ok(())
}

// ----------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------

/// Delete a range selection, leaving a caret at its start
///
/// Returns the collapsed selection, or `None` without a selection.
fn collapse(tx: &mut Transaction<'_>) -> Result<Option<Selection>> {
    let Some(selection) = tx.selection() else {
        return Ok(None);
    };
    if selection.is_collapsed() {
        return Ok(Some(selection));
    }

    let state = tx.state();
    let Some((start, end)) = state.ordered_points(&selection) else {
        return Ok(Some(selection));
    };
    let leaves = state.covered_leaves(&selection);
    let start_block = state.nearest_block(start.key);
    let end_block = state.nearest_block(end.key);
    let format = state.selection_format(&selection);

    // A caret on a decorator is re-expressed on its parent so it survives
    // the decorator's removal
    let caret = match state.node(start.key) {
        Some(node) if node.is_decorator() => {
            let (parent, index) = tx.position(start.key)?;
            Point::new(parent, index + start.offset.min(1))
        }
        _ => start,
    };

    for span in leaves.iter().rev() {
        if tx.node(span.key)?.is_decorator() {
            tx.remove(span.key)?;
        } else {
            tx.delete_text(span.key, span.start, span.end)?;
        }
    }

    if let (Some(start_block), Some(end_block)) = (start_block, end_block) {
        if start_block != end_block {
            let blocks = tx.state().blocks();
            let from = blocks.iter().position(|b| *b == start_block);
            let to = blocks.iter().position(|b| *b == end_block);
            if let (Some(from), Some(to)) = (from, to) {
                for between in blocks.iter().take(to).skip(from + 1) {
                    remove_block(tx, *between)?;
                }
            }
            tx.move_children(end_block, start_block)?;
            remove_block(tx, end_block)?;
        }
    }

    let collapsed = Selection::collapsed(caret).with_format(format);
    tx.set_selection(Some(collapsed));
    Ok(Some(collapsed))
}

/// Remove a block, taking its list along when it was the last item
fn remove_block(tx: &mut Transaction<'_>, block: NodeKey) -> Result<()> {
    let parent = tx.state().parent_of(block);
    tx.remove(block)?;
    if let Some(parent) = parent {
        let node = tx.node(parent)?;
        if matches!(node.data(), NodeData::List { .. }) && node.children().is_empty() {
            tx.remove(parent)?;
        }
    }
    Ok(())
}

/// Move a point on the root or a list down into a block
fn block_point(state: &EditorState, point: Point) -> Point {
    let mut point = point;
    loop {
        let Some(node) = state.node(point.key) else {
            return point;
        };
        if node.is_block() || node.is_inline() {
            return point;
        }
        let children = node.children();
        let Some(last) = children.len().checked_sub(1) else {
            return point;
        };
        let at_end = point.offset > last;
        let child = children[point.offset.min(last)];
        let size = state.node(child).map_or(0, |n| n.size());
        point = Point::new(child, if at_end { size } else { 0 });
    }
}

/// Block that content merges into when deleting backward out of the block
/// following `previous`: the block itself, or a list's last item
fn merge_target(state: &EditorState, previous: NodeKey) -> Option<NodeKey> {
    let node = state.node(previous)?;
    if node.is_block() {
        return Some(previous);
    }
    node.children()
        .last()
        .copied()
        .filter(|last| state.node(*last).is_some_and(|n| n.is_block()))
}

fn text_with_format(state: &EditorState, key: NodeKey, format: TextFormat) -> Option<(NodeKey, usize)> {
    state
        .node(key)
        .and_then(|node| node.as_text())
        .filter(|text| text.format == format)
        .map(|text| (key, text.len()))
}

fn finish_caret(tx: &mut Transaction<'_>, caret: Point, format: TextFormat) -> Result<()> {
    tx.set_selection(Some(Selection::collapsed(caret).with_format(format)));
    Ok(())
}
