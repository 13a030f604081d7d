use crate::node::{DecoratorPayload, ElementProps, ElementTag, HeadingLevel, ListType, Node, NodeData, TextNode};
use crate::state::EditorState;

/// Visitor pattern for traversing a snapshot in document order
///
/// Default implementations walk the whole tree. Override specific visit_*
/// methods to act on the nodes you care about; call [`walk_children`] from
/// an override to keep descending.
pub trait Visitor: Sized {
    fn visit_node(&mut self, state: &EditorState, node: &Node) {
        walk_node(self, state, node);
    }

    fn visit_element(&mut self, state: &EditorState, node: &Node, _tag: ElementTag, _props: &ElementProps) {
        walk_children(self, state, node);
    }

    fn visit_heading(&mut self, state: &EditorState, node: &Node, _level: HeadingLevel, _props: &ElementProps) {
        walk_children(self, state, node);
    }

    fn visit_list(&mut self, state: &EditorState, node: &Node, _list_type: ListType, _props: &ElementProps) {
        walk_children(self, state, node);
    }

    fn visit_list_item(&mut self, state: &EditorState, node: &Node, _props: &ElementProps) {
        walk_children(self, state, node);
    }

    fn visit_text(&mut self, _state: &EditorState, _node: &Node, _text: &TextNode) {
        // Leaf node, no children to walk
    }

    fn visit_decorator(&mut self, _state: &EditorState, _node: &Node, _payload: &DecoratorPayload) {
        // Leaf node, no children to walk
    }
}

pub fn walk_state<V: Visitor>(visitor: &mut V, state: &EditorState) {
    visitor.visit_node(state, state.root());
}

/// Dispatch on the node variant. This is the one place the variant set is
/// matched exhaustively for traversal.
pub fn walk_node<V: Visitor>(visitor: &mut V, state: &EditorState, node: &Node) {
    match node.data() {
        NodeData::Element { tag, props } => visitor.visit_element(state, node, *tag, props),
        NodeData::Heading { level, props } => visitor.visit_heading(state, node, *level, props),
        NodeData::List { list_type, props } => visitor.visit_list(state, node, *list_type, props),
        NodeData::ListItem(props) => visitor.visit_list_item(state, node, props),
        NodeData::Text(text) => visitor.visit_text(state, node, text),
        NodeData::Decorator(payload) => visitor.visit_decorator(state, node, payload),
    }
}

pub fn walk_children<V: Visitor>(visitor: &mut V, state: &EditorState, node: &Node) {
    for child in node.children() {
        if let Some(child) = state.node(*child) {
            visitor.visit_node(state, child);
        }
    }
}
