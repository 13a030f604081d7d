//! # Node Model
//!
//! Typed, keyed tree nodes. A snapshot stores nodes flat in a map keyed by
//! [`NodeKey`]; element-family nodes own an ordered list of child keys and
//! every non-root node points back at its parent.
//!
//! ```text
//! Root
//!  ├─ Paragraph ─┬─ Text "Hello"
//!  │             ├─ Decorator(Image)
//!  │             └─ Text "World"
//!  └─ List(Bullet) ── ListItem ── Text "item"
//! ```

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::id_generator::{KeyGenerator, NodeKey};

bitflags! {
    /// Inline text formatting
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextFormat: u8 {
        const BOLD = 1;
        const ITALIC = 1 << 1;
        const UNDERLINE = 1 << 2;
        const STRIKETHROUGH = 1 << 3;
    }
}

impl Default for TextFormat {
    fn default() -> Self {
        Self::empty()
    }
}

/// Block alignment carried by every element-family node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl Alignment {
    pub fn as_str(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Justify => "justify",
        }
    }
}

/// Heading level, always within 1..=6
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeadingLevel(u8);

impl HeadingLevel {
    pub const TOP: HeadingLevel = HeadingLevel(1);

    pub fn new(level: u8) -> Option<Self> {
        (1..=6).contains(&level).then_some(Self(level))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListType {
    Bullet,
    Number,
}

/// Tag of the generic element variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementTag {
    Root,
    Paragraph,
    Quote,
}

/// Block shape a selection can be converted into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockType {
    Paragraph,
    Quote,
    Heading(HeadingLevel),
    List(ListType),
}

/// Payload shared by all element-family nodes
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElementProps {
    pub align: Alignment,
    pub children: Vec<NodeKey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextNode {
    pub text: String,
    pub format: TextFormat,
}

impl TextNode {
    pub fn new(text: impl Into<String>, format: TextFormat) -> Self {
        Self {
            text: text.into(),
            format,
        }
    }

    /// Length in characters
    pub fn len(&self) -> usize {
        char_len(&self.text)
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn has_format(&self, format: TextFormat) -> bool {
        self.format.contains(format)
    }
}

/// Image decorator fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePayload {
    pub src: String,
    #[serde(default)]
    pub alt_text: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub caption: Option<String>,
}

impl ImagePayload {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            alt_text: String::new(),
            width: None,
            height: None,
            caption: None,
        }
    }

    pub fn alt_text(mut self, alt_text: impl Into<String>) -> Self {
        self.alt_text = alt_text.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }
}

/// Decorator payloads known to the serializer
///
/// Tree algorithms copy these around without looking inside; only the
/// serializer and host renderers care about the fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoratorPayload {
    Image(ImagePayload),
}

impl DecoratorPayload {
    pub fn variant_name(&self) -> &'static str {
        match self {
            DecoratorPayload::Image(_) => "image",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Text(TextNode),
    Element { tag: ElementTag, props: ElementProps },
    Heading { level: HeadingLevel, props: ElementProps },
    List { list_type: ListType, props: ElementProps },
    ListItem(ElementProps),
    Decorator(DecoratorPayload),
}

impl NodeData {
    pub fn root() -> Self {
        NodeData::Element {
            tag: ElementTag::Root,
            props: ElementProps::default(),
        }
    }

    pub fn paragraph() -> Self {
        NodeData::Element {
            tag: ElementTag::Paragraph,
            props: ElementProps::default(),
        }
    }

    pub fn quote() -> Self {
        NodeData::Element {
            tag: ElementTag::Quote,
            props: ElementProps::default(),
        }
    }

    pub fn heading(level: HeadingLevel) -> Self {
        NodeData::Heading {
            level,
            props: ElementProps::default(),
        }
    }

    pub fn list(list_type: ListType) -> Self {
        NodeData::List {
            list_type,
            props: ElementProps::default(),
        }
    }

    pub fn list_item() -> Self {
        NodeData::ListItem(ElementProps::default())
    }

    pub fn text(text: impl Into<String>, format: TextFormat) -> Self {
        NodeData::Text(TextNode::new(text, format))
    }

    pub fn image(payload: ImagePayload) -> Self {
        NodeData::Decorator(DecoratorPayload::Image(payload))
    }

    /// Empty element of the given block type
    pub fn block(block_type: BlockType) -> Self {
        match block_type {
            BlockType::Paragraph => NodeData::paragraph(),
            BlockType::Quote => NodeData::quote(),
            BlockType::Heading(level) => NodeData::heading(level),
            BlockType::List(list_type) => NodeData::list(list_type),
        }
    }

    pub fn props(&self) -> Option<&ElementProps> {
        match self {
            NodeData::Element { props, .. }
            | NodeData::Heading { props, .. }
            | NodeData::List { props, .. }
            | NodeData::ListItem(props) => Some(props),
            NodeData::Text(_) | NodeData::Decorator(_) => None,
        }
    }

    pub fn props_mut(&mut self) -> Option<&mut ElementProps> {
        match self {
            NodeData::Element { props, .. }
            | NodeData::Heading { props, .. }
            | NodeData::List { props, .. }
            | NodeData::ListItem(props) => Some(props),
            NodeData::Text(_) | NodeData::Decorator(_) => None,
        }
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            NodeData::Text(_) => "text",
            NodeData::Element { tag: ElementTag::Root, .. } => "root",
            NodeData::Element { tag: ElementTag::Paragraph, .. } => "paragraph",
            NodeData::Element { tag: ElementTag::Quote, .. } => "quote",
            NodeData::Heading { .. } => "heading",
            NodeData::List { .. } => "list",
            NodeData::ListItem(_) => "listitem",
            NodeData::Decorator(payload) => payload.variant_name(),
        }
    }

    /// Same variant and payload, children not compared
    pub fn shallow_eq(&self, other: &NodeData) -> bool {
        match (self, other) {
            (NodeData::Text(a), NodeData::Text(b)) => a == b,
            (NodeData::Decorator(a), NodeData::Decorator(b)) => a == b,
            (
                NodeData::Element { tag: a, props: pa },
                NodeData::Element { tag: b, props: pb },
            ) => a == b && pa.align == pb.align,
            (
                NodeData::Heading { level: a, props: pa },
                NodeData::Heading { level: b, props: pb },
            ) => a == b && pa.align == pb.align,
            (
                NodeData::List { list_type: a, props: pa },
                NodeData::List { list_type: b, props: pb },
            ) => a == b && pa.align == pb.align,
            (NodeData::ListItem(pa), NodeData::ListItem(pb)) => pa.align == pb.align,
            _ => false,
        }
    }

    /// Copy of this payload with an empty child list
    pub(crate) fn without_children(&self) -> NodeData {
        let mut data = self.clone();
        if let Some(props) = data.props_mut() {
            props.children.clear();
        }
        data
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    key: NodeKey,
    parent: Option<NodeKey>,
    data: NodeData,
}

impl Node {
    /// Construct a detached node with a freshly allocated key
    pub fn create(keys: &mut KeyGenerator, data: NodeData) -> Self {
        Self::with_key(keys.new_key(), data)
    }

    pub(crate) fn with_key(key: NodeKey, data: NodeData) -> Self {
        Self {
            key,
            parent: None,
            data,
        }
    }

    pub fn key(&self) -> NodeKey {
        self.key
    }

    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    pub fn data(&self) -> &NodeData {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut NodeData {
        &mut self.data
    }

    pub(crate) fn set_parent(&mut self, parent: Option<NodeKey>) {
        self.parent = parent;
    }

    pub fn children(&self) -> &[NodeKey] {
        self.data
            .props()
            .map(|props| props.children.as_slice())
            .unwrap_or(&[])
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut Vec<NodeKey>> {
        self.data.props_mut().map(|props| &mut props.children)
    }

    pub fn is_element(&self) -> bool {
        self.data.props().is_some()
    }

    pub fn is_root(&self) -> bool {
        matches!(
            self.data,
            NodeData::Element {
                tag: ElementTag::Root,
                ..
            }
        )
    }

    pub fn is_text(&self) -> bool {
        matches!(self.data, NodeData::Text(_))
    }

    pub fn is_decorator(&self) -> bool {
        matches!(self.data, NodeData::Decorator(_))
    }

    /// Text and decorator leaves live inside blocks
    pub fn is_inline(&self) -> bool {
        self.is_text() || self.is_decorator()
    }

    /// Element that directly holds inline content
    pub fn is_block(&self) -> bool {
        match &self.data {
            NodeData::Element { tag, .. } => *tag != ElementTag::Root,
            NodeData::Heading { .. } | NodeData::ListItem(_) => true,
            NodeData::List { .. } | NodeData::Text(_) | NodeData::Decorator(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&TextNode> {
        match &self.data {
            NodeData::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn align(&self) -> Option<Alignment> {
        self.data.props().map(|props| props.align)
    }

    /// Offset space of this node: characters for text, children for
    /// elements, one slot for decorators
    pub fn size(&self) -> usize {
        match &self.data {
            NodeData::Text(text) => text.len(),
            NodeData::Decorator(_) => 1,
            _ => self.children().len(),
        }
    }

    pub fn block_type(&self) -> Option<BlockType> {
        match &self.data {
            NodeData::Element {
                tag: ElementTag::Paragraph,
                ..
            } => Some(BlockType::Paragraph),
            NodeData::Element {
                tag: ElementTag::Quote,
                ..
            } => Some(BlockType::Quote),
            NodeData::Heading { level, .. } => Some(BlockType::Heading(*level)),
            NodeData::List { list_type, .. } => Some(BlockType::List(*list_type)),
            _ => None,
        }
    }
}

pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte index of the `chars`-th character, clamped to the end
pub(crate) fn byte_offset(s: &str, chars: usize) -> usize {
    s.char_indices()
        .nth(chars)
        .map(|(ix, _)| ix)
        .unwrap_or(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_level_bounds() {
        assert!(HeadingLevel::new(0).is_none());
        assert_eq!(HeadingLevel::new(1).map(HeadingLevel::get), Some(1));
        assert_eq!(HeadingLevel::new(6).map(HeadingLevel::get), Some(6));
        assert!(HeadingLevel::new(7).is_none());
    }

    #[test]
    fn test_created_nodes_get_distinct_keys() {
        let mut keys = KeyGenerator::new();
        let a = Node::create(&mut keys, NodeData::paragraph());
        let b = Node::create(&mut keys, NodeData::paragraph());

        assert_ne!(a.key(), b.key());
        assert!(a.parent().is_none());
        assert!(a.data().shallow_eq(b.data()));
    }

    #[test]
    fn test_shallow_eq_ignores_children_but_not_payload() {
        let mut with_child = NodeData::paragraph();
        with_child
            .props_mut()
            .unwrap()
            .children
            .push(KeyGenerator::new().new_key());

        assert!(with_child.shallow_eq(&NodeData::paragraph()));
        assert!(!NodeData::paragraph().shallow_eq(&NodeData::quote()));
        assert!(!NodeData::text("a", TextFormat::BOLD)
            .shallow_eq(&NodeData::text("a", TextFormat::empty())));
    }

    #[test]
    fn test_text_length_counts_characters() {
        let text = TextNode::new("héllo", TextFormat::empty());
        assert_eq!(text.len(), 5);
        assert_eq!(byte_offset("héllo", 2), 3);
        assert_eq!(byte_offset("héllo", 10), "héllo".len());
    }

    #[test]
    fn test_leaf_nodes_report_no_children() {
        let mut keys = KeyGenerator::new();
        let image = Node::create(&mut keys, NodeData::image(ImagePayload::new("a.png")));

        assert!(image.children().is_empty());
        assert!(image.is_inline());
        assert!(!image.is_block());
        assert_eq!(image.size(), 1);
        assert_eq!(image.data().variant_name(), "image");
    }
}
