//! # JSON Serialization
//!
//! Versioned, self-describing document format. Nodes are tagged by `type`;
//! keys and selection are not part of the format.
//!
//! ```json
//! {
//!   "version": 1,
//!   "root": {
//!     "type": "root", "align": "left",
//!     "children": [
//!       { "type": "paragraph", "align": "left", "children": [
//!         { "type": "text", "text": "Hello", "format": 1 }
//!       ] }
//!     ]
//!   }
//! }
//! ```
//!
//! Import is all-or-nothing: the whole document is checked while building
//! a fresh node map, and nothing reaches the editor unless it all passes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::DeserializationError;
use crate::id_generator::{KeyGenerator, NodeKey};
use crate::node::{
    Alignment, DecoratorPayload, ElementTag, HeadingLevel, ImagePayload, ListType, Node, NodeData,
    TextFormat, TextNode,
};
use crate::state::EditorState;

pub const DOCUMENT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedDocument {
    pub version: u32,
    pub root: SerializedNode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SerializedNode {
    Root(SerializedElement),
    Paragraph(SerializedElement),
    Quote(SerializedElement),
    Heading(SerializedHeading),
    List(SerializedList),
    ListItem(SerializedElement),
    Text(SerializedText),
    Image(ImagePayload),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedElement {
    pub align: Alignment,
    pub children: Vec<SerializedNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedHeading {
    pub level: u8,
    pub align: Alignment,
    pub children: Vec<SerializedNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedList {
    pub list_type: ListType,
    pub align: Alignment,
    pub children: Vec<SerializedNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedText {
    pub text: String,
    pub format: u8,
}

impl SerializedNode {
    pub fn type_name(&self) -> &'static str {
        match self {
            SerializedNode::Root(_) => "root",
            SerializedNode::Paragraph(_) => "paragraph",
            SerializedNode::Quote(_) => "quote",
            SerializedNode::Heading(_) => "heading",
            SerializedNode::List(_) => "list",
            SerializedNode::ListItem(_) => "listitem",
            SerializedNode::Text(_) => "text",
            SerializedNode::Image(_) => "image",
        }
    }
}

// ----------------------------------------------------------------------
// Export
// ----------------------------------------------------------------------

pub fn export(state: &EditorState) -> SerializedDocument {
    SerializedDocument {
        version: DOCUMENT_VERSION,
        root: export_node(state, state.root()),
    }
}

pub fn to_json_string(state: &EditorState) -> Result<String, serde_json::Error> {
    serde_json::to_string(&export(state))
}

pub fn to_json_pretty(state: &EditorState) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&export(state))
}

fn export_node(state: &EditorState, node: &Node) -> SerializedNode {
    let children = || -> Vec<SerializedNode> {
        node.children()
            .iter()
            .filter_map(|key| state.node(*key))
            .map(|child| export_node(state, child))
            .collect()
    };

    match node.data() {
        NodeData::Text(text) => SerializedNode::Text(SerializedText {
            text: text.text.clone(),
            format: text.format.bits(),
        }),
        NodeData::Decorator(DecoratorPayload::Image(image)) => SerializedNode::Image(image.clone()),
        NodeData::Element { tag, props } => {
            let element = SerializedElement {
                align: props.align,
                children: children(),
            };
            match tag {
                ElementTag::Root => SerializedNode::Root(element),
                ElementTag::Paragraph => SerializedNode::Paragraph(element),
                ElementTag::Quote => SerializedNode::Quote(element),
            }
        }
        NodeData::Heading { level, props } => SerializedNode::Heading(SerializedHeading {
            level: level.get(),
            align: props.align,
            children: children(),
        }),
        NodeData::List { list_type, props } => SerializedNode::List(SerializedList {
            list_type: *list_type,
            align: props.align,
            children: children(),
        }),
        NodeData::ListItem(props) => SerializedNode::ListItem(SerializedElement {
            align: props.align,
            children: children(),
        }),
    }
}

// ----------------------------------------------------------------------
// Import
// ----------------------------------------------------------------------

/// Parse and import a JSON document
///
/// The version is checked before the node tree is parsed, so a document
/// from a newer format reports its version rather than an unknown type.
pub fn from_json_str(json: &str, keys: &mut KeyGenerator) -> Result<EditorState, DeserializationError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let version = value
        .get("version")
        .ok_or_else(|| DeserializationError::InvalidField {
            field: "version",
            message: "missing".to_string(),
        })?
        .as_u64()
        .ok_or_else(|| DeserializationError::InvalidField {
            field: "version",
            message: "expected an unsigned integer".to_string(),
        })?;
    if version != u64::from(DOCUMENT_VERSION) {
        return Err(DeserializationError::UnsupportedVersion(
            u32::try_from(version).unwrap_or(u32::MAX),
        ));
    }

    let document: SerializedDocument = serde_json::from_value(value)?;
    import(&document, keys)
}

/// Build a snapshot from a parsed document under fresh keys
pub fn import(document: &SerializedDocument, keys: &mut KeyGenerator) -> Result<EditorState, DeserializationError> {
    if document.version != DOCUMENT_VERSION {
        return Err(DeserializationError::UnsupportedVersion(document.version));
    }
    if !matches!(document.root, SerializedNode::Root(_)) {
        return Err(DeserializationError::InvalidStructure(format!(
            "top-level node must be root, found {}",
            document.root.type_name()
        )));
    }

    let mut nodes = BTreeMap::new();
    let root = import_node(&document.root, None, keys, &mut nodes)?;
    let state = EditorState::from_parts(nodes, root, None);

    state
        .validate()
        .map_err(|err| DeserializationError::InvalidStructure(err.to_string()))?;
    debug!(nodes = state.len(), "document imported");
    Ok(state)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Root,
    List,
    Block,
}

fn import_node(
    node: &SerializedNode,
    parent: Option<(NodeKey, Slot)>,
    keys: &mut KeyGenerator,
    nodes: &mut BTreeMap<NodeKey, Node>,
) -> Result<NodeKey, DeserializationError> {
    check_placement(node, parent.map(|(_, slot)| slot))?;

    let (data, children, slot): (NodeData, &[SerializedNode], Slot) = match node {
        SerializedNode::Root(element) => (NodeData::root(), element.children.as_slice(), Slot::Root),
        SerializedNode::Paragraph(element) => (
            with_align(NodeData::paragraph(), element.align),
            element.children.as_slice(),
            Slot::Block,
        ),
        SerializedNode::Quote(element) => (
            with_align(NodeData::quote(), element.align),
            element.children.as_slice(),
            Slot::Block,
        ),
        SerializedNode::Heading(heading) => {
            let level = HeadingLevel::new(heading.level).ok_or_else(|| DeserializationError::InvalidField {
                field: "level",
                message: format!("heading level {} outside 1..=6", heading.level),
            })?;
            (
                with_align(NodeData::heading(level), heading.align),
                heading.children.as_slice(),
                Slot::Block,
            )
        }
        SerializedNode::List(list) => (
            with_align(NodeData::list(list.list_type), list.align),
            list.children.as_slice(),
            Slot::List,
        ),
        SerializedNode::ListItem(element) => (
            with_align(NodeData::list_item(), element.align),
            element.children.as_slice(),
            Slot::Block,
        ),
        SerializedNode::Text(text) => {
            let format = TextFormat::from_bits(text.format).ok_or_else(|| DeserializationError::InvalidField {
                field: "format",
                message: format!("unknown format bits in {}", text.format),
            })?;
            (NodeData::Text(TextNode::new(text.text.clone(), format)), &[], Slot::Block)
        }
        SerializedNode::Image(image) => {
            if image.src.trim().is_empty() {
                return Err(DeserializationError::InvalidField {
                    field: "src",
                    message: "image src must not be empty".to_string(),
                });
            }
            (NodeData::image(image.clone()), &[], Slot::Block)
        }
    };

    let key = keys.new_key();
    let mut child_keys = Vec::with_capacity(children.len());
    for child in children {
        child_keys.push(import_node(child, Some((key, slot)), keys, nodes)?);
    }

    let mut data = data;
    if let Some(props) = data.props_mut() {
        props.children = child_keys;
    }
    let mut built = Node::with_key(key, data);
    built.set_parent(parent.map(|(parent, _)| parent));
    nodes.insert(key, built);
    Ok(key)
}

/// Root only at the top, list items only in lists, blocks only under the
/// root, inline content only inside blocks
fn check_placement(node: &SerializedNode, slot: Option<Slot>) -> Result<(), DeserializationError> {
    let ok = match (slot, node) {
        (None, SerializedNode::Root(_)) => true,
        (None, _) | (Some(_), SerializedNode::Root(_)) => false,
        (Some(Slot::List), node) => matches!(node, SerializedNode::ListItem(_)),
        (Some(Slot::Root), node) => matches!(
            node,
            SerializedNode::Paragraph(_)
                | SerializedNode::Quote(_)
                | SerializedNode::Heading(_)
                | SerializedNode::List(_)
        ),
        (Some(Slot::Block), node) => matches!(node, SerializedNode::Text(_) | SerializedNode::Image(_)),
    };

    if ok {
        Ok(())
    } else {
        let parent = match slot {
            None => "document",
            Some(Slot::Root) => "root",
            Some(Slot::List) => "list",
            Some(Slot::Block) => "block",
        };
        Err(DeserializationError::InvalidStructure(format!(
            "{} cannot appear inside {}",
            node.type_name(),
            parent
        )))
    }
}

fn with_align(mut data: NodeData, align: Alignment) -> NodeData {
    if let Some(props) = data.props_mut() {
        props.align = align;
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "version": 1,
        "root": { "type": "root", "align": "left", "children": [
            { "type": "heading", "level": 2, "align": "center", "children": [
                { "type": "text", "text": "Title", "format": 0 }
            ] },
            { "type": "paragraph", "align": "left", "children": [
                { "type": "text", "text": "Hello", "format": 1 },
                { "type": "image", "src": "cat.png", "altText": "a cat" },
                { "type": "text", "text": "World", "format": 0 }
            ] },
            { "type": "list", "listType": "number", "align": "left", "children": [
                { "type": "listitem", "align": "left", "children": [
                    { "type": "text", "text": "one", "format": 2 }
                ] }
            ] }
        ] }
    }"#;

    #[test]
    fn test_import_builds_valid_tree() {
        let mut keys = KeyGenerator::new();
        let state = from_json_str(SAMPLE, &mut keys).unwrap();

        assert!(state.validate().is_ok());
        assert!(state.selection().is_none());
        assert_eq!(state.text_content(), "Title\nHelloWorld\none");
        assert_eq!(state.len(), 10);
    }

    #[test]
    fn test_export_preserves_structure() {
        let mut keys = KeyGenerator::new();
        let state = from_json_str(SAMPLE, &mut keys).unwrap();

        let exported = export(&state);
        let expected: SerializedDocument = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(exported, expected);
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let json = r#"{ "version": 1, "root": { "type": "root", "align": "left", "children": [
            { "type": "video", "src": "x.mp4" }
        ] } }"#;
        let err = from_json_str(json, &mut KeyGenerator::new()).unwrap_err();
        assert!(matches!(err, DeserializationError::Json(_)));
    }

    #[test]
    fn test_unsupported_version_is_reported() {
        let json = r#"{ "version": 2, "root": { "type": "whatever" } }"#;
        let err = from_json_str(json, &mut KeyGenerator::new()).unwrap_err();
        assert!(matches!(err, DeserializationError::UnsupportedVersion(2)));
    }

    #[test]
    fn test_bad_fields_are_rejected() {
        let heading = r#"{ "version": 1, "root": { "type": "root", "align": "left", "children": [
            { "type": "heading", "level": 9, "align": "left", "children": [] }
        ] } }"#;
        assert!(matches!(
            from_json_str(heading, &mut KeyGenerator::new()),
            Err(DeserializationError::InvalidField { field: "level", .. })
        ));

        let format = r#"{ "version": 1, "root": { "type": "root", "align": "left", "children": [
            { "type": "paragraph", "align": "left", "children": [
                { "type": "text", "text": "x", "format": 64 }
            ] }
        ] } }"#;
        assert!(matches!(
            from_json_str(format, &mut KeyGenerator::new()),
            Err(DeserializationError::InvalidField { field: "format", .. })
        ));
    }

    #[test]
    fn test_misplaced_nodes_are_rejected() {
        let nested_root = r#"{ "version": 1, "root": { "type": "root", "align": "left", "children": [
            { "type": "root", "align": "left", "children": [] }
        ] } }"#;
        let stray_item = r#"{ "version": 1, "root": { "type": "root", "align": "left", "children": [
            { "type": "listitem", "align": "left", "children": [] }
        ] } }"#;
        let not_root = r#"{ "version": 1, "root": { "type": "paragraph", "align": "left", "children": [] } }"#;

        for json in [nested_root, stray_item, not_root] {
            assert!(matches!(
                from_json_str(json, &mut KeyGenerator::new()),
                Err(DeserializationError::InvalidStructure(_))
            ));
        }
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let json = r#"{ "version": 1, "root": { "type": "root", "children": [] } }"#;
        assert!(matches!(
            from_json_str(json, &mut KeyGenerator::new()),
            Err(DeserializationError::Json(_))
        ));
    }
}
