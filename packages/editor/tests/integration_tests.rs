//! End-to-end editing flows through the public API

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use quire_editor::{
    json, ops, Command, DecoratorPayload, Editor, EditorError, EditorState, EditorWarning, HeadingLevel, ImagePayload, ListType,
    NodeData, Point, Selection, TextFormat, UpdateTag,
};

const HELLO_WORLD: &str = r#"{
    "version": 1,
    "root": { "type": "root", "align": "left", "children": [
        { "type": "paragraph", "align": "left", "children": [
            { "type": "text", "text": "HelloWorld", "format": 0 }
        ] }
    ] }
}"#;

fn text_of(state: &EditorState, key: quire_editor::NodeKey) -> (String, TextFormat) {
    let text = state.node(key).and_then(|node| node.as_text()).unwrap();
    (text.text.clone(), text.format)
}

/// Every child points back at the parent listing it
fn assert_linked(state: &EditorState) {
    state.validate().unwrap();
    for node in state.nodes() {
        for child in node.children() {
            assert_eq!(state.node(*child).and_then(|c| c.parent()), Some(node.key()));
        }
    }
}

#[test]
fn test_bold_toggle_then_typing_creates_bold_text() -> anyhow::Result<()> {
    let mut editor = Editor::default();

    editor.dispatch(Command::ToggleFormat(TextFormat::BOLD))?;
    editor.dispatch(Command::InsertText("Hi".into()))?;

    let state = editor.state();
    let leaves = state.leaves();
    assert_eq!(leaves.len(), 1);
    assert_eq!(text_of(&state, leaves[0]), ("Hi".to_string(), TextFormat::BOLD));
    Ok(())
}

#[test]
fn test_image_inserted_mid_text_splits_into_siblings() -> anyhow::Result<()> {
    let mut editor = Editor::default();
    editor.import_json(HELLO_WORLD)?;

    let text = editor.read(|state| state.leaves()[0]);
    editor.set_selection(Some(Selection::collapsed(Point::new(text, 5))))?;
    editor.dispatch(Command::InsertDecorator(DecoratorPayload::Image(
        ImagePayload::new("cat.png").alt_text("a cat"),
    )))?;

    let state = editor.state();
    let paragraph = state.children(state.root_key())[0];
    let children = state.children(paragraph);
    assert_eq!(children.len(), 3);

    assert_eq!(text_of(&state, children[0]).0, "Hello");
    assert_eq!(state.node(children[1]).unwrap().data().variant_name(), "image");
    assert_eq!(text_of(&state, children[2]).0, "World");
    assert_eq!(children[0], text, "left half keeps its key");

    let caret = state.selection().unwrap();
    assert_eq!(caret.anchor, Point::new(children[2], 0));
    assert_linked(&state);
    Ok(())
}

#[test]
fn test_import_of_unknown_type_keeps_current_document() -> anyhow::Result<()> {
    let mut editor = Editor::default();
    editor.import_json(HELLO_WORLD)?;
    let before = editor.state();

    let result = editor.import_json(
        r#"{ "version": 1, "root": { "type": "root", "align": "left", "children": [
            { "type": "foo", "align": "left", "children": [] }
        ] } }"#,
    );

    assert!(matches!(result, Err(EditorError::Deserialization(_))));
    assert!(Rc::ptr_eq(&before, &editor.state()));
    assert_eq!(editor.read(|state| state.text_content()), "HelloWorld");
    Ok(())
}

#[test]
fn test_json_round_trip_is_content_equal() -> anyhow::Result<()> {
    let mut editor = Editor::default();
    editor.dispatch(Command::InsertText("Title".into()))?;
    editor.dispatch(Command::SetBlockType(quire_editor::BlockType::Heading(
        HeadingLevel::new(1).unwrap(),
    )))?;
    editor.dispatch(Command::InsertParagraph)?;
    editor.dispatch(Command::InsertText("plain ".into()))?;
    editor.dispatch(Command::ToggleFormat(TextFormat::BOLD | TextFormat::ITALIC))?;
    editor.dispatch(Command::InsertText("loud".into()))?;
    editor.dispatch(Command::InsertDecorator(DecoratorPayload::Image(
        ImagePayload::new("a.png").size(10, 20).caption("fig"),
    )))?;
    editor.dispatch(Command::InsertParagraph)?;
    editor.dispatch(Command::InsertText("first".into()))?;
    editor.dispatch(Command::InsertList(ListType::Number))?;
    editor.dispatch(Command::SetAlignment(quire_editor::Alignment::Right))?;

    let original = editor.state();
    let json = json::to_json_string(&original)?;

    let mut other = Editor::default();
    other.import_json(&json)?;

    assert!(other.state().content_eq(&original));
    assert_eq!(other.export_json(), editor.export_json());
    assert!(other.selection().is_none());
    Ok(())
}

#[test]
fn test_structural_invariant_holds_through_command_sequence() -> anyhow::Result<()> {
    let mut editor = Editor::default();
    let commands = vec![
        Command::InsertText("Hello world".into()),
        Command::InsertParagraph,
        Command::InsertText("Second".into()),
        Command::ToggleFormat(TextFormat::BOLD),
        Command::InsertText("b".into()),
        Command::SetBlockType(quire_editor::BlockType::Heading(HeadingLevel::new(2).unwrap())),
        Command::InsertList(ListType::Bullet),
        Command::InsertParagraph,
        Command::InsertText("item two".into()),
        Command::RemoveList,
        Command::InsertDecorator(DecoratorPayload::Image(ImagePayload::new("x.png"))),
        Command::DeleteBackward,
        Command::DeleteBackward,
        Command::DeleteBackward,
        Command::DuplicateBlock,
        Command::SetAlignment(quire_editor::Alignment::Center),
        Command::Undo,
        Command::Redo,
    ];

    for command in commands {
        editor.dispatch(command)?;
        assert_linked(&editor.state());
    }
    assert_eq!(
        editor.read(|state| state.text_content()),
        "Hello world\nSecondb\nitem t\nitem t"
    );

    // Select everything and delete it
    let (first, last, last_len) = editor.read(|state| {
        let leaves = state.leaves();
        let last = *leaves.last().unwrap();
        (leaves[0], last, state.node(last).unwrap().size())
    });
    editor.set_selection(Some(Selection::range(Point::new(first, 0), Point::new(last, last_len))))?;
    editor.dispatch(Command::DeleteBackward)?;
    assert_linked(&editor.state());
    assert_eq!(editor.read(|state| state.blocks().len()), 1);

    editor.dispatch(Command::InsertText("x".into()))?;
    assert_eq!(editor.read(|state| state.text_content()), "x");
    assert_linked(&editor.state());
    Ok(())
}

#[test]
fn test_selection_is_cleared_when_both_endpoints_are_removed() -> anyhow::Result<()> {
    let mut editor = Editor::default();
    editor.import_json(HELLO_WORLD)?;
    let text = editor.read(|state| state.leaves()[0]);
    editor.set_selection(Some(Selection::range(Point::new(text, 1), Point::new(text, 8))))?;

    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);
    editor.register_update_listener(move |state, outcome| {
        log.borrow_mut()
            .push((state.selection().copied(), state.node(text).is_some(), outcome.warnings.clone()));
    });

    let outcome = editor.update(|tx| Ok(tx.remove(text)?))?;

    assert_eq!(outcome.warnings, vec![EditorWarning::SelectionInvalidated { cleared: true }]);
    assert_eq!(editor.selection(), None);
    assert_eq!(editor.read(|state| state.text_content()), "");
    assert_linked(&editor.state());
    assert_eq!(
        *seen.borrow(),
        vec![(None, false, vec![EditorWarning::SelectionInvalidated { cleared: true }])]
    );
    Ok(())
}

#[test]
fn test_listeners_see_each_publish_in_order() -> anyhow::Result<()> {
    let mut editor = Editor::default();
    let seen = Rc::new(RefCell::new(Vec::new()));

    let log = Rc::clone(&seen);
    editor.register_update_listener(move |state, outcome| {
        log.borrow_mut().push((state.text_content(), outcome.tree_changed));
    });

    editor.dispatch(Command::InsertText("a".into()))?;
    editor.dispatch(Command::ToggleFormat(TextFormat::BOLD))?;
    editor.dispatch(Command::InsertText("b".into()))?;

    assert_eq!(
        *seen.borrow(),
        vec![
            ("a".to_string(), true),
            ("a".to_string(), false),
            ("ab".to_string(), true),
        ]
    );
    Ok(())
}

#[test]
fn test_update_queued_by_listener_runs_after_publish() -> anyhow::Result<()> {
    let mut editor = Editor::default();
    let queue = editor.update_queue();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let queued_once = Rc::new(Cell::new(false));

    let log = Rc::clone(&seen);
    editor.register_update_listener(move |state, _| {
        log.borrow_mut().push(state.text_content());
        if !queued_once.replace(true) {
            queue.push(UpdateTag::high(), |tx| ops::insert_text(tx, "!"));
        }
    });

    editor.dispatch(Command::InsertText("Hi".into()))?;

    assert_eq!(*seen.borrow(), vec!["Hi".to_string(), "Hi!".to_string()]);
    assert!(editor.update_queue().is_empty());
    Ok(())
}

#[test]
fn test_updates_queued_by_failed_transaction_are_dropped() -> anyhow::Result<()> {
    let mut editor = Editor::default();

    let result = editor.update(|tx| {
        tx.queue_update(UpdateTag::high(), |tx| ops::insert_text(tx, "never"));
        Err(EditorError::aborted("no"))
    });
    assert!(result.is_err());

    editor.update(|tx| {
        tx.queue_update(UpdateTag::high(), |tx| ops::insert_text(tx, "later"));
        ops::insert_text(tx, "now ")
    })?;

    assert_eq!(editor.read(|state| state.text_content()), "now later");
    Ok(())
}

#[test]
fn test_failing_queued_update_does_not_stop_the_queue() -> anyhow::Result<()> {
    let mut editor = Editor::default();
    let queue = editor.update_queue();

    queue.push(UpdateTag::high(), |_| Err(EditorError::aborted("first fails")));
    queue.push(UpdateTag::high(), |tx| ops::insert_text(tx, "second runs"));

    assert_eq!(editor.flush_queued_updates(), 2);
    assert_eq!(editor.read(|state| state.text_content()), "second runs");
    Ok(())
}

#[test]
fn test_invalid_decorator_payload_is_rejected_without_change() -> anyhow::Result<()> {
    let mut editor = Editor::default();
    editor.dispatch(Command::InsertText("keep".into()))?;
    let before = editor.state();

    let result = editor.dispatch(Command::InsertDecorator(DecoratorPayload::Image(ImagePayload::new("  "))));

    assert!(matches!(result, Err(EditorError::InvalidPayload { .. })));
    assert!(Rc::ptr_eq(&before, &editor.state()));
    Ok(())
}

#[test]
fn test_validation_failure_keeps_selection_and_document() -> anyhow::Result<()> {
    let mut editor = Editor::default();
    editor.dispatch(Command::InsertText("stay".into()))?;
    let before = editor.state();

    let result = editor.update(|tx| {
        // Left detached, so commit must refuse it
        tx.create_node(NodeData::paragraph());
        Ok(())
    });

    assert!(matches!(result, Err(EditorError::Validation(_))));
    assert!(Rc::ptr_eq(&before, &editor.state()));
    assert_eq!(editor.selection(), before.selection().copied());
    Ok(())
}
