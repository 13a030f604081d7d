use crate::{compile_to_html, CompileOptions, DEFAULT_TITLE};
use quire_editor::{json, Command, Editor, EditorState, KeyGenerator};
use serde_json::{json, Value};

fn paragraph(children: Value) -> Value {
    json!({ "type": "paragraph", "align": "left", "children": children })
}

fn text(text: &str, format: u8) -> Value {
    json!({ "type": "text", "text": text, "format": format })
}

fn document(children: Value) -> EditorState {
    let doc = json!({
        "version": 1,
        "root": { "type": "root", "align": "left", "children": children }
    });
    let mut keys = KeyGenerator::new();
    json::from_json_str(&doc.to_string(), &mut keys).expect("Failed to import")
}

fn compact(state: &EditorState) -> String {
    compile_to_html(state, CompileOptions::default().compact())
}

#[test]
fn test_compile_paragraph() {
    let state = document(json!([paragraph(json!([text("Hello", 0)]))]));
    assert_eq!(compact(&state), "<p>Hello</p>");
}

#[test]
fn test_format_wrappers_nest_in_fixed_order() {
    let state = document(json!([paragraph(json!([
        text("plain ", 0),
        text("all", 1 | 2 | 4 | 8),
        text(" struck", 8)
    ]))]));

    assert_eq!(
        compact(&state),
        "<p>plain <strong><em><u><s>all</s></u></em></strong><s> struck</s></p>"
    );
}

#[test]
fn test_text_is_escaped() {
    let state = document(json!([paragraph(json!([text("<b>&\"'", 0)]))]));
    assert_eq!(compact(&state), "<p>&lt;b&gt;&amp;&quot;&#39;</p>");
}

#[test]
fn test_empty_block_renders_line_break() {
    let mut keys = KeyGenerator::new();
    let state = EditorState::empty(&mut keys);
    assert_eq!(compact(&state), "<p><br></p>");
}

#[test]
fn test_headings_quotes_and_alignment() {
    let state = document(json!([
        { "type": "heading", "level": 2, "align": "center", "children": [text("Title", 0)] },
        { "type": "quote", "align": "left", "children": [text("Said", 2)] }
    ]));

    assert_eq!(
        compact(&state),
        "<h2 style=\"text-align: center\">Title</h2><blockquote><em>Said</em></blockquote>"
    );
}

#[test]
fn test_lists_pretty_printed() {
    let state = document(json!([
        { "type": "list", "listType": "number", "align": "left", "children": [
            { "type": "listitem", "align": "left", "children": [text("one", 0)] },
            { "type": "listitem", "align": "right", "children": [] }
        ] },
        { "type": "list", "listType": "bullet", "align": "left", "children": [
            { "type": "listitem", "align": "left", "children": [text("dot", 0)] }
        ] }
    ]));

    let html = compile_to_html(&state, CompileOptions::default());
    let expected = "\
<ol>
  <li>one</li>
  <li style=\"text-align: right\"><br></li>
</ol>
<ul>
  <li>dot</li>
</ul>
";
    assert_eq!(html, expected);
}

#[test]
fn test_image_with_and_without_caption() {
    let state = document(json!([paragraph(json!([
        { "type": "image", "src": "a.png", "altText": "A", "width": 10, "height": null, "caption": null },
        { "type": "image", "src": "b.png", "altText": "", "width": null, "height": null, "caption": "Fig <1>" }
    ]))]));

    assert_eq!(
        compact(&state),
        "<p><img src=\"a.png\" alt=\"A\" width=\"10\"><figure><img src=\"b.png\" alt=\"\"><figcaption>Fig &lt;1&gt;</figcaption></figure></p>"
    );
}

#[test]
fn test_standalone_page_shell() {
    let state = document(json!([paragraph(json!([text("Body", 0)]))]));
    let html = compile_to_html(&state, CompileOptions::default().standalone("Notes & more"));

    assert!(html.starts_with("<!DOCTYPE html>\n<html>\n"));
    assert!(html.contains("    <title>Notes &amp; more</title>\n"));
    assert!(html.contains("  <body>\n    <p>Body</p>\n  </body>\n"));
    assert!(html.ends_with("</html>\n"));
}

#[test]
fn test_custom_indent() {
    let state = document(json!([
        { "type": "list", "listType": "bullet", "align": "left", "children": [
            { "type": "listitem", "align": "left", "children": [text("x", 0)] }
        ] }
    ]));
    let options = CompileOptions {
        indent: "\t".to_string(),
        ..CompileOptions::default()
    };

    assert_eq!(compile_to_html(&state, options), "<ul>\n\t<li>x</li>\n</ul>\n");
}

#[test]
fn test_output_ignores_keys_and_selection() -> anyhow::Result<()> {
    let mut editor = Editor::default();
    editor.dispatch(Command::InsertText("Same".into()))?;
    let original = compile_to_html(&editor.state(), CompileOptions::default());

    let json = editor.to_json_string()?;
    let mut other = Editor::default();
    other.dispatch(Command::InsertText("padding keys".into()))?;
    other.import_json(&json)?;

    assert_eq!(compile_to_html(&other.state(), CompileOptions::default()), original);
    Ok(())
}

#[test]
fn test_options_deserialize_with_defaults() -> anyhow::Result<()> {
    let options: CompileOptions = serde_json::from_str(r#"{ "standalone": true }"#)?;
    assert!(options.standalone);
    assert!(options.pretty);
    assert_eq!(options.indent, "  ");
    assert_eq!(options.title, "");
    Ok(())
}

#[test]
fn test_untitled_page_uses_default_title() {
    let state = document(json!([paragraph(json!([text("Body", 0)]))]));
    let options = CompileOptions {
        standalone: true,
        ..CompileOptions::default()
    };

    let html = compile_to_html(&state, options);
    assert!(html.contains(&format!("    <title>{}</title>\n", DEFAULT_TITLE)));
}
