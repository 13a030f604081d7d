use criterion::{black_box, criterion_group, criterion_main, Criterion};
use quire_editor::{json, Command, Editor, KeyGenerator, ListType, Point, Selection, TextFormat};

fn large_document() -> Editor {
    let mut editor = Editor::default();
    for ix in 0..200 {
        editor
            .dispatch(Command::InsertText(format!("Paragraph {ix} with some plain text. ")))
            .unwrap();
        editor.dispatch(Command::ToggleFormat(TextFormat::BOLD)).unwrap();
        editor.dispatch(Command::InsertText("bold tail".into())).unwrap();
        editor.dispatch(Command::ToggleFormat(TextFormat::BOLD)).unwrap();
        if ix % 10 == 0 {
            editor.dispatch(Command::InsertList(ListType::Bullet)).unwrap();
        }
        editor.dispatch(Command::InsertParagraph).unwrap();
        if ix % 10 == 0 {
            editor.dispatch(Command::RemoveList).unwrap();
        }
    }
    editor
}

fn typing_burst(c: &mut Criterion) {
    c.bench_function("typing_burst_100_chars", |b| {
        b.iter(|| {
            let mut editor = Editor::default();
            for ch in "The quick brown fox jumps over the lazy dog. ".chars().cycle().take(100) {
                editor.dispatch(Command::InsertText(ch.to_string())).unwrap();
            }
            black_box(editor.history().undo_levels())
        })
    });
}

fn typing_into_large_document(c: &mut Criterion) {
    let editor = large_document();
    let json = editor.to_json_string().unwrap();

    c.bench_function("typing_into_large_document", |b| {
        b.iter(|| {
            let mut editor = Editor::default();
            editor.import_json(&json).unwrap();
            let last = editor.read(|state| *state.leaves().last().unwrap());
            editor.set_selection(Some(Selection::collapsed(Point::new(last, 0)))).unwrap();
            editor.dispatch(Command::InsertText("x".into())).unwrap();
            black_box(editor.state())
        })
    });
}

fn json_round_trip(c: &mut Criterion) {
    let editor = large_document();
    let state = editor.state();

    c.bench_function("export_large_document", |b| {
        b.iter(|| json::to_json_string(black_box(&state)).unwrap())
    });

    let source = json::to_json_string(&state).unwrap();
    c.bench_function("import_large_document", |b| {
        b.iter(|| {
            let mut keys = KeyGenerator::new();
            json::from_json_str(black_box(&source), &mut keys).unwrap()
        })
    });
}

criterion_group!(benches, typing_burst, typing_into_large_document, json_round_trip);
criterion_main!(benches);
