use quire_editor::{
    walk_children, walk_state, Alignment, DecoratorPayload, EditorState, ElementProps, ElementTag, HeadingLevel,
    ImagePayload, ListType, Node, TextFormat, TextNode, Visitor,
};
use tracing::debug;

use crate::context::{CompileOptions, Context};

/// Inline wrappers, outermost first
const FORMAT_TAGS: [(TextFormat, &str); 4] = [
    (TextFormat::BOLD, "strong"),
    (TextFormat::ITALIC, "em"),
    (TextFormat::UNDERLINE, "u"),
    (TextFormat::STRIKETHROUGH, "s"),
];

/// Render a snapshot as HTML
///
/// Every snapshot has exactly one rendering. Keys and the selection are
/// not part of the output.
pub fn compile_to_html(state: &EditorState, options: CompileOptions) -> String {
    let mut compiler = HtmlCompiler {
        ctx: Context::new(options),
    };

    if compiler.ctx.options.standalone {
        compiler.open_page();
        walk_state(&mut compiler, state);
        compiler.close_page();
    } else {
        walk_state(&mut compiler, state);
    }

    let html = compiler.ctx.get_output();
    debug!(nodes = state.len(), bytes = html.len(), "compiled html");
    html
}

struct HtmlCompiler {
    ctx: Context,
}

impl HtmlCompiler {
    fn open_page(&mut self) {
        let title = escape_html(self.ctx.options.page_title());
        self.ctx.add_line("<!DOCTYPE html>");
        self.ctx.add_line("<html>");
        self.ctx.indent();
        self.ctx.add_line("<head>");
        self.ctx.indent();
        self.ctx.add_line("<meta charset=\"UTF-8\">");
        self.ctx
            .add_line("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">");
        self.ctx.add_line(&format!("<title>{}</title>", title));
        self.ctx.dedent();
        self.ctx.add_line("</head>");
        self.ctx.add_line("<body>");
        self.ctx.indent();
    }

    fn close_page(&mut self) {
        self.ctx.dedent();
        self.ctx.add_line("</body>");
        self.ctx.dedent();
        self.ctx.add_line("</html>");
    }

    /// A block and its inline content on one line
    fn compile_block(&mut self, state: &EditorState, node: &Node, tag: &str, props: &ElementProps) {
        self.ctx.start_line();
        self.ctx.add(&format!("<{}{}>", tag, align_attribute(props.align)));
        if node.children().is_empty() {
            self.ctx.add("<br>");
        } else {
            walk_children(self, state, node);
        }
        self.ctx.add(&format!("</{}>", tag));
        self.ctx.end_line();
    }

    fn compile_image(&mut self, image: &ImagePayload) {
        let mut tag = format!(
            "<img src=\"{}\" alt=\"{}\"",
            escape_html(&image.src),
            escape_html(&image.alt_text)
        );
        if let Some(width) = image.width {
            tag.push_str(&format!(" width=\"{}\"", width));
        }
        if let Some(height) = image.height {
            tag.push_str(&format!(" height=\"{}\"", height));
        }
        tag.push('>');

        match &image.caption {
            Some(caption) => {
                self.ctx.add("<figure>");
                self.ctx.add(&tag);
                self.ctx
                    .add(&format!("<figcaption>{}</figcaption>", escape_html(caption)));
                self.ctx.add("</figure>");
            }
            None => self.ctx.add(&tag),
        }
    }
}

impl Visitor for HtmlCompiler {
    fn visit_element(&mut self, state: &EditorState, node: &Node, tag: ElementTag, props: &ElementProps) {
        match tag {
            ElementTag::Root => walk_children(self, state, node),
            ElementTag::Paragraph => self.compile_block(state, node, "p", props),
            ElementTag::Quote => self.compile_block(state, node, "blockquote", props),
        }
    }

    fn visit_heading(&mut self, state: &EditorState, node: &Node, level: HeadingLevel, props: &ElementProps) {
        self.compile_block(state, node, &format!("h{}", level.get()), props);
    }

    fn visit_list(&mut self, state: &EditorState, node: &Node, list_type: ListType, props: &ElementProps) {
        let tag = match list_type {
            ListType::Bullet => "ul",
            ListType::Number => "ol",
        };
        self.ctx
            .add_line(&format!("<{}{}>", tag, align_attribute(props.align)));
        self.ctx.indent();
        walk_children(self, state, node);
        self.ctx.dedent();
        self.ctx.add_line(&format!("</{}>", tag));
    }

    fn visit_list_item(&mut self, state: &EditorState, node: &Node, props: &ElementProps) {
        self.compile_block(state, node, "li", props);
    }

    fn visit_text(&mut self, _state: &EditorState, _node: &Node, text: &TextNode) {
        let active: Vec<&str> = FORMAT_TAGS
            .iter()
            .filter(|(flag, _)| text.format.contains(*flag))
            .map(|(_, tag)| *tag)
            .collect();

        for tag in &active {
            self.ctx.add(&format!("<{}>", tag));
        }
        self.ctx.add(&escape_html(&text.text));
        for tag in active.iter().rev() {
            self.ctx.add(&format!("</{}>", tag));
        }
    }

    fn visit_decorator(&mut self, _state: &EditorState, _node: &Node, payload: &DecoratorPayload) {
        match payload {
            DecoratorPayload::Image(image) => self.compile_image(image),
        }
    }
}

fn align_attribute(align: Alignment) -> String {
    match align {
        Alignment::Left => String::new(),
        other => format!(" style=\"text-align: {}\"", other.as_str()),
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
