use serde::{Deserialize, Serialize};

pub const DEFAULT_TITLE: &str = "Document";

/// Options for HTML compilation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    /// One block per line, nested blocks indented
    pub pretty: bool,
    /// Indentation string
    pub indent: String,
    /// Wrap the blocks in a full HTML page
    pub standalone: bool,
    /// Page title, only used when standalone; empty falls back to
    /// [`DEFAULT_TITLE`]
    pub title: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            pretty: true,
            indent: "  ".to_string(),
            standalone: false,
            title: String::new(),
        }
    }
}

impl CompileOptions {
    pub fn standalone(mut self, title: impl Into<String>) -> Self {
        self.standalone = true;
        self.title = title.into();
        self
    }

    /// Title for the page shell
    pub fn page_title(&self) -> &str {
        if self.title.is_empty() {
            DEFAULT_TITLE
        } else {
            &self.title
        }
    }

    pub fn compact(mut self) -> Self {
        self.pretty = false;
        self
    }
}

/// Output buffer with block-level indentation
pub(crate) struct Context {
    pub(crate) options: CompileOptions,
    depth: usize,
    buffer: String,
}

impl Context {
    pub(crate) fn new(options: CompileOptions) -> Self {
        Self {
            options,
            depth: 0,
            buffer: String::new(),
        }
    }

    pub(crate) fn add(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    pub(crate) fn add_line(&mut self, text: &str) {
        self.start_line();
        self.add(text);
        self.end_line();
    }

    /// Indent the next line; pair with [`Context::end_line`]
    pub(crate) fn start_line(&mut self) {
        if self.options.pretty {
            for _ in 0..self.depth {
                self.buffer.push_str(&self.options.indent);
            }
        }
    }

    pub(crate) fn end_line(&mut self) {
        if self.options.pretty {
            self.buffer.push('\n');
        }
    }

    pub(crate) fn indent(&mut self) {
        self.depth += 1;
    }

    pub(crate) fn dedent(&mut self) {
        if self.depth > 0 {
            self.depth -= 1;
        }
    }

    pub(crate) fn get_output(self) -> String {
        self.buffer
    }
}
