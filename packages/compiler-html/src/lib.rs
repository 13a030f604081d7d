//! HTML export for Quire documents
//!
//! Lossy and display-only: HTML is never imported back.

mod compiler;
mod context;

pub use compiler::compile_to_html;
pub use context::{CompileOptions, DEFAULT_TITLE};

#[cfg(test)]
mod tests;
