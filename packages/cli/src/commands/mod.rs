pub mod compile;
pub mod init;
pub mod validate;

pub use compile::{compile, CompileArgs};
pub use init::{init, InitArgs};
pub use validate::{validate, ValidateArgs};

use crate::config::DEFAULT_CONFIG_NAME;
use anyhow::{Context, Result};
use quire_editor::{json, EditorState, KeyGenerator};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Read and import one JSON document
pub fn load_document(path: &Path) -> Result<EditorState> {
    let source = fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))?;
    let mut keys = KeyGenerator::new();
    let state = json::from_json_str(&source, &mut keys)?;
    tracing::debug!(path = %path.display(), nodes = state.len(), "imported document");
    Ok(state)
}

/// Every `.json` document under `dir`, sorted by path
pub fn find_json_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().and_then(|s| s.to_str()) == Some("json"))
        .filter(|path| path.file_name().and_then(|s| s.to_str()) != Some(DEFAULT_CONFIG_NAME))
        .collect();
    files.sort();
    files
}
