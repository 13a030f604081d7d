use serde::{Deserialize, Serialize};

/// Editor configuration
///
/// Deserializes from camelCase JSON; every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    /// Name reported in logs, to tell several editors apart
    pub namespace: String,
    pub history: HistoryConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            namespace: "quire".to_string(),
            history: HistoryConfig::default(),
        }
    }
}

impl EditorConfig {
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_history(mut self, history: HistoryConfig) -> Self {
        self.history = history;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoryConfig {
    /// Maximum number of undo levels (0 = unlimited)
    pub max_levels: usize,
    /// Low-significance updates closer together than this share one entry
    pub coalesce_window_ms: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_levels: 100,
            coalesce_window_ms: 1000,
        }
    }
}
