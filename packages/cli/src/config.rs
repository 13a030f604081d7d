use quire_compiler_html::CompileOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_CONFIG_NAME: &str = "quire.config.json";

/// Quire configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directory holding the JSON documents
    #[serde(default = "default_src_dir")]
    pub src_dir: String,

    /// Where compiled HTML goes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<String>,

    /// HTML compiler options
    #[serde(default)]
    pub html: CompileOptions,
}

fn default_src_dir() -> String {
    "src".to_string()
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            tracing::debug!(path = %config_path.display(), "loaded config");
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Get absolute path to source directory
    pub fn get_src_dir(&self, cwd: &str) -> PathBuf {
        PathBuf::from(cwd).join(&self.src_dir)
    }

    /// Output directory, `override_dir` first, then the config, then `dist`
    pub fn get_out_dir(&self, cwd: &str, override_dir: Option<&str>) -> PathBuf {
        let dir = override_dir.or(self.out_dir.as_deref()).unwrap_or("dist");
        PathBuf::from(cwd).join(dir)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            src_dir: default_src_dir(),
            out_dir: None,
            html: CompileOptions::default(),
        }
    }
}
