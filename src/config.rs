use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::review::DEFAULT_MAX_RETRIES;

const CONFIG_FILE: &str = ".pr-reviewer.toml";
const DEFAULT_KNOWLEDGE_ROOT: &str = ".knowledge";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Configuration loaded from `.pr-reviewer.toml`. Every field is optional;
/// the tool works with zero config as long as a token can be resolved.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub review: ReviewConfig,

    #[serde(default)]
    pub knowledge: KnowledgeConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitHubConfig {
    /// API token. When absent, `gh auth token` and then the GITHUB_TOKEN
    /// env var are consulted.
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewConfig {
    /// Attempt budget for each positional comment post
    pub max_retries: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KnowledgeConfig {
    /// Knowledge base directory, `.knowledge` by default
    pub root: Option<PathBuf>,
}

impl Config {
    /// Load `.pr-reviewer.toml` from the current directory, or defaults if
    /// the file doesn't exist.
    pub fn load() -> Result<Config, ConfigError> {
        let path = Path::new(CONFIG_FILE);
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load from a specific path (useful for testing).
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Resolve the GitHub token: config file value, then `gh auth token`,
    /// then the GITHUB_TOKEN env var.
    pub fn github_token(&self) -> Option<String> {
        self.github
            .token
            .clone()
            .or_else(gh_cli_token)
            .or_else(|| std::env::var("GITHUB_TOKEN").ok())
    }

    pub fn max_retries(&self) -> u32 {
        self.review.max_retries.unwrap_or(DEFAULT_MAX_RETRIES)
    }

    pub fn knowledge_root(&self) -> PathBuf {
        self.knowledge
            .root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_KNOWLEDGE_ROOT))
    }
}

/// Ask the `gh` CLI for its stored token. Best-effort: a missing binary or
/// logged-out state falls through to the next source.
fn gh_cli_token() -> Option<String> {
    let output = Command::new("gh").args(["auth", "token"]).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let token = String::from_utf8(output.stdout).ok()?;
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.github.token.is_none());
        assert_eq!(config.max_retries(), DEFAULT_MAX_RETRIES);
        assert_eq!(config.knowledge_root(), PathBuf::from(".knowledge"));
    }

    #[test]
    fn test_parse_config_toml() {
        let toml_str = r#"
[github]
token = "ghp_example"

[review]
max_retries = 3

[knowledge]
root = "notes"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.github.token.as_deref(), Some("ghp_example"));
        assert_eq!(config.max_retries(), 3);
        assert_eq!(config.knowledge_root(), PathBuf::from("notes"));
    }

    #[test]
    fn test_config_token_takes_precedence() {
        let config = Config {
            github: GitHubConfig {
                token: Some("from-config".to_string()),
            },
            ..Config::default()
        };
        assert_eq!(config.github_token().as_deref(), Some("from-config"));
    }
}
