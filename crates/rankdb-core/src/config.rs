//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (nested keys use a double underscore, e.g. `APP_INDEX__DIM=384`).
//! Provides typed [`Settings`] with defaults for every key, plus helpers to
//! expand `~` and `${VAR}` and to resolve relative paths against a base dir.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?;
        Ok(config)
    }

    /// Build a config from an inline TOML document layered over the defaults.
    pub fn from_toml_str(toml: &str) -> Self {
        let figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::string(toml));
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Extract and validate the typed settings.
    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub index: IndexSettings,
    pub scoring: ScoringSettings,
    pub metadata: MetadataSettings,
    pub data: DataSettings,
    pub embed: EmbedSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.index.dim == 0 {
            return Err(Error::InvalidConfig("index.dim must be positive".into()));
        }
        if self.index.overfetch == 0 {
            return Err(Error::InvalidConfig("index.overfetch must be positive".into()));
        }
        let s = &self.scoring;
        if !(s.vector_weight >= 0.0 && s.keyword_weight >= 0.0) {
            return Err(Error::InvalidConfig("scoring weights must be non-negative".into()));
        }
        if s.keyword_cap == 0 {
            return Err(Error::InvalidConfig("scoring.keyword_cap must be positive".into()));
        }
        if self.data.extensions.is_empty() {
            return Err(Error::InvalidConfig("data.extensions must not be empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IndexSettings {
    pub dim: usize,
    /// Snapshot base path; artifacts are written next to it with fixed suffixes.
    pub base_path: String,
    /// Raw candidates requested per wanted result.
    pub overfetch: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self { dim: 768, base_path: "data/index/rankdb".to_string(), overfetch: 10 }
    }
}

/// How the keyword pre-filter treats candidates without any keyword hit.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PrefilterMode {
    /// Keep the filtered set only when every raw candidate matched; otherwise
    /// score the whole raw set.
    #[default]
    Legacy,
    /// Keep the filtered set whenever it is non-empty.
    PreferMatches,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringSettings {
    pub vector_weight: f32,
    pub keyword_weight: f32,
    /// Keyword occurrences at which the keyword score saturates at 1.0.
    pub keyword_cap: usize,
    pub prefilter: PrefilterMode,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self { vector_weight: 0.7, keyword_weight: 0.3, keyword_cap: 10, prefilter: PrefilterMode::Legacy }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MetadataSettings {
    pub path: String,
    /// JSON list of saved document identifiers.
    pub saved_path: String,
}

impl Default for MetadataSettings {
    fn default() -> Self {
        Self { path: "data/resume_info.json".to_string(), saved_path: "data/saved_candidates.json".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DataSettings {
    pub documents_dir: String,
    pub extensions: Vec<String>,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            documents_dir: "resumes".to_string(),
            extensions: vec!["pdf".to_string(), "docx".to_string(), "txt".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbedSettings {
    /// Maximum cached embeddings; 0 keeps every entry.
    pub cache_capacity: usize,
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
