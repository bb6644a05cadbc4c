//! Project configuration loaded from `dispatches.toml`.
//!
//! Every key is optional. Stock defaults are serialized to a TOML table and
//! the user's file is merged on top of it key by key, so a config file only
//! needs the values it changes:
//!
//! ```toml
//! [site]
//! root_url = "https://example.org"
//! ```
//!
//! Unknown keys are rejected to catch typos early. Run `dispatches gen-config`
//! for a fully commented stock file.

use crate::slug::Slug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "dispatches.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Directory holding one subdirectory per article.
    pub content_root: PathBuf,
    /// Manifest file name, written inside `content_root`.
    pub manifest_file: String,
    /// Directory with template overrides. Stock templates are used for
    /// any file it does not contain.
    pub templates_dir: Option<PathBuf>,
    /// Article rendered when a request names none.
    pub default_slug: String,
    pub site: SiteSettings,
    pub server: ServerConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            content_root: PathBuf::from("src/articles"),
            manifest_file: "articles.js".to_string(),
            templates_dir: None,
            default_slug: "001-the-brief".to_string(),
            site: SiteSettings::default(),
            server: ServerConfig::default(),
        }
    }
}

impl SiteConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.site.root_url.starts_with("http://") || self.site.root_url.starts_with("https://"))
        {
            return Err(ConfigError::Validation(format!(
                "site.root_url must start with http:// or https://, got '{}'",
                self.site.root_url
            )));
        }
        let segment = self.site.articles_segment.trim_matches('/');
        if segment.is_empty() || segment.contains('/') {
            return Err(ConfigError::Validation(
                "site.articles_segment must be a single non-empty path segment".into(),
            ));
        }
        if self.manifest_file.is_empty() || self.manifest_file.contains(['/', '\\']) {
            return Err(ConfigError::Validation(
                "manifest_file must be a plain file name".into(),
            ));
        }
        Slug::parse(&self.default_slug)
            .map_err(|e| ConfigError::Validation(format!("default_slug: {e}")))?;
        Ok(())
    }

    /// The validated default slug.
    pub fn default_slug(&self) -> Result<Slug, ConfigError> {
        Slug::parse(&self.default_slug)
            .map_err(|e| ConfigError::Validation(format!("default_slug: {e}")))
    }

    pub fn layout(&self) -> ContentLayout {
        ContentLayout {
            root: self.content_root.clone(),
            manifest_file: self.manifest_file.clone(),
        }
    }
}

/// Public URL settings used to derive permalinks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteSettings {
    pub root_url: String,
    pub articles_segment: String,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            root_url: "https://robbycowell.com".to_string(),
            articles_segment: "dispatches".to_string(),
        }
    }
}

impl SiteSettings {
    /// `<root_url>/<articles_segment>/<slug>`, the only way a permalink is made.
    pub fn permalink(&self, slug: &Slug) -> String {
        format!("{}{}", self.root_url.trim_end_matches('/'), self.article_path(slug))
    }

    /// Server-relative path of an article: `/<articles_segment>/<slug>`.
    pub fn article_path(&self, slug: &Slug) -> String {
        format!("/{}/{}", self.segment(), slug)
    }

    pub fn segment(&self) -> &str {
        self.articles_segment.trim_matches('/')
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Static files served for any path that is not an article route.
    pub public_dir: PathBuf,
    /// HTML shell with a `<!--$target-->` marker. Uses the stock shell when unset.
    pub shell: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            public_dir: PathBuf::from("public"),
            shell: None,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Where articles and the manifest live on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentLayout {
    pub root: PathBuf,
    pub manifest_file: String,
}

impl ContentLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            manifest_file: SiteConfig::default().manifest_file,
        }
    }

    pub fn article_dir(&self, slug: &Slug) -> PathBuf {
        self.root.join(slug.as_str())
    }

    pub fn markdown_path(&self, slug: &Slug) -> PathBuf {
        self.article_dir(slug).join(slug.markdown_file())
    }

    pub fn metadata_path(&self, slug: &Slug) -> PathBuf {
        self.article_dir(slug).join(slug.metadata_file())
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(&self.manifest_file)
    }
}

// =============================================================================
// dispatches.toml loading
// =============================================================================

/// `SiteConfig::default()` as a TOML table: the layer a `dispatches.toml`
/// is laid over.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Lay `overlay` over `base`. Tables such as `[site]` and `[server]` merge
/// per key, so a file setting only `server.port` keeps the stock host;
/// any other overlay value replaces the base value outright.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut table), toml::Value::Table(overrides)) => {
            for (key, value) in overrides {
                let merged = match table.remove(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => value,
                };
                table.insert(key, merged);
            }
            toml::Value::Table(table)
        }
        (_, replacement) => replacement,
    }
}

/// Raw contents of a config file, or `Ok(None)` when there is no file.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    Ok(Some(toml::from_str(&content)?))
}

/// Deserialize `base` with `overlay` (if any) laid over it, then validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(overlay) => merge_toml(base, overlay),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load `path` over the stock defaults. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    let overlay = load_raw_config(path)?;
    if overlay.is_none() {
        log::debug!("no config at {}, using defaults", path.display());
    }
    resolve_config(stock_defaults_value(), overlay)
}

/// Fully commented stock `dispatches.toml`, printed by `gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# Dispatches Configuration
# ========================
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

# Directory holding one subdirectory per article:
#   <content_root>/<slug>/<slug>.md
#   <content_root>/<slug>/<slug>-metadata.toml
content_root = "src/articles"

# Generated ES module mapping every slug to its content and metadata.
# Written inside content_root and overwritten on every scaffold.
manifest_file = "articles.js"

# Directory with template overrides:
#   article-metadata-template.toml   ($date, $slug, $permalink)
#   article-markdown-template.md     ($slug, $articleName, $title)
# Any file missing here falls back to the built-in template.
# templates_dir = "scripts/templates"

# Article pre-rendered when a request does not name one.
default_slug = "001-the-brief"

# ---------------------------------------------------------------------------
# Public URLs. Permalinks are always <root_url>/<articles_segment>/<slug>.
# ---------------------------------------------------------------------------
[site]
root_url = "https://robbycowell.com"
articles_segment = "dispatches"

# ---------------------------------------------------------------------------
# First-load server
# ---------------------------------------------------------------------------
[server]
host = "127.0.0.1"
port = 3000

# Static files (bundles, styles, images) served next to the rendered shell.
public_dir = "public"

# HTML shell containing the <!--$target--> marker. Omit for the built-in shell.
# shell = "public/tmp.html"
"##
}
