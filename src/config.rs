//! Site configuration.
//!
//! An optional `make-index.toml` in the content root overrides the stock
//! defaults. The file is sparse: only the keys that differ need to be given,
//! and unknown keys are rejected to catch typos early.
//!
//! ```toml
//! [templates]
//! index = ".index.html"       # expanded into every directory
//! sitemap = ".sitemap.xml"    # head ~ body per directory ~ tail
//! newsfeed = ".newsfeed.rss"  # head ~ body per news item ~ tail
//!
//! [outputs]
//! index = "index.html"
//! sitemap = "sitemap.xml"
//! newsfeed = "newsfeed.rss"
//!
//! [conventions]
//! description_suffix = ".d"
//! directory_description = "index.d"
//! directory_content = "content.d"
//! news_suffix = ".news"
//! link_suffix = ".link"
//! icon_suffix = ".jpeg"
//! directory_icon = "dir"
//! file_icon = "file"
//! max_lines = 512             # lines copied from any one sidecar
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Name of the config file looked up in the content root.
pub const CONFIG_FILE: &str = "make-index.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Template file names, read from the content root.
    pub templates: TemplatesConfig,
    /// Generated file names.
    pub outputs: OutputsConfig,
    /// Sidecar naming conventions.
    pub conventions: ConventionsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplatesConfig {
    pub index: String,
    pub sitemap: String,
    pub newsfeed: String,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            index: ".index.html".to_string(),
            sitemap: ".sitemap.xml".to_string(),
            newsfeed: ".newsfeed.rss".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputsConfig {
    /// Written into every directory.
    pub index: String,
    /// Written once, in the content root.
    pub sitemap: String,
    /// Written once, in the content root.
    pub newsfeed: String,
}

impl Default for OutputsConfig {
    fn default() -> Self {
        Self {
            index: "index.html".to_string(),
            sitemap: "sitemap.xml".to_string(),
            newsfeed: "newsfeed.rss".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConventionsConfig {
    pub description_suffix: String,
    pub directory_description: String,
    pub directory_content: String,
    pub news_suffix: String,
    pub link_suffix: String,
    pub icon_suffix: String,
    pub directory_icon: String,
    pub file_icon: String,
    pub max_lines: usize,
}

impl Default for ConventionsConfig {
    fn default() -> Self {
        Self {
            description_suffix: ".d".to_string(),
            directory_description: "index.d".to_string(),
            directory_content: "content.d".to_string(),
            news_suffix: ".news".to_string(),
            link_suffix: ".link".to_string(),
            icon_suffix: ".jpeg".to_string(),
            directory_icon: "dir".to_string(),
            file_icon: "file".to_string(),
            max_lines: 512,
        }
    }
}

impl SiteConfig {
    /// Validate names and suffixes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let names = [
            ("templates.index", &self.templates.index),
            ("templates.sitemap", &self.templates.sitemap),
            ("templates.newsfeed", &self.templates.newsfeed),
            ("outputs.index", &self.outputs.index),
            ("outputs.sitemap", &self.outputs.sitemap),
            ("outputs.newsfeed", &self.outputs.newsfeed),
            ("conventions.directory_description", &self.conventions.directory_description),
            ("conventions.directory_content", &self.conventions.directory_content),
            ("conventions.directory_icon", &self.conventions.directory_icon),
            ("conventions.file_icon", &self.conventions.file_icon),
        ];
        for (key, value) in names {
            if value.is_empty() || value.contains(['/', '\\']) {
                return Err(ConfigError::Validation(format!(
                    "{key} must be a plain file name, got {value:?}"
                )));
            }
        }
        let suffixes = [
            ("conventions.description_suffix", &self.conventions.description_suffix),
            ("conventions.news_suffix", &self.conventions.news_suffix),
            ("conventions.link_suffix", &self.conventions.link_suffix),
            ("conventions.icon_suffix", &self.conventions.icon_suffix),
        ];
        for (key, value) in suffixes {
            if value.len() < 2 || !value.starts_with('.') || value.contains(['/', '\\']) {
                return Err(ConfigError::Validation(format!(
                    "{key} must look like \".ext\", got {value:?}"
                )));
            }
        }
        if self.conventions.max_lines == 0 {
            return Err(ConfigError::Validation(
                "conventions.max_lines must be at least 1".into(),
            ));
        }
        if self.templates.index == self.outputs.index {
            return Err(ConfigError::Validation(
                "templates.index and outputs.index must differ".into(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// The stock defaults as a TOML table, the base layer for user overrides.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(SiteConfig::default())?)
}

/// Lay `overlay` over `base`. A table present in both is merged key by key;
/// anything else in `overlay` replaces what `base` had.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    let mut merged = base;
    overlay_onto(&mut merged, overlay);
    merged
}

fn overlay_onto(target: &mut toml::Value, overlay: toml::Value) {
    match (target, overlay) {
        (toml::Value::Table(table), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match table.get_mut(&key) {
                    Some(existing) => overlay_onto(existing, value),
                    None => {
                        table.insert(key, value);
                    }
                }
            }
        }
        (target, overlay) => *target = overlay,
    }
}

/// The content root's `make-index.toml`, parsed but not yet checked against
/// [`SiteConfig`]. `None` when the root has no such file.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let content = match fs::read_to_string(root.join(CONFIG_FILE)) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(toml::from_str(&content)?))
}

/// Stock values with the user's overrides on top, as a checked [`SiteConfig`].
pub fn resolve_config(
    base: toml::Value,
    overrides: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let layered = match overrides {
        Some(overrides) => merge_toml(base, overrides),
        None => base,
    };
    let config = SiteConfig::deserialize(layered)?;
    config.validate()?;
    Ok(config)
}

/// The configuration in effect for the content root at `root`.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    resolve_config(stock_defaults_value()?, load_raw_config(root)?)
}

/// A fully commented stock `make-index.toml`, printed by `gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# make-index configuration
# ========================
# Place this file in the content root as make-index.toml.
# All settings are optional; the values below are the defaults.
# Unknown keys are an error.

# ---------------------------------------------------------------------------
# Templates, read from the content root. A missing template turns its output
# off. A template with two lines holding only "~" is split into head, body and
# tail; otherwise the whole text is the body.
# ---------------------------------------------------------------------------
[templates]
# Expanded into every directory.
index = ".index.html"
# Head once, body once per directory, tail once.
sitemap = ".sitemap.xml"
# Head once, body once per news item, tail once.
newsfeed = ".newsfeed.rss"

# ---------------------------------------------------------------------------
# Generated files
# ---------------------------------------------------------------------------
[outputs]
# Written into every directory, and never listed.
index = "index.html"
# Written in the content root.
sitemap = "sitemap.xml"
newsfeed = "newsfeed.rss"

# ---------------------------------------------------------------------------
# Sidecar conventions
# ---------------------------------------------------------------------------
[conventions]
# <file>.d describes <file>; an empty one (or one starting with a blank line)
# hides <file>. Anything named *.d or *.d.* is never listed.
description_suffix = ".d"
# Description of a directory, shown by its parent's @(filedesc).
directory_description = "index.d"
# Long description of a directory, shown by its own @(content).
directory_content = "content.d"
# <file>.news announces <file>: first line YYYY-MM-DD, second line the title.
news_suffix = ".news"
# <name>.link holds an href on its first line, used by @(filehref).
link_suffix = ".link"
# <file>.d<icon_suffix> is the icon of <file>; otherwise the generic
# directory_icon or file_icon at the site root is used.
icon_suffix = ".jpeg"
directory_icon = "dir"
file_icon = "file"
# Most lines copied from any one sidecar.
max_lines = 512
"##
}
