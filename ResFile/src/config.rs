//! Filter configuration
//!
//! Content under `filter/<tag>/` only applies to the game or platform named by
//! `<tag>`. [`FilterInfo`] lists the tags that apply to the running
//! configuration, plus the hints used to recognise nested archives.
//!
//! # Example
//!
//! ```
//! use resfile::FilterInfo;
//!
//! let info = FilterInfo::from_toml_str(r#"
//!     game_type_filters = ["doom.id.doom2", "doom.doom2"]
//!     embeddings = ["maps/extra.pk3"]
//! "#)?;
//! assert_eq!(info.game_type_filters.len(), 2);
//! assert_eq!(info.nested_extensions, vec!["wad".to_string()]);
//! # Ok::<(), resfile::Error>(())
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Filter rules and embedded-archive hints applied when an archive is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterInfo {
    /// Dotted filter rules in declaration order, e.g. `"doom.id.doom2"`.
    pub game_type_filters: Vec<String>,
    /// Entry names that are always treated as embedded archives.
    pub embeddings: Vec<String>,
    /// Extensions (without the dot) of nested container files.
    pub nested_extensions: Vec<String>,
}

impl Default for FilterInfo {
    fn default() -> Self {
        Self {
            game_type_filters: Vec::new(),
            embeddings: Vec::new(),
            nested_extensions: vec!["wad".to_string()],
        }
    }
}

impl FilterInfo {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Append a filter rule.
    #[must_use]
    pub fn with_filter(mut self, rule: impl Into<String>) -> Self {
        self.game_type_filters.push(rule.into());
        self
    }

    /// Append an explicit embedded-archive name.
    #[must_use]
    pub fn with_embedding(mut self, name: impl Into<String>) -> Self {
        self.embeddings.push(name.into());
        self
    }

    /// Replace the nested container extensions.
    #[must_use]
    pub fn with_nested_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.nested_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let info = FilterInfo::new();
        assert!(info.game_type_filters.is_empty());
        assert!(info.embeddings.is_empty());
        assert_eq!(info.nested_extensions, vec!["wad".to_string()]);
    }

    #[test]
    fn test_builder() {
        let info = FilterInfo::new()
            .with_filter("doom.doom2")
            .with_embedding("extra.wad")
            .with_nested_extensions(["wad", "pk3"]);

        assert_eq!(info.game_type_filters, vec!["doom.doom2".to_string()]);
        assert_eq!(info.embeddings, vec!["extra.wad".to_string()]);
        assert_eq!(info.nested_extensions, vec!["wad".to_string(), "pk3".to_string()]);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let info = FilterInfo::from_toml_str("game_type_filters = [\"heretic\"]").unwrap();
        assert_eq!(info.game_type_filters, vec!["heretic".to_string()]);
        assert_eq!(info.nested_extensions, vec!["wad".to_string()]);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = FilterInfo::from_toml_str("game_type_filters = 3").unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filters.toml");
        std::fs::write(&path, "embeddings = [\"maps/a.wad\"]\n").unwrap();

        let info = FilterInfo::load(&path).unwrap();
        assert_eq!(info.embeddings, vec!["maps/a.wad".to_string()]);
    }
}
