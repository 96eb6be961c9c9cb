use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Balinese keyboard configuration that extends the base `Config` from core.
///
/// This configuration includes:
/// - All generic options from `aksara_core::Config` (flattened via serde)
/// - An optional layout file replacing the built-in Balinese layout
///
/// # Example
///
/// ```rust
/// use libbali::BaliConfig;
///
/// let config = BaliConfig::default();
/// let base_config = config.into_base();
/// assert_eq!(base_config.initial_page, "letters");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BaliConfig {
    /// Base configuration fields (caret movement, shift behaviour, labels)
    #[serde(flatten)]
    pub base: aksara_core::Config,

    /// TOML or JSON layout to use instead of the built-in one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout_path: Option<PathBuf>,
}

impl BaliConfig {
    /// Convert into the base config for `KeyboardController::mount()`
    pub fn into_base(self) -> aksara_core::Config {
        self.base
    }

    /// Get a reference to the base config
    pub fn base(&self) -> &aksara_core::Config {
        &self.base
    }

    /// Get a mutable reference to the base config
    pub fn base_mut(&mut self) -> &mut aksara_core::Config {
        &mut self.base
    }

    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aksara_core::CaretMovement;

    #[test]
    fn test_flattened_fields() {
        let config = BaliConfig::from_toml_str(
            r#"
caret_movement = "codepoint"
momentary_shift = false
layout_path = "my-layout.toml"
"#,
        )
        .unwrap();
        assert_eq!(config.base().caret_movement, CaretMovement::Codepoint);
        assert!(!config.base().momentary_shift);
        assert_eq!(config.base().initial_page, "letters");
        assert_eq!(config.layout_path, Some(PathBuf::from("my-layout.toml")));
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(BaliConfig::from_toml_str("").unwrap(), BaliConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bali.toml");
        let mut config = BaliConfig::default();
        config.base_mut().show_context_in_labels = false;
        config.save_toml(&path).unwrap();
        let loaded = BaliConfig::load_toml(&path).unwrap();
        assert_eq!(loaded, config);
        assert!(!loaded.into_base().show_context_in_labels);
    }
}
