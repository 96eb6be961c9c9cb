//! aksara-core
//!
//! Script-agnostic engine for contextual on-screen keyboards, shared by
//! script crates (libbali).
//!
//! A keyboard is described by a [`ScriptLayout`]: named pages, each a grid
//! of key cells plus a table of key classes whose glyphs depend on the text
//! before the caret. The engine keeps an immutable [`CompositionState`],
//! resolves every key against it, and folds physical, on-screen and IME
//! input into one keystroke stream.
//!
//! Public API:
//! - `ScriptLayout` / `LayoutPage` - Layout data, loaded from TOML or JSON
//! - `TextBuffer` - Caret-aware text editing with erase sentinels
//! - `CompositionState` - Immutable snapshot of text, caret, shift and page
//! - `resolver` - Context rule matching for the active page
//! - `InputNormalizer` - Physical / virtual / composed input to keystrokes
//! - `KeyboardController` - The mounted keyboard
//! - `KeyboardContext` - Render view for the host
//! - `Config` - Behaviour options
use serde::{Deserialize, Serialize};

pub mod input_buffer;
pub use input_buffer::{Direction, TextBuffer, ERASE_NEXT, ERASE_PREVIOUS};

pub mod layout;
pub use layout::{
    CellKind, ContextPattern, ContextRule, Grid, KeyCell, KeyTable, LayoutIssue, LayoutPage,
    ScriptLayout, SpecialKey,
};

pub mod composition;
pub use composition::{CompositionState, ShiftLevel};

pub mod resolver;
pub use resolver::{ActiveBindings, KeyBinding};

pub mod normalizer;
pub use normalizer::{
    ComposerEvent, CompositionSink, InputNormalizer, Key, KeyState, Keystroke, Modifiers,
    Normalized, NullSink, PhysicalKeyEvent, PointerPhase, VirtualKeyEvent,
};

pub mod context;
pub use context::{KeyView, KeyboardContext};

pub mod controller;
pub use controller::{KeyResult, KeyboardController, TextObserver};

/// How the arrow keys move the caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaretMovement {
    /// Skip over combining marks and joined conjuncts
    #[default]
    Cluster,
    /// One code point per keystroke
    Codepoint,
}

/// Generic configuration for the keyboard engine.
///
/// Script crates flatten this into their own config (see `BaliConfig`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Arrow key granularity
    pub caret_movement: CaretMovement,

    /// Drop back to level 0 after any inserted keystroke
    pub momentary_shift: bool,

    /// Page shown on mount
    pub initial_page: String,

    /// Label glyph keys with the matched context plus the glyph
    /// (e.g. `ᬓᬶ` instead of the bare `ᬶ`)
    pub show_context_in_labels: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            caret_movement: CaretMovement::Cluster,
            momentary_shift: true,
            initial_page: "letters".to_string(),
            show_context_in_labels: true,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<std::path::Path>>(
        path: P,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize configuration to TOML string.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Utility helpers.
pub mod utils {
    /// Normalize host text to NFC.
    ///
    /// Balinese has canonical compositions (e.g. `ᬅ` + `ᬵ` is `ᬆ`); layouts
    /// are written in composed form, so matching runs against NFC text.
    pub fn normalize(s: &str) -> String {
        use unicode_normalization::UnicodeNormalization;
        s.nfc().collect::<String>()
    }
}
