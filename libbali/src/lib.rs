//! libbali crate root
//!
//! This crate provides the Aksara Bali layout and a factory that mounts an
//! `aksara-core` keyboard controller on it.
//!
//! Public API exported here:
//! - `BaliConfig` from `config`
//! - `bali_layout` from `layout`
//! - `create_keyboard` / `create_keyboard_with_layout`

pub mod config;
pub mod layout;

// Re-export the engine types callers need alongside the factory.
pub use aksara_core::{
    ComposerEvent, CompositionSink, CompositionState, Config, Key, KeyResult, KeyView,
    KeyboardContext, KeyboardController, PhysicalKeyEvent, ScriptLayout, ShiftLevel, TextObserver,
    VirtualKeyEvent,
};

pub use config::BaliConfig;
pub use layout::{bali_layout, BALI_LAYOUT_TOML, HANACARAKA};

use std::sync::Arc;

use anyhow::{Context, Result};

/// Mount a Balinese keyboard on `text` with the caret at `caret_pos`.
///
/// Uses `config.layout_path` when set, otherwise the built-in layout.
pub fn create_keyboard(config: &BaliConfig, text: &str, caret_pos: usize) -> Result<KeyboardController> {
    let layout = match &config.layout_path {
        Some(path) => {
            let layout = ScriptLayout::load(path)
                .with_context(|| format!("loading keyboard layout {}", path.display()))?;
            tracing::info!(path = %path.display(), script = layout.script(), "loaded layout file");
            Arc::new(layout)
        }
        None => bali_layout()?,
    };
    create_keyboard_with_layout(layout, config, text, caret_pos)
}

/// Mount a keyboard on an already loaded layout.
pub fn create_keyboard_with_layout(
    layout: Arc<ScriptLayout>,
    config: &BaliConfig,
    text: &str,
    caret_pos: usize,
) -> Result<KeyboardController> {
    KeyboardController::mount(layout, config.base().clone(), text, caret_pos)
}
