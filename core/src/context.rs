//! Render view of the keyboard.
//!
//! `KeyboardContext` is a plain data container the host reads after each
//! event to draw the keyboard: the text with its caret, and one `KeyView`
//! per distinct grid cell. No callbacks, no traits; it is rebuilt from the
//! composition state and the active bindings, never patched.

use crate::composition::{CompositionState, ShiftLevel};
use crate::input_buffer;
use crate::layout::{CellKind, LayoutPage, ScriptLayout, SpecialKey};
use crate::resolver::ActiveBindings;

/// How one grid cell should be drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyView {
    /// Grid cell name, also the grid area name
    pub cell: String,
    /// Text shown on the key (empty when disabled)
    pub label: String,
    /// Whether tapping the key does anything
    pub enabled: bool,
    /// Pointer currently down on this key
    pub pressed: bool,
    /// Reserved key, if this is one
    pub special: Option<SpecialKey>,
    /// Glyph keys enlarge while pressed
    pub zoomable: bool,
    /// Special keys flash while pressed
    pub flash: bool,
}

/// Everything the host needs to draw the keyboard and the text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyboardContext {
    pub text: String,
    /// Caret position in chars
    pub caret_pos: usize,
    pub shift: ShiftLevel,
    pub page: String,
    pub keys: Vec<KeyView>,
    /// Grid rows as space-separated cell names (CSS `grid-template-areas`)
    pub grid_areas: Vec<String>,
    pub rows: usize,
    pub columns: usize,
}

impl KeyboardContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the view for `page` from a snapshot and its bindings.
    pub fn build(
        layout: &ScriptLayout,
        page: &LayoutPage,
        state: &CompositionState,
        bindings: &ActiveBindings,
        pressed: Option<&str>,
        show_context: bool,
    ) -> Self {
        let keys = page
            .cells()
            .iter()
            .map(|cell| {
                let is_pressed = pressed == Some(cell.name.as_str());
                match &cell.kind {
                    CellKind::Special(key) => KeyView {
                        cell: cell.name.clone(),
                        label: layout.special_label(*key, state.shift()),
                        enabled: true,
                        pressed: is_pressed,
                        special: Some(*key),
                        zoomable: false,
                        flash: true,
                    },
                    CellKind::Glyph { .. } => {
                        let binding = bindings.get(&cell.name);
                        let label = match binding {
                            Some(b) if show_context => b.label(),
                            Some(b) => b.bare_label(),
                            None => String::new(),
                        };
                        KeyView {
                            cell: cell.name.clone(),
                            label,
                            enabled: binding.is_some(),
                            pressed: is_pressed,
                            special: None,
                            zoomable: true,
                            flash: false,
                        }
                    }
                }
            })
            .collect();

        let grid = page.grid();
        Self {
            text: state.text().to_string(),
            caret_pos: state.caret_pos(),
            shift: state.shift(),
            page: page.name().to_string(),
            keys,
            grid_areas: grid.rows().iter().map(|row| row.join(" ")).collect(),
            rows: grid.row_count(),
            columns: grid.column_count(),
        }
    }

    pub fn key(&self, cell: &str) -> Option<&KeyView> {
        self.keys.iter().find(|key| key.cell == cell)
    }

    /// Label of a cell, empty if unknown or disabled.
    pub fn label(&self, cell: &str) -> &str {
        self.key(cell).map(|key| key.label.as_str()).unwrap_or("")
    }

    /// The text with `marker` spliced in at the caret.
    pub fn text_with_caret(&self, marker: &str) -> String {
        let (pre, post) = input_buffer::split_at_caret(&self.text, self.caret_pos);
        format!("{}{}{}", pre, marker, post)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
