//! Contextual key resolution.
//!
//! For the active page and the text before the caret, the resolver decides
//! what each glyph cell on the grid will insert. A key class holds an
//! ordered list of context rules; the first rule whose pattern matches a
//! suffix ending at the caret wins, and the winning rule's glyph for the
//! current shift level (or level 0) becomes the cell's binding.
//!
//! Resolution is a pure function of `(prefix, shift, page)`.

use ahash::AHashMap;

use crate::composition::{CompositionState, ShiftLevel};
use crate::input_buffer;
use crate::layout::{CellKind, LayoutPage};

/// What one glyph cell does right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBinding {
    /// Grid cell name (e.g. `vowel2`)
    pub cell: String,
    /// Key class the cell belongs to
    pub class: String,
    /// Slot within the key class
    pub slot: usize,
    /// Index of the winning rule in the class's rule list
    pub rule: usize,
    /// Suffix of the pre-caret text matched by the winning rule
    pub context: String,
    /// Text to insert when the key fires (may contain erase sentinels)
    pub glyph: String,
}

impl KeyBinding {
    /// Preview of the matched context after the glyph is applied.
    ///
    /// This is what the key shows: a vowel sign after `ᬓ` is labelled with
    /// the combined cluster rather than the bare sign.
    pub fn label(&self) -> String {
        let caret = input_buffer::char_len(&self.context);
        input_buffer::insert(&self.context, caret, &self.glyph).0
    }

    /// Label without the context, sentinels stripped.
    pub fn bare_label(&self) -> String {
        self.glyph
            .chars()
            .filter(|c| *c != input_buffer::ERASE_PREVIOUS && *c != input_buffer::ERASE_NEXT)
            .collect()
    }
}

/// Bindings for every glyph cell on a page.
///
/// Cells with no matching rule, an unknown key class, or no glyph for their
/// slot are absent and render disabled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveBindings {
    page: String,
    shift: ShiftLevel,
    bindings: AHashMap<String, KeyBinding>,
}

impl ActiveBindings {
    pub fn page(&self) -> &str {
        &self.page
    }

    pub fn shift(&self) -> ShiftLevel {
        self.shift
    }

    /// Binding for a grid cell, if it is active.
    pub fn get(&self, cell: &str) -> Option<&KeyBinding> {
        self.bindings.get(cell)
    }

    pub fn is_enabled(&self, cell: &str) -> bool {
        self.bindings.contains_key(cell)
    }

    /// Number of active bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Active bindings sorted by cell name.
    pub fn iter_sorted(&self) -> Vec<&KeyBinding> {
        let mut bindings: Vec<&KeyBinding> = self.bindings.values().collect();
        bindings.sort_by(|a, b| a.cell.cmp(&b.cell));
        bindings
    }
}

/// Resolve one glyph cell of `page` against `prefix`.
pub fn resolve_cell(page: &LayoutPage, cell: &str, prefix: &str, shift: ShiftLevel) -> Option<KeyBinding> {
    let key_cell = page.cell(cell)?;
    let CellKind::Glyph { class, slot } = &key_cell.kind else {
        return None;
    };
    let rules = page.keys().rules(class)?;

    // First matching rule wins, even if it has no glyph for this slot.
    let (index, rule, context) = rules
        .iter()
        .enumerate()
        .find_map(|(index, rule)| rule.matches(prefix).map(|context| (index, rule, context)))?;
    let glyph = rule.glyph(shift, *slot)?;

    Some(KeyBinding {
        cell: key_cell.name.clone(),
        class: class.clone(),
        slot: *slot,
        rule: index,
        context: context.to_string(),
        glyph: glyph.to_string(),
    })
}

/// Resolve every glyph cell of `page` against `prefix`.
pub fn resolve(page: &LayoutPage, prefix: &str, shift: ShiftLevel) -> ActiveBindings {
    let bindings: AHashMap<String, KeyBinding> = page
        .cells()
        .iter()
        .filter_map(|cell| resolve_cell(page, &cell.name, prefix, shift))
        .map(|binding| (binding.cell.clone(), binding))
        .collect();

    tracing::trace!(
        page = page.name(),
        shift = shift.index(),
        active = bindings.len(),
        "resolved key bindings"
    );

    ActiveBindings {
        page: page.name().to_string(),
        shift,
        bindings,
    }
}

/// Resolve against a composition snapshot.
pub fn resolve_state(page: &LayoutPage, state: &CompositionState) -> ActiveBindings {
    resolve(page, state.prefix(), state.shift())
}
