//! Keyboard controller.
//!
//! The `KeyboardController` ties the pieces together. It owns the current
//! [`CompositionState`] snapshot, the normalizer and its composition sink,
//! and the derived bindings and render view. Each event is normalized into a
//! keystroke, applied to produce a new snapshot, and the bindings and view
//! are recomputed before the host observer is told about the new text.
//!
//! State machine: `{page} x {Shift0, Shift1}`. Shift is momentary: it drops
//! back to level 0 after any inserted keystroke unless
//! `Config::momentary_shift` is off.

use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::composition::{CompositionState, ShiftLevel};
use crate::context::KeyboardContext;
use crate::input_buffer::Direction;
use crate::layout::{LayoutPage, ScriptLayout};
use crate::normalizer::{
    ComposerEvent, CompositionSink, InputNormalizer, Keystroke, Normalized, PhysicalKeyEvent,
    PointerPhase, VirtualKeyEvent,
};
use crate::resolver::{self, ActiveBindings};
use crate::{CaretMovement, Config};

/// Receives the text after every state-affecting operation.
pub trait TextObserver {
    fn on_text_change(&mut self, text: &str, caret_pos: usize);
}

impl<F: FnMut(&str, usize)> TextObserver for F {
    fn on_text_change(&mut self, text: &str, caret_pos: usize) {
        self(text, caret_pos)
    }
}

/// Result of handling an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyResult {
    /// The keyboard consumed the event (host should suppress its default)
    Handled,
    /// The event went to the composition sink; its commit will follow
    Forwarded,
    /// Not handled; pass through to the host
    NotHandled,
}

/// On-screen keyboard controller for one mounted keyboard.
pub struct KeyboardController {
    layout: Arc<ScriptLayout>,
    config: Config,
    state: CompositionState,
    bindings: ActiveBindings,
    context: KeyboardContext,
    normalizer: InputNormalizer,
    observer: Option<Box<dyn TextObserver>>,
    pressed: Option<String>,
}

impl KeyboardController {
    /// Mount a keyboard on host text.
    ///
    /// Fails only if the configured initial page is not in the layout.
    pub fn mount(layout: Arc<ScriptLayout>, config: Config, text: &str, caret_pos: usize) -> Result<Self> {
        if layout.page(&config.initial_page).is_none() {
            return Err(anyhow!(
                "layout '{}' has no page '{}'",
                layout.script(),
                config.initial_page
            ));
        }
        let state = CompositionState::new(text, caret_pos, config.initial_page.clone());
        tracing::debug!(
            script = layout.script(),
            page = state.page(),
            caret = state.caret_pos(),
            "keyboard mounted"
        );

        let mut controller = Self {
            layout,
            config,
            state,
            bindings: ActiveBindings::default(),
            context: KeyboardContext::new(),
            normalizer: InputNormalizer::default(),
            observer: None,
            pressed: None,
        };
        controller.refresh();
        Ok(controller)
    }

    /// Register the host's text observer.
    pub fn with_observer(mut self, observer: impl TextObserver + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Attach the hidden composition surface for physical keys.
    pub fn with_sink(mut self, sink: Box<dyn CompositionSink>) -> Self {
        self.normalizer = InputNormalizer::new(sink);
        self
    }

    pub fn state(&self) -> &CompositionState {
        &self.state
    }

    pub fn bindings(&self) -> &ActiveBindings {
        &self.bindings
    }

    /// Render view for the host.
    pub fn context(&self) -> &KeyboardContext {
        &self.context
    }

    pub fn layout(&self) -> &ScriptLayout {
        &self.layout
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn active_page(&self) -> Option<&LayoutPage> {
        self.layout.page(self.state.page())
    }

    // ========== Event entry points ==========

    /// Handle a physical key event.
    pub fn handle_physical(&mut self, event: &PhysicalKeyEvent) -> KeyResult {
        let normalized = self.normalizer.physical(event);
        self.dispatch(normalized)
    }

    /// Handle output from the composition sink.
    pub fn handle_composer(&mut self, event: &ComposerEvent) -> KeyResult {
        let normalized = self.normalizer.composer(event);
        self.dispatch(normalized)
    }

    /// Handle pointer activity on an on-screen key.
    pub fn handle_virtual(&mut self, event: &VirtualKeyEvent) -> KeyResult {
        match event.phase {
            PointerPhase::Down => {
                self.set_pressed(Some(event.cell.clone()));
                KeyResult::Handled
            }
            PointerPhase::Up | PointerPhase::Leave => {
                self.set_pressed(None);
                KeyResult::Handled
            }
            PointerPhase::Click => self.tap(&event.cell),
        }
    }

    /// Fire an on-screen key cell.
    pub fn tap(&mut self, cell: &str) -> KeyResult {
        let normalized = {
            let Some(key_cell) = self.active_page().and_then(|page| page.cell(cell)) else {
                tracing::debug!(cell, "tap on unknown cell");
                return KeyResult::NotHandled;
            };
            let key_cell = key_cell.clone();
            let binding = self.bindings.get(cell).cloned();
            self.normalizer.virtual_key(&key_cell, binding.as_ref())
        };
        self.dispatch(normalized)
    }

    fn dispatch(&mut self, normalized: Normalized) -> KeyResult {
        match normalized {
            Normalized::Keystroke(keystroke) => self.apply(keystroke),
            Normalized::Forwarded => KeyResult::Forwarded,
            Normalized::Pending | Normalized::Ignored => KeyResult::Handled,
            Normalized::PassThrough => KeyResult::NotHandled,
        }
    }

    /// Apply a logical keystroke.
    pub fn apply(&mut self, keystroke: Keystroke) -> KeyResult {
        tracing::debug!(?keystroke, "keystroke");
        let next = match keystroke {
            Keystroke::Insert(input) => {
                let next = self.state.with_insert(&input);
                if self.config.momentary_shift {
                    next.with_shift(ShiftLevel::Base)
                } else {
                    next
                }
            }
            Keystroke::Caret(direction) => self.moved(direction),
            Keystroke::ShiftDown => self.state.with_shift(ShiftLevel::Shifted),
            Keystroke::ShiftUp => self.state.with_shift(ShiftLevel::Base),
            Keystroke::ToggleShift => self.state.with_shift(self.state.shift().toggled()),
            Keystroke::SwitchPage(page) => {
                if self.layout.page(&page).is_none() {
                    tracing::debug!(page = %page, "layout has no such page");
                    return KeyResult::NotHandled;
                }
                self.state.with_page(page)
            }
        };
        self.transition(next);
        KeyResult::Handled
    }

    fn moved(&self, direction: Direction) -> CompositionState {
        match self.config.caret_movement {
            CaretMovement::Cluster => self.state.with_cluster_move(direction),
            CaretMovement::Codepoint => self.state.with_caret_move(direction),
        }
    }

    // ========== Direct state changes ==========

    /// Toggle the shift level (on-screen shift key).
    pub fn toggle_shift(&mut self) -> KeyResult {
        self.apply(Keystroke::ToggleShift)
    }

    pub fn set_shift(&mut self, shift: ShiftLevel) {
        let next = self.state.with_shift(shift);
        self.transition(next);
    }

    /// Switch to a named page; unknown pages are ignored.
    pub fn switch_page(&mut self, page: &str) -> KeyResult {
        self.apply(Keystroke::SwitchPage(page.to_string()))
    }

    /// Caret position reported by the host; `None` means the host could not
    /// determine it and the current caret is kept.
    pub fn set_caret(&mut self, caret_pos: Option<usize>) {
        let Some(caret_pos) = caret_pos else {
            tracing::debug!("caret detection failed, keeping caret");
            return;
        };
        let next = self.state.with_caret(caret_pos);
        self.transition(next);
    }

    /// Replace the text after an edit made outside the keyboard.
    pub fn set_text(&mut self, text: &str, caret_pos: usize) {
        let next = self.state.with_text(text, caret_pos);
        self.transition(next);
    }

    /// Unmount: release the composition sink and hand back the final state.
    pub fn detach(mut self) -> CompositionState {
        self.normalizer.detach();
        tracing::debug!(caret = self.state.caret_pos(), "keyboard detached");
        self.state
    }

    // ========== Internals ==========

    fn set_pressed(&mut self, cell: Option<String>) {
        self.pressed = cell;
        self.refresh();
    }

    fn transition(&mut self, next: CompositionState) {
        debug_assert!(next.is_consistent());
        self.state = next;
        self.refresh();
        if let Some(observer) = self.observer.as_mut() {
            observer.on_text_change(self.state.text(), self.state.caret_pos());
        }
    }

    /// Recompute bindings and the render view from the current snapshot.
    fn refresh(&mut self) {
        let Some(page) = self.layout.page(self.state.page()) else {
            self.bindings = ActiveBindings::default();
            self.context.clear();
            return;
        };
        self.bindings = resolver::resolve_state(page, &self.state);
        self.context = KeyboardContext::build(
            &self.layout,
            page,
            &self.state,
            &self.bindings,
            self.pressed.as_deref(),
            self.config.show_context_in_labels,
        );
    }
}
