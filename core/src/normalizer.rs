//! Input event normalization.
//!
//! Keystrokes reach the keyboard from three places: the physical keyboard,
//! taps on the on-screen keys, and text composed by the platform input
//! method. The `InputNormalizer` turns all three into one stream of
//! [`Keystroke`]s.
//!
//! Physical keys other than Shift and the editing keys are not interpreted:
//! complex-script composition cannot be derived from raw keycodes across
//! keyboard layouts, so those keys are handed to a [`CompositionSink`] (a
//! hidden input surface the platform IME attaches to) and only the text it
//! commits comes back as a keystroke.

use crate::input_buffer::{Direction, ERASE_NEXT, ERASE_PREVIOUS};
use crate::layout::{CellKind, KeyCell, SpecialKey};
use crate::resolver::KeyBinding;

/// Zero-width non-joiner.
pub const ZWNJ: &str = "\u{200C}";
/// Zero-width joiner.
pub const ZWJ: &str = "\u{200D}";

/// Physical key identity, named after DOM `KeyboardEvent.key` values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Shift,
    Backspace,
    Delete,
    Enter,
    ArrowLeft,
    ArrowRight,
    Meta,
    Control,
    Alt,
    /// A printable key, e.g. `"a"` or a dead-key result
    Character(String),
    /// Any other named key (`"Tab"`, `"Dead"`, `"Process"`, ...)
    Named(String),
}

impl Key {
    /// Parse a DOM key name.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Shift" => Key::Shift,
            "Backspace" => Key::Backspace,
            "Delete" => Key::Delete,
            "Enter" => Key::Enter,
            "ArrowLeft" => Key::ArrowLeft,
            "ArrowRight" => Key::ArrowRight,
            "Meta" => Key::Meta,
            "Control" => Key::Control,
            "Alt" => Key::Alt,
            _ if name.chars().count() == 1 => Key::Character(name.to_string()),
            _ => Key::Named(name.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Pressed,
    Released,
}

/// Modifier flags carried by a physical event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
    pub shift: bool,
}

/// A physical key event as delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalKeyEvent {
    pub key: Key,
    pub state: KeyState,
    pub modifiers: Modifiers,
    /// Set by the platform while an IME composition is in progress
    pub is_composing: bool,
    /// Auto-repeat of a key that is held down
    pub repeat: bool,
}

impl PhysicalKeyEvent {
    pub fn pressed(key: Key) -> Self {
        Self {
            key,
            state: KeyState::Pressed,
            modifiers: Modifiers::default(),
            is_composing: false,
            repeat: false,
        }
    }

    pub fn released(key: Key) -> Self {
        Self {
            state: KeyState::Released,
            ..Self::pressed(key)
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn composing(mut self) -> Self {
        self.is_composing = true;
        self
    }

    pub fn repeated(mut self) -> Self {
        self.repeat = true;
        self
    }

    /// Ctrl/Meta + C; left to the host so copying keeps working.
    fn is_copy_shortcut(&self) -> bool {
        (self.modifiers.ctrl || self.modifiers.meta)
            && matches!(&self.key, Key::Character(c) if c.eq_ignore_ascii_case("c"))
    }
}

/// Output of the platform input method's hidden composition surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposerEvent {
    /// Composition in progress; the text is provisional.
    Update(String),
    /// Composition settled; the text is final.
    Commit(String),
}

/// Pointer activity on an on-screen key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Up,
    Leave,
    /// Full click/tap; fires the key
    Click,
}

/// A pointer event on an on-screen key cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualKeyEvent {
    pub cell: String,
    pub phase: PointerPhase,
}

impl VirtualKeyEvent {
    pub fn click(cell: impl Into<String>) -> Self {
        Self {
            cell: cell.into(),
            phase: PointerPhase::Click,
        }
    }

    pub fn down(cell: impl Into<String>) -> Self {
        Self {
            cell: cell.into(),
            phase: PointerPhase::Down,
        }
    }

    pub fn up(cell: impl Into<String>) -> Self {
        Self {
            cell: cell.into(),
            phase: PointerPhase::Up,
        }
    }
}

/// A logical keystroke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keystroke {
    /// Text to insert at the caret; may contain erase sentinels
    Insert(String),
    /// Move the caret
    Caret(Direction),
    /// Physical Shift went down
    ShiftDown,
    /// Physical Shift went up
    ShiftUp,
    /// On-screen shift key
    ToggleShift,
    /// Switch to the named layout page
    SwitchPage(String),
}

/// What the normalizer made of an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    /// A keystroke for the controller
    Keystroke(Keystroke),
    /// Handed to the composition sink; wait for its commit
    Forwarded,
    /// Composition still pending; nothing to do yet
    Pending,
    /// Not ours: let the host handle it
    PassThrough,
    /// Recognized but inert (e.g. a disabled key)
    Ignored,
}

/// Hidden input surface the platform IME attaches to.
pub trait CompositionSink {
    /// Focus the surface and replay `event` into it.
    fn forward(&mut self, event: &PhysicalKeyEvent);

    /// Release the surface; no more events will be forwarded.
    fn detach(&mut self) {}
}

/// Sink for hosts without an input method; forwarded keys are dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl CompositionSink for NullSink {
    fn forward(&mut self, event: &PhysicalKeyEvent) {
        tracing::trace!(key = ?event.key, "no composition sink, dropping key");
    }
}

/// Keystroke for a special key.
pub fn special_keystroke(key: SpecialKey) -> Keystroke {
    match key {
        SpecialKey::Zwnj => Keystroke::Insert(ZWNJ.to_string()),
        SpecialKey::Zwj => Keystroke::Insert(ZWJ.to_string()),
        SpecialKey::Shift => Keystroke::ToggleShift,
        SpecialKey::Backspace => Keystroke::Insert(ERASE_PREVIOUS.to_string()),
        SpecialKey::Delete => Keystroke::Insert(ERASE_NEXT.to_string()),
        SpecialKey::Numbers => Keystroke::SwitchPage("numbers".to_string()),
        SpecialKey::Letters => Keystroke::SwitchPage("letters".to_string()),
        SpecialKey::Space => Keystroke::Insert(" ".to_string()),
        SpecialKey::Return => Keystroke::Insert("\n".to_string()),
        SpecialKey::ArrowLeft => Keystroke::Caret(Direction::Left),
        SpecialKey::ArrowRight => Keystroke::Caret(Direction::Right),
    }
}

/// Unifies physical, virtual and composed input.
pub struct InputNormalizer {
    sink: Box<dyn CompositionSink>,
    composing: bool,
}

impl InputNormalizer {
    pub fn new(sink: Box<dyn CompositionSink>) -> Self {
        Self {
            sink,
            composing: false,
        }
    }

    /// Whether the composition surface holds uncommitted text.
    pub fn is_composing(&self) -> bool {
        self.composing
    }

    /// Normalize a physical key event.
    pub fn physical(&mut self, event: &PhysicalKeyEvent) -> Normalized {
        if event.key == Key::Shift {
            // a held Shift is already down
            if event.repeat {
                return Normalized::Ignored;
            }
            return Normalized::Keystroke(match event.state {
                KeyState::Pressed => Keystroke::ShiftDown,
                KeyState::Released => Keystroke::ShiftUp,
            });
        }
        if event.state == KeyState::Released {
            return Normalized::PassThrough;
        }

        let composing = event.is_composing || self.composing;
        if !composing {
            let keystroke = match event.key {
                Key::Backspace => Some(Keystroke::Insert(ERASE_PREVIOUS.to_string())),
                Key::Delete => Some(Keystroke::Insert(ERASE_NEXT.to_string())),
                Key::Enter => Some(Keystroke::Insert("\n".to_string())),
                Key::ArrowLeft => Some(Keystroke::Caret(Direction::Left)),
                Key::ArrowRight => Some(Keystroke::Caret(Direction::Right)),
                _ => None,
            };
            if let Some(keystroke) = keystroke {
                return Normalized::Keystroke(keystroke);
            }
        }

        if matches!(event.key, Key::Meta | Key::Control | Key::Alt) || event.is_copy_shortcut() {
            return Normalized::PassThrough;
        }

        self.sink.forward(event);
        Normalized::Forwarded
    }

    /// Normalize output from the composition surface.
    ///
    /// Only commits become keystrokes; provisional text is held back.
    /// Committed text is NFC-normalized so it matches the layout's rules.
    pub fn composer(&mut self, event: &ComposerEvent) -> Normalized {
        match event {
            ComposerEvent::Update(text) => {
                // an empty update means the composition was cancelled
                self.composing = !text.is_empty();
                Normalized::Pending
            }
            ComposerEvent::Commit(text) => {
                self.composing = false;
                if text.is_empty() {
                    Normalized::Ignored
                } else {
                    Normalized::Keystroke(Keystroke::Insert(crate::utils::normalize(text)))
                }
            }
        }
    }

    /// Normalize a tap on an on-screen cell given its current binding.
    pub fn virtual_key(&mut self, cell: &KeyCell, binding: Option<&KeyBinding>) -> Normalized {
        match &cell.kind {
            CellKind::Special(key) => Normalized::Keystroke(special_keystroke(*key)),
            CellKind::Glyph { .. } => match binding {
                Some(binding) => Normalized::Keystroke(Keystroke::Insert(binding.glyph.clone())),
                None => Normalized::Ignored,
            },
        }
    }

    /// Detach the composition sink.
    pub fn detach(&mut self) {
        self.composing = false;
        self.sink.detach();
    }
}

impl Default for InputNormalizer {
    fn default() -> Self {
        Self::new(Box::new(NullSink))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::KeyTable;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default, Clone)]
    struct RecordingSink {
        forwarded: Rc<RefCell<Vec<PhysicalKeyEvent>>>,
        detached: Rc<RefCell<bool>>,
    }

    impl CompositionSink for RecordingSink {
        fn forward(&mut self, event: &PhysicalKeyEvent) {
            self.forwarded.borrow_mut().push(event.clone());
        }

        fn detach(&mut self) {
            *self.detached.borrow_mut() = true;
        }
    }

    fn normalizer() -> (InputNormalizer, RecordingSink) {
        let sink = RecordingSink::default();
        (InputNormalizer::new(Box::new(sink.clone())), sink)
    }

    #[test]
    fn test_key_from_name() {
        assert_eq!(Key::from_name("Shift"), Key::Shift);
        assert_eq!(Key::from_name("a"), Key::Character("a".into()));
        assert_eq!(Key::from_name("ᬓ"), Key::Character("ᬓ".into()));
        assert_eq!(Key::from_name("Dead"), Key::Named("Dead".into()));
    }

    #[test]
    fn test_shift_press_and_release() {
        let (mut n, _) = normalizer();
        assert_eq!(
            n.physical(&PhysicalKeyEvent::pressed(Key::Shift)),
            Normalized::Keystroke(Keystroke::ShiftDown)
        );
        assert_eq!(
            n.physical(&PhysicalKeyEvent::released(Key::Shift)),
            Normalized::Keystroke(Keystroke::ShiftUp)
        );
    }

    #[test]
    fn test_held_shift_repeats_are_ignored() {
        let (mut n, sink) = normalizer();
        n.physical(&PhysicalKeyEvent::pressed(Key::Shift));
        assert_eq!(
            n.physical(&PhysicalKeyEvent::pressed(Key::Shift).repeated()),
            Normalized::Ignored
        );
        assert_eq!(
            n.physical(&PhysicalKeyEvent::released(Key::Shift)),
            Normalized::Keystroke(Keystroke::ShiftUp)
        );
        assert!(sink.forwarded.borrow().is_empty());

        // Held editing keys keep repeating.
        assert_eq!(
            n.physical(&PhysicalKeyEvent::pressed(Key::Backspace).repeated()),
            Normalized::Keystroke(Keystroke::Insert("\u{0008}".into()))
        );
    }

    #[test]
    fn test_editing_keys_are_intercepted() {
        let (mut n, sink) = normalizer();
        assert_eq!(
            n.physical(&PhysicalKeyEvent::pressed(Key::Backspace)),
            Normalized::Keystroke(Keystroke::Insert("\u{0008}".into()))
        );
        assert_eq!(
            n.physical(&PhysicalKeyEvent::pressed(Key::Delete)),
            Normalized::Keystroke(Keystroke::Insert("\u{007f}".into()))
        );
        assert_eq!(
            n.physical(&PhysicalKeyEvent::pressed(Key::Enter)),
            Normalized::Keystroke(Keystroke::Insert("\n".into()))
        );
        assert_eq!(
            n.physical(&PhysicalKeyEvent::pressed(Key::ArrowLeft)),
            Normalized::Keystroke(Keystroke::Caret(Direction::Left))
        );
        assert!(sink.forwarded.borrow().is_empty());
    }

    #[test]
    fn test_editing_keys_during_composition_go_to_sink() {
        let (mut n, sink) = normalizer();
        let event = PhysicalKeyEvent::pressed(Key::Backspace).composing();
        assert_eq!(n.physical(&event), Normalized::Forwarded);
        assert_eq!(sink.forwarded.borrow().len(), 1);
    }

    #[test]
    fn test_printable_keys_are_forwarded() {
        let (mut n, sink) = normalizer();
        let event = PhysicalKeyEvent::pressed(Key::Character("k".into()));
        assert_eq!(n.physical(&event), Normalized::Forwarded);
        assert_eq!(sink.forwarded.borrow()[0], event);
    }

    #[test]
    fn test_modifiers_and_copy_pass_through() {
        let (mut n, sink) = normalizer();
        assert_eq!(n.physical(&PhysicalKeyEvent::pressed(Key::Control)), Normalized::PassThrough);
        let copy = PhysicalKeyEvent::pressed(Key::Character("c".into())).with_modifiers(Modifiers {
            ctrl: true,
            ..Modifiers::default()
        });
        assert_eq!(n.physical(&copy), Normalized::PassThrough);
        assert_eq!(
            n.physical(&PhysicalKeyEvent::released(Key::Character("c".into()))),
            Normalized::PassThrough
        );
        assert!(sink.forwarded.borrow().is_empty());
    }

    #[test]
    fn test_only_commit_produces_keystroke() {
        let (mut n, _) = normalizer();
        assert_eq!(n.composer(&ComposerEvent::Update("ᬓ".into())), Normalized::Pending);
        assert!(n.is_composing());

        // Intercepted keys stay with the IME while composing.
        assert_eq!(n.physical(&PhysicalKeyEvent::pressed(Key::Enter)), Normalized::Forwarded);

        assert_eq!(
            n.composer(&ComposerEvent::Commit("ᬓᬶ".into())),
            Normalized::Keystroke(Keystroke::Insert("ᬓᬶ".into()))
        );
        assert!(!n.is_composing());
        assert_eq!(n.composer(&ComposerEvent::Commit(String::new())), Normalized::Ignored);
    }

    #[test]
    fn test_empty_update_ends_composition() {
        let (mut n, sink) = normalizer();
        assert_eq!(n.composer(&ComposerEvent::Update("k".into())), Normalized::Pending);
        assert!(n.is_composing());
        assert_eq!(n.composer(&ComposerEvent::Update(String::new())), Normalized::Pending);
        assert!(!n.is_composing());

        assert_eq!(
            n.physical(&PhysicalKeyEvent::pressed(Key::Backspace)),
            Normalized::Keystroke(Keystroke::Insert("\u{8}".into()))
        );
        assert!(sink.forwarded.borrow().is_empty());
    }

    #[test]
    fn test_virtual_keys() {
        let (mut n, _) = normalizer();
        let keys = KeyTable::new();
        let space = KeyCell::parse("space", &keys);
        assert_eq!(
            n.virtual_key(&space, None),
            Normalized::Keystroke(Keystroke::Insert(" ".into()))
        );
        let numbers = KeyCell::parse("numbers", &keys);
        assert_eq!(
            n.virtual_key(&numbers, None),
            Normalized::Keystroke(Keystroke::SwitchPage("numbers".into()))
        );

        let glyph = KeyCell::parse("vowel0", &keys);
        assert_eq!(n.virtual_key(&glyph, None), Normalized::Ignored);
        let binding = KeyBinding {
            cell: "vowel0".into(),
            class: "vowel".into(),
            slot: 0,
            rule: 0,
            context: "ᬓ".into(),
            glyph: "ᬶ".into(),
        };
        assert_eq!(
            n.virtual_key(&glyph, Some(&binding)),
            Normalized::Keystroke(Keystroke::Insert("ᬶ".into()))
        );
    }

    #[test]
    fn test_detach_releases_sink() {
        let (mut n, sink) = normalizer();
        n.composer(&ComposerEvent::Update("x".into()));
        n.detach();
        assert!(*sink.detached.borrow());
        assert!(!n.is_composing());
    }
}
