//! Composition state snapshots.
//!
//! The `CompositionState` is everything the keyboard knows about the text
//! being composed: the text, the caret, the shift level and the active page.
//! It is replace-on-write: each edit returns a new snapshot and the old one
//! stays valid, so a render that holds the previous snapshot never observes
//! a half-applied change.

use serde::{Deserialize, Serialize};

use crate::input_buffer::{self, Direction, TextBuffer};

/// Shift level of the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftLevel {
    /// Level 0
    #[default]
    Base,
    /// Level 1
    Shifted,
}

impl ShiftLevel {
    /// Index into a rule's glyph levels.
    pub fn index(self) -> usize {
        match self {
            ShiftLevel::Base => 0,
            ShiftLevel::Shifted => 1,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            ShiftLevel::Base => ShiftLevel::Shifted,
            ShiftLevel::Shifted => ShiftLevel::Base,
        }
    }
}

/// Immutable snapshot of the composition.
///
/// Invariant: `caret_pos() <= char count of text()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositionState {
    buffer: TextBuffer,
    shift: ShiftLevel,
    page: String,
}

impl CompositionState {
    /// Seed a state from host text; the caret is clamped.
    pub fn new(text: impl Into<String>, caret_pos: usize, page: impl Into<String>) -> Self {
        Self {
            buffer: TextBuffer::new(text, caret_pos),
            shift: ShiftLevel::Base,
            page: page.into(),
        }
    }

    pub fn text(&self) -> &str {
        self.buffer.text()
    }

    pub fn caret_pos(&self) -> usize {
        self.buffer.caret()
    }

    /// Text before the caret.
    pub fn prefix(&self) -> &str {
        self.buffer.prefix()
    }

    pub fn shift(&self) -> ShiftLevel {
        self.shift
    }

    /// Name of the active layout page.
    pub fn page(&self) -> &str {
        &self.page
    }

    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    /// Insert a keystroke (erase sentinels allowed) at the caret.
    pub fn with_insert(&self, input: &str) -> Self {
        Self {
            buffer: self.buffer.insert(input),
            ..self.clone()
        }
    }

    /// Move the caret one char.
    pub fn with_caret_move(&self, direction: Direction) -> Self {
        Self {
            buffer: self.buffer.move_caret(direction),
            ..self.clone()
        }
    }

    /// Move the caret one cluster.
    pub fn with_cluster_move(&self, direction: Direction) -> Self {
        Self {
            buffer: self.buffer.move_caret_by_cluster(direction),
            ..self.clone()
        }
    }

    pub fn with_caret(&self, caret_pos: usize) -> Self {
        Self {
            buffer: self.buffer.with_caret(caret_pos),
            ..self.clone()
        }
    }

    /// Replace the text, keeping shift and page.
    pub fn with_text(&self, text: impl Into<String>, caret_pos: usize) -> Self {
        Self {
            buffer: TextBuffer::new(text, caret_pos),
            ..self.clone()
        }
    }

    pub fn with_shift(&self, shift: ShiftLevel) -> Self {
        Self {
            shift,
            ..self.clone()
        }
    }

    pub fn with_page(&self, page: impl Into<String>) -> Self {
        Self {
            page: page.into(),
            ..self.clone()
        }
    }

    /// Whether the caret invariant holds.
    pub fn is_consistent(&self) -> bool {
        self.caret_pos() <= input_buffer::char_len(self.text())
    }
}
