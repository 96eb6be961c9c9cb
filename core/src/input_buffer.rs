//! Text buffer model with caret tracking.
//!
//! The buffer is the logical text being composed plus a caret position
//! counted in chars (not bytes). All edits go through [`insert`], which
//! understands two sentinel control characters so that backspace and
//! forward-delete travel through the same pipeline as ordinary text.

use unicode_segmentation::UnicodeSegmentation;

/// Sentinel meaning "erase the character before the caret".
pub const ERASE_PREVIOUS: char = '\u{0008}';

/// Sentinel meaning "erase the character after the caret".
pub const ERASE_NEXT: char = '\u{007F}';

/// Balinese adeg-adeg; joins the following consonant into the same cluster.
const ADEG_ADEG: char = '\u{1B44}';

/// Direction of a caret move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

/// Number of chars in `text`.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte offset of the char at `pos`, or `text.len()` past the end.
fn byte_offset(text: &str, pos: usize) -> usize {
    text.char_indices()
        .nth(pos)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

/// Clamp a caret position into `[0, char_len(text)]`.
pub fn clamp_caret(text: &str, caret_pos: usize) -> usize {
    caret_pos.min(char_len(text))
}

/// Split `text` at a (clamped) caret position.
pub fn split_at_caret(text: &str, caret_pos: usize) -> (&str, &str) {
    text.split_at(byte_offset(text, caret_pos))
}

/// Insert `input` at `caret_pos`, interpreting erase sentinels.
///
/// Returns the new text and the new caret. Pure: the result depends only on
/// the arguments. Out-of-range carets are clamped before editing.
pub fn insert(text: &str, caret_pos: usize, input: &str) -> (String, usize) {
    let (pre, post) = split_at_caret(text, caret_pos);
    let mut pre = pre.to_string();
    let mut post = post;

    for c in input.chars() {
        match c {
            ERASE_PREVIOUS => {
                pre.pop();
            }
            ERASE_NEXT => {
                let mut rest = post.chars();
                if rest.next().is_some() {
                    post = rest.as_str();
                }
            }
            _ => pre.push(c),
        }
    }

    let caret = char_len(&pre);
    pre.push_str(post);
    (pre, caret)
}

/// Move the caret by one char, clamped to the buffer.
pub fn move_caret(text: &str, caret_pos: usize, direction: Direction) -> usize {
    let caret = clamp_caret(text, caret_pos);
    match direction {
        Direction::Left => caret.saturating_sub(1),
        Direction::Right => (caret + 1).min(char_len(text)),
    }
}

/// Caret stops that do not split a cluster, in chars, including 0 and the
/// end of the text.
///
/// Extended grapheme clusters, except that a consonant closed by adeg-adeg
/// stays joined to the consonant it stacks onto. A ZWNJ ends its cluster.
pub fn cluster_boundaries(text: &str) -> Vec<usize> {
    let mut boundaries = Vec::new();
    let mut pos = 0;
    let mut last = None;
    for grapheme in text.graphemes(true) {
        if last != Some(ADEG_ADEG) {
            boundaries.push(pos);
        }
        pos += char_len(grapheme);
        last = grapheme.chars().last();
    }
    boundaries.push(pos);
    boundaries
}

/// Move the caret to the previous/next cluster boundary.
pub fn move_caret_by_cluster(text: &str, caret_pos: usize, direction: Direction) -> usize {
    let caret = clamp_caret(text, caret_pos);
    let boundaries = cluster_boundaries(text);
    match direction {
        Direction::Left => boundaries.iter().rev().find(|&&b| b < caret).copied().unwrap_or(0),
        Direction::Right => boundaries.iter().find(|&&b| b > caret).copied().unwrap_or(caret),
    }
}

/// Owned text + caret value.
///
/// Every edit returns a new buffer; the receiver is left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBuffer {
    text: String,
    caret: usize,
}

impl TextBuffer {
    /// Create a buffer, clamping the caret into range.
    pub fn new(text: impl Into<String>, caret_pos: usize) -> Self {
        let text = text.into();
        let caret = clamp_caret(&text, caret_pos);
        Self { text, caret }
    }

    /// Buffer with the caret at the end of `text`.
    pub fn at_end(text: impl Into<String>) -> Self {
        let text = text.into();
        let caret = char_len(&text);
        Self { text, caret }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Caret position in chars.
    pub fn caret(&self) -> usize {
        self.caret
    }

    /// Length in chars.
    pub fn len(&self) -> usize {
        char_len(&self.text)
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Text before the caret; the resolver matches against this.
    pub fn prefix(&self) -> &str {
        split_at_caret(&self.text, self.caret).0
    }

    /// Text after the caret.
    pub fn suffix(&self) -> &str {
        split_at_caret(&self.text, self.caret).1
    }

    /// Insert `input` (sentinels allowed) at the caret.
    pub fn insert(&self, input: &str) -> Self {
        let (text, caret) = insert(&self.text, self.caret, input);
        Self { text, caret }
    }

    pub fn erase_previous(&self) -> Self {
        self.insert(&ERASE_PREVIOUS.to_string())
    }

    pub fn erase_next(&self) -> Self {
        self.insert(&ERASE_NEXT.to_string())
    }

    pub fn move_caret(&self, direction: Direction) -> Self {
        self.with_caret(move_caret(&self.text, self.caret, direction))
    }

    pub fn move_caret_by_cluster(&self, direction: Direction) -> Self {
        self.with_caret(move_caret_by_cluster(&self.text, self.caret, direction))
    }

    /// Same text, new (clamped) caret.
    pub fn with_caret(&self, caret_pos: usize) -> Self {
        Self {
            text: self.text.clone(),
            caret: clamp_caret(&self.text, caret_pos),
        }
    }

    pub fn into_parts(self) -> (String, usize) {
        (self.text, self.caret)
    }
}
