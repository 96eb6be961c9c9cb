//! Script layout tables.
//!
//! A [`ScriptLayout`] is static data for one script: named pages, each with a
//! rendering grid and a key table of ordered context rules. Layouts are
//! loaded from TOML or JSON and are immutable once built.
//!
//! ```toml
//! script = "bali"
//!
//! [labels]
//! numbers = "᭗᭘᭙"
//!
//! [pages.letters]
//! grid = [
//!     ["consonant0", "consonant1", "vowel0"],
//!     ["shift", "space", "backspace"],
//! ]
//!
//! [[pages.letters.keys.consonant]]
//! pattern = ""
//! levels = [["ᬓ", "ᬲ"], ["ᬔ", "ᬰ"]]
//! ```

use std::fmt;
use std::path::Path;

use ahash::{AHashMap, AHashSet};
use anyhow::{bail, Context, Result};
use phf::phf_map;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::composition::ShiftLevel;

/// Grid cell name for an empty grid position.
pub const BLANK_CELL: &str = ".";

/// Keys with fixed behaviour, recognized by their reserved cell name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialKey {
    Zwnj,
    Zwj,
    Shift,
    Backspace,
    Delete,
    Numbers,
    Letters,
    Space,
    Return,
    ArrowLeft,
    ArrowRight,
}

static SPECIAL_KEYS: phf::Map<&'static str, SpecialKey> = phf_map! {
    "zwnj" => SpecialKey::Zwnj,
    "zwj" => SpecialKey::Zwj,
    "shift" => SpecialKey::Shift,
    "backspace" => SpecialKey::Backspace,
    "delete" => SpecialKey::Delete,
    "numbers" => SpecialKey::Numbers,
    "letters" => SpecialKey::Letters,
    "space" => SpecialKey::Space,
    "return" => SpecialKey::Return,
    "arrowleft" => SpecialKey::ArrowLeft,
    "arrowright" => SpecialKey::ArrowRight,
};

impl SpecialKey {
    /// Look up a reserved cell name.
    pub fn from_name(name: &str) -> Option<Self> {
        SPECIAL_KEYS.get(name).copied()
    }

    /// The reserved cell name of this key.
    pub fn name(&self) -> &'static str {
        match self {
            SpecialKey::Zwnj => "zwnj",
            SpecialKey::Zwj => "zwj",
            SpecialKey::Shift => "shift",
            SpecialKey::Backspace => "backspace",
            SpecialKey::Delete => "delete",
            SpecialKey::Numbers => "numbers",
            SpecialKey::Letters => "letters",
            SpecialKey::Space => "space",
            SpecialKey::Return => "return",
            SpecialKey::ArrowLeft => "arrowleft",
            SpecialKey::ArrowRight => "arrowright",
        }
    }

    /// Built-in label, used when the layout does not provide one.
    pub fn default_label(&self, shift: ShiftLevel) -> &'static str {
        match self {
            SpecialKey::Zwnj => "zwnj",
            SpecialKey::Zwj => "zwj",
            SpecialKey::Shift => match shift {
                ShiftLevel::Base => "⇧",
                ShiftLevel::Shifted => "⬆",
            },
            SpecialKey::Backspace => "⌫",
            SpecialKey::Delete => "⌦",
            SpecialKey::Numbers => "123",
            SpecialKey::Letters => "abc",
            SpecialKey::Space => "␣",
            SpecialKey::Return => "⏎",
            SpecialKey::ArrowLeft => "←",
            SpecialKey::ArrowRight => "→",
        }
    }
}

/// A suffix pattern, matched so that the match ends exactly at the caret.
#[derive(Clone)]
pub struct ContextPattern {
    source: String,
    regex: Regex,
}

impl ContextPattern {
    /// Compile `source`, anchoring it at the end of the matched text.
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!(r"(?:{})\z", source))?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Longest suffix of `prefix` matched by the pattern, if any.
    pub fn find_suffix<'t>(&self, prefix: &'t str) -> Option<&'t str> {
        self.regex.find(prefix).map(|m| m.as_str())
    }
}

impl fmt::Debug for ContextPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ContextPattern").field(&self.source).finish()
    }
}

impl PartialEq for ContextPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// One context rule: a pattern plus glyph rows indexed by shift level.
///
/// `levels[shift][slot]` is the glyph emitted by slot `slot` of the key
/// class. Missing or empty entries above level 0 fall back to level 0.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawRule")]
pub struct ContextRule {
    pattern: ContextPattern,
    levels: Vec<Vec<String>>,
}

impl ContextRule {
    /// Build a rule from full glyph rows.
    pub fn new<S: Into<String>>(pattern: &str, levels: Vec<Vec<S>>) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: ContextPattern::new(pattern)?,
            levels: levels
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        })
    }

    /// Build a single-slot rule: one glyph per shift level.
    pub fn single(pattern: &str, glyphs: &[&str]) -> Result<Self, regex::Error> {
        Self::new(pattern, glyphs.iter().map(|g| vec![*g]).collect())
    }

    pub fn pattern(&self) -> &ContextPattern {
        &self.pattern
    }

    pub fn levels(&self) -> &[Vec<String>] {
        &self.levels
    }

    /// Matched context at the end of `prefix`, if the rule applies.
    pub fn matches<'t>(&self, prefix: &'t str) -> Option<&'t str> {
        self.pattern.find_suffix(prefix)
    }

    /// Glyph for `slot` at `shift`, falling back to level 0.
    pub fn glyph(&self, shift: ShiftLevel, slot: usize) -> Option<&str> {
        let at = |level: usize| {
            self.levels
                .get(level)
                .and_then(|row| row.get(slot))
                .map(String::as_str)
                .filter(|glyph| !glyph.is_empty())
        };
        at(shift.index()).or_else(|| at(0))
    }

    /// Widest glyph row of this rule.
    pub fn slot_count(&self) -> usize {
        self.levels.iter().map(Vec::len).max().unwrap_or(0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRow {
    One(String),
    Many(Vec<String>),
}

#[derive(Deserialize)]
struct RawRule {
    #[serde(default)]
    pattern: String,
    levels: Vec<RawRow>,
}

impl TryFrom<RawRule> for ContextRule {
    type Error = String;

    fn try_from(raw: RawRule) -> Result<Self, Self::Error> {
        let pattern = ContextPattern::new(&raw.pattern)
            .map_err(|e| format!("invalid context pattern {:?}: {}", raw.pattern, e))?;
        let levels = raw
            .levels
            .into_iter()
            .map(|row| match row {
                RawRow::One(glyph) => vec![glyph],
                RawRow::Many(glyphs) => glyphs,
            })
            .collect();
        Ok(Self { pattern, levels })
    }
}

/// Key class name → context rules in priority order.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct KeyTable {
    classes: AHashMap<String, Vec<ContextRule>>,
}

impl KeyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key class with its rules (declared order is priority order).
    pub fn with_class(mut self, class: impl Into<String>, rules: Vec<ContextRule>) -> Self {
        self.classes.insert(class.into(), rules);
        self
    }

    pub fn rules(&self, class: &str) -> Option<&[ContextRule]> {
        self.classes.get(class).map(Vec::as_slice)
    }

    pub fn contains(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    /// Key class names, sorted.
    pub fn class_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.classes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// 2D arrangement of cell names, used for rendering geometry only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Grid {
    rows: Vec<Vec<String>>,
}

impl Grid {
    pub fn new<S: Into<String>>(rows: Vec<Vec<S>>) -> Self {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Width of the first row.
    pub fn column_count(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    /// Distinct non-blank cell names in reading order.
    pub fn cell_names(&self) -> Vec<&str> {
        let mut seen = AHashSet::new();
        self.rows
            .iter()
            .flatten()
            .map(String::as_str)
            .filter(|name| *name != BLANK_CELL && seen.insert(*name))
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rows.iter().flatten().any(|cell| cell == name)
    }
}

/// What a grid cell does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellKind {
    Special(SpecialKey),
    /// Slot `slot` of key class `class`; resolved through context rules.
    Glyph { class: String, slot: usize },
}

/// A distinct grid cell and its meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCell {
    pub name: String,
    pub kind: CellKind,
}

impl KeyCell {
    /// Interpret a cell name against a key table.
    ///
    /// `vowel3` is slot 3 of class `vowel` unless `vowel3` is itself a key
    /// class. Reserved names always win.
    pub fn parse(name: &str, keys: &KeyTable) -> Self {
        let kind = if let Some(special) = SpecialKey::from_name(name) {
            CellKind::Special(special)
        } else if keys.contains(name) {
            CellKind::Glyph {
                class: name.to_string(),
                slot: 0,
            }
        } else {
            let class = name.trim_end_matches(|c: char| c.is_ascii_digit());
            match name[class.len()..].parse::<usize>() {
                Ok(slot) if !class.is_empty() => CellKind::Glyph {
                    class: class.to_string(),
                    slot,
                },
                _ => CellKind::Glyph {
                    class: name.to_string(),
                    slot: 0,
                },
            }
        };
        Self {
            name: name.to_string(),
            kind,
        }
    }

    pub fn special(&self) -> Option<SpecialKey> {
        match self.kind {
            CellKind::Special(key) => Some(key),
            CellKind::Glyph { .. } => None,
        }
    }
}

/// A problem found while validating a layout. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutIssue {
    /// A grid cell refers to a key class missing from the key table.
    MissingKeyClass { page: String, cell: String, class: String },
    /// A key class in the table that no grid cell refers to.
    UnusedKeyClass { page: String, class: String },
    /// A glyph cell whose slot no rule of its class provides.
    SlotOutOfRange { page: String, cell: String, slot: usize },
    /// A grid row whose width differs from the first row.
    RaggedRow { page: String, row: usize, width: usize, expected: usize },
}

impl fmt::Display for LayoutIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutIssue::MissingKeyClass { page, cell, class } => write!(
                f,
                "page '{}': cell '{}' refers to unknown key class '{}'",
                page, cell, class
            ),
            LayoutIssue::UnusedKeyClass { page, class } => {
                write!(f, "page '{}': key class '{}' is not on the grid", page, class)
            }
            LayoutIssue::SlotOutOfRange { page, cell, slot } => write!(
                f,
                "page '{}': cell '{}' uses slot {} but no rule has that many glyphs",
                page, cell, slot
            ),
            LayoutIssue::RaggedRow {
                page,
                row,
                width,
                expected,
            } => write!(
                f,
                "page '{}': row {} has {} cells, expected {}",
                page, row, width, expected
            ),
        }
    }
}

/// One keyboard page: a grid and the rules behind its glyph cells.
#[derive(Debug, Clone)]
pub struct LayoutPage {
    name: String,
    grid: Grid,
    keys: KeyTable,
    cells: Vec<KeyCell>,
}

impl LayoutPage {
    pub fn new(name: impl Into<String>, grid: Grid, keys: KeyTable) -> Self {
        let cells = grid
            .cell_names()
            .into_iter()
            .map(|cell| KeyCell::parse(cell, &keys))
            .collect();
        Self {
            name: name.into(),
            grid,
            keys,
            cells,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn keys(&self) -> &KeyTable {
        &self.keys
    }

    /// Distinct cells in grid reading order.
    pub fn cells(&self) -> &[KeyCell] {
        &self.cells
    }

    pub fn cell(&self, name: &str) -> Option<&KeyCell> {
        self.cells.iter().find(|cell| cell.name == name)
    }

    /// Validate grid against key table.
    pub fn diagnostics(&self) -> Vec<LayoutIssue> {
        let mut issues = Vec::new();
        let mut used = AHashSet::new();

        let expected = self.grid.column_count();
        for (row, cells) in self.grid.rows().iter().enumerate() {
            if cells.len() != expected {
                issues.push(LayoutIssue::RaggedRow {
                    page: self.name.clone(),
                    row,
                    width: cells.len(),
                    expected,
                });
            }
        }

        for cell in &self.cells {
            let CellKind::Glyph { class, slot } = &cell.kind else {
                continue;
            };
            used.insert(class.as_str());
            match self.keys.rules(class) {
                None => issues.push(LayoutIssue::MissingKeyClass {
                    page: self.name.clone(),
                    cell: cell.name.clone(),
                    class: class.clone(),
                }),
                Some(rules) => {
                    if !rules.iter().any(|rule| *slot < rule.slot_count()) {
                        issues.push(LayoutIssue::SlotOutOfRange {
                            page: self.name.clone(),
                            cell: cell.name.clone(),
                            slot: *slot,
                        });
                    }
                }
            }
        }

        for class in self.keys.class_names() {
            if !used.contains(class) {
                issues.push(LayoutIssue::UnusedKeyClass {
                    page: self.name.clone(),
                    class: class.to_string(),
                });
            }
        }

        issues
    }
}

#[derive(Deserialize)]
struct RawPage {
    grid: Grid,
    #[serde(default)]
    keys: KeyTable,
}

#[derive(Deserialize)]
struct RawLayout {
    script: String,
    #[serde(default)]
    labels: BTreeMap<String, String>,
    pages: BTreeMap<String, RawPage>,
}

/// Immutable layout for one script.
#[derive(Debug, Clone)]
pub struct ScriptLayout {
    script: String,
    pages: Vec<LayoutPage>,
    labels: AHashMap<String, String>,
}

impl ScriptLayout {
    pub fn new(script: impl Into<String>, pages: Vec<LayoutPage>) -> Self {
        Self {
            script: script.into(),
            pages,
            labels: AHashMap::new(),
        }
    }

    /// Override the label of a special key cell (e.g. `numbers`).
    pub fn with_label(mut self, cell: impl Into<String>, label: impl Into<String>) -> Self {
        self.labels.insert(cell.into(), label.into());
        self
    }

    /// Parse a TOML layout.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw: RawLayout = toml::from_str(content).context("parse TOML layout")?;
        Self::from_raw(raw)
    }

    /// Parse a JSON layout.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let raw: RawLayout = serde_json::from_str(content).context("parse JSON layout")?;
        Self::from_raw(raw)
    }

    /// Load a layout file; `.json` is parsed as JSON, anything else as TOML.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read layout {}", path.display()))?;
        let layout = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_toml_str(&content),
        };
        layout.with_context(|| format!("load layout {}", path.display()))
    }

    fn from_raw(raw: RawLayout) -> Result<Self> {
        if raw.pages.is_empty() {
            bail!("layout '{}' has no pages", raw.script);
        }
        let mut pages = Vec::with_capacity(raw.pages.len());
        for (name, page) in raw.pages {
            if page.grid.row_count() == 0 {
                bail!("layout '{}': page '{}' has an empty grid", raw.script, name);
            }
            pages.push(LayoutPage::new(name, page.grid, page.keys));
        }
        let layout = Self {
            script: raw.script,
            pages,
            labels: raw.labels.into_iter().collect(),
        };
        for issue in layout.diagnostics() {
            tracing::warn!(script = %layout.script, "{}", issue);
        }
        Ok(layout)
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn pages(&self) -> &[LayoutPage] {
        &self.pages
    }

    pub fn page(&self, name: &str) -> Option<&LayoutPage> {
        self.pages.iter().find(|page| page.name == name)
    }

    /// Label for a special key: layout override or built-in symbol.
    pub fn special_label(&self, key: SpecialKey, shift: ShiftLevel) -> String {
        self.labels
            .get(key.name())
            .cloned()
            .unwrap_or_else(|| key.default_label(shift).to_string())
    }

    /// Issues across all pages.
    pub fn diagnostics(&self) -> Vec<LayoutIssue> {
        self.pages.iter().flat_map(LayoutPage::diagnostics).collect()
    }
}
