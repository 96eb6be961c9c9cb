//! Built-in Aksara Bali layout.
//!
//! The layout ships as `data/bali.toml` and is parsed once on first use.
//!
//! Letters page (10 x 5):
//! - consonants in hanacaraka order, shift for aspirated/alternate letters
//! - vowel keys: independent vowels at syllable start, vowel signs after a
//!   consonant, replacement of a sign that is already there
//! - final signs (cecek, surang, bisah) and adeg-adeg after a syllable
//!
//! Numbers page: Balinese digits and punctuation.

use std::sync::Arc;

use aksara_core::ScriptLayout;
use anyhow::Result;
use once_cell::sync::OnceCell;

/// Source of the built-in layout.
pub const BALI_LAYOUT_TOML: &str = include_str!("../data/bali.toml");

static BALI_LAYOUT: OnceCell<Arc<ScriptLayout>> = OnceCell::new();

/// The built-in Balinese layout, shared.
pub fn bali_layout() -> Result<Arc<ScriptLayout>> {
    BALI_LAYOUT
        .get_or_try_init(|| ScriptLayout::from_toml_str(BALI_LAYOUT_TOML).map(Arc::new))
        .cloned()
}

/// Balinese consonants in hanacaraka order.
pub const HANACARAKA: [&str; 18] = [
    "ᬳ", "ᬦ", "ᬘ", "ᬭ", "ᬓ", "ᬤ", "ᬢ", "ᬲ", "ᬯ", "ᬮ", "ᬫ", "ᬕ", "ᬩ", "ᬗ", "ᬧ", "ᬚ", "ᬬ", "ᬜ",
];

#[cfg(test)]
mod tests {
    use super::*;
    use aksara_core::resolver;
    use aksara_core::ShiftLevel;

    #[test]
    fn test_builtin_layout_is_clean() {
        let layout = bali_layout().unwrap();
        assert_eq!(layout.script(), "bali");
        assert!(layout.diagnostics().is_empty(), "{:?}", layout.diagnostics());
        assert!(layout.page("letters").is_some());
        assert!(layout.page("numbers").is_some());
    }

    #[test]
    fn test_layout_is_shared() {
        let a = bali_layout().unwrap();
        let b = bali_layout().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_consonant_row_order() {
        let layout = bali_layout().unwrap();
        let letters = layout.page("letters").unwrap();
        let bindings = resolver::resolve(letters, "", ShiftLevel::Base);
        for (slot, consonant) in HANACARAKA.iter().enumerate() {
            let cell = format!("consonant{}", slot);
            assert_eq!(bindings.get(&cell).unwrap().glyph, *consonant);
        }
    }

    #[test]
    fn test_grid_geometry() {
        let layout = bali_layout().unwrap();
        let letters = layout.page("letters").unwrap();
        assert_eq!(letters.grid().row_count(), 5);
        assert_eq!(letters.grid().column_count(), 10);
        let numbers = layout.page("numbers").unwrap();
        assert_eq!(numbers.grid().row_count(), 3);
    }
}
