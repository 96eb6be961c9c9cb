//! End-to-end keyboard flows
//!
//! Drives a `KeyboardController` mounted on a small TOML layout through the
//! same events a host would deliver: taps, physical keys, IME commits and
//! caret reports.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use aksara_core::{
    ComposerEvent, CompositionSink, Config, Key, KeyResult, KeyboardController, PhysicalKeyEvent,
    ScriptLayout, ShiftLevel, VirtualKeyEvent,
};

const LAYOUT: &str = r#"
script = "bali-mini"

[labels]
numbers = "᭗᭘᭙"
letters = "ᬳᬦᬘ"

[pages.letters]
grid = [
    ["sa", "ka", "vowel0", "vowel1", "sign"],
    ["shift", "zwnj", "space", "backspace", "numbers"],
    ["arrowleft", "space", "space", "return", "arrowright"],
]

[[pages.letters.keys.sa]]
pattern = "ᬲ$"
levels = ["ᬲ", "ᬶ"]

[[pages.letters.keys.sa]]
pattern = "^|[^ᬲ]$"
levels = ["ᬲ", "ᬰ"]

[[pages.letters.keys.ka]]
levels = ["ᬓ", "ᬔ"]

# Replace an existing vowel sign
[[pages.letters.keys.vowel]]
pattern = "[ᬓ-ᬳ][ᬵ-ᭃ]$"
levels = [["\bᬶ", "\bᬸ"], ["\bᬷ", "\bᬹ"]]

[[pages.letters.keys.vowel]]
pattern = "[ᬓ-ᬳ]$"
levels = [["ᬶ", "ᬸ"], ["ᬷ", "ᬹ"]]

[[pages.letters.keys.vowel]]
pattern = ""
levels = [["ᬇ", "ᬉ"], ["ᬈ", "ᬊ"]]

[[pages.letters.keys.sign]]
pattern = "[ᬓ-ᬳ][ᬵ-ᭃ]?$"
levels = ["ᬂ", "ᬄ"]

[pages.numbers]
grid = [
    ["digit0", "digit1", "digit2"],
    ["letters", "space", "backspace"],
]

[[pages.numbers.keys.digit]]
levels = [["᭐", "᭑", "᭒"]]
"#;

fn layout() -> Arc<ScriptLayout> {
    Arc::new(ScriptLayout::from_toml_str(LAYOUT).unwrap())
}

fn mount(text: &str, caret: usize) -> KeyboardController {
    KeyboardController::mount(layout(), Config::default(), text, caret).unwrap()
}

#[test]
fn test_layout_loads_clean() {
    let layout = layout();
    assert!(layout.diagnostics().is_empty(), "{:?}", layout.diagnostics());
    assert_eq!(layout.pages().len(), 2);
}

#[test]
fn test_contextual_consonant_with_shift() {
    let mut kb = mount("", 0);
    kb.tap("sa");
    assert_eq!((kb.state().text(), kb.state().caret_pos()), ("ᬲ", 1));

    // After ᬲ the shifted key offers the vowel sign instead of ᬰ.
    kb.toggle_shift();
    assert_eq!(kb.context().label("sa"), "ᬲᬶ");
    kb.tap("sa");
    assert_eq!((kb.state().text(), kb.state().caret_pos()), ("ᬲᬶ", 2));
    assert_eq!(kb.state().shift(), ShiftLevel::Base);
}

#[test]
fn test_vowel_keys_follow_syllable() {
    let mut kb = mount("", 0);
    assert_eq!(kb.context().label("vowel0"), "ᬇ");
    assert!(!kb.context().key("sign").unwrap().enabled);

    kb.tap("ka");
    assert_eq!(kb.context().label("vowel0"), "ᬓᬶ");
    assert!(kb.context().key("sign").unwrap().enabled);

    kb.tap("vowel0");
    assert_eq!(kb.state().text(), "ᬓᬶ");

    // A second vowel replaces the sign rather than stacking it.
    assert_eq!(kb.context().label("vowel1"), "ᬓᬸ");
    kb.tap("vowel1");
    assert_eq!(kb.state().text(), "ᬓᬸ");
    assert_eq!(kb.state().caret_pos(), 2);

    kb.tap("sign");
    assert_eq!(kb.state().text(), "ᬓᬸᬂ");
}

#[test]
fn test_editing_in_the_middle() {
    let mut kb = mount("ᬓᬢ", 1);
    kb.tap("vowel0");
    assert_eq!(kb.state().text(), "ᬓᬶᬢ");
    assert_eq!(kb.state().caret_pos(), 2);

    kb.tap("backspace");
    assert_eq!(kb.state().text(), "ᬓᬢ");
    kb.handle_physical(&PhysicalKeyEvent::pressed(Key::Delete));
    assert_eq!(kb.state().text(), "ᬓ");
    assert_eq!(kb.state().caret_pos(), 1);
}

#[test]
fn test_numbers_page_roundtrip() {
    let mut kb = mount("", 0);
    assert_eq!(kb.context().label("numbers"), "᭗᭘᭙");
    kb.tap("numbers");
    assert_eq!(kb.context().page, "numbers");
    kb.tap("digit2");
    kb.tap("digit0");
    kb.tap("letters");
    kb.tap("ka");
    assert_eq!(kb.state().text(), "᭒᭐ᬓ");
    assert_eq!(kb.state().page(), "letters");
}

#[test]
fn test_joiners_and_whitespace() {
    let mut kb = mount("ᬓ", 1);
    kb.tap("zwnj");
    kb.tap("space");
    kb.tap("return");
    assert_eq!(kb.state().text(), "ᬓ\u{200C} \n");
    assert_eq!(kb.state().caret_pos(), 4);
}

#[test]
fn test_arrow_keys_skip_combining_marks() {
    let mut kb = mount("ᬓᬸᬂᬢ", 4);
    kb.tap("arrowleft");
    assert_eq!(kb.state().caret_pos(), 3);
    kb.tap("arrowleft");
    assert_eq!(kb.state().caret_pos(), 0);
    kb.handle_physical(&PhysicalKeyEvent::pressed(Key::ArrowRight));
    assert_eq!(kb.state().caret_pos(), 3);
}

#[derive(Clone, Default)]
struct HiddenInput {
    keys: Rc<RefCell<Vec<Key>>>,
}

impl CompositionSink for HiddenInput {
    fn forward(&mut self, event: &PhysicalKeyEvent) {
        self.keys.borrow_mut().push(event.key.clone());
    }
}

#[test]
fn test_physical_typing_through_ime() {
    let sink = HiddenInput::default();
    let changes = Rc::new(RefCell::new(0usize));
    let counter = changes.clone();
    let mut kb = mount("", 0)
        .with_sink(Box::new(sink.clone()))
        .with_observer(move |_: &str, _: usize| *counter.borrow_mut() += 1);

    assert_eq!(
        kb.handle_physical(&PhysicalKeyEvent::pressed(Key::from_name("k"))),
        KeyResult::Forwarded
    );
    assert_eq!(
        kb.handle_physical(&PhysicalKeyEvent::pressed(Key::from_name("i"))),
        KeyResult::Forwarded
    );
    kb.handle_composer(&ComposerEvent::Update("ᬓ".into()));

    // Backspace belongs to the IME while it is composing.
    assert_eq!(
        kb.handle_physical(&PhysicalKeyEvent::pressed(Key::Backspace)),
        KeyResult::Forwarded
    );
    assert_eq!(*changes.borrow(), 0);

    kb.handle_composer(&ComposerEvent::Commit("ᬓᬶ".into()));
    assert_eq!(kb.state().text(), "ᬓᬶ");
    assert_eq!(*changes.borrow(), 1);
    assert_eq!(sink.keys.borrow().len(), 3);

    // Released keys and modifiers stay with the host.
    assert_eq!(
        kb.handle_physical(&PhysicalKeyEvent::released(Key::from_name("k"))),
        KeyResult::NotHandled
    );
    assert_eq!(
        kb.handle_physical(&PhysicalKeyEvent::pressed(Key::Alt)),
        KeyResult::NotHandled
    );
}

#[test]
fn test_pointer_sequence() {
    let mut kb = mount("", 0);
    kb.handle_virtual(&VirtualKeyEvent::down("ka"));
    assert!(kb.context().key("ka").unwrap().pressed);
    assert!(kb.context().key("ka").unwrap().zoomable);
    assert_eq!(kb.state().text(), "");
    kb.handle_virtual(&VirtualKeyEvent::up("ka"));
    kb.handle_virtual(&VirtualKeyEvent::click("ka"));
    assert_eq!(kb.state().text(), "ᬓ");
    assert!(!kb.context().key("ka").unwrap().pressed);
}

#[test]
fn test_caret_stays_in_bounds() {
    let mut kb = mount("ᬓ", 1);
    let taps = [
        "backspace", "backspace", "arrowleft", "ka", "vowel0", "arrowright", "arrowright",
        "sign", "arrowleft", "backspace", "numbers", "digit1", "letters", "vowel1", "sa",
    ];
    for cell in taps {
        kb.tap(cell);
        let caret = kb.state().caret_pos();
        assert!(caret <= kb.state().text().chars().count(), "after {}", cell);
        assert_eq!(kb.context().caret_pos, caret);
    }
}

#[test]
fn test_detach_hands_back_text() {
    let mut kb = mount("ᬲ", 1);
    kb.set_caret(Some(0));
    kb.tap("ka");
    let state = kb.detach();
    assert_eq!(state.text(), "ᬓᬲ");
    assert_eq!(state.caret_pos(), 1);
}
