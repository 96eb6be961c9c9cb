//! bali-kbd: drive the Balinese on-screen keyboard from a terminal.
//!
//! Each input line is a list of commands separated by whitespace:
//!   <cell>        tap a grid cell (consonant4, vowel1, space, shift, ...)
//!   :type <text>  commit text as if it came from the platform IME
//!   :caret <n>    move the caret as the host would after a click
//!   :page <name>  switch page
//!   :keys         show the current key labels
//!   :quit         print the final text and exit
//!
//! Usage:
//!   cargo run -p libbali --bin bali-kbd -- --text "ᬓ"
//!   RUST_LOG=aksara_core=debug cargo run -p libbali --bin bali-kbd

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use libbali::{create_keyboard, BaliConfig, ComposerEvent, KeyboardController, KeyResult};

#[derive(Parser, Debug)]
#[command(name = "bali-kbd")]
#[command(about = "Interactive Aksara Bali on-screen keyboard")]
struct Args {
    /// Keyboard configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Layout file overriding the built-in one (TOML or JSON)
    #[arg(short, long)]
    layout: Option<PathBuf>,

    /// Initial text
    #[arg(short, long, default_value = "")]
    text: String,

    /// Initial caret position (defaults to end of text)
    #[arg(long)]
    caret: Option<usize>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => BaliConfig::load_toml(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {}", path.display(), e))?,
        None => BaliConfig::default(),
    };
    if args.layout.is_some() {
        config.layout_path = args.layout.clone();
    }

    let caret = args.caret.unwrap_or_else(|| args.text.chars().count());
    let mut keyboard = create_keyboard(&config, &args.text, caret)?;

    println!("═══════════════════════════════════════════════════");
    println!("  bali-kbd - Aksara Bali keyboard");
    println!("═══════════════════════════════════════════════════");
    print_keys(&keyboard);
    print_text(&keyboard);

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(text) = line.strip_prefix(":type ") {
            keyboard.handle_composer(&ComposerEvent::Commit(text.to_string()));
            print_text(&keyboard);
            continue;
        }

        let mut tokens = line.split_whitespace();
        while let Some(token) = tokens.next() {
            match token {
                ":quit" | ":q" => {
                    let state = keyboard.detach();
                    println!("{}", state.text());
                    return Ok(());
                }
                ":keys" => print_keys(&keyboard),
                ":caret" => match tokens.next().map(str::parse::<usize>) {
                    Some(Ok(pos)) => keyboard.set_caret(Some(pos)),
                    _ => eprintln!("usage: :caret <n>"),
                },
                ":page" => match tokens.next() {
                    Some(page) => {
                        if keyboard.switch_page(page) == KeyResult::NotHandled {
                            eprintln!("no page '{}'", page);
                        }
                    }
                    None => eprintln!("usage: :page <name>"),
                },
                cell => {
                    if keyboard.tap(cell) == KeyResult::NotHandled {
                        eprintln!("no key '{}' on page '{}'", cell, keyboard.state().page());
                    }
                }
            }
        }
        print_text(&keyboard);
    }

    println!("{}", keyboard.detach().text());
    Ok(())
}

fn print_text(keyboard: &KeyboardController) {
    let context = keyboard.context();
    println!(
        "[{} {:?}] {}",
        context.page,
        context.shift,
        context.text_with_caret("|")
    );
}

fn print_keys(keyboard: &KeyboardController) {
    let context = keyboard.context();
    for row in &context.grid_areas {
        let mut seen = Vec::new();
        let cells: Vec<String> = row
            .split_whitespace()
            .filter(|cell| {
                if seen.contains(cell) {
                    false
                } else {
                    seen.push(*cell);
                    true
                }
            })
            .map(|cell| {
                let label = context.label(cell);
                if label.is_empty() {
                    format!("{}:·", cell)
                } else {
                    format!("{}:{}", cell, label)
                }
            })
            .collect();
        println!("  {}", cells.join("  "));
    }
    let _ = io::stdout().flush();
}
