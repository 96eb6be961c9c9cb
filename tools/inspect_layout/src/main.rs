//! Validate a keyboard layout and show how its keys resolve
//!
//! Usage:
//!   cargo run -p inspect_layout -- --layout my-layout.toml
//!   cargo run -p inspect_layout -- --prefix "ᬓ" --shift
//!   cargo run -p inspect_layout -- --page numbers --format json

use std::path::PathBuf;
use std::sync::Arc;

use aksara_core::{resolver, CellKind, LayoutPage, ScriptLayout, ShiftLevel};
use clap::Parser;
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "inspect_layout")]
#[command(about = "Validate a keyboard layout and print resolved key bindings")]
struct Args {
    /// Layout file (TOML or JSON); defaults to the built-in Balinese layout
    #[arg(short, long)]
    layout: Option<PathBuf>,

    /// Page to resolve (all pages if omitted)
    #[arg(short, long)]
    page: Option<String>,

    /// Text before the caret
    #[arg(long, default_value = "")]
    prefix: String,

    /// Resolve at shift level 1
    #[arg(long)]
    shift: bool,

    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Fail if the layout has any diagnostics
    #[arg(long)]
    strict: bool,
}

#[derive(Debug, Serialize)]
struct CellReport {
    cell: String,
    kind: String,
    enabled: bool,
    rule: Option<usize>,
    context: Option<String>,
    glyph: Option<String>,
    label: Option<String>,
}

#[derive(Debug, Serialize)]
struct PageReport {
    page: String,
    rows: usize,
    columns: usize,
    cells: Vec<CellReport>,
}

#[derive(Debug, Serialize)]
struct Report {
    script: String,
    prefix: String,
    shift: ShiftLevel,
    diagnostics: Vec<String>,
    pages: Vec<PageReport>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let layout: Arc<ScriptLayout> = match &args.layout {
        Some(path) => Arc::new(ScriptLayout::load(path)?),
        None => libbali::bali_layout()?,
    };
    let shift = if args.shift { ShiftLevel::Shifted } else { ShiftLevel::Base };

    let pages: Vec<&LayoutPage> = match &args.page {
        Some(name) => match layout.page(name) {
            Some(page) => vec![page],
            None => anyhow::bail!("Layout '{}' has no page '{}'", layout.script(), name),
        },
        None => layout.pages().iter().collect(),
    };

    let report = Report {
        script: layout.script().to_string(),
        prefix: args.prefix.clone(),
        shift,
        diagnostics: layout.diagnostics().iter().map(|issue| issue.to_string()).collect(),
        pages: pages
            .into_iter()
            .map(|page| page_report(page, &args.prefix, shift))
            .collect(),
    };

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        "text" => print_text(&report),
        _ => anyhow::bail!("Unsupported format: {}. Use 'text' or 'json'", args.format),
    }

    if args.strict && !report.diagnostics.is_empty() {
        anyhow::bail!("{} layout issue(s)", report.diagnostics.len());
    }
    Ok(())
}

fn page_report(page: &LayoutPage, prefix: &str, shift: ShiftLevel) -> PageReport {
    let bindings = resolver::resolve(page, prefix, shift);
    let cells = page
        .cells()
        .iter()
        .map(|cell| {
            let kind = match &cell.kind {
                CellKind::Special(key) => format!("special:{}", key.name()),
                CellKind::Glyph { class, slot } => format!("{}[{}]", class, slot),
            };
            let binding = bindings.get(&cell.name);
            CellReport {
                cell: cell.name.clone(),
                kind,
                enabled: binding.is_some() || cell.special().is_some(),
                rule: binding.map(|b| b.rule),
                context: binding.map(|b| b.context.clone()),
                glyph: binding.map(|b| b.glyph.escape_default().to_string()),
                label: binding.map(|b| b.label()),
            }
        })
        .collect();

    PageReport {
        page: page.name().to_string(),
        rows: page.grid().row_count(),
        columns: page.grid().column_count(),
        cells,
    }
}

fn print_text(report: &Report) {
    println!("Layout '{}'  prefix={:?}  shift={:?}", report.script, report.prefix, report.shift);
    if report.diagnostics.is_empty() {
        println!("✓ No layout issues");
    } else {
        println!("⚠ {} layout issue(s):", report.diagnostics.len());
        for issue in &report.diagnostics {
            println!("  - {}", issue);
        }
    }

    for page in &report.pages {
        println!();
        println!("Page '{}' ({}x{})", page.page, page.rows, page.columns);
        for cell in &page.cells {
            match (&cell.label, cell.rule) {
                (Some(label), Some(rule)) => println!(
                    "  {:<12} {:<14} rule {} -> {} ({})",
                    cell.cell,
                    cell.kind,
                    rule,
                    label,
                    cell.glyph.as_deref().unwrap_or("")
                ),
                _ if cell.enabled => println!("  {:<12} {}", cell.cell, cell.kind),
                _ => println!("  {:<12} {:<14} disabled", cell.cell, cell.kind),
            }
        }
    }
}
