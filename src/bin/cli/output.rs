//! Output Formatting and Display Functions
//!
//! Console rendering of obfuscation reports and configuration summaries.

use crate::cli::args::OutputFormat;
use owo_colors::OwoColorize;
use sb3_scrambler::{ObfuscationConfig, ObfuscationReport, SymbolCategory};
use tabled::{settings::Style as TableStyle, Table, Tabled};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Anomalies listed individually before the rest are summarized.
const MAX_LISTED_ANOMALIES: usize = 10;

#[derive(Tabled)]
struct CategoryRow {
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Renamed")]
    renamed: usize,
    #[tabled(rename = "Kept")]
    skipped: usize,
    #[tabled(rename = "Sites")]
    sites: usize,
    #[tabled(rename = "Unresolved")]
    unresolved: usize,
}

#[derive(Tabled)]
struct ConfigRow {
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Strategy")]
    strategy: String,
    #[tabled(rename = "Length")]
    length: usize,
    #[tabled(rename = "Scopes")]
    scopes: String,
}

/// Print the tool header.
pub fn print_header() {
    println!(
        "{} {}",
        "🔀".bright_cyan(),
        format!("sb3-scrambler v{}", VERSION).bright_cyan().bold()
    );
    println!();
}

/// Render a finished run.
pub fn display_report(report: &ObfuscationReport, format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    if report.categories.is_empty() {
        println!("{}", "ℹ️  No categories were renamed".dimmed());
    } else {
        let rows: Vec<CategoryRow> = report
            .categories
            .iter()
            .map(|c| CategoryRow {
                category: c.category.to_string(),
                renamed: c.renamed,
                skipped: c.skipped,
                sites: c.sites_rewritten,
                unresolved: c.unresolved,
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(TableStyle::rounded());
        println!("{}", table);
    }

    if report.integers_converted > 0 {
        println!(
            "{} {}",
            "🔢 Integer literals converted:".bright_blue(),
            report.integers_converted
        );
    }

    if !report.anomalies.is_empty() {
        println!();
        println!(
            "{} {}",
            "⚠️  Anomalies:".yellow().bold(),
            report.anomalies.len()
        );
        for anomaly in report.anomalies.iter().take(MAX_LISTED_ANOMALIES) {
            println!("   • {}", anomaly);
        }
        if report.anomalies.len() > MAX_LISTED_ANOMALIES {
            println!(
                "   {}",
                format!("… and {} more", report.anomalies.len() - MAX_LISTED_ANOMALIES).dimmed()
            );
        }
    }

    Ok(())
}

/// Summarize which categories a configuration renames.
pub fn display_config_summary(config: &ObfuscationConfig) {
    let rows: Vec<ConfigRow> = config
        .enabled_categories()
        .map(|(category, options)| ConfigRow {
            category: category.to_string(),
            strategy: options.generation.strategy.tag().to_string(),
            length: options.generation.name_length,
            scopes: scope_label(category, options.include_global, options.include_local),
        })
        .collect();

    if rows.is_empty() {
        println!("{}", "ℹ️  No categories enabled".dimmed());
    } else {
        let mut table = Table::new(rows);
        table.with(TableStyle::rounded());
        println!("{}", table);
    }

    println!(
        "   Integers to hexadecimal: {}",
        if config.convert_integers_to_hexadecimal {
            "yes".green().to_string()
        } else {
            "no".dimmed().to_string()
        }
    );
    if let Some(seed) = config.seed {
        println!("   Seed: {}", seed.to_string().cyan());
    }
}

fn scope_label(category: SymbolCategory, global: bool, local: bool) -> String {
    if !matches!(category, SymbolCategory::Variable | SymbolCategory::List) {
        return "all".to_string();
    }
    match (global, local) {
        (true, true) => "global + local",
        (true, false) => "global",
        (false, true) => "local",
        (false, false) => "none",
    }
    .to_string()
}
