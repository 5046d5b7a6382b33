//! Command Execution Logic
//!
//! Runs the obfuscation pipeline and the configuration helpers behind each
//! subcommand.

use crate::cli::args::*;
use crate::cli::output::*;
use anyhow::Context;
use owo_colors::OwoColorize;
use sb3_scrambler::api::results::RenameRecord;
use sb3_scrambler::io::package::load_project;
use sb3_scrambler::{ObfuscationConfig, ScramblerEngine};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Main obfuscate command implementation
pub fn obfuscate_command(args: ObfuscateArgs) -> anyhow::Result<()> {
    let quiet = args.format == OutputFormat::Json;
    if !quiet {
        print_header();
    }

    let config = build_config(&args, quiet)?;
    if config.is_noop() {
        warn!("Configuration enables nothing; the project will be copied unchanged");
    }

    let started = Instant::now();
    let mut package = load_project(&args.input)
        .with_context(|| format!("Failed to load {}", args.input.display()))?;

    let mut engine = ScramblerEngine::new(config)?;
    let mut report = engine.run(package.manifest_mut())?;

    package
        .save(&args.output)
        .with_context(|| format!("Failed to save {}", args.output.display()))?;
    report.elapsed = started.elapsed();
    info!("Wrote {}", args.output.display());

    if let Some(mapping_path) = &args.mapping_out {
        write_mapping(mapping_path, report.renames())?;
        if !quiet {
            println!(
                "{} {}",
                "🗺️  Mapping written to".green(),
                mapping_path.display().to_string().cyan()
            );
        }
    }

    if !quiet {
        println!(
            "{}",
            format!("Obfuscation completed in {:.2} seconds.", report.elapsed_seconds())
                .bright_green()
                .bold()
        );
        println!();
    }
    display_report(&report, args.format)
}

/// Merge the configuration file (if any) with the shortcut flags.
fn build_config(args: &ObfuscateArgs, quiet: bool) -> anyhow::Result<ObfuscationConfig> {
    let mut config = match &args.config {
        Some(path) => {
            if !quiet {
                println!(
                    "{} {}",
                    "✅ Loading configuration from".green(),
                    path.display().to_string().cyan()
                );
            }
            ObfuscationConfig::from_file(path)?
        }
        None => ObfuscationConfig::new(),
    };

    for (category, options) in args.categories.overrides() {
        config = config.with_category(category, options);
    }
    if args.hex_integers {
        config = config.with_integer_conversion(true);
    }
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    config.validate()?;

    if !quiet {
        display_config_summary(&config);
        println!();
    }
    Ok(config)
}

fn write_mapping<'a>(
    path: &Path,
    renames: impl Iterator<Item = &'a RenameRecord>,
) -> anyhow::Result<()> {
    let records: Vec<&RenameRecord> = renames.collect();
    let json = serde_json::to_string_pretty(&records)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write mapping to {}", path.display()))?;
    Ok(())
}

/// Print the example configuration as YAML
pub fn print_default_config() -> anyhow::Result<()> {
    println!("{}", "# Example sb3-scrambler configuration".dimmed());
    println!("{}", "# Save this to a file and customize as needed".dimmed());
    println!(
        "{}",
        "# Usage: sb3-scrambler obfuscate in.sb3 out.sb3 --config your-config.yml".dimmed()
    );
    println!();

    let config = ObfuscationConfig::example();
    let yaml_output = serde_yaml::to_string(&config.to_value())?;
    println!("{}", yaml_output);

    Ok(())
}

/// Validate a configuration file
pub fn validate_config(args: ValidateConfigArgs) -> anyhow::Result<()> {
    println!(
        "{} {}",
        "🔍 Validating configuration:".bright_blue().bold(),
        args.config.display().to_string().cyan()
    );
    println!();

    let config = match ObfuscationConfig::from_file(&args.config) {
        Ok(config) => {
            println!("{}", "✅ Configuration file is valid!".bright_green().bold());
            println!();
            config
        }
        Err(e) => {
            eprintln!("{} {}", "❌ Configuration validation failed:".red(), e);
            println!();
            println!("{}", "🔧 Common issues:".bright_blue().bold());
            println!("   • Strategy must be random_hex or random_unicode_char_range");
            println!("   • Unicode ranges need both start and end, with start <= end");
            println!("   • Option names must match a known category");
            println!();
            println!(
                "{}",
                "💡 Tip: Use 'sb3-scrambler print-default-config' to see valid format".dimmed()
            );
            std::process::exit(1);
        }
    };

    display_config_summary(&config);
    Ok(())
}
