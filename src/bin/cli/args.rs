//! CLI Argument Structures and Configuration
//!
//! This module contains the CLI argument definitions, command structures,
//! and the parsers for the per-category shortcut flags.

use clap::{Args, Parser, Subcommand, ValueEnum};
use sb3_scrambler::core::config::validation::MAX_CODE_POINT;
use sb3_scrambler::{CategoryOptions, SymbolCategory};
use std::path::PathBuf;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Identifier obfuscation for Scratch 3 projects
#[derive(Parser)]
#[command(name = "sb3-scrambler")]
#[command(version = VERSION)]
#[command(about = "Rename the identifiers of a Scratch 3 project without changing what it does")]
#[command(long_about = "
Rename variables, lists, sprites, costumes, sounds, backdrops and custom blocks
of a Scratch 3 (.sb3) project to generated names, rewriting every reference so
the project still runs the same.

Common Usage:

  # Obfuscate with a configuration file
  sb3-scrambler obfuscate game.sb3 game-obf.sb3 --config scrambler.yml

  # Quick run with shortcut flags
  sb3-scrambler obfuscate game.sb3 game-obf.sb3 --variables hex:8 --my-blocks unicode:6:0x4E00-0x9FFF --hex-integers

  # Start from the example configuration
  sb3-scrambler print-default-config > scrambler.yml
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Obfuscate a project
    Obfuscate(Box<ObfuscateArgs>),

    /// Print an example configuration in YAML format
    #[command(name = "print-default-config")]
    PrintDefaultConfig,

    /// Validate a configuration file
    #[command(name = "validate-config")]
    ValidateConfig(ValidateConfigArgs),
}

/// Per-category shortcut flags; each overrides the configuration file.
#[derive(Args, Default)]
pub struct CategoryFlags {
    /// Rename variables: hex[:LEN] or unicode:LEN:START-END
    #[arg(long, value_name = "STRATEGY", value_parser = parse_strategy)]
    pub variables: Option<CategoryOptions>,

    /// Rename lists
    #[arg(long, value_name = "STRATEGY", value_parser = parse_strategy)]
    pub lists: Option<CategoryOptions>,

    /// Rename sprites
    #[arg(long, value_name = "STRATEGY", value_parser = parse_strategy)]
    pub sprites: Option<CategoryOptions>,

    /// Rename sprite costumes
    #[arg(long, value_name = "STRATEGY", value_parser = parse_strategy)]
    pub costumes: Option<CategoryOptions>,

    /// Rename sounds
    #[arg(long, value_name = "STRATEGY", value_parser = parse_strategy)]
    pub sounds: Option<CategoryOptions>,

    /// Rename backdrops
    #[arg(long, value_name = "STRATEGY", value_parser = parse_strategy)]
    pub backdrops: Option<CategoryOptions>,

    /// Rename custom blocks
    #[arg(long = "my-blocks", value_name = "STRATEGY", value_parser = parse_strategy)]
    pub my_blocks: Option<CategoryOptions>,

    /// Rename custom block arguments
    #[arg(long, value_name = "STRATEGY", value_parser = parse_strategy)]
    pub arguments: Option<CategoryOptions>,
}

impl CategoryFlags {
    /// The flags that were given, paired with their category.
    pub fn overrides(&self) -> Vec<(SymbolCategory, CategoryOptions)> {
        [
            (SymbolCategory::Variable, &self.variables),
            (SymbolCategory::List, &self.lists),
            (SymbolCategory::Sprite, &self.sprites),
            (SymbolCategory::Costume, &self.costumes),
            (SymbolCategory::Sound, &self.sounds),
            (SymbolCategory::Backdrop, &self.backdrops),
            (SymbolCategory::CustomBlock, &self.my_blocks),
            (SymbolCategory::CustomBlockArgument, &self.arguments),
        ]
        .into_iter()
        .filter_map(|(category, options)| (*options).map(|o| (category, o)))
        .collect()
    }
}

#[derive(Args)]
pub struct ObfuscateArgs {
    /// Project to read (.sb3)
    pub input: PathBuf,

    /// Where to write the obfuscated project (.sb3)
    pub output: PathBuf,

    /// Configuration file (YAML or JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub categories: CategoryFlags,

    /// Rewrite integer literals as hexadecimal
    #[arg(long)]
    pub hex_integers: bool,

    /// Seed for reproducible names
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write the original → replacement mapping as JSON
    #[arg(long, value_name = "FILE")]
    pub mapping_out: Option<PathBuf>,

    /// Summary format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Args)]
pub struct ValidateConfigArgs {
    /// Configuration file to validate
    pub config: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// The full report as JSON
    Json,
}

/// Parse `hex`, `hex:LEN` or `unicode:LEN:START-END`.
pub fn parse_strategy(text: &str) -> Result<CategoryOptions, String> {
    let mut parts = text.split(':');
    let kind = parts.next().unwrap_or_default();
    let length = match parts.next() {
        Some(length) => length
            .parse::<usize>()
            .map_err(|_| format!("invalid name length '{length}'"))?,
        None => sb3_scrambler::core::config::DEFAULT_NAME_LENGTH,
    };

    let options = match kind {
        "hex" => {
            if parts.next().is_some() {
                return Err("hex takes no range".to_string());
            }
            CategoryOptions::hex(length)
        }
        "unicode" => {
            let range = parts
                .next()
                .ok_or_else(|| "unicode needs a range, e.g. unicode:8:0x4E00-0x9FFF".to_string())?;
            let (start, end) = range
                .split_once('-')
                .ok_or_else(|| format!("invalid range '{range}', expected START-END"))?;
            CategoryOptions::unicode(length, parse_code_point(start)?, parse_code_point(end)?)
        }
        other => return Err(format!("unknown strategy '{other}', expected hex or unicode")),
    };

    options
        .generation
        .validate("command line")
        .map_err(|e| e.to_string())?;
    Ok(options)
}

fn parse_code_point(text: &str) -> Result<u32, String> {
    let text = text.trim();
    let parsed = if let Some(hex) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .or_else(|| text.strip_prefix("U+"))
        .or_else(|| text.strip_prefix("u+"))
    {
        u32::from_str_radix(hex, 16)
    } else {
        text.parse::<u32>()
    };
    match parsed {
        Ok(value) if value <= MAX_CODE_POINT => Ok(value),
        _ => Err(format!("invalid code point '{text}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_strategies() {
        assert_eq!(parse_strategy("hex:8").unwrap(), CategoryOptions::hex(8));
        assert_eq!(
            parse_strategy("hex").unwrap(),
            CategoryOptions::hex(sb3_scrambler::core::config::DEFAULT_NAME_LENGTH)
        );
        assert_eq!(
            parse_strategy("unicode:4:0x41-U+5A").unwrap(),
            CategoryOptions::unicode(4, 0x41, 0x5A)
        );
        assert!(parse_strategy("hex:0").is_err());
        assert!(parse_strategy("base64:4").is_err());
        assert!(parse_strategy("unicode:4").is_err());
        assert!(parse_strategy("unicode:4:0x5A-0x41").is_err());
        assert!(parse_strategy("unicode:4:0xD800-0xDFFF").is_err());
    }
}
