//! Configuration types and management for sb3-scrambler.
//!
//! The options dictionary accepted by the tool is free-form on the wire
//! (`{"rename_variables": {"rename_variables_to": "random_hex", ...}}`), but
//! is parsed here into explicit structured types. Parsing is strict: unknown
//! keys, mistyped values and inconsistent parameters are rejected with
//! [`ScramblerError::Config`] before any manifest is touched.

pub mod validation;

use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::core::errors::{Result, ScramblerError};
use crate::core::symbols::SymbolCategory;
use crate::rename::generator;

pub use validation::{
    validate_code_point, validate_ordered_range, validate_positive_usize, MAX_CODE_POINT,
};

/// Name length used when a group does not specify one.
pub const DEFAULT_NAME_LENGTH: usize = 10;

/// Top-level option keys other than the per-category groups.
const CONVERT_INTEGERS_KEY: &str = "convert_integers_to_hexadecimal";
const SEED_KEY: &str = "seed";

/// How replacement names are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameStrategy {
    /// Lowercase hexadecimal digits
    RandomHex,
    /// Code points drawn from an inclusive range
    RandomUnicodeCharRange {
        /// First code point of the range
        range_start: u32,
        /// Last code point of the range (inclusive)
        range_end: u32,
    },
}

impl NameStrategy {
    /// Wire tag of the strategy.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::RandomHex => "random_hex",
            Self::RandomUnicodeCharRange { .. } => "random_unicode_char_range",
        }
    }
}

/// Strategy plus its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationSpec {
    /// Generation strategy
    pub strategy: NameStrategy,
    /// Number of characters (hex digits or code points) per name
    pub name_length: usize,
}

impl GenerationSpec {
    /// Validate the spec, reporting problems against `group`.
    pub fn validate(&self, group: &str) -> Result<()> {
        validate_positive_usize(self.name_length, &format!("{group}.name_length"))?;

        if let NameStrategy::RandomUnicodeCharRange {
            range_start,
            range_end,
        } = self.strategy
        {
            let field = format!("{group}.range");
            validate_code_point(range_start, &format!("{group}.range_start"))?;
            validate_code_point(range_end, &format!("{group}.range_end"))?;
            validate_ordered_range(range_start, range_end, &field)?;
            if generator::usable_code_points(range_start, range_end) == 0 {
                return Err(ScramblerError::config_field(
                    format!(
                        "range U+{:X}..=U+{:X} contains no usable code points",
                        range_start, range_end
                    ),
                    field,
                ));
            }
        }

        Ok(())
    }
}

/// Options for one renamed category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryOptions {
    /// How replacement names are generated
    pub generation: GenerationSpec,
    /// Rename project-level (stage) declarations; variables and lists only
    pub include_global: bool,
    /// Rename sprite-local declarations; variables and lists only
    pub include_local: bool,
}

impl CategoryOptions {
    /// Random hexadecimal names of the given length.
    pub fn hex(name_length: usize) -> Self {
        Self::with_strategy(NameStrategy::RandomHex, name_length)
    }

    /// Random names drawn from an inclusive code-point range.
    pub fn unicode(name_length: usize, range_start: u32, range_end: u32) -> Self {
        Self::with_strategy(
            NameStrategy::RandomUnicodeCharRange {
                range_start,
                range_end,
            },
            name_length,
        )
    }

    fn with_strategy(strategy: NameStrategy, name_length: usize) -> Self {
        Self {
            generation: GenerationSpec {
                strategy,
                name_length,
            },
            include_global: true,
            include_local: true,
        }
    }

    /// Restrict renaming to project-level declarations
    pub fn globals_only(mut self) -> Self {
        self.include_global = true;
        self.include_local = false;
        self
    }

    /// Restrict renaming to sprite-local declarations
    pub fn locals_only(mut self) -> Self {
        self.include_global = false;
        self.include_local = true;
        self
    }

    /// Parse one option group.
    fn from_group(category: SymbolCategory, group: &Map<String, Value>) -> Result<Self> {
        let stem = category.option_stem();
        let group_name = category.option_group();
        let strategy_key = format!("rename_{stem}_to");
        let length_key = format!("{stem}_name_length");
        // The singular spelling is what earlier releases actually read.
        let length_alias = format!("{}_name_length", stem.strip_suffix('s').unwrap_or(stem));
        let public_key = format!("rename_public_{stem}");
        let private_key = format!("rename_private_{stem}");
        let scoped = matches!(category, SymbolCategory::Variable | SymbolCategory::List);

        for key in group.keys() {
            let known = *key == strategy_key
                || *key == length_key
                || *key == length_alias
                || key == "range_start"
                || key == "range_end"
                || (scoped && (*key == public_key || *key == private_key));
            if !known {
                return Err(ScramblerError::config_field(
                    format!("Unknown option '{key}' in {group_name}"),
                    format!("{group_name}.{key}"),
                ));
            }
        }

        let tag = match group.get(&strategy_key) {
            None | Some(Value::Null) => {
                return Err(ScramblerError::config_field(
                    format!("{strategy_key} cannot be null"),
                    format!("{group_name}.{strategy_key}"),
                ))
            }
            Some(Value::String(tag)) => tag.as_str(),
            Some(other) => {
                return Err(ScramblerError::config_field(
                    format!("{strategy_key} must be a string, got {other}"),
                    format!("{group_name}.{strategy_key}"),
                ))
            }
        };

        let name_length = match group.get(&length_key).or_else(|| group.get(&length_alias)) {
            None => DEFAULT_NAME_LENGTH,
            Some(value) => value
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| {
                    ScramblerError::config_field(
                        format!("{length_key} must be a positive integer, got {value}"),
                        format!("{group_name}.{length_key}"),
                    )
                })?,
        };

        let range_start = group
            .get("range_start")
            .map(|v| parse_code_point(v, &format!("{group_name}.range_start")))
            .transpose()?;
        let range_end = group
            .get("range_end")
            .map(|v| parse_code_point(v, &format!("{group_name}.range_end")))
            .transpose()?;

        let strategy = match tag {
            "random_hex" => {
                if range_start.is_some() || range_end.is_some() {
                    return Err(ScramblerError::config_field(
                        "range_start and range_end only apply to random_unicode_char_range",
                        format!("{group_name}.range_start"),
                    ));
                }
                NameStrategy::RandomHex
            }
            "random_unicode_char_range" => match (range_start, range_end) {
                (Some(range_start), Some(range_end)) => NameStrategy::RandomUnicodeCharRange {
                    range_start,
                    range_end,
                },
                _ => {
                    return Err(ScramblerError::config_field(
                        "random_unicode_char_range requires both range_start and range_end",
                        format!("{group_name}.range"),
                    ))
                }
            },
            other => {
                return Err(ScramblerError::config_field(
                    format!(
                        "Unknown strategy '{other}', expected random_hex or random_unicode_char_range"
                    ),
                    format!("{group_name}.{strategy_key}"),
                ))
            }
        };

        let include_global = parse_bool(group.get(&public_key), &public_key, &group_name)?;
        let include_local = parse_bool(group.get(&private_key), &private_key, &group_name)?;

        let options = Self {
            generation: GenerationSpec {
                strategy,
                name_length,
            },
            include_global,
            include_local,
        };
        options.generation.validate(&group_name)?;
        Ok(options)
    }

    /// Render the group in wire form.
    fn to_group(&self, category: SymbolCategory) -> Map<String, Value> {
        let stem = category.option_stem();
        let mut group = Map::new();
        group.insert(
            format!("rename_{stem}_to"),
            Value::from(self.generation.strategy.tag()),
        );
        group.insert(
            format!("{stem}_name_length"),
            Value::from(self.generation.name_length),
        );
        if let NameStrategy::RandomUnicodeCharRange {
            range_start,
            range_end,
        } = self.generation.strategy
        {
            group.insert("range_start".to_string(), Value::from(range_start));
            group.insert("range_end".to_string(), Value::from(range_end));
        }
        if matches!(category, SymbolCategory::Variable | SymbolCategory::List) {
            if !self.include_global {
                group.insert(format!("rename_public_{stem}"), Value::Bool(false));
            }
            if !self.include_local {
                group.insert(format!("rename_private_{stem}"), Value::Bool(false));
            }
        }
        group
    }
}

/// Structured obfuscation configuration.
///
/// Every category is independently optional; `None` leaves the category
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObfuscationConfig {
    /// Variable renaming options
    pub rename_variables: Option<CategoryOptions>,
    /// List renaming options
    pub rename_lists: Option<CategoryOptions>,
    /// Sprite renaming options
    pub rename_sprites: Option<CategoryOptions>,
    /// Costume renaming options
    pub rename_costumes: Option<CategoryOptions>,
    /// Sound renaming options
    pub rename_sounds: Option<CategoryOptions>,
    /// Backdrop renaming options
    pub rename_backdrops: Option<CategoryOptions>,
    /// Custom block renaming options
    pub rename_my_blocks: Option<CategoryOptions>,
    /// Custom block argument renaming options
    pub rename_arguments_for_my_blocks: Option<CategoryOptions>,
    /// Rewrite integer literals as hexadecimal
    pub convert_integers_to_hexadecimal: bool,
    /// Seed for deterministic name generation
    pub seed: Option<u64>,
}

impl ObfuscationConfig {
    /// Create an empty configuration (nothing enabled)
    pub fn new() -> Self {
        Self::default()
    }

    /// The configuration shipped as an example by the CLI.
    pub fn example() -> Self {
        Self::new()
            .with_category(SymbolCategory::Variable, CategoryOptions::hex(8))
            .with_category(
                SymbolCategory::List,
                CategoryOptions::unicode(10, 0x4E00, 0x9FFF),
            )
            .with_category(SymbolCategory::Sprite, CategoryOptions::hex(6))
            .with_category(
                SymbolCategory::CustomBlock,
                CategoryOptions::unicode(8, 0xE000, 0xF8FF),
            )
            .with_integer_conversion(true)
    }

    /// Enable a category with the given options
    pub fn with_category(mut self, category: SymbolCategory, options: CategoryOptions) -> Self {
        *self.slot_mut(category) = Some(options);
        self
    }

    /// Disable a category
    pub fn without_category(mut self, category: SymbolCategory) -> Self {
        *self.slot_mut(category) = None;
        self
    }

    /// Enable or disable the integer transform
    pub fn with_integer_conversion(mut self, enabled: bool) -> Self {
        self.convert_integers_to_hexadecimal = enabled;
        self
    }

    /// Fix the random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Options for a category, if enabled.
    pub fn options_for(&self, category: SymbolCategory) -> Option<&CategoryOptions> {
        match category {
            SymbolCategory::Variable => self.rename_variables.as_ref(),
            SymbolCategory::List => self.rename_lists.as_ref(),
            SymbolCategory::Sprite => self.rename_sprites.as_ref(),
            SymbolCategory::Costume => self.rename_costumes.as_ref(),
            SymbolCategory::Sound => self.rename_sounds.as_ref(),
            SymbolCategory::Backdrop => self.rename_backdrops.as_ref(),
            SymbolCategory::CustomBlock => self.rename_my_blocks.as_ref(),
            SymbolCategory::CustomBlockArgument => self.rename_arguments_for_my_blocks.as_ref(),
        }
    }

    fn slot_mut(&mut self, category: SymbolCategory) -> &mut Option<CategoryOptions> {
        match category {
            SymbolCategory::Variable => &mut self.rename_variables,
            SymbolCategory::List => &mut self.rename_lists,
            SymbolCategory::Sprite => &mut self.rename_sprites,
            SymbolCategory::Costume => &mut self.rename_costumes,
            SymbolCategory::Sound => &mut self.rename_sounds,
            SymbolCategory::Backdrop => &mut self.rename_backdrops,
            SymbolCategory::CustomBlock => &mut self.rename_my_blocks,
            SymbolCategory::CustomBlockArgument => &mut self.rename_arguments_for_my_blocks,
        }
    }

    /// Enabled categories in processing order.
    pub fn enabled_categories(&self) -> impl Iterator<Item = (SymbolCategory, &CategoryOptions)> {
        SymbolCategory::ALL
            .into_iter()
            .filter_map(move |category| self.options_for(category).map(|o| (category, o)))
    }

    /// Whether the configuration would change anything at all.
    pub fn is_noop(&self) -> bool {
        self.enabled_categories().next().is_none() && !self.convert_integers_to_hexadecimal
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        for (category, options) in self.enabled_categories() {
            options.generation.validate(&category.option_group())?;
        }
        Ok(())
    }

    /// Parse the options dictionary.
    pub fn from_value(value: &Value) -> Result<Self> {
        let root = value.as_object().ok_or_else(|| {
            ScramblerError::config(format!("options must be a mapping, got {value}"))
        })?;

        let mut config = Self::new();
        for (key, value) in root {
            if let Some(category) = SymbolCategory::ALL
                .into_iter()
                .find(|c| c.option_group() == *key)
            {
                match value {
                    Value::Null => {}
                    Value::Object(group) => {
                        *config.slot_mut(category) = Some(CategoryOptions::from_group(category, group)?);
                    }
                    other => {
                        return Err(ScramblerError::config_field(
                            format!("{key} must be a mapping, got {other}"),
                            key.clone(),
                        ))
                    }
                }
            } else if key == CONVERT_INTEGERS_KEY {
                config.convert_integers_to_hexadecimal = value.as_bool().ok_or_else(|| {
                    ScramblerError::config_field(
                        format!("{CONVERT_INTEGERS_KEY} must be a boolean, got {value}"),
                        CONVERT_INTEGERS_KEY,
                    )
                })?;
            } else if key == SEED_KEY {
                config.seed = match value {
                    Value::Null => None,
                    other => Some(other.as_u64().ok_or_else(|| {
                        ScramblerError::config_field(
                            format!("seed must be a non-negative integer, got {other}"),
                            SEED_KEY,
                        )
                    })?),
                };
            } else {
                return Err(ScramblerError::config_field(
                    format!("Unknown option encountered: {key}"),
                    key.clone(),
                ));
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Render the options dictionary.
    pub fn to_value(&self) -> Value {
        let mut root = Map::new();
        for (category, options) in self.enabled_categories() {
            root.insert(category.option_group(), Value::Object(options.to_group(category)));
        }
        if self.convert_integers_to_hexadecimal {
            root.insert(CONVERT_INTEGERS_KEY.to_string(), Value::Bool(true));
        }
        if let Some(seed) = self.seed {
            root.insert(SEED_KEY.to_string(), Value::from(seed));
        }
        Value::Object(root)
    }

    /// Parse a JSON options document
    pub fn from_json_str(content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content)?;
        Self::from_value(&value)
    }

    /// Parse a YAML options document
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(content)?;
        Self::from_value(&value)
    }

    /// Load configuration from a YAML or JSON file (chosen by extension)
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| {
            ScramblerError::io(format!("Failed to read config file: {}", path.display()), e)
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_yaml_str(&content),
        }
    }

    /// Save configuration to a YAML file
    pub fn to_yaml_file(&self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        let content = serde_yaml::to_string(&self.to_value())?;
        std::fs::write(&path, content).map_err(|e| {
            ScramblerError::io(
                format!("Failed to write config file: {}", path.display()),
                e,
            )
        })
    }
}

impl Serialize for ObfuscationConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ObfuscationConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value).map_err(serde::de::Error::custom)
    }
}

/// Accepts an integer, or a string written as `0x4E00`, `U+4E00` or decimal.
fn parse_code_point(value: &Value, field: &str) -> Result<u32> {
    let parsed = match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => {
            let s = s.trim();
            let hex = s
                .strip_prefix("0x")
                .or_else(|| s.strip_prefix("0X"))
                .or_else(|| s.strip_prefix("U+"))
                .or_else(|| s.strip_prefix("u+"));
            match hex {
                Some(digits) => u32::from_str_radix(digits, 16).ok(),
                None => s.parse::<u32>().ok(),
            }
        }
        _ => None,
    };

    parsed.ok_or_else(|| {
        ScramblerError::config_field(
            format!("{field} must be an integer code point, got {value}"),
            field,
        )
    })
}

fn parse_bool(value: Option<&Value>, key: &str, group: &str) -> Result<bool> {
    match value {
        None => Ok(true),
        Some(Value::Bool(flag)) => Ok(*flag),
        Some(other) => Err(ScramblerError::config_field(
            format!("{key} must be a boolean, got {other}"),
            format!("{group}.{key}"),
        )),
    }
}
