//! Symbol categories, scopes and the per-invocation symbol table.

use std::collections::{HashMap, HashSet};
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::errors::Result;

/// A namespace of renamable identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolCategory {
    /// Stage (global) and sprite-local variables
    Variable,
    /// Stage (global) and sprite-local lists
    List,
    /// Sprite display names
    Sprite,
    /// Sprite costume names
    Costume,
    /// Sound names of every target
    Sound,
    /// Stage costume names
    Backdrop,
    /// Custom block ("my block") labels
    CustomBlock,
    /// Custom block argument names
    CustomBlockArgument,
}

impl SymbolCategory {
    /// Every category in the order the rewrite pass processes them.
    pub const ALL: [SymbolCategory; 8] = [
        SymbolCategory::Variable,
        SymbolCategory::List,
        SymbolCategory::Sprite,
        SymbolCategory::Costume,
        SymbolCategory::Sound,
        SymbolCategory::Backdrop,
        SymbolCategory::CustomBlock,
        SymbolCategory::CustomBlockArgument,
    ];

    /// Stem used to build option keys (`rename_<stem>`, `rename_<stem>_to`, `<stem>_name_length`).
    pub fn option_stem(self) -> &'static str {
        match self {
            Self::Variable => "variables",
            Self::List => "lists",
            Self::Sprite => "sprites",
            Self::Costume => "costumes",
            Self::Sound => "sounds",
            Self::Backdrop => "backdrops",
            Self::CustomBlock => "my_blocks",
            Self::CustomBlockArgument => "arguments_for_my_blocks",
        }
    }

    /// Name of the option group enabling this category.
    pub fn option_group(self) -> String {
        format!("rename_{}", self.option_stem())
    }

    /// Names the host runtime gives special meaning to; never generated.
    pub fn reserved_names(self) -> &'static [&'static str] {
        match self {
            Self::Sprite => &["Stage", "_mouse_", "_edge_", "_myself_", "_stage_", "_random_"],
            Self::Costume => &["next costume", "previous costume"],
            Self::Backdrop => &["next backdrop", "previous backdrop", "random backdrop"],
            _ => &[],
        }
    }
}

impl fmt::Display for SymbolCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Variable => "variable",
            Self::List => "list",
            Self::Sprite => "sprite",
            Self::Costume => "costume",
            Self::Sound => "sound",
            Self::Backdrop => "backdrop",
            Self::CustomBlock => "custom block",
            Self::CustomBlockArgument => "custom block argument",
        };
        f.write_str(label)
    }
}

/// The boundary within which replacement names must be unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Scope {
    /// Project level: stage variables and lists, the sprite namespace
    Global,
    /// One target (sprite or stage), by index into `targets`
    Target {
        /// Index into the manifest's `targets` array
        index: usize,
    },
    /// The arguments of one custom block
    Procedure {
        /// Index of the target owning the definition
        target: usize,
        /// Original signature of the custom block
        proccode: String,
    },
}

impl Scope {
    /// Shorthand for [`Scope::Target`].
    pub fn target(index: usize) -> Self {
        Self::Target { index }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => f.write_str("project"),
            Self::Target { index } => write!(f, "target #{index}"),
            Self::Procedure { target, proccode } => {
                write!(f, "custom block '{proccode}' of target #{target}")
            }
        }
    }
}

/// Identity of a symbol's defining occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeclarationKey {
    /// Namespace of the symbol
    pub category: SymbolCategory,
    /// Owning scope
    pub scope: Scope,
    /// Original name as declared
    pub name: String,
}

impl DeclarationKey {
    /// Build a key from its parts.
    pub fn new(category: SymbolCategory, scope: Scope, name: impl Into<String>) -> Self {
        Self {
            category,
            scope,
            name: name.into(),
        }
    }
}

impl fmt::Display for DeclarationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' in {}", self.category, self.name, self.scope)
    }
}

/// Per-invocation mapping from declaration keys to replacement names.
///
/// Within one `(category, scope)` all replacements are pairwise distinct.
/// Target scopes additionally avoid every name taken in the global scope of
/// the same category, and the global scope avoids every name taken anywhere
/// in its category, so a sprite-local symbol never shadows a global one.
#[derive(Debug, Default)]
pub struct SymbolTable {
    entries: IndexMap<DeclarationKey, String>,
    taken: HashMap<(SymbolCategory, Scope), HashSet<String>>,
}

impl SymbolTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the replacement for `key`, generating it on first use.
    ///
    /// `generate` receives a view of every name the new replacement must avoid.
    pub fn get_or_create<F>(&mut self, key: DeclarationKey, generate: F) -> Result<&str>
    where
        F: FnOnce(&TakenNames<'_>) -> Result<String>,
    {
        if !self.entries.contains_key(&key) {
            let name = generate(&self.excluded_for(key.category, &key.scope))?;
            self.mark_taken(key.category, &key.scope, name.clone());
            self.entries.insert(key.clone(), name);
        }
        Ok(self.entries[&key].as_str())
    }

    /// Mark a name as occupied in a scope without creating an entry.
    ///
    /// Used for declarations the configuration leaves untouched, so that
    /// generated names cannot collide with them.
    pub fn reserve(&mut self, category: SymbolCategory, scope: &Scope, name: impl Into<String>) {
        self.mark_taken(category, scope, name.into());
    }

    /// Look up the replacement assigned to `key`.
    pub fn lookup(&self, key: &DeclarationKey) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Number of assigned replacements.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no replacement has been assigned yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over assignments in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (&DeclarationKey, &str)> {
        self.entries.iter().map(|(key, name)| (key, name.as_str()))
    }

    /// Number of names already taken that a new key in `scope` must avoid.
    ///
    /// Reserved runtime names are not counted.
    pub fn occupied(&self, category: SymbolCategory, scope: &Scope) -> usize {
        let sets = self.visible_sets(category, scope);
        if sets.len() == 1 {
            return sets[0].len();
        }
        sets.iter()
            .flat_map(|names| names.iter().map(String::as_str))
            .collect::<HashSet<&str>>()
            .len()
    }

    fn mark_taken(&mut self, category: SymbolCategory, scope: &Scope, name: String) {
        self.taken
            .entry((category, scope.clone()))
            .or_default()
            .insert(name);
    }

    fn excluded_for(&self, category: SymbolCategory, scope: &Scope) -> TakenNames<'_> {
        TakenNames {
            sets: self.visible_sets(category, scope),
            reserved: category.reserved_names(),
        }
    }

    fn visible_sets(&self, category: SymbolCategory, scope: &Scope) -> Vec<&HashSet<String>> {
        match scope {
            Scope::Global => self
                .taken
                .iter()
                .filter(|((taken_category, _), _)| *taken_category == category)
                .map(|(_, names)| names)
                .collect(),
            Scope::Target { .. } => [scope, &Scope::Global]
                .into_iter()
                .filter_map(|visible| self.taken.get(&(category, visible.clone())))
                .collect(),
            Scope::Procedure { .. } => self
                .taken
                .get(&(category, scope.clone()))
                .into_iter()
                .collect(),
        }
    }
}

/// Names a new replacement must not take.
pub trait NameExclusions {
    /// Whether `name` is unavailable.
    fn excludes(&self, name: &str) -> bool;

    /// How many names are unavailable (may over-count overlapping scopes).
    fn excluded_count(&self) -> usize;
}

impl NameExclusions for HashSet<String> {
    fn excludes(&self, name: &str) -> bool {
        self.contains(name)
    }

    fn excluded_count(&self) -> usize {
        self.len()
    }
}

/// Borrowed view over the taken names visible from one scope, plus the
/// category's reserved runtime names.
#[derive(Debug)]
pub struct TakenNames<'t> {
    sets: Vec<&'t HashSet<String>>,
    reserved: &'static [&'static str],
}

impl TakenNames<'_> {
    /// Whether `name` is taken or reserved.
    pub fn contains(&self, name: &str) -> bool {
        self.reserved.contains(&name) || self.sets.iter().any(|names| names.contains(name))
    }
}

impl NameExclusions for TakenNames<'_> {
    fn excludes(&self, name: &str) -> bool {
        self.contains(name)
    }

    fn excluded_count(&self) -> usize {
        self.reserved.len() + self.sets.iter().map(|names| names.len()).sum::<usize>()
    }
}
