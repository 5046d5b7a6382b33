//! Obfuscation results and reporting structures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::symbols::{DeclarationKey, Scope, SymbolCategory};

/// Outcome of one engine invocation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObfuscationReport {
    /// Wall-clock time spent processing the manifest
    pub elapsed: Duration,

    /// One entry per category that was enabled, in processing order
    pub categories: Vec<CategoryReport>,

    /// Number of integer literals rewritten to hexadecimal
    pub integers_converted: usize,

    /// Non-fatal structural findings
    pub anomalies: Vec<Anomaly>,
}

impl ObfuscationReport {
    /// Elapsed time in fractional seconds.
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// Report for one category, if it ran.
    pub fn category(&self, category: SymbolCategory) -> Option<&CategoryReport> {
        self.categories.iter().find(|c| c.category == category)
    }

    /// Total number of declarations renamed across all categories.
    pub fn total_renamed(&self) -> usize {
        self.categories.iter().map(|c| c.renamed).sum()
    }

    /// Every rename performed, in processing order.
    pub fn renames(&self) -> impl Iterator<Item = &RenameRecord> {
        self.categories.iter().flat_map(|c| c.renames.iter())
    }
}

/// Per-category statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryReport {
    /// Category processed
    pub category: SymbolCategory,

    /// Distinct declarations that received a new name
    pub renamed: usize,

    /// Declarations left alone by the scope switches
    pub skipped: usize,

    /// Reference sites rewritten, declaration sites included
    pub sites_rewritten: usize,

    /// Reference sites that resolved to no declaration
    pub unresolved: usize,

    /// The mapping applied, in assignment order
    pub renames: Vec<RenameRecord>,
}

impl CategoryReport {
    /// Empty report for a category.
    pub fn new(category: SymbolCategory) -> Self {
        Self {
            category,
            renamed: 0,
            skipped: 0,
            sites_rewritten: 0,
            unresolved: 0,
            renames: Vec::new(),
        }
    }
}

/// One original → replacement assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameRecord {
    /// Category of the symbol
    pub category: SymbolCategory,

    /// Scope the symbol is declared in
    pub scope: Scope,

    /// Name before obfuscation
    pub original: String,

    /// Name after obfuscation
    pub replacement: String,
}

impl RenameRecord {
    /// Build a record from a table entry.
    pub fn new(key: &DeclarationKey, replacement: impl Into<String>) -> Self {
        Self {
            category: key.category,
            scope: key.scope.clone(),
            original: key.name.clone(),
            replacement: replacement.into(),
        }
    }
}

/// A non-fatal structural finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    /// A reference site whose name matches no declaration; left unchanged
    UnresolvedReference {
        /// Category the site belongs to
        category: SymbolCategory,
        /// JSON pointer of the site
        pointer: String,
        /// Name found at the site
        name: String,
    },

    /// A node missing a shape the walker requires; skipped
    MalformedNode {
        /// JSON pointer of the node
        pointer: String,
        /// What the walker expected to find
        expected: String,
    },
}

impl Anomaly {
    /// Shorthand for [`Anomaly::UnresolvedReference`].
    pub fn unresolved(
        category: SymbolCategory,
        pointer: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::UnresolvedReference {
            category,
            pointer: pointer.into(),
            name: name.into(),
        }
    }

    /// Shorthand for [`Anomaly::MalformedNode`].
    pub fn malformed(pointer: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::MalformedNode {
            pointer: pointer.into(),
            expected: expected.into(),
        }
    }

    /// JSON pointer the anomaly refers to.
    pub fn pointer(&self) -> &str {
        match self {
            Self::UnresolvedReference { pointer, .. } | Self::MalformedNode { pointer, .. } => {
                pointer
            }
        }
    }
}

impl std::fmt::Display for Anomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnresolvedReference {
                category,
                pointer,
                name,
            } => write!(f, "unresolved {category} reference '{name}' at {pointer}"),
            Self::MalformedNode { pointer, expected } => {
                write!(f, "malformed node at {pointer}: expected {expected}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_accessors() {
        let mut variables = CategoryReport::new(SymbolCategory::Variable);
        variables.renamed = 2;
        variables.renames.push(RenameRecord::new(
            &DeclarationKey::new(SymbolCategory::Variable, Scope::Global, "score"),
            "ab12",
        ));
        let mut sounds = CategoryReport::new(SymbolCategory::Sound);
        sounds.renamed = 3;

        let report = ObfuscationReport {
            elapsed: Duration::from_millis(1500),
            categories: vec![variables, sounds],
            integers_converted: 0,
            anomalies: Vec::new(),
        };

        assert_eq!(report.elapsed_seconds(), 1.5);
        assert_eq!(report.total_renamed(), 5);
        assert!(report.category(SymbolCategory::Sound).is_some());
        assert!(report.category(SymbolCategory::List).is_none());
        assert_eq!(report.renames().count(), 1);
    }

    #[test]
    fn test_anomaly_display_and_serde() {
        let anomaly = Anomaly::unresolved(SymbolCategory::Costume, "/targets/1/blocks/x", "ghost");
        assert_eq!(anomaly.pointer(), "/targets/1/blocks/x");
        assert!(anomaly.to_string().contains("unresolved costume reference 'ghost'"));

        let json = serde_json::to_value(&anomaly).unwrap();
        assert_eq!(json["kind"], "unresolved_reference");
        assert_eq!(json["category"], "costume");
    }
}
