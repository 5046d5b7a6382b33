//! The per-category rewrite pass.
//!
//! For one category the pass collects declarations, checks that every scope
//! has room for the names it needs, assigns replacements through the symbol
//! table, resolves every reference against the untouched graph and only then
//! rewrites declaration and reference sites in place.

use rand::Rng;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::api::results::{Anomaly, CategoryReport, RenameRecord};
use crate::core::config::CategoryOptions;
use crate::core::errors::Result;
use crate::core::manifest::{ManifestGraph, CLOUD_PREFIX};
use crate::core::symbols::{SymbolCategory, SymbolTable};
use crate::rename::generator::NameGenerator;
use crate::rename::proccode;
use crate::rename::walker::{
    collect_declarations, collect_references, keys_per_scope, parse_argument_names, ScopeFilter,
    Site, SiteKind,
};

/// Renames categories of one manifest, sharing a symbol table between them.
pub struct RewritePass<'g, R: Rng> {
    generator: &'g mut NameGenerator<R>,
    table: SymbolTable,
    anomalies: Vec<Anomaly>,
}

impl<'g, R: Rng> RewritePass<'g, R> {
    /// Start a pass with a fresh symbol table.
    pub fn new(generator: &'g mut NameGenerator<R>) -> Self {
        Self {
            generator,
            table: SymbolTable::new(),
            anomalies: Vec::new(),
        }
    }

    /// Assignments made so far.
    pub fn table(&self) -> &SymbolTable {
        &self.table
    }

    /// Anomalies met so far.
    pub fn anomalies(&self) -> &[Anomaly] {
        &self.anomalies
    }

    /// Finish the pass, handing back the anomalies.
    pub fn into_anomalies(self) -> Vec<Anomaly> {
        self.anomalies
    }

    /// Rename every selected symbol of `category` and rewrite its sites.
    ///
    /// Fails with `GenerationExhausted` before touching the graph when a
    /// scope needs more names than the strategy can produce.
    pub fn run_category(
        &mut self,
        graph: &mut ManifestGraph,
        category: SymbolCategory,
        options: &CategoryOptions,
    ) -> Result<CategoryReport> {
        info!("Renaming {} symbols", category);
        let mut report = CategoryReport::new(category);
        let spec = &options.generation;

        let declarations = collect_declarations(graph, category, &ScopeFilter::from(options));
        self.absorb(declarations.anomalies);

        for declaration in declarations.items.iter().filter(|d| !d.selected) {
            self.table
                .reserve(category, &declaration.key.scope, declaration.key.name.clone());
            report.skipped += 1;
        }

        for (scope, keys) in keys_per_scope(&declarations.items) {
            let required = keys.len() + self.table.occupied(category, &scope);
            self.generator
                .ensure_capacity(category, &scope, spec, required)?;
        }

        for declaration in declarations.items.iter().filter(|d| d.selected) {
            if self.table.lookup(&declaration.key).is_some() {
                continue;
            }
            let generator = &mut *self.generator;
            let scope = &declaration.key.scope;
            let replacement = self
                .table
                .get_or_create(declaration.key.clone(), |excluded| {
                    generator.generate(category, scope, spec, excluded)
                })?
                .to_string();
            debug!("{} -> '{}'", declaration.key, replacement);
            report
                .renames
                .push(RenameRecord::new(&declaration.key, replacement));
            report.renamed += 1;
        }

        // References resolve against the original names, so they are found
        // before any site is written.
        let references = collect_references(graph, category);
        self.absorb(references.anomalies);

        for declaration in &declarations.items {
            if let Some(replacement) = self.table.lookup(&declaration.key) {
                match rewrite_site(graph, &declaration.site, category, replacement) {
                    Ok(()) => report.sites_rewritten += 1,
                    Err(anomaly) => record(&mut self.anomalies, anomaly),
                }
            }
        }

        for reference in &references.items {
            let Some(key) = &reference.key else {
                report.unresolved += 1;
                continue;
            };
            // Keys in scopes the switches left alone have no entry.
            let Some(replacement) = self.table.lookup(key) else {
                continue;
            };
            match rewrite_site(graph, &reference.site, category, replacement) {
                Ok(()) => report.sites_rewritten += 1,
                Err(anomaly) => record(&mut self.anomalies, anomaly),
            }
        }

        info!(
            "Renamed {} {} symbols ({} sites, {} unresolved)",
            report.renamed, category, report.sites_rewritten, report.unresolved
        );
        Ok(report)
    }

    fn absorb(&mut self, anomalies: Vec<Anomaly>) {
        for anomaly in anomalies {
            record(&mut self.anomalies, anomaly);
        }
    }
}

fn record(anomalies: &mut Vec<Anomaly>, anomaly: Anomaly) {
    warn!("{}", anomaly);
    anomalies.push(anomaly);
}

/// Write `replacement` into the string at `site`.
pub fn rewrite_site(
    graph: &mut ManifestGraph,
    site: &Site,
    category: SymbolCategory,
    replacement: &str,
) -> std::result::Result<(), Anomaly> {
    let slot = graph
        .get_mut(&site.pointer)
        .ok_or_else(|| Anomaly::malformed(site.pointer.as_str(), "name string"))?;
    let current = slot
        .as_str()
        .ok_or_else(|| Anomaly::malformed(site.pointer.as_str(), "name string"))?;

    let updated = match site.kind {
        SiteKind::Whole => {
            if category == SymbolCategory::Variable && current.starts_with(CLOUD_PREFIX) {
                format!("{CLOUD_PREFIX}{replacement}")
            } else {
                replacement.to_string()
            }
        }
        SiteKind::Proccode => proccode::relabel(current, replacement),
        SiteKind::ArgumentName { index } => {
            let malformed = || Anomaly::malformed(site.pointer.as_str(), "JSON array of argument names");
            let mut names = parse_argument_names(current).ok_or_else(malformed)?;
            let entry = names.get_mut(index).ok_or_else(malformed)?;
            *entry = replacement.to_string();
            serde_json::to_string(&names).map_err(|_| malformed())?
        }
    };

    *slot = Value::String(updated);
    Ok(())
}
