//! Main obfuscation engine implementation.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::Rng;
use tracing::info;

use crate::api::results::ObfuscationReport;
use crate::core::config::ObfuscationConfig;
use crate::core::errors::Result;
use crate::core::manifest::ManifestGraph;
use crate::rename::generator::NameGenerator;
use crate::rename::pass::RewritePass;
use crate::transforms::integers::convert_integers;

/// Obfuscate a manifest in place with a one-off engine.
///
/// Uses the configuration's `seed` when present and operating system entropy
/// otherwise.
pub fn obfuscate(graph: &mut ManifestGraph, config: &ObfuscationConfig) -> Result<ObfuscationReport> {
    ScramblerEngine::new(config.clone())?.run(graph)
}

/// Main sb3-scrambler engine
///
/// The engine owns its random source; each [`run`](Self::run) starts from a
/// fresh symbol table, so no state other than the random stream carries over
/// between invocations.
pub struct ScramblerEngine<R: Rng = StdRng> {
    /// Validated configuration
    config: ObfuscationConfig,

    /// Replacement name source
    generator: NameGenerator<R>,
}

impl ScramblerEngine<StdRng> {
    /// Create an engine, validating the configuration first.
    pub fn new(config: ObfuscationConfig) -> Result<Self> {
        config.validate()?;
        let generator = match config.seed {
            Some(seed) => NameGenerator::from_seed(seed),
            None => NameGenerator::from_entropy(),
        };
        Ok(Self { config, generator })
    }
}

impl<R: Rng> ScramblerEngine<R> {
    /// Create an engine drawing names from `rng`; the configured seed is ignored.
    pub fn with_rng(config: ObfuscationConfig, rng: R) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            generator: NameGenerator::new(rng),
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &ObfuscationConfig {
        &self.config
    }

    /// Rename every enabled category, then convert integers if asked.
    ///
    /// On `GenerationExhausted` the categories processed before the failing
    /// one keep their changes.
    pub fn run(&mut self, graph: &mut ManifestGraph) -> Result<ObfuscationReport> {
        let started = Instant::now();
        info!("Starting obfuscation of {} targets", graph.target_count());

        let mut report = ObfuscationReport::default();
        let mut pass = RewritePass::new(&mut self.generator);

        for (category, options) in self.config.enabled_categories() {
            report.categories.push(pass.run_category(graph, category, options)?);
        }
        report.anomalies = pass.into_anomalies();

        if self.config.convert_integers_to_hexadecimal {
            report.integers_converted = convert_integers(graph);
        }

        report.elapsed = started.elapsed();
        info!(
            "Obfuscation completed in {:.2} seconds ({} symbols renamed, {} anomalies)",
            report.elapsed_seconds(),
            report.total_renamed(),
            report.anomalies.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
