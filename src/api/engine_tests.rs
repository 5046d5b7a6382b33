use super::*;
use crate::core::config::CategoryOptions;
use crate::core::errors::ScramblerError;
use crate::core::symbols::SymbolCategory;
use rand::SeedableRng;

fn fixture() -> ManifestGraph {
    ManifestGraph::from_json_str(include_str!("../../tests/fixtures/sample_project.json"))
        .expect("fixture parses")
}

#[test]
fn noop_config_leaves_graph_identical() {
    let mut graph = fixture();
    let before = graph.clone();

    let report = obfuscate(&mut graph, &ObfuscationConfig::default()).unwrap();

    assert_eq!(graph, before);
    assert!(report.categories.is_empty());
    assert_eq!(report.integers_converted, 0);
    assert!(report.anomalies.is_empty());
}

#[test]
fn seeded_runs_are_reproducible() {
    let config = ObfuscationConfig::example().with_seed(1234);

    let mut first = fixture();
    let mut second = fixture();
    obfuscate(&mut first, &config).unwrap();
    obfuscate(&mut second, &config).unwrap();

    assert_eq!(first, second);
    assert_ne!(first, fixture());
}

#[test]
fn with_rng_uses_the_given_source() {
    let config = ObfuscationConfig::new()
        .with_category(SymbolCategory::Sprite, CategoryOptions::hex(6))
        .with_seed(1);

    let mut a = fixture();
    let mut b = fixture();
    ScramblerEngine::with_rng(config.clone(), StdRng::seed_from_u64(77))
        .unwrap()
        .run(&mut a)
        .unwrap();
    ScramblerEngine::with_rng(config, StdRng::seed_from_u64(77))
        .unwrap()
        .run(&mut b)
        .unwrap();

    assert_eq!(a, b);
}

#[test]
fn invalid_config_is_rejected_before_running() {
    let config = ObfuscationConfig::new().with_category(SymbolCategory::List, CategoryOptions::hex(0));
    let err = ScramblerEngine::new(config).err().expect("zero length rejected");
    assert!(matches!(err, ScramblerError::Config { .. }));
}

#[test]
fn report_follows_category_order_and_counts_integers() {
    let config = ObfuscationConfig::new()
        .with_category(SymbolCategory::CustomBlock, CategoryOptions::hex(8))
        .with_category(SymbolCategory::Variable, CategoryOptions::hex(8))
        .with_integer_conversion(true)
        .with_seed(5);

    let mut graph = fixture();
    let report = ScramblerEngine::new(config).unwrap().run(&mut graph).unwrap();

    let order: Vec<_> = report.categories.iter().map(|c| c.category).collect();
    assert_eq!(order, vec![SymbolCategory::Variable, SymbolCategory::CustomBlock]);

    let variables = report.category(SymbolCategory::Variable).unwrap();
    assert_eq!(variables.renamed, 4);
    assert_eq!(variables.sites_rewritten, 4 + 5);
    assert_eq!(variables.unresolved, 0);

    assert_eq!(report.integers_converted, 5);
    assert!(report.elapsed_seconds() >= 0.0);
}

#[test]
fn engine_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<ScramblerEngine>();
}
