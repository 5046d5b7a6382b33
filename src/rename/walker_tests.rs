use super::*;
use serde_json::json;

fn fixture() -> ManifestGraph {
    ManifestGraph::from_json_str(include_str!("../../tests/fixtures/sample_project.json"))
        .expect("fixture parses")
}

fn key(category: SymbolCategory, scope: Scope, name: &str) -> DeclarationKey {
    DeclarationKey::new(category, scope, name)
}

fn resolved(walked: &Walked<Reference>) -> Vec<(&str, &DeclarationKey)> {
    walked
        .items
        .iter()
        .filter_map(|r| r.key.as_ref().map(|k| (r.site.pointer.as_str(), k)))
        .collect()
}

#[test]
fn variable_declarations_split_global_and_local() {
    let graph = fixture();
    let walked = collect_declarations(&graph, SymbolCategory::Variable, &ScopeFilter::default());
    assert!(walked.anomalies.is_empty());

    let keys: Vec<_> = walked.items.iter().map(|d| d.key.clone()).collect();
    assert_eq!(
        keys,
        vec![
            key(SymbolCategory::Variable, Scope::Global, "score"),
            key(SymbolCategory::Variable, Scope::Global, "\u{2601} highscore"),
            key(SymbolCategory::Variable, Scope::target(1), "speed"),
            key(SymbolCategory::Variable, Scope::target(2), "lives"),
        ]
    );
    assert_eq!(walked.items[0].site.pointer, "/targets/0/variables/gv1/0");
    assert!(walked.items.iter().all(|d| d.selected));
}

#[test]
fn scope_filter_marks_unselected_declarations() {
    let graph = fixture();
    let filter = ScopeFilter {
        include_global: false,
        include_local: true,
    };
    let walked = collect_declarations(&graph, SymbolCategory::List, &filter);
    let selected: Vec<_> = walked
        .items
        .iter()
        .map(|d| (d.key.name.as_str(), d.selected))
        .collect();
    assert_eq!(
        selected,
        vec![("leaderboard", false), ("score", true), ("score", true)]
    );
}

#[test]
fn variable_references_cover_fields_inputs_sensing_and_monitors() {
    let graph = fixture();
    let walked = collect_references(&graph, SymbolCategory::Variable);
    assert!(walked.anomalies.is_empty(), "{:?}", walked.anomalies);

    let global_score = key(SymbolCategory::Variable, Scope::Global, "score");
    assert_eq!(
        resolved(&walked),
        vec![
            ("/targets/0/blocks/s3/fields/VARIABLE/0", &global_score),
            (
                "/targets/1/blocks/c1/fields/VARIABLE/0",
                &key(SymbolCategory::Variable, Scope::target(1), "speed")
            ),
            ("/targets/1/blocks/c1/inputs/VALUE/1/1", &global_score),
            (
                "/targets/1/blocks/c7/fields/PROPERTY/0",
                &key(SymbolCategory::Variable, Scope::target(2), "lives")
            ),
            ("/monitors/0/params/VARIABLE", &global_score),
        ]
    );
}

#[test]
fn same_list_name_resolves_per_sprite() {
    let graph = fixture();
    let walked = collect_references(&graph, SymbolCategory::List);
    let cat = key(SymbolCategory::List, Scope::target(1), "score");
    let dog = key(SymbolCategory::List, Scope::target(2), "score");

    assert_eq!(
        resolved(&walked),
        vec![
            ("/targets/1/blocks/c4/fields/LIST/0", &cat),
            ("/targets/1/blocks/loose/1", &cat),
            ("/targets/2/blocks/g1/fields/LIST/0", &dog),
            ("/monitors/1/params/LIST", &dog),
        ]
    );
}

#[test]
fn sprite_references_skip_special_menu_values() {
    let graph = fixture();
    let declared = collect_declarations(&graph, SymbolCategory::Sprite, &ScopeFilter::default());
    let names: Vec<_> = declared.items.iter().map(|d| d.key.name.as_str()).collect();
    assert_eq!(names, vec!["Cat", "Dog"]);

    let walked = collect_references(&graph, SymbolCategory::Sprite);
    let pointers: Vec<_> = walked.items.iter().map(|r| r.site.pointer.as_str()).collect();
    assert_eq!(
        pointers,
        vec![
            "/targets/1/blocks/c6/fields/TO/0",
            "/targets/1/blocks/c8/fields/OBJECT/0",
            "/targets/1/blocks/c13/fields/OBJECT/0",
            "/monitors/1/spriteName",
        ]
    );
    assert!(walked.items.iter().all(|r| r.name == "Dog" && r.key.is_some()));
}

#[test]
fn asset_categories_resolve_in_their_targets() {
    let graph = fixture();

    let costumes = collect_declarations(&graph, SymbolCategory::Costume, &ScopeFilter::default());
    assert_eq!(costumes.items.len(), 3);
    let refs = collect_references(&graph, SymbolCategory::Costume);
    assert_eq!(
        resolved(&refs),
        vec![(
            "/targets/1/blocks/c3/fields/COSTUME/0",
            &key(SymbolCategory::Costume, Scope::target(1), "cat-b")
        )]
    );

    let sounds = collect_declarations(&graph, SymbolCategory::Sound, &ScopeFilter::default());
    assert_eq!(sounds.items[0].key.scope, Scope::target(0));
    assert_eq!(sounds.items.len(), 3);

    let backdrops = collect_declarations(&graph, SymbolCategory::Backdrop, &ScopeFilter::default());
    let names: Vec<_> = backdrops.items.iter().map(|d| d.key.name.as_str()).collect();
    assert_eq!(names, vec!["backdrop1", "night"]);
    let refs = collect_references(&graph, SymbolCategory::Backdrop);
    let pointers: Vec<_> = resolved(&refs).into_iter().map(|(p, _)| p).collect();
    assert_eq!(
        pointers,
        vec![
            "/targets/0/blocks/s2/fields/BACKDROP/0",
            "/targets/2/blocks/g4/fields/BACKDROP/0",
        ]
    );
}

#[test]
fn custom_blocks_and_arguments() {
    let graph = fixture();

    let blocks = collect_declarations(&graph, SymbolCategory::CustomBlock, &ScopeFilter::default());
    assert_eq!(blocks.items.len(), 1);
    assert_eq!(blocks.items[0].site.kind, SiteKind::Proccode);
    assert_eq!(blocks.items[0].key.name, "jump %n");

    let calls = collect_references(&graph, SymbolCategory::CustomBlock);
    assert_eq!(calls.items.len(), 1);
    assert_eq!(calls.items[0].site.pointer, "/targets/1/blocks/k1/mutation/proccode");
    assert!(calls.items[0].key.is_some());

    let args = collect_declarations(
        &graph,
        SymbolCategory::CustomBlockArgument,
        &ScopeFilter::default(),
    );
    let scope = Scope::Procedure {
        target: 1,
        proccode: "jump %n".to_string(),
    };
    assert_eq!(args.items.len(), 1);
    assert_eq!(args.items[0].key, key(SymbolCategory::CustomBlockArgument, scope.clone(), "n"));
    assert_eq!(args.items[0].site.kind, SiteKind::ArgumentName { index: 0 });

    let refs = collect_references(&graph, SymbolCategory::CustomBlockArgument);
    let arg = key(SymbolCategory::CustomBlockArgument, scope, "n");
    assert_eq!(
        resolved(&refs),
        vec![
            ("/targets/1/blocks/r1/fields/VALUE/0", &arg),
            ("/targets/1/blocks/r2/fields/VALUE/0", &arg),
        ]
    );
}

#[test]
fn unresolved_and_malformed_nodes_become_anomalies() {
    let graph = ManifestGraph::from_value(json!({
        "targets": [
            { "isStage": true, "name": "Stage", "variables": {}, "lists": {}, "costumes": [], "sounds": [], "blocks": {} },
            {
                "isStage": false,
                "name": "Cat",
                "variables": { "v": [42, 0] },
                "costumes": [{ "name": "a" }],
                "sounds": [],
                "blocks": {
                    "m": { "opcode": "looks_costume", "fields": { "COSTUME": ["ghost", null] } },
                    "n": { "opcode": "looks_costume", "fields": { "COSTUME": ["next costume", null] } },
                    "call": { "opcode": "procedures_call", "mutation": { "proccode": "missing %s" } }
                }
            }
        ]
    }))
    .unwrap();

    let costumes = collect_references(&graph, SymbolCategory::Costume);
    assert_eq!(costumes.items.len(), 1);
    assert!(costumes.items[0].key.is_none());
    assert_eq!(
        costumes.anomalies,
        vec![Anomaly::unresolved(
            SymbolCategory::Costume,
            "/targets/1/blocks/m/fields/COSTUME/0",
            "ghost"
        )]
    );

    let variables = collect_declarations(&graph, SymbolCategory::Variable, &ScopeFilter::default());
    assert!(variables.items.is_empty());
    assert_eq!(
        variables.anomalies,
        vec![Anomaly::malformed("/targets/1/variables/v/0", "[name, value] entry")]
    );

    let calls = collect_references(&graph, SymbolCategory::CustomBlock);
    assert!(calls.items[0].key.is_none());
    assert_eq!(calls.anomalies.len(), 1);
}

#[test]
fn parent_cycles_do_not_resolve() {
    let graph = ManifestGraph::from_value(json!({
        "targets": [{
            "isStage": false,
            "name": "Loop",
            "blocks": {
                "a": { "opcode": "motion_movesteps", "parent": "b" },
                "b": { "opcode": "control_repeat", "parent": "a" },
                "r": { "opcode": "argument_reporter_boolean", "parent": "a", "fields": { "VALUE": ["flag", null] } }
            }
        }]
    }))
    .unwrap();

    let target = graph.target(0).unwrap();
    assert!(owning_prototype(&target, "r").is_none());

    let refs = collect_references(&graph, SymbolCategory::CustomBlockArgument);
    assert_eq!(refs.items.len(), 1);
    assert!(refs.items[0].key.is_none());
}

#[test]
fn keys_per_scope_counts_distinct_selected_keys() {
    let graph = fixture();
    let filter = ScopeFilter {
        include_global: true,
        include_local: false,
    };
    let walked = collect_declarations(&graph, SymbolCategory::Variable, &filter);
    let scopes = keys_per_scope(&walked.items);
    assert_eq!(scopes.len(), 1);
    assert_eq!(scopes[&Scope::Global].len(), 2);
}
