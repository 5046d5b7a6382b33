//! Rewrites non-negative integer literals as hexadecimal text.
//!
//! Scratch casts `"0x2a"` to 42, so a literal `"42"` can be replaced without
//! changing what the project computes. Only plain digit strings are touched:
//! decimals, signs, text primitives and values that do not fit in a `u128`
//! are left as they are.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info};

use crate::core::manifest::{pointer, BlockNode, ManifestGraph, Primitive};

static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+$").expect("valid regex"));

/// Shadow blocks whose `NUM` field holds a number literal.
const NUMBER_SHADOWS: &[&str] = &[
    "math_number",
    "math_whole_number",
    "math_positive_number",
    "math_integer",
    "math_angle",
];

/// Hexadecimal form of a digit string, or `None` when it should stay as is.
pub fn to_hex_literal(text: &str) -> Option<String> {
    if !DIGITS.is_match(text) {
        return None;
    }
    let value: u128 = text.parse().ok()?;
    Some(format!("{value:#x}"))
}

/// Convert every integer literal in the manifest; returns how many changed.
pub fn convert_integers(graph: &mut ManifestGraph) -> usize {
    let pointers = literal_sites(graph);
    let mut converted = 0;

    for site in pointers {
        let Some(slot) = graph.get_mut(&site) else {
            continue;
        };
        let Some(hex) = slot.as_str().and_then(to_hex_literal) else {
            continue;
        };
        debug!("{} -> {}", site, hex);
        *slot = Value::String(hex);
        converted += 1;
    }

    info!("Converted {} integer literals to hexadecimal", converted);
    converted
}

/// Pointers to the text of every number literal position.
fn literal_sites(graph: &ManifestGraph) -> Vec<String> {
    let mut sites = Vec::new();

    for target in graph.targets() {
        for (id, node) in target.blocks() {
            let BlockNode::Object(block) = node else {
                continue;
            };
            let base = target.block_pointer(id);

            if block
                .opcode()
                .is_some_and(|opcode| NUMBER_SHADOWS.contains(&opcode))
                && block.field_text("NUM").is_some()
            {
                sites.push(format!("{base}/fields/NUM/0"));
            }

            for (name, input) in block.inputs() {
                let Some(slots) = input.as_array() else {
                    continue;
                };
                let positions: &[usize] = match slots.first().and_then(Value::as_u64) {
                    Some(3) => &[1, 2],
                    _ => &[1],
                };
                for &position in positions {
                    let is_number = slots
                        .get(position)
                        .and_then(Primitive::parse)
                        .is_some_and(|p| matches!(p, Primitive::Number { text: Some(_), .. }));
                    if is_number {
                        let input_path = pointer(["inputs", name]);
                        sites.push(format!("{base}{input_path}/{position}/1"));
                    }
                }
            }
        }
    }

    sites
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hex_literal_restraint() {
        assert_eq!(to_hex_literal("42").as_deref(), Some("0x2a"));
        assert_eq!(to_hex_literal("0").as_deref(), Some("0x0"));
        assert_eq!(to_hex_literal("007").as_deref(), Some("0x7"));
        assert_eq!(to_hex_literal("42.0"), None);
        assert_eq!(to_hex_literal("-3"), None);
        assert_eq!(to_hex_literal("forty-two"), None);
        assert_eq!(to_hex_literal(""), None);
        assert_eq!(to_hex_literal(" 42"), None);
        assert_eq!(to_hex_literal("1".repeat(60).as_str()), None);
    }

    #[test]
    fn test_convert_integers_in_inputs_and_shadows() {
        let mut graph = ManifestGraph::from_value(json!({
            "targets": [{
                "isStage": false,
                "name": "Cat",
                "blocks": {
                    "a": {
                        "opcode": "motion_movesteps",
                        "inputs": {
                            "STEPS": [1, [4, "42"]],
                            "SLASH/NAME": [3, [12, "v", "id"], [6, "15"]],
                            "MSG": [1, [10, "42"]],
                            "F": [1, [4, "4.5"]]
                        }
                    },
                    "b": { "opcode": "math_integer", "fields": { "NUM": ["255", null] } },
                    "c": { "opcode": "math_number", "fields": { "NUM": ["-1", null] } }
                }
            }]
        }))
        .unwrap();

        assert_eq!(convert_integers(&mut graph), 3);
        assert_eq!(graph.get("/targets/0/blocks/a/inputs/STEPS/1/1"), Some(&json!("0x2a")));
        assert_eq!(graph.get("/targets/0/blocks/a/inputs/SLASH~1NAME/2/1"), Some(&json!("0xf")));
        assert_eq!(graph.get("/targets/0/blocks/a/inputs/MSG/1/1"), Some(&json!("42")));
        assert_eq!(graph.get("/targets/0/blocks/a/inputs/F/1/1"), Some(&json!("4.5")));
        assert_eq!(graph.get("/targets/0/blocks/b/fields/NUM/0"), Some(&json!("0xff")));
        assert_eq!(graph.get("/targets/0/blocks/c/fields/NUM/0"), Some(&json!("-1")));
    }
}
