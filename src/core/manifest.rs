//! Typed, read-only views over a Scratch 3 `project.json` graph.
//!
//! The manifest is kept as a [`serde_json::Value`] so that every key, order
//! and unknown extension survives a load/save cycle untouched. The views in
//! this module classify nodes by position and tag fields only; nothing here
//! assumes a static schema, and shapes the views do not recognise come back as
//! `None` or [`BlockNode::Opaque`].

use std::borrow::Cow;

use serde_json::{Map, Value};

use crate::core::errors::{Result, ScramblerError};

/// Prefix Scratch puts in front of cloud variable names.
pub const CLOUD_PREFIX: &str = "\u{2601} ";

/// Escape one reference token per RFC 6901.
pub fn escape_token(token: &str) -> Cow<'_, str> {
    if token.contains('~') || token.contains('/') {
        Cow::Owned(token.replace('~', "~0").replace('/', "~1"))
    } else {
        Cow::Borrowed(token)
    }
}

/// Build a JSON pointer from unescaped tokens.
pub fn pointer<I, S>(tokens: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for token in tokens {
        out.push('/');
        out.push_str(&escape_token(token.as_ref()));
    }
    out
}

/// An owned Scratch 3 project manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestGraph {
    root: Value,
}

impl ManifestGraph {
    /// Wrap a decoded manifest. The root must be an object with a `targets` array.
    pub fn from_value(root: Value) -> Result<Self> {
        match root.get("targets") {
            Some(Value::Array(_)) => Ok(Self { root }),
            _ => Err(ScramblerError::Serialization {
                message: "project manifest has no `targets` array".to_string(),
                data_type: Some("project.json".to_string()),
                context: None,
                source: None,
            }),
        }
    }

    /// Parse a manifest from JSON text.
    pub fn from_json_str(content: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(content)?)
    }

    /// Parse a manifest from raw JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Self::from_value(serde_json::from_slice(bytes)?)
    }

    /// Serialize back to compact JSON, preserving key order.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.root)?)
    }

    /// Borrow the underlying JSON value.
    pub fn as_value(&self) -> &Value {
        &self.root
    }

    /// Consume the wrapper.
    pub fn into_value(self) -> Value {
        self.root
    }

    /// Resolve a JSON pointer.
    pub fn get(&self, pointer: &str) -> Option<&Value> {
        self.root.pointer(pointer)
    }

    /// Resolve a JSON pointer for mutation.
    pub fn get_mut(&mut self, pointer: &str) -> Option<&mut Value> {
        self.root.pointer_mut(pointer)
    }

    /// Number of targets (stage included).
    pub fn target_count(&self) -> usize {
        self.targets_array().len()
    }

    /// All targets in document order.
    pub fn targets(&self) -> impl Iterator<Item = TargetView<'_>> {
        self.targets_array()
            .iter()
            .enumerate()
            .map(|(index, value)| TargetView { index, value })
    }

    /// A target by index.
    pub fn target(&self, index: usize) -> Option<TargetView<'_>> {
        self.targets_array()
            .get(index)
            .map(|value| TargetView { index, value })
    }

    /// Index of the stage target, if any.
    pub fn stage_index(&self) -> Option<usize> {
        self.targets().find(|t| t.is_stage()).map(|t| t.index())
    }

    /// Index of the sprite (non-stage target) with the given name.
    pub fn sprite_index(&self, name: &str) -> Option<usize> {
        self.targets()
            .find(|t| !t.is_stage() && t.name() == Some(name))
            .map(|t| t.index())
    }

    /// Entries of the top-level `monitors` array (empty when absent).
    pub fn monitors(&self) -> &[Value] {
        self.root
            .get("monitors")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn targets_array(&self) -> &[Value] {
        self.root
            .get("targets")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// A sprite or the stage.
#[derive(Debug, Clone, Copy)]
pub struct TargetView<'a> {
    index: usize,
    value: &'a Value,
}

impl<'a> TargetView<'a> {
    /// Position in the `targets` array.
    pub fn index(&self) -> usize {
        self.index
    }

    /// JSON pointer of the target.
    pub fn pointer(&self) -> String {
        format!("/targets/{}", self.index)
    }

    /// Display name.
    pub fn name(&self) -> Option<&'a str> {
        self.value.get("name").and_then(Value::as_str)
    }

    /// Whether this target is the stage.
    pub fn is_stage(&self) -> bool {
        self.value
            .get("isStage")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// The raw `variables` or `lists` map, by key.
    pub fn data_map(&self, key: &str) -> Option<&'a Map<String, Value>> {
        self.value.get(key).and_then(Value::as_object)
    }

    /// The raw `costumes` or `sounds` array, by key.
    pub fn asset_list(&self, key: &str) -> &'a [Value] {
        self.value
            .get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Name of the variable or list with the given id, looked up in `key`.
    pub fn data_name(&self, key: &str, id: &str) -> Option<&'a str> {
        self.data_map(key)?
            .get(id)
            .and_then(|entry| entry.get(0))
            .and_then(Value::as_str)
    }

    /// Whether a variable or list with this name is declared in `key`.
    pub fn declares_data_name(&self, key: &str, name: &str) -> bool {
        self.data_map(key)
            .map(|map| {
                map.values()
                    .any(|entry| entry.get(0).and_then(Value::as_str) == Some(name))
            })
            .unwrap_or(false)
    }

    /// Whether an asset of `key` (`costumes` or `sounds`) has this name.
    pub fn declares_asset(&self, key: &str, name: &str) -> bool {
        self.asset_list(key)
            .iter()
            .any(|asset| asset.get("name").and_then(Value::as_str) == Some(name))
    }

    /// Blocks in map order.
    pub fn blocks(&self) -> impl Iterator<Item = (&'a str, BlockNode<'a>)> {
        self.value
            .get("blocks")
            .and_then(Value::as_object)
            .into_iter()
            .flat_map(|map| map.iter())
            .map(|(id, value)| (id.as_str(), BlockNode::classify(value)))
    }

    /// An object-form block by id.
    pub fn block(&self, id: &str) -> Option<BlockView<'a>> {
        match BlockNode::classify(self.value.get("blocks")?.get(id)?) {
            BlockNode::Object(view) => Some(view),
            _ => None,
        }
    }

    /// JSON pointer of a block in this target.
    pub fn block_pointer(&self, id: &str) -> String {
        format!("{}/blocks/{}", self.pointer(), escape_token(id))
    }
}

/// A block map entry.
#[derive(Debug, Clone, Copy)]
pub enum BlockNode<'a> {
    /// A regular block object
    Object(BlockView<'a>),
    /// A compressed top-level primitive (loose variable or list reporter)
    Primitive(Primitive<'a>),
    /// Anything else, passed through untouched
    Opaque(&'a Value),
}

impl<'a> BlockNode<'a> {
    fn classify(value: &'a Value) -> Self {
        match value {
            Value::Object(map) => BlockNode::Object(BlockView { map }),
            Value::Array(_) => match Primitive::parse(value) {
                Some(primitive) => BlockNode::Primitive(primitive),
                None => BlockNode::Opaque(value),
            },
            other => BlockNode::Opaque(other),
        }
    }
}

/// View over an object-form block.
#[derive(Debug, Clone, Copy)]
pub struct BlockView<'a> {
    map: &'a Map<String, Value>,
}

impl<'a> BlockView<'a> {
    /// The block's opcode.
    pub fn opcode(&self) -> Option<&'a str> {
        self.map.get("opcode").and_then(Value::as_str)
    }

    /// Id of the parent block.
    pub fn parent(&self) -> Option<&'a str> {
        self.map.get("parent").and_then(Value::as_str)
    }

    /// Raw field array (`[value, id?]`).
    pub fn field(&self, name: &str) -> Option<&'a Value> {
        self.map.get("fields")?.get(name)
    }

    /// Text value of a field.
    pub fn field_text(&self, name: &str) -> Option<&'a str> {
        self.field(name)?.get(0).and_then(Value::as_str)
    }

    /// Id carried by a field (variables, lists, broadcasts).
    pub fn field_id(&self, name: &str) -> Option<&'a str> {
        self.field(name)?.get(1).and_then(Value::as_str)
    }

    /// Raw input array by name.
    pub fn input(&self, name: &str) -> Option<&'a Value> {
        self.map.get("inputs")?.get(name)
    }

    /// All inputs in map order.
    pub fn inputs(&self) -> impl Iterator<Item = (&'a str, &'a Value)> {
        self.map
            .get("inputs")
            .and_then(Value::as_object)
            .into_iter()
            .flat_map(|map| map.iter())
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Block id an input points at, when the slot at `position` holds an id.
    pub fn input_block_id(&self, name: &str, position: usize) -> Option<&'a str> {
        self.input(name)?.get(position).and_then(Value::as_str)
    }

    /// The id of the menu shadow of an input, unless a reporter obscures it.
    pub fn shadow_input_id(&self, name: &str) -> Option<&'a str> {
        let input = self.input(name)?;
        match input.get(0).and_then(Value::as_u64) {
            Some(1) => input.get(1).and_then(Value::as_str),
            _ => None,
        }
    }

    /// A string entry of the block's mutation.
    pub fn mutation_text(&self, key: &str) -> Option<&'a str> {
        self.map.get("mutation")?.get(key).and_then(Value::as_str)
    }
}

/// Scratch's compressed primitive arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive<'a> {
    /// `[4..=8, text]`: number, positive number, whole number, integer, angle
    Number {
        /// Numeric tag
        tag: u64,
        /// Literal text
        text: Option<&'a str>,
    },
    /// `[9, text]`
    Color(Option<&'a str>),
    /// `[10, text]`
    Text(Option<&'a str>),
    /// `[11, name, id]`
    Broadcast {
        /// Broadcast name
        name: Option<&'a str>,
        /// Broadcast id
        id: Option<&'a str>,
    },
    /// `[12, name, id, ..]`
    Variable {
        /// Variable name
        name: Option<&'a str>,
        /// Variable id
        id: Option<&'a str>,
    },
    /// `[13, name, id, ..]`
    List {
        /// List name
        name: Option<&'a str>,
        /// List id
        id: Option<&'a str>,
    },
    /// Array with an unrecognised tag
    Unknown(u64),
}

impl<'a> Primitive<'a> {
    /// Tag of a numeric primitive holding a number literal.
    pub const NUMBER_TAGS: std::ops::RangeInclusive<u64> = 4..=8;

    /// Decode an array whose first element is an integer tag.
    pub fn parse(value: &'a Value) -> Option<Self> {
        let array = value.as_array()?;
        let tag = array.first()?.as_u64()?;
        let text = |i: usize| array.get(i).and_then(Value::as_str);

        Some(match tag {
            t if Self::NUMBER_TAGS.contains(&t) => Primitive::Number { tag, text: text(1) },
            9 => Primitive::Color(text(1)),
            10 => Primitive::Text(text(1)),
            11 => Primitive::Broadcast {
                name: text(1),
                id: text(2),
            },
            12 => Primitive::Variable {
                name: text(1),
                id: text(2),
            },
            13 => Primitive::List {
                name: text(1),
                id: text(2),
            },
            other => Primitive::Unknown(other),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> ManifestGraph {
        ManifestGraph::from_value(json!({
            "targets": [
                {
                    "isStage": true,
                    "name": "Stage",
                    "variables": { "v1": ["score", 0] },
                    "lists": {},
                    "costumes": [{ "name": "backdrop1" }],
                    "sounds": [],
                    "blocks": {}
                },
                {
                    "isStage": false,
                    "name": "Cat",
                    "variables": {},
                    "lists": { "l1": ["items", []] },
                    "costumes": [{ "name": "cat-a" }],
                    "sounds": [{ "name": "meow" }],
                    "blocks": {
                        "a/b": {
                            "opcode": "data_setvariableto",
                            "parent": null,
                            "inputs": { "VALUE": [1, [10, "0"]] },
                            "fields": { "VARIABLE": ["score", "v1"] }
                        },
                        "loose": [12, "score", "v1", 10, 20],
                        "junk": 7
                    }
                }
            ],
            "monitors": []
        }))
        .unwrap()
    }

    #[test]
    fn test_rejects_manifest_without_targets() {
        assert!(ManifestGraph::from_value(json!({ "meta": {} })).is_err());
        assert!(ManifestGraph::from_json_str("[1, 2]").is_err());
    }

    #[test]
    fn test_target_views() {
        let graph = sample();
        assert_eq!(graph.target_count(), 2);
        assert_eq!(graph.stage_index(), Some(0));
        assert_eq!(graph.sprite_index("Cat"), Some(1));
        assert_eq!(graph.sprite_index("Stage"), None);

        let cat = graph.target(1).unwrap();
        assert_eq!(cat.name(), Some("Cat"));
        assert!(!cat.is_stage());
        assert_eq!(cat.data_name("lists", "l1"), Some("items"));
        assert!(cat.declares_asset("sounds", "meow"));
        assert!(!cat.declares_asset("costumes", "meow"));
        assert!(graph.monitors().is_empty());
    }

    #[test]
    fn test_block_classification() {
        let graph = sample();
        let cat = graph.target(1).unwrap();
        let kinds: Vec<_> = cat.blocks().collect();
        assert_eq!(kinds.len(), 3);

        match kinds[0].1 {
            BlockNode::Object(block) => {
                assert_eq!(block.opcode(), Some("data_setvariableto"));
                assert_eq!(block.field_text("VARIABLE"), Some("score"));
                assert_eq!(block.field_id("VARIABLE"), Some("v1"));
                assert_eq!(block.parent(), None);
            }
            other => panic!("expected object block, got {other:?}"),
        }
        assert!(matches!(
            kinds[1].1,
            BlockNode::Primitive(Primitive::Variable { name: Some("score"), id: Some("v1") })
        ));
        assert!(matches!(kinds[2].1, BlockNode::Opaque(_)));
    }

    #[test]
    fn test_pointer_escaping() {
        assert_eq!(pointer(["targets", "1", "blocks", "a/b~c"]), "/targets/1/blocks/a~1b~0c");

        let mut graph = sample();
        let cat = graph.target(1).unwrap();
        let ptr = format!("{}/fields/VARIABLE/0", cat.block_pointer("a/b"));
        assert_eq!(graph.get(&ptr), Some(&json!("score")));

        *graph.get_mut(&ptr).unwrap() = json!("renamed");
        assert_eq!(graph.get(&ptr), Some(&json!("renamed")));
    }

    #[test]
    fn test_primitive_parsing() {
        assert_eq!(
            Primitive::parse(&json!([4, "42"])),
            Some(Primitive::Number { tag: 4, text: Some("42") })
        );
        assert_eq!(Primitive::parse(&json!([10, "hi"])), Some(Primitive::Text(Some("hi"))));
        assert_eq!(Primitive::parse(&json!([99])), Some(Primitive::Unknown(99)));
        assert_eq!(Primitive::parse(&json!(["x"])), None);
        assert_eq!(Primitive::parse(&json!({})), None);
    }

    #[test]
    fn test_round_trip_preserves_key_order() {
        let text = r#"{"targets":[],"zeta":1,"alpha":2,"meta":{"semver":"3.0.0"}}"#;
        let graph = ManifestGraph::from_json_str(text).unwrap();
        assert_eq!(graph.to_json_string().unwrap(), text);
    }
}
