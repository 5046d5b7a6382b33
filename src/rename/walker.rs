//! Discovery of declaration and reference sites in a manifest.
//!
//! The walker never mutates the graph. For one [`SymbolCategory`] it yields
//! the sites that declare a symbol and the sites that refer to one, each
//! addressed by a JSON pointer, in document order (targets in array order,
//! blocks in map order, monitors last). Resolution of references to their
//! declarations happens here as well, so the rewrite pass only has to look
//! keys up in the symbol table.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::results::Anomaly;
use crate::core::config::CategoryOptions;
use crate::core::manifest::{escape_token, BlockNode, BlockView, ManifestGraph, Primitive, TargetView};
use crate::core::symbols::{DeclarationKey, Scope, SymbolCategory};

/// Menu shadows whose field names a sprite.
const SPRITE_MENUS: &[(&str, &str)] = &[
    ("motion_goto_menu", "TO"),
    ("motion_glideto_menu", "TO"),
    ("motion_pointtowards_menu", "TOWARDS"),
    ("control_create_clone_of_menu", "CLONE_OPTION"),
    ("sensing_touchingobjectmenu", "TOUCHINGOBJECTMENU"),
    ("sensing_of_object_menu", "OBJECT"),
    ("sensing_distancetomenu", "DISTANCETOMENU"),
];

/// Blocks whose `BACKDROP` field names a backdrop.
const BACKDROP_MENUS: &[&str] = &["looks_backdrops", "event_whenbackdropswitchesto"];

/// Reporters for custom block arguments.
const ARGUMENT_REPORTERS: &[&str] = &["argument_reporter_string_number", "argument_reporter_boolean"];

/// `sensing_of` properties that are not variables.
const SPRITE_PROPERTIES: &[&str] = &[
    "x position",
    "y position",
    "direction",
    "costume #",
    "costume name",
    "size",
    "volume",
];
const STAGE_PROPERTIES: &[&str] = &["background #", "backdrop #", "backdrop name", "volume"];

/// `sensing_of_object_menu` value selecting the stage.
const STAGE_OBJECT: &str = "_stage_";

/// How the string at a site encodes the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SiteKind {
    /// The whole string is the name
    Whole,
    /// The label part of a custom block signature
    Proccode,
    /// One entry of a JSON-array-encoded list of argument names
    ArgumentName {
        /// Position in the array
        index: usize,
    },
}

/// A string inside the manifest holding (part of) a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    /// RFC 6901 pointer to the string
    pub pointer: String,
    /// Encoding of the name within the string
    pub kind: SiteKind,
}

impl Site {
    /// A site whose whole string is the name.
    pub fn whole(pointer: impl Into<String>) -> Self {
        Self {
            pointer: pointer.into(),
            kind: SiteKind::Whole,
        }
    }
}

/// The defining occurrence of a symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// Identity of the symbol
    pub key: DeclarationKey,
    /// Where the declared name is stored
    pub site: Site,
    /// Whether the scope switches select this declaration for renaming
    pub selected: bool,
}

/// A use of a symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Where the name is stored
    pub site: Site,
    /// Name as found at the site
    pub name: String,
    /// Declaration the site resolves to; `None` when unresolved
    pub key: Option<DeclarationKey>,
}

/// Which scopes of a category are renamed.
///
/// Only variables and lists distinguish the two; the stage's entries are
/// global and every sprite's entries are local.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeFilter {
    /// Rename stage (project-wide) declarations
    pub include_global: bool,
    /// Rename sprite-local declarations
    pub include_local: bool,
}

impl Default for ScopeFilter {
    fn default() -> Self {
        Self {
            include_global: true,
            include_local: true,
        }
    }
}

impl From<&CategoryOptions> for ScopeFilter {
    fn from(options: &CategoryOptions) -> Self {
        Self {
            include_global: options.include_global,
            include_local: options.include_local,
        }
    }
}

impl ScopeFilter {
    fn admits(&self, category: SymbolCategory, scope: &Scope) -> bool {
        match category {
            SymbolCategory::Variable | SymbolCategory::List => match scope {
                Scope::Global => self.include_global,
                _ => self.include_local,
            },
            _ => true,
        }
    }
}

/// Items found by a walk plus the anomalies met on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Walked<T> {
    /// Items in document order
    pub items: Vec<T>,
    /// Nodes that could not be interpreted
    pub anomalies: Vec<Anomaly>,
}

impl<T> Default for Walked<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            anomalies: Vec::new(),
        }
    }
}

/// Every declaration of `category`, selected or not.
pub fn collect_declarations(
    graph: &ManifestGraph,
    category: SymbolCategory,
    filter: &ScopeFilter,
) -> Walked<Declaration> {
    let mut out = Walked::default();

    for target in graph.targets() {
        match category {
            SymbolCategory::Variable => declare_data(&target, "variables", category, &mut out),
            SymbolCategory::List => declare_data(&target, "lists", category, &mut out),
            SymbolCategory::Sprite => {
                if target.is_stage() {
                    continue;
                }
                match target.name() {
                    Some(name) => out.items.push(declaration(
                        category,
                        Scope::Global,
                        name,
                        Site::whole(format!("{}/name", target.pointer())),
                    )),
                    None => out
                        .anomalies
                        .push(Anomaly::malformed(target.pointer(), "sprite `name` string")),
                }
            }
            SymbolCategory::Costume if !target.is_stage() => {
                declare_assets(&target, "costumes", category, &mut out)
            }
            SymbolCategory::Backdrop if target.is_stage() => {
                declare_assets(&target, "costumes", category, &mut out)
            }
            SymbolCategory::Sound => declare_assets(&target, "sounds", category, &mut out),
            SymbolCategory::CustomBlock => {
                for (id, block) in prototypes(&target) {
                    let site_pointer = format!("{}/mutation/proccode", target.block_pointer(id));
                    match block.mutation_text("proccode") {
                        Some(proccode) => out.items.push(declaration(
                            category,
                            Scope::target(target.index()),
                            proccode,
                            Site {
                                pointer: site_pointer,
                                kind: SiteKind::Proccode,
                            },
                        )),
                        None => out
                            .anomalies
                            .push(Anomaly::malformed(site_pointer, "custom block signature")),
                    }
                }
            }
            SymbolCategory::CustomBlockArgument => {
                for (id, block) in prototypes(&target) {
                    declare_arguments(&target, id, block, &mut out);
                }
            }
            SymbolCategory::Costume | SymbolCategory::Backdrop => {}
        }
    }

    for declaration in &mut out.items {
        declaration.selected = filter.admits(category, &declaration.key.scope);
    }
    out
}

/// Every reference to a symbol of `category`, resolved where possible.
///
/// Declaration sites are not included.
pub fn collect_references(graph: &ManifestGraph, category: SymbolCategory) -> Walked<Reference> {
    let mut walker = ReferenceWalker {
        graph,
        category,
        out: Walked::default(),
    };
    walker.walk();
    walker.out
}

fn declaration(
    category: SymbolCategory,
    scope: Scope,
    name: &str,
    site: Site,
) -> Declaration {
    Declaration {
        key: DeclarationKey::new(category, scope, name),
        site,
        selected: true,
    }
}

fn data_scope(target: &TargetView<'_>) -> Scope {
    if target.is_stage() {
        Scope::Global
    } else {
        Scope::target(target.index())
    }
}

fn declare_data(
    target: &TargetView<'_>,
    key: &str,
    category: SymbolCategory,
    out: &mut Walked<Declaration>,
) {
    let Some(map) = target.data_map(key) else {
        return;
    };
    let scope = data_scope(target);
    for (id, entry) in map {
        let pointer = format!("{}/{}/{}/0", target.pointer(), key, escape_token(id));
        match entry.get(0).and_then(Value::as_str) {
            Some(name) => out
                .items
                .push(declaration(category, scope.clone(), name, Site::whole(pointer))),
            None => out
                .anomalies
                .push(Anomaly::malformed(pointer, "[name, value] entry")),
        }
    }
}

fn declare_assets(
    target: &TargetView<'_>,
    key: &str,
    category: SymbolCategory,
    out: &mut Walked<Declaration>,
) {
    for (position, asset) in target.asset_list(key).iter().enumerate() {
        let pointer = format!("{}/{}/{}/name", target.pointer(), key, position);
        match asset.get("name").and_then(Value::as_str) {
            Some(name) => out.items.push(declaration(
                category,
                Scope::target(target.index()),
                name,
                Site::whole(pointer),
            )),
            None => out.anomalies.push(Anomaly::malformed(pointer, "asset name string")),
        }
    }
}

fn declare_arguments(
    target: &TargetView<'_>,
    id: &str,
    block: BlockView<'_>,
    out: &mut Walked<Declaration>,
) {
    let pointer = format!("{}/mutation/argumentnames", target.block_pointer(id));
    let Some(proccode) = block.mutation_text("proccode") else {
        out.anomalies.push(Anomaly::malformed(
            format!("{}/mutation/proccode", target.block_pointer(id)),
            "custom block signature",
        ));
        return;
    };
    let names = match block.mutation_text("argumentnames").map(parse_argument_names) {
        Some(Some(names)) => names,
        Some(None) => {
            out.anomalies
                .push(Anomaly::malformed(pointer, "JSON array of argument names"));
            return;
        }
        // A signature without arguments may omit the list entirely.
        None => return,
    };

    let scope = Scope::Procedure {
        target: target.index(),
        proccode: proccode.to_string(),
    };
    for (index, name) in names.iter().enumerate() {
        out.items.push(declaration(
            SymbolCategory::CustomBlockArgument,
            scope.clone(),
            name,
            Site {
                pointer: pointer.clone(),
                kind: SiteKind::ArgumentName { index },
            },
        ));
    }
}

/// Decode a mutation's `argumentnames` string.
pub fn parse_argument_names(encoded: &str) -> Option<Vec<String>> {
    serde_json::from_str(encoded).ok()
}

fn prototypes<'a>(target: &TargetView<'a>) -> impl Iterator<Item = (&'a str, BlockView<'a>)> {
    target.blocks().filter_map(|(id, node)| match node {
        BlockNode::Object(block) if block.opcode() == Some("procedures_prototype") => {
            Some((id, block))
        }
        _ => None,
    })
}

struct ReferenceWalker<'g> {
    graph: &'g ManifestGraph,
    category: SymbolCategory,
    out: Walked<Reference>,
}

impl<'g> ReferenceWalker<'g> {
    fn walk(&mut self) {
        let graph = self.graph;
        for target in graph.targets() {
            let signatures: HashSet<&str> = match self.category {
                SymbolCategory::CustomBlock => prototypes(&target)
                    .filter_map(|(_, block)| block.mutation_text("proccode"))
                    .collect(),
                _ => HashSet::new(),
            };

            for (id, node) in target.blocks() {
                match node {
                    BlockNode::Object(block) => self.visit_block(&target, id, block, &signatures),
                    BlockNode::Primitive(primitive) => {
                        let pointer = format!("{}/1", target.block_pointer(id));
                        self.visit_primitive(&target, primitive, pointer);
                    }
                    BlockNode::Opaque(_) => {}
                }
            }
        }

        if matches!(
            self.category,
            SymbolCategory::Variable | SymbolCategory::List | SymbolCategory::Sprite
        ) {
            self.visit_monitors();
        }
    }

    fn push(&mut self, pointer: String, name: &str, key: Option<DeclarationKey>) {
        self.out.items.push(Reference {
            site: Site::whole(pointer),
            name: name.to_string(),
            key,
        });
    }

    fn data_keys(&self) -> Option<(&'static str, &'static str)> {
        match self.category {
            SymbolCategory::Variable => Some(("variables", "VARIABLE")),
            SymbolCategory::List => Some(("lists", "LIST")),
            _ => None,
        }
    }

    fn visit_block(
        &mut self,
        target: &TargetView<'g>,
        id: &str,
        block: BlockView<'g>,
        signatures: &HashSet<&str>,
    ) {
        let graph = self.graph;
        let base = target.block_pointer(id);
        let opcode = block.opcode().unwrap_or_default();

        match self.category {
            SymbolCategory::Variable | SymbolCategory::List => {
                self.visit_data_block(target, &base, block);
                if self.category == SymbolCategory::Variable && opcode == "sensing_of" {
                    self.visit_sensing_of(target, &base, block);
                }
            }
            SymbolCategory::Sprite => {
                for (menu, field) in SPRITE_MENUS {
                    if opcode != *menu {
                        continue;
                    }
                    if let Some(name) = block.field_text(field) {
                        if graph.sprite_index(name).is_some() {
                            let key = DeclarationKey::new(self.category, Scope::Global, name);
                            self.push(format!("{base}/fields/{field}/0"), name, Some(key));
                        }
                    }
                }
            }
            SymbolCategory::Costume if opcode == "looks_costume" && !target.is_stage() => {
                self.visit_asset_menu(target, &base, block, "COSTUME", "costumes");
            }
            SymbolCategory::Sound if opcode == "sound_sounds_menu" => {
                self.visit_asset_menu(target, &base, block, "SOUND_MENU", "sounds");
            }
            SymbolCategory::Backdrop if BACKDROP_MENUS.contains(&opcode) => {
                match graph.stage_index().and_then(|i| graph.target(i)) {
                    Some(stage) => self.visit_asset_menu(&stage, &base, block, "BACKDROP", "costumes"),
                    None => {
                        if let Some(name) = block.field_text("BACKDROP") {
                            self.push_unresolved(format!("{base}/fields/BACKDROP/0"), name);
                        }
                    }
                }
            }
            SymbolCategory::CustomBlock if opcode == "procedures_call" => {
                let pointer = format!("{base}/mutation/proccode");
                match block.mutation_text("proccode") {
                    Some(proccode) => {
                        let key = signatures.contains(proccode).then(|| {
                            DeclarationKey::new(self.category, Scope::target(target.index()), proccode)
                        });
                        if key.is_none() {
                            self.out.anomalies.push(Anomaly::unresolved(
                                self.category,
                                pointer.clone(),
                                proccode,
                            ));
                        }
                        self.out.items.push(Reference {
                            site: Site {
                                pointer,
                                kind: SiteKind::Proccode,
                            },
                            name: proccode.to_string(),
                            key,
                        });
                    }
                    None => self
                        .out
                        .anomalies
                        .push(Anomaly::malformed(pointer, "custom block signature")),
                }
            }
            SymbolCategory::CustomBlockArgument if ARGUMENT_REPORTERS.contains(&opcode) => {
                let pointer = format!("{base}/fields/VALUE/0");
                let Some(name) = block.field_text("VALUE") else {
                    self.out
                        .anomalies
                        .push(Anomaly::malformed(pointer, "argument name field"));
                    return;
                };
                let key = owning_prototype(target, id).and_then(|prototype| {
                    let proccode = prototype.mutation_text("proccode")?;
                    let declared = prototype
                        .mutation_text("argumentnames")
                        .and_then(parse_argument_names)?;
                    declared.iter().any(|n| n == name).then(|| {
                        DeclarationKey::new(
                            self.category,
                            Scope::Procedure {
                                target: target.index(),
                                proccode: proccode.to_string(),
                            },
                            name,
                        )
                    })
                });
                self.push_data(pointer, name, key);
            }
            _ => {}
        }
    }

    fn visit_data_block(&mut self, target: &TargetView<'g>, base: &str, block: BlockView<'g>) {
        let Some((_, field)) = self.data_keys() else {
            return;
        };

        if block.field(field).is_some() {
            let pointer = format!("{base}/fields/{field}/0");
            match block.field_text(field) {
                Some(name) => {
                    let key = self.resolve_data(target, block.field_id(field), name);
                    self.push_data(pointer, name, key);
                }
                None => self
                    .out
                    .anomalies
                    .push(Anomaly::malformed(pointer, "[name, id] field")),
            }
        }

        for (input_name, input) in block.inputs() {
            let Some(slots) = input.as_array() else {
                continue;
            };
            for position in 1..slots.len().min(3) {
                if let Some(primitive) = Primitive::parse(&slots[position]) {
                    let pointer = format!(
                        "{base}/inputs/{}/{position}/1",
                        escape_token(input_name)
                    );
                    self.visit_primitive(target, primitive, pointer);
                }
            }
        }
    }

    fn visit_primitive(&mut self, target: &TargetView<'g>, primitive: Primitive<'g>, pointer: String) {
        let (name, id) = match (self.category, primitive) {
            (SymbolCategory::Variable, Primitive::Variable { name, id })
            | (SymbolCategory::List, Primitive::List { name, id }) => (name, id),
            _ => return,
        };
        match name {
            Some(name) => {
                let key = self.resolve_data(target, id, name);
                self.push_data(pointer, name, key);
            }
            None => self
                .out
                .anomalies
                .push(Anomaly::malformed(pointer, "primitive name string")),
        }
    }

    /// Record a reference, flagging it when it did not resolve.
    fn push_data(&mut self, pointer: String, name: &str, key: Option<DeclarationKey>) {
        if key.is_none() {
            self.out
                .anomalies
                .push(Anomaly::unresolved(self.category, pointer.clone(), name));
        }
        self.push(pointer, name, key);
    }

    fn push_unresolved(&mut self, pointer: String, name: &str) {
        self.out
            .anomalies
            .push(Anomaly::unresolved(self.category, pointer.clone(), name));
        self.push(pointer, name, None);
    }

    /// Resolve a variable or list by id (own target first, then the stage),
    /// falling back to the name when the id is missing or stale.
    fn resolve_data(
        &self,
        target: &TargetView<'g>,
        id: Option<&str>,
        name: &str,
    ) -> Option<DeclarationKey> {
        let (map_key, _) = self.data_keys()?;
        let stage = self.graph.stage_index().and_then(|i| self.graph.target(i));
        let candidates = std::iter::once(*target).chain(stage.filter(|s| s.index() != target.index()));

        let candidates: Vec<TargetView<'g>> = candidates.collect();
        if let Some(id) = id {
            for candidate in &candidates {
                if let Some(declared) = candidate.data_name(map_key, id) {
                    return Some(DeclarationKey::new(self.category, data_scope(candidate), declared));
                }
            }
        }
        candidates
            .iter()
            .find(|candidate| candidate.declares_data_name(map_key, name))
            .map(|candidate| DeclarationKey::new(self.category, data_scope(candidate), name))
    }

    fn visit_sensing_of(&mut self, target: &TargetView<'g>, base: &str, block: BlockView<'g>) {
        let Some(property) = block.field_text("PROPERTY") else {
            return;
        };
        let pointer = format!("{base}/fields/PROPERTY/0");

        let object = block
            .shadow_input_id("OBJECT")
            .and_then(|menu_id| target.block(menu_id))
            .and_then(|menu| menu.field_text("OBJECT"));
        let owner = object.and_then(|object| {
            if object == STAGE_OBJECT {
                self.graph.stage_index()
            } else {
                self.graph.sprite_index(object)
            }
        });

        match owner.and_then(|i| self.graph.target(i)) {
            Some(owner) => {
                let builtins = if owner.is_stage() {
                    STAGE_PROPERTIES
                } else {
                    SPRITE_PROPERTIES
                };
                if builtins.contains(&property) {
                    return;
                }
                let key = owner
                    .declares_data_name("variables", property)
                    .then(|| DeclarationKey::new(self.category, data_scope(&owner), property));
                self.push_data(pointer, property, key);
            }
            None => {
                if !SPRITE_PROPERTIES.contains(&property) && !STAGE_PROPERTIES.contains(&property) {
                    self.push_unresolved(pointer, property);
                }
            }
        }
    }

    fn visit_asset_menu(
        &mut self,
        owner: &TargetView<'g>,
        base: &str,
        block: BlockView<'g>,
        field: &str,
        assets: &str,
    ) {
        let Some(name) = block.field_text(field) else {
            return;
        };
        if self.category.reserved_names().contains(&name) {
            return;
        }
        let pointer = format!("{base}/fields/{field}/0");
        if owner.declares_asset(assets, name) {
            let key = DeclarationKey::new(self.category, Scope::target(owner.index()), name);
            self.push(pointer, name, Some(key));
        } else {
            self.push_unresolved(pointer, name);
        }
    }

    fn visit_monitors(&mut self) {
        let graph = self.graph;
        for (position, monitor) in graph.monitors().iter().enumerate() {
            let base = format!("/monitors/{position}");
            let sprite = monitor.get("spriteName").and_then(Value::as_str);

            if self.category == SymbolCategory::Sprite {
                if let Some(name) = sprite {
                    if graph.sprite_index(name).is_some() {
                        let key = DeclarationKey::new(self.category, Scope::Global, name);
                        self.push(format!("{base}/spriteName"), name, Some(key));
                    }
                }
                continue;
            }

            let (opcode, param) = match self.category {
                SymbolCategory::Variable => ("data_variable", "VARIABLE"),
                _ => ("data_listcontents", "LIST"),
            };
            if monitor.get("opcode").and_then(Value::as_str) != Some(opcode) {
                continue;
            }
            let pointer = format!("{base}/params/{param}");
            let Some(name) = monitor
                .get("params")
                .and_then(|p| p.get(param))
                .and_then(Value::as_str)
            else {
                self.out
                    .anomalies
                    .push(Anomaly::malformed(pointer, "monitor parameter name"));
                continue;
            };

            let owner = match sprite {
                Some(sprite) => graph.sprite_index(sprite),
                None => graph.stage_index(),
            };
            let key = owner.and_then(|i| graph.target(i)).and_then(|owner| {
                let id = monitor.get("id").and_then(Value::as_str);
                self.resolve_data(&owner, id, name)
            });
            self.push_data(pointer, name, key);
        }
    }
}

/// The prototype of the custom block a block belongs to.
///
/// Follows `parent` links to the `procedures_definition` hat (or directly to a
/// prototype for the argument shadows it owns). Cycles and broken links give
/// `None`.
pub fn owning_prototype<'a>(target: &TargetView<'a>, block_id: &str) -> Option<BlockView<'a>> {
    let mut visited: HashSet<String> = HashSet::new();
    let mut current = block_id.to_string();

    loop {
        if !visited.insert(current.clone()) {
            return None;
        }
        let block = target.block(&current)?;
        match block.opcode() {
            Some("procedures_prototype") => return Some(block),
            Some("procedures_definition") => {
                let prototype_id = block.input_block_id("custom_block", 1)?;
                return target
                    .block(prototype_id)
                    .filter(|b| b.opcode() == Some("procedures_prototype"));
            }
            _ => current = block.parent()?.to_string(),
        }
    }
}

/// Count distinct selected keys per scope.
pub fn keys_per_scope(declarations: &[Declaration]) -> HashMap<Scope, HashSet<&DeclarationKey>> {
    let mut scopes: HashMap<Scope, HashSet<&DeclarationKey>> = HashMap::new();
    for declaration in declarations.iter().filter(|d| d.selected) {
        scopes
            .entry(declaration.key.scope.clone())
            .or_default()
            .insert(&declaration.key);
    }
    scopes
}

#[cfg(test)]
#[path = "walker_tests.rs"]
mod tests;
