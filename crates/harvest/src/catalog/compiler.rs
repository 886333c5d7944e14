use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use tracing::{debug, info};

use super::database::Catalog;
use super::types::{
    Definition, DefinitionKind, FormId, Location, LocationId, PluginOrigin, PopulationCenterSize,
    RefId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogErrorCode {
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownElement,
    UnknownKind,
    UnknownField,
    DuplicateField,
    MissingField,
    InvalidValue,
    DuplicateDefinition,
    EmptyCatalog,
}

#[derive(Debug, Clone)]
pub struct CatalogLoadError {
    pub code: CatalogErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for CatalogLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for CatalogLoadError {}

#[derive(Debug, Default)]
struct ParsedDocument {
    definitions: Vec<Definition>,
    quest_targets: Vec<FormId>,
    locations: Vec<Location>,
}

/// Loads every `*.xml` under `dir` in path order. A definition id repeated in a later
/// file replaces the earlier one; repeating it inside one file is an error.
pub fn load_catalog(dir: &Path) -> Result<Catalog, CatalogLoadError> {
    let xml_files = collect_xml_files_sorted(dir)
        .map_err(|error| read_error(error.path, error.source))?;

    let mut merged = BTreeMap::<FormId, Definition>::new();
    let mut quest_targets = Vec::<FormId>::new();
    let mut locations = Vec::<Location>::new();

    for xml_file in &xml_files {
        let raw = fs::read_to_string(xml_file)
            .map_err(|source| read_error(xml_file.clone(), source))?;
        let parsed = parse_catalog_document(xml_file, &raw)?;
        debug!(
            file = %xml_file.display(),
            definitions = parsed.definitions.len(),
            "catalog_file_parsed"
        );
        for def in parsed.definitions {
            merged.insert(def.id, def);
        }
        quest_targets.extend(parsed.quest_targets);
        locations.extend(parsed.locations);
    }

    if merged.is_empty() {
        return Err(CatalogLoadError {
            code: CatalogErrorCode::EmptyCatalog,
            message: "catalog contains no definitions".to_string(),
            file_path: dir.to_path_buf(),
            location: None,
        });
    }

    info!(
        files = xml_files.len(),
        definitions = merged.len(),
        quest_targets = quest_targets.len(),
        locations = locations.len(),
        "catalog_loaded"
    );
    Ok(Catalog::from_parts(
        merged.into_values().collect(),
        quest_targets,
        locations,
    ))
}

pub fn parse_catalog_str(file_path: &Path, raw: &str) -> Result<Catalog, CatalogLoadError> {
    let parsed = parse_catalog_document(file_path, raw)?;
    Ok(Catalog::from_parts(
        parsed.definitions,
        parsed.quest_targets,
        parsed.locations,
    ))
}

fn parse_catalog_document(file_path: &Path, raw: &str) -> Result<ParsedDocument, CatalogLoadError> {
    let doc = Document::parse(raw).map_err(|error| CatalogLoadError {
        code: CatalogErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "Catalog" {
        return Err(error_at_node(
            CatalogErrorCode::InvalidRoot,
            "root element must be <Catalog>".to_string(),
            file_path,
            &doc,
            root,
        ));
    }

    let mut parsed = ParsedDocument::default();
    let mut seen_in_file = HashSet::<FormId>::new();
    for child in root.children().filter(|node| node.is_element()) {
        match child.tag_name().name() {
            "Definition" => {
                let def = parse_definition(file_path, &doc, child)?;
                if !seen_in_file.insert(def.id) {
                    return Err(error_at_node(
                        CatalogErrorCode::DuplicateDefinition,
                        format!("definition {} appears twice in one file", def.id),
                        file_path,
                        &doc,
                        child,
                    ));
                }
                parsed.definitions.push(def);
            }
            "QuestTarget" => {
                let raw_form = required_attr(file_path, &doc, child, "form")?;
                parsed
                    .quest_targets
                    .push(FormId(parse_id(file_path, &doc, child, "form", raw_form)?));
            }
            "Location" => parsed.locations.push(parse_location(file_path, &doc, child)?),
            other => {
                return Err(error_at_node(
                    CatalogErrorCode::UnknownElement,
                    format!("unsupported element <{other}>; expected Definition, QuestTarget or Location"),
                    file_path,
                    &doc,
                    child,
                ))
            }
        }
    }
    Ok(parsed)
}

#[derive(Debug, Default)]
struct PendingDefinition {
    editor_id: Option<String>,
    name: Option<String>,
    value: Option<i32>,
    weight: Option<f32>,
    enchanted: Option<bool>,
    playable: Option<bool>,
    model: Option<String>,
    plugin: Option<String>,
    local_id: Option<u32>,
    keywords: Vec<FormId>,
    entries: Vec<FormId>,
    produce: Option<FormId>,
    activation_text: Option<String>,
    food: Option<bool>,
    poison: Option<bool>,
    consumption_sound: Option<FormId>,
    vendor_container: Option<RefId>,
    stolen_goods_container: Option<RefId>,
    player_inventory_container: Option<RefId>,
}

const REPEATABLE_FIELDS: [&str; 2] = ["keyword", "entry"];

fn parse_definition(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> Result<Definition, CatalogLoadError> {
    let raw_id = required_attr(file_path, doc, node, "id")?;
    let id = FormId(parse_id(file_path, doc, node, "id", raw_id)?);
    let kind_name = required_attr(file_path, doc, node, "kind")?;
    if !is_known_kind(kind_name) {
        return Err(error_at_node(
            CatalogErrorCode::UnknownKind,
            format!("unknown definition kind '{kind_name}'"),
            file_path,
            doc,
            node,
        ));
    }

    let mut seen_fields = HashSet::<String>::new();
    let mut pending = PendingDefinition::default();
    for field in node.children().filter(|child| child.is_element()) {
        let field_name = field.tag_name().name().to_string();
        if !REPEATABLE_FIELDS.contains(&field_name.as_str()) && !seen_fields.insert(field_name.clone())
        {
            return Err(error_at_node(
                CatalogErrorCode::DuplicateField,
                format!("duplicate field <{field_name}> in <Definition>"),
                file_path,
                doc,
                field,
            ));
        }
        if !kind_accepts_field(kind_name, &field_name) {
            return Err(error_at_node(
                CatalogErrorCode::UnknownField,
                format!("field <{field_name}> is not valid for kind {kind_name}"),
                file_path,
                doc,
                field,
            ));
        }

        let text = field.text().map(str::trim).unwrap_or_default();
        match field_name.as_str() {
            "editorId" => pending.editor_id = Some(text.to_string()),
            // An empty name is legal; passes that need one skip the definition.
            "name" => pending.name = Some(text.to_string()),
            "value" => pending.value = Some(parse_number(file_path, doc, field, "value", text)?),
            "weight" => {
                let weight: f32 = parse_number(file_path, doc, field, "weight", text)?;
                if !weight.is_finite() {
                    return Err(error_at_node(
                        CatalogErrorCode::InvalidValue,
                        "weight must be finite".to_string(),
                        file_path,
                        doc,
                        field,
                    ));
                }
                pending.weight = Some(weight);
            }
            "enchanted" => pending.enchanted = Some(parse_bool(file_path, doc, field, text)?),
            "playable" => pending.playable = Some(parse_bool(file_path, doc, field, text)?),
            "model" => pending.model = Some(text.to_string()),
            "plugin" => pending.plugin = Some(required_text(file_path, doc, field, "plugin")?),
            "localId" => pending.local_id = Some(parse_id(file_path, doc, field, "localId", text)?),
            "keyword" => pending
                .keywords
                .push(FormId(parse_id(file_path, doc, field, "keyword", text)?)),
            "entry" => pending
                .entries
                .push(FormId(parse_id(file_path, doc, field, "entry", text)?)),
            "produce" => {
                pending.produce = Some(FormId(parse_id(file_path, doc, field, "produce", text)?))
            }
            "activationText" => pending.activation_text = Some(text.to_string()),
            "food" => pending.food = Some(parse_bool(file_path, doc, field, text)?),
            "poison" => pending.poison = Some(parse_bool(file_path, doc, field, text)?),
            "consumptionSound" => {
                pending.consumption_sound = Some(FormId(parse_id(
                    file_path,
                    doc,
                    field,
                    "consumptionSound",
                    text,
                )?))
            }
            "vendorContainer" => {
                pending.vendor_container =
                    Some(RefId(parse_id(file_path, doc, field, "vendorContainer", text)?))
            }
            "stolenGoodsContainer" => {
                pending.stolen_goods_container = Some(RefId(parse_id(
                    file_path,
                    doc,
                    field,
                    "stolenGoodsContainer",
                    text,
                )?))
            }
            "playerInventoryContainer" => {
                pending.player_inventory_container = Some(RefId(parse_id(
                    file_path,
                    doc,
                    field,
                    "playerInventoryContainer",
                    text,
                )?))
            }
            _ => {
                return Err(error_at_node(
                    CatalogErrorCode::UnknownField,
                    format!("unknown field <{field_name}> in <Definition>"),
                    file_path,
                    doc,
                    field,
                ))
            }
        }
    }

    let origin = match (pending.plugin, pending.local_id) {
        (Some(plugin), Some(local_id)) => Some(PluginOrigin { plugin, local_id }),
        (None, None) => None,
        _ => {
            return Err(error_at_node(
                CatalogErrorCode::MissingField,
                "<plugin> and <localId> must be given together".to_string(),
                file_path,
                doc,
                node,
            ))
        }
    };

    let kind = match kind_name {
        "Keyword" => DefinitionKind::Keyword,
        "Actor" => DefinitionKind::Actor,
        "Container" => DefinitionKind::Container {
            entries: pending.entries,
        },
        "Ingredient" => DefinitionKind::Ingredient,
        "SoulGem" => DefinitionKind::SoulGem,
        "Key" => DefinitionKind::Key,
        "Scroll" => DefinitionKind::Scroll,
        "Ammo" => DefinitionKind::Ammo,
        "Projectile" => DefinitionKind::Projectile,
        "Light" => DefinitionKind::Light,
        "Alchemy" => DefinitionKind::Alchemy {
            food: pending.food.unwrap_or(false),
            poison: pending.poison.unwrap_or(false),
            consumption_sound: pending.consumption_sound,
        },
        "Misc" => DefinitionKind::Misc,
        "Book" => DefinitionKind::Book,
        "Armor" => DefinitionKind::Armor,
        "Weapon" => DefinitionKind::Weapon,
        "Flora" => DefinitionKind::Flora {
            produce: pending.produce,
        },
        "Tree" => DefinitionKind::Tree {
            produce: pending.produce,
        },
        "LeveledList" => DefinitionKind::LeveledList {
            entries: pending.entries,
        },
        "Activator" => DefinitionKind::Activator {
            activation_text: pending.activation_text.unwrap_or_default(),
        },
        _ => DefinitionKind::Faction {
            vendor_container: pending.vendor_container,
            stolen_goods_container: pending.stolen_goods_container,
            player_inventory_container: pending.player_inventory_container,
        },
    };

    Ok(Definition {
        id,
        editor_id: pending.editor_id.unwrap_or_default(),
        name: pending.name.unwrap_or_default(),
        kind,
        keywords: pending.keywords,
        value: pending.value.unwrap_or(0),
        weight: pending.weight.unwrap_or(0.0),
        enchanted: pending.enchanted.unwrap_or(false),
        playable: pending.playable.unwrap_or(true),
        model_path: pending.model.unwrap_or_default(),
        origin,
    })
}

fn parse_location(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> Result<Location, CatalogLoadError> {
    let raw_id = required_attr(file_path, doc, node, "id")?;
    let id = LocationId(parse_id(file_path, doc, node, "id", raw_id)?);
    let name = node.attribute("name").unwrap_or_default().to_string();
    let player_house = match node.attribute("playerHouse") {
        Some(raw) => parse_bool(file_path, doc, node, raw)?,
        None => false,
    };
    let population_center = match node.attribute("populationCenter") {
        None | Some("None") => PopulationCenterSize::None,
        Some("Settlement") => PopulationCenterSize::Settlement,
        Some("Town") => PopulationCenterSize::Town,
        Some("City") => PopulationCenterSize::City,
        Some(other) => {
            return Err(error_at_node(
                CatalogErrorCode::InvalidValue,
                format!(
                    "invalid populationCenter '{other}'; allowed values: None, Settlement, Town, City"
                ),
                file_path,
                doc,
                node,
            ))
        }
    };
    Ok(Location {
        id,
        name,
        player_house,
        population_center,
    })
}

fn is_known_kind(kind: &str) -> bool {
    matches!(
        kind,
        "Keyword"
            | "Actor"
            | "Container"
            | "Ingredient"
            | "SoulGem"
            | "Key"
            | "Scroll"
            | "Ammo"
            | "Projectile"
            | "Light"
            | "Alchemy"
            | "Misc"
            | "Book"
            | "Armor"
            | "Weapon"
            | "Flora"
            | "Tree"
            | "LeveledList"
            | "Activator"
            | "Faction"
    )
}

fn kind_accepts_field(kind: &str, field: &str) -> bool {
    match field {
        "entry" => matches!(kind, "Container" | "LeveledList"),
        "produce" => matches!(kind, "Flora" | "Tree"),
        "activationText" => kind == "Activator",
        "food" | "poison" | "consumptionSound" => kind == "Alchemy",
        "vendorContainer" | "stolenGoodsContainer" | "playerInventoryContainer" => {
            kind == "Faction"
        }
        _ => true,
    }
}

fn required_attr<'a>(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'a, '_>,
    attr: &str,
) -> Result<&'a str, CatalogLoadError> {
    node.attribute(attr).ok_or_else(|| {
        error_at_node(
            CatalogErrorCode::MissingField,
            format!("missing required attribute '{attr}' on <{}>", node.tag_name().name()),
            file_path,
            doc,
            node,
        )
    })
}

fn required_text(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    field_name: &str,
) -> Result<String, CatalogLoadError> {
    let value = node.text().map(str::trim).unwrap_or_default().to_string();
    if value.is_empty() {
        return Err(error_at_node(
            CatalogErrorCode::MissingField,
            format!("field <{field_name}> must not be empty"),
            file_path,
            doc,
            node,
        ));
    }
    Ok(value)
}

/// Accepts `0x`-prefixed hex or plain decimal.
fn parse_id(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    field_name: &str,
    raw: &str,
) -> Result<u32, CatalogLoadError> {
    let trimmed = raw.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => trimmed.parse::<u32>(),
    };
    parsed.map_err(|_| {
        error_at_node(
            CatalogErrorCode::InvalidValue,
            format!("{field_name} '{trimmed}' is not a valid id"),
            file_path,
            doc,
            node,
        )
    })
}

fn parse_number<T: std::str::FromStr>(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    field_name: &str,
    raw: &str,
) -> Result<T, CatalogLoadError> {
    raw.parse::<T>().map_err(|_| {
        error_at_node(
            CatalogErrorCode::InvalidValue,
            format!("{field_name} '{raw}' is not a valid number"),
            file_path,
            doc,
            node,
        )
    })
}

fn parse_bool(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    raw: &str,
) -> Result<bool, CatalogLoadError> {
    match raw.trim() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(error_at_node(
            CatalogErrorCode::InvalidValue,
            format!("'{other}' is not a boolean; use true or false"),
            file_path,
            doc,
            node,
        )),
    }
}

fn error_at_node(
    code: CatalogErrorCode,
    message: String,
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> CatalogLoadError {
    let pos = doc.text_pos_at(node.range().start);
    CatalogLoadError {
        code,
        message,
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: pos.row as usize,
            column: pos.col as usize,
        }),
    }
}

struct ReadError {
    path: PathBuf,
    source: std::io::Error,
}

fn collect_xml_files_sorted(root: &Path) -> Result<Vec<PathBuf>, ReadError> {
    let mut files = Vec::<PathBuf>::new();
    collect_recursive(root, &mut files)?;
    files.sort_by_key(|path| normalize_rel_path(path.strip_prefix(root).unwrap_or(path)));
    Ok(files)
}

fn collect_recursive(current: &Path, files: &mut Vec<PathBuf>) -> Result<(), ReadError> {
    let entries = fs::read_dir(current).map_err(|source| ReadError {
        path: current.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| ReadError {
            path: current.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_recursive(&path, files)?;
        } else if path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
        {
            files.push(path);
        }
    }
    Ok(())
}

fn normalize_rel_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/")
}

fn read_error(path: PathBuf, source: std::io::Error) -> CatalogLoadError {
    CatalogLoadError {
        code: CatalogErrorCode::ReadFile,
        message: format!("failed to read catalog: {source}"),
        file_path: path,
        location: None,
    }
}
