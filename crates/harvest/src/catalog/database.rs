use std::collections::{HashMap, HashSet};

use super::types::{Definition, DefinitionKind, FormId, Location, LocationId, RefId};

/// Read-only world data. Built once per world load and shared with the resolver and scan.
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    definitions: Vec<Definition>,
    index_by_form: HashMap<FormId, usize>,
    form_by_origin: HashMap<(String, u32), FormId>,
    form_by_editor_id: HashMap<String, FormId>,
    plugins: HashSet<String>,
    quest_targets: Vec<FormId>,
    locations: HashMap<LocationId, Location>,
}

impl Catalog {
    pub fn from_parts(
        definitions: Vec<Definition>,
        quest_targets: Vec<FormId>,
        locations: Vec<Location>,
    ) -> Self {
        let mut index_by_form = HashMap::with_capacity(definitions.len());
        let mut form_by_origin = HashMap::new();
        let mut form_by_editor_id = HashMap::new();
        let mut plugins = HashSet::new();
        for (idx, def) in definitions.iter().enumerate() {
            index_by_form.insert(def.id, idx);
            if let Some(origin) = &def.origin {
                let plugin = origin.plugin.to_ascii_lowercase();
                plugins.insert(plugin.clone());
                form_by_origin.insert((plugin, origin.local_id), def.id);
            }
            if !def.editor_id.is_empty() {
                form_by_editor_id.insert(def.editor_id.clone(), def.id);
            }
        }
        Self {
            definitions,
            index_by_form,
            form_by_origin,
            form_by_editor_id,
            plugins,
            quest_targets,
            locations: locations.into_iter().map(|loc| (loc.id, loc)).collect(),
        }
    }

    pub fn definition(&self, id: FormId) -> Option<&Definition> {
        self.index_by_form
            .get(&id)
            .and_then(|idx| self.definitions.get(*idx))
    }

    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Plugin names compare case-insensitively, as load orders do.
    pub fn form_by_origin(&self, plugin: &str, local_id: u32) -> Option<FormId> {
        self.form_by_origin
            .get(&(plugin.to_ascii_lowercase(), local_id))
            .copied()
    }

    /// True when any definition was declared by `plugin`.
    pub fn includes_plugin(&self, plugin: &str) -> bool {
        self.plugins.contains(&plugin.to_ascii_lowercase())
    }

    pub fn form_by_editor_id(&self, editor_id: &str) -> Option<FormId> {
        self.form_by_editor_id.get(editor_id).copied()
    }

    pub fn quest_targets(&self) -> &[FormId] {
        &self.quest_targets
    }

    pub fn location(&self, id: LocationId) -> Option<&Location> {
        self.locations.get(&id)
    }

    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        self.locations.values()
    }

    pub fn by_kind<'a>(
        &'a self,
        matches: impl Fn(&DefinitionKind) -> bool + 'a,
    ) -> impl Iterator<Item = &'a Definition> + 'a {
        self.definitions.iter().filter(move |def| matches(&def.kind))
    }

    /// Vendor, stolen-goods and confiscation chests named by factions. Never lootable.
    pub fn faction_containers(&self) -> HashSet<RefId> {
        let mut containers = HashSet::new();
        for def in &self.definitions {
            if let DefinitionKind::Faction {
                vendor_container,
                stolen_goods_container,
                player_inventory_container,
            } = &def.kind
            {
                containers.extend(
                    [
                        *vendor_container,
                        *stolen_goods_container,
                        *player_inventory_container,
                    ]
                    .into_iter()
                    .flatten(),
                );
            }
        }
        containers
    }
}
