use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::catalog::{
    Catalog, Definition, DefinitionKind, FormId, DRINK_SOUND_FORM, GOLD_FORM, LOCKPICK_FORM,
};
use crate::text::Translator;

use super::leveled::flatten_leveled;
use super::object_type::{ObjectType, ResourceType};
use super::rules::RuleTables;
use super::verbs::{verb_of, ActivationVerbs};

/// Diagnostics gathered while resolving. Nothing here is an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveReport {
    /// Conflicting keyword types and second leaves under one producer.
    pub conflicts: usize,
    pub unnamed_skipped: usize,
    pub unmatched_verbs: BTreeSet<String>,
    pub duplicate_verbs: usize,
}

/// The resolved `Definition -> (ObjectType, ResourceType)` mapping. Read-only after load.
#[derive(Debug, Clone, Default)]
pub struct Taxonomy {
    types: HashMap<FormId, ObjectType>,
    resources: HashMap<FormId, ResourceType>,
    produce_contents: HashMap<FormId, FormId>,
    producer_lootables: Vec<(FormId, FormId)>,
    glowable_book_keywords: HashSet<FormId>,
    vendor_containers: HashSet<FormId>,
    off_limits_containers: HashSet<FormId>,
    mounted_looting_forbidden: bool,
    report: ResolveReport,
}

impl Taxonomy {
    pub fn object_type(&self, form: FormId) -> ObjectType {
        self.types.get(&form).copied().unwrap_or_default()
    }

    /// Ore veins without an explicit resource are plain ore.
    pub fn resource_type(&self, form: FormId) -> Option<ResourceType> {
        match self.resources.get(&form) {
            Some(resource) => Some(*resource),
            None if self.object_type(form) == ObjectType::OreVein => Some(ResourceType::Ore),
            None => None,
        }
    }

    /// Leaf of a producer whose yield is a leveled list.
    pub fn produce_content(&self, producer: FormId) -> Option<FormId> {
        self.produce_contents.get(&producer).copied()
    }

    /// Producer to yield pairs known from the catalog alone.
    pub fn producer_lootables(&self) -> &[(FormId, FormId)] {
        &self.producer_lootables
    }

    pub fn is_glowable_book(&self, def: &Definition) -> bool {
        def.keywords
            .iter()
            .any(|keyword| self.glowable_book_keywords.contains(keyword))
    }

    /// Container definitions stocked with merchant gold.
    pub fn vendor_containers(&self) -> &HashSet<FormId> {
        &self.vendor_containers
    }

    /// Plugin-specific containers that must never be looted.
    pub fn off_limits_containers(&self) -> &HashSet<FormId> {
        &self.off_limits_containers
    }

    pub fn forbids_mounted_looting(&self) -> bool {
        self.mounted_looting_forbidden
    }

    pub fn report(&self) -> &ResolveReport {
        &self.report
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Runs every pass over `catalog` in order. A pass only fills definitions still unknown,
/// except the per-kind hook of the keyword pass, which may correct its own result.
pub fn resolve(catalog: &Catalog, rules: &RuleTables, translator: &dyn Translator) -> Taxonomy {
    let mut resolver = Resolver {
        catalog,
        rules,
        taxonomy: Taxonomy::default(),
        keyword_types: HashMap::new(),
    };
    resolver.static_kinds();
    resolver.consumables();
    resolver.keywords();
    resolver.produce();
    resolver.activation_verbs(translator);
    resolver.special_cases();
    resolver.vendor_containers();
    resolver.load_order_exceptions();

    let taxonomy = resolver.taxonomy;
    info!(
        definitions = catalog.len(),
        classified = taxonomy.types.len(),
        conflicts = taxonomy.report.conflicts,
        unmatched_verbs = taxonomy.report.unmatched_verbs.len(),
        "taxonomy_resolved"
    );
    taxonomy
}

struct Resolver<'a> {
    catalog: &'a Catalog,
    rules: &'a RuleTables,
    taxonomy: Taxonomy,
    keyword_types: HashMap<FormId, ObjectType>,
}

impl Resolver<'_> {
    fn object_type(&self, form: FormId) -> ObjectType {
        self.taxonomy.object_type(form)
    }

    /// Commits only over `unknown`. Returns false when the definition already had a type.
    fn assign(&mut self, form: FormId, object_type: ObjectType) -> bool {
        if !object_type.is_known() || self.object_type(form).is_known() {
            return false;
        }
        self.taxonomy.types.insert(form, object_type);
        true
    }

    fn named(&mut self, def: &Definition, pass: &'static str) -> bool {
        if def.has_name() {
            return true;
        }
        self.taxonomy.report.unnamed_skipped += 1;
        debug!(pass, form = %def.id, "resolver_skipped_unnamed");
        false
    }

    fn static_kinds(&mut self) {
        let mut assigned = 0;
        let seeds = [
            (LOCKPICK_FORM, ObjectType::Lockpick),
            (GOLD_FORM, ObjectType::Septims),
        ];
        for (form, object_type) in seeds {
            if self.catalog.definition(form).is_some() && self.assign(form, object_type) {
                assigned += 1;
            }
        }
        let catalog = self.catalog;
        for def in catalog.definitions() {
            let object_type = match def.kind {
                DefinitionKind::Container { .. } => ObjectType::Container,
                DefinitionKind::SoulGem => ObjectType::Soulgem,
                DefinitionKind::Scroll => ObjectType::Scroll,
                DefinitionKind::Ammo | DefinitionKind::Projectile => ObjectType::Ammo,
                DefinitionKind::Light => ObjectType::Light,
                DefinitionKind::Key => ObjectType::Key,
                DefinitionKind::Actor => ObjectType::Actor,
                _ => continue,
            };
            if self.assign(def.id, object_type) {
                assigned += 1;
            }
        }
        debug!(pass = "static_kinds", assigned, "resolver_pass_complete");
    }

    fn consumables(&mut self) {
        let catalog = self.catalog;
        let mut assigned = 0;
        for def in catalog.definitions() {
            let object_type = match def.kind {
                DefinitionKind::Alchemy {
                    food: true,
                    consumption_sound,
                    ..
                } => {
                    if consumption_sound == Some(DRINK_SOUND_FORM) {
                        ObjectType::Drink
                    } else {
                        ObjectType::Food
                    }
                }
                DefinitionKind::Alchemy { poison: true, .. } => ObjectType::Poison,
                DefinitionKind::Alchemy { .. } => ObjectType::Potion,
                DefinitionKind::Ingredient => ObjectType::Ingredient,
                _ => continue,
            };
            if !self.named(def, "consumables") {
                continue;
            }
            if self.assign(def.id, object_type) {
                assigned += 1;
            }
        }
        debug!(pass = "consumables", assigned, "resolver_pass_complete");
    }

    fn keywords(&mut self) {
        let catalog = self.catalog;
        for def in catalog.by_kind(|kind| matches!(kind, DefinitionKind::Keyword)) {
            if def.editor_id.is_empty() {
                warn!(form = %def.id, "keyword_missing_editor_id");
                continue;
            }
            if self
                .rules
                .glowable_book_keywords
                .iter()
                .any(|name| *name == def.editor_id)
            {
                self.taxonomy.glowable_book_keywords.insert(def.id);
            }
            if let Some(object_type) = self.rules.keyword_type(&def.editor_id) {
                self.keyword_types.insert(def.id, object_type);
            }
        }

        let mut assigned = 0;
        for def in catalog.definitions() {
            let Some(default_type) = keyword_default(&def.kind) else {
                continue;
            };
            if !self.named(def, "keywords") {
                continue;
            }
            if !def.playable {
                debug!(form = %def.id, "resolver_skipped_non_playable");
                continue;
            }
            if self.object_type(def.id).is_known() {
                continue;
            }

            let mut specific = ObjectType::Unknown;
            let mut has_default = false;
            for keyword in &def.keywords {
                let Some(&keyword_type) = self.keyword_types.get(keyword) else {
                    continue;
                };
                if keyword_type == default_type {
                    has_default = true;
                } else if !specific.is_known() {
                    specific = keyword_type;
                } else if specific != keyword_type {
                    self.taxonomy.report.conflicts += 1;
                    warn!(
                        form = %def.id,
                        kept = %specific,
                        ignored = %keyword_type,
                        "keyword_conflict"
                    );
                }
            }

            let mut object_type = if specific.is_known() {
                specific
            } else if has_default {
                default_type
            } else {
                ObjectType::Unknown
            };
            object_type = kind_hook(def, object_type);

            if !object_type.is_known()
                && (def.value > 0 || def.model_path.to_ascii_lowercase().contains("clutter"))
            {
                object_type = ObjectType::Clutter;
            }
            if self.assign(def.id, object_type) {
                assigned += 1;
            } else {
                debug!(form = %def.id, "resolver_not_mappable");
            }
        }
        debug!(pass = "keywords", assigned, "resolver_pass_complete");
    }

    fn produce(&mut self) {
        let catalog = self.catalog;
        let mut assigned = 0;
        for def in catalog.definitions() {
            let (produce, fallback) = match def.kind {
                DefinitionKind::Flora { produce } => (produce, ObjectType::Flora),
                DefinitionKind::Tree { produce } => (produce, ObjectType::Food),
                _ => continue,
            };
            if !self.named(def, "produce") {
                continue;
            }
            let Some(produce) = produce else {
                warn!(form = %def.id, "producer_without_yield");
                continue;
            };

            let is_leveled = matches!(
                catalog.definition(produce).map(|yielded| &yielded.kind),
                Some(DefinitionKind::LeveledList { .. })
            );
            if is_leveled {
                let contents = flatten_leveled(catalog, produce, |form| self.object_type(form));
                for ignored in &contents.conflicts {
                    self.taxonomy.report.conflicts += 1;
                    warn!(producer = %def.id, ignored = %ignored, "leveled_content_conflict");
                }
                if let Some((leaf, leaf_type)) = contents.first {
                    self.taxonomy.produce_contents.insert(def.id, leaf);
                    self.taxonomy.producer_lootables.push((def.id, leaf));
                    if self.assign(def.id, leaf_type) {
                        assigned += 1;
                    }
                }
                continue;
            }

            let yielded_type = self.object_type(produce);
            let object_type = if yielded_type.is_known() {
                self.taxonomy.producer_lootables.push((def.id, produce));
                yielded_type
            } else {
                fallback
            };
            if self.assign(def.id, object_type) {
                assigned += 1;
            }
        }
        debug!(pass = "produce", assigned, "resolver_pass_complete");
    }

    fn activation_verbs(&mut self, translator: &dyn Translator) {
        let verbs = ActivationVerbs::build(&self.rules.activation_verbs, translator);
        self.taxonomy.report.duplicate_verbs = verbs.duplicates();

        let catalog = self.catalog;
        let rules = self.rules;
        let mut assigned = 0;
        for def in catalog.definitions() {
            let DefinitionKind::Activator { activation_text } = &def.kind else {
                continue;
            };
            if !self.named(def, "activation_verbs") {
                continue;
            }
            if self.object_type(def.id).is_known() {
                continue;
            }
            let verb = verb_of(activation_text);
            let Some(object_type) = verbs.lookup(verb) else {
                if !verb.is_empty() {
                    self.taxonomy.report.unmatched_verbs.insert(verb.to_string());
                }
                debug!(form = %def.id, verb, "activator_verb_unmatched");
                continue;
            };
            if self.assign(def.id, object_type) {
                assigned += 1;
                if object_type == ObjectType::OreVein {
                    let resource = rules.ore_vein_resource(&def.name);
                    self.taxonomy.resources.insert(def.id, resource);
                }
            }
        }
        if !self.taxonomy.report.unmatched_verbs.is_empty() {
            warn!(
                verbs = ?self.taxonomy.report.unmatched_verbs,
                "activation_verbs_unmatched"
            );
        }
        debug!(pass = "activation_verbs", assigned, "resolver_pass_complete");
    }

    fn special_cases(&mut self) {
        let rules = self.rules;
        let mut assigned = 0;
        for case in &rules.special_cases {
            for local_id in &case.local_ids {
                let Some(form) = self.catalog.form_by_origin(&case.plugin, *local_id) else {
                    continue;
                };
                if !self.assign(form, case.object_type) {
                    debug!(form = %form, plugin = %case.plugin, "special_case_already_classified");
                    continue;
                }
                assigned += 1;
                if let Some(resource) = case.resource_type {
                    self.taxonomy.resources.insert(form, resource);
                }
            }
        }
        debug!(pass = "special_cases", assigned, "resolver_pass_complete");
    }

    fn vendor_containers(&mut self) {
        let gold_lists: HashSet<FormId> = self
            .rules
            .vendor_gold_lists
            .iter()
            .filter_map(|list| self.catalog.form_by_origin(&list.plugin, list.local_id))
            .collect();
        if gold_lists.is_empty() {
            return;
        }
        for def in self.catalog.definitions() {
            if let DefinitionKind::Container { entries } = &def.kind {
                if entries.iter().any(|entry| gold_lists.contains(entry)) {
                    self.taxonomy.vendor_containers.insert(def.id);
                }
            }
        }
        debug!(
            gold_lists = gold_lists.len(),
            containers = self.taxonomy.vendor_containers.len(),
            "vendor_containers_found"
        );
    }

    /// Containers and switches that only apply while a given plugin is loaded.
    fn load_order_exceptions(&mut self) {
        let catalog = self.catalog;
        for rule in &self.rules.off_limits_containers {
            if !catalog.includes_plugin(&rule.plugin) {
                continue;
            }
            let by_id = rule
                .local_id
                .and_then(|local_id| catalog.form_by_origin(&rule.plugin, local_id))
                .filter(|form| {
                    catalog
                        .definition(*form)
                        .is_some_and(|def| matches!(def.kind, DefinitionKind::Container { .. }))
                });
            let matched: Vec<FormId> = match (by_id, &rule.name) {
                (Some(form), _) => vec![form],
                (None, Some(name)) => catalog
                    .by_kind(|kind| matches!(kind, DefinitionKind::Container { .. }))
                    .filter(|def| def.name == *name)
                    .map(|def| def.id)
                    .collect(),
                (None, None) => Vec::new(),
            };
            for form in matched {
                info!(form = %form, plugin = %rule.plugin, "off_limits_container_found");
                self.taxonomy.off_limits_containers.insert(form);
            }
        }

        self.taxonomy.mounted_looting_forbidden = self
            .rules
            .mounted_looting_plugins
            .iter()
            .any(|plugin| catalog.includes_plugin(plugin));
        if self.taxonomy.mounted_looting_forbidden {
            info!("mounted_looting_forbidden");
        }
    }
}

fn keyword_default(kind: &DefinitionKind) -> Option<ObjectType> {
    match kind {
        DefinitionKind::Misc => Some(ObjectType::Clutter),
        DefinitionKind::Book => Some(ObjectType::Book),
        DefinitionKind::Armor => Some(ObjectType::Armor),
        DefinitionKind::Weapon => Some(ObjectType::Weapon),
        _ => None,
    }
}

/// Armor and weapons correct material-derived types and promote enchanted items.
fn kind_hook(def: &Definition, object_type: ObjectType) -> ObjectType {
    if !object_type.is_known() {
        return object_type;
    }
    let corrected = match (&def.kind, object_type) {
        (DefinitionKind::Armor, ObjectType::AnimalHide) => ObjectType::Armor,
        (DefinitionKind::Armor | DefinitionKind::Weapon, other) => other,
        _ => return object_type,
    };
    if def.enchanted {
        corrected.enchanted()
    } else {
        corrected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PluginOrigin;
    use crate::taxonomy::rules::SubstringRule;
    use crate::text::TranslationTable;

    fn def(id: u32, kind: DefinitionKind) -> Definition {
        Definition {
            id: FormId(id),
            editor_id: format!("Def{id}"),
            name: format!("Def {id}"),
            kind,
            keywords: Vec::new(),
            value: 0,
            weight: 1.0,
            enchanted: false,
            playable: true,
            model_path: String::new(),
            origin: None,
        }
    }

    fn keyword(id: u32, editor_id: &str) -> Definition {
        let mut keyword = def(id, DefinitionKind::Keyword);
        keyword.editor_id = editor_id.to_string();
        keyword.name = String::new();
        keyword
    }

    fn with_keywords(mut def: Definition, keywords: &[u32]) -> Definition {
        def.keywords = keywords.iter().copied().map(FormId).collect();
        def
    }

    fn resolve_default(defs: Vec<Definition>) -> Taxonomy {
        resolve(
            &Catalog::from_parts(defs, Vec::new(), Vec::new()),
            &RuleTables::default(),
            &TranslationTable::default(),
        )
    }

    fn base_keywords() -> Vec<Definition> {
        vec![
            keyword(0x10, "VendorItemClutter"),
            keyword(0x11, "VendorItemGem"),
            keyword(0x12, "ArmorLight"),
            keyword(0x13, "VendorItemAnimalHide"),
            keyword(0x14, "VendorItemJewelry"),
            keyword(0x15, "VendorItemDrink"),
            keyword(0x16, "VendorItemOreIngot"),
            keyword(0x17, "WeapTypeSword"),
        ]
    }

    #[test]
    fn resolution_is_deterministic() {
        let mut defs = base_keywords();
        defs.push(with_keywords(def(0x100, DefinitionKind::Misc), &[0x11, 0x16]));
        defs.push(with_keywords(def(0x101, DefinitionKind::Armor), &[0x12]));
        defs.push(def(0x102, DefinitionKind::Container { entries: Vec::new() }));
        let first = resolve_default(defs.clone());
        for _ in 0..5 {
            let again = resolve_default(defs.clone());
            for candidate in &defs {
                assert_eq!(again.object_type(candidate.id), first.object_type(candidate.id));
            }
            assert_eq!(again.report(), first.report());
        }
    }

    #[test]
    fn static_kinds_and_seeded_singletons() {
        let mut lockpick = def(LOCKPICK_FORM.0, DefinitionKind::Misc);
        lockpick.value = 2;
        let taxonomy = resolve_default(vec![
            lockpick,
            def(GOLD_FORM.0, DefinitionKind::Misc),
            def(0x200, DefinitionKind::Key),
            def(0x201, DefinitionKind::Projectile),
            def(0x202, DefinitionKind::Actor),
        ]);
        assert_eq!(taxonomy.object_type(LOCKPICK_FORM), ObjectType::Lockpick);
        assert_eq!(taxonomy.object_type(GOLD_FORM), ObjectType::Septims);
        assert_eq!(taxonomy.object_type(FormId(0x200)), ObjectType::Key);
        assert_eq!(taxonomy.object_type(FormId(0x201)), ObjectType::Ammo);
        assert_eq!(taxonomy.object_type(FormId(0x202)), ObjectType::Actor);
    }

    #[test]
    fn consumables_use_sound_and_poison_flag() {
        let taxonomy = resolve_default(vec![
            def(
                1,
                DefinitionKind::Alchemy {
                    food: true,
                    poison: false,
                    consumption_sound: Some(DRINK_SOUND_FORM),
                },
            ),
            def(
                2,
                DefinitionKind::Alchemy {
                    food: true,
                    poison: false,
                    consumption_sound: None,
                },
            ),
            def(
                3,
                DefinitionKind::Alchemy {
                    food: false,
                    poison: true,
                    consumption_sound: None,
                },
            ),
            def(
                4,
                DefinitionKind::Alchemy {
                    food: false,
                    poison: false,
                    consumption_sound: None,
                },
            ),
            def(5, DefinitionKind::Ingredient),
        ]);
        assert_eq!(taxonomy.object_type(FormId(1)), ObjectType::Drink);
        assert_eq!(taxonomy.object_type(FormId(2)), ObjectType::Food);
        assert_eq!(taxonomy.object_type(FormId(3)), ObjectType::Poison);
        assert_eq!(taxonomy.object_type(FormId(4)), ObjectType::Potion);
        assert_eq!(taxonomy.object_type(FormId(5)), ObjectType::Ingredient);
    }

    #[test]
    fn first_substring_rule_wins_over_longer_later_rule() {
        let mut rules = RuleTables::default();
        rules.keyword_substrings = vec![
            SubstringRule {
                pattern: "Drink".to_string(),
                object_type: ObjectType::Drink,
            },
            SubstringRule {
                pattern: "VendorItemDrink".to_string(),
                object_type: ObjectType::Food,
            },
        ];
        let catalog = Catalog::from_parts(
            vec![
                keyword(0x20, "VendorItemDrink"),
                keyword(0x21, "Drink"),
                with_keywords(def(0x300, DefinitionKind::Misc), &[0x20, 0x21]),
            ],
            Vec::new(),
            Vec::new(),
        );
        let taxonomy = resolve(&catalog, &rules, &TranslationTable::default());
        assert_eq!(taxonomy.object_type(FormId(0x300)), ObjectType::Drink);
        assert_eq!(taxonomy.report().conflicts, 0);
    }

    #[test]
    fn default_keyword_defers_to_specific_keyword() {
        let mut defs = base_keywords();
        defs.push(with_keywords(def(0x400, DefinitionKind::Misc), &[0x10]));
        defs.push(with_keywords(def(0x401, DefinitionKind::Misc), &[0x10, 0x11]));
        defs.push(with_keywords(def(0x402, DefinitionKind::Misc), &[0x11, 0x10]));
        let taxonomy = resolve_default(defs);
        assert_eq!(taxonomy.object_type(FormId(0x400)), ObjectType::Clutter);
        assert_eq!(taxonomy.object_type(FormId(0x401)), ObjectType::Gem);
        assert_eq!(taxonomy.object_type(FormId(0x402)), ObjectType::Gem);
    }

    #[test]
    fn conflicting_specific_keywords_keep_first_and_count() {
        let mut defs = base_keywords();
        defs.push(with_keywords(def(0x500, DefinitionKind::Misc), &[0x11, 0x16]));
        let taxonomy = resolve_default(defs);
        assert_eq!(taxonomy.object_type(FormId(0x500)), ObjectType::Gem);
        assert_eq!(taxonomy.report().conflicts, 1);
    }

    #[test]
    fn armor_hook_corrects_hide_and_decorates_enchantment() {
        let mut defs = base_keywords();
        defs.push(with_keywords(def(0x600, DefinitionKind::Armor), &[0x13]));
        let mut enchanted_ring = with_keywords(def(0x601, DefinitionKind::Armor), &[0x14]);
        enchanted_ring.enchanted = true;
        defs.push(enchanted_ring);
        let mut enchanted_sword = with_keywords(def(0x602, DefinitionKind::Weapon), &[0x17]);
        enchanted_sword.enchanted = true;
        defs.push(enchanted_sword);
        let mut enchanted_cuirass = with_keywords(def(0x603, DefinitionKind::Armor), &[0x12]);
        enchanted_cuirass.enchanted = true;
        defs.push(enchanted_cuirass);

        let taxonomy = resolve_default(defs);
        assert_eq!(taxonomy.object_type(FormId(0x600)), ObjectType::Armor);
        assert_eq!(taxonomy.object_type(FormId(0x601)), ObjectType::EnchantedJewelry);
        assert_eq!(taxonomy.object_type(FormId(0x602)), ObjectType::EnchantedWeapon);
        assert_eq!(taxonomy.object_type(FormId(0x603)), ObjectType::EnchantedArmor);
    }

    #[test]
    fn unkeyworded_misc_falls_back_to_clutter_by_value_or_model() {
        let mut valued = def(0x700, DefinitionKind::Misc);
        valued.value = 3;
        let mut modelled = def(0x701, DefinitionKind::Misc);
        modelled.model_path = "Meshes/Clutter/Basket01.nif".to_string();
        let worthless = def(0x702, DefinitionKind::Misc);
        let mut unnamed = def(0x703, DefinitionKind::Misc);
        unnamed.name = " ".to_string();
        unnamed.value = 10;
        let mut hidden = def(0x704, DefinitionKind::Misc);
        hidden.playable = false;
        hidden.value = 10;

        let taxonomy = resolve_default(vec![valued, modelled, worthless, unnamed, hidden]);
        assert_eq!(taxonomy.object_type(FormId(0x700)), ObjectType::Clutter);
        assert_eq!(taxonomy.object_type(FormId(0x701)), ObjectType::Clutter);
        assert_eq!(taxonomy.object_type(FormId(0x702)), ObjectType::Unknown);
        assert_eq!(taxonomy.object_type(FormId(0x703)), ObjectType::Unknown);
        assert_eq!(taxonomy.object_type(FormId(0x704)), ObjectType::Unknown);
        assert_eq!(taxonomy.report().unnamed_skipped, 1);
    }

    #[test]
    fn producers_adopt_yield_or_fall_back() {
        let taxonomy = resolve_default(vec![
            def(0x800, DefinitionKind::Ingredient),
            def(0x801, DefinitionKind::Flora { produce: Some(FormId(0x800)) }),
            def(0x802, DefinitionKind::Flora { produce: Some(FormId(0x999)) }),
            def(0x803, DefinitionKind::Tree { produce: Some(FormId(0x999)) }),
            def(0x804, DefinitionKind::Flora { produce: None }),
        ]);
        assert_eq!(taxonomy.object_type(FormId(0x801)), ObjectType::Ingredient);
        assert_eq!(taxonomy.object_type(FormId(0x802)), ObjectType::Flora);
        assert_eq!(taxonomy.object_type(FormId(0x803)), ObjectType::Food);
        assert_eq!(taxonomy.object_type(FormId(0x804)), ObjectType::Unknown);
        assert_eq!(taxonomy.producer_lootables(), &[(FormId(0x801), FormId(0x800))]);
    }

    #[test]
    fn leveled_produce_records_first_leaf_and_counts_conflict() {
        let taxonomy = resolve_default(vec![
            def(0x900, DefinitionKind::Ingredient),
            def(0x901, DefinitionKind::Ingredient),
            def(0x910, DefinitionKind::LeveledList { entries: vec![FormId(0x911), FormId(0x912)] }),
            def(0x911, DefinitionKind::LeveledList { entries: vec![FormId(0x900)] }),
            def(0x912, DefinitionKind::LeveledList { entries: vec![FormId(0x900)] }),
            def(0x920, DefinitionKind::LeveledList { entries: vec![FormId(0x900), FormId(0x901)] }),
            def(0x930, DefinitionKind::Flora { produce: Some(FormId(0x910)) }),
            def(0x931, DefinitionKind::Flora { produce: Some(FormId(0x920)) }),
        ]);
        assert_eq!(taxonomy.produce_content(FormId(0x930)), Some(FormId(0x900)));
        assert_eq!(taxonomy.produce_content(FormId(0x931)), Some(FormId(0x900)));
        assert_eq!(taxonomy.object_type(FormId(0x930)), ObjectType::Ingredient);
        assert_eq!(taxonomy.report().conflicts, 1);
    }

    #[test]
    fn activators_classified_by_verb_with_ore_resource() {
        let translations = TranslationTable::from_pairs([
            ("$SHSE_ACTIVATE_VERBS_OREVEIN", "Mine"),
            ("$SHSE_ACTIVATE_VERBS_CRITTER", "Catch"),
        ]);
        let activator = |id: u32, name: &str, text: &str| {
            let mut activator = def(
                id,
                DefinitionKind::Activator {
                    activation_text: text.to_string(),
                },
            );
            activator.name = name.to_string();
            activator
        };
        let catalog = Catalog::from_parts(
            vec![
                activator(1, "Iron Ore Vein", "Mine Iron Ore Vein"),
                activator(2, "Sulfur Deposit", "Mine Sulfur"),
                activator(3, "Moth", "Catch Moth"),
                activator(4, "Lever", "Pull Lever"),
            ],
            Vec::new(),
            Vec::new(),
        );
        let taxonomy = resolve(&catalog, &RuleTables::default(), &translations);
        assert_eq!(taxonomy.object_type(FormId(1)), ObjectType::OreVein);
        assert_eq!(taxonomy.resource_type(FormId(1)), Some(ResourceType::Ore));
        assert_eq!(taxonomy.resource_type(FormId(2)), Some(ResourceType::Volcanic));
        assert_eq!(taxonomy.object_type(FormId(3)), ObjectType::Critter);
        assert_eq!(taxonomy.object_type(FormId(4)), ObjectType::Unknown);
        assert!(taxonomy.report().unmatched_verbs.contains("Pull"));
    }

    #[test]
    fn special_cases_never_override() {
        let mut fossil = def(0x0500_0f41, DefinitionKind::Activator { activation_text: String::new() });
        fossil.origin = Some(PluginOrigin {
            plugin: "Fossilsyum.esp".to_string(),
            local_id: 0x3f41b,
        });
        let mut gold_pile = def(0x0201_8486, DefinitionKind::Key);
        gold_pile.origin = Some(PluginOrigin {
            plugin: "Dragonborn.esm".to_string(),
            local_id: 0x18486,
        });
        let taxonomy = resolve_default(vec![fossil, gold_pile]);
        assert_eq!(taxonomy.object_type(FormId(0x0500_0f41)), ObjectType::OreVein);
        assert_eq!(
            taxonomy.resource_type(FormId(0x0500_0f41)),
            Some(ResourceType::VolcanicDigSite)
        );
        assert_eq!(taxonomy.object_type(FormId(0x0201_8486)), ObjectType::Key);
    }

    #[test]
    fn vendor_gold_marks_containers() {
        let mut gold_list = def(0x0001_7102, DefinitionKind::LeveledList { entries: Vec::new() });
        gold_list.origin = Some(PluginOrigin {
            plugin: "Skyrim.esm".to_string(),
            local_id: 0x17102,
        });
        let taxonomy = resolve_default(vec![
            gold_list,
            def(0xA00, DefinitionKind::Container { entries: vec![FormId(0x0001_7102)] }),
            def(0xA01, DefinitionKind::Container { entries: Vec::new() }),
        ]);
        assert!(taxonomy.vendor_containers().contains(&FormId(0xA00)));
        assert!(!taxonomy.vendor_containers().contains(&FormId(0xA01)));
    }

    fn from_plugin(mut def: Definition, plugin: &str, local_id: u32) -> Definition {
        def.origin = Some(PluginOrigin {
            plugin: plugin.to_string(),
            local_id,
        });
        def
    }

    fn container(id: u32, name: &str) -> Definition {
        let mut chest = def(id, DefinitionKind::Container { entries: Vec::new() });
        chest.name = name.to_string();
        chest
    }

    #[test]
    fn load_order_exceptions_need_their_plugin() {
        let taxonomy = resolve_default(vec![
            container(0xC00, "Missive Board"),
            container(0xC01, "Chest"),
        ]);
        assert!(taxonomy.off_limits_containers().is_empty());
        assert!(!taxonomy.forbids_mounted_looting());
    }

    #[test]
    fn load_order_exceptions_match_by_form_then_name() {
        let god_chest = from_plugin(
            container(0x0A04_b352, "Auxiliary Armor Storage"),
            "Hothtrooper44_ArmorCompilation.esp",
            0x4b352,
        );
        let stones_chest = from_plugin(container(0x0B01_a184, "Chest"), "Gray Fox Cowl.esm", 0x1a184);
        let plain_chest = from_plugin(container(0x0B01_a185, "Chest"), "Gray Fox Cowl.esm", 0x1a185);
        let missives = from_plugin(def(0x0C00_0800, DefinitionKind::Misc), "Missives.esp", 0x800);
        let board = from_plugin(container(0x0D00_0801, "Missive Board"), "Missives - Patch.esp", 0x801);
        let horses = from_plugin(def(0x0E00_0800, DefinitionKind::Misc), "Convenient Horses.esp", 0x800);

        let taxonomy = resolve_default(vec![god_chest, stones_chest, plain_chest, missives, board, horses]);
        let off_limits = taxonomy.off_limits_containers();
        assert!(off_limits.contains(&FormId(0x0A04_b352)));
        assert!(off_limits.contains(&FormId(0x0B01_a184)));
        assert!(!off_limits.contains(&FormId(0x0B01_a185)));
        assert!(off_limits.contains(&FormId(0x0D00_0801)));
        assert_eq!(off_limits.len(), 3);
        assert!(taxonomy.forbids_mounted_looting());
    }

    #[test]
    fn glowable_books_match_by_keyword() {
        let note = with_keywords(def(0xB00, DefinitionKind::Book), &[0x30]);
        let plain = def(0xB01, DefinitionKind::Book);
        let taxonomy = resolve_default(vec![keyword(0x30, "VendorItemNote"), note.clone(), plain.clone()]);
        assert!(taxonomy.is_glowable_book(&note));
        assert!(!taxonomy.is_glowable_book(&plain));
        assert_eq!(taxonomy.object_type(note.id), ObjectType::Book);
    }
}
