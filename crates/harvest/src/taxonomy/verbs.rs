use std::collections::HashMap;

use tracing::{debug, warn};

use super::object_type::ObjectType;
use super::rules::VerbRule;
use crate::text::Translator;

/// Verb to type lookup built from the session's translation strings.
#[derive(Debug, Clone, Default)]
pub struct ActivationVerbs {
    by_verb: HashMap<String, ObjectType>,
    duplicates: usize,
}

impl ActivationVerbs {
    /// Each rule's translation is a comma-separated verb list. A verb claimed by an earlier
    /// rule keeps its first type.
    pub fn build(rules: &[VerbRule], translator: &dyn Translator) -> Self {
        let mut verbs = Self::default();
        for rule in rules {
            let Some(list) = translator.translate(&rule.translation_key) else {
                warn!(key = %rule.translation_key, "activation_verbs_missing_translation");
                continue;
            };
            for verb in list.split(',').map(str::trim).filter(|verb| !verb.is_empty()) {
                match verbs.by_verb.get(verb) {
                    Some(existing) => {
                        verbs.duplicates += 1;
                        warn!(
                            key = %rule.translation_key,
                            verb,
                            existing = %existing,
                            "activation_verb_duplicate_ignored"
                        );
                    }
                    None => {
                        debug!(key = %rule.translation_key, verb, object_type = %rule.object_type, "activation_verb_registered");
                        verbs.by_verb.insert(verb.to_string(), rule.object_type);
                    }
                }
            }
        }
        verbs
    }

    pub fn lookup(&self, verb: &str) -> Option<ObjectType> {
        self.by_verb.get(verb).copied()
    }

    pub fn len(&self) -> usize {
        self.by_verb.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_verb.is_empty()
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}

/// First whitespace-delimited token of an activation prompt, e.g. "Mine" from "Mine Iron Ore".
pub fn verb_of(activation_text: &str) -> &str {
    activation_text.split_whitespace().next().unwrap_or_default()
}
