mod leveled;
mod object_type;
mod producers;
mod resolver;
mod rules;
mod verbs;

pub use leveled::{flatten_leveled, LeveledContents};
pub use object_type::{ObjectType, ResourceType};
pub use producers::{ProducerLootable, ProducerLootables};
pub use resolver::{resolve, ResolveReport, Taxonomy};
pub use rules::{
    OffLimitsContainerRule, PluginForm, ResourceNameRule, RuleTables, RulesError, SpecialCase,
    SubstringRule, VerbRule,
};
pub use verbs::{verb_of, ActivationVerbs};
