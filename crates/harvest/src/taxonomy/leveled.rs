use std::collections::HashSet;

use crate::catalog::{Catalog, DefinitionKind, FormId};

use super::object_type::ObjectType;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LeveledContents {
    /// First classified leaf in depth-first order.
    pub first: Option<(FormId, ObjectType)>,
    /// Later leaves that differ from `first`. Discarded, reported only.
    pub conflicts: Vec<FormId>,
}

/// Depth-first walk over a leveled list and its nested lists. Each list is expanded once,
/// so shared or cyclic sub-lists cannot loop.
pub fn flatten_leveled(
    catalog: &Catalog,
    root: FormId,
    type_of: impl Fn(FormId) -> ObjectType,
) -> LeveledContents {
    let mut contents = LeveledContents::default();
    let mut visited = HashSet::from([root]);
    let Some(root_entries) = leveled_entries(catalog, root) else {
        return contents;
    };
    let mut stack = vec![root_entries.iter()];

    while let Some(entries) = stack.last_mut() {
        let Some(&entry) = entries.next() else {
            stack.pop();
            continue;
        };
        if let Some(nested) = leveled_entries(catalog, entry) {
            if visited.insert(entry) {
                stack.push(nested.iter());
            }
            continue;
        }
        let object_type = type_of(entry);
        if !object_type.is_known() {
            continue;
        }
        match contents.first {
            None => contents.first = Some((entry, object_type)),
            Some((first, _)) if first == entry => {}
            Some(_) => {
                if !contents.conflicts.contains(&entry) {
                    contents.conflicts.push(entry);
                }
            }
        }
    }
    contents
}

fn leveled_entries(catalog: &Catalog, form: FormId) -> Option<&[FormId]> {
    match &catalog.definition(form)?.kind {
        DefinitionKind::LeveledList { entries } => Some(entries.as_slice()),
        _ => None,
    }
}
