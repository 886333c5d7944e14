use std::collections::HashMap;
use std::sync::Mutex;

use crate::catalog::FormId;
use crate::sync::lock_or_recover;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerLootable {
    Resolved(FormId),
    /// A resolution request went out and no answer has arrived yet.
    Pending,
    Unrequested,
}

/// What a producer (plant, critter) actually yields. Seeded by the resolver and completed at
/// runtime by the action collaborator answering `GetCritterIngredient`.
#[derive(Debug, Default)]
pub struct ProducerLootables {
    inner: Mutex<HashMap<FormId, Option<FormId>>>,
}

impl ProducerLootables {
    pub fn seeded(known: impl IntoIterator<Item = (FormId, FormId)>) -> Self {
        Self {
            inner: Mutex::new(
                known
                    .into_iter()
                    .map(|(producer, lootable)| (producer, Some(lootable)))
                    .collect(),
            ),
        }
    }

    pub fn lootable_for(&self, producer: FormId) -> ProducerLootable {
        match lock_or_recover(&self.inner, "producer_lootables").get(&producer) {
            Some(Some(lootable)) => ProducerLootable::Resolved(*lootable),
            Some(None) => ProducerLootable::Pending,
            None => ProducerLootable::Unrequested,
        }
    }

    /// `None` marks a request in flight and only succeeds for a producer with no entry yet,
    /// so the caller sends at most one request. `Some` records the answer.
    pub fn set_lootable_for_producer(&self, producer: FormId, lootable: Option<FormId>) -> bool {
        let mut guard = lock_or_recover(&self.inner, "producer_lootables");
        match lootable {
            None => {
                if guard.contains_key(&producer) {
                    false
                } else {
                    guard.insert(producer, None);
                    true
                }
            }
            Some(_) => guard.insert(producer, lootable) != Some(lootable),
        }
    }

    pub fn len(&self) -> usize {
        lock_or_recover(&self.inner, "producer_lootables").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
