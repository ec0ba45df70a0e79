use crate::{model::EntityKind, store::Store};
use derive_more::{Deref, DerefMut};

///
/// Collection
///
/// Owned working copy of one persisted collection. Loaded whole, mutated
/// in memory, persisted whole — the storage substrate has no finer
/// granularity than the blob under the collection key.
///

#[derive(Clone, Debug, Deref, DerefMut, PartialEq)]
pub struct Collection<E: EntityKind>(Vec<E>);

impl<E: EntityKind> Collection<E> {
    pub(crate) fn load(store: &Store) -> Self {
        Self(store.load_collection(E::COLLECTION_KEY))
    }

    pub(crate) fn persist(&self, store: &Store) {
        store.save_collection(E::COLLECTION_KEY, &self.0);
    }

    /// The record carrying `id`, if any.
    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<&E> {
        self.0.iter().find(|entity| entity.id() == Some(id))
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<E> {
        self.0
    }
}

impl<E: EntityKind> IntoIterator for Collection<E> {
    type Item = E;
    type IntoIter = std::vec::IntoIter<E>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
