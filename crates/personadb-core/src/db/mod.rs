mod collection;

pub use collection::Collection;

use crate::{
    bus::{EventBus, Subscription, Topic},
    error::Error,
    integrity::{self, IntegrityReport},
    model::{Avatar, EntityKind, Product, find_duplicate},
    store::{FileBackend, MemoryBackend, StorageBackend, Store},
};
use std::path::Path;
use tracing::{debug, warn};

///
/// Db
///
/// Handle to the persistent store and its event bus. All mutation funnels
/// through here; no other component writes to storage, which is the whole
/// of the consistency discipline in a single-threaded core.
///

pub struct Db {
    store: Store,
    bus: EventBus,
}

impl Db {
    /// Open a file-backed store rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, Error> {
        let backend = FileBackend::open(dir)?;
        Ok(Self::with_backend(Box::new(backend)))
    }

    /// Non-persistent store for tests and throwaway sessions.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_backend(Box::new(MemoryBackend::new()))
    }

    /// Build a store over any backend.
    #[must_use]
    pub fn with_backend(backend: Box<dyn StorageBackend>) -> Self {
        Self {
            store: Store::new(backend),
            bus: EventBus::new(),
        }
    }

    /// The bus this store publishes invalidations on.
    #[must_use]
    pub const fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Register a callback for one invalidation topic.
    pub fn subscribe(&self, topic: Topic, callback: impl Fn() + 'static) -> Subscription {
        self.bus.subscribe(topic, callback)
    }

    // ======================================================================
    // Reads
    // ======================================================================

    #[must_use]
    pub fn list<E: EntityKind>(&self) -> Collection<E> {
        Collection::load(&self.store)
    }

    #[must_use]
    pub fn get<E: EntityKind>(&self, id: &str) -> Option<E> {
        let collection = self.list::<E>();
        collection.find_by_id(id).cloned()
    }

    /// Avatars attached to one product.
    #[must_use]
    pub fn avatars_for_product(&self, product_id: &str) -> Vec<Avatar> {
        self.list::<Avatar>()
            .into_iter()
            .filter(|avatar| avatar.product_id.as_deref() == Some(product_id))
            .collect()
    }

    // ======================================================================
    // Writes
    // ======================================================================

    /// Insert `candidate` unless a structural duplicate already exists.
    ///
    /// `false` is rejection, not failure: a matching record is already in
    /// the collection and the caller should proceed against it.
    pub fn create<E: EntityKind>(&self, mut candidate: E) -> bool {
        let mut collection = self.list::<E>();
        if let Some(existing) = find_duplicate(&candidate, &collection) {
            debug!(
                entity = E::ENTITY_NAME,
                id = existing.id().unwrap_or_default(),
                "duplicate rejected"
            );
            return false;
        }

        candidate.ensure_id();
        candidate.ensure_created_at();
        collection.push(candidate);
        collection.persist(&self.store);

        self.emit_changed(E::TOPIC);
        true
    }

    /// Replace the record matching `entity`'s id, preserving the stored
    /// immutable fields. Returns `false` — and emits nothing — when no
    /// record matches: an accepted idempotent no-op, not an error.
    pub fn update<E: EntityKind>(&self, mut entity: E) -> bool {
        let Some(id) = entity.id().map(str::to_string) else {
            warn!(entity = E::ENTITY_NAME, "update without an id ignored");
            return false;
        };

        let mut collection = self.list::<E>();
        let Some(slot) = collection
            .iter_mut()
            .find(|stored| stored.id() == Some(id.as_str()))
        else {
            debug!(entity = E::ENTITY_NAME, %id, "update target not found");
            return false;
        };

        entity.preserve_immutable(slot);
        *slot = entity;
        collection.persist(&self.store);

        self.emit_changed(E::TOPIC);
        true
    }

    /// Remove the record with `id`. Returns `false` when absent. Deleting
    /// a product never cascades to avatars that reference it; the
    /// dangling pointer is the integrity layer's to report.
    pub fn delete<E: EntityKind>(&self, id: &str) -> bool {
        let mut collection = self.list::<E>();
        let before = collection.len();
        collection.retain(|stored| stored.id() != Some(id));
        if collection.len() == before {
            debug!(entity = E::ENTITY_NAME, %id, "delete target not found");
            return false;
        }

        collection.persist(&self.store);
        self.emit_changed(E::TOPIC);
        true
    }

    /// Admin wipe of both collections.
    pub fn clear(&self) {
        self.store.remove(Product::COLLECTION_KEY);
        self.store.remove(Avatar::COLLECTION_KEY);

        self.bus.emit(Topic::ProductsUpdated);
        self.bus.emit(Topic::AvatarsUpdated);
        self.bus.emit(Topic::AllDataUpdated);
    }

    // ======================================================================
    // Integrity
    // ======================================================================

    /// Advisory referential diagnostics. A non-valid report is normal
    /// mid-flow; it only matters if it persists.
    #[must_use]
    pub fn validate_integrity(&self) -> IntegrityReport {
        let products = self.list::<Product>();
        let avatars = self.list::<Avatar>();

        integrity::validate(&products, &avatars)
    }

    /// Best-effort reattachment of unanchored avatars. Persists and emits
    /// only when at least one avatar was reassigned. Opt-in only; nothing
    /// calls this implicitly.
    pub fn repair_orphans(&self) {
        let products = self.list::<Product>();
        let mut avatars = self.list::<Avatar>();

        if integrity::repair(&products, &mut avatars) == 0 {
            return;
        }

        avatars.persist(&self.store);
        self.emit_changed(Topic::AvatarsUpdated);
    }

    // All store borrows are released before emission, so a subscriber's
    // reload observes the completed write.
    fn emit_changed(&self, topic: Topic) {
        self.bus.emit(topic);
        self.bus.emit(Topic::AllDataUpdated);
    }
}
