//! Document entity identity: ids, the allocator, and keyed storage

use crate::{EditError, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Internal identifier shared by every id-keyed entity kind
///
/// Ids are unique across the whole document, never reused after a delete,
/// and double as the INI section key (`01000000` style, 8 digits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    pub fn new(id: u64) -> Self {
        EntityId(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// The INI key this id is written under
    pub fn key(&self) -> String {
        format!("{:08}", self.0)
    }

    /// Parse an INI key (or any decimal string) back into an id
    pub fn parse_key(s: &str) -> Option<EntityId> {
        let s = s.trim();
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        s.parse().ok().map(EntityId)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08}", self.0)
    }
}

/// Waypoint number (0..max_waypoints), unique per document
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WaypointId(u32);

impl WaypointId {
    pub fn new(n: u32) -> Self {
        WaypointId(n)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for WaypointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// First id handed out by a fresh allocator
pub const FIRST_ENTITY_ID: u64 = 1_000_000;

/// Monotonic id source for one document session
///
/// `allocate` takes `&self` so compound operations can draw ids while
/// holding shared borrows of the document.
#[derive(Debug)]
pub struct IdAllocator {
    next: AtomicU64,
}

impl IdAllocator {
    pub fn new() -> Self {
        IdAllocator {
            next: AtomicU64::new(FIRST_ENTITY_ID),
        }
    }

    /// Issue a fresh id, distinct from everything issued or seeded before
    pub fn allocate(&self) -> EntityId {
        EntityId(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// Ensure future ids are above `max_observed` (called after loading)
    pub fn seed(&self, max_observed: EntityId) {
        self.next.fetch_max(max_observed.0 + 1, Ordering::Relaxed);
    }

    /// The id the next `allocate` call will return
    pub fn peek(&self) -> EntityId {
        EntityId(self.next.load(Ordering::Relaxed))
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for IdAllocator {
    fn clone(&self) -> Self {
        IdAllocator {
            next: AtomicU64::new(self.next.load(Ordering::Relaxed)),
        }
    }
}

/// Base trait for every id-keyed document entity
pub trait DocEntity {
    fn id(&self) -> EntityId;
    fn name(&self) -> &str;
}

/// Storage for one entity collection
///
/// Uses FxHashMap for fast hashing of integer keys. Iteration through
/// `iter_ordered` is sorted by id so scans and listings are deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityStore<T> {
    entities: FxHashMap<EntityId, T>,
}

impl<T: DocEntity> EntityStore<T> {
    pub fn new() -> Self {
        EntityStore {
            entities: FxHashMap::default(),
        }
    }

    /// Insert an entity under its own id; the id must be free
    pub fn insert(&mut self, entity: T) -> Result<()> {
        let id = entity.id();
        if self.entities.contains_key(&id) {
            return Err(EditError::IntegrityViolation(format!(
                "id {id} is already in use"
            )));
        }
        self.entities.insert(id, entity);
        Ok(())
    }

    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        self.entities.get_mut(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn remove(&mut self, id: EntityId) -> Option<T> {
        self.entities.remove(&id)
    }

    /// Find the first entity (lowest id) with an exact name
    pub fn find_by_name(&self, name: &str) -> Option<&T> {
        self.iter_ordered().find(|e| e.name() == name)
    }

    /// All ids, sorted
    pub fn ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.entities.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Iterate entities sorted by id
    pub fn iter_ordered(&self) -> impl Iterator<Item = &T> {
        let mut items: Vec<&T> = self.entities.values().collect();
        items.sort_unstable_by_key(|e| e.id());
        items.into_iter()
    }

    /// Iterate mutably in arbitrary order
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entities.values_mut()
    }

    /// Highest id present, if any
    pub fn max_id(&self) -> Option<EntityId> {
        self.entities.keys().copied().max()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl<T: DocEntity> Default for EntityStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

// Stored as a plain id-ordered list; each entity carries its own id.
impl<T: DocEntity + Serialize> Serialize for EntityStore<T> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(self.iter_ordered())
    }
}

impl<'de, T: DocEntity + Deserialize<'de>> Deserialize<'de> for EntityStore<T> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let items = Vec::<T>::deserialize(deserializer)?;
        let mut store = EntityStore::new();
        for item in items {
            store
                .insert(item)
                .map_err(<D::Error as serde::de::Error>::custom)?;
        }
        Ok(store)
    }
}
