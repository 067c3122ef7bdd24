use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{id::generate_id, model::eq_ignore_case, Fruit};
use crate::{errors::ServiceError, storage::JsonSnapshot};

/// In-memory fruit collection keyed by id.
///
/// Cloning is cheap and every clone shares the same map. All reads and writes
/// go through the `RwLock`.
#[derive(Clone, Default)]
pub struct FruitStore {
    inner: Arc<RwLock<HashMap<String, Fruit>>>,
    // only flipped while holding the write guard
    closed: Arc<AtomicBool>,
}

impl FruitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from an existing map. Values whose `id` disagrees with
    /// their key are rewritten so that key and id match.
    pub fn from_map(mut map: HashMap<String, Fruit>) -> Self {
        for (key, fruit) in map.iter_mut() {
            if fruit.id != *key {
                warn!(key = %key, id = %fruit.id, "fruit id does not match its key, using the key");
                fruit.id = key.clone();
            }
        }
        Self { inner: Arc::new(RwLock::new(map)), closed: Arc::default() }
    }

    /// Initialize from a snapshot file. A missing file gives an empty store.
    pub async fn load(snapshot: &JsonSnapshot) -> Result<Self, ServiceError> {
        let map = snapshot.load::<String, Fruit>().await?;
        Ok(Self::from_map(map))
    }

    /// Persist the current contents; an empty store writes nothing.
    pub async fn save(&self, snapshot: &JsonSnapshot) -> Result<bool, ServiceError> {
        let map = self.inner.read().await.clone();
        snapshot.save(&map).await
    }

    /// Stop accepting creates. Once this returns no later create can land in
    /// the map, so a following [`FruitStore::save`] sees the final contents.
    pub async fn close(&self) {
        let _guard = self.inner.write().await;
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// All fruits, in no particular order.
    pub async fn list_all(&self) -> Vec<Fruit> {
        let map = self.inner.read().await;
        map.values().cloned().collect()
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Fruit, ServiceError> {
        let map = self.inner.read().await;
        map.get(id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))
    }

    /// Insert a new fruit and return its id. An empty id is replaced by a
    /// generated one; an id already in use is rejected without retrying.
    pub async fn create(&self, input: Fruit) -> Result<String, ServiceError> {
        self.create_with(input, generate_id).await
    }

    /// Same as [`FruitStore::create`] with a caller-provided id generator.
    pub async fn create_with<G>(&self, mut input: Fruit, gen: G) -> Result<String, ServiceError>
    where
        G: FnOnce() -> Result<String, ServiceError>,
    {
        let generated = input.id.is_empty();
        if generated {
            input.id = gen()?;
        }

        let mut map = self.inner.write().await;
        if self.closed.load(Ordering::SeqCst) {
            warn!(id = %input.id, "store closed, rejecting fruit");
            return Err(ServiceError::Closed);
        }
        if map.contains_key(&input.id) {
            warn!(id = %input.id, generated, "rejecting duplicated fruit id");
            return Err(ServiceError::DuplicateId(input.id));
        }
        let id = input.id.clone();
        map.insert(id.clone(), input);
        let total = map.len();
        drop(map);

        info!(event = "fruit_created", %id, generated, total, "fruit created");
        Ok(id)
    }

    /// Union of the id match, the color matches and the fruit matches, in that
    /// order. A record matching several criteria appears once per criterion.
    pub async fn search(&self, criteria: &Fruit) -> Vec<Fruit> {
        let map = self.inner.read().await;
        let mut results = Vec::new();

        if !criteria.id.is_empty() {
            if let Some(fruit) = map.get(&criteria.id) {
                results.push(fruit.clone());
            }
        }

        if !criteria.color.is_empty() {
            results.extend(
                map.values()
                    .filter(|f| eq_ignore_case(&f.color, &criteria.color))
                    .cloned(),
            );
        }

        if !criteria.fruit.is_empty() {
            results.extend(
                map.values()
                    .filter(|f| eq_ignore_case(&f.fruit, &criteria.fruit))
                    .cloned(),
            );
        }

        debug!(
            id = %criteria.id,
            fruit = %criteria.fruit,
            color = %criteria.color,
            matches = results.len(),
            "fruit search"
        );
        results
    }

    /// Copy of the underlying map.
    pub async fn snapshot(&self) -> HashMap<String, Fruit> {
        self.inner.read().await.clone()
    }
}
