//! Normalized client-side cache of remote entities.
//!
//! Collections are held as `{ids, entities}`: an ordered identifier list plus an
//! identifier-indexed map. [`Collection`] accepts both that shape and a plain list
//! and flattens either into an ordered list.
use crate::bidding::model::{Bid, Item};
use crate::conversation::model::Conversation;
use crate::user::User;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

mod store;

pub use store::MarketCache;

// region:    --- Entity
/// Something the cache can key and order.
pub trait Entity: Clone {
    fn entity_id(&self) -> &str;
    fn created_at(&self) -> DateTime<Utc>;
}

impl Entity for Item {
    fn entity_id(&self) -> &str {
        &self.id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Bids key on `id`, unlike the `_id` of the other entities.
impl Entity for Bid {
    fn entity_id(&self) -> &str {
        &self.id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Entity for Conversation {
    fn entity_id(&self) -> &str {
        &self.id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Entity for User {
    fn entity_id(&self) -> &str {
        &self.id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
// endregion: --- Entity

// region:    --- Entity State
#[derive(Debug, Clone, PartialEq)]
pub struct EntityState<T> {
    ids: Vec<String>,
    entities: HashMap<String, T>,
}

impl<T> Default for EntityState<T> {
    fn default() -> Self {
        Self {
            ids: Vec::new(),
            entities: HashMap::new(),
        }
    }
}

impl<T: Entity> EntityState<T> {
    /// Replaces the whole collection, newest first. Later entries win on duplicate ids.
    pub fn set_all(&mut self, mut entities: Vec<T>) {
        entities.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        self.ids.clear();
        self.entities.clear();
        for entity in entities {
            let id = entity.entity_id().to_string();
            if self.entities.insert(id.clone(), entity).is_none() {
                self.ids.push(id);
            }
        }
    }

    /// Inserts or replaces one entity. New entities go to the front.
    pub fn upsert(&mut self, entity: T) {
        let id = entity.entity_id().to_string();
        if self.entities.insert(id.clone(), entity).is_none() {
            self.ids.insert(0, id);
        }
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.entities.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        self.entities.get_mut(id)
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Entities in id order.
    pub fn all(&self) -> Vec<&T> {
        self.ids.iter().filter_map(|id| self.entities.get(id)).collect()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entities.values_mut()
    }
}
// endregion: --- Entity State

// region:    --- Collection
/// The two shapes a fetched collection can take.
#[derive(Debug, Clone, PartialEq)]
pub enum Collection<T> {
    List(Vec<T>),
    Normalized(EntityState<T>),
}

impl<T: Entity> Collection<T> {
    /// Ordered list view. For the normalized shape this follows the id list,
    /// skipping ids without an entity and repeated ids.
    pub fn flatten(self) -> Vec<T> {
        match self {
            Collection::List(list) => list,
            Collection::Normalized(EntityState { ids, mut entities }) => {
                let mut seen = HashSet::with_capacity(ids.len());
                ids.into_iter()
                    .filter(|id| seen.insert(id.clone()))
                    .filter_map(|id| entities.remove(&id))
                    .collect()
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Collection::List(list) => list.len(),
            Collection::Normalized(state) => state.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> From<Vec<T>> for Collection<T> {
    fn from(list: Vec<T>) -> Self {
        Collection::List(list)
    }
}

impl<T> From<EntityState<T>> for Collection<T> {
    fn from(state: EntityState<T>) -> Self {
        Collection::Normalized(state)
    }
}
// endregion: --- Collection
