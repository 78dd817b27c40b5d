use std::collections::{BTreeMap, HashMap};

use crate::domain::models::{edge_key, Comment, FollowEdge, Message, Notification, Post, User};
use crate::error::{ServiceError, ServiceResult};

/// A record that lives in a [`Collection`]
pub trait Entity: Clone {
    /// Human-readable kind used in error messages
    const KIND: &'static str;

    /// Unique key within the collection
    fn key(&self) -> String;
}

impl Entity for User {
    const KIND: &'static str = "user";

    fn key(&self) -> String {
        self.id.clone()
    }
}

impl Entity for Post {
    const KIND: &'static str = "post";

    fn key(&self) -> String {
        self.id.clone()
    }
}

impl Entity for Comment {
    const KIND: &'static str = "comment";

    fn key(&self) -> String {
        self.id.clone()
    }
}

impl Entity for FollowEdge {
    const KIND: &'static str = "follow";

    fn key(&self) -> String {
        edge_key(&self.follower_id, &self.following_id)
    }
}

impl Entity for Message {
    const KIND: &'static str = "message";

    fn key(&self) -> String {
        self.id.clone()
    }
}

impl Entity for Notification {
    const KIND: &'static str = "notification";

    fn key(&self) -> String {
        self.id.clone()
    }
}

/// Keyed collection that remembers insertion order.
///
/// Rows are stored under a monotonically increasing sequence number, so
/// iteration always yields records in the order they were inserted. That
/// order is the tie-breaker for every stable sort performed on top of it.
#[derive(Debug, Clone)]
pub struct Collection<T> {
    rows: BTreeMap<u64, T>,
    index: HashMap<String, u64>,
    next_seq: u64,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            index: HashMap::new(),
            next_seq: 0,
        }
    }
}

impl<T: Entity> Collection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn get(&self, key: &str) -> ServiceResult<&T> {
        self.index
            .get(key)
            .and_then(|seq| self.rows.get(seq))
            .ok_or_else(|| ServiceError::not_found(T::KIND, key))
    }

    pub fn get_mut(&mut self, key: &str) -> ServiceResult<&mut T> {
        match self.index.get(key) {
            Some(seq) => self
                .rows
                .get_mut(seq)
                .ok_or_else(|| ServiceError::not_found(T::KIND, key)),
            None => Err(ServiceError::not_found(T::KIND, key)),
        }
    }

    /// Insert a new record; fails with `Conflict` when the key is taken
    pub fn insert(&mut self, value: T) -> ServiceResult<()> {
        let key = value.key();
        if self.index.contains_key(&key) {
            return Err(ServiceError::Conflict(format!(
                "{} {} already exists",
                T::KIND,
                key
            )));
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.index.insert(key, seq);
        self.rows.insert(seq, value);
        Ok(())
    }

    /// Apply `f` to the stored record and return an independent copy of
    /// the result
    pub fn update<F>(&mut self, key: &str, f: F) -> ServiceResult<T>
    where
        F: FnOnce(&mut T),
    {
        let row = self.get_mut(key)?;
        f(row);
        Ok(row.clone())
    }

    pub fn remove(&mut self, key: &str) -> ServiceResult<T> {
        let seq = self
            .index
            .remove(key)
            .ok_or_else(|| ServiceError::not_found(T::KIND, key))?;
        self.rows
            .remove(&seq)
            .ok_or_else(|| ServiceError::Internal(format!("{} index out of sync", T::KIND)))
    }

    /// Remove every record matching `pred`, returning the removed records
    /// in insertion order
    pub fn remove_where<P>(&mut self, mut pred: P) -> Vec<T>
    where
        P: FnMut(&T) -> bool,
    {
        let doomed: Vec<u64> = self
            .rows
            .iter()
            .filter(|(_, row)| pred(*row))
            .map(|(seq, _)| *seq)
            .collect();

        let mut removed = Vec::with_capacity(doomed.len());
        for seq in doomed {
            if let Some(row) = self.rows.remove(&seq) {
                self.index.remove(&row.key());
                removed.push(row);
            }
        }
        removed
    }

    /// Records in insertion order
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> {
        self.rows.values()
    }

    pub fn iter_mut(&mut self) -> impl DoubleEndedIterator<Item = &mut T> {
        self.rows.values_mut()
    }

    /// Cloned records matching `pred`, in insertion order
    pub fn filter_cloned<P>(&self, mut pred: P) -> Vec<T>
    where
        P: FnMut(&T) -> bool,
    {
        self.rows.values().filter(|row| pred(*row)).cloned().collect()
    }
}
