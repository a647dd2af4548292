use alloc::vec::Vec;

use crate::key::{KeyCacheKey, KeyMap};

/// How [`ResourcePool::acquire`] found a resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Reuse {
    /// Parked under the requested key; likely still shows matching content.
    ExactKey,
    /// Taken from the generic spare stack.
    Spare,
    /// Parked under another key; must be repainted from scratch.
    Repurposed,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoolStats {
    pub parked: usize,
    pub spare: usize,
}

impl PoolStats {
    pub fn total(&self) -> usize {
        self.parked + self.spare
    }
}

impl core::ops::Add for PoolStats {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            parked: self.parked + rhs.parked,
            spare: self.spare + rhs.spare,
        }
    }
}

/// Idle resources of one kind, parked by the key of the item they last showed.
#[derive(Clone, Debug)]
pub struct ResourcePool<K, R> {
    by_key: KeyMap<K, R>,
    spare: Vec<R>,
}

impl<K: KeyCacheKey, R> Default for ResourcePool<K, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: KeyCacheKey, R> ResourcePool<K, R> {
    pub fn new() -> Self {
        Self {
            by_key: KeyMap::new(),
            spare: Vec::new(),
        }
    }

    /// Parks `resource` under `key`. A resource already parked there moves to the spare stack.
    pub fn release(&mut self, key: K, resource: R) {
        if let Some(displaced) = self.by_key.insert(key, resource) {
            self.spare.push(displaced);
        }
    }

    pub fn release_spare(&mut self, resource: R) {
        self.spare.push(resource);
    }

    /// Takes a resource for `key`: exact key match first, then a spare, then any parked one.
    pub fn acquire(&mut self, key: &K) -> Option<(R, Reuse)>
    where
        K: Clone,
    {
        if let Some(resource) = self.by_key.remove(key) {
            return Some((resource, Reuse::ExactKey));
        }
        if let Some(resource) = self.spare.pop() {
            return Some((resource, Reuse::Spare));
        }
        let any = self.by_key.keys().next().cloned()?;
        self.by_key
            .remove(&any)
            .map(|resource| (resource, Reuse::Repurposed))
    }

    pub fn len(&self) -> usize {
        self.by_key.len() + self.spare.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty() && self.spare.is_empty()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            parked: self.by_key.len(),
            spare: self.spare.len(),
        }
    }

    /// Removes and returns every idle resource.
    pub fn drain(&mut self) -> Vec<R> {
        let mut out: Vec<R> = self.spare.drain(..).collect();
        out.extend(core::mem::take(&mut self.by_key).into_values());
        out
    }
}
