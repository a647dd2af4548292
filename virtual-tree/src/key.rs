use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use alloc::sync::Arc;

use crate::options::CompareFn;

#[cfg(not(feature = "std"))]
use alloc::collections::BTreeMap;
#[cfg(feature = "std")]
use std::collections::HashMap;

#[cfg(feature = "std")]
pub(crate) type KeyMap<K, V> = HashMap<K, V>;
#[cfg(not(feature = "std"))]
pub(crate) type KeyMap<K, V> = BTreeMap<K, V>;

#[cfg(feature = "std")]
#[doc(hidden)]
pub trait KeyCacheKey: core::hash::Hash + Eq {}
#[cfg(feature = "std")]
impl<K: core::hash::Hash + Eq> KeyCacheKey for K {}

#[cfg(not(feature = "std"))]
#[doc(hidden)]
pub trait KeyCacheKey: Ord {}
#[cfg(not(feature = "std"))]
impl<K: Ord> KeyCacheKey for K {}

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// A caller key tagged with a process-wide, monotonically increasing id.
///
/// Ordering compares the wrapped value first and breaks ties by id, so keys that compare equal
/// keep their insertion order. Equality and hashing use the id alone: two `UniqueKey`s are the
/// same key only if one is a clone of the other.
#[derive(Clone)]
pub struct UniqueKey<K> {
    value: K,
    id: u64,
}

impl<K> UniqueKey<K> {
    pub fn new(value: K) -> Self {
        let id = NEXT_ID.fetch_add(1, AtomicOrdering::Relaxed);
        Self { value, id }
    }

    pub fn value(&self) -> &K {
        &self.value
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn into_value(self) -> K {
        self.value
    }

    /// Compares two keys using `compare` for the wrapped values.
    pub fn cmp_by(&self, other: &Self, compare: impl FnOnce(&K, &K) -> Ordering) -> Ordering {
        if self.id == other.id {
            return Ordering::Equal;
        }
        compare(&self.value, &other.value).then(self.id.cmp(&other.id))
    }

    /// Lifts a comparer over `K` into a comparer over `UniqueKey<K>`.
    pub fn comparer(compare: CompareFn<K>) -> CompareFn<Self>
    where
        K: 'static,
    {
        Arc::new(move |a: &Self, b: &Self| a.cmp_by(b, |x, y| compare(x, y)))
    }
}

impl<K> PartialEq for UniqueKey<K> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<K> Eq for UniqueKey<K> {}

impl<K> Hash for UniqueKey<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<K: Ord> PartialOrd for UniqueKey<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: Ord> Ord for UniqueKey<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_by(other, K::cmp)
    }
}

impl<K: fmt::Debug> fmt::Debug for UniqueKey<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}#{}", self.value, self.id)
    }
}
