//! In-memory state data context.
//!
//! Keeps every registered state in a concurrent map, so scheduler workers can
//! register successors from the worker pool without extra locking.

use std::{
    hash::{DefaultHasher, Hash, Hasher},
    sync::atomic::{AtomicU32, Ordering},
};

use dashmap::DashMap;

use crate::{
    Result,
    error::{Error, key_string},
    identifiers::StateKey,
    ports::StateDataContext,
};

/// State context backed by a [`DashMap`].
///
/// Keys combine the data hash with a registration counter, so registering equal
/// data twice yields two distinct keys, exactly what expansion expects to
/// deduplicate.
///
/// # Examples
///
/// ```
/// use plangraph::{adapters::InMemoryStateContext, ports::StateDataContext};
///
/// let context = InMemoryStateContext::<u64>::new();
/// let a = context.register_state(42);
/// let b = context.register_state(42);
///
/// assert_ne!(a, b);
/// assert_eq!(a.hash(), b.hash());
/// assert!(context.states_equal(&context.state_data(&a)?, &context.state_data(&b)?));
///
/// context.destroy_state(&b)?;
/// assert_eq!(context.len(), 1);
/// # Ok::<(), plangraph::Error>(())
/// ```
#[derive(Debug)]
pub struct InMemoryStateContext<D> {
    states: DashMap<StateKey, D>,
    registrations: AtomicU32,
}

impl<D> InMemoryStateContext<D> {
    pub fn new() -> Self {
        Self {
            states: DashMap::new(),
            registrations: AtomicU32::new(0),
        }
    }

    /// Number of live registrations.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl<D> Default for InMemoryStateContext<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> StateDataContext for InMemoryStateContext<D>
where
    D: Clone + Eq + Hash + Default + Send + Sync,
{
    type Key = StateKey;
    type Data = D;

    fn create_state(&self) -> D {
        D::default()
    }

    fn register_state(&self, data: D) -> StateKey {
        let hash = self.state_hash(&data);
        let registration = self.registrations.fetch_add(1, Ordering::Relaxed);
        let key = StateKey::new(hash, registration);
        self.states.insert(key, data);
        key
    }

    fn destroy_state(&self, key: &StateKey) -> Result<()> {
        self.states
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| Error::MissingState {
                state: key_string(key),
            })
    }

    fn states_equal(&self, a: &D, b: &D) -> bool {
        a == b
    }

    fn state_hash(&self, data: &D) -> u64 {
        let mut hasher = DefaultHasher::new();
        data.hash(&mut hasher);
        hasher.finish()
    }

    fn state_data(&self, key: &StateKey) -> Result<D> {
        self.states
            .get(key)
            .map(|data| data.value().clone())
            .ok_or_else(|| Error::MissingState {
                state: key_string(key),
            })
    }
}
