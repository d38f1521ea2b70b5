//! State data port.
//!
//! The planner never looks inside world states. It registers them, compares
//! them and releases them through this trait, which the surrounding world
//! model implements.

use crate::{Result, identifiers::GraphKey};

/// Port for storing world-state data and handing out keys for it.
///
/// Keys identify registrations, not contents: registering two equal states
/// yields two keys. Expansion relies on [`StateDataContext::states_equal`] and
/// [`StateDataContext::state_hash`] to merge such duplicates and then calls
/// [`StateDataContext::destroy_state`] on the extra key.
///
/// Implementations must be shareable across the worker pool; every method
/// takes `&self`.
pub trait StateDataContext: Send + Sync {
    /// Key handed out for a registered state.
    type Key: GraphKey;
    /// World-state payload.
    type Data: Clone + Send + Sync;

    /// Produce a fresh, default state.
    fn create_state(&self) -> Self::Data;

    /// Produce an independent copy of `data`.
    fn copy_state(&self, data: &Self::Data) -> Self::Data {
        data.clone()
    }

    /// Store `data` and return a new key for it.
    fn register_state(&self, data: Self::Data) -> Self::Key;

    /// Release the data behind `key`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MissingState`] if the key is unknown.
    fn destroy_state(&self, key: &Self::Key) -> Result<()>;

    /// World-model equality over state contents.
    fn states_equal(&self, a: &Self::Data, b: &Self::Data) -> bool;

    /// Hash consistent with [`StateDataContext::states_equal`].
    fn state_hash(&self, data: &Self::Data) -> u64;

    /// Copy of the data registered under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MissingState`] if the key is unknown.
    fn state_data(&self, key: &Self::Key) -> Result<Self::Data>;
}
