//! Identifier types for plan graph states and actions.
//!
//! The graph is generic over its key types; anything satisfying [`GraphKey`]
//! can be used. [`StateKey`] and [`ActionKey`] are the small value types handed
//! out by the bundled adapters.

use std::{fmt, hash::Hash};

use serde::{Deserialize, Serialize};

/// Bound shared by every key stored in the plan graph.
///
/// `Ord` is required so that queries such as the optimal-action lookup can
/// break ties deterministically.
pub trait GraphKey: Copy + Eq + Ord + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T> GraphKey for T where T: Copy + Eq + Ord + Hash + fmt::Debug + Send + Sync + 'static {}

/// Identifier for a registered world state.
///
/// Built from the hash of the state data plus a disambiguator, so two distinct
/// states whose data hashes collide still receive different keys.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct StateKey {
    hash: u64,
    disambiguator: u32,
}

impl StateKey {
    /// Create a state key.
    ///
    /// # Examples
    ///
    /// ```
    /// use plangraph::identifiers::StateKey;
    ///
    /// let key = StateKey::new(0xfeed, 1);
    /// assert_eq!(key.hash(), 0xfeed);
    /// assert_eq!(key.disambiguator(), 1);
    /// ```
    pub const fn new(hash: u64, disambiguator: u32) -> Self {
        Self {
            hash,
            disambiguator,
        }
    }

    /// Hash of the state data this key was registered with.
    pub const fn hash(&self) -> u64 {
        self.hash
    }

    pub const fn disambiguator(&self) -> u32 {
        self.disambiguator
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}#{}", self.hash, self.disambiguator)
    }
}

impl From<u64> for StateKey {
    fn from(hash: u64) -> Self {
        Self::new(hash, 0)
    }
}

/// Identifier for an action applicable in some state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct ActionKey(u32);

impl ActionKey {
    /// Create an action key.
    ///
    /// # Examples
    ///
    /// ```
    /// use plangraph::identifiers::ActionKey;
    ///
    /// assert_eq!(ActionKey::new(3).index(), 3);
    /// ```
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    pub const fn index(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a{}", self.0)
    }
}

impl From<u32> for ActionKey {
    fn from(index: u32) -> Self {
        Self::new(index)
    }
}
