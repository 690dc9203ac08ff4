//! Actor module - identity of anything that can hold friendships

use crate::Friendship;
use std::fmt;

/// Stable identifier for an actor, based on UUIDv7
///
/// Ordering is total and stable, which the engine relies on to write
/// the two halves of a pair in a deterministic order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActorId(u128);

impl ActorId {
    /// Generate a new UUIDv7-based ActorId
    ///
    /// # Examples
    ///
    /// ```
    /// use rapport_domain::ActorId;
    ///
    /// let id = ActorId::new();
    /// assert!(id.value() > 0);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create an ActorId from a raw u128 value
    ///
    /// This is primarily for storage layer deserialization.
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse an ActorId from its hyphenated UUID string
    ///
    /// # Examples
    ///
    /// ```
    /// use rapport_domain::ActorId;
    ///
    /// let id = ActorId::new();
    /// let parsed = ActorId::from_string(&id.to_string()).unwrap();
    /// assert_eq!(id, parsed);
    /// ```
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid actor id: {}", e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

/// Capability of an entity to take part in friendships
///
/// Any host type becomes friendable by supplying a stable identifier.
/// The lifecycle hooks are optional; the engine calls them after the
/// transaction that caused the change has committed, each time on the
/// owner of the affected record.
pub trait Friendable {
    /// Stable, unique identifier of this actor
    fn actor_id(&self) -> ActorId;

    /// Whether `other` is the same actor as `self`
    fn is_same_actor(&self, other: &Self) -> bool
    where
        Self: Sized,
    {
        self.actor_id() == other.actor_id()
    }

    /// A new record owned by this actor was created (by a request)
    fn on_friendship_created(&self, _friendship: &Friendship) {}

    /// A record owned by this actor became accepted
    fn on_friendship_accepted(&self, _friendship: &Friendship) {}

    /// This actor blocked the peer of `friendship`
    fn on_friendship_blocked(&self, _friendship: &Friendship) {}

    /// A record owned by this actor was removed
    fn on_friendship_destroyed(&self, _friendship: &Friendship) {}
}

impl Friendable for ActorId {
    fn actor_id(&self) -> ActorId {
        *self
    }
}
