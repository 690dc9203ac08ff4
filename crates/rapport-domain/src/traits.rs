//! Trait definitions for external interactions
//!
//! These traits define the boundary between the friendship rules and
//! the storage engine. Implementations live in other crates.

use crate::{ActorId, Friendship, FriendshipId, FriendshipUpdate, NewFriendship, StatusFilter};

/// Storage for directed friendship records
///
/// Implemented by the infrastructure layer (rapport-store). The store knows
/// nothing about pairs; keeping both halves consistent is the caller's job,
/// which is why every mutation should run inside [`FriendshipStore::transaction`].
pub trait FriendshipStore {
    /// Error type for store operations
    type Error;

    /// Insert a record and return its identifier
    fn create(&mut self, friendship: NewFriendship) -> Result<FriendshipId, Self::Error>;

    /// Find the record owned by `owner` pointing at `peer`, filtered by status
    fn find(
        &self,
        owner: ActorId,
        peer: ActorId,
        filter: &StatusFilter,
    ) -> Result<Option<Friendship>, Self::Error>;

    /// Find a record between `a` and `b` in either direction
    fn find_any(&self, a: ActorId, b: ActorId) -> Result<Option<Friendship>, Self::Error>;

    /// Apply a partial update to a record
    fn update(&mut self, id: FriendshipId, update: FriendshipUpdate) -> Result<(), Self::Error>;

    /// Remove a record
    fn delete(&mut self, id: FriendshipId) -> Result<(), Self::Error>;

    /// All records owned by `owner` whose status passes `filter`, oldest first
    fn list(&self, owner: ActorId, filter: &StatusFilter) -> Result<Vec<Friendship>, Self::Error>;

    /// All records owned by or pointing at `actor`
    fn list_involving(&self, actor: ActorId) -> Result<Vec<Friendship>, Self::Error>;

    /// Run `body` atomically
    ///
    /// Either every write made by `body` is committed, or (when `body` or the
    /// commit fails) none is. A call made while a transaction is already open
    /// joins the outer transaction.
    fn transaction<T, F>(&mut self, body: F) -> Result<T, Self::Error>
    where
        F: FnOnce(&mut Self) -> Result<T, Self::Error>;
}
