//! Read-only lookups and derived relationship sets
//!
//! None of these open a transaction.

use crate::{EngineError, FriendshipEngine};
use rapport_domain::{
    ActorId, Friendable, Friendship, FriendshipStatus, FriendshipStore, StatusFilter,
};
use std::collections::HashSet;
use std::fmt::Display;

impl<S> FriendshipEngine<S>
where
    S: FriendshipStore,
    S::Error: Display,
{
    fn lookup(
        &self,
        owner: ActorId,
        peer: ActorId,
        filter: StatusFilter,
    ) -> Result<Option<Friendship>, EngineError> {
        self.store
            .find(owner, peer, &filter)
            .map_err(|e| EngineError::Store(e.to_string()))
    }

    /// The record owned by `owner` pointing at `peer`
    pub fn find_one_side(
        &self,
        owner: ActorId,
        peer: ActorId,
    ) -> Result<Option<Friendship>, EngineError> {
        self.lookup(owner, peer, StatusFilter::Any)
    }

    /// The record `owner → peer`, only if it has `status`
    pub fn find_relation(
        &self,
        owner: ActorId,
        peer: ActorId,
        status: FriendshipStatus,
    ) -> Result<Option<Friendship>, EngineError> {
        self.lookup(owner, peer, StatusFilter::Only(status))
    }

    /// The record `owner → peer`, unless it is blocked
    pub fn find_unblocked_friendship(
        &self,
        owner: ActorId,
        peer: ActorId,
    ) -> Result<Option<Friendship>, EngineError> {
        self.lookup(owner, peer, StatusFilter::Except(FriendshipStatus::Blocked))
    }

    /// The record `owner → peer`, only if it is blocked
    pub fn find_blocked_friendship(
        &self,
        owner: ActorId,
        peer: ActorId,
    ) -> Result<Option<Friendship>, EngineError> {
        self.lookup(owner, peer, StatusFilter::Only(FriendshipStatus::Blocked))
    }

    /// Whether any record links `a` and `b`, in either direction
    pub fn exists(&self, a: ActorId, b: ActorId) -> Result<bool, EngineError> {
        self.store
            .find_any(a, b)
            .map(|found| found.is_some())
            .map_err(|e| EngineError::Store(e.to_string()))
    }

    /// Whether `actor`'s record towards `peer` is accepted
    pub fn is_friends_with<A: Friendable>(&self, actor: &A, peer: &A) -> Result<bool, EngineError> {
        Ok(self
            .find_relation(actor.actor_id(), peer.actor_id(), FriendshipStatus::Accepted)?
            .is_some())
    }

    /// Whether `actor` is the one blocking `peer`
    pub fn has_blocked<A: Friendable>(&self, actor: &A, peer: &A) -> Result<bool, EngineError> {
        let actor_id = actor.actor_id();
        Ok(self
            .find_one_side(actor_id, peer.actor_id())?
            .is_some_and(|record| record.blocker == Some(actor_id)))
    }

    /// `actor`'s own view of the relationship with `peer`
    pub fn relation_status<A: Friendable>(
        &self,
        actor: &A,
        peer: &A,
    ) -> Result<Option<FriendshipStatus>, EngineError> {
        Ok(self
            .find_one_side(actor.actor_id(), peer.actor_id())?
            .map(|record| record.status))
    }

    /// Who suggested the relationship between `actor` and `peer`, if anyone
    pub fn suggester_of<A: Friendable>(
        &self,
        actor: &A,
        peer: &A,
    ) -> Result<Option<ActorId>, EngineError> {
        Ok(self
            .find_one_side(actor.actor_id(), peer.actor_id())?
            .and_then(|record| record.suggester))
    }

    fn peers<A: Friendable>(
        &self,
        actor: &A,
        filter: StatusFilter,
    ) -> Result<Vec<ActorId>, EngineError> {
        let records = self
            .store
            .list(actor.actor_id(), &filter)
            .map_err(|e| EngineError::Store(e.to_string()))?;
        Ok(records.into_iter().map(|record| record.peer).collect())
    }

    /// Settled relations: accepted, plus those `actor` has blocked
    pub fn friends<A: Friendable>(&self, actor: &A) -> Result<Vec<ActorId>, EngineError> {
        self.peers(
            actor,
            StatusFilter::AnyOf(vec![FriendshipStatus::Accepted, FriendshipStatus::Blocked]),
        )
    }

    /// Peers `actor` has blocked
    pub fn blocked_friends<A: Friendable>(&self, actor: &A) -> Result<Vec<ActorId>, EngineError> {
        self.peers(actor, StatusFilter::Only(FriendshipStatus::Blocked))
    }

    /// Peers who asked `actor` and await an answer
    pub fn requested_friends<A: Friendable>(
        &self,
        actor: &A,
    ) -> Result<Vec<ActorId>, EngineError> {
        self.peers(actor, StatusFilter::Only(FriendshipStatus::Requested))
    }

    /// Peers `actor` asked who have not answered
    pub fn pending_friends<A: Friendable>(&self, actor: &A) -> Result<Vec<ActorId>, EngineError> {
        self.peers(actor, StatusFilter::Only(FriendshipStatus::Pending))
    }

    /// Friends `actor` has not blocked
    pub fn unblocked_friends<A: Friendable>(
        &self,
        actor: &A,
    ) -> Result<Vec<ActorId>, EngineError> {
        self.peers(actor, StatusFilter::Only(FriendshipStatus::Accepted))
    }

    /// Friends `actor` and `peer` have in common, in `actor`'s order
    pub fn mutual_friends_with<A: Friendable>(
        &self,
        actor: &A,
        peer: &A,
    ) -> Result<Vec<ActorId>, EngineError> {
        let theirs: HashSet<ActorId> = self.friends(peer)?.into_iter().collect();
        Ok(self
            .friends(actor)?
            .into_iter()
            .filter(|id| theirs.contains(id))
            .collect())
    }
}
