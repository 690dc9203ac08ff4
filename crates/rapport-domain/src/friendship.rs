//! Friendship module - one directed half of a friendship pair

use crate::{ActorId, FriendshipStatus};

/// Store-assigned identifier of a friendship record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FriendshipId(i64);

impl FriendshipId {
    /// Wrap a raw store identifier
    pub fn from_value(value: i64) -> Self {
        Self(value)
    }

    /// Get the raw value
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for FriendshipId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A persisted friendship record, owned by `owner` and pointing at `peer`
///
/// Every relationship is two of these, one per direction. They are only
/// ever created, changed, or removed together.
#[derive(Debug, Clone, PartialEq)]
pub struct Friendship {
    /// Record identifier
    pub id: FriendshipId,

    /// Actor holding this record
    pub owner: ActorId,

    /// The other actor
    pub peer: ActorId,

    /// Status from the owner's point of view
    pub status: FriendshipStatus,

    /// Actor who initiated a block, set on the blocker's own record only
    pub blocker: Option<ActorId>,

    /// Third party credited with suggesting the connection
    pub suggester: Option<ActorId>,

    /// Creation time (seconds since Unix epoch)
    pub created_at: u64,

    /// Last modification time (seconds since Unix epoch)
    pub updated_at: u64,
}

impl Friendship {
    /// The owner asked and is waiting
    pub fn is_pending(&self) -> bool {
        self.status == FriendshipStatus::Pending
    }

    /// The peer asked and the owner has not answered
    pub fn is_requested(&self) -> bool {
        self.status == FriendshipStatus::Requested
    }

    /// Mutual friendship
    pub fn is_accepted(&self) -> bool {
        self.status == FriendshipStatus::Accepted
    }

    /// The owner blocked the peer
    pub fn is_blocked(&self) -> bool {
        self.status == FriendshipStatus::Blocked
    }
}

/// Payload for creating a record
#[derive(Debug, Clone, PartialEq)]
pub struct NewFriendship {
    /// Actor holding the record
    pub owner: ActorId,

    /// The other actor
    pub peer: ActorId,

    /// Initial status
    pub status: FriendshipStatus,

    /// Initial blocker
    pub blocker: Option<ActorId>,

    /// Suggesting actor, if any
    pub suggester: Option<ActorId>,
}

impl NewFriendship {
    /// A record with no blocker and no suggester
    pub fn new(owner: ActorId, peer: ActorId, status: FriendshipStatus) -> Self {
        Self {
            owner,
            peer,
            status,
            blocker: None,
            suggester: None,
        }
    }

    /// Credit a suggester
    pub fn suggested_by(mut self, suggester: Option<ActorId>) -> Self {
        self.suggester = suggester;
        self
    }
}

/// Partial update of a record; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FriendshipUpdate {
    /// New status
    pub status: Option<FriendshipStatus>,

    /// New blocker; `Some(None)` clears it
    pub blocker: Option<Option<ActorId>>,
}

impl FriendshipUpdate {
    /// Change only the status
    pub fn status(status: FriendshipStatus) -> Self {
        Self {
            status: Some(status),
            blocker: None,
        }
    }

    /// Also set (or clear, with `None`) the blocker
    pub fn with_blocker(mut self, blocker: Option<ActorId>) -> Self {
        self.blocker = Some(blocker);
        self
    }

    /// Apply this update to an in-memory record
    pub fn apply_to(&self, friendship: &mut Friendship) {
        if let Some(status) = self.status {
            friendship.status = status;
        }
        if let Some(blocker) = self.blocker {
            friendship.blocker = blocker;
        }
    }
}
