//! Status module - the per-record friendship state

/// Status of one directed friendship record, seen from its owner
///
/// The statuses of a pair are always mirrored:
///
/// | Owner side | Peer side |
/// |------------|-----------|
/// | Pending    | Requested |
/// | Accepted   | Accepted  |
/// | Blocked    | Accepted  |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FriendshipStatus {
    /// The owner asked, awaiting the peer's answer
    Pending,

    /// The peer asked, awaiting the owner's answer
    Requested,

    /// Mutual friendship
    Accepted,

    /// The owner blocked the peer
    Blocked,
}

impl FriendshipStatus {
    /// All statuses, in declaration order
    pub const ALL: [FriendshipStatus; 4] = [
        FriendshipStatus::Pending,
        FriendshipStatus::Requested,
        FriendshipStatus::Accepted,
        FriendshipStatus::Blocked,
    ];

    /// Get the status name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            FriendshipStatus::Pending => "pending",
            FriendshipStatus::Requested => "requested",
            FriendshipStatus::Accepted => "accepted",
            FriendshipStatus::Blocked => "blocked",
        }
    }

    /// Parse a status from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(FriendshipStatus::Pending),
            "requested" => Some(FriendshipStatus::Requested),
            "accepted" => Some(FriendshipStatus::Accepted),
            "blocked" => Some(FriendshipStatus::Blocked),
            _ => None,
        }
    }

    /// Status the peer's record carries when the owner's record has this status
    pub fn mirror(&self) -> Self {
        match self {
            FriendshipStatus::Pending => FriendshipStatus::Requested,
            FriendshipStatus::Requested => FriendshipStatus::Pending,
            FriendshipStatus::Accepted | FriendshipStatus::Blocked => FriendshipStatus::Accepted,
        }
    }
}

impl std::str::FromStr for FriendshipStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid friendship status: {}", s))
    }
}

impl std::fmt::Display for FriendshipStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status predicate used by lookups
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StatusFilter {
    /// Any status
    #[default]
    Any,

    /// Exactly this status
    Only(FriendshipStatus),

    /// Anything but this status
    Except(FriendshipStatus),

    /// One of these statuses
    AnyOf(Vec<FriendshipStatus>),
}

impl StatusFilter {
    /// Whether `status` passes this filter
    pub fn matches(&self, status: FriendshipStatus) -> bool {
        match self {
            StatusFilter::Any => true,
            StatusFilter::Only(s) => *s == status,
            StatusFilter::Except(s) => *s != status,
            StatusFilter::AnyOf(list) => list.contains(&status),
        }
    }

    /// Statuses admitted by this filter
    pub fn statuses(&self) -> Vec<FriendshipStatus> {
        FriendshipStatus::ALL
            .into_iter()
            .filter(|s| self.matches(*s))
            .collect()
    }
}
