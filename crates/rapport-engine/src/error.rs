//! Error and outcome types for engine operations

use crate::config::ConfigError;
use rapport_domain::ActorId;
use std::fmt;
use thiserror::Error;

/// Why a transition was not applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    /// Actor and peer are the same actor
    SelfRelation,

    /// A relationship between the two already exists
    AlreadyExists,

    /// No live (unblocked) relationship between the two
    NoRelation,

    /// The actor is not the one being asked, or the pair is already accepted
    CannotAccept,

    /// The actor has not blocked the peer
    NotBlocker,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Rejection::SelfRelation => "actor cannot befriend itself",
            Rejection::AlreadyExists => "relationship already exists",
            Rejection::NoRelation => "no unblocked relationship",
            Rejection::CannotAccept => "no incoming request to accept",
            Rejection::NotBlocker => "actor has not blocked the peer",
        };
        f.write_str(reason)
    }
}

/// Result of a mutating operation that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Records were written
    Applied,

    /// Nothing changed
    Skipped(Rejection),
}

impl Outcome {
    /// Whether records were written
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }

    /// The reason nothing changed, if so
    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            Outcome::Applied => None,
            Outcome::Skipped(rejection) => Some(*rejection),
        }
    }
}

/// Errors that can occur during engine operations
#[derive(Error, Debug)]
pub enum EngineError {
    /// Storage layer error; the transaction was rolled back
    #[error("Storage error: {0}")]
    Store(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A relationship already exists (strict policy only)
    #[error("Friendship between {actor} and {peer} already exists")]
    AlreadyExists {
        /// Acting actor
        actor: ActorId,
        /// Target actor
        peer: ActorId,
    },

    /// No live relationship to act on (strict policy only)
    #[error("No friendship between {actor} and {peer}")]
    NotFound {
        /// Acting actor
        actor: ActorId,
        /// Target actor
        peer: ActorId,
    },

    /// The transition is not allowed for this actor (strict policy only)
    #[error("Forbidden for {actor} towards {peer}: {reason}")]
    Forbidden {
        /// Acting actor
        actor: ActorId,
        /// Target actor
        peer: ActorId,
        /// What made it illegal
        reason: Rejection,
    },
}

impl EngineError {
    /// Typed error for a rejected transition
    pub fn rejected(reason: Rejection, actor: ActorId, peer: ActorId) -> Self {
        match reason {
            Rejection::AlreadyExists => EngineError::AlreadyExists { actor, peer },
            Rejection::NoRelation => EngineError::NotFound { actor, peer },
            Rejection::SelfRelation | Rejection::CannotAccept | Rejection::NotBlocker => {
                EngineError::Forbidden { actor, peer, reason }
            }
        }
    }

    /// The rejection behind a strict-policy error
    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            EngineError::AlreadyExists { .. } => Some(Rejection::AlreadyExists),
            EngineError::NotFound { .. } => Some(Rejection::NoRelation),
            EngineError::Forbidden { reason, .. } => Some(*reason),
            EngineError::Store(_) | EngineError::Config(_) => None,
        }
    }
}
