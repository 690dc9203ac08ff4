//! Rapport Domain Layer
//!
//! This crate holds the domain model for Rapport, a library for symmetric
//! friendship relationships between actors. It depends on nothing but
//! `uuid` and defines the value types and trait interfaces the store and
//! engine crates build on.
//!
//! ## Key Concepts
//!
//! - **Actor**: anything that can hold friendships, identified by [`ActorId`]
//! - **Friendship**: one directed record, owned by an actor and pointing at a peer
//! - **Pair**: the two mirrored records that make up one relationship
//! - **Status**: pending / requested / accepted / blocked, per record
//!
//! ## Architecture
//!
//! - Pure types and rules only
//! - Storage lives behind [`traits::FriendshipStore`]
//! - Host entities opt in through [`Friendable`]

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod actor;
pub mod friendship;
pub mod status;
pub mod traits;

// Re-exports for convenience
pub use actor::{ActorId, Friendable};
pub use friendship::{Friendship, FriendshipId, FriendshipUpdate, NewFriendship};
pub use status::{FriendshipStatus, StatusFilter};
pub use traits::FriendshipStore;
