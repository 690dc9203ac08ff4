//! Rapport Friendship Engine
//!
//! Owns the friendship state machine between actors and keeps the two
//! directed records of every relationship consistent.
//!
//! # Overview
//!
//! A relationship between A and B is two records, one owned by each side:
//!
//! | A's record | B's record | Meaning |
//! |------------|------------|---------|
//! | pending    | requested  | A asked B |
//! | accepted   | accepted   | Friends |
//! | blocked    | accepted   | A blocked B (B does not see it) |
//!
//! Operations:
//! - **request / suggested_request**: create the pair
//! - **accept**: the asked side confirms
//! - **decline / remove**: delete the pair, whatever its state
//! - **block / unblock**: one-sided block, lifted only by the blocker
//! - **add_friend**: request and accept in one step
//! - **forget_actor**: drop everything involving an actor
//!
//! Each runs in one store transaction; storage failures roll back both
//! records and surface as [`EngineError::Store`].
//!
//! # Usage
//!
//! ```
//! use rapport_domain::ActorId;
//! use rapport_engine::{EngineConfig, FriendshipEngine, Outcome, Rejection};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut engine = FriendshipEngine::open(&EngineConfig::default())?;
//! let (alice, bob) = (ActorId::new(), ActorId::new());
//!
//! engine.request(&alice, &bob)?;
//!
//! // Alice cannot accept her own request
//! assert_eq!(
//!     engine.accept(&alice, &bob)?,
//!     Outcome::Skipped(Rejection::CannotAccept)
//! );
//!
//! engine.accept(&bob, &alice)?;
//! assert!(engine.is_friends_with(&bob, &alice)?);
//! # Ok(())
//! # }
//! ```
//!
//! # Transition policy
//!
//! Under [`TransitionPolicy::Lenient`] (the default) invalid transitions
//! change nothing and return `Ok(Outcome::Skipped(reason))`. Under
//! [`TransitionPolicy::Strict`] they return
//! [`EngineError::AlreadyExists`], [`EngineError::NotFound`] or
//! [`EngineError::Forbidden`] instead.
//!
//! # Configuration
//!
//! ```toml
//! [store]
//! path = "rapport.db"
//! busy_timeout_ms = 5000
//!
//! [engine]
//! policy = "strict"
//!
//! [logging]
//! filter = "rapport_engine=debug"
//! ```

#![warn(missing_docs)]

pub mod config;
mod engine;
mod error;
pub mod logging;
mod queries;

pub use config::{ConfigError, EngineConfig, TransitionPolicy};
pub use engine::FriendshipEngine;
pub use error::{EngineError, Outcome, Rejection};
