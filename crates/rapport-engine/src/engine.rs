//! Friendship state machine and the two-record update protocol
//!
//! Every relationship is stored as two directed records. Each operation
//! below reads and writes both of them inside one store transaction, so a
//! failure anywhere leaves neither side changed. Inside a transaction the
//! two writes always go in ascending [`ActorId`] order of the record owner.

use crate::config::{EngineConfig, TransitionPolicy};
use crate::{EngineError, Outcome, Rejection};
use rapport_domain::{
    ActorId, Friendable, Friendship, FriendshipStatus, FriendshipStore, FriendshipUpdate,
    NewFriendship, StatusFilter,
};
use rapport_store::SqliteStore;
use std::fmt::Display;
use tracing::{debug, info, warn};

/// Kind of change a committed transition made
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Effect {
    Created,
    Accepted,
    Blocked,
    Unblocked,
    Destroyed,
}

/// Records written by a transition, as they were left
#[derive(Debug)]
struct Change {
    effect: Effect,
    records: Vec<Friendship>,
}

/// What happens to one side of a pair
enum Action {
    Update(FriendshipUpdate),
    Delete,
}

type Step = Result<Change, Rejection>;

/// The two directed sides of the pair `a`/`b`, lower owner first
fn sides(a: ActorId, b: ActorId) -> [(ActorId, ActorId); 2] {
    if a <= b {
        [(a, b), (b, a)]
    } else {
        [(b, a), (a, b)]
    }
}

/// Whether `actor` may accept, judged from one record of the pair
fn can_accept(actor: ActorId, friendship: &Friendship) -> bool {
    match friendship.status {
        // Nobody accepts their own outgoing request
        FriendshipStatus::Pending => friendship.owner != actor,
        FriendshipStatus::Requested => friendship.peer != actor,
        FriendshipStatus::Accepted | FriendshipStatus::Blocked => false,
    }
}

fn request_step<S: FriendshipStore>(
    tx: &mut S,
    actor: ActorId,
    peer: ActorId,
    suggester: Option<ActorId>,
) -> Result<Step, S::Error> {
    if tx.find_any(actor, peer)?.is_some() {
        return Ok(Err(Rejection::AlreadyExists));
    }

    let mut records = Vec::with_capacity(2);
    for (owner, other) in sides(actor, peer) {
        let status = if owner == actor {
            FriendshipStatus::Pending
        } else {
            FriendshipStatus::Requested
        };
        tx.create(NewFriendship::new(owner, other, status).suggested_by(suggester))?;
        records.extend(tx.find(owner, other, &StatusFilter::Only(status))?);
    }

    Ok(Ok(Change {
        effect: Effect::Created,
        records,
    }))
}

/// Both halves of the unblocked relation between `a` and `b`, in write order
fn live_pair<S: FriendshipStore>(
    tx: &S,
    a: ActorId,
    b: ActorId,
) -> Result<Option<Vec<Friendship>>, S::Error> {
    let unblocked = StatusFilter::Except(FriendshipStatus::Blocked);
    let mut pair = Vec::with_capacity(2);
    for (owner, other) in sides(a, b) {
        match tx.find(owner, other, &unblocked)? {
            Some(friendship) => pair.push(friendship),
            None => return Ok(None),
        }
    }
    Ok(Some(pair))
}

/// Apply `rule` to both sides of the live relation, each judged on its own record
///
/// Both sides are judged before anything is written, so a rejection on
/// either side leaves the pair untouched.
fn on_relation_with<S, F>(
    tx: &mut S,
    actor: ActorId,
    peer: ActorId,
    effect: Effect,
    mut rule: F,
) -> Result<Step, S::Error>
where
    S: FriendshipStore,
    F: FnMut(&Friendship) -> Result<Action, Rejection>,
{
    let Some(pair) = live_pair(tx, actor, peer)? else {
        return Ok(Err(Rejection::NoRelation));
    };

    let mut planned = Vec::with_capacity(pair.len());
    for record in pair {
        match rule(&record) {
            Ok(action) => planned.push((record, action)),
            Err(rejection) => return Ok(Err(rejection)),
        }
    }

    let mut records = Vec::with_capacity(planned.len());
    for (mut record, action) in planned {
        match action {
            Action::Update(update) => {
                tx.update(record.id, update.clone())?;
                update.apply_to(&mut record);
            }
            Action::Delete => tx.delete(record.id)?,
        }
        records.push(record);
    }

    Ok(Ok(Change { effect, records }))
}

fn accept_step<S: FriendshipStore>(
    tx: &mut S,
    actor: ActorId,
    peer: ActorId,
) -> Result<Step, S::Error> {
    on_relation_with(tx, actor, peer, Effect::Accepted, |record| {
        if can_accept(actor, record) {
            Ok(Action::Update(FriendshipUpdate::status(
                FriendshipStatus::Accepted,
            )))
        } else {
            Err(Rejection::CannotAccept)
        }
    })
}

fn decline_step<S: FriendshipStore>(
    tx: &mut S,
    actor: ActorId,
    peer: ActorId,
) -> Result<Step, S::Error> {
    on_relation_with(tx, actor, peer, Effect::Destroyed, |_| Ok(Action::Delete))
}

fn block_step<S: FriendshipStore>(
    tx: &mut S,
    actor: ActorId,
    peer: ActorId,
) -> Result<Step, S::Error> {
    on_relation_with(tx, actor, peer, Effect::Blocked, |record| {
        // The blocked party's record stays accepted
        let update = if record.owner == actor {
            FriendshipUpdate::status(FriendshipStatus::Blocked).with_blocker(Some(actor))
        } else {
            FriendshipUpdate::status(FriendshipStatus::Accepted)
        };
        Ok(Action::Update(update))
    })
}

fn unblock_step<S: FriendshipStore>(
    tx: &mut S,
    actor: ActorId,
    peer: ActorId,
) -> Result<Step, S::Error> {
    let own = tx.find(actor, peer, &StatusFilter::Any)?;
    if own.and_then(|record| record.blocker) != Some(actor) {
        return Ok(Err(Rejection::NotBlocker));
    }

    let blocked = StatusFilter::Only(FriendshipStatus::Blocked);
    let mut records = Vec::with_capacity(1);
    for (owner, other) in sides(actor, peer) {
        if let Some(mut record) = tx.find(owner, other, &blocked)? {
            let update = FriendshipUpdate::status(FriendshipStatus::Accepted).with_blocker(None);
            tx.update(record.id, update.clone())?;
            update.apply_to(&mut record);
            records.push(record);
        }
    }

    Ok(Ok(Change {
        effect: Effect::Unblocked,
        records,
    }))
}

fn forget_step<S: FriendshipStore>(tx: &mut S, actor: ActorId) -> Result<Step, S::Error> {
    let records = tx.list_involving(actor)?;
    if records.is_empty() {
        return Ok(Err(Rejection::NoRelation));
    }
    for record in &records {
        tx.delete(record.id)?;
    }
    Ok(Ok(Change {
        effect: Effect::Destroyed,
        records,
    }))
}

/// Fire the lifecycle hook for `effect` on the owner of each record
fn fire<A: Friendable>(owner: &A, effect: Effect, record: &Friendship) {
    match effect {
        Effect::Created => owner.on_friendship_created(record),
        Effect::Accepted => owner.on_friendship_accepted(record),
        // Only the blocker hears about a block
        Effect::Blocked if record.is_blocked() => owner.on_friendship_blocked(record),
        Effect::Blocked | Effect::Unblocked => {}
        Effect::Destroyed => owner.on_friendship_destroyed(record),
    }
}

fn notify<A: Friendable>(actor: &A, peer: &A, change: &Change) {
    let actor_id = actor.actor_id();
    let peer_id = peer.actor_id();
    for record in &change.records {
        if record.owner == actor_id {
            fire(actor, change.effect, record);
        } else if record.owner == peer_id {
            fire(peer, change.effect, record);
        }
    }
}

/// The friendship engine
///
/// Sole reader and writer of friendship status. Mutating operations return
/// `Ok(Outcome::Skipped(..))` for invalid transitions under the lenient
/// policy, and typed errors under the strict one. Storage failures are
/// always errors, and always leave both records as they were.
///
/// # Examples
///
/// ```
/// use rapport_domain::ActorId;
/// use rapport_engine::{EngineConfig, FriendshipEngine};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut engine = FriendshipEngine::open(&EngineConfig::default())?;
/// let (alice, bob) = (ActorId::new(), ActorId::new());
///
/// engine.request(&alice, &bob)?;
/// engine.accept(&bob, &alice)?;
/// assert!(engine.is_friends_with(&alice, &bob)?);
/// # Ok(())
/// # }
/// ```
pub struct FriendshipEngine<S> {
    pub(crate) store: S,
    config: EngineConfig,
}

impl FriendshipEngine<SqliteStore> {
    /// Open the SQLite store named by `config` and build an engine on it
    pub fn open(config: &EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let store = SqliteStore::open_shared(&config.store.path, config.store.busy_timeout())
            .map_err(|e| EngineError::Store(e.to_string()))?;

        info!(
            "Opened friendship store at {} ({:?} policy)",
            config.store.path, config.engine.policy
        );
        Ok(Self::new(store, config.clone()))
    }
}

impl<S> FriendshipEngine<S> {
    /// Create an engine over an existing store
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Get the configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get a reference to the underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get a mutable reference to the underlying store
    ///
    /// Writes made through it bypass the pair protocol.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Take the store back
    pub fn into_store(self) -> S {
        self.store
    }
}

impl<S> FriendshipEngine<S>
where
    S: FriendshipStore,
    S::Error: Display,
{
    /// `actor` asks `peer` for friendship
    ///
    /// Creates `actor → peer` as pending and `peer → actor` as requested.
    /// Skipped when the two are the same actor or already related.
    pub fn request<A: Friendable>(&mut self, actor: &A, peer: &A) -> Result<Outcome, EngineError> {
        self.create_pair("request", actor, peer, None)
    }

    /// Like [`request`](Self::request), crediting `suggester` on both records
    pub fn suggested_request<A, G>(
        &mut self,
        actor: &A,
        peer: &A,
        suggester: &G,
    ) -> Result<Outcome, EngineError>
    where
        A: Friendable,
        G: Friendable,
    {
        self.create_pair("suggested_request", actor, peer, Some(suggester.actor_id()))
    }

    fn create_pair<A: Friendable>(
        &mut self,
        op: &'static str,
        actor: &A,
        peer: &A,
        suggester: Option<ActorId>,
    ) -> Result<Outcome, EngineError> {
        if actor.is_same_actor(peer) {
            return self.reject(op, actor.actor_id(), peer.actor_id(), Rejection::SelfRelation);
        }
        let (a, b) = (actor.actor_id(), peer.actor_id());
        let step = self.run(op, |tx| request_step(tx, a, b, suggester))?;
        self.finish(op, actor, peer, step)
    }

    /// `actor` accepts the request `peer` sent
    ///
    /// Only the asked side may accept; accepting your own outgoing request,
    /// an accepted pair, or a blocked pair is skipped.
    pub fn accept<A: Friendable>(&mut self, actor: &A, peer: &A) -> Result<Outcome, EngineError> {
        let (a, b) = (actor.actor_id(), peer.actor_id());
        let step = self.run("accept", |tx| accept_step(tx, a, b))?;
        self.finish("accept", actor, peer, step)
    }

    /// Remove the relationship in whatever unblocked state it is
    ///
    /// Declines an incoming request, withdraws an outgoing one, or unfriends.
    pub fn decline<A: Friendable>(&mut self, actor: &A, peer: &A) -> Result<Outcome, EngineError> {
        let (a, b) = (actor.actor_id(), peer.actor_id());
        let step = self.run("decline", |tx| decline_step(tx, a, b))?;
        self.finish("decline", actor, peer, step)
    }

    /// Alias of [`decline`](Self::decline)
    pub fn remove<A: Friendable>(&mut self, actor: &A, peer: &A) -> Result<Outcome, EngineError> {
        self.decline(actor, peer)
    }

    /// `actor` blocks `peer`
    ///
    /// `actor`'s record becomes blocked with `actor` as blocker; `peer`'s
    /// record reads accepted.
    pub fn block<A: Friendable>(&mut self, actor: &A, peer: &A) -> Result<Outcome, EngineError> {
        let (a, b) = (actor.actor_id(), peer.actor_id());
        let step = self.run("block", |tx| block_step(tx, a, b))?;
        self.finish("block", actor, peer, step)
    }

    /// Lift a block `actor` placed on `peer`
    pub fn unblock<A: Friendable>(&mut self, actor: &A, peer: &A) -> Result<Outcome, EngineError> {
        let (a, b) = (actor.actor_id(), peer.actor_id());
        let step = self.run("unblock", |tx| unblock_step(tx, a, b))?;
        self.finish("unblock", actor, peer, step)
    }

    /// Make `actor` and `peer` friends at once
    ///
    /// Runs `request(peer, actor)` then `accept(actor, peer)` in one
    /// transaction. An existing request from `peer` is simply accepted.
    pub fn add_friend<A: Friendable>(
        &mut self,
        actor: &A,
        peer: &A,
    ) -> Result<Outcome, EngineError> {
        if actor.is_same_actor(peer) {
            return self.reject(
                "add_friend",
                actor.actor_id(),
                peer.actor_id(),
                Rejection::SelfRelation,
            );
        }
        let (a, b) = (actor.actor_id(), peer.actor_id());
        let (requested, accepted) = self.run("add_friend", |tx| {
            let requested = request_step(tx, b, a, None)?;
            let accepted = accept_step(tx, a, b)?;
            Ok((requested, accepted))
        })?;

        if let Ok(change) = requested {
            notify(actor, peer, &change);
        }
        self.finish("add_friend", actor, peer, accepted)
    }

    /// Remove every record owned by or pointing at `actor`
    ///
    /// For hosts deleting an actor. Hooks fire on `actor` for its own
    /// records only; the peers are not at hand.
    pub fn forget_actor<A: Friendable>(&mut self, actor: &A) -> Result<Outcome, EngineError> {
        let a = actor.actor_id();
        match self.run("forget_actor", |tx| forget_step(tx, a))? {
            Ok(change) => {
                info!("forget_actor: removed {} records of {}", change.records.len(), a);
                for record in change.records.iter().filter(|r| r.owner == a) {
                    fire(actor, change.effect, record);
                }
                Ok(Outcome::Applied)
            }
            Err(rejection) => self.reject("forget_actor", a, a, rejection),
        }
    }

    /// Run `body` in one store transaction, mapping a rollback to `EngineError::Store`
    fn run<T, F>(&mut self, op: &str, body: F) -> Result<T, EngineError>
    where
        F: FnOnce(&mut S) -> Result<T, S::Error>,
    {
        self.store.transaction(body).map_err(|e| {
            warn!("{}: transaction rolled back: {}", op, e);
            EngineError::Store(e.to_string())
        })
    }

    fn finish<A: Friendable>(
        &self,
        op: &'static str,
        actor: &A,
        peer: &A,
        step: Step,
    ) -> Result<Outcome, EngineError> {
        match step {
            Ok(change) => {
                info!(
                    "{}: {} -> {} applied to {} records",
                    op,
                    actor.actor_id(),
                    peer.actor_id(),
                    change.records.len()
                );
                notify(actor, peer, &change);
                Ok(Outcome::Applied)
            }
            Err(rejection) => self.reject(op, actor.actor_id(), peer.actor_id(), rejection),
        }
    }

    fn reject(
        &self,
        op: &'static str,
        actor: ActorId,
        peer: ActorId,
        rejection: Rejection,
    ) -> Result<Outcome, EngineError> {
        debug!("{}: {} -> {} skipped: {}", op, actor, peer, rejection);
        match self.config.engine.policy {
            TransitionPolicy::Lenient => Ok(Outcome::Skipped(rejection)),
            TransitionPolicy::Strict => Err(EngineError::rejected(rejection, actor, peer)),
        }
    }
}
