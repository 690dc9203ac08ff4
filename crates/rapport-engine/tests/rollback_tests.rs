//! Atomicity tests
//!
//! Runs the engine over an in-memory store that can be told to fail its
//! Nth write, and checks that a failure never leaves half a pair behind.

use rapport_domain::{
    ActorId, Friendship, FriendshipId, FriendshipStatus, FriendshipStore, FriendshipUpdate,
    NewFriendship, StatusFilter,
};
use rapport_engine::{EngineConfig, EngineError, FriendshipEngine, Outcome};
use std::fmt;

#[derive(Debug)]
struct Injected;

impl fmt::Display for Injected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("injected write failure")
    }
}

/// Vec-backed store with snapshot rollback and an optional failing write
#[derive(Default)]
struct FlakyStore {
    rows: Vec<Friendship>,
    next_id: i64,
    snapshot: Option<(Vec<Friendship>, i64)>,
    writes: usize,
    fail_on_write: Option<usize>,
}

impl FlakyStore {
    fn fail_on(&mut self, nth_write: usize) {
        self.writes = 0;
        self.fail_on_write = Some(nth_write);
    }

    fn write(&mut self) -> Result<(), Injected> {
        self.writes += 1;
        if self.fail_on_write == Some(self.writes) {
            return Err(Injected);
        }
        Ok(())
    }
}

impl FriendshipStore for FlakyStore {
    type Error = Injected;

    fn create(&mut self, friendship: NewFriendship) -> Result<FriendshipId, Injected> {
        self.write()?;
        self.next_id += 1;
        let id = FriendshipId::from_value(self.next_id);
        self.rows.push(Friendship {
            id,
            owner: friendship.owner,
            peer: friendship.peer,
            status: friendship.status,
            blocker: friendship.blocker,
            suggester: friendship.suggester,
            created_at: 0,
            updated_at: 0,
        });
        Ok(id)
    }

    fn find(
        &self,
        owner: ActorId,
        peer: ActorId,
        filter: &StatusFilter,
    ) -> Result<Option<Friendship>, Injected> {
        Ok(self
            .rows
            .iter()
            .find(|r| r.owner == owner && r.peer == peer && filter.matches(r.status))
            .cloned())
    }

    fn find_any(&self, a: ActorId, b: ActorId) -> Result<Option<Friendship>, Injected> {
        Ok(self
            .rows
            .iter()
            .find(|r| (r.owner == a && r.peer == b) || (r.owner == b && r.peer == a))
            .cloned())
    }

    fn update(&mut self, id: FriendshipId, update: FriendshipUpdate) -> Result<(), Injected> {
        self.write()?;
        if let Some(row) = self.rows.iter_mut().find(|r| r.id == id) {
            update.apply_to(row);
        }
        Ok(())
    }

    fn delete(&mut self, id: FriendshipId) -> Result<(), Injected> {
        self.write()?;
        self.rows.retain(|r| r.id != id);
        Ok(())
    }

    fn list(&self, owner: ActorId, filter: &StatusFilter) -> Result<Vec<Friendship>, Injected> {
        Ok(self
            .rows
            .iter()
            .filter(|r| r.owner == owner && filter.matches(r.status))
            .cloned()
            .collect())
    }

    fn list_involving(&self, actor: ActorId) -> Result<Vec<Friendship>, Injected> {
        Ok(self
            .rows
            .iter()
            .filter(|r| r.owner == actor || r.peer == actor)
            .cloned()
            .collect())
    }

    fn transaction<T, F>(&mut self, body: F) -> Result<T, Injected>
    where
        F: FnOnce(&mut Self) -> Result<T, Injected>,
    {
        if self.snapshot.is_some() {
            return body(self);
        }
        self.snapshot = Some((self.rows.clone(), self.next_id));
        let result = body(self);
        if let Some((rows, next_id)) = self.snapshot.take() {
            if result.is_err() {
                self.rows = rows;
                self.next_id = next_id;
            }
        }
        result
    }
}

fn engine() -> FriendshipEngine<FlakyStore> {
    FriendshipEngine::new(FlakyStore::default(), EngineConfig::default())
}

fn statuses(engine: &FriendshipEngine<FlakyStore>) -> Vec<(ActorId, ActorId, FriendshipStatus)> {
    engine
        .store()
        .rows
        .iter()
        .map(|r| (r.owner, r.peer, r.status))
        .collect()
}

fn pair() -> (ActorId, ActorId) {
    (ActorId::from_value(1), ActorId::from_value(2))
}

#[test]
fn test_failed_request_leaves_no_orphan() {
    let mut engine = engine();
    let (a, b) = pair();

    engine.store_mut().fail_on(2);
    let result = engine.request(&a, &b);

    assert!(matches!(result, Err(EngineError::Store(_))));
    assert!(engine.store().rows.is_empty());
    assert!(!engine.exists(a, b).unwrap());
}

#[test]
fn test_failed_accept_keeps_request() {
    let mut engine = engine();
    let (a, b) = pair();
    engine.request(&a, &b).unwrap();
    let before = statuses(&engine);

    engine.store_mut().fail_on(2);
    assert!(matches!(engine.accept(&b, &a), Err(EngineError::Store(_))));
    assert_eq!(statuses(&engine), before);
}

#[test]
fn test_failed_block_keeps_friendship() {
    let mut engine = engine();
    let (a, b) = pair();
    engine.add_friend(&a, &b).unwrap();
    let before = statuses(&engine);

    engine.store_mut().fail_on(2);
    assert!(engine.block(&b, &a).is_err());
    assert_eq!(statuses(&engine), before);
    assert!(!engine.has_blocked(&b, &a).unwrap());
}

#[test]
fn test_failed_decline_keeps_both_records() {
    let mut engine = engine();
    let (a, b) = pair();
    engine.add_friend(&a, &b).unwrap();

    engine.store_mut().fail_on(2);
    assert!(engine.decline(&a, &b).is_err());
    assert_eq!(engine.store().rows.len(), 2);
    assert!(engine.is_friends_with(&a, &b).unwrap());
}

#[test]
fn test_failed_add_friend_rolls_back_request() {
    let mut engine = engine();
    let (a, b) = pair();

    // Writes 1-2 create the pair, 3-4 accept it
    engine.store_mut().fail_on(4);
    assert!(engine.add_friend(&a, &b).is_err());
    assert!(engine.store().rows.is_empty());
}

#[test]
fn test_engine_recovers_after_failure() {
    let mut engine = engine();
    let (a, b) = pair();

    engine.store_mut().fail_on(1);
    assert!(engine.request(&a, &b).is_err());

    engine.store_mut().fail_on_write = None;
    assert_eq!(engine.request(&a, &b).unwrap(), Outcome::Applied);
    assert_eq!(engine.store().rows.len(), 2);
}
