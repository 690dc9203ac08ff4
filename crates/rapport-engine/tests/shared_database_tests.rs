//! Tests for engines sharing one database file
//!
//! Each thread opens its own engine on the same path, the way separate
//! processes would, and races operations on a single pair.

use rapport_domain::{ActorId, Friendship, FriendshipStore, StatusFilter};
use rapport_engine::{EngineConfig, FriendshipEngine, Outcome, Rejection};
use rapport_store::SqliteStore;
use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;

const THREADS: usize = 8;
const ROUNDS: usize = 20;

fn shared_config(path: &Path) -> EngineConfig {
    let mut config = EngineConfig::default().with_path(path.to_string_lossy());
    config.store.busy_timeout_ms = 30_000;
    config
}

fn pair() -> (ActorId, ActorId) {
    (ActorId::from_value(1), ActorId::from_value(2))
}

fn is_coherent(ab: &Friendship, ba: &Friendship) -> bool {
    let statuses = ba.status == ab.status.mirror() || ab.status == ba.status.mirror();
    let blockers = [ab, ba]
        .iter()
        .all(|r| r.blocker == r.is_blocked().then_some(r.owner));
    statuses && blockers
}

fn assert_pair_coherent(engine: &FriendshipEngine<SqliteStore>, a: ActorId, b: ActorId) {
    let store = engine.store();
    let ab = store.find(a, b, &StatusFilter::Any).unwrap();
    let ba = store.find(b, a, &StatusFilter::Any).unwrap();
    match (ab, ba) {
        (None, None) => assert_eq!(store.count().unwrap(), 0),
        (Some(ab), Some(ba)) => {
            assert!(is_coherent(&ab, &ba), "incoherent pair {:?} / {:?}", ab, ba);
            assert_eq!(store.count().unwrap(), 2);
        }
        (ab, ba) => panic!("orphaned record: {:?} / {:?}", ab, ba),
    }
}

#[test]
fn test_racing_requests_create_one_pair() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rapport.db");
    let config = shared_config(&path);
    // Create the schema before the race starts
    FriendshipEngine::open(&config).unwrap();

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let config = config.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut engine = FriendshipEngine::open(&config).unwrap();
                let (a, b) = pair();
                barrier.wait();
                if t % 2 == 0 {
                    engine.request(&a, &b).unwrap()
                } else {
                    engine.request(&b, &a).unwrap()
                }
            })
        })
        .collect();

    let outcomes: Vec<Outcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let applied = outcomes.iter().filter(|o| o.is_applied()).count();
    assert_eq!(applied, 1, "exactly one request may win: {:?}", outcomes);
    assert!(outcomes
        .iter()
        .filter(|o| !o.is_applied())
        .all(|o| o.rejection() == Some(Rejection::AlreadyExists)));

    let engine = FriendshipEngine::open(&config).unwrap();
    let (a, b) = pair();
    assert_pair_coherent(&engine, a, b);
}

#[test]
fn test_racing_transitions_keep_pair_coherent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rapport.db");
    let config = shared_config(&path);
    FriendshipEngine::open(&config).unwrap();

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let config = config.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut engine = FriendshipEngine::open(&config).unwrap();
                let (a, b) = pair();
                let (actor, peer) = if t % 2 == 0 { (a, b) } else { (b, a) };
                barrier.wait();
                for round in 0..ROUNDS {
                    let result = match (t + round) % 5 {
                        0 => engine.request(&actor, &peer),
                        1 => engine.add_friend(&actor, &peer),
                        2 => engine.block(&actor, &peer),
                        3 => engine.unblock(&actor, &peer),
                        _ => engine.decline(&actor, &peer),
                    };
                    assert!(result.is_ok(), "operation failed: {:?}", result);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let engine = FriendshipEngine::open(&config).unwrap();
    let (a, b) = pair();
    assert_pair_coherent(&engine, a, b);
}

#[test]
fn test_panic_inside_transaction_does_not_swallow_later_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rapport.db");
    let config = shared_config(&path);
    let (a, b) = pair();

    {
        let mut engine = FriendshipEngine::open(&config).unwrap();
        let panicked = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = engine
                .store_mut()
                .transaction(|_| -> Result<(), rapport_store::StoreError> {
                    panic!("host callback failed")
                });
        }));
        assert!(panicked.is_err());

        assert_eq!(engine.request(&a, &b).unwrap(), Outcome::Applied);
    }

    let engine = FriendshipEngine::open(&config).unwrap();
    assert!(engine.exists(a, b).unwrap(), "request must survive a reopen");
    assert_pair_coherent(&engine, a, b);
}
