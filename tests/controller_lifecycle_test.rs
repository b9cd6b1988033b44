//! End-to-end lifecycle tests: two controllers sharing one store.

use std::sync::Arc;
use std::time::Duration;

use shwordle::{
    ControllerError, GameController, GameEvent, LifecycleState, LocalIdentity, MemoryStore,
    NoopNotifier, Phase, SessionStatus, SessionStore, SubmitOutcome, SyncConfig, Word, WordList,
};
use tokio::sync::mpsc::UnboundedReceiver;

const WORDS: &[&str] = &[
    "crane", "cabin", "sheep", "plumb", "glory", "fight", "dwelt", "mound", "epees", "those",
];

struct Player {
    controller: GameController,
    events: UnboundedReceiver<GameEvent>,
    identity: Arc<LocalIdentity>,
}

fn player(store: &Arc<MemoryStore>, name: &str) -> Player {
    let identity = Arc::new(LocalIdentity::signed_in(name));
    let (controller, events) = GameController::new(
        store.clone(),
        Arc::new(WordList::from_words(WORDS.iter().copied())),
        identity.clone(),
        Arc::new(NoopNotifier),
        SyncConfig::events_only(),
    );
    Player {
        controller,
        events,
        identity,
    }
}

async fn started(store: &Arc<MemoryStore>, name: &str) -> Player {
    let mut p = player(store, name);
    p.controller.start().await.expect("start");
    p
}

/// Applies updates until `done` holds, failing after a few seconds.
async fn pump_until(controller: &mut GameController, done: impl Fn(&GameController) -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !done(controller) {
            assert!(controller.next_update().await, "update sources closed");
        }
    })
    .await
    .expect("condition not reached in time");
}

fn phase(controller: &GameController) -> Phase {
    controller.state().phase()
}

fn filled_rows(controller: &GameController) -> usize {
    controller.view().board().filled_rows()
}

async fn active_pair(store: &Arc<MemoryStore>) -> (Player, Player) {
    let mut alice = started(store, "alice").await;
    let mut bob = started(store, "bob").await;
    alice.controller.create("crane").await.expect("create");
    pump_until(&mut bob.controller, |c| phase(c) == Phase::Active).await;
    (alice, bob)
}

#[tokio::test]
async fn test_second_player_discovers_and_sees_moves() {
    let store = Arc::new(MemoryStore::new());
    let (mut alice, mut bob) = active_pair(&store).await;

    let view = bob.controller.view();
    assert!(view.target_word().is_none(), "word must stay hidden");

    let outcome = bob.controller.submit_guess("cabin").await.expect("submit");
    assert_eq!(outcome, SubmitOutcome::Accepted { move_number: 1 });

    pump_until(&mut alice.controller, |c| filled_rows(c) == 1).await;
    pump_until(&mut alice.controller, |c| c.view().players().len() == 2).await;
    let view = alice.controller.view();
    assert_eq!(view.players(), &vec!["alice".to_string(), "bob".to_string()]);
    assert!(view.target_word().is_none());

    let mut adopted = false;
    while let Ok(event) = bob.events.try_recv() {
        if matches!(event, GameEvent::SessionAdopted { .. }) {
            adopted = true;
        }
    }
    assert!(adopted);
}

#[tokio::test]
async fn test_winner_alone_may_start_next_game() {
    let store = Arc::new(MemoryStore::new());
    let (mut alice, mut bob) = active_pair(&store).await;

    let outcome = bob.controller.submit_guess("CRANE").await.expect("submit");
    let SubmitOutcome::Won(result) = outcome else {
        panic!("expected a win, got {outcome:?}");
    };
    assert!(*result.may_start_new_game());
    assert_eq!(result.last_player().as_deref(), Some("bob"));
    assert_eq!(phase(&bob.controller), Phase::Ended);

    pump_until(&mut alice.controller, |c| phase(c) == Phase::Ended).await;
    let view = alice.controller.view();
    assert!(!*view.may_start_new_game());
    assert_eq!(view.target_word().as_ref().map(Word::as_str), Some("crane"));

    let err = alice.controller.create("sheep").await.expect_err("gated");
    assert!(matches!(err, ControllerError::NotPermitted { ref holder } if holder == "bob"));

    bob.controller.create("sheep").await.expect("winner creates");
    pump_until(&mut alice.controller, |c| phase(c) == Phase::Active).await;
}

#[tokio::test]
async fn test_reset_does_not_lift_new_game_gate() {
    let store = Arc::new(MemoryStore::new());
    let (mut alice, mut bob) = active_pair(&store).await;

    bob.controller.submit_guess("crane").await.expect("win");
    pump_until(&mut alice.controller, |c| phase(c) == Phase::Ended).await;

    alice.controller.force_reset();
    assert_eq!(phase(&alice.controller), Phase::NoSession);
    let view = alice.controller.view();
    assert!(!*view.may_start_new_game());
    assert_eq!(view.last_player().as_deref(), Some("bob"));

    let err = alice.controller.create("sheep").await.expect_err("still gated");
    assert!(matches!(err, ControllerError::NotPermitted { ref holder } if holder == "bob"));
    assert!(store.find_active().await.expect("query").is_none());

    bob.controller.force_reset();
    assert!(*bob.controller.view().may_start_new_game());
    bob.controller.create("sheep").await.expect("holder creates after reset");
    pump_until(&mut alice.controller, |c| phase(c) == Phase::Active).await;
    assert!(!*alice.controller.view().may_start_new_game());
}

#[tokio::test]
async fn test_ended_view_keeps_final_board() {
    let store = Arc::new(MemoryStore::new());
    let (mut alice, mut bob) = active_pair(&store).await;

    bob.controller.submit_guess("cabin").await.expect("submit");
    let outcome = bob.controller.submit_guess("crane").await.expect("submit");
    let SubmitOutcome::Won(result) = outcome else {
        panic!("expected a win, got {outcome:?}");
    };
    assert_eq!(result.board().filled_rows(), 2);

    let view = bob.controller.view();
    assert_eq!(view.phase(), &Phase::Ended);
    assert_eq!(view.board().filled_rows(), 2);

    pump_until(&mut alice.controller, |c| phase(c) == Phase::Ended).await;
    let view = alice.controller.view();
    assert_eq!(view.board().filled_rows(), 2);
    assert_eq!(view.players(), &vec!["alice".to_string(), "bob".to_string()]);
}

#[tokio::test]
async fn test_sixth_miss_exhausts_game() {
    let store = Arc::new(MemoryStore::new());
    let (mut alice, mut bob) = active_pair(&store).await;

    let misses = ["cabin", "sheep", "plumb", "glory", "fight"];
    for (i, guess) in misses.iter().enumerate() {
        let p = if i % 2 == 0 { &mut bob } else { &mut alice };
        let outcome = p.controller.submit_guess(guess).await.expect("submit");
        assert_eq!(outcome, SubmitOutcome::Accepted { move_number: i + 1 });
        let other = if i % 2 == 0 { &mut alice } else { &mut bob };
        pump_until(&mut other.controller, |c| filled_rows(c) == i + 1).await;
    }

    let outcome = bob.controller.submit_guess("dwelt").await.expect("submit");
    let SubmitOutcome::Exhausted(result) = outcome else {
        panic!("expected exhaustion, got {outcome:?}");
    };
    assert_eq!(result.status(), &SessionStatus::Failed);
    assert!(*result.may_start_new_game());

    let session = store.latest_session().await.expect("query").expect("session");
    assert_eq!(session.moves().len(), 6);
    assert_eq!(session.status(), &SessionStatus::Failed);
    assert_eq!(session.last_player_id().as_deref(), Some("bob"));
}

#[tokio::test]
async fn test_racing_final_guesses_accept_exactly_one() {
    let store = Arc::new(MemoryStore::new());
    let (mut alice, mut bob) = active_pair(&store).await;

    for guess in ["cabin", "sheep", "plumb", "glory", "fight"] {
        alice.controller.submit_guess(guess).await.expect("submit");
    }
    pump_until(&mut alice.controller, |c| filled_rows(c) == 5).await;
    pump_until(&mut bob.controller, |c| filled_rows(c) == 5).await;

    let (a, b) = tokio::join!(
        alice.controller.submit_guess("dwelt"),
        bob.controller.submit_guess("mound"),
    );
    let outcomes = [a.expect("alice submit"), b.expect("bob submit")];

    let exhausted = outcomes
        .iter()
        .filter(|o| matches!(o, SubmitOutcome::Exhausted(_)))
        .count();
    let rejected = outcomes
        .iter()
        .filter(|o| matches!(o, SubmitOutcome::Rejected))
        .count();
    assert_eq!((exhausted, rejected), (1, 1));

    let session = store.latest_session().await.expect("query").expect("session");
    assert_eq!(session.moves().len(), 6);
}

#[tokio::test]
async fn test_restart_rebuilds_new_game_gate() {
    let store = Arc::new(MemoryStore::new());
    let (_alice, mut bob) = active_pair(&store).await;
    bob.controller.submit_guess("crane").await.expect("win");

    let alice_again = started(&store, "alice").await;
    assert_eq!(phase(&alice_again.controller), Phase::Ended);
    assert!(!*alice_again.controller.view().may_start_new_game());

    let bob_again = started(&store, "bob").await;
    assert!(*bob_again.controller.view().may_start_new_game());
}

#[tokio::test]
async fn test_abandon_ends_as_failed_and_grants_gate() {
    let store = Arc::new(MemoryStore::new());
    let (mut alice, mut bob) = active_pair(&store).await;

    let result = alice.controller.abandon().await.expect("abandon");
    assert_eq!(result.status(), &SessionStatus::Failed);
    assert!(*result.may_start_new_game());

    pump_until(&mut bob.controller, |c| phase(c) == Phase::Ended).await;
    assert!(!*bob.controller.view().may_start_new_game());

    let again = alice.controller.abandon().await.expect_err("nothing in progress");
    assert!(matches!(again, ControllerError::NoActiveSession));
}

#[tokio::test]
async fn test_removed_session_resets_to_no_session() {
    let store = Arc::new(MemoryStore::new());
    let (_alice, mut bob) = active_pair(&store).await;

    let id = bob
        .controller
        .state()
        .session_id()
        .cloned()
        .expect("tracked session");
    store.delete_session(&id).expect("delete");

    pump_until(&mut bob.controller, |c| {
        matches!(c.state(), LifecycleState::NoSession)
    })
    .await;
}

#[tokio::test]
async fn test_sign_out_resets_and_blocks_guessing() {
    let store = Arc::new(MemoryStore::new());
    let (_alice, mut bob) = active_pair(&store).await;

    bob.identity.sign_out();
    pump_until(&mut bob.controller, |c| phase(c) == Phase::NoSession).await;

    let err = bob.controller.submit_guess("cabin").await.expect_err("signed out");
    assert!(matches!(err, ControllerError::SignedOut));

    bob.identity.sign_in("bob");
    pump_until(&mut bob.controller, |c| phase(c) == Phase::Active).await;
}

#[tokio::test]
async fn test_invalid_guesses_never_reach_store() {
    let store = Arc::new(MemoryStore::new());
    let (_alice, mut bob) = active_pair(&store).await;

    for bad in ["", "cab", "cabins", "c4bin", "zzzzz"] {
        let err = bob.controller.submit_guess(bad).await.expect_err("invalid");
        assert!(matches!(err, ControllerError::Validation(_)), "{bad:?}");
    }

    let session = store.find_active().await.expect("query").expect("active");
    assert!(session.moves().is_empty());
}

#[tokio::test]
async fn test_create_while_other_game_active_keeps_tracking_it() {
    let store = Arc::new(MemoryStore::new());
    let (mut alice, mut bob) = active_pair(&store).await;
    let original = alice.controller.state().session_id().cloned();

    let err = bob.controller.create("sheep").await.expect_err("one active game");
    assert!(matches!(err, ControllerError::Store(_)));

    pump_until(&mut bob.controller, |c| phase(c) == Phase::Active).await;
    assert_eq!(bob.controller.state().session_id().cloned(), original);

    alice.controller.force_reset();
    alice.controller.force_reset();
    pump_until(&mut alice.controller, |c| phase(c) == Phase::Active).await;
}

#[tokio::test]
async fn test_resume_picks_up_missed_moves() {
    let store = Arc::new(MemoryStore::new());
    let (_alice, mut bob) = active_pair(&store).await;

    let id = bob
        .controller
        .state()
        .session_id()
        .cloned()
        .expect("tracked");
    store
        .append_move(&id, &"alice".to_string(), Word::parse("cabin").expect("valid"))
        .await
        .expect("append");

    bob.controller.resume().await.expect("resume");
    assert_eq!(filled_rows(&bob.controller), 1);
}
