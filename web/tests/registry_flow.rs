mod support;

use std::sync::Arc;
use std::time::{Duration, Instant};
use support::{sample_candidates, RecordingMessenger};
use tq_engine::player::PlayerId;
use tq_engine::question::Candidate;
use tq_web::dispatch::GAME_NOT_FOUND_TEXT;
use tq_web::{
    AnswerOutcome, Dispatcher, EventBus, GameEvent, MemoryQuestionBank, SessionError,
    SessionRegistry, Update,
};

const TTL: Duration = Duration::from_secs(60);

fn registry_with(
    messenger: &Arc<RecordingMessenger>,
    candidates: Vec<Candidate>,
) -> Arc<SessionRegistry> {
    Arc::new(SessionRegistry::with_limits(
        messenger.clone(),
        Arc::new(MemoryQuestionBank::with_seed(candidates, 11)),
        Arc::new(EventBus::new()),
        5,
        TTL,
    ))
}

#[test]
fn start_registers_session_and_counts() {
    let messenger = RecordingMessenger::new();
    let registry = registry_with(&messenger, sample_candidates("rock", 8));

    registry
        .on_start("game-1".to_string(), "rock")
        .expect("start");

    assert_eq!(registry.active_count(), 1);
    assert_eq!(registry.created_total(), 1);
    let snapshot = &registry.snapshots()[0];
    assert_eq!(snapshot.token, "game-1");
    assert_eq!(snapshot.sequence, 1);
    assert!(!snapshot.ended);
}

#[test]
fn start_failure_leaves_registry_empty() {
    let messenger = RecordingMessenger::new();
    let registry = registry_with(&messenger, Vec::new());

    match registry.on_start("game-1".to_string(), "rock") {
        Err(SessionError::QuestionUnavailable(_)) => {}
        other => panic!("expected QuestionUnavailable, got {:?}", other.map(|_| ())),
    }
    assert_eq!(registry.active_count(), 0);
    assert_eq!(registry.created_total(), 0);
}

#[test]
fn wildcard_fallback_serves_unknown_categories() {
    let messenger = RecordingMessenger::new();
    let registry = registry_with(&messenger, sample_candidates("rock", 8));

    let session = registry
        .on_start("game-1".to_string(), "polka")
        .expect("start falls back to the wildcard pool");
    assert_eq!(session.category(), "polka");
    assert_eq!(registry.active_count(), 1);
}

#[test]
fn duplicate_start_replaces_the_running_session() {
    let messenger = RecordingMessenger::new();
    let registry = registry_with(&messenger, sample_candidates("rock", 8));

    registry
        .on_start("game-1".to_string(), "rock")
        .expect("first start");
    registry
        .on_join("game-1", PlayerId(100), "Alice")
        .expect("join");

    let replacement = registry
        .on_start("game-1".to_string(), "rock")
        .expect("second start");

    let current = registry.get("game-1").expect("session registered");
    assert!(Arc::ptr_eq(&current, &replacement), "last start wins");
    assert!(current.snapshot().players.is_empty());
    assert_eq!(registry.created_total(), 2);
    assert_eq!(registry.active_count(), 1);
}

#[test]
fn join_and_answer_fail_for_unknown_tokens() {
    let messenger = RecordingMessenger::new();
    let registry = registry_with(&messenger, sample_candidates("rock", 8));

    match registry.on_join("ghost", PlayerId(1), "Alice") {
        Err(SessionError::NotFound(token)) => assert_eq!(token, "ghost"),
        other => panic!("expected NotFound, got {:?}", other),
    }
    match registry.on_answer("ghost", "cb", PlayerId(1), 1, tq_engine::question::QuestionId(1)) {
        Err(SessionError::NotFound(token)) => assert_eq!(token, "ghost"),
        other => panic!("expected NotFound, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn sweep_removes_idle_sessions() {
    let messenger = RecordingMessenger::new();
    let registry = registry_with(&messenger, sample_candidates("rock", 8));
    registry
        .on_start("game-1".to_string(), "rock")
        .expect("start");

    assert_eq!(registry.sweep(Instant::now()), 0, "fresh session survives");

    let removed = registry.sweep(Instant::now() + TTL * 2);
    assert_eq!(removed, 1);
    assert_eq!(registry.active_count(), 0);

    match registry.on_join("game-1", PlayerId(100), "Alice") {
        Err(SessionError::NotFound(_)) => {}
        other => panic!("expected NotFound after sweep, got {:?}", other),
    }
    // The creation counter is cumulative; the sweep never rewinds it.
    assert_eq!(registry.created_total(), 1);
}

#[test]
fn lifecycle_events_are_published() {
    let messenger = RecordingMessenger::new();
    let registry = registry_with(&messenger, sample_candidates("rock", 8));
    let bus = registry.event_bus();
    let (_id, mut rx) = bus.subscribe("game-1".to_string());

    registry
        .on_start("game-1".to_string(), "rock")
        .expect("start");
    registry
        .on_join("game-1", PlayerId(100), "Alice")
        .expect("join");

    let (sequence, correct, _) = messenger
        .last_question_for(PlayerId(100))
        .expect("question sent");
    let outcome = registry
        .on_answer("game-1", "cb", PlayerId(100), sequence, correct)
        .expect("answer");
    assert!(matches!(outcome, AnswerOutcome::Advanced { .. }));

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert!(matches!(events[0], GameEvent::SessionStarted { .. }));
    assert!(matches!(events[1], GameEvent::PlayerJoined { .. }));
    assert!(matches!(
        events[2],
        GameEvent::QuestionAdvanced { sequence: 2, .. }
    ));
}

#[test]
fn expired_sessions_publish_an_event() {
    let messenger = RecordingMessenger::new();
    let registry = registry_with(&messenger, sample_candidates("rock", 8));
    let bus = registry.event_bus();
    registry
        .on_start("game-1".to_string(), "rock")
        .expect("start");
    let (_id, mut rx) = bus.subscribe("game-1".to_string());

    registry.sweep(Instant::now() + TTL * 2);

    match rx.try_recv() {
        Ok(GameEvent::SessionExpired { token }) => assert_eq!(token, "game-1"),
        other => panic!("expected SessionExpired, got {:?}", other),
    }
}

#[test]
fn dispatcher_reports_unknown_game_to_the_player() {
    let messenger = RecordingMessenger::new();
    let registry = registry_with(&messenger, sample_candidates("rock", 8));
    let dispatcher = Dispatcher::new(registry, messenger.clone());

    dispatcher.handle(Update::Answer {
        token: "ghost".to_string(),
        callback: "cb-7".to_string(),
        player_id: PlayerId(100),
        sequence: 3,
        option: tq_engine::question::QuestionId(1),
    });

    assert_eq!(messenger.acks(), vec![GAME_NOT_FOUND_TEXT.to_string()]);
    assert!(messenger.entries().iter().any(|o| matches!(
        o,
        support::Outbound::Announcement { text, .. } if text.contains("restarted")
    )));
}

#[test]
fn dispatcher_drives_a_full_round() {
    let messenger = RecordingMessenger::new();
    let registry = registry_with(&messenger, sample_candidates("rock", 8));
    let dispatcher = Dispatcher::new(Arc::clone(&registry), messenger.clone());

    dispatcher.handle(Update::Start {
        token: "game-1".to_string(),
        category: "rock".to_string(),
    });
    dispatcher.handle(Update::Join {
        token: "game-1".to_string(),
        player_id: PlayerId(100),
        display_name: "Alice".to_string(),
    });

    let (sequence, correct, _) = messenger
        .last_question_for(PlayerId(100))
        .expect("question sent");
    dispatcher.handle(Update::Answer {
        token: "game-1".to_string(),
        callback: "cb-1".to_string(),
        player_id: PlayerId(100),
        sequence,
        option: correct,
    });

    let snapshot = registry.get("game-1").expect("session").snapshot();
    assert_eq!(snapshot.sequence, 2);
    assert_eq!(snapshot.players[0].score, 1);
}
