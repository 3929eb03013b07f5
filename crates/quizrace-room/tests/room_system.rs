//! Integration tests for room actors and the registry.
//!
//! Timer tests run with `start_paused = true`: the clock only moves when
//! every task is idle, jumping straight to the next timer, so countdowns
//! play out instantly and in order.

use std::sync::Arc;
use std::time::Duration;

use quizrace_protocol::{PlayerId, Question, RoomId, Snapshot};
use quizrace_room::{
    AnswerOutcome, NextOutcome, QuestionBank, Rejection, RoomConfig, RoomError,
    RoomHandle, RoomRegistry,
};
use tokio::sync::mpsc;
use tokio::time::sleep;

// =========================================================================
// Helpers
// =========================================================================

type Feed = mpsc::UnboundedReceiver<(RoomId, Snapshot)>;
type Registry = RoomRegistry<mpsc::UnboundedSender<(RoomId, Snapshot)>>;

fn bank(n: u32) -> Arc<QuestionBank> {
    let questions = (1..=n)
        .map(|id| Question {
            id,
            prompt: format!("Question {id}"),
            choices: vec!["wrong".into(), "right".into()],
            answer: 1,
        })
        .collect();
    Arc::new(QuestionBank::new(questions).unwrap())
}

fn registry_with(config: RoomConfig, questions: u32) -> (Registry, Feed) {
    let (tx, rx) = mpsc::unbounded_channel();
    (RoomRegistry::new(config, bank(questions), Arc::new(tx)), rx)
}

fn registry(questions: u32) -> (Registry, Feed) {
    registry_with(RoomConfig::default(), questions)
}

/// Everything broadcast so far.
fn drain(feed: &mut Feed) -> Vec<(RoomId, Snapshot)> {
    let mut out = Vec::new();
    while let Ok(item) = feed.try_recv() {
        out.push(item);
    }
    out
}

async fn question_id(room: &RoomHandle) -> Option<u32> {
    room.snapshot().await.unwrap().question.map(|q| q.id)
}

// =========================================================================
// Registry
// =========================================================================

#[tokio::test]
async fn test_room_is_created_once_per_id() {
    let (mut reg, _feed) = registry(3);
    let main = RoomId::default();

    let a = reg.room(&main);
    let b = reg.room(&main);
    assert_eq!(reg.room_count(), 1);
    assert_eq!(a.room_id(), b.room_id());

    a.join(Some("Ada".into()), None, None).await.unwrap();
    assert_eq!(b.snapshot().await.unwrap().players.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rooms_are_independent() {
    let (mut reg, mut feed) = registry(3);
    let main = reg.room(&RoomId::default());
    let other = reg.room(&RoomId::new("lobby-2"));
    assert_eq!(reg.room_count(), 2);

    main.join(None, None, None).await.unwrap();
    other.start().await.unwrap();

    assert!(!main.snapshot().await.unwrap().started);
    assert!(other.snapshot().await.unwrap().players.is_empty());

    let rooms: Vec<_> = drain(&mut feed).into_iter().map(|(id, _)| id).collect();
    assert_eq!(rooms, vec![RoomId::default(), RoomId::new("lobby-2")]);
}

#[tokio::test]
async fn test_get_does_not_create() {
    let (mut reg, _feed) = registry(3);
    assert!(reg.get(&RoomId::new("nope")).is_none());
    reg.room(&RoomId::new("yes"));
    assert!(reg.get(&RoomId::new("yes")).is_some());
    assert_eq!(reg.room_ids(), vec![RoomId::new("yes")]);
}

// =========================================================================
// Join / start
// =========================================================================

#[tokio::test]
async fn test_join_broadcasts_and_returns_player() {
    let (mut reg, mut feed) = registry(3);
    let room = reg.room(&RoomId::default());

    let p = room.join(Some("Ada".into()), Some("#123456".into()), None).await.unwrap();
    assert_eq!(p.name, "Ada");
    assert_eq!(p.score, 0);

    let sent = drain(&mut feed);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1.players, vec![p]);
}

#[tokio::test(start_paused = true)]
async fn test_second_start_is_rejected_without_broadcast() {
    let (mut reg, mut feed) = registry(3);
    let room = reg.room(&RoomId::default());

    room.start().await.unwrap();
    assert_eq!(drain(&mut feed).len(), 1);

    sleep(Duration::from_millis(2_500)).await;
    drain(&mut feed);

    let err = room.start().await.unwrap_err();
    assert!(matches!(err, RoomError::Rejected(Rejection::AlreadyStarted)));
    assert!(drain(&mut feed).is_empty(), "rejections never broadcast");

    // The countdown was not restarted.
    assert_eq!(room.snapshot().await.unwrap().time_left, 18);
}

// =========================================================================
// Countdown
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_countdown_ticks_once_per_second() {
    let (mut reg, mut feed) = registry(3);
    let room = reg.room(&RoomId::default());
    room.start().await.unwrap();

    sleep(Duration::from_millis(3_500)).await;

    let times: Vec<_> = drain(&mut feed).iter().map(|(_, s)| s.time_left).collect();
    assert_eq!(times, vec![20, 19, 18, 17]);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_countdown_catches_up() {
    let (mut reg, mut feed) = registry(3);
    let room = reg.room(&RoomId::default());
    room.start().await.unwrap();

    // Jump the clock past four deadlines in one go, as if the runtime
    // stalled. The late tick takes every missed second off at once.
    tokio::time::advance(Duration::from_millis(5_000)).await;
    sleep(Duration::from_millis(100)).await;

    assert_eq!(room.snapshot().await.unwrap().time_left, 15);
    let times: Vec<_> = drain(&mut feed).iter().map(|(_, s)| s.time_left).collect();
    assert_eq!(times, vec![20, 15]);
}

#[tokio::test(start_paused = true)]
async fn test_time_up_advances_once_after_delay() {
    let config = RoomConfig {
        question_seconds: 3,
        ..RoomConfig::default()
    };
    let (mut reg, mut feed) = registry_with(config, 5);
    let room = reg.room(&RoomId::default());
    room.start().await.unwrap();

    // Clock hits zero at 3s; the advance waits 400ms more.
    sleep(Duration::from_millis(3_200)).await;
    let snap = room.snapshot().await.unwrap();
    assert_eq!(snap.time_left, 0);
    assert_eq!(snap.question.unwrap().id, 1);

    sleep(Duration::from_millis(300)).await;
    let snap = room.snapshot().await.unwrap();
    assert_eq!(snap.question.unwrap().id, 2);
    assert_eq!(snap.time_left, 3);

    // One advance per expiry: zero-second snapshots never skip two questions.
    let ids: Vec<_> = drain(&mut feed)
        .into_iter()
        .filter_map(|(_, s)| s.question.map(|q| q.id))
        .collect();
    assert!(ids.windows(2).all(|w| w[1] <= w[0] + 1));
    assert_eq!(*ids.last().unwrap(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_manual_next_cancels_pending_advance() {
    let config = RoomConfig {
        question_seconds: 2,
        ..RoomConfig::default()
    };
    let (mut reg, _feed) = registry_with(config, 5);
    let room = reg.room(&RoomId::default());
    room.start().await.unwrap();

    sleep(Duration::from_millis(2_100)).await;
    assert_eq!(room.snapshot().await.unwrap().time_left, 0);

    assert_eq!(room.next().await.unwrap(), NextOutcome::Advanced(1));
    sleep(Duration::from_millis(500)).await;
    assert_eq!(question_id(&room).await, Some(2), "pending advance was cancelled");
}

#[tokio::test(start_paused = true)]
async fn test_round_ends_after_last_question_and_timer_stops() {
    let config = RoomConfig {
        question_seconds: 2,
        ..RoomConfig::default()
    };
    let (mut reg, mut feed) = registry_with(config, 2);
    let room = reg.room(&RoomId::default());
    room.start().await.unwrap();

    // Two questions of 2s plus two 400ms pauses.
    sleep(Duration::from_secs(6)).await;
    let snap = room.snapshot().await.unwrap();
    assert!(!snap.started);
    assert_eq!(snap.question.unwrap().id, 2, "index stays on the last question");

    drain(&mut feed);
    sleep(Duration::from_secs(30)).await;
    assert!(drain(&mut feed).is_empty(), "no ticks once the round is over");
}

#[tokio::test(start_paused = true)]
async fn test_reset_cancels_timer() {
    let (mut reg, mut feed) = registry(3);
    let room = reg.room(&RoomId::default());
    let p = room.join(None, None, None).await.unwrap();
    room.start().await.unwrap();
    room.answer(p.id.clone(), 1).await.unwrap();
    sleep(Duration::from_millis(2_500)).await;

    room.reset().await.unwrap();
    let snap = room.snapshot().await.unwrap();
    assert!(!snap.started);
    assert_eq!(snap.time_left, 20);
    assert_eq!(snap.players[0].score, 0);
    assert_eq!(snap.players[0].progress, 0.0);

    drain(&mut feed);
    sleep(Duration::from_secs(30)).await;
    assert!(drain(&mut feed).is_empty(), "reset room must stay quiet");
}

// =========================================================================
// Answers
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_answer_scores_and_broadcasts() {
    let (mut reg, mut feed) = registry(3);
    let room = reg.room(&RoomId::default());
    let p = room.join(None, None, None).await.unwrap();
    room.start().await.unwrap();
    drain(&mut feed);

    let outcome = room.answer(p.id.clone(), 1).await.unwrap();
    assert!(matches!(outcome, AnswerOutcome::Correct { points: 160, .. }));

    let sent = drain(&mut feed);
    assert_eq!(sent.len(), 1);
    let me = &sent[0].1.players[0];
    assert_eq!(me.score, 160);
    assert_eq!(me.streak, 1);
    assert!((me.progress - 30.0).abs() < 1e-9);

    let err = room.answer(p.id.clone(), 1).await.unwrap_err();
    assert!(matches!(err, RoomError::Rejected(Rejection::AlreadyAnswered)));
    assert!(drain(&mut feed).is_empty());
}

#[tokio::test]
async fn test_answer_before_start_is_ignored() {
    let (mut reg, mut feed) = registry(3);
    let room = reg.room(&RoomId::default());
    let p = room.join(None, None, None).await.unwrap();
    drain(&mut feed);

    let err = room.answer(p.id, 1).await.unwrap_err();
    assert!(matches!(err, RoomError::Rejected(Rejection::NotStarted)));
    let err = room.answer(PlayerId::new("ghost"), 1).await.unwrap_err();
    assert!(matches!(err, RoomError::Rejected(Rejection::NotStarted)));
    assert!(drain(&mut feed).is_empty());
}

#[tokio::test]
async fn test_next_while_idle_is_rejected() {
    let (mut reg, mut feed) = registry(3);
    let room = reg.room(&RoomId::default());

    let err = room.next().await.unwrap_err();
    assert!(matches!(err, RoomError::Rejected(Rejection::NotStarted)));
    assert!(drain(&mut feed).is_empty());
}
