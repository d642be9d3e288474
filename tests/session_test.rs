//! End-to-end session tests: real coach client, local backend, recorded speech

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use sari_coach::voice::{SpeechEngine, Utterance, Voice};
use sari_coach::{
    Answer, AssistantSession, CoachClient, InteractionState, SpeechAnnouncer, SubmitOutcome,
    FALLBACK_MESSAGE,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Questions the backend has seen
type Seen = Arc<Mutex<Vec<String>>>;

/// Engine that records spoken texts and cancellations in order
#[derive(Default)]
struct RecordingEngine {
    log: Mutex<Vec<String>>,
}

impl RecordingEngine {
    fn spoken(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter_map(|entry| entry.strip_prefix("speak:").map(str::to_string))
            .collect()
    }
}

impl SpeechEngine for RecordingEngine {
    fn is_available(&self) -> bool {
        true
    }

    fn voices(&self) -> Vec<Voice> {
        vec![Voice::new("Alex"), Voice::new("Google US English")]
    }

    fn cancel(&self) {
        self.log.lock().unwrap().push("cancel".to_string());
    }

    fn speak(&self, utterance: Utterance) -> anyhow::Result<()> {
        self.log.lock().unwrap().push(format!("speak:{}", utterance.text));
        Ok(())
    }
}

/// Backend answering per question: "q1" fails with 500, "slow" takes a while,
/// "Why is revenue down?" gets the stockout answer, anything else is echoed
async fn ask_handler(State(seen): State<Seen>, Json(body): Json<Value>) -> Response {
    let question = body["question"].as_str().unwrap_or_default().to_string();
    seen.lock().unwrap().push(question.clone());

    match question.as_str() {
        "q1" => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": "Coach is currently offline." })),
        )
            .into_response(),
        "slow" => {
            tokio::time::sleep(Duration::from_millis(300)).await;
            Json(json!({ "answer": "finally" })).into_response()
        }
        "Why is revenue down?" => {
            Json(json!({ "answer": "Sales dropped 12% due to stockouts." })).into_response()
        }
        other => Json(json!({ "answer": format!("You asked: {}", other) })).into_response(),
    }
}

async fn spawn_backend(seen: Seen) -> String {
    let router = Router::new()
        .route("/api/coach/ask", post(ask_handler))
        .with_state(seen);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn setup() -> (AssistantSession, Arc<RecordingEngine>, Seen) {
    let seen = Seen::default();
    let url = spawn_backend(seen.clone()).await;
    let engine = Arc::new(RecordingEngine::default());
    let announcer = SpeechAnnouncer::new(engine.clone());
    let client = CoachClient::new(&url).unwrap();
    let session = AssistantSession::new(1, Arc::new(client), Arc::new(announcer));
    (session, engine, seen)
}

#[tokio::test]
async fn test_answer_is_shown_and_spoken() {
    let (session, engine, seen) = setup().await;

    assert_eq!(session.submit("Why is revenue down?"), SubmitOutcome::Dispatched);
    let state = session.settled().await;
    session.drained().await;

    assert_eq!(
        state,
        InteractionState::Answered(Answer::new("Sales dropped 12% due to stockouts."))
    );
    assert_eq!(engine.spoken(), vec!["Sales dropped 12% due to stockouts."]);
    assert_eq!(*seen.lock().unwrap(), vec!["Why is revenue down?"]);
}

#[tokio::test]
async fn test_whitespace_question_makes_no_request() {
    let (session, engine, seen) = setup().await;

    assert_eq!(session.submit("  "), SubmitOutcome::EmptyQuestion);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(session.state(), InteractionState::Idle);
    assert!(seen.lock().unwrap().is_empty());
    assert!(engine.spoken().is_empty());
}

#[tokio::test]
async fn test_second_submit_while_pending_sends_nothing() {
    let (session, _engine, seen) = setup().await;

    assert_eq!(session.submit("first"), SubmitOutcome::Dispatched);
    assert_eq!(session.submit("test"), SubmitOutcome::AlreadyPending);
    let state = session.settled().await;

    assert_eq!(state, InteractionState::Answered(Answer::new("You asked: first")));
    assert_eq!(*seen.lock().unwrap(), vec!["first"]);
}

#[tokio::test]
async fn test_failure_then_recovery() {
    let (session, engine, _seen) = setup().await;

    session.submit("q1");
    assert_eq!(
        session.settled().await,
        InteractionState::Failed(FALLBACK_MESSAGE.to_string())
    );
    assert!(engine.spoken().is_empty());

    assert_eq!(session.submit("q2"), SubmitOutcome::Dispatched);
    assert_eq!(
        session.settled().await,
        InteractionState::Answered(Answer::new("You asked: q2"))
    );
    session.drained().await;
    assert_eq!(engine.spoken(), vec!["You asked: q2"]);
}

#[tokio::test]
async fn test_each_answer_cancels_previous_speech() {
    let (session, engine, _seen) = setup().await;

    session.submit("one");
    session.settled().await;
    session.drained().await;
    session.submit("two");
    session.settled().await;
    session.drained().await;

    let log = engine.log.lock().unwrap().clone();
    assert_eq!(
        log,
        vec!["cancel", "speak:You asked: one", "cancel", "speak:You asked: two"]
    );
}

#[tokio::test]
async fn test_unreachable_backend_fails_gracefully() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = CoachClient::new(&format!("http://{}", addr)).unwrap();
    let session = AssistantSession::new(1, Arc::new(client), Arc::new(SpeechAnnouncer::silent()));

    session.submit("anyone there?");
    assert_eq!(session.settled().await.failure(), Some(FALLBACK_MESSAGE));
}

#[tokio::test]
async fn test_invalid_store_fails_without_request() {
    let seen = Seen::default();
    let url = spawn_backend(seen.clone()).await;
    let client = CoachClient::new(&url).unwrap();
    let session = AssistantSession::new(0, Arc::new(client), Arc::new(SpeechAnnouncer::silent()));

    assert_eq!(session.submit("hello"), SubmitOutcome::Dispatched);
    assert_eq!(session.settled().await.failure(), Some(FALLBACK_MESSAGE));
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_dismiss_while_pending_still_delivers_answer() {
    let (session, engine, _seen) = setup().await;

    session.submit("slow");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!session.dismiss());
    assert!(session.state().is_pending());

    assert_eq!(session.settled().await, InteractionState::Answered(Answer::new("finally")));
    session.drained().await;
    assert_eq!(engine.spoken(), vec!["finally"]);

    assert!(session.dismiss());
    assert_eq!(session.state(), InteractionState::Idle);
}

#[tokio::test]
async fn test_dropping_session_while_pending_discards_answer() {
    let (session, engine, seen) = setup().await;

    session.submit("slow");
    tokio::time::sleep(Duration::from_millis(50)).await;
    drop(session);
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert_eq!(*seen.lock().unwrap(), vec!["slow"]);
    assert!(engine.spoken().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_quick_follow_up_silences_earlier_answer() {
    let (session, engine, seen) = setup().await;

    session.submit("first");
    session.settled().await;
    session.submit("second");
    let shown = session.settled().await;
    session.drained().await;

    assert_eq!(shown, InteractionState::Answered(Answer::new("You asked: second")));
    assert_eq!(engine.spoken().last().map(String::as_str), Some("You asked: second"));
    assert_eq!(*seen.lock().unwrap(), vec!["first", "second"]);
}
