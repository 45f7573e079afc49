//! End-to-end tests for the interactive chat loop.
//!
//! Input comes from an in-memory reader, answers from a scripted service,
//! and history goes to a temporary directory, so a whole session (and a
//! restart) runs without a terminal or network.

use std::io::Cursor;
use std::time::Duration;

use scrivener_rs::context::COMPACTION_INSTRUCTION;
use scrivener_rs::prelude::*;
use scrivener_rs::testing::ScriptedService;

fn session(service: &ScriptedService) -> CompletionSession<&ScriptedService> {
    CompletionSession::new(service, DEFAULT_MODEL)
        .with_retry(RetryConfig::default().with_unit(Duration::ZERO))
}

/// Drive the loop until `exit` or end of input. Returns the answers shown.
async fn run_loop(
    input: &str,
    manager: &mut ContextWindowManager,
    session: &mut CompletionSession<&ScriptedService>,
) -> Vec<String> {
    let mut reader = MultilineReader::new(Cursor::new(input.as_bytes().to_vec()));
    let mut answers = Vec::new();
    loop {
        let prompt = reader.read_prompt().unwrap();
        if is_exit(&prompt) {
            break;
        }
        let mut shown = String::new();
        manager
            .turn(&mut *session, &prompt, |event| {
                if let TurnEvent::Fragment(f) = event {
                    shown.push_str(f);
                }
            })
            .await
            .unwrap();
        answers.push(shown);
    }
    answers
}

#[tokio::test]
async fn session_persists_and_resumes() {
    let dir = tempfile::tempdir().unwrap();
    let store = HistoryStore::new(dir.path().join("chat"));

    let service = ScriptedService::new();
    service.push_text("Hi! How can I help?");
    service.push_text("Here is a poem.");
    let mut chat = session(&service);
    let mut manager = ContextWindowManager::open(
        store.clone(),
        false,
        WindowConfig::default(),
        TokenAccountant::estimated(DEFAULT_MODEL),
    )
    .unwrap();

    let answers = run_loop(
        "hello\nwrite a poem<<EOF\nabout rust\nEOF\nexit\nnever read\n",
        &mut manager,
        &mut chat,
    )
    .await;
    assert_eq!(answers, vec!["Hi! How can I help?", "Here is a poem."]);
    assert_eq!(
        service.requests()[1].messages.last(),
        Some(&Message::user("write a poem\nabout rust"))
    );
    assert_eq!(service.remaining(), 0);

    // Restart: the saved history becomes the window again.
    let resumed = ContextWindowManager::open(
        store.clone(),
        false,
        WindowConfig::default(),
        TokenAccountant::estimated(DEFAULT_MODEL),
    )
    .unwrap();
    assert_eq!(resumed.history().len(), 4);
    assert_eq!(resumed.window(), resumed.history());

    let snapshots = std::fs::read_dir(store.dir())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with("messages_"))
        .count();
    assert!(snapshots >= 1);
}

#[tokio::test]
async fn end_of_input_stops_without_side_effects() {
    let dir = tempfile::tempdir().unwrap();
    let store = HistoryStore::new(dir.path());
    let service = ScriptedService::new();
    let mut chat = session(&service);
    let mut manager = ContextWindowManager::open(
        store.clone(),
        false,
        WindowConfig::default(),
        TokenAccountant::estimated(DEFAULT_MODEL),
    )
    .unwrap();

    let answers = run_loop("", &mut manager, &mut chat).await;
    assert!(answers.is_empty());
    assert_eq!(service.calls(), 0);
    assert!(!store.latest_path().exists());
}

#[tokio::test]
async fn long_chat_compacts_and_restart_resumes_after_summary() {
    let dir = tempfile::tempdir().unwrap();
    let store = HistoryStore::new(dir.path());
    let config = WindowConfig::default()
        .with_compaction_ceiling(60)
        .with_tail_size(4);

    let service = ScriptedService::new();
    let long_answer = "word ".repeat(30);
    service.push_text(&long_answer);
    service.push_text(&long_answer);
    service.push_text("SUMMARY");
    service.push_text("short");
    let mut chat = session(&service);
    let mut manager = ContextWindowManager::open(
        store.clone(),
        false,
        config.clone(),
        TokenAccountant::estimated(DEFAULT_MODEL),
    )
    .unwrap();

    let answers = run_loop("one\ntwo\nthree\n", &mut manager, &mut chat).await;
    assert_eq!(answers.len(), 3);
    assert_eq!(answers[2], "short");
    assert_eq!(service.calls(), 4);

    let requests = service.requests();
    assert_eq!(
        requests[2].messages.last().map(|m| m.content.as_str()),
        Some(COMPACTION_INSTRUCTION)
    );
    // Tail of 4 plus the real prompt.
    assert_eq!(requests[3].messages.len(), 5);

    let resumed = ContextWindowManager::open(
        store,
        false,
        config,
        TokenAccountant::estimated(DEFAULT_MODEL),
    )
    .unwrap();
    assert_eq!(resumed.history().len(), 8);
    assert_eq!(
        resumed.window(),
        &[
            Message::assistant("SUMMARY"),
            Message::user("three"),
            Message::assistant("short"),
        ]
    );
}
