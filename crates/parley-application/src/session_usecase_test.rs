use super::*;
use async_trait::async_trait;
use parley_core::session::MessageRole;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

// Mock SessionRepository for testing
#[derive(Default)]
struct MockSessionRepository {
    sessions: Mutex<HashMap<String, Session>>,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
}

impl MockSessionRepository {
    fn stored(&self, session_id: &str) -> Option<Session> {
        self.sessions.lock().unwrap().get(session_id).cloned()
    }
}

#[async_trait]
impl SessionRepository for MockSessionRepository {
    async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>> {
        Ok(self.stored(session_id))
    }

    async fn save(&self, session: &Session) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(ParleyError::io("read-only file system"));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        let mut sessions = self.sessions.lock().unwrap();
        sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        let mut sessions = self.sessions.lock().unwrap();
        sessions.remove(session_id);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Session>> {
        let sessions = self.sessions.lock().unwrap();
        Ok(sessions.values().cloned().collect())
    }
}

// Generator returning canned output
struct ScriptedGenerator {
    reply: Result<String>,
    seen_context: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            seen_context: Mutex::new(Vec::new()),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            reply: Err(ParleyError::generation(message)),
            seen_context: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ReplyGenerator for ScriptedGenerator {
    async fn generate(&self, context: &[Message]) -> Result<String> {
        *self.seen_context.lock().unwrap() = context.iter().map(|m| m.id.clone()).collect();
        self.reply.clone()
    }

    async fn summarize(&self, messages: &[Message]) -> Result<String> {
        Ok(format!("summary of {} messages", messages.len()))
    }
}

fn setup() -> (Arc<MockSessionRepository>, SessionUseCase) {
    let repository = Arc::new(MockSessionRepository::default());
    let usecase = SessionUseCase::new(repository.clone(), SessionDefaults::default());
    (repository, usecase)
}

/// Seeds `[sys, pivot(user), reply1(assistant)]` and returns the session id.
async fn seeded(usecase: &SessionUseCase) -> String {
    let session = usecase.create_session(Some("Chat".to_string())).await.unwrap();
    let id = session.id.clone();
    usecase
        .insert_message(&id, Message::user("question").with_id("pivot"))
        .await
        .unwrap();
    usecase
        .insert_message(&id, Message::assistant("answer").with_id("reply1"))
        .await
        .unwrap();
    id
}

fn ids(messages: &[Message]) -> Vec<&str> {
    messages.iter().map(|m| m.id.as_str()).collect()
}

#[tokio::test]
async fn test_create_session_persists_system_prompt() {
    let (repository, usecase) = setup();
    let session = usecase.create_session(None).await.unwrap();

    assert_eq!(session.name, "Untitled");
    assert_eq!(session.messages.len(), 1);
    assert_eq!(session.messages[0].role, MessageRole::System);
    assert_eq!(repository.stored(&session.id).as_ref(), Some(session.as_ref()));
}

#[tokio::test]
async fn test_update_missing_session_is_not_found() {
    let (repository, usecase) = setup();
    let err = usecase
        .insert_message("ghost", Message::user("hello"))
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(repository.saves.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_fork_operations_through_queue() {
    let (repository, usecase) = setup();
    let id = seeded(&usecase).await;

    usecase.create_fork(&id, "pivot").await.unwrap();
    let session = usecase.get_session(&id).await.unwrap();
    let sys_id = session.messages[0].id.clone();
    assert_eq!(ids(&session.messages), vec![sys_id.as_str(), "pivot"]);
    assert_eq!(session.message_forks_hash["pivot"].position, 1);

    usecase
        .insert_message(&id, Message::assistant("second").with_id("reply2"))
        .await
        .unwrap();
    usecase
        .switch_fork(&id, "pivot", ForkDirection::Prev)
        .await
        .unwrap();

    let stored = repository.stored(&id).unwrap();
    assert_eq!(ids(&stored.messages), vec![sys_id.as_str(), "pivot", "reply1"]);
    let entry = &stored.message_forks_hash["pivot"];
    assert_eq!(entry.position, 0);
    assert_eq!(ids(&entry.lists[1].messages), vec!["reply2"]);

    usecase.expand_fork(&id, "pivot").await.unwrap();
    let expanded = usecase.get_session(&id).await.unwrap();
    assert_eq!(
        ids(&expanded.messages),
        vec![sys_id.as_str(), "pivot", "reply1", "reply2"]
    );
    assert!(expanded.message_forks_hash.is_empty());
}

#[tokio::test]
async fn test_noop_fork_does_not_write() {
    let (repository, usecase) = setup();
    let id = seeded(&usecase).await;
    let saves = repository.saves.load(Ordering::SeqCst);

    usecase.create_fork(&id, "reply1").await.unwrap();
    usecase
        .switch_fork(&id, "pivot", ForkDirection::Next)
        .await
        .unwrap();
    usecase.delete_fork(&id, "missing").await.unwrap();

    assert_eq!(repository.saves.load(Ordering::SeqCst), saves);
}

#[tokio::test]
async fn test_concurrent_writes_compose() {
    let (_repository, usecase) = setup();
    let id = seeded(&usecase).await;

    let (forked, inserted) = tokio::join!(
        usecase.create_fork(&id, "pivot"),
        usecase.insert_message(&id, Message::assistant("fresh").with_id("reply2")),
    );
    forked.unwrap();
    inserted.unwrap();

    // Whichever ran first, neither write is lost.
    let session = usecase.get_session(&id).await.unwrap();
    let backup = ids(&session.message_forks_hash["pivot"].lists[0].messages);
    assert_eq!(backup[0], "reply1");
    let in_live = session.find_message("reply2").is_some();
    let in_backup = backup.contains(&"reply2");
    assert!(in_live != in_backup);
}

#[tokio::test]
async fn test_concurrent_inserts_all_land() {
    let (repository, usecase) = setup();
    let id = seeded(&usecase).await;

    let pending: Vec<_> = (0..8)
        .map(|n| usecase.insert_message(&id, Message::user(format!("burst {n}"))))
        .collect();
    for result in futures::future::join_all(pending).await {
        result.unwrap();
    }

    let stored = repository.stored(&id).unwrap();
    assert_eq!(stored.messages.len(), 11);
}

#[tokio::test]
async fn test_failed_save_keeps_last_committed_state() {
    let (repository, usecase) = setup();
    let id = seeded(&usecase).await;
    let before = usecase.get_session(&id).await.unwrap();

    repository.fail_saves.store(true, Ordering::SeqCst);
    let err = usecase.create_fork(&id, "pivot").await.unwrap_err();
    assert!(err.is_persistence());

    repository.fail_saves.store(false, Ordering::SeqCst);
    let after = usecase.get_session(&id).await.unwrap();
    assert_eq!(after, before);
    assert!(after.message_forks_hash.is_empty());
}

#[tokio::test]
async fn test_update_session_with_messages_none_is_noop() {
    let (repository, usecase) = setup();
    let id = seeded(&usecase).await;
    let saves = repository.saves.load(Ordering::SeqCst);

    let session = usecase
        .update_session_with_messages(&id, |_| Ok(None))
        .await
        .unwrap();

    assert_eq!(session.messages.len(), 3);
    assert_eq!(repository.saves.load(Ordering::SeqCst), saves);
}

#[tokio::test]
async fn test_modify_and_remove_message() {
    let (_repository, usecase) = setup();
    let id = seeded(&usecase).await;

    let mut edited = Message::assistant("better answer").with_id("reply1");
    edited.model = Some("test-model".to_string());
    usecase.modify_message(&id, edited).await.unwrap();
    let session = usecase.get_session(&id).await.unwrap();
    assert_eq!(session.find_message("reply1").unwrap().content, "better answer");

    usecase.remove_message(&id, "reply1").await.unwrap();
    let session = usecase.get_session(&id).await.unwrap();
    assert!(session.find_message("reply1").is_none());

    let err = usecase.remove_message(&id, "reply1").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_thread_lifecycle() {
    let (_repository, usecase) = setup();
    let id = seeded(&usecase).await;

    let session = usecase.start_new_thread(&id).await.unwrap();
    assert_eq!(session.threads.len(), 1);
    assert_eq!(session.messages.len(), 1);
    let thread_id = session.threads[0].id.clone();

    usecase
        .rename_thread(&id, &thread_id, "First topic")
        .await
        .unwrap();
    let session = usecase.switch_thread(&id, &thread_id).await.unwrap();
    assert_eq!(session.thread_name.as_deref(), Some("First topic"));
    assert!(session.find_message("pivot").is_some());
    assert!(session.threads.is_empty());

    let session = usecase.start_new_thread(&id).await.unwrap();
    let parked = session.threads[0].id.clone();
    let session = usecase.remove_thread(&id, &parked).await.unwrap();
    assert!(session.threads.is_empty());
}

#[tokio::test]
async fn test_regenerate_in_new_fork() {
    let (_repository, usecase) = setup();
    let id = seeded(&usecase).await;
    let generator = ScriptedGenerator::replying("regenerated");

    let session = usecase
        .regenerate_in_new_fork(&id, "reply1", &generator, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(session.messages.len(), 3);
    let reply = &session.messages[2];
    assert_eq!(reply.content, "regenerated");
    assert!(!reply.generating);
    let entry = &session.message_forks_hash["pivot"];
    assert_eq!(ids(&entry.lists[0].messages), vec!["reply1"]);
    assert_eq!(entry.position, 1);

    let context = generator.seen_context.lock().unwrap().clone();
    assert_eq!(context.last().map(String::as_str), Some("pivot"));
    assert_eq!(context.len(), 2);
}

#[tokio::test]
async fn test_regenerate_first_message_is_noop() {
    let (repository, usecase) = setup();
    let id = seeded(&usecase).await;
    let first = usecase.get_session(&id).await.unwrap().messages[0].id.clone();
    let saves = repository.saves.load(Ordering::SeqCst);

    let generator = ScriptedGenerator::replying("unused");
    usecase
        .regenerate_in_new_fork(&id, &first, &generator, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(repository.saves.load(Ordering::SeqCst), saves);
}

#[tokio::test]
async fn test_generation_failure_is_recorded_on_message() {
    let (_repository, usecase) = setup();
    let id = seeded(&usecase).await;
    let generator = ScriptedGenerator::failing("rate limited");

    let session = usecase
        .generate_after(&id, "reply1", &generator, CancellationToken::new())
        .await
        .unwrap();

    let reply = session.messages.last().unwrap();
    assert!(!reply.generating);
    assert!(reply.error.as_deref().unwrap().contains("rate limited"));
}

#[tokio::test]
async fn test_cancelled_generation_marks_reply() {
    let (_repository, usecase) = setup();
    let id = seeded(&usecase).await;
    let generator = ScriptedGenerator::replying("too late");
    let cancel = CancellationToken::new();
    cancel.cancel();

    let session = usecase
        .generate_after(&id, "reply1", &generator, cancel)
        .await
        .unwrap();

    let reply = session.messages.last().unwrap();
    assert!(reply.cancelled);
    assert!(!reply.generating);
    assert!(reply.content.is_empty());
}

#[tokio::test]
async fn test_generate_after_unknown_pivot() {
    let (_repository, usecase) = setup();
    let id = seeded(&usecase).await;
    let generator = ScriptedGenerator::replying("x");

    let err = usecase
        .generate_after(&id, "ghost", &generator, CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_compress_into_new_thread() {
    let (_repository, usecase) = setup();
    let id = seeded(&usecase).await;
    let generator = ScriptedGenerator::replying("unused");

    let session = usecase
        .compress_into_new_thread(&id, &generator)
        .await
        .unwrap();

    assert_eq!(session.threads.len(), 1);
    assert_eq!(session.messages.len(), 2);
    assert_eq!(session.messages[1].content, "summary of 3 messages");
}

#[tokio::test]
async fn test_delete_session_drops_queue_and_storage() {
    let (repository, usecase) = setup();
    let id = seeded(&usecase).await;
    assert_eq!(usecase.registry().len().await, 1);

    usecase.delete_session(&id).await.unwrap();

    assert!(usecase.registry().is_empty().await);
    assert!(repository.stored(&id).is_none());
    assert!(usecase.get_session(&id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_create_session_twice_with_same_id_conflicts() {
    let (_repository, usecase) = setup();
    let session = usecase.create_session(None).await.unwrap();

    let duplicate = Session {
        name: "copy".to_string(),
        ..session.as_ref().clone()
    };
    let err = usecase.updater.insert(duplicate).await.unwrap_err();
    assert!(matches!(err, ParleyError::AlreadyExists { .. }));
}

#[tokio::test]
async fn test_delete_waits_for_queued_writes() {
    let (repository, usecase) = setup();
    let id = seeded(&usecase).await;

    let (write, deleted) = tokio::join!(
        usecase.insert_message(&id, Message::user("late")),
        usecase.delete_session(&id),
    );

    assert_eq!(write.unwrap().messages.len(), 4);
    deleted.unwrap();
    assert!(repository.stored(&id).is_none());

    let again = usecase.insert_message(&id, Message::user("after")).await;
    assert!(again.unwrap_err().is_not_found());
    assert!(repository.stored(&id).is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_spawned_writer_cannot_resurrect_deleted_session() {
    let (repository, usecase) = setup();
    let usecase = Arc::new(usecase);
    let id = seeded(&usecase).await;

    let writer = {
        let usecase = Arc::clone(&usecase);
        let id = id.clone();
        tokio::spawn(async move { usecase.insert_message(&id, Message::user("racing")).await })
    };
    usecase.delete_session(&id).await.unwrap();
    let _ = writer.await.unwrap();

    assert!(repository.stored(&id).is_none());
}

#[tokio::test]
async fn test_delete_unknown_session_is_ok() {
    let (repository, usecase) = setup();

    usecase.delete_session("ghost").await.unwrap();

    assert_eq!(repository.saves.load(Ordering::SeqCst), 0);
    assert!(usecase.registry().is_empty().await);
}
