//! Session management
//!
//! Tracks the active repository and chat history of each browser session.
//! State lives in memory only and is lost on restart.

use dashmap::DashMap;

use crate::protocol::{ChatMessage, CurrentRepo};

/// Per-session state
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub current_repo: Option<CurrentRepo>,
    pub chat_history: Vec<ChatMessage>,
}

#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<String, SessionContext>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh session identifier
    pub fn new_session_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    pub fn current_repo(&self, session_id: &str) -> Option<CurrentRepo> {
        self.sessions
            .get(session_id)
            .and_then(|s| s.current_repo.clone())
    }

    /// Select the active repository, creating the session on first use
    pub fn set_current_repo(&self, session_id: &str, repo: CurrentRepo) {
        tracing::debug!("Session {} selected {}/{}", session_id, repo.owner, repo.repo);
        self.sessions
            .entry(session_id.to_string())
            .or_default()
            .current_repo = Some(repo);
    }

    pub fn history(&self, session_id: &str) -> Vec<ChatMessage> {
        self.sessions
            .get(session_id)
            .map(|s| s.chat_history.clone())
            .unwrap_or_default()
    }

    /// The last `max` messages of the history
    pub fn recent_history(&self, session_id: &str, max: usize) -> Vec<ChatMessage> {
        self.sessions
            .get(session_id)
            .map(|s| {
                let skip = s.chat_history.len().saturating_sub(max);
                s.chat_history[skip..].to_vec()
            })
            .unwrap_or_default()
    }

    /// Append a completed user/assistant exchange
    pub fn record_exchange(&self, session_id: &str, user: ChatMessage, assistant: ChatMessage) {
        let mut session = self.sessions.entry(session_id.to_string()).or_default();
        session.chat_history.push(user);
        session.chat_history.push(assistant);
    }

    pub fn clear_history(&self, session_id: &str) {
        if let Some(mut session) = self.sessions.get_mut(session_id) {
            session.chat_history.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(name: &str) -> CurrentRepo {
        CurrentRepo {
            owner: "octo".to_string(),
            repo: name.to_string(),
            path: format!("/repos/octo_{}", name),
        }
    }

    #[test]
    fn test_repo_selection_replaced_on_switch() {
        let store = SessionStore::new();
        assert!(store.current_repo("s1").is_none());

        store.set_current_repo("s1", repo("one"));
        store.set_current_repo("s1", repo("two"));
        assert_eq!(store.current_repo("s1").unwrap().repo, "two");
        assert!(store.current_repo("s2").is_none());
    }

    #[test]
    fn test_history_is_bounded_on_read_and_cleared() {
        let store = SessionStore::new();
        for i in 0..3 {
            store.record_exchange(
                "s1",
                ChatMessage::user(format!("q{i}")),
                ChatMessage::assistant(format!("a{i}")),
            );
        }
        assert_eq!(store.history("s1").len(), 6);

        let recent = store.recent_history("s1", 2);
        assert_eq!(recent, vec![ChatMessage::user("q2"), ChatMessage::assistant("a2")]);
        assert_eq!(store.recent_history("s1", 100).len(), 6);

        store.set_current_repo("s1", repo("kept"));
        store.clear_history("s1");
        assert!(store.history("s1").is_empty());
        assert_eq!(store.current_repo("s1").unwrap().repo, "kept");
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = SessionStore::new();
        store.record_exchange("a", ChatMessage::user("hi"), ChatMessage::assistant("hello"));
        assert!(store.history("b").is_empty());
        store.clear_history("b");
        assert_eq!(store.history("a").len(), 2);
    }
}
