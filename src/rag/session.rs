//! Rolling conversation history keyed by session token.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

/// Who said a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "User"),
            Role::Assistant => write!(f, "Assistant"),
        }
    }
}

#[derive(Debug, Default)]
struct Session {
    turns: VecDeque<(Role, String)>,
}

/// Session store with a FIFO cap of `max_history` exchanges per session.
///
/// The outer map is only locked to look a session up; each session has its
/// own lock, so concurrent requests on different tokens never contend.
#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Arc<Mutex<Session>>>>,
    max_history: usize,
}

/// A poisoned session still holds a valid deque.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SessionStore {
    pub fn new(max_history: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_history,
        }
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Return `token` if given (creating its session if unseen), otherwise a
    /// new token.
    pub fn get_or_create(&self, token: Option<&str>) -> String {
        let token = match token.map(str::trim).filter(|t| !t.is_empty()) {
            Some(t) => t.to_string(),
            None => Uuid::new_v4().to_string(),
        };

        lock(&self.sessions).entry(token.clone()).or_insert_with(|| {
            debug!(session = %token, "Created session");
            Arc::default()
        });
        token
    }

    fn session(&self, token: &str) -> Arc<Mutex<Session>> {
        lock(&self.sessions)
            .entry(token.to_string())
            .or_default()
            .clone()
    }

    fn push(&self, session: &mut Session, role: Role, text: &str) {
        session.turns.push_back((role, text.to_string()));
        let cap = self.max_history * 2;
        while session.turns.len() > cap {
            session.turns.pop_front();
        }
    }

    /// Append one turn, evicting the oldest turns beyond the cap.
    pub fn append(&self, token: &str, role: Role, text: &str) {
        let session = self.session(token);
        let mut session = lock(&session);
        self.push(&mut session, role, text);
    }

    /// Append a user/assistant pair under one lock.
    pub fn add_exchange(&self, token: &str, user: &str, assistant: &str) {
        let session = self.session(token);
        let mut session = lock(&session);
        self.push(&mut session, Role::User, user);
        self.push(&mut session, Role::Assistant, assistant);
    }

    /// History as "User: ...\nAssistant: ..." lines, or `None` when empty.
    pub fn format_history(&self, token: &str) -> Option<String> {
        let session = lock(&self.sessions).get(token).cloned()?;
        let session = lock(&session);

        if session.turns.is_empty() {
            return None;
        }

        Some(
            session
                .turns
                .iter()
                .map(|(role, text)| format!("{}: {}", role, text))
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }

    /// Forget a session's history.
    pub fn clear(&self, token: &str) {
        if let Some(session) = lock(&self.sessions).get(token) {
            lock(session).turns.clear();
        }
    }

    /// Drop every session.
    pub fn clear_all(&self) {
        lock(&self.sessions).clear();
    }

    pub fn len(&self) -> usize {
        lock(&self.sessions).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
