//! Open document tracking.
//!
//! Some clients resend the whole document on every keystroke or reopen documents
//! that are already open. Comparing content digests turns those redundant events
//! into no-ops so the compiler only runs when the text really changed.

use std::sync::{Arc, Mutex};

use ahash::AHashMap;

use crate::helpers::{self, ContentDigest};

#[derive(Debug, Clone)]
pub struct DocumentSession {
    pub version: i32,
    pub digest: ContentDigest,
    pub language_id: String,
    pub text: Arc<str>,
}

/// What an open or change event did to the stored session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// First time this document was seen.
    Initialized,
    /// Text identical to what is already stored; nothing changed.
    Suppressed,
    /// Text differed; the session now carries this version.
    Updated(i32),
}

#[derive(Default)]
pub struct DocumentStore {
    sessions: Mutex<AHashMap<String, DocumentSession>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_open_or_change(&self, uri: &str, language_id: &str, version: i32, text: &str) -> SyncAction {
        let digest = helpers::compute_string_hash(text);
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());

        match sessions.get_mut(uri) {
            None => {
                sessions.insert(
                    uri.to_string(),
                    DocumentSession {
                        version,
                        digest,
                        language_id: language_id.to_string(),
                        text: Arc::from(text),
                    },
                );
                SyncAction::Initialized
            }
            Some(session) if session.digest == digest => SyncAction::Suppressed,
            Some(session) => {
                session.version = session.version.saturating_add(1).max(version);
                session.digest = digest;
                session.text = Arc::from(text);
                if !language_id.is_empty() {
                    session.language_id = language_id.to_string();
                }
                SyncAction::Updated(session.version)
            }
        }
    }

    pub fn on_close(&self, uri: &str) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.remove(uri);
    }

    pub fn get(&self, uri: &str) -> Option<DocumentSession> {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(uri)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URI: &str = "file:///project/src/App.tsx";

    #[test]
    fn reopening_identical_text_is_suppressed() {
        let store = DocumentStore::new();

        assert_eq!(
            store.on_open_or_change(URI, "typescriptreact", 1, "export function App() {}"),
            SyncAction::Initialized
        );
        assert_eq!(
            store.on_open_or_change(URI, "typescriptreact", 1, "export function App() {}"),
            SyncAction::Suppressed
        );
        assert_eq!(
            store.on_open_or_change(URI, "typescriptreact", 1, "export function App() { return 1; }"),
            SyncAction::Updated(2)
        );
    }

    #[test]
    fn suppressed_events_leave_the_session_untouched() {
        let store = DocumentStore::new();
        store.on_open_or_change(URI, "typescriptreact", 3, "a");
        store.on_open_or_change(URI, "typescriptreact", 9, "a");

        let session = store.get(URI).unwrap();
        assert_eq!(session.version, 3);
        assert_eq!(&*session.text, "a");
    }

    #[test]
    fn updates_keep_the_newer_client_version() {
        let store = DocumentStore::new();
        store.on_open_or_change(URI, "typescriptreact", 1, "a");

        assert_eq!(store.on_open_or_change(URI, "", 7, "b"), SyncAction::Updated(7));
        let session = store.get(URI).unwrap();
        assert_eq!(session.digest, helpers::compute_string_hash("b"));
        assert_eq!(session.language_id, "typescriptreact");
    }

    #[test]
    fn version_at_the_integer_limit_stays_there() {
        let store = DocumentStore::new();
        store.on_open_or_change(URI, "typescriptreact", i32::MAX, "a");

        assert_eq!(store.on_open_or_change(URI, "", i32::MAX, "b"), SyncAction::Updated(i32::MAX));
        assert_eq!(&*store.get(URI).unwrap().text, "b");
    }

    #[test]
    fn close_forgets_the_document() {
        let store = DocumentStore::new();
        store.on_open_or_change(URI, "typescriptreact", 1, "a");
        store.on_close(URI);

        assert!(store.is_empty());
        assert_eq!(
            store.on_open_or_change(URI, "typescriptreact", 1, "a"),
            SyncAction::Initialized
        );
    }
}
