//! Application state store
//!
//! [`Store`] is the single handle through which every component reads and
//! mutates the current user, subjects and topics. Each mutation runs inside
//! one lock scope, notifies subscribers, and writes the state file through
//! when persistence is configured.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, error, info};

use crate::models::{ProfileUpdate, Roadmap, Subject, SubjectRoadmap, Topic, TopicStatus, User};

/// Layout version of the state file
pub const STATE_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("No user is signed in")]
    NoUser,

    #[error("Subject '{0}' does not exist")]
    UnknownSubject(String),

    #[error("Subject '{0}' belongs to another user")]
    ForeignSubject(String),

    #[error("Topic '{0}' does not exist")]
    UnknownTopic(String),

    #[error("Duplicate id '{0}'")]
    DuplicateId(String),

    #[error("State file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("State file is malformed: {0}")]
    Format(#[from] serde_json::Error),

    #[error("Unsupported state file version {0}")]
    Version(u32),
}

/// Whether the backing state file is reachable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatastoreStatus {
    Checking,
    Connected,
    Disconnected,
}

/// The in-memory application state
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub user: Option<User>,
    pub subjects: Vec<Subject>,
    pub topics: Vec<Topic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_chat_message: Option<String>,
}

impl AppState {
    /// Topics belonging to a subject, in insertion order
    pub fn topics_for(&self, subject_id: &str) -> Vec<&Topic> {
        self.topics
            .iter()
            .filter(|t| t.subject_id == subject_id)
            .collect()
    }

    fn check_subject(&self, subject: &Subject) -> Result<(), StoreError> {
        if let Some(user) = &self.user {
            if subject.user_id != user.id {
                return Err(StoreError::ForeignSubject(subject.id.clone()));
            }
        }
        if self.subjects.iter().any(|s| s.id == subject.id) {
            return Err(StoreError::DuplicateId(subject.id.clone()));
        }
        Ok(())
    }

    fn check_topic(&self, topic: &Topic) -> Result<(), StoreError> {
        let subject = self
            .subjects
            .iter()
            .find(|s| s.id == topic.subject_id)
            .ok_or_else(|| StoreError::UnknownSubject(topic.subject_id.clone()))?;
        if let Some(user) = &self.user {
            if subject.user_id != user.id {
                return Err(StoreError::ForeignSubject(subject.id.clone()));
            }
        }
        if self.topics.iter().any(|t| t.id == topic.id) {
            return Err(StoreError::DuplicateId(topic.id.clone()));
        }
        Ok(())
    }
}

/// On-disk layout of the state file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedState {
    pub version: u32,
    pub user: Option<User>,
    #[serde(default)]
    pub subjects: Vec<Subject>,
    #[serde(default)]
    pub topics: Vec<Topic>,
}

impl From<&AppState> for PersistedState {
    fn from(state: &AppState) -> Self {
        Self {
            version: STATE_VERSION,
            user: state.user.clone(),
            subjects: state.subjects.clone(),
            topics: state.topics.clone(),
        }
    }
}

struct Inner {
    state: AppState,
    status: DatastoreStatus,
}

#[derive(Clone)]
pub struct Store {
    inner: Arc<Mutex<Inner>>,
    update_tx: Arc<broadcast::Sender<()>>,
    persist_path: Option<Arc<PathBuf>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl Store {
    fn with_parts(state: AppState, status: DatastoreStatus, path: Option<PathBuf>) -> Self {
        let (tx, _rx) = broadcast::channel(100);
        Self {
            inner: Arc::new(Mutex::new(Inner { state, status })),
            update_tx: Arc::new(tx),
            persist_path: path.map(Arc::new),
        }
    }

    /// A store without a state file
    pub fn in_memory() -> Self {
        Self::with_parts(AppState::default(), DatastoreStatus::Disconnected, None)
    }

    /// A store backed by `path`, loading it when it already exists
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if !path.exists() {
            info!(path = %path.display(), "Starting with an empty state file");
            return Ok(Self::with_parts(
                AppState::default(),
                DatastoreStatus::Checking,
                Some(path),
            ));
        }

        let persisted = load_state(&path)?;
        info!(
            path = %path.display(),
            subjects = persisted.subjects.len(),
            topics = persisted.topics.len(),
            "Loaded state file"
        );
        let state = AppState {
            user: persisted.user,
            subjects: persisted.subjects,
            topics: persisted.topics,
            pending_chat_message: None,
        };
        Ok(Self::with_parts(
            state,
            DatastoreStatus::Connected,
            Some(path),
        ))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    // Runs a mutation on a copy of the state and commits it once it is saved.
    // A failed save leaves the in-memory state untouched and returns the error.
    fn mutate<F, R>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut AppState) -> Result<R, StoreError>,
    {
        let mut inner = self.lock();
        let mut next = inner.state.clone();
        let result = f(&mut next)?;
        // Saved under the lock so the file always holds the latest commit
        if let Some(path) = &self.persist_path {
            match save_state(path, &PersistedState::from(&next)) {
                Ok(()) => {
                    debug!(path = %path.display(), "Saved state file");
                    inner.status = DatastoreStatus::Connected;
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Failed to save state file");
                    inner.status = DatastoreStatus::Disconnected;
                    return Err(e);
                }
            }
        }
        inner.state = next;
        drop(inner);

        let _ = self.update_tx.send(());
        Ok(result)
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> AppState {
        self.lock().state.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.lock().state.user.clone()
    }

    pub fn datastore_status(&self) -> DatastoreStatus {
        self.lock().status
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.update_tx.subscribe()
    }

    /// Signs in a user, dropping any data that belonged to someone else
    pub fn set_user(&self, user: User) -> Result<(), StoreError> {
        self.mutate(|state| {
            state.subjects.retain(|s| s.user_id == user.id);
            let kept: Vec<String> = state.subjects.iter().map(|s| s.id.clone()).collect();
            state.topics.retain(|t| kept.contains(&t.subject_id));
            state.user = Some(user);
            Ok(())
        })
    }

    pub fn update_profile(&self, update: ProfileUpdate) -> Result<User, StoreError> {
        self.mutate(|state| {
            let user = state.user.as_mut().ok_or(StoreError::NoUser)?;
            user.apply(update);
            Ok(user.clone())
        })
    }

    pub fn add_subject(&self, subject: Subject) -> Result<(), StoreError> {
        self.mutate(|state| {
            state.check_subject(&subject)?;
            state.subjects.push(subject);
            Ok(())
        })
    }

    pub fn add_topic(&self, topic: Topic) -> Result<(), StoreError> {
        self.mutate(|state| {
            state.check_topic(&topic)?;
            state.topics.push(topic);
            Ok(())
        })
    }

    /// Adds a subject and its topics in one step, or nothing at all
    pub fn add_subject_roadmap(&self, roadmap: SubjectRoadmap) -> Result<(), StoreError> {
        self.mutate(|state| {
            let mut next = state.clone();
            next.check_subject(&roadmap.subject)?;
            next.subjects.push(roadmap.subject);
            for topic in roadmap.topics {
                next.check_topic(&topic)?;
                next.topics.push(topic);
            }
            *state = next;
            Ok(())
        })
    }

    /// Replaces every subject and topic wholesale
    pub fn set_subjects_and_topics(&self, roadmap: Roadmap) -> Result<(), StoreError> {
        self.mutate(|state| {
            let mut next = AppState {
                user: state.user.clone(),
                pending_chat_message: state.pending_chat_message.clone(),
                ..AppState::default()
            };
            for subject in roadmap.subjects {
                next.check_subject(&subject)?;
                next.subjects.push(subject);
            }
            for topic in roadmap.topics {
                next.check_topic(&topic)?;
                next.topics.push(topic);
            }
            *state = next;
            Ok(())
        })
    }

    pub fn set_topic_status(&self, topic_id: &str, status: TopicStatus) -> Result<Topic, StoreError> {
        self.mutate(|state| {
            let topic = state
                .topics
                .iter_mut()
                .find(|t| t.id == topic_id)
                .ok_or_else(|| StoreError::UnknownTopic(topic_id.to_string()))?;
            topic.status = status;
            Ok(topic.clone())
        })
    }

    /// Signs out, clearing all state
    pub fn clear(&self) -> Result<(), StoreError> {
        self.mutate(|state| {
            *state = AppState::default();
            Ok(())
        })
    }

    /// Queues a message for the assistant as if the user had typed it
    pub fn send_to_chat(&self, message: impl Into<String>) {
        let message = message.into();
        let mut inner = self.lock();
        inner.state.pending_chat_message = Some(message);
        drop(inner);
        let _ = self.update_tx.send(());
    }

    pub fn take_pending_chat_message(&self) -> Option<String> {
        self.lock().state.pending_chat_message.take()
    }
}

fn load_state(path: &Path) -> Result<PersistedState, StoreError> {
    let raw = fs::read_to_string(path)?;
    let persisted: PersistedState = serde_json::from_str(&raw)?;
    if persisted.version != STATE_VERSION {
        return Err(StoreError::Version(persisted.version));
    }
    Ok(persisted)
}

fn save_state(path: &Path, state: &PersistedState) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(state)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Difficulty;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn subject(id: &str, user_id: &str) -> Subject {
        Subject {
            id: id.to_string(),
            user_id: user_id.to_string(),
            title: format!("Subject {}", id),
            difficulty: Difficulty::Beginner,
            priority: 3,
            credits: Some(4),
            confidence_level: None,
            exam_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            color: "#ef4444".to_string(),
        }
    }

    fn topic(id: &str, subject_id: &str) -> Topic {
        Topic {
            id: id.to_string(),
            subject_id: subject_id.to_string(),
            title: format!("Topic {}", id),
            estimated_hours: 2.0,
            weightage: 5.0,
            weakness_score: 5.0,
            status: TopicStatus::Todo,
        }
    }

    fn signed_in() -> (Store, User) {
        let store = Store::in_memory();
        let user = User::onboard("Ada", "Civil Engineering", 2);
        store.set_user(user.clone()).unwrap();
        (store, user)
    }

    fn temp_state_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("axent-store-{}-{}", name, uuid::Uuid::new_v4().simple()))
            .join("state.json")
    }

    #[test]
    fn test_add_topic_requires_known_subject() {
        let (store, user) = signed_in();
        store.add_subject(subject("s1", &user.id)).unwrap();

        store.add_topic(topic("t1", "s1")).unwrap();
        let err = store.add_topic(topic("t2", "missing")).unwrap_err();
        assert!(matches!(err, StoreError::UnknownSubject(id) if id == "missing"));
        let err = store.add_topic(topic("t1", "s1")).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId(_)));

        assert_eq!(store.snapshot().topics.len(), 1);
    }

    #[test]
    fn test_subjects_must_belong_to_user() {
        let (store, _user) = signed_in();
        let err = store.add_subject(subject("s1", "someone-else")).unwrap_err();
        assert!(matches!(err, StoreError::ForeignSubject(_)));
    }

    #[test]
    fn test_wholesale_replace_is_all_or_nothing() {
        let (store, user) = signed_in();
        store.add_subject(subject("old", &user.id)).unwrap();

        let bad = Roadmap {
            subjects: vec![subject("s1", &user.id)],
            topics: vec![topic("t1", "s1"), topic("t2", "nowhere")],
        };
        assert!(store.set_subjects_and_topics(bad).is_err());
        assert_eq!(store.snapshot().subjects[0].id, "old");

        let good = Roadmap {
            subjects: vec![subject("s1", &user.id)],
            topics: vec![topic("t1", "s1")],
        };
        store.set_subjects_and_topics(good).unwrap();
        let state = store.snapshot();
        assert_eq!(state.subjects.len(), 1);
        assert_eq!(state.subjects[0].id, "s1");
        assert_eq!(state.topics_for("s1").len(), 1);
    }

    #[test]
    fn test_topic_status_and_profile_updates() {
        let (store, user) = signed_in();
        store.add_subject(subject("s1", &user.id)).unwrap();
        store.add_topic(topic("t1", "s1")).unwrap();

        let updated = store.set_topic_status("t1", TopicStatus::Completed).unwrap();
        assert_eq!(updated.status, TopicStatus::Completed);
        assert!(matches!(
            store.set_topic_status("nope", TopicStatus::Todo),
            Err(StoreError::UnknownTopic(_))
        ));

        let user = store
            .update_profile(ProfileUpdate {
                daily_study_hours: Some(6.0),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(user.daily_study_hours, 6.0);
    }

    #[test]
    fn test_update_profile_without_user() {
        let store = Store::in_memory();
        assert!(matches!(
            store.update_profile(ProfileUpdate::default()),
            Err(StoreError::NoUser)
        ));
    }

    #[test]
    fn test_pending_chat_message_is_taken_once() {
        let store = Store::in_memory();
        store.send_to_chat("Plan Thermodynamics for me");
        assert_eq!(
            store.take_pending_chat_message(),
            Some("Plan Thermodynamics for me".to_string())
        );
        assert_eq!(store.take_pending_chat_message(), None);
    }

    #[tokio::test]
    async fn test_mutations_notify_subscribers() {
        let (store, user) = signed_in();
        let mut rx = store.subscribe();
        store.add_subject(subject("s1", &user.id)).unwrap();
        assert!(rx.recv().await.is_ok());
    }

    #[test]
    fn test_clear_signs_out() {
        let (store, user) = signed_in();
        store.add_subject(subject("s1", &user.id)).unwrap();
        store.clear().unwrap();
        assert_eq!(store.snapshot(), AppState::default());
    }

    #[test]
    fn test_persisted_state_survives_reopen() {
        let path = temp_state_path("reopen");
        let store = Store::open(&path).unwrap();
        assert_eq!(store.datastore_status(), DatastoreStatus::Checking);

        let user = User::onboard("Grace", "Electronics & Communication", 3);
        store.set_user(user.clone()).unwrap();
        store.add_subject(subject("s1", &user.id)).unwrap();
        store.add_topic(topic("t1", "s1")).unwrap();
        assert_eq!(store.datastore_status(), DatastoreStatus::Connected);

        let reopened = Store::open(&path).unwrap();
        assert_eq!(reopened.datastore_status(), DatastoreStatus::Connected);
        assert_eq!(reopened.snapshot(), store.snapshot());

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_rejects_unknown_state_version() {
        let path = temp_state_path("version");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{"version": 7, "user": null}"#).unwrap();

        assert!(matches!(Store::open(&path), Err(StoreError::Version(7))));

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_failed_save_keeps_previous_state() {
        let path = temp_state_path("unwritable");
        let dir = path.parent().unwrap().to_path_buf();
        fs::create_dir_all(&dir).unwrap();
        // A regular file where the state file's directory should be
        let blocker = dir.join("blocked");
        fs::write(&blocker, "").unwrap();
        let store = Store::open(blocker.join("state.json")).unwrap();
        let mut updates = store.subscribe();

        let result = store.set_user(User::onboard("Ada", "Civil Engineering", 1));
        assert!(matches!(result, Err(StoreError::Io(_))));
        assert!(store.user().is_none());
        assert_eq!(store.datastore_status(), DatastoreStatus::Disconnected);
        assert!(updates.try_recv().is_err());

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_in_memory_store_is_disconnected() {
        assert_eq!(
            Store::in_memory().datastore_status(),
            DatastoreStatus::Disconnected
        );
    }
}
