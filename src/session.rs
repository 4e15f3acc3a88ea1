//! Session registry.
//!
//! A session is an id plus an immutable workspace config. The registry is an
//! injected [`SessionStore`] rather than a process global, so the HTTP layer
//! can swap [`MemorySessionStore`] for a persistent backend.
//!
//! Nothing expires on its own. [`cleanup_older_than`] is a sweep the caller
//! may schedule; the server binary does so when a TTL is configured.

use crate::error::{Result, WorkbenchError};
use crate::workspace::Workspace;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{PoisonError, RwLock};
use uuid::Uuid;

/// Opaque 128-bit random session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A malformed id cannot name a session, so it parses to `NotFound`.
impl FromStr for SessionId {
    type Err = WorkbenchError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| WorkbenchError::not_found("session", s.to_string()))
    }
}

/// Optional overrides fixed at creation time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionConfig {
    pub input_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

/// Snapshot of a registered session.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: SessionId,
    pub base_dir: PathBuf,
    pub config: SessionConfig,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Attach to this session's workspace with resolution confined to its
    /// base. Nothing is created; a destroyed session's tree stays gone.
    pub fn workspace(&self) -> Result<Workspace> {
        Ok(Workspace::attach(
            &self.base_dir,
            self.config.input_dir.as_deref(),
            self.config.output_dir.as_deref(),
        )?
        .confined())
    }
}

/// Process-wide mapping from session id to session.
///
/// Implementations must be safe under concurrent create/get/destroy.
pub trait SessionStore: Send + Sync {
    /// Register a new session and create its workspace on disk.
    fn create(&self, config: SessionConfig) -> Result<Session>;

    /// Look up a session; unknown ids are `NotFound`.
    fn get(&self, id: &SessionId) -> Result<Session>;

    /// Look up a session and attach to its workspace as one step, so a
    /// concurrent `destroy` is seen either entirely before or entirely after.
    fn open_workspace(&self, id: &SessionId) -> Result<(Session, Workspace)>;

    /// Drop the entry and delete the workspace. Idempotent; returns whether
    /// the id was registered.
    fn destroy(&self, id: &SessionId) -> Result<bool>;

    /// All registered sessions, in no particular order.
    fn list(&self) -> Vec<Session>;
}

/// In-memory [`SessionStore`] rooted at one directory; each session lives
/// in `<root>/<id>`.
#[derive(Debug)]
pub struct MemorySessionStore {
    root: PathBuf,
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl MemorySessionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn base_for(&self, id: &SessionId) -> PathBuf {
        self.root.join(id.to_string())
    }
}

impl SessionStore for MemorySessionStore {
    fn create(&self, config: SessionConfig) -> Result<Session> {
        let id = SessionId::new();
        let session = Session {
            id,
            base_dir: self.base_for(&id),
            config,
            created_at: Utc::now(),
        };
        Workspace::open(
            &session.base_dir,
            session.config.input_dir.as_deref(),
            session.config.output_dir.as_deref(),
        )?;

        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, session.clone());

        tracing::info!(
            session_id = %id,
            base = %session.base_dir.display(),
            "Created session"
        );
        Ok(session)
    }

    fn get(&self, id: &SessionId) -> Result<Session> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| WorkbenchError::not_found("session", id.to_string()))
    }

    fn open_workspace(&self, id: &SessionId) -> Result<(Session, Workspace)> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        let session = sessions
            .get(id)
            .cloned()
            .ok_or_else(|| WorkbenchError::not_found("session", id.to_string()))?;
        let workspace = session.workspace()?;
        Ok((session, workspace))
    }

    fn destroy(&self, id: &SessionId) -> Result<bool> {
        // The write lock is held across the delete so no `open_workspace`
        // can interleave with it.
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let removed = sessions.remove(id);

        let base = removed
            .as_ref()
            .map(|s| s.base_dir.clone())
            .unwrap_or_else(|| self.base_for(id));
        match fs::remove_dir_all(&base) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                if let Some(session) = removed {
                    sessions.insert(*id, session);
                }
                return Err(WorkbenchError::io(&base, e));
            }
        }
        drop(sessions);

        if removed.is_some() {
            tracing::info!(session_id = %id, "Destroyed session");
        } else {
            tracing::debug!(session_id = %id, "Destroy on unknown session");
        }
        Ok(removed.is_some())
    }

    fn list(&self) -> Vec<Session> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}

/// Destroy every session created before `now - max_age`.
///
/// Returns how many were removed. Failures to delete a directory are logged
/// and skipped so one bad session does not stall the sweep.
pub fn cleanup_older_than(store: &dyn SessionStore, max_age: chrono::Duration) -> usize {
    let cutoff = Utc::now() - max_age;
    let old: Vec<SessionId> = store
        .list()
        .into_iter()
        .filter(|s| s.created_at < cutoff)
        .map(|s| s.id)
        .collect();

    let mut count = 0;
    for id in old {
        match store.destroy(&id) {
            Ok(_) => count += 1,
            Err(e) => tracing::warn!(session_id = %id, error = %e, "Failed to expire session"),
        }
    }
    if count > 0 {
        tracing::info!(count, "Cleaned up expired sessions");
    }
    count
}
