//! Processing sessions and the store that holds them.
//!
//! The store is injected into the service; its lifetime belongs to the
//! caller. `InMemorySessionStore` keeps sessions for the life of the process.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use scenecut_analysis::AnalysisRequest;
use scenecut_core::{CutPoint, Result, SceneCutError, VideoInfo};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
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

impl FromStr for SessionId {
    type Err = SceneCutError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| SceneCutError::Validation(format!("Invalid session id {s:?}: {e}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Uploaded,
    Analyzed,
    Processed,
}

/// Parameters and threshold of the last analysis run on a session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub request: AnalysisRequest,
    pub threshold: f64,
}

/// One video being analyzed and segmented.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingSession {
    pub id: SessionId,
    pub video_path: PathBuf,
    pub video_info: VideoInfo,
    /// Always ordered by timestamp; replaced wholesale by analysis or edit.
    pub cut_points: Vec<CutPoint>,
    pub created_at: DateTime<Utc>,
    pub status: SessionStatus,
    /// Absent until the first analysis.
    pub last_analysis: Option<AnalysisRecord>,
}

impl ProcessingSession {
    pub fn new(video_path: PathBuf, video_info: VideoInfo) -> Self {
        Self {
            id: SessionId::new(),
            video_path,
            video_info,
            cut_points: Vec::new(),
            created_at: Utc::now(),
            status: SessionStatus::Uploaded,
            last_analysis: None,
        }
    }
}

/// Storage for sessions.
pub trait SessionStore: Send + Sync {
    fn insert(&self, session: ProcessingSession);

    /// A snapshot of the session.
    fn get(&self, id: SessionId) -> Result<ProcessingSession>;

    /// Apply `update` to the stored session in place.
    fn update(&self, id: SessionId, update: &mut dyn FnMut(&mut ProcessingSession)) -> Result<()>;

    fn remove(&self, id: SessionId) -> Result<ProcessingSession>;
}

fn not_found(id: SessionId) -> SceneCutError {
    SceneCutError::NotFound(format!("Session {id} not found"))
}

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, ProcessingSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

impl SessionStore for InMemorySessionStore {
    fn insert(&self, session: ProcessingSession) {
        self.sessions.write().insert(session.id, session);
    }

    fn get(&self, id: SessionId) -> Result<ProcessingSession> {
        self.sessions.read().get(&id).cloned().ok_or_else(|| not_found(id))
    }

    fn update(&self, id: SessionId, update: &mut dyn FnMut(&mut ProcessingSession)) -> Result<()> {
        let mut sessions = self.sessions.write();
        let session = sessions.get_mut(&id).ok_or_else(|| not_found(id))?;
        update(session);
        Ok(())
    }

    fn remove(&self, id: SessionId) -> Result<ProcessingSession> {
        self.sessions.write().remove(&id).ok_or_else(|| not_found(id))
    }
}
