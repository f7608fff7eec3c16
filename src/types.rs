//! Core types for media-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unique identifier for a download job
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DownloadId(pub u64);

impl DownloadId {
    /// Create a new DownloadId
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the inner u64 value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for DownloadId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<DownloadId> for u64 {
    fn from(id: DownloadId) -> Self {
        id.0
    }
}

impl PartialEq<u64> for DownloadId {
    fn eq(&self, other: &u64) -> bool {
        self.0 == *other
    }
}

impl PartialEq<DownloadId> for u64 {
    fn eq(&self, other: &DownloadId) -> bool {
        *self == other.0
    }
}

impl std::fmt::Display for DownloadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for DownloadId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Job status
///
/// Status only ever advances along `Initial → Downloading → {Completed, Failed}`.
/// No transition leaves a terminal state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    /// Registered, not yet started
    #[default]
    Initial,
    /// Resolution in progress or succeeded; transfer in progress
    Downloading,
    /// Transfer finished successfully
    Completed,
    /// Resolution or transfer failed
    Failed,
}

impl DownloadStatus {
    /// Whether this status is terminal (no further transitions)
    pub fn is_terminal(&self) -> bool {
        matches!(self, DownloadStatus::Completed | DownloadStatus::Failed)
    }
}

impl std::fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DownloadStatus::Initial => "initial",
            DownloadStatus::Downloading => "downloading",
            DownloadStatus::Completed => "completed",
            DownloadStatus::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Submission request: a source URL plus operation selectors
///
/// Immutable once constructed; supplied exactly once at submission.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadInput {
    /// Source page URL
    pub url: String,
    /// Primary operation selector (e.g. media kind)
    pub op: String,
    /// Sub-operation selector (e.g. format/quality)
    pub sub: String,
}

impl DownloadInput {
    /// Create a new submission request
    pub fn new(url: impl Into<String>, op: impl Into<String>, sub: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            op: op.into(),
            sub: sub.into(),
        }
    }
}

/// Resolved media metadata produced by a [`Resolver`](crate::resolver::Resolver)
///
/// Immutable once produced. Header names are normalized to ASCII lowercase at
/// insertion, so lookups are case-insensitive by construction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadInfo {
    /// Resolved media location
    pub audio: String,
    /// Display name
    pub title: String,
    /// File extension derived from the media location
    pub extension: String,
    /// Request headers required when transferring (lowercase names)
    pub headers: HashMap<String, String>,
}

impl DownloadInfo {
    /// Create resolved metadata without extra request headers
    pub fn new(
        audio: impl Into<String>,
        title: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            audio: audio.into(),
            title: title.into(),
            extension: extension.into(),
            headers: HashMap::new(),
        }
    }

    /// Add a request header, normalizing the name to ASCII lowercase
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Look up a request header by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Externally visible job record
///
/// Owned exclusively by the [`JobRegistry`](crate::registry::JobRegistry);
/// callers always receive a clone, never a live handle.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadOutput {
    /// Unique job identifier
    pub id: DownloadId,

    /// The originating submission
    pub input: DownloadInput,

    /// Resolved metadata; `None` until resolution succeeds
    pub info: Option<DownloadInfo>,

    /// Current status
    pub status: DownloadStatus,

    /// Failure description; `Some` if and only if `status` is `Failed`
    pub failure: Option<String>,

    /// When the job was submitted
    pub created_at: DateTime<Utc>,

    /// When the job reached a terminal state (`None` while in flight)
    pub finished_at: Option<DateTime<Utc>>,
}

impl DownloadOutput {
    /// Create a fresh record in the `Initial` state
    pub(crate) fn new(id: DownloadId, input: DownloadInput) -> Self {
        Self {
            id,
            input,
            info: None,
            status: DownloadStatus::Initial,
            failure: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Whether the job finished successfully
    pub fn is_completed(&self) -> bool {
        self.status == DownloadStatus::Completed
    }

    /// Whether the job has reached a terminal state
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub(crate) fn attach_info(&mut self, info: DownloadInfo) {
        self.info = Some(info);
    }

    pub(crate) fn complete(&mut self) {
        self.status = DownloadStatus::Completed;
        self.finished_at = Some(Utc::now());
    }

    pub(crate) fn fail(&mut self, failure: impl Into<String>) {
        self.status = DownloadStatus::Failed;
        self.failure = Some(failure.into());
        self.finished_at = Some(Utc::now());
    }
}

/// Event emitted during the job lifecycle
///
/// Terminal events (`Completed`, `Failed`) are emitted exactly once per job.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Job registered and started
    Submitted {
        /// Job ID
        id: DownloadId,
        /// Source URL
        url: String,
    },

    /// Resolution succeeded; metadata attached
    Resolved {
        /// Job ID
        id: DownloadId,
        /// Resolved display name
        title: String,
    },

    /// Transfer finished successfully
    Completed {
        /// Job ID
        id: DownloadId,
    },

    /// Resolution or transfer failed
    Failed {
        /// Job ID
        id: DownloadId,
        /// Failure description
        error: String,
    },

    /// Job removed from the registry
    Removed {
        /// Job ID
        id: DownloadId,
    },

    /// Graceful shutdown initiated
    Shutdown,
}

/// Per-status job counts
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    /// Total number of jobs known to the registry
    pub total: usize,
    /// Jobs registered but not yet started
    pub initial: usize,
    /// Jobs currently resolving or transferring
    pub downloading: usize,
    /// Jobs that finished successfully
    pub completed: usize,
    /// Jobs that failed
    pub failed: usize,
}
