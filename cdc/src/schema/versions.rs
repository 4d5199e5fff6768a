use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{CdcResult, ErrorKind};
use crate::cdc_error;
use crate::schema::SchemaVersion;

/// Trait for resolving the schema version governing a commit timestamp.
///
/// The upstream store knows which schema version was active when a transaction
/// committed; the mounter consults this collaborator before decoding so that
/// every mutation is interpreted against the structure that was actually in
/// effect when it was written.
///
/// Implementations should ensure thread-safety and handle concurrent access.
pub trait SchemaVersionLookup {
    /// Returns the schema version governing `commit_ts`.
    ///
    /// Fails with [`ErrorKind::UnknownSchemaVersion`] when no version covers
    /// the timestamp.
    fn version_at(&self, commit_ts: u64) -> impl Future<Output = CdcResult<SchemaVersion>> + Send;
}

/// Internal storage for resolved version data.
#[derive(Debug, Default)]
struct Inner {
    versions: BTreeMap<u64, SchemaVersion>,
}

/// In-memory timestamp-to-version mapping.
///
/// [`ResolvedVersionMap`] answers version lookups from recorded
/// `(commit timestamp, schema version)` points: the version governing a
/// timestamp is the one recorded at the greatest timestamp at or below it.
/// Useful for tests and for embedding systems that track versions themselves.
#[derive(Debug, Clone, Default)]
pub struct ResolvedVersionMap {
    inner: Arc<Mutex<Inner>>,
}

impl ResolvedVersionMap {
    /// Creates a new empty version map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `version` governs commit timestamps from `commit_ts`
    /// onwards (until a later recording supersedes it).
    pub async fn record(&self, commit_ts: u64, version: SchemaVersion) {
        let mut inner = self.inner.lock().await;
        inner.versions.insert(commit_ts, version);
    }
}

impl SchemaVersionLookup for ResolvedVersionMap {
    async fn version_at(&self, commit_ts: u64) -> CdcResult<SchemaVersion> {
        let inner = self.inner.lock().await;
        inner
            .versions
            .range(..=commit_ts)
            .next_back()
            .map(|(_, version)| *version)
            .ok_or_else(|| {
                cdc_error!(
                    ErrorKind::UnknownSchemaVersion,
                    "No schema version governs the commit timestamp",
                    format!("commit_ts {commit_ts}")
                )
            })
    }
}
