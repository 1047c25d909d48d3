use crate::UnfurlError;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, warn};

pub const INSTRUMENTATION_TAG: &str = "UnfurlScraper";

/// One finished outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkRecord {
    pub tag: String,
    pub url: String,
    pub bytes: u64,
    pub elapsed: Duration,
    /// False when the request failed or was abandoned before a body arrived.
    pub completed: bool,
}

/// Sink for network byte counts. What it does with them is up to the implementor.
#[async_trait]
pub trait InstrumentationStorage: Send + Sync {
    async fn put(&self, record: NetworkRecord) -> Result<(), UnfurlError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopInstrumentationStorage;

#[async_trait]
impl InstrumentationStorage for NoopInstrumentationStorage {
    async fn put(&self, _record: NetworkRecord) -> Result<(), UnfurlError> {
        Ok(())
    }
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemoryInstrumentationStorage {
    records: Mutex<Vec<NetworkRecord>>,
}

impl MemoryInstrumentationStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<NetworkRecord> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.lock().iter().map(|r| r.bytes).sum()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<NetworkRecord>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl InstrumentationStorage for MemoryInstrumentationStorage {
    async fn put(&self, record: NetworkRecord) -> Result<(), UnfurlError> {
        self.lock().push(record);
        Ok(())
    }
}

/// Instrumentation for a single request, opened at dispatch.
///
/// [`record_and_finish`](Self::record_and_finish) consumes the record so it can
/// only be finalized once. A record dropped unfinished (the request future was
/// cancelled) is finalized in the background with zero bytes.
pub struct NetworkInstrumenter {
    storage: Arc<dyn InstrumentationStorage>,
    tag: &'static str,
    url: String,
    started_at: Instant,
    finished: bool,
}

impl std::fmt::Display for NetworkInstrumenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.tag, self.url)
    }
}

impl NetworkInstrumenter {
    pub fn new(
        storage: Arc<dyn InstrumentationStorage>,
        tag: &'static str,
        url: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            tag,
            url: url.into(),
            started_at: Instant::now(),
            finished: false,
        }
    }

    fn build_record(&self, bytes: u64, completed: bool) -> NetworkRecord {
        NetworkRecord {
            tag: self.tag.to_string(),
            url: self.url.clone(),
            bytes,
            elapsed: self.started_at.elapsed(),
            completed,
        }
    }

    pub async fn record_and_finish(mut self, bytes: u64) -> Result<(), UnfurlError> {
        self.finished = true;
        let record = self.build_record(bytes, true);
        self.storage.put(record).await
    }

    /// Finalizes a request that produced no body.
    pub async fn record_failure(mut self) -> Result<(), UnfurlError> {
        self.finished = true;
        let record = self.build_record(0, false);
        self.storage.put(record).await
    }
}

impl Drop for NetworkInstrumenter {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let record = self.build_record(0, false);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!(url = %self.url, "Finalizing abandoned network record");
                let storage = Arc::clone(&self.storage);
                handle.spawn(async move {
                    if let Err(e) = storage.put(record).await {
                        warn!(error = %e, "Unable to instrument abandoned network request");
                    }
                });
            }
            Err(_) => {
                error!(url = %self.url, "Network record dropped without being finalized");
            }
        }
    }
}
