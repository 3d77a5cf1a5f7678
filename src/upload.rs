use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info};

use crate::api::{AnalyticsApi, ProgressFn};
use crate::domain::Domain;
use crate::error::ConsoleError;
use crate::payload::DatasetSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadState {
    Idle,
    Uploading,
    Succeeded,
    Failed,
}

/// Observable state of one domain's upload slot.
#[derive(Debug, Clone, Serialize)]
pub struct UploadStatus {
    pub task_id: u64,
    pub state: UploadState,
    pub progress: u8,
    pub error: Option<String>,
}

#[derive(Debug)]
struct UploadRecord {
    task_id: u64,
    state: UploadState,
    progress: u8,
    error: Option<String>,
}

impl Default for UploadRecord {
    fn default() -> Self {
        Self {
            task_id: 0,
            state: UploadState::Idle,
            progress: 0,
            error: None,
        }
    }
}

#[derive(Default)]
struct TrackerState {
    records: [UploadRecord; 3],
    aborts: Vec<AbortHandle>,
}

impl TrackerState {
    fn record_mut(&mut self, domain: Domain) -> &mut UploadRecord {
        let index = match domain {
            Domain::Video => 0,
            Domain::Advertising => 1,
            Domain::Banking => 2,
        };
        &mut self.records[index]
    }
}

/// Tracks concurrent per-domain upload lifecycles. Uploads for different
/// domains run fully in parallel; starting a new upload for a domain
/// overwrites that domain's record, and any callback still arriving from the
/// replaced transfer is discarded by comparing task ids, never merely the
/// domain.
pub struct UploadTracker<A: AnalyticsApi + 'static> {
    api: Arc<A>,
    state: Arc<Mutex<TrackerState>>,
    next_task_id: std::sync::atomic::AtomicU64,
}

/// Handle to one started upload: await the outcome, or watch progress as it
/// moves. Progress values are monotone and end at 100 on success.
pub struct UploadHandle {
    pub domain: Domain,
    pub task_id: u64,
    pub progress: watch::Receiver<u8>,
    join: JoinHandle<Result<DatasetSummary, ConsoleError>>,
}

impl UploadHandle {
    pub async fn wait(self) -> Result<DatasetSummary, ConsoleError> {
        match self.join.await {
            Ok(result) => result,
            Err(_) => Err(ConsoleError::UploadFailed {
                domain: self.domain,
                message: "upload task was cancelled".to_string(),
            }),
        }
    }
}

impl<A: AnalyticsApi + 'static> UploadTracker<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            state: Arc::new(Mutex::new(TrackerState::default())),
            next_task_id: std::sync::atomic::AtomicU64::new(1),
        }
    }

    pub fn status(&self, domain: Domain) -> UploadStatus {
        let mut state = self.state.lock().unwrap();
        let record = state.record_mut(domain);
        UploadStatus {
            task_id: record.task_id,
            state: record.state,
            progress: record.progress,
            error: record.error.clone(),
        }
    }

    /// Begins transferring `file` for `domain`. The previous transfer for the
    /// domain, if still in flight, is not aborted; its record is simply
    /// replaced and its late callbacks fall to the stale-task guard.
    pub fn start_upload(&self, domain: Domain, file: PathBuf) -> UploadHandle {
        let task_id = self
            .next_task_id
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        info!(%domain, task_id, path = %file.display(), "starting upload");

        {
            let mut state = self.state.lock().unwrap();
            *state.record_mut(domain) = UploadRecord {
                task_id,
                state: UploadState::Uploading,
                progress: 0,
                error: None,
            };
        }

        let (tx, rx) = watch::channel(0u8);
        let progress: ProgressFn = {
            let state = Arc::clone(&self.state);
            Arc::new(move |pct| {
                let mut state = state.lock().unwrap();
                let record = state.record_mut(domain);
                // Stale or finished tasks must not move the needle, and
                // progress never goes backwards.
                if record.task_id != task_id || record.state != UploadState::Uploading {
                    debug!(%domain, task_id, pct, "discarding stale progress callback");
                    return;
                }
                if pct > record.progress {
                    record.progress = pct.min(100);
                    let _ = tx.send(record.progress);
                }
            })
        };

        let api = Arc::clone(&self.api);
        let state = Arc::clone(&self.state);
        let join = tokio::spawn(async move {
            let result = api.upload_dataset(domain, &file, progress).await;

            let mut guard = state.lock().unwrap();
            let record = guard.record_mut(domain);
            if record.task_id == task_id && record.state == UploadState::Uploading {
                match &result {
                    Ok(summary) => {
                        record.state = UploadState::Succeeded;
                        record.progress = 100;
                        info!(%domain, task_id, rows = summary.rows, "upload succeeded");
                    }
                    Err(err) => {
                        // Last known progress is retained.
                        record.state = UploadState::Failed;
                        record.error = Some(err.to_string());
                        info!(%domain, task_id, %err, "upload failed");
                    }
                }
            } else {
                debug!(%domain, task_id, "discarding stale upload completion");
            }
            drop(guard);
            result
        });

        self.state.lock().unwrap().aborts.push(join.abort_handle());

        UploadHandle {
            domain,
            task_id,
            progress: rx,
            join,
        }
    }

    /// Page-teardown cancellation: abort every in-flight transfer. Aborted
    /// tasks never reach their completion write, and their progress callbacks
    /// stop with them.
    pub fn shutdown(&self) {
        let mut state = self.state.lock().unwrap();
        for abort in state.aborts.drain(..) {
            abort.abort();
        }
    }
}

impl<A: AnalyticsApi + 'static> Drop for UploadTracker<A> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
