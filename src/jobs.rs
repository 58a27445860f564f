use crate::aggregator::{Aggregator, SearchReport};
use crate::models::SearchRequest;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub type SearchId = Uuid;

#[derive(Debug, Clone)]
pub enum SearchStatus {
    Pending,
    Running,
    Completed(SearchReport),
    Failed(String),
}

impl SearchStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, SearchStatus::Completed(_) | SearchStatus::Failed(_))
    }
}

struct SearchJob {
    status: SearchStatus,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

/// Search passes submitted in the background, each retrievable by id
pub struct SearchJobs {
    aggregator: Arc<Aggregator>,
    jobs: Arc<Mutex<HashMap<SearchId, SearchJob>>>,
    shutdown: CancellationToken,
}

impl SearchJobs {
    pub fn new(aggregator: Arc<Aggregator>) -> Self {
        Self {
            aggregator,
            jobs: Arc::new(Mutex::new(HashMap::new())),
            shutdown: CancellationToken::new(),
        }
    }

    /// Queue a pass on the runtime and return its id right away
    pub async fn submit(&self, request: SearchRequest) -> SearchId {
        let id = Uuid::new_v4();
        let cancel = self.shutdown.child_token();

        // hold the lock so the task cannot update the entry before it exists
        let mut jobs = self.jobs.lock().await;

        let aggregator = self.aggregator.clone();
        let registry = self.jobs.clone();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            Self::set_status(&registry, id, SearchStatus::Running).await;
            tracing::info!("Search {} started", id);

            let status = match aggregator.search_with_cancel(&request, token).await {
                Ok(report) => {
                    tracing::info!("Search {} completed with {} new listings", id, report.listings.len());
                    SearchStatus::Completed(report)
                }
                Err(e) => {
                    tracing::error!("Search {} failed: {}", id, e);
                    SearchStatus::Failed(e.to_string())
                }
            };
            Self::set_status(&registry, id, status).await;
        });

        jobs.insert(
            id,
            SearchJob {
                status: SearchStatus::Pending,
                cancel,
                handle: Some(handle),
            },
        );
        id
    }

    async fn set_status(jobs: &Mutex<HashMap<SearchId, SearchJob>>, id: SearchId, status: SearchStatus) {
        if let Some(job) = jobs.lock().await.get_mut(&id) {
            job.status = status;
        }
    }

    pub async fn status(&self, id: SearchId) -> Option<SearchStatus> {
        self.jobs.lock().await.get(&id).map(|job| job.status.clone())
    }

    /// Cancel a running pass. It still persists what it already collected.
    pub async fn cancel(&self, id: SearchId) -> bool {
        match self.jobs.lock().await.get(&id) {
            Some(job) if !job.status.is_finished() => {
                job.cancel.cancel();
                true
            }
            _ => false,
        }
    }

    /// Wait for a pass to finish and return its final status
    pub async fn wait(&self, id: SearchId) -> Option<SearchStatus> {
        let handle = self.jobs.lock().await.get_mut(&id)?.handle.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!("Search {} task ended abnormally: {}", id, e);
                Self::set_status(&self.jobs, id, SearchStatus::Failed(e.to_string())).await;
            }
        }
        self.status(id).await
    }

    /// Drop a finished pass and hand back its final status. Passes still
    /// pending or running are left in place and yield `None`.
    pub async fn forget(&self, id: SearchId) -> Option<SearchStatus> {
        let mut jobs = self.jobs.lock().await;
        if !jobs.get(&id)?.status.is_finished() {
            return None;
        }
        jobs.remove(&id).map(|job| job.status)
    }

    /// Number of passes currently tracked, finished or not
    pub async fn tracked(&self) -> usize {
        self.jobs.lock().await.len()
    }

    /// Cancel every pass that is still running
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}
