//! Background summary/style refresh
//!
//! Message saves enqueue a [`RefreshJob`] and return immediately. A fixed
//! pool of workers drains the bounded queue; a full queue drops the job
//! (the next save for the conversation will enqueue another one).

use crate::config::WorkerConfig;
use crate::metrics::METRICS;
use crate::store::{ConversationId, Store};
use crate::style::StyleEngine;
use crate::summary::SummaryScheduler;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Staleness check request for one conversation and the sender that just wrote to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshJob {
    pub conversation_id: ConversationId,
    pub sender_id: String,
}

/// Everything a worker needs to process a job
#[derive(Clone)]
struct RefreshContext {
    store: Arc<dyn Store>,
    summaries: Arc<SummaryScheduler>,
    styles: Arc<StyleEngine>,
}

/// Bounded work queue consumed by a fixed worker pool
pub struct RefreshQueue {
    tx: RwLock<Option<mpsc::Sender<RefreshJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl RefreshQueue {
    /// Spawn `config.refresh_workers` workers on the current runtime
    pub fn start(
        store: Arc<dyn Store>,
        summaries: Arc<SummaryScheduler>,
        styles: Arc<StyleEngine>,
        config: &WorkerConfig,
    ) -> Self {
        let (tx, rx) = mpsc::channel(config.refresh_queue_capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let context = RefreshContext {
            store,
            summaries,
            styles,
        };

        let workers = (0..config.refresh_workers.max(1))
            .map(|worker_id| tokio::spawn(refresh_worker(worker_id, rx.clone(), context.clone())))
            .collect();

        info!(
            workers = config.refresh_workers,
            capacity = config.refresh_queue_capacity,
            "Refresh workers started"
        );

        Self {
            tx: RwLock::new(Some(tx)),
            workers: Mutex::new(workers),
        }
    }

    /// Queue a job without waiting; returns false if it was dropped
    pub async fn enqueue(&self, job: RefreshJob) -> bool {
        let guard = self.tx.read().await;
        let Some(tx) = guard.as_ref() else {
            debug!(
                conversation_id = job.conversation_id,
                "Refresh queue closed, job ignored"
            );
            return false;
        };

        match tx.try_send(job) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(job)) => {
                METRICS.record_refresh_job_dropped();
                warn!(
                    conversation_id = job.conversation_id,
                    sender_id = %job.sender_id,
                    "Refresh queue full, job dropped"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Stop accepting jobs, let workers drain what is queued, and wait for them
    pub async fn shutdown(&self) {
        self.tx.write().await.take();

        let workers: Vec<_> = self.workers.lock().await.drain(..).collect();
        for handle in workers {
            if let Err(e) = handle.await {
                error!("Refresh worker exited abnormally: {}", e);
            }
        }

        info!("Refresh workers stopped");
    }
}

async fn refresh_worker(
    worker_id: usize,
    rx: Arc<Mutex<mpsc::Receiver<RefreshJob>>>,
    context: RefreshContext,
) {
    loop {
        // the lock is released as soon as a job is received
        let job = rx.lock().await.recv().await;
        let Some(job) = job else {
            break;
        };

        debug!(
            worker_id,
            conversation_id = job.conversation_id,
            "Processing refresh job"
        );
        process_job(&context, &job).await;
    }

    debug!(worker_id, "Refresh worker exiting");
}

/// Failures are logged only; they never reach the message save that queued the job
async fn process_job(context: &RefreshContext, job: &RefreshJob) {
    let messages = match context.store.all_messages(job.conversation_id).await {
        Ok(messages) => messages,
        Err(e) => {
            error!(
                conversation_id = job.conversation_id,
                "Failed to load messages for refresh: {}", e
            );
            return;
        }
    };

    if let Err(e) = context
        .summaries
        .refresh_if_needed(job.conversation_id, &messages)
        .await
    {
        error!(
            conversation_id = job.conversation_id,
            "Summary refresh failed: {}", e
        );
    }

    if let Err(e) = context
        .styles
        .refresh_if_needed(job.conversation_id, &job.sender_id, &messages)
        .await
    {
        error!(
            conversation_id = job.conversation_id,
            sender_id = %job.sender_id,
            "Style refresh failed: {}", e
        );
    }
}
