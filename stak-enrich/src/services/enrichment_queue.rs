//! Background enrichment queue
//!
//! Callers enqueue runs and return immediately. A single spawned worker drains
//! the bounded channel and runs them one at a time.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::services::enrichment_orchestrator::EnrichmentOrchestrator;
use crate::types::TriggerType;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("enrichment queue is full")]
    Full,

    #[error("enrichment queue is closed")]
    Closed,
}

#[derive(Debug, Clone)]
struct EnrichmentJob {
    user_id: String,
    trigger: TriggerType,
}

/// Handle for submitting enrichment runs
#[derive(Clone)]
pub struct EnrichmentQueue {
    sender: mpsc::Sender<EnrichmentJob>,
}

impl EnrichmentQueue {
    /// Spawn the worker and return a handle to it
    ///
    /// The worker exits once every queue handle has been dropped.
    pub fn start(orchestrator: Arc<EnrichmentOrchestrator>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::channel::<EnrichmentJob>(capacity.max(1));

        let worker = tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                match orchestrator.enrich_profile(&job.user_id, job.trigger).await {
                    Ok(outcome) if outcome.success => {
                        info!(user_id = %job.user_id, trigger = %job.trigger, "Queued enrichment completed");
                    }
                    Ok(outcome) => {
                        warn!(
                            user_id = %job.user_id,
                            trigger = %job.trigger,
                            error = outcome.error.as_deref().unwrap_or("unknown"),
                            "Queued enrichment did not succeed"
                        );
                    }
                    Err(e) => {
                        error!(user_id = %job.user_id, trigger = %job.trigger, error = %e, "Queued enrichment failed");
                    }
                }
            }
            info!("Enrichment queue worker stopped");
        });

        (Self { sender }, worker)
    }

    /// Submit a run without waiting
    pub fn enqueue(&self, user_id: impl Into<String>, trigger: TriggerType) -> Result<(), QueueError> {
        let job = EnrichmentJob {
            user_id: user_id.into(),
            trigger,
        };

        self.sender.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => QueueError::Full,
            mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
        })
    }
}
