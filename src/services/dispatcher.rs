//! Supervised stage dispatch.
//!
//! Stage-to-stage handoff is fire-and-forget with respect to the
//! caller, but never unsupervised: every spawned continuation is
//! tracked, its failure is logged with case and stage fields, and
//! `drain` lets a shutting-down process wait for in-flight stages
//! instead of losing transitions between dispatch and execution.

use std::future::Future;
use std::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::domain::errors::DomainResult;

/// Tracks spawned stage continuations.
#[derive(Default)]
pub struct StageDispatcher {
    // std Mutex: held only to push/swap, never across an await.
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl StageDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a stage continuation. The handle is registered before this
    /// returns, so a `drain` that starts afterwards will wait for it.
    /// Stage errors are handled inside the future itself; anything
    /// surfacing here is a dispatch failure.
    pub fn spawn<F>(&self, case_id: &str, stage_label: &'static str, fut: F)
    where
        F: Future<Output = DomainResult<()>> + Send + 'static,
    {
        let case_id = case_id.to_string();
        debug!(case_id = %case_id, stage = stage_label, "dispatching stage");

        let handle = tokio::spawn(async move {
            if let Err(err) = fut.await {
                error!(case_id = %case_id, stage = stage_label, error = %err, "stage dispatch failed");
            }
        });

        self.tasks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(handle);
    }

    /// Wait for all in-flight stages, including stages they dispatch in
    /// turn, to finish.
    pub async fn drain(&self) {
        loop {
            let batch: Vec<JoinHandle<()>> = {
                let mut tasks = self
                    .tasks
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
                std::mem::take(&mut *tasks)
            };

            if batch.is_empty() {
                break;
            }

            // A joined stage may have dispatched successors; loop until
            // the set stops growing.
            for handle in batch {
                let _ = handle.await;
            }
        }
    }
}
