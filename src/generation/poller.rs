// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Bounded completion polling for generation jobs
//!
//! The poller is an explicit loop over `{attempt, max_attempts, interval}`:
//! query once, stop on a terminal status, otherwise sleep and try again.
//! Exhausting the budget yields [`WorkflowError::GenerationTimeout`]; a
//! failed query aborts immediately with [`WorkflowError::Polling`] and is
//! not counted as a "still running" attempt.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::client::GenerationService;
use super::error::WorkflowError;
use super::types::GenerationStatus;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Attempt budget and spacing for completion polling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl PollPolicy {
    /// Upper bound on time spent waiting between checks
    pub fn max_wait(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

/// Source of delay between status checks
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real delay backed by the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Polls a generation job until it completes, fails, or runs out of attempts
#[derive(Clone)]
pub struct CompletionPoller {
    policy: PollPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl CompletionPoller {
    pub fn new(policy: PollPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { policy, sleeper }
    }

    /// Poller that waits with the tokio timer
    pub fn with_tokio(policy: PollPolicy) -> Self {
        Self::new(policy, Arc::new(TokioSleeper))
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Wait for `job_id` to reach a terminal state
    ///
    /// Returns the ordered result URLs on COMPLETE.
    pub async fn wait_for_completion(
        &self,
        service: &dyn GenerationService,
        job_id: &str,
    ) -> Result<Vec<String>, WorkflowError> {
        let max_attempts = self.policy.max_attempts;
        info!("Waiting for generation to complete, ID: {}", job_id);

        for attempt in 1..=max_attempts {
            debug!(
                "Checking generation status (attempt {}/{})",
                attempt, max_attempts
            );

            let job = service
                .query_generation(job_id)
                .await
                .map_err(|e| match e {
                    WorkflowError::Polling(_) => e,
                    other => WorkflowError::Polling(other.to_string()),
                })?;
            debug!("Generation {} status: {}", job_id, job.status.as_str());

            match job.status {
                GenerationStatus::Complete => {
                    if job.result_urls.is_empty() {
                        return Err(WorkflowError::Polling(
                            "generation completed without any images".to_string(),
                        ));
                    }
                    info!(
                        "Generation {} complete with {} image(s) after {} attempt(s)",
                        job_id,
                        job.result_urls.len(),
                        attempt
                    );
                    return Ok(job.result_urls);
                }
                GenerationStatus::Failed => {
                    let reason = job
                        .failure_reason
                        .unwrap_or_else(|| "Unknown reason".to_string());
                    warn!("Generation {} failed: {}", job_id, reason);
                    return Err(WorkflowError::GenerationFailed { reason });
                }
                GenerationStatus::Pending | GenerationStatus::Running => {
                    if attempt < max_attempts {
                        self.sleeper.sleep(self.policy.interval).await;
                    }
                }
            }
        }

        warn!(
            "Generation {} did not finish within {} attempts",
            job_id, max_attempts
        );
        Err(WorkflowError::GenerationTimeout {
            attempts: max_attempts,
        })
    }
}
