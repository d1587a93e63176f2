//! Batch certificate submission with partial success handling
//!
//! Submits many certificate requests through one shared client. Items run
//! concurrently up to `max_parallel` and share the batch's [`CallContext`]:
//! its deadline bounds the whole batch and cancelling it stops every item.

use std::sync::Arc;

use certgate_domain::{CertificateId, CertificateRequest};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::commands::ApiCommands;
use super::context::CallContext;
use super::errors::ApiError;

/// Configuration for batch submission
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Maximum concurrent submissions
    pub max_parallel: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { max_parallel: 5 }
    }
}

/// Result of a batch submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSubmissionResult {
    /// (item index, certificate id) for every accepted request
    pub submitted: Vec<(usize, CertificateId)>,
    /// Number of items that failed
    pub failed: usize,
    /// Errors encountered (item index, error message)
    pub errors: Vec<(usize, String)>,
}

impl BatchSubmissionResult {
    fn empty() -> Self {
        Self { submitted: Vec::new(), failed: 0, errors: Vec::new() }
    }
}

/// Concurrent submitter over shared [`ApiCommands`]
pub struct BatchSubmitter {
    commands: Arc<ApiCommands>,
    config: BatchConfig,
}

impl BatchSubmitter {
    /// Create a new batch submitter
    ///
    /// # Arguments
    ///
    /// * `commands` - API commands instance
    /// * `config` - Batch configuration
    pub fn new(commands: Arc<ApiCommands>, config: BatchConfig) -> Self {
        Self { commands, config }
    }

    /// Submit all requests
    ///
    /// # Arguments
    ///
    /// * `requests` - Certificate requests to submit
    /// * `ctx` - Deadline and cancellation shared by the whole batch
    ///
    /// # Returns
    ///
    /// Per-item ids and failures, both ordered by item index
    ///
    /// # Errors
    ///
    /// Returns error only if every submission fails
    #[instrument(skip_all, fields(count = requests.len()))]
    pub async fn submit_certificates(
        &self,
        requests: Vec<CertificateRequest>,
        ctx: &CallContext,
    ) -> Result<BatchSubmissionResult, ApiError> {
        if requests.is_empty() {
            return Ok(BatchSubmissionResult::empty());
        }

        let total = requests.len();
        let max_parallel = self.config.max_parallel.max(1);
        debug!(count = total, max_parallel, "Submitting certificate batch");

        let outcomes: Vec<(usize, Result<CertificateId, ApiError>)> =
            stream::iter(requests.into_iter().enumerate())
                .map(|(idx, request)| {
                    let commands = Arc::clone(&self.commands);
                    let ctx = ctx.clone();
                    async move { (idx, commands.submit_certificate(&request, &ctx).await) }
                })
                .buffer_unordered(max_parallel)
                .collect()
                .await;

        let mut result = BatchSubmissionResult::empty();
        let mut last_error = None;

        for (idx, outcome) in outcomes {
            match outcome {
                Ok(id) => result.submitted.push((idx, id)),
                Err(err) => {
                    result.failed += 1;
                    result.errors.push((idx, err.to_string()));
                    last_error = Some(err);
                }
            }
        }
        result.submitted.sort_by_key(|(idx, _)| *idx);
        result.errors.sort_by_key(|(idx, _)| *idx);

        if result.submitted.is_empty() {
            return Err(last_error
                .unwrap_or_else(|| ApiError::InvalidInput("Empty certificate batch".to_string())));
        } else if result.failed > 0 {
            warn!(
                submitted = result.submitted.len(),
                failed = result.failed,
                "Batch submission completed with errors"
            );
        } else {
            info!(submitted = total, "Batch submission successful");
        }

        Ok(result)
    }
}
