// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Transaction Runner
//!
//! Runs one hierarchy operation as one directory unit of work: begin, run the
//! operation, commit on success, roll back on failure. When the directory
//! reports a serialization conflict the whole operation is re-run from a
//! fresh transaction, up to [`RetryPolicy::max_retries`] extra attempts.
//! Validation failures are returned as-is and never retried.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Scoped transaction acquisition with guaranteed release

use std::time::Duration;
use futures::future::BoxFuture;
use tracing::warn;

use crate::domain::config::TransactionConfig;
use crate::domain::directory::{Directory, DirectoryTransaction};
use crate::domain::hierarchy::HierarchyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&TransactionConfig::default())
    }
}

impl From<&TransactionConfig> for RetryPolicy {
    fn from(config: &TransactionConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            delay: config.retry_delay(),
        }
    }
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            delay: Duration::ZERO,
        }
    }
}

/// Run `op` inside a directory transaction.
///
/// `op` may be invoked more than once, so it must be `Fn` and rebuild any
/// owned input on every call.
pub async fn run_in_transaction<T, F>(
    directory: &dyn Directory,
    policy: RetryPolicy,
    op: F,
) -> Result<T, HierarchyError>
where
    T: Send,
    F: for<'t> Fn(&'t mut dyn DirectoryTransaction) -> BoxFuture<'t, Result<T, HierarchyError>>
        + Send
        + Sync,
{
    let mut attempt: u32 = 0;
    loop {
        let mut tx = directory.begin().await?;

        let outcome = match op(&mut *tx).await {
            Ok(value) => tx.commit().await.map(|_| value).map_err(HierarchyError::from),
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback failed after operation error");
                }
                Err(err)
            }
        };

        match outcome {
            Err(err) if err.is_retryable() && attempt < policy.max_retries => {
                attempt += 1;
                warn!(
                    attempt,
                    max_retries = policy.max_retries,
                    error = %err,
                    "Directory conflict, retrying operation"
                );
                tokio::time::sleep(policy.delay).await;
            }
            other => return other,
        }
    }
}
