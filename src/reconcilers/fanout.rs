// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Bounded concurrent fan-out over many extension resources.
//!
//! Two join disciplines are offered:
//!
//! - [`run_all`] runs every task to completion and reports all failures together as an
//!   [`AggregateError`]. Used where one failing resource must not stop the others, e.g.
//!   deploy, migrate and destroy.
//! - [`run_fail_fast`] stops at the first failure and drops the remaining tasks. Used for
//!   waits, where quick feedback matters more than a complete picture.
//!
//! Both poll the tasks concurrently within the calling task, at most `max_parallelism` at
//! a time.

use crate::errors::{AggregateError, ExtensionError};
use crate::metrics::record_fanout_errors;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::future::Future;
use tracing::warn;

/// Run all tasks and collect every error.
///
/// Results of successful tasks are returned in completion order.
///
/// # Errors
///
/// Returns [`ExtensionError::Aggregate`] holding every failure if at least one task failed.
pub async fn run_all<T, I, Fut>(
    kind: &str,
    operation: &str,
    max_parallelism: usize,
    tasks: I,
) -> Result<Vec<T>, ExtensionError>
where
    I: IntoIterator<Item = Fut>,
    Fut: Future<Output = Result<T, ExtensionError>>,
{
    let results: Vec<Result<T, ExtensionError>> = stream::iter(tasks)
        .buffer_unordered(max_parallelism.max(1))
        .collect()
        .await;

    let mut values = Vec::with_capacity(results.len());
    let mut errors = AggregateError::default();
    for result in results {
        match result {
            Ok(value) => values.push(value),
            Err(err) => errors.push(err),
        }
    }

    if errors.is_empty() {
        return Ok(values);
    }

    record_fanout_errors(kind, operation, errors.len());
    warn!(
        kind = kind,
        operation = operation,
        failed = errors.len(),
        succeeded = values.len(),
        "Fan-out finished with errors"
    );
    Err(errors.into())
}

/// Run tasks until the first one fails.
///
/// # Errors
///
/// Returns the first error observed; tasks still in flight are dropped.
pub async fn run_fail_fast<T, I, Fut>(
    kind: &str,
    operation: &str,
    max_parallelism: usize,
    tasks: I,
) -> Result<Vec<T>, ExtensionError>
where
    I: IntoIterator<Item = Fut>,
    Fut: Future<Output = Result<T, ExtensionError>>,
{
    let result: Result<Vec<T>, ExtensionError> = stream::iter(tasks)
        .buffer_unordered(max_parallelism.max(1))
        .try_collect()
        .await;

    if let Err(err) = &result {
        record_fanout_errors(kind, operation, 1);
        warn!(
            kind = kind,
            operation = operation,
            error = %err,
            "Fan-out aborted on first error"
        );
    }
    result
}

#[cfg(test)]
#[path = "fanout_tests.rs"]
mod fanout_tests;
