// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Polling for extension resources to converge.
//!
//! [`poll_until`] is the only retry loop of this library. It probes at a fixed interval
//! until the probe succeeds, a fatal condition is observed, the timeout is reached, or the
//! context is cancelled. Probe errors fall into three groups:
//!
//! - **Not ready yet** (stale timestamp, pending operation, processing) - retried until
//!   the timeout
//! - **Severe** (resource missing, `lastError` reported, migration failed) - retried until
//!   the severe threshold has elapsed, then returned immediately
//! - **Everything else** (API errors, cancellation) - returned immediately
//!
//! On timeout the last retried condition is attached to the [`ExtensionError::Timeout`].

use crate::annotations;
use crate::client::ResourceClient;
use crate::config::WaitConfig;
use crate::context::Context;
use crate::crd::{LastOperationState, LastOperationType};
use crate::errors::{ExtensionError, ResourceKey};
use crate::extension_object::ExtensionObject;
use crate::metrics::record_wait_duration;
use crate::reconcilers::{record_outcome, OP_WAIT, OP_WAIT_MIGRATE};
use chrono::{DateTime, Utc};
use kube::Resource;
use std::future::Future;
use tracing::{debug, info, warn};

/// Last operation types that complete a `reconcile`, `restore` or initial create request.
pub const RECONCILE_OPERATION_TYPES: &[LastOperationType] = &[
    LastOperationType::Create,
    LastOperationType::Reconcile,
    LastOperationType::Restore,
];

/// Whether a probe error is worth another poll.
fn is_retriable(err: &ExtensionError) -> bool {
    matches!(
        err,
        ExtensionError::NotFound { .. }
            | ExtensionError::Reconciliation { .. }
            | ExtensionError::StaleObservation { .. }
            | ExtensionError::NotMigrated { .. }
            | ExtensionError::Pending { .. }
    )
}

/// Poll `probe` until it succeeds or a terminal condition is reached.
///
/// `operation` labels logs, metrics and the cancellation error.
///
/// # Errors
///
/// Returns the probe's error when it is fatal (immediately, or once the severe threshold
/// has elapsed for severe conditions), [`ExtensionError::Timeout`] when the timeout is
/// reached, or [`ExtensionError::Cancelled`] when the context is cancelled.
pub async fn poll_until<C, T, F, Fut>(
    ctx: &Context<C>,
    key: &ResourceKey,
    config: &WaitConfig,
    operation: &str,
    mut probe: F,
) -> Result<T, ExtensionError>
where
    C: ResourceClient,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ExtensionError>>,
{
    let start = ctx.now();
    let mut attempt = 0_u32;
    let mut last_observed: Option<ExtensionError> = None;

    let result = loop {
        attempt += 1;
        if ctx.is_cancelled() {
            break Err(ctx.cancelled(key, operation));
        }

        let err = match probe().await {
            Ok(value) => {
                debug!(
                    kind = %key.kind,
                    namespace = %key.namespace,
                    name = %key.name,
                    operation = operation,
                    attempt = attempt,
                    "Condition met"
                );
                break Ok(value);
            }
            Err(err) => err,
        };

        let elapsed = ctx.clock.elapsed_since(start);
        if !is_retriable(&err) {
            break Err(err);
        }
        if err.is_severe() && elapsed >= config.severe_threshold {
            warn!(
                kind = %key.kind,
                namespace = %key.namespace,
                name = %key.name,
                operation = operation,
                attempt = attempt,
                elapsed = ?elapsed,
                error = %err,
                "Severe condition persisted past threshold, giving up"
            );
            break Err(err);
        }
        if elapsed >= config.timeout {
            break Err(ExtensionError::Timeout {
                key: key.clone(),
                timeout: config.timeout,
                last_observed: Some(Box::new(err)),
            });
        }

        debug!(
            kind = %key.kind,
            namespace = %key.namespace,
            name = %key.name,
            operation = operation,
            attempt = attempt,
            reason = err.reason(),
            error = %err,
            "Condition not met yet, will poll again"
        );
        last_observed = Some(err);

        let delay = config.interval.min(config.timeout - elapsed);
        if let Err(cancelled) = ctx.sleep(key, operation, delay).await {
            break Err(cancelled);
        }
    };

    let elapsed = ctx.clock.elapsed_since(start);
    record_wait_duration(&key.kind, operation, elapsed);
    if let Err(ExtensionError::Timeout { .. }) = &result {
        warn!(
            kind = %key.kind,
            namespace = %key.namespace,
            name = %key.name,
            operation = operation,
            attempt = attempt,
            last_observed = ?last_observed.as_ref().map(ToString::to_string),
            "Timed out waiting for condition"
        );
    }
    result
}

/// Check whether `obj` reflects a completed request stamped at `expected`.
///
/// Conditions are evaluated in order:
///
/// 1. The timestamp annotation is at least `expected` (otherwise `StaleObservation`)
/// 2. No `lastError` is reported (otherwise `Reconciliation`)
/// 3. The operation annotation was removed by the controller
/// 4. `status.observedGeneration` matches `metadata.generation`, when both are known
/// 5. The last operation is one of `operation_types` and succeeded
///
/// # Errors
///
/// Returns the first unmet condition.
pub fn check_ready<K: ExtensionObject>(
    obj: &K,
    expected: Option<DateTime<Utc>>,
    operation_types: &[LastOperationType],
) -> Result<(), ExtensionError> {
    let key = obj.resource_key();

    if let Some(expected) = expected {
        let observed = annotations::recorded_timestamp(obj);
        if observed.map_or(true, |observed| observed < expected) {
            return Err(ExtensionError::StaleObservation {
                key,
                observed: annotations::timestamp(obj).unwrap_or("<none>").to_string(),
                expected: annotations::format_timestamp(expected),
            });
        }
    }

    if let Some(last_error) = obj.last_error() {
        return Err(ExtensionError::Reconciliation {
            key,
            description: last_error.description.clone(),
            codes: last_error.codes.clone(),
        });
    }

    if let Some(operation) = annotations::operation(obj) {
        return Err(ExtensionError::Pending {
            key,
            reason: format!("operation {operation:?} is not yet picked up by the controller"),
        });
    }

    let generation = obj.meta().generation;
    let observed_generation = obj.extension_status().and_then(|s| s.observed_generation);
    if let (Some(generation), Some(observed)) = (generation, observed_generation) {
        if generation != observed {
            return Err(ExtensionError::Pending {
                key,
                reason: format!("observed generation outdated ({observed}/{generation})"),
            });
        }
    }

    match obj.last_operation() {
        None => Err(ExtensionError::Pending {
            key,
            reason: "controller did not record a last operation yet".to_string(),
        }),
        Some(op) if !operation_types.contains(&op.r#type) => Err(ExtensionError::Pending {
            key,
            reason: format!(
                "last operation {} is {}, waiting for {}",
                op.r#type,
                op.state,
                operation_types
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("/")
            ),
        }),
        Some(op) if !op.is_succeeded() => Err(ExtensionError::Pending {
            key,
            reason: format!("last operation {} is {}", op.r#type, op.state),
        }),
        Some(_) => Ok(()),
    }
}

/// Poll the current copy of `obj` until `check` accepts it.
///
/// A missing resource is reported as [`ExtensionError::NotFound`] to the loop, so it fails
/// once the severe threshold has elapsed. Returns the accepted object.
///
/// # Errors
///
/// See [`poll_until`].
pub async fn wait_until<C, K, F>(
    ctx: &Context<C>,
    obj: &K,
    config: &WaitConfig,
    operation: &str,
    check: F,
) -> Result<K, ExtensionError>
where
    C: ResourceClient,
    K: ExtensionObject,
    F: Fn(&K) -> Result<(), ExtensionError>,
{
    let key = obj.resource_key();
    let key_ref = &key;
    let check = &check;

    poll_until(ctx, &key, config, operation, move || async move {
        let current = ctx
            .guard(
                key_ref,
                operation,
                ctx.client.get::<K>(&key_ref.namespace, &key_ref.name),
            )
            .await?
            .ok_or_else(|| ExtensionError::NotFound {
                key: key_ref.clone(),
            })?;
        check(&current)?;
        Ok::<_, ExtensionError>(current)
    })
    .await
}

/// Wait until the controller has completed the request last written to `obj`.
///
/// `obj` is the object returned by [`deploy`](crate::reconcilers::deploy); its timestamp
/// annotation is the one the controller must have observed. The last operation must be
/// one of `operation_types`, usually [`RECONCILE_OPERATION_TYPES`]. Returns the ready
/// object.
///
/// # Errors
///
/// See [`poll_until`]. A missing resource and a reported `lastError` become fatal once the
/// severe threshold has elapsed.
pub async fn wait_until_ready<C, K>(
    ctx: &Context<C>,
    obj: &K,
    config: &WaitConfig,
    operation_types: &[LastOperationType],
) -> Result<K, ExtensionError>
where
    C: ResourceClient,
    K: ExtensionObject,
{
    let key = obj.resource_key();
    let expected = annotations::recorded_timestamp(obj);

    let result = wait_until(ctx, obj, config, OP_WAIT, |current| {
        check_ready(current, expected, operation_types)
    })
    .await;

    if result.is_ok() {
        info!(
            kind = %key.kind,
            namespace = %key.namespace,
            name = %key.name,
            "Extension resource is ready"
        );
    }
    record_outcome(&key.kind, OP_WAIT, &result);
    result
}

/// Wait until `namespace/name` reports a successful migration.
///
/// A resource that does not exist has nothing to migrate and counts as migrated.
///
/// # Errors
///
/// Returns [`ExtensionError::NotMigrated`] with `failed` set once the severe threshold has
/// elapsed and the controller still reports the migration as `Error` or `Failed`, and the
/// errors of [`poll_until`] otherwise.
pub async fn wait_until_migrated<C, K>(
    ctx: &Context<C>,
    namespace: &str,
    name: &str,
    config: &WaitConfig,
) -> Result<(), ExtensionError>
where
    C: ResourceClient,
    K: ExtensionObject,
{
    let key = ResourceKey::new(K::kind(&()), namespace, name);
    let key_ref = &key;

    let result = poll_until(ctx, &key, config, OP_WAIT_MIGRATE, move || async move {
        let Some(current) = ctx
            .guard(key_ref, OP_WAIT_MIGRATE, ctx.client.get::<K>(namespace, name))
            .await?
        else {
            return Ok(());
        };
        check_migrated(&current)
    })
    .await;

    record_outcome(&key.kind, OP_WAIT_MIGRATE, &result);
    result
}

fn check_migrated<K: ExtensionObject>(obj: &K) -> Result<(), ExtensionError> {
    let key = obj.resource_key();
    match obj.last_operation() {
        Some(op) if op.r#type == LastOperationType::Migrate => match op.state {
            LastOperationState::Succeeded => Ok(()),
            LastOperationState::Error | LastOperationState::Failed => {
                let mut reason = format!("last operation Migrate is {}", op.state);
                if let Some(last_error) = obj.last_error() {
                    reason.push_str(": ");
                    reason.push_str(&last_error.description);
                }
                Err(ExtensionError::NotMigrated {
                    key,
                    reason,
                    failed: true,
                })
            }
            state => Err(ExtensionError::NotMigrated {
                key,
                reason: format!("last operation Migrate is {state}"),
                failed: false,
            }),
        },
        Some(op) => Err(ExtensionError::NotMigrated {
            key,
            reason: format!("last operation is {} {}", op.r#type, op.state),
            failed: false,
        }),
        None => Err(ExtensionError::NotMigrated {
            key,
            reason: "controller did not record a last operation yet".to_string(),
            failed: false,
        }),
    }
}

#[cfg(test)]
#[path = "wait_tests.rs"]
mod wait_tests;
