// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Create-or-patch of a single extension resource.
//!
//! Deploy writes the desired spec and, when the extension controller has to act, the
//! operation annotation together with a fresh timestamp. Whether an operation is requested
//! for an existing resource is decided in a fixed order; the first matching rule wins:
//!
//! 1. The caller always annotates ([`ReconcileMode::AlwaysAnnotate`])
//! 2. The last operation is missing or did not succeed
//! 3. The desired spec differs materially from the current one
//!
//! If none applies, only the timestamp annotation is refreshed, which still produces a
//! watch event for the controller without re-triggering an operation.

use crate::annotations::{self, Operation};
use crate::client::ResourceClient;
use crate::context::Context;
use crate::errors::{ExtensionError, ResourceKey};
use crate::extension_object::ExtensionObject;
use crate::reconcilers::resources::merge_patch_from;
use crate::reconcilers::{record_outcome, OP_DEPLOY};
use std::fmt;
use tracing::{debug, info};

/// How an existing resource is updated when nothing forces an operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReconcileMode {
    /// Write the desired spec and refresh the timestamp.
    #[default]
    CreateOrPatch,
    /// Leave the spec alone and only refresh the timestamp.
    OnChangeOrError,
    /// Always request an operation.
    AlwaysAnnotate,
}

/// Options of a single [`deploy`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeployOptions {
    /// Verb written to the operation annotation when an operation is requested
    pub operation: Operation,
    pub mode: ReconcileMode,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            operation: Operation::Reconcile,
            mode: ReconcileMode::CreateOrPatch,
        }
    }
}

impl DeployOptions {
    #[must_use]
    pub fn new(operation: Operation, mode: ReconcileMode) -> Self {
        Self { operation, mode }
    }

    /// Options for a reconcile from the two component value flags.
    ///
    /// `annotate_operation` wins over `reconcile_only_on_change_or_error`.
    #[must_use]
    pub fn from_flags(annotate_operation: bool, reconcile_only_on_change_or_error: bool) -> Self {
        let mode = if annotate_operation {
            ReconcileMode::AlwaysAnnotate
        } else if reconcile_only_on_change_or_error {
            ReconcileMode::OnChangeOrError
        } else {
            ReconcileMode::CreateOrPatch
        };
        Self::new(Operation::Reconcile, mode)
    }
}

/// Why an operation annotation was written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnnotationReason {
    Created,
    Forced,
    NotSucceeded,
    SpecChanged,
}

impl fmt::Display for AnnotationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "resource created",
            Self::Forced => "operation always annotated",
            Self::NotSucceeded => "last operation not succeeded",
            Self::SpecChanged => "spec changed",
        })
    }
}

/// Decide whether an existing resource needs an operation annotation.
///
/// Returns `None` when only the timestamp should be refreshed.
#[must_use]
pub fn annotation_reason<K: ExtensionObject>(
    current: &K,
    desired: &K::Spec,
    mode: ReconcileMode,
) -> Option<AnnotationReason> {
    if mode == ReconcileMode::AlwaysAnnotate {
        return Some(AnnotationReason::Forced);
    }
    if !current.last_operation().is_some_and(|op| op.is_succeeded()) {
        return Some(AnnotationReason::NotSucceeded);
    }
    if K::spec_changed(current.spec(), desired) {
        return Some(AnnotationReason::SpecChanged);
    }
    None
}

/// Create or merge-patch the extension resource `namespace/name` with `desired`.
///
/// Returns the object as written. Its timestamp annotation is the value the waiter later
/// expects the controller to have observed.
///
/// # Errors
///
/// API errors are returned unchanged; nothing is retried. Returns
/// [`ExtensionError::Cancelled`] if the context is cancelled.
pub async fn deploy<C, K>(
    ctx: &Context<C>,
    namespace: &str,
    name: &str,
    desired: &K::Spec,
    options: DeployOptions,
) -> Result<K, ExtensionError>
where
    C: ResourceClient,
    K: ExtensionObject,
{
    let key = ResourceKey::new(K::kind(&()), namespace, name);
    let result = deploy_object(ctx, &key, desired, options).await;
    record_outcome(&key.kind, OP_DEPLOY, &result);
    result
}

async fn deploy_object<C, K>(
    ctx: &Context<C>,
    key: &ResourceKey,
    desired: &K::Spec,
    options: DeployOptions,
) -> Result<K, ExtensionError>
where
    C: ResourceClient,
    K: ExtensionObject,
{
    let now = ctx.now();
    let existing = ctx
        .guard(
            key,
            OP_DEPLOY,
            ctx.client.get::<K>(&key.namespace, &key.name),
        )
        .await?;

    let Some(current) = existing else {
        let mut obj = K::build(&key.name, &key.namespace, desired.clone());
        let timestamp = annotations::set_operation(&mut obj, options.operation, now);
        let created = ctx
            .guard(key, OP_DEPLOY, ctx.client.create(&key.namespace, &obj))
            .await?;
        info!(
            kind = %key.kind,
            namespace = %key.namespace,
            name = %key.name,
            operation = %options.operation,
            timestamp = %timestamp,
            reason = %AnnotationReason::Created,
            "Created extension resource"
        );
        return Ok(created);
    };

    let mut modified = current.clone();
    match annotation_reason(&current, desired, options.mode) {
        Some(reason) => {
            *modified.spec_mut() = desired.clone();
            let timestamp = annotations::set_operation(&mut modified, options.operation, now);
            info!(
                kind = %key.kind,
                namespace = %key.namespace,
                name = %key.name,
                operation = %options.operation,
                timestamp = %timestamp,
                reason = %reason,
                "Requesting operation on extension resource"
            );
        }
        None => {
            if options.mode == ReconcileMode::CreateOrPatch {
                *modified.spec_mut() = desired.clone();
            }
            let timestamp = annotations::stamp_timestamp(&mut modified, now);
            debug!(
                kind = %key.kind,
                namespace = %key.namespace,
                name = %key.name,
                timestamp = %timestamp,
                "No operation required, refreshing timestamp only"
            );
        }
    }

    merge_patch_from(ctx, key, &current, &modified).await
}

#[cfg(test)]
#[path = "deploy_tests.rs"]
mod deploy_tests;
