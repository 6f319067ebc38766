// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Deletion of extension resources.
//!
//! Extension resources are protected by a validating webhook that rejects deletion unless
//! the resource carries `confirmation.gardener.cloud/deletion=true`. [`destroy`] therefore
//! merge-patches the confirmation annotation first and deletes afterwards. A missing
//! resource is not an error at either step.
//!
//! Deletion is asynchronous: the extension controller holds a finalizer until it has
//! cleaned up, so callers wait with [`wait_until_deleted`].

use crate::annotations;
use crate::client::{NamespacedObject, ResourceClient};
use crate::config::WaitConfig;
use crate::context::Context;
use crate::errors::{is_not_found, ExtensionError, ResourceKey};
use crate::extension_object::ExtensionObject;
use crate::reconcilers::fanout::run_all;
use crate::reconcilers::resources::merge_patch_from;
use crate::reconcilers::wait::poll_until;
use crate::reconcilers::{record_outcome, OP_DESTROY, OP_WAIT_CLEANUP};
use kube::{Resource, ResourceExt};
use tracing::{debug, info};

/// Confirm the deletion of `namespace/name` and delete it.
///
/// # Errors
///
/// Returns API errors other than not-found, or [`ExtensionError::Cancelled`].
pub async fn destroy<C, K>(ctx: &Context<C>, namespace: &str, name: &str) -> Result<(), ExtensionError>
where
    C: ResourceClient,
    K: NamespacedObject,
{
    let key = ResourceKey::new(K::kind(&()), namespace, name);
    let result = destroy_object::<C, K>(ctx, &key).await;
    record_outcome(&key.kind, OP_DESTROY, &result);
    result
}

async fn destroy_object<C, K>(ctx: &Context<C>, key: &ResourceKey) -> Result<(), ExtensionError>
where
    C: ResourceClient,
    K: NamespacedObject,
{
    let existing = ctx
        .guard(key, OP_DESTROY, ctx.client.get::<K>(&key.namespace, &key.name))
        .await?;

    let Some(current) = existing else {
        debug!(
            kind = %key.kind,
            namespace = %key.namespace,
            name = %key.name,
            "Already gone, nothing to delete"
        );
        return Ok(());
    };

    if !annotations::is_deletion_confirmed(&current) {
        let mut confirmed = current.clone();
        annotations::confirm_deletion(&mut confirmed);
        match merge_patch_from(ctx, key, &current, &confirmed).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e),
        }
    }

    match ctx
        .guard(key, OP_DESTROY, ctx.client.delete::<K>(&key.namespace, &key.name))
        .await
    {
        Ok(()) => {
            info!(
                kind = %key.kind,
                namespace = %key.namespace,
                name = %key.name,
                "Deleted extension resource"
            );
            Ok(())
        }
        Err(ExtensionError::Api(e)) if is_not_found(&e) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Wait until `namespace/name` no longer exists.
///
/// Presence, including a set `deletionTimestamp`, and read errors count as "still
/// present". A `lastError` reported by the controller is carried into the timeout error.
///
/// # Errors
///
/// Returns [`ExtensionError::Timeout`] or [`ExtensionError::Cancelled`].
pub async fn wait_until_deleted<C, K>(
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

    let result = poll_until(ctx, &key, config, OP_WAIT_CLEANUP, move || async move {
        let observed = match ctx
            .guard(key_ref, OP_WAIT_CLEANUP, ctx.client.get::<K>(namespace, name))
            .await
        {
            Ok(observed) => observed,
            Err(cancelled @ ExtensionError::Cancelled { .. }) => return Err(cancelled),
            Err(e) => {
                return Err(ExtensionError::Pending {
                    key: key_ref.clone(),
                    reason: format!("could not be read: {e}"),
                })
            }
        };
        match observed {
            None => Ok(()),
            Some(current) => Err(still_present(&current)),
        }
    })
    .await;

    record_outcome(&key.kind, OP_WAIT_CLEANUP, &result);
    result
}

fn still_present<K: ExtensionObject>(obj: &K) -> ExtensionError {
    let mut reason = if obj.meta().deletion_timestamp.is_some() {
        "deletion in progress".to_string()
    } else {
        "still present".to_string()
    };
    if let Some(last_error) = obj.last_error() {
        reason.push_str(", last error: ");
        reason.push_str(&last_error.description);
    }
    ExtensionError::Pending {
        key: obj.resource_key(),
        reason,
    }
}

/// Destroy every resource of kind `K` in `namespace` for which `predicate` returns true.
///
/// Returns the names of the resources that were deleted.
///
/// # Errors
///
/// Returns the list error, or an [`ExtensionError::Aggregate`] of all failed deletions.
pub async fn delete_matching<C, K, P>(
    ctx: &Context<C>,
    namespace: &str,
    max_parallelism: usize,
    predicate: P,
) -> Result<Vec<String>, ExtensionError>
where
    C: ResourceClient,
    K: ExtensionObject,
    P: Fn(&K) -> bool,
{
    let list_key = ResourceKey::new(K::kind(&()), namespace, "");
    let objects = ctx
        .guard(&list_key, OP_DESTROY, ctx.client.list::<K>(namespace, None))
        .await?;

    let names: Vec<String> = objects
        .iter()
        .filter(|obj| predicate(obj))
        .map(ResourceExt::name_any)
        .collect();

    run_all(
        &list_key.kind,
        OP_DESTROY,
        max_parallelism,
        names.iter().map(|name| async move {
            destroy::<C, K>(ctx, namespace, name).await?;
            Ok::<_, ExtensionError>(name.clone())
        }),
    )
    .await
}

/// Wait until no resource of kind `K` in `namespace` matches `predicate`.
///
/// # Errors
///
/// Returns [`ExtensionError::Timeout`] naming the remaining resources, or
/// [`ExtensionError::Cancelled`].
pub async fn wait_until_matching_deleted<C, K, P>(
    ctx: &Context<C>,
    namespace: &str,
    config: &WaitConfig,
    predicate: P,
) -> Result<(), ExtensionError>
where
    C: ResourceClient,
    K: ExtensionObject,
    P: Fn(&K) -> bool,
{
    let key = ResourceKey::new(K::kind(&()), namespace, "");
    let key_ref = &key;
    let predicate = &predicate;

    let result = poll_until(ctx, &key, config, OP_WAIT_CLEANUP, move || async move {
        let objects = match ctx
            .guard(key_ref, OP_WAIT_CLEANUP, ctx.client.list::<K>(namespace, None))
            .await
        {
            Ok(objects) => objects,
            Err(cancelled @ ExtensionError::Cancelled { .. }) => return Err(cancelled),
            Err(e) => {
                return Err(ExtensionError::Pending {
                    key: key_ref.clone(),
                    reason: format!("could not be listed: {e}"),
                })
            }
        };

        let remaining: Vec<String> = objects
            .iter()
            .filter(|obj| predicate(obj))
            .map(ResourceExt::name_any)
            .collect();
        if remaining.is_empty() {
            Ok(())
        } else {
            Err(ExtensionError::Pending {
                key: key_ref.clone(),
                reason: format!("still present: {}", remaining.join(", ")),
            })
        }
    })
    .await;

    record_outcome(&key.kind, OP_WAIT_CLEANUP, &result);
    result
}

#[cfg(test)]
#[path = "delete_tests.rs"]
mod delete_tests;
