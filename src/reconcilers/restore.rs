// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Migration and restoration of extension resources.
//!
//! During a control plane migration the source side asks every extension controller to
//! migrate (persist its state and release the resource). On the destination side each
//! resource is restored in three steps:
//!
//! 1. Deploy it with operation `wait-for-state`, so the controller does not start working
//!    from an empty state
//! 2. Write the saved state into `status.state` through the status subresource
//! 3. Switch the operation annotation to `restore`
//!
//! Resources without saved state are simply deployed.

use crate::annotations::{self, Operation};
use crate::client::{NamespacedObject, ResourceClient};
use crate::context::Context;
use crate::crd::ShootStateSpec;
use crate::errors::{ExtensionError, ResourceKey};
use crate::extension_object::ExtensionObject;
use crate::reconcilers::deploy::{deploy, DeployOptions, ReconcileMode};
use crate::reconcilers::resources::merge_patch_from;
use crate::reconcilers::{record_outcome, OP_MIGRATE, OP_RESTORE};
use serde_json::json;
use tracing::{debug, info};

/// Restore `namespace/name` from the state saved in `shoot_state`.
///
/// Without saved state this is a [`deploy`] with a `reconcile` operation and the given
/// `mode`. Returns the object as last written; its timestamp annotation is the one the
/// waiter must see observed.
///
/// # Errors
///
/// Returns API errors of any of the three writes, or [`ExtensionError::Cancelled`].
pub async fn restore<C, K>(
    ctx: &Context<C>,
    namespace: &str,
    name: &str,
    desired: &K::Spec,
    shoot_state: &ShootStateSpec,
    mode: ReconcileMode,
) -> Result<K, ExtensionError>
where
    C: ResourceClient,
    K: ExtensionObject,
{
    let key = ResourceKey::new(K::kind(&()), namespace, name);

    let saved = shoot_state
        .find(&key.kind, name)
        .and_then(|entry| entry.state.clone());
    let Some(state) = saved else {
        debug!(
            kind = %key.kind,
            namespace = %key.namespace,
            name = %key.name,
            "No saved state, deploying instead of restoring"
        );
        let options = DeployOptions::new(Operation::Reconcile, mode);
        return deploy(ctx, namespace, name, desired, options).await;
    };

    let result = restore_from_state::<C, K>(ctx, &key, desired, state).await;
    record_outcome(&key.kind, OP_RESTORE, &result);
    result
}

async fn restore_from_state<C, K>(
    ctx: &Context<C>,
    key: &ResourceKey,
    desired: &K::Spec,
    state: serde_json::Value,
) -> Result<K, ExtensionError>
where
    C: ResourceClient,
    K: ExtensionObject,
{
    deploy::<C, K>(
        ctx,
        &key.namespace,
        &key.name,
        desired,
        DeployOptions::new(Operation::WaitForState, ReconcileMode::AlwaysAnnotate),
    )
    .await?;

    let patch = json!({ "status": { "state": state } });
    let with_state: K = ctx
        .guard(
            key,
            OP_RESTORE,
            ctx.client.patch_status::<K>(&key.namespace, &key.name, &patch),
        )
        .await?;
    debug!(
        kind = %key.kind,
        namespace = %key.namespace,
        name = %key.name,
        "Injected saved state"
    );

    let mut restoring = with_state.clone();
    let timestamp = annotations::mark_restore(&mut restoring, ctx.now());
    let restored = merge_patch_from(ctx, key, &with_state, &restoring).await?;

    info!(
        kind = %key.kind,
        namespace = %key.namespace,
        name = %key.name,
        timestamp = %timestamp,
        "Requested restore of extension resource"
    );
    Ok(restored)
}

/// Ask the controller to migrate `namespace/name`.
///
/// A resource that does not exist has nothing to migrate.
///
/// # Errors
///
/// Returns API errors other than not-found, or [`ExtensionError::Cancelled`].
pub async fn migrate<C, K>(ctx: &Context<C>, namespace: &str, name: &str) -> Result<(), ExtensionError>
where
    C: ResourceClient,
    K: NamespacedObject,
{
    let key = ResourceKey::new(K::kind(&()), namespace, name);
    let result = migrate_object::<C, K>(ctx, &key).await;
    record_outcome(&key.kind, OP_MIGRATE, &result);
    result
}

async fn migrate_object<C, K>(ctx: &Context<C>, key: &ResourceKey) -> Result<(), ExtensionError>
where
    C: ResourceClient,
    K: NamespacedObject,
{
    let Some(current) = ctx
        .guard(key, OP_MIGRATE, ctx.client.get::<K>(&key.namespace, &key.name))
        .await?
    else {
        debug!(
            kind = %key.kind,
            namespace = %key.namespace,
            name = %key.name,
            "Not found, nothing to migrate"
        );
        return Ok(());
    };

    let mut migrating = current.clone();
    let timestamp = annotations::mark_migrate(&mut migrating, ctx.now());
    match merge_patch_from(ctx, key, &current, &migrating).await {
        Ok(_) => {
            info!(
                kind = %key.kind,
                namespace = %key.namespace,
                name = %key.name,
                timestamp = %timestamp,
                "Requested migration of extension resource"
            );
            Ok(())
        }
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
#[path = "restore_tests.rs"]
mod restore_tests;
