// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Generic create and merge-patch helpers for namespaced resources.
//!
//! Existing objects are never replaced wholesale. The caller mutates a copy of the object
//! it observed, and only the JSON merge patch between the two is sent, so fields owned by
//! other writers survive.
//!
//! # Example
//!
//! ```rust,no_run
//! use extension_lifecycle::context::Context;
//! use extension_lifecycle::reconcilers::resources::create_or_merge_patch;
//! use k8s_openapi::api::core::v1::Secret;
//! use kube::Client;
//!
//! async fn example(ctx: &Context<Client>) -> Result<(), extension_lifecycle::errors::ExtensionError> {
//!     let (secret, result) = create_or_merge_patch::<_, Secret>(ctx, "shoot--dev--demo", "dnsrecord-external", |secret| {
//!         secret.type_ = Some("Opaque".to_string());
//!     })
//!     .await?;
//!     println!("{result:?}: {:?}", secret.metadata.name);
//!     Ok(())
//! }
//! ```

use crate::client::{NamespacedObject, ResourceClient};
use crate::context::Context;
use crate::errors::{ExtensionError, ResourceKey};
use crate::reconcilers::merge_patch::{create_merge_patch, is_empty_patch};
use kube::Resource;
use tracing::{debug, info};

/// What [`create_or_merge_patch`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationResult {
    Created,
    Updated,
    Unchanged,
}

pub(crate) fn to_json<K: NamespacedObject>(obj: &K) -> Result<serde_json::Value, ExtensionError> {
    serde_json::to_value(obj).map_err(|source| ExtensionError::Serialization {
        kind: K::kind(&()).to_string(),
        source,
    })
}

/// Send the merge patch between `current` and `modified`.
///
/// Returns `current` unchanged without an API call when the patch is empty.
///
/// # Errors
///
/// Returns an error if either object cannot be serialized, the API call fails, or the
/// context is cancelled.
pub async fn merge_patch_from<C, K>(
    ctx: &Context<C>,
    key: &ResourceKey,
    current: &K,
    modified: &K,
) -> Result<K, ExtensionError>
where
    C: ResourceClient,
    K: NamespacedObject,
{
    let patch = create_merge_patch(&to_json(current)?, &to_json(modified)?);
    if is_empty_patch(&patch) {
        debug!(
            kind = %key.kind,
            namespace = %key.namespace,
            name = %key.name,
            "Nothing to patch"
        );
        return Ok(current.clone());
    }

    debug!(
        kind = %key.kind,
        namespace = %key.namespace,
        name = %key.name,
        patch = %patch,
        "Sending merge patch"
    );
    ctx.guard(
        key,
        "patch",
        ctx.client.patch::<K>(&key.namespace, &key.name, &patch),
    )
    .await
}

/// Create the object if it does not exist, otherwise merge-patch it.
///
/// `mutate` is applied to the observed object (or to a fresh default object with name and
/// namespace set) and the result is written.
///
/// # Errors
///
/// Returns an error if the API calls fail, serialization fails, or the context is
/// cancelled.
pub async fn create_or_merge_patch<C, K>(
    ctx: &Context<C>,
    namespace: &str,
    name: &str,
    mutate: impl FnOnce(&mut K),
) -> Result<(K, OperationResult), ExtensionError>
where
    C: ResourceClient,
    K: NamespacedObject + Default,
{
    let key = ResourceKey::new(K::kind(&()), namespace, name);

    let existing = ctx
        .guard(&key, "get", ctx.client.get::<K>(namespace, name))
        .await?;

    match existing {
        Some(current) => {
            let mut modified = current.clone();
            mutate(&mut modified);
            let patched = merge_patch_from(ctx, &key, &current, &modified).await?;
            let result = if patched.meta().resource_version == current.meta().resource_version {
                OperationResult::Unchanged
            } else {
                info!("Updated {key}");
                OperationResult::Updated
            };
            Ok((patched, result))
        }
        None => {
            let mut obj = K::default();
            obj.meta_mut().name = Some(name.to_string());
            obj.meta_mut().namespace = Some(namespace.to_string());
            mutate(&mut obj);
            let created = ctx
                .guard(&key, "create", ctx.client.create(namespace, &obj))
                .await?;
            info!("Created {key}");
            Ok((created, OperationResult::Created))
        }
    }
}

#[cfg(test)]
#[path = "resources_tests.rs"]
mod resources_tests;
