// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The Kubernetes API surface the lifecycle protocol depends on.
//!
//! The protocol only needs a handful of verbs on namespaced objects: get by key, create,
//! JSON merge patch (main resource and status subresource), delete and list with a label
//! selector. [`ResourceClient`] captures exactly that, which lets components run against
//! a real `kube::Client` in production and an in-memory fake in unit tests.
//!
//! # Example
//!
//! ```rust,no_run
//! use extension_lifecycle::client::ResourceClient;
//! use extension_lifecycle::crd::Extension;
//! use kube::Client;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = Client::try_default().await?;
//! let ext: Option<Extension> = client.get("shoot--dev--demo", "shoot-dns-service").await?;
//! # Ok(())
//! # }
//! ```

use kube::api::{DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// Bounds shared by every object handled through a [`ResourceClient`].
pub trait NamespacedObject:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<T> NamespacedObject for T where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// Namespaced CRUD operations used by the lifecycle protocol.
///
/// All methods return the raw `kube::Error`; callers decide which errors are benign.
#[async_trait::async_trait]
pub trait ResourceClient: Send + Sync {
    /// Get an object, returning `None` when it does not exist.
    async fn get<K: NamespacedObject>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<K>, kube::Error>;

    /// Create an object.
    async fn create<K: NamespacedObject>(&self, namespace: &str, obj: &K)
        -> Result<K, kube::Error>;

    /// Apply a JSON merge patch (RFC 7386) to the main resource.
    async fn patch<K: NamespacedObject>(
        &self,
        namespace: &str,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<K, kube::Error>;

    /// Apply a JSON merge patch to the status subresource.
    async fn patch_status<K: NamespacedObject>(
        &self,
        namespace: &str,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<K, kube::Error>;

    /// Delete an object. A missing object is reported as HTTP 404.
    async fn delete<K: NamespacedObject>(&self, namespace: &str, name: &str)
        -> Result<(), kube::Error>;

    /// List objects in a namespace, optionally filtered by a label selector.
    async fn list<K: NamespacedObject>(
        &self,
        namespace: &str,
        label_selector: Option<&str>,
    ) -> Result<Vec<K>, kube::Error>;
}

#[async_trait::async_trait]
impl ResourceClient for Client {
    async fn get<K: NamespacedObject>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<K>, kube::Error> {
        let api: Api<K> = Api::namespaced(self.clone(), namespace);
        api.get_opt(name).await
    }

    async fn create<K: NamespacedObject>(
        &self,
        namespace: &str,
        obj: &K,
    ) -> Result<K, kube::Error> {
        let api: Api<K> = Api::namespaced(self.clone(), namespace);
        api.create(&PostParams::default(), obj).await
    }

    async fn patch<K: NamespacedObject>(
        &self,
        namespace: &str,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<K, kube::Error> {
        let api: Api<K> = Api::namespaced(self.clone(), namespace);
        api.patch(name, &PatchParams::default(), &Patch::Merge(patch))
            .await
    }

    async fn patch_status<K: NamespacedObject>(
        &self,
        namespace: &str,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<K, kube::Error> {
        let api: Api<K> = Api::namespaced(self.clone(), namespace);
        api.patch_status(name, &PatchParams::default(), &Patch::Merge(patch))
            .await
    }

    async fn delete<K: NamespacedObject>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<(), kube::Error> {
        let api: Api<K> = Api::namespaced(self.clone(), namespace);
        api.delete(name, &DeleteParams::default()).await.map(|_| ())
    }

    async fn list<K: NamespacedObject>(
        &self,
        namespace: &str,
        label_selector: Option<&str>,
    ) -> Result<Vec<K>, kube::Error> {
        let api: Api<K> = Api::namespaced(self.clone(), namespace);
        let mut params = ListParams::default();
        if let Some(selector) = label_selector {
            params = params.labels(selector);
        }
        Ok(api.list(&params).await?.items)
    }
}
