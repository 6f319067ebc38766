// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # extension-lifecycle - Gardener extension resource lifecycle for Kubernetes
//!
//! This library drives Gardener extension resources (`DNSRecord`, `Extension`, ...) through
//! their lifecycle from the controlling side: it writes the desired spec together with the
//! operation and timestamp annotations, then polls the resource's status until the
//! out-of-tree extension controller reports success.
//!
//! ## Overview
//!
//! - Deploy: create or merge-patch a resource and request an operation when needed
//! - Wait: poll `status.lastOperation` with a severe-error threshold and a timeout
//! - Destroy: confirm the deletion, delete and wait until the resource is gone
//! - Migrate / Restore: hand a resource over to another control plane and back
//! - Fan-out: apply the above to many resources concurrently, by lifecycle phase
//!
//! ## Modules
//!
//! - [`crd`] - Custom Resource Definition types for extension resources
//! - [`extension_object`] - The capability trait every extension kind implements
//! - [`annotations`] - The operation/timestamp annotation protocol
//! - [`reconcilers`] - Deploy, wait, delete, migrate and restore
//! - [`components`] - `DNSRecord` and `Extension` components built on the reconcilers
//! - [`context`] - Client, clock and cancellation shared by all operations
//! - [`client`] - The Kubernetes API seam
//!
//! ## Example
//!
//! ```rust,no_run
//! use extension_lifecycle::components::{ExtensionComponent, ExtensionValues, Phase};
//! use extension_lifecycle::context::Context;
//! use extension_lifecycle::crd::ExtensionSpec;
//!
//! async fn reconcile_extensions(client: kube::Client) -> anyhow::Result<()> {
//!     let values = ExtensionValues::new("shoot--dev--demo").with_extension(ExtensionSpec {
//!         r#type: "shoot-dns-service".to_string(),
//!         provider_config: None,
//!     });
//!     let mut extensions = ExtensionComponent::new(Context::new(client), values);
//!
//!     extensions.delete_stale_resources().await?;
//!     extensions.deploy(Phase::AfterKubeApiServer).await?;
//!     extensions.wait(Phase::AfterKubeApiServer).await?;
//!     extensions.wait_cleanup_stale_resources().await?;
//!     Ok(())
//! }
//! ```

pub mod annotations;
pub mod client;
pub mod clock;
pub mod components;
pub mod config;
pub mod constants;
pub mod context;
pub mod crd;
pub mod errors;
pub mod extension_object;
pub mod labels;
pub mod metrics;
pub mod reconcilers;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod testing;
