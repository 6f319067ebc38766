// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The extension resource lifecycle protocol.
//!
//! Every extension resource kind is driven through the same small state machine:
//!
//! 1. **Deploy** - create or merge-patch the resource, stamping the operation and
//!    timestamp annotations when the controller has to act
//! 2. **Wait** - poll until the controller has observed the latest request and reports
//!    `Succeeded`, failing early on severe errors
//! 3. **Destroy** - confirm the deletion, delete, then wait until the resource is gone
//! 4. **Migrate / Restore** - hand a resource over to another control plane and back
//!
//! # Available Operations
//!
//! ## Single resource
//!
//! - [`deploy`] - Create or patch one resource
//! - [`wait_until_ready`] - Wait for a `Succeeded` operation of the expected type on the
//!   latest request
//! - [`wait_until`] - Wait for a caller-supplied condition on one resource
//! - [`destroy`] / [`wait_until_deleted`] - Delete one resource
//! - [`migrate`] / [`wait_until_migrated`] - Migrate one resource
//! - [`restore`] - Restore one resource from a `ShootState`
//!
//! ## Many resources
//!
//! - [`delete_matching`] / [`wait_until_matching_deleted`] - Delete every listed resource
//!   matching a predicate
//! - [`run_all`] / [`run_fail_fast`] - Bounded concurrent fan-out with two join disciplines
//!
//! # Example: Deploy and wait
//!
//! ```rust,no_run
//! use extension_lifecycle::config::WaitConfig;
//! use extension_lifecycle::context::Context;
//! use extension_lifecycle::crd::{Extension, ExtensionSpec};
//! use extension_lifecycle::reconcilers::{
//!     deploy, wait_until_ready, DeployOptions, RECONCILE_OPERATION_TYPES,
//! };
//!
//! async fn deploy_extension(ctx: &Context<kube::Client>) -> anyhow::Result<()> {
//!     let spec = ExtensionSpec {
//!         r#type: "shoot-dns-service".to_string(),
//!         provider_config: None,
//!     };
//!     let deployed: Extension = deploy(
//!         ctx,
//!         "shoot--dev--demo",
//!         "shoot-dns-service",
//!         &spec,
//!         DeployOptions::default(),
//!     )
//!     .await?;
//!     wait_until_ready(ctx, &deployed, &WaitConfig::default(), RECONCILE_OPERATION_TYPES).await?;
//!     Ok(())
//! }
//! ```

pub mod delete;
pub mod deploy;
pub mod fanout;
pub mod merge_patch;
pub mod resources;
pub mod restore;
pub mod wait;

pub use delete::{delete_matching, destroy, wait_until_deleted, wait_until_matching_deleted};
pub use deploy::{annotation_reason, deploy, AnnotationReason, DeployOptions, ReconcileMode};
pub use fanout::{run_all, run_fail_fast};
pub use restore::{migrate, restore};
pub use wait::{
    check_ready, poll_until, wait_until, wait_until_migrated, wait_until_ready,
    RECONCILE_OPERATION_TYPES,
};

use crate::errors::ExtensionError;
use crate::metrics::{record_operation_failure, record_operation_success};

/// Operation labels used in logs, metrics and cancellation errors.
pub(crate) const OP_DEPLOY: &str = "deploy";
pub(crate) const OP_WAIT: &str = "wait";
pub(crate) const OP_DESTROY: &str = "destroy";
pub(crate) const OP_WAIT_CLEANUP: &str = "wait_cleanup";
pub(crate) const OP_MIGRATE: &str = "migrate";
pub(crate) const OP_WAIT_MIGRATE: &str = "wait_migrate";
pub(crate) const OP_RESTORE: &str = "restore";

/// Count the outcome of an operation.
pub(crate) fn record_outcome<T>(kind: &str, operation: &str, result: &Result<T, ExtensionError>) {
    match result {
        Ok(_) => record_operation_success(kind, operation),
        Err(ExtensionError::Timeout { .. }) => record_operation_failure(kind, operation, "timeout"),
        Err(ExtensionError::Cancelled { .. }) => {
            record_operation_failure(kind, operation, "cancelled");
        }
        Err(_) => record_operation_failure(kind, operation, "error"),
    }
}
