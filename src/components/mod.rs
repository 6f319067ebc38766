// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Components built on the lifecycle protocol.
//!
//! A component owns the desired values of one or more extension resources and exposes the
//! uniform Deploy / Wait / Destroy / WaitCleanup lifecycle, plus Migrate / WaitMigrate /
//! Restore for resources that move with a control plane migration.
//!
//! - [`dnsrecord`] - A single `DNSRecord` and its credentials secret
//! - [`extension`] - A type-keyed set of `Extension` resources, fanned out by phase

pub mod dnsrecord;
pub mod extension;

pub use dnsrecord::{DnsRecordComponent, DnsRecordValues};
pub use extension::{
    ExtensionComponent, ExtensionEntry, ExtensionValues, Lifecycle, LifecyclePhase, Phase,
};

use crate::crd::ShootStateSpec;
use crate::errors::ExtensionError;
use async_trait::async_trait;

/// A component that can be deployed, destroyed and waited for.
#[async_trait]
pub trait DeployWaiter: Send + Sync {
    /// Create or update the component's resources.
    async fn deploy(&mut self) -> Result<(), ExtensionError>;

    /// Delete the component's resources.
    async fn destroy(&self) -> Result<(), ExtensionError>;

    /// Wait until the last deploy has been completed by the controller.
    async fn wait(&self) -> Result<(), ExtensionError>;

    /// Wait until the resources removed by [`destroy`](Self::destroy) are gone.
    async fn wait_cleanup(&self) -> Result<(), ExtensionError>;
}

/// A [`DeployWaiter`] whose resources can be migrated and restored.
#[async_trait]
pub trait DeployMigrateWaiter: DeployWaiter {
    /// Restore the resources from the state saved in `shoot_state`.
    async fn restore(&mut self, shoot_state: &ShootStateSpec) -> Result<(), ExtensionError>;

    /// Ask the controllers to migrate the resources.
    async fn migrate(&self) -> Result<(), ExtensionError>;

    /// Wait until every resource reports a successful migration.
    async fn wait_migrate(&self) -> Result<(), ExtensionError>;
}
