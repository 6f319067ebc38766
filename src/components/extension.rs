// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `Extension` component.
//!
//! Manages a set of generic `Extension` resources keyed by extension type. Each resource is
//! named after its type. Every entry declares, per lifecycle step, whether it is handled
//! before the kube-apiserver is up, after it, or in both phases:
//!
//! | Step      | Default phase | Operations                                 |
//! |-----------|---------------|--------------------------------------------|
//! | reconcile | after         | `deploy`, `wait`, `restore`                |
//! | delete    | before        | `destroy`, `wait_cleanup`                  |
//! | migrate   | before        | `migrate`, `wait_migrate`                  |
//!
//! Resources are created late and removed early. Entries of one phase are handled
//! concurrently. Deploy, restore, migrate, destroy and their cleanup waits run every entry
//! and report all failures together; `wait` reports the first failure.
//!
//! Extensions that are no longer wanted are removed by [`ExtensionComponent::delete_stale_resources`].

use crate::annotations::Operation;
use crate::client::ResourceClient;
use crate::config::WaitConfig;
use crate::constants::{DEFAULT_MAX_PARALLELISM, KIND_EXTENSION};
use crate::context::Context;
use crate::crd::{Extension, ExtensionSpec, ShootStateSpec};
use crate::errors::ExtensionError;
use crate::extension_object::ExtensionObject;
use crate::reconcilers::deploy::ReconcileMode;
use crate::reconcilers::fanout::{run_all, run_fail_fast};
use crate::reconcilers::{
    delete_matching, deploy, destroy, migrate, restore, wait_until_deleted,
    wait_until_matching_deleted, wait_until_migrated, wait_until_ready, DeployOptions, OP_DEPLOY,
    OP_DESTROY, OP_MIGRATE, OP_RESTORE, OP_WAIT, OP_WAIT_CLEANUP, OP_WAIT_MIGRATE,
    RECONCILE_OPERATION_TYPES,
};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;
use tracing::info;

/// When, relative to the kube-apiserver, an entry is handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecyclePhase {
    Before,
    After,
    BeforeAndAfter,
}

impl LifecyclePhase {
    /// Whether an entry with this lifecycle phase is handled in `phase`.
    #[must_use]
    pub fn includes(self, phase: Phase) -> bool {
        matches!(
            (self, phase),
            (Self::BeforeAndAfter, _)
                | (Self::Before, Phase::BeforeKubeApiServer)
                | (Self::After, Phase::AfterKubeApiServer)
        )
    }
}

/// Lifecycle phases of one entry, per step. Unset steps use their default phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Lifecycle {
    pub reconcile: Option<LifecyclePhase>,
    pub delete: Option<LifecyclePhase>,
    pub migrate: Option<LifecyclePhase>,
}

/// The two phases a caller drives the component through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    BeforeKubeApiServer,
    AfterKubeApiServer,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BeforeKubeApiServer => "before kube-apiserver",
            Self::AfterKubeApiServer => "after kube-apiserver",
        })
    }
}

#[derive(Clone, Copy)]
enum Step {
    Reconcile,
    Delete,
    Migrate,
}

/// Desired state of one extension.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtensionEntry {
    pub spec: ExtensionSpec,
    /// Overrides the component's wait timeout for this extension
    pub timeout: Option<Duration>,
    pub lifecycle: Option<Lifecycle>,
}

impl ExtensionEntry {
    /// An entry for `spec` with default timeout and lifecycle.
    #[must_use]
    pub fn new(spec: ExtensionSpec) -> Self {
        Self {
            spec,
            timeout: None,
            lifecycle: None,
        }
    }

    fn phase(&self, step: Step) -> LifecyclePhase {
        let lifecycle = self.lifecycle.unwrap_or_default();
        match step {
            Step::Reconcile => lifecycle.reconcile.unwrap_or(LifecyclePhase::After),
            Step::Delete => lifecycle.delete.unwrap_or(LifecyclePhase::Before),
            Step::Migrate => lifecycle.migrate.unwrap_or(LifecyclePhase::Before),
        }
    }
}

/// Desired state of an [`ExtensionComponent`].
#[derive(Clone, Debug, PartialEq)]
pub struct ExtensionValues {
    pub namespace: String,
    /// Wanted extensions keyed by type
    pub extensions: BTreeMap<String, ExtensionEntry>,
    pub wait_config: WaitConfig,
    /// Upper bound on concurrently handled extensions
    pub max_parallelism: usize,
}

impl ExtensionValues {
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            extensions: BTreeMap::new(),
            wait_config: WaitConfig::default(),
            max_parallelism: DEFAULT_MAX_PARALLELISM,
        }
    }

    /// Add an extension of `spec.type` with default timeout and lifecycle.
    #[must_use]
    pub fn with_extension(mut self, spec: ExtensionSpec) -> Self {
        self.extensions
            .insert(spec.r#type.clone(), ExtensionEntry::new(spec));
        self
    }
}

/// A type-keyed set of `Extension` resources.
pub struct ExtensionComponent<C> {
    ctx: Context<C>,
    values: ExtensionValues,
    /// Extensions as last written by deploy or restore, keyed by type
    deployed: BTreeMap<String, Extension>,
}

impl<C: ResourceClient> ExtensionComponent<C> {
    #[must_use]
    pub fn new(ctx: Context<C>, values: ExtensionValues) -> Self {
        Self {
            ctx,
            values,
            deployed: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn values(&self) -> &ExtensionValues {
        &self.values
    }

    /// The extension of `extension_type` as last written by this component.
    #[must_use]
    pub fn deployed(&self, extension_type: &str) -> Option<&Extension> {
        self.deployed.get(extension_type)
    }

    /// The wanted extension types.
    #[must_use]
    pub fn wanted_types(&self) -> BTreeSet<String> {
        self.values.extensions.keys().cloned().collect()
    }

    fn entries(&self, step: Step, phase: Phase) -> Vec<(&String, &ExtensionEntry)> {
        self.values
            .extensions
            .iter()
            .filter(|(_, entry)| entry.phase(step).includes(phase))
            .collect()
    }

    fn wait_config(&self, entry: &ExtensionEntry) -> WaitConfig {
        match entry.timeout {
            Some(timeout) => self.values.wait_config.with_timeout(timeout),
            None => self.values.wait_config,
        }
    }

    /// Deploy every extension reconciled in `phase`.
    ///
    /// Extensions are always annotated with `reconcile`.
    ///
    /// # Errors
    ///
    /// Returns an [`ExtensionError::Aggregate`] of every failed deploy.
    pub async fn deploy(&mut self, phase: Phase) -> Result<(), ExtensionError> {
        let ctx = &self.ctx;
        let namespace = self.values.namespace.as_str();
        let entries = self.entries(Step::Reconcile, phase);
        info!(
            namespace = namespace,
            phase = %phase,
            count = entries.len(),
            "Deploying extensions"
        );

        let deployed = run_all(
            KIND_EXTENSION,
            OP_DEPLOY,
            self.values.max_parallelism,
            entries.into_iter().map(|(extension_type, entry)| async move {
                let extension = deploy::<C, Extension>(
                    ctx,
                    namespace,
                    extension_type,
                    &entry.spec,
                    DeployOptions::new(Operation::Reconcile, ReconcileMode::AlwaysAnnotate),
                )
                .await?;
                Ok::<_, ExtensionError>((extension_type.clone(), extension))
            }),
        )
        .await?;
        self.deployed.extend(deployed);
        Ok(())
    }

    /// Restore every extension reconciled in `phase` from `shoot_state`.
    ///
    /// # Errors
    ///
    /// Returns an [`ExtensionError::Aggregate`] of every failed restore.
    pub async fn restore(
        &mut self,
        phase: Phase,
        shoot_state: &ShootStateSpec,
    ) -> Result<(), ExtensionError> {
        let ctx = &self.ctx;
        let namespace = self.values.namespace.as_str();

        let restored = run_all(
            KIND_EXTENSION,
            OP_RESTORE,
            self.values.max_parallelism,
            self.entries(Step::Reconcile, phase)
                .into_iter()
                .map(|(extension_type, entry)| async move {
                    let extension = restore::<C, Extension>(
                        ctx,
                        namespace,
                        extension_type,
                        &entry.spec,
                        shoot_state,
                        ReconcileMode::AlwaysAnnotate,
                    )
                    .await?;
                    Ok::<_, ExtensionError>((extension_type.clone(), extension))
                }),
        )
        .await?;
        self.deployed.extend(restored);
        Ok(())
    }

    /// Wait until every extension reconciled in `phase` is ready.
    ///
    /// # Errors
    ///
    /// Returns the first failure.
    pub async fn wait(&self, phase: Phase) -> Result<(), ExtensionError> {
        let ctx = &self.ctx;
        let namespace = self.values.namespace.as_str();

        run_fail_fast(
            KIND_EXTENSION,
            OP_WAIT,
            self.values.max_parallelism,
            self.entries(Step::Reconcile, phase)
                .into_iter()
                .map(|(extension_type, entry)| {
                    let target = self.deployed.get(extension_type).cloned().unwrap_or_else(|| {
                        Extension::build(extension_type, namespace, entry.spec.clone())
                    });
                    let config = self.wait_config(entry);
                    async move {
                        wait_until_ready(ctx, &target, &config, RECONCILE_OPERATION_TYPES)
                            .await
                            .map(|_| ())
                    }
                }),
        )
        .await
        .map(|_| ())
    }

    /// Destroy every extension deleted in `phase`.
    ///
    /// # Errors
    ///
    /// Returns an [`ExtensionError::Aggregate`] of every failed deletion.
    pub async fn destroy(&self, phase: Phase) -> Result<(), ExtensionError> {
        let ctx = &self.ctx;
        let namespace = self.values.namespace.as_str();

        run_all(
            KIND_EXTENSION,
            OP_DESTROY,
            self.values.max_parallelism,
            self.entries(Step::Delete, phase)
                .into_iter()
                .map(|(extension_type, _)| destroy::<C, Extension>(ctx, namespace, extension_type)),
        )
        .await
        .map(|_| ())
    }

    /// Wait until every extension deleted in `phase` is gone.
    ///
    /// # Errors
    ///
    /// Returns an [`ExtensionError::Aggregate`] of every extension still present.
    pub async fn wait_cleanup(&self, phase: Phase) -> Result<(), ExtensionError> {
        let ctx = &self.ctx;
        let namespace = self.values.namespace.as_str();

        run_all(
            KIND_EXTENSION,
            OP_WAIT_CLEANUP,
            self.values.max_parallelism,
            self.entries(Step::Delete, phase)
                .into_iter()
                .map(|(extension_type, entry)| {
                    let config = self.wait_config(entry);
                    async move {
                        wait_until_deleted::<C, Extension>(ctx, namespace, extension_type, &config)
                            .await
                    }
                }),
        )
        .await
        .map(|_| ())
    }

    /// Migrate every extension migrated in `phase`.
    ///
    /// # Errors
    ///
    /// Returns an [`ExtensionError::Aggregate`] of every failed migration request.
    pub async fn migrate(&self, phase: Phase) -> Result<(), ExtensionError> {
        let ctx = &self.ctx;
        let namespace = self.values.namespace.as_str();

        run_all(
            KIND_EXTENSION,
            OP_MIGRATE,
            self.values.max_parallelism,
            self.entries(Step::Migrate, phase)
                .into_iter()
                .map(|(extension_type, _)| migrate::<C, Extension>(ctx, namespace, extension_type)),
        )
        .await
        .map(|_| ())
    }

    /// Wait until every extension migrated in `phase` reports a successful migration.
    ///
    /// # Errors
    ///
    /// Returns an [`ExtensionError::Aggregate`] of every extension not migrated.
    pub async fn wait_migrate(&self, phase: Phase) -> Result<(), ExtensionError> {
        let ctx = &self.ctx;
        let namespace = self.values.namespace.as_str();

        run_all(
            KIND_EXTENSION,
            OP_WAIT_MIGRATE,
            self.values.max_parallelism,
            self.entries(Step::Migrate, phase)
                .into_iter()
                .map(|(extension_type, entry)| {
                    let config = self.wait_config(entry);
                    async move {
                        wait_until_migrated::<C, Extension>(ctx, namespace, extension_type, &config)
                            .await
                    }
                }),
        )
        .await
        .map(|_| ())
    }

    /// Delete every extension in the namespace whose type is not wanted.
    ///
    /// # Errors
    ///
    /// Returns the list error, or an [`ExtensionError::Aggregate`] of every failed deletion.
    pub async fn delete_stale_resources(&self) -> Result<(), ExtensionError> {
        let wanted = self.wanted_types();
        let deleted = delete_matching::<C, Extension, _>(
            &self.ctx,
            &self.values.namespace,
            self.values.max_parallelism,
            |extension| !wanted.contains(extension.extension_type()),
        )
        .await?;

        if !deleted.is_empty() {
            info!(
                namespace = %self.values.namespace,
                deleted = ?deleted,
                "Deleted stale extensions"
            );
        }
        Ok(())
    }

    /// Wait until no extension of an unwanted type is left in the namespace.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::Timeout`] naming the remaining extensions.
    pub async fn wait_cleanup_stale_resources(&self) -> Result<(), ExtensionError> {
        let wanted = self.wanted_types();
        wait_until_matching_deleted::<C, Extension, _>(
            &self.ctx,
            &self.values.namespace,
            &self.values.wait_config,
            |extension| !wanted.contains(extension.extension_type()),
        )
        .await
    }
}

#[cfg(test)]
#[path = "extension_tests.rs"]
mod extension_tests;
