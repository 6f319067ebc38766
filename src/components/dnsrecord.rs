// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `DNSRecord` component.
//!
//! Manages one `DNSRecord` together with the secret holding the provider credentials.
//! The secret is written before the record on every deploy and restore, and before a
//! destroy of an existing record, so the DNS extension always finds valid credentials,
//! including while it deletes the record. Destroying an absent record touches nothing.
//!
//! # Example
//!
//! ```rust,no_run
//! use extension_lifecycle::components::{DeployWaiter, DnsRecordComponent, DnsRecordValues};
//! use extension_lifecycle::context::Context;
//! use extension_lifecycle::crd::DNSRecordType;
//!
//! async fn reconcile_api_record(client: kube::Client) -> anyhow::Result<()> {
//!     let values = DnsRecordValues::new(
//!         "external",
//!         "shoot--dev--demo",
//!         "aws-route53",
//!         "api.demo.example.com",
//!         DNSRecordType::A,
//!     );
//!     let mut record = DnsRecordComponent::new(Context::new(client), values);
//!     record.set_values(vec!["1.2.3.4".to_string()]);
//!     record.deploy().await?;
//!     record.wait().await?;
//!     Ok(())
//! }
//! ```

use crate::components::{DeployMigrateWaiter, DeployWaiter};
use crate::client::ResourceClient;
use crate::config::WaitConfig;
use crate::constants::{DEFAULT_DNS_RECORD_TTL_SECS, DNS_RECORD_SECRET_PREFIX, KIND_DNS_RECORD};
use crate::context::Context;
use crate::crd::{DNSRecord, DNSRecordSpec, DNSRecordType, ShootStateSpec};
use crate::errors::{ExtensionError, ResourceKey};
use crate::extension_object::ExtensionObject;
use crate::labels::{
    GARDENER_PURPOSE_LABEL, K8S_MANAGED_BY, MANAGED_BY_EXTENSION_LIFECYCLE,
    PURPOSE_DNS_RECORD_CREDENTIALS,
};
use crate::reconcilers::resources::create_or_merge_patch;
use crate::reconcilers::{
    deploy, destroy, migrate, restore, wait_until_deleted, wait_until_migrated,
    wait_until_ready, DeployOptions, OP_DESTROY, RECONCILE_OPERATION_TYPES,
};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Secret, SecretReference};
use k8s_openapi::ByteString;
use std::collections::BTreeMap;
use tracing::debug;

/// Desired state of a [`DnsRecordComponent`].
#[derive(Clone, Debug, PartialEq)]
pub struct DnsRecordValues {
    /// Name of the `DNSRecord`
    pub name: String,
    pub namespace: String,
    /// Provider type, e.g. `aws-route53`
    pub provider_type: String,
    pub provider_config: Option<serde_json::Value>,
    /// Credentials secret name; defaults to `dnsrecord-<name>`
    pub secret_name: Option<String>,
    pub secret_data: BTreeMap<String, Vec<u8>>,
    pub region: Option<String>,
    pub zone: Option<String>,
    /// Fully qualified domain name of the record
    pub dns_name: String,
    pub record_type: DNSRecordType,
    pub values: Vec<String>,
    pub ttl: Option<i64>,
    /// Request an operation on every deploy
    pub annotate_operation: bool,
    /// Only request an operation when the spec changed or the last operation failed
    pub reconcile_only_on_change_or_error: bool,
    pub wait_config: WaitConfig,
}

impl DnsRecordValues {
    /// Values with no record values, no credentials and default timing.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        provider_type: impl Into<String>,
        dns_name: impl Into<String>,
        record_type: DNSRecordType,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            provider_type: provider_type.into(),
            provider_config: None,
            secret_name: None,
            secret_data: BTreeMap::new(),
            region: None,
            zone: None,
            dns_name: dns_name.into(),
            record_type,
            values: Vec::new(),
            ttl: None,
            annotate_operation: false,
            reconcile_only_on_change_or_error: false,
            wait_config: WaitConfig::default(),
        }
    }

    /// Name of the credentials secret.
    #[must_use]
    pub fn secret_name(&self) -> String {
        self.secret_name
            .clone()
            .unwrap_or_else(|| format!("{DNS_RECORD_SECRET_PREFIX}{}", self.name))
    }

    /// The `DNSRecord` spec these values describe.
    #[must_use]
    pub fn spec(&self) -> DNSRecordSpec {
        DNSRecordSpec {
            r#type: self.provider_type.clone(),
            provider_config: self.provider_config.clone(),
            secret_ref: SecretReference {
                name: Some(self.secret_name()),
                namespace: Some(self.namespace.clone()),
            },
            region: self.region.clone(),
            zone: self.zone.clone(),
            name: self.dns_name.clone(),
            record_type: self.record_type,
            values: self.values.clone(),
            ttl: Some(self.ttl.unwrap_or(DEFAULT_DNS_RECORD_TTL_SECS)),
        }
    }

    fn deploy_options(&self) -> DeployOptions {
        DeployOptions::from_flags(self.annotate_operation, self.reconcile_only_on_change_or_error)
    }
}

/// A single `DNSRecord` and its credentials secret.
pub struct DnsRecordComponent<C> {
    ctx: Context<C>,
    values: DnsRecordValues,
    /// The record as last written by deploy or restore
    record: Option<DNSRecord>,
}

impl<C: ResourceClient> DnsRecordComponent<C> {
    #[must_use]
    pub fn new(ctx: Context<C>, values: DnsRecordValues) -> Self {
        Self {
            ctx,
            values,
            record: None,
        }
    }

    #[must_use]
    pub fn values(&self) -> &DnsRecordValues {
        &self.values
    }

    /// Change the record type used by the next deploy.
    pub fn set_record_type(&mut self, record_type: DNSRecordType) {
        self.values.record_type = record_type;
    }

    /// Change the record values used by the next deploy.
    pub fn set_values(&mut self, values: Vec<String>) {
        self.values.values = values;
    }

    /// The record last written by this component, if any.
    #[must_use]
    pub fn record(&self) -> Option<&DNSRecord> {
        self.record.as_ref()
    }

    async fn deploy_secret(&self) -> Result<Secret, ExtensionError> {
        let data: BTreeMap<String, ByteString> = self
            .values
            .secret_data
            .iter()
            .map(|(k, v)| (k.clone(), ByteString(v.clone())))
            .collect();

        let (secret, result) = create_or_merge_patch::<C, Secret>(
            &self.ctx,
            &self.values.namespace,
            &self.values.secret_name(),
            move |secret| {
                let labels = secret.metadata.labels.get_or_insert_with(BTreeMap::new);
                labels.insert(
                    GARDENER_PURPOSE_LABEL.to_string(),
                    PURPOSE_DNS_RECORD_CREDENTIALS.to_string(),
                );
                labels.insert(
                    K8S_MANAGED_BY.to_string(),
                    MANAGED_BY_EXTENSION_LIFECYCLE.to_string(),
                );
                secret.type_ = Some("Opaque".to_string());
                secret.data = Some(data);
            },
        )
        .await?;

        debug!(
            namespace = %self.values.namespace,
            name = %self.values.name,
            result = ?result,
            "Synced DNSRecord credentials secret"
        );
        Ok(secret)
    }

    /// The object to wait on: the last written record, or a bare one when this component
    /// did not write it, in which case no particular timestamp is expected.
    fn waitable(&self) -> DNSRecord {
        self.record.clone().unwrap_or_else(|| {
            DNSRecord::build(&self.values.name, &self.values.namespace, self.values.spec())
        })
    }
}

#[async_trait]
impl<C: ResourceClient> DeployWaiter for DnsRecordComponent<C> {
    async fn deploy(&mut self) -> Result<(), ExtensionError> {
        self.deploy_secret().await?;
        let record = deploy::<C, DNSRecord>(
            &self.ctx,
            &self.values.namespace,
            &self.values.name,
            &self.values.spec(),
            self.values.deploy_options(),
        )
        .await?;
        self.record = Some(record);
        Ok(())
    }

    async fn destroy(&self) -> Result<(), ExtensionError> {
        let namespace = self.values.namespace.as_str();
        let name = self.values.name.as_str();
        let key = ResourceKey::new(KIND_DNS_RECORD, namespace, name);
        let existing = self
            .ctx
            .guard(&key, OP_DESTROY, self.ctx.client.get::<DNSRecord>(namespace, name))
            .await?;
        if existing.is_none() {
            debug!(namespace = %namespace, name = %name, "DNSRecord already absent");
            return Ok(());
        }

        self.deploy_secret().await?;
        destroy::<C, DNSRecord>(&self.ctx, &self.values.namespace, &self.values.name).await
    }

    async fn wait(&self) -> Result<(), ExtensionError> {
        wait_until_ready(
            &self.ctx,
            &self.waitable(),
            &self.values.wait_config,
            RECONCILE_OPERATION_TYPES,
        )
        .await
        .map(|_| ())
    }

    async fn wait_cleanup(&self) -> Result<(), ExtensionError> {
        wait_until_deleted::<C, DNSRecord>(
            &self.ctx,
            &self.values.namespace,
            &self.values.name,
            &self.values.wait_config,
        )
        .await
    }
}

#[async_trait]
impl<C: ResourceClient> DeployMigrateWaiter for DnsRecordComponent<C> {
    async fn restore(&mut self, shoot_state: &ShootStateSpec) -> Result<(), ExtensionError> {
        self.deploy_secret().await?;
        let record = restore::<C, DNSRecord>(
            &self.ctx,
            &self.values.namespace,
            &self.values.name,
            &self.values.spec(),
            shoot_state,
            self.values.deploy_options().mode,
        )
        .await?;
        self.record = Some(record);
        Ok(())
    }

    async fn migrate(&self) -> Result<(), ExtensionError> {
        migrate::<C, DNSRecord>(&self.ctx, &self.values.namespace, &self.values.name).await
    }

    async fn wait_migrate(&self) -> Result<(), ExtensionError> {
        wait_until_migrated::<C, DNSRecord>(
            &self.ctx,
            &self.values.namespace,
            &self.values.name,
            &self.values.wait_config,
        )
        .await
    }
}

#[cfg(test)]
#[path = "dnsrecord_tests.rs"]
mod dnsrecord_tests;
