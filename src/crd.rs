// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions (CRDs) for extension resources.
//!
//! This module defines the extension resources driven by this library and the shared
//! status vocabulary every extension controller writes back.
//!
//! # Resource Types
//!
//! - [`DNSRecord`] - A DNS record provisioned by a provider-specific DNS extension
//! - [`Extension`] - A generic, type-keyed extension (e.g. `shoot-cert-service`)
//! - [`ShootState`] - Persisted extension state used to restore resources after migration
//!
//! # Status Model
//!
//! Every extension resource carries a [`DefaultStatus`]:
//!
//! - `lastOperation` - The most recent verb attempted and its state
//! - `lastError` - The last error reported by the extension controller, if any
//! - `state` - An opaque blob the controller needs to restore the resource elsewhere
//!
//! # Example: Creating a DNS record spec
//!
//! ```rust,no_run
//! use extension_lifecycle::crd::{DNSRecordSpec, DNSRecordType};
//! use k8s_openapi::api::core::v1::SecretReference;
//!
//! let spec = DNSRecordSpec {
//!     r#type: "aws-route53".to_string(),
//!     provider_config: None,
//!     secret_ref: SecretReference {
//!         name: Some("dnsrecord-external".to_string()),
//!         namespace: Some("shoot--dev--demo".to_string()),
//!     },
//!     region: None,
//!     zone: Some("Z1234".to_string()),
//!     name: "api.demo.example.com".to_string(),
//!     record_type: DNSRecordType::A,
//!     values: vec!["1.2.3.4".to_string()],
//!     ttl: Some(120),
//! };
//! ```

use k8s_openapi::api::core::v1::SecretReference;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The verb recorded in `status.lastOperation.type`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
pub enum LastOperationType {
    Create,
    Reconcile,
    Delete,
    Migrate,
    Restore,
}

impl fmt::Display for LastOperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Create => "Create",
            Self::Reconcile => "Reconcile",
            Self::Delete => "Delete",
            Self::Migrate => "Migrate",
            Self::Restore => "Restore",
        };
        f.write_str(s)
    }
}

/// The state recorded in `status.lastOperation.state`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
pub enum LastOperationState {
    Processing,
    Succeeded,
    Error,
    Failed,
    Pending,
    Aborted,
}

impl fmt::Display for LastOperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Processing => "Processing",
            Self::Succeeded => "Succeeded",
            Self::Error => "Error",
            Self::Failed => "Failed",
            Self::Pending => "Pending",
            Self::Aborted => "Aborted",
        };
        f.write_str(s)
    }
}

/// The most recent operation an extension controller performed on a resource.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LastOperation {
    /// Verb of the operation (Create, Reconcile, Delete, Migrate, Restore).
    pub r#type: LastOperationType,

    /// Current state of the operation.
    pub state: LastOperationState,

    /// Human-readable description of what the controller is doing.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// RFC3339 timestamp of the last status change.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<String>,

    /// Progress of the operation in percent.
    #[serde(default)]
    pub progress: i32,
}

impl LastOperation {
    /// Whether this operation finished successfully.
    #[must_use]
    pub fn is_succeeded(&self) -> bool {
        self.state == LastOperationState::Succeeded
    }
}

/// An error reported by an extension controller.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LastError {
    /// Human-readable description of the error.
    pub description: String,

    /// Identifier of the task that failed, if the controller tracks tasks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,

    /// Well-known error codes (e.g. `ERR_INFRA_UNAUTHORIZED`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub codes: Vec<String>,

    /// RFC3339 timestamp of when the error was reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<String>,
}

/// Status shape shared by all extension resources.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DefaultStatus {
    /// The `metadata.generation` the controller last acted on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// The most recent operation attempted by the controller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_operation: Option<LastOperation>,

    /// The last error reported by the controller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<LastError>,

    /// Opaque state the controller needs to restore this resource after a migration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<serde_json::Value>,

    /// Provider-specific status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_status: Option<serde_json::Value>,
}

/// Record types supported by `DNSRecord` resources.
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub enum DNSRecordType {
    A,
    AAAA,
    CNAME,
    TXT,
}

/// `DNSRecord` specification.
///
/// A `DNSRecord` asks the DNS extension of the given provider `type` to create or update a
/// record set in a hosted zone.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
#[kube(
    group = "extensions.gardener.cloud",
    version = "v1alpha1",
    kind = "DNSRecord",
    plural = "dnsrecords",
    shortname = "dns",
    namespaced,
    doc = "DNSRecord is a DNS record set managed by a provider-specific DNS extension controller."
)]
#[kube(status = "DNSRecordStatus")]
#[serde(rename_all = "camelCase")]
pub struct DNSRecordSpec {
    /// Provider type handled by the DNS extension (e.g. `aws-route53`).
    pub r#type: String,

    /// Provider-specific configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_config: Option<serde_json::Value>,

    /// Reference to the secret holding the provider credentials.
    pub secret_ref: SecretReference,

    /// Provider region, if the provider requires one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Hosted zone identifier. Determined by the controller when omitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,

    /// Fully qualified domain name of the record.
    pub name: String,

    /// Record type (A, AAAA, CNAME, TXT).
    pub record_type: DNSRecordType,

    /// Record values (IP addresses, target host, text).
    pub values: Vec<String>,

    /// Time to live in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
}

/// `DNSRecord` status.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DNSRecordStatus {
    /// Status fields shared by all extension resources.
    #[serde(flatten)]
    pub default: DefaultStatus,

    /// The hosted zone the controller resolved for this record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
}

/// `Extension` specification.
///
/// A generic extension keyed by its `type`; the matching extension controller interprets
/// the provider configuration.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
#[kube(
    group = "extensions.gardener.cloud",
    version = "v1alpha1",
    kind = "Extension",
    plural = "extensions",
    shortname = "ext",
    namespaced,
    doc = "Extension is a generic, type-keyed extension resource reconciled by an out-of-tree controller."
)]
#[kube(status = "DefaultStatus")]
#[serde(rename_all = "camelCase")]
pub struct ExtensionSpec {
    /// Extension type (e.g. `shoot-dns-service`).
    pub r#type: String,

    /// Extension-specific configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_config: Option<serde_json::Value>,
}

/// State persisted for a single extension resource.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionResourceState {
    /// Kind of the extension resource (e.g. `DNSRecord`).
    pub kind: String,

    /// Name of the extension resource.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Optional purpose distinguishing resources of the same kind.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,

    /// The saved `status.state` of the resource.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<serde_json::Value>,
}

/// `ShootState` specification.
///
/// Holds the saved state of all extension resources of a cluster so that they can be
/// restored after a control plane migration.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, PartialEq, Default, JsonSchema)]
#[kube(
    group = "core.gardener.cloud",
    version = "v1beta1",
    kind = "ShootState",
    plural = "shootstates",
    namespaced,
    doc = "ShootState stores the extension resource state required to restore a cluster's control plane."
)]
#[serde(rename_all = "camelCase")]
pub struct ShootStateSpec {
    /// Saved state of extension resources.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<ExtensionResourceState>,
}

impl ShootStateSpec {
    /// Find the saved state for the resource identified by `(kind, name)`.
    #[must_use]
    pub fn find(&self, kind: &str, name: &str) -> Option<&ExtensionResourceState> {
        self.extensions
            .iter()
            .find(|e| e.kind == kind && e.name.as_deref() == Some(name))
    }
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
