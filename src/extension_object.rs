// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Implementations of the `ExtensionObject` capability trait for all extension kinds.
//!
//! The lifecycle protocol is written once against [`ExtensionObject`]; each custom
//! resource kind implements it here to expose its typed spec, its extension type and
//! the shared [`DefaultStatus`].

use crate::client::NamespacedObject;
use crate::crd::{
    DNSRecord, DNSRecordSpec, DefaultStatus, Extension, ExtensionSpec, LastError, LastOperation,
};
use crate::errors::ResourceKey;
use kube::ResourceExt;
use serde::Serialize;
use std::fmt::Debug;

/// A custom resource driven through the extension lifecycle protocol.
pub trait ExtensionObject: NamespacedObject {
    /// The desired-state type written by Deploy.
    type Spec: Clone + PartialEq + Serialize + Debug + Send + Sync;

    /// Build a fresh object with the given identity and spec.
    fn build(name: &str, namespace: &str, spec: Self::Spec) -> Self;

    fn spec(&self) -> &Self::Spec;

    fn spec_mut(&mut self) -> &mut Self::Spec;

    /// The extension type, i.e. which extension controller is responsible.
    fn extension_type(&self) -> &str;

    /// The shared status fields, if the controller has written any.
    fn extension_status(&self) -> Option<&DefaultStatus>;

    /// Whether `desired` differs materially from `current`.
    ///
    /// A material change forces a new operation annotation even when the last operation
    /// succeeded.
    fn spec_changed(current: &Self::Spec, desired: &Self::Spec) -> bool {
        current != desired
    }

    fn last_operation(&self) -> Option<&LastOperation> {
        self.extension_status()
            .and_then(|s| s.last_operation.as_ref())
    }

    fn last_error(&self) -> Option<&LastError> {
        self.extension_status().and_then(|s| s.last_error.as_ref())
    }

    fn resource_key(&self) -> ResourceKey {
        ResourceKey::new(
            Self::kind(&()),
            self.namespace().unwrap_or_default(),
            self.name_any(),
        )
    }
}

// DNSRecord Implementation
impl ExtensionObject for DNSRecord {
    type Spec = DNSRecordSpec;

    fn build(name: &str, namespace: &str, spec: Self::Spec) -> Self {
        let mut record = DNSRecord::new(name, spec);
        record.metadata.namespace = Some(namespace.to_string());
        record
    }

    fn spec(&self) -> &Self::Spec {
        &self.spec
    }

    fn spec_mut(&mut self) -> &mut Self::Spec {
        &mut self.spec
    }

    fn extension_type(&self) -> &str {
        &self.spec.r#type
    }

    fn extension_status(&self) -> Option<&DefaultStatus> {
        self.status.as_ref().map(|s| &s.default)
    }

    // The zone is resolved by the controller when not given, so an unset desired zone
    // never counts as a change.
    fn spec_changed(current: &Self::Spec, desired: &Self::Spec) -> bool {
        current.r#type != desired.r#type
            || current.provider_config != desired.provider_config
            || current.secret_ref != desired.secret_ref
            || current.region != desired.region
            || (desired.zone.is_some() && current.zone != desired.zone)
            || current.name != desired.name
            || current.record_type != desired.record_type
            || current.values != desired.values
            || current.ttl != desired.ttl
    }
}

// Extension Implementation
impl ExtensionObject for Extension {
    type Spec = ExtensionSpec;

    fn build(name: &str, namespace: &str, spec: Self::Spec) -> Self {
        let mut extension = Extension::new(name, spec);
        extension.metadata.namespace = Some(namespace.to_string());
        extension
    }

    fn spec(&self) -> &Self::Spec {
        &self.spec
    }

    fn spec_mut(&mut self) -> &mut Self::Spec {
        &mut self.spec
    }

    fn extension_type(&self) -> &str {
        &self.spec.r#type
    }

    fn extension_status(&self) -> Option<&DefaultStatus> {
        self.status.as_ref()
    }
}

#[cfg(test)]
#[path = "extension_object_tests.rs"]
mod extension_object_tests;
