// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common label and annotation keys used across all components.
//!
//! This module defines the well-known Gardener annotations that carry operation intent
//! between this library and the extension controllers, plus the labels put on the
//! secondary objects created by the components.

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label for the tool being used to manage the operation of an application
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Value for `app.kubernetes.io/managed-by` on objects written by this library
pub const MANAGED_BY_EXTENSION_LIFECYCLE: &str = "extension-lifecycle";

// ============================================================================
// Gardener Annotations
// ============================================================================

/// Annotation carrying the pending operation verb (`reconcile`, `migrate`, ...)
pub const GARDENER_OPERATION_ANNOTATION: &str = "gardener.cloud/operation";

/// Annotation carrying the time at which the last operation was requested
pub const GARDENER_TIMESTAMP_ANNOTATION: &str = "gardener.cloud/timestamp";

/// Annotation confirming that an extension resource may be deleted
pub const DELETION_CONFIRMATION_ANNOTATION: &str = "confirmation.gardener.cloud/deletion";

// ============================================================================
// Gardener Labels
// ============================================================================

/// Label describing what a secondary object is used for
pub const GARDENER_PURPOSE_LABEL: &str = "gardener.cloud/purpose";

/// Purpose value for the credentials secret of a `DNSRecord`
pub const PURPOSE_DNS_RECORD_CREDENTIALS: &str = "dnsrecord-credentials";
