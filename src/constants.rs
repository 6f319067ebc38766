// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the extension lifecycle library.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group for all extension CRDs
pub const API_GROUP: &str = "extensions.gardener.cloud";

/// API version for all extension CRDs
pub const API_VERSION: &str = "v1alpha1";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "extensions.gardener.cloud/v1alpha1";

/// Kind name for `DNSRecord` resource
pub const KIND_DNS_RECORD: &str = "DNSRecord";

/// Kind name for `Extension` resource
pub const KIND_EXTENSION: &str = "Extension";

// ============================================================================
// Operation Annotation Values
// ============================================================================

/// Requests a regular reconciliation from the extension controller
pub const OPERATION_RECONCILE: &str = "reconcile";

/// Requests the extension controller to restore from `status.state`
pub const OPERATION_RESTORE: &str = "restore";

/// Requests the extension controller to migrate the resource away
pub const OPERATION_MIGRATE: &str = "migrate";

/// Requests the extension controller to pause until `status.state` has been injected
pub const OPERATION_WAIT_FOR_STATE: &str = "wait-for-state";

// ============================================================================
// Wait Defaults
// ============================================================================

/// Default polling interval while waiting for an extension resource (5 seconds)
pub const DEFAULT_WAIT_INTERVAL_SECS: u64 = 5;

/// Default elapsed time after which errors are no longer retried (30 seconds)
pub const DEFAULT_WAIT_SEVERE_THRESHOLD_SECS: u64 = 30;

/// Default overall wait budget (3 minutes)
pub const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 180;

/// Environment variable overriding the polling interval (Go-style duration, e.g. "5s")
pub const ENV_WAIT_INTERVAL: &str = "EXTENSION_WAIT_INTERVAL";

/// Environment variable overriding the severe threshold (Go-style duration)
pub const ENV_WAIT_SEVERE_THRESHOLD: &str = "EXTENSION_WAIT_SEVERE_THRESHOLD";

/// Environment variable overriding the wait timeout (Go-style duration)
pub const ENV_WAIT_TIMEOUT: &str = "EXTENSION_WAIT_TIMEOUT";

// ============================================================================
// Fan-out Constants
// ============================================================================

/// Maximum number of extension resources processed concurrently by one fan-out
pub const DEFAULT_MAX_PARALLELISM: usize = 16;

// ============================================================================
// DNS Record Constants
// ============================================================================

/// Default TTL for DNS records managed through a `DNSRecord` (2 minutes)
pub const DEFAULT_DNS_RECORD_TTL_SECS: i64 = 120;

/// Key prefix used for the credentials secret of a `DNSRecord`
pub const DNS_RECORD_SECRET_PREFIX: &str = "dnsrecord-";
