// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Operation and timestamp annotations.
//!
//! Intent is communicated to extension controllers through two annotations:
//!
//! - `gardener.cloud/operation` - the verb the controller should perform next
//! - `gardener.cloud/timestamp` - when that verb was requested
//!
//! Whoever writes an operation also writes a fresh timestamp. The waiter later compares
//! the timestamp it finds on the resource against the one it wrote, and does not trust any
//! status until the resource carries a timestamp at least as new. This keeps a
//! `Succeeded` status left over from a previous request from being mistaken for the
//! outcome of the latest one.

use crate::constants::{
    OPERATION_MIGRATE, OPERATION_RECONCILE, OPERATION_RESTORE, OPERATION_WAIT_FOR_STATE,
};
use crate::labels::{
    DELETION_CONFIRMATION_ANNOTATION, GARDENER_OPERATION_ANNOTATION,
    GARDENER_TIMESTAMP_ANNOTATION,
};
use chrono::{DateTime, SecondsFormat, Utc};
use kube::{Resource, ResourceExt};
use std::fmt;

/// Verbs written to the `gardener.cloud/operation` annotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Reconcile,
    Restore,
    Migrate,
    WaitForState,
}

impl Operation {
    /// The annotation value for this verb.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reconcile => OPERATION_RECONCILE,
            Self::Restore => OPERATION_RESTORE,
            Self::Migrate => OPERATION_MIGRATE,
            Self::WaitForState => OPERATION_WAIT_FOR_STATE,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Format a timestamp the way it is stored in the timestamp annotation.
///
/// UTC, RFC3339 with nanosecond precision and a `Z` suffix, e.g.
/// `2025-01-01T12:00:00.000000000Z`.
#[must_use]
pub fn format_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parse a timestamp annotation value. Returns `None` for malformed values.
#[must_use]
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Set the operation annotation to `operation` and refresh the timestamp annotation.
///
/// Returns the timestamp that was written.
pub fn set_operation<K: Resource>(obj: &mut K, operation: Operation, now: DateTime<Utc>) -> String {
    obj.annotations_mut().insert(
        GARDENER_OPERATION_ANNOTATION.to_string(),
        operation.as_str().to_string(),
    );
    stamp_timestamp(obj, now)
}

/// Request a reconciliation.
pub fn mark_reconcile<K: Resource>(obj: &mut K, now: DateTime<Utc>) -> String {
    set_operation(obj, Operation::Reconcile, now)
}

/// Request a migration.
pub fn mark_migrate<K: Resource>(obj: &mut K, now: DateTime<Utc>) -> String {
    set_operation(obj, Operation::Migrate, now)
}

/// Request a restore from `status.state`.
pub fn mark_restore<K: Resource>(obj: &mut K, now: DateTime<Utc>) -> String {
    set_operation(obj, Operation::Restore, now)
}

/// Ask the controller to pause until `status.state` has been injected.
pub fn mark_wait_for_state<K: Resource>(obj: &mut K, now: DateTime<Utc>) -> String {
    set_operation(obj, Operation::WaitForState, now)
}

/// Refresh only the timestamp annotation.
///
/// Produces a watch event for the controller without requesting a new operation.
pub fn stamp_timestamp<K: Resource>(obj: &mut K, now: DateTime<Utc>) -> String {
    let timestamp = format_timestamp(now);
    obj.annotations_mut()
        .insert(GARDENER_TIMESTAMP_ANNOTATION.to_string(), timestamp.clone());
    timestamp
}

/// Confirm that the resource may be deleted.
pub fn confirm_deletion<K: Resource>(obj: &mut K) {
    obj.annotations_mut().insert(
        DELETION_CONFIRMATION_ANNOTATION.to_string(),
        "true".to_string(),
    );
}

/// The pending operation verb, if any.
#[must_use]
pub fn operation<K: Resource>(obj: &K) -> Option<&str> {
    obj.annotations()
        .get(GARDENER_OPERATION_ANNOTATION)
        .map(String::as_str)
}

/// The raw timestamp annotation, if any.
#[must_use]
pub fn timestamp<K: Resource>(obj: &K) -> Option<&str> {
    obj.annotations()
        .get(GARDENER_TIMESTAMP_ANNOTATION)
        .map(String::as_str)
}

/// The parsed timestamp annotation, if present and well-formed.
#[must_use]
pub fn recorded_timestamp<K: Resource>(obj: &K) -> Option<DateTime<Utc>> {
    timestamp(obj).and_then(parse_timestamp)
}

/// Whether the resource carries the deletion confirmation.
#[must_use]
pub fn is_deletion_confirmed<K: Resource>(obj: &K) -> bool {
    obj.annotations()
        .get(DELETION_CONFIRMATION_ANNOTATION)
        .is_some_and(|v| v == "true")
}

#[cfg(test)]
#[path = "annotations_tests.rs"]
mod annotations_tests;
