// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the extension lifecycle protocol.
//!
//! This module provides specialized error types for:
//! - Kubernetes API failures while creating, patching or deleting extension resources
//! - Errors reported by extension controllers through `status.lastError`
//! - Wait conditions that did not converge (stale observations, timeouts, cancellation)
//! - Aggregated failures of fan-out operations across many extension resources
//!
//! Every error names the resource it concerns through a [`ResourceKey`], so that callers
//! and logs can tell which of many concurrently handled resources failed.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Identity of an extension resource: kind, namespace and name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl ResourceKey {
    #[must_use]
    pub fn new(kind: impl Into<String>, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}

/// Errors returned by the deploy, wait, destroy, migrate and restore operations.
#[derive(Error, Debug)]
pub enum ExtensionError {
    /// The resource does not exist.
    ///
    /// Benign for destroy, wait-for-deletion and wait-for-migration; a real failure when
    /// waiting for readiness.
    #[error("{key} not found")]
    NotFound {
        /// The missing resource
        key: ResourceKey,
    },

    /// A Kubernetes API call failed for a reason other than the resource being absent.
    ///
    /// Propagated verbatim; this library never retries API calls itself.
    #[error(transparent)]
    Api(#[from] kube::Error),

    /// The extension controller reported an error in `status.lastError`.
    #[error("error during reconciliation: {description}")]
    Reconciliation {
        /// The resource that failed
        key: ResourceKey,
        /// Description reported by the controller
        description: String,
        /// Error codes reported by the controller
        codes: Vec<String>,
    },

    /// The resource's timestamp annotation is older than the last one this caller wrote.
    ///
    /// The controller has not yet seen the latest request; never treated as severe.
    #[error("{key} has not observed the latest request yet (timestamp {observed} is older than {expected})")]
    StaleObservation {
        /// The resource being observed
        key: ResourceKey,
        /// Timestamp found on the resource
        observed: String,
        /// Timestamp written by this caller
        expected: String,
    },

    /// The resource has not reached `Migrate=Succeeded`.
    #[error("{key} is not yet successfully migrated: {reason}")]
    NotMigrated {
        /// The resource being migrated
        key: ResourceKey,
        /// What the last operation currently reports
        reason: String,
        /// Whether the controller reported the migration as failed
        failed: bool,
    },

    /// The resource exists but has not converged yet.
    #[error("{key} is not ready yet: {reason}")]
    Pending {
        /// The resource being observed
        key: ResourceKey,
        /// Why the resource is not considered ready
        reason: String,
    },

    /// No terminal condition was reached before the wait budget was exhausted.
    #[error("timed out waiting for condition on {key} after {timeout:?}{}", describe_last_observed(.last_observed))]
    Timeout {
        /// The resource being waited for
        key: ResourceKey,
        /// The configured wait budget
        timeout: Duration,
        /// The last non-terminal condition observed before giving up
        last_observed: Option<Box<ExtensionError>>,
    },

    /// The caller's cancellation token fired.
    #[error("cancelled during {operation} of {key}")]
    Cancelled {
        /// The resource being handled
        key: ResourceKey,
        /// Operation that was interrupted (e.g. "wait", "deploy")
        operation: String,
    },

    /// A resource could not be converted to or from JSON.
    #[error("failed to serialize {kind}: {source}")]
    Serialization {
        /// Kind of the resource
        kind: String,
        /// Underlying serde error
        #[source]
        source: serde_json::Error,
    },

    /// Several resources of a fan-out failed.
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

fn describe_last_observed(last: &Option<Box<ExtensionError>>) -> String {
    match last {
        Some(err) => format!(": {err}"),
        None => String::new(),
    }
}

impl ExtensionError {
    /// Returns true if this error means the resource does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Api(err) => is_not_found(err),
            _ => false,
        }
    }

    /// Returns true if this condition becomes fatal once the severe threshold has elapsed.
    ///
    /// Conditions that merely indicate that the controller is still working (stale
    /// observations, pending operations) are retried until the timeout instead.
    #[must_use]
    pub fn is_severe(&self) -> bool {
        match self {
            Self::NotFound { .. } | Self::Reconciliation { .. } => true,
            Self::NotMigrated { failed, .. } => *failed,
            _ => false,
        }
    }

    /// Returns a `CamelCase` reason used for metrics labels and logs.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NotFound",
            Self::Api(_) => "ApiError",
            Self::Reconciliation { .. } => "ReconciliationError",
            Self::StaleObservation { .. } => "StaleObservation",
            Self::NotMigrated { .. } => "NotMigrated",
            Self::Pending { .. } => "Pending",
            Self::Timeout { .. } => "Timeout",
            Self::Cancelled { .. } => "Cancelled",
            Self::Serialization { .. } => "SerializationError",
            Self::Aggregate(_) => "AggregateError",
        }
    }
}

/// Several errors collected from a fan-out, each kept for inspection.
#[derive(Error, Debug, Default)]
#[error("{}", format_errors(.errors))]
pub struct AggregateError {
    errors: Vec<ExtensionError>,
}

fn format_errors(errors: &[ExtensionError]) -> String {
    let noun = if errors.len() == 1 { "error" } else { "errors" };
    let mut out = format!("{} {noun} occurred:", errors.len());
    for err in errors {
        out.push_str("\n\t* ");
        out.push_str(&err.to_string());
    }
    out
}

impl AggregateError {
    #[must_use]
    pub fn new(errors: Vec<ExtensionError>) -> Self {
        Self { errors }
    }

    pub fn push(&mut self, err: ExtensionError) {
        self.errors.push(err);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// The underlying errors in the order they were collected.
    #[must_use]
    pub fn errors(&self) -> &[ExtensionError] {
        &self.errors
    }

    #[must_use]
    pub fn into_errors(self) -> Vec<ExtensionError> {
        self.errors
    }

    /// `Ok(())` when nothing was collected, otherwise the aggregate as an error.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::Aggregate`] when at least one error was collected.
    pub fn into_result(self) -> Result<(), ExtensionError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ExtensionError::Aggregate(self))
        }
    }
}

impl FromIterator<ExtensionError> for AggregateError {
    fn from_iter<I: IntoIterator<Item = ExtensionError>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Returns true if a Kubernetes API error is HTTP 404 (Not Found).
#[must_use]
pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 404)
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
