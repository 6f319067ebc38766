// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for all lifecycle operations.
//!
//! Every deploy, wait, destroy, migrate and restore call receives a [`Context`] that
//! contains:
//! - The Kubernetes client (anything implementing [`ResourceClient`])
//! - The [`Clock`] used for timestamp annotations and poll sleeps
//! - The caller's [`CancellationToken`]
//!
//! API calls and sleeps made through the context observe the token and return
//! [`ExtensionError::Cancelled`] promptly once it fires.

use crate::client::ResourceClient;
use crate::clock::{Clock, SystemClock};
use crate::errors::{ExtensionError, ResourceKey};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Client, clock and cancellation token shared by all operations of one reconciliation.
#[derive(Clone)]
pub struct Context<C> {
    /// Kubernetes client for API operations
    pub client: C,

    /// Time source for annotations and wait loops
    pub clock: Arc<dyn Clock>,

    /// Cancellation token of the reconciliation driving this context
    pub cancellation: CancellationToken,
}

impl<C: ResourceClient> Context<C> {
    /// Create a context using the system clock and a fresh cancellation token.
    #[must_use]
    pub fn new(client: C) -> Self {
        Self {
            client,
            clock: Arc::new(SystemClock),
            cancellation: CancellationToken::new(),
        }
    }

    /// Replace the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Current time according to the context's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Run an API call, aborting with [`ExtensionError::Cancelled`] if the token fires first.
    ///
    /// # Errors
    ///
    /// Returns the API error of `call`, or `Cancelled`.
    pub async fn guard<T, F>(
        &self,
        key: &ResourceKey,
        operation: &str,
        call: F,
    ) -> Result<T, ExtensionError>
    where
        F: Future<Output = Result<T, kube::Error>>,
    {
        tokio::select! {
            biased;
            () = self.cancellation.cancelled() => Err(self.cancelled(key, operation)),
            result = call => result.map_err(ExtensionError::from),
        }
    }

    /// Sleep on the context's clock, aborting early if the token fires.
    ///
    /// # Errors
    ///
    /// Returns `Cancelled` when the token fires before the sleep completes.
    pub async fn sleep(
        &self,
        key: &ResourceKey,
        operation: &str,
        duration: Duration,
    ) -> Result<(), ExtensionError> {
        tokio::select! {
            biased;
            () = self.cancellation.cancelled() => Err(self.cancelled(key, operation)),
            () = self.clock.sleep(duration) => Ok(()),
        }
    }

    /// Whether the cancellation token has fired.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub(crate) fn cancelled(&self, key: &ResourceKey, operation: &str) -> ExtensionError {
        ExtensionError::Cancelled {
            key: key.clone(),
            operation: operation.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod context_tests;
