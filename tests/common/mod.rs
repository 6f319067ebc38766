// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common utilities for integration tests against a real cluster.

#![allow(dead_code)]

use extension_lifecycle::labels::GARDENER_OPERATION_ANNOTATION;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{Api, DeleteParams, Patch, PatchParams, PostParams};
use kube::client::Client;
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::fmt::Debug;
use std::time::Duration;

/// Get a Kubernetes client or skip the test if no cluster is reachable.
pub async fn get_kube_client_or_skip() -> Option<Client> {
    match Client::try_default().await {
        Ok(client) => Some(client),
        Err(e) => {
            eprintln!("Skipping integration test: not running in Kubernetes cluster: {e}");
            None
        }
    }
}

/// Whether the CRD named `name` (e.g. `dnsrecords.extensions.gardener.cloud`) is installed.
pub async fn crd_installed(client: &Client, name: &str) -> bool {
    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    match crds.get_opt(name).await {
        Ok(Some(_)) => true,
        Ok(None) => {
            eprintln!("Skipping integration test: CRD {name} not installed (run crdgen and apply)");
            false
        }
        Err(e) => {
            eprintln!("Skipping integration test: cannot read CRD {name}: {e}");
            false
        }
    }
}

/// Create a test namespace, tolerating an existing one.
pub async fn create_test_namespace(
    client: &Client,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let namespaces: Api<Namespace> = Api::all(client.clone());

    let ns: Namespace = serde_json::from_value(json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": {
            "name": name,
            "labels": {
                "test": "integration",
                "managed-by": "extension-lifecycle-test"
            }
        }
    }))?;

    match namespaces.create(&PostParams::default(), &ns).await {
        Ok(_) => {
            println!("Created test namespace: {name}");
            Ok(())
        }
        Err(kube::Error::Api(ae)) if ae.code == 409 => {
            println!("Test namespace already exists: {name}");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

/// Delete a test namespace, tolerating an absent one.
pub async fn cleanup_test_namespace(
    client: &Client,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let namespaces: Api<Namespace> = Api::all(client.clone());

    match namespaces.delete(name, &DeleteParams::default()).await {
        Ok(_) => {
            println!("Deleted test namespace: {name}");
            Ok(())
        }
        Err(kube::Error::Api(ae)) if ae.code == 404 => {
            println!("Test namespace already deleted: {name}");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

/// Play the extension controller for one resource: once the operation annotation shows
/// up, remove it and report a succeeded `last_operation` for the current generation.
///
/// Gives up silently after `deadline`, letting the caller's wait time out.
pub async fn act_as_controller<K>(
    api: Api<K>,
    name: String,
    last_operation_type: &'static str,
    deadline: Duration,
) where
    K: Resource + Clone + DeserializeOwned + Debug,
{
    let started = tokio::time::Instant::now();
    while started.elapsed() < deadline {
        if let Ok(Some(obj)) = api.get_opt(&name).await {
            if obj.annotations().contains_key(GARDENER_OPERATION_ANNOTATION) {
                let clear = json!({
                    "metadata": {"annotations": {GARDENER_OPERATION_ANNOTATION: null}}
                });
                let status = json!({
                    "status": {
                        "observedGeneration": obj.meta().generation,
                        "lastOperation": {
                            "type": last_operation_type,
                            "state": "Succeeded",
                            "description": "reconciled by integration test",
                            "progress": 100
                        }
                    }
                });
                let params = PatchParams::default();
                if api.patch(&name, &params, &Patch::Merge(&clear)).await.is_ok()
                    && api
                        .patch_status(&name, &params, &Patch::Merge(&status))
                        .await
                        .is_ok()
                {
                    println!("Reported {last_operation_type} Succeeded for {name}");
                    return;
                }
            }
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
}
