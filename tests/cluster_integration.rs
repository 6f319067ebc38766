// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Integration tests for the extension resource lifecycle against a real cluster.
//!
//! No extension controller runs in the test cluster, so each test plays the controller
//! itself by clearing the operation annotation and reporting a succeeded last operation.
//!
//! Prerequisites:
//!   cargo run --bin crdgen && kubectl apply -f deploy/crds/
//!
//! Run with: cargo test --test cluster_integration -- --ignored

mod common;

use common::{
    act_as_controller, cleanup_test_namespace, crd_installed, create_test_namespace,
    get_kube_client_or_skip,
};
use extension_lifecycle::components::{
    DeployWaiter, DnsRecordComponent, DnsRecordValues, ExtensionComponent, ExtensionValues, Phase,
};
use extension_lifecycle::config::WaitConfig;
use extension_lifecycle::context::Context;
use extension_lifecycle::crd::{DNSRecord, DNSRecordType, Extension, ExtensionSpec};
use extension_lifecycle::errors::ExtensionError;
use extension_lifecycle::labels::DELETION_CONFIRMATION_ANNOTATION;
use k8s_openapi::api::core::v1::Secret;
use kube::api::Api;
use kube::ResourceExt;
use std::time::Duration;

const DNS_RECORD_CRD: &str = "dnsrecords.extensions.gardener.cloud";
const EXTENSION_CRD: &str = "extensions.extensions.gardener.cloud";

fn fast_wait_config() -> WaitConfig {
    WaitConfig::new(
        Duration::from_secs(1),
        Duration::from_secs(10),
        Duration::from_secs(30),
    )
}

#[tokio::test]
#[ignore = "requires a Kubernetes cluster with the extension CRDs installed"]
async fn test_dns_record_full_lifecycle() {
    let Some(client) = get_kube_client_or_skip().await else {
        return;
    };
    if !crd_installed(&client, DNS_RECORD_CRD).await {
        return;
    }

    let namespace = "extension-lifecycle-dnsrecord-test";
    create_test_namespace(&client, namespace)
        .await
        .expect("Failed to create namespace");

    let mut values = DnsRecordValues::new(
        "internal",
        namespace,
        "aws-route53",
        "api.demo.example.com",
        DNSRecordType::A,
    );
    values.values = vec!["10.0.0.1".to_string()];
    values.secret_data.insert("accessKeyID".to_string(), b"key".to_vec());
    values.wait_config = fast_wait_config();

    let mut component = DnsRecordComponent::new(Context::new(client.clone()), values);
    component.deploy().await.expect("DNSRecord deploy failed");

    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let secret = secrets
        .get("dnsrecord-internal")
        .await
        .expect("credentials secret missing");
    assert!(secret.data.is_some_and(|data| data.contains_key("accessKeyID")));

    let records: Api<DNSRecord> = Api::namespaced(client.clone(), namespace);
    let controller = tokio::spawn(act_as_controller(
        records.clone(),
        "internal".to_string(),
        "Create",
        Duration::from_secs(20),
    ));
    component.wait().await.expect("DNSRecord never became ready");
    controller.await.expect("controller task panicked");

    let record = records.get("internal").await.expect("DNSRecord missing");
    assert_eq!(record.spec.values, vec!["10.0.0.1".to_string()]);
    assert_eq!(record.spec.ttl, Some(120));

    component.destroy().await.expect("DNSRecord destroy failed");
    component
        .wait_cleanup()
        .await
        .expect("DNSRecord was not deleted");
    assert!(records.get_opt("internal").await.expect("get failed").is_none());

    cleanup_test_namespace(&client, namespace)
        .await
        .expect("Failed to cleanup namespace");
}

#[tokio::test]
#[ignore = "requires a Kubernetes cluster with the extension CRDs installed"]
async fn test_dns_record_wait_times_out_without_controller() {
    let Some(client) = get_kube_client_or_skip().await else {
        return;
    };
    if !crd_installed(&client, DNS_RECORD_CRD).await {
        return;
    }

    let namespace = "extension-lifecycle-timeout-test";
    create_test_namespace(&client, namespace)
        .await
        .expect("Failed to create namespace");

    let mut values = DnsRecordValues::new(
        "external",
        namespace,
        "aws-route53",
        "demo.example.com",
        DNSRecordType::CNAME,
    );
    values.values = vec!["lb.example.com".to_string()];
    values.wait_config = WaitConfig::new(
        Duration::from_secs(1),
        Duration::from_secs(3),
        Duration::from_secs(5),
    );

    let mut component = DnsRecordComponent::new(Context::new(client.clone()), values);
    component.deploy().await.expect("DNSRecord deploy failed");

    let err = component.wait().await.expect_err("wait should time out");
    assert!(
        matches!(err, ExtensionError::Timeout { .. }),
        "unexpected error: {err}"
    );

    component.destroy().await.expect("DNSRecord destroy failed");
    cleanup_test_namespace(&client, namespace)
        .await
        .expect("Failed to cleanup namespace");
}

#[tokio::test]
#[ignore = "requires a Kubernetes cluster with the extension CRDs installed"]
async fn test_extension_deploy_and_stale_cleanup() {
    let Some(client) = get_kube_client_or_skip().await else {
        return;
    };
    if !crd_installed(&client, EXTENSION_CRD).await {
        return;
    }

    let namespace = "extension-lifecycle-extension-test";
    create_test_namespace(&client, namespace)
        .await
        .expect("Failed to create namespace");

    let spec = |extension_type: &str| ExtensionSpec {
        r#type: extension_type.to_string(),
        provider_config: None,
    };
    let extensions: Api<Extension> = Api::namespaced(client.clone(), namespace);

    // First round deploys both types.
    let mut values = ExtensionValues::new(namespace)
        .with_extension(spec("shoot-dns-service"))
        .with_extension(spec("shoot-cert-service"));
    values.wait_config = fast_wait_config();
    let mut component = ExtensionComponent::new(Context::new(client.clone()), values);

    component
        .deploy(Phase::AfterKubeApiServer)
        .await
        .expect("Extension deploy failed");
    let controllers = [
        tokio::spawn(act_as_controller(
            extensions.clone(),
            "shoot-dns-service".to_string(),
            "Reconcile",
            Duration::from_secs(20),
        )),
        tokio::spawn(act_as_controller(
            extensions.clone(),
            "shoot-cert-service".to_string(),
            "Reconcile",
            Duration::from_secs(20),
        )),
    ];
    component
        .wait(Phase::AfterKubeApiServer)
        .await
        .expect("Extensions never became ready");
    for controller in controllers {
        controller.await.expect("controller task panicked");
    }

    // Second round only wants one type; the other one is stale.
    let mut values = ExtensionValues::new(namespace).with_extension(spec("shoot-dns-service"));
    values.wait_config = fast_wait_config();
    let component = ExtensionComponent::new(Context::new(client.clone()), values);

    component
        .delete_stale_resources()
        .await
        .expect("stale cleanup failed");
    component
        .wait_cleanup_stale_resources()
        .await
        .expect("stale Extension was not deleted");

    let remaining: Vec<String> = extensions
        .list(&kube::api::ListParams::default())
        .await
        .expect("list failed")
        .items
        .iter()
        .map(ResourceExt::name_any)
        .collect();
    assert_eq!(remaining, vec!["shoot-dns-service".to_string()]);

    let kept = extensions
        .get("shoot-dns-service")
        .await
        .expect("wanted Extension missing");
    assert!(!kept.annotations().contains_key(DELETION_CONFIRMATION_ANNOTATION));

    component
        .destroy(Phase::BeforeKubeApiServer)
        .await
        .expect("Extension destroy failed");
    component
        .wait_cleanup(Phase::BeforeKubeApiServer)
        .await
        .expect("Extension was not deleted");

    cleanup_test_namespace(&client, namespace)
        .await
        .expect("Failed to cleanup namespace");
}
