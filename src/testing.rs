// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory `ResourceClient` for unit tests.
//!
//! [`FakeClient`] stores objects as JSON keyed by kind, namespace and name and behaves like
//! a small API server: creates conflict on existing names, merge patches ignore `status`
//! (which only the status subresource may write), spec changes bump `metadata.generation`,
//! and deleting an object with finalizers only sets its `deletionTimestamp`.
//!
//! Reactors stand in for the extension controller. They run against the stored object
//! after every write (or before every read) and may rewrite it, e.g. to remove the
//! operation annotation and report `Succeeded`.

use crate::client::{NamespacedObject, ResourceClient};
use crate::errors::ResourceKey;
use crate::labels::{GARDENER_OPERATION_ANNOTATION, GARDENER_TIMESTAMP_ANNOTATION};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

/// API verbs recorded in the call journal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verb {
    Get,
    Create,
    Patch,
    PatchStatus,
    Delete,
    List,
}

/// When a reactor runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// After a create or main-resource patch was stored
    Write,
    /// Before a get returns
    Read,
}

/// One recorded API call.
#[derive(Clone, Debug)]
pub struct Call {
    pub verb: Verb,
    pub key: ResourceKey,
    pub body: Option<Value>,
}

pub type Reactor = Arc<dyn Fn(&ResourceKey, &mut Value) + Send + Sync>;

struct RegisteredReactor {
    kind: String,
    trigger: Trigger,
    reactor: Reactor,
}

struct Failure {
    verb: Verb,
    kind: String,
    code: u16,
}

#[derive(Default)]
struct FakeState {
    objects: BTreeMap<ResourceKey, Value>,
    calls: Vec<Call>,
    reactors: Vec<RegisteredReactor>,
    failures: Vec<Failure>,
    resource_version: u64,
}

/// In-memory API server for a single test.
#[derive(Clone, Default)]
pub struct FakeClient {
    state: Arc<Mutex<FakeState>>,
}

pub fn api_error(code: u16, reason: &str, message: impl Into<String>) -> kube::Error {
    kube::Error::Api(Box::new(kube::core::Status {
        status: Some(kube::core::response::StatusSummary::Failure),
        message: message.into(),
        reason: reason.to_string(),
        code,
        metadata: None,
        details: None,
    }))
}

fn not_found(key: &ResourceKey) -> kube::Error {
    api_error(404, "NotFound", format!("{key} not found"))
}

fn key_of<K: NamespacedObject>(namespace: &str, name: &str) -> ResourceKey {
    ResourceKey::new(K::kind(&()), namespace, name)
}

fn decode<K: NamespacedObject>(value: &Value) -> Result<K, kube::Error> {
    serde_json::from_value(value.clone())
        .map_err(|e| api_error(500, "InternalError", format!("decode: {e}")))
}

fn now_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn labels_match(value: &Value, selector: &str) -> bool {
    let labels = &value["metadata"]["labels"];
    selector
        .split(',')
        .filter(|term| !term.is_empty())
        .all(|term| match term.split_once('=') {
            Some((k, v)) => labels[k.trim()].as_str() == Some(v.trim()),
            None => !labels[term.trim()].is_null(),
        })
}

impl FakeClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a reactor for objects of `kind`.
    pub fn add_reactor(&self, kind: &str, trigger: Trigger, reactor: Reactor) {
        self.lock().reactors.push(RegisteredReactor {
            kind: kind.to_string(),
            trigger,
            reactor,
        });
    }

    /// Make the next `verb` call on `kind` fail with HTTP `code`.
    pub fn fail_next(&self, verb: Verb, kind: &str, code: u16) {
        self.lock().failures.push(Failure {
            verb,
            kind: kind.to_string(),
            code,
        });
    }

    /// Store an object as-is, bypassing reactors.
    pub fn insert<K: Serialize + kube::Resource<DynamicType = ()>>(&self, obj: &K) {
        let meta = obj.meta();
        let key = ResourceKey::new(
            K::kind(&()),
            meta.namespace.clone().unwrap_or_default(),
            meta.name.clone().unwrap_or_default(),
        );
        let mut value = serde_json::to_value(obj).unwrap();
        if value["metadata"]["generation"].is_null() {
            value["metadata"]["generation"] = json!(1);
        }
        self.lock().objects.insert(key, value);
    }

    /// The stored JSON of an object.
    pub fn object(&self, kind: &str, namespace: &str, name: &str) -> Option<Value> {
        self.lock()
            .objects
            .get(&ResourceKey::new(kind, namespace, name))
            .cloned()
    }

    /// The stored object, decoded.
    pub fn typed<K: NamespacedObject>(&self, namespace: &str, name: &str) -> Option<K> {
        self.lock()
            .objects
            .get(&key_of::<K>(namespace, name))
            .map(|v| serde_json::from_value(v.clone()).unwrap())
    }

    pub fn contains(&self, kind: &str, namespace: &str, name: &str) -> bool {
        self.object(kind, namespace, name).is_some()
    }

    /// Rewrite a stored object, bypassing reactors.
    pub fn update(&self, kind: &str, namespace: &str, name: &str, f: impl FnOnce(&mut Value)) {
        if let Some(value) = self
            .lock()
            .objects
            .get_mut(&ResourceKey::new(kind, namespace, name))
        {
            f(value);
        }
    }

    /// Drop a stored object, e.g. once a simulated controller released its finalizer.
    pub fn remove(&self, kind: &str, namespace: &str, name: &str) {
        self.lock()
            .objects
            .remove(&ResourceKey::new(kind, namespace, name));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Recorded calls with the given verb, in order.
    pub fn calls_with(&self, verb: Verb) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.verb == verb).collect()
    }

    fn record(
        state: &mut FakeState,
        verb: Verb,
        key: &ResourceKey,
        body: Option<Value>,
    ) -> Result<(), kube::Error> {
        state.calls.push(Call {
            verb,
            key: key.clone(),
            body,
        });
        if let Some(pos) = state
            .failures
            .iter()
            .position(|f| f.verb == verb && f.kind == key.kind)
        {
            let failure = state.failures.remove(pos);
            return Err(api_error(failure.code, "Injected", format!("injected failure for {key}")));
        }
        Ok(())
    }

    fn react(state: &mut FakeState, key: &ResourceKey, trigger: Trigger) {
        let reactors: Vec<Reactor> = state
            .reactors
            .iter()
            .filter(|r| r.kind == key.kind && r.trigger == trigger)
            .map(|r| r.reactor.clone())
            .collect();
        if let Some(value) = state.objects.get_mut(key) {
            for reactor in reactors {
                reactor(key, value);
            }
        }
    }

    fn bump_version(state: &mut FakeState, value: &mut Value) {
        state.resource_version += 1;
        value["metadata"]["resourceVersion"] = json!(state.resource_version.to_string());
    }
}

#[async_trait::async_trait]
impl ResourceClient for FakeClient {
    async fn get<K: NamespacedObject>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<K>, kube::Error> {
        let key = key_of::<K>(namespace, name);
        let mut state = self.lock();
        Self::record(&mut state, Verb::Get, &key, None)?;
        Self::react(&mut state, &key, Trigger::Read);
        state.objects.get(&key).map(decode::<K>).transpose()
    }

    async fn create<K: NamespacedObject>(
        &self,
        namespace: &str,
        obj: &K,
    ) -> Result<K, kube::Error> {
        let name = obj.meta().name.clone().unwrap_or_default();
        let key = key_of::<K>(namespace, &name);
        let mut value = serde_json::to_value(obj)
            .map_err(|e| api_error(400, "BadRequest", e.to_string()))?;

        let mut state = self.lock();
        Self::record(&mut state, Verb::Create, &key, Some(value.clone()))?;
        if state.objects.contains_key(&key) {
            return Err(api_error(409, "AlreadyExists", format!("{key} already exists")));
        }

        value["metadata"]["namespace"] = json!(namespace);
        value["metadata"]["generation"] = json!(1);
        value["metadata"]["creationTimestamp"] = json!(now_string());
        Self::bump_version(&mut state, &mut value);
        let created = decode(&value)?;

        state.objects.insert(key.clone(), value);
        Self::react(&mut state, &key, Trigger::Write);
        Ok(created)
    }

    async fn patch<K: NamespacedObject>(
        &self,
        namespace: &str,
        name: &str,
        patch: &Value,
    ) -> Result<K, kube::Error> {
        let key = key_of::<K>(namespace, name);
        let mut state = self.lock();
        Self::record(&mut state, Verb::Patch, &key, Some(patch.clone()))?;

        let Some(mut value) = state.objects.get(&key).cloned() else {
            return Err(not_found(&key));
        };

        let mut main_patch = patch.clone();
        if let Some(map) = main_patch.as_object_mut() {
            map.remove("status");
        }
        let spec_before = value["spec"].clone();
        json_patch::merge(&mut value, &main_patch);
        if value["spec"] != spec_before {
            let generation = value["metadata"]["generation"].as_i64().unwrap_or(0) + 1;
            value["metadata"]["generation"] = json!(generation);
        }
        Self::bump_version(&mut state, &mut value);
        let patched = decode(&value)?;

        state.objects.insert(key.clone(), value);
        Self::react(&mut state, &key, Trigger::Write);
        Ok(patched)
    }

    async fn patch_status<K: NamespacedObject>(
        &self,
        namespace: &str,
        name: &str,
        patch: &Value,
    ) -> Result<K, kube::Error> {
        let key = key_of::<K>(namespace, name);
        let mut state = self.lock();
        Self::record(&mut state, Verb::PatchStatus, &key, Some(patch.clone()))?;

        let Some(mut value) = state.objects.get(&key).cloned() else {
            return Err(not_found(&key));
        };

        if let Some(status) = patch.get("status") {
            json_patch::merge(&mut value, &json!({ "status": status }));
        }
        Self::bump_version(&mut state, &mut value);
        let patched = decode(&value)?;
        state.objects.insert(key, value);
        Ok(patched)
    }

    async fn delete<K: NamespacedObject>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<(), kube::Error> {
        let key = key_of::<K>(namespace, name);
        let mut state = self.lock();
        Self::record(&mut state, Verb::Delete, &key, None)?;

        let Some(value) = state.objects.get_mut(&key) else {
            return Err(not_found(&key));
        };

        let has_finalizers = value["metadata"]["finalizers"]
            .as_array()
            .is_some_and(|f| !f.is_empty());
        if has_finalizers {
            if value["metadata"]["deletionTimestamp"].is_null() {
                value["metadata"]["deletionTimestamp"] = json!(now_string());
            }
        } else {
            state.objects.remove(&key);
        }
        Ok(())
    }

    async fn list<K: NamespacedObject>(
        &self,
        namespace: &str,
        label_selector: Option<&str>,
    ) -> Result<Vec<K>, kube::Error> {
        let key = key_of::<K>(namespace, "");
        let mut state = self.lock();
        Self::record(&mut state, Verb::List, &key, None)?;

        state
            .objects
            .iter()
            .filter(|(k, _)| k.kind == key.kind && k.namespace == namespace)
            .filter(|(_, v)| label_selector.map_or(true, |s| labels_match(v, s)))
            .map(|(_, v)| decode(v))
            .collect()
    }
}

// ============================================================================
// Simulated extension controllers
// ============================================================================

fn operation_type(operation: &str, has_last_operation: bool) -> &'static str {
    match operation {
        "migrate" => "Migrate",
        "restore" => "Restore",
        _ if has_last_operation => "Reconcile",
        _ => "Create",
    }
}

/// Take the pending operation off the object and return it, unless it is `wait-for-state`.
fn take_operation(value: &mut Value) -> Option<String> {
    let annotations = value["metadata"]["annotations"].as_object_mut()?;
    let operation = annotations.get(GARDENER_OPERATION_ANNOTATION)?.as_str()?.to_string();
    if operation == "wait-for-state" {
        return None;
    }
    annotations.remove(GARDENER_OPERATION_ANNOTATION);
    Some(operation)
}

/// A controller that completes every requested operation successfully.
pub fn succeeding_controller() -> Reactor {
    Arc::new(|_key, value| {
        let Some(operation) = take_operation(value) else {
            return;
        };
        let op_type = operation_type(&operation, !value["status"]["lastOperation"].is_null());
        let generation = value["metadata"]["generation"].clone();
        json_patch::merge(
            value,
            &json!({
                "status": {
                    "observedGeneration": generation,
                    "lastOperation": {
                        "type": op_type,
                        "state": "Succeeded",
                        "lastUpdateTime": now_string(),
                        "progress": 100,
                    },
                    "lastError": null,
                }
            }),
        );
    })
}

/// A controller that reports every requested operation as failed with `description`.
pub fn failing_controller(description: &'static str) -> Reactor {
    Arc::new(move |_key, value| {
        let Some(operation) = take_operation(value) else {
            return;
        };
        let op_type = operation_type(&operation, !value["status"]["lastOperation"].is_null());
        json_patch::merge(
            value,
            &json!({
                "status": {
                    "lastOperation": {
                        "type": op_type,
                        "state": "Error",
                        "description": description,
                        "progress": 50,
                    },
                    "lastError": {"description": description},
                }
            }),
        );
    })
}

/// Set the timestamp annotation of a stored object.
pub fn set_timestamp(value: &mut Value, timestamp: &str) {
    value["metadata"]["annotations"][GARDENER_TIMESTAMP_ANNOTATION] = json!(timestamp);
}

// ============================================================================
// Fixtures
// ============================================================================

pub const NAMESPACE: &str = "shoot--dev--demo";

/// A context on `fake` with a manual clock starting at 2025-01-01T12:00:00Z.
pub fn manual_context(
    fake: &FakeClient,
) -> (crate::context::Context<FakeClient>, crate::clock::ManualClock) {
    use chrono::TimeZone;

    let clock = crate::clock::ManualClock::new(Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap());
    let ctx = crate::context::Context::new(fake.clone()).with_clock(Arc::new(clock.clone()));
    (ctx, clock)
}

/// A DNS record spec for `api.demo.example.com` with the given values.
pub fn dns_record_spec(values: &[&str]) -> crate::crd::DNSRecordSpec {
    crate::crd::DNSRecordSpec {
        r#type: "aws-route53".to_string(),
        provider_config: None,
        secret_ref: k8s_openapi::api::core::v1::SecretReference {
            name: Some("dnsrecord-external".to_string()),
            namespace: Some(NAMESPACE.to_string()),
        },
        region: None,
        zone: Some("Z1234".to_string()),
        name: "api.demo.example.com".to_string(),
        record_type: crate::crd::DNSRecordType::A,
        values: values.iter().map(ToString::to_string).collect(),
        ttl: Some(120),
    }
}

/// An extension spec of the given type.
pub fn extension_spec(extension_type: &str) -> crate::crd::ExtensionSpec {
    crate::crd::ExtensionSpec {
        r#type: extension_type.to_string(),
        provider_config: None,
    }
}

/// The annotations of a stored object.
pub fn annotations_of(value: &Value) -> &serde_json::Map<String, Value> {
    static EMPTY: std::sync::LazyLock<serde_json::Map<String, Value>> =
        std::sync::LazyLock::new(serde_json::Map::new);
    value["metadata"]["annotations"].as_object().unwrap_or(&EMPTY)
}
