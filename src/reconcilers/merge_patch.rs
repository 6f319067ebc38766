// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! JSON merge patch (RFC 7386) computation.
//!
//! Every write to an existing extension resource is a merge patch computed between the
//! copy that was last observed and the locally mutated copy. Only fields that actually
//! changed are sent, so concurrent writers of other fields (most importantly the extension
//! controller writing `status`) are not overwritten.

use serde_json::{Map, Value};

/// Compute the merge patch that turns `original` into `modified`.
///
/// Objects are diffed recursively. Keys removed in `modified` are set to `null`. Any other
/// value that differs (arrays included) is replaced wholesale, as RFC 7386 prescribes.
///
/// # Example
///
/// ```
/// use extension_lifecycle::reconcilers::merge_patch::create_merge_patch;
/// use serde_json::json;
///
/// let original = json!({"spec": {"values": ["1.2.3.4"], "ttl": 120}, "status": {}});
/// let modified = json!({"spec": {"values": ["5.6.7.8"], "ttl": 120}, "status": {}});
///
/// assert_eq!(
///     create_merge_patch(&original, &modified),
///     json!({"spec": {"values": ["5.6.7.8"]}})
/// );
/// ```
#[must_use]
pub fn create_merge_patch(original: &Value, modified: &Value) -> Value {
    match (original, modified) {
        (Value::Object(original), Value::Object(modified)) => {
            Value::Object(diff_objects(original, modified))
        }
        _ => modified.clone(),
    }
}

fn diff_objects(original: &Map<String, Value>, modified: &Map<String, Value>) -> Map<String, Value> {
    let mut patch = Map::new();

    for key in original.keys() {
        if !modified.contains_key(key) {
            patch.insert(key.clone(), Value::Null);
        }
    }

    for (key, new_value) in modified {
        match original.get(key) {
            Some(old_value) if old_value == new_value => {}
            Some(Value::Object(old)) => {
                if let Value::Object(new) = new_value {
                    let nested = diff_objects(old, new);
                    if !nested.is_empty() {
                        patch.insert(key.clone(), Value::Object(nested));
                    }
                } else {
                    patch.insert(key.clone(), new_value.clone());
                }
            }
            // A null in the modified document would read as a deletion; dropping it keeps
            // the patch faithful to "field absent".
            None if new_value.is_null() => {}
            _ => {
                patch.insert(key.clone(), new_value.clone());
            }
        }
    }

    patch
}

/// Whether a patch would not change anything.
#[must_use]
pub fn is_empty_patch(patch: &Value) -> bool {
    matches!(patch, Value::Object(map) if map.is_empty())
}

#[cfg(test)]
#[path = "merge_patch_tests.rs"]
mod merge_patch_tests;
