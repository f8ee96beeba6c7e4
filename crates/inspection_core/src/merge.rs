//! Merge primitives for the answer aggregate.
//!
//! `serde_json` is built with `preserve_order`, so object key order is
//! insertion order everywhere in this module. Field-order fidelity in the
//! final aggregate depends on that.

use serde_json::{Map, Value};

/// Keys scraped from a first-section payload into `metadata`.
pub const METADATA_KEYS: [&str; 5] = ["date", "inspector", "location", "scale_id_serial_no", "model"];

/// Recursive deep merge. Objects merge key-wise; scalars and arrays from
/// `incoming` replace what `base` held.
pub fn deep_merge(base: &mut Value, incoming: Value) {
    match (base, incoming) {
        (Value::Object(base_map), Value::Object(incoming_map)) => {
            for (k, v) in incoming_map {
                match base_map.get_mut(&k) {
                    Some(slot) => deep_merge(slot, v),
                    None => {
                        base_map.insert(k, v);
                    }
                }
            }
        }
        (slot, incoming) => *slot = incoming,
    }
}

/// Merge a remarks payload onto an existing one.
///
/// Remarks are a string in some clients and an object in others. The
/// existing type is preserved when the writer agrees; on a type mismatch
/// the writer wins.
pub fn merge_remarks(existing: Option<&Value>, incoming: Value) -> Value {
    match (existing, incoming) {
        (Some(Value::Object(old)), Value::Object(new)) => {
            let mut merged = Value::Object(old.clone());
            deep_merge(&mut merged, Value::Object(new));
            merged
        }
        (_, incoming) => incoming,
    }
}

/// Reduce a remarks-section payload to the remarks value itself.
///
/// The mobile client posts `{ <anything>: { comment: "..." } }` for the
/// remarks screen; the aggregate stores the comment string. A plain string
/// or a `{ remarks: ... }` wrapper passes through; anything else is kept
/// verbatim as an object.
pub fn extract_remarks_payload(payload: Value) -> Value {
    match payload {
        Value::Object(map) => {
            if let Some(inner) = map.get("remarks") {
                return inner.clone();
            }
            // Single wrapper object holding a comment: unwrap to the string.
            if map.len() == 1 {
                if let Some(Value::Object(inner)) = map.values().next() {
                    if let Some(comment) = inner.get("comment") {
                        return comment.clone();
                    }
                }
            }
            Value::Object(map)
        }
        other => other,
    }
}

/// Scrape recognized metadata keys (plus root `remarks`/`signatures`) out of
/// a first-section payload. The scraped keys are removed so they do not
/// appear as field answers. Returns `(metadata, remarks, signatures)`.
pub fn extract_metadata(payload: &mut Value) -> (Option<Value>, Option<Value>, Option<Value>) {
    let Some(map) = payload.as_object_mut() else {
        return (None, None, None);
    };

    let mut metadata = Map::new();
    for key in METADATA_KEYS {
        if let Some(v) = map.shift_remove(key) {
            metadata.insert(key.to_string(), v);
        }
    }
    let remarks = map.shift_remove("remarks");
    let signatures = map.shift_remove("signatures");

    let metadata = if metadata.is_empty() {
        None
    } else {
        Some(Value::Object(metadata))
    };
    (metadata, remarks, signatures)
}

/// Rewrite a section object so iteration yields the template's declared
/// field order, with unknown extras appended in their insertion order.
pub fn reorder_section_fields(section: &Value, declared: &[String]) -> Value {
    let Some(map) = section.as_object() else {
        return section.clone();
    };

    let mut ordered = Map::new();
    for id in declared {
        if let Some(v) = map.get(id) {
            ordered.insert(id.clone(), v.clone());
        }
    }
    for (k, v) in map {
        if !ordered.contains_key(k) {
            ordered.insert(k.clone(), v.clone());
        }
    }
    Value::Object(ordered)
}

/// True when a metadata value exists and carries at least one key.
pub fn metadata_is_populated(v: Option<&Value>) -> bool {
    matches!(v, Some(Value::Object(m)) if !m.is_empty())
}
