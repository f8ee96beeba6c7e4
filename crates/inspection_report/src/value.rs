//! The value tree consumed by the placeholder engine.
//!
//! The template handler accepts both nested paths (`d.contractor.company`
//! walked key by key) and dot-flattened keys (the full dotted path as one
//! map key), so the hydrated tree is emitted twice: once nested and once
//! flat. [`Context::resolve`] tries loop scopes, then the flat index, then
//! a nested walk.

use std::collections::HashMap;

use serde_json::Value;

use crate::media::ImageContent;

#[derive(Debug, Clone, PartialEq)]
pub enum TplValue {
    Null,
    Text(String),
    Bool(bool),
    /// Order-preserving map; template iteration order follows insertion.
    Map(Vec<(String, TplValue)>),
    List(Vec<TplValue>),
    Image(ImageContent),
}

impl TplValue {
    pub fn map() -> Self {
        TplValue::Map(Vec::new())
    }

    pub fn get(&self, key: &str) -> Option<&TplValue> {
        match self {
            TplValue::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Insert or replace a key in a map value. No-op on non-maps.
    pub fn set(&mut self, key: impl Into<String>, value: TplValue) {
        if let TplValue::Map(entries) = self {
            let key = key.into();
            match entries.iter_mut().find(|(k, _)| *k == key) {
                Some((_, slot)) => *slot = value,
                None => entries.push((key, value)),
            }
        }
    }

    /// Ensure a nested map exists at `key` and return it.
    pub fn entry_map(&mut self, key: &str) -> &mut TplValue {
        if let TplValue::Map(entries) = self {
            if !entries.iter().any(|(k, _)| k == key) {
                entries.push((key.to_string(), TplValue::map()));
            }
            return entries
                .iter_mut()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v)
                .expect("just inserted");
        }
        panic!("entry_map on non-map value");
    }

    /// Walk a dotted path through nested maps.
    pub fn get_path(&self, path: &str) -> Option<&TplValue> {
        let mut current = self;
        for part in path.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// Truthiness for boolean-gated containers.
    pub fn is_truthy(&self) -> bool {
        match self {
            TplValue::Null => false,
            TplValue::Bool(b) => *b,
            TplValue::Text(s) => !s.is_empty(),
            TplValue::List(items) => !items.is_empty(),
            TplValue::Map(_) | TplValue::Image(_) => true,
        }
    }

    /// Scalar rendering; unresolvable shapes render empty.
    pub fn as_text(&self) -> String {
        match self {
            TplValue::Text(s) => s.clone(),
            TplValue::Bool(b) => b.to_string(),
            _ => String::new(),
        }
    }

    /// Convert plain JSON (no images) into a template value.
    pub fn from_json(v: &Value) -> TplValue {
        match v {
            Value::Null => TplValue::Null,
            Value::Bool(b) => TplValue::Bool(*b),
            Value::Number(n) => TplValue::Text(n.to_string()),
            Value::String(s) => TplValue::Text(s.clone()),
            Value::Array(items) => TplValue::List(items.iter().map(TplValue::from_json).collect()),
            Value::Object(map) => TplValue::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), TplValue::from_json(v)))
                    .collect(),
            ),
        }
    }
}

/// Build a loop record: `{ image, index, total, isFirst, isLast }`.
pub fn loop_record(image: ImageContent, index: usize, total: usize) -> TplValue {
    TplValue::Map(vec![
        ("image".into(), TplValue::Image(image)),
        ("index".into(), TplValue::Text((index + 1).to_string())),
        ("total".into(), TplValue::Text(total.to_string())),
        ("isFirst".into(), TplValue::Bool(index == 0)),
        ("isLast".into(), TplValue::Bool(index + 1 == total)),
    ])
}

/// Root context handed to the renderer.
pub struct Context {
    root: TplValue,
    flat: HashMap<String, TplValue>,
}

impl Context {
    pub fn new(root: TplValue) -> Self {
        let mut flat = HashMap::new();
        flatten_into("", &root, &mut flat);
        Self { root, flat }
    }

    /// Resolve a path against loop scopes (innermost first), then the flat
    /// index, then a nested walk from the root.
    pub fn resolve<'a>(&'a self, path: &str, scopes: &'a [TplValue]) -> Option<&'a TplValue> {
        for scope in scopes.iter().rev() {
            if let Some(v) = scope.get_path(path) {
                return Some(v);
            }
        }
        if let Some(v) = self.flat.get(path) {
            return Some(v);
        }
        self.root.get_path(path)
    }
}

fn flatten_into(prefix: &str, value: &TplValue, out: &mut HashMap<String, TplValue>) {
    if let TplValue::Map(entries) = value {
        for (k, v) in entries {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            out.insert(path.clone(), v.clone());
            flatten_into(&path, v, out);
        }
    }
}
