//! Document tree operations shared by the in-memory store and the
//! event-stream mirror. Null and empty objects are never stored: writing
//! `null` removes a value and parents left empty disappear with it.

use serde_json::{Map, Value};

use super::path::StorePath;

pub fn get_at<'a>(root: &'a Value, path: &StorePath) -> Option<&'a Value> {
    let mut node = root;
    for segment in path.segments() {
        node = node.as_object()?.get(segment)?;
    }
    if node.is_null() { None } else { Some(node) }
}

pub fn set_at(root: &mut Value, path: &StorePath, value: Value) {
    set_in(root, path.segments(), prune(value));
}

/// Apply each child of `patch` below `path`, leaving siblings untouched.
/// Child keys may themselves be slash-separated paths.
pub fn merge_at(root: &mut Value, path: &StorePath, patch: Map<String, Value>) {
    for (key, value) in patch {
        let mut target = path.clone();
        for segment in key.split('/').filter(|s| !s.is_empty()) {
            match target.child(segment) {
                Ok(child) => target = child,
                Err(_) => return,
            }
        }
        set_at(root, &target, value);
    }
}

fn set_in(node: &mut Value, segments: &[String], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *node = value;
        return;
    };

    if !node.is_object() {
        if value.is_null() {
            return;
        }
        *node = Value::Object(Map::new());
    }

    let now_empty = match node {
        Value::Object(map) => {
            let child = map.entry(head.clone()).or_insert(Value::Null);
            set_in(child, rest, value);
            if child.is_null() {
                map.remove(head);
            }
            map.is_empty()
        }
        _ => false,
    };
    if now_empty {
        *node = Value::Null;
    }
}

fn prune(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let pruned: Map<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, prune(v)))
                .filter(|(_, v)| !v.is_null())
                .collect();
            if pruned.is_empty() {
                Value::Null
            } else {
                Value::Object(pruned)
            }
        }
        other => other,
    }
}
