//! Expansion of dotted query keys into nested objects.
//!
//! `filters.name=ann` becomes `{ "filters": { "name": "ann" } }`. Keys with an
//! empty segment (`.a`, `a.`, `a..b`) are kept literally. When two keys claim
//! the same position the first one wins and later ones are dropped.

use serde_json::{Map, Value};

pub fn normalize<I, K>(pairs: I) -> Map<String, Value>
where
    I: IntoIterator<Item = (K, Value)>,
    K: AsRef<str>,
{
    let mut out = Map::new();
    for (key, value) in pairs {
        insert_path(&mut out, key.as_ref(), value);
    }
    out
}

/// Normalize query-string pairs, keeping every value as a string.
pub fn normalize_query(pairs: &[(String, String)]) -> Map<String, Value> {
    normalize(pairs.iter().map(|(k, v)| (k.as_str(), Value::String(v.clone()))))
}

fn insert_path(out: &mut Map<String, Value>, key: &str, value: Value) {
    let segments: Vec<&str> = key.split('.').collect();
    if segments.len() == 1 || segments.iter().any(|s| s.is_empty()) {
        if !out.contains_key(key) {
            out.insert(key.to_string(), value);
        }
        return;
    }

    let (leaf, parents) = match segments.split_last() {
        Some(split) => split,
        None => return,
    };

    let mut cursor = out;
    for segment in parents {
        let slot = cursor
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        cursor = match slot {
            Value::Object(map) => map,
            // Path runs into an earlier scalar; first writer wins
            _ => return,
        };
    }
    if !cursor.contains_key(*leaf) {
        cursor.insert(leaf.to_string(), value);
    }
}
