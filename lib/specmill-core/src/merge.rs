use indexmap::IndexMap;
use serde_json::Value;

use crate::Body;

/// Recursively merges `update` into `target`.
///
/// Mappings present on both sides are merged key by key; any other value from `update`
/// replaces the one in `target`. New keys are appended, so existing key order is kept.
pub(crate) fn deep_merge(target: &mut Body, update: Body) {
    for (key, value) in update {
        if let Some(existing) = target.get_mut(&key) {
            match (existing, value) {
                (Value::Object(existing), Value::Object(nested)) => deep_merge(existing, nested),
                (existing, value) => *existing = value,
            }
        } else {
            target.insert(key, value);
        }
    }
}

/// Adds the keys of `contribution` that `target` does not have yet.
///
/// Keys already in `target` always win, so folding contributions in order gives
/// "caller first, then first contributor".
pub(crate) fn merge_missing<V>(target: &mut IndexMap<String, V>, contribution: IndexMap<String, V>) {
    for (key, value) in contribution {
        target.entry(key).or_insert(value);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn body(value: Value) -> Body {
        match value {
            Value::Object(map) => map,
            other => panic!("expected an object, got {other}"),
        }
    }

    #[test]
    fn should_merge_nested_mappings_and_overwrite_leaves() {
        let mut target = body(json!({
            "info": {"title": "Pets", "version": "1.0.0"},
            "tags": ["a"],
            "x-logo": "old"
        }));

        deep_merge(
            &mut target,
            body(json!({
                "info": {"description": "All the pets"},
                "tags": ["b"],
                "x-logo": {"url": "logo.png"}
            })),
        );

        assert_eq!(
            Value::Object(target),
            json!({
                "info": {"title": "Pets", "version": "1.0.0", "description": "All the pets"},
                "tags": ["b"],
                "x-logo": {"url": "logo.png"}
            })
        );
    }

    #[test]
    fn should_keep_existing_keys_first() {
        let mut target = IndexMap::from([("type".to_string(), 1), ("format".to_string(), 2)]);

        merge_missing(
            &mut target,
            IndexMap::from([("format".to_string(), 20), ("title".to_string(), 30)]),
        );

        let entries = target.into_iter().collect::<Vec<_>>();
        assert_eq!(
            entries,
            [
                ("type".to_string(), 1),
                ("format".to_string(), 2),
                ("title".to_string(), 30)
            ]
        );
    }
}
