//! Field-level merging of decoded fragments.
//!
//! Fragments are merged left to right: a field set by a later fragment
//! replaces the earlier value, a field it leaves out keeps the earlier value.
//! Arrays are replaced entirely, not concatenated.

use serde_json::{Map, Value};

/// Deep merge two JSON values, with `overlay` taking precedence over `base`.
///
/// - Objects are merged recursively: keys in overlay override keys in base
/// - Arrays, strings, numbers, booleans, nulls are replaced entirely
/// - If overlay is null, the base value is preserved (null means "not set")
///
/// # Example
/// ```
/// use serde_json::json;
/// use agent_config::config::deep_merge;
///
/// let base = json!({
///     "node_name": "a",
///     "limits": { "http_max_conns_per_client": 200, "rpc_max_conns_per_client": 100 }
/// });
/// let overlay = json!({
///     "limits": { "http_max_conns_per_client": 50 }
/// });
/// let result = deep_merge(base, overlay);
/// assert_eq!(result, json!({
///     "node_name": "a",
///     "limits": { "http_max_conns_per_client": 50, "rpc_max_conns_per_client": 100 }
/// }));
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged_value = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged_value);
            }
            Value::Object(base_map)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Merge fragments in order, later ones taking precedence.
///
/// Starts from an empty object, so an empty input yields `{}`.
pub fn deep_merge_all(values: impl IntoIterator<Item = Value>) -> Value {
    values
        .into_iter()
        .fold(Value::Object(Map::new()), deep_merge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_simple_objects() {
        let base = json!({"a": 1, "b": 2});
        let overlay = json!({"b": 3, "c": 4});
        let result = deep_merge(base, overlay);
        assert_eq!(result, json!({"a": 1, "b": 3, "c": 4}));
    }

    #[test]
    fn test_merge_nested_section() {
        let base = json!({
            "ports": {"http": 8500, "dns": 8600},
            "server": true
        });
        let overlay = json!({
            "ports": {"http": -1}
        });
        let result = deep_merge(base, overlay);
        assert_eq!(
            result,
            json!({
                "ports": {"http": -1, "dns": 8600},
                "server": true
            })
        );
    }

    #[test]
    fn test_arrays_replaced_not_merged() {
        let base = json!({"items": [1, 2, 3]});
        let overlay = json!({"items": [4, 5]});
        let result = deep_merge(base, overlay);
        assert_eq!(result, json!({"items": [4, 5]}));
    }

    #[test]
    fn test_null_preserves_base() {
        let base = json!({"a": 1, "b": {"c": 2}});
        let overlay = json!({"a": null, "b": {"c": null}});
        let result = deep_merge(base, overlay);
        assert_eq!(result, json!({"a": 1, "b": {"c": 2}}));
    }

    #[test]
    fn test_merge_all_last_write_wins() {
        let values = vec![json!({"a": 1}), json!({"b": 2}), json!({"a": 3, "c": 4})];
        let result = deep_merge_all(values);
        assert_eq!(result, json!({"a": 3, "b": 2, "c": 4}));
    }

    #[test]
    fn test_merge_all_empty_is_empty_object() {
        assert_eq!(deep_merge_all(Vec::new()), json!({}));
    }

    #[test]
    fn test_merge_all_is_repeatable() {
        let values = vec![
            json!({"node_name": "a", "limits": {"http_max_conns_per_client": 1}}),
            json!({"limits": {"rpc_max_conns_per_client": 2}}),
            json!({"node_name": "b"}),
        ];
        assert_eq!(deep_merge_all(values.clone()), deep_merge_all(values));
    }

    #[test]
    fn test_overlay_replaces_object_with_primitive() {
        let base = json!({"value": {"nested": true}});
        let overlay = json!({"value": 42});
        let result = deep_merge(base, overlay);
        assert_eq!(result, json!({"value": 42}));
    }
}
