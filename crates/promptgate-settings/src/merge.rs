use serde_json::Value as JsonValue;

/// Recursive key-wise merge: when both sides hold an object the keys merge,
/// otherwise the override replaces the base outright. Arrays are values,
/// not containers — they replace, never concatenate.
pub fn deep_merge(base: &JsonValue, overlay: &JsonValue) -> JsonValue {
    match (base, overlay) {
        (JsonValue::Object(base_map), JsonValue::Object(overlay_map)) => {
            let mut merged = base_map.clone();
            for (key, value) in overlay_map {
                let next = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), next);
            }
            JsonValue::Object(merged)
        }
        _ => overlay.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_objects_merge_key_wise() {
        let base = json!({"cost_policy": {"warn_increase_pct": 20, "block_increase_pct": 35}});
        let overlay = json!({"cost_policy": {"warn_increase_pct": 10}});
        let merged = deep_merge(&base, &overlay);
        assert_eq!(
            merged,
            json!({"cost_policy": {"warn_increase_pct": 10, "block_increase_pct": 35}})
        );
    }

    #[test]
    fn scalars_and_arrays_replace() {
        let base = json!({"allowlist": ["a", "b"], "enabled": true});
        let overlay = json!({"allowlist": ["c"], "enabled": false});
        let merged = deep_merge(&base, &overlay);
        assert_eq!(merged, json!({"allowlist": ["c"], "enabled": false}));
    }

    #[test]
    fn overlay_object_replaces_base_scalar() {
        let base = json!({"threshold": 5});
        let overlay = json!({"threshold": {"warn": 1}});
        let merged = deep_merge(&base, &overlay);
        assert_eq!(merged, json!({"threshold": {"warn": 1}}));
    }

    #[test]
    fn unknown_keys_pass_through() {
        let base = json!({"known": 1});
        let overlay = json!({"custom_section": {"x": true}});
        let merged = deep_merge(&base, &overlay);
        assert_eq!(merged["known"], json!(1));
        assert_eq!(merged["custom_section"], json!({"x": true}));
    }
}
