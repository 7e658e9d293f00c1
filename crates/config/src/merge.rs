use serde_json::Value;

/// Recursively merge `overlay` into `base`.
///
/// Objects are merged key by key. Any other overlay value, including
/// arrays and `null`, replaces what was in `base`.
pub fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base_map.insert(key, value);
                    },
                }
            }
        },
        (slot, value) => *slot = value,
    }
}
