use serde_json::Value;

/// Merge `patch` into `target` the way a document update does: objects are
/// merged key by key, anything else (including `null` and arrays) replaces
/// the existing value.
pub fn merge(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target_map), Value::Object(patch_map)) => {
            for (key, patch_value) in patch_map {
                let nested = patch_value.is_object()
                    && target_map.get(key).is_some_and(Value::is_object);
                if nested {
                    if let Some(existing) = target_map.get_mut(key) {
                        merge(existing, patch_value);
                    }
                } else {
                    target_map.insert(key.clone(), patch_value.clone());
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}
