//! Structural deep merge of JSON-shaped resources
//!
//! Conflict policy:
//! - Scalars: overlay replaces base (including `null`)
//! - Objects: recursive merge, keys only present in the overlay are added
//! - Arrays: depends on [`ListStrategy`]

use serde_json::Value as JsonValue;

/// How conflicting arrays are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListStrategy {
    /// Overlay array replaces the base array
    #[default]
    Replace,
    /// Overlay elements are appended after the base elements (mixin convention)
    Append,
}

/// Deep merge `overlay` into `base` in place
pub fn deep_merge(base: &mut JsonValue, overlay: &JsonValue, lists: ListStrategy) {
    match (base, overlay) {
        (JsonValue::Object(base_map), JsonValue::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value, lists),
                    None => {
                        base_map.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
        }
        (JsonValue::Array(base_items), JsonValue::Array(overlay_items))
            if lists == ListStrategy::Append =>
        {
            base_items.extend(overlay_items.iter().cloned());
        }
        (base, overlay) => {
            *base = overlay.clone();
        }
    }
}

/// Merge two values without touching either input
pub fn merged(base: &JsonValue, overlay: &JsonValue, lists: ListStrategy) -> JsonValue {
    let mut result = base.clone();
    deep_merge(&mut result, overlay, lists);
    result
}
