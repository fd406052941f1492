//! Command line flag and environment helpers

use indexmap::IndexMap;
use serde_json::{Value as JsonValue, json};

/// Render a scalar the way it appears on a command line
fn scalar_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Convert an option map to `<prefix><key>=<value>` flags
///
/// Entries keep the map's order; `null` values are skipped.
///
/// ```
/// use indexmap::IndexMap;
/// use serde_json::json;
///
/// let mut opts = IndexMap::new();
/// opts.insert("log.level".to_string(), json!("info"));
/// opts.insert("server.port".to_string(), json!(8080));
/// opts.insert("unset".to_string(), json!(null));
///
/// let flags = kubemix_engine::flags::map_to_flags(&opts, "-");
/// assert_eq!(flags, vec!["-log.level=info", "-server.port=8080"]);
/// ```
pub fn map_to_flags(map: &IndexMap<String, JsonValue>, prefix: &str) -> Vec<String> {
    map.iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| format!("{}{}={}", prefix, key, scalar_text(value)))
        .collect()
}

/// Container mixin setting `env` from a map, in map order, skipping `null`s
pub fn env_map(map: &IndexMap<String, JsonValue>) -> JsonValue {
    let env: Vec<JsonValue> = map
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(name, value)| json!({"name": name, "value": scalar_text(value)}))
        .collect();

    json!({ "env": env })
}
