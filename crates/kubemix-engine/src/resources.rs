//! Container resource requests and limits

use serde_json::{Map, Value as JsonValue, json};

/// Map containing only the quantities that are set
fn quantities(cpu: Option<&str>, memory: Option<&str>) -> JsonValue {
    let mut map = Map::new();
    if let Some(cpu) = cpu {
        map.insert("cpu".to_string(), JsonValue::String(cpu.to_string()));
    }
    if let Some(memory) = memory {
        map.insert("memory".to_string(), JsonValue::String(memory.to_string()));
    }
    JsonValue::Object(map)
}

/// Container mixin setting `resources.requests`
///
/// Unset quantities are left out; with neither set the requests map is empty
/// but present.
pub fn resources_requests(cpu: Option<&str>, memory: Option<&str>) -> JsonValue {
    json!({ "resources": { "requests": quantities(cpu, memory) } })
}

/// Container mixin setting `resources.limits`
pub fn resources_limits(cpu: Option<&str>, memory: Option<&str>) -> JsonValue {
    json!({ "resources": { "limits": quantities(cpu, memory) } })
}

/// Container mixin setting both requests and limits, each as `(cpu, memory)`
pub fn resources(
    requests: (Option<&str>, Option<&str>),
    limits: (Option<&str>, Option<&str>),
) -> JsonValue {
    json!({
        "resources": {
            "requests": quantities(requests.0, requests.1),
            "limits": quantities(limits.0, limits.1),
        }
    })
}
