//! Manifest output formatting

use kubemix_core::Resource;

use crate::error::Result;

/// Serialize a resource to a YAML document
///
/// The document has no leading `---` and ends with a newline. Nothing is
/// validated: whatever was assembled is written as-is.
pub fn to_yaml(resource: &Resource) -> Result<String> {
    let yaml = serde_yaml::to_string(resource.inner())?;
    let yaml = yaml.trim_start_matches("---\n");

    let mut doc = String::with_capacity(yaml.len() + 1);
    doc.push_str(yaml);
    if !doc.ends_with('\n') {
        doc.push('\n');
    }
    Ok(doc)
}

/// Serialize several resources to one multi-document YAML stream
pub fn to_yaml_stream(resources: &[Resource]) -> Result<String> {
    let docs = resources
        .iter()
        .map(to_yaml)
        .collect::<Result<Vec<_>>>()?;
    Ok(docs.join("---\n"))
}

/// Serialize a resource to pretty-printed JSON
pub fn to_json_pretty(resource: &Resource) -> Result<String> {
    Ok(serde_json::to_string_pretty(resource.inner())?)
}
