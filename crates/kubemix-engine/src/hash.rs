//! Content hashing for rollout triggers

use kubemix_core::Resource;
use md5::{Digest, Md5};

use crate::error::Result;

/// MD5 hex digest of a resource's compact JSON form
///
/// Used as the `<name>-hash` pod template annotation: any change to the hashed
/// object changes the pod template, which makes the workload roll.
pub fn content_hash(resource: &Resource) -> Result<String> {
    let serialized = serde_json::to_string(resource.inner())?;
    let mut hasher = Md5::new();
    hasher.update(serialized.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Annotation key carrying the content hash of `name`
pub fn hash_annotation_key(name: &str) -> String {
    format!("{}-hash", name)
}
