//! Flags command - turn a YAML map into command line flags

use indexmap::IndexMap;
use kubemix_engine::Assembler;
use serde_json::Value as JsonValue;
use std::path::Path;

use crate::error::{CliError, Result};

pub fn run(file: &Path, prefix: Option<&str>) -> Result<()> {
    let content = std::fs::read_to_string(file).map_err(|e| CliError::io(file, e))?;
    let map: IndexMap<String, JsonValue> = serde_yaml::from_str(&content)?;

    let flags = Assembler::new().map_to_flags(&map, prefix);

    tracing::debug!(file = %file.display(), flags = flags.len(), "converted flags");
    for flag in flags {
        println!("{}", flag);
    }
    Ok(())
}
