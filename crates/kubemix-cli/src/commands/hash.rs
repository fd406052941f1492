//! Hash command - print the content hash of a resource

use kubemix_core::Resource;
use kubemix_engine::content_hash;
use std::path::Path;

use crate::error::{CliError, Result};

pub fn run(file: &Path) -> Result<()> {
    let content = std::fs::read_to_string(file).map_err(|e| CliError::io(file, e))?;
    let resource = Resource::from_yaml(&content)?;
    println!("{}", content_hash(&resource)?);
    Ok(())
}
