//! Render command - assemble every resource of a plan

use console::style;
use kubemix_core::Resource;
use kubemix_engine::format;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CliError, Result};
use crate::plan::Plan;

/// File name of a rendered resource, `<kind>-<name>.yaml` in lowercase
pub fn file_name(resource: &Resource) -> String {
    format!(
        "{}-{}.yaml",
        resource.kind().unwrap_or("resource"),
        resource.name().unwrap_or("unnamed")
    )
    .to_lowercase()
}

pub fn run(plan_path: &Path, output_dir: Option<&Path>, set_values: &[String]) -> Result<()> {
    let plan = Plan::load(plan_path, set_values)?;
    let base_dir = plan_path.parent().unwrap_or_else(|| Path::new("."));

    tracing::debug!(
        plan = %plan_path.display(),
        workloads = plan.workloads.len(),
        rbac = plan.rbac.len(),
        "loaded plan"
    );

    let resources = plan.assemble(&plan.assembler(), base_dir)?;

    match output_dir {
        Some(dir) => write_files(dir, &resources)?,
        None => print!("{}", format::to_yaml_stream(&resources)?),
    }

    Ok(())
}

fn write_files(dir: &Path, resources: &[Resource]) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| CliError::io(dir, e))?;

    for resource in resources {
        let path: PathBuf = dir.join(file_name(resource));
        fs::write(&path, format::to_yaml(resource)?).map_err(|e| CliError::io(&path, e))?;
        eprintln!("{} {}", style("wrote").green(), path.display());
    }

    Ok(())
}
