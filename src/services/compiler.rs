use crate::domain::models::CompileReport;
use crate::package::{render_descriptor, ConfigurationDoc};
use std::path::Path;

/// Compile the declarative configuration into one descriptor file named after
/// the target node. Recompiling replaces the previous descriptor.
pub fn compile_configuration(doc: &ConfigurationDoc, out_dir: &Path) -> anyhow::Result<CompileReport> {
    if doc.account.trim().is_empty() {
        anyhow::bail!("account name must not be empty");
    }
    if doc.node.trim().is_empty() || doc.node.contains(['/', '\\']) {
        anyhow::bail!("invalid target node name: {:?}", doc.node);
    }

    std::fs::create_dir_all(out_dir)?;
    let path = out_dir.join(format!("{}.mof", doc.node));
    std::fs::write(&path, render_descriptor(doc))?;
    tracing::info!(node = %doc.node, descriptor = %path.display(), "configuration compiled");

    Ok(CompileReport {
        configuration: doc.name.clone(),
        node: doc.node.clone(),
        descriptor: path.display().to_string(),
    })
}
