use crate::cli::EnsureState;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum PackageNameError {
    #[error("invalid package name {0:?} (letters, digits, '-' and '_' only)")]
    InvalidName(String),
    #[error("invalid package version {0:?} (dotted numeric, e.g. 1.0.0)")]
    InvalidVersion(String),
    #[error("archive name does not follow <name>-<version>: {0}")]
    UnrecognizedArchive(String),
}

/// Logical identity of a distributable package: `<name>-<version>`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct PackageId {
    pub name: String,
    pub version: String,
}

impl PackageId {
    pub fn new(name: &str, version: &str) -> Result<Self, PackageNameError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(PackageNameError::InvalidName(name.to_string()));
        }
        if !is_valid_version(version) {
            return Err(PackageNameError::InvalidVersion(version.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            version: version.to_string(),
        })
    }

    /// Key used by the evaluation engine when it extracts a package into its
    /// per-version cache: `<engine-root>/<engine-version>/packages/<key>`.
    pub fn cache_key(&self) -> String {
        format!("{}_{}", self.name, self.version)
    }

    pub fn archive_stem(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }

    pub fn archive_file_name(&self) -> String {
        format!("{}.tar.gz", self.archive_stem())
    }

    /// Recover the identity from an archive path. Package names may themselves
    /// contain '-', so the version is the shortest dotted-numeric suffix.
    pub fn from_archive_path(path: &Path) -> Result<Self, PackageNameError> {
        let file = path
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| PackageNameError::UnrecognizedArchive(path.display().to_string()))?;
        let stem = file.strip_suffix(".tar.gz").unwrap_or(file);
        for (idx, _) in stem.match_indices('-').rev() {
            let (name, version) = (&stem[..idx], &stem[idx + 1..]);
            if is_valid_version(version) {
                return PackageId::new(name, version);
            }
        }
        Err(PackageNameError::UnrecognizedArchive(stem.to_string()))
    }
}

fn is_valid_version(version: &str) -> bool {
    let parts: Vec<&str> = version.split('.').collect();
    !parts.is_empty()
        && parts.len() <= 4
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}

/// Declarative source for one compiled descriptor: a single service-account
/// existence/enablement audit on the target node.
#[derive(Debug, Clone)]
pub struct ConfigurationDoc {
    pub name: String,
    pub node: String,
    pub account: String,
    pub ensure: EnsureState,
    pub require_enabled: bool,
}

/// Render the compiled binary descriptor (MOF instance document) for one node.
pub fn render_descriptor(doc: &ConfigurationDoc) -> String {
    let ensure = match doc.ensure {
        EnsureState::Present => "Present",
        EnsureState::Absent => "Absent",
    };
    let disabled = if doc.require_enabled { "False" } else { "True" };
    format!(
        r#"/*
@TargetNode='{node}'
@GeneratedBy=steward
*/

instance of MSFT_UserResource as $AccountAudit
{{
    ResourceID = "[User]AccountAudit";
    UserName = "{account}";
    Ensure = "{ensure}";
    Disabled = {disabled};
    ModuleName = "PSDscResources";
    ModuleVersion = "2.12.0";
}};

instance of OMI_ConfigurationDocument
{{
    Version = "2.0.0";
    Name = "{name}";
}};
"#,
        node = doc.node,
        account = doc.account,
        ensure = ensure,
        disabled = disabled,
        name = doc.name,
    )
}

/// `manifest.json` inside a package archive.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PackageManifest {
    pub name: String,
    pub version: String,
    pub descriptor: String,
}

/// `metaconfig.json` inside a package archive. Field casing follows the
/// evaluation engine's expectations.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Metaconfig {
    #[serde(rename = "Type")]
    pub assignment_type: String,
    #[serde(rename = "Version")]
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::PackageId;
    use std::path::Path;

    #[test]
    fn cache_key_joins_name_and_version() {
        let id = PackageId::new("svc-audit", "1.2.0").expect("valid id");
        assert_eq!(id.cache_key(), "svc-audit_1.2.0");
        assert_eq!(id.archive_file_name(), "svc-audit-1.2.0.tar.gz");
    }

    #[test]
    fn archive_path_round_trips_names_with_dashes() {
        let id = PackageId::from_archive_path(Path::new("/tmp/out/svc-account-audit-1.0.0.tar.gz"))
            .expect("parse archive name");
        assert_eq!(id.name, "svc-account-audit");
        assert_eq!(id.version, "1.0.0");
    }

    #[test]
    fn rejects_bad_names_and_versions() {
        assert!(PackageId::new("", "1.0.0").is_err());
        assert!(PackageId::new("a/b", "1.0.0").is_err());
        assert!(PackageId::new("ok", "one.two").is_err());
        assert!(PackageId::from_archive_path(Path::new("noversion.tar.gz")).is_err());
    }
}
