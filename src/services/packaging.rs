use crate::cli::AssignmentType;
use crate::domain::models::PackageReport;
use crate::package::{Metaconfig, PackageId, PackageManifest};
use flate2::write::GzEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum PackageError {
    #[error("descriptor not found: {} (run `steward compile` first)", .0.display())]
    DescriptorMissing(PathBuf),
    #[error("package already exists: {} (pass --force to replace it)", .0.display())]
    AlreadyExists(PathBuf),
}

/// Bundle one compiled descriptor plus metadata into `<name>-<version>.tar.gz`.
pub fn create_package(
    descriptor: &Path,
    id: &PackageId,
    assignment_type: AssignmentType,
    out_dir: &Path,
    force: bool,
) -> anyhow::Result<PackageReport> {
    if !descriptor.is_file() {
        return Err(PackageError::DescriptorMissing(descriptor.to_path_buf()).into());
    }
    std::fs::create_dir_all(out_dir)?;

    let archive_path = out_dir.join(id.archive_file_name());
    if archive_path.exists() {
        if !force {
            return Err(PackageError::AlreadyExists(archive_path).into());
        }
        std::fs::remove_file(&archive_path)?;
    }

    let descriptor_name = descriptor
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("configuration.mof")
        .to_string();
    let manifest = PackageManifest {
        name: id.name.clone(),
        version: id.version.clone(),
        descriptor: descriptor_name.clone(),
    };
    let metaconfig = Metaconfig {
        assignment_type: assignment_type.metaconfig_value().to_string(),
        version: id.version.clone(),
    };

    let gz = GzEncoder::new(File::create(&archive_path)?, Compression::default());
    let mut builder = tar::Builder::new(gz);
    builder.append_path_with_name(descriptor, &descriptor_name)?;
    append_json(&mut builder, "manifest.json", &manifest)?;
    append_json(&mut builder, "metaconfig.json", &metaconfig)?;
    builder.into_inner()?.finish()?;

    let bytes = std::fs::read(&archive_path)?;
    let sha256 = hex::encode(Sha256::digest(&bytes));
    tracing::info!(
        package = %id.archive_stem(),
        path = %archive_path.display(),
        "package archive created"
    );

    Ok(PackageReport {
        name: id.name.clone(),
        version: id.version.clone(),
        package_name: id.archive_stem(),
        path: archive_path.display().to_string(),
        sha256,
    })
}

fn append_json<W: std::io::Write, T: serde::Serialize>(
    builder: &mut tar::Builder<W>,
    name: &str,
    value: &T,
) -> anyhow::Result<()> {
    let data = serde_json::to_vec_pretty(value)?;
    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, name, data.as_slice())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{create_package, PackageError};
    use crate::cli::AssignmentType;
    use crate::package::PackageId;
    use std::fs;
    use std::path::{Path, PathBuf};

    fn write_descriptor(dir: &Path) -> PathBuf {
        let path = dir.join("web-01.mof");
        fs::write(&path, "instance of MSFT_UserResource {};\n").expect("write descriptor");
        path
    }

    #[test]
    fn creates_named_archive_with_hash() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let descriptor = write_descriptor(tmp.path());
        let id = PackageId::new("svc-audit", "1.0.0").expect("valid id");

        let report = create_package(
            &descriptor,
            &id,
            AssignmentType::Audit,
            &tmp.path().join("packages"),
            false,
        )
        .expect("create package");

        assert_eq!(report.package_name, "svc-audit-1.0.0");
        assert!(PathBuf::from(&report.path).is_file());
        assert_eq!(report.sha256.len(), 64);
    }

    #[test]
    fn second_run_conflicts_unless_forced() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let descriptor = write_descriptor(tmp.path());
        let id = PackageId::new("svc-audit", "1.0.0").expect("valid id");
        let out = tmp.path().join("packages");

        create_package(&descriptor, &id, AssignmentType::Audit, &out, false)
            .expect("first create");

        let err = create_package(&descriptor, &id, AssignmentType::Audit, &out, false)
            .expect_err("conflict");
        assert!(matches!(
            err.downcast_ref::<PackageError>(),
            Some(PackageError::AlreadyExists(_))
        ));

        let replaced = create_package(&descriptor, &id, AssignmentType::Audit, &out, true)
            .expect("forced replace");
        assert!(PathBuf::from(&replaced.path).is_file());
    }

    #[test]
    fn missing_descriptor_is_a_precondition_failure() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let id = PackageId::new("svc-audit", "1.0.0").expect("valid id");

        let err = create_package(
            &tmp.path().join("absent.mof"),
            &id,
            AssignmentType::Audit,
            &tmp.path().join("packages"),
            false,
        )
        .expect_err("missing descriptor");
        assert!(matches!(
            err.downcast_ref::<PackageError>(),
            Some(PackageError::DescriptorMissing(_))
        ));
    }
}
