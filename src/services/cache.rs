use crate::package::PackageId;
use crate::services::perms::PermissionOps;
use std::io;
use std::path::{Path, PathBuf};

/// The evaluation engine extracts packages into a per-version cache and does
/// not reliably overwrite a prior extraction, so a stale tree (or one still
/// pinned by a file lock or an antivirus scan) can bias or block a local
/// evaluation. Clearing goes through every installed engine version.
#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    #[error("could not enumerate engine versions under {}: {}", .root.display(), .source)]
    ListVersions {
        root: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not clear cached package extraction(s): {}", fmt_paths(.failed))]
    ClearFailed { failed: Vec<PathBuf> },
}

fn fmt_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Installed versions of the evaluation engine, one directory per version.
/// A missing engine root means nothing is installed, not an error.
pub fn installed_engine_versions(engine_root: &Path) -> io::Result<Vec<PathBuf>> {
    if !engine_root.exists() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in std::fs::read_dir(engine_root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            out.push(entry.path());
        }
    }
    out.sort();
    Ok(out)
}

/// Remove every cached extraction of `id` under every installed engine
/// version. Restrictive attributes are stripped first; a deletion that still
/// fails is retried exactly once after taking ownership of the tree. Returns
/// the directories that were cleared, or fails wholesale listing every path
/// that survived escalation.
pub fn clear_package_cache(
    engine_root: &Path,
    id: &PackageId,
    perms: &dyn PermissionOps,
) -> Result<Vec<PathBuf>, CacheError> {
    let versions =
        installed_engine_versions(engine_root).map_err(|source| CacheError::ListVersions {
            root: engine_root.to_path_buf(),
            source,
        })?;

    let mut cleared = Vec::new();
    let mut failed = Vec::new();

    for version_dir in versions {
        let target = version_dir.join("packages").join(id.cache_key());
        if !target.is_dir() {
            continue;
        }

        if let Err(err) = perms.strip_restrictive_attributes(&target) {
            tracing::debug!(path = %target.display(), %err, "attribute strip incomplete");
        }

        match perms.remove_tree(&target) {
            Ok(()) => cleared.push(target),
            Err(first) => {
                tracing::warn!(
                    path = %target.display(),
                    %first,
                    "cache delete failed, escalating ownership"
                );
                let escalated = perms
                    .take_ownership(&target)
                    .and_then(|()| perms.remove_tree(&target));
                match escalated {
                    Ok(()) => cleared.push(target),
                    Err(second) => {
                        tracing::warn!(
                            path = %target.display(),
                            %second,
                            "cache delete failed after escalation"
                        );
                        failed.push(target);
                    }
                }
            }
        }
    }

    if failed.is_empty() {
        Ok(cleared)
    } else {
        Err(CacheError::ClearFailed { failed })
    }
}
