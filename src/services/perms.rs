use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// Capability interface for the OS-specific parts of cache invalidation.
///
/// The clear-and-retry policy in `services::cache` is platform-independent;
/// only attribute stripping, ownership escalation, and tree deletion go
/// through this trait so other targets can substitute an equivalent
/// mechanism (or a test double) without touching the policy.
pub trait PermissionOps {
    /// Strip restrictive attributes (read-only bits) from every entry under `root`.
    fn strip_restrictive_attributes(&self, root: &Path) -> io::Result<()>;

    /// Take ownership of the tree and grant the current user full control,
    /// recursively.
    fn take_ownership(&self, root: &Path) -> io::Result<()>;

    fn remove_tree(&self, root: &Path) -> io::Result<()> {
        std::fs::remove_dir_all(root)
    }
}

pub struct HostPermissionOps;

impl PermissionOps for HostPermissionOps {
    fn strip_restrictive_attributes(&self, root: &Path) -> io::Result<()> {
        for entry in WalkDir::new(root) {
            let entry = entry.map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
            let meta = entry.metadata().map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
            let mut perms = meta.permissions();
            if perms.readonly() {
                perms.set_readonly(false);
                std::fs::set_permissions(entry.path(), perms)?;
            }
        }
        Ok(())
    }

    #[cfg(unix)]
    fn take_ownership(&self, root: &Path) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        for entry in WalkDir::new(root) {
            let entry = entry.map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
            let mode = if entry.file_type().is_dir() { 0o700 } else { 0o600 };
            std::fs::set_permissions(entry.path(), std::fs::Permissions::from_mode(mode))?;
        }
        Ok(())
    }

    #[cfg(windows)]
    fn take_ownership(&self, root: &Path) -> io::Result<()> {
        use std::process::Command;

        let user = std::env::var("USERNAME").unwrap_or_else(|_| "Administrators".to_string());
        let target = root.to_string_lossy().to_string();

        let takeown = Command::new("takeown")
            .args(["/F", &target, "/R", "/D", "Y"])
            .output()?;
        if !takeown.status.success() {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!(
                    "takeown failed for {}: {}",
                    target,
                    String::from_utf8_lossy(&takeown.stderr).trim()
                ),
            ));
        }

        let grant = format!("{}:F", user);
        let icacls = Command::new("icacls")
            .args([&target, "/grant", &grant, "/T", "/C", "/Q"])
            .output()?;
        if !icacls.status.success() {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!(
                    "icacls grant failed for {}: {}",
                    target,
                    String::from_utf8_lossy(&icacls.stderr).trim()
                ),
            ));
        }

        Ok(())
    }

    #[cfg(not(any(unix, windows)))]
    fn take_ownership(&self, _root: &Path) -> io::Result<()> {
        Ok(())
    }
}
