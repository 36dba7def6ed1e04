use crate::domain::models::EvaluationReport;
use crate::package::PackageId;
use crate::services::cache::clear_package_cache;
use crate::services::perms::PermissionOps;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("evaluation engine binary not found: {}", .0.display())]
    BinaryMissing(PathBuf),
    #[error("evaluation engine denied access to the package cache at {}", .path.display())]
    CacheAccessDenied { path: PathBuf },
    #[error("evaluation engine failed: {0}")]
    Failed(String),
    #[error("could not parse the engine report: {0}")]
    ReportParse(#[from] serde_json::Error),
    #[error("could not launch the evaluation engine: {0}")]
    Launch(#[from] io::Error),
}

/// Local desired-state evaluation surface. One host implementation drives the
/// platform's engine binary; tests substitute a scripted double.
pub trait Engine {
    fn evaluate(
        &self,
        package: &Path,
        parameters: &[(String, String)],
    ) -> Result<EvaluationReport, EngineError>;

    fn test(&self, descriptor_folder: &Path) -> Result<EvaluationReport, EngineError>;

    fn apply(&self, descriptor_folder: &Path) -> Result<(), EngineError>;
}

pub struct EngineCli {
    pub binary: PathBuf,
}

impl EngineCli {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }

    fn run(&self, args: &[String]) -> Result<String, EngineError> {
        let output = Command::new(&self.binary).args(args).output().map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                EngineError::BinaryMissing(self.binary.clone())
            } else {
                EngineError::Launch(err)
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if let Some(path) = detect_cache_denial(&stderr) {
                return Err(EngineError::CacheAccessDenied { path });
            }
            return Err(EngineError::Failed(stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl Engine for EngineCli {
    fn evaluate(
        &self,
        package: &Path,
        parameters: &[(String, String)],
    ) -> Result<EvaluationReport, EngineError> {
        let mut args = vec![
            "evaluate".to_string(),
            "--package".to_string(),
            package.display().to_string(),
            "--format".to_string(),
            "json".to_string(),
        ];
        for (key, value) in parameters {
            args.push("--parameter".to_string());
            args.push(format!("{}={}", key, value));
        }
        let stdout = self.run(&args)?;
        Ok(serde_json::from_str(&stdout)?)
    }

    fn test(&self, descriptor_folder: &Path) -> Result<EvaluationReport, EngineError> {
        let stdout = self.run(&[
            "test".to_string(),
            "--path".to_string(),
            descriptor_folder.display().to_string(),
            "--format".to_string(),
            "json".to_string(),
        ])?;
        Ok(serde_json::from_str(&stdout)?)
    }

    fn apply(&self, descriptor_folder: &Path) -> Result<(), EngineError> {
        self.run(&[
            "apply".to_string(),
            "--path".to_string(),
            descriptor_folder.display().to_string(),
        ])?;
        Ok(())
    }
}

/// An engine failure counts as cache contention only when it names both an
/// access denial and a path inside a `packages` cache.
fn detect_cache_denial(stderr: &str) -> Option<PathBuf> {
    let lower = stderr.to_ascii_lowercase();
    if !(lower.contains("access is denied")
        || lower.contains("permission denied")
        || (lower.contains("access") && lower.contains("denied")))
    {
        return None;
    }
    stderr
        .split_whitespace()
        .map(|token| token.trim_matches(|c| matches!(c, '\'' | '"' | ',' | ';' | ':')))
        .find(|token| token.contains("/packages/") || token.contains("\\packages\\"))
        .map(PathBuf::from)
}

/// Evaluate a package, recovering exactly once from a stale or locked cache:
/// on a first cache access denial the cached extraction is cleared and the
/// evaluation retried. Any other failure, or a second one, propagates.
pub fn evaluate_with_retry(
    engine: &dyn Engine,
    package: &Path,
    id: &PackageId,
    parameters: &[(String, String)],
    engine_root: &Path,
    perms: &dyn PermissionOps,
) -> anyhow::Result<EvaluationReport> {
    match engine.evaluate(package, parameters) {
        Ok(report) => Ok(report),
        Err(EngineError::CacheAccessDenied { path }) => {
            tracing::warn!(
                path = %path.display(),
                "evaluation blocked by the package cache, clearing and retrying"
            );
            let cleared = clear_package_cache(engine_root, id, perms)?;
            tracing::info!(count = cleared.len(), "cleared cached package extractions");
            Ok(engine.evaluate(package, parameters)?)
        }
        Err(err) => Err(err.into()),
    }
}
