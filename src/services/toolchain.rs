use crate::domain::models::{CheckItem, DoctorReport, ToolStatus};
use crate::services::settings::Settings;
use flate2::read::GzDecoder;
use serde::Deserialize;
use std::cmp::Ordering;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Dotted-numeric tool version, e.g. `2.12.0`. Comparison pads missing
/// parts with zero, so `1.2` and `1.2.0` are equal.
#[derive(Debug, Clone)]
pub struct Version {
    parts: Vec<u64>,
    raw: String,
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl FromStr for Version {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let parts = s
            .split('.')
            .map(|p| p.parse::<u64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| anyhow::anyhow!("invalid version: {:?}", s))?;
        if parts.is_empty() || parts.len() > 4 {
            anyhow::bail!("invalid version: {:?}", s);
        }
        Ok(Self {
            parts,
            raw: s.to_string(),
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        for i in 0..len {
            let a = self.parts.get(i).copied().unwrap_or(0);
            let b = other.parts.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                non_eq => return non_eq,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone)]
pub enum VersionReq {
    AtLeast(Version),
    Exactly(Version),
}

impl VersionReq {
    pub fn matches(&self, candidate: &Version) -> bool {
        match self {
            VersionReq::AtLeast(min) => candidate >= min,
            VersionReq::Exactly(pinned) => candidate == pinned,
        }
    }
}

impl fmt::Display for VersionReq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionReq::AtLeast(v) => write!(f, ">={}", v),
            VersionReq::Exactly(v) => write!(f, "={}", v),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ToolRequirement {
    pub name: String,
    pub requirement: VersionReq,
}

/// Installs a tool version into `<tool_dir>/<version>/` and reports which
/// version landed.
pub trait ToolInstaller {
    fn install(
        &self,
        name: &str,
        requirement: &VersionReq,
        tool_dir: &Path,
    ) -> anyhow::Result<Version>;
}

/// Shared environment-preparation routine used by every step that needs an
/// external dependency: reuse the highest installed version satisfying the
/// requirement, install only when nothing satisfies it.
pub fn ensure_tool(
    registry: &Path,
    requirement: &ToolRequirement,
    installer: Option<&dyn ToolInstaller>,
) -> anyhow::Result<ToolStatus> {
    let tool_dir = registry.join(&requirement.name);

    if let Some(best) = best_installed(&tool_dir, &requirement.requirement)? {
        return Ok(ToolStatus {
            name: requirement.name.clone(),
            path: tool_dir.join(best.to_string()).display().to_string(),
            version: best.to_string(),
            freshly_installed: false,
        });
    }

    let Some(installer) = installer else {
        anyhow::bail!(
            "tool {} {} is not installed and no tool index is configured (set [tools].index_url or install it under {})",
            requirement.name,
            requirement.requirement,
            tool_dir.display()
        );
    };

    std::fs::create_dir_all(&tool_dir)?;
    let installed = installer.install(&requirement.name, &requirement.requirement, &tool_dir)?;
    tracing::info!(tool = %requirement.name, version = %installed, "tool installed");
    Ok(ToolStatus {
        name: requirement.name.clone(),
        path: tool_dir.join(installed.to_string()).display().to_string(),
        version: installed.to_string(),
        freshly_installed: true,
    })
}

fn best_installed(tool_dir: &Path, requirement: &VersionReq) -> anyhow::Result<Option<Version>> {
    if !tool_dir.exists() {
        return Ok(None);
    }
    let mut best: Option<Version> = None;
    for entry in std::fs::read_dir(tool_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        let Ok(version) = name.parse::<Version>() else {
            continue;
        };
        if requirement.matches(&version) && best.as_ref().map(|b| version > *b).unwrap_or(true) {
            best = Some(version);
        }
    }
    Ok(best)
}

#[derive(Deserialize)]
struct ToolIndex {
    versions: Vec<String>,
}

/// Fetches published tool builds from the configured index over HTTPS and
/// unpacks them into the local registry.
pub struct HttpToolInstaller {
    base: String,
    client: reqwest::blocking::Client,
}

impl HttpToolInstaller {
    pub fn new(base: &str, timeout_ms: u64) -> anyhow::Result<Self> {
        Ok(Self {
            base: base.trim_end_matches('/').to_string(),
            client: reqwest::blocking::Client::builder()
                .timeout(Duration::from_millis(timeout_ms))
                .build()?,
        })
    }
}

impl ToolInstaller for HttpToolInstaller {
    fn install(
        &self,
        name: &str,
        requirement: &VersionReq,
        tool_dir: &Path,
    ) -> anyhow::Result<Version> {
        let index: ToolIndex = self
            .client
            .get(format!("{}/{}/index.json", self.base, name))
            .send()?
            .error_for_status()?
            .json()?;

        let best = index
            .versions
            .iter()
            .filter_map(|v| v.parse::<Version>().ok())
            .filter(|v| requirement.matches(v))
            .max()
            .ok_or_else(|| {
                anyhow::anyhow!("no published version of {} satisfies {}", name, requirement)
            })?;

        let bytes = self
            .client
            .get(format!("{}/{}/{}.tar.gz", self.base, name, best))
            .send()?
            .error_for_status()?
            .bytes()?;

        let dest = tool_dir.join(best.to_string());
        std::fs::create_dir_all(&dest)?;
        let decoder = GzDecoder::new(std::io::Cursor::new(bytes));
        tar::Archive::new(decoder).unpack(&dest)?;
        Ok(best)
    }
}

/// Environment report for the operator: every ambient dependency a pipeline
/// step relies on, checked in one place.
pub fn doctor_report(settings: &Settings, config_path_exists: bool) -> DoctorReport {
    let engine_root = settings.engine_root();
    let engine_binary = settings.engine_binary();

    let checks = vec![
        CheckItem {
            name: "config_file".to_string(),
            status: if config_path_exists { "ok" } else { "defaults" }.to_string(),
        },
        CheckItem {
            name: "engine_root".to_string(),
            status: match &engine_root {
                Ok(root) if root.exists() => "ok".to_string(),
                Ok(_) => "missing".to_string(),
                Err(_) => "unresolved".to_string(),
            },
        },
        CheckItem {
            name: "engine_binary".to_string(),
            status: if std::process::Command::new(&engine_binary)
                .arg("--version")
                .output()
                .map(|o| o.status.success())
                .unwrap_or(false)
            {
                "ok"
            } else {
                "missing"
            }
            .to_string(),
        },
        CheckItem {
            name: "access_token".to_string(),
            status: if std::env::var(&settings.cloud.token_env).is_ok() {
                "ok"
            } else {
                "not_set"
            }
            .to_string(),
        },
        CheckItem {
            name: "tools_registry".to_string(),
            status: match settings.tools_registry() {
                Ok(registry) if registry.exists() => "ok".to_string(),
                Ok(_) => "missing".to_string(),
                Err(_) => "unresolved".to_string(),
            },
        },
    ];

    let overall = if checks
        .iter()
        .all(|c| c.status == "ok" || c.status == "defaults" || c.status == "not_set")
    {
        "ok"
    } else {
        "needs_attention"
    }
    .to_string();

    DoctorReport { overall, checks }
}

#[cfg(test)]
mod tests {
    use super::{ensure_tool, ToolInstaller, ToolRequirement, Version, VersionReq};
    use std::cell::RefCell;
    use std::fs;
    use std::path::Path;

    #[test]
    fn version_ordering_pads_missing_parts() {
        let a: Version = "1.2".parse().expect("parse");
        let b: Version = "1.2.0".parse().expect("parse");
        let c: Version = "1.10.0".parse().expect("parse");
        assert_eq!(a, b);
        assert!(c > b);
        assert!("2".parse::<Version>().expect("parse") > c);
        assert!("1.2.x".parse::<Version>().is_err());
    }

    #[test]
    fn requirement_matching() {
        let min = VersionReq::AtLeast("2.0.0".parse().expect("parse"));
        assert!(min.matches(&"2.0.0".parse().expect("parse")));
        assert!(min.matches(&"2.1.0".parse().expect("parse")));
        assert!(!min.matches(&"1.9.9".parse().expect("parse")));

        let pinned = VersionReq::Exactly("2.0.0".parse().expect("parse"));
        assert!(pinned.matches(&"2.0.0".parse().expect("parse")));
        assert!(!pinned.matches(&"2.0.1".parse().expect("parse")));
    }

    struct RecordingInstaller {
        calls: RefCell<usize>,
    }

    impl ToolInstaller for RecordingInstaller {
        fn install(
            &self,
            _name: &str,
            _requirement: &VersionReq,
            tool_dir: &Path,
        ) -> anyhow::Result<Version> {
            *self.calls.borrow_mut() += 1;
            let version: Version = "3.0.0".parse()?;
            fs::create_dir_all(tool_dir.join(version.to_string()))?;
            Ok(version)
        }
    }

    fn requirement(min: &str) -> ToolRequirement {
        ToolRequirement {
            name: "descriptor-compiler".to_string(),
            requirement: VersionReq::AtLeast(min.parse().expect("parse")),
        }
    }

    #[test]
    fn reuses_highest_satisfying_installed_version() {
        let tmp = tempfile::tempdir().expect("temp dir");
        for v in ["1.9.0", "2.4.0", "2.12.0"] {
            fs::create_dir_all(tmp.path().join("descriptor-compiler").join(v))
                .expect("seed registry");
        }
        let installer = RecordingInstaller {
            calls: RefCell::new(0),
        };

        let status =
            ensure_tool(tmp.path(), &requirement("2.0.0"), Some(&installer)).expect("ensure");
        assert_eq!(status.version, "2.12.0");
        assert!(!status.freshly_installed);
        assert_eq!(*installer.calls.borrow(), 0);
    }

    #[test]
    fn installs_when_nothing_satisfies() {
        let tmp = tempfile::tempdir().expect("temp dir");
        fs::create_dir_all(tmp.path().join("descriptor-compiler").join("1.9.0"))
            .expect("seed registry");
        let installer = RecordingInstaller {
            calls: RefCell::new(0),
        };

        let status =
            ensure_tool(tmp.path(), &requirement("2.0.0"), Some(&installer)).expect("ensure");
        assert_eq!(status.version, "3.0.0");
        assert!(status.freshly_installed);
        assert_eq!(*installer.calls.borrow(), 1);
    }

    #[test]
    fn absent_tool_without_installer_is_fatal() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let err = ensure_tool(tmp.path(), &requirement("2.0.0"), None).expect_err("no installer");
        assert!(err.to_string().contains("descriptor-compiler"));
    }
}
