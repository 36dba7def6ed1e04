use crate::cli::{
    CacheCommands, Cli, Commands, PackageCommands, PolicyCommands, StateCommands, ToolCommands,
};
use crate::domain::models::{CacheClearReport, DefinitionFileReport, EvaluationReport, JsonOut};
use crate::package::{ConfigurationDoc, PackageId};
use crate::services::cache::clear_package_cache;
use crate::services::compiler::compile_configuration;
use crate::services::evaluator::{evaluate_with_retry, Engine, EngineCli};
use crate::services::output::{audit, print_one};
use crate::services::packaging::create_package;
use crate::services::perms::HostPermissionOps;
use crate::services::policy::{generate_definition, DefinitionMetadata, PackageRef};
use crate::services::settings::{default_config_path, Settings};
use crate::services::toolchain::{
    doctor_report, ensure_tool, HttpToolInstaller, ToolInstaller, ToolRequirement, VersionReq,
};
use std::path::Path;

/// Handle every command that runs purely against the local host. Returns
/// `Ok(false)` for commands that need the platform session.
pub fn handle_local_commands(cli: &Cli, settings: &Settings) -> anyhow::Result<bool> {
    match &cli.command {
        Commands::Compile {
            account,
            node,
            name,
            ensure,
            require_enabled,
            out,
        } => {
            let doc = ConfigurationDoc {
                name: name.clone(),
                node: node.clone(),
                account: account.clone(),
                ensure: *ensure,
                require_enabled: *require_enabled,
            };
            let report = compile_configuration(&doc, out)?;
            audit(
                "compile",
                serde_json::json!({"node": report.node, "descriptor": report.descriptor}),
            );
            print_one(cli.json, report, |r| {
                format!("compiled {} -> {}", r.configuration, r.descriptor)
            })?;
        }
        Commands::Package { command } => match command {
            PackageCommands::Create {
                descriptor,
                name,
                version,
                assignment_type,
                out,
                force,
            } => {
                let id = PackageId::new(name, version)?;
                let report = create_package(descriptor, &id, *assignment_type, out, *force)?;
                audit(
                    "package_create",
                    serde_json::json!({"package": report.package_name, "sha256": report.sha256}),
                );
                print_one(cli.json, report, |r| {
                    format!("packaged {} ({})", r.package_name, r.path)
                })?;
            }
            PackageCommands::Test {
                package,
                name,
                version,
                parameter,
            } => {
                if !package.is_file() {
                    anyhow::bail!(
                        "package archive not found: {} (run `steward package create` first)",
                        package.display()
                    );
                }
                let id = resolve_package_id(package, name.as_deref(), version.as_deref())?;
                let parameters = parse_parameters(parameter)?;
                let engine = EngineCli::new(settings.engine_binary());
                let report = evaluate_with_retry(
                    &engine,
                    package,
                    &id,
                    &parameters,
                    &settings.engine_root()?,
                    &HostPermissionOps,
                )?;
                warn_if_noncompliant(&id.archive_stem(), &report);
                print_evaluation(cli.json, report)?;
            }
        },
        Commands::State { command } => {
            let engine = EngineCli::new(settings.engine_binary());
            match command {
                StateCommands::Test { folder } => {
                    require_descriptor_folder(folder)?;
                    let report = engine.test(folder)?;
                    warn_if_noncompliant(&folder.display().to_string(), &report);
                    print_evaluation(cli.json, report)?;
                }
                StateCommands::Apply { folder } => {
                    require_descriptor_folder(folder)?;
                    engine.apply(folder)?;
                    audit(
                        "state_apply",
                        serde_json::json!({"folder": folder.display().to_string()}),
                    );
                    print_one(cli.json, "applied", |_| {
                        format!("applied descriptors from {}", folder.display())
                    })?;
                }
            }
        }
        Commands::Cache { command } => match command {
            CacheCommands::Clear { name, version } => {
                let id = PackageId::new(name, version)?;
                let cleared =
                    clear_package_cache(&settings.engine_root()?, &id, &HostPermissionOps)?;
                audit(
                    "cache_clear",
                    serde_json::json!({"cache_key": id.cache_key(), "count": cleared.len()}),
                );
                let report = CacheClearReport {
                    cache_key: id.cache_key(),
                    cleared: cleared.iter().map(|p| p.display().to_string()).collect(),
                };
                print_one(cli.json, report, |r| {
                    format!(
                        "cleared {} cached extraction(s) of {}",
                        r.cleared.len(),
                        r.cache_key
                    )
                })?;
            }
        },
        Commands::Tools { command } => match command {
            ToolCommands::Ensure {
                name,
                min_version,
                exact_version,
            } => {
                let requirement = match (exact_version, min_version) {
                    (Some(v), _) => VersionReq::Exactly(v.parse()?),
                    (None, Some(v)) => VersionReq::AtLeast(v.parse()?),
                    (None, None) => {
                        anyhow::bail!("provide --min-version or --exact-version for {}", name)
                    }
                };
                let req = ToolRequirement {
                    name: name.clone(),
                    requirement,
                };
                let installer = match &settings.tools.index_url {
                    Some(base) => Some(HttpToolInstaller::new(base, settings.cloud.timeout_ms)?),
                    None => None,
                };
                let status = ensure_tool(
                    &settings.tools_registry()?,
                    &req,
                    installer.as_ref().map(|i| i as &dyn ToolInstaller),
                )?;
                print_one(cli.json, status, |s| {
                    format!("{} {} at {}", s.name, s.version, s.path)
                })?;
            }
        },
        Commands::Doctor => {
            let config_exists = match &cli.config {
                Some(p) => p.exists(),
                None => default_config_path().map(|p| p.exists()).unwrap_or(false),
            };
            let report = doctor_report(settings, config_exists);
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&JsonOut {
                        ok: report.overall == "ok",
                        data: report
                    })?
                );
            } else {
                println!("doctor: {}", report.overall);
                for c in &report.checks {
                    println!("{}\t{}", c.name, c.status);
                }
            }
        }
        Commands::Policy {
            command:
                PolicyCommands::Generate {
                    name,
                    version,
                    content_uri,
                    content_hash,
                    display_name,
                    description,
                    mode,
                    out,
                },
        } => {
            let id = PackageId::new(name, version)?;
            let package = PackageRef {
                name: id.name,
                version: id.version,
                content_uri: content_uri.clone(),
                content_hash: content_hash.clone(),
            };
            let meta = DefinitionMetadata {
                display_name: display_name.clone(),
                description: description.clone(),
            };
            let definition = generate_definition(&package, &meta, *mode);
            std::fs::create_dir_all(out)?;
            let path = out.join(format!("{}.json", definition.name));
            std::fs::write(&path, serde_json::to_string_pretty(&definition)?)?;
            let report = DefinitionFileReport {
                name: definition.name.clone(),
                mode: *mode,
                path: path.display().to_string(),
            };
            print_one(cli.json, report, |r| {
                format!("definition {} written to {}", r.name, r.path)
            })?;
        }
        _ => return Ok(false),
    }

    Ok(true)
}

fn resolve_package_id(
    package: &Path,
    name: Option<&str>,
    version: Option<&str>,
) -> anyhow::Result<PackageId> {
    match (name, version) {
        (Some(n), Some(v)) => Ok(PackageId::new(n, v)?),
        _ => Ok(PackageId::from_archive_path(package)?),
    }
}

fn parse_parameters(raw: &[String]) -> anyhow::Result<Vec<(String, String)>> {
    raw.iter()
        .map(|p| {
            p.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .ok_or_else(|| anyhow::anyhow!("invalid parameter {:?} (expected key=value)", p))
        })
        .collect()
}

fn require_descriptor_folder(folder: &Path) -> anyhow::Result<()> {
    if !folder.is_dir() {
        anyhow::bail!(
            "descriptor folder not found: {} (run `steward compile` first)",
            folder.display()
        );
    }
    Ok(())
}

fn warn_if_noncompliant(subject: &str, report: &EvaluationReport) {
    if !report.compliant {
        tracing::warn!(subject = %subject, reasons = report.reasons.len(), "not compliant");
    }
}

fn print_evaluation(json: bool, report: EvaluationReport) -> anyhow::Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&JsonOut {
                ok: true,
                data: report
            })?
        );
    } else {
        if report.compliant {
            println!("compliant");
        } else {
            println!("non-compliant");
        }
        for reason in &report.reasons {
            println!("{}\t{}", reason.code, reason.phrase);
        }
    }
    Ok(())
}
