use crate::cli::{Cli, Commands, ComplianceCommands, PolicyCommands};
use crate::domain::models::{
    AssignReport, AssignmentRequest, ComplianceStatus, ComplianceStatusReport, JsonOut,
    PolicyDefinition, PublishReport, RegisterReport,
};
use crate::package::PackageId;
use crate::services::cloud::CloudClient;
use crate::services::output::{audit, print_one};
use crate::services::settings::Settings;
use sha2::{Digest, Sha256};

/// Default aggregation run by `compliance summary`.
const NONCOMPLIANCE_SUMMARY_QUERY: &str =
    "Resources | where type == 'machine' | summarize count() by complianceStatus";

/// Handle every command that talks to the platform session.
pub fn handle_cloud_commands(
    cli: &Cli,
    settings: &Settings,
    client: &dyn CloudClient,
) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Publish {
            package,
            container,
            account,
            blob,
            read_access_days,
        } => {
            if !package.is_file() {
                anyhow::bail!(
                    "package archive not found: {} (run `steward package create` first)",
                    package.display()
                );
            }
            let id = PackageId::from_archive_path(package)?;
            let account = account
                .clone()
                .or_else(|| settings.cloud.storage_account.clone())
                .ok_or_else(|| {
                    anyhow::anyhow!(
                        "no storage account: pass --account or set [cloud].storage_account"
                    )
                })?;
            let blob = blob.clone().unwrap_or_else(|| id.archive_file_name());

            let bytes = std::fs::read(package)?;
            let content_hash = hex::encode(Sha256::digest(&bytes));
            let content_uri = client.upload_blob(&account, container, &blob, bytes)?;
            let read_url = match read_access_days {
                Some(days) => Some(client.grant_read_url(&account, container, &blob, *days)?),
                None => None,
            };
            audit(
                "publish",
                serde_json::json!({"package": id.archive_stem(), "uri": content_uri}),
            );
            let report = PublishReport {
                package_name: id.archive_stem(),
                content_uri,
                content_hash,
                read_url,
            };
            print_one(cli.json, report, |r| {
                format!("published {} -> {}", r.package_name, r.content_uri)
            })?;
        }
        Commands::Policy { command } => match command {
            PolicyCommands::Register { definition } => {
                if !definition.is_file() {
                    anyhow::bail!(
                        "definition not found: {} (run `steward policy generate` first)",
                        definition.display()
                    );
                }
                let raw = std::fs::read_to_string(definition)?;
                let parsed: PolicyDefinition = serde_json::from_str(&raw)?;
                let id = client.register_definition(&parsed)?;
                audit(
                    "policy_register",
                    serde_json::json!({"name": parsed.name, "id": id}),
                );
                let report = RegisterReport {
                    id,
                    name: parsed.name,
                };
                print_one(cli.json, report, |r| {
                    format!("registered {} as {}", r.name, r.id)
                })?;
            }
            PolicyCommands::Assign {
                definition_id,
                name,
                scope,
                identity,
                enforcement,
            } => {
                let request = AssignmentRequest {
                    name: name.clone(),
                    definition_id: definition_id.clone(),
                    scope: scope.clone(),
                    identity: *identity,
                    enforcement: *enforcement,
                };
                let id = client.create_assignment(&request)?;
                audit(
                    "policy_assign",
                    serde_json::json!({"name": request.name, "scope": request.scope, "id": id}),
                );
                let report = AssignReport {
                    id,
                    name: request.name,
                    scope: request.scope,
                };
                print_one(cli.json, report, |r| {
                    format!("assigned {} at {}", r.name, r.scope)
                })?;
            }
            PolicyCommands::Generate { .. } => unreachable!("handled by local commands"),
        },
        Commands::Compliance { command } => match command {
            ComplianceCommands::Status {
                assignment,
                scope,
                limit,
            } => {
                let records = client.compliance_records(scope, assignment, *limit)?;
                let compliant = records
                    .first()
                    .map(|r| r.status == ComplianceStatus::Compliant)
                    .unwrap_or(false);
                if !compliant {
                    tracing::warn!(assignment = %assignment, "assignment is not compliant");
                }
                let report = ComplianceStatusReport {
                    assignment: assignment.clone(),
                    scope: scope.clone(),
                    compliant,
                    records,
                };
                if cli.json {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&JsonOut {
                            ok: true,
                            data: report
                        })?
                    );
                } else {
                    println!(
                        "{}: {}",
                        report.assignment,
                        if report.compliant {
                            "compliant"
                        } else {
                            "non-compliant"
                        }
                    );
                    for record in &report.records {
                        println!(
                            "{}\t{}\t{:?}",
                            record.timestamp.to_rfc3339(),
                            record.resource_id,
                            record.status
                        );
                    }
                }
            }
            ComplianceCommands::Summary { query } => {
                let q = query
                    .clone()
                    .unwrap_or_else(|| NONCOMPLIANCE_SUMMARY_QUERY.to_string());
                let rows = client.resource_query(&q)?;
                print_one(cli.json, rows, |r| r.to_string())?;
            }
        },
        _ => unreachable!("handled by local commands"),
    }

    Ok(())
}
