use crate::cli::{AssignmentEnforcement, EnforcementMode, IdentityMode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct JsonOut<T: Serialize> {
    pub ok: bool,
    pub data: T,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub ok: bool,
    pub error: ErrorBody,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct CompileReport {
    pub configuration: String,
    pub node: String,
    pub descriptor: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct PackageReport {
    pub name: String,
    pub version: String,
    pub package_name: String,
    pub path: String,
    pub sha256: String,
}

#[derive(Serialize)]
pub struct CacheClearReport {
    pub cache_key: String,
    pub cleared: Vec<String>,
}

/// Structured report produced by the local evaluation engine.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EvaluationReport {
    pub compliant: bool,
    #[serde(default)]
    pub reasons: Vec<ComplianceReason>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ComplianceReason {
    pub code: String,
    pub phrase: String,
}

#[derive(Serialize)]
pub struct PublishReport {
    pub package_name: String,
    pub content_uri: String,
    pub content_hash: String,
    pub read_url: Option<String>,
}

/// Policy definition document sent to the policy service.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PolicyDefinition {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub version: String,
    pub mode: String,
    pub policy_rule: serde_json::Value,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Serialize, Clone)]
pub struct AssignmentRequest {
    pub name: String,
    pub definition_id: String,
    pub scope: String,
    pub identity: IdentityMode,
    pub enforcement: AssignmentEnforcement,
}

#[derive(Serialize)]
pub struct DefinitionFileReport {
    pub name: String,
    pub mode: EnforcementMode,
    pub path: String,
}

#[derive(Serialize)]
pub struct RegisterReport {
    pub id: String,
    pub name: String,
}

#[derive(Serialize)]
pub struct AssignReport {
    pub id: String,
    pub name: String,
    pub scope: String,
}

/// One platform-recorded evaluation result for a resource.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ComplianceRecord {
    pub timestamp: DateTime<Utc>,
    pub resource_id: String,
    pub status: ComplianceStatus,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ComplianceStatus {
    Compliant,
    NonCompliant,
    Pending,
}

#[derive(Serialize)]
pub struct ComplianceStatusReport {
    pub assignment: String,
    pub scope: String,
    pub compliant: bool,
    pub records: Vec<ComplianceRecord>,
}

#[derive(Debug, Serialize)]
pub struct ToolStatus {
    pub name: String,
    pub version: String,
    pub path: String,
    pub freshly_installed: bool,
}

#[derive(Serialize)]
pub struct CheckItem {
    pub name: String,
    pub status: String,
}

#[derive(Serialize)]
pub struct DoctorReport {
    pub overall: String,
    pub checks: Vec<CheckItem>,
}
