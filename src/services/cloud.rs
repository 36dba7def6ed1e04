use crate::domain::models::{AssignmentRequest, ComplianceRecord, PolicyDefinition};
use crate::services::settings::Settings;
use serde::Deserialize;
use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum CloudError {
    #[error("missing access token: set {0}")]
    MissingToken(String),
    #[error("platform request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("platform call failed ({status}): {body}")]
    Api { status: u16, body: String },
}

/// The authenticated platform session. Command handlers take this as an
/// explicit object so every publish/monitor step runs against a substitutable
/// implementation instead of process-wide ambient state.
pub trait CloudClient {
    /// Upload a package archive; returns the content URI.
    fn upload_blob(
        &self,
        account: &str,
        container: &str,
        blob: &str,
        body: Vec<u8>,
    ) -> Result<String, CloudError>;

    /// Mint a time-limited read-only URL for an uploaded blob.
    fn grant_read_url(
        &self,
        account: &str,
        container: &str,
        blob: &str,
        days: u32,
    ) -> Result<String, CloudError>;

    /// Register a policy definition; returns the definition id.
    fn register_definition(&self, definition: &PolicyDefinition) -> Result<String, CloudError>;

    /// Assign a registered definition at a scope; returns the assignment id.
    fn create_assignment(&self, assignment: &AssignmentRequest) -> Result<String, CloudError>;

    /// Compliance records for one assignment, newest first.
    fn compliance_records(
        &self,
        scope: &str,
        assignment: &str,
        limit: usize,
    ) -> Result<Vec<ComplianceRecord>, CloudError>;

    /// Aggregate resource-graph query; returns the raw result rows.
    fn resource_query(&self, query: &str) -> Result<serde_json::Value, CloudError>;
}

pub struct HttpCloudClient {
    endpoint: String,
    token: String,
    client: reqwest::blocking::Client,
}

#[derive(Deserialize)]
struct IdResponse {
    id: String,
}

#[derive(Deserialize)]
struct UrlResponse {
    url: String,
}

#[derive(Deserialize)]
struct RecordsResponse {
    records: Vec<ComplianceRecord>,
}

impl HttpCloudClient {
    pub fn from_settings(settings: &Settings) -> Result<Self, CloudError> {
        let token = std::env::var(&settings.cloud.token_env)
            .map_err(|_| CloudError::MissingToken(settings.cloud.token_env.clone()))?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(settings.cloud.timeout_ms))
            .build()?;
        Ok(Self {
            endpoint: settings.cloud.endpoint.trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path.trim_start_matches('/'))
    }

    fn check(resp: reqwest::blocking::Response) -> Result<reqwest::blocking::Response, CloudError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().unwrap_or_default();
        Err(CloudError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

impl CloudClient for HttpCloudClient {
    fn upload_blob(
        &self,
        account: &str,
        container: &str,
        blob: &str,
        body: Vec<u8>,
    ) -> Result<String, CloudError> {
        let url = self.url(&format!("storage/{}/{}/{}", account, container, blob));
        let resp = self
            .client
            .put(url.as_str())
            .bearer_auth(&self.token)
            .header("content-type", "application/octet-stream")
            .body(body)
            .send()?;
        Self::check(resp)?;
        Ok(url)
    }

    fn grant_read_url(
        &self,
        account: &str,
        container: &str,
        blob: &str,
        days: u32,
    ) -> Result<String, CloudError> {
        let url = self.url(&format!(
            "storage/{}/{}/{}:grant-read",
            account, container, blob
        ));
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "days": days }))
            .send()?;
        let parsed: UrlResponse = Self::check(resp)?.json()?;
        Ok(parsed.url)
    }

    fn register_definition(&self, definition: &PolicyDefinition) -> Result<String, CloudError> {
        let url = self.url(&format!("policy/definitions/{}", definition.name));
        let resp = self
            .client
            .put(url)
            .bearer_auth(&self.token)
            .json(definition)
            .send()?;
        let parsed: IdResponse = Self::check(resp)?.json()?;
        Ok(parsed.id)
    }

    fn create_assignment(&self, assignment: &AssignmentRequest) -> Result<String, CloudError> {
        let url = self.url(&format!("policy/assignments/{}", assignment.name));
        let resp = self
            .client
            .put(url)
            .bearer_auth(&self.token)
            .query(&[("scope", assignment.scope.as_str())])
            .json(assignment)
            .send()?;
        let parsed: IdResponse = Self::check(resp)?.json()?;
        Ok(parsed.id)
    }

    fn compliance_records(
        &self,
        scope: &str,
        assignment: &str,
        limit: usize,
    ) -> Result<Vec<ComplianceRecord>, CloudError> {
        let url = self.url(&format!("policy/assignments/{}/compliance", assignment));
        let limit_param = limit.to_string();
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .query(&[("scope", scope), ("limit", limit_param.as_str())])
            .send()?;
        let parsed: RecordsResponse = Self::check(resp)?.json()?;
        let mut records = parsed.records;
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records.truncate(limit);
        Ok(records)
    }

    fn resource_query(&self, query: &str) -> Result<serde_json::Value, CloudError> {
        let url = self.url("graph/query");
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "query": query }))
            .send()?;
        Ok(Self::check(resp)?.json()?)
    }
}
