use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::ApiConfig;
use crate::models::{Lead, LeadDraft, LeadPatch, LeadSource, LeadStatus, Personnel, StatusState};

/// Failures at the HTTP boundary. Transport errors and rejected requests
/// are distinct: callers must never treat a failed mutation as a success.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("{message}")]
    Status { status: u16, message: String },
}

/// The backend reports failures in a `detail` field. A few known phrasings
/// are rewritten into guidance a user can act on.
pub(crate) fn friendly_detail(status: u16, detail: &str) -> String {
    if detail.contains("reconnect") {
        "Your email connection has expired. Reconnect your account and try again.".to_string()
    } else if detail.contains("No valid") {
        "No valid mailbox connection was found. Connect an email account first.".to_string()
    } else if detail.contains("permission") {
        "You do not have permission for this operation. Ask an administrator for access."
            .to_string()
    } else if detail.is_empty() {
        format!("Request failed with status {}", status)
    } else {
        detail.to_string()
    }
}

pub(crate) async fn status_error(response: Response) -> ApiError {
    let status = response.status().as_u16();
    let detail = response
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|body| {
            body.get("detail")
                .and_then(|d| d.as_str())
                .map(str::to_string)
        })
        .unwrap_or_default();
    ApiError::Status {
        status,
        message: friendly_detail(status, &detail),
    }
}

// Upstream spells the record key either `id` or `lead_id`, sometimes as a
// number. Both spellings collapse to one canonical string id right here;
// nothing past this module ever checks two field names.
fn de_loose_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::String(s) if !s.is_empty() => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }))
}

#[derive(Debug, Deserialize)]
pub struct LeadRecord {
    #[serde(default, deserialize_with = "de_loose_id")]
    id: Option<String>,
    #[serde(default, deserialize_with = "de_loose_id")]
    lead_id: Option<String>,
    #[serde(default)]
    company: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    contact_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    website: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    industry: Option<String>,
    #[serde(default)]
    company_size: Option<String>,
    #[serde(default)]
    revenue: Option<String>,
    #[serde(default)]
    employees_count: Option<i64>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    personnel: Option<Vec<Personnel>>,
    #[serde(default)]
    created_at: Option<String>,
}

impl LeadRecord {
    /// Normalize a wire record into the canonical shape. Records with no id
    /// under either spelling are unusable and dropped. A missing or unknown
    /// status defaults to `new`; a missing or unknown source defaults to
    /// manual entry.
    pub fn into_lead(self) -> Option<Lead> {
        let id = self.id.or(self.lead_id)?;
        let status = self
            .status
            .as_deref()
            .and_then(LeadStatus::parse)
            .unwrap_or(LeadStatus::New);
        let source = self
            .source
            .as_deref()
            .and_then(LeadSource::parse)
            .unwrap_or(LeadSource::Manual);
        let created_at = self.created_at.as_deref().and_then(|s| {
            chrono::DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&chrono::Utc))
        });

        Some(Lead {
            id,
            company: self.company.unwrap_or_default(),
            contact_name: self.contact_name.or(self.name),
            email: self.email,
            phone: self.phone,
            website: self.website,
            location: self.location,
            industry: self.industry,
            company_size: self.company_size,
            revenue: self.revenue,
            employees_count: self.employees_count,
            status: StatusState::confirmed(status),
            source,
            score: self.score,
            tags: self.tags.unwrap_or_default(),
            notes: self.notes,
            personnel: self.personnel.unwrap_or_default(),
            created_at,
        })
    }
}

// The paged endpoint wraps the list, the plain endpoint may return a bare
// array. Accept both.
#[derive(Deserialize)]
#[serde(untagged)]
enum LeadListBody {
    Wrapped { leads: Vec<LeadRecord> },
    Bare(Vec<LeadRecord>),
}

impl LeadListBody {
    fn into_leads(self) -> Vec<Lead> {
        let records = match self {
            LeadListBody::Wrapped { leads } => leads,
            LeadListBody::Bare(records) => records,
        };
        records.into_iter().filter_map(LeadRecord::into_lead).collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplySyncRequest {
    pub access_token: String,
    pub provider: String,
    pub days_back: u32,
    pub max_leads: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplySyncSummary {
    #[serde(default)]
    pub synced: usize,
    #[serde(default)]
    pub matched: usize,
}

/// The leads backend, seen from the store. A trait so tests can count calls
/// and reject mutations without a server.
#[async_trait]
pub trait LeadsApi: Send + Sync {
    async fn list_leads(&self, page: usize, per_page: usize) -> Result<Vec<Lead>, ApiError>;
    async fn list_leads_unpaged(&self) -> Result<Vec<Lead>, ApiError>;
    async fn create_lead(&self, draft: &LeadDraft) -> Result<Lead, ApiError>;
    async fn update_lead(&self, id: &str, patch: &LeadPatch) -> Result<(), ApiError>;
    async fn update_status(&self, id: &str, status: LeadStatus) -> Result<(), ApiError>;
    async fn delete_lead(&self, id: &str) -> Result<(), ApiError>;
    async fn export_csv(&self) -> Result<String, ApiError>;
    async fn send_mass_email(&self, ids: &[String], template: &str) -> Result<(), ApiError>;
    async fn sync_replies(&self, request: &ReplySyncRequest) -> Result<ReplySyncSummary, ApiError>;
}

pub struct HttpLeadsApi {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpLeadsApi {
    pub fn new(config: &ApiConfig, token: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .unwrap_or_default();
        debug!("Created leads API client for {}", config.leads_base_url);
        Self {
            client,
            base_url: config.leads_base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn check(&self, response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(status_error(response).await)
        }
    }
}

#[async_trait]
impl LeadsApi for HttpLeadsApi {
    async fn list_leads(&self, page: usize, per_page: usize) -> Result<Vec<Lead>, ApiError> {
        let url = format!(
            "{}/api/leads?page={}&per_page={}",
            self.base_url, page, per_page
        );
        debug!("GET {}", url);
        let response = self.authed(self.client.get(&url)).send().await?;
        let body: LeadListBody = self.check(response).await?.json().await?;
        Ok(body.into_leads())
    }

    async fn list_leads_unpaged(&self) -> Result<Vec<Lead>, ApiError> {
        let url = format!("{}/api/leads", self.base_url);
        debug!("GET {}", url);
        let response = self.authed(self.client.get(&url)).send().await?;
        let body: LeadListBody = self.check(response).await?.json().await?;
        Ok(body.into_leads())
    }

    async fn create_lead(&self, draft: &LeadDraft) -> Result<Lead, ApiError> {
        let url = format!("{}/api/leads", self.base_url);
        debug!("POST {} ({})", url, draft.company);
        let response = self
            .authed(self.client.post(&url))
            .json(draft)
            .send()
            .await?;
        let record: LeadRecord = self.check(response).await?.json().await?;
        record.into_lead().ok_or(ApiError::Status {
            status: 200,
            message: "Backend returned a lead without an id".to_string(),
        })
    }

    async fn update_lead(&self, id: &str, patch: &LeadPatch) -> Result<(), ApiError> {
        let url = format!("{}/api/leads/{}", self.base_url, id);
        debug!("PUT {}", url);
        let response = self
            .authed(self.client.put(&url))
            .json(patch)
            .send()
            .await?;
        self.check(response).await?;
        Ok(())
    }

    async fn update_status(&self, id: &str, status: LeadStatus) -> Result<(), ApiError> {
        let url = format!("{}/api/leads/{}", self.base_url, id);
        debug!("PUT {} status={}", url, status);
        let response = self
            .authed(self.client.put(&url))
            .json(&serde_json::json!({ "status": status.as_str() }))
            .send()
            .await?;
        self.check(response).await?;
        Ok(())
    }

    async fn delete_lead(&self, id: &str) -> Result<(), ApiError> {
        let url = format!("{}/api/leads/{}", self.base_url, id);
        debug!("DELETE {}", url);
        let response = self.authed(self.client.delete(&url)).send().await?;
        self.check(response).await?;
        Ok(())
    }

    async fn export_csv(&self) -> Result<String, ApiError> {
        let url = format!("{}/api/leads/export", self.base_url);
        debug!("GET {}", url);
        let response = self.authed(self.client.get(&url)).send().await?;
        Ok(self.check(response).await?.text().await?)
    }

    async fn send_mass_email(&self, ids: &[String], template: &str) -> Result<(), ApiError> {
        let url = format!("{}/api/leads/send-emails", self.base_url);
        debug!("POST {} ({} leads)", url, ids.len());
        let response = self
            .authed(self.client.post(&url))
            .json(&serde_json::json!({ "lead_ids": ids, "template": template }))
            .send()
            .await?;
        self.check(response).await?;
        Ok(())
    }

    async fn sync_replies(&self, request: &ReplySyncRequest) -> Result<ReplySyncSummary, ApiError> {
        let url = format!("{}/api/leads/sync-replies", self.base_url);
        debug!("POST {} (provider={})", url, request.provider);
        let response = self
            .authed(self.client.post(&url))
            .json(request)
            .send()
            .await?;
        Ok(self.check(response).await?.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_normalizes_both_id_spellings() {
        let by_id: LeadRecord =
            serde_json::from_str(r#"{"id": "abc", "company": "Acme"}"#).unwrap();
        let by_lead_id: LeadRecord =
            serde_json::from_str(r#"{"lead_id": 42, "company": "Beta"}"#).unwrap();

        assert_eq!(by_id.into_lead().unwrap().id, "abc");
        assert_eq!(by_lead_id.into_lead().unwrap().id, "42");
    }

    #[test]
    fn record_without_any_id_is_dropped() {
        let record: LeadRecord = serde_json::from_str(r#"{"company": "Ghost"}"#).unwrap();
        assert!(record.into_lead().is_none());
    }

    #[test]
    fn missing_status_and_source_get_defaults() {
        let record: LeadRecord =
            serde_json::from_str(r#"{"id": "1", "company": "Acme", "status": "weird"}"#).unwrap();
        let lead = record.into_lead().unwrap();
        assert_eq!(lead.status.value(), LeadStatus::New);
        assert_eq!(lead.source, LeadSource::Manual);
    }

    #[test]
    fn list_body_accepts_wrapped_and_bare_shapes() {
        let wrapped: LeadListBody = serde_json::from_str(
            r#"{"leads": [{"id": "1", "company": "A"}], "total_count": 1, "page": 1}"#,
        )
        .unwrap();
        let bare: LeadListBody =
            serde_json::from_str(r#"[{"id": "2", "company": "B"}]"#).unwrap();

        assert_eq!(wrapped.into_leads().len(), 1);
        assert_eq!(bare.into_leads().len(), 1);
    }

    #[test]
    fn known_detail_phrasings_are_rewritten() {
        assert!(friendly_detail(400, "please reconnect your mailbox").contains("Reconnect"));
        assert!(friendly_detail(400, "No valid token found").contains("mailbox connection"));
        assert!(friendly_detail(403, "permission denied").contains("administrator"));
        assert_eq!(friendly_detail(502, ""), "Request failed with status 502");
        assert_eq!(friendly_detail(400, "company too long"), "company too long");
    }
}
