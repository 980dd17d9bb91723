use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::ApiConfig;
use crate::leads_api::{status_error, ApiError};
use crate::models::Lead;

/// Thin CRM client. The only call this tool needs is customer creation:
/// converting a lead reassigns its backend record to the CRM, so the local
/// copy is dropped from state without a delete call.
pub struct CrmClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedCustomer {
    id: serde_json::Value,
}

impl CrmClient {
    pub fn new(config: &ApiConfig, token: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .unwrap_or_default();
        debug!("Created CRM API client for {}", config.crm_base_url);
        Self {
            client,
            base_url: config.crm_base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    pub async fn create_customer(&self, lead: &Lead) -> Result<String, ApiError> {
        let url = format!("{}/api/crm/customers", self.base_url);
        debug!("POST {} (from lead {})", url, lead.id);

        let body = serde_json::json!({
            "company": lead.company,
            "contact_name": lead.contact_name,
            "email": lead.email,
            "phone": lead.phone,
            "website": lead.website,
            "location": lead.location,
            "industry": lead.industry,
            "source": "lead_conversion",
            "lead_id": lead.id,
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let created: CreatedCustomer = response.json().await?;
        Ok(match created.id {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        })
    }
}
