use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::cache::{CacheBackend, CacheStore, DiskBackend};
use crate::config::Config;
use crate::crm_api::CrmClient;
use crate::leads_api::HttpLeadsApi;
use crate::models::{CliApp, Lead, Result};
use crate::store::LeadStore;

#[derive(Debug, Clone)]
pub enum MenuAction {
    ListLeads,
    CreateLead,
    UpdateStatus,
    EditLead,
    DeleteLead,
    ConvertLead,
    MassEmail,
    ImportCsv,
    ExportLeads,
    SyncReplies,
    RefreshLeads,
    ShowStats,
    ClearCache,
    Exit,
}

impl std::fmt::Display for MenuAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MenuAction::ListLeads => write!(f, "📋 Browse leads (search, filter, sort)"),
            MenuAction::CreateLead => write!(f, "➕ Create a lead"),
            MenuAction::UpdateStatus => write!(f, "🔄 Update a lead's status"),
            MenuAction::EditLead => write!(f, "✏️  Edit a lead field"),
            MenuAction::DeleteLead => write!(f, "🗑️  Delete a lead"),
            MenuAction::ConvertLead => write!(f, "🏆 Convert a lead to a CRM customer"),
            MenuAction::MassEmail => write!(f, "📧 Send a mass email campaign"),
            MenuAction::ImportCsv => write!(f, "📥 Import leads from CSV"),
            MenuAction::ExportLeads => write!(f, "📤 Export leads to CSV"),
            MenuAction::SyncReplies => write!(f, "📬 Sync email replies"),
            MenuAction::RefreshLeads => write!(f, "♻️  Force refresh from the API"),
            MenuAction::ShowStats => write!(f, "📊 Show lead statistics"),
            MenuAction::ClearCache => write!(f, "🧹 Clear the local cache"),
            MenuAction::Exit => write!(f, "🚪 Exit"),
        }
    }
}

impl CliApp {
    pub async fn new(config: Config) -> Result<Self> {
        let token = std::env::var("LEADS_API_TOKEN").ok();
        let user_email = std::env::var("LEADS_USER_EMAIL").ok();

        // Both pieces are needed for an authenticated session; without them
        // the store refuses to load and every mutation would be rejected
        // upstream anyway.
        let signed_in = match (&token, &user_email) {
            (Some(_), Some(email)) => Some(email.clone()),
            _ => {
                warn!("LEADS_API_TOKEN / LEADS_USER_EMAIL not set; running signed out");
                None
            }
        };

        let api = Arc::new(HttpLeadsApi::new(&config.api, token.clone()));
        let crm = CrmClient::new(&config.api, token);

        let backend = Arc::new(DiskBackend::new(
            &config.cache.directory,
            config.cache.disk_budget_bytes,
        )?);
        let cache = CacheStore::new(backend as Arc<dyn CacheBackend>);
        let ttl = Duration::from_secs(config.cache.lead_ttl_minutes * 60);

        let store = Arc::new(LeadStore::new(api, cache, ttl, signed_in));

        info!("Lead desk ready (leads API: {})", config.api.leads_base_url);
        Ok(Self {
            config,
            store,
            crm,
            user_email,
        })
    }

    pub(crate) async fn ensure_loaded(&self) -> Result<()> {
        self.store.load_leads(false).await?;
        Ok(())
    }
}

pub(crate) fn print_lead_row(lead: &Lead) {
    let pending_marker = if lead.status.is_pending() { "*" } else { "" };
    println!(
        "  {:<10} {:<28} {:<24} {:<12} {:<10} {}",
        lead.id,
        truncate(&lead.company, 28),
        truncate(lead.email.as_deref().unwrap_or("-"), 24),
        format!("{}{}", lead.status.value(), pending_marker),
        lead.source.as_str(),
        lead.score
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string()),
    );
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}
