use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cache::CacheStore;
use crate::filter::ListQuery;
use crate::leads_api::{ApiError, LeadsApi, ReplySyncRequest, ReplySyncSummary};
use crate::models::{Lead, LeadDraft, LeadPatch, LeadStats, LeadStatus, StatusState};
use crate::validate::validate_new_lead;

const PAGE_SIZE: usize = 1000;
const MAX_PAGES: usize = 10;

const KEY_LEADS: &str = "leads";
const KEY_WORKFLOW_LEADS: &str = "workflow_leads";
const KEY_STATS: &str = "lead_stats";
const KEY_LIST_PREFS: &str = "lead_list_prefs";

// View preferences outlive lead data by a wide margin; they only vanish
// when quota pressure evicts them.
const PREFS_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

#[derive(Default)]
struct StoreState {
    leads: Vec<Lead>,
    workflow_leads: Vec<Lead>,
    stats: LeadStats,
    last_fetch: Option<DateTime<Utc>>,
    has_initial_load: bool,
}

/// Holds the two source-partitioned lead lists plus derived stats, and
/// reconciles every mutation against the remote leads API. All state
/// changes go through one lock, so two mutations of the same lead cannot
/// interleave.
pub struct LeadStore {
    api: Arc<dyn LeadsApi>,
    cache: CacheStore,
    cache_ttl: Duration,
    user: Option<String>,
    load_in_flight: AtomicBool,
    state: Mutex<StoreState>,
}

impl LeadStore {
    pub fn new(
        api: Arc<dyn LeadsApi>,
        cache: CacheStore,
        cache_ttl: Duration,
        user: Option<String>,
    ) -> Self {
        Self {
            api,
            cache,
            cache_ttl,
            user,
            load_in_flight: AtomicBool::new(false),
            state: Mutex::new(StoreState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    fn persist_locked(&self, state: &StoreState) {
        let user = self.user();
        self.cache.set(KEY_LEADS, &state.leads, user);
        self.cache.set(KEY_WORKFLOW_LEADS, &state.workflow_leads, user);
        self.cache.set(KEY_STATS, &state.stats, user);
    }

    /// Load both lists. No-op while signed out, while another load is in
    /// flight, or when the previous load is still fresh and `force` is not
    /// set. A failed load leaves prior state untouched.
    pub async fn load_leads(&self, force: bool) -> Result<(), ApiError> {
        if self.user.is_none() {
            debug!("Skipping lead load: not signed in");
            return Ok(());
        }
        if self.load_in_flight.swap(true, Ordering::SeqCst) {
            debug!("Skipping lead load: one is already in flight");
            return Ok(());
        }
        let result = self.load_leads_inner(force).await;
        self.load_in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn load_leads_inner(&self, force: bool) -> Result<(), ApiError> {
        if !force {
            {
                let state = self.state();
                if state.has_initial_load {
                    if let Some(last) = state.last_fetch {
                        let ttl = chrono::Duration::from_std(self.cache_ttl)
                            .unwrap_or_else(|_| chrono::Duration::zero());
                        if Utc::now().signed_duration_since(last) < ttl {
                            debug!("Skipping lead load: in-memory lists are fresh");
                            return Ok(());
                        }
                    }
                }
            }

            let user = self.user();
            let cached_leads: Option<Vec<Lead>> = self.cache.get(KEY_LEADS, self.cache_ttl, user);
            let cached_workflow: Option<Vec<Lead>> =
                self.cache.get(KEY_WORKFLOW_LEADS, self.cache_ttl, user);
            if let (Some(leads), Some(workflow_leads)) = (cached_leads, cached_workflow) {
                let stats = self
                    .cache
                    .get(KEY_STATS, self.cache_ttl, user)
                    .unwrap_or_else(|| {
                        LeadStats::compute(leads.iter().chain(workflow_leads.iter()))
                    });
                info!(
                    "Loaded {} manual and {} workflow leads from cache",
                    leads.len(),
                    workflow_leads.len()
                );
                let mut state = self.state();
                state.leads = leads;
                state.workflow_leads = workflow_leads;
                state.stats = stats;
                state.last_fetch = Some(Utc::now());
                state.has_initial_load = true;
                return Ok(());
            }
        }

        let all = self.fetch_all().await?;
        let (workflow_leads, leads): (Vec<Lead>, Vec<Lead>) =
            all.into_iter().partition(|lead| lead.is_workflow());
        let stats = LeadStats::compute(leads.iter().chain(workflow_leads.iter()));
        info!(
            "Fetched {} manual and {} workflow leads from the API",
            leads.len(),
            workflow_leads.len()
        );

        let mut state = self.state();
        state.leads = leads;
        state.workflow_leads = workflow_leads;
        state.stats = stats;
        state.last_fetch = Some(Utc::now());
        state.has_initial_load = true;
        self.persist_locked(&state);
        Ok(())
    }

    async fn fetch_all(&self) -> Result<Vec<Lead>, ApiError> {
        match self.fetch_paged().await {
            Ok(all) => Ok(all),
            Err(e) => {
                warn!("Paged lead fetch failed ({}), falling back to the plain endpoint", e);
                self.api.list_leads_unpaged().await
            }
        }
    }

    async fn fetch_paged(&self) -> Result<Vec<Lead>, ApiError> {
        let mut all = Vec::new();
        for page in 1..=MAX_PAGES {
            let batch = self.api.list_leads(page, PAGE_SIZE).await?;
            let batch_len = batch.len();
            all.extend(batch);
            if batch_len < PAGE_SIZE {
                break;
            }
            if page == MAX_PAGES {
                warn!("Stopping lead fetch at the {}-page cap", MAX_PAGES);
            }
        }
        Ok(all)
    }

    /// Validate, create remotely, then insert into the matching partition.
    /// Validation failures never reach the network.
    pub async fn create_lead(&self, draft: &LeadDraft) -> crate::models::Result<Lead> {
        validate_new_lead(draft)?;
        let lead = self.api.create_lead(draft).await?;

        let mut state = self.state();
        if lead.is_workflow() {
            state.workflow_leads.push(lead.clone());
        } else {
            state.leads.push(lead.clone());
        }
        state.stats = LeadStats::compute(state.leads.iter().chain(state.workflow_leads.iter()));
        self.persist_locked(&state);
        Ok(lead)
    }

    /// Remote first; local lists change only after the backend accepts the
    /// new status. On failure the displayed status is exactly what it was.
    pub async fn update_lead_status(&self, id: &str, status: LeadStatus) -> Result<(), ApiError> {
        self.api.update_status(id, status).await?;

        let mut state = self.state();
        let confirmed = StatusState::confirmed(status);
        let in_manual = set_status(&mut state.leads, id, &confirmed);
        let in_workflow = set_status(&mut state.workflow_leads, id, &confirmed);
        if !in_manual && !in_workflow {
            debug!("Status update for unknown lead {}", id);
        }
        state.stats = LeadStats::compute(state.leads.iter().chain(state.workflow_leads.iter()));
        self.persist_locked(&state);
        Ok(())
    }

    /// Local-only status change, marked pending. Used when the backend is
    /// known to apply the same change asynchronously (mass email), so the
    /// UI runs ahead of the database on purpose. The next full reload is
    /// the reconciliation point: server state replaces pending state.
    pub fn update_lead_status_ui_only(&self, id: &str, status: LeadStatus) {
        let mut state = self.state();
        let pending = StatusState::pending(status);
        set_status(&mut state.leads, id, &pending);
        set_status(&mut state.workflow_leads, id, &pending);
        state.stats = LeadStats::compute(state.leads.iter().chain(state.workflow_leads.iter()));
        self.persist_locked(&state);
    }

    pub async fn delete_lead(&self, id: &str) -> Result<(), ApiError> {
        self.api.delete_lead(id).await?;

        let mut state = self.state();
        state.leads.retain(|lead| lead.id != id);
        state.workflow_leads.retain(|lead| lead.id != id);
        state.stats = LeadStats::compute(state.leads.iter().chain(state.workflow_leads.iter()));
        self.persist_locked(&state);
        Ok(())
    }

    /// Merge an accepted inline edit into whichever list holds the lead.
    pub async fn update_lead(&self, patch: &LeadPatch) -> Result<(), ApiError> {
        self.api.update_lead(&patch.id, patch).await?;

        let mut state = self.state();
        if let Some(lead) = state.leads.iter_mut().find(|lead| lead.id == patch.id) {
            patch.apply(lead);
        } else if let Some(lead) = state
            .workflow_leads
            .iter_mut()
            .find(|lead| lead.id == patch.id)
        {
            patch.apply(lead);
        } else {
            debug!("Edit for unknown lead {}", patch.id);
        }
        state.stats = LeadStats::compute(state.leads.iter().chain(state.workflow_leads.iter()));
        self.persist_locked(&state);
        Ok(())
    }

    /// Drop a lead from local state without deleting it remotely. Used
    /// after conversion: the backend record lives on as a CRM customer.
    pub fn remove_lead_from_state(&self, id: &str) {
        let mut state = self.state();
        state.leads.retain(|lead| lead.id != id);
        state.workflow_leads.retain(|lead| lead.id != id);
        state.stats = LeadStats::compute(state.leads.iter().chain(state.workflow_leads.iter()));
        self.persist_locked(&state);
    }

    /// Trigger the backend mass-email send, then mark every selected lead
    /// contacted through the UI-only path. The backend updates each lead's
    /// status asynchronously over the following minutes; no status request
    /// is issued here.
    pub async fn send_mass_email(&self, ids: &[String], template: &str) -> Result<(), ApiError> {
        self.api.send_mass_email(ids, template).await?;
        for id in ids {
            self.update_lead_status_ui_only(id, LeadStatus::Contacted);
        }
        Ok(())
    }

    pub async fn sync_replies(
        &self,
        request: &ReplySyncRequest,
    ) -> Result<ReplySyncSummary, ApiError> {
        self.api.sync_replies(request).await
    }

    pub async fn export_csv(&self) -> Result<String, ApiError> {
        self.api.export_csv().await
    }

    pub fn manual_leads(&self) -> Vec<Lead> {
        self.state().leads.clone()
    }

    pub fn workflow_leads(&self) -> Vec<Lead> {
        self.state().workflow_leads.clone()
    }

    /// Union of both lists, used only for cross-list operations such as
    /// select-all and counts.
    pub fn all_leads(&self) -> Vec<Lead> {
        let state = self.state();
        let mut all = state.leads.clone();
        all.extend(state.workflow_leads.iter().cloned());
        all
    }

    pub fn find_lead(&self, id: &str) -> Option<Lead> {
        let state = self.state();
        state
            .leads
            .iter()
            .chain(state.workflow_leads.iter())
            .find(|lead| lead.id == id)
            .cloned()
    }

    pub fn stats(&self) -> LeadStats {
        self.state().stats.clone()
    }

    pub fn has_initial_load(&self) -> bool {
        self.state().has_initial_load
    }

    /// Browse settings from the previous session, kept per user next to the
    /// cached lists.
    pub fn load_list_prefs(&self) -> Option<ListQuery> {
        self.cache.get(KEY_LIST_PREFS, PREFS_TTL, self.user())
    }

    pub fn save_list_prefs(&self, query: &ListQuery) {
        self.cache.set(KEY_LIST_PREFS, query, self.user());
    }

    /// Drop this user's cached lead data, leaving other accounts' entries
    /// and the saved view preferences alone.
    pub fn clear_lead_cache(&self) {
        let user = self.user();
        self.cache.clear(KEY_LEADS, user);
        self.cache.clear(KEY_WORKFLOW_LEADS, user);
        self.cache.clear(KEY_STATS, user);
    }

    pub fn clear_cache(&self) {
        self.cache.clear_all();
    }
}

fn set_status(list: &mut [Lead], id: &str, status: &StatusState) -> bool {
    let mut hit = false;
    for lead in list.iter_mut() {
        if lead.id == id {
            lead.status = status.clone();
            hit = true;
        }
    }
    hit
}
