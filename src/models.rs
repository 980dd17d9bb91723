use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{config::Config, crm_api::CrmClient, store::LeadStore};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Lead pipeline stage. The last four variants are legacy values that still
/// arrive from older workflow runs and must keep round-tripping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    Lost,
    Hot,
    Warm,
    Cold,
    Converted,
}

impl LeadStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "new" => Some(LeadStatus::New),
            "contacted" => Some(LeadStatus::Contacted),
            "qualified" => Some(LeadStatus::Qualified),
            "lost" => Some(LeadStatus::Lost),
            "hot" => Some(LeadStatus::Hot),
            "warm" => Some(LeadStatus::Warm),
            "cold" => Some(LeadStatus::Cold),
            "converted" => Some(LeadStatus::Converted),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Qualified => "qualified",
            LeadStatus::Lost => "lost",
            LeadStatus::Hot => "hot",
            LeadStatus::Warm => "warm",
            LeadStatus::Cold => "cold",
            LeadStatus::Converted => "converted",
        }
    }

    /// Fixed ordering used when sorting by status.
    pub fn sort_priority(&self) -> u8 {
        match self {
            LeadStatus::Converted => 7,
            LeadStatus::Qualified => 6,
            LeadStatus::Hot => 5,
            LeadStatus::Warm => 4,
            LeadStatus::Contacted => 3,
            LeadStatus::Cold => 2,
            LeadStatus::New => 1,
            LeadStatus::Lost => 0,
        }
    }

    pub fn all() -> &'static [LeadStatus] {
        &[
            LeadStatus::New,
            LeadStatus::Contacted,
            LeadStatus::Qualified,
            LeadStatus::Lost,
            LeadStatus::Hot,
            LeadStatus::Warm,
            LeadStatus::Cold,
            LeadStatus::Converted,
        ]
    }
}

impl std::fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A lead's status plus whether the backend has confirmed it. `Pending` is
/// set by the UI-only update path: the backend applies the same change
/// asynchronously, so local state is intentionally ahead of the database
/// until the next full reload, where server state wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum StatusState {
    Confirmed { value: LeadStatus },
    Pending { value: LeadStatus, since: DateTime<Utc> },
}

impl StatusState {
    pub fn confirmed(value: LeadStatus) -> Self {
        StatusState::Confirmed { value }
    }

    pub fn pending(value: LeadStatus) -> Self {
        StatusState::Pending {
            value,
            since: Utc::now(),
        }
    }

    pub fn value(&self) -> LeadStatus {
        match self {
            StatusState::Confirmed { value } => *value,
            StatusState::Pending { value, .. } => *value,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, StatusState::Pending { .. })
    }
}

/// How a lead entered the system. The sole partitioning key between the
/// manual list and the workflow list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadSource {
    Manual,
    CsvUpload,
    Scraped,
    Api,
    Linkedin,
}

impl LeadSource {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "manual" => Some(LeadSource::Manual),
            "csv_upload" | "csv" => Some(LeadSource::CsvUpload),
            "scraped" | "scraper" | "workflow" => Some(LeadSource::Scraped),
            "api" | "api_import" => Some(LeadSource::Api),
            "linkedin" => Some(LeadSource::Linkedin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadSource::Manual => "manual",
            LeadSource::CsvUpload => "csv_upload",
            LeadSource::Scraped => "scraped",
            LeadSource::Api => "api",
            LeadSource::Linkedin => "linkedin",
        }
    }

    pub fn is_workflow(&self) -> bool {
        matches!(
            self,
            LeadSource::Scraped | LeadSource::Api | LeadSource::Linkedin
        )
    }
}

impl Default for LeadSource {
    fn default() -> Self {
        LeadSource::Manual
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Personnel {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    pub company: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub location: Option<String>,
    pub industry: Option<String>,
    pub company_size: Option<String>,
    pub revenue: Option<String>,
    pub employees_count: Option<i64>,
    pub status: StatusState,
    pub source: LeadSource,
    pub score: Option<f64>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub personnel: Vec<Personnel>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Lead {
    /// Partition membership is a pure function of source and personnel:
    /// a lead with workflow provenance or any attached personnel belongs to
    /// the workflow list, everything else to the manual list.
    pub fn is_workflow(&self) -> bool {
        self.source.is_workflow() || !self.personnel.is_empty()
    }
}

/// Payload for creating a lead. Only `company` is mandatory.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LeadDraft {
    pub company: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    pub source: LeadSource,
}

impl LeadDraft {
    pub fn manual(company: impl Into<String>) -> Self {
        LeadDraft {
            company: company.into(),
            source: LeadSource::Manual,
            ..Default::default()
        }
    }
}

/// Sparse update merged into whichever list currently holds the lead after
/// the backend accepts it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LeadPatch {
    #[serde(skip)]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employees_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<LeadStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl LeadPatch {
    pub fn new(id: impl Into<String>) -> Self {
        LeadPatch {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn apply(&self, lead: &mut Lead) {
        if let Some(v) = &self.company {
            lead.company = v.clone();
        }
        if let Some(v) = &self.contact_name {
            lead.contact_name = Some(v.clone());
        }
        if let Some(v) = &self.email {
            lead.email = Some(v.clone());
        }
        if let Some(v) = &self.phone {
            lead.phone = Some(v.clone());
        }
        if let Some(v) = &self.website {
            lead.website = Some(v.clone());
        }
        if let Some(v) = &self.location {
            lead.location = Some(v.clone());
        }
        if let Some(v) = &self.industry {
            lead.industry = Some(v.clone());
        }
        if let Some(v) = &self.company_size {
            lead.company_size = Some(v.clone());
        }
        if let Some(v) = &self.revenue {
            lead.revenue = Some(v.clone());
        }
        if let Some(v) = self.employees_count {
            lead.employees_count = Some(v);
        }
        if let Some(v) = self.status {
            lead.status = StatusState::confirmed(v);
        }
        if let Some(v) = self.score {
            lead.score = Some(v);
        }
        if let Some(v) = &self.tags {
            lead.tags = v.clone();
        }
        if let Some(v) = &self.notes {
            lead.notes = Some(v.clone());
        }
    }
}

/// Derived statistics over the union of both lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadStats {
    pub total: usize,
    pub qualified: usize,
    pub hot: usize,
    pub total_personnel: usize,
    pub companies_with_personnel: usize,
    pub avg_personnel_per_company: f64,
}

impl LeadStats {
    pub fn compute<'a, I>(leads: I) -> Self
    where
        I: IntoIterator<Item = &'a Lead>,
    {
        let mut stats = LeadStats::default();
        for lead in leads {
            stats.total += 1;
            match lead.status.value() {
                LeadStatus::Qualified => stats.qualified += 1,
                LeadStatus::Hot => stats.hot += 1,
                _ => {}
            }
            if !lead.personnel.is_empty() {
                stats.companies_with_personnel += 1;
                stats.total_personnel += lead.personnel.len();
            }
        }
        stats.avg_personnel_per_company = if stats.companies_with_personnel > 0 {
            stats.total_personnel as f64 / stats.companies_with_personnel as f64
        } else {
            0.0
        };
        stats
    }
}

pub struct CliApp {
    pub config: Config,
    pub store: Arc<LeadStore>,
    pub crm: CrmClient,
    pub user_email: Option<String>,
}

#[cfg(test)]
pub(crate) fn test_lead(id: &str, status: LeadStatus, personnel: usize) -> Lead {
    Lead {
        id: id.to_string(),
        company: format!("Company {}", id),
        contact_name: None,
        email: None,
        phone: None,
        website: None,
        location: None,
        industry: None,
        company_size: None,
        revenue: None,
        employees_count: None,
        status: StatusState::confirmed(status),
        source: LeadSource::Manual,
        score: None,
        tags: Vec::new(),
        notes: None,
        personnel: (0..personnel)
            .map(|i| Personnel {
                name: format!("Person {}", i),
                title: None,
                email: None,
            })
            .collect(),
        created_at: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_count_qualified_hot_and_personnel() {
        let leads = vec![
            test_lead("1", LeadStatus::Qualified, 0),
            test_lead("2", LeadStatus::Hot, 3),
            test_lead("3", LeadStatus::New, 1),
            test_lead("4", LeadStatus::Qualified, 0),
        ];
        let stats = LeadStats::compute(&leads);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.qualified, 2);
        assert_eq!(stats.hot, 1);
        assert_eq!(stats.total_personnel, 4);
        assert_eq!(stats.companies_with_personnel, 2);
        assert!((stats.avg_personnel_per_company - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn stats_avg_is_zero_without_personnel() {
        let leads = vec![test_lead("1", LeadStatus::New, 0)];
        let stats = LeadStats::compute(&leads);
        assert_eq!(stats.avg_personnel_per_company, 0.0);
    }

    #[test]
    fn workflow_membership_follows_source_or_personnel() {
        let mut manual = test_lead("1", LeadStatus::New, 0);
        assert!(!manual.is_workflow());

        manual.personnel.push(Personnel {
            name: "Jordan".into(),
            title: None,
            email: None,
        });
        assert!(manual.is_workflow());

        let mut scraped = test_lead("2", LeadStatus::New, 0);
        scraped.source = LeadSource::Scraped;
        assert!(scraped.is_workflow());
    }

    #[test]
    fn patch_only_touches_present_fields() {
        let mut target = test_lead("1", LeadStatus::New, 0);
        target.email = Some("old@example.com".into());

        let mut patch = LeadPatch::new("1");
        patch.company = Some("Renamed".into());
        patch.status = Some(LeadStatus::Qualified);
        patch.apply(&mut target);

        assert_eq!(target.company, "Renamed");
        assert_eq!(target.status, StatusState::confirmed(LeadStatus::Qualified));
        assert_eq!(target.email.as_deref(), Some("old@example.com"));
    }

    #[test]
    fn legacy_status_values_parse() {
        assert_eq!(LeadStatus::parse("HOT"), Some(LeadStatus::Hot));
        assert_eq!(LeadStatus::parse("converted"), Some(LeadStatus::Converted));
        assert_eq!(LeadStatus::parse("nonsense"), None);
    }
}
