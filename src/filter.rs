use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::models::{Lead, LeadStatus};

/// Which columns a text search is allowed to look at. A column whose flag
/// is off never matches, even when the term appears in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchColumns {
    pub company: bool,
    pub name: bool,
    pub email: bool,
    pub phone: bool,
    pub location: bool,
}

impl Default for SearchColumns {
    fn default() -> Self {
        Self {
            company: true,
            name: true,
            email: true,
            phone: true,
            location: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Contains,
    NotContains,
    Equals,
    NotEquals,
    StartsWith,
    EndsWith,
    IsEmpty,
    NotEmpty,
    GreaterThan,
    LessThan,
    GreaterEqual,
    LessEqual,
    Between,
    In,
    NotIn,
}

impl FilterOp {
    pub fn all() -> &'static [FilterOp] {
        &[
            FilterOp::Contains,
            FilterOp::NotContains,
            FilterOp::Equals,
            FilterOp::NotEquals,
            FilterOp::StartsWith,
            FilterOp::EndsWith,
            FilterOp::IsEmpty,
            FilterOp::NotEmpty,
            FilterOp::GreaterThan,
            FilterOp::LessThan,
            FilterOp::GreaterEqual,
            FilterOp::LessEqual,
            FilterOp::Between,
            FilterOp::In,
            FilterOp::NotIn,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            FilterOp::Contains => "contains",
            FilterOp::NotContains => "not_contains",
            FilterOp::Equals => "equals",
            FilterOp::NotEquals => "not_equals",
            FilterOp::StartsWith => "starts_with",
            FilterOp::EndsWith => "ends_with",
            FilterOp::IsEmpty => "is_empty",
            FilterOp::NotEmpty => "not_empty",
            FilterOp::GreaterThan => "greater_than",
            FilterOp::LessThan => "less_than",
            FilterOp::GreaterEqual => "greater_equal",
            FilterOp::LessEqual => "less_equal",
            FilterOp::Between => "between",
            FilterOp::In => "in",
            FilterOp::NotIn => "not_in",
        }
    }
}

impl std::fmt::Display for FilterOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One structured condition on one field. All conditions on a record are
/// ANDed; there is no OR.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterCondition {
    pub field: String,
    pub op: FilterOp,
    pub value: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Only(LeadStatus),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn flip(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    /// Clicking the same column again flips direction; a new column starts
    /// ascending.
    pub fn toggle(current: Option<&SortSpec>, field: &str) -> SortSpec {
        match current {
            Some(spec) if spec.field == field => SortSpec {
                field: spec.field.clone(),
                direction: spec.direction.flip(),
            },
            _ => SortSpec {
                field: field.to_string(),
                direction: SortDirection::Asc,
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListQuery {
    pub search_term: String,
    pub search_columns: SearchColumns,
    pub status: StatusFilter,
    pub conditions: Vec<FilterCondition>,
    pub sort: Option<SortSpec>,
}

/// Text value of a field, empty when absent. Keeping every field readable
/// as text is what lets one condition grammar cover the whole table.
fn field_text(lead: &Lead, field: &str) -> String {
    match field {
        "company" => lead.company.clone(),
        "name" | "contact_name" => lead.contact_name.clone().unwrap_or_default(),
        "email" => lead.email.clone().unwrap_or_default(),
        "phone" => lead.phone.clone().unwrap_or_default(),
        "website" => lead.website.clone().unwrap_or_default(),
        "location" => lead.location.clone().unwrap_or_default(),
        "industry" => lead.industry.clone().unwrap_or_default(),
        "company_size" => lead.company_size.clone().unwrap_or_default(),
        "revenue" => lead.revenue.clone().unwrap_or_default(),
        "employees_count" => lead
            .employees_count
            .map(|n| n.to_string())
            .unwrap_or_default(),
        "status" => lead.status.value().as_str().to_string(),
        "source" => lead.source.as_str().to_string(),
        "score" => lead.score.map(|s| s.to_string()).unwrap_or_default(),
        "tags" => lead.tags.join(","),
        "notes" => lead.notes.clone().unwrap_or_default(),
        "created_at" => lead
            .created_at
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

fn field_number(lead: &Lead, field: &str) -> Option<f64> {
    field_text(lead, field).trim().parse::<f64>().ok()
}

fn numeric_passes(lead: &Lead, condition: &FilterCondition, cmp: fn(f64, f64) -> bool) -> bool {
    // Absent or non-numeric values fail numeric conditions, they never error.
    match (field_number(lead, &condition.field), condition.value.trim().parse::<f64>()) {
        (Some(actual), Ok(wanted)) => cmp(actual, wanted),
        _ => false,
    }
}

pub fn condition_passes(lead: &Lead, condition: &FilterCondition) -> bool {
    let text = field_text(lead, &condition.field);
    let haystack = text.to_lowercase();
    let needle = condition.value.to_lowercase();

    match condition.op {
        FilterOp::Contains => haystack.contains(&needle),
        FilterOp::NotContains => !haystack.contains(&needle),
        FilterOp::Equals => haystack == needle,
        FilterOp::NotEquals => haystack != needle,
        FilterOp::StartsWith => haystack.starts_with(&needle),
        FilterOp::EndsWith => haystack.ends_with(&needle),
        FilterOp::IsEmpty => text.trim().is_empty(),
        FilterOp::NotEmpty => !text.trim().is_empty(),
        FilterOp::GreaterThan => numeric_passes(lead, condition, |a, b| a > b),
        FilterOp::LessThan => numeric_passes(lead, condition, |a, b| a < b),
        FilterOp::GreaterEqual => numeric_passes(lead, condition, |a, b| a >= b),
        FilterOp::LessEqual => numeric_passes(lead, condition, |a, b| a <= b),
        FilterOp::Between => {
            let mut bounds = condition.value.splitn(2, ',');
            let min = bounds.next().and_then(|s| s.trim().parse::<f64>().ok());
            let max = bounds.next().and_then(|s| s.trim().parse::<f64>().ok());
            match (field_number(lead, &condition.field), min, max) {
                (Some(actual), Some(min), Some(max)) => actual >= min && actual <= max,
                _ => false,
            }
        }
        FilterOp::In => condition
            .value
            .split(',')
            .any(|member| member.trim().to_lowercase() == haystack),
        FilterOp::NotIn => !condition
            .value
            .split(',')
            .any(|member| member.trim().to_lowercase() == haystack),
    }
}

fn search_matches(lead: &Lead, term: &str, columns: &SearchColumns) -> bool {
    if term.trim().is_empty() {
        return true;
    }
    let needle = term.to_lowercase();
    let mut fields: Vec<&str> = Vec::new();
    if columns.company {
        fields.push("company");
    }
    if columns.name {
        fields.push("name");
    }
    if columns.email {
        fields.push("email");
    }
    if columns.phone {
        fields.push("phone");
    }
    if columns.location {
        fields.push("location");
    }
    fields
        .iter()
        .any(|field| field_text(lead, field).to_lowercase().contains(&needle))
}

fn status_matches(lead: &Lead, filter: StatusFilter) -> bool {
    match filter {
        StatusFilter::All => true,
        StatusFilter::Only(status) => lead.status.value() == status,
    }
}

fn compare_by_field(a: &Lead, b: &Lead, field: &str) -> Ordering {
    match field {
        "status" => a
            .status
            .value()
            .sort_priority()
            .cmp(&b.status.value().sort_priority()),
        "score" => match (a.score, b.score) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        },
        "created_at" => a.created_at.cmp(&b.created_at),
        "employees_count" => a.employees_count.cmp(&b.employees_count),
        _ => field_text(a, field)
            .to_lowercase()
            .cmp(&field_text(b, field).to_lowercase()),
    }
}

/// Run the full pipeline over one list: search, status filter, structured
/// conditions, then a stable sort. Ties keep their incoming order.
pub fn apply_query(leads: &[Lead], query: &ListQuery) -> Vec<Lead> {
    let mut out: Vec<Lead> = leads
        .iter()
        .filter(|lead| search_matches(lead, &query.search_term, &query.search_columns))
        .filter(|lead| status_matches(lead, query.status))
        .filter(|lead| {
            query
                .conditions
                .iter()
                .all(|condition| condition_passes(lead, condition))
        })
        .cloned()
        .collect();

    if let Some(sort) = &query.sort {
        out.sort_by(|a, b| {
            let ordering = compare_by_field(a, b, &sort.field);
            match sort.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{test_lead, LeadStatus};

    fn named_lead(id: &str, company: &str, email: &str) -> Lead {
        let mut lead = test_lead(id, LeadStatus::New, 0);
        lead.company = company.to_string();
        lead.email = Some(email.to_string());
        lead
    }

    #[test]
    fn search_ignores_columns_that_are_switched_off() {
        let lead = named_lead("1", "Acme", "findme@example.com");
        let columns = SearchColumns {
            company: true,
            name: false,
            email: false,
            phone: false,
            location: false,
        };
        let query = ListQuery {
            search_term: "findme".to_string(),
            search_columns: columns,
            ..Default::default()
        };

        // The term only appears in the email column, which is off.
        assert!(apply_query(&[lead], &query).is_empty());
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let lead = named_lead("1", "Acme Rockets", "x@example.com");
        let query = ListQuery {
            search_term: "ROCK".to_string(),
            ..Default::default()
        };
        assert_eq!(apply_query(&[lead], &query).len(), 1);
    }

    #[test]
    fn conditions_on_one_field_are_anded() {
        let foo = named_lead("1", "foo industries", "a@example.com");
        let foobar = named_lead("2", "foo bar industries", "b@example.com");
        let query = ListQuery {
            conditions: vec![
                FilterCondition {
                    field: "company".to_string(),
                    op: FilterOp::Contains,
                    value: "foo".to_string(),
                },
                FilterCondition {
                    field: "company".to_string(),
                    op: FilterOp::NotContains,
                    value: "bar".to_string(),
                },
            ],
            ..Default::default()
        };

        let result = apply_query(&[foo, foobar], &query);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "1");
    }

    #[test]
    fn numeric_conditions_fail_gracefully_on_missing_values() {
        let mut scored = test_lead("1", LeadStatus::New, 0);
        scored.score = Some(75.0);
        let unscored = test_lead("2", LeadStatus::New, 0);

        let query = ListQuery {
            conditions: vec![FilterCondition {
                field: "score".to_string(),
                op: FilterOp::GreaterThan,
                value: "50".to_string(),
            }],
            ..Default::default()
        };

        let result = apply_query(&[scored, unscored], &query);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "1");
    }

    #[test]
    fn between_takes_an_inclusive_numeric_range() {
        let mut low = test_lead("1", LeadStatus::New, 0);
        low.score = Some(10.0);
        let mut mid = test_lead("2", LeadStatus::New, 0);
        mid.score = Some(50.0);
        let mut high = test_lead("3", LeadStatus::New, 0);
        high.score = Some(90.0);

        let query = ListQuery {
            conditions: vec![FilterCondition {
                field: "score".to_string(),
                op: FilterOp::Between,
                value: "25, 50".to_string(),
            }],
            ..Default::default()
        };

        let result = apply_query(&[low, mid, high], &query);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "2");
    }

    #[test]
    fn membership_conditions_split_on_commas() {
        let mut berlin = test_lead("1", LeadStatus::New, 0);
        berlin.location = Some("Berlin".to_string());
        let mut oslo = test_lead("2", LeadStatus::New, 0);
        oslo.location = Some("Oslo".to_string());

        let query = ListQuery {
            conditions: vec![FilterCondition {
                field: "location".to_string(),
                op: FilterOp::In,
                value: "berlin, paris".to_string(),
            }],
            ..Default::default()
        };

        let result = apply_query(&[berlin, oslo], &query);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "1");
    }

    #[test]
    fn status_filter_bypassed_on_all() {
        let leads = vec![
            test_lead("1", LeadStatus::New, 0),
            test_lead("2", LeadStatus::Lost, 0),
        ];
        let all = ListQuery::default();
        let only_lost = ListQuery {
            status: StatusFilter::Only(LeadStatus::Lost),
            ..Default::default()
        };

        assert_eq!(apply_query(&leads, &all).len(), 2);
        let lost = apply_query(&leads, &only_lost);
        assert_eq!(lost.len(), 1);
        assert_eq!(lost[0].id, "2");
    }

    #[test]
    fn status_sort_uses_the_priority_table() {
        let leads = vec![
            test_lead("lost", LeadStatus::Lost, 0),
            test_lead("converted", LeadStatus::Converted, 0),
            test_lead("new", LeadStatus::New, 0),
        ];
        let query = ListQuery {
            sort: Some(SortSpec {
                field: "status".to_string(),
                direction: SortDirection::Desc,
            }),
            ..Default::default()
        };

        let sorted = apply_query(&leads, &query);
        let ids: Vec<&str> = sorted.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["converted", "new", "lost"]);
    }

    #[test]
    fn sort_preserves_tie_order_both_directions() {
        // Four leads, two status groups; within a group the incoming order
        // must survive any number of direction flips.
        let leads = vec![
            test_lead("a", LeadStatus::New, 0),
            test_lead("b", LeadStatus::Qualified, 0),
            test_lead("c", LeadStatus::New, 0),
            test_lead("d", LeadStatus::Qualified, 0),
        ];
        let asc = ListQuery {
            sort: Some(SortSpec {
                field: "status".to_string(),
                direction: SortDirection::Asc,
            }),
            ..Default::default()
        };
        let desc = ListQuery {
            sort: Some(SortSpec {
                field: "status".to_string(),
                direction: SortDirection::Desc,
            }),
            ..Default::default()
        };

        let up = apply_query(&leads, &asc);
        let down = apply_query(&leads, &desc);
        let up_ids: Vec<&str> = up.iter().map(|l| l.id.as_str()).collect();
        let down_ids: Vec<&str> = down.iter().map(|l| l.id.as_str()).collect();

        assert_eq!(up_ids, vec!["a", "c", "b", "d"]);
        assert_eq!(down_ids, vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn score_sort_is_numeric_with_missing_values_first() {
        let mut nine = test_lead("nine", LeadStatus::New, 0);
        nine.score = Some(9.0);
        let mut eighty = test_lead("eighty", LeadStatus::New, 0);
        eighty.score = Some(80.0);
        let none = test_lead("none", LeadStatus::New, 0);

        let query = ListQuery {
            sort: Some(SortSpec {
                field: "score".to_string(),
                direction: SortDirection::Asc,
            }),
            ..Default::default()
        };

        let sorted = apply_query(&[eighty, none, nine], &query);
        let ids: Vec<&str> = sorted.iter().map(|l| l.id.as_str()).collect();
        // Lexicographic order would put "9" after "80".
        assert_eq!(ids, vec!["none", "nine", "eighty"]);
    }

    #[test]
    fn toggle_flips_same_column_and_resets_new_column() {
        let first = SortSpec::toggle(None, "company");
        assert_eq!(first.direction, SortDirection::Asc);

        let second = SortSpec::toggle(Some(&first), "company");
        assert_eq!(second.direction, SortDirection::Desc);

        let third = SortSpec::toggle(Some(&second), "score");
        assert_eq!(third.field, "score");
        assert_eq!(third.direction, SortDirection::Asc);
    }

    #[test]
    fn is_empty_and_not_empty_look_at_raw_text() {
        let mut with_notes = test_lead("1", LeadStatus::New, 0);
        with_notes.notes = Some("call back".to_string());
        let without_notes = test_lead("2", LeadStatus::New, 0);

        let empty = ListQuery {
            conditions: vec![FilterCondition {
                field: "notes".to_string(),
                op: FilterOp::IsEmpty,
                value: String::new(),
            }],
            ..Default::default()
        };

        let result = apply_query(&[with_notes, without_notes], &empty);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "2");
    }
}
