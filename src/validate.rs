use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

use crate::models::LeadDraft;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Company name is required")]
    CompanyRequired,
    #[error("Invalid email format")]
    InvalidEmail,
    #[error("Score must be between 0 and 100")]
    ScoreOutOfRange,
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("static pattern"))
}

/// Pre-flight checks for a new lead. Runs before any network call; a draft
/// that fails here is never sent. Company is the only required field.
pub fn validate_new_lead(draft: &LeadDraft) -> Result<(), ValidationError> {
    if draft.company.trim().is_empty() {
        return Err(ValidationError::CompanyRequired);
    }
    if let Some(email) = &draft.email {
        if !email.trim().is_empty() && !email_pattern().is_match(email.trim()) {
            return Err(ValidationError::InvalidEmail);
        }
    }
    if let Some(score) = draft.score {
        if !(0.0..=100.0).contains(&score) {
            return Err(ValidationError::ScoreOutOfRange);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn company_alone_is_sufficient() {
        assert_eq!(validate_new_lead(&LeadDraft::manual("A")), Ok(()));
    }

    #[test]
    fn blank_company_is_rejected() {
        assert_eq!(
            validate_new_lead(&LeadDraft::manual("   ")),
            Err(ValidationError::CompanyRequired)
        );
    }

    #[test]
    fn malformed_email_is_rejected() {
        let mut draft = LeadDraft::manual("Acme");
        draft.email = Some("not-an-email".to_string());
        assert_eq!(
            validate_new_lead(&draft),
            Err(ValidationError::InvalidEmail)
        );

        draft.email = Some("ok@example.com".to_string());
        assert_eq!(validate_new_lead(&draft), Ok(()));
    }

    #[test]
    fn score_must_stay_in_range() {
        let mut draft = LeadDraft::manual("Acme");
        draft.score = Some(101.0);
        assert_eq!(
            validate_new_lead(&draft),
            Err(ValidationError::ScoreOutOfRange)
        );

        draft.score = Some(100.0);
        assert_eq!(validate_new_lead(&draft), Ok(()));
    }
}
