use dialoguer::{theme::ColorfulTheme, Input};

use crate::models::{CliApp, LeadDraft, Result};

impl CliApp {
    pub async fn run_create_lead(&self) -> Result<()> {
        let theme = ColorfulTheme::default();

        let company: String = Input::with_theme(&theme)
            .with_prompt("Company")
            .allow_empty(true)
            .interact_text()?;
        let contact_name: String = Input::with_theme(&theme)
            .with_prompt("Contact name (optional)")
            .allow_empty(true)
            .interact_text()?;
        let email: String = Input::with_theme(&theme)
            .with_prompt("Email (optional)")
            .allow_empty(true)
            .interact_text()?;
        let phone: String = Input::with_theme(&theme)
            .with_prompt("Phone (optional)")
            .allow_empty(true)
            .interact_text()?;

        let mut draft = LeadDraft::manual(company);
        draft.contact_name = non_empty(contact_name);
        draft.email = non_empty(email);
        draft.phone = non_empty(phone);

        // Validation runs inside the store; a rejected draft never reaches
        // the backend.
        match self.store.create_lead(&draft).await {
            Ok(lead) => {
                println!("✅ Created lead {} ({})", lead.id, lead.company);
                Ok(())
            }
            Err(e) => {
                println!("❌ {}", e);
                Ok(())
            }
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
