use dialoguer::{theme::ColorfulTheme, Input, Select};

use crate::models::{CliApp, LeadPatch, Result};

const EDITABLE_FIELDS: [&str; 9] = [
    "company",
    "contact_name",
    "email",
    "phone",
    "website",
    "location",
    "industry",
    "notes",
    "score",
];

impl CliApp {
    pub async fn run_edit_lead(&self) -> Result<()> {
        self.ensure_loaded().await?;
        let theme = ColorfulTheme::default();

        let id: String = Input::with_theme(&theme)
            .with_prompt("Lead id")
            .interact_text()?;
        let Some(lead) = self.store.find_lead(id.trim()) else {
            println!("❌ No lead with id {}", id.trim());
            return Ok(());
        };

        let field_choice = Select::with_theme(&theme)
            .with_prompt("Field to edit")
            .default(0)
            .items(&EDITABLE_FIELDS)
            .interact()?;
        let field = EDITABLE_FIELDS[field_choice];

        let value: String = Input::with_theme(&theme)
            .with_prompt(format!("New value for {}", field))
            .allow_empty(true)
            .interact_text()?;

        let mut patch = LeadPatch::new(lead.id.clone());
        match field {
            "company" => patch.company = Some(value),
            "contact_name" => patch.contact_name = Some(value),
            "email" => patch.email = Some(value),
            "phone" => patch.phone = Some(value),
            "website" => patch.website = Some(value),
            "location" => patch.location = Some(value),
            "industry" => patch.industry = Some(value),
            "notes" => patch.notes = Some(value),
            "score" => match value.trim().parse::<f64>() {
                Ok(score) => patch.score = Some(score),
                Err(_) => {
                    println!("❌ Score must be a number");
                    return Ok(());
                }
            },
            _ => unreachable!("field list is fixed"),
        }

        match self.store.update_lead(&patch).await {
            Ok(()) => println!("✅ Updated {} on {}", field, lead.id),
            Err(e) => println!("❌ Edit not applied: {}", e),
        }
        Ok(())
    }
}
