use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};
use tracing::info;

use crate::models::{CliApp, LeadStatus, Result};

impl CliApp {
    /// Kick off a backend mass-email send. The backend updates each lead's
    /// status on its own schedule over the next minutes; locally the
    /// selection is marked contacted immediately through the UI-only path,
    /// so the list reflects the campaign without a status request per lead.
    pub async fn run_mass_email(&self) -> Result<()> {
        self.ensure_loaded().await?;
        let theme = ColorfulTheme::default();

        let modes = ["All leads with status 'new'", "Enter ids by hand"];
        let mode = Select::with_theme(&theme)
            .with_prompt("Recipients")
            .default(0)
            .items(&modes)
            .interact()?;

        let ids: Vec<String> = if mode == 0 {
            self.store
                .all_leads()
                .into_iter()
                .filter(|lead| lead.status.value() == LeadStatus::New)
                .filter(|lead| lead.email.is_some())
                .map(|lead| lead.id)
                .collect()
        } else {
            let raw: String = Input::with_theme(&theme)
                .with_prompt("Lead ids (comma separated)")
                .interact_text()?;
            raw.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        };

        if ids.is_empty() {
            println!("No recipients selected");
            return Ok(());
        }

        let template: String = Input::with_theme(&theme)
            .with_prompt("Template name")
            .with_initial_text("intro")
            .interact_text()?;

        let confirmed = Confirm::with_theme(&theme)
            .with_prompt(format!("Send '{}' to {} lead(s)?", template, ids.len()))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Skipped");
            return Ok(());
        }

        match self.store.send_mass_email(&ids, &template).await {
            Ok(()) => {
                info!("Mass email queued for {} leads", ids.len());
                println!(
                    "✅ Campaign queued. {} lead(s) marked contacted locally; the backend \
                     confirms each one as it sends.",
                    ids.len()
                );
            }
            Err(e) => println!("❌ Campaign not sent: {}", e),
        }
        Ok(())
    }
}
