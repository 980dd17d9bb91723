use dialoguer::{theme::ColorfulTheme, Input, Select};

use crate::models::{CliApp, LeadStatus, Result};

impl CliApp {
    pub async fn run_update_status(&self) -> Result<()> {
        self.ensure_loaded().await?;
        let theme = ColorfulTheme::default();

        let id: String = Input::with_theme(&theme)
            .with_prompt("Lead id")
            .interact_text()?;

        let Some(lead) = self.store.find_lead(id.trim()) else {
            println!("❌ No lead with id {}", id.trim());
            return Ok(());
        };
        println!(
            "Current status of {} ({}): {}",
            lead.id,
            lead.company,
            lead.status.value()
        );

        let statuses = LeadStatus::all();
        let choice = Select::with_theme(&theme)
            .with_prompt("New status")
            .default(0)
            .items(statuses)
            .interact()?;

        // Remote first. A rejected call leaves the displayed status exactly
        // as it was.
        match self.store.update_lead_status(&lead.id, statuses[choice]).await {
            Ok(()) => println!("✅ {} is now {}", lead.id, statuses[choice]),
            Err(e) => println!("❌ Status unchanged: {}", e),
        }
        Ok(())
    }
}
