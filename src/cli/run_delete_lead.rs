use dialoguer::{theme::ColorfulTheme, Confirm, Input};

use crate::models::{CliApp, Result};

impl CliApp {
    pub async fn run_delete_lead(&self) -> Result<()> {
        self.ensure_loaded().await?;
        let theme = ColorfulTheme::default();

        let id: String = Input::with_theme(&theme)
            .with_prompt("Lead id to delete")
            .interact_text()?;
        let Some(lead) = self.store.find_lead(id.trim()) else {
            println!("❌ No lead with id {}", id.trim());
            return Ok(());
        };

        let confirmed = Confirm::with_theme(&theme)
            .with_prompt(format!("Delete {} ({})? This cannot be undone", lead.id, lead.company))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Skipped");
            return Ok(());
        }

        match self.store.delete_lead(&lead.id).await {
            Ok(()) => println!("✅ Deleted {}", lead.id),
            Err(e) => println!("❌ Delete failed, lead kept: {}", e),
        }
        Ok(())
    }
}
