use dialoguer::{theme::ColorfulTheme, Confirm, Input};

use crate::models::{CliApp, Result};

impl CliApp {
    /// Promote a lead to a CRM customer. The backend reassigns the record
    /// rather than deleting it, so locally the lead is only dropped from
    /// state; no delete call is made.
    pub async fn run_convert_lead(&self) -> Result<()> {
        self.ensure_loaded().await?;
        let theme = ColorfulTheme::default();

        let id: String = Input::with_theme(&theme)
            .with_prompt("Lead id to convert")
            .interact_text()?;
        let Some(lead) = self.store.find_lead(id.trim()) else {
            println!("❌ No lead with id {}", id.trim());
            return Ok(());
        };

        let confirmed = Confirm::with_theme(&theme)
            .with_prompt(format!("Convert {} ({}) to a customer?", lead.id, lead.company))
            .default(true)
            .interact()?;
        if !confirmed {
            println!("Skipped");
            return Ok(());
        }

        match self.crm.create_customer(&lead).await {
            Ok(customer_id) => {
                self.store.remove_lead_from_state(&lead.id);
                println!("✅ {} is now customer {}", lead.company, customer_id);
            }
            Err(e) => println!("❌ Conversion failed, lead kept: {}", e),
        }
        Ok(())
    }
}
