use dialoguer::{theme::ColorfulTheme, Input, Select};

use crate::leads_api::ReplySyncRequest;
use crate::models::{CliApp, Result};

impl CliApp {
    /// Ask the backend to scan the connected mailbox for replies and update
    /// matching leads. Requires a provider OAuth token in the environment.
    pub async fn run_sync_replies(&self) -> Result<()> {
        let theme = ColorfulTheme::default();

        let Some(access_token) = std::env::var("MAILBOX_ACCESS_TOKEN").ok() else {
            println!("❌ MAILBOX_ACCESS_TOKEN is not set; connect a mailbox first");
            return Ok(());
        };

        let providers = ["google", "microsoft"];
        let provider = Select::with_theme(&theme)
            .with_prompt("Mail provider")
            .default(0)
            .items(&providers)
            .interact()?;

        let days_back: u32 = Input::with_theme(&theme)
            .with_prompt("Days back")
            .with_initial_text("7")
            .interact_text()?;
        let max_leads: u32 = Input::with_theme(&theme)
            .with_prompt("Max leads")
            .with_initial_text("100")
            .interact_text()?;

        let request = ReplySyncRequest {
            access_token,
            provider: providers[provider].to_string(),
            days_back,
            max_leads,
        };

        match self.store.sync_replies(&request).await {
            Ok(summary) => {
                println!(
                    "✅ Synced {} repl(ies), {} lead(s) matched",
                    summary.synced, summary.matched
                );
                // Statuses may have changed server-side; pull fresh lists.
                if let Err(e) = self.store.load_leads(true).await {
                    println!("⚠️  Reply sync done but refresh failed: {}", e);
                }
            }
            Err(e) => println!("❌ {}", e),
        }
        Ok(())
    }
}
