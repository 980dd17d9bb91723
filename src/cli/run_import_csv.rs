use dialoguer::{theme::ColorfulTheme, Input};
use tracing::warn;

use crate::export::LeadCsv;
use crate::models::{CliApp, Result};

impl CliApp {
    pub async fn run_import_csv(&self) -> Result<()> {
        let theme = ColorfulTheme::default();

        let path: String = Input::with_theme(&theme)
            .with_prompt("CSV file to import")
            .interact_text()?;

        let content = tokio::fs::read_to_string(path.trim()).await?;
        let rows = LeadCsv::parse(&content);
        if rows.is_empty() {
            println!("Nothing to import");
            return Ok(());
        }

        let mut created = 0usize;
        let mut failed = 0usize;
        for (line, row) in rows {
            match row {
                Ok(draft) => match self.store.create_lead(&draft).await {
                    Ok(_) => created += 1,
                    Err(e) => {
                        warn!("Line {}: create failed: {}", line, e);
                        failed += 1;
                    }
                },
                Err(reason) => {
                    warn!("Line {}: skipped ({})", line, reason);
                    failed += 1;
                }
            }
        }

        println!("✅ Imported {} lead(s), {} row(s) failed", created, failed);
        Ok(())
    }
}
