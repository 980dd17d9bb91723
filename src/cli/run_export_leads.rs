use tracing::warn;

use crate::export::LeadCsv;
use crate::models::{CliApp, Result};

impl CliApp {
    pub async fn run_export_leads(&self) -> Result<()> {
        self.ensure_loaded().await?;

        // Prefer the server-side export; it includes columns this client
        // does not hold. Fall back to rendering the in-memory lists.
        let csv = match self.store.export_csv().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Export endpoint unavailable ({}), rendering locally", e);
                LeadCsv::render(&self.store.all_leads())
            }
        };

        let filename = LeadCsv::generate_filename(&self.config.output.directory);
        LeadCsv::write_file(&filename, &csv)?;
        println!("✅ Exported leads to {}", filename);
        Ok(())
    }
}
