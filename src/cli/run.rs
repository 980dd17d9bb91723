use dialoguer::{theme::ColorfulTheme, Select};

use crate::{
    cli::cli::MenuAction,
    models::{CliApp, Result},
};
use tracing::error;

impl CliApp {
    pub async fn run(&self) -> Result<()> {
        println!("\n🗂️  Welcome to Lead Desk!");
        println!("═══════════════════════════════════════");
        if let Some(email) = &self.user_email {
            println!("Signed in as {}", email);
        } else {
            println!("Signed out — lead loading is disabled");
        }

        if let Err(e) = self.ensure_loaded().await {
            error!("Initial lead load failed: {}", e);
        }
        self.show_lead_stats();

        loop {
            let actions = vec![
                MenuAction::ListLeads,
                MenuAction::CreateLead,
                MenuAction::UpdateStatus,
                MenuAction::EditLead,
                MenuAction::DeleteLead,
                MenuAction::ConvertLead,
                MenuAction::MassEmail,
                MenuAction::ImportCsv,
                MenuAction::ExportLeads,
                MenuAction::SyncReplies,
                MenuAction::RefreshLeads,
                MenuAction::ShowStats,
                MenuAction::ClearCache,
                MenuAction::Exit,
            ];

            let selection = Select::with_theme(&ColorfulTheme::default())
                .with_prompt("\nSelect an action")
                .default(0)
                .items(&actions)
                .interact()?;

            match &actions[selection] {
                MenuAction::ListLeads => {
                    if let Err(e) = self.run_list_leads().await {
                        error!("Browse failed: {}", e);
                    }
                }
                MenuAction::CreateLead => {
                    if let Err(e) = self.run_create_lead().await {
                        error!("Create failed: {}", e);
                    }
                }
                MenuAction::UpdateStatus => {
                    if let Err(e) = self.run_update_status().await {
                        error!("Status update failed: {}", e);
                    }
                }
                MenuAction::EditLead => {
                    if let Err(e) = self.run_edit_lead().await {
                        error!("Edit failed: {}", e);
                    }
                }
                MenuAction::DeleteLead => {
                    if let Err(e) = self.run_delete_lead().await {
                        error!("Delete failed: {}", e);
                    }
                }
                MenuAction::ConvertLead => {
                    if let Err(e) = self.run_convert_lead().await {
                        error!("Conversion failed: {}", e);
                    }
                }
                MenuAction::MassEmail => {
                    if let Err(e) = self.run_mass_email().await {
                        error!("Mass email failed: {}", e);
                    }
                }
                MenuAction::ImportCsv => {
                    if let Err(e) = self.run_import_csv().await {
                        error!("Import failed: {}", e);
                    }
                }
                MenuAction::ExportLeads => {
                    if let Err(e) = self.run_export_leads().await {
                        error!("Export failed: {}", e);
                    }
                }
                MenuAction::SyncReplies => {
                    if let Err(e) = self.run_sync_replies().await {
                        error!("Reply sync failed: {}", e);
                    }
                }
                MenuAction::RefreshLeads => {
                    if let Err(e) = self.store.load_leads(true).await {
                        error!("Refresh failed: {}", e);
                    } else {
                        println!("✅ Lead lists refreshed");
                    }
                }
                MenuAction::ShowStats => {
                    self.show_lead_stats();
                }
                MenuAction::ClearCache => {
                    let scopes = ["This account's lead data", "Everything"];
                    let scope = Select::with_theme(&ColorfulTheme::default())
                        .with_prompt("Clear what")
                        .default(0)
                        .items(&scopes)
                        .interact()?;
                    if scope == 0 {
                        self.store.clear_lead_cache();
                    } else {
                        self.store.clear_cache();
                    }
                    println!("✅ Local cache cleared");
                }
                MenuAction::Exit => {
                    println!("\n👋 Thanks for using Lead Desk!");
                    break;
                }
            }
        }

        Ok(())
    }
}
