pub mod cli;
pub mod run;
pub mod run_convert_lead;
pub mod run_create_lead;
pub mod run_delete_lead;
pub mod run_edit_lead;
pub mod run_export_leads;
pub mod run_import_csv;
pub mod run_list_leads;
pub mod run_mass_email;
pub mod run_sync_replies;
pub mod run_update_status;
pub mod show_lead_stats;
