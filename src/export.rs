use chrono::Utc;
use std::io::Write;
use tracing::debug;

use crate::models::{Lead, LeadDraft, LeadSource, Result};

/// CSV in and out for lead lists. The server-side export is preferred; the
/// local renderer exists so a filtered view can still be saved when the
/// export endpoint is down.
pub struct LeadCsv;

const EXPORT_HEADER: &str =
    "id,company,contact_name,email,phone,website,location,industry,status,source,score,tags,notes";

const IMPORT_COLUMNS: [&str; 8] = [
    "company", "contact_name", "email", "phone", "website", "location", "industry", "notes",
];

impl LeadCsv {
    pub fn generate_filename(directory: &str) -> String {
        format!(
            "{}/leads_export_{}.csv",
            directory.trim_end_matches('/'),
            Utc::now().format("%Y-%m-%dT%H-%M-%S")
        )
    }

    pub fn write_file(path: &str, content: &str) -> Result<()> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::File::create(path)?;
        file.write_all(content.as_bytes())?;
        debug!("Wrote {} bytes to {}", content.len(), path);
        Ok(())
    }

    /// Render the given list locally, quoting fields that need it.
    pub fn render(leads: &[Lead]) -> String {
        let mut out = String::from(EXPORT_HEADER);
        out.push('\n');
        for lead in leads {
            let row = [
                lead.id.clone(),
                lead.company.clone(),
                lead.contact_name.clone().unwrap_or_default(),
                lead.email.clone().unwrap_or_default(),
                lead.phone.clone().unwrap_or_default(),
                lead.website.clone().unwrap_or_default(),
                lead.location.clone().unwrap_or_default(),
                lead.industry.clone().unwrap_or_default(),
                lead.status.value().as_str().to_string(),
                lead.source.as_str().to_string(),
                lead.score.map(|s| s.to_string()).unwrap_or_default(),
                lead.tags.join(";"),
                lead.notes.clone().unwrap_or_default(),
            ];
            let encoded: Vec<String> = row.iter().map(|field| quote(field)).collect();
            out.push_str(&encoded.join(","));
            out.push('\n');
        }
        out
    }

    /// Parse an import file into drafts. Rows are reported individually so
    /// one bad line does not sink the batch; imported rows enter the manual
    /// partition as CSV uploads.
    pub fn parse(content: &str) -> Vec<(usize, std::result::Result<LeadDraft, String>)> {
        let mut lines = content.lines().enumerate();
        let Some((_, header)) = lines.next() else {
            return Vec::new();
        };
        let columns: Vec<String> = split_row(header)
            .into_iter()
            .map(|c| c.trim().to_lowercase())
            .collect();

        let mut rows = Vec::new();
        for (index, line) in lines {
            if line.trim().is_empty() {
                continue;
            }
            let values = split_row(line);
            let mut draft = LeadDraft {
                source: LeadSource::CsvUpload,
                ..Default::default()
            };
            for (column, value) in columns.iter().zip(values.iter()) {
                if !IMPORT_COLUMNS.contains(&column.as_str()) {
                    continue;
                }
                let value = value.trim();
                if value.is_empty() {
                    continue;
                }
                match column.as_str() {
                    "company" => draft.company = value.to_string(),
                    "contact_name" => draft.contact_name = Some(value.to_string()),
                    "email" => draft.email = Some(value.to_string()),
                    "phone" => draft.phone = Some(value.to_string()),
                    "website" => draft.website = Some(value.to_string()),
                    "location" => draft.location = Some(value.to_string()),
                    "industry" => draft.industry = Some(value.to_string()),
                    "notes" => draft.notes = Some(value.to_string()),
                    _ => {}
                }
            }
            let row = if draft.company.trim().is_empty() {
                Err("missing company".to_string())
            } else {
                Ok(draft)
            };
            rows.push((index + 1, row));
        }
        rows
    }
}

fn quote(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

// Minimal quoted-field splitter; enough for the files this tool writes and
// the spreadsheets users feed it.
fn split_row(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                chars.next();
                current.push('"');
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}
