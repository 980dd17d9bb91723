use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};

use crate::cli::cli::print_lead_row;
use crate::filter::{
    apply_query, FilterCondition, FilterOp, ListQuery, SearchColumns, SortSpec, StatusFilter,
};
use crate::models::{CliApp, Lead, LeadStatus, Result};

const SORTABLE_FIELDS: [&str; 6] = ["company", "status", "score", "created_at", "email", "source"];
const FILTERABLE_FIELDS: [&str; 9] = [
    "company",
    "name",
    "email",
    "phone",
    "location",
    "industry",
    "status",
    "score",
    "employees_count",
];

impl CliApp {
    pub async fn run_list_leads(&self) -> Result<()> {
        self.ensure_loaded().await?;

        let theme = ColorfulTheme::default();

        let lists = ["Manual leads", "Workflow leads", "Both"];
        let list_choice = Select::with_theme(&theme)
            .with_prompt("Which list")
            .default(2)
            .items(&lists)
            .interact()?;

        // A saved view from last time takes the place of the prompts.
        let saved = self.store.load_list_prefs().filter(|_| {
            Confirm::with_theme(&theme)
                .with_prompt("Reuse the view settings from last time?")
                .default(true)
                .interact()
                .unwrap_or(false)
        });

        let (search_term, search_columns, status, conditions, mut sort) = match saved {
            Some(q) => (q.search_term, q.search_columns, q.status, q.conditions, q.sort),
            None => {
                let search_term: String = Input::with_theme(&theme)
                    .with_prompt("Search term (empty for none)")
                    .allow_empty(true)
                    .interact_text()?;

                let search_columns = if search_term.trim().is_empty() {
                    SearchColumns::default()
                } else {
                    self.prompt_search_columns(&theme)?
                };

                let status = self.prompt_status_filter(&theme)?;
                let conditions = self.prompt_conditions(&theme)?;

                let sort_fields: Vec<&str> = SORTABLE_FIELDS.to_vec();
                let mut sort_options = vec!["(no sort)"];
                sort_options.extend(sort_fields.iter().copied());
                let sort_choice = Select::with_theme(&theme)
                    .with_prompt("Sort by")
                    .default(0)
                    .items(&sort_options)
                    .interact()?;
                let sort = if sort_choice == 0 {
                    None
                } else {
                    Some(SortSpec::toggle(None, sort_fields[sort_choice - 1]))
                };
                (search_term, search_columns, status, conditions, sort)
            }
        };

        loop {
            let query = ListQuery {
                search_term: search_term.clone(),
                search_columns: search_columns.clone(),
                status,
                conditions: conditions.clone(),
                sort: sort.clone(),
            };

            // The two partitions are queried independently; they only meet
            // for the combined count line.
            let manual = apply_query(&self.store.manual_leads(), &query);
            let workflow = apply_query(&self.store.workflow_leads(), &query);

            match list_choice {
                0 => print_list("Manual leads", &manual),
                1 => print_list("Workflow leads", &workflow),
                _ => {
                    print_list("Manual leads", &manual);
                    print_list("Workflow leads", &workflow);
                }
            }
            println!("  {} lead(s) matched in total", manual.len() + workflow.len());

            let Some(current) = sort.clone() else { break };
            let follow_up = ["Flip sort direction", "Done"];
            let choice = Select::with_theme(&theme)
                .with_prompt("Next")
                .default(1)
                .items(&follow_up)
                .interact()?;
            if choice == 0 {
                sort = Some(SortSpec::toggle(Some(&current), &current.field));
            } else {
                break;
            }
        }

        self.store.save_list_prefs(&ListQuery {
            search_term,
            search_columns,
            status,
            conditions,
            sort,
        });

        Ok(())
    }

    fn prompt_search_columns(&self, theme: &ColorfulTheme) -> Result<SearchColumns> {
        let presets = [
            "All searchable columns",
            "Company only",
            "Contact details (name, email, phone)",
        ];
        let choice = Select::with_theme(theme)
            .with_prompt("Search in")
            .default(0)
            .items(&presets)
            .interact()?;
        Ok(match choice {
            1 => SearchColumns {
                company: true,
                name: false,
                email: false,
                phone: false,
                location: false,
            },
            2 => SearchColumns {
                company: false,
                name: true,
                email: true,
                phone: true,
                location: false,
            },
            _ => SearchColumns::default(),
        })
    }

    fn prompt_status_filter(&self, theme: &ColorfulTheme) -> Result<StatusFilter> {
        let mut options = vec!["all".to_string()];
        options.extend(LeadStatus::all().iter().map(|s| s.to_string()));
        let choice = Select::with_theme(theme)
            .with_prompt("Status filter")
            .default(0)
            .items(&options)
            .interact()?;
        Ok(if choice == 0 {
            StatusFilter::All
        } else {
            StatusFilter::Only(LeadStatus::all()[choice - 1])
        })
    }

    fn prompt_conditions(&self, theme: &ColorfulTheme) -> Result<Vec<FilterCondition>> {
        let mut conditions = Vec::new();
        loop {
            let mut fields = vec!["(done)"];
            fields.extend(FILTERABLE_FIELDS.iter().copied());
            let field_choice = Select::with_theme(theme)
                .with_prompt("Add a column filter")
                .default(0)
                .items(&fields)
                .interact()?;
            if field_choice == 0 {
                break;
            }
            let field = FILTERABLE_FIELDS[field_choice - 1].to_string();

            let ops = FilterOp::all();
            let op_choice = Select::with_theme(theme)
                .with_prompt("Condition")
                .default(0)
                .items(ops)
                .interact()?;
            let op = ops[op_choice];

            let value = match op {
                FilterOp::IsEmpty | FilterOp::NotEmpty => String::new(),
                _ => Input::with_theme(theme)
                    .with_prompt("Value (between: min,max / in: a,b,c)")
                    .allow_empty(true)
                    .interact_text()?,
            };

            conditions.push(FilterCondition { field, op, value });
        }
        Ok(conditions)
    }
}

fn print_list(title: &str, leads: &[Lead]) {
    println!("\n{} ({}):", title, leads.len());
    if leads.is_empty() {
        println!("  (none)");
        return;
    }
    println!(
        "  {:<10} {:<28} {:<24} {:<12} {:<10} {}",
        "id", "company", "email", "status", "source", "score"
    );
    for lead in leads {
        print_lead_row(lead);
    }
}
