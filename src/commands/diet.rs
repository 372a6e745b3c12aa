use clap::{Args, Subcommand};
use std::io::{self, Write};

use super::{find_diet, parse_date, OutputFormat};
use crate::session::SyncSession;
use vitalog_core::{AttachmentType, DietUpdate, NewDiet};

#[derive(Args)]
pub struct DietCommand {
    #[command(subcommand)]
    pub command: DietSubcommand,
}

#[derive(Subcommand)]
pub enum DietSubcommand {
    /// Create a new diet
    Create {
        /// Name of the diet
        name: String,

        /// Short description
        #[arg(long)]
        description: Option<String>,

        /// Start date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        start: Option<chrono::NaiveDate>,

        /// End date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        end: Option<chrono::NaiveDate>,

        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,

        /// URL of an attached plan document
        #[arg(long)]
        attachment_url: Option<String>,

        /// Attachment type (image or pdf)
        #[arg(long, default_value = "pdf")]
        attachment_type: AttachmentType,

        /// Make this the active diet
        #[arg(long)]
        activate: bool,
    },

    /// List all diets
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show a diet's details
    Show {
        /// Diet ID (UUID) or name
        identifier: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Update an existing diet
    Update {
        /// Diet ID (UUID) or name
        identifier: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New description
        #[arg(long)]
        description: Option<String>,

        /// New start date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        start: Option<chrono::NaiveDate>,

        /// New end date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        end: Option<chrono::NaiveDate>,

        /// New notes
        #[arg(long)]
        notes: Option<String>,

        /// New attachment URL
        #[arg(long)]
        attachment_url: Option<String>,

        /// Attachment type (image or pdf)
        #[arg(long, default_value = "pdf")]
        attachment_type: AttachmentType,
    },

    /// Delete a diet
    Delete {
        /// Diet ID (UUID) or name
        identifier: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },

    /// Make a diet the active one
    Activate {
        /// Diet ID (UUID) or name
        identifier: String,
    },

    /// Deactivate every diet
    Deactivate,
}

impl DietCommand {
    pub async fn run(&self, session: SyncSession) -> Result<(), Box<dyn std::error::Error>> {
        let store = session.store().clone();

        match &self.command {
            DietSubcommand::Create {
                name,
                description,
                start,
                end,
                notes,
                attachment_url,
                attachment_type,
                activate,
            } => {
                let mut input = NewDiet::new(name.as_str()).with_dates(*start, *end);
                if let Some(description) = description {
                    input = input.with_description(description.as_str());
                }
                if let Some(notes) = notes {
                    input = input.with_notes(notes.as_str());
                }
                if let Some(url) = attachment_url {
                    input = input.with_attachment(url.as_str(), *attachment_type);
                }

                let mut created = store.add_diet(input)?;
                if *activate {
                    store.set_active_diet(created.id)?;
                    created.is_active = true;
                }

                println!("Created diet:");
                println!("{}", created);
            }

            DietSubcommand::List { format } => {
                let state = session.state();
                let diets = state.diets_by_name();

                if diets.is_empty() {
                    println!("No diets found");
                } else {
                    match format {
                        OutputFormat::Json => {
                            println!("{}", serde_json::to_string_pretty(&diets)?);
                        }
                        OutputFormat::Text => {
                            println!("{:<36}  {:<30}  {:<6}  PERIOD", "ID", "NAME", "ACTIVE");
                            println!("{}", "-".repeat(90));
                            for diet in &diets {
                                let name = if diet.name.chars().count() > 30 {
                                    let short: String = diet.name.chars().take(27).collect();
                                    format!("{}...", short)
                                } else {
                                    diet.name.clone()
                                };
                                let active = if diet.is_active { "yes" } else { "" };
                                let period = match (diet.start_date, diet.end_date) {
                                    (Some(s), Some(e)) => format!("{} to {}", s, e),
                                    (Some(s), None) => format!("since {}", s),
                                    (None, Some(e)) => format!("until {}", e),
                                    (None, None) => String::new(),
                                };
                                println!("{:<36}  {:<30}  {:<6}  {}", diet.id, name, active, period);
                            }
                            println!("\nTotal: {} diet(s)", diets.len());
                        }
                    }
                }
            }

            DietSubcommand::Show { identifier, format } => {
                let state = session.state();
                let diet = find_diet(&state, identifier)?;
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(diet)?),
                    OutputFormat::Text => {
                        print!("{}", diet);
                        if let (Some(url), Some(kind)) = (&diet.attachment_url, diet.attachment_type)
                        {
                            println!("Attachment ({}): {}", kind, url);
                        }
                        let logged = state
                            .food_entries
                            .iter()
                            .filter(|e| e.diet_id == Some(diet.id))
                            .count();
                        println!("Entries logged: {}", logged);
                    }
                }
            }

            DietSubcommand::Update {
                identifier,
                name,
                description,
                start,
                end,
                notes,
                attachment_url,
                attachment_type,
            } => {
                let update = DietUpdate {
                    name: name.clone(),
                    description: description.clone(),
                    start_date: *start,
                    end_date: *end,
                    notes: notes.clone(),
                    attachment: attachment_url.clone().map(|url| (url, *attachment_type)),
                };
                if update == DietUpdate::default() {
                    return Err("Nothing to update. Provide at least one option.".into());
                }

                let id = find_diet(&session.state(), identifier)?.id;
                let updated = store.update_diet(id, update)?;
                println!("Updated diet:");
                println!("{}", updated);
            }

            DietSubcommand::Delete { identifier, force } => {
                let diet = find_diet(&session.state(), identifier)?.clone();

                if !force {
                    print!("Delete diet '{}'? [y/N] ", diet.name);
                    io::stdout().flush()?;

                    let mut input = String::new();
                    io::stdin().read_line(&mut input)?;

                    if !input.trim().eq_ignore_ascii_case("y") {
                        println!("Deletion cancelled.");
                        session.finish().await?;
                        return Ok(());
                    }
                }

                store.delete_diet(diet.id)?;
                println!("Deleted diet: {}", diet.name);
            }

            DietSubcommand::Activate { identifier } => {
                let diet = find_diet(&session.state(), identifier)?.clone();
                store.set_active_diet(diet.id)?;
                println!("Active diet: {}", diet.name);
            }

            DietSubcommand::Deactivate => {
                store.deactivate_all_diets();
                println!("No diet is active");
            }
        }

        session.finish().await
    }
}
