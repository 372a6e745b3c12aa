use chrono::{Local, NaiveDate};
use clap::{Args, Subcommand};
use std::io::{self, Write};
use uuid::Uuid;

use super::{find_diet, find_entry, parse_date, OutputFormat};
use crate::session::SyncSession;
use vitalog_core::{EntryType, FoodEntry, FoodEntryUpdate, MealType, NewFoodEntry, StoreState};

/// Diet reference meaning "no diet".
const NO_DIET: &str = "none";

#[derive(Args)]
pub struct LogArgs {
    /// Meal type (breakfast, lunch, dinner, snack, custom)
    pub meal: MealType,

    /// What was eaten
    pub text: Option<String>,

    /// Entry type; inferred from the content options when omitted
    #[arg(long = "type")]
    pub entry_type: Option<EntryType>,

    /// URL of a photo of the meal
    #[arg(long)]
    pub image_url: Option<String>,

    /// URL of a voice note describing the meal
    #[arg(long)]
    pub audio_url: Option<String>,

    /// Tags (can be repeated)
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    /// Short observation
    #[arg(long)]
    pub observation: Option<String>,

    /// Diet ID or name; defaults to the active diet, "none" for no diet
    #[arg(long)]
    pub diet: Option<String>,
}

impl LogArgs {
    fn resolved_type(&self) -> EntryType {
        match self.entry_type {
            Some(kind) => kind,
            None if self.image_url.is_some() => EntryType::Image,
            None if self.audio_url.is_some() => EntryType::Audio,
            None => EntryType::Text,
        }
    }

    fn to_new_entry(&self, state: &StoreState) -> Result<NewFoodEntry, String> {
        let entry_type = self.resolved_type();
        let has_content = match entry_type {
            EntryType::Text => self.text.as_deref().is_some_and(|t| !t.trim().is_empty()),
            EntryType::Image => self.image_url.is_some(),
            EntryType::Audio => self.audio_url.is_some(),
        };
        if !has_content {
            return Err(format!("A {} entry needs its content", entry_type));
        }

        let mut input = NewFoodEntry::new(self.meal, entry_type).with_tags(self.tags.clone());
        if let Some(text) = &self.text {
            input = input.with_text(text.as_str());
        }
        if let Some(url) = &self.image_url {
            input = input.with_image_url(url.as_str());
        }
        if let Some(url) = &self.audio_url {
            input = input.with_audio_url(url.as_str());
        }
        if let Some(observation) = &self.observation {
            input = input.with_observation(observation.as_str());
        }
        if let Some(diet_id) = resolve_diet_ref(state, self.diet.as_deref())? {
            input = input.with_diet_id(diet_id);
        }
        Ok(input)
    }

    pub async fn run(&self, session: SyncSession) -> Result<(), Box<dyn std::error::Error>> {
        let input = self.to_new_entry(&session.state())?;
        let entry = session.store().add_food_entry(input)?;

        println!("Logged entry:");
        print_entry(&session.state(), &entry);
        session.finish().await
    }
}

/// Resolves `--diet`: absent means the active diet, "none" means no diet.
fn resolve_diet_ref(state: &StoreState, reference: Option<&str>) -> Result<Option<Uuid>, String> {
    match reference {
        None => Ok(state.active_diet().map(|d| d.id)),
        Some(r) if r.eq_ignore_ascii_case(NO_DIET) => Ok(None),
        Some(r) => find_diet(state, r).map(|d| Some(d.id)),
    }
}

#[derive(Args)]
pub struct EntryCommand {
    #[command(subcommand)]
    pub command: EntrySubcommand,
}

#[derive(Subcommand)]
pub enum EntrySubcommand {
    /// List food entries, newest first
    List {
        /// Only entries logged on this day (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,

        /// Only entries of this meal type
        #[arg(long)]
        meal: Option<MealType>,

        /// Only entries logged under this diet (ID or name)
        #[arg(long)]
        diet: Option<String>,

        /// Only entries with this tag
        #[arg(long)]
        tag: Option<String>,

        /// Maximum number of entries to show
        #[arg(long, short = 'n')]
        limit: Option<usize>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show a food entry
    Show {
        /// Entry ID or ID prefix
        identifier: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Update a food entry
    Update {
        /// Entry ID or ID prefix
        identifier: String,

        /// New meal type
        #[arg(long)]
        meal: Option<MealType>,

        /// New text
        #[arg(long)]
        text: Option<String>,

        /// New image URL; an empty value clears it
        #[arg(long)]
        image_url: Option<String>,

        /// New audio URL; an empty value clears it
        #[arg(long)]
        audio_url: Option<String>,

        /// Replace tags (can be repeated)
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,

        /// Remove every tag
        #[arg(long, conflicts_with = "tags")]
        clear_tags: bool,

        /// New observation; an empty value clears it
        #[arg(long)]
        observation: Option<String>,

        /// Diet ID or name, or "none" to detach the entry
        #[arg(long)]
        diet: Option<String>,
    },

    /// Delete a food entry
    Delete {
        /// Entry ID or ID prefix
        identifier: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl EntryCommand {
    pub async fn run(&self, session: SyncSession) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            EntrySubcommand::List {
                date,
                meal,
                diet,
                tag,
                limit,
                format,
            } => {
                let state = session.state();
                let diet_id = match diet {
                    Some(reference) => Some(find_diet(&state, reference)?.id),
                    None => None,
                };
                let tag = tag.as_ref().map(|t| t.trim().to_lowercase());

                let entries: Vec<&FoodEntry> = state
                    .entries_newest_first()
                    .into_iter()
                    .filter(|e| date.map_or(true, |d| local_day(e) == d))
                    .filter(|e| meal.map_or(true, |m| e.meal_type == m))
                    .filter(|e| diet_id.is_none() || e.diet_id == diet_id)
                    .filter(|e| {
                        tag.as_ref()
                            .map_or(true, |t| e.tags.iter().any(|x| x.to_lowercase() == *t))
                    })
                    .take(limit.unwrap_or(usize::MAX))
                    .collect();

                if entries.is_empty() {
                    println!("No food entries found");
                } else {
                    match format {
                        OutputFormat::Json => {
                            println!("{}", serde_json::to_string_pretty(&entries)?);
                        }
                        OutputFormat::Text => {
                            println!(
                                "{:<8}  {:<16}  {:<9}  {:<5}  CONTENT",
                                "ID", "LOGGED", "MEAL", "TYPE"
                            );
                            println!("{}", "-".repeat(80));
                            for entry in &entries {
                                println!(
                                    "{:<8}  {:<16}  {:<9}  {:<5}  {}",
                                    short_id(&entry.id),
                                    entry.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                                    entry.meal_type.to_string(),
                                    entry.entry_type.to_string(),
                                    truncate(entry.content().unwrap_or(""), 40)
                                );
                            }
                            println!("\nTotal: {} entry(ies)", entries.len());
                        }
                    }
                }
                session.finish().await
            }

            EntrySubcommand::Show { identifier, format } => {
                let state = session.state();
                let entry = find_entry(&state, identifier)?;
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(entry)?),
                    OutputFormat::Text => print_entry(&state, entry),
                }
                session.finish().await
            }

            EntrySubcommand::Update {
                identifier,
                meal,
                text,
                image_url,
                audio_url,
                tags,
                clear_tags,
                observation,
                diet,
            } => {
                let state = session.state();
                let id = find_entry(&state, identifier)?.id;

                let tags = if *clear_tags {
                    Some(Vec::new())
                } else if tags.is_empty() {
                    None
                } else {
                    Some(tags.clone())
                };
                let diet_id = match diet {
                    Some(reference) => Some(resolve_diet_ref(&state, Some(reference.as_str()))?),
                    None => None,
                };
                let update = FoodEntryUpdate {
                    meal_type: *meal,
                    text: text.clone(),
                    image_url: image_url.clone(),
                    audio_url: audio_url.clone(),
                    tags,
                    observation: observation.clone(),
                    diet_id,
                };
                if update.is_empty() {
                    return Err("Nothing to update. Provide at least one option.".into());
                }

                let updated = session.store().update_food_entry(id, update)?;
                println!("Updated entry:");
                print_entry(&session.state(), &updated);
                session.finish().await
            }

            EntrySubcommand::Delete { identifier, force } => {
                let entry = find_entry(&session.state(), identifier)?.clone();

                if !force {
                    print!(
                        "Delete {} entry from {}? [y/N] ",
                        entry.meal_type,
                        entry.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
                    );
                    io::stdout().flush()?;

                    let mut input = String::new();
                    io::stdin().read_line(&mut input)?;

                    if !input.trim().eq_ignore_ascii_case("y") {
                        println!("Deletion cancelled.");
                        return session.finish().await;
                    }
                }

                session.store().delete_food_entry(entry.id)?;
                println!("Deleted entry {}", short_id(&entry.id));
                session.finish().await
            }
        }
    }
}

fn print_entry(state: &StoreState, entry: &FoodEntry) {
    print!("{}", entry);
    println!("  ID: {}", entry.id);
    match (entry.diet_id, state.resolve_diet(entry)) {
        (Some(_), Some(diet)) => println!("  Diet: {}", diet.name),
        (Some(id), None) => println!("  Diet: {} (deleted)", id),
        (None, _) => {}
    }
}

fn local_day(entry: &FoodEntry) -> NaiveDate {
    entry.created_at.with_timezone(&Local).date_naive()
}

fn short_id(id: &Uuid) -> String {
    id.to_string()[..8].to_string()
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let short: String = text.chars().take(max - 3).collect();
        format!("{}...", short)
    } else {
        text.to_string()
    }
}
