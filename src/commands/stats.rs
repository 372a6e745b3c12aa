use clap::Args;

use super::OutputFormat;
use crate::session::SyncSession;
use vitalog_core::{analytics, Insights};

#[derive(Args)]
pub struct StatsArgs {
    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl StatsArgs {
    pub async fn run(&self, session: SyncSession) -> Result<(), Box<dyn std::error::Error>> {
        let state = session.state();
        let insights = analytics::insights(state.food_entries.iter());

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&insights)?),
            OutputFormat::Text => print!("{}", render(&insights)),
        }
        session.finish().await
    }
}

fn render(insights: &Insights) -> String {
    let days = if insights.streak == 1 { "day" } else { "days" };
    format!(
        "Food log insights\n\
         =================\n\n\
         Streak: {} {}\n\n\
         Last 7 days\n  \
         Days logged: {}/7\n  \
         Entries: {}\n  \
         Average per logged day: {:.1}\n  \
         Meal types per logged day: {:.1}\n",
        insights.streak,
        days,
        insights.weekly.days_logged,
        insights.weekly.total_entries,
        insights.weekly.average_entries_per_day,
        insights.meal_coverage,
    )
}
