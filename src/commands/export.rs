use clap::Args;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::session::SyncSession;
use vitalog_core::ExportDocument;

#[derive(Args)]
pub struct ExportArgs {
    /// Write to this file instead of the export directory
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Print the export to stdout
    #[arg(long, conflicts_with = "output")]
    pub stdout: bool,
}

impl ExportArgs {
    pub async fn run(
        &self,
        session: SyncSession,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let document = ExportDocument::from_state(&session.state());
        let json = document.to_json()?;

        if self.stdout {
            println!("{}", json);
        } else {
            let path = self
                .output
                .clone()
                .unwrap_or_else(|| config.export_dir.value.join(document.file_name()));
            write_export(&path, &json)?;
            eprintln!(
                "Exported {} diet(s) and {} food entry(ies) to {}",
                document.diets.len(),
                document.food_entries.len(),
                path.display()
            );
        }

        session.finish().await
    }
}

fn write_export(path: &Path, json: &str) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, json)
}

#[derive(Args)]
pub struct WipeArgs {
    /// Confirm deleting every diet and food entry
    #[arg(long)]
    pub yes: bool,
}

impl WipeArgs {
    pub fn check(&self) -> Result<(), Box<dyn std::error::Error>> {
        if !self.yes {
            return Err("This deletes all data on the server. Re-run with --yes to confirm.".into());
        }
        Ok(())
    }

    pub async fn run(&self, session: SyncSession) -> Result<(), Box<dyn std::error::Error>> {
        let state = session.state();
        let (diets, entries) = (state.diets.len(), state.food_entries.len());

        session.handle().clear_all().await?;
        println!("Deleted {} diet(s) and {} food entry(ies)", diets, entries);
        session.finish().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_export_creates_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/out/export.json");

        write_export(&path, "{}").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn test_wipe_requires_confirmation() {
        assert!(WipeArgs { yes: false }.check().is_err());
        assert!(WipeArgs { yes: true }.check().is_ok());
    }
}
