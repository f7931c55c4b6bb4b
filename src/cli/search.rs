use anyhow::Result;
use clap::Args;
use tracing::info;

use crate::cli::output::{print_files_table, print_json, OutputFormat};
use crate::config::{Config, QueryMode};
use crate::core::model::SearchRequest;
use crate::services::AppServices;

#[derive(Args)]
pub struct SearchArgs {
    /// Song title, matched against file names
    #[arg(short, long)]
    title: Option<String>,

    /// Musical key, matched against file names
    #[arg(short, long)]
    key: Option<String>,

    /// Lyrics snippet, matched against file contents
    #[arg(short, long)]
    lyrics: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Build the query from the fields without asking the model
    #[arg(long)]
    direct: bool,

    /// Print the generated Drive query
    #[arg(long)]
    show_query: bool,
}

impl SearchArgs {
    pub fn apply(&self, config: &mut Config) {
        if self.direct {
            config.query_mode = QueryMode::Direct;
        }
    }

    fn request(&self) -> SearchRequest {
        SearchRequest::new(self.title.as_deref(), self.key.as_deref(), self.lyrics.as_deref())
    }
}

pub async fn execute(args: SearchArgs, services: &AppServices) -> Result<()> {
    let outcome = services.search(&args.request()).await?;

    if args.show_query {
        eprintln!("q = {}", outcome.query);
    }

    match args.format {
        OutputFormat::Json => print_json(&outcome.files)?,
        OutputFormat::Table => {
            if outcome.files.is_empty() {
                info!("No sheets found matching the given criteria");
                return Ok(());
            }
            info!("Found {} result(s)", outcome.files.len());
            print_files_table(&outcome.files);
        }
    }

    Ok(())
}
