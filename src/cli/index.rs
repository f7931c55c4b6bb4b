use anyhow::Result;
use clap::Args;
use tracing::info;

use crate::cli::output::{print_files_table, print_json, OutputFormat};
use crate::core::model::FolderListing;
use crate::services::AppServices;

#[derive(Args)]
pub struct IndexArgs {
    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,
}

/// Enumerate the folder directly. Local access needs no rebuild secret.
pub async fn execute(args: IndexArgs, services: &AppServices) -> Result<()> {
    let files = services.enumerate_folder().await?;

    match args.format {
        OutputFormat::Json => print_json(&FolderListing::from(files))?,
        OutputFormat::Table => {
            print_files_table(&files);
            info!("{} file(s) in folder", files.len());
        }
    }

    Ok(())
}
