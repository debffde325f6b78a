//! `vodcache objects` subcommands.

use clap::Subcommand;
use vodcache::config::format_size;
use vodcache::{ChunkStore, ConfigFile};

use crate::error::CliError;

#[derive(Debug, Subcommand)]
pub enum ObjectsAction {
    /// List stored objects with download state
    List,
    /// Show store location and disk usage
    Stats,
    /// Delete an object's chunks and metadata
    Delete {
        /// Object id to delete
        id: String,
    },
}

pub async fn run(action: ObjectsAction, config: &ConfigFile) -> Result<(), CliError> {
    let store = super::open_store(config)?;

    match action {
        ObjectsAction::List => {
            let objects = store.list_objects().await?;
            if objects.is_empty() {
                println!("No objects stored.");
                return Ok(());
            }
            for meta in objects {
                let state = if meta.is_complete() {
                    "complete".to_string()
                } else {
                    format!("{:.0}%", meta.progress_fraction() * 100.0)
                };
                println!(
                    "{:<32} {:>10}  {:>8}  {}",
                    meta.id,
                    format_size(meta.total_size),
                    state,
                    meta.title
                );
            }
            Ok(())
        }
        ObjectsAction::Stats => {
            println!("Store: {}", config.store_directory.display());
            let (files, bytes) = store.disk_usage().await?;
            println!("  Files: {files}");
            println!("  Size:  {}", format_size(bytes));
            Ok(())
        }
        ObjectsAction::Delete { id } => {
            store.delete_object(&id).await?;
            println!("Deleted {id}");
            Ok(())
        }
    }
}
