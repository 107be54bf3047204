use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use vectorkeep::commands::{delete_file, search, show_config, show_stats, store_file};
use vectorkeep::config::{Config, get_config_dir};

#[derive(Parser)]
#[command(name = "vectorkeep")]
#[command(about = "Per-tenant vector storage and retrieval over dual backends")]
#[command(version)]
struct Cli {
    /// Override the configuration/data directory
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chunk, embed, and store a local file for a tenant
    Store {
        /// Path of the file to index
        path: PathBuf,
        /// Tenant the vectors belong to
        #[arg(long)]
        user: String,
        /// Stable file identifier; defaults to the file name
        #[arg(long)]
        file_id: Option<String>,
        /// Also mirror the write into the inactive backend
        #[arg(long)]
        mirror: bool,
    },
    /// Search a tenant's stored chunks
    Search {
        /// Query text
        query: String,
        /// Tenant to search within
        #[arg(long)]
        user: String,
        /// Maximum number of results
        #[arg(long)]
        limit: Option<usize>,
        /// Minimum relevance score, 0.0 to 1.0
        #[arg(long)]
        threshold: Option<f32>,
        /// Restrict results to these file ids
        #[arg(long = "file-id")]
        file_ids: Option<Vec<String>>,
    },
    /// Delete every stored vector for a file
    Delete {
        /// File identifier to delete
        file_id: String,
        /// Tenant the file belongs to
        #[arg(long)]
        user: String,
    },
    /// Show stored-document stats for a tenant
    Stats {
        /// Tenant to report on
        #[arg(long)]
        user: String,
    },
    /// Show the loaded configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => get_config_dir()?,
    };
    let config = Config::load(&config_dir)?;

    match cli.command {
        Commands::Store {
            path,
            user,
            file_id,
            mirror,
        } => {
            store_file(&config, &user, &path, file_id, mirror).await?;
        }
        Commands::Search {
            query,
            user,
            limit,
            threshold,
            file_ids,
        } => {
            search(&config, &user, &query, limit, threshold, file_ids).await?;
        }
        Commands::Delete { file_id, user } => {
            delete_file(&config, &user, &file_id).await?;
        }
        Commands::Stats { user } => {
            show_stats(&config, &user).await?;
        }
        Commands::Config => {
            show_config(&config)?;
        }
    }

    Ok(())
}
