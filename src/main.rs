mod cli;
mod server;
mod tools;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mnemos::config::MnemosConfig;
use mnemos::memory::{Category, ListOptions};

#[derive(Parser)]
#[command(name = "mnemos", version, about = "Semantic memory MCP server for AI agents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the MCP server (stdio transport)
    Serve,
    /// Manage the embedding model
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
    /// Store a memory, deduplicating against existing ones
    Remember {
        content: String,
        /// preference, fact, correction, or pattern
        #[arg(short, long, default_value = "fact")]
        category: Category,
        #[arg(short, long)]
        agent: Option<String>,
        #[arg(short, long)]
        path: Option<String>,
        #[arg(long)]
        confidence: Option<f64>,
    },
    /// Search memories by meaning
    Search {
        query: String,
        #[arg(short, long)]
        agent: Option<String>,
        #[arg(short, long)]
        path: Option<String>,
        /// Restrict to a category (repeatable)
        #[arg(short, long = "category")]
        categories: Vec<Category>,
        #[arg(short, long)]
        limit: Option<usize>,
        #[arg(short, long)]
        threshold: Option<f32>,
    },
    /// Show one memory by ID or unique ID prefix
    Get { id: String },
    /// List memories, newest first
    List {
        #[arg(short, long)]
        agent: Option<String>,
        #[arg(short, long, default_value_t = 50)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        /// Include superseded, archived, and forgotten memories
        #[arg(long)]
        all: bool,
    },
    /// Forget a memory by ID or unique ID prefix
    Forget {
        id: String,
        /// Delete permanently instead of marking forgotten
        #[arg(long)]
        purge: bool,
    },
    /// Forget every active memory, optionally for one agent
    Clear {
        #[arg(short, long)]
        agent: Option<String>,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Show which remember-triggers a message contains
    Detect {
        message: String,
        #[arg(long)]
        json: bool,
    },
    /// Embed memories that were stored without a vector
    ReEmbed,
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download the embedding model to ~/.mnemos/models/
    Download,
}

/// Run a blocking command on the blocking pool.
async fn run_blocking<F>(f: F) -> Result<()>
where
    F: FnOnce() -> Result<()> + Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = MnemosConfig::load()?;

    // Log to stderr so stdout stays clean for MCP JSON-RPC.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => server::serve_stdio(config).await?,
        Command::Model { action } => match action {
            ModelAction::Download => cli::model_download(&config.embedding).await?,
        },
        Command::Remember {
            content,
            category,
            agent,
            path,
            confidence,
        } => {
            run_blocking(move || {
                cli::remember::remember(&config, &content, category, agent, path, confidence)
            })
            .await?
        }
        Command::Search {
            query,
            agent,
            path,
            categories,
            limit,
            threshold,
        } => {
            run_blocking(move || {
                cli::search::search(&config, &query, agent, path, categories, limit, threshold)
            })
            .await?
        }
        Command::Get { id } => cli::inspect::get(&config, &id)?,
        Command::List {
            agent,
            limit,
            offset,
            all,
        } => {
            let options = ListOptions {
                agent_handle: agent,
                limit,
                offset,
                include_inactive: all,
            };
            cli::inspect::list(&config, &options)?
        }
        Command::Forget { id, purge } => cli::forget::forget(&config, &id, purge)?,
        Command::Clear { agent, yes } => cli::forget::clear(&config, agent.as_deref(), yes)?,
        Command::Detect { message, json } => cli::detect::detect(&message, json)?,
        Command::ReEmbed => run_blocking(move || cli::re_embed::re_embed(&config)).await?,
    }

    Ok(())
}
