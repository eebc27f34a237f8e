mod aggregate;
mod arxiv;
mod commands;
mod groq;
mod markdown;
mod paper;
mod scholar;
mod topics;

pub const USER_AGENT: &str = concat!("paperscout/", env!("CARGO_PKG_VERSION"));

use clap::{Parser, Subcommand};
use tracing::info;

/// Find research papers on arXiv and Google Scholar.
#[derive(Parser)]
#[command(name = "paperscout", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Print results as JSON instead of Markdown
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Search arXiv; sparse results are broadened with model-suggested topics (needs GROQ_API_KEY)
    Arxiv {
        /// Search query; several words are joined with spaces
        #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
        query: Vec<String>,
        /// Skip the related-topic fallback even when GROQ_API_KEY is set
        #[arg(long)]
        no_expand: bool,
    },
    /// Search Google Scholar through SerpAPI (needs SERPAPI_API_KEY)
    Scholar {
        /// Search query; several words are joined with spaces
        #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
        query: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("paperscout=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let http = commands::http_client()?;

    let report = match cli.command {
        Command::Arxiv { query, no_expand } => {
            let query = query.join(" ");
            info!(query = %query, no_expand, "command:arxiv");
            let expander = if no_expand {
                None
            } else {
                commands::topic_expander(http.clone())
            };
            commands::arxiv(http, &query, expander).await
        }
        Command::Scholar { query } => {
            let query = query.join(" ");
            info!(query = %query, "command:scholar");
            commands::scholar(http, &query)
                .await
                .inspect_err(|e| tracing::error!("scholar search failed: {e}"))?
        }
    };

    println!("{}", commands::render(&report, cli.json)?);
    Ok(())
}
