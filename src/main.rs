use clap::{Parser, Subcommand};
use parish_rag::Result;
use parish_rag::commands::{ask, serve, show_config, show_status};
use parish_rag::config::Config;

#[derive(Parser)]
#[command(name = "parish-rag")]
#[command(about = "Retrieval-augmented response pipeline for congregation documents")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml
    #[arg(long, default_value = ".")]
    config_dir: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Address to bind to (host:port)
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: String,
    },
    /// Run a single query through the pipeline
    Ask {
        /// The question to answer
        query: String,
    },
    /// Show the effective configuration
    Config,
    /// Show component status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config_dir)?;

    match cli.command {
        Commands::Serve { bind } => {
            serve(config, &bind).await?;
        }
        Commands::Ask { query } => {
            ask(config, &query).await?;
        }
        Commands::Config => {
            show_config(&config)?;
        }
        Commands::Status => {
            show_status(config).await?;
        }
    }

    Ok(())
}
