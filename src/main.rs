//! pagebrief CLI - webpage summarisation API and its terminal client
//!
//! The application logic is contained in lib.rs, and this file is responsible
//! for parsing arguments and handling top-level errors.

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use dialoguer::Input;
use pagebrief::client::ApiClient;
use pagebrief::providers::CredentialSource;
use pagebrief::server::{self, AppState, ConfigSource};
use pagebrief::Config;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pagebrief")]
#[command(author, version, about = "Webpage summarisation API with follow-up chat", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Path to pagebrief.toml
        #[arg(long)]
        config: Option<PathBuf>,
        /// Address to bind, overriding the config
        #[arg(long)]
        host: Option<IpAddr>,
        /// Port to listen on, overriding the config
        #[arg(long)]
        port: Option<u16>,
    },
    /// Summarise a webpage through the API, then ask follow-up questions
    Summarise {
        /// URL to summarise
        url: String,
        /// Provider to use (openai, azure_openai, anthropic, google)
        #[arg(long)]
        provider: Option<String>,
        /// Model to use with the provider
        #[arg(long)]
        model: Option<String>,
        /// API base URL, overriding the config
        #[arg(long)]
        api: Option<String>,
        /// Print the summary and exit without chatting
        #[arg(long)]
        no_chat: bool,
    },
    /// List providers the API can use
    Providers {
        #[arg(long)]
        api: Option<String>,
    },
    /// Check whether the API is running
    Health {
        #[arg(long)]
        api: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve { config, host, port }) => serve(config, host, port).await,
        Some(Commands::Summarise {
            url,
            provider,
            model,
            api,
            no_chat,
        }) => {
            let config = Config::load()?;
            let client = connect(api.as_deref(), &config).await?;

            println!(
                "{} {}\n",
                config.ui.page_icon,
                config.ui.page_title.bold()
            );
            println!("Summarising: {}", url);

            let response = client.summarize(&url, provider, model).await?;

            println!("\n{}", "📌 Main Topic".bold());
            println!("  {}\n", response.main_topic.cyan());
            println!("{}", "📝 Summary".bold());
            println!("{}\n", response.summary);

            if !no_chat {
                chat_loop(&client, &response.session_id).await?;
            }
            Ok(())
        }
        Some(Commands::Providers { api }) => {
            let config = Config::load()?;
            let client = connect(api.as_deref(), &config).await?;
            let providers = client.providers().await?;

            if providers.available_providers.is_empty() {
                println!("{}", "⚠️  No API keys configured.".yellow());
                println!("Set an API key for at least one provider in the environment.");
            } else {
                println!("Available providers ({}):\n", providers.total_providers);
                for (name, info) in &providers.available_providers {
                    println!("🤖 {} (default: {})", name.to_string().bold(), info.default_model);
                    println!("   {}\n", info.models.join(", "));
                }
            }
            Ok(())
        }
        Some(Commands::Health { api }) => {
            let config = Config::load()?;
            let base = api.unwrap_or(config.ui.api_url);
            let client = ApiClient::new(&base)?;
            if client.health().await {
                println!("{} API server is running at {}", "✅".green(), base);
            } else {
                println!("{} API server is not reachable at {}", "❌".red(), base);
            }
            Ok(())
        }
        None => serve(None, None, None).await,
    }
}

/// Run the API until Ctrl+C
async fn serve(config: Option<PathBuf>, host: Option<IpAddr>, port: Option<u16>) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .init();

    tracing::info!("Starting pagebrief v{}", env!("CARGO_PKG_VERSION"));

    let source = ConfigSource::File(config);
    let initial = source.load().context("failed to load configuration")?;
    let host = match host {
        Some(host) => host,
        None => initial
            .server
            .host
            .parse()
            .with_context(|| format!("invalid server host {:?}", initial.server.host))?,
    };
    let addr = SocketAddr::new(host, port.unwrap_or(initial.server.port));

    let state = AppState::new(source, CredentialSource::Environment).map_err(|e| anyhow::anyhow!(e))?;
    server::run_server(state, addr, shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}

/// Connect to the API, failing early with a hint when it is not running
async fn connect(api: Option<&str>, config: &Config) -> anyhow::Result<ApiClient> {
    let base = api.unwrap_or(&config.ui.api_url);
    let client = ApiClient::new(base)?;
    if !client.health().await {
        anyhow::bail!(
            "API server is not running at {base}. Start it first with: pagebrief serve"
        );
    }
    Ok(client)
}

/// Ask follow-up questions until an empty line or `exit`
async fn chat_loop(client: &ApiClient, session_id: &str) -> anyhow::Result<()> {
    println!("{}", "💬 Ask questions about this page (empty line or 'exit' to quit)".bold());

    loop {
        let question: String = Input::new()
            .with_prompt("You")
            .allow_empty(true)
            .interact_text()?;
        let question = question.trim();
        if question.is_empty() || question.eq_ignore_ascii_case("exit") {
            break;
        }

        match client.chat(session_id, question).await {
            Ok(response) => println!("{} {}\n", "AI:".green().bold(), response.answer),
            Err(e) => eprintln!("{} {}\n", "Error:".red().bold(), e),
        }
    }
    Ok(())
}
