//! Summa CLI - summarise a webpage or a piece of text
//!
//! The application logic is contained in lib.rs, and this file is responsible
//! for parsing arguments and handling top-level errors.

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::Colorize;
use summa::config::RoutingPolicy;
use summa::scraper::Extractor;
use summa::{logging, server, Config, Mode, Pipeline, SummarizationRequest, SummaryResponse};

#[derive(Parser)]
#[command(name = "summa")]
#[command(author, version, about = "Summarise webpages and text with an LLM", long_about = None)]
struct Cli {
    /// Path to summa.toml (defaults to ./summa.toml, then ~/.config/summa/summa.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Print the JSON response instead of formatted text
    #[arg(long, global = true)]
    json: bool,
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarise a URL or a piece of text
    Summarise {
        /// URL or text to summarise; `-` reads from stdin
        input: String,
        /// Treat the input as a URL
        #[arg(long, conflicts_with = "text")]
        url: bool,
        /// Treat the input as literal text
        #[arg(long)]
        text: bool,
        /// Maximum tool calls the model may make
        #[arg(long)]
        max_steps: Option<usize>,
        /// Fetch the page before asking the model instead of offering it the fetch tool
        #[arg(long)]
        prefetch: bool,
    },
    /// Show the text extracted from a webpage
    Extract {
        /// URL to extract
        url: String,
    },
    /// Serve the summarisation endpoint over HTTP
    Serve {
        /// Address to bind, e.g. 127.0.0.1:3000
        #[arg(long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    logging::init_tracing(if cli.verbose { "debug" } else { "info" });

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Summarise {
            input,
            url,
            text,
            max_steps,
            prefetch,
        } => {
            let input = if input == "-" {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf)?;
                buf
            } else {
                input
            };

            let mode = match (url, text) {
                (true, _) => Some(Mode::Url),
                (_, true) => Some(Mode::Text),
                _ => None,
            };

            let mut pipeline = Pipeline::from_config(&config)?;
            if let Some(max_steps) = max_steps {
                pipeline = pipeline.with_max_steps(max_steps);
            }
            if prefetch {
                pipeline = pipeline.with_routing(RoutingPolicy::Prefetch);
            }

            let request = SummarizationRequest { input, mode };
            let response = pipeline.run(request).await;
            Ok(report(&response, cli.json)?)
        }
        Commands::Extract { url } => {
            let extractor = Extractor::new(&config.scraper)?;
            let result = extractor.extract(url.trim()).await;

            if !cli.json && result.success {
                println!("=== {} ===\n", result.title.bold());
                println!("{}", result.content);
                println!(
                    "\n--- Extracted {} characters ---",
                    result.content.chars().count()
                );
                return Ok(ExitCode::SUCCESS);
            }
            Ok(report(&SummaryResponse::from(result), cli.json)?)
        }
        Commands::Serve { bind } => {
            let pipeline = Arc::new(Pipeline::from_config(&config)?);
            let addr = bind.unwrap_or(config.server.bind);
            server::serve(pipeline, &addr).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Print a response and pick the process exit code
fn report(response: &SummaryResponse, json: bool) -> anyhow::Result<ExitCode> {
    if json {
        println!("{}", serde_json::to_string_pretty(response)?);
    } else if let Some(text) = &response.text {
        println!("{text}");
    } else if let Some(error) = &response.error {
        eprintln!("{} {}", "Error:".red().bold(), error);
    }

    Ok(if response.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
