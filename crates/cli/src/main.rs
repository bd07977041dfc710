use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use nbsim_core::constants::{DEFAULT_GEN_DIR, DEFAULT_PORT, DEFAULT_SERVICE_ORIGIN};
use nbsim_core::env_string_or;
use nbsim_llm::{LlmClient, DEFAULT_BASE_URL};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "nbsim")]
#[command(about = "Notebook simulator: hallucinates Jupyter notebooks for any path", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve generated notebooks and viewer pages over HTTP.
    Serve {
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value = DEFAULT_GEN_DIR)]
        gen_dir: PathBuf,
        #[arg(short, long)]
        model: Option<String>,
        /// nbconvert or builtin.
        #[arg(long, default_value = "nbconvert")]
        converter: String,
        /// Origin browsers use to reach this server; defaults to localhost on the chosen port.
        #[arg(long)]
        origin: Option<String>,
    },
    /// Interactive prompt; every reply is written to the generated notebook.
    Repl {
        #[arg(long, default_value = DEFAULT_GEN_DIR)]
        gen_dir: PathBuf,
        #[arg(short, long)]
        model: Option<String>,
        #[arg(long, default_value = "nbconvert")]
        converter: String,
    },
    /// Repair truncated notebook JSON read from stdin.
    Repair,
    /// Request a notebook from a running server and print the viewer frame.
    View {
        path: String,
        #[arg(long, default_value = DEFAULT_SERVICE_ORIGIN)]
        service: String,
    },
}

pub(crate) fn get_api_key() -> Result<String> {
    std::env::var("ANTHROPIC_API_KEY")
        .map_err(|_| anyhow::anyhow!("ANTHROPIC_API_KEY environment variable must be set"))
}

pub(crate) fn get_base_url() -> String {
    env_string_or("NBSIM_API_URL", DEFAULT_BASE_URL)
}

pub(crate) fn build_llm(model: Option<String>) -> Result<LlmClient> {
    let client = LlmClient::new(get_api_key()?, get_base_url())?;
    Ok(match model {
        Some(model) => client.with_model(model),
        None => client,
    })
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, host, gen_dir, model, converter, origin } => {
            let origin = origin.unwrap_or_else(|| format!("http://localhost:{port}"));
            commands::serve::run(port, host, gen_dir, model, &converter, origin).await?;
        },
        Commands::Repl { gen_dir, model, converter } => {
            commands::repl::run(gen_dir, model, &converter).await?;
        },
        Commands::Repair => {
            if !commands::repair::run()? {
                return Ok(ExitCode::FAILURE);
            }
        },
        Commands::View { path, service } => {
            commands::view::run(path, service).await;
        },
    }

    Ok(ExitCode::SUCCESS)
}
