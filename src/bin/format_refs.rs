use std::io::Read;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::Semaphore;
use tracing_subscriber::EnvFilter;

use gbt_formatter::config::AppConfig;
use gbt_formatter::format::FormatService;
use gbt_formatter::models::NormalizedResult;
use gbt_formatter::normalize;

#[derive(Parser, Debug)]
#[command(name = "format-refs")]
#[command(about = "Format reference text as GB/T 7714-2015 via the configured model")]
struct Cli {
    /// Read input from this file instead of stdin
    #[arg(long)]
    file: Option<String>,
    /// Treat the input as a saved model reply and only normalize it
    #[arg(long, default_value_t = false)]
    raw: bool,
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let input = read_input(cli.file.as_deref())?;

    let result = if cli.raw {
        normalize(&input)
    } else {
        let config = AppConfig::from_env();
        let limit = Arc::new(Semaphore::new(config.max_concurrent));
        let service = FormatService::new(config, limit)?;
        service
            .format_text(&input)
            .await
            .map_err(|err| anyhow::anyhow!("{} ({})", err.user_message(), err))?
    };

    print_result(&result, cli.pretty)
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("failed reading {}", path))
        }
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("failed reading stdin")?;
            Ok(buffer)
        }
    }
}

fn print_result(result: &NormalizedResult, pretty: bool) -> Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };
    println!("{}", rendered);
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
