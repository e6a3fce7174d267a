use anyhow::Result;
use log::{error, info, warn};
use std::env;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use wordguard::config::{load_or_create, resolve_config_path};
use wordguard::prelude::*;

const USAGE: &str = "usage: wordguard [--config <path>] [in|out]

Reads text from stdin line by line and writes the filtered lines to stdout.
  in    filter against the inbound dictionary (default)
  out   filter against the outbound dictionary";

struct Args {
    config: Option<PathBuf>,
    direction: FilterDirection,
}

fn parse_args() -> Result<Option<Args>> {
    let mut config = None;
    let mut direction = FilterDirection::Inbound;
    let mut args = env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(None),
            "-c" | "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config needs a path"))?;
                config = Some(PathBuf::from(path));
            }
            other => {
                direction = other.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            }
        }
    }

    Ok(Some(Args { config, direction }))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables and initialize logging
    dotenv::dotenv().ok();
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let Some(args) = parse_args()? else {
        println!("{}", USAGE);
        return Ok(());
    };

    info!("Starting wordguard v{}", wordguard::VERSION);

    let config_path = resolve_config_path(args.config);
    let config = load_or_create(&config_path).await?;

    // Filtering must never run half-initialized: any dictionary failure is fatal
    let service = match FilterService::load(&config).await {
        Ok(service) => service,
        Err(e) => {
            error!("Failed to initialize content filter: {:#}", e);
            return Err(e);
        }
    };
    let shared = SharedFilter::new(service);

    #[cfg(feature = "hot_reload")]
    let _watcher = if config.hot_reload {
        Some(DictionaryWatcher::spawn(shared.clone(), config.clone())?)
    } else {
        None
    };
    if cfg!(not(feature = "hot_reload")) && config.hot_reload {
        warn!("hot_reload is set but this build lacks the hot_reload feature");
    }

    info!("Filtering stdin ({})", args.direction.as_str());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        // Blank lines pass through so the output stays aligned with the input
        let output = if line.is_empty() {
            line
        } else {
            let filter = shared.current().await;
            match filter.check(args.direction, &line) {
                Ok(filtered) => filtered,
                Err(rejection) => {
                    warn!("Line not filtered: {}", rejection);
                    rejection.to_string()
                }
            }
        };
        stdout.write_all(output.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
    }
    stdout.flush().await?;

    info!("Input exhausted, shutting down");
    Ok(())
}
