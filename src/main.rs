use anyhow::{Context, Result};
use argh::FromArgs;
use dotenv::dotenv;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

mod commands;
mod config;
mod fetcher;
mod models;
mod tile_source;

use commands::{
    download_layer, download_tiles, dump_tile_index, lookup_tile, DownloadContext,
};
use config::Config;
use models::layer::LayerId;
use tile_source::HttpTileSource;

#[derive(FromArgs)]
/// Downloads historical map tile layers and indexes which layers hold each tile.
struct Args {
    #[argh(subcommand)]
    cmd: Command,

    /// directory holding one folder per layer (overrides TILE_STORE_ROOT)
    #[argh(option, short = 'r')]
    store_root: Option<PathBuf>,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Download(DownloadArgs),
    DownloadLayer(DownloadLayerArgs),
    BuildIndex(BuildIndexArgs),
    Lookup(LookupArgs),
}

#[derive(FromArgs)]
/// Download the background layer, then every year layer in parallel.
#[argh(subcommand, name = "download")]
struct DownloadArgs {
    /// number of year layers downloaded at once (defaults to the number of CPUs)
    #[argh(option, short = 'c')]
    concurrency: Option<usize>,

    /// first year layer to download
    #[argh(option)]
    first_year: Option<u16>,

    /// last year layer to download
    #[argh(option)]
    last_year: Option<u16>,
}

#[derive(FromArgs)]
/// Download a single layer: `back` or a year.
#[argh(subcommand, name = "download-layer")]
struct DownloadLayerArgs {
    /// the layer to download
    #[argh(positional)]
    layer: LayerId,
}

#[derive(FromArgs)]
/// Write a JSON index of which year folders hold each tile.
#[argh(subcommand, name = "build-index")]
struct BuildIndexArgs {
    /// number of year folders to scan, starting from 0001
    #[argh(option, short = 'n', default = "2022")]
    layer_count: u16,

    /// also scan the background folder, listed before the years
    #[argh(switch)]
    include_background: bool,

    /// file to write the index to
    #[argh(option, short = 'o', default = "PathBuf::from(\"list.json\")")]
    output: PathBuf,
}

#[derive(FromArgs)]
/// Find the newest layer up to a year that holds a tile, using a written index.
#[argh(subcommand, name = "lookup")]
struct LookupArgs {
    /// tile file name, like Z2_1_3.png
    #[argh(positional)]
    file_name: String,

    /// year being shown
    #[argh(positional)]
    year: u16,

    /// index file written by build-index
    #[argh(option, short = 'i', default = "PathBuf::from(\"list.json\")")]
    index: PathBuf,
}

fn init_logging(log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "tile-harvest.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = Registry::default()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stdout))
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking));
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set global tracing subscriber")?;
    Ok(guard)
}

fn download_context(config: Config) -> Result<DownloadContext> {
    config.validate()?;
    let source = HttpTileSource::new(config.request_timeout)
        .context("failed to build HTTP client")?;
    Ok(DownloadContext {
        config: Arc::new(config),
        source: Arc::new(source),
    })
}

#[tokio::main]
pub async fn main() -> Result<()> {
    dotenv().ok();
    let args: Args = argh::from_env();
    let mut config = Config::from_env()?;
    if let Some(store_root) = args.store_root {
        config.store_root = store_root;
    }
    let _guard = init_logging(&config.log_dir)?;

    match args.cmd {
        Command::Download(download) => {
            if let Some(concurrency) = download.concurrency {
                config.concurrency = concurrency;
            }
            let first_year = download.first_year.unwrap_or(*config.years.start());
            let last_year = download.last_year.unwrap_or(*config.years.end());
            config.years = first_year..=last_year;
            download_tiles(download_context(config)?).await?;
        }
        Command::DownloadLayer(download) => {
            let ctx = download_context(config)?;
            download_layer(&ctx, download.layer).await?;
        }
        Command::BuildIndex(build) => {
            dump_tile_index(
                &config.store_root,
                build.layer_count,
                build.include_background,
                &build.output,
            )?;
        }
        Command::Lookup(lookup) => {
            lookup_tile(&lookup.index, &lookup.file_name, lookup.year)?;
        }
    }
    Ok(())
}
