use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use std::ops::AddAssign;
use std::sync::Arc;
use std::time::Instant;
use tokio::fs;
use tokio::time::sleep;
use tracing::{error, info, instrument};

use crate::config::Config;
use crate::fetcher::{fetch_tile, FetchOutcome};
use crate::models::layer::LayerId;
use crate::models::resource::{layer_dir, TileResource};
use crate::models::tile::fetch_coordinates;
use crate::tile_source::TileSource;

/// Everything a layer task needs, cheap to clone into each spawned task.
#[derive(Clone)]
pub struct DownloadContext {
    pub config: Arc<Config>,
    pub source: Arc<dyn TileSource>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LayerSummary {
    pub skipped: usize,
    pub downloaded: usize,
    pub failed: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub tiles: LayerSummary,
    pub layers_completed: usize,
    pub layers_failed: usize,
}

impl AddAssign for LayerSummary {
    fn add_assign(&mut self, other: Self) {
        self.skipped += other.skipped;
        self.downloaded += other.downloaded;
        self.failed += other.failed;
    }
}

impl RunSummary {
    fn record(&mut self, layer: LayerId, result: Result<LayerSummary>) {
        match result {
            Ok(summary) => {
                self.tiles += summary;
                self.layers_completed += 1;
            }
            Err(err) => {
                error!(layer = %layer, error = ?err, "layer download failed");
                self.layers_failed += 1;
            }
        }
    }
}

/// Fetches every tile of one layer, one request at a time, then waits out the layer delay.
///
/// Individual tile failures are counted, never returned. The only error is not being able to
/// create the layer's directory.
#[instrument(skip(ctx, layer), fields(layer = %layer))]
pub async fn download_layer(ctx: &DownloadContext, layer: LayerId) -> Result<LayerSummary> {
    let config = &ctx.config;
    let dir = layer_dir(&config.store_root, layer);
    fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("failed to create layer directory {}", dir.display()))?;

    let mut summary = LayerSummary::default();
    for coord in fetch_coordinates() {
        let resource = TileResource::new(layer, coord);
        let url = resource.url(&config.cdn_host, &config.cache_buster);
        let path = resource.local_path(&config.store_root);
        match fetch_tile(ctx.source.as_ref(), &url, &path).await {
            FetchOutcome::Skipped => summary.skipped += 1,
            FetchOutcome::Downloaded => summary.downloaded += 1,
            FetchOutcome::Failed(_) => summary.failed += 1,
        }
    }
    info!(
        skipped = summary.skipped,
        downloaded = summary.downloaded,
        failed = summary.failed,
        "finished layer"
    );

    sleep(config.layer_delay).await;
    Ok(summary)
}

/// Downloads the background layer, then every year layer with at most `concurrency` layers
/// in flight at once.
pub async fn download_tiles(ctx: DownloadContext) -> Result<RunSummary> {
    let start = Instant::now();
    let mut run = RunSummary::default();

    info!("downloading background layer");
    run.record(
        LayerId::Background,
        download_layer(&ctx, LayerId::Background).await,
    );

    let years = ctx.config.years.clone();
    info!(
        first_year = *years.start(),
        last_year = *years.end(),
        concurrency = ctx.config.concurrency,
        "downloading year layers"
    );
    let mut layers = stream::iter(years.map(LayerId::Year))
        .map(|layer| {
            let ctx = ctx.clone();
            tokio::spawn(async move { (layer, download_layer(&ctx, layer).await) })
        })
        .buffer_unordered(ctx.config.concurrency);
    while let Some(joined) = layers.next().await {
        match joined {
            Ok((layer, result)) => run.record(layer, result),
            Err(err) => {
                error!(error = %err, "layer task panicked");
                run.layers_failed += 1;
            }
        }
    }

    info!(
        elapsed = ?start.elapsed(),
        layers_completed = run.layers_completed,
        layers_failed = run.layers_failed,
        skipped = run.tiles.skipped,
        downloaded = run.tiles.downloaded,
        failed = run.tiles.failed,
        "finished downloading tiles"
    );
    Ok(run)
}
