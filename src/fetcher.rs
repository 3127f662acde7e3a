use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::tile_source::{TileSource, TransportError};

#[derive(Debug)]
pub enum FetchOutcome {
    Skipped,
    Downloaded,
    Failed(FetchError),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
    #[error("failed to write {}: {source}", .path.display())]
    Filesystem { path: PathBuf, source: io::Error },
}

/// Makes sure the tile at `destination` exists on disk.
///
/// Any existing file counts as done, whatever its contents, and no request is made. Otherwise
/// the tile is requested once; only a 200 response is written, first to a `.part` sibling that
/// is then renamed into place so a partial body never shows up under the tile's own name.
pub async fn fetch_tile(source: &dyn TileSource, url: &str, destination: &Path) -> FetchOutcome {
    if fs::metadata(destination).await.is_ok() {
        debug!(path = %destination.display(), "tile already on disk, skipping");
        return FetchOutcome::Skipped;
    }

    let res = match source.get(url).await {
        Ok(res) => res,
        Err(err) => {
            warn!(url = %url, error = %err, "failed to fetch tile");
            return FetchOutcome::Failed(err.into());
        }
    };
    if res.status != 200 {
        warn!(url = %url, status = res.status, "failed to fetch tile");
        return FetchOutcome::Failed(FetchError::Status {
            url: url.to_string(),
            status: res.status,
        });
    }

    match write_tile(destination, &res.body).await {
        Ok(()) => {
            info!(path = %destination.display(), bytes = res.body.len(), "downloaded tile");
            FetchOutcome::Downloaded
        }
        Err(source) => {
            warn!(path = %destination.display(), error = %source, "failed to save tile");
            FetchOutcome::Failed(FetchError::Filesystem {
                path: destination.to_path_buf(),
                source,
            })
        }
    }
}

async fn write_tile(destination: &Path, body: &[u8]) -> io::Result<()> {
    let part = part_path(destination);
    let written = match fs::write(&part, body).await {
        Ok(()) => fs::rename(&part, destination).await,
        Err(err) => Err(err),
    };
    if written.is_err() {
        let _ = fs::remove_file(&part).await;
    }
    written
}

fn part_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(".part");
    destination.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile_source::testing::FakeTileSource;
    use crate::tile_source::HttpTileSource;
    use std::time::Duration;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const URL: &str = "https://cdn.test/tiles/area_1_Z1_0_0.png";

    #[tokio::test]
    async fn downloads_body_on_200() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Z1_0_0.png");
        let source = FakeTileSource::default().with_tile(URL, b"PNGDATA");

        let outcome = fetch_tile(&source, &format!("{}?v=20250710", URL), &path).await;

        assert!(matches!(outcome, FetchOutcome::Downloaded));
        assert_eq!(std::fs::read(&path).unwrap(), b"PNGDATA");
        assert!(!part_path(&path).exists());
    }

    #[tokio::test]
    async fn not_found_creates_no_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Z1_0_0.png");
        let source = FakeTileSource::default();

        let outcome = fetch_tile(&source, URL, &path).await;

        assert!(matches!(
            outcome,
            FetchOutcome::Failed(FetchError::Status { status: 404, .. })
        ));
        assert!(!path.exists());
        assert!(!part_path(&path).exists());
    }

    #[tokio::test]
    async fn transport_failure_creates_no_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Z1_0_0.png");
        let source = FakeTileSource {
            fail_transport: vec![URL.to_string()],
            ..FakeTileSource::default()
        };

        let outcome = fetch_tile(&source, URL, &path).await;

        assert!(matches!(
            outcome,
            FetchOutcome::Failed(FetchError::Transport(_))
        ));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn existing_file_is_skipped_without_a_request() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Z1_0_0.png");
        let first = FakeTileSource::default().with_tile(URL, b"PNGDATA");
        assert!(matches!(
            fetch_tile(&first, URL, &path).await,
            FetchOutcome::Downloaded
        ));

        let second = FakeTileSource::default().with_tile(URL, b"OTHERDATA");
        let outcome = fetch_tile(&second, "not a url", &path).await;

        assert!(matches!(outcome, FetchOutcome::Skipped));
        assert!(second.requested().is_empty());
        assert_eq!(std::fs::read(&path).unwrap(), b"PNGDATA");
    }

    #[tokio::test]
    async fn truncated_file_is_still_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Z1_0_0.png");
        std::fs::write(&path, b"").unwrap();
        let source = FakeTileSource::default().with_tile(URL, b"PNGDATA");

        assert!(matches!(
            fetch_tile(&source, URL, &path).await,
            FetchOutcome::Skipped
        ));
        assert_eq!(std::fs::read(&path).unwrap(), b"");
    }

    #[tokio::test]
    async fn missing_layer_directory_is_a_filesystem_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("0001").join("Z1_0_0.png");
        let source = FakeTileSource::default().with_tile(URL, b"PNGDATA");

        let outcome = fetch_tile(&source, URL, &path).await;

        assert!(matches!(
            outcome,
            FetchOutcome::Failed(FetchError::Filesystem { .. })
        ));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn fetches_over_http_and_skips_on_rerun() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tiles/area_1_Z1_0_0.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PNGDATA".to_vec()))
            .expect(1)
            .mount(&server)
            .await;
        let dir = TempDir::new().unwrap();
        let found = dir.path().join("Z1_0_0.png");
        let missing = dir.path().join("Z1_0_1.png");
        let source = HttpTileSource::new(Duration::from_secs(10)).unwrap();
        let url = |tile: &str| format!("{}/tiles/area_1_{}.png?v=20250710", server.uri(), tile);

        assert!(matches!(
            fetch_tile(&source, &url("Z1_0_0"), &found).await,
            FetchOutcome::Downloaded
        ));
        assert!(matches!(
            fetch_tile(&source, &url("Z1_0_0"), &found).await,
            FetchOutcome::Skipped
        ));
        assert!(matches!(
            fetch_tile(&source, &url("Z1_0_1"), &missing).await,
            FetchOutcome::Failed(FetchError::Status { status: 404, .. })
        ));

        assert_eq!(std::fs::read(&found).unwrap(), b"PNGDATA");
        assert!(!missing.exists());
    }
}
