use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

pub static USER_AGENT: &str = "tile-harvest/0.1";

#[derive(Debug)]
pub struct TileResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// The request never produced an HTTP status: timeout, DNS, refused or reset connection.
#[derive(Debug, Error)]
#[error("request to {url} failed: {message}")]
pub struct TransportError {
    pub url: String,
    pub message: String,
}

/// Where tiles are fetched from. Non-success statuses are returned as responses, not errors.
#[async_trait]
pub trait TileSource: Send + Sync {
    async fn get(&self, url: &str) -> Result<TileResponse, TransportError>;
}

pub struct HttpTileSource {
    client: Client,
}

impl HttpTileSource {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TileSource for HttpTileSource {
    async fn get(&self, url: &str) -> Result<TileResponse, TransportError> {
        let transport_error = |e: reqwest::Error| TransportError {
            url: url.to_string(),
            message: e.to_string(),
        };
        let res = self.client.get(url).send().await.map_err(transport_error)?;
        let status = res.status().as_u16();
        let body = res.bytes().await.map_err(transport_error)?;
        Ok(TileResponse {
            status,
            body: body.to_vec(),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn serve(route: &str, response: ResponseTemplate) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(response)
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn returns_body_of_successful_response() {
        let server = serve(
            "/plain_Z1_0_0.png",
            ResponseTemplate::new(200).set_body_bytes(b"PNGDATA".to_vec()),
        )
        .await;
        let source = HttpTileSource::new(Duration::from_secs(10)).unwrap();

        let res = source
            .get(&format!("{}/plain_Z1_0_0.png?v=20250710", server.uri()))
            .await
            .unwrap();

        assert_eq!(res.status, 200);
        assert_eq!(res.body, b"PNGDATA");
    }

    #[tokio::test]
    async fn not_found_is_a_response_not_a_transport_error() {
        let server = serve("/tiles/area_1_Z1_0_0.png", ResponseTemplate::new(404)).await;
        let source = HttpTileSource::new(Duration::from_secs(10)).unwrap();

        let res = source
            .get(&format!("{}/tiles/area_1_Z1_0_0.png?v=20250710", server.uri()))
            .await
            .unwrap();

        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn slow_response_past_timeout_is_a_transport_error() {
        let server = serve(
            "/plain_Z1_0_0.png",
            ResponseTemplate::new(200)
                .set_body_bytes(b"PNGDATA".to_vec())
                .set_delay(Duration::from_secs(5)),
        )
        .await;
        let source = HttpTileSource::new(Duration::from_millis(200)).unwrap();
        let url = format!("{}/plain_Z1_0_0.png", server.uri());

        let err = source.get(&url).await.unwrap_err();

        assert_eq!(err.url, url);
    }
}
