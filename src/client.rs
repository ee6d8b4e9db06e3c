use crate::model::Post;

use http::header::{ACCEPT, USER_AGENT};
use http::{Method, Request, StatusCode, Uri};
use http_body_util::BodyExt;
use hyper_rustls::HttpsConnectorBuilder;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const POSTS_PER_PAGE: u32 = 10;
pub const DEFAULT_POSTS_URL: &str = "https://jsonplaceholder.typicode.com/posts";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

type HttpsClient = Client<hyper_rustls::HttpsConnector<HttpConnector>, String>;

/// Why a page could not be fetched. The `Display` text is what the feed
/// shows to the user.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid posts URL: {0}")]
    InvalidUrl(String),
    #[error("failed to build request: {0}")]
    Request(#[from] http::Error),
    #[error("network error: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("HTTP error! status: {0}")]
    Status(StatusCode),
    #[error("failed to read response body: {0}")]
    Body(String),
    #[error("malformed posts payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("background fetcher has stopped")]
    Stopped,
}

/// One page of posts per call. Implementations keep no paging state.
pub trait PostSource {
    fn fetch_page(
        &self,
        page: u32,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<Post>, FetchError>> + Send;
}

/// HTTP source for a JSON collection paged with `_page` / `_limit`.
#[derive(Clone)]
pub struct PostClient {
    http: HttpsClient,
    base_url: String,
    timeout: Duration,
}

impl fmt::Debug for PostClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl PostClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let base_url = base_url.trim();
        base_url
            .parse::<Uri>()
            .map_err(|e| FetchError::InvalidUrl(format!("{base_url}: {e}")))?;

        let mut root_store = rustls::RootCertStore::empty();
        let result = rustls_native_certs::load_native_certs();
        root_store.add_parsable_certificates(result.certs);
        if root_store.is_empty() {
            // Plain http endpoints still work
            warn!("no system certificates found; https requests will fail");
        }

        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();

        let https_connector = HttpsConnectorBuilder::new()
            .with_tls_config(tls_config)
            .https_or_http()
            .enable_http1()
            .build();

        let http: HttpsClient = Client::builder(TokioExecutor::new()).build(https_connector);

        Ok(Self {
            http,
            base_url: base_url.to_string(),
            timeout,
        })
    }

    pub fn page_uri(&self, page: u32, limit: u32) -> Result<Uri, FetchError> {
        let sep = if self.base_url.contains('?') { '&' } else { '?' };
        let raw = format!("{}{sep}_page={page}&_limit={limit}", self.base_url);
        raw.parse::<Uri>()
            .map_err(|e| FetchError::InvalidUrl(format!("{raw}: {e}")))
    }

    async fn request_page(&self, uri: Uri) -> Result<Vec<Post>, FetchError> {
        let req = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, concat!("taskfeed/", env!("CARGO_PKG_VERSION")))
            .body(String::new())?;

        let response = self.http.request(req).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let bytes = response
            .into_body()
            .collect()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))?
            .to_bytes();
        let posts: Vec<Post> = serde_json::from_slice(&bytes)?;
        Ok(posts)
    }
}

impl PostSource for PostClient {
    async fn fetch_page(&self, page: u32, limit: u32) -> Result<Vec<Post>, FetchError> {
        let uri = self.page_uri(page, limit)?;
        debug!(%uri, "fetching posts page");
        let posts = tokio::time::timeout(self.timeout, self.request_page(uri))
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))??;
        debug!(page, count = posts.len(), "posts page fetched");
        Ok(posts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_page_uri_appends_paging_params() {
        let client = PostClient::new(DEFAULT_POSTS_URL, DEFAULT_TIMEOUT).unwrap();
        assert_eq!(
            client.page_uri(3, 10).unwrap().to_string(),
            "https://jsonplaceholder.typicode.com/posts?_page=3&_limit=10"
        );
    }

    #[tokio::test]
    async fn test_page_uri_extends_existing_query() {
        let client =
            PostClient::new("http://localhost:1/posts?userId=2", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(
            client.page_uri(1, 10).unwrap().to_string(),
            "http://localhost:1/posts?userId=2&_page=1&_limit=10"
        );
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let err = PostClient::new("not a url", DEFAULT_TIMEOUT).unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }

    #[test]
    fn test_request_build_failure_is_not_a_url_error() {
        let err: FetchError = Request::builder()
            .header("bad header\n", "x")
            .body(String::new())
            .unwrap_err()
            .into();
        assert!(matches!(err, FetchError::Request(_)));
        assert!(err.to_string().starts_with("failed to build request"));
    }

    #[test]
    fn test_status_error_message_is_readable() {
        let err = FetchError::Status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "HTTP error! status: 500 Internal Server Error");
    }
}
