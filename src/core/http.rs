use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, CONTENT_LENGTH};
use reqwest::Client;
use tracing::{debug, error};

const APP_USER_AGENT: &str = concat!("Installer/", env!("CARGO_PKG_VERSION"));

/// Client used for both the size request and the payload download.
///
/// Compression is disabled so `Content-Length` matches the bytes written to
/// disk, which the progress total and the skip-if-present check rely on.
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    Client::builder()
        .user_agent(APP_USER_AGENT)
        .default_headers(default_headers)
        .build()
}

/// Sends a `HEAD` request and returns the advertised `Content-Length`.
///
/// Returns 0 when the request fails or the header is missing or malformed;
/// the value is only advisory.
pub async fn fetch_required_space(client: &Client, url: &str) -> u64 {
    let response = match client.head(url).send().await {
        Ok(response) => response,
        Err(e) => {
            error!("Failed to check file size to download: {}", e);
            return 0;
        }
    };

    debug!("HEAD {} -> {}", url, response.status());

    let Some(value) = response.headers().get(CONTENT_LENGTH) else {
        error!("Content-Length header not found in response");
        return 0;
    };

    match value.to_str().ok().and_then(|v| v.trim().parse::<u64>().ok()) {
        Some(bytes) => {
            debug!("Content-Length: {} bytes", bytes);
            bytes
        }
        None => {
            error!("Content-Length header value is not a valid number: {:?}", value);
            0
        }
    }
}
