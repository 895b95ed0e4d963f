//! Bounded HTTP GET shared by discovery and JWKS fetching

use thiserror::Error;

use crate::config::VerifierConfig;

/// Failure to fetch a JSON document
#[derive(Debug, Error)]
pub enum FetchError {
    /// URL rejected before any request was made
    #[error("insecure URL (HTTPS required): {0}")]
    InsecureUrl(String),

    /// Transport-level failure (DNS, TLS, timeout, connection reset)
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// Server answered with a non-2xx status
    #[error("HTTP {status}")]
    Status {
        /// The returned status
        status: reqwest::StatusCode,
    },

    /// Body larger than the configured limit
    #[error("response exceeds {limit} bytes")]
    TooLarge {
        /// Configured limit in bytes
        limit: usize,
    },
}

/// GET-only client enforcing the configured size and scheme limits
#[derive(Debug, Clone)]
pub(crate) struct HttpFetcher {
    client: reqwest::Client,
    max_response_size: usize,
    require_https: bool,
}

impl HttpFetcher {
    pub(crate) fn new(client: reqwest::Client, config: &VerifierConfig) -> Self {
        Self {
            client,
            max_response_size: config.max_response_size,
            require_https: config.require_https,
        }
    }

    /// Fetch `url` and return the raw body
    pub(crate) async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        if self.require_https && !is_secure_url(url) {
            return Err(FetchError::InsecureUrl(url.to_string()));
        }

        let mut response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(FetchError::Request)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { status });
        }

        if let Some(content_length) = response.content_length()
            && content_length > self.max_response_size as u64
        {
            return Err(FetchError::TooLarge {
                limit: self.max_response_size,
            });
        }

        // Content-Length may be absent (chunked) or wrong, so count as we read
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(FetchError::Request)? {
            if body.len() + chunk.len() > self.max_response_size {
                return Err(FetchError::TooLarge {
                    limit: self.max_response_size,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }
}

/// HTTPS, or plain HTTP to a loopback host
fn is_secure_url(raw: &str) -> bool {
    let Ok(url) = url::Url::parse(raw) else {
        return false;
    };
    match url.scheme() {
        "https" => true,
        "http" => match url.host() {
            Some(url::Host::Domain(domain)) => domain == "localhost",
            Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
            Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
            None => false,
        },
        _ => false,
    }
}
