use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use docsweep_core::{FetchPolicy, SizePolicy};
use futures_util::StreamExt;
use reqwest::header::CONTENT_LENGTH;
use reqwest::redirect::Policy;
use sweep_logging::{human_size, sweep_debug, sweep_info};

use crate::extract::DocumentKind;
use crate::{FailureKind, FetchError, FetchMetadata, FetchedDocument};

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub size_policy: SizePolicy,
    pub accept_invalid_certs: bool,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self::from(&FetchPolicy::default())
    }
}

impl From<&FetchPolicy> for FetchSettings {
    fn from(policy: &FetchPolicy) -> Self {
        Self {
            connect_timeout: Duration::from_secs(policy.connect_timeout_secs),
            request_timeout: Duration::from_secs(policy.request_timeout_secs),
            redirect_limit: policy.redirect_limit,
            max_bytes: policy.max_bytes,
            size_policy: policy.size_policy,
            accept_invalid_certs: policy.accept_invalid_certs,
        }
    }
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedDocument, FetchError>;
}

/// Admission check on the declared `Content-Length`.
///
/// Under [`SizePolicy::DeclaredOnly`] an absent or unparsable header reads as
/// zero and is admitted.
pub fn check_declared_length(
    declared: Option<u64>,
    max_bytes: u64,
    policy: SizePolicy,
) -> Result<(), FetchError> {
    let len = match (declared, policy) {
        (Some(len), _) => len,
        (None, SizePolicy::DeclaredOnly) => 0,
        (None, SizePolicy::Strict) => {
            return Err(FetchError::new(
                FailureKind::MissingLength,
                "response has no usable content length",
            ))
        }
    };
    if len > max_bytes {
        return Err(FetchError::new(
            FailureKind::TooLarge {
                max_bytes,
                actual: Some(len),
            },
            "response too large",
        ));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    settings: FetchSettings,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }

    /// One client per request: the redirect policy reports its hop count
    /// through `hops`, which becomes [`FetchMetadata::redirect_count`].
    fn client_for(&self, hops: Arc<AtomicUsize>) -> Result<reqwest::Client, FetchError> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .redirect(counting_redirects(self.settings.redirect_limit, hops))
            .danger_accept_invalid_certs(self.settings.accept_invalid_certs)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, format!("http client: {err}")))
    }

    async fn read_capped(&self, response: reqwest::Response) -> Result<Bytes, FetchError> {
        let mut body = BytesMut::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            let next_len = body.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(next_len),
                    },
                    "response body exceeded the cap",
                ));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body.freeze())
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedDocument, FetchError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let hops = Arc::new(AtomicUsize::new(0));
        let client = self.client_for(hops.clone())?;

        sweep_debug!("GET {}", parsed);
        let response = client.get(parsed.clone()).send().await?;

        let status = response.status();
        let declared_len = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());
        sweep_info!(
            "Response {} for {}, declared size {}",
            status,
            url,
            human_size(declared_len.unwrap_or(0))
        );

        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }
        check_declared_length(declared_len, self.settings.max_bytes, self.settings.size_policy)?;

        let final_url = response.url().to_string();
        let bytes = match self.settings.size_policy {
            SizePolicy::Strict => self.read_capped(response).await?,
            SizePolicy::DeclaredOnly => response.bytes().await?,
        };

        let metadata = FetchMetadata {
            original_url: url.to_string(),
            final_url,
            redirect_count: hops.load(Ordering::Relaxed),
            declared_len,
            byte_len: bytes.len() as u64,
        };

        Ok(FetchedDocument {
            kind: DocumentKind::from_url(&parsed),
            bytes,
            metadata,
        })
    }
}

fn counting_redirects(limit: usize, hops: Arc<AtomicUsize>) -> Policy {
    Policy::custom(move |attempt| {
        // `previous` starts with the original URL, so its length is the
        // number of this hop.
        let taken = attempt.previous().len();
        hops.store(taken, Ordering::Relaxed);
        match taken {
            n if n <= limit => attempt.follow(),
            _ => attempt.error(format!("gave up after {limit} redirects")),
        }
    })
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        let kind = match () {
            _ if err.is_timeout() => FailureKind::Timeout,
            _ if err.is_redirect() => FailureKind::RedirectLimitExceeded,
            _ => FailureKind::Network,
        };
        FetchError::new(kind, err.to_string())
    }
}
