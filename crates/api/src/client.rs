use crate::error::{ErrorKind, Result};
use crate::models::{Identifier, Status, ViewResponse};
use async_trait::async_trait;
use exn::ResultExt;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use std::time::Duration;
use tracing::instrument;

pub const DEFAULT_ENDPOINT: &str = "https://api.bilibili.com/x/web-interface/view";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/140.0.0.0 Safari/537.36";
pub const DEFAULT_REFERER: &str = "https://www.bilibili.com/";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolves one identifier against the remote service, exactly once.
///
/// Implementations perform a single request and never retry; retry policy
/// belongs to the caller. A response that decodes correctly is always
/// `Ok`, whatever its status code. `Err` means the attempt produced no
/// usable answer at all.
#[async_trait]
pub trait Lookup: Send + Sync {
    async fn lookup(&self, id: &Identifier) -> Result<Status>;
}

/// Connection settings for [`ViewClient`].
///
/// The service rejects requests that do not look like they come from a
/// browser on its own site, hence the user agent and referer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    pub endpoint: String,
    pub user_agent: String,
    pub referer: String,
    /// Per-request timeout; expiry counts as a transport failure.
    pub timeout: Duration,
}
impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            referer: DEFAULT_REFERER.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// [`Lookup`] over HTTPS using `reqwest`.
///
/// Cheap to share: the underlying connection pool is reference counted, so
/// one client serves every concurrent lookup in a window.
#[derive(Debug, Clone)]
pub struct ViewClient {
    http: Client,
    endpoint: String,
}
impl ViewClient {
    pub fn new(options: ClientOptions) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(REFERER, HeaderValue::from_str(&options.referer).or_raise(|| ErrorKind::Client)?);
        let http = Client::builder()
            .user_agent(options.user_agent)
            .default_headers(headers)
            .timeout(options.timeout)
            .build()
            .or_raise(|| ErrorKind::Client)?;
        Ok(Self { http, endpoint: options.endpoint })
    }
}

#[async_trait]
impl Lookup for ViewClient {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn lookup(&self, id: &Identifier) -> Result<Status> {
        let transport = |e: reqwest::Error| exn::Exn::from(ErrorKind::Transport(e.to_string()));
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[("aid", id.as_str())])
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?;
        let body = response.text().await.map_err(transport)?;
        tracing::trace!(bytes = body.len(), "Response body received");
        ViewResponse::parse(&body)?.classify(id)
    }
}
