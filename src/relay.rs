//! Download-then-relay upload flow.
//!
//! Streams a remote resource straight into a multipart upload against the
//! Bunny Stream video API. The payload is never buffered in memory: the source
//! response body is handed to the outbound request as a byte stream.

use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Url};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, instrument, warn};

/// Default base URL of the Bunny Stream API
pub const DEFAULT_API_BASE: &str = "https://video.bunnycdn.com";
/// Default connect timeout applied to both network calls
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
/// Default idle timeout: longest stretch with no bytes moving on either call
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 120;

const UPLOAD_FIELD: &str = "file";
const GENERIC_DOWNLOAD_REASON: &str = "download failed";

/// Static credentials and endpoint settings for the relay
#[derive(Clone)]
pub struct RelayConfig {
    /// Video library (storage zone) name embedded in the upload path
    pub destination_identifier: String,
    /// Bearer token for the upload endpoint
    pub auth_token: String,
    /// Scheme and host of the upload API, without trailing path
    pub api_base: String,
    /// Connect timeout for outbound HTTP calls
    pub connect_timeout: Duration,
    /// Abort the relay when no bytes move for this long.
    /// Total transfer time is not capped.
    pub idle_timeout: Duration,
}

impl RelayConfig {
    /// Create a config pointing at the public Bunny Stream API
    #[must_use]
    pub fn new(destination_identifier: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            destination_identifier: destination_identifier.into(),
            auth_token: auth_token.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
        }
    }

    /// Override the upload API base URL
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Override the connect timeout
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Override the idle timeout
    #[must_use]
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Upload endpoint for the configured destination
    ///
    /// # Examples
    ///
    /// ```
    /// use stream_relay_bot::relay::RelayConfig;
    ///
    /// let config = RelayConfig::new("my-library", "secret");
    /// assert_eq!(
    ///     config.upload_url(),
    ///     "https://video.bunnycdn.com/library/my-library/videos/upload"
    /// );
    /// ```
    #[must_use]
    pub fn upload_url(&self) -> String {
        upload_url(&self.api_base, &self.destination_identifier)
    }
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("destination_identifier", &self.destination_identifier)
            .field("auth_token", &"[MASKED]")
            .field("api_base", &self.api_base)
            .field("connect_timeout", &self.connect_timeout)
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}

fn upload_url(api_base: &str, destination_identifier: &str) -> String {
    format!(
        "{}/library/{destination_identifier}/videos/upload",
        api_base.trim_end_matches('/')
    )
}

/// A single relay job, created per incoming message
#[derive(Clone)]
pub struct UploadRequest {
    /// URL of the resource to fetch, taken verbatim from the chat message
    pub source_url: String,
    /// Video library name the upload goes to
    pub destination_identifier: String,
    /// Bearer token for the upload endpoint
    pub auth_token: String,
}

impl UploadRequest {
    /// Build a request from its parts
    #[must_use]
    pub fn new(
        source_url: impl Into<String>,
        destination_identifier: impl Into<String>,
        auth_token: impl Into<String>,
    ) -> Self {
        Self {
            source_url: source_url.into(),
            destination_identifier: destination_identifier.into(),
            auth_token: auth_token.into(),
        }
    }
}

impl fmt::Debug for UploadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadRequest")
            .field("source_url", &self.source_url)
            .field("destination_identifier", &self.destination_identifier)
            .field("auth_token", &"[MASKED]")
            .finish()
    }
}

/// Terminal result of one relay invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Both the download and the upload succeeded
    Success,
    /// The source responded with a non-success status; no upload was attempted
    DownloadFailed {
        /// HTTP status code returned by the source
        status_code: u16,
        /// Short human-readable reason
        reason: String,
    },
    /// The upload endpoint responded with a non-success status
    UploadFailed {
        /// HTTP status code returned by the upload endpoint
        status_code: u16,
        /// Raw response body, passed through unmodified
        response_body: String,
    },
    /// Any connection-level failure on either call, or a malformed URL
    TransportError {
        /// Description of the failure, never empty
        message: String,
    },
}

impl UploadOutcome {
    /// Returns `true` for [`UploadOutcome::Success`]
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for UploadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "upload succeeded"),
            Self::DownloadFailed {
                status_code,
                reason,
            } => write!(f, "download failed ({status_code}): {reason}"),
            Self::UploadFailed {
                status_code,
                response_body,
            } => write!(f, "upload failed ({status_code}): {response_body}"),
            Self::TransportError { message } => write!(f, "transport error: {message}"),
        }
    }
}

/// Errors raised while building a [`Relay`]
#[derive(Debug, Error)]
pub enum RelayBuildError {
    /// The HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
enum RelayError {
    #[error("source responded with {status_code}: {reason}")]
    Download { status_code: u16, reason: String },
    #[error("upload endpoint responded with {status_code}")]
    Upload {
        status_code: u16,
        response_body: String,
    },
    #[error("invalid source URL: {0}")]
    InvalidUrl(String),
    #[error("no data transferred for {0:?}")]
    Stalled(Duration),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

impl From<RelayError> for UploadOutcome {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::Download {
                status_code,
                reason,
            } => Self::DownloadFailed {
                status_code,
                reason,
            },
            RelayError::Upload {
                status_code,
                response_body,
            } => Self::UploadFailed {
                status_code,
                response_body,
            },
            RelayError::InvalidUrl(reason) => Self::TransportError {
                message: format!("invalid source URL: {reason}"),
            },
            RelayError::Stalled(idle) => Self::TransportError {
                message: format!("transfer stalled: no data for {idle:?}"),
            },
            RelayError::Transport(e) => Self::TransportError {
                message: describe_error(&e),
            },
        }
    }
}

/// Render an error together with its source chain.
fn describe_error(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !text.is_empty() && !message.contains(&text) {
            if !message.is_empty() {
                message.push_str(": ");
            }
            message.push_str(&text);
        }
        source = cause.source();
    }
    if message.is_empty() {
        "unknown transport error".to_string()
    } else {
        message
    }
}

/// Last moment bytes moved on either leg of one relay.
struct Progress {
    started: Instant,
    last_ms: AtomicU64,
}

impl Progress {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            last_ms: AtomicU64::new(0),
        }
    }

    fn touch(&self) {
        let elapsed = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.last_ms.store(elapsed, Ordering::Relaxed);
    }

    /// Resolves once nothing has moved for `idle`.
    async fn stalled(&self, idle: Duration) {
        loop {
            let last = Duration::from_millis(self.last_ms.load(Ordering::Relaxed));
            let deadline = self.started + last + idle;
            if Instant::now() >= deadline {
                return;
            }
            tokio::time::sleep_until(deadline).await;
        }
    }
}

/// Derive the upload file name from a source URL.
///
/// Takes the text after the last `/` verbatim: no decoding, no query
/// stripping. A URL ending in `/` yields an empty name.
///
/// # Examples
///
/// ```
/// use stream_relay_bot::relay::derive_file_name;
///
/// assert_eq!(derive_file_name("https://cdn.example.com/videos/clip42.mp4"), "clip42.mp4");
/// assert_eq!(derive_file_name("https://cdn.example.com/"), "");
/// ```
#[must_use]
pub fn derive_file_name(source_url: &str) -> &str {
    source_url
        .rsplit_once('/')
        .map_or(source_url, |(_, tail)| tail)
}

/// Streams a remote resource into the Bunny Stream upload endpoint.
///
/// Holds only immutable state, so one instance is shared across all
/// concurrent chat handlers.
#[derive(Debug, Clone)]
pub struct Relay {
    client: Client,
    config: RelayConfig,
}

impl Relay {
    /// Create a relay with its own HTTP client
    ///
    /// # Errors
    ///
    /// Returns [`RelayBuildError`] if the HTTP client cannot be initialized.
    pub fn new(config: RelayConfig) -> Result<Self, RelayBuildError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    /// Create a relay around an existing client
    #[must_use]
    pub const fn with_client(client: Client, config: RelayConfig) -> Self {
        Self { client, config }
    }

    /// The configuration this relay was built with
    #[must_use]
    pub const fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Relay `source_url` to the configured destination.
    pub async fn relay(&self, source_url: &str) -> UploadOutcome {
        let request = UploadRequest::new(
            source_url,
            self.config.destination_identifier.as_str(),
            self.config.auth_token.as_str(),
        );
        self.relay_request(&request).await
    }

    /// Run one download-then-upload cycle.
    ///
    /// Always produces exactly one outcome; no error escapes.
    #[instrument(skip_all, fields(source_url = %request.source_url))]
    pub async fn relay_request(&self, request: &UploadRequest) -> UploadOutcome {
        match self.try_relay(request).await {
            Ok(()) => {
                info!("Video uploaded");
                UploadOutcome::Success
            }
            Err(e) => {
                warn!(error = %e, "Relay failed");
                e.into()
            }
        }
    }

    async fn try_relay(&self, request: &UploadRequest) -> Result<(), RelayError> {
        let source =
            Url::parse(&request.source_url).map_err(|e| RelayError::InvalidUrl(e.to_string()))?;

        // Dropping the transfer future closes both connections.
        let progress = Arc::new(Progress::new());
        let idle = self.config.idle_timeout;
        tokio::select! {
            result = self.transfer(source, request, Arc::clone(&progress)) => result,
            () = progress.stalled(idle) => Err(RelayError::Stalled(idle)),
        }
    }

    async fn transfer(
        &self,
        source: Url,
        request: &UploadRequest,
        progress: Arc<Progress>,
    ) -> Result<(), RelayError> {
        let download = self.client.get(source).send().await?;
        progress.touch();
        let status = download.status();
        if !status.is_success() {
            return Err(RelayError::Download {
                status_code: status.as_u16(),
                reason: status
                    .canonical_reason()
                    .unwrap_or(GENERIC_DOWNLOAD_REASON)
                    .to_string(),
            });
        }

        let file_name = derive_file_name(&request.source_url).to_string();
        let content_length = download.content_length();
        info!(
            status = status.as_u16(),
            file_name = %file_name,
            content_length,
            "Source responded, streaming to upload endpoint"
        );

        let chunks = download.bytes_stream().inspect(move |_| progress.touch());
        let body = Body::wrap_stream(chunks);
        let part = match content_length {
            Some(len) => Part::stream_with_length(body, len),
            None => Part::stream(body),
        }
        .file_name(file_name);
        let form = Form::new().part(UPLOAD_FIELD, part);

        let upload = self
            .client
            .post(upload_url(
                &self.config.api_base,
                &request.destination_identifier,
            ))
            .bearer_auth(&request.auth_token)
            .multipart(form)
            .send()
            .await?;

        let status = upload.status();
        if status.is_success() {
            return Ok(());
        }

        let response_body = upload
            .text()
            .await
            .unwrap_or_else(|e| format!("<unreadable response body: {e}>"));
        Err(RelayError::Upload {
            status_code: status.as_u16(),
            response_body,
        })
    }
}

/// Relay `source_url` with a one-off client.
///
/// Convenience for callers without a long-lived [`Relay`]; construction
/// failures are reported as [`UploadOutcome::TransportError`].
pub async fn relay(source_url: &str, destination_identifier: &str, auth_token: &str) -> UploadOutcome {
    match Relay::new(RelayConfig::new(destination_identifier, auth_token)) {
        Ok(relay) => relay.relay(source_url).await,
        Err(e) => UploadOutcome::TransportError {
            message: describe_error(&e),
        },
    }
}
