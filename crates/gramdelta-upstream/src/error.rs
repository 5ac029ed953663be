use thiserror::Error;

/// Errors returned by the upstream social-graph client.
///
/// Which variant a failed call maps to is decided in one place
/// ([`crate::client::UpstreamClient`] status classification), so the
/// orchestrator and routing layer can rely on the taxonomy instead of
/// inspecting raw HTTP responses.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP 404, or a profile response without a user body.
    #[error("user not found: {context}")]
    NotFound { context: String },

    /// The resolved account is private; its social graph cannot be read.
    #[error("account @{handle} is private")]
    PrivateAccount { handle: String },

    /// HTTP 429. Callers should retry after a cooldown.
    #[error(
        "upstream rate limit exceeded (retry after {retry_after_secs}s); \
         try again in a few minutes"
    )]
    RateLimited { retry_after_secs: u64 },

    /// HTTP 402 (quota exhausted) or 5xx.
    #[error("upstream provider is temporarily unavailable (status {status})")]
    Unavailable { status: u16 },

    /// HTTP 403. The account might be restricted.
    #[error("upstream access denied: {context}")]
    Forbidden { context: String },

    /// Any other non-2xx status, passed through unclassified.
    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// The response body could not be deserialized into the expected shape.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}
