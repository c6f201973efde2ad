//! Platform-level error types shared across the coordinator, flows, and transports.

// self
use crate::{_prelude::*, auth::IdentifierError};

/// Platform-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical platform error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary upstream failure; retry with backoff.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Token endpoint rejected the submitted grant (bad password or refresh token).
	#[error("Token endpoint rejected the credentials: {reason}.")]
	CredentialsRejected {
		/// Server-supplied reason string.
		reason: String,
	},
	/// Refresh token is missing or expired, so no refresh can be attempted.
	#[error("Refresh token has expired.")]
	RefreshTokenExpired,
	/// Access token is still invalid after refreshing (or waiting for a refresh).
	#[error("Access token is not valid after refresh.")]
	AuthorizationUnavailable,
	/// Gave up waiting for another caller's in-flight refresh.
	#[error("Timed out after {waited:?} waiting for an in-flight refresh.")]
	RefreshWaitTimeout {
		/// Deadline that elapsed.
		waited: StdDuration,
	},
	/// API endpoint answered with a non-success status.
	#[error("API request failed with HTTP status {status}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Lossy UTF-8 rendering of the response body.
		body: String,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
}

/// Configuration and request-construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Header value contains characters HTTP does not allow.
	#[error("Header value is invalid.")]
	InvalidHeader(#[from] oauth2::http::header::InvalidHeaderValue),
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	RequestBody(#[source] serde_json::Error),
	/// Identifier failed validation.
	#[error(transparent)]
	InvalidIdentifier(#[from] IdentifierError),

	/// Application key is empty.
	#[error("Application key is required.")]
	MissingAppKey,
	/// Application secret is empty.
	#[error("Application secret is required.")]
	MissingAppSecret,
	/// Server origin was not configured.
	#[error("Server origin is required.")]
	MissingServer,
	/// Server origin cannot be parsed.
	#[error("Server origin is invalid.")]
	InvalidServer {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Server origin uses a scheme other than HTTP(S).
	#[error("Server origin must use http or https, got `{scheme}`.")]
	UnsupportedServerScheme {
		/// Scheme that was supplied.
		scheme: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Endpoint returned an unexpected but non-fatal response.
	#[error("Endpoint returned an unexpected response: {message}.")]
	Endpoint {
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Endpoint responded with JSON that could not be decoded.
	#[error("Endpoint returned malformed JSON.")]
	ResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the platform.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the platform.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
