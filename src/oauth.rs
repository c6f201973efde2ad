//! Token endpoint plumbing: grant forms, app credential headers, and error classification.
//!
//! Password and refresh grants share one request shape. Each is a form-encoded POST to
//! [`TOKEN_ENDPOINT`](crate::endpoint::TOKEN_ENDPOINT) authenticated with HTTP Basic app
//! credentials, and each asks for the fixed access-token lifetime plus one of two refresh-token
//! lifetimes. Responses are decoded with path-aware errors; rejections become
//! [`Error::CredentialsRejected`] and everything else is treated as transient.

pub use oauth2;

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
use oauth2::http::{
	HeaderValue, Method, Request, StatusCode,
	header::{AUTHORIZATION, CONTENT_TYPE},
};
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	auth::{Extension, TokenResponse},
	error::{ConfigError, TransientError, TransportError},
	http::{self, FORM_CONTENT_TYPE, HttpClientError, HttpRequest, HttpResponse},
	obs::FlowKind,
};

/// Access-token lifetime requested on every grant, in seconds.
pub const ACCESS_TOKEN_TTL: u64 = 600;
/// Refresh-token lifetime requested when `remember` is off, in seconds.
pub const REFRESH_TOKEN_TTL: u64 = 36_000;
/// Refresh-token lifetime requested when `remember` is on, in seconds.
pub const REFRESH_TOKEN_TTL_REMEMBER: u64 = 604_800;

/// Maps HTTP transport failures into platform [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a platform error.
	fn map_transport_error(&self, flow: FlowKind, error: HttpClientError<E>) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(&self, flow: FlowKind, err: HttpClientError<ReqwestError>) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(flow, *inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => map_generic_transport_error(flow, message),
			_ => map_generic_transport_error(flow, "unknown transport failure"),
		}
	}
}

/// Grant submitted to the token endpoint.
#[derive(Clone, Copy)]
pub enum TokenGrant<'a> {
	/// Resource-owner password grant.
	Password {
		/// Login name (usually a phone number).
		username: &'a str,
		/// Extension number within the account, if any.
		extension: Option<&'a Extension>,
		/// Account password.
		password: &'a str,
		/// Request the long refresh-token lifetime.
		remember: bool,
	},
	/// Refresh token grant.
	RefreshToken {
		/// Current refresh token.
		refresh_token: &'a str,
		/// Request the long refresh-token lifetime.
		remember: bool,
	},
}
impl TokenGrant<'_> {
	/// Flow the grant is reported under.
	pub fn flow(&self) -> FlowKind {
		match self {
			Self::Password { .. } => FlowKind::Authorize,
			Self::RefreshToken { .. } => FlowKind::Refresh,
		}
	}

	/// Form fields sent to the token endpoint, in wire order.
	pub fn form(&self) -> Vec<(&'static str, String)> {
		let mut form = Vec::with_capacity(6);
		let remember = match self {
			Self::Password { username, extension, password, remember } => {
				form.push(("grant_type", "password".to_owned()));
				form.push(("username", (*username).to_owned()));

				if let Some(extension) = extension {
					form.push(("extension", extension.to_string()));
				}

				form.push(("password", (*password).to_owned()));

				*remember
			},
			Self::RefreshToken { refresh_token, remember } => {
				form.push(("grant_type", "refresh_token".to_owned()));
				form.push(("refresh_token", (*refresh_token).to_owned()));

				*remember
			},
		};

		form.push(("access_token_ttl", ACCESS_TOKEN_TTL.to_string()));
		form.push(("refresh_token_ttl", refresh_token_ttl(remember).to_string()));

		form
	}
}
impl Debug for TokenGrant<'_> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Password { username, extension, remember, .. } => f
				.debug_struct("Password")
				.field("username", username)
				.field("extension", extension)
				.field("password", &"<redacted>")
				.field("remember", remember)
				.finish(),
			Self::RefreshToken { remember, .. } => f
				.debug_struct("RefreshToken")
				.field("refresh_token", &"<redacted>")
				.field("remember", remember)
				.finish(),
		}
	}
}

/// Refresh-token lifetime requested for the given `remember` preference.
pub const fn refresh_token_ttl(remember: bool) -> u64 {
	if remember { REFRESH_TOKEN_TTL_REMEMBER } else { REFRESH_TOKEN_TTL }
}

/// `Authorization` header value carrying the app credentials: `Basic base64(key:secret)`.
pub fn basic_authorization(app_key: &str, app_secret: &str) -> String {
	format!("Basic {}", STANDARD.encode(format!("{app_key}:{app_secret}")))
}

/// Builds a form-encoded POST authenticated with the app's Basic credentials.
pub(crate) fn auth_call_request<'a, I>(url: &str, authorization: &str, form: I) -> Result<HttpRequest>
where
	I: IntoIterator<Item = (&'a str, &'a str)>,
{
	let body = form_urlencoded::Serializer::new(String::new()).extend_pairs(form).finish();
	let mut auth_value = HeaderValue::from_str(authorization).map_err(ConfigError::from)?;

	auth_value.set_sensitive(true);

	Request::builder()
		.method(Method::POST)
		.uri(url)
		.header(AUTHORIZATION, auth_value)
		.header(CONTENT_TYPE, FORM_CONTENT_TYPE)
		.body(body.into_bytes())
		.map_err(|e| ConfigError::from(e).into())
}

/// Decodes a token endpoint answer, classifying non-success statuses.
pub(crate) fn decode_token_response(
	response: HttpResponse,
	now: OffsetDateTime,
) -> Result<TokenResponse> {
	let status = response.status();

	if status.is_success() {
		return http::message::decode_json(response.body(), status);
	}

	Err(classify_failure(&response, now, true))
}

/// Checks a revoke endpoint answer; revocation failures are never treated as rejections.
pub(crate) fn check_revoke_response(response: HttpResponse, now: OffsetDateTime) -> Result<()> {
	if response.status().is_success() {
		return Ok(());
	}

	Err(classify_failure(&response, now, false))
}

#[derive(Debug, Default, Deserialize)]
struct OAuthErrorBody {
	#[serde(default)]
	error: Option<String>,
	#[serde(default)]
	error_description: Option<String>,
	#[serde(default)]
	message: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FailureKind {
	Rejected,
	Transient,
}

fn classify_failure(response: &HttpResponse, now: OffsetDateTime, grant: bool) -> Error {
	let status = response.status();
	let body: OAuthErrorBody = serde_json::from_slice(response.body()).unwrap_or_default();
	let detail = body
		.error_description
		.clone()
		.or_else(|| body.message.clone())
		.or_else(|| body.error.clone())
		.unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown status").to_owned());

	if grant && classify_token_error(status, body.error.as_deref()) == FailureKind::Rejected {
		return Error::CredentialsRejected { reason: detail };
	}

	TransientError::Endpoint {
		message: detail,
		status: Some(status.as_u16()),
		retry_after: http::parse_retry_after(response.headers(), now),
	}
	.into()
}

fn classify_token_error(status: StatusCode, oauth_error: Option<&str>) -> FailureKind {
	if let Some(kind) = oauth_error.and_then(match_oauth_error) {
		return kind;
	}

	match status.as_u16() {
		400 | 401 | 403 => FailureKind::Rejected,
		_ => FailureKind::Transient,
	}
}

fn match_oauth_error(value: &str) -> Option<FailureKind> {
	const REJECTED: [&str; 4] =
		["invalid_grant", "invalid_client", "unauthorized_client", "access_denied"];
	const TRANSIENT: [&str; 2] = ["temporarily_unavailable", "server_error"];

	if REJECTED.iter().any(|code| value.eq_ignore_ascii_case(code)) {
		Some(FailureKind::Rejected)
	} else if TRANSIENT.iter().any(|code| value.eq_ignore_ascii_case(code)) {
		Some(FailureKind::Transient)
	} else {
		None
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(flow: FlowKind, err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return TransientError::Endpoint {
			message: format!("Request timed out during the {flow} flow"),
			status: err.status().map(|code| code.as_u16()),
			retry_after: None,
		}
		.into();
	}

	TransportError::from(err).into()
}

#[cfg(feature = "reqwest")]
fn map_generic_transport_error(flow: FlowKind, message: impl Display) -> Error {
	TransientError::Endpoint {
		message: format!("HTTP client error during the {flow} flow: {message}"),
		status: None,
		retry_after: None,
	}
	.into()
}
