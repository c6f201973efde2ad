//! Request and response carriers for platform API calls.

// crates.io
use oauth2::http::{
	HeaderMap, HeaderValue, Method, StatusCode,
	header::{CONTENT_TYPE, HeaderName},
};
use serde::de::DeserializeOwned;
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransientError},
	http::HttpResponse,
};

/// Content type used for JSON request bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json";
/// Content type used for token and revoke calls.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// API request relative to the platform's server origin.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP verb.
	pub method: Method,
	/// Path such as `/account/~/extension/~` (or an absolute URL).
	pub path: String,
	/// Query pairs appended to the path.
	pub query: Vec<(String, String)>,
	/// Extra headers; `Authorization` is always overwritten by the platform.
	pub headers: HeaderMap,
	/// Optional request body.
	pub body: Option<Vec<u8>>,
}
impl ApiRequest {
	/// Creates a body-less request.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			query: Vec::new(),
			headers: HeaderMap::new(),
			body: None,
		}
	}

	/// Adds one query pair.
	pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((key.into(), value.into()));

		self
	}

	/// Adds or replaces a header.
	pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Serializes `body` as JSON and sets the matching content type.
	pub fn with_json<T>(mut self, body: &T) -> Result<Self>
	where
		T: ?Sized + Serialize,
	{
		let bytes = serde_json::to_vec(body).map_err(ConfigError::RequestBody)?;

		self.headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
		self.body = Some(bytes);

		Ok(self)
	}

	/// Sets a raw body; callers are expected to provide a content type header.
	pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = Some(body.into());

		self
	}

	/// Path with the query pairs appended.
	pub fn target(&self) -> String {
		if self.query.is_empty() {
			return self.path.clone();
		}

		let query = form_urlencoded::Serializer::new(String::new())
			.extend_pairs(self.query.iter())
			.finish();
		let separator = if self.path.contains('?') { '&' } else { '?' };

		format!("{}{separator}{query}", self.path)
	}
}

/// Raw response to an API call.
#[derive(Clone, Debug)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Response body bytes.
	pub body: Vec<u8>,
	/// `Retry-After` delay, measured from when the response was received.
	pub retry_after: Option<Duration>,
}
impl ApiResponse {
	pub(crate) fn received(response: HttpResponse, now: OffsetDateTime) -> Self {
		let retry_after = crate::http::parse_retry_after(response.headers(), now);
		let (parts, body) = response.into_parts();

		Self { status: parts.status, headers: parts.headers, body, retry_after }
	}

	/// `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		self.status.is_success()
	}

	/// Body decoded as lossy UTF-8.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Body decoded as JSON; failures report the offending path.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		decode_json(&self.body, self.status)
	}

	/// Turns non-success statuses into [`Error::Status`].
	pub fn error_for_status(self) -> Result<Self> {
		if self.is_success() {
			return Ok(self);
		}

		Err(Error::Status {
			status: self.status.as_u16(),
			body: self.text(),
			retry_after: self.retry_after,
		})
	}
}

pub(crate) fn decode_json<T>(body: &[u8], status: StatusCode) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer).map_err(|source| {
		TransientError::ResponseParse { source, status: Some(status.as_u16()) }.into()
	})
}
