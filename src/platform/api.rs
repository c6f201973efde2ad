//! Authenticated API verbs.

// crates.io
use oauth2::http::{HeaderValue, Method, Request, header::AUTHORIZATION};
// self
use crate::{
	_prelude::*,
	endpoint::UrlOptions,
	error::ConfigError,
	http::{ApiRequest, ApiResponse, HttpTransport},
	oauth::TransportErrorMapper,
	obs::{FlowKind, FlowSpan},
	platform::Platform,
};

impl<C, M> Platform<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Sends `request` with the current access token, refreshing it first when expired.
	///
	/// Any status is returned as an [`ApiResponse`]; use [`ApiResponse::error_for_status`] to turn
	/// non-success statuses into errors. Requests are never retried.
	pub async fn api_call(&self, request: ApiRequest) -> Result<ApiResponse> {
		FlowSpan::new(FlowKind::ApiCall, "api_call")
			.observe(async move {
				self.is_authorized(true).await?;

				let authorization =
					self.auth.authorization_header().ok_or(Error::AuthorizationUnavailable)?;
				let mut auth_value =
					HeaderValue::from_str(&authorization).map_err(ConfigError::from)?;

				auth_value.set_sensitive(true);

				let url = self.api_url(&request.target(), &UrlOptions::with_server());
				let mut http_request = Request::builder()
					.method(request.method)
					.uri(url)
					.body(request.body.unwrap_or_default())
					.map_err(ConfigError::from)?;
				let headers = http_request.headers_mut();

				headers.extend(request.headers);
				headers.insert(AUTHORIZATION, auth_value);

				let response = self.execute(FlowKind::ApiCall, http_request).await?;

				Ok(ApiResponse::received(response, self.clock.now()))
			})
			.await
	}

	/// Sends a `GET` request.
	pub async fn get(&self, path: &str) -> Result<ApiResponse> {
		self.api_call(ApiRequest::new(Method::GET, path)).await
	}

	/// Sends a `POST` request with a JSON body.
	pub async fn post<T>(&self, path: &str, body: &T) -> Result<ApiResponse>
	where
		T: ?Sized + Serialize,
	{
		self.api_call(ApiRequest::new(Method::POST, path).with_json(body)?).await
	}

	/// Sends a `PUT` request with a JSON body.
	pub async fn put<T>(&self, path: &str, body: &T) -> Result<ApiResponse>
	where
		T: ?Sized + Serialize,
	{
		self.api_call(ApiRequest::new(Method::PUT, path).with_json(body)?).await
	}

	/// Sends a `DELETE` request.
	pub async fn delete(&self, path: &str) -> Result<ApiResponse> {
		self.api_call(ApiRequest::new(Method::DELETE, path)).await
	}
}
