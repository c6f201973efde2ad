//! Password login and logout.

// std
use std::iter;
// crates.io
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	auth::{Extension, TokenResponse},
	endpoint::{REVOKE_ENDPOINT, UrlOptions},
	error::ConfigError,
	http::HttpTransport,
	oauth::{self, TokenGrant, TransportErrorMapper},
	obs::{FlowKind, FlowSpan},
	platform::Platform,
};

impl<C, M> Platform<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Logs in with the resource-owner password grant.
	///
	/// An empty `extension` is treated as absent. On success the new tokens and the `remember`
	/// preference are stored together and the response is returned.
	pub async fn authorize(
		&self,
		username: &str,
		extension: Option<&str>,
		password: &str,
		remember: bool,
	) -> Result<TokenResponse> {
		FlowSpan::new(FlowKind::Authorize, "authorize")
			.observe(async move {
				let extension = match extension.filter(|value| !value.is_empty()) {
					Some(value) => Some(Extension::new(value).map_err(ConfigError::from)?),
					None => None,
				};
				let grant = TokenGrant::Password {
					username,
					extension: extension.as_ref(),
					password,
					remember,
				};
				let response = self.request_token(&grant).await?;

				self.auth.apply_token_response(&response, Some(remember));

				Ok(response)
			})
			.await
	}

	/// Revokes the current access token and forgets all credentials.
	///
	/// Local state is cleared before the revoke call is sent, so a failed or cancelled logout
	/// still leaves no credentials behind, and a refresh already in flight cannot restore them.
	/// The revoke outcome is returned; without an access token no call is made.
	pub async fn logout(&self) -> Result<()> {
		FlowSpan::new(FlowKind::Logout, "logout")
			.observe(async move {
				let token = self.auth.access_token();

				// Any refresh still in flight sees the new generation and discards its response.
				self.auth.reset();

				let Some(token) = token else {
					return Ok(());
				};
				let query = form_urlencoded::Serializer::new(String::new())
					.append_pair("token", token.expose())
					.finish();
				let url =
					format!("{}?{query}", self.api_url(REVOKE_ENDPOINT, &UrlOptions::with_server()));
				let request = oauth::auth_call_request(
					&url,
					&self.app_authorization(),
					iter::empty::<(&str, &str)>(),
				)?;
				let response = self.execute(FlowKind::Logout, request).await?;

				oauth::check_revoke_response(response, self.clock.now())
			})
			.await
	}
}
