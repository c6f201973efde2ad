//! Account-bound client that owns the credentials and serializes their renewal.
//!
//! A [`Platform`] pairs one [`AuthCoordinator`] with an HTTP transport. Session operations
//! (`authorize`, `logout`) and the API verbs live in submodules that add `impl` blocks here;
//! [`refresh`] holds the single-flight renewal protocol every authenticated request goes through.

pub mod refresh;

mod api;
mod session;

pub use refresh::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::{AuthCoordinator, TokenResponse, TokenSecret, TokenState},
	clock::{Clock, SystemClock},
	config::PlatformConfig,
	endpoint::{self, TOKEN_ENDPOINT, UrlContext, UrlOptions},
	http::{HttpRequest, HttpResponse, HttpTransport},
	oauth::{self, TokenGrant, TransportErrorMapper},
	obs::FlowKind,
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// Platform specialized for the crate's default reqwest transport stack.
pub type ReqwestPlatform = Platform<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Authenticated client for one application and account.
///
/// The platform is `Send + Sync`; share it by reference or behind an [`Arc`] when several tasks
/// act on the same account. All of them observe one credential set, and at most one refresh
/// call is in flight at any time.
pub struct Platform<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP transport used for every outbound request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Validated application and account settings.
	pub config: PlatformConfig,
	/// Counters for refresh attempts and waits.
	pub refresh_metrics: Arc<RefreshMetrics>,
	auth: AuthCoordinator,
	clock: Arc<dyn Clock>,
	refresh_slot: Mutex<Option<refresh::RefreshSubscription>>,
}
impl<C, M> Platform<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a platform that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		config: PlatformConfig,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		let clock: Arc<dyn Clock> = Arc::new(SystemClock);

		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			config,
			refresh_metrics: Default::default(),
			auth: AuthCoordinator::with_clock(clock.clone()),
			clock,
			refresh_slot: Mutex::new(None),
		}
	}

	/// Swaps the time source used for expiry checks.
	///
	/// The coordinator is rebuilt empty, so call this before authorizing or restoring a snapshot.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.auth = AuthCoordinator::with_clock(clock.clone());
		self.clock = clock;

		self
	}

	/// Credential coordinator backing this platform.
	pub fn auth(&self) -> &AuthCoordinator {
		&self.auth
	}

	/// Snapshot of the current credentials, suitable for persisting.
	pub fn auth_data(&self) -> TokenState {
		self.auth.data()
	}

	/// Restores credentials from a previously exported snapshot.
	pub fn set_auth_data(&self, state: TokenState) -> &Self {
		self.auth.restore(state);

		self
	}

	/// Builds a platform URL for `path` using the configured server, account, and access token.
	pub fn api_url(&self, path: &str, options: &UrlOptions) -> String {
		let access_token = if options.add_token { self.auth.access_token() } else { None };
		let ctx = UrlContext {
			server: &self.config.server,
			account: &self.config.account,
			access_token: access_token.as_ref().map(TokenSecret::expose),
		};

		endpoint::build_api_url(&ctx, path, options)
	}

	fn app_authorization(&self) -> String {
		oauth::basic_authorization(&self.config.app_key, self.config.app_secret.expose())
	}

	async fn execute(&self, flow: FlowKind, request: HttpRequest) -> Result<HttpResponse> {
		self.http_client
			.execute(request)
			.await
			.map_err(|err| self.transport_mapper.map_transport_error(flow, err))
	}

	async fn request_token(&self, grant: &TokenGrant<'_>) -> Result<TokenResponse> {
		let url = self.api_url(TOKEN_ENDPOINT, &UrlOptions::with_server());
		let form = grant.form();
		let request = oauth::auth_call_request(
			&url,
			&self.app_authorization(),
			form.iter().map(|(key, value)| (*key, value.as_str())),
		)?;
		let response = self.execute(grant.flow(), request).await?;

		oauth::decode_token_response(response, self.clock.now())
	}
}
#[cfg(feature = "reqwest")]
impl Platform<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a platform backed by the crate's default reqwest transport.
	pub fn new(config: PlatformConfig) -> Self {
		Self::with_http_client(
			config,
			ReqwestHttpClient::default(),
			Arc::new(ReqwestTransportErrorMapper),
		)
	}
}
impl<C, M> Debug for Platform<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Platform")
			.field("config", &self.config)
			.field("auth", &self.auth)
			.field("refresh_in_flight", &self.refresh_slot.lock().is_some())
			.finish()
	}
}
