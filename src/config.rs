//! Constructor-time settings for a [`Platform`](crate::platform::Platform).

// self
use crate::{
	_prelude::*,
	auth::{AccountId, TokenSecret},
	error::ConfigError,
};

/// Validated application credentials, server origin, and account context.
#[derive(Clone, Debug)]
pub struct PlatformConfig {
	/// Application key used for Basic authentication on token calls.
	pub app_key: String,
	/// Application secret paired with the key.
	pub app_secret: TokenSecret,
	/// Server origin (scheme + host + optional port), without a trailing slash.
	pub server: String,
	/// Account substituted for the `~` sentinel in account-scoped paths.
	pub account: AccountId,
	/// Upper bound a caller waits for another caller's in-flight refresh.
	pub refresh_wait_timeout: StdDuration,
}
impl PlatformConfig {
	/// Default deadline for waiting on an in-flight refresh.
	pub const DEFAULT_REFRESH_WAIT_TIMEOUT: StdDuration = StdDuration::from_secs(60);

	/// Creates a builder seeded with the application credentials.
	pub fn builder(
		app_key: impl Into<String>,
		app_secret: impl Into<String>,
	) -> PlatformConfigBuilder {
		PlatformConfigBuilder::new(app_key, app_secret)
	}
}

/// Builder for [`PlatformConfig`] values.
#[derive(Debug)]
pub struct PlatformConfigBuilder {
	app_key: String,
	app_secret: TokenSecret,
	server: Option<String>,
	account: Option<String>,
	refresh_wait_timeout: StdDuration,
}
impl PlatformConfigBuilder {
	fn new(app_key: impl Into<String>, app_secret: impl Into<String>) -> Self {
		Self {
			app_key: app_key.into(),
			app_secret: TokenSecret::new(app_secret),
			server: None,
			account: None,
			refresh_wait_timeout: PlatformConfig::DEFAULT_REFRESH_WAIT_TIMEOUT,
		}
	}

	/// Sets the server origin, e.g. `https://platform.example.com`.
	pub fn server(mut self, server: impl Into<String>) -> Self {
		self.server = Some(server.into());

		self
	}

	/// Overrides the account substituted for the `~` sentinel.
	pub fn account(mut self, account: impl Into<String>) -> Self {
		self.account = Some(account.into());

		self
	}

	/// Overrides how long a caller waits for another caller's refresh.
	pub fn refresh_wait_timeout(mut self, timeout: StdDuration) -> Self {
		self.refresh_wait_timeout = timeout;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<PlatformConfig, ConfigError> {
		if self.app_key.is_empty() {
			return Err(ConfigError::MissingAppKey);
		}
		if self.app_secret.is_empty() {
			return Err(ConfigError::MissingAppSecret);
		}

		let server = self.server.ok_or(ConfigError::MissingServer)?;
		let server = validate_server(&server)?;
		let account = match self.account {
			Some(account) => AccountId::new(account)?,
			None => AccountId::default(),
		};

		Ok(PlatformConfig {
			app_key: self.app_key,
			app_secret: self.app_secret,
			server,
			account,
			refresh_wait_timeout: self.refresh_wait_timeout,
		})
	}
}

fn validate_server(raw: &str) -> Result<String, ConfigError> {
	let trimmed = raw.trim().trim_end_matches('/');

	if trimmed.is_empty() {
		return Err(ConfigError::MissingServer);
	}

	let parsed = Url::parse(trimmed).map_err(|source| ConfigError::InvalidServer { source })?;

	match parsed.scheme() {
		"http" | "https" => Ok(trimmed.to_owned()),
		other => Err(ConfigError::UnsupportedServerScheme { scheme: other.to_owned() }),
	}
}
