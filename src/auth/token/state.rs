//! Credential state held by the coordinator and exported as a snapshot.

// self
use crate::{
	_prelude::*,
	auth::token::{response::TokenResponse, secret::TokenSecret},
};

/// Complete credential pair for one account.
///
/// Values only change through [`AuthCoordinator`](crate::auth::AuthCoordinator); the copies it
/// hands out are snapshots suitable for persisting and restoring across process restarts. The
/// `paused` marker describes an in-process refresh and is never serialized.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenState {
	access_token: Option<TokenSecret>,
	#[serde(default)]
	token_type: String,
	refresh_token: Option<TokenSecret>,
	#[serde(default, with = "time::serde::rfc3339::option")]
	access_token_expires_at: Option<OffsetDateTime>,
	#[serde(default, with = "time::serde::rfc3339::option")]
	refresh_token_expires_at: Option<OffsetDateTime>,
	#[serde(default)]
	remember: bool,
	#[serde(skip)]
	paused: bool,
}
impl TokenState {
	/// Access token, if one is held.
	pub fn access_token(&self) -> Option<&TokenSecret> {
		self.access_token.as_ref()
	}

	/// Token type reported by the platform (empty when unset).
	pub fn token_type(&self) -> &str {
		&self.token_type
	}

	/// Refresh token, if one is held.
	pub fn refresh_token(&self) -> Option<&TokenSecret> {
		self.refresh_token.as_ref()
	}

	/// Absolute access-token expiry.
	pub fn access_token_expires_at(&self) -> Option<OffsetDateTime> {
		self.access_token_expires_at
	}

	/// Absolute refresh-token expiry.
	pub fn refresh_token_expires_at(&self) -> Option<OffsetDateTime> {
		self.refresh_token_expires_at
	}

	/// Whether renewals request the long refresh-token lifetime.
	pub fn remember(&self) -> bool {
		self.remember
	}

	/// Whether a refresh is in flight.
	pub fn paused(&self) -> bool {
		self.paused
	}

	pub(crate) fn replace_tokens(&mut self, response: &TokenResponse, now: OffsetDateTime) {
		self.access_token = non_empty(&response.access_token);
		self.token_type = response.token_type.clone();
		self.refresh_token = non_empty(&response.refresh_token);
		self.access_token_expires_at = Some(expires_at(now, response.access_token_lifetime()));
		self.refresh_token_expires_at = Some(expires_at(now, response.refresh_token_lifetime()));
	}

	pub(crate) fn set_remember(&mut self, remember: bool) {
		self.remember = remember;
	}

	pub(crate) fn set_paused(&mut self, paused: bool) {
		self.paused = paused;
	}

	pub(crate) fn access_token_valid_at(&self, now: OffsetDateTime) -> bool {
		live(self.access_token.as_ref(), self.access_token_expires_at, now)
	}

	pub(crate) fn refresh_token_valid_at(&self, now: OffsetDateTime) -> bool {
		live(self.refresh_token.as_ref(), self.refresh_token_expires_at, now)
	}
}
impl Debug for TokenState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenState")
			.field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
			.field("token_type", &self.token_type)
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("access_token_expires_at", &self.access_token_expires_at)
			.field("refresh_token_expires_at", &self.refresh_token_expires_at)
			.field("remember", &self.remember)
			.field("paused", &self.paused)
			.finish()
	}
}

fn non_empty(secret: &TokenSecret) -> Option<TokenSecret> {
	(!secret.is_empty()).then(|| secret.clone())
}

// Latest expiry stored; RFC 3339 snapshots cannot carry years past 9999.
const EXPIRY_CEILING: OffsetDateTime = time::macros::datetime!(9999-12-31 23:59:59 UTC);

fn expires_at(now: OffsetDateTime, lifetime: Duration) -> OffsetDateTime {
	now.checked_add(lifetime).map_or(EXPIRY_CEILING, |moment| moment.min(EXPIRY_CEILING))
}

fn live(
	secret: Option<&TokenSecret>,
	expires_at: Option<OffsetDateTime>,
	now: OffsetDateTime,
) -> bool {
	match (secret, expires_at) {
		(Some(secret), Some(expires_at)) => !secret.is_empty() && now < expires_at,
		_ => false,
	}
}
