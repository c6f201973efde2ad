//! Sole owner and mutator of an account's [`TokenState`].
//!
//! Every operation holds the coordinator's lock for its full duration, so replacements made by
//! [`AuthCoordinator::set_data`], [`AuthCoordinator::restore`], and [`AuthCoordinator::reset`] are
//! never observed half-applied. Serializing refresh attempts across callers is left to
//! [`Platform`](crate::platform::Platform); the `paused` flag here only records that one is in
//! flight.
//!
//! Each wholesale replacement bumps a credential generation. A refresh captures the generation
//! before its grant is sent and lands through [`AuthCoordinator::apply_refreshed`], which drops
//! the response if a reset, restore, or login happened in the meantime.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::{
	_prelude::*,
	auth::{TokenResponse, TokenSecret, TokenState},
	clock::{Clock, SystemClock},
};

/// Holds the current credentials and answers validity questions about them.
#[derive(Debug)]
pub struct AuthCoordinator {
	state: RwLock<TokenState>,
	// Only bumped while `state` is write-locked.
	generation: AtomicU64,
	clock: Arc<dyn Clock>,
}
impl AuthCoordinator {
	/// Creates an empty coordinator reading the system clock.
	pub fn new() -> Self {
		Self::with_clock(Arc::new(SystemClock))
	}

	/// Creates an empty coordinator reading `clock`.
	pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
		Self { state: RwLock::new(TokenState::default()), generation: AtomicU64::new(0), clock }
	}

	/// Replaces the tokens with those of a token endpoint response.
	///
	/// Expiry instants are stamped from the coordinator's clock. `paused` and `remember` are left
	/// untouched.
	pub fn set_data(&self, response: &TokenResponse) -> &Self {
		let now = self.clock.now();
		let mut state = self.state.write();

		state.replace_tokens(response, now);
		self.bump_generation();

		self
	}

	/// Applies a token response, clears `paused`, and optionally records `remember`, all under one
	/// lock acquisition.
	pub fn apply_token_response(&self, response: &TokenResponse, remember: Option<bool>) -> &Self {
		let now = self.clock.now();
		let mut state = self.state.write();

		state.replace_tokens(response, now);
		state.set_paused(false);

		if let Some(remember) = remember {
			state.set_remember(remember);
		}

		self.bump_generation();

		self
	}

	/// Applies a refresh response only if no credential replacement happened since `generation`
	/// was read. Returns whether the response was applied.
	pub fn apply_refreshed(&self, response: &TokenResponse, generation: u64) -> bool {
		let now = self.clock.now();
		let mut state = self.state.write();

		if self.generation.load(Ordering::Acquire) != generation {
			return false;
		}

		state.replace_tokens(response, now);
		state.set_paused(false);

		true
	}

	/// Current credential generation.
	pub fn generation(&self) -> u64 {
		self.generation.load(Ordering::Acquire)
	}

	/// Replaces the whole state with a previously exported snapshot, keeping `paused`.
	pub fn restore(&self, snapshot: TokenState) -> &Self {
		let mut state = self.state.write();
		let paused = state.paused();

		*state = snapshot;
		state.set_paused(paused);
		self.bump_generation();

		self
	}

	/// Returns a snapshot of the current state.
	pub fn data(&self) -> TokenState {
		self.state.read().clone()
	}

	/// `true` when an access token is held and has not yet expired.
	pub fn is_access_token_valid(&self) -> bool {
		let now = self.clock.now();

		self.state.read().access_token_valid_at(now)
	}

	/// `true` when a refresh token is held and has not yet expired.
	pub fn is_refresh_token_valid(&self) -> bool {
		let now = self.clock.now();

		self.state.read().refresh_token_valid_at(now)
	}

	/// Marks a refresh as in flight. Idempotent.
	pub fn pause(&self) {
		self.state.write().set_paused(true);
	}

	/// Clears the in-flight marker.
	pub fn resume(&self) -> &Self {
		self.state.write().set_paused(false);

		self
	}

	/// Whether a refresh is in flight.
	pub fn is_paused(&self) -> bool {
		self.state.read().paused()
	}

	/// Selects the refresh-token lifetime requested on the next renewal.
	pub fn set_remember(&self, remember: bool) -> &Self {
		self.state.write().set_remember(remember);

		self
	}

	/// Whether renewals request the long refresh-token lifetime.
	pub fn is_remember(&self) -> bool {
		self.state.read().remember()
	}

	/// Current access token.
	pub fn access_token(&self) -> Option<TokenSecret> {
		self.state.read().access_token().cloned()
	}

	/// Current refresh token.
	pub fn refresh_token(&self) -> Option<TokenSecret> {
		self.state.read().refresh_token().cloned()
	}

	/// Current token type.
	pub fn token_type(&self) -> String {
		self.state.read().token_type().to_owned()
	}

	/// `Authorization` header value (`"<token type> <access token>"`), if an access token is held.
	pub fn authorization_header(&self) -> Option<String> {
		let state = self.state.read();

		state.access_token().map(|token| format!("{} {}", state.token_type(), token.expose()))
	}

	/// Clears every field, including `paused` and `remember`.
	pub fn reset(&self) {
		let mut state = self.state.write();

		*state = TokenState::default();
		self.bump_generation();
	}

	fn bump_generation(&self) {
		self.generation.fetch_add(1, Ordering::AcqRel);
	}
}
impl Default for AuthCoordinator {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::clock::ManualClock;

	fn coordinator() -> (AuthCoordinator, ManualClock) {
		let clock = ManualClock::new(macros::datetime!(2025-01-01 00:00 UTC));

		(AuthCoordinator::with_clock(Arc::new(clock.clone())), clock)
	}

	fn response(expires_in: u64, refresh_expires_in: u64) -> TokenResponse {
		TokenResponse::new("A", "Bearer", "R", expires_in, refresh_expires_in)
	}

	#[test]
	fn set_data_exposes_tokens() {
		let (auth, _) = coordinator();

		auth.set_data(&response(600, 36_000));

		assert_eq!(auth.access_token().as_ref().map(TokenSecret::expose), Some("A"));
		assert_eq!(auth.refresh_token().as_ref().map(TokenSecret::expose), Some("R"));
		assert_eq!(auth.token_type(), "Bearer");
		assert_eq!(auth.authorization_header().as_deref(), Some("Bearer A"));
		assert!(auth.is_access_token_valid());
		assert!(auth.is_refresh_token_valid());
	}

	#[test]
	fn access_token_expires_after_reported_lifetime() {
		let (auth, clock) = coordinator();

		auth.set_data(&response(600, 36_000));
		clock.advance(Duration::seconds(599));

		assert!(auth.is_access_token_valid());

		clock.advance(Duration::seconds(1));

		assert!(!auth.is_access_token_valid());
		assert!(auth.is_refresh_token_valid());

		clock.advance(Duration::hours(10));

		assert!(!auth.is_refresh_token_valid());
	}

	#[test]
	fn set_data_keeps_paused_and_remember() {
		let (auth, _) = coordinator();

		auth.pause();
		auth.set_remember(true).set_data(&response(600, 36_000));

		assert!(auth.is_paused());
		assert!(auth.is_remember());
		assert!(!auth.resume().is_paused());
	}

	#[test]
	fn apply_token_response_resumes_and_records_remember() {
		let (auth, _) = coordinator();

		auth.pause();
		auth.apply_token_response(&response(600, 604_800), Some(true));

		assert!(!auth.is_paused());
		assert!(auth.is_remember());

		auth.apply_token_response(&response(600, 36_000), None);

		assert!(auth.is_remember());
	}

	#[test]
	fn reset_clears_everything() {
		let (auth, _) = coordinator();

		auth.set_remember(true).set_data(&response(600, 36_000));
		auth.pause();
		auth.reset();

		assert!(!auth.is_access_token_valid());
		assert!(!auth.is_refresh_token_valid());
		assert!(!auth.is_paused());
		assert!(!auth.is_remember());
		assert!(auth.access_token().is_none());
		assert!(auth.authorization_header().is_none());
		assert_eq!(auth.data(), TokenState::default());
	}

	#[test]
	fn restore_replaces_state_but_not_pause_marker() {
		let (source, _) = coordinator();

		source.set_remember(true).set_data(&response(600, 36_000));

		let snapshot = source.data();
		let (target, _) = coordinator();

		target.pause();
		target.restore(snapshot.clone());

		assert!(target.is_paused());
		assert!(target.is_remember());
		assert!(target.is_access_token_valid());
		assert_eq!(target.data().access_token_expires_at(), snapshot.access_token_expires_at());
	}

	#[test]
	fn refresh_lands_only_within_its_generation() {
		let (auth, _) = coordinator();

		auth.set_data(&response(600, 36_000));

		let generation = auth.generation();
		let renewed = TokenResponse::new("B", "Bearer", "S", 600, 36_000);

		auth.pause();

		assert!(auth.apply_refreshed(&renewed, generation));
		assert!(!auth.is_paused());
		assert_eq!(auth.authorization_header().as_deref(), Some("Bearer B"));
		assert_eq!(auth.generation(), generation);

		auth.pause();
		auth.reset();

		assert!(!auth.apply_refreshed(&renewed, generation));
		assert!(!auth.is_access_token_valid());
		assert!(auth.refresh_token().is_none());

		let generation = auth.generation();

		auth.restore(TokenState::default());

		assert_ne!(auth.generation(), generation);
	}
}
