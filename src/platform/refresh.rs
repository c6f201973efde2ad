//! Single-flight refresh of the access token.
//!
//! The first caller that finds no refresh in flight becomes the leader: it pauses the coordinator,
//! publishes a watch channel in the platform's refresh slot, and sends the refresh grant. Every
//! later caller subscribes to that channel instead of sending its own grant and waits, bounded by
//! [`PlatformConfig::refresh_wait_timeout`](crate::config::PlatformConfig::refresh_wait_timeout),
//! until the leader settles. The leader's guard clears the slot, resumes the coordinator, and
//! broadcasts the outcome when it is dropped, so a failed or cancelled refresh releases waiters
//! as promptly as a successful one.

mod metrics;

pub use metrics::RefreshMetrics;

// crates.io
use tokio::{sync::watch, time::timeout};
// self
use crate::{
	_prelude::*,
	auth::{AuthCoordinator, TokenResponse},
	http::HttpTransport,
	oauth::{TokenGrant, TransportErrorMapper},
	obs::{self, FlowKind, FlowSpan},
	platform::Platform,
};

pub(crate) type RefreshSubscription = watch::Receiver<RefreshSignal>;

/// Progress of the refresh currently owning the slot.
#[derive(Clone, Debug)]
pub(crate) enum RefreshSignal {
	Pending,
	/// `None` when the leader failed or was cancelled.
	Settled(Option<TokenResponse>),
}
impl RefreshSignal {
	fn is_settled(&self) -> bool {
		matches!(self, Self::Settled(_))
	}

	fn response(&self) -> Option<&TokenResponse> {
		match self {
			Self::Pending | Self::Settled(None) => None,
			Self::Settled(Some(response)) => Some(response),
		}
	}
}

enum RefreshRole<'a> {
	Leader(InFlightRefresh<'a>),
	Waiter(RefreshSubscription),
	/// A refresh settled between the caller's expiry check and its claim.
	Fresh,
}

/// Leader's hold on the refresh slot.
struct InFlightRefresh<'a> {
	auth: &'a AuthCoordinator,
	slot: &'a Mutex<Option<RefreshSubscription>>,
	sender: watch::Sender<RefreshSignal>,
	/// Credential generation the grant was issued under.
	generation: u64,
	outcome: Option<TokenResponse>,
}
impl InFlightRefresh<'_> {
	fn complete(mut self, response: TokenResponse) {
		self.outcome = Some(response);
	}
}
impl Drop for InFlightRefresh<'_> {
	fn drop(&mut self) {
		self.slot.lock().take();
		self.auth.resume();
		self.sender.send_replace(RefreshSignal::Settled(self.outcome.take()));
	}
}

impl<C, M> Platform<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Ensures a valid access token is held, refreshing first when `refresh` is set.
	///
	/// Fails with [`Error::AuthorizationUnavailable`] when the access token is still invalid
	/// afterwards, or with the refresh error when renewal was attempted and failed.
	pub async fn is_authorized(&self, refresh: bool) -> Result<()> {
		if refresh && !self.auth.is_access_token_valid() {
			obs::flow_event(FlowKind::Refresh, "refresh required");

			self.refresh_flow(true).await?;
		}

		self.ensure_access_token()
	}

	/// Renews the access token with the refresh token grant.
	///
	/// Concurrent callers share one token endpoint call. The leader returns the response it
	/// received; waiters return a copy of it, or [`Error::AuthorizationUnavailable`] if the leader
	/// failed. A missing or expired refresh token fails with [`Error::RefreshTokenExpired`]
	/// before any network call is made. A response that arrives after the credentials were reset
	/// or replaced is discarded and reported as [`Error::AuthorizationUnavailable`].
	pub async fn refresh(&self) -> Result<TokenResponse> {
		self.refresh_flow(false).await?.ok_or(Error::AuthorizationUnavailable)
	}

	/// Runs one refresh attempt; `None` means `when_stale` was set and the access token had
	/// already been renewed by the time the slot was claimed.
	async fn refresh_flow(&self, when_stale: bool) -> Result<Option<TokenResponse>> {
		FlowSpan::new(FlowKind::Refresh, "refresh")
			.observe(async move {
				match self.claim_refresh_slot(when_stale)? {
					RefreshRole::Leader(in_flight) => self.lead_refresh(in_flight).await.map(Some),
					RefreshRole::Waiter(subscription) => {
						self.await_refresh(subscription).await.map(Some)
					},
					RefreshRole::Fresh => {
						obs::flow_event(FlowKind::Refresh, "access token already renewed");

						Ok(None)
					},
				}
			})
			.await
	}

	fn claim_refresh_slot(&self, when_stale: bool) -> Result<RefreshRole<'_>> {
		let mut slot = self.refresh_slot.lock();

		if let Some(subscription) = slot.as_ref() {
			return Ok(RefreshRole::Waiter(subscription.clone()));
		}
		if when_stale && self.auth.is_access_token_valid() {
			return Ok(RefreshRole::Fresh);
		}
		if !self.auth.is_refresh_token_valid() {
			return Err(Error::RefreshTokenExpired);
		}

		let (sender, subscription) = watch::channel(RefreshSignal::Pending);
		let generation = self.auth.generation();

		*slot = Some(subscription);

		self.auth.pause();

		Ok(RefreshRole::Leader(InFlightRefresh {
			auth: &self.auth,
			slot: &self.refresh_slot,
			sender,
			generation,
			outcome: None,
		}))
	}

	async fn lead_refresh(&self, in_flight: InFlightRefresh<'_>) -> Result<TokenResponse> {
		self.refresh_metrics.record_attempt();

		let refresh_token = self.auth.refresh_token().ok_or_else(|| {
			self.refresh_metrics.record_failure();

			Error::RefreshTokenExpired
		})?;
		let grant = TokenGrant::RefreshToken {
			refresh_token: refresh_token.expose(),
			remember: self.auth.is_remember(),
		};
		let response = self.request_token(&grant).await.inspect_err(|_| {
			self.refresh_metrics.record_failure();
		})?;

		if !self.auth.apply_refreshed(&response, in_flight.generation) {
			obs::flow_event(FlowKind::Refresh, "credentials replaced during refresh");
			self.refresh_metrics.record_failure();

			return Err(Error::AuthorizationUnavailable);
		}

		self.refresh_metrics.record_success();
		in_flight.complete(response.clone());

		Ok(response)
	}

	async fn await_refresh(&self, mut subscription: RefreshSubscription) -> Result<TokenResponse> {
		let waited = self.config.refresh_wait_timeout;

		self.refresh_metrics.record_wait();
		obs::flow_event(FlowKind::Refresh, "waiting for in-flight refresh");

		let outcome = match timeout(waited, subscription.wait_for(RefreshSignal::is_settled)).await {
			Err(_) => return Err(Error::RefreshWaitTimeout { waited }),
			Ok(Ok(signal)) => signal.response().cloned(),
			// Sender gone without a broadcast; treat as a failed leader.
			Ok(Err(_)) => None,
		};

		obs::flow_event(FlowKind::Refresh, "refresh settled");

		self.ensure_access_token()?;

		outcome.ok_or(Error::AuthorizationUnavailable)
	}

	fn ensure_access_token(&self) -> Result<()> {
		if self.auth.is_access_token_valid() { Ok(()) } else { Err(Error::AuthorizationUnavailable) }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		clock::ManualClock,
		config::PlatformConfig,
		http::{HttpClientError, HttpRequest, HttpResponse, TransportFuture},
	};

	#[derive(Debug, ThisError)]
	#[error("Transport is offline.")]
	struct Offline;

	struct OfflineTransport;
	impl HttpTransport for OfflineTransport {
		type TransportError = Offline;

		fn execute(&self, _request: HttpRequest) -> TransportFuture<'_, Self::TransportError> {
			Box::pin(async { Err::<HttpResponse, _>(HttpClientError::Reqwest(Box::new(Offline))) })
		}
	}

	struct OfflineMapper;
	impl TransportErrorMapper<Offline> for OfflineMapper {
		fn map_transport_error(&self, _flow: FlowKind, _error: HttpClientError<Offline>) -> Error {
			Error::AuthorizationUnavailable
		}
	}

	type OfflinePlatform = Platform<OfflineTransport, OfflineMapper>;

	fn offline_platform() -> (OfflinePlatform, ManualClock) {
		let clock = ManualClock::new(time::macros::datetime!(2025-01-01 00:00 UTC));
		let config = PlatformConfig::builder("app-key", "app-secret")
			.server("https://platform.example.com")
			.build()
			.expect("Test configuration should be valid.");
		let platform = OfflinePlatform::with_http_client(config, OfflineTransport, OfflineMapper)
			.with_clock(Arc::new(clock.clone()));

		platform.auth.set_data(&TokenResponse::new("A", "Bearer", "R", 600, 36_000));

		(platform, clock)
	}

	fn in_flight<'a>(
		auth: &'a AuthCoordinator,
		slot: &'a Mutex<Option<RefreshSubscription>>,
	) -> (InFlightRefresh<'a>, RefreshSubscription) {
		let (sender, subscription) = watch::channel(RefreshSignal::Pending);

		*slot.lock() = Some(subscription.clone());

		auth.pause();

		let generation = auth.generation();

		(InFlightRefresh { auth, slot, sender, generation, outcome: None }, subscription)
	}

	#[test]
	fn dropped_leader_settles_without_response() {
		let auth = AuthCoordinator::new();
		let slot = Mutex::new(None);
		let (guard, subscription) = in_flight(&auth, &slot);

		assert!(!subscription.borrow().is_settled());

		drop(guard);

		assert!(slot.lock().is_none());
		assert!(!auth.is_paused());
		assert!(subscription.borrow().is_settled());
		assert!(subscription.borrow().response().is_none());
	}

	#[test]
	fn completed_leader_broadcasts_response() {
		let auth = AuthCoordinator::new();
		let slot = Mutex::new(None);
		let (guard, subscription) = in_flight(&auth, &slot);

		guard.complete(TokenResponse::new("A", "Bearer", "R", 600, 36_000));

		assert!(slot.lock().is_none());
		assert!(!auth.is_paused());
		assert_eq!(
			subscription.borrow().response().map(|response| response.access_token.expose().to_owned()),
			Some("A".to_owned())
		);
	}

	#[tokio::test]
	async fn waiters_wake_when_leader_settles() {
		let auth = AuthCoordinator::new();
		let slot = Mutex::new(None);
		let (guard, mut subscription) = in_flight(&auth, &slot);
		let waiter = async {
			subscription.wait_for(RefreshSignal::is_settled).await.map(|signal| signal.is_settled())
		};
		let leader = async {
			tokio::task::yield_now().await;
			guard.complete(TokenResponse::new("A", "Bearer", "R", 600, 36_000));
		};
		let (woken, ()) = tokio::join!(waiter, leader);

		assert!(matches!(woken, Ok(true)));
	}

	#[test]
	fn stale_claim_yields_to_a_landed_renewal() {
		let (platform, clock) = offline_platform();

		// Expired when the caller checked, renewed by another leader before it claimed the slot.
		clock.advance(Duration::seconds(601));
		platform.auth.set_data(&TokenResponse::new("B", "Bearer", "S", 600, 36_000));

		assert!(matches!(platform.claim_refresh_slot(true), Ok(RefreshRole::Fresh)));
		assert!(platform.refresh_slot.lock().is_none());
		assert!(!platform.auth.is_paused());

		let role = platform.claim_refresh_slot(false);

		assert!(matches!(role, Ok(RefreshRole::Leader(_))));
		assert!(platform.refresh_slot.lock().is_some());

		drop(role);

		assert!(platform.refresh_slot.lock().is_none());
	}

	#[tokio::test]
	async fn fresh_token_skips_the_grant() {
		let (platform, _clock) = offline_platform();

		platform.is_authorized(true).await.expect("Valid access token should need no refresh.");

		assert_eq!(platform.refresh_metrics.attempts(), 0);
		assert!(matches!(platform.refresh().await, Err(Error::AuthorizationUnavailable)));
		assert_eq!(platform.refresh_metrics.attempts(), 1);
	}
}
