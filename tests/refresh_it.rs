// std
use std::{
	error::Error as StdError,
	fmt::{Display, Formatter, Result as FmtResult},
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration as StdDuration,
};
// crates.io
use time::{Duration, macros};
// self
use rc_platform::{
	auth::TokenResponse,
	clock::ManualClock,
	config::PlatformConfig,
	endpoint::{REVOKE_ENDPOINT, TOKEN_ENDPOINT},
	error::{Error, TransportError},
	http::{HttpClientError, HttpRequest, HttpResponse, HttpTransport, TransportFuture},
	oauth::{TransportErrorMapper, oauth2::http::HeaderValue},
	obs::FlowKind,
	platform::Platform,
};

const REFRESHED_BODY: &str = r#"{"access_token":"access-2","token_type":"Bearer","refresh_token":"refresh-2","expires_in":600,"refresh_token_expires_in":36000}"#;

#[derive(Debug)]
struct FakeTransportError;
impl Display for FakeTransportError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("Connection reset.")
	}
}
impl StdError for FakeTransportError {}

/// Token endpoint stand-in that counts grants and answers them after a delay; revocations are
/// accepted immediately.
struct CountingTransport {
	calls: AtomicUsize,
	delay: StdDuration,
	fail: bool,
}
impl CountingTransport {
	fn new(delay_ms: u64, fail: bool) -> Arc<Self> {
		Arc::new(Self {
			calls: AtomicUsize::new(0),
			delay: StdDuration::from_millis(delay_ms),
			fail,
		})
	}

	fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl HttpTransport for CountingTransport {
	type TransportError = FakeTransportError;

	fn execute(&self, request: HttpRequest) -> TransportFuture<'_, Self::TransportError> {
		if request.uri().path().ends_with(REVOKE_ENDPOINT) {
			return Box::pin(async { Ok(HttpResponse::new(Vec::new())) });
		}

		self.calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async move {
			tokio::time::sleep(self.delay).await;

			if self.fail {
				return Err(HttpClientError::Reqwest(Box::new(FakeTransportError)));
			}

			assert!(request.uri().path().ends_with(TOKEN_ENDPOINT));

			let mut response = HttpResponse::new(REFRESHED_BODY.as_bytes().to_vec());

			response
				.headers_mut()
				.insert("content-type", HeaderValue::from_static("application/json"));

			Ok(response)
		})
	}
}

struct FakeMapper;
impl TransportErrorMapper<FakeTransportError> for FakeMapper {
	fn map_transport_error(
		&self,
		_flow: FlowKind,
		error: HttpClientError<FakeTransportError>,
	) -> Error {
		TransportError::network(error).into()
	}
}

type FakePlatform = Platform<CountingTransport, FakeMapper>;

fn build(
	transport: &Arc<CountingTransport>,
	wait: StdDuration,
) -> (Arc<FakePlatform>, ManualClock) {
	let clock = ManualClock::new(macros::datetime!(2025-01-01 00:00 UTC));
	let config = PlatformConfig::builder("app-key", "app-secret")
		.server("https://platform.example.com")
		.refresh_wait_timeout(wait)
		.build()
		.expect("Test configuration should be valid.");
	let platform = FakePlatform::with_http_client(config, transport.clone(), FakeMapper)
		.with_clock(Arc::new(clock.clone()));

	platform.auth().set_data(&TokenResponse::new("access-1", "Bearer", "refresh-1", 600, 36_000));

	(Arc::new(platform), clock)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_share_one_refresh() {
	let transport = CountingTransport::new(100, false);
	let (platform, clock) = build(&transport, StdDuration::from_secs(5));

	clock.advance(Duration::seconds(601));

	let handles = (0..8)
		.map(|_| {
			let platform = platform.clone();

			tokio::spawn(async move { platform.is_authorized(true).await })
		})
		.collect::<Vec<_>>();

	for handle in handles {
		handle.await.expect("Task should not panic.").expect("Every caller should be authorized.");
	}

	assert_eq!(transport.calls(), 1);
	assert_eq!(platform.refresh_metrics.attempts(), 1);
	assert!(platform.refresh_metrics.waits() <= 7);
	assert!(!platform.auth().is_paused());
	assert_eq!(platform.auth().authorization_header().as_deref(), Some("Bearer access-2"));
}

#[tokio::test]
async fn waiters_receive_the_leaders_response() {
	let transport = CountingTransport::new(50, false);
	let (platform, _clock) = build(&transport, StdDuration::from_secs(5));
	let (first, second) = tokio::join!(platform.refresh(), platform.refresh());
	let first = first.expect("Leader should refresh.");
	let second = second.expect("Waiter should receive the broadcast response.");

	assert_eq!(first, second);
	assert_eq!(second.access_token.expose(), "access-2");
	assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn expired_refresh_token_makes_no_call() {
	let transport = CountingTransport::new(0, false);
	let (platform, clock) = build(&transport, StdDuration::from_secs(5));

	clock.advance(Duration::hours(10));

	assert!(matches!(platform.is_authorized(true).await, Err(Error::RefreshTokenExpired)));
	assert!(matches!(platform.refresh().await, Err(Error::RefreshTokenExpired)));
	assert!(!platform.auth().is_paused());
	assert_eq!(transport.calls(), 0);
	assert_eq!(platform.refresh_metrics.attempts(), 0);
}

#[tokio::test]
async fn failed_refresh_resumes_and_releases_waiters() {
	let transport = CountingTransport::new(50, true);
	let (platform, clock) = build(&transport, StdDuration::from_secs(5));

	clock.advance(Duration::seconds(601));

	let (leader, waiter) = tokio::join!(platform.is_authorized(true), platform.is_authorized(true));

	assert!(matches!(leader, Err(Error::Transport(_))));
	assert!(matches!(waiter, Err(Error::AuthorizationUnavailable)));
	assert!(!platform.auth().is_paused());
	assert_eq!(platform.refresh_metrics.failures(), 1);

	// The slot is free again, so the next caller leads a new attempt.
	assert!(platform.refresh().await.is_err());
	assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn cancelled_leader_releases_waiters() {
	let transport = CountingTransport::new(1_000, false);
	let (platform, clock) = build(&transport, StdDuration::from_secs(5));

	clock.advance(Duration::seconds(601));

	let leader = tokio::time::timeout(StdDuration::from_millis(50), platform.refresh());
	let waiter = async {
		tokio::task::yield_now().await;

		platform.refresh().await
	};
	let (leader, waiter) = tokio::join!(leader, waiter);

	assert!(leader.is_err());
	assert!(matches!(waiter, Err(Error::AuthorizationUnavailable)));
	assert!(!platform.auth().is_paused());
}

#[tokio::test]
async fn waiter_gives_up_after_deadline() {
	let transport = CountingTransport::new(300, false);
	let wait = StdDuration::from_millis(20);
	let (platform, _clock) = build(&transport, wait);
	let waiter = async {
		tokio::task::yield_now().await;

		platform.refresh().await
	};
	let (leader, waiter) = tokio::join!(platform.refresh(), waiter);

	assert!(leader.is_ok());

	match waiter {
		Err(Error::RefreshWaitTimeout { waited }) => assert_eq!(waited, wait),
		other => panic!("Unexpected result: {other:?}"),
	}
}

#[tokio::test]
async fn logout_during_refresh_discards_renewed_tokens() {
	let transport = CountingTransport::new(100, false);
	let (platform, clock) = build(&transport, StdDuration::from_secs(5));

	clock.advance(Duration::seconds(601));

	let waiter = async {
		tokio::task::yield_now().await;

		platform.is_authorized(true).await
	};
	let logout = async {
		tokio::time::sleep(StdDuration::from_millis(20)).await;

		let result = platform.logout().await;

		assert!(!platform.auth().is_access_token_valid());

		result
	};
	let (leader, waiter, logout) = tokio::join!(platform.refresh(), waiter, logout);

	logout.expect("Logout should succeed.");

	assert!(matches!(leader, Err(Error::AuthorizationUnavailable)));
	assert!(matches!(waiter, Err(Error::AuthorizationUnavailable)));
	assert_eq!(transport.calls(), 1);
	assert!(!platform.auth().is_access_token_valid());
	assert!(!platform.auth().is_refresh_token_valid());
	assert!(platform.auth().authorization_header().is_none());
	assert!(!platform.auth().is_paused());
	assert_eq!(platform.refresh_metrics.failures(), 1);
	assert!(matches!(platform.is_authorized(true).await, Err(Error::RefreshTokenExpired)));
}
