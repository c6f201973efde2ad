//! Token lifecycle coordinator for password/refresh-token OAuth 2.0 platform clients: single-flight
//! refresh, credential snapshots, and account-aware URL building in one crate.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod clock;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod platform;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		clock::{Clock, ManualClock},
		config::PlatformConfig,
		http::ReqwestHttpClient,
		oauth::ReqwestTransportErrorMapper,
		platform::Platform,
	};

	/// Platform type alias used by reqwest-backed integration tests.
	pub type ReqwestTestPlatform = Platform<ReqwestHttpClient, ReqwestTransportErrorMapper>;

	/// Application key shared by integration test fixtures.
	pub const TEST_APP_KEY: &str = "app-key";
	/// Application secret shared by integration test fixtures.
	pub const TEST_APP_SECRET: &str = "app-secret";

	/// Fixed instant every test clock starts from.
	pub fn test_epoch() -> OffsetDateTime {
		time::macros::datetime!(2025-01-01 00:00 UTC)
	}

	/// Builds a validated configuration pointing at `server`.
	pub fn test_config(server: &str) -> PlatformConfig {
		PlatformConfig::builder(TEST_APP_KEY, TEST_APP_SECRET)
			.server(server)
			.build()
			.expect("Test platform configuration should be valid.")
	}

	/// Constructs a reqwest-backed [`Platform`] driven by a [`ManualClock`].
	pub fn build_reqwest_test_platform(server: &str) -> (ReqwestTestPlatform, ManualClock) {
		let clock = ManualClock::new(test_epoch());
		let shared: Arc<dyn Clock> = Arc::new(clock.clone());
		let platform = Platform::new(test_config(server)).with_clock(shared);

		(platform, clock)
	}
}

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
