//! Optional observability helpers for platform flows.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `rc_platform.flow` with the `flow` and
//!   `stage` (call site) fields, plus debug events along the refresh path.
//! - Enable `metrics` to increment the [`FLOW_COUNTER`] counter for every attempt/success/failure,
//!   labeled by `flow` + `outcome`.
//!
//! Every public flow runs through [`FlowSpan::observe`], so both layers see the same attempts.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Flow kinds observed by the platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Password grant issued by `authorize`.
	Authorize,
	/// Refresh token grant.
	Refresh,
	/// Token revocation on logout.
	Logout,
	/// Authenticated API request.
	ApiCall,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Authorize => "authorize",
			FlowKind::Refresh => "refresh",
			FlowKind::Logout => "logout",
			FlowKind::ApiCall => "api_call",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a platform flow.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
