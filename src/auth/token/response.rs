//! Token endpoint payload returned by password and refresh grants.

// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// Decoded body of a successful token endpoint call.
///
/// Every named field is required; fields the platform adds beyond these (scope, owner id,
/// endpoint id) are kept in [`TokenResponse::extra`].
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
	/// Newly issued access token.
	pub access_token: TokenSecret,
	/// Token type used as the authorization scheme (usually `bearer`).
	pub token_type: String,
	/// Newly issued refresh token.
	pub refresh_token: TokenSecret,
	/// Seconds until the access token expires.
	pub expires_in: u64,
	/// Seconds until the refresh token expires.
	pub refresh_token_expires_in: u64,
	/// Additional fields returned by the platform.
	#[serde(flatten)]
	pub extra: BTreeMap<String, serde_json::Value>,
}
impl TokenResponse {
	/// Builds a response with no extra fields.
	pub fn new(
		access_token: impl Into<String>,
		token_type: impl Into<String>,
		refresh_token: impl Into<String>,
		expires_in: u64,
		refresh_token_expires_in: u64,
	) -> Self {
		Self {
			access_token: TokenSecret::new(access_token),
			token_type: token_type.into(),
			refresh_token: TokenSecret::new(refresh_token),
			expires_in,
			refresh_token_expires_in,
			extra: BTreeMap::new(),
		}
	}

	/// Access-token lifetime as a duration.
	pub fn access_token_lifetime(&self) -> Duration {
		seconds(self.expires_in)
	}

	/// Refresh-token lifetime as a duration.
	pub fn refresh_token_lifetime(&self) -> Duration {
		seconds(self.refresh_token_expires_in)
	}
}
impl Debug for TokenResponse {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenResponse")
			.field("access_token", &self.access_token)
			.field("token_type", &self.token_type)
			.field("refresh_token", &self.refresh_token)
			.field("expires_in", &self.expires_in)
			.field("refresh_token_expires_in", &self.refresh_token_expires_in)
			.field("extra", &self.extra.keys().collect::<Vec<_>>())
			.finish()
	}
}

fn seconds(value: u64) -> Duration {
	Duration::seconds(i64::try_from(value).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn extra_fields_are_preserved() {
		let response: TokenResponse = serde_json::from_str(
			r#"{"access_token":"A","token_type":"bearer","refresh_token":"R","expires_in":600,"refresh_token_expires_in":36000,"owner_id":"42","scope":"ReadAccounts"}"#,
		)
		.expect("Token response should decode.");

		assert_eq!(response.access_token.expose(), "A");
		assert_eq!(response.access_token_lifetime(), Duration::minutes(10));
		assert_eq!(response.refresh_token_lifetime(), Duration::hours(10));
		assert_eq!(response.extra.get("owner_id"), Some(&serde_json::json!("42")));
	}

	#[test]
	fn missing_or_negative_fields_fail_to_decode() {
		assert!(
			serde_json::from_str::<TokenResponse>(
				r#"{"access_token":"A","token_type":"bearer","expires_in":600,"refresh_token_expires_in":36000}"#,
			)
			.is_err()
		);
		assert!(
			serde_json::from_str::<TokenResponse>(
				r#"{"access_token":"A","token_type":"bearer","refresh_token":"R","expires_in":-1,"refresh_token_expires_in":36000}"#,
			)
			.is_err()
		);
	}

	#[test]
	fn debug_output_redacts_tokens() {
		let rendered = format!("{:?}", TokenResponse::new("A", "bearer", "R", 600, 36_000));

		assert!(!rendered.contains("\"A\""));
		assert!(rendered.contains("<redacted>"));
	}
}
