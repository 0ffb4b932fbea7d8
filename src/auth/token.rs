//! Immutable bearer token record and its expiry arithmetic.

// self
use crate::{_prelude::*, auth::OAuthScope};

/// Token value wrapper whose formatters never reveal the material.
///
/// The raw string is reachable only through [`expose`](Self::expose), called at the
/// transport boundary; every other rendering (logs, `Debug` dumps of enclosing
/// records) sees `<redacted>`. Tokens live in memory for the process lifetime only
/// and are deliberately not serializable.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps the raw token value.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the raw value for handing to the transport. Callers must not log it.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Immutable record describing one issued bearer token.
///
/// Records are created by a credential source on each successful acquisition and
/// superseded (never mutated) by the next one; the refresher's cache slot holds at
/// most one at a time.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken {
	/// Token value; callers must avoid logging it.
	pub secret: TokenSecret,
	/// Scope the token was issued for.
	pub scope: OAuthScope,
	/// Instant the token was obtained.
	pub issued_at: OffsetDateTime,
	/// Absolute expiry instant reported by the identity provider.
	pub expires_at: OffsetDateTime,
}
impl BearerToken {
	/// Creates a record with an absolute expiry instant.
	pub fn new(
		secret: impl Into<String>,
		scope: OAuthScope,
		issued_at: OffsetDateTime,
		expires_at: OffsetDateTime,
	) -> Self {
		Self { secret: TokenSecret::new(secret), scope, issued_at, expires_at }
	}

	/// Creates a record from the `expires_in` form used by token endpoints.
	pub fn from_expires_in(
		secret: impl Into<String>,
		scope: OAuthScope,
		issued_at: OffsetDateTime,
		expires_in: Duration,
	) -> Self {
		Self::new(secret, scope, issued_at, issued_at + expires_in)
	}

	/// Returns `true` if the token has expired at the provided instant.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		now >= self.expires_at
	}

	/// Returns `true` once the instant reaches the effective due time
	/// `expires_at - margin`.
	///
	/// The margin keeps a token from being handed to the transport moments before
	/// its real expiry; the boundary is inclusive so a caller exactly at the due
	/// time already refreshes.
	pub fn needs_refresh_at(&self, now: OffsetDateTime, margin: Duration) -> bool {
		now >= self.expires_at - margin
	}

	/// Remaining lifetime at the provided instant, in milliseconds, clamped to zero.
	pub fn remaining_lifetime_ms(&self, now: OffsetDateTime) -> i64 {
		let remaining = self.expires_at - now;

		i64::try_from(remaining.whole_milliseconds()).unwrap_or(i64::MAX).max(0)
	}

	/// Expiry instant as epoch milliseconds, the unit librdkafka's
	/// `oauthbearer_set_token` expects.
	pub fn expires_at_epoch_ms(&self) -> i64 {
		i64::try_from(self.expires_at.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
	}
}
impl Debug for BearerToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BearerToken")
			.field("secret", &"<redacted>")
			.field("scope", &self.scope)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
