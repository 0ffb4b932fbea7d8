//! Token cache and refresh coordination.
//!
//! [`TokenRefresher`] owns the crate's only shared mutable state: a single-slot
//! cache of the most recently minted [`BearerToken`], guarded for concurrent
//! read/replace, plus a singleflight guard so overlapping refresh requests from
//! multiple transport connections collapse into one identity-provider call.

// self
use crate::{
	_prelude::*,
	auth::{BearerToken, OAuthScope},
	credential::TokenCredential,
	error::CredentialError,
	obs::{self, AcquireKind, AcquireOutcome, AcquireSpan},
};

/// Coordinates token refreshes against one credential source and one scope.
pub struct TokenRefresher {
	credential: Arc<dyn TokenCredential>,
	scope: OAuthScope,
	safety_margin: Duration,
	slot: RwLock<Option<BearerToken>>,
	flight: AsyncMutex<()>,
}
impl TokenRefresher {
	/// Buffer subtracted from a token's expiry to trigger proactive refresh.
	pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::seconds(60);

	/// Creates a refresher with the default safety margin.
	pub fn new(credential: Arc<dyn TokenCredential>, scope: OAuthScope) -> Self {
		Self {
			credential,
			scope,
			safety_margin: Self::DEFAULT_SAFETY_MARGIN,
			slot: RwLock::new(None),
			flight: AsyncMutex::new(()),
		}
	}

	/// Overrides the safety margin (negative values clamp to zero).
	pub fn with_safety_margin(mut self, margin: Duration) -> Self {
		self.safety_margin = if margin.is_negative() { Duration::ZERO } else { margin };

		self
	}

	/// Scope every minted token is requested for.
	pub fn scope(&self) -> &OAuthScope {
		&self.scope
	}

	/// Returns the cached token, if any, regardless of freshness.
	pub fn cached(&self) -> Option<BearerToken> {
		self.slot.read().clone()
	}

	/// Returns `true` when a call at `now` would contact the identity provider.
	///
	/// A refresh is needed when no token is cached or the cached token has reached
	/// its effective due time `expires_at - safety_margin`.
	pub fn needs_refresh_at(&self, now: OffsetDateTime) -> bool {
		self.fresh_at(now).is_none()
	}

	/// Returns the cached token or refreshes it when the due time has passed.
	///
	/// At most one identity-provider call is in flight at a time; concurrent callers
	/// wait on the singleflight guard and reuse the winner's token. On failure the
	/// cached token is left intact—a still-valid-but-soon-expiring token remains
	/// usable—and the error propagates so the transport can fail the in-flight
	/// handshake.
	pub async fn refresh_if_needed(&self) -> Result<BearerToken, CredentialError> {
		const KIND: AcquireKind = AcquireKind::Refresh;

		let span = AcquireSpan::new(KIND, "refresh_if_needed");

		obs::record_outcome(KIND, AcquireOutcome::Attempt);

		let result = span
			.instrument(async move {
				if let Some(token) = self.fresh_at(OffsetDateTime::now_utc()) {
					return Ok(token);
				}

				let _flight = self.flight.lock().await;

				// Another caller may have refreshed while this one waited on the guard.
				if let Some(token) = self.fresh_at(OffsetDateTime::now_utc()) {
					return Ok(token);
				}

				let token = self.credential.acquire(&self.scope).await?;

				*self.slot.write() = Some(token.clone());

				Ok(token)
			})
			.await;

		match &result {
			Ok(_) => obs::record_outcome(KIND, AcquireOutcome::Success),
			Err(_) => obs::record_outcome(KIND, AcquireOutcome::Failure),
		}

		result
	}

	fn fresh_at(&self, now: OffsetDateTime) -> Option<BearerToken> {
		self.slot
			.read()
			.as_ref()
			.filter(|token| !token.needs_refresh_at(now, self.safety_margin))
			.cloned()
	}

	#[cfg(test)]
	pub(crate) fn prime(&self, token: BearerToken) {
		*self.slot.write() = Some(token);
	}
}
impl Debug for TokenRefresher {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRefresher")
			.field("scope", &self.scope)
			.field("safety_margin", &self.safety_margin)
			.field("cached", &self.slot.read().is_some())
			.finish()
	}
}
