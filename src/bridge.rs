//! Bridge between librdkafka's OAUTHBEARER refresh callback and the refresher.
//!
//! librdkafka invokes [`ClientContext::generate_oauth_token`] from its own
//! connection threads whenever the current token is absent or stale. The bridge
//! hands the refresh future to the owning Tokio runtime under a bounded timeout,
//! and converts every failure into a typed error returned to rdkafka—which routes
//! it to the transport's token-failure channel. No error or panic ever escapes the
//! callback boundary.

// std
use std::time::Duration as StdDuration;
// crates.io
use rdkafka::{
	client::{ClientContext, OAuthToken},
	consumer::ConsumerContext,
};
use tokio::runtime::Handle;
// self
use crate::{_prelude::*, error::CredentialError, refresher::TokenRefresher};

/// Token material handed to a transport after a successful refresh.
#[derive(Clone)]
pub struct SuppliedToken {
	/// Bearer token value, exposed because the transport consumes it raw.
	pub value: String,
	/// Principal identifier used for authorization.
	pub principal: String,
	/// Remaining lifetime in milliseconds, clamped to zero.
	pub lifetime_ms: i64,
	/// Absolute expiry instant.
	pub expires_at: OffsetDateTime,
}
impl Debug for SuppliedToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SuppliedToken")
			.field("value", &"<redacted>")
			.field("principal", &self.principal)
			.field("lifetime_ms", &self.lifetime_ms)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// rdkafka client context that sources bearer tokens through a [`TokenRefresher`].
#[derive(Clone)]
pub struct BearerTokenContext {
	refresher: Arc<TokenRefresher>,
	principal: String,
	runtime: Handle,
	handshake_timeout: StdDuration,
}
impl BearerTokenContext {
	/// Bound on how long one handshake may wait for credential acquisition.
	pub const DEFAULT_HANDSHAKE_TIMEOUT: StdDuration = StdDuration::from_secs(10);

	/// Creates a context bound to the runtime that will drive refresh futures.
	pub fn new(refresher: Arc<TokenRefresher>, principal: impl Into<String>, runtime: Handle) -> Self {
		Self {
			refresher,
			principal: principal.into(),
			runtime,
			handshake_timeout: Self::DEFAULT_HANDSHAKE_TIMEOUT,
		}
	}

	/// Overrides the handshake timeout.
	pub fn with_handshake_timeout(mut self, timeout: StdDuration) -> Self {
		self.handshake_timeout = timeout;

		self
	}

	/// Shared refresher driving this context.
	pub fn refresher(&self) -> &Arc<TokenRefresher> {
		&self.refresher
	}

	/// Resolves a token for an in-flight handshake.
	///
	/// Runs on whatever thread the transport uses for connection setup, so the
	/// refresh future is executed on the owning runtime from a short-lived worker
	/// thread. Exactly one outcome is produced per call; worker panics are caught
	/// and folded into the failure branch.
	pub fn on_token_required(&self) -> Result<SuppliedToken, CredentialError> {
		let refresher = self.refresher.clone();
		let runtime = self.runtime.clone();
		let timeout = self.handshake_timeout;
		let worker = std::thread::spawn(move || {
			runtime.block_on(async move {
				tokio::time::timeout(timeout, refresher.refresh_if_needed()).await
			})
		});
		let token = match worker.join() {
			Ok(Ok(outcome)) => outcome?,
			Ok(Err(_elapsed)) => {
				return Err(CredentialError::Timeout {
					waited: Duration::try_from(timeout).unwrap_or(Duration::MAX),
				});
			},
			Err(panic) => {
				let reason = panic
					.downcast_ref::<&str>()
					.map(|s| (*s).to_owned())
					.or_else(|| panic.downcast_ref::<String>().cloned())
					.unwrap_or_else(|| "refresh worker panicked".into());

				return Err(CredentialError::Worker { reason });
			},
		};
		let now = OffsetDateTime::now_utc();

		Ok(SuppliedToken {
			value: token.secret.expose().to_owned(),
			principal: self.principal.clone(),
			lifetime_ms: token.remaining_lifetime_ms(now),
			expires_at: token.expires_at,
		})
	}
}
impl ClientContext for BearerTokenContext {
	const ENABLE_REFRESH_OAUTH_TOKEN: bool = true;

	fn generate_oauth_token(
		&self,
		_oauthbearer_config: Option<&str>,
	) -> Result<OAuthToken, Box<dyn StdError>> {
		match self.on_token_required() {
			Ok(supplied) => {
				tracing::debug!(
					principal = %supplied.principal,
					lifetime_ms = supplied.lifetime_ms,
					"token supplied to transport"
				);

				Ok(OAuthToken {
					token: supplied.value,
					principal_name: supplied.principal,
					// librdkafka validates this field as an absolute epoch-millisecond
					// expiry, not a relative duration.
					lifetime_ms: epoch_ms(supplied.expires_at),
				})
			},
			Err(err) => {
				tracing::warn!(error = %err, "token refresh failed, reporting to transport");

				// rdkafka forwards this error to the transport's token-failure channel.
				Err(Box::new(err))
			},
		}
	}
}
impl ConsumerContext for BearerTokenContext {}
impl Debug for BearerTokenContext {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BearerTokenContext")
			.field("refresher", &self.refresher)
			.field("principal", &self.principal)
			.field("handshake_timeout", &self.handshake_timeout)
			.finish()
	}
}

fn epoch_ms(instant: OffsetDateTime) -> i64 {
	i64::try_from(instant.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
}
