//! Credential sources that mint bearer tokens for a given scope.
//!
//! A [`TokenCredential`] produces a token or a typed failure; it never panics and
//! never raises through the refresh boundary. Strategy selection happens once at
//! startup via [`select_credential`] and stays fixed for the process lifetime:
//! explicit tenant + client id + client secret pick the client-secret strategy,
//! anything else falls back to the platform-default chain.

pub mod chain;
pub mod client_secret;
pub mod developer_cli;
pub mod managed_identity;
pub mod workload_identity;

pub use chain::*;
pub use client_secret::*;
pub use developer_cli::*;
pub use managed_identity::*;
pub use workload_identity::*;

// self
use crate::{
	_prelude::*,
	auth::{BearerToken, OAuthScope},
	config::CredentialSettings,
	error::{ConfigError, CredentialError},
	http::IdentityHttpClient,
	obs::{self, AcquireKind, AcquireOutcome, AcquireSpan},
};

/// Boxed future returned by [`TokenCredential::acquire`].
pub type CredentialFuture<'a> =
	Pin<Box<dyn Future<Output = Result<BearerToken, CredentialError>> + 'a + Send>>;

/// Contract for strategies that can produce a bearer token for a scope.
///
/// Implementations may perform network IO and must be safe to call repeatedly;
/// each call yields exactly one token or exactly one failure.
pub trait TokenCredential: Send + Sync {
	/// Strategy label used for spans and chain failure summaries.
	fn kind(&self) -> AcquireKind;

	/// Attempts to mint a token valid for the provided scope.
	fn acquire<'a>(&'a self, scope: &'a OAuthScope) -> CredentialFuture<'a>;
}

/// Resolves the credential strategy from the environment-derived settings.
///
/// Evaluated once at process start; the returned strategy is immutable afterwards.
pub fn select_credential(
	settings: &CredentialSettings,
	http: &IdentityHttpClient,
) -> Result<Arc<dyn TokenCredential>, ConfigError> {
	if let Some((tenant, client, secret)) = settings.explicit_secret() {
		tracing::info!(strategy = AcquireKind::ClientSecret.as_str(), "credential selected");

		return Ok(Arc::new(ClientSecretCredential::new(
			http.clone(),
			&settings.authority_host,
			tenant,
			client,
			secret,
		)?));
	}

	tracing::info!(strategy = AcquireKind::Chain.as_str(), "credential selected");

	Ok(Arc::new(ChainedCredential::from_settings(settings, http)?))
}

/// Builds the v2.0 token endpoint for an authority host + tenant pair.
pub(crate) fn token_endpoint(authority_host: &str, tenant: &str) -> Result<Url, ConfigError> {
	let raw = format!("{}/{tenant}/oauth2/v2.0/token", authority_host.trim_end_matches('/'));

	Url::parse(&raw).map_err(|e| ConfigError::InvalidSetting {
		key: "AZURE_AUTHORITY_HOST",
		reason: format!("`{raw}` is not a valid token endpoint: {e}"),
	})
}

/// Wraps an acquisition future with the span + outcome bookkeeping every strategy
/// shares.
pub(crate) fn observe<'a, Fut>(kind: AcquireKind, fut: Fut) -> CredentialFuture<'a>
where
	Fut: 'a + Future<Output = Result<BearerToken, CredentialError>> + Send,
{
	let span = AcquireSpan::new(kind, "acquire");

	Box::pin(async move {
		obs::record_outcome(kind, AcquireOutcome::Attempt);

		let result = span.instrument(fut).await;

		match &result {
			Ok(_) => obs::record_outcome(kind, AcquireOutcome::Success),
			Err(_) => obs::record_outcome(kind, AcquireOutcome::Failure),
		}

		result
	})
}
