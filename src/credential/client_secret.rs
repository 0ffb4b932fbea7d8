//! Explicit client-secret credential against the v2.0 token endpoint.

// self
use crate::{
	_prelude::*,
	auth::OAuthScope,
	credential::{self, CredentialFuture, TokenCredential},
	error::ConfigError,
	http::IdentityHttpClient,
	obs::AcquireKind,
};

const GRANT_TYPE: &str = "client_credentials";

/// Confidential-client credential authenticating with a shared secret.
#[derive(Clone)]
pub struct ClientSecretCredential {
	endpoint: Url,
	client_id: String,
	client_secret: String,
	http: IdentityHttpClient,
}
impl ClientSecretCredential {
	/// Creates a credential for the provided authority/tenant/client triple.
	pub fn new(
		http: IdentityHttpClient,
		authority_host: &str,
		tenant_id: &str,
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
	) -> Result<Self, ConfigError> {
		Ok(Self {
			endpoint: credential::token_endpoint(authority_host, tenant_id)?,
			client_id: client_id.into(),
			client_secret: client_secret.into(),
			http,
		})
	}
}
impl TokenCredential for ClientSecretCredential {
	fn kind(&self) -> AcquireKind {
		AcquireKind::ClientSecret
	}

	fn acquire<'a>(&'a self, scope: &'a OAuthScope) -> CredentialFuture<'a> {
		credential::observe(self.kind(), async move {
			let form = [
				("grant_type", GRANT_TYPE),
				("client_id", self.client_id.as_str()),
				("client_secret", self.client_secret.as_str()),
				("scope", scope.as_str()),
			];
			let response = self.http.post_form(self.endpoint.clone(), &form).await?;

			Ok(response.into_token(scope.clone(), OffsetDateTime::now_utc()))
		})
	}
}
impl Debug for ClientSecretCredential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientSecretCredential")
			.field("endpoint", &self.endpoint.as_str())
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.finish()
	}
}
