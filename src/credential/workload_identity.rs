//! Federated workload identity credential (client-assertion grant).

// std
use std::path::PathBuf;
// self
use crate::{
	_prelude::*,
	auth::OAuthScope,
	credential::{self, CredentialFuture, TokenCredential},
	error::{ConfigError, CredentialError},
	http::IdentityHttpClient,
	obs::AcquireKind,
};

const GRANT_TYPE: &str = "client_credentials";
const ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// Credential that exchanges a projected service-account token for a bearer token.
///
/// Kubernetes-style deployments mount the federated token at the path announced by
/// `AZURE_FEDERATED_TOKEN_FILE`; the file is re-read on every acquisition because
/// the platform rotates it underneath the process.
#[derive(Clone, Debug)]
pub struct WorkloadIdentityCredential {
	endpoint: Url,
	client_id: String,
	token_file: PathBuf,
	http: IdentityHttpClient,
}
impl WorkloadIdentityCredential {
	/// Creates a credential for the provided authority/tenant/client triple and
	/// federated token file.
	pub fn new(
		http: IdentityHttpClient,
		authority_host: &str,
		tenant_id: &str,
		client_id: impl Into<String>,
		token_file: impl Into<PathBuf>,
	) -> Result<Self, ConfigError> {
		Ok(Self {
			endpoint: credential::token_endpoint(authority_host, tenant_id)?,
			client_id: client_id.into(),
			token_file: token_file.into(),
			http,
		})
	}

	async fn read_assertion(&self) -> Result<String, CredentialError> {
		let raw = tokio::fs::read_to_string(&self.token_file).await.map_err(|source| {
			CredentialError::AssertionFile { path: self.token_file.clone(), source }
		})?;

		Ok(raw.trim().to_owned())
	}
}
impl TokenCredential for WorkloadIdentityCredential {
	fn kind(&self) -> AcquireKind {
		AcquireKind::WorkloadIdentity
	}

	fn acquire<'a>(&'a self, scope: &'a OAuthScope) -> CredentialFuture<'a> {
		credential::observe(self.kind(), async move {
			let assertion = self.read_assertion().await?;
			let form = [
				("grant_type", GRANT_TYPE),
				("client_id", self.client_id.as_str()),
				("client_assertion_type", ASSERTION_TYPE),
				("client_assertion", assertion.as_str()),
				("scope", scope.as_str()),
			];
			let response = self.http.post_form(self.endpoint.clone(), &form).await?;

			Ok(response.into_token(scope.clone(), OffsetDateTime::now_utc()))
		})
	}
}
