//! Host-assigned managed identity credential backed by the instance metadata service.

// self
use crate::{
	_prelude::*,
	auth::OAuthScope,
	credential::{self, CredentialFuture, TokenCredential},
	error::ConfigError,
	http::IdentityHttpClient,
	obs::AcquireKind,
};

const IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";
const IMDS_API_VERSION: &str = "2018-02-01";

/// Credential that asks the instance metadata service for a token.
///
/// IMDS is a link-local endpoint only reachable from inside the platform; off
/// platform the connect attempt fails within the client's connect timeout and the
/// chain moves on.
#[derive(Clone, Debug)]
pub struct ManagedIdentityCredential {
	endpoint: Url,
	client_id: Option<String>,
	http: IdentityHttpClient,
}
impl ManagedIdentityCredential {
	/// Creates a credential, optionally pinned to a user-assigned identity.
	pub fn new(
		http: IdentityHttpClient,
		client_id: Option<String>,
	) -> Result<Self, ConfigError> {
		let endpoint = Url::parse(IMDS_ENDPOINT).map_err(|e| ConfigError::InvalidSetting {
			key: "imds.endpoint",
			reason: e.to_string(),
		})?;

		Ok(Self { endpoint, client_id, http })
	}

	fn request_url(&self, scope: &OAuthScope) -> Url {
		let mut url = self.endpoint.clone();

		{
			let mut query = url.query_pairs_mut();

			query.append_pair("api-version", IMDS_API_VERSION);
			query.append_pair("resource", scope.resource());

			if let Some(client_id) = &self.client_id {
				query.append_pair("client_id", client_id);
			}
		}

		url
	}
}
impl TokenCredential for ManagedIdentityCredential {
	fn kind(&self) -> AcquireKind {
		AcquireKind::ManagedIdentity
	}

	fn acquire<'a>(&'a self, scope: &'a OAuthScope) -> CredentialFuture<'a> {
		credential::observe(self.kind(), async move {
			let response = self.http.get_metadata(self.request_url(scope)).await?;

			Ok(response.into_token(scope.clone(), OffsetDateTime::now_utc()))
		})
	}
}
