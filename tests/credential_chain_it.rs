// std
use std::{io::Write, path::PathBuf};
// crates.io
use httpmock::prelude::*;
use tempfile::NamedTempFile;
// self
use kafka_oauthbearer::{
	auth::OAuthScope,
	config::CredentialSettings,
	credential::{self, TokenCredential, WorkloadIdentityCredential},
	http::IdentityHttpClient,
	obs::AcquireKind,
};

const TOKEN_PATH: &str = "/tenant-1/oauth2/v2.0/token";

fn scope() -> OAuthScope {
	OAuthScope::new("client-1/.default").expect("Scope should be valid for chain tests.")
}

fn http() -> IdentityHttpClient {
	IdentityHttpClient::new().expect("HTTP client should build for chain tests.")
}

fn settings() -> CredentialSettings {
	CredentialSettings {
		tenant_id: Some("tenant-1".into()),
		client_id: Some("client-1".into()),
		client_secret: None,
		federated_token_file: None,
		authority_host: "https://login.microsoftonline.com".into(),
	}
}

fn assertion_file() -> NamedTempFile {
	let mut file = NamedTempFile::new().expect("Assertion file fixture should be created.");

	file.write_all(b"header.payload.signature\n")
		.expect("Assertion file fixture should be writable.");

	file
}

#[tokio::test]
async fn workload_identity_exchanges_the_projected_assertion() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"federated-token\",\"token_type\":\"Bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	let file = assertion_file();
	let credential = WorkloadIdentityCredential::new(
		http(),
		&server.url(""),
		"tenant-1",
		"client-1",
		file.path(),
	)
	.expect("Credential should build against the mock authority.");
	let token = credential
		.acquire(&scope())
		.await
		.expect("Assertion exchange should mint a token.");

	assert_eq!(token.secret.expose(), "federated-token");

	mock.assert_async().await;
}

#[test]
fn explicit_secret_bypasses_the_chain() {
	let mut settings = settings();

	settings.client_secret = Some("secret-1".into());

	let credential = credential::select_credential(&settings, &http())
		.expect("Selection should succeed with an explicit secret.");

	assert_eq!(credential.kind(), AcquireKind::ClientSecret);
}

#[test]
fn chain_selection_requires_the_full_federation_signal() {
	// Without a federated token file the chain still builds; workload identity is
	// simply skipped at construction time.
	let credential = credential::select_credential(&settings(), &http())
		.expect("Selection should succeed without federation settings.");

	assert_eq!(credential.kind(), AcquireKind::Chain);

	let file = assertion_file();
	let mut federated = settings();

	federated.federated_token_file = Some(PathBuf::from(file.path()));

	let credential = credential::select_credential(&federated, &http())
		.expect("Selection should succeed with federation settings.");

	assert_eq!(credential.kind(), AcquireKind::Chain);
}
