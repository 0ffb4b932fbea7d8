// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use time::OffsetDateTime;
// self
use kafka_oauthbearer::{
	auth::OAuthScope,
	credential::ClientSecretCredential,
	error::CredentialError,
	http::IdentityHttpClient,
	refresher::TokenRefresher,
};

const TOKEN_PATH: &str = "/tenant-1/oauth2/v2.0/token";

fn scope() -> OAuthScope {
	OAuthScope::new("client-1/.default")
		.expect("Scope should be valid for refresh coordination tests.")
}

fn refresher(server: &MockServer) -> TokenRefresher {
	let http =
		IdentityHttpClient::new().expect("HTTP client should build for refresh tests.");
	let credential =
		ClientSecretCredential::new(http, &server.url(""), "tenant-1", "client-1", "secret-1")
			.expect("Credential should build against the mock authority.");

	TokenRefresher::new(Arc::new(credential), scope())
}

#[tokio::test]
async fn fresh_token_is_reused_without_a_second_exchange() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"fresh-token\",\"token_type\":\"Bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	let refresher = refresher(&server);
	let first =
		refresher.refresh_if_needed().await.expect("Initial refresh should mint a token.");
	let second =
		refresher.refresh_if_needed().await.expect("Follow-up call should hit the cache.");

	assert_eq!(first.secret.expose(), "fresh-token");
	assert_eq!(second.secret.expose(), "fresh-token");

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn concurrent_refreshes_collapse_into_one_exchange() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"guard-token\",\"token_type\":\"Bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	let refresher = Arc::new(refresher(&server));
	let (first, second) =
		tokio::join!(refresher.refresh_if_needed(), refresher.refresh_if_needed());
	let first = first.expect("First concurrent refresh should succeed.");
	let second = second.expect("Second concurrent refresh should succeed.");

	assert_eq!(first.secret.expose(), "guard-token");
	assert_eq!(second.secret.expose(), "guard-token");

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn failed_refresh_keeps_the_still_valid_token() {
	let server = MockServer::start_async().await;
	// Thirty seconds of lifetime sits inside the sixty-second safety margin, so the
	// token is due for refresh immediately while remaining valid.
	let mut seed = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"short-token\",\"token_type\":\"Bearer\",\"expires_in\":30}",
			);
		})
		.await;
	let refresher = refresher(&server);
	let seeded =
		refresher.refresh_if_needed().await.expect("Seeding refresh should mint a token.");

	assert_eq!(seeded.secret.expose(), "short-token");

	seed.delete_async().await;

	let outage = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(500).body("identity provider outage");
		})
		.await;
	let err = refresher
		.refresh_if_needed()
		.await
		.expect_err("A provider outage should propagate as a failure.");

	assert!(matches!(err, CredentialError::TokenEndpoint { status: 500, .. }));

	let cached = refresher.cached().expect("The cached token should survive the outage.");

	assert_eq!(cached.secret.expose(), "short-token");
	assert!(!cached.is_expired_at(OffsetDateTime::now_utc()));

	outage.assert_async().await;
}
