//! Transport primitives for identity-provider token exchanges.
//!
//! The module owns the crate's only HTTP stack: a thin [`reqwest`] wrapper with
//! bounded timeouts and no redirect following (token endpoints return results
//! directly), plus the response classification that turns endpoint replies into
//! [`TokenEndpointResponse`] values or typed [`CredentialError`]s.

// std
use std::time::Duration as StdDuration;
// crates.io
use serde::Deserializer;
// self
use crate::{_prelude::*, auth::{BearerToken, OAuthScope}, error::{ConfigError, CredentialError}};

const REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(10);
const CONNECT_TIMEOUT: StdDuration = StdDuration::from_secs(5);
const BODY_PREVIEW_LIMIT: usize = 256;

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// The wrapper is cheap to clone and safe to share; every credential strategy that
/// performs network IO borrows the same instance.
#[derive(Clone, Debug)]
pub struct IdentityHttpClient(ReqwestClient);
impl IdentityHttpClient {
	/// Builds a client with the crate's timeout and redirect policy.
	pub fn new() -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder()
			.timeout(REQUEST_TIMEOUT)
			.connect_timeout(CONNECT_TIMEOUT)
			.redirect(reqwest::redirect::Policy::none())
			.build()?;

		Ok(Self(client))
	}

	/// Wraps an existing [`ReqwestClient`]. Configure the client to disable redirect
	/// following; token endpoints must not delegate to another URI.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// POSTs a form body to a token endpoint and classifies the response.
	pub async fn post_form(
		&self,
		endpoint: Url,
		form: &[(&str, &str)],
	) -> Result<TokenEndpointResponse, CredentialError> {
		let response = self.0.post(endpoint).form(form).send().await?;

		classify(response).await
	}

	/// GETs a token from a metadata-style endpoint (IMDS) and classifies the response.
	pub async fn get_metadata(
		&self,
		endpoint: Url,
	) -> Result<TokenEndpointResponse, CredentialError> {
		let response = self.0.get(endpoint).header("Metadata", "true").send().await?;

		classify(response).await
	}
}
impl AsRef<ReqwestClient> for IdentityHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl From<reqwest::Error> for ConfigError {
	fn from(e: reqwest::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(e) }
	}
}

async fn classify(response: reqwest::Response) -> Result<TokenEndpointResponse, CredentialError> {
	let status = response.status().as_u16();
	let body = response.bytes().await?;

	if (200..300).contains(&status) {
		let de = &mut serde_json::Deserializer::from_slice(&body);

		return serde_path_to_error::deserialize(de)
			.map_err(|source| CredentialError::MalformedResponse { source, status: Some(status) });
	}

	// OAuth error bodies carry `error` + `error_description`; anything else gets a
	// bounded preview so diagnostics never balloon.
	let failure = serde_json::from_slice::<TokenEndpointFailure>(&body).ok();
	let (code, description) = match failure {
		Some(failure) => {
			let description =
				failure.error_description.unwrap_or_else(|| failure.error.clone());

			(Some(failure.error), description)
		},
		None => {
			let preview = String::from_utf8_lossy(&body);
			let preview = preview.chars().take(BODY_PREVIEW_LIMIT).collect::<String>();

			(None, preview)
		},
	};

	Err(CredentialError::TokenEndpoint { status, code, description })
}

/// Successful token endpoint payload.
///
/// Covers both the v2.0 token endpoint (`expires_in` relative seconds) and IMDS
/// (`expires_in`/`expires_on` encoded as strings).
#[derive(Clone, Debug, Deserialize)]
pub struct TokenEndpointResponse {
	/// Issued bearer token value.
	pub access_token: String,
	/// Relative lifetime in seconds.
	#[serde(deserialize_with = "i64_or_string")]
	pub expires_in: i64,
	/// Absolute expiry as epoch seconds, when the endpoint reports one.
	#[serde(default, deserialize_with = "opt_i64_or_string")]
	pub expires_on: Option<i64>,
	/// Token type label, normally `Bearer`.
	#[serde(default)]
	pub token_type: Option<String>,
}
impl TokenEndpointResponse {
	/// Converts the payload into a [`BearerToken`] issued at `now`.
	///
	/// An absolute `expires_on` wins over the relative `expires_in` because it is
	/// immune to latency between issuance and parsing.
	pub fn into_token(self, scope: OAuthScope, now: OffsetDateTime) -> BearerToken {
		match self.expires_on.and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok()) {
			Some(expires_at) => BearerToken::new(self.access_token, scope, now, expires_at),
			None => BearerToken::from_expires_in(
				self.access_token,
				scope,
				now,
				Duration::seconds(self.expires_in),
			),
		}
	}
}

#[derive(Deserialize)]
struct TokenEndpointFailure {
	error: String,
	#[serde(default)]
	error_description: Option<String>,
}

fn i64_or_string<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
	D: Deserializer<'de>,
{
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Raw {
		Number(i64),
		Text(String),
	}

	match Raw::deserialize(deserializer)? {
		Raw::Number(value) => Ok(value),
		Raw::Text(value) => value.parse().map_err(serde::de::Error::custom),
	}
}

fn opt_i64_or_string<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
	D: Deserializer<'de>,
{
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Raw {
		Number(i64),
		Text(String),
	}

	match Option::<Raw>::deserialize(deserializer)? {
		None => Ok(None),
		Some(Raw::Number(value)) => Ok(Some(value)),
		Some(Raw::Text(value)) => value.parse().map(Some).map_err(serde::de::Error::custom),
	}
}
