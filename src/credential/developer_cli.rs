//! Locally cached developer CLI sessions as a last-resort credential.

// crates.io
use tokio::process::Command;
// self
use crate::{
	_prelude::*,
	auth::{BearerToken, OAuthScope},
	credential::{self, CredentialFuture, TokenCredential},
	error::CredentialError,
	obs::AcquireKind,
};

const DEFAULT_PROGRAM: &str = "az";

/// Credential that shells out to `az account get-access-token`.
///
/// Useful for local development where a developer already holds a CLI session; the
/// CLI caches and refreshes its own tokens, this strategy only reads them.
#[derive(Clone, Debug)]
pub struct DeveloperCliCredential {
	program: String,
}
impl DeveloperCliCredential {
	/// Creates a credential invoking the standard CLI binary.
	pub fn new() -> Self {
		Self { program: DEFAULT_PROGRAM.into() }
	}

	#[cfg(test)]
	pub(crate) fn with_program(program: impl Into<String>) -> Self {
		Self { program: program.into() }
	}

	async fn invoke(&self, scope: &OAuthScope) -> Result<BearerToken, CredentialError> {
		let output = Command::new(&self.program)
			.args(["account", "get-access-token", "--scope", scope.as_str(), "--output", "json"])
			.output()
			.await
			.map_err(|e| CredentialError::DeveloperCli {
				reason: format!("`{}` could not be invoked: {e}", self.program),
			})?;

		if !output.status.success() {
			let stderr = String::from_utf8_lossy(&output.stderr);

			return Err(CredentialError::DeveloperCli {
				reason: stderr.lines().next().unwrap_or("non-zero exit status").to_owned(),
			});
		}

		let de = &mut serde_json::Deserializer::from_slice(&output.stdout);
		let payload: CliTokenPayload = serde_path_to_error::deserialize(de)
			.map_err(|source| CredentialError::MalformedResponse { source, status: None })?;
		let expires_at = payload.expiry()?;

		Ok(BearerToken::new(
			payload.access_token,
			scope.clone(),
			OffsetDateTime::now_utc(),
			expires_at,
		))
	}
}
impl Default for DeveloperCliCredential {
	fn default() -> Self {
		Self::new()
	}
}
impl TokenCredential for DeveloperCliCredential {
	fn kind(&self) -> AcquireKind {
		AcquireKind::DeveloperCli
	}

	fn acquire<'a>(&'a self, scope: &'a OAuthScope) -> CredentialFuture<'a> {
		credential::observe(self.kind(), self.invoke(scope))
	}
}

#[derive(Deserialize)]
struct CliTokenPayload {
	#[serde(rename = "accessToken")]
	access_token: String,
	#[serde(default, rename = "expires_on")]
	expires_on_epoch: Option<i64>,
	#[serde(default, rename = "expiresOn")]
	expires_on_text: Option<String>,
}
impl CliTokenPayload {
	// The CLI prints `expiresOn` as local wall time without an offset, so the epoch
	// field is preferred whenever the installed version emits it.
	fn expiry(&self) -> Result<OffsetDateTime, CredentialError> {
		if let Some(epoch) = self.expires_on_epoch {
			return OffsetDateTime::from_unix_timestamp(epoch).map_err(|e| {
				CredentialError::DeveloperCli { reason: format!("expires_on out of range: {e}") }
			});
		}
		if let Some(text) = &self.expires_on_text {
			return parse_wall_time(text).ok_or_else(|| CredentialError::DeveloperCli {
				reason: format!("expiresOn could not be parsed: {text}"),
			});
		}

		Err(CredentialError::DeveloperCli { reason: "output carried no expiry field".into() })
	}
}

fn parse_wall_time(text: &str) -> Option<OffsetDateTime> {
	// crates.io
	use time::{PrimitiveDateTime, macros::format_description};

	let with_subsecond =
		format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]");
	let without_subsecond = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

	PrimitiveDateTime::parse(text, with_subsecond)
		.or_else(|_| PrimitiveDateTime::parse(text, without_subsecond))
		.ok()
		.map(PrimitiveDateTime::assume_utc)
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn scope() -> OAuthScope {
		OAuthScope::new("client/.default").expect("Scope fixture should be valid.")
	}

	#[test]
	fn wall_time_parses_with_and_without_subseconds() {
		assert_eq!(
			parse_wall_time("2025-06-15 10:30:45.123456"),
			Some(macros::datetime!(2025-06-15 10:30:45.123456 UTC)),
		);
		assert_eq!(
			parse_wall_time("2025-06-15 10:30:45"),
			Some(macros::datetime!(2025-06-15 10:30:45 UTC)),
		);
		assert_eq!(parse_wall_time("not a timestamp"), None);
	}

	#[test]
	fn epoch_expiry_wins_over_wall_time() {
		let payload = CliTokenPayload {
			access_token: "cli-token".into(),
			expires_on_epoch: Some(1_750_000_000),
			expires_on_text: Some("2025-06-15 10:30:45".into()),
		};
		let expiry = payload.expiry().expect("Expiry should resolve from the epoch field.");

		assert_eq!(expiry.unix_timestamp(), 1_750_000_000);
	}

	#[tokio::test]
	async fn failing_invocation_surfaces_typed_error() {
		let credential = DeveloperCliCredential::with_program("false");
		let err = credential
			.invoke(&scope())
			.await
			.expect_err("A failing CLI invocation should not produce a token.");

		assert!(matches!(err, CredentialError::DeveloperCli { .. }));
	}

	#[tokio::test]
	async fn missing_binary_surfaces_typed_error() {
		let credential =
			DeveloperCliCredential::with_program("kafka-oauthbearer-no-such-binary");
		let err = credential
			.invoke(&scope())
			.await
			.expect_err("A missing CLI binary should not produce a token.");

		assert!(matches!(err, CredentialError::DeveloperCli { .. }));
	}
}
