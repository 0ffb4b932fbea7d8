//! Crate-level error types shared across credentials, the refresher, and sessions.

// std
use std::path::PathBuf;
// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem; fatal at startup.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Credential acquisition failure; recoverable, reported per refresh attempt.
	#[error(transparent)]
	Credential(#[from] CredentialError),
	/// Transport-level failure surfaced by the Kafka client.
	#[error(transparent)]
	Kafka(#[from] rdkafka::error::KafkaError),
}

/// Configuration and validation failures raised at startup.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// A required setting is absent from both the settings file and the environment.
	#[error("Required setting `{key}` is missing.")]
	MissingSetting {
		/// Settings key, in the file's naming.
		key: &'static str,
	},
	/// A setting is present but cannot be interpreted.
	#[error("Setting `{key}` is invalid: {reason}.")]
	InvalidSetting {
		/// Settings key, in the file's naming.
		key: &'static str,
		/// Human-readable cause.
		reason: String,
	},
	/// Settings file could not be read.
	#[error("Settings file `{path}` could not be read.")]
	Read {
		/// Path of the settings file.
		path: PathBuf,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// Settings file contains malformed JSON.
	#[error("Settings file contains malformed JSON.")]
	Parse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// OAuth scope derived from the settings is invalid.
	#[error("OAuth scope is invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
}

/// Credential acquisition failures.
///
/// Every variant carries enough context to become the failure string handed to the
/// transport's failure channel; none of them is allowed to cross the refresh
/// callback boundary as a panic.
#[derive(Debug, ThisError)]
pub enum CredentialError {
	/// Token endpoint rejected the request.
	#[error("Token endpoint returned {status}: {description}.")]
	TokenEndpoint {
		/// HTTP status code returned by the endpoint.
		status: u16,
		/// OAuth `error` code, when the body carried one.
		code: Option<String>,
		/// OAuth `error_description` or a body preview.
		description: String,
	},
	/// Token endpoint responded with JSON that could not be parsed.
	#[error("Token endpoint returned a malformed response.")]
	MalformedResponse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Network failure while calling the identity provider.
	#[error("Network error occurred while calling the identity provider.")]
	Network {
		/// Transport-specific failure.
		#[source]
		source: BoxError,
	},
	/// Acquisition did not complete within the allotted time.
	#[error("Credential acquisition timed out after {waited}.")]
	Timeout {
		/// How long the caller waited.
		waited: Duration,
	},
	/// Federated token file could not be read.
	#[error("Federated token file `{path}` could not be read.")]
	AssertionFile {
		/// Path announced by `AZURE_FEDERATED_TOKEN_FILE`.
		path: PathBuf,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// Developer CLI invocation failed or produced unusable output.
	#[error("Developer CLI token request failed: {reason}.")]
	DeveloperCli {
		/// Human-readable cause.
		reason: String,
	},
	/// A strategy cannot run in the current environment.
	#[error("{strategy} credential is not available: {reason}.")]
	Unavailable {
		/// Strategy label.
		strategy: &'static str,
		/// What environment signal was missing.
		reason: &'static str,
	},
	/// Every strategy in the default chain failed.
	#[error("No credential in the default chain produced a token. {summary}")]
	Exhausted {
		/// Per-strategy failure summary.
		summary: String,
	},
	/// Refresh worker thread terminated abnormally.
	#[error("Token refresh worker failed: {reason}.")]
	Worker {
		/// Human-readable cause.
		reason: String,
	},
}
impl CredentialError {
	/// Builds [`CredentialError::Exhausted`] from per-strategy failures, preserving
	/// the order in which the chain probed them.
	pub fn exhausted(failures: &[(&'static str, CredentialError)]) -> Self {
		let summary = failures
			.iter()
			.map(|(strategy, err)| format!("{strategy}: {err}"))
			.collect::<Vec<_>>()
			.join(" ");

		Self::Exhausted { summary }
	}

	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<reqwest::Error> for CredentialError {
	fn from(e: reqwest::Error) -> Self {
		Self::network(e)
	}
}
