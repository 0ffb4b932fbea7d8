//! OAuth scope modeling for token requests.

// self
use crate::_prelude::*;

const DEFAULT_SUFFIX: &str = "/.default";

/// Errors emitted when validating a scope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ScopeValidationError {
	/// Empty scopes are not allowed.
	#[error("Scope cannot be empty.")]
	Empty,
	/// Scopes cannot contain embedded whitespace characters.
	#[error("Scope contains whitespace: {scope}.")]
	ContainsWhitespace {
		/// The offending scope string.
		scope: String,
	},
}

/// Validated audience/permission string a token is requested for.
///
/// Entra scopes for service principals are usually the application identifier plus
/// the `/.default` suffix; [`OAuthScope::default_for_client`] derives that form when
/// no explicit scope override is configured.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OAuthScope(String);
impl OAuthScope {
	/// Creates a scope after validation.
	pub fn new(value: impl Into<String>) -> Result<Self, ScopeValidationError> {
		let value = value.into();

		if value.is_empty() {
			return Err(ScopeValidationError::Empty);
		}
		if value.chars().any(char::is_whitespace) {
			return Err(ScopeValidationError::ContainsWhitespace { scope: value });
		}

		Ok(Self(value))
	}

	/// Derives the `{client_id}/.default` scope used when no override is configured.
	pub fn default_for_client(client_id: &str) -> Result<Self, ScopeValidationError> {
		Self::new(format!("{client_id}{DEFAULT_SUFFIX}"))
	}

	/// Returns the scope as sent to the token endpoint.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Returns the bare resource form the IMDS endpoint expects.
	///
	/// IMDS predates v2.0 scopes and takes a `resource` query parameter without the
	/// `/.default` suffix.
	pub fn resource(&self) -> &str {
		self.0.strip_suffix(DEFAULT_SUFFIX).unwrap_or(&self.0)
	}
}
impl AsRef<str> for OAuthScope {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl From<OAuthScope> for String {
	fn from(value: OAuthScope) -> Self {
		value.0
	}
}
impl TryFrom<String> for OAuthScope {
	type Error = ScopeValidationError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}
impl FromStr for OAuthScope {
	type Err = ScopeValidationError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}
impl Debug for OAuthScope {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Scope({})", self.0)
	}
}
impl Display for OAuthScope {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
