//! Process configuration.
//!
//! Two independent sources feed the crate: identity-provider settings come from the
//! well-known `AZURE_*` environment variables, while session settings come from a
//! JSON settings file (its `kafka` section) with `KAFKA_*` environment overrides on
//! top. Both are resolved once at startup and stay immutable afterwards.

// std
use std::{
	env, fs,
	path::{Path, PathBuf},
};
// crates.io
use rdkafka::ClientConfig;
// self
use crate::{_prelude::*, auth::OAuthScope, error::ConfigError};

const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
const DEFAULT_SETTINGS_PATH: &str = "kafka.json";
const DEFAULT_TOPIC: &str = "my-topic";

/// Identity-provider settings sourced from the process environment.
///
/// Empty or whitespace-only values are treated as absent, matching how platform
/// injectors unset variables.
#[derive(Clone)]
pub struct CredentialSettings {
	/// `AZURE_TENANT_ID`.
	pub tenant_id: Option<String>,
	/// `AZURE_CLIENT_ID`.
	pub client_id: Option<String>,
	/// `AZURE_CLIENT_SECRET`.
	pub client_secret: Option<String>,
	/// `AZURE_FEDERATED_TOKEN_FILE`, projected by workload-identity webhooks.
	pub federated_token_file: Option<PathBuf>,
	/// `AZURE_AUTHORITY_HOST`, defaulting to the public cloud authority.
	pub authority_host: String,
}
impl CredentialSettings {
	/// Reads the settings from the process environment.
	pub fn from_env() -> Self {
		Self {
			tenant_id: non_empty_env("AZURE_TENANT_ID"),
			client_id: non_empty_env("AZURE_CLIENT_ID"),
			client_secret: non_empty_env("AZURE_CLIENT_SECRET"),
			federated_token_file: non_empty_env("AZURE_FEDERATED_TOKEN_FILE").map(PathBuf::from),
			authority_host: non_empty_env("AZURE_AUTHORITY_HOST")
				.unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.into()),
		}
	}

	/// Returns the tenant/client/secret triple when all three are present and
	/// non-empty; anything less selects the platform-default chain instead.
	pub fn explicit_secret(&self) -> Option<(&str, &str, &str)> {
		match (&self.tenant_id, &self.client_id, &self.client_secret) {
			(Some(tenant), Some(client), Some(secret))
				if !tenant.is_empty() && !client.is_empty() && !secret.is_empty() =>
				Some((tenant, client, secret)),
			_ => None,
		}
	}
}
impl Debug for CredentialSettings {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialSettings")
			.field("tenant_id", &self.tenant_id)
			.field("client_id", &self.client_id)
			.field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
			.field("federated_token_file", &self.federated_token_file)
			.field("authority_host", &self.authority_host)
			.finish()
	}
}

/// Offset reset policy applied when a group has no committed offset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoOffsetReset {
	/// Start from the oldest retained record.
	#[default]
	Earliest,
	/// Start from newly arriving records only.
	Latest,
}
impl AutoOffsetReset {
	/// Value in the transport's configuration vocabulary.
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Earliest => "earliest",
			Self::Latest => "latest",
		}
	}
}

/// Wire security protocol.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityProtocol {
	/// Unencrypted, unauthenticated.
	Plaintext,
	/// TLS without SASL.
	Ssl,
	/// SASL over an unencrypted connection.
	SaslPlaintext,
	/// SASL over TLS.
	#[default]
	SaslSsl,
}
impl SecurityProtocol {
	/// Value in the transport's configuration vocabulary.
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Plaintext => "plaintext",
			Self::Ssl => "ssl",
			Self::SaslPlaintext => "sasl_plaintext",
			Self::SaslSsl => "sasl_ssl",
		}
	}

	/// Whether the protocol carries a SASL handshake.
	pub fn is_sasl(&self) -> bool {
		matches!(self, Self::SaslPlaintext | Self::SaslSsl)
	}
}

/// SASL mechanism used when the protocol carries a handshake.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum SaslMechanism {
	/// Bearer tokens minted by an identity provider.
	#[default]
	#[serde(rename = "oauthbearer")]
	OAuthBearer,
	/// Static username/password pairs.
	#[serde(rename = "plain")]
	Plain,
}
impl SaslMechanism {
	/// Value in the transport's configuration vocabulary.
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::OAuthBearer => "OAUTHBEARER",
			Self::Plain => "PLAIN",
		}
	}
}

/// Hostname verification mode for TLS endpoints.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointIdentification {
	/// Skip hostname verification; common behind TLS-terminating gateways whose
	/// certificate names do not match the advertised brokers.
	#[default]
	None,
	/// Verify the broker hostname against its certificate.
	Https,
}
impl EndpointIdentification {
	/// Value in the transport's configuration vocabulary.
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::None => "none",
			Self::Https => "https",
		}
	}
}

/// Authentication-related session settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SecuritySettings {
	/// Wire protocol.
	pub protocol: SecurityProtocol,
	/// SASL mechanism, applied only when the protocol carries SASL.
	pub mechanism: SaslMechanism,
	/// Application identifier used to derive the default scope and principal.
	pub client_id: Option<String>,
	/// Explicit scope override; when absent, `{clientId}/.default` is derived.
	pub scope: Option<String>,
}

/// TLS-related session settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SslSettings {
	/// Hostname verification mode.
	pub endpoint_identification: EndpointIdentification,
	/// Trust store path override.
	pub ca_location: Option<PathBuf>,
	/// Disables certificate verification entirely; development only.
	pub insecure: bool,
}

/// Messaging session settings, the `kafka` section of the settings file.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfig {
	/// Broker addresses; the only setting without a usable default.
	pub bootstrap_servers: Option<String>,
	/// Topic consumed from or produced to.
	pub topic: String,
	/// Consumer group; required for consuming, ignored when producing.
	pub group_id: Option<String>,
	/// Offset reset policy.
	pub auto_offset_reset: AutoOffsetReset,
	/// Whether the consumer commits offsets automatically.
	pub enable_auto_commit: bool,
	/// Authentication settings.
	pub security: SecuritySettings,
	/// TLS settings.
	pub ssl: SslSettings,
}
impl SessionConfig {
	/// Loads the settings file then applies `KAFKA_*` environment overrides.
	///
	/// `path` falls back to `kafka.json` in the working directory; a missing file
	/// yields the defaults, mirroring optional settings files in app hosts.
	pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
		let mut config =
			Self::from_file(path.unwrap_or_else(|| Path::new(DEFAULT_SETTINGS_PATH)))?;

		if let Some(v) = non_empty_env("KAFKA_BOOTSTRAP_SERVERS") {
			config.bootstrap_servers = Some(v);
		}
		if let Some(v) = non_empty_env("KAFKA_TOPIC") {
			config.topic = v;
		}
		if let Some(v) = non_empty_env("KAFKA_GROUP_ID") {
			config.group_id = Some(v);
		}

		Ok(config)
	}

	/// Parses the `kafka` section of a settings file; a missing file yields defaults.
	pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
		if !path.exists() {
			return Ok(Self::default());
		}

		let raw = fs::read_to_string(path)
			.map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
		let de = &mut serde_json::Deserializer::from_str(&raw);
		let file: SettingsFile = serde_path_to_error::deserialize(de)
			.map_err(|source| ConfigError::Parse { source })?;

		Ok(file.kafka)
	}

	/// Resolves the scope tokens are requested for.
	///
	/// An explicit `security.scope` wins; otherwise `{clientId}/.default` is derived
	/// from `security.clientId`, falling back to the environment's client id.
	pub fn oauth_scope(&self, credentials: &CredentialSettings) -> Result<OAuthScope, ConfigError> {
		if let Some(scope) = &self.security.scope {
			return Ok(OAuthScope::new(scope)?);
		}

		let client_id = self
			.security
			.client_id
			.as_deref()
			.or(credentials.client_id.as_deref())
			.ok_or(ConfigError::MissingSetting { key: "security.clientId" })?;

		Ok(OAuthScope::default_for_client(client_id)?)
	}

	/// Principal name announced to the transport alongside each token.
	pub fn principal(&self, credentials: &CredentialSettings) -> String {
		self.security
			.client_id
			.clone()
			.or_else(|| credentials.client_id.clone())
			.unwrap_or_else(|| env!("CARGO_PKG_NAME").into())
	}

	/// Builds the transport configuration for a consumer.
	pub fn consumer_config(&self) -> Result<ClientConfig, ConfigError> {
		let group_id =
			self.group_id.as_deref().ok_or(ConfigError::MissingSetting { key: "groupId" })?;
		let mut config = self.base_config()?;

		config
			.set("group.id", group_id)
			.set("auto.offset.reset", self.auto_offset_reset.as_str())
			.set("enable.auto.commit", if self.enable_auto_commit { "true" } else { "false" });

		Ok(config)
	}

	/// Builds the transport configuration for a producer.
	pub fn producer_config(&self) -> Result<ClientConfig, ConfigError> {
		self.base_config()
	}

	fn base_config(&self) -> Result<ClientConfig, ConfigError> {
		let bootstrap = self
			.bootstrap_servers
			.as_deref()
			.ok_or(ConfigError::MissingSetting { key: "bootstrapServers" })?;
		let mut config = ClientConfig::new();

		config
			.set("bootstrap.servers", bootstrap)
			.set("security.protocol", self.security.protocol.as_str())
			.set("ssl.endpoint.identification.algorithm", self.ssl.endpoint_identification.as_str());

		if self.security.protocol.is_sasl() {
			config.set("sasl.mechanism", self.security.mechanism.as_str());
		}
		if let Some(ca) = &self.ssl.ca_location {
			config.set("ssl.ca.location", ca.to_string_lossy());
		}
		if self.ssl.insecure {
			config.set("enable.ssl.certificate.verification", "false");
		}

		Ok(config)
	}
}
impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			bootstrap_servers: None,
			topic: DEFAULT_TOPIC.into(),
			group_id: None,
			auto_offset_reset: AutoOffsetReset::default(),
			enable_auto_commit: true,
			security: SecuritySettings::default(),
			ssl: SslSettings::default(),
		}
	}
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct SettingsFile {
	kafka: SessionConfig,
}

fn non_empty_env(key: &str) -> Option<String> {
	env::var(key).ok().map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
	// std
	use std::io::Write;
	// self
	use super::*;

	fn write_settings(json: &str) -> tempfile::NamedTempFile {
		let mut file = tempfile::NamedTempFile::new().expect("Temp file should be creatable.");

		file.write_all(json.as_bytes()).expect("Settings fixture should be writable.");

		file
	}

	fn credentials(client_id: Option<&str>) -> CredentialSettings {
		CredentialSettings {
			tenant_id: None,
			client_id: client_id.map(Into::into),
			client_secret: None,
			federated_token_file: None,
			authority_host: DEFAULT_AUTHORITY_HOST.into(),
		}
	}

	#[test]
	fn defaults_favor_secured_oauthbearer_sessions() {
		let config = SessionConfig::default();

		assert_eq!(config.topic, "my-topic");
		assert_eq!(config.auto_offset_reset, AutoOffsetReset::Earliest);
		assert!(config.enable_auto_commit);
		assert_eq!(config.security.protocol, SecurityProtocol::SaslSsl);
		assert_eq!(config.security.mechanism, SaslMechanism::OAuthBearer);
		assert_eq!(config.ssl.endpoint_identification, EndpointIdentification::None);
		assert!(!config.ssl.insecure);
	}

	#[test]
	fn settings_file_section_parses_camel_case_keys() {
		let file = write_settings(
			r#"{
				"kafka": {
					"bootstrapServers": "broker:9093",
					"topic": "orders",
					"groupId": "orders-reader",
					"autoOffsetReset": "latest",
					"enableAutoCommit": false,
					"security": { "protocol": "sasl_ssl", "clientId": "client-1" },
					"ssl": { "endpointIdentification": "https" }
				}
			}"#,
		);
		let config =
			SessionConfig::from_file(file.path()).expect("Settings fixture should parse.");

		assert_eq!(config.bootstrap_servers.as_deref(), Some("broker:9093"));
		assert_eq!(config.topic, "orders");
		assert_eq!(config.group_id.as_deref(), Some("orders-reader"));
		assert_eq!(config.auto_offset_reset, AutoOffsetReset::Latest);
		assert!(!config.enable_auto_commit);
		assert_eq!(config.security.client_id.as_deref(), Some("client-1"));
		assert_eq!(config.ssl.endpoint_identification, EndpointIdentification::Https);
	}

	#[test]
	fn missing_settings_file_yields_defaults() {
		let config = SessionConfig::from_file(Path::new("does-not-exist.json"))
			.expect("A missing settings file should not be fatal.");

		assert_eq!(config, SessionConfig::default());
	}

	#[test]
	fn malformed_settings_file_is_rejected() {
		let file = write_settings(r#"{ "kafka": { "autoOffsetReset": "sometimes" } }"#);
		let err = SessionConfig::from_file(file.path())
			.expect_err("An unknown enum value should be rejected.");

		assert!(matches!(err, ConfigError::Parse { .. }));
	}

	#[test]
	fn consumer_config_requires_bootstrap_and_group() {
		let mut config = SessionConfig::default();

		assert!(matches!(
			config.consumer_config(),
			Err(ConfigError::MissingSetting { key: "groupId" })
		));

		config.group_id = Some("orders-reader".into());

		assert!(matches!(
			config.consumer_config(),
			Err(ConfigError::MissingSetting { key: "bootstrapServers" })
		));

		config.bootstrap_servers = Some("broker:9093".into());

		let client = config.consumer_config().expect("Complete settings should build.");

		assert_eq!(client.get("group.id"), Some("orders-reader"));
		assert_eq!(client.get("auto.offset.reset"), Some("earliest"));
		assert_eq!(client.get("enable.auto.commit"), Some("true"));
	}

	#[test]
	fn transport_config_reflects_security_settings() {
		let config = SessionConfig {
			bootstrap_servers: Some("broker:9093".into()),
			..Default::default()
		};
		let client = config.producer_config().expect("Producer settings should build.");

		assert_eq!(client.get("bootstrap.servers"), Some("broker:9093"));
		assert_eq!(client.get("security.protocol"), Some("sasl_ssl"));
		assert_eq!(client.get("sasl.mechanism"), Some("OAUTHBEARER"));
		assert_eq!(client.get("ssl.endpoint.identification.algorithm"), Some("none"));
		assert_eq!(client.get("enable.ssl.certificate.verification"), None);
	}

	#[test]
	fn plaintext_protocol_omits_sasl_mechanism() {
		let config = SessionConfig {
			bootstrap_servers: Some("broker:9092".into()),
			security: SecuritySettings {
				protocol: SecurityProtocol::Plaintext,
				..Default::default()
			},
			..Default::default()
		};
		let client = config.producer_config().expect("Plaintext settings should build.");

		assert_eq!(client.get("security.protocol"), Some("plaintext"));
		assert_eq!(client.get("sasl.mechanism"), None);
	}

	#[test]
	fn scope_prefers_explicit_override() {
		let config = SessionConfig {
			security: SecuritySettings {
				scope: Some("https://example.servicebus.windows.net/.default".into()),
				client_id: Some("client-1".into()),
				..Default::default()
			},
			..Default::default()
		};
		let scope =
			config.oauth_scope(&credentials(None)).expect("Explicit scope should resolve.");

		assert_eq!(scope.as_str(), "https://example.servicebus.windows.net/.default");
	}

	#[test]
	fn scope_derives_from_client_id() {
		let mut config = SessionConfig::default();

		let scope = config
			.oauth_scope(&credentials(Some("env-client")))
			.expect("Environment client id should resolve.");

		assert_eq!(scope.as_str(), "env-client/.default");

		config.security.client_id = Some("file-client".into());

		let scope = config
			.oauth_scope(&credentials(Some("env-client")))
			.expect("Settings client id should win.");

		assert_eq!(scope.as_str(), "file-client/.default");
	}

	#[test]
	fn scope_requires_some_client_id() {
		let err = SessionConfig::default()
			.oauth_scope(&credentials(None))
			.expect_err("No client id should fail scope derivation.");

		assert!(matches!(err, ConfigError::MissingSetting { key: "security.clientId" }));
	}

	#[test]
	fn explicit_secret_requires_all_three_values() {
		let mut settings = credentials(Some("client-1"));

		assert!(settings.explicit_secret().is_none());

		settings.tenant_id = Some("tenant-1".into());
		settings.client_secret = Some("shh".into());

		assert_eq!(settings.explicit_secret(), Some(("tenant-1", "client-1", "shh")));

		settings.client_secret = Some(String::new());

		assert!(settings.explicit_secret().is_none());
	}

	#[test]
	fn debug_output_redacts_the_secret() {
		let mut settings = credentials(Some("client-1"));

		settings.client_secret = Some("shh".into());

		let rendered = format!("{settings:?}");

		assert!(!rendered.contains("shh"));
		assert!(rendered.contains("<redacted>"));
	}
}
