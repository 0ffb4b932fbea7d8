//! Periodic producer entrypoint.

// std
use std::{env, path::PathBuf, process, sync::Arc};
// crates.io
use kafka_oauthbearer::{
	bridge::BearerTokenContext,
	config::{CredentialSettings, SessionConfig},
	credential,
	error::Result,
	http::IdentityHttpClient,
	obs,
	refresher::TokenRefresher,
	session::ProducerSession,
};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
	obs::init_tracing();

	if let Err(err) = run().await {
		tracing::error!(error = %err, "producer terminated");
		process::exit(1);
	}
}

async fn run() -> Result<()> {
	let settings_path = env::args().nth(1).map(PathBuf::from);
	let config = SessionConfig::load(settings_path.as_deref())?;
	let credentials = CredentialSettings::from_env();
	let http = IdentityHttpClient::new()?;
	let credential = credential::select_credential(&credentials, &http)?;
	let scope = config.oauth_scope(&credentials)?;
	let principal = config.principal(&credentials);
	let refresher = Arc::new(TokenRefresher::new(credential, scope));
	let context = BearerTokenContext::new(refresher, principal, Handle::current());
	let cancel = CancellationToken::new();

	tokio::spawn({
		let cancel = cancel.clone();

		async move {
			if tokio::signal::ctrl_c().await.is_ok() {
				tracing::info!("shutdown signal received");
				cancel.cancel();
			}
		}
	});

	ProducerSession::new(&config, context)?.run(cancel).await
}
