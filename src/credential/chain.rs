//! Platform-default credential resolution chain.

// self
use crate::{
	_prelude::*,
	auth::OAuthScope,
	config::CredentialSettings,
	credential::{
		self, CredentialFuture, DeveloperCliCredential, ManagedIdentityCredential,
		TokenCredential, WorkloadIdentityCredential,
	},
	error::{ConfigError, CredentialError},
	http::IdentityHttpClient,
	obs::AcquireKind,
};

/// Ordered chain that probes sub-strategies and returns the first token minted.
///
/// Priority is fixed: environment-supplied workload identity, then host-assigned
/// managed identity, then locally cached developer CLI sessions. Entries whose
/// environment signals are absent are skipped at construction time; failures of the
/// remaining entries are collected into one [`CredentialError::Exhausted`].
pub struct ChainedCredential {
	entries: Vec<Arc<dyn TokenCredential>>,
}
impl ChainedCredential {
	/// Builds the chain from environment-derived settings.
	pub fn from_settings(
		settings: &CredentialSettings,
		http: &IdentityHttpClient,
	) -> Result<Self, ConfigError> {
		let mut entries: Vec<Arc<dyn TokenCredential>> = Vec::with_capacity(3);

		if let (Some(token_file), Some(tenant), Some(client)) =
			(&settings.federated_token_file, &settings.tenant_id, &settings.client_id)
		{
			entries.push(Arc::new(WorkloadIdentityCredential::new(
				http.clone(),
				&settings.authority_host,
				tenant,
				client,
				token_file,
			)?));
		}

		entries.push(Arc::new(ManagedIdentityCredential::new(
			http.clone(),
			settings.client_id.clone(),
		)?));
		entries.push(Arc::new(DeveloperCliCredential::new()));

		Ok(Self { entries })
	}

	#[cfg(test)]
	pub(crate) fn from_entries(entries: Vec<Arc<dyn TokenCredential>>) -> Self {
		Self { entries }
	}
}
impl TokenCredential for ChainedCredential {
	fn kind(&self) -> AcquireKind {
		AcquireKind::Chain
	}

	fn acquire<'a>(&'a self, scope: &'a OAuthScope) -> CredentialFuture<'a> {
		credential::observe(self.kind(), async move {
			let mut failures = Vec::with_capacity(self.entries.len());

			for entry in &self.entries {
				match entry.acquire(scope).await {
					Ok(token) => return Ok(token),
					Err(err) => {
						tracing::warn!(
							strategy = entry.kind().as_str(),
							error = %err,
							"chain entry failed, trying next"
						);
						failures.push((entry.kind().as_str(), err));
					},
				}
			}

			Err(CredentialError::exhausted(&failures))
		})
	}
}
impl Debug for ChainedCredential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ChainedCredential")
			.field("entries", &self.entries.iter().map(|e| e.kind()).collect::<Vec<_>>())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;
	use crate::auth::BearerToken;

	struct StubCredential {
		kind: AcquireKind,
		succeed: bool,
		calls: AtomicUsize,
	}
	impl StubCredential {
		fn new(kind: AcquireKind, succeed: bool) -> Arc<Self> {
			Arc::new(Self { kind, succeed, calls: AtomicUsize::new(0) })
		}
	}
	impl TokenCredential for StubCredential {
		fn kind(&self) -> AcquireKind {
			self.kind
		}

		fn acquire<'a>(&'a self, scope: &'a OAuthScope) -> CredentialFuture<'a> {
			self.calls.fetch_add(1, Ordering::SeqCst);

			let succeed = self.succeed;
			let kind = self.kind;

			Box::pin(async move {
				if succeed {
					Ok(BearerToken::from_expires_in(
						format!("token-from-{kind}"),
						scope.clone(),
						OffsetDateTime::now_utc(),
						Duration::hours(1),
					))
				} else {
					Err(CredentialError::Unavailable {
						strategy: kind.as_str(),
						reason: "stubbed out",
					})
				}
			})
		}
	}

	fn scope() -> OAuthScope {
		OAuthScope::new("client/.default").expect("Scope fixture should be valid.")
	}

	#[tokio::test]
	async fn first_success_short_circuits() {
		let first = StubCredential::new(AcquireKind::WorkloadIdentity, true);
		let second = StubCredential::new(AcquireKind::ManagedIdentity, true);
		let chain = ChainedCredential::from_entries(vec![first.clone(), second.clone()]);
		let token = chain.acquire(&scope()).await.expect("Chain should mint a token.");

		assert_eq!(token.secret.expose(), "token-from-workload_identity");
		assert_eq!(first.calls.load(Ordering::SeqCst), 1);
		assert_eq!(second.calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn chain_falls_through_in_priority_order() {
		let first = StubCredential::new(AcquireKind::WorkloadIdentity, false);
		let second = StubCredential::new(AcquireKind::ManagedIdentity, false);
		let third = StubCredential::new(AcquireKind::DeveloperCli, true);
		let chain =
			ChainedCredential::from_entries(vec![first.clone(), second.clone(), third.clone()]);
		let token = chain.acquire(&scope()).await.expect("Last entry should mint a token.");

		assert_eq!(token.secret.expose(), "token-from-developer_cli");
		assert_eq!(first.calls.load(Ordering::SeqCst), 1);
		assert_eq!(second.calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn exhausted_chain_reports_every_failure() {
		let chain = ChainedCredential::from_entries(vec![
			StubCredential::new(AcquireKind::ManagedIdentity, false),
			StubCredential::new(AcquireKind::DeveloperCli, false),
		]);
		let err = chain
			.acquire(&scope())
			.await
			.expect_err("An exhausted chain should not produce a token.");
		let rendered = err.to_string();

		assert!(matches!(err, CredentialError::Exhausted { .. }));
		assert!(rendered.contains("managed_identity"));
		assert!(rendered.contains("developer_cli"));
	}
}
