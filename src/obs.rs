//! Observability helpers for credential acquisition and refresh coordination.
//!
//! Spans are named `kafka_oauthbearer.acquire` and carry the `strategy` (credential
//! kind) and `stage` (call site) fields; every attempt also emits an outcome event
//! so operators can trace refresh churn without reading payloads.

// self
use crate::_prelude::*;

/// Credential strategies observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AcquireKind {
	/// Explicit client-secret credential.
	ClientSecret,
	/// Federated workload identity credential.
	WorkloadIdentity,
	/// Host-assigned managed identity credential.
	ManagedIdentity,
	/// Locally cached developer CLI session.
	DeveloperCli,
	/// Platform-default chain.
	Chain,
	/// Cached-token refresh coordination.
	Refresh,
}
impl AcquireKind {
	/// Returns a stable label suitable for span or event fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			AcquireKind::ClientSecret => "client_secret",
			AcquireKind::WorkloadIdentity => "workload_identity",
			AcquireKind::ManagedIdentity => "managed_identity",
			AcquireKind::DeveloperCli => "developer_cli",
			AcquireKind::Chain => "chain",
			AcquireKind::Refresh => "refresh",
		}
	}
}
impl Display for AcquireKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AcquireOutcome {
	/// Entry to an acquisition helper.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl AcquireOutcome {
	/// Returns a stable label suitable for span or event fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			AcquireOutcome::Attempt => "attempt",
			AcquireOutcome::Success => "success",
			AcquireOutcome::Failure => "failure",
		}
	}
}
impl Display for AcquireOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// A span builder used by acquisition paths.
#[derive(Clone, Debug)]
pub struct AcquireSpan {
	span: tracing::Span,
}
impl AcquireSpan {
	/// Creates a new span tagged with the provided strategy + stage.
	pub fn new(kind: AcquireKind, stage: &'static str) -> Self {
		Self { span: tracing::info_span!("kafka_oauthbearer.acquire", strategy = kind.as_str(), stage) }
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> tracing::instrument::Instrumented<Fut>
	where
		Fut: Future,
	{
		use tracing::Instrument;

		fut.instrument(self.span.clone())
	}
}

/// Emits the outcome event for an acquisition attempt.
pub fn record_outcome(kind: AcquireKind, outcome: AcquireOutcome) {
	tracing::debug!(strategy = kind.as_str(), outcome = outcome.as_str(), "credential acquisition");
}

/// Installs the process-wide subscriber stack used by the binaries.
///
/// Filtering honors `RUST_LOG`, defaulting to `info`. Safe to call once per
/// process; later calls are ignored because a global subscriber is already set.
pub fn init_tracing() {
	// crates.io
	use tracing_subscriber::{EnvFilter, fmt};

	let _ = fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.with_target(false)
		.try_init();
}
