//! Consumer and producer session loops.
//!
//! Sessions own a transport client built with a [`BearerTokenContext`] and run until
//! their cancellation token fires. Per-message failures are logged and the loop
//! continues; only startup problems (settings, client construction, subscription)
//! abort a session.

// std
use std::{env, time::Duration as StdDuration};
// crates.io
use rdkafka::{
	Message,
	consumer::{Consumer, StreamConsumer},
	producer::{FutureProducer, FutureRecord, Producer},
};
use time::format_description::well_known::Rfc3339;
use tokio_util::sync::CancellationToken;
// self
use crate::{_prelude::*, bridge::BearerTokenContext, config::SessionConfig};

/// Lifecycle states a session moves through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
	/// Constructed, transport client not yet active.
	Idle,
	/// Transport client created, not yet exchanging records.
	Ready,
	/// Consuming records.
	Receiving,
	/// Producing records.
	Sending,
	/// Cancellation observed, draining.
	Closing,
	/// Fully shut down.
	Closed,
}

fn transition(state: &mut SessionState, next: SessionState) {
	tracing::info!(from = ?state, to = ?next, "session state changed");

	*state = next;
}

/// Streaming consumer bound to a single topic.
pub struct ConsumerSession {
	consumer: StreamConsumer<BearerTokenContext>,
	topic: String,
	state: SessionState,
}
impl ConsumerSession {
	/// Builds the consumer client from the session settings.
	pub fn new(config: &SessionConfig, context: BearerTokenContext) -> Result<Self> {
		let consumer = config.consumer_config()?.create_with_context(context)?;

		Ok(Self { consumer, topic: config.topic.clone(), state: SessionState::Idle })
	}

	/// Consumes until `cancel` fires, logging each record.
	///
	/// Receive errors are transient from the session's point of view (rebalances,
	/// broker restarts, token refresh failures surfacing through the transport) and
	/// never end the loop. Cancellation is a clean shutdown and yields `Ok`.
	pub async fn run(mut self, cancel: CancellationToken) -> Result<()> {
		transition(&mut self.state, SessionState::Ready);
		self.consumer.subscribe(&[self.topic.as_str()])?;
		tracing::info!(topic = %self.topic, "subscribed");
		transition(&mut self.state, SessionState::Receiving);

		loop {
			tokio::select! {
				biased;
				_ = cancel.cancelled() => break,
				received = self.consumer.recv() => match received {
					Ok(message) => {
						let payload = match message.payload_view::<str>() {
							Some(Ok(text)) => text,
							Some(Err(_)) => "<non-utf8>",
							None => "<empty>",
						};

						tracing::info!(
							partition = message.partition(),
							offset = message.offset(),
							payload,
							"record received"
						);
					},
					Err(err) => tracing::warn!(error = %err, "receive failed, continuing"),
				},
			}
		}

		transition(&mut self.state, SessionState::Closing);
		// Dropping the client unsubscribes and leaves the group.
		transition(&mut self.state, SessionState::Closed);

		Ok(())
	}
}
impl Debug for ConsumerSession {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ConsumerSession")
			.field("topic", &self.topic)
			.field("state", &self.state)
			.finish()
	}
}

/// Periodic producer that sends one timestamped record per tick.
pub struct ProducerSession {
	producer: FutureProducer<BearerTokenContext>,
	topic: String,
	key: String,
	interval: StdDuration,
	flush_timeout: StdDuration,
	state: SessionState,
}
impl ProducerSession {
	/// Gap between produced records.
	pub const SEND_INTERVAL: StdDuration = StdDuration::from_secs(1);
	/// Bound on the final drain of in-flight records at shutdown.
	pub const SHUTDOWN_FLUSH_TIMEOUT: StdDuration = StdDuration::from_secs(10);

	/// Builds the producer client from the session settings.
	pub fn new(config: &SessionConfig, context: BearerTokenContext) -> Result<Self> {
		let producer = config.producer_config()?.create_with_context(context)?;

		Ok(Self {
			producer,
			topic: config.topic.clone(),
			key: record_key(),
			interval: Self::SEND_INTERVAL,
			flush_timeout: Self::SHUTDOWN_FLUSH_TIMEOUT,
			state: SessionState::Idle,
		})
	}

	/// Overrides the send interval.
	pub fn with_interval(mut self, interval: StdDuration) -> Self {
		self.interval = interval;

		self
	}

	/// Overrides the shutdown flush bound.
	pub fn with_flush_timeout(mut self, timeout: StdDuration) -> Self {
		self.flush_timeout = timeout;

		self
	}

	/// Produces until `cancel` fires, then drains in-flight records.
	///
	/// Send errors are logged and the loop continues. The shutdown flush is
	/// best-effort and bounded; records still queued when the bound elapses are
	/// dropped with a warning.
	pub async fn run(mut self, cancel: CancellationToken) -> Result<()> {
		transition(&mut self.state, SessionState::Ready);
		transition(&mut self.state, SessionState::Sending);

		let mut ticker = tokio::time::interval(self.interval);

		ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

		loop {
			tokio::select! {
				biased;
				_ = cancel.cancelled() => break,
				_ = ticker.tick() => {
					// An in-flight delivery wait must not delay shutdown past the
					// flush bound, so the send itself races the token too.
					tokio::select! {
						biased;
						_ = cancel.cancelled() => break,
						_ = self.send_one() => {},
					}
				},
			}
		}

		transition(&mut self.state, SessionState::Closing);

		if let Err(err) = self.producer.flush(self.flush_timeout) {
			tracing::warn!(error = %err, "shutdown flush incomplete, dropping queued records");
		}

		transition(&mut self.state, SessionState::Closed);

		Ok(())
	}

	async fn send_one(&self) {
		let now = OffsetDateTime::now_utc();
		let payload = now.format(&Rfc3339).unwrap_or_else(|_| now.to_string());
		let record = FutureRecord::to(&self.topic).key(&self.key).payload(&payload);

		match self.producer.send(record, StdDuration::from_secs(10)).await {
			Ok(delivery) => tracing::info!(?delivery, "record delivered"),
			Err((err, _)) => tracing::warn!(error = %err, "send failed, continuing"),
		}
	}
}
impl Debug for ProducerSession {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ProducerSession")
			.field("topic", &self.topic)
			.field("key", &self.key)
			.field("interval", &self.interval)
			.field("flush_timeout", &self.flush_timeout)
			.field("state", &self.state)
			.finish()
	}
}

// Record key identifying the producing host, so partition assignment stays stable
// per instance.
fn record_key() -> String {
	env::var("HOSTNAME")
		.ok()
		.map(|v| v.trim().to_owned())
		.filter(|v| !v.is_empty())
		.unwrap_or_else(|| env!("CARGO_PKG_NAME").into())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn record_key_is_never_empty() {
		assert!(!record_key().is_empty());
	}

	#[test]
	fn transition_replaces_the_state() {
		let mut state = SessionState::Idle;

		transition(&mut state, SessionState::Ready);
		transition(&mut state, SessionState::Sending);

		assert_eq!(state, SessionState::Sending);
	}
}
