//! SASL/OAUTHBEARER token sourcing for Kafka clients—credential chains, cached refresh
//! coordination, and rdkafka callback bridging in one crate.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod bridge;
pub mod config;
pub mod credential;
pub mod error;
pub mod http;
pub mod obs;
pub mod refresher;
pub mod session;

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::RwLock;
	pub use reqwest::Client as ReqwestClient;
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use rdkafka;
pub use url;

#[cfg(test)] use {color_eyre as _, httpmock as _, tempfile as _};
