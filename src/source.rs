//! Remote list loading with a fallback-to-sample-data policy

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::notify::Notifier;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned status {status_code}")]
    Status { status_code: u16 },

    #[error("Failed to decode response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("API reported failure: {}", .message.as_deref().unwrap_or("no message"))]
    Unsuccessful { message: Option<String> },

    #[error("API returned no usable data")]
    Empty,
}

/// Query parameters sent with a fetch
pub type Params = Vec<(String, String)>;

/// Read side of the remote API: the `data` of a successful envelope
#[async_trait]
pub trait RecordFetcher: Send + Sync {
    async fn fetch_data(&self, endpoint: &str, params: &[(String, String)]) -> Result<Value, FetchError>;
}

/// Whether a decoded payload is worth showing instead of the fallback
pub trait Usable {
    fn is_usable(&self) -> bool {
        true
    }
}

impl<T> Usable for Vec<T> {
    fn is_usable(&self) -> bool {
        !self.is_empty()
    }
}

/// What a source substitutes when the live fetch gives nothing usable
#[derive(Debug, Clone)]
pub enum OnFailure<P> {
    /// Show built-in sample data; empty live payloads degrade too
    UseFallback(P),
    /// Show an empty payload; an empty live payload is a valid result
    KeepEmpty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Live,
    Fallback,
}

/// Result of a load: always a payload, plus where it came from
#[derive(Debug, Clone)]
pub struct Loaded<P> {
    pub payload: P,
    pub origin: Origin,
    pub error: Option<String>,
}

impl<P> Loaded<P> {
    pub fn is_degraded(&self) -> bool {
        self.origin == Origin::Fallback
    }
}

/// One remote list of a screen together with its failure policy
#[derive(Debug, Clone)]
pub struct DataSource<P> {
    pub endpoint: String,
    pub params: Params,
    pub on_failure: OnFailure<P>,
    pub failure_notice: String,
    pub success_notice: Option<String>,
}

impl<P> DataSource<P>
where
    P: DeserializeOwned + Usable + Default + Clone,
{
    pub fn new(endpoint: &str, on_failure: OnFailure<P>, failure_notice: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            params: Vec::new(),
            on_failure,
            failure_notice: failure_notice.to_string(),
            success_notice: None,
        }
    }

    pub fn with_param(mut self, key: &str, value: &str) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_success_notice(mut self, message: &str) -> Self {
        self.success_notice = Some(message.to_string());
        self
    }

    pub fn fallback(&self) -> P {
        match &self.on_failure {
            OnFailure::UseFallback(payload) => payload.clone(),
            OnFailure::KeepEmpty => P::default(),
        }
    }

    /// Fetch and decode; never fails. Exactly one notice is raised when the
    /// fallback is used.
    pub async fn load(&self, fetcher: &dyn RecordFetcher, notifier: &dyn Notifier) -> Loaded<P> {
        match self.fetch(fetcher).await {
            Ok(payload) => {
                debug!("Loaded live data from {}", self.endpoint);
                if let Some(message) = &self.success_notice {
                    notifier.success(message);
                }
                Loaded {
                    payload,
                    origin: Origin::Live,
                    error: None,
                }
            }
            Err(e) => {
                warn!("Falling back for {}: {}", self.endpoint, e);
                notifier.error(&self.failure_notice);
                Loaded {
                    payload: self.fallback(),
                    origin: Origin::Fallback,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn fetch(&self, fetcher: &dyn RecordFetcher) -> Result<P, FetchError> {
        let data = fetcher.fetch_data(&self.endpoint, &self.params).await?;
        let payload: P = serde_json::from_value(data).map_err(|source| FetchError::Decode {
            endpoint: self.endpoint.clone(),
            source,
        })?;

        match self.on_failure {
            OnFailure::UseFallback(_) if !payload.is_usable() => Err(FetchError::Empty),
            _ => Ok(payload),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Canned responses keyed by endpoint; unknown endpoints fail like a dead network
    #[derive(Default)]
    pub struct StubFetcher {
        responses: HashMap<String, Result<Value, String>>,
        pub calls: Mutex<Vec<(String, Vec<(String, String)>)>>,
    }

    impl StubFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_data(mut self, endpoint: &str, data: Value) -> Self {
            self.responses.insert(endpoint.to_string(), Ok(data));
            self
        }

        pub fn with_failure(mut self, endpoint: &str, message: &str) -> Self {
            self.responses.insert(endpoint.to_string(), Err(message.to_string()));
            self
        }
    }

    #[async_trait]
    impl RecordFetcher for StubFetcher {
        async fn fetch_data(&self, endpoint: &str, params: &[(String, String)]) -> Result<Value, FetchError> {
            self.calls
                .lock()
                .unwrap()
                .push((endpoint.to_string(), params.to_vec()));
            match self.responses.get(endpoint) {
                Some(Ok(data)) => Ok(data.clone()),
                Some(Err(message)) => Err(FetchError::Unsuccessful {
                    message: Some(message.clone()),
                }),
                None => Err(FetchError::Status { status_code: 503 }),
            }
        }
    }
}
