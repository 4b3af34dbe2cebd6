//! `reqwest`-backed [`ComputeService`] implementation.
//!
//! Every endpoint exchanges one JSON document in each direction. The
//! service reports some failures with a success status and an
//! `{"error": "..."}` body, so response classification looks at the body
//! as well as the status. No timeout is imposed beyond what the client's
//! network stack provides.

use replay_types::{
    EvolveRequest, EvolveResponse, SimulatePathsResponse, SimulationParams, SolveBoardRequest,
    SolveBoardResponse,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ComputeError;
use crate::service::{ComputeService, Endpoint};

/// Body of `GET /api/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// `"ok"` when the service is ready.
    pub status: String,
    /// Optional human-readable detail.
    #[serde(default)]
    pub message: Option<String>,
}

impl HealthStatus {
    /// Whether the service reported itself ready.
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

/// Compute service client speaking JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpComputeService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpComputeService {
    /// Create a client for the service at `base_url`
    /// (e.g. `http://127.0.0.1:8000`). A trailing slash is ignored.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// The base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Probe the service's health endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ComputeError`] if the service is unreachable or answers
    /// with anything other than a health document.
    pub async fn health(&self) -> Result<HealthStatus, ComputeError> {
        let url = self.url(Endpoint::Health);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ComputeError::Transport(format!("GET {url} failed: {e}")))?;
        read_response(Endpoint::Health, response).await
    }

    fn url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }

    /// POST `body` to `endpoint` and decode the reply.
    async fn post<B, T>(&self, endpoint: Endpoint, body: &B) -> Result<T, ComputeError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.url(endpoint);
        debug!(endpoint = %endpoint, "sending compute request");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ComputeError::Transport(format!("POST {url} failed: {e}")))?;

        read_response(endpoint, response).await
    }
}

impl ComputeService for HttpComputeService {
    async fn solve_board(
        &self,
        request: SolveBoardRequest,
    ) -> Result<SolveBoardResponse, ComputeError> {
        self.post(Endpoint::SolveBoard, &request).await
    }

    async fn simulate_paths(
        &self,
        params: SimulationParams,
    ) -> Result<SimulatePathsResponse, ComputeError> {
        self.post(Endpoint::SimulatePaths, &params).await
    }

    async fn evolve_generation(
        &self,
        request: EvolveRequest,
    ) -> Result<EvolveResponse, ComputeError> {
        self.post(Endpoint::EvolveGeneration, &request).await
    }
}

/// Read the body of `response` and classify it.
async fn read_response<T: DeserializeOwned>(
    endpoint: Endpoint,
    response: reqwest::Response,
) -> Result<T, ComputeError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ComputeError::Transport(format!("reading {endpoint} body failed: {e}")))?;
    debug!(endpoint = %endpoint, status = status.as_u16(), bytes = body.len(), "compute response received");
    decode_body(status.as_u16(), &body)
}

/// Classify a response body.
///
/// - `{"error": "..."}` is an application error whatever the status.
/// - A non-2xx status is an application error; the message is taken from
///   an `error` or `detail` field when present, otherwise the raw body.
/// - Anything else must decode as `T`.
fn decode_body<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, ComputeError> {
    let success = (200..300).contains(&status);
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) if !success => {
            return Err(ComputeError::Application {
                status: Some(status),
                message: body.trim().to_owned(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(message) = error_message(&value) {
        return Err(ComputeError::Application {
            status: (!success).then_some(status),
            message,
        });
    }
    if !success {
        return Err(ComputeError::Application {
            status: Some(status),
            message: value.to_string(),
        });
    }

    Ok(serde_json::from_value(value)?)
}

/// Extract an error description from an `error` or `detail` field.
fn error_message(value: &serde_json::Value) -> Option<String> {
    ["error", "detail"].iter().find_map(|key| match value.get(key)? {
        serde_json::Value::String(message) => Some(message.clone()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    })
}
