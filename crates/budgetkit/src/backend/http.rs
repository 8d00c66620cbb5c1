//! HTTP backend for the budget service.
//!
//! Endpoints, relative to the configured base URL:
//!
//! | Call                 | Request                   | Success |
//! |----------------------|---------------------------|---------|
//! | list summaries       | `GET /keyView`            | 200     |
//! | list full keys       | `GET /key`                | 200     |
//! | create               | `POST /key`               | 201     |
//! | update               | `PUT /key?id={id}`        | 200     |
//! | delete               | `DELETE /key?id={id}`     | 200     |
//!
//! Every request carries `Authorization: Bearer {api_key}`.
//!
//! # Cancellation
//!
//! ureq calls block, so each request runs on its own short-lived thread while
//! the caller waits on the [`CancelToken`]. Cancelling returns
//! `Error::Cancelled` immediately; the abandoned response is discarded.
//!
//! A request already on the wire is not aborted. `Cancelled` from a create,
//! update or delete therefore does not mean the service was left untouched:
//! the change may still land. Refresh (or re-run create, which adopts by
//! name) before relying on remote state.

use crate::backend::KeyApi;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::types::{CreatedKey, KeyPatch, KeyRecord, NewKey, Operation};
use declarative::CancelToken;
use serde::de::DeserializeOwned;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// How often a waiting call re-checks its cancellation token.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// HTTP budget service backend.
///
/// # Example
///
/// ```no_run
/// use budgetkit::{ClientConfig, HttpBackend, KeyApi};
/// use declarative::CancelToken;
///
/// let config = ClientConfig::new("https://budget.example.com", "admin-token").unwrap();
/// let backend = HttpBackend::new(config);
/// let keys = backend.list_key_summaries(&CancelToken::new()).unwrap();
/// println!("Found {} keys", keys.len());
/// ```
#[derive(Clone)]
pub struct HttpBackend {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    config: ClientConfig,
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy)]
enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// Status and body of a completed exchange.
#[derive(Debug)]
struct RawResponse {
    status: u16,
    body: String,
}

impl HttpBackend {
    /// Create a backend for the configured service.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        // Non-2xx answers are data here: their status and body go into
        // RemoteRejected instead of a transport error.
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();
        Self { agent, config }
    }

    /// Connection settings in use.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn summaries_url(&self) -> String {
        format!("{}/keyView", self.config.host())
    }

    fn keys_url(&self) -> String {
        format!("{}/key", self.config.host())
    }

    fn key_url(&self, id: i64) -> String {
        format!("{}/key?id={}", self.config.host(), id)
    }

    /// Run one request on a worker thread, waiting on `cancel` meanwhile.
    fn send(
        &self,
        cancel: &CancelToken,
        operation: Operation,
        method: Method,
        url: &str,
        body: Option<serde_json::Value>,
    ) -> Result<RawResponse> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled { operation });
        }

        log::debug!("{:?} {}", method, url);

        let (tx, rx) = mpsc::channel();
        let agent = self.agent.clone();
        let authorization = self.config.authorization();
        let target = url.to_string();

        thread::Builder::new()
            .name("budgetkit-http".to_string())
            .spawn(move || {
                // The receiver is gone if the caller was cancelled.
                let _ = tx.send(dispatch(&agent, &authorization, method, &target, body));
            })
            .map_err(|e| transport(url, &e))?;

        loop {
            match rx.recv_timeout(CANCEL_POLL_INTERVAL) {
                Ok(Ok(response)) => {
                    log::debug!("{:?} {} -> {}", method, url, response.status);
                    return Ok(response);
                }
                Ok(Err(e)) => return Err(transport(url, &e)),
                Err(RecvTimeoutError::Timeout) => {
                    if cancel.is_cancelled() {
                        log::debug!("{:?} {} cancelled in flight", method, url);
                        return Err(Error::Cancelled { operation });
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(Error::Transport {
                        endpoint: url.to_string(),
                        message: "request worker exited without a response".to_string(),
                    });
                }
            }
        }
    }

    /// Send a request and require the operation's success status.
    fn exchange(
        &self,
        cancel: &CancelToken,
        operation: Operation,
        method: Method,
        url: &str,
        body: Option<serde_json::Value>,
    ) -> Result<RawResponse> {
        let response = self.send(cancel, operation, method, url, body)?;
        if response.status != operation.success_status() {
            return Err(Error::rejected(operation, response.status, response.body));
        }
        Ok(response)
    }

    fn list(&self, cancel: &CancelToken, operation: Operation, url: &str) -> Result<Vec<KeyRecord>> {
        let response = self.exchange(cancel, operation, Method::Get, url, None)?;
        decode(url, &response.body)
    }
}

/// Perform the request on the calling thread.
fn dispatch(
    agent: &ureq::Agent,
    authorization: &str,
    method: Method,
    url: &str,
    body: Option<serde_json::Value>,
) -> std::result::Result<RawResponse, ureq::Error> {
    let mut response = match (method, body) {
        (Method::Get, _) => agent
            .get(url)
            .header("Authorization", authorization)
            .call()?,
        (Method::Delete, _) => agent
            .delete(url)
            .header("Authorization", authorization)
            .call()?,
        (Method::Post, Some(body)) => agent
            .post(url)
            .header("Authorization", authorization)
            .send_json(&body)?,
        (Method::Put, Some(body)) => agent
            .put(url)
            .header("Authorization", authorization)
            .send_json(&body)?,
        (Method::Post, None) => agent
            .post(url)
            .header("Authorization", authorization)
            .send_empty()?,
        (Method::Put, None) => agent
            .put(url)
            .header("Authorization", authorization)
            .send_empty()?,
    };

    let status = response.status().as_u16();
    let body = response.body_mut().read_to_string()?;
    Ok(RawResponse { status, body })
}

fn decode<T: DeserializeOwned>(url: &str, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|source| Error::Decode {
        endpoint: url.to_string(),
        source,
    })
}

fn transport(url: &str, err: &dyn std::fmt::Display) -> Error {
    Error::Transport {
        endpoint: url.to_string(),
        message: err.to_string(),
    }
}

fn to_body<T: serde::Serialize>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value)
        .map_err(|e| Error::InvalidConfig(format!("cannot encode request body: {}", e)))
}

impl KeyApi for HttpBackend {
    fn list_key_summaries(&self, cancel: &CancelToken) -> Result<Vec<KeyRecord>> {
        self.list(cancel, Operation::ListSummaries, &self.summaries_url())
    }

    fn list_full_keys(&self, cancel: &CancelToken) -> Result<Vec<KeyRecord>> {
        self.list(cancel, Operation::ListFull, &self.keys_url())
    }

    fn create_key(&self, cancel: &CancelToken, name: &str, budget: i64) -> Result<CreatedKey> {
        let url = self.keys_url();
        let body = to_body(&NewKey { name, budget })?;
        let response = self.exchange(cancel, Operation::Create, Method::Post, &url, Some(body))?;
        decode(&url, &response.body)
    }

    fn update_key(&self, cancel: &CancelToken, id: i64, patch: &KeyPatch) -> Result<()> {
        let url = self.key_url(id);
        let body = to_body(patch)?;
        self.exchange(cancel, Operation::Update, Method::Put, &url, Some(body))?;
        Ok(())
    }

    fn delete_key(&self, cancel: &CancelToken, id: i64) -> Result<()> {
        let url = self.key_url(id);
        self.exchange(cancel, Operation::Delete, Method::Delete, &url, None)?;
        Ok(())
    }
}
