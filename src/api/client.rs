//! Trip planner HTTP client
//!
//! Wraps the backend's plan, plan-stream and preview endpoints. Stored API
//! keys are merged into outgoing plan requests when the user has set any.

use std::future::Future;
use std::sync::Arc;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{error, info};

use super::stream::read_plan_stream;
use crate::core::config::ClientConfig;
use crate::core::credentials::CredentialStore;
use crate::core::models::{StreamProgress, TripPlan, TripPlanRequest, XhsResponse};
use crate::core::storage::FileStore;
use crate::errors::PlannerError;

/// Characters `encodeURIComponent` leaves as-is besides ASCII alphanumerics.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Client for the trip planner backend.
#[derive(Debug, Clone)]
pub struct PlannerClient {
    http: Client,
    base_url: String,
    credentials: CredentialStore,
}

impl PlannerClient {
    /// Builds a client whose credential store is backed by `config.keys_file`,
    /// or kept in memory when no file is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, PlannerError> {
        let credentials = match &config.keys_file {
            Some(path) => CredentialStore::new(Arc::new(FileStore::new(path))),
            None => CredentialStore::in_memory(),
        };
        Self::with_credentials(config, credentials)
    }

    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn with_credentials(
        config: &ClientConfig,
        credentials: CredentialStore,
    ) -> Result<Self, PlannerError> {
        let base_url = config.normalized_base_url()?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| PlannerError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url,
            credentials,
        })
    }

    #[must_use]
    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The body actually sent for `request`: the stored key set replaces
    /// `api_keys` when any stored key is set, otherwise `request` is unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored keys cannot be loaded.
    pub fn build_request_body(
        &self,
        request: &TripPlanRequest,
    ) -> Result<TripPlanRequest, PlannerError> {
        let stored = self.credentials.load()?;
        if stored.is_empty() {
            return Ok(request.clone());
        }

        let mut body = request.clone();
        body.api_keys = Some(stored);
        Ok(body)
    }

    /// Requests a complete trip plan in one round trip.
    ///
    /// # Errors
    ///
    /// Returns `Transport` on connection failure, non-2xx status or an
    /// undecodable body. Failures are logged before being returned.
    pub async fn generate_plan(&self, request: &TripPlanRequest) -> Result<TripPlan, PlannerError> {
        let result: Result<TripPlan, PlannerError> = async {
            let body = self.build_request_body(request)?;
            info!(
                city = %body.city,
                days = body.days,
                custom_keys = body.api_keys.is_some(),
                "Requesting trip plan"
            );

            let response = send(self.http.post(self.url("/trip/plan")).json(&body)).await?;
            decode_json(response).await
        }
        .await;

        result.inspect_err(|e| error!(error = %e, "Error generating trip plan"))
    }

    /// Requests a trip plan over the progress stream, calling `on_progress`
    /// for each event in the order received.
    ///
    /// # Errors
    ///
    /// See [`PlannerClient::generate_plan_stream_until`].
    pub async fn generate_plan_stream<F>(
        &self,
        request: &TripPlanRequest,
        on_progress: F,
    ) -> Result<TripPlan, PlannerError>
    where
        F: FnMut(&StreamProgress),
    {
        self.generate_plan_stream_until(request, on_progress, futures::future::pending())
            .await
    }

    /// Like [`PlannerClient::generate_plan_stream`], aborting with `Cancelled`
    /// as soon as `cancel` completes.
    ///
    /// # Errors
    ///
    /// Returns `Transport` for connection failures and non-2xx responses,
    /// `StreamUnavailable` if the response has no body, `StreamReported` if the
    /// backend sends an error event, `NoPlanReceived` if the stream ends
    /// without a plan, and `Cancelled` on cancellation.
    pub async fn generate_plan_stream_until<F, C>(
        &self,
        request: &TripPlanRequest,
        on_progress: F,
        cancel: C,
    ) -> Result<TripPlan, PlannerError>
    where
        F: FnMut(&StreamProgress),
        C: Future<Output = ()>,
    {
        let body = self
            .build_request_body(request)
            .inspect_err(|e| error!(error = %e, "Error preparing trip plan stream"))?;
        info!(
            city = %body.city,
            days = body.days,
            custom_keys = body.api_keys.is_some(),
            "Opening trip plan stream"
        );

        let response = send(
            self.http
                .post(self.url("/trip/plan/stream"))
                .header(ACCEPT, "text/event-stream")
                .json(&body),
        )
        .await
        .inspect_err(|e| error!(error = %e, "Error opening trip plan stream"))?;

        if has_null_body(response.status()) {
            error!(status = %response.status(), "Trip plan stream has no body");
            return Err(PlannerError::StreamUnavailable);
        }

        read_plan_stream(response.bytes_stream(), on_progress, cancel)
            .await
            .inspect_err(|e| error!(error = %e, "Error reading trip plan stream"))
    }

    /// Fetches Xiaohongshu note previews for `keyword`.
    ///
    /// # Errors
    ///
    /// Returns `Transport` on connection failure, non-2xx status or an
    /// undecodable body. Failures are logged before being returned.
    pub async fn get_previews(&self, keyword: &str) -> Result<XhsResponse, PlannerError> {
        let url = previews_url(&self.base_url, keyword);
        info!(keyword = %keyword, "Fetching XHS previews");

        let result: Result<XhsResponse, PlannerError> = async {
            let response = send(self.http.get(url)).await?;
            decode_json(response).await
        }
        .await;

        result.inspect_err(|e| error!(error = %e, "Error fetching XHS previews"))
    }

    /// Probes the preview service's health endpoint. The body shape is
    /// backend-defined, so it is returned untyped.
    ///
    /// # Errors
    ///
    /// Same policy as [`PlannerClient::get_previews`].
    pub async fn preview_health(&self) -> Result<Value, PlannerError> {
        let result: Result<Value, PlannerError> = async {
            let response = send(self.http.get(self.url("/xhs/health"))).await?;
            decode_json(response).await
        }
        .await;

        result.inspect_err(|e| error!(error = %e, "Error checking XHS preview health"))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

/// Statuses whose responses never carry a body. A 200 with an empty body is
/// still a stream, just one that ends without a plan.
fn has_null_body(status: StatusCode) -> bool {
    matches!(status.as_u16(), 101 | 103 | 204 | 205 | 304)
}

/// Builds the preview lookup URL with `keyword` percent-encoded once.
#[must_use]
pub fn previews_url(base_url: &str, keyword: &str) -> String {
    format!(
        "{}/xhs/previews?keyword={}",
        base_url.trim_end_matches('/'),
        utf8_percent_encode(keyword, URI_COMPONENT)
    )
}

async fn send(request: RequestBuilder) -> Result<Response, PlannerError> {
    let response = request
        .send()
        .await
        .map_err(|e| PlannerError::Transport(format!("request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_else(|e| {
            format!("Failed to read error response body (status {status}): {e}")
        });
        return Err(PlannerError::Transport(format!(
            "trip planner API error (status {status}): {error_text}"
        )));
    }

    Ok(response)
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, PlannerError> {
    response
        .json::<T>()
        .await
        .map_err(|e| PlannerError::Transport(format!("Failed to decode response: {e}")))
}
