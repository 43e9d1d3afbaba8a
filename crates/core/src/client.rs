use crate::{
    config::EndpointConfig,
    error::{CoreError, Result},
    model::{ChassisCollection, PowerResource},
};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use url::Url;

/// Chassis collection path, also the prefix synthesised for bare chassis ids
pub const CHASSIS_COLLECTION_PATH: &str = "/redfish/v1/Chassis";

/// Sub-resource of a chassis holding power telemetry
pub const POWER_SEGMENT: &str = "Power";

/// Largest response body read from the service
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

const USER_AGENT: &str = concat!("redfish-exporter/", env!("CARGO_PKG_VERSION"));

/// Source of chassis power telemetry
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Chassis resource ids in the order the server lists them
    async fn list_chassis(&self, deadline: Instant) -> Result<Vec<String>>;

    /// Power resource of one chassis
    async fn chassis_power(&self, chassis: &str, deadline: Instant) -> Result<PowerResource>;
}

/// Authenticated JSON client for a single Redfish service
#[derive(Clone)]
pub struct RedfishClient {
    base_url: Url,
    username: String,
    password: String,
    max_body_bytes: usize,
    http: reqwest::Client,
}

impl std::fmt::Debug for RedfishClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedfishClient")
            .field("base_url", &self.base_url.as_str())
            .field("username", &self.username)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish_non_exhaustive()
    }
}

impl RedfishClient {
    pub fn new(
        base_url: &str,
        username: &str,
        password: &str,
        insecure_tls: bool,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = base_url.trim();
        if base_url.is_empty() {
            return Err(CoreError::config("Redfish base URL is empty"));
        }
        let base_url = Url::parse(base_url)
            .map_err(|e| CoreError::config(format!("Invalid Redfish base URL {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(CoreError::config(format!(
                "Redfish base URL must be an http(s) URL: {}",
                base_url
            )));
        }
        if username.is_empty() {
            return Err(CoreError::config("Redfish username is empty"));
        }

        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(insecure_tls)
            .connect_timeout(timeout)
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CoreError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            username: username.to_string(),
            password: password.to_string(),
            max_body_bytes: MAX_BODY_BYTES,
            http,
        })
    }

    /// Replace the response body size limit
    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    pub fn from_config(config: &EndpointConfig) -> Result<Self> {
        Self::new(
            &config.base_url,
            &config.username,
            &config.password,
            config.insecure_tls,
            config.timeout,
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL for `endpoint` below the base path
    pub fn endpoint_url(&self, endpoint: &str) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(&join_path(self.base_url.path(), endpoint));
        url
    }

    pub async fn list_chassis(&self, deadline: Instant) -> Result<Vec<String>> {
        let collection: ChassisCollection = self.get_json(CHASSIS_COLLECTION_PATH, deadline).await?;

        let mut ids = Vec::with_capacity(collection.members.len());
        for member in collection.members {
            if member.odata_id.is_empty() {
                tracing::debug!("skipping chassis member without @odata.id");
                continue;
            }
            ids.push(member.odata_id);
        }
        Ok(ids)
    }

    pub async fn get_chassis_power(&self, chassis: &str, deadline: Instant) -> Result<PowerResource> {
        let endpoint = format!("{}/{}", chassis.trim_end_matches('/'), POWER_SEGMENT);
        self.get_json(&endpoint, deadline).await
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str, deadline: Instant) -> Result<T> {
        let url = self.endpoint_url(endpoint);
        tracing::debug!(url = %url, "redfish GET");

        let request = self
            .http
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
            .header(ACCEPT, HeaderValue::from_static("application/json"));

        let response = timeout_at(deadline, request.send())
            .await
            .map_err(|_| CoreError::deadline_exceeded(endpoint))?
            .map_err(|e| CoreError::transport(endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::http_status(endpoint, status));
        }

        let body = timeout_at(deadline, self.read_body(endpoint, response))
            .await
            .map_err(|_| CoreError::deadline_exceeded(endpoint))??;

        serde_json::from_slice(&body).map_err(|e| CoreError::decode(endpoint, e))
    }

    /// Read the body in chunks, failing once it grows past `max_body_bytes`
    async fn read_body(&self, endpoint: &str, mut response: reqwest::Response) -> Result<Vec<u8>> {
        let limit = self.max_body_bytes;
        if response.content_length().is_some_and(|len| len > limit as u64) {
            return Err(CoreError::body_too_large(endpoint, limit));
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| CoreError::transport(endpoint, e))?
        {
            if body.len() + chunk.len() > limit {
                return Err(CoreError::body_too_large(endpoint, limit));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

#[async_trait]
impl TelemetrySource for RedfishClient {
    async fn list_chassis(&self, deadline: Instant) -> Result<Vec<String>> {
        RedfishClient::list_chassis(self, deadline).await
    }

    async fn chassis_power(&self, chassis: &str, deadline: Instant) -> Result<PowerResource> {
        self.get_chassis_power(chassis, deadline).await
    }
}

/// Join `endpoint` below `base`, always treating the endpoint as rooted so a
/// relative endpoint never replaces the last base segment.
///
/// The result is normalised: empty and `.` segments are dropped, `..` pops a
/// segment, and there is no trailing separator.
pub fn join_path(base: &str, endpoint: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in base.split('/').chain(endpoint.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    format!("/{}", segments.join("/"))
}
