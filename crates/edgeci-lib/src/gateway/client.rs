//! HTTP client for the management API
//!
//! Every call is authenticated with basic credentials, bounded by the
//! configured timeout, and classified into a payload, an expected empty
//! outcome, or a [`SyncError`].

use super::GatewayClient;
use crate::error::{SyncError, SyncResult};
use crate::models::{ImportResponse, KvmEntry, MetadataProbe, ProxyMetadata};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Base URL of the hosted management API
pub const DEFAULT_BASE_URL: &str = "https://api.enterprise.apigee.com/v1/organizations/";

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Organizations root of the management API
    pub base_url: String,
    /// Upper bound for a whole request, body transfer included
    pub request_timeout: Duration,
    /// Connection establishment timeout
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Basic authentication credentials
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Management API client over HTTP
#[derive(Debug)]
pub struct EdgeClient {
    http: Client,
    base_url: Url,
    credentials: Credentials,
}

impl EdgeClient {
    /// Create a new client with the given configuration
    pub fn new(config: ClientConfig, credentials: Credentials) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(concat!("edgeci/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(&config.base_url)
            .with_context(|| format!("Invalid base URL: {}", config.base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Base URL cannot carry a path: {}", config.base_url);
        }

        Ok(Self {
            http,
            base_url,
            credentials,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an endpoint URL from percent-encoded path segments
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was rejected in new()
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Send an authenticated request and return the raw response
    async fn send(&self, operation: &'static str, request: RequestBuilder) -> SyncResult<Response> {
        let response = request
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .send()
            .await
            .map_err(|e| SyncError::transport(operation, e))?;

        debug!(
            operation = operation,
            status = response.status().as_u16(),
            url = %response.url(),
            "Management API responded"
        );

        Ok(response)
    }

    /// Turn a non-success status into a remote error
    async fn ensure_success(operation: &'static str, response: Response) -> SyncResult<Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(SyncError::Remote {
            operation,
            status,
            body,
        })
    }

    async fn read_json<T: DeserializeOwned>(
        operation: &'static str,
        response: Response,
    ) -> SyncResult<T> {
        let body = response
            .bytes()
            .await
            .map_err(|e| SyncError::transport(operation, e))?;
        serde_json::from_slice(&body).map_err(|e| SyncError::malformed(operation, e))
    }

    fn bundle_form(proxy: &str, bundle: Vec<u8>) -> Form {
        let part = Part::bytes(bundle).file_name(format!("{}.zip", proxy));
        Form::new().part("file", part)
    }
}

#[async_trait]
impl GatewayClient for EdgeClient {
    async fn list_proxies(&self, org: &str) -> SyncResult<Vec<String>> {
        const OP: &str = "list_proxies";
        let url = self.endpoint(&[org, "apis"]);

        let response = self.send(OP, self.http.get(url)).await?;
        let response = Self::ensure_success(OP, response).await?;
        Self::read_json(OP, response).await
    }

    async fn fetch_metadata(&self, org: &str, proxy: &str) -> SyncResult<MetadataProbe> {
        const OP: &str = "fetch_metadata";
        let url = self.endpoint(&[org, "apis", proxy]);

        let response = self.send(OP, self.http.get(url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(proxy = %proxy, "Proxy does not exist remotely");
            return Ok(MetadataProbe::NotFound);
        }

        let response = Self::ensure_success(OP, response).await?;
        let metadata: ProxyMetadata = Self::read_json(OP, response).await?;
        Ok(MetadataProbe::Found(metadata))
    }

    async fn export_bundle(&self, org: &str, proxy: &str, revision: u32) -> SyncResult<Vec<u8>> {
        const OP: &str = "export_bundle";
        let revision = revision.to_string();
        let url = self.endpoint(&[org, "apis", proxy, "revisions", &revision]);

        let request = self.http.get(url).query(&[("format", "bundle")]);
        let response = self.send(OP, request).await?;
        let response = Self::ensure_success(OP, response).await?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SyncError::transport(OP, e))?;
        Ok(bytes.to_vec())
    }

    async fn import_bundle(&self, org: &str, proxy: &str, bundle: Vec<u8>) -> SyncResult<u32> {
        const OP: &str = "import_bundle";
        let url = self.endpoint(&[org, "apis"]);

        let request = self
            .http
            .post(url)
            .query(&[("action", "import"), ("name", proxy), ("validate", "true")])
            .multipart(Self::bundle_form(proxy, bundle));
        let response = self.send(OP, request).await?;
        let response = Self::ensure_success(OP, response).await?;

        let imported: ImportResponse = Self::read_json(OP, response).await?;
        Ok(imported.revision)
    }

    async fn update_bundle(
        &self,
        org: &str,
        proxy: &str,
        revision: u32,
        bundle: Vec<u8>,
    ) -> SyncResult<()> {
        const OP: &str = "update_bundle";
        let revision = revision.to_string();
        let url = self.endpoint(&[org, "apis", proxy, "revisions", &revision]);

        let request = self
            .http
            .post(url)
            .query(&[("validate", "true")])
            .multipart(Self::bundle_form(proxy, bundle));
        let response = self.send(OP, request).await?;
        Self::ensure_success(OP, response).await?;
        Ok(())
    }

    async fn deploy(&self, org: &str, proxy: &str, revision: u32, env: &str) -> SyncResult<()> {
        const OP: &str = "deploy";
        let revision = revision.to_string();
        let url = self.endpoint(&[
            org,
            "environments",
            env,
            "apis",
            proxy,
            "revisions",
            &revision,
            "deployments",
        ]);

        let request = self
            .http
            .post(url)
            .query(&[("override", "true")])
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
        let response = self.send(OP, request).await?;
        Self::ensure_success(OP, response).await?;
        Ok(())
    }

    async fn fetch_kvm_entry(
        &self,
        org: &str,
        env: &str,
        map: &str,
        key: &str,
    ) -> SyncResult<KvmEntry> {
        const OP: &str = "fetch_kvm_entry";
        let url = self.endpoint(&[
            org,
            "environments",
            env,
            "keyvaluemaps",
            map,
            "entries",
            key,
        ]);

        let response = self.send(OP, self.http.get(url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(SyncError::NotFound {
                operation: OP,
                resource: format!("entry {} in map {}", key, map),
            });
        }

        let response = Self::ensure_success(OP, response).await?;
        Self::read_json(OP, response).await
    }

    async fn insert_kvm_entry(
        &self,
        org: &str,
        env: &str,
        map: &str,
        key: &str,
        value: &str,
    ) -> SyncResult<()> {
        const OP: &str = "insert_kvm_entry";
        let url = self.endpoint(&[org, "environments", env, "keyvaluemaps", map, "entries"]);

        let entry = KvmEntry {
            name: key.to_string(),
            value: value.to_string(),
        };
        let response = self.send(OP, self.http.post(url).json(&entry)).await?;
        Self::ensure_success(OP, response).await?;
        Ok(())
    }
}

/// Builder for EdgeClient configuration
pub struct EdgeClientBuilder {
    config: ClientConfig,
    credentials: Option<Credentials>,
}

impl EdgeClientBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            credentials: None,
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::new(username, password));
        self
    }

    pub fn build(self) -> anyhow::Result<EdgeClient> {
        let credentials = self
            .credentials
            .ok_or_else(|| anyhow::anyhow!("credentials are required"))?;

        EdgeClient::new(self.config, credentials)
    }
}

impl Default for EdgeClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
