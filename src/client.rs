use crate::config::{Config, DEFAULT_API_BASE, DEFAULT_VIEWER_BASE};
use crate::error::IonError;
use crate::types::{AssetId, AssetMetadata, CreateAssetRequest, CreateAssetResponse, OnComplete};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use std::env;
use tracing::{debug, error, info};
use url::Url;

/// The main client for the asset REST API.
///
/// It holds the shared `reqwest::Client`, which attaches the bearer token to every
/// request, plus the API and viewer base URLs. It is cheap to clone and safe to
/// share across the concurrent status pollers.
#[derive(Clone, Debug)]
pub struct IonClient {
    client: reqwest::Client,
    base_url: Url,
    viewer_base: Url,
}

impl IonClient {
    /// Creates a new `IonClient` against the public API.
    ///
    /// The `access_token` parameter wins; if it is `None` the `ION_ACCESS_TOKEN`
    /// environment variable is used.
    ///
    /// # Errors
    ///
    /// - `IonError::MissingAccessToken` if no token is available either way.
    /// - `IonError::RequestFailed` if the internal HTTP client fails to build.
    pub fn new(access_token: Option<String>) -> Result<Self, IonError> {
        let access_token = access_token
            .or_else(|| env::var("ION_ACCESS_TOKEN").ok())
            .ok_or(IonError::MissingAccessToken)?;
        Self::new_with_url(&access_token, DEFAULT_API_BASE)
    }

    /// Creates a new `IonClient` with a custom API base URL.
    ///
    /// This is useful for self-hosted deployments and for pointing the client at a mock server.
    pub fn new_with_url(access_token: &str, base_url: &str) -> Result<Self, IonError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", access_token))
            .map_err(|_| IonError::Config("access token contains invalid header characters".into()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: directory_url(base_url)?,
            viewer_base: directory_url(DEFAULT_VIEWER_BASE)?,
        })
    }

    /// Creates a client from a loaded [`Config`].
    pub fn from_config(config: &Config) -> Result<Self, IonError> {
        Self::new_with_url(config.access_token.expose_secret(), &config.api_base)?
            .with_viewer_base(&config.viewer_base)
    }

    /// Replaces the base URL used to build links to finished assets.
    pub fn with_viewer_base(mut self, viewer_base: &str) -> Result<Self, IonError> {
        self.viewer_base = directory_url(viewer_base)?;
        Ok(self)
    }

    /// Creates a new asset and returns where its source data must be uploaded.
    ///
    /// Anything other than `200 OK` is an error carrying the response body; the
    /// caller should not upload or poll in that case.
    pub async fn create_asset(
        &self,
        request: &CreateAssetRequest,
    ) -> Result<CreateAssetResponse, IonError> {
        let url = self.base_url.join("v1/assets")?;
        debug!(%url, "creating asset");

        let response = self.client.post(url).json(request).send().await?;

        if response.status() != StatusCode::OK {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            error!(status, body = %message, "Creating asset failed");
            return Err(IonError::ApiError { status, message });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Retrieves the current metadata snapshot of an asset.
    pub async fn get_asset(&self, asset_id: &AssetId) -> Result<AssetMetadata, IonError> {
        let url = self
            .base_url
            .join(&format!("v1/assets/{}", asset_id))?;
        debug!(%url, "fetching asset status");

        let response = self.client.get(url).send().await?;

        if response.status().is_success() {
            let body = response.bytes().await?;
            Ok(serde_json::from_slice(&body)?)
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            Err(IonError::ApiError { status, message })
        }
    }

    /// Tells the service that every source file has been uploaded.
    ///
    /// The request goes to the URL and method given by the creation response and
    /// echoes its `fields` verbatim as the JSON body. A non-success status is
    /// reported as an error.
    pub async fn complete_upload(&self, on_complete: &OnComplete) -> Result<(), IonError> {
        let method = Method::from_bytes(on_complete.method.to_ascii_uppercase().as_bytes())
            .map_err(|_| {
                IonError::InvalidResponse(format!(
                    "unsupported completion method `{}`",
                    on_complete.method
                ))
            })?;
        let url = Url::parse(&on_complete.url)?;
        info!(%method, %url, "Notifying upload complete");

        let response = self
            .client
            .request(method, url)
            .json(&on_complete.fields)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            error!(status, body = %message, "Upload completion notification failed");
            Err(IonError::ApiError { status, message })
        }
    }

    /// The link at which a finished asset can be viewed.
    pub fn viewer_url(&self, asset_id: &AssetId) -> Result<Url, IonError> {
        Ok(self.viewer_base.join(asset_id.as_str())?)
    }
}

/// Parses `raw` and makes sure it ends in `/`, so `join` appends instead of replacing
/// the last path segment.
fn directory_url(raw: &str) -> Result<Url, IonError> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
