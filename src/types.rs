use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::IonError;

/// An opaque asset identifier.
///
/// The service sends ids as JSON numbers, but nothing in this crate does
/// arithmetic on them, so they are kept as strings and accepted in either form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for AssetId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(u64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Number(n) => AssetId(n.to_string()),
            RawId::Text(s) => AssetId(s),
        })
    }
}

/// The kind of asset the service should produce.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum AssetType {
    #[serde(rename = "3DTILES")]
    ThreeDTiles,
}

/// The kind of source data being uploaded for reconstruction.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceType {
    RasterImagery,
}

impl FromStr for SourceType {
    type Err = IonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RASTER_IMAGERY" => Ok(SourceType::RasterImagery),
            other => Err(IonError::Config(format!("unknown source type `{}`", other))),
        }
    }
}

/// Reconstruction mesh quality.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshQuality {
    Low,
    Medium,
    High,
}

impl FromStr for MeshQuality {
    type Err = IonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(MeshQuality::Low),
            "medium" => Ok(MeshQuality::Medium),
            "high" => Ok(MeshQuality::High),
            _ => Err(IonError::Config(format!("unknown mesh quality `{}`", s))),
        }
    }
}

/// The set of output formats the tiling pipeline should generate.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OutputFormats {
    #[serde(rename = "cesium3DTiles")]
    pub cesium_3d_tiles: bool,
    pub las: bool,
    pub gaussian_splats: bool,
}

impl Default for OutputFormats {
    fn default() -> Self {
        Self {
            cesium_3d_tiles: true,
            las: true,
            gaussian_splats: true,
        }
    }
}

/// Tiling options sent along with a new asset.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AssetOptions {
    pub source_type: SourceType,
    pub mesh_quality: MeshQuality,
    pub use_gps_info: bool,
    pub outputs: OutputFormats,
}

impl Default for AssetOptions {
    fn default() -> Self {
        Self {
            source_type: SourceType::RasterImagery,
            mesh_quality: MeshQuality::Medium,
            use_gps_info: true,
            outputs: OutputFormats::default(),
        }
    }
}

/// The body of `POST /v1/assets`.
#[derive(Serialize, Debug, Clone)]
pub struct CreateAssetRequest {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub type_: AssetType,
    pub options: AssetOptions,
}

/// Lifecycle state of an asset in the tiling pipeline.
#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetStatus {
    /// The pipeline has accepted the asset but not started tiling yet.
    NotStarted,
    /// Tiling is running; `percent_complete` is meaningful.
    InProgress,
    /// Tiling finished and the asset can be viewed.
    Complete,
    /// The service found a problem with the uploaded data.
    DataError,
    /// Tiling failed for a reason not attributed to the data.
    Error,
    /// Any state this crate does not know about, e.g. `AWAITING_FILES`.
    #[serde(other)]
    Unknown,
}

impl AssetStatus {
    /// Returns `true` for states from which no further transition occurs.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AssetStatus::Complete | AssetStatus::DataError | AssetStatus::Error
        )
    }
}

/// A snapshot of an asset as reported by the service.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AssetMetadata {
    pub id: AssetId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub type_: Option<String>,
    pub status: AssetStatus,
    /// Tiling progress from 0 to 100, only meaningful while `InProgress`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub percent_complete: f64,
    #[serde(default)]
    pub bytes: Option<u64>,
    #[serde(default)]
    pub date_added: Option<DateTime<Utc>>,
}

impl AssetMetadata {
    /// `"{id} - {name}"`, the label used in every status line.
    pub fn label(&self) -> String {
        format!("{} - {}", self.id, self.name)
    }
}

/// Short-lived credentials and destination for uploading source data.
#[derive(Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UploadLocation {
    pub endpoint: String,
    pub bucket: String,
    pub prefix: String,
    pub access_key: String,
    pub secret_access_key: String,
    pub session_token: String,
}

impl fmt::Debug for UploadLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadLocation")
            .field("endpoint", &self.endpoint)
            .field("bucket", &self.bucket)
            .field("prefix", &self.prefix)
            .field("access_key", &self.access_key)
            .finish_non_exhaustive()
    }
}

/// The callback that tells the service all source data has been uploaded.
#[derive(Debug, Deserialize, Clone)]
pub struct OnComplete {
    pub url: String,
    pub method: String,
    /// Opaque data that must be sent back unchanged.
    #[serde(default)]
    pub fields: serde_json::Value,
}

/// The response of `POST /v1/assets`.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssetResponse {
    pub asset_metadata: AssetMetadata,
    /// Derived assets created alongside the primary one, e.g. point clouds.
    #[serde(default, deserialize_with = "null_as_default")]
    pub additional_assets: Vec<AssetMetadata>,
    pub upload_location: UploadLocation,
    pub on_complete: OnComplete,
}

impl CreateAssetResponse {
    /// The primary asset id followed by every additional asset id.
    pub fn asset_ids(&self) -> Vec<AssetId> {
        std::iter::once(&self.asset_metadata)
            .chain(self.additional_assets.iter())
            .map(|asset| asset.id.clone())
            .collect()
    }
}

/// Treats an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
