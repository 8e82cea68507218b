/// Represents the possible errors that can occur while creating, uploading and tiling an asset.
#[derive(Debug, thiserror::Error)]
pub enum IonError {
    #[error("Access token is missing. Please provide it or set the ION_ACCESS_TOKEN environment variable.")]
    MissingAccessToken,
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Network request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("Failed to parse API response: {0}")]
    ResponseParseFailed(#[from] serde_json::Error),
    #[error("API request failed with status {status}: {message}")]
    ApiError { status: u16, message: String },
    #[error("Unexpected API response: {0}")]
    InvalidResponse(String),
    #[error("URL parsing failed: {0}")]
    UrlParseFailed(#[from] url::ParseError),
    #[error("File I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("File upload failed: {0}")]
    UploadFailed(String),
    #[error("Asset {asset_id} did not finish tiling after {attempts} status checks")]
    PollLimitReached { asset_id: String, attempts: u32 },
    #[error("Timed out waiting for asset {asset_id} to finish tiling")]
    PollTimeout { asset_id: String },
    #[error("Operation was cancelled")]
    Cancelled,
}

impl From<aws_sdk_s3::primitives::ByteStreamError> for IonError {
    fn from(err: aws_sdk_s3::primitives::ByteStreamError) -> Self {
        IonError::UploadFailed(err.to_string())
    }
}
