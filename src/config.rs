use crate::error::IonError;
use crate::types::{AssetOptions, AssetType, CreateAssetRequest, MeshQuality, SourceType};
use secrecy::SecretString;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.ion.cesium.com";
pub const DEFAULT_VIEWER_BASE: &str = "https://cesium.com/ion/assets/";
pub const DEFAULT_INPUT: &str = "images.zip";
pub const DEFAULT_ASSET_NAME: &str = "Test Script";
pub const DEFAULT_S3_REGION: &str = "us-east-1";
/// Smallest part size S3 accepts for every part but the last.
pub const MIN_PART_SIZE: usize = 5 * 1024 * 1024;
pub const DEFAULT_PART_SIZE: usize = MIN_PART_SIZE;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// How often and for how long an asset's status is checked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollOptions {
    pub interval: Duration,
    /// `None` polls until a terminal status is observed.
    pub max_attempts: Option<u32>,
    /// `None` waits forever.
    pub timeout: Option<Duration>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: None,
            timeout: None,
        }
    }
}

/// Settings for the object-storage client used by the uploader.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadOptions {
    pub region: String,
    pub force_path_style: bool,
    pub part_size: usize,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            region: DEFAULT_S3_REGION.to_string(),
            force_path_style: false,
            part_size: DEFAULT_PART_SIZE,
        }
    }
}

/// Everything a single upload-and-tile run needs.
#[derive(Clone, Debug)]
pub struct Config {
    pub access_token: SecretString,
    pub api_base: String,
    pub viewer_base: String,
    pub input: PathBuf,
    /// Object name appended to the upload prefix.
    pub upload_filename: String,
    pub asset_name: String,
    pub asset_description: String,
    pub options: AssetOptions,
    pub poll: PollOptions,
    pub upload: UploadOptions,
}

impl Config {
    /// Builds a config with defaults for everything except the token and input file.
    pub fn new(access_token: impl Into<String>, input: impl Into<PathBuf>) -> Self {
        let input = input.into();
        let upload_filename = default_upload_filename(&input);
        let access_token: String = access_token.into();
        Self {
            access_token: SecretString::new(access_token.into_boxed_str()),
            api_base: DEFAULT_API_BASE.to_string(),
            viewer_base: DEFAULT_VIEWER_BASE.to_string(),
            input,
            upload_filename,
            asset_name: DEFAULT_ASSET_NAME.to_string(),
            asset_description: String::new(),
            options: AssetOptions::default(),
            poll: PollOptions::default(),
            upload: UploadOptions::default(),
        }
    }

    pub fn from_env() -> Result<Self, IonError> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// Reads configuration values through `get`, so tests never touch the
    /// process environment.
    pub fn from_env_with<F>(mut get: F) -> Result<Self, IonError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let token = get("ION_ACCESS_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or(IonError::MissingAccessToken)?;
        let input = get("ION_INPUT").unwrap_or_else(|| DEFAULT_INPUT.to_string());

        let mut config = Config::new(token, input);

        if let Some(base) = get("ION_API_BASE") {
            config.api_base = base;
        }
        if let Some(base) = get("ION_VIEWER_BASE") {
            config.viewer_base = base;
        }
        if let Some(filename) = get("ION_UPLOAD_FILENAME") {
            config.upload_filename = filename;
        }
        if let Some(name) = get("ION_ASSET_NAME") {
            config.asset_name = name;
        }
        if let Some(description) = get("ION_ASSET_DESCRIPTION") {
            config.asset_description = description;
        }

        if let Some(source) = get("ION_SOURCE_TYPE") {
            config.options.source_type = source.parse::<SourceType>()?;
        }
        if let Some(quality) = get("ION_MESH_QUALITY") {
            config.options.mesh_quality = quality.parse::<MeshQuality>()?;
        }
        if let Some(flag) = get("ION_USE_GPS_INFO") {
            config.options.use_gps_info = parse_var("ION_USE_GPS_INFO", &flag)?;
        }

        if let Some(secs) = get("ION_POLL_INTERVAL_SECS") {
            config.poll.interval = Duration::from_secs(parse_positive("ION_POLL_INTERVAL_SECS", &secs)?);
        }
        if let Some(attempts) = get("ION_POLL_MAX_ATTEMPTS") {
            config.poll.max_attempts = Some(parse_positive("ION_POLL_MAX_ATTEMPTS", &attempts)?);
        }
        if let Some(secs) = get("ION_POLL_TIMEOUT_SECS") {
            config.poll.timeout = Some(Duration::from_secs(parse_positive("ION_POLL_TIMEOUT_SECS", &secs)?));
        }

        if let Some(region) = get("ION_S3_REGION") {
            config.upload.region = region;
        }
        if let Some(flag) = get("ION_S3_FORCE_PATH_STYLE") {
            config.upload.force_path_style = parse_var("ION_S3_FORCE_PATH_STYLE", &flag)?;
        }
        if let Some(size) = get("ION_UPLOAD_PART_SIZE") {
            let size: usize = parse_var("ION_UPLOAD_PART_SIZE", &size)?;
            if size < MIN_PART_SIZE {
                return Err(IonError::Config(format!(
                    "ION_UPLOAD_PART_SIZE must be at least {} bytes",
                    MIN_PART_SIZE
                )));
            }
            config.upload.part_size = size;
        }

        Ok(config)
    }

    /// The asset creation request described by this config.
    pub fn create_request(&self) -> CreateAssetRequest {
        CreateAssetRequest {
            name: self.asset_name.clone(),
            description: self.asset_description.clone(),
            type_: AssetType::ThreeDTiles,
            options: self.options.clone(),
        }
    }
}

fn default_upload_filename(input: &std::path::Path) -> String {
    input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_INPUT)
        .to_string()
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T, IonError> {
    value
        .trim()
        .parse()
        .map_err(|_| IonError::Config(format!("{} has an invalid value `{}`", key, value)))
}

fn parse_positive<T: FromStr + Default + PartialEq>(key: &str, value: &str) -> Result<T, IonError> {
    let parsed: T = parse_var(key, value)?;
    if parsed == T::default() {
        return Err(IonError::Config(format!("{} must be greater than zero", key)));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn from_env_missing_token() {
        let get = |k: &str| match k {
            "ION_INPUT" => Some("data.zip".into()),
            _ => None,
        };
        let res = Config::from_env_with(get);
        assert!(matches!(res, Err(IonError::MissingAccessToken)));
    }

    #[test]
    fn from_env_applies_defaults() {
        let get = |k: &str| match k {
            "ION_ACCESS_TOKEN" => Some("sekrit".into()),
            _ => None,
        };
        let cfg = Config::from_env_with(get).expect("cfg");
        assert_eq!(cfg.access_token.expose_secret(), "sekrit");
        assert_eq!(cfg.api_base, DEFAULT_API_BASE);
        assert_eq!(cfg.input, PathBuf::from("images.zip"));
        assert_eq!(cfg.upload_filename, "images.zip");
        assert_eq!(cfg.asset_name, "Test Script");
        assert_eq!(cfg.asset_description, "");
        assert_eq!(cfg.poll, PollOptions::default());
        assert_eq!(cfg.poll.interval, Duration::from_secs(10));
        assert_eq!(cfg.upload.region, "us-east-1");
        assert_eq!(cfg.options, AssetOptions::default());
    }

    #[test]
    fn from_env_reads_values() {
        let get = |k: &str| match k {
            "ION_ACCESS_TOKEN" => Some("sekrit".into()),
            "ION_INPUT" => Some("/data/site/photos.zip".into()),
            "ION_API_BASE" => Some("http://localhost:8080".into()),
            "ION_MESH_QUALITY" => Some("high".into()),
            "ION_USE_GPS_INFO" => Some("false".into()),
            "ION_POLL_INTERVAL_SECS" => Some("3".into()),
            "ION_POLL_MAX_ATTEMPTS" => Some("20".into()),
            "ION_S3_FORCE_PATH_STYLE" => Some("true".into()),
            _ => None,
        };
        let cfg = Config::from_env_with(get).expect("cfg");
        assert_eq!(cfg.api_base, "http://localhost:8080");
        assert_eq!(cfg.upload_filename, "photos.zip");
        assert_eq!(cfg.options.mesh_quality, MeshQuality::High);
        assert!(!cfg.options.use_gps_info);
        assert_eq!(cfg.poll.interval, Duration::from_secs(3));
        assert_eq!(cfg.poll.max_attempts, Some(20));
        assert!(cfg.upload.force_path_style);
    }

    #[test]
    fn from_env_rejects_bad_numbers() {
        let get = |k: &str| match k {
            "ION_ACCESS_TOKEN" => Some("sekrit".into()),
            "ION_POLL_INTERVAL_SECS" => Some("soon".into()),
            _ => None,
        };
        let res = Config::from_env_with(get);
        assert!(matches!(res, Err(IonError::Config(_))));
    }

    #[test]
    fn from_env_rejects_zero_polling_values() {
        for key in ["ION_POLL_INTERVAL_SECS", "ION_POLL_MAX_ATTEMPTS", "ION_POLL_TIMEOUT_SECS"] {
            let get = |k: &str| match k {
                "ION_ACCESS_TOKEN" => Some("sekrit".into()),
                k if k == key => Some("0".into()),
                _ => None,
            };
            let res = Config::from_env_with(get);
            assert!(matches!(res, Err(IonError::Config(_))), "{key} = 0 was accepted");
        }
    }

    #[test]
    fn from_env_enforces_minimum_part_size() {
        let with_part_size = |size: usize| {
            Config::from_env_with(move |k: &str| match k {
                "ION_ACCESS_TOKEN" => Some("sekrit".into()),
                "ION_UPLOAD_PART_SIZE" => Some(size.to_string()),
                _ => None,
            })
        };

        assert!(matches!(with_part_size(0), Err(IonError::Config(_))));
        assert!(matches!(with_part_size(MIN_PART_SIZE - 1), Err(IonError::Config(_))));
        let cfg = with_part_size(8 * 1024 * 1024).expect("cfg");
        assert_eq!(cfg.upload.part_size, 8 * 1024 * 1024);
    }

    #[test]
    fn create_request_uses_configured_name() {
        let mut cfg = Config::new("token", "images.zip");
        cfg.asset_name = "Quarry survey".into();
        let request = cfg.create_request();
        assert_eq!(request.name, "Quarry survey");
        assert_eq!(request.type_, AssetType::ThreeDTiles);
    }
}
