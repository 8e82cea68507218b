#![allow(dead_code)]

use ion_tiling::Config;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const BUCKET: &str = "assets-bucket";
pub const PRIMARY_ID: u64 = 101;

pub fn asset_json(id: u64, status: &str, percent: u32) -> Value {
    json!({
        "id": id,
        "type": "3DTILES",
        "name": format!("asset {}", id),
        "description": "",
        "bytes": 0,
        "dateAdded": "2024-05-01T12:00:00.000Z",
        "status": status,
        "percentComplete": percent
    })
}

/// A `POST /v1/assets` response whose upload location and completion callback
/// both point back at `server`.
pub fn creation_response(server: &MockServer, additional: &[u64]) -> Value {
    let additional: Vec<Value> = additional
        .iter()
        .map(|id| asset_json(*id, "AWAITING_FILES", 0))
        .collect();
    json!({
        "assetMetadata": asset_json(PRIMARY_ID, "AWAITING_FILES", 0),
        "additionalAssets": additional,
        "uploadLocation": {
            "endpoint": server.uri(),
            "bucket": BUCKET,
            "prefix": format!("sources/{}/", PRIMARY_ID),
            "accessKey": "ASIAEXAMPLE",
            "secretAccessKey": "secret",
            "sessionToken": "session"
        },
        "onComplete": {
            "method": "POST",
            "url": format!("{}/v1/assets/{}/uploadComplete", server.uri(), PRIMARY_ID),
            "fields": { "uploadId": "upload-token-1", "parts": [1, 2] }
        }
    })
}

pub fn write_source_file(dir: &Path, name: &str, bytes: usize) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, vec![7u8; bytes]).unwrap();
    path
}

pub fn test_config(server: &MockServer, input: &Path) -> Config {
    let mut config = Config::new("test_access_token", input);
    config.api_base = server.uri();
    config.poll.interval = Duration::from_millis(10);
    config.upload.force_path_style = true;
    config
}

/// Accepts every `PUT` into the test bucket, covering `PutObject` and `UploadPart`.
pub async fn mount_object_put(server: &MockServer) {
    Mock::given(method("PUT"))
        .and(path_regex(format!("^/{}/.+", BUCKET)))
        .respond_with(ResponseTemplate::new(200).insert_header("ETag", "\"0123456789abcdef\""))
        .mount(server)
        .await;
}

/// Serves the given status bodies in order, repeating the last one forever.
pub struct StatusSequence {
    bodies: Vec<Value>,
    calls: AtomicUsize,
}

impl StatusSequence {
    pub fn new(bodies: Vec<Value>) -> Self {
        Self {
            bodies,
            calls: AtomicUsize::new(0),
        }
    }
}

impl Respond for StatusSequence {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let body = &self.bodies[call.min(self.bodies.len() - 1)];
        ResponseTemplate::new(200).set_body_json(body)
    }
}
