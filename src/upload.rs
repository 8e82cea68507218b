//! Uploads source data to the short-lived object-storage location handed out
//! when an asset is created.

use crate::config::UploadOptions;
use crate::error::IonError;
use crate::types::UploadLocation;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{BehaviorVersion, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Bytes sent so far out of the file size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub loaded: u64,
    pub total: u64,
}

impl UploadProgress {
    /// `round(loaded / total * 100)`. An empty file is reported as done.
    pub fn percentage(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        let loaded = self.loaded.min(self.total);
        ((loaded as f64 / self.total as f64) * 100.0).round() as u8
    }
}

/// Where the uploaded file ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedObject {
    pub bucket: String,
    pub key: String,
    pub bytes: u64,
}

/// Uploads `path` to `{location.prefix}{filename}` in the location's bucket.
///
/// Files no larger than `options.part_size` are sent with one `PutObject`; bigger
/// ones go through a multipart upload, one part at a time. `on_progress` is called
/// after every part with the running byte count, so the reported percentage never
/// decreases.
///
/// A failed multipart upload is aborted before the error is returned. Cancelling
/// `cancel` stops before the next part and aborts the same way, returning
/// `IonError::Cancelled`.
pub async fn upload_file<P, F>(
    location: &UploadLocation,
    path: P,
    filename: &str,
    options: &UploadOptions,
    cancel: &CancellationToken,
    mut on_progress: F,
) -> Result<UploadedObject, IonError>
where
    P: AsRef<Path>,
    F: FnMut(UploadProgress),
{
    let path = path.as_ref();
    let key = format!("{}{}", location.prefix, filename);
    let total = tokio::fs::metadata(path).await?.len();
    let content_type = mime_guess::from_path(filename)
        .first_or_octet_stream()
        .to_string();
    let client = s3_client(location, options).await;

    debug!(bucket = %location.bucket, %key, total, "starting upload");

    if total <= options.part_size as u64 {
        let body = ByteStream::from_path(path).await?;
        let put = client
            .put_object()
            .bucket(&location.bucket)
            .key(&key)
            .content_type(content_type)
            .body(body)
            .send();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(IonError::Cancelled),
            sent = put => {
                sent.map_err(|e| s3_failure("PutObject", e))?;
            }
        }
        on_progress(UploadProgress { loaded: total, total });
    } else {
        multipart_upload(
            &client,
            &location.bucket,
            &key,
            &content_type,
            path,
            total,
            options.part_size,
            cancel,
            &mut on_progress,
        )
        .await?;
    }

    Ok(UploadedObject {
        bucket: location.bucket.clone(),
        key,
        bytes: total,
    })
}

/// Builds an S3 client that authenticates with the location's temporary credentials.
async fn s3_client(location: &UploadLocation, options: &UploadOptions) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        location.access_key.clone(),
        location.secret_access_key.clone(),
        Some(location.session_token.clone()),
        None,
        "IonUploadLocation",
    );

    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(options.region.clone()))
        .credentials_provider(credentials)
        .load()
        .await;

    let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
        .endpoint_url(&location.endpoint)
        .force_path_style(options.force_path_style)
        .build();

    aws_sdk_s3::Client::from_conf(s3_config)
}

#[allow(clippy::too_many_arguments)]
async fn multipart_upload<F>(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    content_type: &str,
    path: &Path,
    total: u64,
    part_size: usize,
    cancel: &CancellationToken,
    on_progress: &mut F,
) -> Result<(), IonError>
where
    F: FnMut(UploadProgress),
{
    let created = client
        .create_multipart_upload()
        .bucket(bucket)
        .key(key)
        .content_type(content_type)
        .send()
        .await
        .map_err(|e| s3_failure("CreateMultipartUpload", e))?;
    let upload_id = created
        .upload_id()
        .ok_or_else(|| IonError::UploadFailed("CreateMultipartUpload returned no upload id".into()))?
        .to_string();

    let parts = match upload_parts(
        client, bucket, key, &upload_id, path, total, part_size, cancel, on_progress,
    )
    .await
    {
        Ok(parts) => parts,
        Err(err) => {
            abort(client, bucket, key, &upload_id).await;
            return Err(err);
        }
    };

    let completed = CompletedMultipartUpload::builder()
        .set_parts(Some(parts))
        .build();
    if let Err(e) = client
        .complete_multipart_upload()
        .bucket(bucket)
        .key(key)
        .upload_id(&upload_id)
        .multipart_upload(completed)
        .send()
        .await
    {
        abort(client, bucket, key, &upload_id).await;
        return Err(s3_failure("CompleteMultipartUpload", e));
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn upload_parts<F>(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    upload_id: &str,
    path: &Path,
    total: u64,
    part_size: usize,
    cancel: &CancellationToken,
    on_progress: &mut F,
) -> Result<Vec<CompletedPart>, IonError>
where
    F: FnMut(UploadProgress),
{
    let mut file = File::open(path).await?;
    let mut parts = Vec::new();
    let mut loaded = 0u64;
    let mut part_number = 1i32;

    loop {
        if cancel.is_cancelled() {
            return Err(IonError::Cancelled);
        }

        let mut chunk = Vec::with_capacity(part_size);
        let read = (&mut file)
            .take(part_size as u64)
            .read_to_end(&mut chunk)
            .await?;
        if read == 0 {
            break;
        }

        let sent = client
            .upload_part()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(chunk))
            .send();
        let output = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(IonError::Cancelled),
            output = sent => output.map_err(|e| s3_failure("UploadPart", e))?,
        };

        parts.push(
            CompletedPart::builder()
                .part_number(part_number)
                .set_e_tag(output.e_tag().map(str::to_string))
                .build(),
        );

        loaded += read as u64;
        on_progress(UploadProgress { loaded, total });
        part_number += 1;
    }

    Ok(parts)
}

async fn abort(client: &aws_sdk_s3::Client, bucket: &str, key: &str, upload_id: &str) {
    if let Err(e) = client
        .abort_multipart_upload()
        .bucket(bucket)
        .key(key)
        .upload_id(upload_id)
        .send()
        .await
    {
        warn!(%key, error = %DisplayErrorContext(&e), "failed to abort multipart upload");
    }
}

fn s3_failure<E: std::error::Error>(operation: &str, err: E) -> IonError {
    IonError::UploadFailed(format!("{} failed: {}", operation, DisplayErrorContext(err)))
}
