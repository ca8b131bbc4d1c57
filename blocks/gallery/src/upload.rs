//! The upload pipeline.
//!
//! Per file: validate the format, store the original, generate and store the
//! thumbnail, insert the metadata row at status `unprocessed`. Outcomes are
//! independent; one bad file never rolls back its siblings. A mid-file
//! failure can leave an orphan blob with no row, which is cleaned up
//! out-of-band, but never an orphan metadata row.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use lambda_http::{http::StatusCode, Body, Error, Response};
use serde::{Deserialize, Serialize};

use glimpse_atoms::error::{GalleryError, GalleryResult};
use glimpse_atoms::images::model::{Image, NewImageRecord};
use glimpse_atoms::thumbs;

use crate::{error_response, json_response, GalleryContext};

/// One raw file handed to the pipeline
#[derive(Debug, Clone)]
pub struct RawUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Per-file result, including the completed-files fraction after this file
#[derive(Debug, Serialize)]
pub struct UploadOutcome {
    pub file_name: String,
    pub progress: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<Image>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadRequest {
    files: Vec<UploadFilePayload>,
}

#[derive(Debug, Deserialize)]
struct UploadFilePayload {
    file_name: String,
    mime_type: String,
    data_base64: String,
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    #[serde(rename = "uploadedImages")]
    uploaded_images: Vec<Image>,
    outcomes: Vec<UploadOutcome>,
}

/// Run the pipeline over an ordered list of files for one owner.
pub async fn upload_files(
    ctx: &GalleryContext<'_>,
    owner_id: &str,
    files: Vec<RawUpload>,
) -> Vec<UploadOutcome> {
    let total = files.len();
    let mut outcomes = Vec::with_capacity(total);

    for (index, file) in files.into_iter().enumerate() {
        let progress = (index + 1) as f64 / total as f64;
        let file_name = file.file_name.clone();

        match upload_one(ctx, owner_id, file).await {
            Ok(image) => outcomes.push(UploadOutcome {
                file_name,
                progress,
                image: Some(image),
                error: None,
            }),
            Err(e) => {
                tracing::error!("Upload failed for {}: {}", file_name, e);
                outcomes.push(UploadOutcome {
                    file_name,
                    progress,
                    image: None,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    outcomes
}

async fn upload_one(
    ctx: &GalleryContext<'_>,
    owner_id: &str,
    file: RawUpload,
) -> GalleryResult<Image> {
    validate_format(&file)?;

    // Collision-resistant key: timestamp + name, scoped to the owner
    let key = format!(
        "{}/{}_{}",
        owner_id,
        chrono::Utc::now().timestamp_millis(),
        file.file_name
    );

    ctx.blobs
        .put(ctx.images_bucket, &key, file.bytes.clone(), &file.mime_type)
        .await?;

    let thumbnail = thumbs::generate_thumbnail(&file.bytes, ctx.thumbnail_bounding_box)?;
    ctx.blobs
        .put(ctx.thumbnails_bucket, &key, thumbnail.bytes, "image/jpeg")
        .await?;

    ctx.metadata
        .insert_image(
            owner_id,
            NewImageRecord {
                file_path: key.clone(),
                thumbnail_path: key,
                file_name: file.file_name,
                file_size: file.bytes.len() as i64,
                mime_type: file.mime_type,
                aspect_ratio: thumbnail.aspect_ratio,
            },
        )
        .await
}

/// Rejected before any storage write
fn validate_format(file: &RawUpload) -> GalleryResult<()> {
    if file.mime_type == "image/heic" {
        return Err(GalleryError::Validation(
            "HEIC files are not supported. Please select a different image format.".to_string(),
        ));
    }
    if !file.mime_type.starts_with("image/") {
        return Err(GalleryError::Validation(format!(
            "Unsupported file type: {}",
            file.mime_type
        )));
    }
    Ok(())
}

/// HTTP Handler: POST /upload
pub async fn upload_handler(
    ctx: &GalleryContext<'_>,
    owner_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let request: UploadRequest = match serde_json::from_slice(body) {
        Ok(request) => request,
        Err(e) => {
            return error_response(&GalleryError::Validation(format!(
                "Malformed upload request: {}",
                e
            )))
        }
    };

    if request.files.is_empty() {
        return error_response(&GalleryError::Validation("No files provided".to_string()));
    }

    let mut files = Vec::with_capacity(request.files.len());
    for payload in request.files {
        match BASE64.decode(payload.data_base64.as_bytes()) {
            Ok(bytes) => files.push(RawUpload {
                file_name: payload.file_name,
                mime_type: payload.mime_type,
                bytes,
            }),
            Err(e) => {
                return error_response(&GalleryError::Validation(format!(
                    "File {} is not valid base64: {}",
                    payload.file_name, e
                )))
            }
        }
    }

    let outcomes = upload_files(ctx, owner_id, files).await;
    let uploaded_images: Vec<Image> = outcomes
        .iter()
        .filter_map(|o| o.image.clone())
        .collect();

    tracing::info!(
        "Upload finished: {}/{} files stored",
        uploaded_images.len(),
        outcomes.len()
    );

    json_response(
        StatusCode::OK,
        &UploadResponse {
            uploaded_images,
            outcomes,
        },
    )
}
