//! /images handlers: gallery listing with signed URLs, single-image reads,
//! metadata-row inserts, and single/bulk deletes.

use lambda_http::{http::StatusCode, Body, Error, Response};
use serde::Deserialize;
use serde_json::json;

use glimpse_atoms::error::GalleryError;
use glimpse_atoms::images::model::{CreateImagePayload, Image, NewImageRecord};

use crate::{error_response, json_response, GalleryContext};

#[derive(Debug, Deserialize)]
struct BulkDeleteRequest {
    #[serde(rename = "imageIds")]
    image_ids: Vec<String>,
}

/// HTTP Handler: GET /images
///
/// The owner's gallery, newest first, with temporary signed URLs for the
/// original and the thumbnail. A failed URL signing for one image is logged
/// and that URL omitted; it never fails the whole listing.
pub async fn list_images_handler(
    ctx: &GalleryContext<'_>,
    owner_id: &str,
) -> Result<Response<Body>, Error> {
    let images = match ctx.metadata.list_images(owner_id).await {
        Ok(images) => images,
        Err(e) => return error_response(&e),
    };

    let mut items = Vec::with_capacity(images.len());
    for image in images {
        let signed_url = sign_or_omit(ctx, ctx.images_bucket, &image.file_path).await;
        let thumbnail_url = sign_or_omit(ctx, ctx.thumbnails_bucket, &image.thumbnail_path).await;

        items.push(json!({
            "id": image.image_id,
            "file_name": image.file_name,
            "uploaded_at": image.uploaded_at,
            "aspect_ratio": image.aspect_ratio,
            "analysis_status": image.analysis_status,
            "signedUrl": signed_url,
            "thumbnailUrl": thumbnail_url,
        }));
    }

    json_response(StatusCode::OK, &items)
}

/// HTTP Handler: GET /images?id={id} - full row including analysis fields
pub async fn get_image_handler(
    ctx: &GalleryContext<'_>,
    owner_id: &str,
    image_id: &str,
) -> Result<Response<Body>, Error> {
    match ctx.metadata.get_image(owner_id, image_id).await {
        Ok(image) => json_response(StatusCode::OK, &image),
        Err(e) => error_response(&e),
    }
}

/// HTTP Handler: POST /images - insert one metadata row (upload path split
/// from the metadata write)
pub async fn create_image_handler(
    ctx: &GalleryContext<'_>,
    owner_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let payload: CreateImagePayload = match serde_json::from_slice(body) {
        Ok(payload) => payload,
        Err(e) => {
            return error_response(&GalleryError::Validation(format!(
                "Malformed image payload: {}",
                e
            )))
        }
    };

    let record = NewImageRecord {
        file_path: payload.file_path,
        thumbnail_path: payload.thumbnail_path,
        file_name: payload.file_name,
        file_size: payload.file_size,
        mime_type: payload.mime_type,
        aspect_ratio: payload.aspect_ratio,
    };

    match ctx.metadata.insert_image(owner_id, record).await {
        Ok(image) => json_response(StatusCode::CREATED, &image),
        Err(e) => error_response(&e),
    }
}

/// HTTP Handler: DELETE /images?id={id}
///
/// Removes the row and both blobs. Blob deletion failures are logged and
/// reported, but the row deletion stands.
pub async fn delete_image_handler(
    ctx: &GalleryContext<'_>,
    owner_id: &str,
    image_id: &str,
) -> Result<Response<Body>, Error> {
    let image = match ctx.metadata.delete_image(owner_id, image_id).await {
        Ok(image) => image,
        Err(e) => return error_response(&e),
    };

    let storage_errors = delete_blobs(ctx, &image).await;
    if storage_errors.is_empty() {
        json_response(
            StatusCode::OK,
            &json!({ "message": "Image deleted successfully" }),
        )
    } else {
        json_response(
            StatusCode::OK,
            &json!({
                "message": "Image deleted successfully",
                "storage_errors": storage_errors,
            }),
        )
    }
}

/// HTTP Handler: POST /images/delete - bulk delete
///
/// Row deletions are confirmed even when blob deletions fail; per-file
/// storage errors are attached to the response.
pub async fn bulk_delete_handler(
    ctx: &GalleryContext<'_>,
    owner_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let request: BulkDeleteRequest = match serde_json::from_slice(body) {
        Ok(request) => request,
        Err(e) => {
            return error_response(&GalleryError::Validation(format!(
                "Malformed delete request: {}",
                e
            )))
        }
    };

    let mut deleted = 0usize;
    let mut storage_errors: Vec<serde_json::Value> = Vec::new();
    let mut row_errors: Vec<serde_json::Value> = Vec::new();

    for image_id in &request.image_ids {
        match ctx.metadata.delete_image(owner_id, image_id).await {
            Ok(image) => {
                deleted += 1;
                storage_errors.extend(delete_blobs(ctx, &image).await);
            }
            Err(e) => {
                tracing::error!("Row delete failed for image {}: {}", image_id, e);
                row_errors.push(json!({ "image_id": image_id, "error": e.to_string() }));
            }
        }
    }

    json_response(
        StatusCode::OK,
        &json!({
            "message": format!("{} image(s) deleted successfully", deleted),
            "deleted": deleted,
            "storage_errors": storage_errors,
            "row_errors": row_errors,
        }),
    )
}

async fn delete_blobs(ctx: &GalleryContext<'_>, image: &Image) -> Vec<serde_json::Value> {
    let mut errors = Vec::new();

    if let Err(e) = ctx.blobs.delete(ctx.images_bucket, &image.file_path).await {
        tracing::error!("Deletion error for {}: {}", image.file_path, e);
        errors.push(json!({ "file_path": image.file_path, "error": e.to_string() }));
    }
    if let Err(e) = ctx
        .blobs
        .delete(ctx.thumbnails_bucket, &image.thumbnail_path)
        .await
    {
        tracing::error!("Deletion error for {}: {}", image.thumbnail_path, e);
        errors.push(json!({ "file_path": image.thumbnail_path, "error": e.to_string() }));
    }

    errors
}

async fn sign_or_omit(ctx: &GalleryContext<'_>, bucket: &str, key: &str) -> Option<String> {
    if key.is_empty() {
        return None;
    }
    match ctx.blobs.signed_url(bucket, key, ctx.signed_url_ttl_secs).await {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::warn!("Signed URL generation failed for {}: {}", key, e);
            None
        }
    }
}
