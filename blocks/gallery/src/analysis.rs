//! The analysis pipeline state machine.
//!
//! `unprocessed`/`failed`/`complete` --claim--> `pending` --success-->
//! `complete`; `pending` --any error--> `failed`. The claim is a conditional
//! store update, so two concurrent runs on one image cannot interleave: the
//! second gets a conflict.

use lambda_http::{http::StatusCode, Body, Error, Response};
use serde::Deserialize;

use glimpse_atoms::error::{GalleryError, GalleryResult};
use glimpse_atoms::images::model::{AnalysisStatus, Image};
use glimpse_atoms::thumbs;

use crate::{error_response, json_response, GalleryContext};

#[derive(Debug, Deserialize)]
struct RunAnalysisRequest {
    image_id: String,
}

/// Run one full analysis pass over an image and return the updated row.
///
/// Claim -> fetch row -> download original -> resize -> vision inference ->
/// embed flattened text -> persist results atomically -> mark complete.
/// Any failure after the claim marks the image `failed` (best effort, logged
/// only) and surfaces the original error.
pub async fn run_analysis(
    ctx: &GalleryContext<'_>,
    owner_id: &str,
    image_id: &str,
) -> GalleryResult<Image> {
    // Claim failures (missing row, concurrent run) happen before the image
    // enters `pending`, so there is nothing to roll back.
    ctx.metadata.claim_for_analysis(owner_id, image_id).await?;

    match analyze_claimed(ctx, owner_id, image_id).await {
        Ok(image) => Ok(image),
        Err(primary) => {
            if let Err(secondary) = ctx
                .metadata
                .set_status(owner_id, image_id, AnalysisStatus::Failed)
                .await
            {
                // Never mask the primary error with the status-write failure
                tracing::warn!(
                    "Could not mark image {} as failed: {}",
                    image_id,
                    secondary
                );
            }
            tracing::error!("Analysis failed for image {}: {}", image_id, primary);
            Err(primary)
        }
    }
}

async fn analyze_claimed(
    ctx: &GalleryContext<'_>,
    owner_id: &str,
    image_id: &str,
) -> GalleryResult<Image> {
    let image = ctx.metadata.get_image(owner_id, image_id).await?;

    let original = ctx.blobs.get(ctx.images_bucket, &image.file_path).await?;
    let resized = thumbs::resize_for_analysis(&original, ctx.analysis_max_long_edge)?;

    let analysis = ctx.inference.analyze_image(&resized).await?;

    let flattened = analysis.flattened_text();
    let embedding = ctx.inference.embed_text(&flattened).await?;

    // A wrong-dimension vector would poison the similarity index; refuse it
    // as a configuration error rather than coercing.
    let expected = ctx.inference.embedding_dimensions();
    if embedding.len() != expected {
        return Err(GalleryError::Config(format!(
            "Embedding dimension mismatch: got {}, expected {}",
            embedding.len(),
            expected
        )));
    }

    // One update commits embedding + structured fields + timestamp, then the
    // status flips; readers observing `complete` always see a full result.
    ctx.metadata
        .save_analysis(owner_id, image_id, &analysis, &embedding)
        .await?;
    ctx.metadata
        .set_status(owner_id, image_id, AnalysisStatus::Complete)
        .await?;

    ctx.metadata.get_image(owner_id, image_id).await
}

/// HTTP Handler: POST /analysis
pub async fn run_analysis_handler(
    ctx: &GalleryContext<'_>,
    owner_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let request: RunAnalysisRequest = match serde_json::from_slice(body) {
        Ok(request) => request,
        Err(e) => {
            return error_response(&GalleryError::Validation(format!(
                "Malformed analysis request: {}",
                e
            )))
        }
    };
    tracing::info!("Processing image {}", request.image_id);

    match run_analysis(ctx, owner_id, &request.image_id).await {
        Ok(image) => json_response(StatusCode::CREATED, &image),
        Err(e) => error_response(&e),
    }
}

/// HTTP Handler: GET /analysis?imageId={id}
///
/// Returns the persisted analysis rows for one image: a single-element array
/// when the image has a committed analysis, an empty array otherwise.
pub async fn get_analysis_handler(
    ctx: &GalleryContext<'_>,
    owner_id: &str,
    image_id: &str,
) -> Result<Response<Body>, Error> {
    match ctx.metadata.get_image(owner_id, image_id).await {
        Ok(image) => {
            let rows: Vec<serde_json::Value> = image
                .analysis
                .map(|analysis| {
                    vec![serde_json::json!({
                        "image_id": image.image_id,
                        "objects": analysis.objects_detected,
                        "scene": analysis.scene_description,
                        "description": analysis.qualitative_aspects,
                        "last_analyzed": image.last_analyzed,
                    })]
                })
                .unwrap_or_default();
            json_response(StatusCode::OK, &rows)
        }
        Err(e) => error_response(&e),
    }
}

/// HTTP Handler: DELETE /analysis?id={image_id}
///
/// Clears the image's analysis fields and resets it to `unprocessed`.
pub async fn delete_analysis_handler(
    ctx: &GalleryContext<'_>,
    owner_id: &str,
    image_id: &str,
) -> Result<Response<Body>, Error> {
    match ctx.metadata.clear_analysis(owner_id, image_id).await {
        Ok(()) => json_response(
            StatusCode::OK,
            &serde_json::json!({ "message": "Analysis result deleted successfully" }),
        ),
        Err(e) => error_response(&e),
    }
}
